//! Binary reading and writing primitives.
//!
//! # Key Components
//!
//! - [`crate::file::parser::Parser`] - Bounds checked cursor used by all decoders
//! - [`crate::file::writer::Writer`] - Append-only sink used by all encoders
//! - [`crate::file::io`] - Little-endian primitive conversion

pub mod io;
pub mod parser;
pub mod writer;
