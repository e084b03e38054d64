//! Metadata model and codecs for .NET modules.
//!
//! This module contains the ECMA-335 building blocks the rest of the crate works with: tokens,
//! table identifiers and coded indices, signature blobs, method bodies, heaps, and an in-memory
//! [`module::Module`] holding member definitions and references.
//!
//! # Key Components
//!
//! - [`token`] - Metadata table row references used throughout .NET
//! - [`tables`] - Table identifiers, coded indices, physical layout and raw rows
//! - [`signatures`] - Method, field, property and type signature decoding and encoding
//! - [`method`] - CIL instructions, exception handlers and method body headers
//! - [`streams`] - `#Strings`, `#Blob` and `#US` heap readers and builders
//! - [`members`] / [`module`] - Member definitions and the module that owns them
//! - [`comparer`] - Structural equality of members across modules
//! - [`emitter`] - Serialization of a module's reference tables
//!
//! # Examples
//!
//! ```rust
//! use dotgraft::metadata::signatures::{parse_field_signature, TypeSignature};
//!
//! // Field of type `int[]`
//! let field = parse_field_signature(&[0x06, 0x1D, 0x08])?;
//! assert_eq!(field.base, TypeSignature::SzArray(Box::new(TypeSignature::I4)));
//! # Ok::<(), dotgraft::Error>(())
//! ```

/// Structural member and signature comparison
pub mod comparer;
/// Serialization of reference tables and heaps
pub mod emitter;
/// Member definitions, references and their flags
pub mod members;
/// CIL method bodies
pub mod method;
/// In-memory module
pub mod module;
/// Implementation of method and type signatures
pub mod signatures;
/// Implementation of the metadata heaps
pub mod streams;
/// Implementation of the .NET metadata tables
pub mod tables;
/// Commonly used metadata token type
pub mod token;
