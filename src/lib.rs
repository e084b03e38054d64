// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![allow(clippy::too_many_arguments)]

//! # dotgraft
//!
//! Encoding, comparison and cloning of .NET (ECMA-335) metadata in pure Rust.
//!
//! `dotgraft` provides the low-level pieces needed to move members between .NET modules: the
//! compressed integer and coded index codecs, a signature blob decoder and encoder, a structural
//! comparer that decides whether two members of different modules denote the same thing, and a
//! cloning engine that copies types, methods, fields, properties and events from one module into
//! another while rewriting every reference they carry.
//!
//! ## Features
//!
//! - **Signature codec** - Decode and re-encode method, field, property, local variable, type
//!   spec and method spec signatures with exact length accounting
//! - **Coded indices** - All 13 ECMA-335 coded index kinds with 2 and 4 byte layouts
//! - **Structural comparison** - Module independent equality and hashing of members
//! - **Cloning** - Two-phase, transactional copy of members with reference import and
//!   deduplication
//! - **Method bodies** - CIL decoding and encoding with labels, tiny/fat headers and exception
//!   sections
//!
//! ## Quick Start
//!
//! ```rust
//! use dotgraft::prelude::*;
//!
//! let mut source = Module::new("Source.dll");
//! let point = source.add_type_def(TypeDef {
//!     namespace: "Geometry".to_string(),
//!     name: "Point".to_string(),
//!     ..TypeDef::default()
//! });
//!
//! let mut target = Module::new("Target.dll");
//! let result = MetadataCloner::new(&source, &mut target)
//!     .include(source.handle(point)?)
//!     .clone_members()?;
//!
//! let clone = result.get_cloned(point).unwrap();
//! assert_eq!(target.type_def(clone)?.name, "Point");
//! # Ok::<(), dotgraft::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`prelude`] - Convenient re-exports of commonly used types
//! - [`metadata`] - Tokens, tables, signatures, method bodies, heaps, the in-memory module and
//!   the structural comparer
//! - [`cloning`] - The metadata cloning engine
//! - [`utils`] - Compressed integer codec
//! - [`file`] - Binary cursor and writer
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Standards Compliance
//!
//! `dotgraft` implements the binary formats of the **ECMA-335 specification** (6th edition).
//!
//! - [ECMA-335 Standard](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf) - Official CLI specification
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result):
//!
//! ```rust
//! use dotgraft::{utils::read_compressed_uint, Error};
//!
//! let mut offset = 0;
//! match read_compressed_uint(&[0x80], &mut offset) {
//!     Err(Error::TruncatedData) => println!("Value is cut short"),
//!     other => println!("Unexpected: {:?}", other),
//! }
//! ```

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use dotgraft::prelude::*;
///
/// let module = Module::new("Library.dll");
/// assert_eq!(module.row_count(TableId::TypeDef), 0);
/// ```
pub mod prelude;

/// Binary cursor, writer and little-endian primitive conversion
pub mod file;

/// Definitions, codecs and comparison of CIL metadata based on ECMA-335
///
/// # Key Components
///
/// - [`metadata::token`] - Metadata tokens for cross-references
/// - [`metadata::tables`] - Table identifiers, coded indices and raw rows
/// - [`metadata::signatures`] - Signature decoding and encoding
/// - [`metadata::method`] - CIL method bodies
/// - [`metadata::module`] - In-memory module of member definitions and references
/// - [`metadata::comparer`] - Structural comparison across modules
pub mod metadata;

/// Copying members between modules
pub mod cloning;

/// Compressed integer codec
pub mod utils;

/// `dotgraft` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `dotgraft` Error type
///
/// The main error type for all operations in this crate.
pub use error::Error;
