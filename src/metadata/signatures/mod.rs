//! Signature blob decoding and encoding for .NET metadata.
//!
//! Signatures encode type information, method parameters, generic instantiations and calling
//! conventions in a compact binary format stored in the `#Blob` heap (ECMA-335 II.23.2).
//!
//! # Signature Types
//!
//! - **Method Signatures** - Calling convention, return type, parameters and vararg extras
//! - **Field Signatures** - Field type and custom modifiers
//! - **Property Signatures** - Property type and indexer parameters
//! - **LocalVar Signatures** - Local variable types within method bodies
//! - **TypeSpec Signatures** - Constructed types referenced from the `TypeSpec` table
//! - **MethodSpec Signatures** - Generic method instantiations
//!
//! Decoding goes through [`SignatureParser`], encoding through the [`BlobSignature`] trait which
//! every signature type implements. For all valid signatures `encode(decode(blob)) == blob` and
//! `encode().len() == physical_length()`.
//!
//! # Examples
//!
//! ```rust
//! use dotgraft::metadata::signatures::{parse_method_signature, BlobSignature};
//!
//! // instance string (int32)
//! let blob = [0x20, 0x01, 0x0E, 0x08];
//! let method = parse_method_signature(&blob)?;
//!
//! assert!(method.has_this);
//! assert_eq!(method.params.len(), 1);
//! assert_eq!(method.physical_length(), blob.len());
//! assert_eq!(method.encode()?, blob);
//! # Ok::<(), dotgraft::Error>(())
//! ```
//!
//! # References
//!
//! - ECMA-335 6th Edition, Partition II, Section 23.2 - Blobs and Signatures

mod encoder;
mod parser;
mod types;

pub use encoder::BlobSignature;
pub use parser::*;
pub use types::*;
