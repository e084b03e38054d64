//! Copying members between modules.
//!
//! [`MetadataCloner`] copies a set of seed members, and everything structurally nested in them,
//! from a source [`crate::metadata::module::Module`] into a target module. The copy is performed
//! in two phases:
//!
//! 1. A shell row is appended to the target for every cloned member and recorded in the clone
//!    map, so that cyclic references between cloned members resolve.
//! 2. Every shell is populated: signatures are re-encoded and decoded again against the
//!    target, method bodies are copied with their token operands, branch targets and exception
//!    handlers remapped, and references to members outside the cloned set are imported.
//!
//! A failed clone leaves the target exactly as it was.
//!
//! # Examples
//!
//! ```rust
//! use dotgraft::cloning::{CloneOptions, MetadataCloner};
//! use dotgraft::metadata::members::{MethodDef, TypeDef};
//! use dotgraft::metadata::module::Module;
//!
//! let mut source = Module::new("Source.dll");
//! let program = source.add_type_def(TypeDef {
//!     name: "Program".to_string(),
//!     ..TypeDef::default()
//! });
//! let main = source.add_method_def(MethodDef {
//!     name: "Main".to_string(),
//!     declaring_type: Some(program),
//!     ..MethodDef::default()
//! });
//! source.type_def_mut(program)?.methods.push(main);
//!
//! let mut target = Module::new("Target.dll");
//! let options = CloneOptions {
//!     copy_custom_attributes: false,
//!     ..CloneOptions::default()
//! };
//! let result = MetadataCloner::new(&source, &mut target)
//!     .with_options(options)
//!     .include(source.handle(program)?)
//!     .clone_members()?;
//!
//! let cloned_main = result.get_cloned(main).unwrap();
//! assert_eq!(target.method_def(cloned_main)?.name, "Main");
//! assert_eq!(result.cloned_members.len(), 2);
//! # Ok::<(), dotgraft::Error>(())
//! ```

mod cloner;
mod closure;
mod context;
mod importer;
mod options;
mod result;

pub use cloner::MetadataCloner;
pub use options::CloneOptions;
pub use result::CloneResult;
