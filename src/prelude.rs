//! # dotgraft Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the dotgraft library. Import this module to get quick access to the essential
//! types for decoding, comparing and cloning .NET metadata.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dotgraft operations
pub use crate::Error;

/// The result type used throughout dotgraft
pub use crate::Result;

/// Low-level binary cursor and writer
pub use crate::file::{parser::Parser, writer::Writer};

// ================================================================================================
// Metadata System - Core Types
// ================================================================================================

/// Metadata token type for referencing table entries
pub use crate::metadata::token::Token;

/// Table identifiers and coded indices
pub use crate::metadata::tables::{CodedIndexType, TableId, TableInfo, TableInfoRef};

// ================================================================================================
// Module Model
// ================================================================================================

/// The in-memory module and its handles
pub use crate::metadata::module::{MemberDescriptor, MemberHandle, Module, ModuleId};

/// Member definitions and references
pub use crate::metadata::members::{
    AssemblyIdentity, AssemblyRef, AssemblyVersion, CustomAttribute, EventDef, FieldDef,
    MemberRef, MemberRefSignature, MethodDef, MethodSpec, ModuleRef, ParamDef, PropertyDef,
    StandAloneSignature, TypeDef, TypeRef, TypeSpec,
};

// ================================================================================================
// Signatures
// ================================================================================================

/// Signature types, decoder and encoder
pub use crate::metadata::signatures::{
    BlobSignature, SignatureField, SignatureLocalVariables, SignatureMethod, SignatureMethodSpec,
    SignatureParameter, SignatureParser, SignatureProperty, SignatureTypeSpec, TypeSignature,
    TypeTokenResolver,
};

// ================================================================================================
// Method Bodies
// ================================================================================================

/// CIL instructions and method bodies
pub use crate::metadata::method::{
    CilLabel, ExceptionHandler, ExceptionHandlerFlags, Instruction, MethodBody, Operand,
};

// ================================================================================================
// Comparison and Cloning
// ================================================================================================

/// Structural member comparison
pub use crate::metadata::comparer::{ComparerFlags, Descriptor, SignatureComparer};

/// Member cloning
pub use crate::cloning::{CloneOptions, CloneResult, MetadataCloner};
