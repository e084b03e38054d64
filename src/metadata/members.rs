//! Member definitions and references held by a [`crate::metadata::module::Module`].
//!
//! Rows are plain owned values. Every cross reference is a [`Token`] that is only meaningful
//! relative to the module that owns the row; names are owned strings and signatures are
//! already decoded.

use bitflags::bitflags;
use sha1::{Digest, Sha1};

use crate::metadata::{
    method::MethodBody,
    signatures::{
        SignatureField, SignatureLocalVariables, SignatureMethod, SignatureMethodSpec,
        SignatureProperty, TypeSignature,
    },
    token::Token,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Flags of a `TypeDef` (ECMA-335 II.23.1.15)
    pub struct TypeAttributes: u32 {
        /// Visible outside the assembly
        const PUBLIC = 0x0000_0001;
        /// Nested, visible everywhere the enclosing type is
        const NESTED_PUBLIC = 0x0000_0002;
        /// Nested, only visible to the enclosing type
        const NESTED_PRIVATE = 0x0000_0003;
        /// The type is an interface
        const INTERFACE = 0x0000_0020;
        /// The type is abstract
        const ABSTRACT = 0x0000_0080;
        /// The type cannot be derived from
        const SEALED = 0x0000_0100;
        /// The name has a special meaning
        const SPECIAL_NAME = 0x0000_0400;
        /// Static fields can be initialized lazily
        const BEFORE_FIELD_INIT = 0x0010_0000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Flags of a `Field` (ECMA-335 II.23.1.5)
    pub struct FieldAttributes: u16 {
        /// Accessible only by the parent type
        const PRIVATE = 0x0001;
        /// Accessible by sub-types only in this assembly
        const FAM_AND_ASSEM = 0x0002;
        /// Accessible by anyone in the assembly
        const ASSEMBLY = 0x0003;
        /// Accessible only by type and sub-types
        const FAMILY = 0x0004;
        /// Accessible by anyone
        const PUBLIC = 0x0006;
        /// Defined on the type, not per instance
        const STATIC = 0x0010;
        /// Only assignable in a constructor
        const INIT_ONLY = 0x0020;
        /// Compile time constant
        const LITERAL = 0x0040;
        /// The name has a special meaning
        const SPECIAL_NAME = 0x0200;
        /// The field has a default value
        const HAS_DEFAULT = 0x8000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Flags of a `MethodDef` (ECMA-335 II.23.1.10)
    pub struct MethodAttributes: u16 {
        /// Accessible only by the parent type
        const PRIVATE = 0x0001;
        /// Accessible by anyone in the assembly
        const ASSEM = 0x0003;
        /// Accessible only by type and sub-types
        const FAMILY = 0x0004;
        /// Accessible by anyone
        const PUBLIC = 0x0006;
        /// Defined on the type, not per instance
        const STATIC = 0x0010;
        /// Cannot be overridden
        const FINAL = 0x0020;
        /// Virtual dispatch
        const VIRTUAL = 0x0040;
        /// Hides by name and signature
        const HIDE_BY_SIG = 0x0080;
        /// Always gets a new vtable slot
        const NEW_SLOT = 0x0100;
        /// No implementation
        const ABSTRACT = 0x0400;
        /// The name has a special meaning
        const SPECIAL_NAME = 0x0800;
        /// The runtime checks the name encoding
        const RTSPECIAL_NAME = 0x1000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Implementation flags of a `MethodDef` (ECMA-335 II.23.1.11)
    pub struct MethodImplAttributes: u16 {
        /// Native code
        const NATIVE = 0x0001;
        /// Implemented by the runtime
        const RUNTIME = 0x0003;
        /// Unmanaged code
        const UNMANAGED = 0x0004;
        /// Must not be inlined
        const NO_INLINING = 0x0008;
        /// Single threaded through the body
        const SYNCHRONIZED = 0x0020;
        /// Signature is exported exactly as declared
        const PRESERVE_SIG = 0x0080;
        /// Internal call
        const INTERNAL_CALL = 0x1000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Flags of a `Param` (ECMA-335 II.23.1.13)
    pub struct ParamAttributes: u16 {
        /// Input parameter
        const IN = 0x0001;
        /// Output parameter
        const OUT = 0x0002;
        /// Optional parameter
        const OPTIONAL = 0x0010;
        /// The parameter has a default value
        const HAS_DEFAULT = 0x1000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Flags of a `Property` (ECMA-335 II.23.1.14)
    pub struct PropertyAttributes: u16 {
        /// The name has a special meaning
        const SPECIAL_NAME = 0x0200;
        /// The runtime checks the name encoding
        const RTSPECIAL_NAME = 0x0400;
        /// The property has a default value
        const HAS_DEFAULT = 0x1000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Flags of an `Event` (ECMA-335 II.23.1.4)
    pub struct EventAttributes: u16 {
        /// The name has a special meaning
        const SPECIAL_NAME = 0x0200;
        /// The runtime checks the name encoding
        const RTSPECIAL_NAME = 0x0400;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Flags of a `GenericParam` (ECMA-335 II.23.1.7)
    pub struct GenericParamAttributes: u16 {
        /// Covariant
        const COVARIANT = 0x0001;
        /// Contravariant
        const CONTRAVARIANT = 0x0002;
        /// Must be a reference type
        const REFERENCE_TYPE_CONSTRAINT = 0x0004;
        /// Must be a non-nullable value type
        const NOT_NULLABLE_VALUE_TYPE_CONSTRAINT = 0x0008;
        /// Must have a default constructor
        const DEFAULT_CONSTRUCTOR_CONSTRAINT = 0x0010;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Flags of an `AssemblyRef` (ECMA-335 II.23.1.2)
    pub struct AssemblyFlags: u32 {
        /// `public_key_or_token` holds the full public key
        const PUBLIC_KEY = 0x0001;
        /// The referenced assembly may be retargeted at runtime
        const RETARGETABLE = 0x0100;
    }
}

/// Four part assembly version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct AssemblyVersion {
    /// Major version
    pub major: u16,
    /// Minor version
    pub minor: u16,
    /// Build number
    pub build: u16,
    /// Revision number
    pub revision: u16,
}

impl AssemblyVersion {
    /// Create a new version.
    #[must_use]
    pub const fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        AssemblyVersion {
            major,
            minor,
            build,
            revision,
        }
    }
}

/// Identity of an assembly: the definition owning a module, or the target of an `AssemblyRef`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct AssemblyIdentity {
    /// Simple name
    pub name: String,
    /// Version
    pub version: AssemblyVersion,
    /// Culture, empty for neutral
    pub culture: String,
    /// 8 byte public key token, empty for unsigned assemblies
    pub public_key_token: Vec<u8>,
}

/// Compute the public key token of a full public key.
///
/// The token is the last 8 bytes of the SHA-1 hash of the key, in reverse order.
#[must_use]
pub fn public_key_token(public_key: &[u8]) -> Vec<u8> {
    let hash = Sha1::digest(public_key);
    hash.iter().rev().take(8).copied().collect()
}

/// A generic parameter declared on a type or method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct GenericParam {
    /// Position in the owner's parameter list
    pub number: u16,
    /// Variance and constraint flags
    pub flags: GenericParamAttributes,
    /// Name
    pub name: String,
    /// Constraint types (`TypeDefOrRef` tokens)
    pub constraints: Vec<Token>,
}

/// Default value of a field, parameter or property (ECMA-335 II.22.9).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Constant {
    /// `ELEMENT_TYPE` of the value
    pub element_type: u8,
    /// Raw little-endian value
    pub value: Vec<u8>,
}

/// A type definition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypeDef {
    /// Flags
    pub flags: TypeAttributes,
    /// Namespace, empty for the global namespace and nested types
    pub namespace: String,
    /// Name
    pub name: String,
    /// Base type (`TypeDefOrRef`), [`Token::NULL`] for interfaces and `<Module>`
    pub extends: Token,
    /// Implemented interfaces (`TypeDefOrRef`)
    pub interfaces: Vec<Token>,
    /// Fields
    pub fields: Vec<Token>,
    /// Methods
    pub methods: Vec<Token>,
    /// Properties
    pub properties: Vec<Token>,
    /// Events
    pub events: Vec<Token>,
    /// Nested types
    pub nested_types: Vec<Token>,
    /// Enclosing type of a nested type
    pub declaring_type: Option<Token>,
    /// Generic parameters
    pub generic_params: Vec<GenericParam>,
}

/// A field definition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldDef {
    /// Flags
    pub flags: FieldAttributes,
    /// Name
    pub name: String,
    /// Signature
    pub signature: SignatureField,
    /// Owning type
    pub declaring_type: Option<Token>,
    /// Default value
    pub constant: Option<Constant>,
}

/// A method definition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MethodDef {
    /// Flags
    pub flags: MethodAttributes,
    /// Implementation flags
    pub impl_flags: MethodImplAttributes,
    /// Name
    pub name: String,
    /// Signature
    pub signature: SignatureMethod,
    /// Parameter rows
    pub params: Vec<Token>,
    /// CIL body, `None` for abstract, extern and runtime methods
    pub body: Option<MethodBody>,
    /// Owning type
    pub declaring_type: Option<Token>,
    /// Generic parameters
    pub generic_params: Vec<GenericParam>,
}

/// A parameter definition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParamDef {
    /// Flags
    pub flags: ParamAttributes,
    /// `0` for the return value, otherwise the 1-based parameter position
    pub sequence: u16,
    /// Name
    pub name: String,
    /// Owning method
    pub method: Token,
    /// Default value
    pub constant: Option<Constant>,
}

/// A property definition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropertyDef {
    /// Flags
    pub flags: PropertyAttributes,
    /// Name
    pub name: String,
    /// Signature
    pub signature: SignatureProperty,
    /// `get_` accessor
    pub getter: Option<Token>,
    /// `set_` accessor
    pub setter: Option<Token>,
    /// Other associated methods
    pub others: Vec<Token>,
    /// Owning type
    pub declaring_type: Option<Token>,
}

/// An event definition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventDef {
    /// Flags
    pub flags: EventAttributes,
    /// Name
    pub name: String,
    /// Delegate type (`TypeDefOrRef`)
    pub event_type: Token,
    /// `add_` accessor
    pub add: Option<Token>,
    /// `remove_` accessor
    pub remove: Option<Token>,
    /// `raise_` accessor
    pub raise: Option<Token>,
    /// Other associated methods
    pub others: Vec<Token>,
    /// Owning type
    pub declaring_type: Option<Token>,
}

impl PropertyDef {
    /// All accessor methods.
    #[must_use]
    pub fn accessors(&self) -> Vec<Token> {
        self.getter
            .iter()
            .chain(self.setter.iter())
            .chain(self.others.iter())
            .copied()
            .collect()
    }
}

impl EventDef {
    /// All accessor methods.
    #[must_use]
    pub fn accessors(&self) -> Vec<Token> {
        self.add
            .iter()
            .chain(self.remove.iter())
            .chain(self.raise.iter())
            .chain(self.others.iter())
            .copied()
            .collect()
    }
}

/// A reference to a type defined in another scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TypeRef {
    /// `AssemblyRef`, `ModuleRef`, `Module` or enclosing `TypeRef`
    pub resolution_scope: Token,
    /// Namespace
    pub namespace: String,
    /// Name
    pub name: String,
}

/// A constructed type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TypeSpec {
    /// Type signature
    pub signature: TypeSignature,
}

/// Signature of a [`MemberRef`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemberRefSignature {
    /// Reference to a method
    Method(SignatureMethod),
    /// Reference to a field
    Field(SignatureField),
}

/// A reference to a field or method of a type, possibly in another scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberRef {
    /// Owner (`MemberRefParent`)
    pub class: Token,
    /// Name
    pub name: String,
    /// Signature
    pub signature: MemberRefSignature,
}

/// An instantiation of a generic method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct MethodSpec {
    /// Generic method (`MethodDefOrRef`)
    pub method: Token,
    /// Type arguments
    pub instantiation: SignatureMethodSpec,
}

/// A reference to another assembly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct AssemblyRef {
    /// Simple name
    pub name: String,
    /// Version
    pub version: AssemblyVersion,
    /// Flags
    pub flags: AssemblyFlags,
    /// Full public key or public key token, see [`AssemblyFlags::PUBLIC_KEY`]
    pub public_key_or_token: Vec<u8>,
    /// Culture
    pub culture: String,
}

impl AssemblyRef {
    /// The identity this reference points at.
    #[must_use]
    pub fn identity(&self) -> AssemblyIdentity {
        let public_key_token = if self.flags.contains(AssemblyFlags::PUBLIC_KEY)
            && !self.public_key_or_token.is_empty()
        {
            public_key_token(&self.public_key_or_token)
        } else {
            self.public_key_or_token.clone()
        };

        AssemblyIdentity {
            name: self.name.clone(),
            version: self.version,
            culture: self.culture.clone(),
            public_key_token,
        }
    }
}

impl From<&AssemblyIdentity> for AssemblyRef {
    fn from(identity: &AssemblyIdentity) -> Self {
        AssemblyRef {
            name: identity.name.clone(),
            version: identity.version,
            flags: AssemblyFlags::empty(),
            public_key_or_token: identity.public_key_token.clone(),
            culture: identity.culture.clone(),
        }
    }
}

/// A reference to another module of the same assembly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ModuleRef {
    /// File name of the module
    pub name: String,
}

/// Signature stored in the `StandAloneSig` table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StandAloneSignature {
    /// Local variables of a method body
    Locals(SignatureLocalVariables),
    /// Target of a `calli`
    Method(SignatureMethod),
}

/// A custom attribute attached to a member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CustomAttribute {
    /// Annotated member (`HasCustomAttribute`)
    pub parent: Token,
    /// Attribute constructor (`CustomAttributeType`)
    pub constructor: Token,
    /// Raw value blob
    pub value: Vec<u8>,
}
