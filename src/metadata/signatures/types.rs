use strum::FromRepr;

use crate::metadata::token::Token;

/// Element type markers of signature blobs (ECMA-335 II.23.1.16).
#[allow(non_snake_case, dead_code, missing_docs)]
pub mod ELEMENT_TYPE {
    //Marks end of a list
    pub const END: u8 = 0x00;
    pub const VOID: u8 = 0x01;
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0a;
    pub const U8: u8 = 0x0b;
    pub const R4: u8 = 0x0c;
    pub const R8: u8 = 0x0d;
    pub const STRING: u8 = 0x0e;
    // Followed by type
    pub const PTR: u8 = 0x0f;
    // Followed by type
    pub const BYREF: u8 = 0x10;
    // Followed by TypeDef or TypeRef token
    pub const VALUETYPE: u8 = 0x11;
    // Followed by TypeDef or TypeRef token
    pub const CLASS: u8 = 0x12;
    // Generic parameter in a generic type definition, represented as number
    pub const VAR: u8 = 0x13;
    // type rank boundsCount bound1 … loCount lo1 …
    pub const ARRAY: u8 = 0x14;
    // Generic type instantiation. Followed by type type-arg-count type-1 ... type-n
    pub const GENERICINST: u8 = 0x15;
    pub const TYPEDBYREF: u8 = 0x16;
    // System.IntPtr
    pub const I: u8 = 0x18;
    // System.UIntPtr
    pub const U: u8 = 0x19;
    // Followed by full method signature
    pub const FNPTR: u8 = 0x1b;
    // System.Object
    pub const OBJECT: u8 = 0x1c;
    // Single-dim array with 0 lower bound
    pub const SZARRAY: u8 = 0x1d;
    // Generic parameter in a generic method definition,represented as number
    pub const MVAR: u8 = 0x1e;
    // Required modifier : followed by a TypeDef or TypeRef token
    pub const CMOD_REQD: u8 = 0x1f;
    // Optional modifier : followed by a TypeDef or TypeRef token
    pub const CMOD_OPT: u8 = 0x20;
    // Sentinel for vararg method signature
    pub const SENTINEL: u8 = 0x41;
    // Denotes a local variable that points at a pinned object
    pub const PINNED: u8 = 0x45;
}

/// Leading bytes of signature blobs (ECMA-335 II.23.2).
#[allow(non_snake_case, dead_code, missing_docs)]
pub mod SIGNATURE_HEADER {
    pub const FIELD: u8 = 0x06;
    pub const LOCAL_SIG: u8 = 0x07;
    pub const PROPERTY: u8 = 0x08;
    pub const METHOD_SPEC: u8 = 0x0A;
    pub const GENERIC: u8 = 0x10;
    pub const HAS_THIS: u8 = 0x20;
    pub const EXPLICIT_THIS: u8 = 0x40;
    pub const RESERVED: u8 = 0x80;
    // low nibble of the first byte
    pub const KIND_MASK: u8 = 0x0F;
}

/// Calling convention kind stored in the low nibble of a method signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, FromRepr)]
#[repr(u8)]
pub enum CallingConvention {
    /// Managed calling convention
    #[default]
    Default = 0x0,
    /// Unmanaged cdecl
    C = 0x1,
    /// Unmanaged stdcall
    StdCall = 0x2,
    /// Unmanaged thiscall
    ThisCall = 0x3,
    /// Unmanaged fastcall
    FastCall = 0x4,
    /// Managed variable arguments
    VarArg = 0x5,
}

impl CallingConvention {
    /// Returns `true` if a signature with this convention may carry a vararg sentinel.
    ///
    /// Managed call sites use `VarArg`; stand-alone unmanaged signatures use `C`.
    #[must_use]
    pub fn allows_varargs(&self) -> bool {
        matches!(self, CallingConvention::VarArg | CallingConvention::C)
    }
}

/// A custom modifier applied to the type that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CustomModifier {
    /// `modreq` when `true`, `modopt` otherwise
    pub required: bool,
    /// `TypeDef`, `TypeRef` or `TypeSpec` of the modifier type
    pub modifier: Token,
}

/// A type inside a signature blob (ECMA-335 II.23.2.12).
///
/// The enum is closed: every element type a blob can carry at type position has a variant, so
/// decoding, encoding and comparison are exhaustive matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[allow(missing_docs)]
pub enum TypeSignature {
    #[default]
    Void,
    Boolean,
    Char,
    I1,
    U1,
    I2,
    U2,
    I4,
    U4,
    I8,
    U8,
    R4,
    R8,
    String,
    /// Native sized signed integer
    I,
    /// Native sized unsigned integer
    U,
    Object,
    TypedByRef,
    /// Unmanaged pointer
    Ptr(Box<TypeSignature>),
    /// Managed pointer
    ByRef(Box<TypeSignature>),
    /// Pinned local
    Pinned(Box<TypeSignature>),
    /// Single dimensional, zero based array
    SzArray(Box<TypeSignature>),
    /// General array with an explicit shape
    Array(SignatureArray),
    /// `TypeDefOrRefOrSpecEncoded` value type
    ValueType(Token),
    /// `TypeDefOrRefOrSpecEncoded` reference type
    Class(Token),
    /// Generic parameter of the enclosing type (`!n`)
    GenericParamType(u32),
    /// Generic parameter of the enclosing method (`!!n`)
    GenericParamMethod(u32),
    /// Instantiation of a generic `Class` or `ValueType` with type arguments
    GenericInst(Box<TypeSignature>, Vec<TypeSignature>),
    /// A type carrying a custom modifier; modifiers stack outside-in
    Modified(CustomModifier, Box<TypeSignature>),
    /// Function pointer
    FnPtr(Box<SignatureMethod>),
}

impl TypeSignature {
    /// Strip all custom modifiers.
    #[must_use]
    pub fn unmodified(&self) -> &TypeSignature {
        let mut current = self;
        while let TypeSignature::Modified(_, inner) = current {
            current = inner;
        }
        current
    }

    /// Call `f` for every token embedded in this type, in blob order.
    pub fn for_each_token<F: FnMut(Token)>(&self, f: &mut F) {
        match self {
            TypeSignature::Ptr(inner)
            | TypeSignature::ByRef(inner)
            | TypeSignature::Pinned(inner)
            | TypeSignature::SzArray(inner) => inner.for_each_token(f),
            TypeSignature::Array(array) => array.base.for_each_token(f),
            TypeSignature::ValueType(token) | TypeSignature::Class(token) => f(*token),
            TypeSignature::GenericInst(base, args) => {
                base.for_each_token(f);
                for arg in args {
                    arg.for_each_token(f);
                }
            }
            TypeSignature::Modified(modifier, inner) => {
                f(modifier.modifier);
                inner.for_each_token(f);
            }
            TypeSignature::FnPtr(method) => method.for_each_token(f),
            _ => {}
        }
    }
}

/// Shape of a general array (ECMA-335 II.23.2.13).
///
/// Sizes and lower bounds are stored as the blob lists them; either list may be shorter than
/// the rank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SignatureArray {
    /// Element type
    pub base: Box<TypeSignature>,
    /// Number of dimensions
    pub rank: u32,
    /// Sizes of the leading dimensions
    pub sizes: Vec<u32>,
    /// Lower bounds of the leading dimensions
    pub lower_bounds: Vec<i32>,
}

/// One dimension of a [`SignatureArray`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArrayDimension {
    /// Size, if specified
    pub size: Option<u32>,
    /// Lower bound, if specified
    pub lower_bound: Option<i32>,
}

impl SignatureArray {
    /// Per-dimension view over sizes and lower bounds, one entry per rank.
    #[must_use]
    pub fn dimensions(&self) -> Vec<ArrayDimension> {
        (0..self.rank as usize)
            .map(|index| ArrayDimension {
                size: self.sizes.get(index).copied(),
                lower_bound: self.lower_bounds.get(index).copied(),
            })
            .collect()
    }
}

/// A parameter or return type of a method or property signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SignatureParameter {
    /// The parameter type, including custom modifiers and `ByRef`
    pub base: TypeSignature,
}

impl From<TypeSignature> for SignatureParameter {
    fn from(base: TypeSignature) -> Self {
        SignatureParameter { base }
    }
}

/// A method signature (`MethodDefSig`, `MethodRefSig`, `StandAloneMethodSig`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SignatureMethod {
    /// Instance method
    pub has_this: bool,
    /// The `this` pointer is the first explicit parameter
    pub explicit_this: bool,
    /// Calling convention kind
    pub calling_convention: CallingConvention,
    /// Number of generic parameters, `0` for non-generic methods
    pub generic_param_count: u32,
    /// Return type
    pub return_type: SignatureParameter,
    /// Fixed parameters in declaration order
    pub params: Vec<SignatureParameter>,
    /// Extra arguments after the vararg sentinel
    pub varargs: Vec<SignatureParameter>,
}

impl SignatureMethod {
    /// Call `f` for every token embedded in this signature, in blob order.
    pub fn for_each_token<F: FnMut(Token)>(&self, f: &mut F) {
        self.return_type.base.for_each_token(f);
        for param in self.params.iter().chain(self.varargs.iter()) {
            param.base.for_each_token(f);
        }
    }
}

/// A field signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SignatureField {
    /// Field type, including custom modifiers
    pub base: TypeSignature,
}

/// A property signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SignatureProperty {
    /// Instance property
    pub has_this: bool,
    /// Property type, including custom modifiers
    pub base: TypeSignature,
    /// Indexer parameters in declaration order
    pub params: Vec<SignatureParameter>,
}

/// A local variable signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SignatureLocalVariables {
    /// Local types, including `Pinned` and `ByRef`
    pub locals: Vec<TypeSignature>,
}

/// A type specification signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SignatureTypeSpec {
    /// The specified type
    pub base: TypeSignature,
}

/// A generic method instantiation signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SignatureMethodSpec {
    /// Type arguments in order
    pub generic_args: Vec<TypeSignature>,
}
