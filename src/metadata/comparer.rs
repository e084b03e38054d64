//! Structural equality of members and signatures across modules.
//!
//! Tokens are only meaningful inside the module that owns them, so two members living in
//! different [`Module`]s can never be compared by token or by reference. [`SignatureComparer`]
//! compares them by what they describe instead:
//!
//! - type definitions and type references compare nominally: resolution scope assembly,
//!   namespace, name and the chain of enclosing types
//! - type specifications compare by their signature
//! - methods and fields compare by name, declaring type and signature
//! - properties by name, declaring type and signature; events by name, declaring type and
//!   event type
//! - parameters by sequence, name and owning method; method instantiations by method and
//!   type arguments
//!
//! [`SignatureComparer::hash`] is consistent with [`SignatureComparer::equals`]: equal
//! descriptors hash equally, no matter which module instance they come from.
//!
//! # Examples
//!
//! ```rust
//! use dotgraft::metadata::comparer::{Descriptor, SignatureComparer};
//! use dotgraft::metadata::members::{AssemblyIdentity, TypeDef};
//! use dotgraft::metadata::module::Module;
//!
//! let identity = AssemblyIdentity { name: "Lib".to_string(), ..AssemblyIdentity::default() };
//! let mut first = Module::with_assembly("Lib.dll", identity.clone());
//! let mut second = Module::with_assembly("Lib.dll", identity);
//! let widget = TypeDef { namespace: "Lib".to_string(), name: "Widget".to_string(), ..TypeDef::default() };
//! let x = first.add_type_def(widget.clone());
//! let y = second.add_type_def(widget);
//!
//! let comparer = SignatureComparer::new();
//! let (x, y) = (Descriptor::new(&first, x), Descriptor::new(&second, y));
//! assert!(comparer.equals(Some(x), Some(y)));
//! assert_eq!(comparer.hash(Some(x)), comparer.hash(Some(y)));
//! ```

use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use bitflags::bitflags;

use crate::metadata::{
    members::{AssemblyIdentity, MemberRefSignature, StandAloneSignature},
    module::{MemberDescriptor, Module},
    signatures::{
        CustomModifier, SignatureArray, SignatureField, SignatureLocalVariables,
        SignatureMethod, SignatureMethodSpec, SignatureParameter, SignatureProperty,
        TypeSignature, MAX_RECURSION_DEPTH,
    },
    tables::TableId,
    token::Token,
};

/// Hash of an absent descriptor or signature.
pub const NULL_HASH: u64 = 0;

const HASH_MULTIPLIER: u64 = 397;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Options relaxing the comparison of assembly identities
    pub struct ComparerFlags: u32 {
        /// Ignore assembly versions
        const VERSION_AGNOSTIC = 0x0001;
        /// Ignore public key tokens
        const PUBLIC_KEY_AGNOSTIC = 0x0002;
    }
}

/// A member of a specific module.
#[derive(Debug, Clone, Copy)]
pub struct Descriptor<'a> {
    /// Owning module
    pub module: &'a Module,
    /// Token within `module`
    pub token: Token,
}

impl<'a> Descriptor<'a> {
    /// Create a new descriptor.
    #[must_use]
    pub fn new(module: &'a Module, token: Token) -> Self {
        Descriptor { module, token }
    }
}

/// Resolution scope of a nominal type.
#[derive(Debug, Clone)]
enum Scope {
    Assembly(AssemblyIdentity),
    Module(String),
}

/// A type definition or reference reduced to the parts that identify it.
#[derive(Debug, Clone)]
struct NominalType {
    scope: Scope,
    /// `(namespace, name)` pairs, outermost type first
    path: Vec<(String, String)>,
}

/// Kind of member a descriptor denotes, independent of definition or reference.
enum Member<'a> {
    Type(NominalType),
    TypeSpec(&'a TypeSignature),
    Method {
        name: &'a str,
        declaring: Option<Token>,
        signature: &'a SignatureMethod,
    },
    Field {
        name: &'a str,
        declaring: Option<Token>,
        signature: &'a SignatureField,
    },
    Property {
        name: &'a str,
        declaring: Option<Token>,
        signature: &'a SignatureProperty,
    },
    Event {
        name: &'a str,
        declaring: Option<Token>,
        event_type: Token,
    },
    Param {
        sequence: u16,
        name: &'a str,
        method: Token,
    },
    MethodSpec {
        method: Token,
        instantiation: &'a SignatureMethodSpec,
    },
    Scope(Scope),
    LocalVariables(&'a SignatureLocalVariables),
    StandAloneMethod(&'a SignatureMethod),
}

/// Stateless structural comparer for members and signatures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignatureComparer {
    flags: ComparerFlags,
}

fn combine(hash: u64, next: u64) -> u64 {
    hash.wrapping_mul(HASH_MULTIPLIER) ^ next
}

fn hash_str(value: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn hash_folded(value: &str) -> u64 {
    hash_str(&value.to_ascii_lowercase())
}

impl SignatureComparer {
    /// Create a comparer with strict assembly identity checks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a comparer with the given options.
    #[must_use]
    pub fn with_flags(flags: ComparerFlags) -> Self {
        SignatureComparer { flags }
    }

    /// The active options.
    #[must_use]
    pub fn flags(&self) -> ComparerFlags {
        self.flags
    }

    /// Compare two descriptors.
    ///
    /// `None` only equals `None`. A descriptor whose token doesn't resolve in its module
    /// equals nothing.
    #[must_use]
    pub fn equals(&self, x: Option<Descriptor>, y: Option<Descriptor>) -> bool {
        match (x, y) {
            (None, None) => true,
            (Some(x), Some(y)) => self.descriptor_equals(x.module, x.token, y.module, y.token, 0),
            _ => false,
        }
    }

    /// Hash a descriptor consistently with [`SignatureComparer::equals`].
    #[must_use]
    pub fn hash(&self, x: Option<Descriptor>) -> u64 {
        match x {
            None => NULL_HASH,
            Some(x) => self.descriptor_hash(x.module, x.token, 0),
        }
    }

    /// Compare two type signatures living in `x_module` and `y_module`.
    #[must_use]
    pub fn type_signature_equals(
        &self,
        x_module: &Module,
        x: &TypeSignature,
        y_module: &Module,
        y: &TypeSignature,
    ) -> bool {
        self.type_equals(x_module, x, y_module, y, 0)
    }

    /// Hash a type signature living in `module`.
    #[must_use]
    pub fn type_signature_hash(&self, module: &Module, signature: &TypeSignature) -> u64 {
        self.type_hash(module, signature, 0)
    }

    /// Compare two method signatures living in `x_module` and `y_module`.
    #[must_use]
    pub fn method_signature_equals(
        &self,
        x_module: &Module,
        x: &SignatureMethod,
        y_module: &Module,
        y: &SignatureMethod,
    ) -> bool {
        self.method_equals(x_module, x, y_module, y, 0)
    }

    /// Hash a method signature living in `module`.
    #[must_use]
    pub fn method_signature_hash(&self, module: &Module, signature: &SignatureMethod) -> u64 {
        self.method_hash(module, signature, 0)
    }

    /// Compare two field signatures living in `x_module` and `y_module`.
    #[must_use]
    pub fn field_signature_equals(
        &self,
        x_module: &Module,
        x: &SignatureField,
        y_module: &Module,
        y: &SignatureField,
    ) -> bool {
        self.type_equals(x_module, &x.base, y_module, &y.base, 0)
    }

    /// Hash a field signature living in `module`.
    #[must_use]
    pub fn field_signature_hash(&self, module: &Module, signature: &SignatureField) -> u64 {
        self.type_hash(module, &signature.base, 0)
    }

    fn member<'m>(module: &'m Module, token: Token, depth: usize) -> Option<Member<'m>> {
        if depth >= MAX_RECURSION_DEPTH {
            return None;
        }

        if token == Module::SELF_TOKEN {
            return Some(Member::Scope(Self::module_scope(module)));
        }

        let member = match module.member(token).ok()? {
            MemberDescriptor::TypeDef(_) | MemberDescriptor::TypeRef(_) => {
                Member::Type(Self::nominal(module, token, depth)?)
            }
            MemberDescriptor::TypeSpec(row) => Member::TypeSpec(&row.signature),
            MemberDescriptor::MethodDef(row) => Member::Method {
                name: &row.name,
                declaring: row.declaring_type,
                signature: &row.signature,
            },
            MemberDescriptor::FieldDef(row) => Member::Field {
                name: &row.name,
                declaring: row.declaring_type,
                signature: &row.signature,
            },
            MemberDescriptor::MemberRef(row) => {
                let declaring = Self::member_ref_parent(module, row.class);
                match &row.signature {
                    MemberRefSignature::Method(signature) => Member::Method {
                        name: &row.name,
                        declaring,
                        signature,
                    },
                    MemberRefSignature::Field(signature) => Member::Field {
                        name: &row.name,
                        declaring,
                        signature,
                    },
                }
            }
            MemberDescriptor::PropertyDef(row) => Member::Property {
                name: &row.name,
                declaring: row.declaring_type,
                signature: &row.signature,
            },
            MemberDescriptor::EventDef(row) => Member::Event {
                name: &row.name,
                declaring: row.declaring_type,
                event_type: row.event_type,
            },
            MemberDescriptor::ParamDef(row) => Member::Param {
                sequence: row.sequence,
                name: &row.name,
                method: row.method,
            },
            MemberDescriptor::MethodSpec(row) => Member::MethodSpec {
                method: row.method,
                instantiation: &row.instantiation,
            },
            MemberDescriptor::AssemblyRef(row) => Member::Scope(Scope::Assembly(row.identity())),
            MemberDescriptor::ModuleRef(_) => Member::Scope(Self::module_scope(module)),
            MemberDescriptor::StandAloneSig(StandAloneSignature::Locals(locals)) => {
                Member::LocalVariables(locals)
            }
            MemberDescriptor::StandAloneSig(StandAloneSignature::Method(signature)) => {
                Member::StandAloneMethod(signature)
            }
        };
        Some(member)
    }

    /// Declaring type of a `MemberRef` parent; `None` for global members of a `ModuleRef`.
    fn member_ref_parent(module: &Module, class: Token) -> Option<Token> {
        match class.table_id() {
            Some(TableId::MethodDef) => module
                .method_def(class)
                .ok()
                .and_then(|method| method.declaring_type),
            Some(TableId::ModuleRef) => None,
            _ => Some(class),
        }
    }

    fn module_scope(module: &Module) -> Scope {
        match &module.assembly {
            Some(identity) => Scope::Assembly(identity.clone()),
            None => Scope::Module(module.name.clone()),
        }
    }

    fn nominal(module: &Module, token: Token, depth: usize) -> Option<NominalType> {
        if depth >= MAX_RECURSION_DEPTH {
            return None;
        }

        match token.table_id()? {
            TableId::TypeDef => {
                let row = module.type_def(token).ok()?;
                let mut nominal = match row.declaring_type {
                    Some(enclosing) => Self::nominal(module, enclosing, depth + 1)?,
                    None => NominalType {
                        scope: Self::module_scope(module),
                        path: Vec::new(),
                    },
                };
                nominal.path.push((row.namespace.clone(), row.name.clone()));
                Some(nominal)
            }
            TableId::TypeRef => {
                let row = module.type_ref(token).ok()?;
                let scope = row.resolution_scope;
                let mut nominal = match scope.table_id() {
                    Some(TableId::TypeRef) => Self::nominal(module, scope, depth + 1)?,
                    Some(TableId::AssemblyRef) => NominalType {
                        scope: Scope::Assembly(module.assembly_ref(scope).ok()?.identity()),
                        path: Vec::new(),
                    },
                    _ => NominalType {
                        scope: Self::module_scope(module),
                        path: Vec::new(),
                    },
                };
                nominal.path.push((row.namespace.clone(), row.name.clone()));
                Some(nominal)
            }
            _ => None,
        }
    }

    /// Compare two assembly identities.
    ///
    /// Names and cultures compare case-insensitively; versions and public key tokens are
    /// skipped as configured by the [`ComparerFlags`].
    #[must_use]
    pub fn assembly_equals(&self, x: &AssemblyIdentity, y: &AssemblyIdentity) -> bool {
        x.name.eq_ignore_ascii_case(&y.name)
            && x.culture.eq_ignore_ascii_case(&y.culture)
            && (self.flags.contains(ComparerFlags::VERSION_AGNOSTIC) || x.version == y.version)
            && (self.flags.contains(ComparerFlags::PUBLIC_KEY_AGNOSTIC)
                || x.public_key_token == y.public_key_token)
    }

    fn scope_equals(&self, x: &Scope, y: &Scope) -> bool {
        match (x, y) {
            (Scope::Assembly(x), Scope::Assembly(y)) => self.assembly_equals(x, y),
            (Scope::Module(x), Scope::Module(y)) => x.eq_ignore_ascii_case(y),
            _ => false,
        }
    }

    fn scope_hash(&self, scope: &Scope) -> u64 {
        match scope {
            Scope::Assembly(identity) => {
                let mut hash = hash_folded(&identity.name);
                hash = combine(hash, hash_folded(&identity.culture));
                if !self.flags.contains(ComparerFlags::VERSION_AGNOSTIC) {
                    let mut hasher = DefaultHasher::new();
                    identity.version.hash(&mut hasher);
                    hash = combine(hash, hasher.finish());
                }
                if !self.flags.contains(ComparerFlags::PUBLIC_KEY_AGNOSTIC) {
                    let mut hasher = DefaultHasher::new();
                    identity.public_key_token.hash(&mut hasher);
                    hash = combine(hash, hasher.finish());
                }
                hash
            }
            Scope::Module(name) => combine(1, hash_folded(name)),
        }
    }

    fn nominal_equals(&self, x: &NominalType, y: &NominalType) -> bool {
        x.path == y.path && self.scope_equals(&x.scope, &y.scope)
    }

    fn nominal_hash(&self, nominal: &NominalType) -> u64 {
        nominal
            .path
            .iter()
            .fold(self.scope_hash(&nominal.scope), |hash, (namespace, name)| {
                combine(combine(hash, hash_str(namespace)), hash_str(name))
            })
    }

    fn token_equals(
        &self,
        x_module: &Module,
        x: Option<Token>,
        y_module: &Module,
        y: Option<Token>,
        depth: usize,
    ) -> bool {
        match (x, y) {
            (None, None) => true,
            (Some(x), Some(y)) => self.descriptor_equals(x_module, x, y_module, y, depth + 1),
            _ => false,
        }
    }

    fn token_hash(&self, module: &Module, token: Option<Token>, depth: usize) -> u64 {
        match token {
            None => NULL_HASH,
            Some(token) => self.descriptor_hash(module, token, depth + 1),
        }
    }

    fn descriptor_equals(
        &self,
        x_module: &Module,
        x: Token,
        y_module: &Module,
        y: Token,
        depth: usize,
    ) -> bool {
        let (Some(x_member), Some(y_member)) = (
            Self::member(x_module, x, depth),
            Self::member(y_module, y, depth),
        ) else {
            return false;
        };

        let depth = depth + 1;
        match (x_member, y_member) {
            (Member::Type(x), Member::Type(y)) => self.nominal_equals(&x, &y),
            (Member::TypeSpec(x), Member::TypeSpec(y)) => {
                self.type_equals(x_module, x, y_module, y, depth)
            }
            (
                Member::Method {
                    name: x_name,
                    declaring: x_declaring,
                    signature: x_signature,
                },
                Member::Method {
                    name: y_name,
                    declaring: y_declaring,
                    signature: y_signature,
                },
            ) => {
                x_name == y_name
                    && self.token_equals(x_module, x_declaring, y_module, y_declaring, depth)
                    && self.method_equals(x_module, x_signature, y_module, y_signature, depth)
            }
            (
                Member::Field {
                    name: x_name,
                    declaring: x_declaring,
                    signature: x_signature,
                },
                Member::Field {
                    name: y_name,
                    declaring: y_declaring,
                    signature: y_signature,
                },
            ) => {
                x_name == y_name
                    && self.token_equals(x_module, x_declaring, y_module, y_declaring, depth)
                    && self.type_equals(
                        x_module,
                        &x_signature.base,
                        y_module,
                        &y_signature.base,
                        depth,
                    )
            }
            (
                Member::Property {
                    name: x_name,
                    declaring: x_declaring,
                    signature: x_signature,
                },
                Member::Property {
                    name: y_name,
                    declaring: y_declaring,
                    signature: y_signature,
                },
            ) => {
                x_name == y_name
                    && self.token_equals(x_module, x_declaring, y_module, y_declaring, depth)
                    && self.property_equals(x_module, x_signature, y_module, y_signature, depth)
            }
            (
                Member::Event {
                    name: x_name,
                    declaring: x_declaring,
                    event_type: x_type,
                },
                Member::Event {
                    name: y_name,
                    declaring: y_declaring,
                    event_type: y_type,
                },
            ) => {
                x_name == y_name
                    && self.token_equals(x_module, x_declaring, y_module, y_declaring, depth)
                    && self.token_equals(x_module, Some(x_type), y_module, Some(y_type), depth)
            }
            (
                Member::Param {
                    sequence: x_sequence,
                    name: x_name,
                    method: x_method,
                },
                Member::Param {
                    sequence: y_sequence,
                    name: y_name,
                    method: y_method,
                },
            ) => {
                x_sequence == y_sequence
                    && x_name == y_name
                    && self.token_equals(x_module, Some(x_method), y_module, Some(y_method), depth)
            }
            (
                Member::MethodSpec {
                    method: x_method,
                    instantiation: x_args,
                },
                Member::MethodSpec {
                    method: y_method,
                    instantiation: y_args,
                },
            ) => {
                self.token_equals(x_module, Some(x_method), y_module, Some(y_method), depth)
                    && self.types_equal(
                        x_module,
                        &x_args.generic_args,
                        y_module,
                        &y_args.generic_args,
                        depth,
                    )
            }
            (Member::Scope(x), Member::Scope(y)) => self.scope_equals(&x, &y),
            (Member::LocalVariables(x), Member::LocalVariables(y)) => {
                self.types_equal(x_module, &x.locals, y_module, &y.locals, depth)
            }
            (Member::StandAloneMethod(x), Member::StandAloneMethod(y)) => {
                self.method_equals(x_module, x, y_module, y, depth)
            }
            _ => false,
        }
    }

    fn descriptor_hash(&self, module: &Module, token: Token, depth: usize) -> u64 {
        let Some(member) = Self::member(module, token, depth) else {
            return NULL_HASH;
        };

        let depth = depth + 1;
        match member {
            Member::Type(nominal) => self.nominal_hash(&nominal),
            Member::TypeSpec(signature) => self.type_hash(module, signature, depth),
            Member::Method {
                name,
                declaring,
                signature,
            } => {
                let hash = combine(hash_str(name), self.token_hash(module, declaring, depth));
                combine(hash, self.method_hash(module, signature, depth))
            }
            Member::Field {
                name,
                declaring,
                signature,
            } => {
                let hash = combine(hash_str(name), self.token_hash(module, declaring, depth));
                combine(hash, self.type_hash(module, &signature.base, depth))
            }
            Member::Property {
                name,
                declaring,
                signature,
            } => {
                let hash = combine(hash_str(name), self.token_hash(module, declaring, depth));
                combine(hash, self.property_hash(module, signature, depth))
            }
            Member::Event {
                name,
                declaring,
                event_type,
            } => {
                let hash = combine(hash_str(name), self.token_hash(module, declaring, depth));
                combine(hash, self.token_hash(module, Some(event_type), depth))
            }
            Member::Param {
                sequence,
                name,
                method,
            } => {
                let hash = combine(u64::from(sequence), hash_str(name));
                combine(hash, self.token_hash(module, Some(method), depth))
            }
            Member::MethodSpec {
                method,
                instantiation,
            } => combine(
                self.token_hash(module, Some(method), depth),
                self.types_hash(module, &instantiation.generic_args, depth),
            ),
            Member::Scope(scope) => self.scope_hash(&scope),
            Member::LocalVariables(locals) => self.types_hash(module, &locals.locals, depth),
            Member::StandAloneMethod(signature) => self.method_hash(module, signature, depth),
        }
    }

    fn types_equal(
        &self,
        x_module: &Module,
        x: &[TypeSignature],
        y_module: &Module,
        y: &[TypeSignature],
        depth: usize,
    ) -> bool {
        x.len() == y.len()
            && x.iter()
                .zip(y)
                .all(|(x, y)| self.type_equals(x_module, x, y_module, y, depth))
    }

    fn types_hash(&self, module: &Module, types: &[TypeSignature], depth: usize) -> u64 {
        types.iter().fold(types.len() as u64, |hash, signature| {
            combine(hash, self.type_hash(module, signature, depth))
        })
    }

    fn params_equal(
        &self,
        x_module: &Module,
        x: &[SignatureParameter],
        y_module: &Module,
        y: &[SignatureParameter],
        depth: usize,
    ) -> bool {
        x.len() == y.len()
            && x.iter()
                .zip(y)
                .all(|(x, y)| self.type_equals(x_module, &x.base, y_module, &y.base, depth))
    }

    fn params_hash(&self, module: &Module, params: &[SignatureParameter], depth: usize) -> u64 {
        params.iter().fold(params.len() as u64, |hash, param| {
            combine(hash, self.type_hash(module, &param.base, depth))
        })
    }

    fn method_equals(
        &self,
        x_module: &Module,
        x: &SignatureMethod,
        y_module: &Module,
        y: &SignatureMethod,
        depth: usize,
    ) -> bool {
        x.has_this == y.has_this
            && x.explicit_this == y.explicit_this
            && x.calling_convention == y.calling_convention
            && x.generic_param_count == y.generic_param_count
            && self.type_equals(
                x_module,
                &x.return_type.base,
                y_module,
                &y.return_type.base,
                depth,
            )
            && self.params_equal(x_module, &x.params, y_module, &y.params, depth)
            && self.params_equal(x_module, &x.varargs, y_module, &y.varargs, depth)
    }

    fn method_hash(&self, module: &Module, signature: &SignatureMethod, depth: usize) -> u64 {
        let mut hash = u64::from(signature.calling_convention as u8)
            | (u64::from(signature.has_this) << 8)
            | (u64::from(signature.explicit_this) << 9);
        hash = combine(hash, u64::from(signature.generic_param_count));
        hash = combine(hash, self.type_hash(module, &signature.return_type.base, depth));
        hash = combine(hash, self.params_hash(module, &signature.params, depth));
        combine(hash, self.params_hash(module, &signature.varargs, depth))
    }

    fn property_equals(
        &self,
        x_module: &Module,
        x: &SignatureProperty,
        y_module: &Module,
        y: &SignatureProperty,
        depth: usize,
    ) -> bool {
        x.has_this == y.has_this
            && self.type_equals(x_module, &x.base, y_module, &y.base, depth)
            && self.params_equal(x_module, &x.params, y_module, &y.params, depth)
    }

    fn property_hash(&self, module: &Module, signature: &SignatureProperty, depth: usize) -> u64 {
        let hash = combine(
            u64::from(signature.has_this),
            self.type_hash(module, &signature.base, depth),
        );
        combine(hash, self.params_hash(module, &signature.params, depth))
    }

    fn modifier_equals(
        &self,
        x_module: &Module,
        x: &CustomModifier,
        y_module: &Module,
        y: &CustomModifier,
        depth: usize,
    ) -> bool {
        x.required == y.required
            && self.descriptor_equals(x_module, x.modifier, y_module, y.modifier, depth)
    }

    fn array_equals(
        &self,
        x_module: &Module,
        x: &SignatureArray,
        y_module: &Module,
        y: &SignatureArray,
        depth: usize,
    ) -> bool {
        x.rank == y.rank
            && x.sizes == y.sizes
            && x.lower_bounds == y.lower_bounds
            && self.type_equals(x_module, &x.base, y_module, &y.base, depth)
    }

    fn type_equals(
        &self,
        x_module: &Module,
        x: &TypeSignature,
        y_module: &Module,
        y: &TypeSignature,
        depth: usize,
    ) -> bool {
        if depth >= MAX_RECURSION_DEPTH {
            return false;
        }

        let depth = depth + 1;
        match (x, y) {
            (TypeSignature::Ptr(x), TypeSignature::Ptr(y))
            | (TypeSignature::ByRef(x), TypeSignature::ByRef(y))
            | (TypeSignature::Pinned(x), TypeSignature::Pinned(y))
            | (TypeSignature::SzArray(x), TypeSignature::SzArray(y)) => {
                self.type_equals(x_module, x, y_module, y, depth)
            }
            (TypeSignature::Array(x), TypeSignature::Array(y)) => {
                self.array_equals(x_module, x, y_module, y, depth)
            }
            (TypeSignature::ValueType(x), TypeSignature::ValueType(y))
            | (TypeSignature::Class(x), TypeSignature::Class(y)) => {
                self.descriptor_equals(x_module, *x, y_module, *y, depth)
            }
            (
                TypeSignature::GenericInst(x_base, x_args),
                TypeSignature::GenericInst(y_base, y_args),
            ) => {
                self.type_equals(x_module, x_base, y_module, y_base, depth)
                    && self.types_equal(x_module, x_args, y_module, y_args, depth)
            }
            (TypeSignature::Modified(x_modifier, x), TypeSignature::Modified(y_modifier, y)) => {
                self.modifier_equals(x_module, x_modifier, y_module, y_modifier, depth)
                    && self.type_equals(x_module, x, y_module, y, depth)
            }
            (TypeSignature::FnPtr(x), TypeSignature::FnPtr(y)) => {
                self.method_equals(x_module, x, y_module, y, depth)
            }
            (TypeSignature::GenericParamType(x), TypeSignature::GenericParamType(y))
            | (TypeSignature::GenericParamMethod(x), TypeSignature::GenericParamMethod(y)) => {
                x == y
            }
            (x, y) => is_leaf(x) && x == y,
        }
    }

    fn type_hash(&self, module: &Module, signature: &TypeSignature, depth: usize) -> u64 {
        if depth >= MAX_RECURSION_DEPTH {
            return NULL_HASH;
        }

        let depth = depth + 1;
        let kind = std::mem::discriminant(signature);
        let mut hasher = DefaultHasher::new();
        kind.hash(&mut hasher);
        let hash = hasher.finish();

        match signature {
            TypeSignature::Ptr(inner)
            | TypeSignature::ByRef(inner)
            | TypeSignature::Pinned(inner)
            | TypeSignature::SzArray(inner) => combine(hash, self.type_hash(module, inner, depth)),
            TypeSignature::Array(array) => {
                let mut hash = combine(hash, u64::from(array.rank));
                hash = combine(hash, array.sizes.len() as u64);
                hash = combine(hash, array.lower_bounds.len() as u64);
                combine(hash, self.type_hash(module, &array.base, depth))
            }
            TypeSignature::ValueType(token) | TypeSignature::Class(token) => {
                combine(hash, self.descriptor_hash(module, *token, depth))
            }
            TypeSignature::GenericInst(base, args) => {
                let hash = combine(hash, self.type_hash(module, base, depth));
                combine(hash, self.types_hash(module, args, depth))
            }
            TypeSignature::Modified(modifier, inner) => {
                let hash = combine(hash, u64::from(modifier.required));
                let hash = combine(hash, self.descriptor_hash(module, modifier.modifier, depth));
                combine(hash, self.type_hash(module, inner, depth))
            }
            TypeSignature::FnPtr(method) => combine(hash, self.method_hash(module, method, depth)),
            TypeSignature::GenericParamType(index) | TypeSignature::GenericParamMethod(index) => {
                combine(hash, u64::from(*index))
            }
            _ => hash,
        }
    }
}

/// Element types without embedded tokens or nested types.
fn is_leaf(signature: &TypeSignature) -> bool {
    !matches!(
        signature,
        TypeSignature::Ptr(_)
            | TypeSignature::ByRef(_)
            | TypeSignature::Pinned(_)
            | TypeSignature::SzArray(_)
            | TypeSignature::Array(_)
            | TypeSignature::ValueType(_)
            | TypeSignature::Class(_)
            | TypeSignature::GenericParamType(_)
            | TypeSignature::GenericParamMethod(_)
            | TypeSignature::GenericInst(..)
            | TypeSignature::Modified(..)
            | TypeSignature::FnPtr(_)
    )
}
