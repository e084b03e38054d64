//! In-memory module: token addressed tables of member definitions and references.
//!
//! A [`Module`] owns one table per member kind. Rows are addressed by [`Token`]s whose table
//! byte selects the table and whose row is the 1-based position within it. Every lookup is
//! range checked and fails with [`crate::Error::TokenNotFound`].
//!
//! Modules only grow: rows are appended by the `add_*` methods and never removed, except by
//! [`Module::rollback`] which restores the row counts of an earlier [`ModuleCheckpoint`].
//!
//! # Examples
//!
//! ```rust
//! use dotgraft::metadata::module::Module;
//! use dotgraft::metadata::members::TypeDef;
//!
//! let mut module = Module::new("Library.dll");
//! let token = module.add_type_def(TypeDef {
//!     namespace: "Library".to_string(),
//!     name: "Widget".to_string(),
//!     ..TypeDef::default()
//! });
//!
//! assert_eq!(module.type_def(token)?.name, "Widget");
//! assert!(module.type_def(dotgraft::metadata::token::Token::new(0x0200_0002)).is_err());
//! # Ok::<(), dotgraft::Error>(())
//! ```

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::{
    metadata::{
        members::{
            AssemblyIdentity, AssemblyRef, CustomAttribute, EventDef, FieldDef, MemberRef,
            MethodDef, MethodSpec, ModuleRef, ParamDef, PropertyDef, StandAloneSignature, TypeDef,
            TypeRef, TypeSpec,
        },
        streams::{UserStringHeapBuilder, UserStrings},
        tables::TableId,
        token::Token,
    },
    Error::TokenNotFound,
    Result,
};

static NEXT_MODULE_ID: AtomicU64 = AtomicU64::new(1);

/// Process unique identity of a [`Module`] instance.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct ModuleId(u64);

impl ModuleId {
    fn next() -> Self {
        ModuleId(NEXT_MODULE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module#{}", self.0)
    }
}

/// A member of a specific module instance, used to seed the cloner.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct MemberHandle {
    /// Owning module
    pub module: ModuleId,
    /// Token within the owning module
    pub token: Token,
}

/// Borrowed view of any row of a module.
#[derive(Debug, Clone, Copy)]
pub enum MemberDescriptor<'a> {
    /// A type definition
    TypeDef(&'a TypeDef),
    /// A type reference
    TypeRef(&'a TypeRef),
    /// A constructed type
    TypeSpec(&'a TypeSpec),
    /// A method definition
    MethodDef(&'a MethodDef),
    /// A field definition
    FieldDef(&'a FieldDef),
    /// A parameter definition
    ParamDef(&'a ParamDef),
    /// A property definition
    PropertyDef(&'a PropertyDef),
    /// An event definition
    EventDef(&'a EventDef),
    /// A member reference
    MemberRef(&'a MemberRef),
    /// A generic method instantiation
    MethodSpec(&'a MethodSpec),
    /// An assembly reference
    AssemblyRef(&'a AssemblyRef),
    /// A module reference
    ModuleRef(&'a ModuleRef),
    /// A stand-alone signature
    StandAloneSig(&'a StandAloneSignature),
}

impl MemberDescriptor<'_> {
    /// Name of the member, if the kind carries one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            MemberDescriptor::TypeDef(row) => Some(&row.name),
            MemberDescriptor::TypeRef(row) => Some(&row.name),
            MemberDescriptor::MethodDef(row) => Some(&row.name),
            MemberDescriptor::FieldDef(row) => Some(&row.name),
            MemberDescriptor::ParamDef(row) => Some(&row.name),
            MemberDescriptor::PropertyDef(row) => Some(&row.name),
            MemberDescriptor::EventDef(row) => Some(&row.name),
            MemberDescriptor::MemberRef(row) => Some(&row.name),
            MemberDescriptor::AssemblyRef(row) => Some(&row.name),
            MemberDescriptor::ModuleRef(row) => Some(&row.name),
            MemberDescriptor::TypeSpec(_)
            | MemberDescriptor::MethodSpec(_)
            | MemberDescriptor::StandAloneSig(_) => None,
        }
    }
}

/// Row counts of every table of a module at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCheckpoint {
    module: ModuleId,
    type_defs: usize,
    type_refs: usize,
    type_specs: usize,
    method_defs: usize,
    field_defs: usize,
    param_defs: usize,
    property_defs: usize,
    event_defs: usize,
    member_refs: usize,
    method_specs: usize,
    assembly_refs: usize,
    module_refs: usize,
    stand_alone_sigs: usize,
    custom_attributes: usize,
    user_strings: usize,
    top_level_types: usize,
}

/// An in-memory .NET module.
#[derive(Debug)]
pub struct Module {
    id: ModuleId,
    /// File name of the module
    pub name: String,
    /// Assembly the module belongs to, `None` for netmodules
    pub assembly: Option<AssemblyIdentity>,
    type_defs: Vec<TypeDef>,
    type_refs: Vec<TypeRef>,
    type_specs: Vec<TypeSpec>,
    method_defs: Vec<MethodDef>,
    field_defs: Vec<FieldDef>,
    param_defs: Vec<ParamDef>,
    property_defs: Vec<PropertyDef>,
    event_defs: Vec<EventDef>,
    member_refs: Vec<MemberRef>,
    method_specs: Vec<MethodSpec>,
    assembly_refs: Vec<AssemblyRef>,
    module_refs: Vec<ModuleRef>,
    stand_alone_sigs: Vec<StandAloneSignature>,
    custom_attributes: Vec<CustomAttribute>,
    user_strings: UserStringHeapBuilder,
    top_level_types: Vec<Token>,
}

/// Generates the lookup, mutable lookup, append and iteration methods of one table.
macro_rules! module_table {
    ($field:ident, $row:ty, $table:ident, $get:ident, $get_mut:ident, $add:ident $(,)?) => {
        #[doc = concat!("Look up a `", stringify!($table), "` row.")]
        ///
        /// # Errors
        /// Returns [`crate::Error::TokenNotFound`] if the token is not a row of this table.
        pub fn $get(&self, token: Token) -> Result<&$row> {
            let index = Self::row_index(token, TableId::$table, self.$field.len())?;
            Ok(&self.$field[index])
        }

        #[doc = concat!("Look up a `", stringify!($table), "` row for modification.")]
        ///
        /// # Errors
        /// Returns [`crate::Error::TokenNotFound`] if the token is not a row of this table.
        pub fn $get_mut(&mut self, token: Token) -> Result<&mut $row> {
            let index = Self::row_index(token, TableId::$table, self.$field.len())?;
            Ok(&mut self.$field[index])
        }

        #[doc = concat!("Append a `", stringify!($table), "` row and return its token.")]
        #[allow(clippy::cast_possible_truncation)]
        pub fn $add(&mut self, row: $row) -> Token {
            self.$field.push(row);
            Token::from_parts(TableId::$table, self.$field.len() as u32)
        }

        #[doc = concat!("All `", stringify!($table), "` rows with their tokens.")]
        #[allow(clippy::cast_possible_truncation)]
        pub fn $field(&self) -> impl Iterator<Item = (Token, &$row)> + '_ {
            self.$field
                .iter()
                .enumerate()
                .map(|(index, row)| (Token::from_parts(TableId::$table, index as u32 + 1), row))
        }
    };
}

impl Module {
    /// Token of the module itself, the `Module` resolution scope.
    pub const SELF_TOKEN: Token = Token(0x0000_0001);

    /// Create an empty module without an assembly.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Module {
            id: ModuleId::next(),
            name: name.to_string(),
            assembly: None,
            type_defs: Vec::new(),
            type_refs: Vec::new(),
            type_specs: Vec::new(),
            method_defs: Vec::new(),
            field_defs: Vec::new(),
            param_defs: Vec::new(),
            property_defs: Vec::new(),
            event_defs: Vec::new(),
            member_refs: Vec::new(),
            method_specs: Vec::new(),
            assembly_refs: Vec::new(),
            module_refs: Vec::new(),
            stand_alone_sigs: Vec::new(),
            custom_attributes: Vec::new(),
            user_strings: UserStringHeapBuilder::new(),
            top_level_types: Vec::new(),
        }
    }

    /// Create an empty module belonging to `assembly`.
    #[must_use]
    pub fn with_assembly(name: &str, assembly: AssemblyIdentity) -> Self {
        let mut module = Module::new(name);
        module.assembly = Some(assembly);
        module
    }

    /// Identity of this instance.
    #[must_use]
    pub fn id(&self) -> ModuleId {
        self.id
    }

    fn row_index(token: Token, table: TableId, len: usize) -> Result<usize> {
        let row = token.row() as usize;
        if !token.is_table(table) || row == 0 || row > len {
            return Err(TokenNotFound(token));
        }
        Ok(row - 1)
    }

    module_table!(type_defs, TypeDef, TypeDef, type_def, type_def_mut, add_type_def);
    module_table!(type_refs, TypeRef, TypeRef, type_ref, type_ref_mut, add_type_ref);
    module_table!(type_specs, TypeSpec, TypeSpec, type_spec, type_spec_mut, add_type_spec);
    module_table!(method_defs, MethodDef, MethodDef, method_def, method_def_mut, add_method_def);
    module_table!(field_defs, FieldDef, Field, field_def, field_def_mut, add_field_def);
    module_table!(param_defs, ParamDef, Param, param_def, param_def_mut, add_param_def);
    module_table!(
        property_defs,
        PropertyDef,
        Property,
        property_def,
        property_def_mut,
        add_property_def,
    );
    module_table!(event_defs, EventDef, Event, event_def, event_def_mut, add_event_def);
    module_table!(member_refs, MemberRef, MemberRef, member_ref, member_ref_mut, add_member_ref);
    module_table!(
        method_specs,
        MethodSpec,
        MethodSpec,
        method_spec,
        method_spec_mut,
        add_method_spec,
    );
    module_table!(
        assembly_refs,
        AssemblyRef,
        AssemblyRef,
        assembly_ref,
        assembly_ref_mut,
        add_assembly_ref,
    );
    module_table!(module_refs, ModuleRef, ModuleRef, module_ref, module_ref_mut, add_module_ref);
    module_table!(
        stand_alone_sigs,
        StandAloneSignature,
        StandAloneSig,
        stand_alone_sig,
        stand_alone_sig_mut,
        add_stand_alone_sig,
    );
    module_table!(
        custom_attributes,
        CustomAttribute,
        CustomAttribute,
        custom_attribute,
        custom_attribute_mut,
        add_custom_attribute,
    );

    /// Number of rows in `table`, `0` for tables this model doesn't hold.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn row_count(&self, table: TableId) -> u32 {
        let count = match table {
            TableId::Module => 1,
            TableId::TypeDef => self.type_defs.len(),
            TableId::TypeRef => self.type_refs.len(),
            TableId::TypeSpec => self.type_specs.len(),
            TableId::MethodDef => self.method_defs.len(),
            TableId::Field => self.field_defs.len(),
            TableId::Param => self.param_defs.len(),
            TableId::Property => self.property_defs.len(),
            TableId::Event => self.event_defs.len(),
            TableId::MemberRef => self.member_refs.len(),
            TableId::MethodSpec => self.method_specs.len(),
            TableId::AssemblyRef => self.assembly_refs.len(),
            TableId::ModuleRef => self.module_refs.len(),
            TableId::StandAloneSig => self.stand_alone_sigs.len(),
            TableId::CustomAttribute => self.custom_attributes.len(),
            TableId::NestedClass => self
                .type_defs
                .iter()
                .filter(|row| row.declaring_type.is_some())
                .count(),
            _ => 0,
        };
        count as u32
    }

    /// Whether `token` addresses an existing row, or the module itself.
    #[must_use]
    pub fn contains(&self, token: Token) -> bool {
        if token == Self::SELF_TOKEN {
            return true;
        }

        match token.table_id() {
            Some(TableId::Module) | None => false,
            Some(table) => {
                let row = token.row();
                row != 0 && row <= self.row_count(table) && table != TableId::NestedClass
            }
        }
    }

    /// Create a handle to an existing member of this module.
    ///
    /// # Errors
    /// Returns [`crate::Error::TokenNotFound`] if `token` is not a row of this module.
    pub fn handle(&self, token: Token) -> Result<MemberHandle> {
        if !self.contains(token) {
            return Err(TokenNotFound(token));
        }

        Ok(MemberHandle {
            module: self.id,
            token,
        })
    }

    /// Borrow any row by token.
    ///
    /// # Errors
    /// Returns [`crate::Error::TokenNotFound`] if `token` is not a row of a table this model
    /// holds.
    pub fn member(&self, token: Token) -> Result<MemberDescriptor<'_>> {
        let descriptor = match token.table_id() {
            Some(TableId::TypeDef) => MemberDescriptor::TypeDef(self.type_def(token)?),
            Some(TableId::TypeRef) => MemberDescriptor::TypeRef(self.type_ref(token)?),
            Some(TableId::TypeSpec) => MemberDescriptor::TypeSpec(self.type_spec(token)?),
            Some(TableId::MethodDef) => MemberDescriptor::MethodDef(self.method_def(token)?),
            Some(TableId::Field) => MemberDescriptor::FieldDef(self.field_def(token)?),
            Some(TableId::Param) => MemberDescriptor::ParamDef(self.param_def(token)?),
            Some(TableId::Property) => MemberDescriptor::PropertyDef(self.property_def(token)?),
            Some(TableId::Event) => MemberDescriptor::EventDef(self.event_def(token)?),
            Some(TableId::MemberRef) => MemberDescriptor::MemberRef(self.member_ref(token)?),
            Some(TableId::MethodSpec) => MemberDescriptor::MethodSpec(self.method_spec(token)?),
            Some(TableId::AssemblyRef) => {
                MemberDescriptor::AssemblyRef(self.assembly_ref(token)?)
            }
            Some(TableId::ModuleRef) => MemberDescriptor::ModuleRef(self.module_ref(token)?),
            Some(TableId::StandAloneSig) => {
                MemberDescriptor::StandAloneSig(self.stand_alone_sig(token)?)
            }
            _ => return Err(TokenNotFound(token)),
        };
        Ok(descriptor)
    }

    /// Custom attributes attached to `parent`.
    pub fn custom_attributes_of(
        &self,
        parent: Token,
    ) -> impl Iterator<Item = (Token, &CustomAttribute)> + '_ {
        self.custom_attributes()
            .filter(move |(_, attribute)| attribute.parent == parent)
    }

    /// Types attached to the module namespace.
    #[must_use]
    pub fn top_level_types(&self) -> &[Token] {
        &self.top_level_types
    }

    /// Attach a type definition to the module namespace.
    ///
    /// Attaching the same type twice has no effect.
    ///
    /// # Errors
    /// Returns [`crate::Error::TokenNotFound`] if `token` is not a `TypeDef` of this module, or
    /// [`crate::Error::Malformed`] if the type is nested.
    pub fn attach_top_level_type(&mut self, token: Token) -> Result<()> {
        if self.type_def(token)?.declaring_type.is_some() {
            return Err(malformed_error!(
                "Nested type {} cannot be attached to the module namespace",
                token
            ));
        }

        if !self.top_level_types.contains(&token) {
            self.top_level_types.push(token);
        }
        Ok(())
    }

    /// Find a top level type by namespace and name.
    #[must_use]
    pub fn find_type(&self, namespace: &str, name: &str) -> Option<Token> {
        self.top_level_types.iter().copied().find(|token| {
            self.type_def(*token)
                .is_ok_and(|row| row.namespace == namespace && row.name == name)
        })
    }

    /// Append a string to the `#US` heap and return its `ldstr` token.
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueOutOfRange`] if the heap outgrows 24-bit offsets.
    pub fn add_user_string(&mut self, value: &str) -> Result<Token> {
        let offset = self.user_strings.add(value)?;
        Ok(Token::new(0x7000_0000 | offset))
    }

    /// Read the string referenced by an `ldstr` token.
    ///
    /// # Errors
    /// Returns [`crate::Error::TokenNotFound`] if the token doesn't address the `#US` heap.
    pub fn user_string(&self, token: Token) -> Result<String> {
        if token.table() != 0x70 || token.row() == 0 {
            return Err(TokenNotFound(token));
        }

        UserStrings::from(self.user_strings.as_bytes())?
            .get_string(token.row() as usize)
            .map_err(|_| TokenNotFound(token))
    }

    /// The raw `#US` heap.
    #[must_use]
    pub fn user_string_heap(&self) -> &[u8] {
        self.user_strings.as_bytes()
    }

    /// Capture the current row counts.
    #[must_use]
    pub fn checkpoint(&self) -> ModuleCheckpoint {
        ModuleCheckpoint {
            module: self.id,
            type_defs: self.type_defs.len(),
            type_refs: self.type_refs.len(),
            type_specs: self.type_specs.len(),
            method_defs: self.method_defs.len(),
            field_defs: self.field_defs.len(),
            param_defs: self.param_defs.len(),
            property_defs: self.property_defs.len(),
            event_defs: self.event_defs.len(),
            member_refs: self.member_refs.len(),
            method_specs: self.method_specs.len(),
            assembly_refs: self.assembly_refs.len(),
            module_refs: self.module_refs.len(),
            stand_alone_sigs: self.stand_alone_sigs.len(),
            custom_attributes: self.custom_attributes.len(),
            user_strings: self.user_strings.len(),
            top_level_types: self.top_level_types.len(),
        }
    }

    /// Drop every row appended since `checkpoint` was taken.
    ///
    /// Rows that existed at the checkpoint are kept as they are now.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the checkpoint was taken on another module.
    pub fn rollback(&mut self, checkpoint: &ModuleCheckpoint) -> Result<()> {
        if checkpoint.module != self.id {
            return Err(malformed_error!(
                "Checkpoint of {} applied to {}",
                checkpoint.module,
                self.id
            ));
        }

        self.type_defs.truncate(checkpoint.type_defs);
        self.type_refs.truncate(checkpoint.type_refs);
        self.type_specs.truncate(checkpoint.type_specs);
        self.method_defs.truncate(checkpoint.method_defs);
        self.field_defs.truncate(checkpoint.field_defs);
        self.param_defs.truncate(checkpoint.param_defs);
        self.property_defs.truncate(checkpoint.property_defs);
        self.event_defs.truncate(checkpoint.event_defs);
        self.member_refs.truncate(checkpoint.member_refs);
        self.method_specs.truncate(checkpoint.method_specs);
        self.assembly_refs.truncate(checkpoint.assembly_refs);
        self.module_refs.truncate(checkpoint.module_refs);
        self.stand_alone_sigs.truncate(checkpoint.stand_alone_sigs);
        self.custom_attributes.truncate(checkpoint.custom_attributes);
        self.user_strings.truncate(checkpoint.user_strings);
        self.top_level_types.truncate(checkpoint.top_level_types);
        Ok(())
    }
}
