//! Import of rows the cloned members refer to but that are not cloned themselves.
//!
//! Imported rows become references in the target module. Before a new row is appended the
//! target is searched for an equivalent one: types and external member references are matched
//! with the [`crate::metadata::comparer::SignatureComparer`], everything else by the exact
//! translated row.

use log::debug;

use crate::{
    cloning::context::CloneContext,
    metadata::{
        comparer::Descriptor,
        members::{
            AssemblyRef, MemberRef, MemberRefSignature, MethodSpec, ModuleRef,
            StandAloneSignature, TypeRef, TypeSpec,
        },
        module::Module,
        tables::TableId,
        token::Token,
    },
    Error::{TokenNotFound, UnresolvedReference},
    Result,
};

impl CloneContext<'_> {
    /// Translate a source row that is not cloned into an equivalent row of the target.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnresolvedReference`] if the row or one of its dependencies is
    /// missing from the source, or if it is a parameter, property or event that is not cloned.
    pub fn import_token(&mut self, token: Token) -> Result<Token> {
        if let Some(imported) = self.imported.get(&token) {
            return Ok(*imported);
        }
        if token == Module::SELF_TOKEN {
            return self.import_source_scope();
        }
        if !self.importing.insert(token) {
            return Err(malformed_error!("Cyclic reference through {}", token));
        }

        let result = self.import_row(token);
        self.importing.remove(&token);
        let imported = result.map_err(|error| match error {
            TokenNotFound(missing) => UnresolvedReference(missing),
            other => other,
        })?;

        debug!("Imported {} as {}", token, imported);
        self.imported.insert(token, imported);
        Ok(imported)
    }

    fn import_row(&mut self, token: Token) -> Result<Token> {
        let source = self.source;
        match token.table_id() {
            Some(TableId::TypeDef | TableId::TypeRef) => self.import_type(token),
            Some(TableId::TypeSpec) => {
                let row = source.type_spec(token)?;
                if let Some(existing) = self.find_external(token, TableId::TypeSpec) {
                    return Ok(existing);
                }

                let candidate = TypeSpec {
                    signature: self.translate_type(&row.signature)?,
                };
                let existing = self
                    .target
                    .type_specs()
                    .find(|(_, row)| **row == candidate)
                    .map(|(token, _)| token);
                Ok(existing.unwrap_or_else(|| self.target.add_type_spec(candidate)))
            }
            Some(TableId::MemberRef) => {
                let row = source.member_ref(token)?;
                if let Some(existing) = self.find_external(token, TableId::MemberRef) {
                    return Ok(existing);
                }

                let signature = match &row.signature {
                    MemberRefSignature::Method(signature) => {
                        MemberRefSignature::Method(self.translate_method(signature)?)
                    }
                    MemberRefSignature::Field(signature) => {
                        MemberRefSignature::Field(self.translate_field(signature)?)
                    }
                };
                let candidate = MemberRef {
                    class: self.map_or_import(row.class)?,
                    name: row.name.clone(),
                    signature,
                };
                Ok(self.find_or_add_member_ref(candidate))
            }
            Some(TableId::MethodSpec) => {
                let row = source.method_spec(token)?;
                if let Some(existing) = self.find_external(token, TableId::MethodSpec) {
                    return Ok(existing);
                }

                let candidate = MethodSpec {
                    method: self.map_or_import(row.method)?,
                    instantiation: self.translate_method_spec(&row.instantiation)?,
                };
                let existing = self
                    .target
                    .method_specs()
                    .find(|(_, row)| **row == candidate)
                    .map(|(token, _)| token);
                Ok(existing.unwrap_or_else(|| self.target.add_method_spec(candidate)))
            }
            Some(TableId::StandAloneSig) => {
                let candidate = match source.stand_alone_sig(token)? {
                    StandAloneSignature::Locals(signature) => {
                        StandAloneSignature::Locals(self.translate_locals(signature)?)
                    }
                    StandAloneSignature::Method(signature) => {
                        StandAloneSignature::Method(self.translate_method(signature)?)
                    }
                };
                let existing = self
                    .target
                    .stand_alone_sigs()
                    .find(|(_, row)| **row == candidate)
                    .map(|(token, _)| token);
                Ok(existing.unwrap_or_else(|| self.target.add_stand_alone_sig(candidate)))
            }
            Some(TableId::AssemblyRef) => {
                let row = source.assembly_ref(token)?.clone();
                Ok(self.find_or_add_assembly_ref(row))
            }
            Some(TableId::ModuleRef) => {
                let name = source.module_ref(token)?.name.clone();
                Ok(self.find_or_add_module_ref(&name))
            }
            Some(TableId::MethodDef) => {
                let row = source.method_def(token)?;
                if let Some(existing) = self.find_external(token, TableId::MemberRef) {
                    return Ok(existing);
                }

                let candidate = MemberRef {
                    class: self.member_parent(row.declaring_type)?,
                    name: row.name.clone(),
                    signature: MemberRefSignature::Method(self.translate_method(&row.signature)?),
                };
                Ok(self.find_or_add_member_ref(candidate))
            }
            Some(TableId::Field) => {
                let row = source.field_def(token)?;
                if let Some(existing) = self.find_external(token, TableId::MemberRef) {
                    return Ok(existing);
                }

                let candidate = MemberRef {
                    class: self.member_parent(row.declaring_type)?,
                    name: row.name.clone(),
                    signature: MemberRefSignature::Field(self.translate_field(&row.signature)?),
                };
                Ok(self.find_or_add_member_ref(candidate))
            }
            _ => Err(UnresolvedReference(token)),
        }
    }

    /// Import a type definition or reference as a `TypeRef`, or reuse a target type that
    /// denotes the same nominal type.
    fn import_type(&mut self, token: Token) -> Result<Token> {
        let source = self.source;
        if let Some(existing) = self.find_type(token) {
            debug!("Reusing {} of the target for {}", existing, token);
            return Ok(existing);
        }

        let candidate = if token.is_table(TableId::TypeDef) {
            let row = source.type_def(token)?;
            let resolution_scope = match row.declaring_type {
                Some(enclosing) => self.map_or_import(enclosing)?,
                None => self.import_source_scope()?,
            };
            TypeRef {
                resolution_scope,
                namespace: row.namespace.clone(),
                name: row.name.clone(),
            }
        } else {
            let row = source.type_ref(token)?;
            let scope = row.resolution_scope;
            let resolution_scope = match scope.table_id() {
                Some(TableId::TypeRef | TableId::AssemblyRef) => self.map_or_import(scope)?,
                Some(TableId::ModuleRef) if self.same_assembly() => self.map_or_import(scope)?,
                _ => self.import_source_scope()?,
            };
            TypeRef {
                resolution_scope,
                namespace: row.namespace.clone(),
                name: row.name.clone(),
            }
        };
        Ok(self.target.add_type_ref(candidate))
    }

    /// Find a type of the target that denotes the same type as `token` of the source.
    ///
    /// Type definitions the target held before this clone are considered alongside its
    /// type references.
    fn find_type(&self, token: Token) -> Option<Token> {
        let x = Descriptor::new(self.source, token);
        let target: &Module = &*self.target;
        (1..=self.existing_type_defs)
            .map(|row| Token::from_parts(TableId::TypeDef, row))
            .chain(target.type_refs().map(|(token, _)| token))
            .find(|candidate| {
                self.comparer
                    .equals(Some(x), Some(Descriptor::new(target, *candidate)))
            })
    }

    /// Find a row of `table` in the target equivalent to `token`, if `token` doesn't depend on
    /// anything that is cloned.
    fn find_external(&self, token: Token, table: TableId) -> Option<Token> {
        if !self.closure.is_external(self.source, token) {
            return None;
        }

        let x = Descriptor::new(self.source, token);
        let target: &Module = &*self.target;
        (1..=target.row_count(table))
            .map(|row| Token::from_parts(table, row))
            .find(|candidate| {
                self.comparer
                    .equals(Some(x), Some(Descriptor::new(target, *candidate)))
            })
            .inspect(|existing| debug!("Reusing {} of the target for {}", existing, token))
    }

    /// `MemberRef` parent for a field or method of `declaring`; global members hang off a
    /// `ModuleRef` to the source module.
    fn member_parent(&mut self, declaring: Option<Token>) -> Result<Token> {
        match declaring {
            Some(declaring) => self.map_or_import(declaring),
            None => {
                let name = self.source.name.clone();
                Ok(self.find_or_add_module_ref(&name))
            }
        }
    }

    fn same_assembly(&self) -> bool {
        match (&self.source.assembly, &self.target.assembly) {
            (Some(source), Some(target)) => self.comparer.assembly_equals(source, target),
            _ => false,
        }
    }

    /// Resolution scope in the target for types defined by the source module itself.
    fn import_source_scope(&mut self) -> Result<Token> {
        if self.same_assembly() {
            if self.source.name.eq_ignore_ascii_case(&self.target.name) {
                return Ok(Module::SELF_TOKEN);
            }
            let name = self.source.name.clone();
            return Ok(self.find_or_add_module_ref(&name));
        }

        match &self.source.assembly {
            Some(identity) => Ok(self.find_or_add_assembly_ref(AssemblyRef::from(identity))),
            None if self.target.assembly.is_none()
                && self.source.name.eq_ignore_ascii_case(&self.target.name) =>
            {
                Ok(Module::SELF_TOKEN)
            }
            None => {
                let name = self.source.name.clone();
                Ok(self.find_or_add_module_ref(&name))
            }
        }
    }

    fn find_or_add_assembly_ref(&mut self, row: AssemblyRef) -> Token {
        let identity = row.identity();
        let existing = self
            .target
            .assembly_refs()
            .find(|(_, existing)| self.comparer.assembly_equals(&existing.identity(), &identity))
            .map(|(token, _)| token);
        existing.unwrap_or_else(|| self.target.add_assembly_ref(row))
    }

    fn find_or_add_module_ref(&mut self, name: &str) -> Token {
        let existing = self
            .target
            .module_refs()
            .find(|(_, row)| row.name.eq_ignore_ascii_case(name))
            .map(|(token, _)| token);
        existing.unwrap_or_else(|| {
            self.target.add_module_ref(ModuleRef {
                name: name.to_string(),
            })
        })
    }

    fn find_or_add_member_ref(&mut self, candidate: MemberRef) -> Token {
        let existing = self
            .target
            .member_refs()
            .find(|(_, row)| **row == candidate)
            .map(|(token, _)| token);
        existing.unwrap_or_else(|| self.target.add_member_ref(candidate))
    }
}
