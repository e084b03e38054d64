//! Discovery of the members a clone copies, and of the references they depend on.

use std::collections::HashSet;

use log::debug;

use crate::{
    metadata::{
        members::{MemberRefSignature, StandAloneSignature},
        method::Operand,
        module::Module,
        tables::TableId,
        token::Token,
    },
    Error::{TokenNotFound, UnresolvedReference},
    Result,
};

/// Table byte of `ldstr` operands.
pub(crate) const USER_STRING_TABLE: u8 = 0x70;

/// The members one clone call copies.
///
/// A member is cloned if it was included as a seed, or if it is structurally nested in a
/// cloned member: members and nested types of a cloned type, parameters of a cloned method and
/// accessors of a cloned property or event. Everything else a cloned member refers to is
/// imported by reference.
#[derive(Debug, Default)]
pub(crate) struct CloneClosure {
    /// Cloned types, methods, fields, properties and events in discovery order
    pub members: Vec<Token>,
    /// Parameters of cloned methods
    pub params: Vec<Token>,
    /// The seeds, without duplicates
    pub roots: Vec<Token>,
    cloned: HashSet<Token>,
}

impl CloneClosure {
    /// Collect the members cloned for `seeds`.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnresolvedReference`] if a member list names a missing row, or
    /// [`crate::Error::Malformed`] if a seed is not a member definition.
    pub fn discover(source: &Module, seeds: &[Token]) -> Result<Self> {
        let mut closure = CloneClosure::default();
        for seed in seeds {
            if !closure.roots.contains(seed) {
                closure.roots.push(*seed);
            }
            closure.add(source, *seed).map_err(|error| match error {
                TokenNotFound(token) => UnresolvedReference(token),
                other => other,
            })?;
        }

        debug!(
            "Clone closure of {} seeds holds {} members and {} parameters",
            closure.roots.len(),
            closure.members.len(),
            closure.params.len()
        );
        Ok(closure)
    }

    /// Returns `true` if `token` is cloned.
    pub fn contains(&self, token: Token) -> bool {
        self.cloned.contains(&token)
    }

    fn add(&mut self, source: &Module, token: Token) -> Result<()> {
        if self.cloned.contains(&token) {
            return Ok(());
        }

        match token.table_id() {
            Some(TableId::TypeDef) => {
                let row = source.type_def(token)?;
                self.cloned.insert(token);
                self.members.push(token);
                for member in row
                    .fields
                    .iter()
                    .chain(&row.methods)
                    .chain(&row.properties)
                    .chain(&row.events)
                    .chain(&row.nested_types)
                {
                    self.add(source, *member)?;
                }
            }
            Some(TableId::MethodDef) => {
                let row = source.method_def(token)?;
                self.cloned.insert(token);
                self.members.push(token);
                for param in &row.params {
                    source.param_def(*param)?;
                    if self.cloned.insert(*param) {
                        self.params.push(*param);
                    }
                }
            }
            Some(TableId::Field) => {
                source.field_def(token)?;
                self.cloned.insert(token);
                self.members.push(token);
            }
            Some(TableId::Property) => {
                let row = source.property_def(token)?;
                self.cloned.insert(token);
                self.members.push(token);
                for accessor in row.accessors() {
                    self.add(source, accessor)?;
                }
            }
            Some(TableId::Event) => {
                let row = source.event_def(token)?;
                self.cloned.insert(token);
                self.members.push(token);
                for accessor in row.accessors() {
                    self.add(source, accessor)?;
                }
            }
            _ => {
                return Err(malformed_error!(
                    "{} is not a type, method, field, property or event definition",
                    token
                ))
            }
        }
        Ok(())
    }

    /// Check that every reference reachable from the cloned members resolves in `source`.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnresolvedReference`] with the first token that doesn't resolve.
    pub fn validate(&self, source: &Module, with_attributes: bool) -> Result<()> {
        let mut pending = Vec::new();
        for member in self.members.iter().chain(&self.params) {
            pending.extend(references(source, *member, true)?);
            if with_attributes {
                pending.extend(
                    source
                        .custom_attributes_of(*member)
                        .map(|(_, attribute)| attribute.constructor),
                );
            }
        }

        let mut visited = HashSet::new();
        let mut imported = 0usize;
        while let Some(token) = pending.pop() {
            if self.contains(token) || !visited.insert(token) {
                continue;
            }

            if token.table() == USER_STRING_TABLE {
                source
                    .user_string(token)
                    .map_err(|_| UnresolvedReference(token))?;
                continue;
            }

            if !source.contains(token) {
                return Err(UnresolvedReference(token));
            }

            imported += 1;
            pending.extend(references(source, token, false)?);
        }

        debug!("Clone closure references {} external rows", imported);
        Ok(())
    }

    /// Returns `true` if `token` and everything it refers to stay outside the closure.
    pub fn is_external(&self, source: &Module, token: Token) -> bool {
        let mut pending = vec![token];
        let mut visited = HashSet::new();
        while let Some(current) = pending.pop() {
            if self.contains(current) {
                return false;
            }
            if !visited.insert(current) {
                continue;
            }
            match references(source, current, false) {
                Ok(next) => pending.extend(next),
                Err(_) => return false,
            }
        }
        true
    }
}

/// Tokens a row refers to.
///
/// Cloned rows contribute every reference needed to populate their copy. Rows that are only
/// imported contribute the references needed to rebuild them as references in the target.
pub(crate) fn references(source: &Module, token: Token, cloned: bool) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut push = |token: Token| {
        if !token.is_null() {
            tokens.push(token);
        }
    };

    if token == Module::SELF_TOKEN || token.table() == USER_STRING_TABLE {
        return Ok(Vec::new());
    }

    match token.table_id() {
        Some(TableId::TypeDef) => {
            let row = source.type_def(token)?;
            if cloned {
                push(row.extends);
                row.interfaces.iter().for_each(|interface| push(*interface));
                for param in &row.generic_params {
                    param.constraints.iter().for_each(|constraint| push(*constraint));
                }
            } else if let Some(declaring) = row.declaring_type {
                push(declaring);
            }
        }
        Some(TableId::MethodDef) => {
            let row = source.method_def(token)?;
            row.signature.for_each_token(&mut push);
            if cloned {
                for param in &row.generic_params {
                    param.constraints.iter().for_each(|constraint| push(*constraint));
                }
                if let Some(body) = &row.body {
                    push(body.local_var_sig);
                    for instruction in &body.instructions {
                        if let Operand::Token(operand) = instruction.operand {
                            push(operand);
                        }
                    }
                    for handler in &body.exception_handlers {
                        if handler.is_catch() {
                            push(handler.catch_type);
                        }
                    }
                }
            } else if let Some(declaring) = row.declaring_type {
                push(declaring);
            }
        }
        Some(TableId::Field) => {
            let row = source.field_def(token)?;
            row.signature.base.for_each_token(&mut push);
            if !cloned {
                if let Some(declaring) = row.declaring_type {
                    push(declaring);
                }
            }
        }
        Some(TableId::Param) if cloned => {
            source.param_def(token)?;
        }
        Some(TableId::Property) if cloned => {
            let row = source.property_def(token)?;
            row.signature.base.for_each_token(&mut push);
            for param in &row.signature.params {
                param.base.for_each_token(&mut push);
            }
        }
        Some(TableId::Event) if cloned => push(source.event_def(token)?.event_type),
        Some(TableId::TypeRef) => push(source.type_ref(token)?.resolution_scope),
        Some(TableId::TypeSpec) => source.type_spec(token)?.signature.for_each_token(&mut push),
        Some(TableId::MemberRef) => {
            let row = source.member_ref(token)?;
            push(row.class);
            match &row.signature {
                MemberRefSignature::Method(signature) => signature.for_each_token(&mut push),
                MemberRefSignature::Field(signature) => signature.base.for_each_token(&mut push),
            }
        }
        Some(TableId::MethodSpec) => {
            let row = source.method_spec(token)?;
            push(row.method);
            for argument in &row.instantiation.generic_args {
                argument.for_each_token(&mut push);
            }
        }
        Some(TableId::StandAloneSig) => match source.stand_alone_sig(token)? {
            StandAloneSignature::Locals(signature) => {
                for local in &signature.locals {
                    local.for_each_token(&mut push);
                }
            }
            StandAloneSignature::Method(signature) => signature.for_each_token(&mut push),
        },
        Some(TableId::AssemblyRef) => {
            source.assembly_ref(token)?;
        }
        Some(TableId::ModuleRef) => {
            source.module_ref(token)?;
        }
        _ => return Err(UnresolvedReference(token)),
    }

    Ok(tokens)
}
