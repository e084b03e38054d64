//! State of one clone call: the clone map, the import memo and token translation.

use std::collections::{HashMap, HashSet};

use crate::{
    cloning::{closure::CloneClosure, closure::USER_STRING_TABLE, CloneOptions},
    metadata::{
        comparer::SignatureComparer,
        method::{
            calculate_offsets, label_offset, offset_index, resolve_offset, CilLabel,
            ExceptionHandler, Instruction, MethodBody, Operand,
        },
        module::Module,
        signatures::{
            BlobSignature, SignatureField, SignatureLocalVariables, SignatureMethod,
            SignatureMethodSpec, SignatureParser, SignatureProperty, TypeSignature,
        },
        tables::TableId,
        token::Token,
    },
    Error::UnresolvedReference,
    Result,
};

pub(crate) struct CloneContext<'a> {
    pub source: &'a Module,
    pub target: &'a mut Module,
    pub closure: CloneClosure,
    pub options: CloneOptions,
    pub comparer: SignatureComparer,
    /// Source token to clone token
    pub map: HashMap<Token, Token>,
    /// Source token to the target row it was imported as
    pub imported: HashMap<Token, Token>,
    /// Source rows whose import is under way
    pub importing: HashSet<Token>,
    /// `TypeDef` rows of the target that existed before this call
    pub existing_type_defs: u32,
}

impl<'a> CloneContext<'a> {
    pub fn new(
        source: &'a Module,
        target: &'a mut Module,
        closure: CloneClosure,
        options: CloneOptions,
    ) -> Self {
        let existing_type_defs = target.row_count(TableId::TypeDef);
        CloneContext {
            source,
            target,
            closure,
            options,
            comparer: SignatureComparer::with_flags(options.comparer_flags),
            map: HashMap::new(),
            imported: HashMap::new(),
            importing: HashSet::new(),
            existing_type_defs,
        }
    }

    /// The clone of a member that is part of the closure.
    pub fn cloned(&self, token: Token) -> Result<Token> {
        self.map.get(&token).copied().ok_or(UnresolvedReference(token))
    }

    pub fn cloned_all(&self, tokens: &[Token]) -> Result<Vec<Token>> {
        tokens.iter().map(|token| self.cloned(*token)).collect()
    }

    /// The clone of `token` if it is cloned, its imported counterpart otherwise.
    pub fn map_or_import(&mut self, token: Token) -> Result<Token> {
        if let Some(cloned) = self.map.get(&token) {
            return Ok(*cloned);
        }
        self.import_token(token)
    }

    /// Like [`CloneContext::map_or_import`], passing the null token through.
    pub fn map_optional(&mut self, token: Token) -> Result<Token> {
        if token.is_null() {
            return Ok(Token::NULL);
        }
        self.map_or_import(token)
    }

    pub fn map_or_import_all(&mut self, tokens: &[Token]) -> Result<Vec<Token>> {
        tokens.iter().map(|token| self.map_or_import(*token)).collect()
    }

    /// Translate an instruction operand; `ldstr` strings are copied to the target `#US` heap.
    pub fn map_operand(&mut self, token: Token) -> Result<Token> {
        if token.table() == USER_STRING_TABLE {
            let value = self
                .source
                .user_string(token)
                .map_err(|_| UnresolvedReference(token))?;
            return self.target.add_user_string(&value);
        }
        self.map_or_import(token)
    }

    /// Re-encode `signature` and decode it again with every embedded token translated into
    /// the target module.
    fn translate<S, F>(&mut self, signature: &S, parse: F) -> Result<S>
    where
        S: BlobSignature,
        F: FnOnce(&mut SignatureParser<'_, '_>) -> Result<S>,
    {
        let blob = signature.encode()?;
        let mut resolver = |token: Token| -> Result<Token> { self.map_or_import(token) };
        let mut parser = SignatureParser::new(&blob, &mut resolver);
        parse(&mut parser)
    }

    pub fn translate_type(&mut self, signature: &TypeSignature) -> Result<TypeSignature> {
        self.translate(signature, |parser| parser.parse_type())
    }

    pub fn translate_method(&mut self, signature: &SignatureMethod) -> Result<SignatureMethod> {
        self.translate(signature, |parser| parser.parse_method_signature())
    }

    pub fn translate_field(&mut self, signature: &SignatureField) -> Result<SignatureField> {
        self.translate(signature, |parser| parser.parse_field_signature())
    }

    pub fn translate_property(
        &mut self,
        signature: &SignatureProperty,
    ) -> Result<SignatureProperty> {
        self.translate(signature, |parser| parser.parse_property_signature())
    }

    pub fn translate_locals(
        &mut self,
        signature: &SignatureLocalVariables,
    ) -> Result<SignatureLocalVariables> {
        self.translate(signature, |parser| parser.parse_local_var_signature())
    }

    pub fn translate_method_spec(
        &mut self,
        signature: &SignatureMethodSpec,
    ) -> Result<SignatureMethodSpec> {
        self.translate(signature, |parser| parser.parse_method_spec_signature())
    }

    /// Copy a method body into the target.
    ///
    /// Token operands are cloned or imported. Branch targets, switch tables and exception
    /// handler boundaries are rewritten to the instruction of the new sequence that sits at
    /// the offset the original target had, after offsets of the copy are recomputed.
    pub fn clone_body(&mut self, body: &MethodBody) -> Result<MethodBody> {
        let mut original = body.instructions.clone();
        let code_size = calculate_offsets(&mut original);

        let mut instructions = Vec::with_capacity(original.len());
        for instruction in &original {
            let operand = match &instruction.operand {
                Operand::Token(token) => Operand::Token(self.map_operand(*token)?),
                other => other.clone(),
            };
            instructions.push(Instruction {
                offset: instruction.offset,
                opcode: instruction.opcode,
                operand,
            });
        }
        let cloned_size = calculate_offsets(&mut instructions);
        if cloned_size != code_size {
            return Err(malformed_error!(
                "Cloned code size {} differs from original size {}",
                cloned_size,
                code_size
            ));
        }

        let by_offset = offset_index(&instructions, cloned_size);
        let relabel = |label: CilLabel| -> Result<CilLabel> {
            resolve_offset(&by_offset, i64::from(label_offset(&original, label)?))
        };

        for instruction in &mut instructions {
            instruction.operand = match &instruction.operand {
                Operand::Target(label) => Operand::Target(relabel(*label)?),
                Operand::Switch(labels) => Operand::Switch(
                    labels
                        .iter()
                        .map(|label| relabel(*label))
                        .collect::<Result<Vec<_>>>()?,
                ),
                other => other.clone(),
            };
        }

        let mut exception_handlers = Vec::with_capacity(body.exception_handlers.len());
        for handler in &body.exception_handlers {
            let catch_type = if handler.is_catch() {
                self.map_or_import(handler.catch_type)?
            } else {
                Token::NULL
            };

            exception_handlers.push(ExceptionHandler {
                flags: handler.flags,
                try_start: relabel(handler.try_start)?,
                try_end: relabel(handler.try_end)?,
                handler_start: relabel(handler.handler_start)?,
                handler_end: relabel(handler.handler_end)?,
                filter_start: handler.filter_start.map(relabel).transpose()?,
                catch_type,
            });
        }

        Ok(MethodBody {
            max_stack: body.max_stack,
            init_locals: body.init_locals,
            local_var_sig: self.map_optional(body.local_var_sig)?,
            instructions,
            exception_handlers,
        })
    }
}
