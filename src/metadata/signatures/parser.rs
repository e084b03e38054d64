//! Decoder for signature blobs.
//!
//! [`SignatureParser`] walks a blob with a [`crate::file::parser::Parser`] and produces the
//! typed model of [`crate::metadata::signatures::types`]. Decoding stops exactly at the logical
//! end of the signature, so callers never need to know the blob length up front.
//!
//! Every `TypeDefOrRefOrSpecEncoded` token found in the blob is handed to a
//! [`TypeTokenResolver`] before it is stored. The resolver can reject the token (for example
//! because it does not address an existing row) or redirect it into another module.

use crate::{
    file::parser::Parser,
    metadata::{
        signatures::types::{
            CallingConvention, CustomModifier, SignatureArray, SignatureField,
            SignatureLocalVariables, SignatureMethod, SignatureMethodSpec, SignatureParameter,
            SignatureProperty, SignatureTypeSpec, TypeSignature, ELEMENT_TYPE, SIGNATURE_HEADER,
        },
        token::Token,
    },
    Error::RecursionLimit,
    Result,
};

/// Maximum nesting of types inside one signature.
pub const MAX_RECURSION_DEPTH: usize = 50;

/// Maps tokens embedded in a signature blob while it is decoded.
pub trait TypeTokenResolver {
    /// Validate or translate a decoded `TypeDef`, `TypeRef` or `TypeSpec` token.
    ///
    /// # Errors
    /// Implementations return an error if `token` cannot be resolved.
    fn resolve_type_token(&mut self, token: Token) -> Result<Token>;
}

/// Resolver that accepts every token unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityResolver;

impl TypeTokenResolver for IdentityResolver {
    fn resolve_type_token(&mut self, token: Token) -> Result<Token> {
        Ok(token)
    }
}

impl<F> TypeTokenResolver for F
where
    F: FnMut(Token) -> Result<Token>,
{
    fn resolve_type_token(&mut self, token: Token) -> Result<Token> {
        self(token)
    }
}

/// Decoder for every kind of signature blob.
///
/// # Examples
///
/// ```rust
/// use dotgraft::metadata::signatures::{IdentityResolver, SignatureParser, TypeSignature};
///
/// // Property `string Name { get; }`
/// let mut resolver = IdentityResolver;
/// let mut parser = SignatureParser::new(&[0x28, 0x00, 0x0E], &mut resolver);
/// let property = parser.parse_property_signature()?;
/// assert!(property.has_this);
/// assert_eq!(property.base, TypeSignature::String);
/// # Ok::<(), dotgraft::Error>(())
/// ```
pub struct SignatureParser<'a, 'r> {
    parser: Parser<'a>,
    resolver: &'r mut dyn TypeTokenResolver,
    depth: usize,
}

impl<'a, 'r> SignatureParser<'a, 'r> {
    /// Create a parser over `data`, passing every embedded token through `resolver`.
    pub fn new(data: &'a [u8], resolver: &'r mut dyn TypeTokenResolver) -> Self {
        SignatureParser {
            parser: Parser::new(data),
            resolver,
            depth: 0,
        }
    }

    /// Number of bytes consumed so far.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.parser.pos()
    }

    /// Returns `true` if bytes remain after the decoded signature.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.parser.has_more_data()
    }

    fn bounded_capacity(&self, count: u32) -> usize {
        (count as usize).min(self.parser.remaining())
    }

    fn read_type_token(&mut self) -> Result<Token> {
        let token = self.parser.read_compressed_token()?;
        if token.is_null() {
            return Err(malformed_error!(
                "Null type token in signature at offset {}",
                self.parser.pos()
            ));
        }

        self.resolver.resolve_type_token(token)
    }

    /// Decode one type, including any leading custom modifiers.
    ///
    /// # Errors
    /// - [`crate::Error::TruncatedData`] if the blob ends inside the type
    /// - [`crate::Error::RecursionLimit`] if types nest deeper than [`MAX_RECURSION_DEPTH`]
    /// - [`crate::Error::Malformed`] for unknown element types
    pub fn parse_type(&mut self) -> Result<TypeSignature> {
        self.depth += 1;
        if self.depth >= MAX_RECURSION_DEPTH {
            return Err(RecursionLimit(MAX_RECURSION_DEPTH));
        }

        let result = self.parse_type_inner();
        self.depth -= 1;
        result
    }

    fn parse_type_inner(&mut self) -> Result<TypeSignature> {
        let current_byte = self.parser.read_le::<u8>()?;
        match current_byte {
            ELEMENT_TYPE::VOID => Ok(TypeSignature::Void),
            ELEMENT_TYPE::BOOLEAN => Ok(TypeSignature::Boolean),
            ELEMENT_TYPE::CHAR => Ok(TypeSignature::Char),
            ELEMENT_TYPE::I1 => Ok(TypeSignature::I1),
            ELEMENT_TYPE::U1 => Ok(TypeSignature::U1),
            ELEMENT_TYPE::I2 => Ok(TypeSignature::I2),
            ELEMENT_TYPE::U2 => Ok(TypeSignature::U2),
            ELEMENT_TYPE::I4 => Ok(TypeSignature::I4),
            ELEMENT_TYPE::U4 => Ok(TypeSignature::U4),
            ELEMENT_TYPE::I8 => Ok(TypeSignature::I8),
            ELEMENT_TYPE::U8 => Ok(TypeSignature::U8),
            ELEMENT_TYPE::R4 => Ok(TypeSignature::R4),
            ELEMENT_TYPE::R8 => Ok(TypeSignature::R8),
            ELEMENT_TYPE::STRING => Ok(TypeSignature::String),
            ELEMENT_TYPE::I => Ok(TypeSignature::I),
            ELEMENT_TYPE::U => Ok(TypeSignature::U),
            ELEMENT_TYPE::OBJECT => Ok(TypeSignature::Object),
            ELEMENT_TYPE::TYPEDBYREF => Ok(TypeSignature::TypedByRef),
            ELEMENT_TYPE::PTR => Ok(TypeSignature::Ptr(Box::new(self.parse_type()?))),
            ELEMENT_TYPE::BYREF => Ok(TypeSignature::ByRef(Box::new(self.parse_type()?))),
            ELEMENT_TYPE::PINNED => Ok(TypeSignature::Pinned(Box::new(self.parse_type()?))),
            ELEMENT_TYPE::SZARRAY => Ok(TypeSignature::SzArray(Box::new(self.parse_type()?))),
            ELEMENT_TYPE::VALUETYPE => Ok(TypeSignature::ValueType(self.read_type_token()?)),
            ELEMENT_TYPE::CLASS => Ok(TypeSignature::Class(self.read_type_token()?)),
            ELEMENT_TYPE::VAR => Ok(TypeSignature::GenericParamType(
                self.parser.read_compressed_uint()?,
            )),
            ELEMENT_TYPE::MVAR => Ok(TypeSignature::GenericParamMethod(
                self.parser.read_compressed_uint()?,
            )),
            ELEMENT_TYPE::ARRAY => {
                let base = self.parse_type()?;
                let rank = self.parser.read_compressed_uint()?;

                // every entry takes at least one byte
                let num_sizes = self.parser.read_compressed_uint()?;
                let mut sizes = Vec::with_capacity(self.bounded_capacity(num_sizes.min(rank)));
                for _ in 0..num_sizes {
                    sizes.push(self.parser.read_compressed_uint()?);
                }

                let num_lo_bounds = self.parser.read_compressed_uint()?;
                let mut lower_bounds =
                    Vec::with_capacity(self.bounded_capacity(num_lo_bounds.min(rank)));
                for _ in 0..num_lo_bounds {
                    lower_bounds.push(self.parser.read_compressed_int()?);
                }

                if sizes.len() > rank as usize || lower_bounds.len() > rank as usize {
                    return Err(malformed_error!(
                        "Array shape lists more dimensions than its rank {}",
                        rank
                    ));
                }

                Ok(TypeSignature::Array(SignatureArray {
                    base: Box::new(base),
                    rank,
                    sizes,
                    lower_bounds,
                }))
            }
            ELEMENT_TYPE::GENERICINST => {
                let base = self.parse_type()?;
                if !matches!(base, TypeSignature::Class(_) | TypeSignature::ValueType(_)) {
                    return Err(malformed_error!(
                        "GENERICINST base must be CLASS or VALUETYPE, got {:?}",
                        base
                    ));
                }

                let arg_count = self.parser.read_compressed_uint()?;
                if arg_count == 0 {
                    return Err(malformed_error!("GENERICINST without type arguments"));
                }

                let mut type_args = Vec::with_capacity(arg_count.min(16) as usize);
                for _ in 0..arg_count {
                    type_args.push(self.parse_type()?);
                }

                Ok(TypeSignature::GenericInst(Box::new(base), type_args))
            }
            ELEMENT_TYPE::CMOD_REQD | ELEMENT_TYPE::CMOD_OPT => {
                let modifier = CustomModifier {
                    required: current_byte == ELEMENT_TYPE::CMOD_REQD,
                    modifier: self.read_type_token()?,
                };
                Ok(TypeSignature::Modified(modifier, Box::new(self.parse_type()?)))
            }
            ELEMENT_TYPE::FNPTR => Ok(TypeSignature::FnPtr(Box::new(
                self.parse_method_signature()?,
            ))),
            _ => Err(malformed_error!(
                "Unsupported ELEMENT_TYPE - {:#04x} at offset {}",
                current_byte,
                self.parser.pos() - 1
            )),
        }
    }

    fn parse_param(&mut self) -> Result<SignatureParameter> {
        Ok(SignatureParameter {
            base: self.parse_type()?,
        })
    }

    /// Decode a method signature (`MethodDefSig`, `MethodRefSig` or `StandAloneMethodSig`).
    ///
    /// # Errors
    /// Returns an error if the blob is truncated, the calling convention is unknown or a
    /// contained type is invalid.
    pub fn parse_method_signature(&mut self) -> Result<SignatureMethod> {
        let convention_byte = self.parser.read_le::<u8>()?;
        let kind = convention_byte & SIGNATURE_HEADER::KIND_MASK;
        let calling_convention = CallingConvention::from_repr(kind)
            .filter(|_| convention_byte & SIGNATURE_HEADER::RESERVED == 0)
            .ok_or_else(|| {
                malformed_error!("Unknown calling convention - {:#04x}", convention_byte)
            })?;

        let generic_param_count = if convention_byte & SIGNATURE_HEADER::GENERIC != 0 {
            let count = self.parser.read_compressed_uint()?;
            if count == 0 {
                return Err(malformed_error!(
                    "Generic method signature without generic parameters"
                ));
            }
            count
        } else {
            0
        };

        let param_count = self.parser.read_compressed_uint()?;
        let return_type = self.parse_param()?;

        let mut method = SignatureMethod {
            has_this: convention_byte & SIGNATURE_HEADER::HAS_THIS != 0,
            explicit_this: convention_byte & SIGNATURE_HEADER::EXPLICIT_THIS != 0,
            calling_convention,
            generic_param_count,
            return_type,
            params: Vec::with_capacity(param_count.min(64) as usize),
            varargs: Vec::new(),
        };

        let mut in_varargs = false;
        for _ in 0..param_count {
            if self.parser.peek_byte()? == ELEMENT_TYPE::SENTINEL {
                if in_varargs {
                    return Err(malformed_error!("Duplicate vararg sentinel"));
                }
                if !calling_convention.allows_varargs() {
                    return Err(malformed_error!(
                        "Vararg sentinel in a {:?} method signature",
                        calling_convention
                    ));
                }
                self.parser.advance_by(1)?;
                in_varargs = true;
            }

            let param = self.parse_param()?;
            if in_varargs {
                method.varargs.push(param);
            } else {
                method.params.push(param);
            }
        }

        Ok(method)
    }

    /// Decode a field signature.
    ///
    /// # Errors
    /// Returns an error if the header is not `FIELD` or the type is invalid.
    pub fn parse_field_signature(&mut self) -> Result<SignatureField> {
        let head_byte = self.parser.read_le::<u8>()?;
        if head_byte != SIGNATURE_HEADER::FIELD {
            return Err(malformed_error!(
                "SignatureField - invalid start - {:#04x}",
                head_byte
            ));
        }

        Ok(SignatureField {
            base: self.parse_type()?,
        })
    }

    /// Decode a property signature.
    ///
    /// # Errors
    /// Returns an error if the header is not `PROPERTY` or a contained type is invalid.
    pub fn parse_property_signature(&mut self) -> Result<SignatureProperty> {
        let head_byte = self.parser.read_le::<u8>()?;
        if head_byte & !SIGNATURE_HEADER::HAS_THIS != SIGNATURE_HEADER::PROPERTY {
            return Err(malformed_error!(
                "SignatureProperty - invalid start - {:#04x}",
                head_byte
            ));
        }

        let param_count = self.parser.read_compressed_uint()?;
        let base = self.parse_type()?;

        let mut params = Vec::with_capacity(param_count.min(64) as usize);
        for _ in 0..param_count {
            params.push(self.parse_param()?);
        }

        Ok(SignatureProperty {
            has_this: head_byte & SIGNATURE_HEADER::HAS_THIS != 0,
            base,
            params,
        })
    }

    /// Decode a local variable signature.
    ///
    /// # Errors
    /// Returns an error if the header is not `LOCAL_SIG` or a local type is invalid.
    pub fn parse_local_var_signature(&mut self) -> Result<SignatureLocalVariables> {
        let head_byte = self.parser.read_le::<u8>()?;
        if head_byte != SIGNATURE_HEADER::LOCAL_SIG {
            return Err(malformed_error!(
                "SignatureLocalVariables - invalid start - {:#04x}",
                head_byte
            ));
        }

        let count = self.parser.read_compressed_uint()?;
        let mut locals = Vec::with_capacity(count.min(256) as usize);
        for _ in 0..count {
            locals.push(self.parse_type()?);
        }

        Ok(SignatureLocalVariables { locals })
    }

    /// Decode a type specification signature.
    ///
    /// # Errors
    /// Returns an error if the type is invalid.
    pub fn parse_type_spec_signature(&mut self) -> Result<SignatureTypeSpec> {
        Ok(SignatureTypeSpec {
            base: self.parse_type()?,
        })
    }

    /// Decode a generic method instantiation signature.
    ///
    /// # Errors
    /// Returns an error if the header is not `METHOD_SPEC` or a type argument is invalid.
    pub fn parse_method_spec_signature(&mut self) -> Result<SignatureMethodSpec> {
        let head_byte = self.parser.read_le::<u8>()?;
        if head_byte != SIGNATURE_HEADER::METHOD_SPEC {
            return Err(malformed_error!(
                "SignatureMethodSpec - invalid start - {:#04x}",
                head_byte
            ));
        }

        let arg_count = self.parser.read_compressed_uint()?;
        let mut generic_args = Vec::with_capacity(arg_count.min(16) as usize);
        for _ in 0..arg_count {
            generic_args.push(self.parse_type()?);
        }

        Ok(SignatureMethodSpec { generic_args })
    }
}

/// Decode a method signature without token translation.
///
/// # Errors
/// See [`SignatureParser::parse_method_signature`].
pub fn parse_method_signature(data: &[u8]) -> Result<SignatureMethod> {
    SignatureParser::new(data, &mut IdentityResolver).parse_method_signature()
}

/// Decode a field signature without token translation.
///
/// # Errors
/// See [`SignatureParser::parse_field_signature`].
pub fn parse_field_signature(data: &[u8]) -> Result<SignatureField> {
    SignatureParser::new(data, &mut IdentityResolver).parse_field_signature()
}

/// Decode a property signature without token translation.
///
/// # Errors
/// See [`SignatureParser::parse_property_signature`].
pub fn parse_property_signature(data: &[u8]) -> Result<SignatureProperty> {
    SignatureParser::new(data, &mut IdentityResolver).parse_property_signature()
}

/// Decode a local variable signature without token translation.
///
/// # Errors
/// See [`SignatureParser::parse_local_var_signature`].
pub fn parse_local_var_signature(data: &[u8]) -> Result<SignatureLocalVariables> {
    SignatureParser::new(data, &mut IdentityResolver).parse_local_var_signature()
}

/// Decode a type specification signature without token translation.
///
/// # Errors
/// See [`SignatureParser::parse_type_spec_signature`].
pub fn parse_type_spec_signature(data: &[u8]) -> Result<SignatureTypeSpec> {
    SignatureParser::new(data, &mut IdentityResolver).parse_type_spec_signature()
}

/// Decode a generic method instantiation signature without token translation.
///
/// # Errors
/// See [`SignatureParser::parse_method_spec_signature`].
pub fn parse_method_spec_signature(data: &[u8]) -> Result<SignatureMethodSpec> {
    SignatureParser::new(data, &mut IdentityResolver).parse_method_spec_signature()
}
