//! Encoder for signature blobs.
//!
//! Every signature type implements [`BlobSignature`]. The predicted size
//! ([`BlobSignature::physical_length`]) is computed by a separate walk over the model and must
//! agree with the bytes [`BlobSignature::encode_into`] produces; [`BlobSignature::encode`] checks
//! this for every call.

use crate::{
    file::writer::Writer,
    metadata::{
        signatures::types::{
            CustomModifier, SignatureArray, SignatureField, SignatureLocalVariables,
            SignatureMethod, SignatureMethodSpec, SignatureParameter, SignatureProperty,
            SignatureTypeSpec, TypeSignature, ELEMENT_TYPE, SIGNATURE_HEADER,
        },
        tables::CodedIndexType,
        token::Token,
    },
    utils::{compressed_int_size, compressed_uint_size},
    Error::LengthMismatch,
    Result,
};

/// A value with a binary signature blob representation.
pub trait BlobSignature {
    /// Number of bytes [`BlobSignature::encode_into`] writes for this value.
    fn physical_length(&self) -> usize;

    /// Append the encoded form to `writer`.
    ///
    /// # Errors
    /// Returns an error if an embedded token is not a `TypeDef`, `TypeRef` or `TypeSpec`, or a
    /// count exceeds the compressed integer range.
    fn encode_into(&self, writer: &mut Writer) -> Result<()>;

    /// Encode into a fresh buffer.
    ///
    /// # Errors
    /// Returns the errors of [`BlobSignature::encode_into`], or
    /// [`crate::Error::LengthMismatch`] if the output disagrees with
    /// [`BlobSignature::physical_length`].
    fn encode(&self) -> Result<Vec<u8>> {
        let expected = self.physical_length();
        let mut writer = Writer::with_capacity(expected);
        self.encode_into(&mut writer)?;

        debug_assert_eq!(
            writer.len(),
            expected,
            "encoded signature length disagrees with physical_length()"
        );
        if writer.len() != expected {
            return Err(LengthMismatch {
                expected,
                actual: writer.len(),
            });
        }

        Ok(writer.into_inner())
    }
}

fn token_size(token: Token) -> usize {
    // invalid tokens are reported by encode_into
    CodedIndexType::TypeDefOrRef
        .encode(token)
        .map_or(1, compressed_uint_size)
}

fn write_token(writer: &mut Writer, token: Token) -> Result<()> {
    if token.is_null() {
        return Err(malformed_error!("Null type token in signature"));
    }

    let encoded = CodedIndexType::TypeDefOrRef.encode(token)?;
    writer.write_compressed_uint(encoded)
}

fn count_u32(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

fn count_size(count: usize) -> usize {
    compressed_uint_size(count_u32(count))
}

impl BlobSignature for CustomModifier {
    fn physical_length(&self) -> usize {
        1 + token_size(self.modifier)
    }

    fn encode_into(&self, writer: &mut Writer) -> Result<()> {
        writer.write_le::<u8>(if self.required {
            ELEMENT_TYPE::CMOD_REQD
        } else {
            ELEMENT_TYPE::CMOD_OPT
        });
        write_token(writer, self.modifier)
    }
}

impl BlobSignature for SignatureArray {
    fn physical_length(&self) -> usize {
        1 + self.base.physical_length()
            + compressed_uint_size(self.rank)
            + count_size(self.sizes.len())
            + self
                .sizes
                .iter()
                .map(|size| compressed_uint_size(*size))
                .sum::<usize>()
            + count_size(self.lower_bounds.len())
            + self
                .lower_bounds
                .iter()
                .map(|bound| compressed_int_size(*bound))
                .sum::<usize>()
    }

    fn encode_into(&self, writer: &mut Writer) -> Result<()> {
        writer.write_le::<u8>(ELEMENT_TYPE::ARRAY);
        self.base.encode_into(writer)?;
        writer.write_compressed_uint(self.rank)?;

        writer.write_compressed_uint(count_u32(self.sizes.len()))?;
        for size in &self.sizes {
            writer.write_compressed_uint(*size)?;
        }

        writer.write_compressed_uint(count_u32(self.lower_bounds.len()))?;
        for bound in &self.lower_bounds {
            writer.write_compressed_int(*bound)?;
        }
        Ok(())
    }
}

impl BlobSignature for TypeSignature {
    fn physical_length(&self) -> usize {
        match self {
            TypeSignature::Ptr(inner)
            | TypeSignature::ByRef(inner)
            | TypeSignature::Pinned(inner)
            | TypeSignature::SzArray(inner) => 1 + inner.physical_length(),
            TypeSignature::Array(array) => array.physical_length(),
            TypeSignature::ValueType(token) | TypeSignature::Class(token) => 1 + token_size(*token),
            TypeSignature::GenericParamType(index) | TypeSignature::GenericParamMethod(index) => {
                1 + compressed_uint_size(*index)
            }
            TypeSignature::GenericInst(base, args) => {
                1 + base.physical_length()
                    + count_size(args.len())
                    + args.iter().map(BlobSignature::physical_length).sum::<usize>()
            }
            TypeSignature::Modified(modifier, inner) => {
                modifier.physical_length() + inner.physical_length()
            }
            TypeSignature::FnPtr(method) => 1 + method.physical_length(),
            _ => 1,
        }
    }

    fn encode_into(&self, writer: &mut Writer) -> Result<()> {
        match self {
            TypeSignature::Void => writer.write_le::<u8>(ELEMENT_TYPE::VOID),
            TypeSignature::Boolean => writer.write_le::<u8>(ELEMENT_TYPE::BOOLEAN),
            TypeSignature::Char => writer.write_le::<u8>(ELEMENT_TYPE::CHAR),
            TypeSignature::I1 => writer.write_le::<u8>(ELEMENT_TYPE::I1),
            TypeSignature::U1 => writer.write_le::<u8>(ELEMENT_TYPE::U1),
            TypeSignature::I2 => writer.write_le::<u8>(ELEMENT_TYPE::I2),
            TypeSignature::U2 => writer.write_le::<u8>(ELEMENT_TYPE::U2),
            TypeSignature::I4 => writer.write_le::<u8>(ELEMENT_TYPE::I4),
            TypeSignature::U4 => writer.write_le::<u8>(ELEMENT_TYPE::U4),
            TypeSignature::I8 => writer.write_le::<u8>(ELEMENT_TYPE::I8),
            TypeSignature::U8 => writer.write_le::<u8>(ELEMENT_TYPE::U8),
            TypeSignature::R4 => writer.write_le::<u8>(ELEMENT_TYPE::R4),
            TypeSignature::R8 => writer.write_le::<u8>(ELEMENT_TYPE::R8),
            TypeSignature::String => writer.write_le::<u8>(ELEMENT_TYPE::STRING),
            TypeSignature::I => writer.write_le::<u8>(ELEMENT_TYPE::I),
            TypeSignature::U => writer.write_le::<u8>(ELEMENT_TYPE::U),
            TypeSignature::Object => writer.write_le::<u8>(ELEMENT_TYPE::OBJECT),
            TypeSignature::TypedByRef => writer.write_le::<u8>(ELEMENT_TYPE::TYPEDBYREF),
            TypeSignature::Ptr(inner) => {
                writer.write_le::<u8>(ELEMENT_TYPE::PTR);
                inner.encode_into(writer)?;
            }
            TypeSignature::ByRef(inner) => {
                writer.write_le::<u8>(ELEMENT_TYPE::BYREF);
                inner.encode_into(writer)?;
            }
            TypeSignature::Pinned(inner) => {
                writer.write_le::<u8>(ELEMENT_TYPE::PINNED);
                inner.encode_into(writer)?;
            }
            TypeSignature::SzArray(inner) => {
                writer.write_le::<u8>(ELEMENT_TYPE::SZARRAY);
                inner.encode_into(writer)?;
            }
            TypeSignature::Array(array) => array.encode_into(writer)?,
            TypeSignature::ValueType(token) => {
                writer.write_le::<u8>(ELEMENT_TYPE::VALUETYPE);
                write_token(writer, *token)?;
            }
            TypeSignature::Class(token) => {
                writer.write_le::<u8>(ELEMENT_TYPE::CLASS);
                write_token(writer, *token)?;
            }
            TypeSignature::GenericParamType(index) => {
                writer.write_le::<u8>(ELEMENT_TYPE::VAR);
                writer.write_compressed_uint(*index)?;
            }
            TypeSignature::GenericParamMethod(index) => {
                writer.write_le::<u8>(ELEMENT_TYPE::MVAR);
                writer.write_compressed_uint(*index)?;
            }
            TypeSignature::GenericInst(base, args) => {
                if !matches!(**base, TypeSignature::Class(_) | TypeSignature::ValueType(_)) {
                    return Err(malformed_error!(
                        "GENERICINST base must be CLASS or VALUETYPE, got {:?}",
                        base
                    ));
                }

                writer.write_le::<u8>(ELEMENT_TYPE::GENERICINST);
                base.encode_into(writer)?;
                writer.write_compressed_uint(count_u32(args.len()))?;
                for arg in args {
                    arg.encode_into(writer)?;
                }
            }
            TypeSignature::Modified(modifier, inner) => {
                modifier.encode_into(writer)?;
                inner.encode_into(writer)?;
            }
            TypeSignature::FnPtr(method) => {
                writer.write_le::<u8>(ELEMENT_TYPE::FNPTR);
                method.encode_into(writer)?;
            }
        }
        Ok(())
    }
}

impl BlobSignature for SignatureParameter {
    fn physical_length(&self) -> usize {
        self.base.physical_length()
    }

    fn encode_into(&self, writer: &mut Writer) -> Result<()> {
        self.base.encode_into(writer)
    }
}

impl SignatureMethod {
    fn convention_byte(&self) -> u8 {
        let mut byte = self.calling_convention as u8;
        if self.generic_param_count > 0 {
            byte |= SIGNATURE_HEADER::GENERIC;
        }
        if self.has_this {
            byte |= SIGNATURE_HEADER::HAS_THIS;
        }
        if self.explicit_this {
            byte |= SIGNATURE_HEADER::EXPLICIT_THIS;
        }
        byte
    }
}

impl BlobSignature for SignatureMethod {
    fn physical_length(&self) -> usize {
        let generic = if self.generic_param_count > 0 {
            compressed_uint_size(self.generic_param_count)
        } else {
            0
        };
        let sentinel = usize::from(!self.varargs.is_empty());

        1 + generic
            + count_size(self.params.len() + self.varargs.len())
            + self.return_type.physical_length()
            + self
                .params
                .iter()
                .chain(self.varargs.iter())
                .map(BlobSignature::physical_length)
                .sum::<usize>()
            + sentinel
    }

    fn encode_into(&self, writer: &mut Writer) -> Result<()> {
        if !self.varargs.is_empty() && !self.calling_convention.allows_varargs() {
            return Err(malformed_error!(
                "Vararg parameters on a {:?} method signature",
                self.calling_convention
            ));
        }

        writer.write_le::<u8>(self.convention_byte());
        if self.generic_param_count > 0 {
            writer.write_compressed_uint(self.generic_param_count)?;
        }

        writer.write_compressed_uint(count_u32(self.params.len() + self.varargs.len()))?;
        self.return_type.encode_into(writer)?;
        for param in &self.params {
            param.encode_into(writer)?;
        }

        if !self.varargs.is_empty() {
            writer.write_le::<u8>(ELEMENT_TYPE::SENTINEL);
            for param in &self.varargs {
                param.encode_into(writer)?;
            }
        }
        Ok(())
    }
}

impl BlobSignature for SignatureField {
    fn physical_length(&self) -> usize {
        1 + self.base.physical_length()
    }

    fn encode_into(&self, writer: &mut Writer) -> Result<()> {
        writer.write_le::<u8>(SIGNATURE_HEADER::FIELD);
        self.base.encode_into(writer)
    }
}

impl BlobSignature for SignatureProperty {
    fn physical_length(&self) -> usize {
        1 + count_size(self.params.len())
            + self.base.physical_length()
            + self
                .params
                .iter()
                .map(BlobSignature::physical_length)
                .sum::<usize>()
    }

    fn encode_into(&self, writer: &mut Writer) -> Result<()> {
        let mut head = SIGNATURE_HEADER::PROPERTY;
        if self.has_this {
            head |= SIGNATURE_HEADER::HAS_THIS;
        }

        writer.write_le::<u8>(head);
        writer.write_compressed_uint(count_u32(self.params.len()))?;
        self.base.encode_into(writer)?;
        for param in &self.params {
            param.encode_into(writer)?;
        }
        Ok(())
    }
}

impl BlobSignature for SignatureLocalVariables {
    fn physical_length(&self) -> usize {
        1 + count_size(self.locals.len())
            + self
                .locals
                .iter()
                .map(BlobSignature::physical_length)
                .sum::<usize>()
    }

    fn encode_into(&self, writer: &mut Writer) -> Result<()> {
        writer.write_le::<u8>(SIGNATURE_HEADER::LOCAL_SIG);
        writer.write_compressed_uint(count_u32(self.locals.len()))?;
        for local in &self.locals {
            local.encode_into(writer)?;
        }
        Ok(())
    }
}

impl BlobSignature for SignatureTypeSpec {
    fn physical_length(&self) -> usize {
        self.base.physical_length()
    }

    fn encode_into(&self, writer: &mut Writer) -> Result<()> {
        self.base.encode_into(writer)
    }
}

impl BlobSignature for SignatureMethodSpec {
    fn physical_length(&self) -> usize {
        1 + count_size(self.generic_args.len())
            + self
                .generic_args
                .iter()
                .map(BlobSignature::physical_length)
                .sum::<usize>()
    }

    fn encode_into(&self, writer: &mut Writer) -> Result<()> {
        writer.write_le::<u8>(SIGNATURE_HEADER::METHOD_SPEC);
        writer.write_compressed_uint(count_u32(self.generic_args.len()))?;
        for arg in &self.generic_args {
            arg.encode_into(writer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::{
            signatures::{
                parse_field_signature, parse_local_var_signature, parse_method_signature,
                parse_method_spec_signature, parse_property_signature, parse_type_spec_signature,
                CallingConvention,
            },
            tables::TableId,
        },
        Error,
    };

    fn type_ref(row: u32) -> Token {
        Token::from_parts(TableId::TypeRef, row)
    }

    #[test]
    fn test_property_name_string_round_trip() {
        let blob = [0x28, 0x00, 0x0E];
        let property = parse_property_signature(&blob).unwrap();

        assert_eq!(property.physical_length(), 3);
        assert_eq!(property.encode().unwrap(), blob);
    }

    #[test]
    fn test_method_round_trips() {
        let blobs: [&[u8]; 5] = [
            // instance void (int32, string)
            &[0x20, 0x02, 0x01, 0x08, 0x0E],
            // !!0 M<T>(!!0)
            &[0x10, 0x01, 0x01, 0x1E, 0x00, 0x1E, 0x00],
            // vararg void (int32, ..., string)
            &[0x05, 0x02, 0x01, 0x08, 0x41, 0x0E],
            // explicit this
            &[0x60, 0x01, 0x01, 0x12, 0x49],
            // class List`1<int32> (valuetype X&)
            &[0x00, 0x01, 0x15, 0x12, 0x49, 0x01, 0x08, 0x10, 0x11, 0x0D],
        ];

        for blob in blobs {
            let method = parse_method_signature(blob).unwrap();
            assert_eq!(method.physical_length(), blob.len());
            assert_eq!(method.encode().unwrap(), blob);
        }
    }

    #[test]
    fn test_vararg_sentinel_only_with_extras() {
        let method = SignatureMethod {
            calling_convention: CallingConvention::VarArg,
            return_type: TypeSignature::Void.into(),
            params: vec![TypeSignature::I4.into()],
            ..SignatureMethod::default()
        };
        assert_eq!(method.encode().unwrap(), vec![0x05, 0x01, 0x01, 0x08]);

        let method = SignatureMethod {
            varargs: vec![TypeSignature::String.into()],
            ..method
        };
        assert_eq!(method.encode().unwrap(), vec![0x05, 0x02, 0x01, 0x08, 0x41, 0x0E]);
    }

    #[test]
    fn test_varargs_on_default_convention_rejected() {
        let method = SignatureMethod {
            varargs: vec![TypeSignature::String.into()],
            ..SignatureMethod::default()
        };
        assert!(matches!(method.encode(), Err(Error::Malformed { .. })));
    }

    #[test]
    fn test_varargs_on_c_convention() {
        // unmanaged cdecl void (int32, ..., string)
        let blob = [0x01, 0x02, 0x01, 0x08, 0x41, 0x0E];
        let method = parse_method_signature(&blob).unwrap();
        assert_eq!(method.calling_convention, CallingConvention::C);
        assert_eq!(method.varargs.len(), 1);
        assert_eq!(method.physical_length(), blob.len());
        assert_eq!(method.encode().unwrap(), blob);
    }

    #[test]
    fn test_array_shape_round_trip() {
        let blob = [0x14, 0x08, 0x03, 0x02, 0x05, 0x06, 0x03, 0x00, 0x7F, 0x80, 0x80];
        let spec = parse_type_spec_signature(&blob).unwrap();

        let TypeSignature::Array(array) = &spec.base else {
            panic!("expected array");
        };
        assert_eq!(array.rank, 3);
        assert_eq!(array.sizes, vec![5, 6]);
        assert_eq!(array.lower_bounds, vec![0, -1, 64]);

        assert_eq!(spec.physical_length(), blob.len());
        assert_eq!(spec.encode().unwrap(), blob);
    }

    #[test]
    fn test_nested_generic_round_trip() {
        // Dictionary<string, List<int[]>>
        let spec = SignatureTypeSpec {
            base: TypeSignature::GenericInst(
                Box::new(TypeSignature::Class(type_ref(1))),
                vec![
                    TypeSignature::String,
                    TypeSignature::GenericInst(
                        Box::new(TypeSignature::Class(type_ref(0x400))),
                        vec![TypeSignature::SzArray(Box::new(TypeSignature::I4))],
                    ),
                ],
            ),
        };

        let encoded = spec.encode().unwrap();
        assert_eq!(encoded.len(), spec.physical_length());
        assert_eq!(parse_type_spec_signature(&encoded).unwrap(), spec);
    }

    #[test]
    fn test_field_with_modifiers_round_trip() {
        let blob = [0x06, 0x20, 0x49, 0x1F, 0x42, 0x0F, 0x01];
        let field = parse_field_signature(&blob).unwrap();
        assert_eq!(field.encode().unwrap(), blob);
    }

    #[test]
    fn test_local_and_method_spec_round_trip() {
        let blob = [0x07, 0x03, 0x45, 0x10, 0x05, 0x1C, 0x13, 0x02];
        let locals = parse_local_var_signature(&blob).unwrap();
        assert_eq!(locals.encode().unwrap(), blob);

        let blob = [0x0A, 0x02, 0x08, 0x11, 0x49];
        let spec = parse_method_spec_signature(&blob).unwrap();
        assert_eq!(spec.encode().unwrap(), blob);
    }

    #[test]
    fn test_fnptr_round_trip() {
        let blob = [0x1B, 0x00, 0x02, 0x01, 0x08, 0x0F, 0x01];
        let spec = parse_type_spec_signature(&blob).unwrap();
        assert_eq!(spec.physical_length(), blob.len());
        assert_eq!(spec.encode().unwrap(), blob);
    }

    #[test]
    fn test_invalid_token_rejected() {
        let spec = SignatureTypeSpec {
            base: TypeSignature::Class(Token::from_parts(TableId::MethodDef, 1)),
        };
        assert!(matches!(
            spec.encode(),
            Err(Error::InvalidCodedIndexTarget { .. })
        ));

        let spec = SignatureTypeSpec {
            base: TypeSignature::Class(Token::NULL),
        };
        assert!(matches!(spec.encode(), Err(Error::Malformed { .. })));
    }

    #[test]
    fn test_large_token_length() {
        let spec = SignatureTypeSpec {
            base: TypeSignature::ValueType(type_ref(0x10_0000)),
        };
        // (0x10_0000 << 2) | 1 needs the 4 byte form
        assert_eq!(spec.physical_length(), 5);
        assert_eq!(spec.encode().unwrap().len(), 5);
    }

    #[test]
    fn test_generic_inst_base_checked() {
        let spec = SignatureTypeSpec {
            base: TypeSignature::GenericInst(Box::new(TypeSignature::I4), vec![TypeSignature::I4]),
        };
        assert!(matches!(spec.encode(), Err(Error::Malformed { .. })));
    }
}
