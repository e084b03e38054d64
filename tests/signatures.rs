//! Integration tests for the compressed integer codec, coded indices and signature blobs.
//!
//! Blobs are taken from real assemblies where possible; the generated cases check that every
//! value the model can express survives decoding and that the length prediction never drifts
//! from the bytes written.

use dotgraft::{
    metadata::{
        signatures::{
            parse_field_signature, parse_local_var_signature, parse_method_signature,
            parse_method_spec_signature, parse_property_signature, parse_type_spec_signature,
            BlobSignature, CallingConvention, CustomModifier, SignatureArray, SignatureField,
            SignatureLocalVariables, SignatureMethod, SignatureMethodSpec, SignatureParameter,
            SignatureProperty, TypeSignature,
        },
        tables::{CodedIndexType, TableId},
        token::Token,
    },
    utils::{
        read_compressed_int, read_compressed_uint, write_compressed_int, write_compressed_uint,
        MAX_COMPRESSED_INT, MAX_COMPRESSED_UINT, MIN_COMPRESSED_INT,
    },
    Error, Result,
};
use proptest::prelude::*;
use strum::IntoEnumIterator;

#[test]
fn compressed_uint_boundaries() -> Result<()> {
    let cases: [(u32, &[u8]); 6] = [
        (0x00, &[0x00]),
        (0x7F, &[0x7F]),
        (0x80, &[0x80, 0x80]),
        (0x3FFF, &[0xBF, 0xFF]),
        (0x4000, &[0xC0, 0x00, 0x40, 0x00]),
        (MAX_COMPRESSED_UINT, &[0xDF, 0xFF, 0xFF, 0xFF]),
    ];

    for (value, bytes) in cases {
        let mut out = Vec::new();
        write_compressed_uint(value, &mut out)?;
        assert_eq!(out, bytes, "encoding of {value:#x}");

        let mut offset = 0;
        assert_eq!(read_compressed_uint(bytes, &mut offset)?, value);
        assert_eq!(offset, bytes.len());
    }

    let mut out = Vec::new();
    assert!(matches!(
        write_compressed_uint(MAX_COMPRESSED_UINT + 1, &mut out),
        Err(Error::ValueOutOfRange(_))
    ));
    Ok(())
}

#[test]
fn compressed_int_boundaries() -> Result<()> {
    let cases: [(i32, &[u8]); 6] = [
        (3, &[0x06]),
        (-3, &[0x7B]),
        (64, &[0x80, 0x80]),
        (-64, &[0x01]),
        (8192, &[0xC0, 0x00, 0x40, 0x00]),
        (-8192, &[0x80, 0x01]),
    ];

    for (value, bytes) in cases {
        let mut out = Vec::new();
        write_compressed_int(value, &mut out)?;
        assert_eq!(out, bytes, "encoding of {value}");

        let mut offset = 0;
        assert_eq!(read_compressed_int(bytes, &mut offset)?, value);
    }

    let mut out = Vec::new();
    assert!(write_compressed_int(MAX_COMPRESSED_INT + 1, &mut out).is_err());
    assert!(write_compressed_int(MIN_COMPRESSED_INT - 1, &mut out).is_err());
    Ok(())
}

#[test]
fn compressed_reads_fail_on_truncation() {
    for bytes in [&[][..], &[0x80][..], &[0xC0, 0x00, 0x00][..]] {
        let mut offset = 0;
        assert!(matches!(
            read_compressed_uint(bytes, &mut offset),
            Err(Error::TruncatedData)
        ));
    }
}

#[test]
fn coded_index_examples() -> Result<()> {
    let type_ref = Token::from_parts(TableId::TypeRef, 0x12);
    assert_eq!(CodedIndexType::TypeDefOrRef.encode(type_ref)?, 0x49);
    assert_eq!(CodedIndexType::TypeDefOrRef.decode(0x49)?, type_ref);

    let member_ref = Token::from_parts(TableId::MemberRef, 96);
    assert_eq!(CodedIndexType::CustomAttributeType.encode(member_ref)?, 0x0303);
    assert_eq!(CodedIndexType::CustomAttributeType.decode(0x0303)?, member_ref);

    assert!(matches!(
        CodedIndexType::TypeDefOrRef.encode(Token::from_parts(TableId::MethodDef, 1)),
        Err(Error::InvalidCodedIndexTarget { .. })
    ));
    assert!(CodedIndexType::CustomAttributeType.decode(0x0009).is_err());
    assert_eq!(CodedIndexType::ResolutionScope.decode(0x0002)?, Token::NULL);
    Ok(())
}

#[test]
fn coded_index_every_candidate() -> Result<()> {
    for kind in CodedIndexType::iter() {
        for table in kind.candidates() {
            for row in [1, 0x3FF, 0xFF_FFFF] {
                let token = Token::from_parts(table, row);
                assert_eq!(kind.decode(kind.encode(token)?)?, token, "{}", kind.name());
            }
        }
    }
    Ok(())
}

#[test]
fn property_blob_is_reproduced() -> Result<()> {
    let blob = [0x28, 0x00, 0x0E];
    let property = parse_property_signature(&blob)?;
    assert_eq!(
        property,
        SignatureProperty {
            has_this: true,
            base: TypeSignature::String,
            params: Vec::new(),
        }
    );
    assert_eq!(property.encode()?, blob);
    Ok(())
}

#[test]
fn real_world_blobs_are_reproduced() -> Result<()> {
    // void Main(string[])
    let main = [0x00, 0x01, 0x01, 0x1D, 0x0E];
    assert_eq!(parse_method_signature(&main)?.encode()?, main);

    // instance void .ctor()
    let ctor = [0x20, 0x00, 0x01];
    let signature = parse_method_signature(&ctor)?;
    assert!(signature.has_this);
    assert_eq!(signature.encode()?, ctor);

    // List<int> field
    let field = [0x06, 0x15, 0x12, 0x49, 0x01, 0x08];
    assert_eq!(parse_field_signature(&field)?.encode()?, field);

    // int[0...,0...]
    let array = [0x06, 0x14, 0x08, 0x02, 0x00, 0x02, 0x00, 0x00];
    assert_eq!(parse_field_signature(&array)?.encode()?, array);

    // int, pinned int*
    let locals = [0x07, 0x02, 0x08, 0x45, 0x0F, 0x08];
    assert_eq!(parse_local_var_signature(&locals)?.encode()?, locals);

    // Method<int, string>
    let spec = [0x0A, 0x02, 0x08, 0x0E];
    assert_eq!(parse_method_spec_signature(&spec)?.encode()?, spec);

    // List<!0>
    let type_spec = [0x15, 0x12, 0x49, 0x01, 0x13, 0x00];
    assert_eq!(parse_type_spec_signature(&type_spec)?.encode()?, type_spec);
    Ok(())
}

#[test]
fn vararg_sentinel_survives() -> Result<()> {
    let blob = [0x05, 0x02, 0x01, 0x08, 0x41, 0x0E];
    let signature = parse_method_signature(&blob)?;
    assert_eq!(signature.params.len(), 1);
    assert_eq!(signature.varargs.len(), 1);
    assert_eq!(signature.encode()?, blob);
    Ok(())
}

#[test]
fn malformed_blobs_are_rejected() {
    // truncated parameter list
    assert!(parse_method_signature(&[0x00, 0x02, 0x01, 0x08]).is_err());
    // wrong field header
    assert!(parse_field_signature(&[0x07, 0x08]).is_err());
    // unknown element type
    assert!(parse_field_signature(&[0x06, 0x42]).is_err());
    // generic instance of a primitive
    assert!(parse_field_signature(&[0x06, 0x15, 0x08, 0x01, 0x08]).is_err());
}

#[test]
fn oversized_array_counts_fail_without_allocating() {
    let blob = [0x14, 0x08, 0xDF, 0xFF, 0xFF, 0xFF, 0xDF, 0xFF, 0xFF, 0xFF];
    assert!(matches!(
        parse_type_spec_signature(&blob),
        Err(Error::TruncatedData)
    ));
}

#[test]
fn coded_rows_beyond_token_range_are_rejected() {
    assert!(matches!(
        CodedIndexType::TypeDefOrRef.decode(0x0400_0004),
        Err(Error::ValueOutOfRange(_))
    ));
    assert!(matches!(
        CodedIndexType::HasFieldMarshal.decode(0x0200_0000),
        Err(Error::ValueOutOfRange(_))
    ));
    assert!(matches!(
        parse_field_signature(&[0x06, 0x12, 0xC4, 0x00, 0x00, 0x04]),
        Err(Error::ValueOutOfRange(_))
    ));
}

#[test]
fn decoded_headers_re_encode_unchanged() -> Result<()> {
    // cdecl vararg
    let blob = [0x01, 0x02, 0x01, 0x08, 0x41, 0x0E];
    assert_eq!(parse_method_signature(&blob)?.encode()?, blob);

    // sentinel outside a vararg convention
    assert!(parse_method_signature(&[0x00, 0x02, 0x01, 0x08, 0x41, 0x0E]).is_err());
    // stray header bits
    assert!(parse_property_signature(&[0x48, 0x00, 0x0E]).is_err());
    assert!(parse_field_signature(&[0x26, 0x08]).is_err());
    Ok(())
}

#[test]
fn deep_nesting_hits_the_recursion_limit() {
    let mut blob = vec![0x06];
    blob.extend(std::iter::repeat(0x1D).take(1000));
    blob.push(0x08);
    assert!(matches!(
        parse_field_signature(&blob),
        Err(Error::RecursionLimit(_))
    ));
}

fn type_token() -> impl Strategy<Value = Token> {
    prop_oneof![
        (1u32..0x1000).prop_map(|row| Token::from_parts(TableId::TypeDef, row)),
        (1u32..0x1000).prop_map(|row| Token::from_parts(TableId::TypeRef, row)),
        (1u32..0x1000).prop_map(|row| Token::from_parts(TableId::TypeSpec, row)),
    ]
}

fn type_signature() -> impl Strategy<Value = TypeSignature> {
    let leaf = prop_oneof![
        Just(TypeSignature::Boolean),
        Just(TypeSignature::Char),
        Just(TypeSignature::I4),
        Just(TypeSignature::U8),
        Just(TypeSignature::R8),
        Just(TypeSignature::String),
        Just(TypeSignature::Object),
        Just(TypeSignature::I),
        type_token().prop_map(TypeSignature::Class),
        type_token().prop_map(TypeSignature::ValueType),
        (0u32..0x5000).prop_map(TypeSignature::GenericParamType),
        (0u32..0x5000).prop_map(TypeSignature::GenericParamMethod),
    ];

    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(|base| TypeSignature::SzArray(Box::new(base))),
            inner.clone().prop_map(|base| TypeSignature::Ptr(Box::new(base))),
            inner.clone().prop_map(|base| TypeSignature::ByRef(Box::new(base))),
            inner.clone().prop_map(|base| TypeSignature::Pinned(Box::new(base))),
            (any::<bool>(), type_token(), inner.clone()).prop_map(|(required, modifier, base)| {
                TypeSignature::Modified(CustomModifier { required, modifier }, Box::new(base))
            }),
            (inner.clone(), prop::collection::vec(inner.clone(), 0..3)).prop_map(
                |(return_type, params)| {
                    TypeSignature::FnPtr(Box::new(SignatureMethod {
                        return_type: SignatureParameter::from(return_type),
                        params: params.into_iter().map(SignatureParameter::from).collect(),
                        ..SignatureMethod::default()
                    }))
                },
            ),
            (
                inner.clone(),
                1u32..4,
                prop::collection::vec(0u32..0x200, 0..2),
                prop::collection::vec(-0x100i32..0x100, 0..2),
            )
                .prop_map(|(base, rank, sizes, lower_bounds)| {
                    TypeSignature::Array(SignatureArray {
                        base: Box::new(base),
                        rank: rank.max(2),
                        sizes,
                        lower_bounds,
                    })
                }),
            (type_token(), prop::collection::vec(inner, 1..4)).prop_map(|(token, args)| {
                TypeSignature::GenericInst(Box::new(TypeSignature::Class(token)), args)
            }),
        ]
    })
}

proptest! {
    #[test]
    fn compressed_uint_round_trip(value in 0u32..=MAX_COMPRESSED_UINT) {
        let mut out = Vec::new();
        write_compressed_uint(value, &mut out).unwrap();
        let mut offset = 0;
        prop_assert_eq!(read_compressed_uint(&out, &mut offset).unwrap(), value);
        prop_assert_eq!(offset, out.len());
    }

    #[test]
    fn compressed_int_round_trip(value in MIN_COMPRESSED_INT..=MAX_COMPRESSED_INT) {
        let mut out = Vec::new();
        write_compressed_int(value, &mut out).unwrap();
        let mut offset = 0;
        prop_assert_eq!(read_compressed_int(&out, &mut offset).unwrap(), value);
    }

    #[test]
    fn field_signatures_round_trip(base in type_signature()) {
        let field = SignatureField { base };
        let blob = field.encode().unwrap();
        prop_assert_eq!(blob.len(), field.physical_length());
        prop_assert_eq!(parse_field_signature(&blob).unwrap(), field);
    }

    #[test]
    fn method_signatures_round_trip(
        has_this in any::<bool>(),
        generic_param_count in 0u32..3,
        return_type in type_signature(),
        params in prop::collection::vec(type_signature(), 0..5),
    ) {
        let method = SignatureMethod {
            has_this,
            generic_param_count,
            return_type: SignatureParameter::from(return_type),
            params: params.into_iter().map(SignatureParameter::from).collect(),
            ..SignatureMethod::default()
        };
        let blob = method.encode().unwrap();
        prop_assert_eq!(blob.len(), method.physical_length());
        prop_assert_eq!(parse_method_signature(&blob).unwrap(), method);
    }

    #[test]
    fn vararg_method_signatures_round_trip(
        unmanaged in any::<bool>(),
        return_type in type_signature(),
        params in prop::collection::vec(type_signature(), 0..3),
        varargs in prop::collection::vec(type_signature(), 1..3),
    ) {
        let method = SignatureMethod {
            calling_convention: if unmanaged {
                CallingConvention::C
            } else {
                CallingConvention::VarArg
            },
            return_type: SignatureParameter::from(return_type),
            params: params.into_iter().map(SignatureParameter::from).collect(),
            varargs: varargs.into_iter().map(SignatureParameter::from).collect(),
            ..SignatureMethod::default()
        };
        let blob = method.encode().unwrap();
        prop_assert_eq!(blob.len(), method.physical_length());
        prop_assert_eq!(parse_method_signature(&blob).unwrap(), method);
    }

    #[test]
    fn property_signatures_round_trip(
        has_this in any::<bool>(),
        base in type_signature(),
        params in prop::collection::vec(type_signature(), 0..3),
    ) {
        let property = SignatureProperty {
            has_this,
            base,
            params: params.into_iter().map(SignatureParameter::from).collect(),
        };
        let blob = property.encode().unwrap();
        prop_assert_eq!(blob.len(), property.physical_length());
        prop_assert_eq!(parse_property_signature(&blob).unwrap(), property);
    }

    #[test]
    fn method_spec_signatures_round_trip(
        generic_args in prop::collection::vec(type_signature(), 1..4),
    ) {
        let spec = SignatureMethodSpec { generic_args };
        let blob = spec.encode().unwrap();
        prop_assert_eq!(blob.len(), spec.physical_length());
        prop_assert_eq!(parse_method_spec_signature(&blob).unwrap(), spec);
    }

    #[test]
    fn local_signatures_round_trip(locals in prop::collection::vec(type_signature(), 0..6)) {
        let signature = SignatureLocalVariables { locals };
        let blob = signature.encode().unwrap();
        prop_assert_eq!(blob.len(), signature.physical_length());
        prop_assert_eq!(parse_local_var_signature(&blob).unwrap(), signature);
    }
}
