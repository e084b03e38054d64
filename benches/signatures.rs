//! Benchmarks for the signature codec, the structural comparer and the cloner.
//!
//! - Decoding of method, field, property, local variable and method spec signatures
//! - Re-encoding of decoded signatures
//! - Cross-module comparison of type signatures
//! - Cloning a small type with a method body into a fresh module

extern crate dotgraft;

use criterion::{criterion_group, criterion_main, Criterion};
use dotgraft::{
    cloning::MetadataCloner,
    metadata::{
        comparer::SignatureComparer,
        members::{AssemblyIdentity, AssemblyRef, MethodDef, TypeDef, TypeRef},
        method::{CilOpCode, Instruction, MethodBody, Operand},
        module::Module,
        signatures::{
            parse_field_signature, parse_local_var_signature, parse_method_signature,
            parse_method_spec_signature, parse_property_signature, BlobSignature, SignatureMethod,
            SignatureParameter, TypeSignature,
        },
        token::Token,
    },
};
use std::hint::black_box;

/// Benchmark parsing a method with primitive parameters.
/// Signature: int Method(int a, string b, bool c)
fn bench_decode_method_primitives(c: &mut Criterion) {
    let signature = [0x00, 0x03, 0x08, 0x08, 0x0E, 0x02];

    c.bench_function("decode_method_primitives", |b| {
        b.iter(|| {
            let sig = parse_method_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Benchmark parsing a generic method signature.
/// Signature: T Method<T>(T item)
fn bench_decode_method_generic(c: &mut Criterion) {
    let signature = [0x30, 0x01, 0x01, 0x1E, 0x00, 0x1E, 0x00];

    c.bench_function("decode_method_generic", |b| {
        b.iter(|| {
            let sig = parse_method_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Benchmark parsing a vararg method signature.
/// Signature: void Method(int, ...; string)
fn bench_decode_method_vararg(c: &mut Criterion) {
    let signature = [0x05, 0x02, 0x01, 0x08, 0x41, 0x0E];

    c.bench_function("decode_method_vararg", |b| {
        b.iter(|| {
            let sig = parse_method_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Benchmark parsing a multi-dimensional array field.
/// Signature: int[0...,0...] field
fn bench_decode_field_array(c: &mut Criterion) {
    let signature = [0x06, 0x14, 0x08, 0x02, 0x00, 0x02, 0x00, 0x00];

    c.bench_function("decode_field_array", |b| {
        b.iter(|| {
            let sig = parse_field_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Benchmark parsing an instance property.
/// Signature: string Name { get; }
fn bench_decode_property(c: &mut Criterion) {
    let signature = [0x28, 0x00, 0x0E];

    c.bench_function("decode_property", |b| {
        b.iter(|| {
            let sig = parse_property_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Benchmark parsing a typical set of local variables.
/// Locals: int, string, bool, object, pinned int*, List<int>
fn bench_decode_locals(c: &mut Criterion) {
    let signature = [
        0x07, 0x06, 0x08, 0x0E, 0x02, 0x1C, 0x45, 0x0F, 0x08, 0x15, 0x12, 0x49, 0x01, 0x08,
    ];

    c.bench_function("decode_locals", |b| {
        b.iter(|| {
            let sig = parse_local_var_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Benchmark parsing a method instantiation.
/// Method<int, string>
fn bench_decode_method_spec(c: &mut Criterion) {
    let signature = [0x0A, 0x02, 0x08, 0x0E];

    c.bench_function("decode_method_spec", |b| {
        b.iter(|| {
            let sig = parse_method_spec_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Benchmark encoding a nested generic method signature.
/// Signature: Dictionary<string, List<int>> Method(int[], ref string)
fn bench_encode_method_nested_generic(c: &mut Criterion) {
    let list = TypeSignature::GenericInst(
        Box::new(TypeSignature::Class(Token::new(0x0100_0012))),
        vec![TypeSignature::I4],
    );
    let signature = SignatureMethod {
        return_type: SignatureParameter::from(TypeSignature::GenericInst(
            Box::new(TypeSignature::Class(Token::new(0x0100_0013))),
            vec![TypeSignature::String, list],
        )),
        params: vec![
            SignatureParameter::from(TypeSignature::SzArray(Box::new(TypeSignature::I4))),
            SignatureParameter::from(TypeSignature::ByRef(Box::new(TypeSignature::String))),
        ],
        ..SignatureMethod::default()
    };

    c.bench_function("encode_method_nested_generic", |b| {
        b.iter(|| {
            let blob = black_box(&signature).encode().unwrap();
            black_box(blob)
        });
    });
}

fn module_with_list_ref(name: &str) -> (Module, Token) {
    let mut module = Module::new(name);
    let corlib = module.add_assembly_ref(AssemblyRef::from(&AssemblyIdentity {
        name: "System.Runtime".to_string(),
        ..AssemblyIdentity::default()
    }));
    let list = module.add_type_ref(TypeRef {
        resolution_scope: corlib,
        namespace: "System.Collections.Generic".to_string(),
        name: "List`1".to_string(),
    });
    (module, list)
}

/// Benchmark comparing `List<int>[]` between two module instances.
fn bench_compare_type_signatures(c: &mut Criterion) {
    let (left, left_list) = module_with_list_ref("Left.dll");
    let (right, right_list) = module_with_list_ref("Right.dll");
    let instance = |list| {
        TypeSignature::SzArray(Box::new(TypeSignature::GenericInst(
            Box::new(TypeSignature::Class(list)),
            vec![TypeSignature::I4],
        )))
    };
    let x = instance(left_list);
    let y = instance(right_list);
    let comparer = SignatureComparer::new();

    c.bench_function("compare_type_signatures", |b| {
        b.iter(|| {
            let equal = comparer.type_signature_equals(&left, black_box(&x), &right, black_box(&y));
            black_box(equal)
        });
    });
}

/// Benchmark cloning a type with one method, extending an external type.
fn bench_clone_type(c: &mut Criterion) {
    let (mut source, list) = module_with_list_ref("Source.dll");
    let program = source.add_type_def(TypeDef {
        name: "Program".to_string(),
        extends: list,
        ..TypeDef::default()
    });
    let body = MethodBody {
        instructions: vec![
            Instruction::new(CilOpCode::by_name("nop").unwrap(), Operand::None),
            Instruction::new(CilOpCode::by_name("ret").unwrap(), Operand::None),
        ],
        ..MethodBody::default()
    };
    let main = source.add_method_def(MethodDef {
        name: "Main".to_string(),
        body: Some(body),
        declaring_type: Some(program),
        ..MethodDef::default()
    });
    source.type_def_mut(program).unwrap().methods.push(main);
    let seed = source.handle(program).unwrap();

    c.bench_function("clone_type", |b| {
        b.iter(|| {
            let mut target = Module::new("Target.dll");
            let result = MetadataCloner::new(&source, &mut target)
                .include(seed)
                .clone_members()
                .unwrap();
            black_box(result)
        });
    });
}

criterion_group!(
    benches,
    bench_decode_method_primitives,
    bench_decode_method_generic,
    bench_decode_method_vararg,
    bench_decode_field_array,
    bench_decode_property,
    bench_decode_locals,
    bench_decode_method_spec,
    bench_encode_method_nested_generic,
    bench_compare_type_signatures,
    bench_clone_type,
);
criterion_main!(benches);
