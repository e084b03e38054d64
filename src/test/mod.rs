//! In-memory modules shared by the unit tests.

#![allow(dead_code)]

use crate::metadata::{
    members::{
        AssemblyIdentity, AssemblyRef, AssemblyVersion, CustomAttribute, FieldAttributes,
        FieldDef, MemberRef, MemberRefSignature, MethodAttributes, MethodDef, ParamDef,
        TypeAttributes, TypeDef, TypeRef,
    },
    method::{
        CilLabel, CilOpCode, ExceptionHandler, ExceptionHandlerFlags, Instruction, MethodBody,
        Operand,
    },
    module::Module,
    signatures::{SignatureField, SignatureMethod, SignatureParameter, TypeSignature},
    token::Token,
};

// Helper function to create an instruction by mnemonic
pub fn ins(name: &str, operand: Operand) -> Instruction {
    Instruction::new(CilOpCode::by_name(name).unwrap(), operand)
}

// Helper function to create the identity of the core library
pub fn corlib_identity() -> AssemblyIdentity {
    AssemblyIdentity {
        name: "System.Runtime".to_string(),
        version: AssemblyVersion::new(8, 0, 0, 0),
        culture: String::new(),
        public_key_token: vec![0xB0, 0x3F, 0x5F, 0x7F, 0x11, 0xD5, 0x0A, 0x3A],
    }
}

// Helper function to create an empty module inside its own assembly
pub fn empty_module(assembly: &str, module: &str) -> Module {
    Module::with_assembly(
        module,
        AssemblyIdentity {
            name: assembly.to_string(),
            version: AssemblyVersion::new(1, 0, 0, 0),
            ..AssemblyIdentity::default()
        },
    )
}

// Helper function to create the clone target used by most tests
pub fn target_module() -> Module {
    empty_module("SomeAssembly", "SomeModule")
}

// Helper function to add a type reference into the core library
pub fn add_corlib_type(module: &mut Module, namespace: &str, name: &str) -> Token {
    let identity = corlib_identity();
    let existing = module
        .assembly_refs()
        .find(|(_, row)| row.name == identity.name)
        .map(|(token, _)| token);
    let corlib = existing.unwrap_or_else(|| module.add_assembly_ref(AssemblyRef::from(&identity)));

    module.add_type_ref(TypeRef {
        resolution_scope: corlib,
        namespace: namespace.to_string(),
        name: name.to_string(),
    })
}

/// `HelloWorld.exe`: `Program` with `Main` printing "Hello World!" and a default constructor.
pub struct HelloWorld {
    pub module: Module,
    pub program: Token,
    pub main: Token,
    pub ctor: Token,
    pub object: Token,
    pub console: Token,
    pub write_line: Token,
    pub object_ctor: Token,
    pub attribute_ctor: Token,
}

pub fn hello_world() -> HelloWorld {
    let mut module = empty_module("HelloWorld", "HelloWorld.exe");
    let object = add_corlib_type(&mut module, "System", "Object");
    let console = add_corlib_type(&mut module, "System", "Console");
    let attribute = add_corlib_type(&mut module, "System", "SerializableAttribute");

    let write_line = module.add_member_ref(MemberRef {
        class: console,
        name: "WriteLine".to_string(),
        signature: MemberRefSignature::Method(SignatureMethod {
            return_type: SignatureParameter::from(TypeSignature::Void),
            params: vec![SignatureParameter::from(TypeSignature::String)],
            ..SignatureMethod::default()
        }),
    });
    let instance_ctor = MemberRefSignature::Method(SignatureMethod {
        has_this: true,
        return_type: SignatureParameter::from(TypeSignature::Void),
        ..SignatureMethod::default()
    });
    let object_ctor = module.add_member_ref(MemberRef {
        class: object,
        name: ".ctor".to_string(),
        signature: instance_ctor.clone(),
    });
    let attribute_ctor = module.add_member_ref(MemberRef {
        class: attribute,
        name: ".ctor".to_string(),
        signature: instance_ctor,
    });

    let program = module.add_type_def(TypeDef {
        flags: TypeAttributes::BEFORE_FIELD_INIT,
        namespace: "HelloWorld".to_string(),
        name: "Program".to_string(),
        extends: object,
        ..TypeDef::default()
    });

    let greeting = module.add_user_string("Hello World!").unwrap();
    let args = module.add_param_def(ParamDef {
        sequence: 1,
        name: "args".to_string(),
        ..ParamDef::default()
    });
    let main = module.add_method_def(MethodDef {
        flags: MethodAttributes::PRIVATE | MethodAttributes::STATIC | MethodAttributes::HIDE_BY_SIG,
        name: "Main".to_string(),
        signature: SignatureMethod {
            return_type: SignatureParameter::from(TypeSignature::Void),
            params: vec![SignatureParameter::from(TypeSignature::SzArray(Box::new(
                TypeSignature::String,
            )))],
            ..SignatureMethod::default()
        },
        params: vec![args],
        body: Some(MethodBody {
            instructions: vec![
                ins("ldstr", Operand::Token(greeting)),
                ins("call", Operand::Token(write_line)),
                ins("ret", Operand::None),
            ],
            ..MethodBody::default()
        }),
        declaring_type: Some(program),
        ..MethodDef::default()
    });
    module.param_def_mut(args).unwrap().method = main;

    let ctor = module.add_method_def(MethodDef {
        flags: MethodAttributes::PUBLIC | MethodAttributes::HIDE_BY_SIG,
        name: ".ctor".to_string(),
        signature: SignatureMethod {
            has_this: true,
            return_type: SignatureParameter::from(TypeSignature::Void),
            ..SignatureMethod::default()
        },
        body: Some(MethodBody {
            instructions: vec![
                ins("ldarg.0", Operand::None),
                ins("call", Operand::Token(object_ctor)),
                ins("ret", Operand::None),
            ],
            ..MethodBody::default()
        }),
        declaring_type: Some(program),
        ..MethodDef::default()
    });

    let row = module.type_def_mut(program).unwrap();
    row.methods.push(main);
    row.methods.push(ctor);
    module.add_custom_attribute(CustomAttribute {
        parent: program,
        constructor: attribute_ctor,
        value: vec![0x01, 0x00, 0x00, 0x00],
    });
    module.attach_top_level_type(program).unwrap();

    HelloWorld {
        module,
        program,
        main,
        ctor,
        object,
        console,
        write_line,
        object_ctor,
        attribute_ctor,
    }
}

/// `MethodBodyTypes` with a static `Switch(int)` method mixing short and long branches, a
/// switch table and a `try`/`finally` region.
pub struct Branches {
    pub module: Module,
    pub declaring: Token,
    pub switch: Token,
}

pub fn branches() -> Branches {
    let mut module = empty_module("TestCases", "TestCases.dll");
    let object = add_corlib_type(&mut module, "System", "Object");
    let declaring = module.add_type_def(TypeDef {
        namespace: "TestCases.Methods".to_string(),
        name: "MethodBodyTypes".to_string(),
        extends: object,
        ..TypeDef::default()
    });

    // 0: ldarg.0
    // 1: switch (4, 6, 8)
    // 2: br.s 10
    // 3: nop
    // 4: ldc.i4.1
    // 5: br 11
    // 6: ldc.i4.2
    // 7: br.s 11
    // 8: ldc.i4.3
    // 9: br.s 11
    // 10: ldc.i4.m1
    // 11: stloc.0
    // 12: leave.s 14
    // 13: endfinally
    // 14: ldloc.0
    // 15: ret
    let instructions = vec![
        ins("ldarg.0", Operand::None),
        ins(
            "switch",
            Operand::Switch(vec![CilLabel(4), CilLabel(6), CilLabel(8)]),
        ),
        ins("br.s", Operand::Target(CilLabel(10))),
        ins("nop", Operand::None),
        ins("ldc.i4.1", Operand::None),
        ins("br", Operand::Target(CilLabel(11))),
        ins("ldc.i4.2", Operand::None),
        ins("br.s", Operand::Target(CilLabel(11))),
        ins("ldc.i4.3", Operand::None),
        ins("br.s", Operand::Target(CilLabel(11))),
        ins("ldc.i4.m1", Operand::None),
        ins("stloc.0", Operand::None),
        ins("leave.s", Operand::Target(CilLabel(14))),
        ins("endfinally", Operand::None),
        ins("ldloc.0", Operand::None),
        ins("ret", Operand::None),
    ];

    let switch = module.add_method_def(MethodDef {
        flags: MethodAttributes::PUBLIC | MethodAttributes::STATIC,
        name: "Switch".to_string(),
        signature: SignatureMethod {
            return_type: SignatureParameter::from(TypeSignature::I4),
            params: vec![SignatureParameter::from(TypeSignature::I4)],
            ..SignatureMethod::default()
        },
        body: Some(MethodBody {
            max_stack: 2,
            init_locals: true,
            instructions,
            exception_handlers: vec![ExceptionHandler {
                flags: ExceptionHandlerFlags::FINALLY,
                try_start: CilLabel(0),
                try_end: CilLabel(13),
                handler_start: CilLabel(13),
                handler_end: CilLabel(14),
                filter_start: None,
                catch_type: Token::NULL,
            }],
            ..MethodBody::default()
        }),
        declaring_type: Some(declaring),
        ..MethodDef::default()
    });
    module.type_def_mut(declaring).unwrap().methods.push(switch);
    module.attach_top_level_type(declaring).unwrap();

    Branches {
        module,
        declaring,
        switch,
    }
}

/// Two types referring to each other through fields and a method signature.
pub struct Cycle {
    pub module: Module,
    pub a: Token,
    pub b: Token,
    pub a_field: Token,
    pub b_field: Token,
    pub a_method: Token,
}

pub fn cycle() -> Cycle {
    let mut module = empty_module("Cycle", "Cycle.dll");
    let object = add_corlib_type(&mut module, "System", "Object");
    let a = module.add_type_def(TypeDef {
        namespace: "Cycle".to_string(),
        name: "A".to_string(),
        extends: object,
        ..TypeDef::default()
    });
    let b = module.add_type_def(TypeDef {
        namespace: "Cycle".to_string(),
        name: "B".to_string(),
        extends: object,
        ..TypeDef::default()
    });

    let a_field = module.add_field_def(FieldDef {
        flags: FieldAttributes::PUBLIC,
        name: "Other".to_string(),
        signature: SignatureField {
            base: TypeSignature::Class(b),
        },
        declaring_type: Some(a),
        constant: None,
    });
    let b_field = module.add_field_def(FieldDef {
        flags: FieldAttributes::PUBLIC,
        name: "Other".to_string(),
        signature: SignatureField {
            base: TypeSignature::Class(a),
        },
        declaring_type: Some(b),
        constant: None,
    });
    let a_method = module.add_method_def(MethodDef {
        flags: MethodAttributes::PUBLIC,
        name: "GetOther".to_string(),
        signature: SignatureMethod {
            has_this: true,
            return_type: SignatureParameter::from(TypeSignature::Class(b)),
            ..SignatureMethod::default()
        },
        body: Some(MethodBody {
            instructions: vec![
                ins("ldarg.0", Operand::None),
                ins("ldfld", Operand::Token(a_field)),
                ins("ret", Operand::None),
            ],
            ..MethodBody::default()
        }),
        declaring_type: Some(a),
        ..MethodDef::default()
    });

    let row = module.type_def_mut(a).unwrap();
    row.fields.push(a_field);
    row.methods.push(a_method);
    module.type_def_mut(b).unwrap().fields.push(b_field);

    Cycle {
        module,
        a,
        b,
        a_field,
        b_field,
        a_method,
    }
}

/// One type whose two static methods call each other.
pub struct MutualCalls {
    pub module: Module,
    pub calls: Token,
    pub a: Token,
    pub b: Token,
}

pub fn mutual_calls() -> MutualCalls {
    let mut module = empty_module("Calls", "Calls.dll");
    let object = add_corlib_type(&mut module, "System", "Object");
    let calls = module.add_type_def(TypeDef {
        namespace: "Cycle".to_string(),
        name: "Calls".to_string(),
        extends: object,
        ..TypeDef::default()
    });

    let method = |name: &str| MethodDef {
        flags: MethodAttributes::PUBLIC | MethodAttributes::STATIC,
        name: name.to_string(),
        signature: SignatureMethod {
            return_type: SignatureParameter::from(TypeSignature::Void),
            ..SignatureMethod::default()
        },
        declaring_type: Some(calls),
        ..MethodDef::default()
    };
    let a = module.add_method_def(method("A"));
    let b = module.add_method_def(method("B"));

    let body = |callee: Token| MethodBody {
        instructions: vec![
            ins("call", Operand::Token(callee)),
            ins("ret", Operand::None),
        ],
        ..MethodBody::default()
    };
    module.method_def_mut(a).unwrap().body = Some(body(b));
    module.method_def_mut(b).unwrap().body = Some(body(a));
    module.type_def_mut(calls).unwrap().methods.extend([a, b]);
    module.attach_top_level_type(calls).unwrap();

    MutualCalls {
        module,
        calls,
        a,
        b,
    }
}
