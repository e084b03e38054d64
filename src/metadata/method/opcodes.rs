//! CIL opcode table (ECMA-335 Partition III).
//!
//! Single-byte opcodes are indexed by their byte in [`INSTRUCTIONS`], opcodes behind the `0xFE`
//! prefix by their second byte in [`INSTRUCTIONS_FE`]. Unassigned slots carry an empty mnemonic.

/// Kind of operand following an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandType {
    /// No operand present
    None,
    /// Signed 8-bit integer
    Int8,
    /// Unsigned 8-bit integer (short argument and local indices, `unaligned.`)
    UInt8,
    /// Unsigned 16-bit integer (long argument and local indices)
    UInt16,
    /// Signed 32-bit integer
    Int32,
    /// Signed 64-bit integer
    Int64,
    /// 32-bit floating point
    Float32,
    /// 64-bit floating point
    Float64,
    /// Metadata token
    Token,
    /// Signed 8-bit branch displacement
    ShortBranch,
    /// Signed 32-bit branch displacement
    Branch,
    /// Switch table: `u32` count followed by signed 32-bit displacements
    Switch,
}

impl OperandType {
    /// Size in bytes of this operand, `None` for the variable sized switch table.
    #[must_use]
    pub const fn size(&self) -> Option<usize> {
        match self {
            OperandType::None => Some(0),
            OperandType::Int8 | OperandType::UInt8 | OperandType::ShortBranch => Some(1),
            OperandType::UInt16 => Some(2),
            OperandType::Int32
            | OperandType::Float32
            | OperandType::Token
            | OperandType::Branch => Some(4),
            OperandType::Int64 | OperandType::Float64 => Some(8),
            OperandType::Switch => None,
        }
    }
}

/// Static description of one CIL opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CilOpCode {
    /// Mnemonic, empty for unassigned opcodes
    pub instr: &'static str,
    /// `0xFE` for two byte opcodes, `0` otherwise
    pub prefix: u8,
    /// The opcode byte following the prefix
    pub opcode: u8,
    /// Operand following the opcode
    pub op_type: OperandType,
}

impl CilOpCode {
    /// Number of bytes taken by the opcode itself.
    #[must_use]
    pub const fn opcode_size(&self) -> usize {
        if self.prefix == 0 {
            1
        } else {
            2
        }
    }

    /// Returns `true` for `br*`, `b*`, `leave*` opcodes.
    #[must_use]
    pub fn is_branch(&self) -> bool {
        matches!(self.op_type, OperandType::ShortBranch | OperandType::Branch)
    }

    /// Look up an opcode by prefix and opcode byte.
    #[must_use]
    pub fn lookup(prefix: u8, opcode: u8) -> Option<&'static CilOpCode> {
        let table: &'static [CilOpCode] = match prefix {
            0 => &INSTRUCTIONS,
            0xFE => &INSTRUCTIONS_FE,
            _ => return None,
        };
        table
            .get(opcode as usize)
            .filter(|entry| !entry.instr.is_empty())
    }

    /// Look up an opcode by mnemonic.
    #[must_use]
    pub fn by_name(name: &str) -> Option<&'static CilOpCode> {
        INSTRUCTIONS
            .iter()
            .chain(INSTRUCTIONS_FE.iter())
            .find(|entry| !entry.instr.is_empty() && entry.instr == name)
    }
}

macro_rules! op {
    ($prefix:expr, $code:expr, $name:expr, $op:ident) => {
        CilOpCode {
            instr: $name,
            prefix: $prefix,
            opcode: $code,
            op_type: OperandType::$op,
        }
    };
    ($code:expr, $name:expr, $op:ident) => {
        op!(0x00, $code, $name, $op)
    };
    ($code:expr) => {
        op!(0x00, $code, "", None)
    };
}

macro_rules! op_fe {
    ($code:expr, $name:expr, $op:ident) => {
        op!(0xFE, $code, $name, $op)
    };
    ($code:expr) => {
        op!(0xFE, $code, "", None)
    };
}

/// Single byte opcodes `0x00..=0xE0`.
#[rustfmt::skip]
pub static INSTRUCTIONS: [CilOpCode; 0xE1] = [
    op!(0x00, "nop", None),
    op!(0x01, "break", None),
    op!(0x02, "ldarg.0", None),
    op!(0x03, "ldarg.1", None),
    op!(0x04, "ldarg.2", None),
    op!(0x05, "ldarg.3", None),
    op!(0x06, "ldloc.0", None),
    op!(0x07, "ldloc.1", None),
    op!(0x08, "ldloc.2", None),
    op!(0x09, "ldloc.3", None),
    op!(0x0A, "stloc.0", None),
    op!(0x0B, "stloc.1", None),
    op!(0x0C, "stloc.2", None),
    op!(0x0D, "stloc.3", None),
    op!(0x0E, "ldarg.s", UInt8),
    op!(0x0F, "ldarga.s", UInt8),
    op!(0x10, "starg.s", UInt8),
    op!(0x11, "ldloc.s", UInt8),
    op!(0x12, "ldloca.s", UInt8),
    op!(0x13, "stloc.s", UInt8),
    op!(0x14, "ldnull", None),
    op!(0x15, "ldc.i4.m1", None),
    op!(0x16, "ldc.i4.0", None),
    op!(0x17, "ldc.i4.1", None),
    op!(0x18, "ldc.i4.2", None),
    op!(0x19, "ldc.i4.3", None),
    op!(0x1A, "ldc.i4.4", None),
    op!(0x1B, "ldc.i4.5", None),
    op!(0x1C, "ldc.i4.6", None),
    op!(0x1D, "ldc.i4.7", None),
    op!(0x1E, "ldc.i4.8", None),
    op!(0x1F, "ldc.i4.s", Int8),
    op!(0x20, "ldc.i4", Int32),
    op!(0x21, "ldc.i8", Int64),
    op!(0x22, "ldc.r4", Float32),
    op!(0x23, "ldc.r8", Float64),
    op!(0x24),
    op!(0x25, "dup", None),
    op!(0x26, "pop", None),
    op!(0x27, "jmp", Token),
    op!(0x28, "call", Token),
    op!(0x29, "calli", Token),
    op!(0x2A, "ret", None),
    op!(0x2B, "br.s", ShortBranch),
    op!(0x2C, "brfalse.s", ShortBranch),
    op!(0x2D, "brtrue.s", ShortBranch),
    op!(0x2E, "beq.s", ShortBranch),
    op!(0x2F, "bge.s", ShortBranch),
    op!(0x30, "bgt.s", ShortBranch),
    op!(0x31, "ble.s", ShortBranch),
    op!(0x32, "blt.s", ShortBranch),
    op!(0x33, "bne.un.s", ShortBranch),
    op!(0x34, "bge.un.s", ShortBranch),
    op!(0x35, "bgt.un.s", ShortBranch),
    op!(0x36, "ble.un.s", ShortBranch),
    op!(0x37, "blt.un.s", ShortBranch),
    op!(0x38, "br", Branch),
    op!(0x39, "brfalse", Branch),
    op!(0x3A, "brtrue", Branch),
    op!(0x3B, "beq", Branch),
    op!(0x3C, "bge", Branch),
    op!(0x3D, "bgt", Branch),
    op!(0x3E, "ble", Branch),
    op!(0x3F, "blt", Branch),
    op!(0x40, "bne.un", Branch),
    op!(0x41, "bge.un", Branch),
    op!(0x42, "bgt.un", Branch),
    op!(0x43, "ble.un", Branch),
    op!(0x44, "blt.un", Branch),
    op!(0x45, "switch", Switch),
    op!(0x46, "ldind.i1", None),
    op!(0x47, "ldind.u1", None),
    op!(0x48, "ldind.i2", None),
    op!(0x49, "ldind.u2", None),
    op!(0x4A, "ldind.i4", None),
    op!(0x4B, "ldind.u4", None),
    op!(0x4C, "ldind.i8", None),
    op!(0x4D, "ldind.i", None),
    op!(0x4E, "ldind.r4", None),
    op!(0x4F, "ldind.r8", None),
    op!(0x50, "ldind.ref", None),
    op!(0x51, "stind.ref", None),
    op!(0x52, "stind.i1", None),
    op!(0x53, "stind.i2", None),
    op!(0x54, "stind.i4", None),
    op!(0x55, "stind.i8", None),
    op!(0x56, "stind.r4", None),
    op!(0x57, "stind.r8", None),
    op!(0x58, "add", None),
    op!(0x59, "sub", None),
    op!(0x5A, "mul", None),
    op!(0x5B, "div", None),
    op!(0x5C, "div.un", None),
    op!(0x5D, "rem", None),
    op!(0x5E, "rem.un", None),
    op!(0x5F, "and", None),
    op!(0x60, "or", None),
    op!(0x61, "xor", None),
    op!(0x62, "shl", None),
    op!(0x63, "shr", None),
    op!(0x64, "shr.un", None),
    op!(0x65, "neg", None),
    op!(0x66, "not", None),
    op!(0x67, "conv.i1", None),
    op!(0x68, "conv.i2", None),
    op!(0x69, "conv.i4", None),
    op!(0x6A, "conv.i8", None),
    op!(0x6B, "conv.r4", None),
    op!(0x6C, "conv.r8", None),
    op!(0x6D, "conv.u4", None),
    op!(0x6E, "conv.u8", None),
    op!(0x6F, "callvirt", Token),
    op!(0x70, "cpobj", Token),
    op!(0x71, "ldobj", Token),
    op!(0x72, "ldstr", Token),
    op!(0x73, "newobj", Token),
    op!(0x74, "castclass", Token),
    op!(0x75, "isinst", Token),
    op!(0x76, "conv.r.un", None),
    op!(0x77),
    op!(0x78),
    op!(0x79, "unbox", Token),
    op!(0x7A, "throw", None),
    op!(0x7B, "ldfld", Token),
    op!(0x7C, "ldflda", Token),
    op!(0x7D, "stfld", Token),
    op!(0x7E, "ldsfld", Token),
    op!(0x7F, "ldsflda", Token),
    op!(0x80, "stsfld", Token),
    op!(0x81, "stobj", Token),
    op!(0x82, "conv.ovf.i1.un", None),
    op!(0x83, "conv.ovf.i2.un", None),
    op!(0x84, "conv.ovf.i4.un", None),
    op!(0x85, "conv.ovf.i8.un", None),
    op!(0x86, "conv.ovf.u1.un", None),
    op!(0x87, "conv.ovf.u2.un", None),
    op!(0x88, "conv.ovf.u4.un", None),
    op!(0x89, "conv.ovf.u8.un", None),
    op!(0x8A, "conv.ovf.i.un", None),
    op!(0x8B, "conv.ovf.u.un", None),
    op!(0x8C, "box", Token),
    op!(0x8D, "newarr", Token),
    op!(0x8E, "ldlen", None),
    op!(0x8F, "ldelema", Token),
    op!(0x90, "ldelem.i1", None),
    op!(0x91, "ldelem.u1", None),
    op!(0x92, "ldelem.i2", None),
    op!(0x93, "ldelem.u2", None),
    op!(0x94, "ldelem.i4", None),
    op!(0x95, "ldelem.u4", None),
    op!(0x96, "ldelem.i8", None),
    op!(0x97, "ldelem.i", None),
    op!(0x98, "ldelem.r4", None),
    op!(0x99, "ldelem.r8", None),
    op!(0x9A, "ldelem.ref", None),
    op!(0x9B, "stelem.i", None),
    op!(0x9C, "stelem.i1", None),
    op!(0x9D, "stelem.i2", None),
    op!(0x9E, "stelem.i4", None),
    op!(0x9F, "stelem.i8", None),
    op!(0xA0, "stelem.r4", None),
    op!(0xA1, "stelem.r8", None),
    op!(0xA2, "stelem.ref", None),
    op!(0xA3, "ldelem", Token),
    op!(0xA4, "stelem", Token),
    op!(0xA5, "unbox.any", Token),
    op!(0xA6),
    op!(0xA7),
    op!(0xA8),
    op!(0xA9),
    op!(0xAA),
    op!(0xAB),
    op!(0xAC),
    op!(0xAD),
    op!(0xAE),
    op!(0xAF),
    op!(0xB0),
    op!(0xB1),
    op!(0xB2),
    op!(0xB3, "conv.ovf.i1", None),
    op!(0xB4, "conv.ovf.u1", None),
    op!(0xB5, "conv.ovf.i2", None),
    op!(0xB6, "conv.ovf.u2", None),
    op!(0xB7, "conv.ovf.i4", None),
    op!(0xB8, "conv.ovf.u4", None),
    op!(0xB9, "conv.ovf.i8", None),
    op!(0xBA, "conv.ovf.u8", None),
    op!(0xBB),
    op!(0xBC),
    op!(0xBD),
    op!(0xBE),
    op!(0xBF),
    op!(0xC0),
    op!(0xC1),
    op!(0xC2, "refanyval", Token),
    op!(0xC3, "ckfinite", None),
    op!(0xC4),
    op!(0xC5),
    op!(0xC6, "mkrefany", Token),
    op!(0xC7),
    op!(0xC8),
    op!(0xC9),
    op!(0xCA),
    op!(0xCB),
    op!(0xCC),
    op!(0xCD),
    op!(0xCE),
    op!(0xCF),
    op!(0xD0, "ldtoken", Token),
    op!(0xD1, "conv.u2", None),
    op!(0xD2, "conv.u1", None),
    op!(0xD3, "conv.i", None),
    op!(0xD4, "conv.ovf.i", None),
    op!(0xD5, "conv.ovf.u", None),
    op!(0xD6, "add.ovf", None),
    op!(0xD7, "add.ovf.un", None),
    op!(0xD8, "mul.ovf", None),
    op!(0xD9, "mul.ovf.un", None),
    op!(0xDA, "sub.ovf", None),
    op!(0xDB, "sub.ovf.un", None),
    op!(0xDC, "endfinally", None),
    op!(0xDD, "leave", Branch),
    op!(0xDE, "leave.s", ShortBranch),
    op!(0xDF, "stind.i", None),
    op!(0xE0, "conv.u", None),
];

/// Two byte opcodes `0xFE 0x00..=0xFE 0x1E`.
#[rustfmt::skip]
pub static INSTRUCTIONS_FE: [CilOpCode; 0x1F] = [
    op_fe!(0x00, "arglist", None),
    op_fe!(0x01, "ceq", None),
    op_fe!(0x02, "cgt", None),
    op_fe!(0x03, "cgt.un", None),
    op_fe!(0x04, "clt", None),
    op_fe!(0x05, "clt.un", None),
    op_fe!(0x06, "ldftn", Token),
    op_fe!(0x07, "ldvirtftn", Token),
    op_fe!(0x08),
    op_fe!(0x09, "ldarg", UInt16),
    op_fe!(0x0A, "ldarga", UInt16),
    op_fe!(0x0B, "starg", UInt16),
    op_fe!(0x0C, "ldloc", UInt16),
    op_fe!(0x0D, "ldloca", UInt16),
    op_fe!(0x0E, "stloc", UInt16),
    op_fe!(0x0F, "localloc", None),
    op_fe!(0x10),
    op_fe!(0x11, "endfilter", None),
    op_fe!(0x12, "unaligned.", UInt8),
    op_fe!(0x13, "volatile.", None),
    op_fe!(0x14, "tail.", None),
    op_fe!(0x15, "initobj", Token),
    op_fe!(0x16, "constrained.", Token),
    op_fe!(0x17, "cpblk", None),
    op_fe!(0x18, "initblk", None),
    op_fe!(0x19, "no.", UInt8),
    op_fe!(0x1A, "rethrow", None),
    op_fe!(0x1B),
    op_fe!(0x1C, "sizeof", Token),
    op_fe!(0x1D, "refanytype", None),
    op_fe!(0x1E, "readonly.", None),
];
