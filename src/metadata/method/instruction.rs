//! CIL instructions with symbolic branch targets.
//!
//! Decoded instructions reference their branch targets through [`CilLabel`]s (the index of the
//! target instruction) instead of raw byte displacements. Instruction sequences can therefore be
//! copied between methods, have their token operands rewritten and be re-encoded, and the
//! branches still land on the same logical instruction once offsets are recomputed with
//! [`calculate_offsets`].

use std::collections::HashMap;

use crate::{
    file::{parser::Parser, writer::Writer},
    metadata::{
        method::opcodes::{CilOpCode, OperandType},
        token::Token,
    },
    Error::ValueOutOfRange,
    Result,
};

/// An immediate value embedded in an instruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Immediate {
    /// Signed 8-bit immediate value
    Int8(i8),
    /// Unsigned 8-bit immediate value
    UInt8(u8),
    /// Unsigned 16-bit immediate value
    UInt16(u16),
    /// Signed 32-bit immediate value
    Int32(i32),
    /// Signed 64-bit immediate value
    Int64(i64),
    /// 32-bit floating point immediate value
    Float32(f32),
    /// 64-bit floating point immediate value
    Float64(f64),
}

/// Symbolic position inside an instruction sequence.
///
/// The label holds the index of the instruction it points at. An index equal to the number of
/// instructions denotes the end of the code, which exception handler regions may end on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CilLabel(pub usize);

/// Operand of an instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No operand present
    None,
    /// Constant embedded in the instruction
    Immediate(Immediate),
    /// Metadata token, including `#US` tokens of `ldstr`
    Token(Token),
    /// Branch target
    Target(CilLabel),
    /// Switch targets in case order
    Switch(Vec<CilLabel>),
}

/// One CIL instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Byte offset from the start of the code, valid after decoding or [`calculate_offsets`]
    pub offset: u32,
    /// The opcode
    pub opcode: &'static CilOpCode,
    /// The operand
    pub operand: Operand,
}

impl Instruction {
    /// Create an instruction at offset `0`.
    #[must_use]
    pub fn new(opcode: &'static CilOpCode, operand: Operand) -> Self {
        Instruction {
            offset: 0,
            opcode,
            operand,
        }
    }

    /// Encoded size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        let operand = match (&self.operand, self.opcode.op_type.size()) {
            (Operand::Switch(targets), None) => 4 + targets.len() * 4,
            (_, Some(size)) => size,
            (_, None) => 4,
        };
        self.opcode.opcode_size() + operand
    }

    /// The token operand, if any.
    #[must_use]
    pub fn token(&self) -> Option<Token> {
        match self.operand {
            Operand::Token(token) => Some(token),
            _ => None,
        }
    }

    /// Branch and switch targets of this instruction.
    #[must_use]
    pub fn targets(&self) -> Vec<CilLabel> {
        match &self.operand {
            Operand::Target(label) => vec![*label],
            Operand::Switch(labels) => labels.clone(),
            _ => Vec::new(),
        }
    }
}

/// Recompute the byte offset of every instruction from its encoded size.
///
/// Returns the total code size.
pub fn calculate_offsets(instructions: &mut [Instruction]) -> usize {
    let mut offset = 0usize;
    for instruction in instructions.iter_mut() {
        instruction.offset = offset as u32;
        offset += instruction.size();
    }
    offset
}

/// Byte offset of `label` within `instructions`, the code size for the end label.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if the label points past the end label.
pub fn label_offset(instructions: &[Instruction], label: CilLabel) -> Result<u32> {
    match instructions.get(label.0) {
        Some(instruction) => Ok(instruction.offset),
        None if label.0 == instructions.len() => Ok(instructions
            .last()
            .map_or(0, |last| last.offset + last.size() as u32)),
        None => Err(malformed_error!(
            "Label {} points past the end of {} instructions",
            label.0,
            instructions.len()
        )),
    }
}

/// Map from byte offset to instruction index, including the end offset.
pub(crate) fn offset_index(instructions: &[Instruction], code_size: usize) -> HashMap<u32, usize> {
    let mut index: HashMap<u32, usize> = instructions
        .iter()
        .enumerate()
        .map(|(position, instruction)| (instruction.offset, position))
        .collect();
    index.insert(code_size as u32, instructions.len());
    index
}

/// Resolve a byte offset to the label of the instruction starting there.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if no instruction starts at `offset`.
pub(crate) fn resolve_offset(index: &HashMap<u32, usize>, offset: i64) -> Result<CilLabel> {
    u32::try_from(offset)
        .ok()
        .and_then(|offset| index.get(&offset))
        .map(|position| CilLabel(*position))
        .ok_or_else(|| malformed_error!("No instruction starts at offset {:#x}", offset))
}

enum RawOperand {
    Plain(Operand),
    Branch(i64),
    Switch(Vec<i64>),
}

/// Decode a complete code stream.
///
/// Branch displacements are resolved to labels; a displacement that does not land on an
/// instruction boundary (or the end of the code) is rejected.
///
/// # Errors
/// - [`crate::Error::TruncatedData`] if an operand runs past the end
/// - [`crate::Error::Malformed`] for unassigned opcodes or misaligned branch targets
///
/// # Examples
///
/// ```rust
/// use dotgraft::metadata::method::{decode_instructions, CilLabel, Operand};
///
/// // br.s +0, ret
/// let instructions = decode_instructions(&[0x2B, 0x00, 0x2A])?;
/// assert_eq!(instructions.len(), 2);
/// assert_eq!(instructions[0].operand, Operand::Target(CilLabel(1)));
/// # Ok::<(), dotgraft::Error>(())
/// ```
pub fn decode_instructions(code: &[u8]) -> Result<Vec<Instruction>> {
    let mut parser = Parser::new(code);
    let mut decoded = Vec::new();

    while parser.has_more_data() {
        let offset = parser.pos();
        let first_byte = parser.read_le::<u8>()?;
        let opcode = if first_byte == 0xFE {
            let second_byte = parser.read_le::<u8>()?;
            CilOpCode::lookup(0xFE, second_byte)
                .ok_or_else(|| malformed_error!("Invalid opcode: FE {:02X}", second_byte))?
        } else {
            CilOpCode::lookup(0, first_byte)
                .ok_or_else(|| malformed_error!("Invalid opcode: {:02X}", first_byte))?
        };

        let operand = match opcode.op_type {
            OperandType::None => RawOperand::Plain(Operand::None),
            OperandType::Int8 => {
                RawOperand::Plain(Operand::Immediate(Immediate::Int8(parser.read_le::<i8>()?)))
            }
            OperandType::UInt8 => {
                RawOperand::Plain(Operand::Immediate(Immediate::UInt8(parser.read_le::<u8>()?)))
            }
            OperandType::UInt16 => RawOperand::Plain(Operand::Immediate(Immediate::UInt16(
                parser.read_le::<u16>()?,
            ))),
            OperandType::Int32 => RawOperand::Plain(Operand::Immediate(Immediate::Int32(
                parser.read_le::<i32>()?,
            ))),
            OperandType::Int64 => RawOperand::Plain(Operand::Immediate(Immediate::Int64(
                parser.read_le::<i64>()?,
            ))),
            OperandType::Float32 => RawOperand::Plain(Operand::Immediate(Immediate::Float32(
                parser.read_le::<f32>()?,
            ))),
            OperandType::Float64 => RawOperand::Plain(Operand::Immediate(Immediate::Float64(
                parser.read_le::<f64>()?,
            ))),
            OperandType::Token => {
                RawOperand::Plain(Operand::Token(Token::new(parser.read_le::<u32>()?)))
            }
            OperandType::ShortBranch => {
                let delta = i64::from(parser.read_le::<i8>()?);
                RawOperand::Branch(parser.pos() as i64 + delta)
            }
            OperandType::Branch => {
                let delta = i64::from(parser.read_le::<i32>()?);
                RawOperand::Branch(parser.pos() as i64 + delta)
            }
            OperandType::Switch => {
                let count = parser.read_le::<u32>()? as usize;
                parser.ensure_remaining(count.saturating_mul(4))?;

                let mut deltas = Vec::with_capacity(count);
                for _ in 0..count {
                    deltas.push(i64::from(parser.read_le::<i32>()?));
                }

                let next = parser.pos() as i64;
                RawOperand::Switch(deltas.into_iter().map(|delta| next + delta).collect())
            }
        };

        decoded.push((offset as u32, opcode, operand));
    }

    let mut instructions: Vec<Instruction> = decoded
        .iter()
        .map(|(offset, opcode, _)| Instruction {
            offset: *offset,
            opcode: *opcode,
            operand: Operand::None,
        })
        .collect();
    let index = offset_index(&instructions, code.len());

    for (instruction, (_, _, raw)) in instructions.iter_mut().zip(decoded) {
        instruction.operand = match raw {
            RawOperand::Plain(operand) => operand,
            RawOperand::Branch(target) => Operand::Target(resolve_offset(&index, target)?),
            RawOperand::Switch(targets) => Operand::Switch(
                targets
                    .into_iter()
                    .map(|target| resolve_offset(&index, target))
                    .collect::<Result<Vec<_>>>()?,
            ),
        };
    }

    Ok(instructions)
}

/// Encode an instruction sequence.
///
/// Offsets are recomputed first, so callers may pass instructions with stale offsets.
///
/// # Errors
/// - [`crate::Error::ValueOutOfRange`] if a short branch cannot reach its target
/// - [`crate::Error::Malformed`] if an operand does not match its opcode or a label is invalid
pub fn encode_instructions(instructions: &mut [Instruction]) -> Result<Vec<u8>> {
    let code_size = calculate_offsets(instructions);
    let mut writer = Writer::with_capacity(code_size);

    for instruction in instructions.iter() {
        let opcode = instruction.opcode;
        if opcode.prefix != 0 {
            writer.write_le::<u8>(opcode.prefix);
        }
        writer.write_le::<u8>(opcode.opcode);

        let next = i64::from(instruction.offset) + instruction.size() as i64;
        match (opcode.op_type, &instruction.operand) {
            (OperandType::None, Operand::None) => {}
            (OperandType::Int8, Operand::Immediate(Immediate::Int8(value))) => {
                writer.write_le::<i8>(*value);
            }
            (OperandType::UInt8, Operand::Immediate(Immediate::UInt8(value))) => {
                writer.write_le::<u8>(*value);
            }
            (OperandType::UInt16, Operand::Immediate(Immediate::UInt16(value))) => {
                writer.write_le::<u16>(*value);
            }
            (OperandType::Int32, Operand::Immediate(Immediate::Int32(value))) => {
                writer.write_le::<i32>(*value);
            }
            (OperandType::Int64, Operand::Immediate(Immediate::Int64(value))) => {
                writer.write_le::<i64>(*value);
            }
            (OperandType::Float32, Operand::Immediate(Immediate::Float32(value))) => {
                writer.write_le::<f32>(*value);
            }
            (OperandType::Float64, Operand::Immediate(Immediate::Float64(value))) => {
                writer.write_le::<f64>(*value);
            }
            (OperandType::Token, Operand::Token(token)) => writer.write_le::<u32>(token.value()),
            (OperandType::ShortBranch, Operand::Target(label)) => {
                let delta = i64::from(label_offset(instructions, *label)?) - next;
                let delta = i8::try_from(delta).map_err(|_| ValueOutOfRange(delta))?;
                writer.write_le::<i8>(delta);
            }
            (OperandType::Branch, Operand::Target(label)) => {
                let delta = i64::from(label_offset(instructions, *label)?) - next;
                let delta = i32::try_from(delta).map_err(|_| ValueOutOfRange(delta))?;
                writer.write_le::<i32>(delta);
            }
            (OperandType::Switch, Operand::Switch(labels)) => {
                writer.write_le::<u32>(labels.len() as u32);
                for label in labels {
                    let delta = i64::from(label_offset(instructions, *label)?) - next;
                    let delta = i32::try_from(delta).map_err(|_| ValueOutOfRange(delta))?;
                    writer.write_le::<i32>(delta);
                }
            }
            (op_type, operand) => {
                return Err(malformed_error!(
                    "Operand {:?} does not match {} ({:?})",
                    operand,
                    opcode.instr,
                    op_type
                ))
            }
        }
    }

    Ok(writer.into_inner())
}
