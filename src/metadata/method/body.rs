//! Representation, parsing and encoding of CIL method bodies.
//!
//! A body is a tiny or fat header, the CIL code and optional exception handling sections.
//! [`MethodBody::from`] decodes all three into instructions with symbolic branch targets;
//! [`MethodBody::encode`] recomputes offsets and chooses the smallest header and section
//! formats that can represent the body.
//!
//! # References
//! - ECMA-335 6th Edition, Partition II, Section 25.4 - Method Header Format

use log::warn;

use crate::{
    file::{parser::Parser, writer::Writer},
    metadata::{
        method::{
            exceptions::RawExceptionHandler, instruction::offset_index, instruction::resolve_offset,
            label_offset, decode_instructions, encode_instructions, ExceptionHandler,
            ExceptionHandlerFlags, Instruction, MethodBodyFlags, SectionFlags,
        },
        token::Token,
    },
    Error::ValueOutOfRange,
    Result,
};

/// Describes one method that has been compiled to CIL bytecode.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodBody {
    /// Maximum number of items on the operand stack
    pub max_stack: u16,
    /// Flag to call the default constructor on all local variables
    pub init_locals: bool,
    /// `StandAloneSig` token of the local variable signature, [`Token::NULL`] without locals
    pub local_var_sig: Token,
    /// The code
    pub instructions: Vec<Instruction>,
    /// Exception handling clauses in section order
    pub exception_handlers: Vec<ExceptionHandler>,
}

impl Default for MethodBody {
    fn default() -> Self {
        MethodBody {
            max_stack: 8,
            init_locals: false,
            local_var_sig: Token::NULL,
            instructions: Vec::new(),
            exception_handlers: Vec::new(),
        }
    }
}

impl MethodBody {
    /// Create a `MethodBody` object from a sequence of bytes.
    ///
    /// # Arguments
    /// * `data` - The byte slice starting at the method header
    ///
    /// # Errors
    /// Returns an error if the data is empty, truncated or malformed.
    pub fn from(data: &[u8]) -> Result<MethodBody> {
        if data.is_empty() {
            return Err(malformed_error!("Provided data for body parsing is empty"));
        }

        let mut parser = Parser::new(data);
        let first_byte = parser.peek_byte()?;
        match MethodBodyFlags::from_bits_truncate(u16::from(first_byte & 0b_0000_0011_u8)) {
            MethodBodyFlags::TINY_FORMAT => {
                parser.advance_by(1)?;
                let size_code = (first_byte >> 2) as usize;
                let code = parser.read_bytes(size_code)?;

                Ok(MethodBody {
                    max_stack: 8,
                    init_locals: false,
                    local_var_sig: Token::NULL,
                    instructions: decode_instructions(code)?,
                    exception_handlers: Vec::new(),
                })
            }
            MethodBodyFlags::FAT_FORMAT => {
                let first_duo = parser.read_le::<u16>()?;
                let size_header = usize::from(first_duo >> 12) * 4;
                if size_header < 12 {
                    return Err(malformed_error!(
                        "Fat method header too small - {} bytes",
                        size_header
                    ));
                }

                let flags_header =
                    MethodBodyFlags::from_bits_truncate(first_duo & 0b_0000_1111_1111_1111_u16);
                let max_stack = parser.read_le::<u16>()?;
                let size_code = parser.read_le::<u32>()? as usize;
                let local_var_sig = Token::new(parser.read_le::<u32>()?);

                parser.seek(size_header)?;
                let code = parser.read_bytes(size_code)?;
                let instructions = decode_instructions(code)?;

                let mut exception_handlers = Vec::new();
                if flags_header.contains(MethodBodyFlags::MORE_SECTS) {
                    let raw = read_sections(&mut parser)?;
                    let index = offset_index(&instructions, size_code);
                    for clause in raw {
                        exception_handlers.push(resolve_clause(&index, &clause)?);
                    }
                }

                Ok(MethodBody {
                    max_stack,
                    init_locals: flags_header.contains(MethodBodyFlags::INIT_LOCALS),
                    local_var_sig,
                    instructions,
                    exception_handlers,
                })
            }
            _ => Err(malformed_error!(
                "MethodHeader is neither FAT nor TINY - {}",
                first_byte
            )),
        }
    }

    /// Whether this body can be stored with a one byte tiny header.
    #[must_use]
    pub fn is_tiny(&self, code_size: usize) -> bool {
        code_size < 64
            && self.max_stack <= 8
            && !self.init_locals
            && self.local_var_sig.is_null()
            && self.exception_handlers.is_empty()
    }

    /// Encoded size of the code alone.
    #[must_use]
    pub fn code_size(&self) -> usize {
        self.instructions.iter().map(Instruction::size).sum()
    }

    /// Encode header, code and exception sections.
    ///
    /// # Errors
    /// Returns an error if an instruction cannot be encoded or a label is out of range.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut instructions = self.instructions.clone();
        let code = encode_instructions(&mut instructions)?;
        let mut writer = Writer::with_capacity(code.len() + 12);

        if self.is_tiny(code.len()) {
            let head = ((code.len() as u8) << 2) | MethodBodyFlags::TINY_FORMAT.bits() as u8;
            writer.write_le::<u8>(head);
            writer.write_bytes(&code);
            return Ok(writer.into_inner());
        }

        let mut flags = MethodBodyFlags::FAT_FORMAT;
        if self.init_locals {
            flags |= MethodBodyFlags::INIT_LOCALS;
        }
        if !self.exception_handlers.is_empty() {
            flags |= MethodBodyFlags::MORE_SECTS;
        }

        writer.write_le::<u16>(flags.bits() | (3 << 12));
        writer.write_le::<u16>(self.max_stack);
        writer.write_le::<u32>(code.len() as u32);
        writer.write_le::<u32>(self.local_var_sig.value());
        writer.write_bytes(&code);

        if !self.exception_handlers.is_empty() {
            let raw = self
                .exception_handlers
                .iter()
                .map(|handler| raw_clause(&instructions, handler))
                .collect::<Result<Vec<_>>>()?;
            writer.align(4);
            write_section(&mut writer, &raw)?;
        }

        Ok(writer.into_inner())
    }
}

fn read_sections(parser: &mut Parser) -> Result<Vec<RawExceptionHandler>> {
    let mut clauses = Vec::new();

    loop {
        if parser.align(4).is_err() || parser.remaining() < 4 {
            warn!("Method body announces more sections but ends early");
            break;
        }

        let section_flags = SectionFlags::from_bits_truncate(parser.read_le::<u8>()?);
        if !section_flags.contains(SectionFlags::EHTABLE) {
            warn!("Skipping unsupported method data section {:?}", section_flags);
            break;
        }

        if section_flags.contains(SectionFlags::FAT_FORMAT) {
            let size_low = u32::from(parser.read_le::<u16>()?);
            let size_high = u32::from(parser.read_le::<u8>()?);
            let section_size = size_low | (size_high << 16);
            if section_size < 4 {
                return Err(malformed_error!("Fat EH section too small - {}", section_size));
            }

            for _ in 0..(section_size - 4) / 24 {
                #[allow(clippy::cast_possible_truncation)]
                let flags = parser.read_le::<u32>()? as u16;
                clauses.push(RawExceptionHandler {
                    flags,
                    try_offset: parser.read_le::<u32>()?,
                    try_length: parser.read_le::<u32>()?,
                    handler_offset: parser.read_le::<u32>()?,
                    handler_length: parser.read_le::<u32>()?,
                    class_or_filter: parser.read_le::<u32>()?,
                });
            }
        } else {
            let section_size = u32::from(parser.read_le::<u8>()?);
            parser.advance_by(2)?;
            if section_size < 4 {
                return Err(malformed_error!("Small EH section too small - {}", section_size));
            }

            for _ in 0..(section_size - 4) / 12 {
                clauses.push(RawExceptionHandler {
                    flags: parser.read_le::<u16>()?,
                    try_offset: u32::from(parser.read_le::<u16>()?),
                    try_length: u32::from(parser.read_le::<u8>()?),
                    handler_offset: u32::from(parser.read_le::<u16>()?),
                    handler_length: u32::from(parser.read_le::<u8>()?),
                    class_or_filter: parser.read_le::<u32>()?,
                });
            }
        }

        if !section_flags.contains(SectionFlags::MORE_SECTS) {
            break;
        }
    }

    Ok(clauses)
}

fn resolve_clause(
    index: &std::collections::HashMap<u32, usize>,
    raw: &RawExceptionHandler,
) -> Result<ExceptionHandler> {
    let flags = ExceptionHandlerFlags::from_bits_truncate(raw.flags);
    let try_end = i64::from(raw.try_offset) + i64::from(raw.try_length);
    let handler_end = i64::from(raw.handler_offset) + i64::from(raw.handler_length);

    let (filter_start, catch_type) = if flags.contains(ExceptionHandlerFlags::FILTER) {
        (
            Some(resolve_offset(index, i64::from(raw.class_or_filter))?),
            Token::NULL,
        )
    } else if flags.intersects(ExceptionHandlerFlags::FINALLY | ExceptionHandlerFlags::FAULT) {
        (None, Token::NULL)
    } else {
        (None, Token::new(raw.class_or_filter))
    };

    Ok(ExceptionHandler {
        flags,
        try_start: resolve_offset(index, i64::from(raw.try_offset))?,
        try_end: resolve_offset(index, try_end)?,
        handler_start: resolve_offset(index, i64::from(raw.handler_offset))?,
        handler_end: resolve_offset(index, handler_end)?,
        filter_start,
        catch_type,
    })
}

fn raw_clause(
    instructions: &[Instruction],
    handler: &ExceptionHandler,
) -> Result<RawExceptionHandler> {
    let try_offset = label_offset(instructions, handler.try_start)?;
    let try_end = label_offset(instructions, handler.try_end)?;
    let handler_offset = label_offset(instructions, handler.handler_start)?;
    let handler_end = label_offset(instructions, handler.handler_end)?;
    if try_end < try_offset || handler_end < handler_offset {
        return Err(malformed_error!("Exception handler region ends before it starts"));
    }

    let class_or_filter = match handler.filter_start {
        Some(label) => label_offset(instructions, label)?,
        None => handler.catch_type.value(),
    };

    Ok(RawExceptionHandler {
        flags: handler.flags.bits(),
        try_offset,
        try_length: try_end - try_offset,
        handler_offset,
        handler_length: handler_end - handler_offset,
        class_or_filter,
    })
}

fn write_section(writer: &mut Writer, clauses: &[RawExceptionHandler]) -> Result<()> {
    let small_size = clauses.len() * 12 + 4;
    if small_size <= usize::from(u8::MAX) && clauses.iter().all(RawExceptionHandler::fits_small) {
        writer.write_le::<u8>(SectionFlags::EHTABLE.bits());
        writer.write_le::<u8>(small_size as u8);
        writer.write_le::<u16>(0);
        for clause in clauses {
            writer.write_le::<u16>(clause.flags);
            writer.write_le::<u16>(clause.try_offset as u16);
            writer.write_le::<u8>(clause.try_length as u8);
            writer.write_le::<u16>(clause.handler_offset as u16);
            writer.write_le::<u8>(clause.handler_length as u8);
            writer.write_le::<u32>(clause.class_or_filter);
        }
        return Ok(());
    }

    let fat_size = clauses.len() * 24 + 4;
    if fat_size > 0x00FF_FFFF {
        return Err(ValueOutOfRange(fat_size as i64));
    }

    let kind = (SectionFlags::EHTABLE | SectionFlags::FAT_FORMAT).bits();
    writer.write_le::<u32>(u32::from(kind) | ((fat_size as u32) << 8));
    for clause in clauses {
        writer.write_le::<u32>(u32::from(clause.flags));
        writer.write_le::<u32>(clause.try_offset);
        writer.write_le::<u32>(clause.try_length);
        writer.write_le::<u32>(clause.handler_offset);
        writer.write_le::<u32>(clause.handler_length);
        writer.write_le::<u32>(clause.class_or_filter);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::method::{calculate_offsets, CilLabel, CilOpCode, Immediate, Operand},
        Error,
    };

    fn ins(name: &str, operand: Operand) -> Instruction {
        Instruction::new(CilOpCode::by_name(name).unwrap(), operand)
    }

    /// try { nop; leave.s end } catch (TypeRef 1) { pop; leave.s end } end: ret
    fn try_catch_body() -> MethodBody {
        let mut body = MethodBody {
            max_stack: 1,
            init_locals: true,
            local_var_sig: Token::new(0x1100_0001),
            instructions: vec![
                ins("nop", Operand::None),
                ins("leave.s", Operand::Target(CilLabel(4))),
                ins("pop", Operand::None),
                ins("leave.s", Operand::Target(CilLabel(4))),
                ins("ret", Operand::None),
            ],
            exception_handlers: vec![ExceptionHandler {
                flags: ExceptionHandlerFlags::EXCEPTION,
                try_start: CilLabel(0),
                try_end: CilLabel(2),
                handler_start: CilLabel(2),
                handler_end: CilLabel(4),
                filter_start: None,
                catch_type: Token::new(0x0100_0001),
            }],
        };
        calculate_offsets(&mut body.instructions);
        body
    }

    #[test]
    fn tiny() {
        // ldarg.0, ret
        let data = [0x0A, 0x02, 0x2A];
        let body = MethodBody::from(&data).unwrap();

        assert_eq!(body.max_stack, 8);
        assert!(!body.init_locals);
        assert!(body.local_var_sig.is_null());
        assert_eq!(body.instructions.len(), 2);
        assert_eq!(body.code_size(), 2);
        assert_eq!(body.encode().unwrap(), data);
    }

    #[test]
    fn tiny_truncated() {
        assert!(matches!(
            MethodBody::from(&[0x0E, 0x02]),
            Err(Error::TruncatedData)
        ));
        assert!(matches!(MethodBody::from(&[]), Err(Error::Malformed { .. })));
        assert!(matches!(
            MethodBody::from(&[0x00]),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn fat_with_locals() {
        let data = [
            0x13, 0x30, 0x02, 0x00, 0x02, 0x00, 0x00, 0x00, 0x59, 0x00, 0x00, 0x11, 0x06, 0x2A,
        ];
        let body = MethodBody::from(&data).unwrap();

        assert_eq!(body.max_stack, 2);
        assert!(body.init_locals);
        assert_eq!(body.local_var_sig, Token::new(0x1100_0059));
        assert_eq!(body.instructions.len(), 2);
        assert!(body.exception_handlers.is_empty());
        assert_eq!(body.encode().unwrap(), data);
    }

    #[test]
    fn fat_small_exception_section() {
        let body = try_catch_body();
        let encoded = body.encode().unwrap();

        // header(12) + code(7) + padding(1) + small section(4 + 12)
        assert_eq!(encoded.len(), 36);
        assert_eq!(encoded[0] & 0x08, 0x08);
        assert_eq!(encoded[20], SectionFlags::EHTABLE.bits());
        assert_eq!(encoded[21], 16);

        let decoded = MethodBody::from(&encoded).unwrap();
        assert_eq!(decoded, body);
    }

    #[test]
    fn fat_exception_section_when_small_overflows() {
        let mut body = try_catch_body();
        let clause = body.exception_handlers[0].clone();
        body.exception_handlers = vec![clause; 21];

        let encoded = body.encode().unwrap();
        let section = 20;
        assert_eq!(
            encoded[section],
            (SectionFlags::EHTABLE | SectionFlags::FAT_FORMAT).bits()
        );
        assert_eq!(encoded.len(), section + 4 + 21 * 24);

        let decoded = MethodBody::from(&encoded).unwrap();
        assert_eq!(decoded.exception_handlers.len(), 21);
        assert_eq!(decoded, body);
    }

    #[test]
    fn filter_and_finally_clauses() {
        let mut body = try_catch_body();
        body.instructions.insert(
            2,
            ins("ldc.i4", Operand::Immediate(Immediate::Int32(1))),
        );
        body.instructions.insert(3, ins("endfilter", Operand::None));
        for instruction in &mut body.instructions {
            if let Operand::Target(label) = &mut instruction.operand {
                *label = CilLabel(6);
            }
        }
        body.exception_handlers = vec![
            ExceptionHandler {
                flags: ExceptionHandlerFlags::FILTER,
                try_start: CilLabel(0),
                try_end: CilLabel(2),
                handler_start: CilLabel(4),
                handler_end: CilLabel(6),
                filter_start: Some(CilLabel(2)),
                catch_type: Token::NULL,
            },
            ExceptionHandler {
                flags: ExceptionHandlerFlags::FINALLY,
                try_start: CilLabel(0),
                try_end: CilLabel(6),
                handler_start: CilLabel(6),
                handler_end: CilLabel(7),
                filter_start: None,
                catch_type: Token::NULL,
            },
        ];
        calculate_offsets(&mut body.instructions);

        let decoded = MethodBody::from(&body.encode().unwrap()).unwrap();
        assert_eq!(decoded, body);
        assert!(!decoded.exception_handlers[0].is_catch());
    }

    #[test]
    fn exception_section_missing() {
        let mut encoded = try_catch_body().encode().unwrap();
        encoded.truncate(20);

        let decoded = MethodBody::from(&encoded).unwrap();
        assert!(decoded.exception_handlers.is_empty());
    }

    #[test]
    fn exception_region_on_instruction_boundary() {
        let mut encoded = try_catch_body().encode().unwrap();
        // try_length of the first clause now ends inside leave.s
        encoded[20 + 4 + 4] = 2;
        assert!(matches!(
            MethodBody::from(&encoded),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn tiny_rejected_for_large_code() {
        let mut body = MethodBody {
            instructions: (0..64).map(|_| ins("nop", Operand::None)).collect(),
            ..MethodBody::default()
        };
        calculate_offsets(&mut body.instructions);
        let encoded = body.encode().unwrap();
        assert_eq!(encoded[0] & 0x03, 0x03);
        assert_eq!(MethodBody::from(&encoded).unwrap(), body);
    }
}
