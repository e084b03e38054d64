//! CIL method bodies and instructions.
//!
//! This module decodes method bodies into a form that can be copied between modules:
//! instructions carry symbolic [`CilLabel`] branch targets, exception handler regions are
//! expressed through the same labels, and [`MethodBody::encode`] recomputes every offset and
//! picks the smallest header and section formats.
//!
//! # Key Components
//!
//! - [`MethodBody`] - Header fields, instructions and exception handlers
//! - [`Instruction`] / [`Operand`] - One decoded instruction
//! - [`CilOpCode`] - Static opcode table with operand kinds
//! - [`ExceptionHandler`] - Label based exception handling clause
//!
//! # Examples
//!
//! ```rust
//! use dotgraft::metadata::method::MethodBody;
//!
//! // Tiny header, ldarg.0, ret
//! let body = MethodBody::from(&[0x0A, 0x02, 0x2A])?;
//! assert_eq!(body.instructions.len(), 2);
//! assert_eq!(body.encode()?, vec![0x0A, 0x02, 0x2A]);
//! # Ok::<(), dotgraft::Error>(())
//! ```

mod body;
mod exceptions;
mod instruction;
mod opcodes;
mod types;

pub use body::MethodBody;
pub use exceptions::{ExceptionHandler, ExceptionHandlerFlags};
pub use instruction::{
    calculate_offsets, decode_instructions, encode_instructions, label_offset, CilLabel,
    Immediate, Instruction, Operand,
};
pub use opcodes::{CilOpCode, OperandType, INSTRUCTIONS, INSTRUCTIONS_FE};
pub(crate) use instruction::{offset_index, resolve_offset};
pub use types::{MethodBodyFlags, SectionFlags};
