//! Exception handler clauses of CIL method bodies (ECMA-335 II.25.4.6).
//!
//! Protected regions and handler blocks are expressed through [`CilLabel`]s, so they stay
//! attached to the same instructions when a body is copied and re-encoded.

use bitflags::bitflags;

use crate::metadata::{method::CilLabel, token::Token};

bitflags! {
    /// Exception handler flags defining the type of exception handling clause.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ExceptionHandlerFlags: u16 {
        /// A typed exception clause; `catch_type` holds the caught type.
        const EXCEPTION = 0x0000;
        /// An exception filter and handler clause.
        const FILTER = 0x0001;
        /// A finally clause.
        const FINALLY = 0x0002;
        /// A fault clause (finally that executes only on exception).
        const FAULT = 0x0004;
    }
}

/// One exception handling clause.
///
/// Regions are half open: `try_start..try_end` and `handler_start..handler_end`. The end labels
/// may equal the number of instructions, meaning the region runs to the end of the code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionHandler {
    /// Kind of clause
    pub flags: ExceptionHandlerFlags,
    /// First protected instruction
    pub try_start: CilLabel,
    /// First instruction after the protected region
    pub try_end: CilLabel,
    /// First handler instruction
    pub handler_start: CilLabel,
    /// First instruction after the handler
    pub handler_end: CilLabel,
    /// First filter instruction, for `FILTER` clauses
    pub filter_start: Option<CilLabel>,
    /// Caught type for `EXCEPTION` clauses, [`Token::NULL`] otherwise
    pub catch_type: Token,
}

impl ExceptionHandler {
    /// Returns `true` for typed `catch` clauses.
    #[must_use]
    pub fn is_catch(&self) -> bool {
        !self.flags.intersects(
            ExceptionHandlerFlags::FILTER
                | ExceptionHandlerFlags::FINALLY
                | ExceptionHandlerFlags::FAULT,
        )
    }

    /// All labels referenced by this clause.
    #[must_use]
    pub fn labels(&self) -> Vec<CilLabel> {
        let mut labels = vec![
            self.try_start,
            self.try_end,
            self.handler_start,
            self.handler_end,
        ];
        labels.extend(self.filter_start);
        labels
    }
}

/// Clause as stored in a method data section, with byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawExceptionHandler {
    pub flags: u16,
    pub try_offset: u32,
    pub try_length: u32,
    pub handler_offset: u32,
    pub handler_length: u32,
    pub class_or_filter: u32,
}

impl RawExceptionHandler {
    /// Whether this clause fits into a small (12 byte) section entry.
    pub fn fits_small(&self) -> bool {
        self.try_offset <= u32::from(u16::MAX)
            && self.try_length <= u32::from(u8::MAX)
            && self.handler_offset <= u32::from(u16::MAX)
            && self.handler_length <= u32::from(u8::MAX)
    }
}
