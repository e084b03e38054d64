use thiserror::Error;

use crate::metadata::{tables::TableId, token::Token};

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every fallible operation of the codec, the comparer and the cloning engine reports one of
/// these variants. No operation silently truncates, wraps or substitutes a value.
///
/// # Error Categories
///
/// ## Decoding Errors
/// - [`Error::TruncatedData`] - A read would have gone past the end of the input
/// - [`Error::ValueOutOfRange`] - A value does not fit the requested encoding
/// - [`Error::Malformed`] - Corrupted or invalid structure
/// - [`Error::RecursionLimit`] - Nested signature exceeded the allowed depth
///
/// ## Reference Errors
/// - [`Error::InvalidCodedIndexTarget`] - Token table is not a candidate of the coded index
/// - [`Error::TokenNotFound`] - Token does not address a row of the module
/// - [`Error::UnresolvedReference`] - A reference reachable from a clone seed cannot be resolved
///
/// ## Cloning Errors
/// - [`Error::InvalidSeedModule`] - Seed member does not belong to the source module
/// - [`Error::EmptySeedSet`] - Nothing was included before cloning
///
/// ## Encoding Errors
/// - [`Error::LengthMismatch`] - Predicted and actual encoded size disagree
///
/// # Examples
///
/// ```rust
/// use dotgraft::{Error, utils::read_compressed_uint};
///
/// let mut offset = 0;
/// match read_compressed_uint(&[0xC0, 0x00], &mut offset) {
///     Err(Error::TruncatedData) => {}
///     other => panic!("unexpected: {:?}", other),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    // Decoding Errors
    /// A read would have gone past the end of the available data.
    ///
    /// Raised by every cursor read, compressed integer decode and heap lookup whose
    /// length prefix points past the end of the heap.
    #[error("Truncated data - a read would have gone past the end of the input")]
    TruncatedData,

    /// A value does not fit into the requested encoding.
    ///
    /// Compressed unsigned integers accept `0..=0x1FFF_FFFF`, compressed signed integers accept
    /// `-2^28..=2^28-1`. Also raised for compressed integers whose leading byte is `111xxxxx`.
    #[error("Value out of range for the requested encoding - {0}")]
    ValueOutOfRange(i64),

    /// The file is damaged and could not be parsed.
    ///
    /// This error indicates that the structure doesn't conform to ECMA-335. The error
    /// includes the source location where the malformation was detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Recursion limit reached.
    ///
    /// Signatures nest (pointers to arrays of generic instances of ...). A maximum depth is
    /// enforced while decoding and comparing to avoid stack exhaustion on hostile input.
    ///
    /// The associated value shows the recursion limit that was reached.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    // Reference Errors
    /// A token cannot be expressed through the given coded index.
    ///
    /// Either the token's table is not among the candidates of the coded index, or a decoded
    /// tag selects an unassigned slot.
    #[error("Invalid coded index target - {table:?} is not a candidate of {coded}")]
    InvalidCodedIndexTarget {
        /// Name of the coded index kind
        coded: &'static str,
        /// The offending table, `None` if the tag itself is unassigned
        table: Option<TableId>,
    },

    /// A token does not address an existing row of the module it was looked up in.
    #[error("Token does not address an existing row - {0}")]
    TokenNotFound(Token),

    /// A reference reachable from the clone seeds could not be resolved.
    ///
    /// The associated [`Token`] is the unresolved source token.
    #[error("Unresolved reference - {0}")]
    UnresolvedReference(Token),

    // Cloning Errors
    /// A seed member does not belong to the module the cloner reads from.
    #[error("Seed member does not belong to the source module - {0}")]
    InvalidSeedModule(Token),

    /// No seed member was included before cloning.
    #[error("No member was included for cloning")]
    EmptySeedSet,

    // Encoding Errors
    /// The predicted encoded length differs from the number of bytes actually written.
    ///
    /// This always indicates a defect in a signature's length computation.
    #[error("Length mismatch - predicted {expected} bytes, wrote {actual}")]
    LengthMismatch {
        /// Length returned by `physical_length()`
        expected: usize,
        /// Length actually written
        actual: usize,
    },
}
