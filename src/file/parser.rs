//! Low-level byte stream parser for metadata decoding.
//!
//! This module provides the [`crate::file::parser::Parser`] type, a cursor over a byte slice used
//! by every decoder of this crate: signature blobs, table rows, method bodies and heap entries.
//! All reads are bounds checked and report [`crate::Error::TruncatedData`] instead of panicking.
//!
//! # Key Components
//!
//! ## Navigation Methods
//! - [`crate::file::parser::Parser::seek`] - Move to specific position
//! - [`crate::file::parser::Parser::advance_by`] - Move forward by specified bytes
//! - [`crate::file::parser::Parser::align`] - Align to byte boundaries
//! - [`crate::file::parser::Parser::transactional`] - Restore the position when a read fails
//!
//! ## Metadata Reading Methods
//! - [`crate::file::parser::Parser::read_compressed_uint`] - Read compressed unsigned integers
//! - [`crate::file::parser::Parser::read_compressed_int`] - Read compressed signed integers
//! - [`crate::file::parser::Parser::read_compressed_token`] - Read `TypeDefOrRefOrSpecEncoded` tokens
//!
//! # Examples
//!
//! ```rust
//! use dotgraft::file::parser::Parser;
//!
//! let data = [0x01, 0x02, 0x81, 0x00];
//! let mut parser = Parser::new(&data);
//!
//! assert_eq!(parser.read_le::<u16>()?, 0x0201);
//! assert_eq!(parser.read_compressed_uint()?, 0x100);
//! assert!(!parser.has_more_data());
//! # Ok::<(), dotgraft::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, read_le_at_dyn, CilIO},
    metadata::{tables::CodedIndexType, token::Token},
    utils::{read_compressed_int, read_compressed_uint},
    Error::TruncatedData,
    Result,
};

/// A cursor over a borrowed byte slice.
///
/// The parser never copies the underlying data; byte ranges returned by
/// [`Parser::read_bytes`] borrow from the original slice.
pub struct Parser<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new `Parser` positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Total length of the underlying data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the underlying data is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` while there are unread bytes.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Number of unread bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Move the cursor to an absolute position.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedData`] if `pos` lies past the end of the data.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(TruncatedData);
        }

        self.position = pos;
        Ok(())
    }

    /// Move the cursor forward by `step` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedData`] if fewer than `step` bytes remain.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        self.ensure_remaining(step)?;
        self.position += step;
        Ok(())
    }

    /// Current position of the cursor.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// The complete underlying data.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Look at the next byte without consuming it.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedData`] at the end of the data.
    pub fn peek_byte(&self) -> Result<u8> {
        self.data.get(self.position).copied().ok_or(TruncatedData)
    }

    /// Execute `f`, restoring the cursor position if it fails.
    ///
    /// # Errors
    /// Propagates the error returned by `f`.
    pub fn transactional<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let saved_position = self.position;
        let result = f(self);
        if result.is_err() {
            self.position = saved_position;
        }
        result
    }

    /// Advance to the next multiple of `alignment`.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedData`] if the aligned position lies past the end.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        let padding = (alignment - (self.position % alignment)) % alignment;
        self.advance_by(padding)
    }

    /// Read a little-endian primitive.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedData`] if the value does not fit the remaining data.
    pub fn read_le<T: CilIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Read a 2- or 4-byte little-endian index.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedData`] if the value does not fit the remaining data.
    pub fn read_le_dyn(&mut self, is_large: bool) -> Result<u32> {
        read_le_at_dyn(self.data, &mut self.position, is_large)
    }

    /// Read a compressed unsigned integer as defined in ECMA-335 II.23.2.
    ///
    /// # Errors
    /// - [`crate::Error::TruncatedData`] if the encoding runs past the end of the data
    /// - [`crate::Error::ValueOutOfRange`] for the reserved `111xxxxx` leading byte
    pub fn read_compressed_uint(&mut self) -> Result<u32> {
        read_compressed_uint(self.data, &mut self.position)
    }

    /// Read a compressed signed integer as defined in ECMA-335 II.23.2.
    ///
    /// # Errors
    /// Same as [`Parser::read_compressed_uint`].
    pub fn read_compressed_int(&mut self) -> Result<i32> {
        read_compressed_int(self.data, &mut self.position)
    }

    /// Read a `TypeDefOrRefOrSpecEncoded` token (ECMA-335 II.23.2.8).
    ///
    /// The 2 lowest bits select `TypeDef`, `TypeRef` or `TypeSpec`, the remaining bits carry
    /// the row. A zero row decodes to [`Token::NULL`].
    ///
    /// # Errors
    /// - [`crate::Error::TruncatedData`] if the encoding runs past the end of the data
    /// - [`crate::Error::InvalidCodedIndexTarget`] for the unassigned tag `3`
    pub fn read_compressed_token(&mut self) -> Result<Token> {
        self.transactional(|parser| {
            let value = parser.read_compressed_uint()?;
            CodedIndexType::TypeDefOrRef.decode(value)
        })
    }

    /// Fail unless at least `needed` bytes remain.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedData`] if fewer bytes remain.
    pub fn ensure_remaining(&self, needed: usize) -> Result<()> {
        if needed > self.remaining() {
            return Err(TruncatedData);
        }
        Ok(())
    }

    /// Read `length` bytes, borrowing them from the underlying data.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedData`] if fewer than `length` bytes remain.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        self.ensure_remaining(length)?;

        let bytes = &self.data[self.position..self.position + length];
        self.position += length;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{metadata::tables::TableId, Error};

    #[test]
    fn read_sequence() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_le::<u8>().unwrap(), 0x01);
        assert_eq!(parser.read_le::<u16>().unwrap(), 0x0302);
        assert_eq!(parser.pos(), 3);
        assert_eq!(parser.remaining(), 3);
        assert_eq!(parser.read_bytes(2).unwrap(), &[0x04, 0x05]);
        assert_eq!(parser.peek_byte().unwrap(), 0x06);
        assert!(parser.has_more_data());
    }

    #[test]
    fn read_past_end() {
        let data = [0x01, 0x02];
        let mut parser = Parser::new(&data);

        assert!(matches!(parser.read_le::<u32>(), Err(Error::TruncatedData)));
        assert!(matches!(parser.read_bytes(3), Err(Error::TruncatedData)));
        assert!(matches!(parser.seek(3), Err(Error::TruncatedData)));
        assert_eq!(parser.pos(), 0);
    }

    #[test]
    fn transactional_restores_position() {
        let data = [0x01, 0x02, 0x03];
        let mut parser = Parser::new(&data);

        let result: Result<u32> = parser.transactional(|p| {
            p.read_le::<u8>()?;
            p.read_le::<u32>()
        });
        assert!(result.is_err());
        assert_eq!(parser.pos(), 0);
    }

    #[test]
    fn align() {
        let data = [0u8; 8];
        let mut parser = Parser::new(&data);

        parser.advance_by(1).unwrap();
        parser.align(4).unwrap();
        assert_eq!(parser.pos(), 4);
        parser.align(4).unwrap();
        assert_eq!(parser.pos(), 4);
    }

    #[test]
    fn compressed_token() {
        // TypeRef row 0x12
        let data = [0x49, 0x0B];
        let mut parser = Parser::new(&data);

        let token = parser.read_compressed_token().unwrap();
        assert_eq!(token, Token::from_parts(TableId::TypeRef, 0x12));

        // tag 3 is unassigned
        let invalid = parser.read_compressed_token();
        assert!(matches!(
            invalid,
            Err(Error::InvalidCodedIndexTarget { .. })
        ));
        assert_eq!(parser.pos(), 1);
    }

    #[test]
    fn compressed_ints() {
        let data = [0x7B, 0x80, 0x80];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_compressed_int().unwrap(), -3);
        assert_eq!(parser.read_compressed_uint().unwrap(), 0x80);
    }
}
