//! Growable byte sink, the write-side counterpart of [`crate::file::parser::Parser`].
//!
//! Encoders of signatures, table rows and method bodies append to a [`Writer`]. Heap and table
//! indices are written with an explicit width so the output matches a given
//! [`crate::metadata::tables::TableInfo`] layout.

use crate::{
    file::io::CilIO,
    utils::{write_compressed_int, write_compressed_uint},
    Error::ValueOutOfRange,
    Result,
};

/// An append-only little-endian byte writer.
#[derive(Debug, Default, Clone)]
pub struct Writer {
    data: Vec<u8>,
}

impl Writer {
    /// Create an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Writer { data: Vec::new() }
    }

    /// Create an empty writer that can hold `capacity` bytes without reallocating.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Writer {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes written so far.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Consume the writer and return its bytes.
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    /// Append a little-endian primitive.
    pub fn write_le<T: CilIO>(&mut self, value: T) {
        self.data.extend_from_slice(value.to_le_bytes().as_ref());
    }

    /// Append raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Append a 2- or 4-byte little-endian index.
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueOutOfRange`] if a narrow index does not fit into 16 bits.
    pub fn write_le_dyn(&mut self, value: u32, is_large: bool) -> Result<()> {
        if is_large {
            self.write_le::<u32>(value);
        } else {
            let narrow = u16::try_from(value).map_err(|_| ValueOutOfRange(i64::from(value)))?;
            self.write_le::<u16>(narrow);
        }
        Ok(())
    }

    /// Append a compressed unsigned integer.
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueOutOfRange`] if `value` exceeds `0x1FFF_FFFF`.
    pub fn write_compressed_uint(&mut self, value: u32) -> Result<()> {
        write_compressed_uint(value, &mut self.data)
    }

    /// Append a compressed signed integer.
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueOutOfRange`] if `value` is outside `-2^28..2^28`.
    pub fn write_compressed_int(&mut self, value: i32) -> Result<()> {
        write_compressed_int(value, &mut self.data)
    }

    /// Pad with zero bytes up to the next multiple of `alignment`.
    pub fn align(&mut self, alignment: usize) {
        while self.data.len() % alignment != 0 {
            self.data.push(0);
        }
    }

    /// Overwrite previously written bytes at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedData`] if the range was not written yet.
    pub fn patch(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        let end = offset
            .checked_add(bytes.len())
            .filter(|end| *end <= self.data.len())
            .ok_or(crate::Error::TruncatedData)?;
        self.data[offset..end].copy_from_slice(bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{file::parser::Parser, Error};

    #[test]
    fn write_and_read_back() {
        let mut writer = Writer::new();
        writer.write_le::<u8>(0x01);
        writer.write_le::<u16>(0x0302);
        writer.write_le::<i32>(-1);
        writer.write_compressed_uint(0x2E57).unwrap();
        writer.write_le_dyn(0x1234, false).unwrap();
        writer.write_le_dyn(0x1234, true).unwrap();

        assert_eq!(
            writer.as_slice(),
            &[
                0x01, 0x02, 0x03, 0xFF, 0xFF, 0xFF, 0xFF, 0xAE, 0x57, 0x34, 0x12, 0x34, 0x12,
                0x00, 0x00
            ]
        );

        let data = writer.into_inner();
        let mut parser = Parser::new(&data);
        assert_eq!(parser.read_le::<u8>().unwrap(), 0x01);
        assert_eq!(parser.read_le::<u16>().unwrap(), 0x0302);
        assert_eq!(parser.read_le::<i32>().unwrap(), -1);
        assert_eq!(parser.read_compressed_uint().unwrap(), 0x2E57);
        assert_eq!(parser.read_le_dyn(false).unwrap(), 0x1234);
        assert_eq!(parser.read_le_dyn(true).unwrap(), 0x1234);
    }

    #[test]
    fn narrow_index_overflow() {
        let mut writer = Writer::new();
        assert!(matches!(
            writer.write_le_dyn(0x1_0000, false),
            Err(Error::ValueOutOfRange(_))
        ));
        assert!(writer.is_empty());
    }

    #[test]
    fn align_and_patch() {
        let mut writer = Writer::new();
        writer.write_le::<u8>(0xAA);
        writer.align(4);
        assert_eq!(writer.len(), 4);

        writer.patch(1, &[0xBB, 0xCC]).unwrap();
        assert_eq!(writer.as_slice(), &[0xAA, 0xBB, 0xCC, 0x00]);
        assert!(writer.patch(3, &[0x00, 0x00]).is_err());
    }
}
