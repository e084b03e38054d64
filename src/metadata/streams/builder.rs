//! Heap builders for newly produced metadata.
//!
//! Encoders that emit table rows or `ldstr` operands need heap indices for strings, blobs and
//! user strings. The builders here allocate those indices and deduplicate identical entries, so
//! re-adding the same signature blob yields the index it already has.

use std::collections::HashMap;

use widestring::U16String;

use crate::{utils::write_compressed_uint, Result};

/// Builds a `#Blob` heap.
#[derive(Debug, Clone)]
pub struct BlobHeapBuilder {
    data: Vec<u8>,
    index: HashMap<Vec<u8>, u32>,
}

impl Default for BlobHeapBuilder {
    fn default() -> Self {
        BlobHeapBuilder {
            data: vec![0],
            index: HashMap::new(),
        }
    }
}

impl BlobHeapBuilder {
    /// Create a heap holding only the empty blob.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `blob` and return its index. The empty blob is always index `0`.
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueOutOfRange`] if the blob is too long for a compressed length.
    pub fn add(&mut self, blob: &[u8]) -> Result<u32> {
        if blob.is_empty() {
            return Ok(0);
        }
        if let Some(index) = self.index.get(blob) {
            return Ok(*index);
        }

        let index = u32::try_from(self.data.len())
            .map_err(|_| crate::Error::ValueOutOfRange(self.data.len() as i64))?;
        let length = u32::try_from(blob.len())
            .map_err(|_| crate::Error::ValueOutOfRange(blob.len() as i64))?;
        write_compressed_uint(length, &mut self.data)?;
        self.data.extend_from_slice(blob);
        self.index.insert(blob.to_vec(), index);
        Ok(index)
    }

    /// The heap bytes built so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Builds a `#Strings` heap.
#[derive(Debug, Clone)]
pub struct StringHeapBuilder {
    data: Vec<u8>,
    index: HashMap<String, u32>,
}

impl Default for StringHeapBuilder {
    fn default() -> Self {
        StringHeapBuilder {
            data: vec![0],
            index: HashMap::new(),
        }
    }
}

impl StringHeapBuilder {
    /// Create a heap holding only the empty string.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value` and return its index. The empty string is always index `0`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for strings containing NUL.
    pub fn add(&mut self, value: &str) -> Result<u32> {
        if value.is_empty() {
            return Ok(0);
        }
        if value.contains('\0') {
            return Err(malformed_error!("Identifier contains NUL - {:?}", value));
        }
        if let Some(index) = self.index.get(value) {
            return Ok(*index);
        }

        let index = u32::try_from(self.data.len())
            .map_err(|_| crate::Error::ValueOutOfRange(self.data.len() as i64))?;
        self.data.extend_from_slice(value.as_bytes());
        self.data.push(0);
        self.index.insert(value.to_string(), index);
        Ok(index)
    }

    /// The heap bytes built so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Builds a `#US` heap.
#[derive(Debug, Clone)]
pub struct UserStringHeapBuilder {
    data: Vec<u8>,
    index: HashMap<U16String, u32>,
}

impl Default for UserStringHeapBuilder {
    fn default() -> Self {
        UserStringHeapBuilder {
            data: vec![0],
            index: HashMap::new(),
        }
    }
}

impl UserStringHeapBuilder {
    /// Create a heap holding only the leading empty entry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value` and return its heap index.
    ///
    /// The trailing byte is `1` if any code unit has a non-zero high byte or is one of the
    /// control characters ECMA-335 II.24.2.4 lists.
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueOutOfRange`] if the heap outgrows the 24 bit token space.
    pub fn add(&mut self, value: &str) -> Result<u32> {
        let units = U16String::from_str(value);
        if let Some(index) = self.index.get(&units) {
            return Ok(*index);
        }

        let index = self.data.len() as u32;
        if index > 0x00FF_FFFF {
            return Err(crate::Error::ValueOutOfRange(i64::from(index)));
        }

        let length = units.len() as u32 * 2 + 1;
        write_compressed_uint(length, &mut self.data)?;

        let mut special = false;
        for unit in units.as_slice() {
            special |= needs_special_handling(*unit);
            self.data.extend_from_slice(&unit.to_le_bytes());
        }
        self.data.push(u8::from(special));

        self.index.insert(units, index);
        Ok(index)
    }

    /// The heap bytes built so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Current heap size in bytes; the index the next new entry receives.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the heap holds only the leading empty entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.len() <= 1
    }

    /// Drop every entry added at or after heap offset `len`.
    pub fn truncate(&mut self, len: usize) {
        let len = len.max(1);
        self.data.truncate(len);
        self.index.retain(|_, index| (*index as usize) < len);
    }
}

fn needs_special_handling(unit: u16) -> bool {
    unit > 0xFF || matches!(unit, 0x01..=0x08 | 0x0E..=0x1F | 0x27 | 0x2D | 0x7F)
}
