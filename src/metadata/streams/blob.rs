//! `#Blob` heap reader.
//!
//! The blob heap stores length-prefixed byte sequences: signatures, custom attribute values,
//! public keys. Every entry starts with a compressed unsigned length (ECMA-335 II.24.2.4);
//! index `0` is the empty blob.

use crate::{file::parser::Parser, Error::TruncatedData, Result};

/// A read-only view over a `#Blob` heap.
///
/// # Examples
///
/// ```rust
/// use dotgraft::metadata::streams::Blob;
///
/// let data = [0x00, 0x03, 0x08, 0x00, 0x0E];
/// let blob = Blob::from(&data)?;
/// assert_eq!(blob.get(1)?, &[0x08, 0x00, 0x0E]);
/// # Ok::<(), dotgraft::Error>(())
/// ```
pub struct Blob<'a> {
    data: &'a [u8],
}

impl<'a> Blob<'a> {
    /// Create a view over heap `data`, whose first byte must be `0`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the heap is empty or doesn't start with `0`.
    pub fn from(data: &'a [u8]) -> Result<Blob<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(malformed_error!("Invalid memory for #Blob heap"));
        }

        Ok(Blob { data })
    }

    /// Return the blob at `index`, without its length prefix.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedData`] if the index or the announced length point past
    /// the end of the heap.
    pub fn get(&self, index: usize) -> Result<&'a [u8]> {
        if index >= self.data.len() {
            return Err(TruncatedData);
        }

        let mut parser = Parser::new(&self.data[index..]);
        let len = parser.read_compressed_uint()? as usize;
        parser.read_bytes(len)
    }

    /// Iterate over `(index, blob)` pairs, skipping the leading empty entry.
    pub fn iter(&self) -> impl Iterator<Item = Result<(usize, &'a [u8])>> + '_ {
        let mut position = 1;
        let mut failed = false;
        std::iter::from_fn(move || {
            if failed || position >= self.data.len() {
                return None;
            }

            let mut parser = Parser::new(&self.data[position..]);
            let entry = parser
                .read_compressed_uint()
                .and_then(|len| parser.read_bytes(len as usize));

            match entry {
                Ok(bytes) => {
                    let start = position;
                    position += parser.pos();
                    Some(Ok((start, bytes)))
                }
                Err(error) => {
                    failed = true;
                    Some(Err(error))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let data = {
            let mut data = vec![0xCC; 300];
            /* i - 0    - should always be 0    */ data[0]          = 0b_00000000_u8;
            /* i - 1    - len 10                */ data[1]          = 0b_00001010_u8;
            /* i - 1    - len 10                */ data[2..12]      .copy_from_slice(&[0x0A; 10]);
            /* i - 12   - len 5                 */ data[12]         = 0b_00000101_u8;
            /* i - 12   - len 5                 */ data[13..18]     .copy_from_slice(&[0xAB; 5]);
            /* i - 18   - len 256               */ data[18]         = 0b_10000001_u8;
            /* i - 18   - len 256               */ data[19]         = 0b_00000000_u8;
            /* i - 18   - len 256               */ data[20..276]    .copy_from_slice(&[0xBA; 256]);
            data.truncate(276);
            data
        };

        let blob = Blob::from(&data).unwrap();
        assert_eq!(blob.get(1).unwrap(), &[0x0A; 10]);
        assert_eq!(blob.get(12).unwrap(), &[0xAB; 5]);
        assert_eq!(blob.get(18).unwrap().len(), 256);
        assert_eq!(blob.get(0).unwrap(), &[] as &[u8]);

        let entries: Vec<_> = blob.iter().map(|entry| entry.unwrap().0).collect();
        assert_eq!(entries, vec![1, 12, 18]);
    }

    #[test]
    fn out_of_range() {
        let data = [0x00, 0x05, 0x01, 0x02];
        let blob = Blob::from(&data).unwrap();

        assert!(matches!(blob.get(1), Err(Error::TruncatedData)));
        assert!(matches!(blob.get(4), Err(Error::TruncatedData)));
        assert!(matches!(blob.get(usize::MAX), Err(Error::TruncatedData)));
        assert!(blob.iter().next().unwrap().is_err());
    }

    #[test]
    fn invalid_heap() {
        assert!(Blob::from(&[]).is_err());
        assert!(Blob::from(&[0x01]).is_err());
    }
}
