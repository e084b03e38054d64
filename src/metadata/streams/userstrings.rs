use widestring::U16String;

use crate::{file::parser::Parser, Error::TruncatedData, Result};

/// A read-only view over a `#US` heap.
///
/// Each entry is a compressed length followed by UTF-16LE code units and a single trailing
/// flag byte (ECMA-335 II.24.2.4). `ldstr` operands index into this heap.
pub struct UserStrings<'a> {
    data: &'a [u8],
}

impl<'a> UserStrings<'a> {
    /// Create a view over heap `data`, whose first byte must be `0`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the heap is empty or doesn't start with `0`.
    pub fn from(data: &'a [u8]) -> Result<UserStrings<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(malformed_error!("Invalid memory for #US heap"));
        }

        Ok(UserStrings { data })
    }

    /// Return the UTF-16 string at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedData`] if the entry runs past the end of the heap, and
    /// [`crate::Error::Malformed`] if its length is not `2 * n + 1`.
    pub fn get(&self, index: usize) -> Result<U16String> {
        if index >= self.data.len() {
            return Err(TruncatedData);
        }

        let mut parser = Parser::new(&self.data[index..]);
        let len = parser.read_compressed_uint()? as usize;
        if len == 0 {
            return Ok(U16String::new());
        }
        if len % 2 != 1 {
            return Err(malformed_error!(
                "Invalid user string length {} at index - {}",
                len,
                index
            ));
        }

        let bytes = parser.read_bytes(len - 1)?;
        let units = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect::<Vec<u16>>();

        Ok(U16String::from_vec(units))
    }

    /// Return the string at `index` converted to UTF-8.
    ///
    /// # Errors
    /// Same as [`UserStrings::get`], plus [`crate::Error::Malformed`] for unpaired surrogates.
    pub fn get_string(&self, index: usize) -> Result<String> {
        self.get(index)?
            .to_string()
            .map_err(|_| malformed_error!("Invalid UTF-16 user string at index - {}", index))
    }
}

#[cfg(test)]
mod tests {
    use widestring::u16str;

    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let data: [u8; 30] = [
            0x00, 0x1b, 0x48, 0x00, 0x65, 0x00, 0x6c, 0x00, 0x6c, 0x00, 0x6f, 0x00, 0x2c, 0x00, 0x20, 0x00, 0x57, 0x00, 0x6f, 0x00, 0x72, 0x00, 0x6c, 0x00, 0x64, 0x00, 0x21, 0x00, 0x00, 0x00
        ];

        let us_str = UserStrings::from(&data).unwrap();

        assert_eq!(us_str.get(1).unwrap(), u16str!("Hello, World!"));
        assert_eq!(us_str.get_string(1).unwrap(), "Hello, World!");
        assert_eq!(us_str.get_string(29).unwrap(), "");
    }

    #[test]
    fn invalid() {
        assert!(UserStrings::from(&[]).is_err());
        assert!(UserStrings::from(&[0x22, 0x01]).is_err());

        let data = [0x00, 0xCC, 0xCC, 0xCC, 0xCC, 0xCC];
        let us_str = UserStrings::from(&data).unwrap();
        assert!(us_str.get(1).is_err());

        // even length
        let data = [0x00, 0x02, 0x41, 0x00];
        let us_str = UserStrings::from(&data).unwrap();
        assert!(us_str.get(1).is_err());
    }
}
