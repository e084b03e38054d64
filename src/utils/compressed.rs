//! ECMA-335 II.23.2 compressed integers.
//!
//! Signature blobs, heap length prefixes and array shapes store integers in a variable length
//! big-endian form whose width is selected by the leading bits of the first byte:
//!
//! | Width | Bit pattern | Unsigned range |
//! |-------|-------------|----------------|
//! | 1 | `0xxxxxxx` | `0x00..=0x7F` |
//! | 2 | `10xxxxxx xxxxxxxx` | `0x80..=0x3FFF` |
//! | 4 | `110xxxxx xxxxxxxx xxxxxxxx xxxxxxxx` | `0x4000..=0x1FFF_FFFF` |
//!
//! Signed values are rotated left by one bit inside the chosen width so the sign ends up in
//! bit 0, which keeps small negative numbers small. Encoding always selects the shortest width.

use crate::{
    Error::{TruncatedData, ValueOutOfRange},
    Result,
};

/// Largest value a compressed unsigned integer can carry.
pub const MAX_COMPRESSED_UINT: u32 = 0x1FFF_FFFF;
/// Smallest value a compressed signed integer can carry.
pub const MIN_COMPRESSED_INT: i32 = -(1 << 28);
/// Largest value a compressed signed integer can carry.
pub const MAX_COMPRESSED_INT: i32 = (1 << 28) - 1;

fn read_byte(data: &[u8], offset: &mut usize) -> Result<u8> {
    let byte = *data.get(*offset).ok_or(TruncatedData)?;
    *offset += 1;
    Ok(byte)
}

/// Reads a compressed unsigned integer and returns it together with its encoded width.
fn read_compressed_uint_sized(data: &[u8], offset: &mut usize) -> Result<(u32, usize)> {
    let start = *offset;
    let first = read_byte(data, offset)?;

    let result = if first & 0x80 == 0 {
        Ok((u32::from(first), 1))
    } else if first & 0xC0 == 0x80 {
        read_byte(data, offset)
            .map(|second| (((u32::from(first) & 0x3F) << 8) | u32::from(second), 2))
    } else if first & 0xE0 == 0xC0 {
        let mut value = u32::from(first) & 0x1F;
        let mut result = Ok(());
        for _ in 0..3 {
            match read_byte(data, offset) {
                Ok(byte) => value = (value << 8) | u32::from(byte),
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
        }
        result.map(|()| (value, 4))
    } else {
        Err(ValueOutOfRange(i64::from(first)))
    };

    if result.is_err() {
        *offset = start;
    }
    result
}

/// Decodes a compressed unsigned integer at `offset`, advancing it past the encoded bytes.
///
/// # Errors
/// - [`crate::Error::TruncatedData`] if the encoding runs past the end of `data`
/// - [`crate::Error::ValueOutOfRange`] if the leading byte has the reserved `111xxxxx` form
///
/// # Examples
///
/// ```rust
/// use dotgraft::utils::read_compressed_uint;
///
/// let mut offset = 0;
/// assert_eq!(read_compressed_uint(&[0xC0, 0x00, 0x40, 0x00], &mut offset)?, 0x4000);
/// assert_eq!(offset, 4);
/// # Ok::<(), dotgraft::Error>(())
/// ```
pub fn read_compressed_uint(data: &[u8], offset: &mut usize) -> Result<u32> {
    read_compressed_uint_sized(data, offset).map(|(value, _)| value)
}

/// Decodes a compressed signed integer at `offset`, advancing it past the encoded bytes.
///
/// # Errors
/// Same as [`read_compressed_uint`].
pub fn read_compressed_int(data: &[u8], offset: &mut usize) -> Result<i32> {
    let (raw, width) = read_compressed_uint_sized(data, offset)?;

    let mut value = raw >> 1;
    if raw & 1 != 0 {
        value |= match width {
            1 => 0xFFFF_FFC0,
            2 => 0xFFFF_E000,
            _ => 0xF000_0000,
        };
    }

    #[allow(clippy::cast_possible_wrap)]
    Ok(value as i32)
}

/// Returns the number of bytes the compressed form of `value` occupies.
///
/// Values above [`MAX_COMPRESSED_UINT`] report 4; encoding them fails.
#[must_use]
pub fn compressed_uint_size(value: u32) -> usize {
    if value < 0x80 {
        1
    } else if value < 0x4000 {
        2
    } else {
        4
    }
}

/// Returns the number of bytes the compressed form of the signed `value` occupies.
#[must_use]
pub fn compressed_int_size(value: i32) -> usize {
    if (-(1 << 6)..(1 << 6)).contains(&value) {
        1
    } else if (-(1 << 13)..(1 << 13)).contains(&value) {
        2
    } else {
        4
    }
}

/// Appends the shortest compressed form of `value` to `out`.
///
/// # Errors
/// Returns [`crate::Error::ValueOutOfRange`] if `value` exceeds [`MAX_COMPRESSED_UINT`].
pub fn write_compressed_uint(value: u32, out: &mut Vec<u8>) -> Result<()> {
    match compressed_uint_size(value) {
        1 => out.push(value as u8),
        2 => out.extend_from_slice(&((value as u16) | 0x8000).to_be_bytes()),
        _ => {
            if value > MAX_COMPRESSED_UINT {
                return Err(ValueOutOfRange(i64::from(value)));
            }
            out.extend_from_slice(&(value | 0xC000_0000).to_be_bytes());
        }
    }

    Ok(())
}

/// Appends the shortest compressed form of the signed `value` to `out`.
///
/// # Errors
/// Returns [`crate::Error::ValueOutOfRange`] if `value` is outside
/// [`MIN_COMPRESSED_INT`]`..=`[`MAX_COMPRESSED_INT`].
pub fn write_compressed_int(value: i32, out: &mut Vec<u8>) -> Result<()> {
    if !(MIN_COMPRESSED_INT..=MAX_COMPRESSED_INT).contains(&value) {
        return Err(ValueOutOfRange(i64::from(value)));
    }

    #[allow(clippy::cast_sign_loss)]
    let rotated = ((value as u32) << 1) | u32::from(value < 0);

    match compressed_int_size(value) {
        1 => out.push((rotated & 0x7F) as u8),
        2 => out.extend_from_slice(&(((rotated & 0x3FFF) as u16) | 0x8000).to_be_bytes()),
        _ => out.extend_from_slice(&((rotated & 0x1FFF_FFFF) | 0xC000_0000).to_be_bytes()),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn encode_uint(value: u32) -> Vec<u8> {
        let mut out = Vec::new();
        write_compressed_uint(value, &mut out).unwrap();
        out
    }

    fn encode_int(value: i32) -> Vec<u8> {
        let mut out = Vec::new();
        write_compressed_int(value, &mut out).unwrap();
        out
    }

    #[test]
    fn uint_ecma_samples() {
        let samples: &[(u32, &[u8])] = &[
            (0x03, &[0x03]),
            (0x7F, &[0x7F]),
            (0x80, &[0x80, 0x80]),
            (0x2E57, &[0xAE, 0x57]),
            (0x3FFF, &[0xBF, 0xFF]),
            (0x4000, &[0xC0, 0x00, 0x40, 0x00]),
            (0x1FFF_FFFF, &[0xDF, 0xFF, 0xFF, 0xFF]),
        ];

        for (value, bytes) in samples {
            assert_eq!(encode_uint(*value), *bytes, "encoding {:#x}", value);

            let mut offset = 0;
            assert_eq!(read_compressed_uint(bytes, &mut offset).unwrap(), *value);
            assert_eq!(offset, bytes.len());
        }
    }

    #[test]
    fn int_ecma_samples() {
        let samples: &[(i32, &[u8])] = &[
            (3, &[0x06]),
            (-3, &[0x7B]),
            (64, &[0x80, 0x80]),
            (-64, &[0x01]),
            (8192, &[0xC0, 0x00, 0x40, 0x00]),
            (-8192, &[0x80, 0x01]),
            (268_435_455, &[0xDF, 0xFF, 0xFF, 0xFE]),
            (-268_435_456, &[0xC0, 0x00, 0x00, 0x01]),
        ];

        for (value, bytes) in samples {
            assert_eq!(encode_int(*value), *bytes, "encoding {}", value);

            let mut offset = 0;
            assert_eq!(read_compressed_int(bytes, &mut offset).unwrap(), *value);
            assert_eq!(offset, bytes.len());
        }
    }

    #[test]
    fn uint_width_boundaries() {
        assert_eq!(encode_uint(0x7F).len(), 1);
        assert_eq!(encode_uint(0x80).len(), 2);
        assert_eq!(encode_uint(0x3FFF).len(), 2);
        assert_eq!(encode_uint(0x4000).len(), 4);
        assert_eq!(compressed_uint_size(0x7F), 1);
        assert_eq!(compressed_uint_size(0x80), 2);
        assert_eq!(compressed_uint_size(0x4000), 4);
    }

    #[test]
    fn int_width_boundaries() {
        assert_eq!(encode_int(63).len(), 1);
        assert_eq!(encode_int(-64).len(), 1);
        assert_eq!(encode_int(64).len(), 2);
        assert_eq!(encode_int(-65).len(), 2);
        assert_eq!(encode_int(8191).len(), 2);
        assert_eq!(encode_int(-8193).len(), 4);
    }

    #[test]
    fn out_of_range() {
        let mut out = Vec::new();
        assert!(matches!(
            write_compressed_uint(0x2000_0000, &mut out),
            Err(Error::ValueOutOfRange(_))
        ));
        assert!(matches!(
            write_compressed_int(1 << 28, &mut out),
            Err(Error::ValueOutOfRange(_))
        ));
        assert!(matches!(
            write_compressed_int(-(1 << 28) - 1, &mut out),
            Err(Error::ValueOutOfRange(_))
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn truncated() {
        let mut offset = 0;
        assert!(matches!(
            read_compressed_uint(&[0x80], &mut offset),
            Err(Error::TruncatedData)
        ));
        assert!(matches!(
            read_compressed_uint(&[0xC0, 0x00, 0x00], &mut offset),
            Err(Error::TruncatedData)
        ));
        assert!(matches!(
            read_compressed_uint(&[], &mut offset),
            Err(Error::TruncatedData)
        ));
        assert_eq!(offset, 0);
    }

    #[test]
    fn reserved_prefix() {
        let mut offset = 0;
        assert!(matches!(
            read_compressed_uint(&[0xE0, 0x00, 0x00, 0x00], &mut offset),
            Err(Error::ValueOutOfRange(_))
        ));
    }
}
