//! Little-endian primitive reading for metadata structures.
//!
//! ECMA-335 stores every multi-byte value of the metadata in little-endian byte order. This
//! module provides the [`crate::file::io::CilIO`] trait, implemented for all primitive integer
//! and floating point types, and bounds-checked helpers on top of it.
//!
//! # Key Components
//!
//! - [`crate::file::io::CilIO`] - Byte order conversion for primitive types
//! - [`crate::file::io::read_le`] - Read a value from the start of a buffer
//! - [`crate::file::io::read_le_at`] - Read a value at an offset and advance the offset
//! - [`crate::file::io::read_le_at_dyn`] - Read a 2- or 4-byte heap/table index
//!
//! All reads report [`crate::Error::TruncatedData`] when the buffer is too short; no read
//! ever panics.
//!
//! # Examples
//!
//! ```rust
//! use dotgraft::file::io::read_le_at;
//!
//! let data = [0x01, 0x00, 0x02, 0x00, 0x00, 0x00];
//! let mut offset = 0;
//!
//! let first: u16 = read_le_at(&data, &mut offset)?;
//! let second: u32 = read_le_at(&data, &mut offset)?;
//!
//! assert_eq!((first, second, offset), (1, 2, 6));
//! # Ok::<(), dotgraft::Error>(())
//! ```

use crate::{Error::TruncatedData, Result};

/// Trait for implementing type specific safe readers and writers
///
/// Implemented for every primitive the metadata and the CIL instruction stream store. The
/// associated `Bytes` type is the fixed size array the value converts from and to.
pub trait CilIO: Sized {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Write T to a byte buffer in little-endian
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_cilio {
    ($($ty:ty),*) => {
        $(
            impl CilIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_cilio!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Safely reads a value of type `T` in little-endian byte order from the start of a buffer.
///
/// # Errors
/// Returns [`crate::Error::TruncatedData`] if there are insufficient bytes.
pub fn read_le<T: CilIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Safely reads a value of type `T` in little-endian byte order at `offset`, advancing it by
/// the size of `T`.
///
/// The offset is left untouched when the read fails.
///
/// # Errors
/// Returns [`crate::Error::TruncatedData`] if there are insufficient bytes.
pub fn read_le_at<T: CilIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(TruncatedData);
    };
    if end > data.len() {
        return Err(TruncatedData);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(TruncatedData);
    };

    *offset = end;

    Ok(T::from_le_bytes(read))
}

/// Dynamically reads either a 2-byte or 4-byte value in little-endian byte order.
///
/// Heap indices and table indices are 2 bytes wide unless the referenced heap or tables are
/// large, see [`crate::metadata::tables::TableInfo`].
///
/// # Errors
/// Returns [`crate::Error::TruncatedData`] if there are insufficient bytes.
pub fn read_le_at_dyn(data: &[u8], offset: &mut usize, is_large: bool) -> Result<u32> {
    let res = if is_large {
        read_le_at::<u32>(data, offset)?
    } else {
        u32::from(read_le_at::<u16>(data, offset)?)
    };

    Ok(res)
}
