//! Shared encoding helpers.

mod compressed;

pub use compressed::{
    compressed_int_size, compressed_uint_size, read_compressed_int, read_compressed_uint,
    write_compressed_int, write_compressed_uint, MAX_COMPRESSED_INT, MAX_COMPRESSED_UINT,
    MIN_COMPRESSED_INT,
};
