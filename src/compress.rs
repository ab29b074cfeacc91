//! Thin bindings over the two decompression primitives the container format uses.
//! Both are external collaborators per the specification: given a buffer and the
//! expected output size, return the decompressed bytes.

use std::io::Read;

use flate2::read::ZlibDecoder;
use minilzo_rs::LZO;

use crate::error::{MdictError, Result};

pub fn lzo_decompress(data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let lzo = LZO::init().map_err(|_| MdictError::DecompressionFailure {
        expected: expected_len,
        actual: 0,
    })?;
    let out = lzo
        .decompress(data, expected_len)
        .map_err(|_| MdictError::DecompressionFailure {
            expected: expected_len,
            actual: 0,
        })?;
    if out.len() != expected_len {
        return Err(MdictError::DecompressionFailure {
            expected: expected_len,
            actual: out.len(),
        });
    }
    Ok(out)
}

pub fn zlib_decompress(data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::with_capacity(expected_len);
    decoder
        .read_to_end(&mut out)
        .map_err(|_| MdictError::DecompressionFailure {
            expected: expected_len,
            actual: 0,
        })?;
    Ok(out)
}
