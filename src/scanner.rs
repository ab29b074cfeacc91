//! `BlockScanner`: a big-endian cursor over a decoded byte buffer.
//!
//! Every section of the container — the header, the two keyword/record summaries,
//! the two block indices, and every individual key/record block once decompressed —
//! is read through one of these. The profile (unit width, short/num field sizes,
//! trailing-NUL convention) is derived once from the header and threaded through.

use encoding_rs::{BIG5, GB18030, UTF_16LE, UTF_8};

use crate::decrypt::Decryptor;
use crate::error::{MdictError, Result};
use crate::types::{CompressionType, Encoding, EngineVersion};
use crate::{compress, DEFAULT_RECORD_SCAN_LIMIT};

/// Version/encoding-derived field widths, computed once from `HeaderAttributes`.
#[derive(Debug, Clone, Copy)]
pub struct ScannerProfile {
    pub version: EngineVersion,
    pub encoding: Encoding,
}

impl ScannerProfile {
    pub fn bytes_per_unit(&self) -> usize {
        self.encoding.bytes_per_unit()
    }

    /// Extra trailing NUL unit appended after sized text on v2.
    pub fn text_tail(&self) -> usize {
        if self.version.is_v2() {
            self.bytes_per_unit()
        } else {
            0
        }
    }

    pub fn short_size(&self) -> usize {
        match self.version {
            EngineVersion::V1 => 1,
            EngineVersion::V2 => 2,
        }
    }
}

pub struct BlockScanner {
    data: Vec<u8>,
    pos: usize,
    profile: ScannerProfile,
}

impl BlockScanner {
    pub fn new(data: Vec<u8>, profile: ScannerProfile) -> Self {
        BlockScanner {
            data,
            pos: 0,
            profile,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn seek(&mut self, absolute: usize) -> Result<()> {
        if absolute > self.data.len() {
            return Err(MdictError::Truncated);
        }
        self.pos = absolute;
        Ok(())
    }

    pub fn advance(&mut self, n: usize) -> Result<()> {
        self.seek(self.pos + n)
    }

    fn take(&mut self, n: usize) -> Result<&[u8]> {
        let end = self.pos.checked_add(n).ok_or(MdictError::Truncated)?;
        let slice = self.data.get(self.pos..end).ok_or(MdictError::Truncated)?;
        self.pos = end;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16_be(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64_be(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_be_bytes(arr))
    }

    /// `read_short`: one byte on v1, a big-endian `u16` on v2.
    pub fn read_short(&mut self) -> Result<u32> {
        match self.profile.version {
            EngineVersion::V1 => Ok(self.read_u8()? as u32),
            EngineVersion::V2 => Ok(self.read_u16_be()? as u32),
        }
    }

    /// `read_num`: a 32-bit quantity on v1; on v2, a 64-bit big-endian field whose
    /// high word must be zero (files over 4 GiB are out of scope and rejected, not
    /// silently truncated).
    pub fn read_num(&mut self) -> Result<u32> {
        match self.profile.version {
            EngineVersion::V1 => self.read_u32_be(),
            EngineVersion::V2 => {
                let value = self.read_u64_be()?;
                if value >> 32 != 0 {
                    return Err(MdictError::Truncated);
                }
                Ok(value as u32)
            }
        }
    }

    pub fn skip_checksum(&mut self) -> Result<()> {
        self.advance(4)
    }

    fn decode(&self, bytes: &[u8]) -> Result<String> {
        let (decoded, _, had_errors) = match self.profile.encoding {
            Encoding::Utf16 => UTF_16LE.decode(bytes),
            Encoding::Utf8 => UTF_8.decode(bytes),
            Encoding::Gbk => GB18030.decode(bytes),
            Encoding::Big5 => BIG5.decode(bytes),
        };
        if had_errors {
            return Err(MdictError::EncodingError);
        }
        Ok(decoded.into_owned())
    }

    /// `read_sized_text(units)`: `units * bytes_per_unit` bytes, decoded, then
    /// advance past the extra v2 trailing-NUL unit.
    pub fn read_sized_text(&mut self, units: usize) -> Result<String> {
        let byte_len = units
            .checked_mul(self.profile.bytes_per_unit())
            .ok_or(MdictError::Truncated)?;
        let bytes = self.take(byte_len)?.to_vec();
        let text = self.decode(&bytes)?;
        self.advance(self.profile.text_tail())?;
        Ok(text)
    }

    /// `read_nul_text`: scan forward for a `bytes_per_unit`-wide zero, decode up to
    /// it, advance past the terminator.
    pub fn read_nul_text(&mut self) -> Result<String> {
        let unit = self.profile.bytes_per_unit();
        let mut i = self.pos;
        let terminator = loop {
            if i + unit > self.data.len() {
                // Unterminated: treat remainder as the text (defensive; the real
                // format always terminates, but a truncated file shouldn't panic).
                break self.data.len();
            }
            if self.data[i..i + unit].iter().all(|b| *b == 0) {
                break i;
            }
            i += unit;
            if i - self.pos > DEFAULT_RECORD_SCAN_LIMIT {
                return Err(MdictError::Truncated);
            }
        };
        let bytes = self.data[self.pos..terminator].to_vec();
        let text = self.decode(&bytes)?;
        self.pos = (terminator + unit).min(self.data.len());
        Ok(text)
    }

    pub fn read_raw(&mut self, n: usize) -> Result<Vec<u8>> {
        Ok(self.take(n)?.to_vec())
    }

    /// The compression/decryption unwrap described by the specification: a 1-byte
    /// compression tag, then (for compressed blocks) 3 zero bytes and a 4-byte
    /// checksum, then the payload. Returns a fresh scanner bound to the
    /// decompressed bytes, with this scanner's cursor left just past the whole
    /// `comp_size`-byte block.
    pub fn read_block(
        &mut self,
        comp_size: usize,
        decomp_size: usize,
        encrypted: bool,
    ) -> Result<BlockScanner> {
        let block_start = self.pos;
        let tag = self.read_u8()?;
        let compression = CompressionType::from_tag(tag).ok_or(MdictError::BadCompressionTag(tag))?;

        let decompressed = match compression {
            CompressionType::Raw => {
                let header_len = if self.profile.version.is_v2() { 8 } else { 1 };
                let payload_len = comp_size
                    .checked_sub(header_len)
                    .ok_or(MdictError::Truncated)?;
                self.seek(block_start + header_len)?;
                self.take(payload_len)?.to_vec()
            }
            CompressionType::Lzo | CompressionType::Zlib => {
                self.advance(3)?; // zero padding
                let checksum = self.take(4)?.to_vec();
                let payload_len = comp_size.checked_sub(8).ok_or(MdictError::Truncated)?;
                let mut payload = self.take(payload_len)?.to_vec();

                if encrypted {
                    let mut key = [0u8; 8];
                    key[..4].copy_from_slice(&checksum);
                    key[4..8].copy_from_slice(&[0x95, 0x36, 0x00, 0x00]);
                    Decryptor::decrypt(&mut payload, &key);
                }

                match compression {
                    CompressionType::Lzo => compress::lzo_decompress(&payload, decomp_size)?,
                    CompressionType::Zlib => compress::zlib_decompress(&payload, decomp_size)?,
                    CompressionType::Raw => unreachable!(),
                }
            }
        };

        self.seek(block_start + comp_size)?;
        Ok(BlockScanner::new(decompressed, self.profile))
    }
}
