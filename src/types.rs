//! Core data types shared across the parser and lookup engine.

/// Which container an open reader is reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileExt {
    Mdx,
    Mdd,
}

/// Text encoding of keys and (for `.mdx`) definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf16,
    Utf8,
    Gbk,
    Big5,
}

impl Default for Encoding {
    fn default() -> Self {
        Encoding::Utf16
    }
}

impl Encoding {
    pub fn bytes_per_unit(&self) -> usize {
        match self {
            Encoding::Utf16 => 2,
            _ => 1,
        }
    }

    pub fn from_header_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "UTF-8" | "UTF8" => Encoding::Utf8,
            "GBK" | "GB2312" | "GB18030" => Encoding::Gbk,
            "BIG5" => Encoding::Big5,
            _ => Encoding::Utf16,
        }
    }
}

/// The two-bit `Encrypted` flag from the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptFlag {
    /// Bit 1: keyword *header* encrypted. Unsupported — fails open.
    pub header_encrypted: bool,
    /// Bit 2: keyword *index* encrypted. Supported via the RIPEMD-keyed decryptor.
    pub index_encrypted: bool,
}

impl EncryptFlag {
    pub fn from_bits(value: u8) -> Self {
        EncryptFlag {
            header_encrypted: value & 0b01 != 0,
            index_encrypted: value & 0b10 != 0,
        }
    }
}

/// Per-block compression tag (the first byte of a compressed-block header).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    Raw,
    Lzo,
    Zlib,
}

impl CompressionType {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(CompressionType::Raw),
            1 => Some(CompressionType::Lzo),
            2 => Some(CompressionType::Zlib),
            _ => None,
        }
    }
}

/// Engine generation — v1 uses 32-bit fields throughout, v2 uses 64-bit fields
/// (enforced-zero high word) and carries extra per-section checksums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineVersion {
    V1,
    V2,
}

impl EngineVersion {
    pub fn from_version_number(version: f64) -> Self {
        if version >= 2.0 {
            EngineVersion::V2
        } else {
            EngineVersion::V1
        }
    }

    pub fn is_v2(&self) -> bool {
        matches!(self, EngineVersion::V2)
    }
}

/// One resolved `(keyword, record-offset)` hit, the unit both list queries return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordHit {
    pub word: String,
    pub offset: u32,
}
