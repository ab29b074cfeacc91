//! `IndexLoader`: reads the two-tier keyword index (summary + per-block
//! first/last key table) and the record index (summary + per-block size table),
//! grounded on the teacher crate's `read_key_header`/`read_key_infos` and
//! `read_record_header`/`read_record_infos`.

use crate::error::{MdictError, Result};
use crate::record_table::RecordBlockTable;
use crate::scanner::{BlockScanner, ScannerProfile};
use crate::source::ByteSource;
use crate::types::EncryptFlag;

/// One keyword block's framing plus the first/last key it covers, letting the
/// lookup engine binary-search blocks without decoding any of them.
#[derive(Debug, Clone)]
pub struct KeyBlockInfo {
    pub num_entries: usize,
    pub first_key: String,
    pub last_key: String,
    pub comp_offset: u64,
    pub comp_size: usize,
    pub decomp_size: usize,
}

pub struct KeywordIndex {
    pub blocks: Vec<KeyBlockInfo>,
    pub total_entries: usize,
}

/// Reads the keyword summary, the (possibly compressed and encrypted) keyword
/// index of blocks, and returns it alongside the file offset where the key
/// blocks themselves begin.
pub fn load_keyword_index(
    source: &dyn ByteSource,
    profile: ScannerProfile,
    offset: u64,
    encrypt: EncryptFlag,
) -> Result<(KeywordIndex, u64)> {
    let summary_width = if profile.version.is_v2() { 8 } else { 4 };
    // v1: num_blocks, num_entries, key_index_comp_len, key_blocks_total_len
    // (four fields). v2 adds key_index_decomp_len as a fifth field, between
    // num_entries and key_index_comp_len, plus a trailing checksum.
    let num_fields = if profile.version.is_v2() { 5 } else { 4 };
    let summary_len = summary_width * num_fields;
    let summary_bytes = source.read_at(offset, summary_len as u64)?;
    let mut summary = BlockScanner::new(summary_bytes, profile);

    let num_blocks = summary.read_num()? as usize;
    let total_entries = summary.read_num()? as usize;
    let key_index_decomp_len = if profile.version.is_v2() {
        summary.read_num()? as usize
    } else {
        0
    };
    let key_index_comp_len = summary.read_num()? as usize;
    let _key_blocks_total_len = summary.read_num()? as usize;
    if profile.version.is_v2() {
        summary.skip_checksum()?;
    }

    let block_info_offset = offset + summary_len as u64;
    let raw = source.read_at(block_info_offset, key_index_comp_len as u64)?;
    let mut outer = BlockScanner::new(raw, profile);

    let mut decompressed = if profile.version.is_v2() {
        outer.read_block(key_index_comp_len, key_index_decomp_len, encrypt.index_encrypted)?
    } else {
        BlockScanner::new(outer.read_raw(key_index_comp_len)?, profile)
    };

    let mut blocks = Vec::with_capacity(num_blocks);
    let mut comp_offset = block_info_offset + key_index_comp_len as u64;
    for _ in 0..num_blocks {
        let num_entries = decompressed.read_num()? as usize;
        let first_size = decompressed.read_short()? as usize;
        let first_key = decompressed.read_sized_text(first_size)?;
        let last_size = decompressed.read_short()? as usize;
        let last_key = decompressed.read_sized_text(last_size)?;
        let comp_size = decompressed.read_num()? as usize;
        let decomp_size = decompressed.read_num()? as usize;
        blocks.push(KeyBlockInfo {
            num_entries,
            first_key,
            last_key,
            comp_offset,
            comp_size,
            decomp_size,
        });
        comp_offset += comp_size as u64;
    }

    let key_blocks_start = block_info_offset + key_index_comp_len as u64;
    let key_blocks_end = comp_offset;
    let _ = key_blocks_start;

    Ok((
        KeywordIndex {
            blocks,
            total_entries,
        },
        key_blocks_end,
    ))
}

/// Reads the record summary and the uncompressed per-block size table, returning
/// a ready `RecordBlockTable` plus the file offset where record blocks begin.
pub fn load_record_table(
    source: &dyn ByteSource,
    profile: ScannerProfile,
    offset: u64,
) -> Result<(RecordBlockTable, u64)> {
    let summary_width = if profile.version.is_v2() { 8 } else { 4 };
    let summary_len = summary_width * 4;
    let summary_bytes = source.read_at(offset, summary_len as u64)?;
    let mut summary = BlockScanner::new(summary_bytes, profile);

    let num_blocks = summary.read_num()? as usize;
    let _num_entries = summary.read_num()? as usize;
    let record_index_len = summary.read_num()? as usize;
    let _record_blocks_total_len = summary.read_num()? as usize;

    let index_offset = offset + summary_len as u64;
    let index_bytes = source.read_at(index_offset, record_index_len as u64)?;
    if index_bytes.len() != record_index_len {
        return Err(MdictError::Truncated);
    }
    let mut index_scanner = BlockScanner::new(index_bytes, profile);

    let mut sizes = Vec::with_capacity(num_blocks);
    for _ in 0..num_blocks {
        let comp_size = index_scanner.read_num()? as u64;
        let decomp_size = index_scanner.read_num()? as u64;
        sizes.push((comp_size, decomp_size));
    }

    let record_blocks_start = index_offset + record_index_len as u64;
    let table = RecordBlockTable::from_sizes(record_blocks_start, &sizes);
    let total_comp_len: u64 = sizes.iter().map(|(c, _)| c).sum();

    Ok((table, record_blocks_start + total_comp_len))
}
