//! `RecordBlockTable`: maps a key's global record offset to the record block that
//! holds it plus the byte offset inside that block's decompressed content.
//!
//! Grounded on the teacher crate's `find_record_block_index`, generalized from a
//! linear scan to a binary search over the monotonically increasing cumulative
//! decompressed-offset column, since every entry in this table is known up front
//! at index-load time.

use crate::error::{MdictError, Result};

/// One record block's framing: where its compressed bytes sit in the file, how
/// large they are compressed and decompressed, and where its content starts in
/// the logical (concatenated, decompressed) record stream.
#[derive(Debug, Clone, Copy)]
pub struct RecordBlockInfo {
    pub comp_offset: u64,
    pub comp_size: u64,
    pub decomp_size: u64,
    pub decomp_offset: u64,
}

pub struct RecordBlockTable {
    blocks: Vec<RecordBlockInfo>,
}

impl RecordBlockTable {
    /// Builds the table from per-block `(comp_size, decomp_size)` pairs read off
    /// disk in file order, deriving `comp_offset`/`decomp_offset` by running sums.
    pub fn from_sizes(first_comp_offset: u64, sizes: &[(u64, u64)]) -> Self {
        let mut blocks = Vec::with_capacity(sizes.len());
        let mut comp_offset = first_comp_offset;
        let mut decomp_offset = 0u64;
        for &(comp_size, decomp_size) in sizes {
            blocks.push(RecordBlockInfo {
                comp_offset,
                comp_size,
                decomp_size,
                decomp_offset,
            });
            comp_offset += comp_size;
            decomp_offset += decomp_size;
        }
        RecordBlockTable { blocks }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RecordBlockInfo> {
        self.blocks.get(index)
    }

    /// Total size of the logical decompressed record stream, i.e. the offset one
    /// past the last byte of the last block.
    pub fn total_decomp_len(&self) -> u64 {
        self.blocks
            .last()
            .map(|b| b.decomp_offset + b.decomp_size)
            .unwrap_or(0)
    }

    /// Finds the block containing global `record_offset`, returning its index and
    /// the offset within that block's decompressed bytes.
    pub fn find(&self, record_offset: u64) -> Result<(usize, u64)> {
        if self.blocks.is_empty() || record_offset >= self.total_decomp_len() {
            return Err(MdictError::OutOfRange(record_offset as u32));
        }

        let mut lo = 0usize;
        let mut hi = self.blocks.len();
        while lo + 1 < hi {
            let mid = lo + (hi - lo) / 2;
            if self.blocks[mid].decomp_offset <= record_offset {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        let block = &self.blocks[lo];
        Ok((lo, record_offset - block.decomp_offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RecordBlockTable {
        RecordBlockTable::from_sizes(0, &[(10, 100), (12, 50), (8, 30)])
    }

    #[test]
    fn finds_block_containing_offset() {
        let t = table();
        assert_eq!(t.find(0).unwrap(), (0, 0));
        assert_eq!(t.find(99).unwrap(), (0, 99));
        assert_eq!(t.find(100).unwrap(), (1, 0));
        assert_eq!(t.find(149).unwrap(), (1, 49));
        assert_eq!(t.find(150).unwrap(), (2, 0));
        assert_eq!(t.find(179).unwrap(), (2, 29));
    }

    #[test]
    fn rejects_out_of_range_offset() {
        let t = table();
        assert!(t.find(180).is_err());
    }
}
