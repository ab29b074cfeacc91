//! `KeyBlockCache`: a single-slot, most-recently-used cache of one decompressed
//! keyword block's entries. Lookups within a session tend to revisit the same
//! block (prefix enumeration, repeated near-neighbor queries), so one slot
//! absorbs nearly all repeat cost without holding the whole keyword section
//! decompressed in memory — the same tradeoff the teacher crate's per-call
//! decompression makes explicit, generalized here into an explicit cache so
//! repeated calls don't pay for it twice.

use crate::error::Result;
use crate::index::KeyBlockInfo;
use crate::scanner::ScannerProfile;
use crate::source::ByteSource;
use crate::types::WordHit;

pub struct KeyBlockCache {
    profile: ScannerProfile,
    slot: Option<(u64, Vec<WordHit>)>,
}

impl KeyBlockCache {
    pub fn new(profile: ScannerProfile) -> Self {
        KeyBlockCache {
            profile,
            slot: None,
        }
    }

    /// Returns the decoded entries of `block`, decompressing and decoding from
    /// `source` only on a cache miss.
    pub fn load(&mut self, block: &KeyBlockInfo, source: &dyn ByteSource) -> Result<&[WordHit]> {
        let key = block.comp_offset;
        if self.slot.as_ref().map(|(k, _)| *k) != Some(key) {
            let entries = decode_key_block(block, source, self.profile)?;
            self.slot = Some((key, entries));
        }
        Ok(&self.slot.as_ref().unwrap().1)
    }
}

fn decode_key_block(
    block: &KeyBlockInfo,
    source: &dyn ByteSource,
    profile: ScannerProfile,
) -> Result<Vec<WordHit>> {
    let raw = source.read_at(block.comp_offset, block.comp_size as u64)?;
    let mut outer = crate::scanner::BlockScanner::new(raw, profile);
    let mut decompressed = outer.read_block(block.comp_size, block.decomp_size, false)?;

    let mut entries = Vec::with_capacity(block.num_entries);
    for _ in 0..block.num_entries {
        let offset = decompressed.read_num()?;
        let word = decompressed.read_nul_text()?;
        entries.push(WordHit { word, offset });
    }
    Ok(entries)
}
