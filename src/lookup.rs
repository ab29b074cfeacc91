//! `LookupEngine`: key normalization, the two-tier binary search, prefix/wildcard
//! enumeration with cross-block continuation, and `@@@LINK=` redirect following.
//!
//! Grounded on the teacher crate's `lookup_keyword_by_word` (outer block bisection
//! then inner entry bisection) and `get_prefix_keywords`/`get_associated_keywords`,
//! generalized to also support wildcard globs and a resumable continuation token
//! instead of returning one fixed-size batch.

use regex::Regex;

use crate::cache::KeyBlockCache;
use crate::error::{MdictError, Result};
use crate::index::KeywordIndex;
use crate::source::ByteSource;
use crate::types::{FileExt, WordHit};

/// Punctuation the specification strips from both sides of a comparison: `[()., '/\@_-]`.
/// Deliberately excludes backslash, so `.mdd` path separators survive stripping.
const STRIP_CHARS: [char; 10] = ['(', ')', '.', ',', ' ', '\'', '/', '@', '_', '-'];

const MAX_LINK_DEPTH: u8 = 16;

pub enum WordQuery {
    Exact(String),
    Prefix(String),
    Wildcard(String),
}

/// A resumable position in the (block, entry) enumeration space, returned by
/// prefix/wildcard scans that stopped at a caller-supplied limit. Plays the role
/// the specification's recursive "mutual ticket" continuation state machine
/// plays in the original design; here it degenerates to an explicit cursor
/// because the engine is single-threaded and synchronous.
#[derive(Debug, Clone, Copy)]
pub struct Trail {
    block_index: usize,
    entry_index: usize,
}

pub struct LookupEngine {
    case_sensitive: bool,
    strip_key: bool,
    ext: FileExt,
}

impl LookupEngine {
    pub fn new(case_sensitive: bool, strip_key: bool, ext: FileExt) -> Self {
        LookupEngine {
            case_sensitive,
            strip_key,
            ext,
        }
    }

    /// Normalizes a key for comparison, per §4.7's `adapt_key`:
    /// - case-sensitive + stripped: apply the punctuation/extension regex only
    /// - case-sensitive + not stripped: identity
    /// - case-insensitive + stripped: lowercase, then strip
    /// - case-insensitive + not stripped: lowercase only
    pub fn adapt_key(&self, key: &str) -> String {
        let trimmed = key.trim();
        if self.case_sensitive {
            if self.strip_key {
                self.strip(trimmed)
            } else {
                trimmed.to_string()
            }
        } else {
            let lowered = trimmed.to_lowercase();
            if self.strip_key {
                self.strip(&lowered)
            } else {
                lowered
            }
        }
    }

    /// `.mdx`: `/[()., '/\@_-]/`. `.mdd`: the same class plus a leading strip of
    /// the trailing `.ext` so resource paths compare extension-agnostically.
    fn strip(&self, key: &str) -> String {
        let base = if self.ext == FileExt::Mdd {
            match key.rfind('.') {
                Some(pos) => &key[..pos],
                None => key,
            }
        } else {
            key
        };
        base.chars().filter(|c| !STRIP_CHARS.contains(c)).collect()
    }

    fn locate_block(&self, index: &KeywordIndex, target: &str) -> usize {
        if index.blocks.is_empty() {
            return 0;
        }
        let mut lo = 0usize;
        let mut hi = index.blocks.len();
        while lo + 1 < hi {
            let mid = lo + (hi - lo) / 2;
            let last = self.adapt_key(&index.blocks[mid].last_key);
            if last.as_str() < target {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo.min(index.blocks.len() - 1)
    }

    /// Binary search within a loaded block's entries for the FIRST entry whose
    /// adapted key equals `target`, refining past the teacher's "any exact match"
    /// bisection to also walk backward over ties.
    fn find_first_equal(&self, entries: &[WordHit], target: &str) -> Option<usize> {
        let mut lo = 0usize;
        let mut hi = entries.len();
        let mut found: Option<usize> = None;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let key = self.adapt_key(&entries[mid].word);
            match key.as_str().cmp(target) {
                std::cmp::Ordering::Equal => {
                    found = Some(mid);
                    hi = mid;
                }
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
            }
        }
        found
    }

    /// First entry whose adapted key is `>= target`, for prefix/wildcard scans.
    fn find_lower_bound(&self, entries: &[WordHit], target: &str) -> usize {
        let mut lo = 0usize;
        let mut hi = entries.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let key = self.adapt_key(&entries[mid].word);
            if key.as_str() < target {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    pub fn lookup_exact(
        &self,
        word: &str,
        index: &KeywordIndex,
        cache: &mut KeyBlockCache,
        source: &dyn ByteSource,
    ) -> Result<Vec<WordHit>> {
        if index.blocks.is_empty() {
            return Ok(Vec::new());
        }
        let target = self.adapt_key(word);
        let bi = self.locate_block(index, &target);
        let entries = cache.load(&index.blocks[bi], source)?;

        let mut hits = Vec::new();
        if let Some(mut i) = self.find_first_equal(entries, &target) {
            loop {
                let entry = &entries[i];
                if self.adapt_key(&entry.word) != target {
                    break;
                }
                hits.push(entry.clone());
                i += 1;
                if i >= entries.len() {
                    break;
                }
            }
        }
        Ok(hits)
    }

    /// Enumerates entries whose adapted key starts with `prefix`, resuming from
    /// `trail` if given, stopping after `limit` hits. Returns the hits plus a
    /// continuation trail if more may remain.
    pub fn lookup_prefix(
        &self,
        prefix: &str,
        limit: usize,
        trail: Option<Trail>,
        index: &KeywordIndex,
        cache: &mut KeyBlockCache,
        source: &dyn ByteSource,
    ) -> Result<(Vec<WordHit>, Option<Trail>)> {
        let target = self.adapt_key(prefix);
        if index.blocks.is_empty() {
            return Ok((Vec::new(), None));
        }

        let (mut block_index, mut entry_index) = match trail {
            Some(t) => (t.block_index, t.entry_index),
            None => {
                let bi = self.locate_block(index, &target);
                let entries = cache.load(&index.blocks[bi], source)?;
                (bi, self.find_lower_bound(entries, &target))
            }
        };

        let mut hits = Vec::new();
        loop {
            if block_index >= index.blocks.len() {
                return Ok((hits, None));
            }
            let entries = cache.load(&index.blocks[block_index], source)?;
            if entry_index >= entries.len() {
                block_index += 1;
                entry_index = 0;
                continue;
            }
            let entry = &entries[entry_index];
            let adapted = self.adapt_key(&entry.word);
            if !adapted.starts_with(&target) {
                return Ok((hits, None));
            }
            hits.push(entry.clone());
            entry_index += 1;
            if hits.len() >= limit {
                return Ok((
                    hits,
                    Some(Trail {
                        block_index,
                        entry_index,
                    }),
                ));
            }
        }
    }

    /// Case-folds (but does not strip punctuation from) a string, so `*`/`?`
    /// glob markers in a wildcard query survive normalization.
    fn fold_case(&self, text: &str) -> String {
        if self.case_sensitive {
            text.trim().to_string()
        } else {
            text.trim().to_lowercase()
        }
    }

    /// Enumerates entries matching a `*`/`?` glob, scanning every block since a
    /// leading wildcard rules out bounding the scan to one region.
    pub fn lookup_wildcard(
        &self,
        pattern: &str,
        limit: usize,
        index: &KeywordIndex,
        cache: &mut KeyBlockCache,
        source: &dyn ByteSource,
    ) -> Result<Vec<WordHit>> {
        let re = wildcard_to_regex(&self.fold_case(pattern))?;

        let mut hits = Vec::new();
        for block in &index.blocks {
            let entries = cache.load(block, source)?;
            for entry in entries {
                if re.is_match(&self.fold_case(&entry.word)) {
                    hits.push(entry.clone());
                    if hits.len() >= limit {
                        return Ok(hits);
                    }
                }
            }
        }
        Ok(hits)
    }

    pub fn run_query(
        &self,
        query: &WordQuery,
        limit: usize,
        index: &KeywordIndex,
        cache: &mut KeyBlockCache,
        source: &dyn ByteSource,
    ) -> Result<Vec<WordHit>> {
        match query {
            WordQuery::Exact(word) => self.lookup_exact(word, index, cache, source),
            WordQuery::Prefix(prefix) => {
                Ok(self.lookup_prefix(prefix, limit, None, index, cache, source)?.0)
            }
            WordQuery::Wildcard(pattern) => self.lookup_wildcard(pattern, limit, index, cache, source),
        }
    }
}

/// Translates a `*`/`?` glob into an anchored regex, escaping every other
/// character so literal regex metacharacters in the query can't leak through.
fn wildcard_to_regex(pattern: &str) -> Result<Regex> {
    let mut out = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            _ => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out.push('$');
    Regex::new(&out).map_err(|_| MdictError::InvalidHeader("bad wildcard pattern".into()))
}

/// If a definition is a pure `@@@LINK=target` redirect, returns the target key.
pub fn parse_link(definition: &str) -> Option<&str> {
    definition
        .trim_end_matches(['\r', '\n'])
        .strip_prefix("@@@LINK=")
        .map(|target| target.trim())
}

pub fn max_link_depth() -> u8 {
    MAX_LINK_DEPTH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapt_key_folds_case_and_punctuation() {
        let engine = LookupEngine::new(false, true, FileExt::Mdx);
        assert_eq!(engine.adapt_key("Don't-Go!"), "dontgo!");
        assert_eq!(engine.adapt_key("  Hello World  "), "helloworld");
    }

    #[test]
    fn adapt_key_respects_case_sensitivity() {
        let engine = LookupEngine::new(true, true, FileExt::Mdx);
        assert_eq!(engine.adapt_key("Hello-World"), "HelloWorld");
    }

    #[test]
    fn adapt_key_identity_when_not_case_sensitive_stripped() {
        let engine = LookupEngine::new(true, false, FileExt::Mdx);
        assert_eq!(engine.adapt_key("  Hello-World  "), "Hello-World");
    }

    #[test]
    fn adapt_key_mdd_strips_trailing_extension() {
        let engine = LookupEngine::new(false, true, FileExt::Mdd);
        assert_eq!(engine.adapt_key(r"\img\cat.png"), r"\img\cat");
    }

    #[test]
    fn parses_link_redirects() {
        assert_eq!(parse_link("@@@LINK=color\r\n"), Some("color"));
        assert_eq!(parse_link("not a link"), None);
    }

    #[test]
    fn wildcard_translation_matches_expected_shapes() {
        let re = wildcard_to_regex("c?t*").unwrap();
        assert!(re.is_match("cats"));
        assert!(re.is_match("cut"));
        assert!(!re.is_match("cast"));
    }
}
