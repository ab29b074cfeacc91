//! Public façade: `MdxReader` and `MddReader`, the two entry points that wire
//! together the header, index, cache, and lookup engine behind a small query
//! surface. Grounded on the teacher crate's `Mdx`/`Mdd` wrapper structs, which
//! this module generalizes onto the shared `ByteSource` abstraction and the
//! richer `WordQuery` surface.

use std::path::Path;

use tracing::{debug, instrument};

use crate::cache::KeyBlockCache;
use crate::error::{MdictError, Result};
use crate::header::{self, HeaderAttributes};
use crate::index::{self, KeywordIndex};
use crate::lookup::{self, LookupEngine, Trail, WordQuery};
use crate::record_table::RecordBlockTable;
use crate::scanner::{BlockScanner, ScannerProfile};
use crate::source::{ByteSource, FileSource, MemorySource};
use crate::types::{Encoding, FileExt, WordHit};

/// Shared machinery behind both `.mdx` and `.mdd` readers: one open file, its
/// parsed header, the two block indices, and the engines that operate on them.
struct Container {
    source: Box<dyn ByteSource>,
    attrs: HeaderAttributes,
    keyword_index: KeywordIndex,
    record_table: RecordBlockTable,
    profile: ScannerProfile,
    cache: KeyBlockCache,
    engine: LookupEngine,
}

impl Container {
    fn open(source: Box<dyn ByteSource>, default_encoding: Encoding, ext: FileExt) -> Result<Self> {
        let (attrs, header_end) = header::decode(source.as_ref(), default_encoding)?;
        if attrs.encrypted.header_encrypted {
            return Err(MdictError::UnsupportedEncryption);
        }

        let profile = ScannerProfile {
            version: attrs.version,
            encoding: attrs.encoding,
        };

        let (keyword_index, record_section_offset) =
            index::load_keyword_index(source.as_ref(), profile, header_end, attrs.encrypted)?;
        let (record_table, _end) =
            index::load_record_table(source.as_ref(), profile, record_section_offset)?;

        debug!(
            blocks = keyword_index.blocks.len(),
            entries = keyword_index.total_entries,
            "loaded keyword index"
        );

        let engine = LookupEngine::new(attrs.key_case_sensitive, attrs.strip_key, ext);
        Ok(Container {
            source,
            attrs,
            keyword_index,
            record_table,
            profile,
            cache: KeyBlockCache::new(profile),
            engine,
        })
    }

    fn get_word_list(&mut self, query: &WordQuery, limit: usize) -> Result<Vec<WordHit>> {
        self.engine.run_query(
            query,
            limit,
            &self.keyword_index,
            &mut self.cache,
            self.source.as_ref(),
        )
    }

    /// Runs one page of `query`, resuming from `trail` if given. Only
    /// `WordQuery::Prefix` produces a continuation: `Exact` and `Wildcard`
    /// always return their whole (possibly limit-truncated) result in one
    /// page, matching the teacher's one-shot `get_associated_keywords`. A
    /// `None` trail in the return value means the scan is exhausted; feeding
    /// that page's `Some(trail)` back in as `trail` resumes immediately after
    /// the last hit returned, per §4.7's `match_keys` continuation.
    fn get_word_list_page(
        &mut self,
        query: &WordQuery,
        limit: usize,
        trail: Option<Trail>,
    ) -> Result<(Vec<WordHit>, Option<Trail>)> {
        match query {
            WordQuery::Prefix(prefix) => self.engine.lookup_prefix(
                prefix,
                limit,
                trail,
                &self.keyword_index,
                &mut self.cache,
                self.source.as_ref(),
            ),
            WordQuery::Exact(word) => {
                let hits = self.engine.lookup_exact(
                    word,
                    &self.keyword_index,
                    &mut self.cache,
                    self.source.as_ref(),
                )?;
                Ok((hits, None))
            }
            WordQuery::Wildcard(pattern) => {
                let hits = self.engine.lookup_wildcard(
                    pattern,
                    limit,
                    &self.keyword_index,
                    &mut self.cache,
                    self.source.as_ref(),
                )?;
                Ok((hits, None))
            }
        }
    }

    /// Reads one NUL-terminated definition string at `record_offset`, per §4.7:
    /// locate the record block, decompress it, seek to the offset within it, and
    /// read to the terminator. `.mdx` text records are always NUL-delimited, so
    /// this needs no knowledge of the next key's offset (unlike `.mdd` resources,
    /// which have no delimiter and go through `read_record_span` instead).
    fn read_text_at(&self, record_offset: u32) -> Result<String> {
        let (block_index, in_block_offset) = self.record_table.find(record_offset as u64)?;
        let block = self
            .record_table
            .get(block_index)
            .ok_or(MdictError::OutOfRange(record_offset))?;

        let raw = self.source.read_at(block.comp_offset, block.comp_size)?;
        let mut outer = BlockScanner::new(raw, self.profile);
        let mut decompressed =
            outer.read_block(block.comp_size as usize, block.decomp_size as usize, false)?;
        decompressed.seek(in_block_offset as usize)?;
        decompressed.read_nul_text()
    }

    /// Reads the raw decompressed bytes for one record entry, given its global
    /// offset and the offset of the NEXT entry in key order (or the end of the
    /// record stream, for the very last entry). `.mdd` resources have no
    /// delimiter, so their length can only be recovered this way.
    fn read_record_span(&self, offset: u32, next_offset: u64) -> Result<Vec<u8>> {
        let (block_index, in_block_offset) = self.record_table.find(offset as u64)?;
        let block = self
            .record_table
            .get(block_index)
            .ok_or(MdictError::OutOfRange(offset))?;

        let raw = self.source.read_at(block.comp_offset, block.comp_size)?;
        let mut outer = BlockScanner::new(raw, self.profile);
        let mut decompressed =
            outer.read_block(block.comp_size as usize, block.decomp_size as usize, false)?;

        let span_len = (next_offset - offset as u64) as usize;
        decompressed.seek(in_block_offset as usize)?;
        decompressed.read_raw(span_len)
    }

    /// Finds the offset of the entry immediately after `hit` in global key/record
    /// order, used to bound a `.mdd` resource's byte span.
    fn next_offset_after(&mut self, hit: &WordHit) -> Result<u64> {
        let target = self.engine.adapt_key(&hit.word);
        let mut block_index = self
            .keyword_index
            .blocks
            .iter()
            .position(|b| {
                let first = self.engine.adapt_key(&b.first_key);
                let last = self.engine.adapt_key(&b.last_key);
                first.as_str() <= target.as_str() && target.as_str() <= last.as_str()
            })
            .unwrap_or(0);

        loop {
            let block = match self.keyword_index.blocks.get(block_index) {
                Some(b) => b.clone(),
                None => return Ok(self.record_table.total_decomp_len()),
            };
            let entries = self.cache.load(&block, self.source.as_ref())?;
            if let Some(pos) = entries.iter().position(|e| e.offset == hit.offset) {
                if pos + 1 < entries.len() {
                    return Ok(entries[pos + 1].offset as u64);
                }
                block_index += 1;
                continue;
            }
            return Ok(self.record_table.total_decomp_len());
        }
    }
}

/// A reader over an `.mdx` dictionary: headword lookups that return expanded,
/// link-resolved HTML/text definitions.
pub struct MdxReader {
    container: Container,
}

impl MdxReader {
    #[instrument(skip(self))]
    pub fn open<P: AsRef<Path> + std::fmt::Debug>(path: P) -> Result<Self> {
        let source = Box::new(FileSource::open(path.as_ref())?);
        Ok(MdxReader {
            container: Container::open(source, Encoding::Utf16, FileExt::Mdx)?,
        })
    }

    pub fn open_memory(bytes: Vec<u8>) -> Result<Self> {
        Ok(MdxReader {
            container: Container::open(Box::new(MemorySource::new(bytes)), Encoding::Utf16, FileExt::Mdx)?,
        })
    }

    pub fn title(&self) -> Option<&str> {
        self.container.attrs.title.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.container.attrs.description.as_deref()
    }

    pub fn get_word_list(&mut self, query: &WordQuery, limit: usize) -> Result<Vec<WordHit>> {
        self.container.get_word_list(query, limit)
    }

    /// Runs one page of `query` against the keyword index, resuming from a
    /// previously returned [`Trail`] when `follow`ing a multi-page scan.
    /// Returns the page's hits and, if more entries may remain, a `Trail` to
    /// pass back in on the next call; `None` means the scan is exhausted.
    pub fn get_word_list_page(
        &mut self,
        query: &WordQuery,
        limit: usize,
        trail: Option<Trail>,
    ) -> Result<(Vec<WordHit>, Option<Trail>)> {
        self.container.get_word_list_page(query, limit, trail)
    }

    /// Resolves a headword to its fully expanded definition, following
    /// `@@@LINK=` redirects up to the bounded recursion depth. A convenience
    /// wrapper over [`MdxReader::get_definition_at`] for callers that have not
    /// already run a word-list query (and so don't have a `WordHit.offset` on
    /// hand).
    #[instrument(skip(self))]
    pub fn get_definition(&mut self, word: &str) -> Result<Option<String>> {
        let hits = self
            .container
            .engine
            .lookup_exact(word, &self.container.keyword_index, &mut self.container.cache, self.container.source.as_ref())?;
        let Some(hit) = hits.into_iter().next() else {
            return Ok(None);
        };
        self.get_definition_at(hit.offset).map(Some)
    }

    /// Resolves the definition stored at `record_offset` (as returned in a
    /// `WordHit` from [`MdxReader::get_word_list`]), per §4.7: locate the owning
    /// record block, decompress it, read the NUL-terminated text, expand any
    /// stylesheet spans, and transparently follow `@@@LINK=` redirects.
    #[instrument(skip(self))]
    pub fn get_definition_at(&mut self, record_offset: u32) -> Result<String> {
        self.resolve_definition(record_offset, 0)
    }

    fn resolve_definition(&mut self, record_offset: u32, depth: u8) -> Result<String> {
        if depth >= lookup::max_link_depth() {
            return Err(MdictError::LinkLoop);
        }

        let text = self.container.read_text_at(record_offset)?;
        let text = header::expand_stylesheet(&text, &self.container.attrs.stylesheet);

        if let Some(target) = lookup::parse_link(&text) {
            let target = target.to_string();
            let hits = self.container.engine.lookup_exact(
                &target,
                &self.container.keyword_index,
                &mut self.container.cache,
                self.container.source.as_ref(),
            )?;
            return match hits.into_iter().next() {
                Some(next_hit) => self.resolve_definition(next_hit.offset, depth + 1),
                None => Err(MdictError::ResourceNotFound(target)),
            };
        }

        Ok(text)
    }
}

/// A reader over an `.mdd` resource container: path lookups that return raw
/// binary bytes (images, audio, embedded stylesheets).
pub struct MddReader {
    container: Container,
}

impl MddReader {
    #[instrument(skip(self))]
    pub fn open<P: AsRef<Path> + std::fmt::Debug>(path: P) -> Result<Self> {
        let source = Box::new(FileSource::open(path.as_ref())?);
        Ok(MddReader {
            container: Container::open(source, Encoding::Utf16, FileExt::Mdd)?,
        })
    }

    pub fn open_memory(bytes: Vec<u8>) -> Result<Self> {
        Ok(MddReader {
            container: Container::open(Box::new(MemorySource::new(bytes)), Encoding::Utf16, FileExt::Mdd)?,
        })
    }

    pub fn get_word_list(&mut self, query: &WordQuery, limit: usize) -> Result<Vec<WordHit>> {
        self.container.get_word_list(query, limit)
    }

    /// See [`MdxReader::get_word_list_page`].
    pub fn get_word_list_page(
        &mut self,
        query: &WordQuery,
        limit: usize,
        trail: Option<Trail>,
    ) -> Result<(Vec<WordHit>, Option<Trail>)> {
        self.container.get_word_list_page(query, limit, trail)
    }

    /// Returns the raw bytes stored under `resource_path` (e.g. `"\\img\\cat.png"`),
    /// normalizing the path separator the way the source dictionaries store it.
    #[instrument(skip(self))]
    pub fn get_resource(&mut self, resource_path: &str) -> Result<Option<Vec<u8>>> {
        let normalized = normalize_resource_path(resource_path);
        let hits = self.container.engine.lookup_exact(
            &normalized,
            &self.container.keyword_index,
            &mut self.container.cache,
            self.container.source.as_ref(),
        )?;
        let Some(hit) = hits.into_iter().next() else {
            return Ok(None);
        };
        let next_offset = self.container.next_offset_after(&hit)?;
        let bytes = self.container.read_record_span(hit.offset, next_offset)?;
        Ok(Some(bytes))
    }
}

fn normalize_resource_path(path: &str) -> String {
    let slash_form = path.replace('/', "\\");
    if slash_form.starts_with('\\') {
        slash_form
    } else {
        format!("\\{slash_form}")
    }
}
