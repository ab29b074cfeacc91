//! Reader for the MDX/MDD dictionary container format.
//!
//! This crate parses the binary header, the two-tier keyword index, and the
//! record index of an `.mdx` (word -> definition) or `.mdd` (path -> resource
//! bytes) file, and exposes headword/path lookups including prefix
//! continuation, wildcard globs, and `@@@LINK=` redirect following.
//!
//! # Example
//! ```no_run
//! use mdict_reader::{MdxReader, WordQuery};
//!
//! let mut mdx = MdxReader::open("dictionary.mdx").unwrap();
//! if let Some(definition) = mdx.get_definition("hello").unwrap() {
//!     println!("{definition}");
//! }
//!
//! let hits = mdx.get_word_list(&WordQuery::Prefix("hel".into()), 20).unwrap();
//! for hit in hits {
//!     println!("{}", hit.word);
//! }
//!
//! // Paged form: repeated calls with the returned `Trail` walk disjoint
//! // pages until `None` signals the scan is exhausted.
//! let query = WordQuery::Prefix("hel".into());
//! let (_page, mut trail) = mdx.get_word_list_page(&query, 20, None).unwrap();
//! while let Some(t) = trail {
//!     let (_page, next) = mdx.get_word_list_page(&query, 20, Some(t)).unwrap();
//!     trail = next;
//! }
//! ```

mod cache;
mod compress;
mod decrypt;
mod error;
mod header;
mod index;
mod lookup;
mod record_table;
mod reader;
mod scanner;
mod source;
mod types;

pub use error::{MdictError, Result};
pub use header::HeaderAttributes;
pub use lookup::{Trail, WordQuery};
pub use reader::{MddReader, MdxReader};
pub use source::{ByteSource, FileSource, MemorySource};
pub use types::{CompressionType, Encoding, EncryptFlag, EngineVersion, FileExt, WordHit};

/// Upper bound, in scan units, on how far `BlockScanner::read_nul_text` will
/// search for a terminator before giving up. Guards against an unterminated or
/// corrupt block turning a read into an unbounded scan.
pub(crate) const DEFAULT_RECORD_SCAN_LIMIT: usize = 1 << 20;
