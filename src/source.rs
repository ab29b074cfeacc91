//! The random-access byte source contract.
//!
//! This is the external collaborator named in the specification: the reader never
//! opens or owns storage on its own terms, it asks a `ByteSource` for `(offset,
//! length) -> bytes`. Two implementations are provided — a local file and an
//! in-memory blob — covering the two source kinds the public API accepts.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Mutex;

use crate::error::{MdictError, Result};

/// A durable, positional byte source. Implementations must return exactly `length`
/// bytes or fail — partial reads are not part of the contract.
pub trait ByteSource {
    fn read_at(&self, offset: u64, length: u64) -> Result<Vec<u8>>;

    /// Total size of the source, when known. Used only for sanity checks; the parser
    /// never relies on it to decide where sections begin.
    fn len(&self) -> Option<u64> {
        None
    }
}

/// A byte source backed by a local file handle.
///
/// `File` does not expose a `&self` positional read on all platforms without the
/// platform-specific `FileExt` traits, so this wraps the handle in a `Mutex` and
/// seeks before every read, mirroring the teacher crate's `read_buffer` (seek then
/// `read_exact`).
pub struct FileSource {
    file: Mutex<File>,
    len: u64,
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(FileSource {
            file: Mutex::new(file),
            len,
        })
    }
}

impl ByteSource for FileSource {
    fn read_at(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        let mut file = self.file.lock().expect("file source mutex poisoned");
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; length as usize];
        file.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                MdictError::Truncated
            } else {
                MdictError::Io(e)
            }
        })?;
        Ok(buf)
    }

    fn len(&self) -> Option<u64> {
        Some(self.len)
    }
}

/// A byte source backed by an in-memory blob (the whole file read into a `Vec<u8>`
/// ahead of time, or any owned buffer the caller already has).
pub struct MemorySource {
    data: Vec<u8>,
}

impl MemorySource {
    pub fn new(data: Vec<u8>) -> Self {
        MemorySource { data }
    }
}

impl ByteSource for MemorySource {
    fn read_at(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        let start = offset as usize;
        let end = start
            .checked_add(length as usize)
            .ok_or(MdictError::Truncated)?;
        self.data
            .get(start..end)
            .map(|s| s.to_vec())
            .ok_or(MdictError::Truncated)
    }

    fn len(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }
}
