//! Archive access abstraction.
//!
//! The pipeline consumes archives only through [`ArchiveSource`], so any
//! container that can enumerate and produce named byte streams can back an
//! extraction. A ZIP implementation and an in-memory implementation are
//! provided.

use std::io::{Read, Seek};

use zip::ZipArchive;

use crate::error::{Error, Result};

/// A named-entry archive: list entry names, read one entry's bytes.
pub trait ArchiveSource {
    /// All entry names in the archive, in archive order.
    fn entry_names(&self) -> Vec<String>;

    /// Read a single entry's bytes. Fails with [`Error::MissingEntry`] when
    /// no entry has the given name.
    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>>;
}

/// ZIP-backed archive source over any `Read + Seek`.
pub struct ZipSource<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl<R: Read + Seek> ZipSource<R> {
    pub fn new(reader: R) -> Result<Self> {
        Ok(ZipSource {
            archive: ZipArchive::new(reader)?,
        })
    }
}

impl<R: Read + Seek> ArchiveSource for ZipSource<R> {
    fn entry_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        match self.archive.by_name(name) {
            Ok(mut file) => {
                let mut contents = Vec::new();
                file.read_to_end(&mut contents)?;
                return Ok(contents);
            }
            Err(zip::result::ZipError::FileNotFound) => {}
            Err(e) => return Err(e.into()),
        }

        // Fallback: some encoders percent-encode entry names in one place
        // but not the other.
        let Ok(decoded) = percent_encoding::percent_decode_str(name).decode_utf8() else {
            return Err(Error::MissingEntry(name.to_string()));
        };
        if decoded != name {
            match self.archive.by_name(&decoded) {
                Ok(mut file) => {
                    let mut contents = Vec::new();
                    file.read_to_end(&mut contents)?;
                    return Ok(contents);
                }
                Err(zip::result::ZipError::FileNotFound) => {}
                Err(e) => return Err(e.into()),
            }
        }

        Err(Error::MissingEntry(name.to_string()))
    }
}

/// In-memory archive backed by a list of named entries. Preserves insertion
/// order in `entry_names`.
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    entries: Vec<(String, Vec<u8>)>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. A repeated name shadows the earlier entry.
    pub fn insert(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        let name = name.into();
        self.entries.retain(|(existing, _)| *existing != name);
        self.entries.push((name, data.into()));
    }
}

impl ArchiveSource for MemoryArchive {
    fn entry_names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, data)| data.clone())
            .ok_or_else(|| Error::MissingEntry(name.to_string()))
    }
}
