//! EPUB extraction pipeline orchestration.

use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

use tracing::{debug, warn};

use crate::archive::{ArchiveSource, ZipSource};
use crate::book::BookContent;
use crate::epub::assemble::assemble;
use crate::epub::container::{self, CONTAINER_PATH};
use crate::epub::content::{self, ContentConfig, EntryKind, LoadedEntry};
use crate::epub::package;
use crate::error::{Error, Result, Warning};
use crate::util::{decode_text, extract_xml_encoding};

/// Extract a book from an EPUB file on disk.
///
/// # Example
///
/// ```no_run
/// let book = quire::read_epub("path/to/book.epub")?;
/// println!("{} chapters", book.chapters.len());
/// # Ok::<(), quire::Error>(())
/// ```
pub fn read_epub<P: AsRef<Path>>(path: P) -> Result<BookContent> {
    let file = std::fs::File::open(path)?;
    read_epub_from_reader(file)
}

/// Extract a book from any [`Read`] + [`Seek`] source.
///
/// Useful for memory buffers or network streams.
pub fn read_epub_from_reader<R: Read + Seek>(reader: R) -> Result<BookContent> {
    let mut archive = ZipSource::new(reader)?;
    extract(&mut archive, &ContentConfig::default())
}

/// Extract a book from any archive capability, with explicit content
/// configuration.
pub fn extract(archive: &mut dyn ArchiveSource, config: &ContentConfig) -> Result<BookContent> {
    // 1. Container descriptor: package document location + fallback prefix
    let container_bytes = archive.read_entry(CONTAINER_PATH)?;
    let info = container::parse_container(&container_bytes)?;

    // 2. Pick the package document from the archive listing
    let names = archive.entry_names();
    let opf_name = select_package_document(&names, &info.opf_path).ok_or(Error::MissingOpf)?;
    debug!(opf = opf_name.as_str(), prefix = info.root_prefix.as_str(), "located package document");

    // 3. Batch-read every supported entry. The reads are independent of one
    //    another; the whole batch completes before any parsing starts.
    let mut batch: Vec<(String, EntryKind, Result<Vec<u8>>)> = Vec::new();
    for name in &names {
        if let Some(kind) = config.kind_of(name) {
            batch.push((name.clone(), kind, archive.read_entry(name)));
        }
    }

    // 4. Parse the package document
    let opf_bytes = archive.read_entry(&opf_name)?;
    let opf_text = decode_text(&opf_bytes, extract_xml_encoding(&opf_bytes));
    let package = package::parse_package(&opf_text, &opf_name)?;

    let book_title = package.metadata.title().map(str::to_string);

    // 5. Classify and parse the batch
    let mut warnings = Vec::new();
    let mut loaded: HashMap<String, LoadedEntry> = HashMap::new();
    for (name, kind, bytes) in batch {
        match bytes {
            Ok(bytes) => {
                loaded.insert(
                    name.clone(),
                    content::load_entry(&name, bytes, kind, book_title.as_deref()),
                );
            }
            // A chapter that fails to load keeps its slot, degraded;
            // unreadable stylesheets and images are skipped.
            Err(err) if kind == EntryKind::Markup => {
                warnings.push(Warning::ChapterParseDegraded {
                    path: name.clone(),
                    reason: err.to_string(),
                });
                loaded.insert(
                    name.clone(),
                    LoadedEntry::Chapter(crate::book::Chapter::degraded(&name)),
                );
            }
            Err(err) => {
                warn!(entry = name.as_str(), error = %err, "skipping unreadable entry");
            }
        }
    }

    // 6. Assemble the final book
    Ok(assemble(package, loaded, &info.root_prefix, warnings))
}

/// Prefer the container-declared package document when it actually exists;
/// otherwise fall back to scanning the listing for any `.opf` entry.
fn select_package_document(names: &[String], declared: &str) -> Option<String> {
    if names.iter().any(|name| name == declared) {
        return Some(declared.to_string());
    }
    names
        .iter()
        .find(|name| container::is_package_document(name))
        .cloned()
}
