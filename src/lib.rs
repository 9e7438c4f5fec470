//! # quire
//!
//! Structured content extraction for EPUB archives: chapters in reading
//! order, stylesheets, images, and Dublin-Core metadata.
//!
//! An EPUB is a ZIP container holding XML manifests plus XHTML/CSS/image
//! payloads. Real-world archives disagree with their own manifests in many
//! small ways (inconsistent folder prefixes, parent-relative hrefs, repeated
//! metadata fields, chapters without titles); this crate reconciles those
//! differences and degrades per-chapter instead of failing the whole book.
//!
//! ## Quick start
//!
//! ```no_run
//! let book = quire::read_epub("path/to/book.epub")?;
//!
//! println!("title: {:?}", book.metadata.title());
//! for chapter in &book.chapters {
//!     println!("{}: {}", chapter.path, chapter.name.as_deref().unwrap_or("(untitled)"));
//! }
//! # Ok::<(), quire::Error>(())
//! ```
//!
//! Extraction is fatal only when the archive structure itself is broken (no
//! container descriptor, no package document, required package sections
//! missing). Everything else (unresolvable spine entries, chapters that fail
//! to load) degrades the affected record and is reported in
//! [`BookContent::warnings`](book::BookContent::warnings).

pub mod archive;
pub mod book;
pub mod dom;
pub mod epub;
pub mod error;
pub(crate) mod util;

pub use archive::{ArchiveSource, MemoryArchive, ZipSource};
pub use book::{BookContent, Chapter, GuideReference, MetaValue, PackageMetadata};
pub use epub::{ContentConfig, extract, read_epub, read_epub_from_reader};
pub use error::{Error, Result, Warning};
