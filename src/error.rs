//! Error and warning types for EPUB extraction.

use thiserror::Error;

/// Errors that abort an extraction outright.
///
/// Only archive-structure problems are fatal: without a container descriptor
/// and a parseable package document there is no meaningful partial result.
/// Per-entry problems surface as [`Warning`] records on the extracted book
/// instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// A required archive entry is absent (e.g. `META-INF/container.xml`).
    #[error("missing archive entry: {0}")]
    MissingEntry(String),

    /// No package document (`.opf`) anywhere in the archive listing.
    #[error("no package document (.opf) found in archive")]
    MissingOpf,

    /// The container descriptor exists but holds no usable rootfile.
    #[error("malformed container.xml: {0}")]
    MalformedContainer(String),

    /// The package document is missing a required section.
    #[error("malformed package document: {0}")]
    MalformedPackage(String),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Non-fatal problems absorbed during extraction.
///
/// One damaged chapter must not deny access to the rest of the book, so
/// these degrade the affected record and are reported on
/// [`BookContent::warnings`](crate::book::BookContent::warnings) rather than
/// aborting the parse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A spine or guide reference whose path matched no loaded content.
    /// The spine slot is dropped, or the guide title update skipped.
    #[error("unresolved reference: {reference}")]
    UnresolvedReference { reference: String },

    /// A chapter entry whose bytes could not be loaded. The chapter is
    /// retained with empty document, body text, and name.
    #[error("chapter {path} degraded: {reason}")]
    ChapterParseDegraded { path: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
