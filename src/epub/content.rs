//! Content entry loading and classification.
//!
//! Selects archive entries by extension, decodes them, and for markup
//! entries derives a candidate chapter title and the body text.

use scraper::Html;

use crate::book::Chapter;
use crate::dom;
use crate::util::{decode_text, extract_xml_encoding};

/// Heading tags scanned for a chapter title, most major first.
const HEADING_TAGS: [&str; 3] = ["h1", "h2", "h3"];

/// Extension sets selecting which archive entries the loader touches.
/// Injected so callers can extend format support without code changes.
/// Matching is case-insensitive.
#[derive(Debug, Clone)]
pub struct ContentConfig {
    pub markup_extensions: Vec<String>,
    pub stylesheet_extensions: Vec<String>,
    pub image_extensions: Vec<String>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        ContentConfig {
            markup_extensions: vec![".html".into(), ".xhtml".into()],
            stylesheet_extensions: vec![".css".into()],
            image_extensions: vec![".png".into(), ".jpg".into(), ".jpeg".into()],
        }
    }
}

impl ContentConfig {
    /// Classify an entry name, or None when the extension is unsupported.
    pub fn kind_of(&self, name: &str) -> Option<EntryKind> {
        let lower = name.to_ascii_lowercase();
        let matches = |exts: &[String]| exts.iter().any(|ext| lower.ends_with(ext.as_str()));

        if matches(&self.markup_extensions) {
            Some(EntryKind::Markup)
        } else if matches(&self.stylesheet_extensions) {
            Some(EntryKind::Stylesheet)
        } else if matches(&self.image_extensions) {
            Some(EntryKind::Image)
        } else {
            None
        }
    }
}

/// Entry classification by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Markup,
    Stylesheet,
    Image,
}

/// A classified, loaded archive entry.
#[derive(Debug, Clone)]
pub enum LoadedEntry {
    Chapter(Chapter),
    Stylesheet(String),
    Image(Vec<u8>),
}

/// Classify and parse one batch-read entry. `book_title` feeds the
/// head-title suppression heuristic for markup entries.
pub fn load_entry(
    name: &str,
    bytes: Vec<u8>,
    kind: EntryKind,
    book_title: Option<&str>,
) -> LoadedEntry {
    match kind {
        EntryKind::Image => LoadedEntry::Image(bytes),
        EntryKind::Stylesheet => {
            let text = decode_text(&bytes, None);
            LoadedEntry::Stylesheet(text.into_owned())
        }
        EntryKind::Markup => LoadedEntry::Chapter(parse_chapter(name, &bytes, book_title)),
    }
}

/// Parse a markup entry into a [`Chapter`], deriving a candidate title and
/// the body text.
pub fn parse_chapter(name: &str, bytes: &[u8], book_title: Option<&str>) -> Chapter {
    let hint = extract_xml_encoding(bytes);
    let text = decode_text(bytes, hint);
    let document = dom::parse_document(&text);

    let body_text = dom::find_by_tag(&document, "body")
        .first()
        .map(|body| dom::text_content(*body));
    let name_candidate = chapter_title(&document, book_title);

    Chapter {
        name: name_candidate,
        path: name.to_string(),
        document: Some(document),
        body_text,
    }
}

/// Derive a chapter title.
///
/// Precedence: the `<head><title>` text, unless it is a case-insensitive
/// prefix of the book title (books commonly repeat their own title there);
/// otherwise the first heading level with at least one element, joining the
/// text of all elements at that level in document order.
fn chapter_title(document: &Html, book_title: Option<&str>) -> Option<String> {
    if let Some(head) = dom::find_by_tag(document, "head").into_iter().next()
        && let Some(title) = dom::find_in(head, "title").into_iter().next()
    {
        let text = dom::text_content(title);
        if accepts_head_title(&text, book_title) {
            return Some(text);
        }
    }

    for tag in HEADING_TAGS {
        let headings = dom::find_by_tag(document, tag);
        if headings.is_empty() {
            continue;
        }
        let joined = headings
            .iter()
            .map(|heading| dom::text_content(*heading))
            .collect::<Vec<_>>()
            .join(" ");
        let joined = joined.trim().to_string();
        return if joined.is_empty() { None } else { Some(joined) };
    }

    None
}

fn accepts_head_title(text: &str, book_title: Option<&str>) -> bool {
    if text.is_empty() {
        return false;
    }
    match book_title {
        Some(book) => !book.to_lowercase().starts_with(&text.to_lowercase()),
        None => true,
    }
}
