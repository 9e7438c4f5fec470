//! Final assembly: spine order joined with loaded content.
//!
//! Manifest hrefs frequently disagree with actual archive entry names, so
//! each href is resolved through an ordered list of candidate keys: the
//! exact href, the conventional `OEBPS/` prefix, and the container-derived
//! root prefix. The first existing key wins.

use std::collections::HashMap;

use tracing::debug;

use crate::book::{BookContent, Chapter};
use crate::epub::content::LoadedEntry;
use crate::epub::package::PackageDocument;
use crate::error::Warning;

/// Conventional content folder many encoders use even when the container
/// declares something else.
const CONVENTIONAL_PREFIX: &str = "OEBPS";

/// Join package data and loaded content into the final book.
///
/// Spine slots that resolve to nothing are dropped (reported in warnings);
/// guide titles backfill chapters that still have no name.
pub fn assemble(
    package: PackageDocument,
    loaded: HashMap<String, LoadedEntry>,
    root_prefix: &str,
    mut warnings: Vec<Warning>,
) -> BookContent {
    let PackageDocument {
        metadata,
        spine,
        guide,
        cover_image,
        ..
    } = package;

    // Spine slots, in order
    let mut chapters: Vec<Chapter> = Vec::new();
    for slot in &spine {
        let Some(href) = &slot.href else {
            warnings.push(Warning::UnresolvedReference {
                reference: slot.idref.clone(),
            });
            continue;
        };

        match resolve_key(&loaded, href, root_prefix) {
            Some(key) => {
                if let Some(LoadedEntry::Chapter(chapter)) = loaded.get(&key) {
                    chapters.push(chapter.clone());
                } else {
                    // Spine pointed at a stylesheet or image
                    warnings.push(Warning::UnresolvedReference {
                        reference: href.clone(),
                    });
                }
            }
            None => warnings.push(Warning::UnresolvedReference {
                reference: href.clone(),
            }),
        }
    }

    // Guide titles backfill chapters that derived no name of their own
    for reference in &guide {
        let Some(title) = &reference.title else {
            continue;
        };

        let candidates = candidate_keys(&reference.href, root_prefix);
        let matched = chapters
            .iter_mut()
            .find(|chapter| candidates.iter().any(|(_, key)| *key == chapter.path));

        match matched {
            Some(chapter) => {
                if chapter.name.is_none() {
                    debug!(
                        href = reference.href.as_str(),
                        title = title.as_str(),
                        "guide reference names chapter"
                    );
                    chapter.name = Some(title.clone());
                }
            }
            None => warnings.push(Warning::UnresolvedReference {
                reference: reference.href.clone(),
            }),
        }
    }

    // Partition the remaining loaded entries
    let mut stylesheets = HashMap::new();
    let mut images = HashMap::new();
    for (name, entry) in loaded {
        match entry {
            LoadedEntry::Stylesheet(text) => {
                stylesheets.insert(name, text);
            }
            LoadedEntry::Image(bytes) => {
                images.insert(name, bytes);
            }
            LoadedEntry::Chapter(_) => {}
        }
    }

    BookContent {
        chapters,
        stylesheets,
        images,
        metadata,
        cover_image,
        warnings,
    }
}

/// Resolve an href to an actual loaded-content key, logging the strategy
/// that matched.
fn resolve_key(
    loaded: &HashMap<String, LoadedEntry>,
    href: &str,
    root_prefix: &str,
) -> Option<String> {
    for (strategy, key) in candidate_keys(href, root_prefix) {
        if loaded.contains_key(&key) {
            debug!(href, key = key.as_str(), strategy, "resolved content path");
            return Some(key);
        }
    }
    None
}

/// Ordered candidate archive keys for an href.
fn candidate_keys(href: &str, root_prefix: &str) -> Vec<(&'static str, String)> {
    let mut keys = vec![
        ("exact", href.to_string()),
        ("conventional-prefix", format!("{CONVENTIONAL_PREFIX}/{href}")),
    ];
    if !root_prefix.is_empty() && root_prefix != CONVENTIONAL_PREFIX {
        keys.push(("container-prefix", format!("{root_prefix}/{href}")));
    }
    keys
}
