//! Package document parsing (metadata, manifest, spine, guide).
//!
//! The package document (`.opf`) is parsed in one streaming pass; section
//! order in the document does not matter. Dublin-Core metadata accumulates
//! repeats, manifest hrefs are rebased for parent-directory segments, spine
//! order is preserved exactly.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::book::{GuideReference, PackageMetadata};
use crate::error::{Error, Result};

/// One spine slot: the itemref's `idref` and its manifest-resolved href.
/// `href` is None when the idref matches no manifest item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpineRef {
    pub idref: String,
    pub href: Option<String>,
}

/// Parsed package document.
#[derive(Debug, Default)]
pub struct PackageDocument {
    pub metadata: PackageMetadata,

    /// Manifest id -> href; hrefs already rebased for `../` segments
    /// against the package document's own folder.
    pub manifest: HashMap<String, String>,

    /// Reading order, exactly as the itemref elements appear.
    pub spine: Vec<SpineRef>,

    /// Guide references; empty when the document has no guide section.
    pub guide: Vec<GuideReference>,

    /// Cover image href, from the EPUB 3 `cover-image` property or the
    /// EPUB 2 `<meta name="cover">` declaration.
    pub cover_image: Option<String>,
}

/// Parse a package document. `opf_path` is the document's own archive path,
/// needed to rebase parent-relative manifest hrefs.
///
/// Fails with [`Error::MalformedPackage`] when the metadata, manifest, or
/// spine section was never seen.
pub fn parse_package(content: &str, opf_path: &str) -> Result<PackageDocument> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut metadata = PackageMetadata::default();
    let mut manifest_items: Vec<ManifestItem> = Vec::new();
    let mut spine_ids: Vec<String> = Vec::new();
    let mut guide: Vec<GuideReference> = Vec::new();
    let mut epub2_cover_id: Option<String> = None;

    let mut saw_metadata = false;
    let mut saw_manifest = false;
    let mut saw_spine = false;

    let mut in_metadata = false;
    let mut current_field: Option<String> = None;
    let mut buf_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                match local_name(e.name().as_ref()) {
                    b"metadata" => {
                        saw_metadata = true;
                        in_metadata = true;
                    }
                    b"manifest" => saw_manifest = true,
                    b"spine" => saw_spine = true,
                    _ => {}
                }

                if in_metadata && let Some(field) = dc_field(e.name().as_ref()) {
                    current_field = Some(field);
                    buf_text.clear();
                }

                collect_structural(
                    &e,
                    opf_path,
                    &mut manifest_items,
                    &mut spine_ids,
                    &mut guide,
                    &mut epub2_cover_id,
                )?;
            }
            Ok(Event::Empty(e)) => {
                match local_name(e.name().as_ref()) {
                    b"metadata" => saw_metadata = true,
                    b"manifest" => saw_manifest = true,
                    b"spine" => saw_spine = true,
                    _ => {}
                }

                // Self-closing Dublin-Core element: present but empty
                if in_metadata && let Some(field) = dc_field(e.name().as_ref()) {
                    metadata.insert(field, String::new());
                }

                collect_structural(
                    &e,
                    opf_path,
                    &mut manifest_items,
                    &mut spine_ids,
                    &mut guide,
                    &mut epub2_cover_id,
                )?;
            }
            Ok(Event::Text(e)) => {
                if current_field.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if current_field.is_some() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        buf_text.push_str(&resolved);
                    }
                }
            }
            Ok(Event::End(e)) => {
                if local_name(e.name().as_ref()) == b"metadata" {
                    in_metadata = false;
                }

                if let Some(field) = current_field.take() {
                    metadata.insert(field, buf_text.clone());
                    buf_text.clear();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    if !saw_metadata {
        return Err(Error::MalformedPackage("metadata section not found".into()));
    }
    if !saw_manifest {
        return Err(Error::MalformedPackage("manifest section not found".into()));
    }
    if !saw_spine {
        return Err(Error::MalformedPackage("spine section not found".into()));
    }

    // EPUB 3 cover-image property wins over the EPUB 2 meta declaration
    let epub3_cover = manifest_items.iter().find(|item| {
        item.properties
            .as_ref()
            .is_some_and(|props| props.split_ascii_whitespace().any(|p| p == "cover-image"))
    });
    let cover_image = if let Some(item) = epub3_cover {
        Some(item.href.clone())
    } else if let Some(id) = &epub2_cover_id {
        manifest_items
            .iter()
            .find(|item| item.id == *id)
            .map(|item| item.href.clone())
    } else {
        None
    };

    let manifest: HashMap<String, String> = manifest_items
        .into_iter()
        .map(|item| (item.id, item.href))
        .collect();

    let spine = spine_ids
        .into_iter()
        .map(|idref| SpineRef {
            href: manifest.get(&idref).cloned(),
            idref,
        })
        .collect();

    Ok(PackageDocument {
        metadata,
        manifest,
        spine,
        guide,
        cover_image,
    })
}

struct ManifestItem {
    id: String,
    href: String,
    properties: Option<String>,
}

/// Record manifest items, spine itemrefs, guide references, and cover meta
/// declarations. Start and self-closing forms are treated alike.
fn collect_structural(
    e: &BytesStart,
    opf_path: &str,
    items: &mut Vec<ManifestItem>,
    spine_ids: &mut Vec<String>,
    guide: &mut Vec<GuideReference>,
    epub2_cover_id: &mut Option<String>,
) -> Result<()> {
    match local_name(e.name().as_ref()) {
        b"item" => {
            let id = attr_value(e, b"id")?;
            let href = attr_value(e, b"href")?;
            if let (Some(id), Some(href)) = (id, href) {
                items.push(ManifestItem {
                    id,
                    href: rebase_href(&href, opf_path),
                    properties: attr_value(e, b"properties")?,
                });
            }
        }
        b"itemref" => {
            if let Some(idref) = attr_value(e, b"idref")? {
                spine_ids.push(idref);
            }
        }
        b"reference" => {
            if let Some(href) = attr_value(e, b"href")? {
                guide.push(GuideReference {
                    href,
                    title: attr_value(e, b"title")?,
                });
            }
        }
        b"meta" => {
            let is_cover = e
                .attributes()
                .flatten()
                .any(|a| a.key.as_ref() == b"name" && a.value.as_ref() == b"cover");
            if is_cover
                && let Some(content) = attr_value(e, b"content")?
                && !content.is_empty()
            {
                *epub2_cover_id = Some(content);
            }
        }
        _ => {}
    }
    Ok(())
}

/// Rebase a parent-relative manifest href against the package document's
/// folder. Leading `../` segments are consumed; the remaining folders are
/// prepended only when strictly fewer `../` than folders were given,
/// otherwise the stripped href is kept as-is (best-effort).
fn rebase_href(href: &str, opf_path: &str) -> String {
    if !href.starts_with("../") {
        return href.to_string();
    }

    let mut rest = href;
    let mut ups = 0;
    while let Some(stripped) = rest.strip_prefix("../") {
        ups += 1;
        rest = stripped;
    }

    let folders: Vec<&str> = match opf_path.rfind('/') {
        Some(i) => opf_path[..i].split('/').collect(),
        None => Vec::new(),
    };

    if ups < folders.len() {
        let keep = &folders[..folders.len() - ups];
        format!("{}/{}", keep.join("/"), rest)
    } else {
        rest.to_string()
    }
}

fn attr_value(e: &BytesStart, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == key {
            return Ok(Some(String::from_utf8(attr.value.to_vec())?));
        }
    }
    Ok(None)
}

/// Local name of a Dublin-Core element (`dc:creator` -> `creator`).
fn dc_field(name: &[u8]) -> Option<String> {
    name.strip_prefix(b"dc:")
        .map(|local| String::from_utf8_lossy(local).to_string())
}

/// Extract local name from a namespaced XML name (`opf:meta` -> `meta`).
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

/// Resolve XML entity references (named and numeric).
fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        _ => {}
    }

    if let Some(hex) = entity.strip_prefix("#x") {
        if let Ok(code) = u32::from_str_radix(hex, 16)
            && let Some(c) = char::from_u32(code)
        {
            return Some(c.to_string());
        }
    } else if let Some(dec) = entity.strip_prefix('#')
        && let Ok(code) = dec.parse::<u32>()
        && let Some(c) = char::from_u32(code)
    {
        return Some(c.to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const MINIMAL_OPF: &str = r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Short Works</dc:title>
    <dc:creator>Author One</dc:creator>
    <dc:creator>Author Two</dc:creator>
    <dc:creator>Author Three</dc:creator>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>
    <item id="ch1" href="text/ch1.xhtml" media-type="application/xhtml+xml"/>
    <item id="ch2" href="text/ch2.xhtml" media-type="application/xhtml+xml"/>
    <item id="css" href="css/core.css" media-type="text/css"/>
    <item id="cover" href="../Images/cover.png" media-type="image/png"/>
  </manifest>
  <spine>
    <itemref idref="ch2"/>
    <itemref idref="ch1"/>
  </spine>
  <guide>
    <reference type="text" href="text/ch1.xhtml" title="Beginning"/>
    <reference type="cover" href="text/cover.xhtml"/>
  </guide>
</package>"#;

    #[test]
    fn test_metadata_repeats_accumulate_in_order() {
        let pkg = parse_package(MINIMAL_OPF, "OEBPS/content.opf").unwrap();

        assert_eq!(pkg.metadata.title(), Some("Short Works"));
        assert_eq!(
            pkg.metadata.authors(),
            &["Author One", "Author Two", "Author Three"]
        );
        assert_eq!(pkg.metadata.language(), Some("en"));
        assert_eq!(pkg.metadata.publisher(), None);
    }

    #[test]
    fn test_spine_preserves_document_order() {
        let pkg = parse_package(MINIMAL_OPF, "OEBPS/content.opf").unwrap();

        let idrefs: Vec<&str> = pkg.spine.iter().map(|s| s.idref.as_str()).collect();
        assert_eq!(idrefs, ["ch2", "ch1"]);
        assert_eq!(pkg.spine[0].href.as_deref(), Some("text/ch2.xhtml"));
        assert_eq!(pkg.spine[1].href.as_deref(), Some("text/ch1.xhtml"));
    }

    #[test]
    fn test_unresolved_idref_keeps_slot() {
        let opf = r#"<package>
  <metadata><dc:title>T</dc:title></metadata>
  <manifest><item id="ch1" href="ch1.xhtml"/></manifest>
  <spine><itemref idref="ch1"/><itemref idref="ghost"/></spine>
</package>"#;

        let pkg = parse_package(opf, "content.opf").unwrap();
        assert_eq!(pkg.spine.len(), 2);
        assert_eq!(pkg.spine[1].idref, "ghost");
        assert_eq!(pkg.spine[1].href, None);
    }

    #[test]
    fn test_guide_extraction() {
        let pkg = parse_package(MINIMAL_OPF, "OEBPS/content.opf").unwrap();

        assert_eq!(pkg.guide.len(), 2);
        assert_eq!(pkg.guide[0].href, "text/ch1.xhtml");
        assert_eq!(pkg.guide[0].title.as_deref(), Some("Beginning"));
        assert_eq!(pkg.guide[1].title, None);
    }

    #[test]
    fn test_missing_guide_is_not_an_error() {
        let opf = r#"<package>
  <metadata><dc:title>T</dc:title></metadata>
  <manifest><item id="a" href="a.xhtml"/></manifest>
  <spine><itemref idref="a"/></spine>
</package>"#;

        let pkg = parse_package(opf, "content.opf").unwrap();
        assert!(pkg.guide.is_empty());
    }

    #[test]
    fn test_missing_required_sections() {
        let no_spine = r#"<package>
  <metadata><dc:title>T</dc:title></metadata>
  <manifest><item id="a" href="a.xhtml"/></manifest>
</package>"#;
        assert!(matches!(
            parse_package(no_spine, "content.opf"),
            Err(Error::MalformedPackage(_))
        ));

        let no_metadata = r#"<package>
  <manifest><item id="a" href="a.xhtml"/></manifest>
  <spine><itemref idref="a"/></spine>
</package>"#;
        assert!(matches!(
            parse_package(no_metadata, "content.opf"),
            Err(Error::MalformedPackage(_))
        ));
    }

    #[test]
    fn test_rebase_href() {
        // One level up from OEBPS/ lands at the archive root
        assert_eq!(
            rebase_href("../Images/cover.png", "OEBPS/content.opf"),
            "Images/cover.png"
        );
        // Partial climb keeps the remaining folders
        assert_eq!(
            rebase_href("../shared/style.css", "book/text/content.opf"),
            "book/shared/style.css"
        );
        // More ups than folders: stripped href kept as-is
        assert_eq!(
            rebase_href("../../x.xhtml", "OEBPS/content.opf"),
            "x.xhtml"
        );
        // Root-level package document has no folders to climb
        assert_eq!(rebase_href("../x.xhtml", "content.opf"), "x.xhtml");
        // Plain hrefs pass through untouched
        assert_eq!(rebase_href("text/ch1.xhtml", "OEBPS/content.opf"), "text/ch1.xhtml");
    }

    #[test]
    fn test_manifest_rebased_in_document() {
        let pkg = parse_package(MINIMAL_OPF, "OEBPS/content.opf").unwrap();
        assert_eq!(pkg.manifest["cover"], "Images/cover.png");
    }

    #[test]
    fn test_cover_epub3_property() {
        let opf = r#"<package>
  <metadata><dc:title>T</dc:title></metadata>
  <manifest>
    <item id="img" href="images/cover.jpg" properties="cover-image"/>
    <item id="a" href="a.xhtml"/>
  </manifest>
  <spine><itemref idref="a"/></spine>
</package>"#;

        let pkg = parse_package(opf, "content.opf").unwrap();
        assert_eq!(pkg.cover_image.as_deref(), Some("images/cover.jpg"));
    }

    #[test]
    fn test_cover_epub2_meta_fallback() {
        let opf = r#"<package>
  <metadata>
    <dc:title>T</dc:title>
    <meta name="cover" content="img"/>
  </metadata>
  <manifest>
    <item id="img" href="cover.png"/>
    <item id="a" href="a.xhtml"/>
  </manifest>
  <spine><itemref idref="a"/></spine>
</package>"#;

        let pkg = parse_package(opf, "content.opf").unwrap();
        assert_eq!(pkg.cover_image.as_deref(), Some("cover.png"));
    }

    #[test]
    fn test_metadata_entities() {
        let opf = r#"<package>
  <metadata><dc:title>Don&apos;t Stop &#8212; Ever</dc:title></metadata>
  <manifest><item id="a" href="a.xhtml"/></manifest>
  <spine><itemref idref="a"/></spine>
</package>"#;

        let pkg = parse_package(opf, "content.opf").unwrap();
        assert_eq!(pkg.metadata.title(), Some("Don't Stop \u{2014} Ever"));
    }

    #[test]
    fn test_empty_dc_element_is_present_but_empty() {
        let opf = r#"<package>
  <metadata><dc:title>T</dc:title><dc:description/></metadata>
  <manifest><item id="a" href="a.xhtml"/></manifest>
  <spine><itemref idref="a"/></spine>
</package>"#;

        let pkg = parse_package(opf, "content.opf").unwrap();
        assert_eq!(pkg.metadata.description(), Some(""));
        assert_eq!(pkg.metadata.first("subject"), None);
    }

    #[test]
    fn test_resolve_entity() {
        assert_eq!(resolve_entity("amp"), Some("&".to_string()));
        assert_eq!(resolve_entity("#65"), Some("A".to_string()));
        assert_eq!(resolve_entity("#x2019"), Some("\u{2019}".to_string()));
        assert_eq!(resolve_entity("nbsp"), None);
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"opf:meta"), b"meta");
        assert_eq!(local_name(b"spine"), b"spine");
    }

    proptest! {
        #[test]
        fn rebase_href_consumes_all_ups(ups in 0usize..6, depth in 0usize..6) {
            let href = format!("{}x.xhtml", "../".repeat(ups));
            let opf = (0..depth)
                .map(|i| format!("d{i}"))
                .chain(std::iter::once("content.opf".to_string()))
                .collect::<Vec<_>>()
                .join("/");

            let out = rebase_href(&href, &opf);
            prop_assert!(!out.starts_with("../"));
            prop_assert!(out.ends_with("x.xhtml"));
        }
    }
}
