//! HTML tree capability.
//!
//! A thin layer over `scraper` exposing the three operations the pipeline
//! needs: parse text into a document, find elements by tag name, and read an
//! element's text. Parsing is browser-lenient and accepts arbitrary input.

use scraper::{ElementRef, Html, Selector};

/// Parse markup into a document tree.
pub fn parse_document(text: &str) -> Html {
    Html::parse_document(text)
}

/// All elements with the given tag name, in document order. An invalid tag
/// name yields no elements.
pub fn find_by_tag<'a>(document: &'a Html, tag: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(tag) {
        Ok(selector) => document.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// All descendant elements of `element` with the given tag name.
pub fn find_in<'a>(element: ElementRef<'a>, tag: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(tag) {
        Ok(selector) => element.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Whitespace-normalized text of an element's subtree: runs of whitespace
/// collapse to single spaces, leading/trailing whitespace is dropped.
pub fn text_content(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for piece in element.text() {
        for word in piece.split_whitespace() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<html>
  <head><title>  The   Title </title></head>
  <body>
    <h2>First</h2>
    <p>Some <em>mixed</em>
       content.</p>
    <h2>Second</h2>
  </body>
</html>"#;

    #[test]
    fn test_find_by_tag_order() {
        let doc = parse_document(SAMPLE);
        let headings = find_by_tag(&doc, "h2");
        assert_eq!(headings.len(), 2);
        assert_eq!(text_content(headings[0]), "First");
        assert_eq!(text_content(headings[1]), "Second");
    }

    #[test]
    fn test_find_in_scopes_to_element() {
        let doc = parse_document(SAMPLE);
        let head = find_by_tag(&doc, "head")[0];
        let titles = find_in(head, "title");
        assert_eq!(titles.len(), 1);
        assert_eq!(text_content(titles[0]), "The Title");
    }

    #[test]
    fn test_text_content_normalizes_whitespace() {
        let doc = parse_document(SAMPLE);
        let body = find_by_tag(&doc, "body")[0];
        assert_eq!(text_content(body), "First Some mixed content. Second");
    }

    #[test]
    fn test_invalid_tag_yields_nothing() {
        let doc = parse_document(SAMPLE);
        assert!(find_by_tag(&doc, "not a tag!").is_empty());
    }
}
