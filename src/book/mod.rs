//! Extracted-book data model.

use std::collections::{BTreeMap, HashMap};

use scraper::Html;

use crate::error::Warning;

/// The values recorded for one metadata key, in document order.
///
/// Dublin-Core fields may legally repeat (several `<dc:creator>` elements,
/// for instance), so every key holds an explicit ordered sequence of one or
/// more strings. Repeats accumulate; nothing is silently overwritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaValue(Vec<String>);

impl MetaValue {
    fn new(value: String) -> Self {
        MetaValue(vec![value])
    }

    fn push(&mut self, value: String) {
        self.0.push(value);
    }

    /// The first recorded value.
    pub fn first(&self) -> &str {
        &self.0[0]
    }

    /// All recorded values, in document order.
    pub fn all(&self) -> &[String] {
        &self.0
    }

    /// True when the key appeared more than once.
    pub fn is_repeated(&self) -> bool {
        self.0.len() > 1
    }
}

/// Dublin-Core metadata from the package document, keyed by element local
/// name (`creator`, `title`, `language`, ...).
///
/// A key that never appeared is absent from the map; callers can therefore
/// distinguish "not present" from "present but empty".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageMetadata {
    fields: BTreeMap<String, MetaValue>,
}

impl PackageMetadata {
    /// Record a value for `key`, accumulating if the key already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        self.fields
            .entry(key.into())
            .and_modify(|existing| existing.push(value.clone()))
            .or_insert_with(|| MetaValue::new(value));
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.fields.get(key)
    }

    /// First value for `key`, or None when the key never appeared.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(MetaValue::first)
    }

    /// All values for `key`, empty when the key never appeared.
    pub fn all(&self, key: &str) -> &[String] {
        self.fields.get(key).map(MetaValue::all).unwrap_or(&[])
    }

    pub fn title(&self) -> Option<&str> {
        self.first("title")
    }

    pub fn authors(&self) -> &[String] {
        self.all("creator")
    }

    pub fn language(&self) -> Option<&str> {
        self.first("language")
    }

    pub fn publisher(&self) -> Option<&str> {
        self.first("publisher")
    }

    pub fn description(&self) -> Option<&str> {
        self.first("description")
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetaValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// A guide entry: a named pointer into the content (e.g. "cover", "toc").
/// Used only to backfill chapter display names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideReference {
    pub href: String,
    pub title: Option<String>,
}

/// One content document, in spine order.
#[derive(Debug, Clone)]
pub struct Chapter {
    /// Display title, if one could be derived (or backfilled from the
    /// guide). None when the document carries no usable title.
    pub name: Option<String>,

    /// Archive entry name this chapter was loaded from.
    pub path: String,

    /// Parsed tree handle. None when the entry could not be loaded.
    pub document: Option<Html>,

    /// Whitespace-normalized text of the `<body>` element. None when the
    /// markup produced no body or the entry could not be loaded.
    pub body_text: Option<String>,
}

impl Chapter {
    /// A chapter slot whose bytes could not be loaded: path retained,
    /// everything else empty.
    pub fn degraded(path: impl Into<String>) -> Self {
        Chapter {
            name: None,
            path: path.into(),
            document: None,
            body_text: None,
        }
    }
}

/// The extracted book: chapters in reading order plus supporting resources
/// and metadata. Owns all nested data exclusively.
#[derive(Debug, Clone, Default)]
pub struct BookContent {
    /// Chapters in spine order. Slots whose reference never resolved are
    /// dropped (and reported in `warnings`).
    pub chapters: Vec<Chapter>,

    /// Stylesheet entry name -> verbatim text.
    pub stylesheets: HashMap<String, String>,

    /// Image entry name -> raw payload bytes.
    pub images: HashMap<String, Vec<u8>>,

    pub metadata: PackageMetadata,

    /// Manifest href of the cover image, when the package declares one.
    pub cover_image: Option<String>,

    /// Non-fatal problems encountered while extracting.
    pub warnings: Vec<Warning>,
}

#[cfg(feature = "serde")]
mod serialize {
    use serde::ser::{Serialize, SerializeMap, SerializeStruct, Serializer};

    use super::{BookContent, Chapter, MetaValue, PackageMetadata};

    impl Serialize for MetaValue {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self.all() {
                [single] => serializer.serialize_str(single),
                many => many.serialize(serializer),
            }
        }
    }

    impl Serialize for PackageMetadata {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(None)?;
            for (key, value) in self.iter() {
                // Historical field names for the serialized artifact
                let key = match key {
                    "creator" => "author",
                    "title" => "name",
                    other => other,
                };
                map.serialize_entry(key, value)?;
            }
            map.end()
        }
    }

    impl Serialize for Chapter {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut state = serializer.serialize_struct("Chapter", 3)?;
            state.serialize_field("name", &self.name)?;
            state.serialize_field("filename", &self.path)?;
            state.serialize_field("bodyText", &self.body_text)?;
            state.end()
        }
    }

    impl Serialize for BookContent {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut state = serializer.serialize_struct("BookContent", 4)?;
            state.serialize_field("chapters", &self.chapters)?;
            state.serialize_field("stylesheets", &self.stylesheets)?;
            state.serialize_field("images", &self.images)?;
            state.serialize_field("metadata", &self.metadata)?;
            state.end()
        }
    }
}
