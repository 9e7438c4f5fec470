//! EPUB extraction pipeline: container locator, package parser, content
//! loader, assembler.

mod assemble;
mod container;
mod content;
mod package;
mod reader;

pub use container::{CONTAINER_PATH, ContainerInfo, parse_container};
pub use content::{ContentConfig, EntryKind};
pub use package::{PackageDocument, SpineRef, parse_package};
pub use reader::{extract, read_epub, read_epub_from_reader};
