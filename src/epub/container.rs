//! Container descriptor parsing (`META-INF/container.xml`).

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{Error, Result};
use crate::util::strip_bom;

/// Archive path of the container descriptor every EPUB must carry.
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Location of the package document, as declared by the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Declared archive path of the package document.
    pub opf_path: String,

    /// First folder segment of `opf_path`, empty when the package document
    /// sits at the archive root. Used at assembly as a fallback prefix for
    /// manifest hrefs that match no actual entry name.
    pub root_prefix: String,
}

/// Parse container bytes and locate the package document.
///
/// The first `rootfile` element whose `full-path` ends in `.opf` wins.
pub fn parse_container(bytes: &[u8]) -> Result<ContainerInfo> {
    let content = String::from_utf8(strip_bom(bytes).to_vec())?;

    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"rootfile" => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"full-path" {
                        let path = String::from_utf8(attr.value.to_vec())?;
                        if is_package_document(&path) {
                            let root_prefix = first_segment(&path).to_string();
                            return Ok(ContainerInfo {
                                opf_path: path,
                                root_prefix,
                            });
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Err(Error::MalformedContainer(
        "no rootfile with a .opf full-path".into(),
    ))
}

/// True when `name` carries the package-document extension.
pub fn is_package_document(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".opf")
}

fn first_segment(path: &str) -> &str {
    match path.find('/') {
        Some(i) => &path[..i],
        None => "",
    }
}
