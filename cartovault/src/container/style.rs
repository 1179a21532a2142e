//! Map-style document descriptor parsing.

use quick_xml::events::Event;
use quick_xml::Reader;

use super::xml::{attributes, element_name};
use crate::resource::MapStyleMetadata;

const ROOT_ELEMENT: &str = "renderingStyle";

/// Read the style descriptor from the root element of a style document.
///
/// Only the root is inspected; rule interpretation is not done here.
/// `fallback_name` is used when the root carries no `name` attribute.
pub fn parse_map_style(xml: &str, fallback_name: &str) -> Result<MapStyleMetadata, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = element_name(&e);
                if name != ROOT_ELEMENT {
                    return Err(format!(
                        "expected <{}> root element, found <{}>",
                        ROOT_ELEMENT, name
                    ));
                }
                let attrs = attributes(&e)?;
                let non_empty = |key: &str| {
                    attrs
                        .get(key)
                        .map(|v| v.trim().to_string())
                        .filter(|v| !v.is_empty())
                };
                return Ok(MapStyleMetadata {
                    name: non_empty("name").unwrap_or_else(|| fallback_name.to_string()),
                    title: non_empty("title"),
                    depends: non_empty("depends"),
                });
            }
            Ok(Event::Eof) => return Err("document has no root element".to_string()),
            Ok(_) => {}
            Err(e) => {
                return Err(format!(
                    "XML error at position {}: {}",
                    reader.error_position(),
                    e
                ))
            }
        }
    }
}
