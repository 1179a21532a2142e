//! Streaming parser for the repository listing document.
//!
//! ```xml
//! <osmand_regions mapversion="1">
//!   <region type="map" name="Andorra_europe.map.obf.zip" timestamp="1700000000000"
//!           containerSize="123" contentSize="456"/>
//! </osmand_regions>
//! ```
//!
//! Elements of unknown type are skipped. A recognized entry with bad
//! numeric attributes fails the whole document: a half-parsed listing is
//! never installed into the catalog.

use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, trace};

use crate::container::xml::{attributes, element_name, numeric_attr};
use crate::error::{ResourceError, ResourceResult};
use crate::resource::naming::id_from_repository_name;
use crate::resource::{ResourceInRepository, ResourceType};

/// Root element of the listing.
const ROOT_ELEMENT: &str = "osmand_regions";

/// Parse a listing document into repository entries.
///
/// `source_name` labels parse errors; `download_base_url` is prefixed to
/// entry names that do not carry an explicit `url` attribute.
pub fn parse_listing(
    bytes: &[u8],
    source_name: &str,
    download_base_url: &str,
) -> ResourceResult<Vec<ResourceInRepository>> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut seen_root = false;
    let mut entries = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            ResourceError::parse(
                source_name,
                format!("XML error at byte {}: {}", reader.buffer_position(), e),
            )
        })?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = element_name(e);

                if depth == 0 {
                    if seen_root || name != ROOT_ELEMENT {
                        return Err(ResourceError::parse(
                            source_name,
                            format!("expected root element <{}>, found <{}>", ROOT_ELEMENT, name),
                        ));
                    }
                    seen_root = true;
                } else {
                    let attrs = attributes(e)
                        .map_err(|reason| ResourceError::parse(source_name, reason))?;
                    if let Some(entry) = parse_entry(&attrs, download_base_url)
                        .map_err(|reason| ResourceError::parse(source_name, reason))?
                    {
                        trace!(id = %entry.id, timestamp = entry.timestamp, "Listing entry");
                        entries.push(entry);
                    }
                }

                if !is_empty {
                    depth += 1;
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(ResourceError::parse(
            source_name,
            format!("missing root element <{}>", ROOT_ELEMENT),
        ));
    }
    if depth != 0 {
        return Err(ResourceError::parse(source_name, "unexpected end of document"));
    }

    debug!(source = source_name, entries = entries.len(), "Parsed repository listing");
    Ok(entries)
}

/// Turn one element's attributes into an entry.
///
/// Returns `Ok(None)` for elements that are not resource entries.
fn parse_entry(
    attrs: &HashMap<String, String>,
    download_base_url: &str,
) -> Result<Option<ResourceInRepository>, String> {
    let (Some(code), Some(name)) = (attrs.get("type"), attrs.get("name")) else {
        return Ok(None);
    };
    let Some(resource_type) = ResourceType::from_repository_code(code) else {
        trace!(code = %code, name = %name, "Skipping unsupported listing type");
        return Ok(None);
    };
    let Some(id) = id_from_repository_name(name, resource_type) else {
        trace!(name = %name, "Skipping listing entry with unrecognized name");
        return Ok(None);
    };

    let timestamp = numeric_attr::<u64>(attrs, "timestamp")?
        .ok_or_else(|| format!("entry '{}' has no timestamp", name))?;
    let size = numeric_attr::<u64>(attrs, "containerSize")?
        .ok_or_else(|| format!("entry '{}' has no containerSize", name))?;
    let content_size = numeric_attr::<u64>(attrs, "contentSize")?.unwrap_or(size);

    let download_url = match attrs.get("url") {
        Some(url) if !url.is_empty() => url.clone(),
        _ => format!("{}{}", download_base_url, name),
    };

    Ok(Some(ResourceInRepository {
        id,
        resource_type,
        name: name.clone(),
        size,
        content_size,
        timestamp,
        download_url,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://repo.example/download?file=";

    fn parse(xml: &str) -> ResourceResult<Vec<ResourceInRepository>> {
        parse_listing(xml.as_bytes(), "listing", BASE)
    }

    #[test]
    fn test_parse_listing_entries() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<osmand_regions mapversion="1">
  <region type="map" name="Andorra_europe.map.obf.zip" timestamp="1700000000000"
          containerSize="123" contentSize="456" description="Andorra"/>
  <region type="voice" name="en.voice.zip" timestamp="5" containerSize="10"/>
</osmand_regions>"#;
        let entries = parse(xml).unwrap();
        assert_eq!(entries.len(), 2);

        let map = &entries[0];
        assert_eq!(map.id, "andorra_europe");
        assert_eq!(map.resource_type, ResourceType::MapRegion);
        assert_eq!(map.size, 123);
        assert_eq!(map.content_size, 456);
        assert_eq!(map.timestamp, 1_700_000_000_000);
        assert_eq!(
            map.download_url,
            "https://repo.example/download?file=Andorra_europe.map.obf.zip"
        );

        let voice = &entries[1];
        assert_eq!(voice.id, "en");
        assert_eq!(voice.resource_type, ResourceType::VoicePack);
        assert_eq!(voice.content_size, 10);
    }

    #[test]
    fn test_parse_listing_skips_unknown_types() {
        let xml = r#"<osmand_regions>
  <region type="srtm_map" name="Andorra.srtm.obf.zip" timestamp="1" containerSize="1"/>
  <region type="map" name="readme.txt" timestamp="1" containerSize="1"/>
  <other/>
  <region type="map" name="r1.map.obf" timestamp="bad" containerSize="1" url=""/>
</osmand_regions>"#;
        // The last entry is recognized and malformed: whole document fails.
        assert!(matches!(
            parse(xml),
            Err(ResourceError::ParseFailed { .. })
        ));

        let xml = r#"<osmand_regions>
  <region type="srtm_map" name="Andorra.srtm.obf.zip" timestamp="1" containerSize="1"/>
  <region type="map" name="readme.txt" timestamp="1" containerSize="1"/>
  <other/>
</osmand_regions>"#;
        assert!(parse(xml).unwrap().is_empty());
    }

    #[test]
    fn test_parse_listing_explicit_url() {
        let xml = r#"<osmand_regions>
  <region type="map" name="r1.map.obf" timestamp="2" containerSize="8" url="http://mirror/r1"/>
</osmand_regions>"#;
        let entries = parse(xml).unwrap();
        assert_eq!(entries[0].download_url, "http://mirror/r1");
        assert_eq!(entries[0].id, "r1");
    }

    #[test]
    fn test_parse_listing_missing_size_fails() {
        let xml = r#"<osmand_regions>
  <region type="map" name="r1.map.obf" timestamp="2"/>
</osmand_regions>"#;
        assert!(matches!(parse(xml), Err(ResourceError::ParseFailed { .. })));
    }

    #[test]
    fn test_parse_listing_wrong_root_fails() {
        assert!(parse("<regions/>").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn test_parse_listing_truncated_fails() {
        let xml = r#"<osmand_regions>
  <region type="map" name="r1.map.obf" timestamp="2" containerSize="8"/>"#;
        assert!(parse(xml).is_err());
    }

    #[test]
    fn test_parse_listing_empty_root() {
        assert!(parse("<osmand_regions/>").unwrap().is_empty());
    }
}
