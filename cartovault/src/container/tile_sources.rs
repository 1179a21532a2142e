//! Online tile-sources document parsing.
//!
//! ```xml
//! <tile_sources>
//!   <tile_source name="Mapnik" url_template="https://tile.openstreetmap.org/{0}/{1}/{2}.png"
//!                min_zoom="0" max_zoom="19" tile_size="256" ext=".png"/>
//! </tile_sources>
//! ```

use quick_xml::events::Event;
use quick_xml::Reader;

use super::xml::{attributes, element_name, numeric_attr};
use crate::resource::{OnlineTileSourcesMetadata, TileSource};

const ROOT_ELEMENT: &str = "tile_sources";
const SOURCE_ELEMENT: &str = "tile_source";

const DEFAULT_MIN_ZOOM: u8 = 1;
const DEFAULT_MAX_ZOOM: u8 = 17;
const DEFAULT_TILE_SIZE: u32 = 256;
const DEFAULT_EXT: &str = ".png";

/// Parse a tile-sources document.
///
/// Unknown elements are ignored. A document without sources, or with a
/// source lacking `name` or `url_template`, is rejected.
pub fn parse_tile_sources(xml: &str) -> Result<OnlineTileSourcesMetadata, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut saw_root = false;
    let mut sources: Vec<TileSource> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = element_name(&e);
                if !saw_root {
                    if name != ROOT_ELEMENT {
                        return Err(format!(
                            "expected <{}> root element, found <{}>",
                            ROOT_ELEMENT, name
                        ));
                    }
                    saw_root = true;
                    continue;
                }
                if name == SOURCE_ELEMENT {
                    let source = parse_source(&attributes(&e)?)?;
                    if sources.iter().any(|s| s.name == source.name) {
                        tracing::warn!(name = %source.name, "Duplicate tile source ignored");
                        continue;
                    }
                    sources.push(source);
                }
            }
            Ok(Event::Eof) => break,
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

    if !saw_root {
        return Err("document has no root element".to_string());
    }
    if sources.is_empty() {
        return Err("document declares no tile sources".to_string());
    }
    Ok(OnlineTileSourcesMetadata { sources })
}

fn parse_source(attrs: &std::collections::HashMap<String, String>) -> Result<TileSource, String> {
    let required = |key: &str| {
        attrs
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| format!("tile source is missing '{}'", key))
    };

    let name = required("name")?;
    let url_template = required("url_template")?;
    let min_zoom = numeric_attr(attrs, "min_zoom")?.unwrap_or(DEFAULT_MIN_ZOOM);
    let max_zoom = numeric_attr(attrs, "max_zoom")?.unwrap_or(DEFAULT_MAX_ZOOM);
    if min_zoom > max_zoom {
        return Err(format!(
            "tile source '{}' has min_zoom {} above max_zoom {}",
            name, min_zoom, max_zoom
        ));
    }

    Ok(TileSource {
        name,
        url_template,
        min_zoom,
        max_zoom,
        tile_size: numeric_attr(attrs, "tile_size")?.unwrap_or(DEFAULT_TILE_SIZE),
        ext: attrs
            .get("ext")
            .cloned()
            .unwrap_or_else(|| DEFAULT_EXT.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sources() {
        let xml = r#"<tile_sources>
            <tile_source name="Mapnik" url_template="https://a/{0}/{1}/{2}.png" min_zoom="0" max_zoom="19"/>
            <tile_source name="Cycle" url_template="https://b/{0}/{1}/{2}.jpg" ext=".jpg" tile_size="512"/>
            <unknown foo="bar"/>
        </tile_sources>"#;
        let parsed = parse_tile_sources(xml).unwrap();
        assert_eq!(parsed.sources.len(), 2);

        let mapnik = parsed.source("Mapnik").unwrap();
        assert_eq!(mapnik.min_zoom, 0);
        assert_eq!(mapnik.max_zoom, 19);
        assert_eq!(mapnik.ext, ".png");

        let cycle = parsed.source("Cycle").unwrap();
        assert_eq!(cycle.tile_size, 512);
        assert_eq!(cycle.min_zoom, DEFAULT_MIN_ZOOM);
        assert_eq!(cycle.ext, ".jpg");
    }

    #[test]
    fn test_missing_url_template_fails() {
        let xml = r#"<tile_sources><tile_source name="x"/></tile_sources>"#;
        assert!(parse_tile_sources(xml).unwrap_err().contains("url_template"));
    }

    #[test]
    fn test_no_sources_fails() {
        assert!(parse_tile_sources("<tile_sources/>").is_err());
    }

    #[test]
    fn test_wrong_root_fails() {
        assert!(parse_tile_sources("<renderingStyle/>").is_err());
    }

    #[test]
    fn test_inverted_zoom_range_fails() {
        let xml = r#"<tile_sources><tile_source name="x" url_template="u" min_zoom="10" max_zoom="2"/></tile_sources>"#;
        assert!(parse_tile_sources(xml).is_err());
    }

    #[test]
    fn test_duplicate_names_keep_first() {
        let xml = r#"<tile_sources>
            <tile_source name="x" url_template="first"/>
            <tile_source name="x" url_template="second"/>
        </tile_sources>"#;
        let parsed = parse_tile_sources(xml).unwrap();
        assert_eq!(parsed.sources.len(), 1);
        assert_eq!(parsed.sources[0].url_template, "first");
    }
}
