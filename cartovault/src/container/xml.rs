//! Small helpers over quick-xml shared by the document parsers.

use std::collections::HashMap;

use quick_xml::events::BytesStart;

/// Collect the attributes of an element into a name → unescaped value map.
pub(crate) fn attributes(element: &BytesStart<'_>) -> Result<HashMap<String, String>, String> {
    let mut out = HashMap::new();
    for attr in element.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| e.to_string())?;
        out.insert(key, value.into_owned());
    }
    Ok(out)
}

/// Element name as an owned string.
pub(crate) fn element_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.name().as_ref()).into_owned()
}

/// Parse an optional numeric attribute, failing on garbage.
pub(crate) fn numeric_attr<T: std::str::FromStr>(
    attrs: &HashMap<String, String>,
    key: &str,
) -> Result<Option<T>, String> {
    match attrs.get(key) {
        None => Ok(None),
        Some(v) => v
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| format!("attribute '{}' is not a number: '{}'", key, v)),
    }
}
