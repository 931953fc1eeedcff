//! Extractors turning filtered marker payloads into output records.
//!
//! Shared plumbing for the field shapes all page types have in common:
//! `Src` locations, rendition paths, compact dates and image galleries.

pub mod news;
pub mod office;
pub mod project;
pub mod timeline;

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::warn;

use super::filter::one_or_many;
use crate::hashing::content_id;
use crate::models::{Image, ImageSource};

pub const IPROX_DOMAIN: &str = "https://www.amsterdam.nl";

/// `Nam` discriminator of a field, empty when absent.
pub(crate) fn name_of(field: &Value) -> &str {
    field.get("Nam").and_then(Value::as_str).unwrap_or("")
}

pub(crate) fn str_field<'a>(field: &'a Value, key: &str) -> Option<&'a str> {
    field.get(key).and_then(Value::as_str)
}

/// Integers arrive as JSON numbers or as digit strings, depending on the
/// field. Accept both.
pub(crate) fn int_field(field: &Value, key: &str) -> Option<i64> {
    match field.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A `Src` is either `{"_": "/path"}` or a bare path string.
pub(crate) fn src_location(field: &Value) -> Option<&str> {
    match field.get("Src")? {
        Value::String(s) => Some(s),
        Value::Object(map) => map.get("_").and_then(Value::as_str),
        _ => None,
    }
}

/// Rendition size label: the path segment right before the filename,
/// e.g. "220px" in `/publish/pages/000000/220px/mock.jpg`.
pub(crate) fn rendition_size(location: &str) -> Option<&str> {
    let mut segments = location.rsplit('/');
    segments.next()?;
    segments.next().filter(|s| !s.is_empty())
}

/// Compact feed date "20210504" to "2021-05-04".
pub(crate) fn iso_date(digits: &str) -> Option<String> {
    if digits.len() < 8 || !digits.is_ascii() {
        return None;
    }
    Some(format!(
        "{}-{}-{}",
        &digits[0..4],
        &digits[4..6],
        &digits[6..8]
    ))
}

/// Build an image gallery from an `Afbeelding`-like node: renditions come
/// from the `asset` list, the original falls back to the node's own `Src`.
/// With `promote_largest`, a fallback original without a filename is
/// replaced by the largest numbered rendition.
pub(crate) fn gallery(node: &Value, kind: &str, promote_largest: bool) -> Image {
    let mut sources = BTreeMap::new();

    let location = src_location(node).unwrap_or("");
    let url = format!("{IPROX_DOMAIN}{location}");
    sources.insert(
        "orig".to_string(),
        ImageSource {
            image_id: content_id(&url),
            url,
            filename: str_field(node, "FilNam").unwrap_or("").to_string(),
            description: String::new(),
        },
    );

    let mut largest = 0u32;
    if let Some(assets) = node.get("asset") {
        for asset in one_or_many(assets) {
            let Some(location) = src_location(asset) else {
                warn!("image rendition without source location, skipped");
                continue;
            };
            let Some(size) = rendition_size(location) else {
                warn!(location, "image rendition with unusable path, skipped");
                continue;
            };
            let url = format!("{IPROX_DOMAIN}{location}");
            sources.insert(
                size.to_string(),
                ImageSource {
                    image_id: content_id(&url),
                    url,
                    filename: str_field(asset, "FilNam").unwrap_or("").to_string(),
                    description: String::new(),
                },
            );
            if let Some(px) = size.strip_suffix("px").and_then(|p| p.parse().ok()) {
                largest = largest.max(px);
            }
        }
    }

    if promote_largest && largest > 0 {
        let missing_filename = sources
            .get("orig")
            .is_some_and(|source| source.filename.is_empty());
        if missing_filename {
            if let Some(best) = sources.get(&format!("{largest}px")).cloned() {
                sources.insert("orig".to_string(), best);
            }
        }
    }

    Image {
        kind: kind.to_string(),
        sources,
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn src_location_accepts_both_shapes() {
        assert_eq!(
            src_location(&json!({"Src": {"_": "/a/b.jpg"}})),
            Some("/a/b.jpg")
        );
        assert_eq!(src_location(&json!({"Src": "/a/b.jpg"})), Some("/a/b.jpg"));
        assert_eq!(src_location(&json!({"Src": {"_": null}})), None);
        assert_eq!(src_location(&json!({})), None);
    }

    #[test]
    fn rendition_size_from_path() {
        assert_eq!(
            rendition_size("/publish/pages/000000/220px/mock.jpg"),
            Some("220px")
        );
        assert_eq!(rendition_size("/1/2/3/1px/text.jpg"), Some("1px"));
        assert_eq!(rendition_size("solo.jpg"), None);
    }

    #[test]
    fn iso_date_slices_compact_dates() {
        assert_eq!(iso_date("20210504").as_deref(), Some("2021-05-04"));
        assert_eq!(iso_date("2021"), None);
        assert_eq!(iso_date(""), None);
    }

    #[test]
    fn gallery_promotes_largest_when_orig_has_no_filename() {
        let node = json!({
            "Nam": "Afbeelding",
            "asset": [
                {"FilNam": "mock.jpg", "Src": {"_": "/publish/pages/000000/80px/mock.jpg"}},
                {"FilNam": "mock.jpg", "Src": {"_": "/publish/pages/000000/220px/mock.jpg"}},
                {"FilNam": "mock.jpg", "Src": {"_": "/publish/pages/000000/460px/mock.jpg"}}
            ]
        });

        let image = gallery(&node, "", true);
        let orig = &image.sources["orig"];
        let largest = &image.sources["460px"];
        assert_eq!(orig.url, largest.url);
        assert_eq!(orig.image_id, largest.image_id);
        assert_eq!(orig.filename, "mock.jpg");
    }

    #[test]
    fn gallery_keeps_own_orig_when_filename_present() {
        let node = json!({
            "Nam": "Afbeelding",
            "FilNam": "mock.jpg",
            "Src": {"_": "/publish/pages/000000/mock.jpg"},
            "asset": [
                {"FilNam": "mock.jpg", "Src": {"_": "/publish/pages/000000/700px/mock.jpg"}}
            ]
        });

        let image = gallery(&node, "", true);
        let orig = &image.sources["orig"];
        assert_eq!(
            orig.url,
            "https://www.amsterdam.nl/publish/pages/000000/mock.jpg"
        );
        assert_eq!(orig.image_id, "e51353040e4c049559c975ce6a650947");
    }

    #[test]
    fn gallery_skips_broken_renditions() {
        let node = json!({
            "Nam": "Afbeelding",
            "FilNam": "test_orig.jpg",
            "Src": {"_": "/1/2/3/test_orig.jpg"},
            "asset": [
                {"FilNam": "test.jpg", "Src": {"_": "/1/2/3/1px/text.jpg"}},
                {"FilNam": null, "Src": {"_": null}}
            ]
        });

        let image = gallery(&node, "", false);
        assert_eq!(image.sources.len(), 2);
        assert!(image.sources.contains_key("orig"));
        assert!(image.sources.contains_key("1px"));
    }
}
