//! Content-addressed identifiers.
//!
//! Every downloadable resource (image rendition, file asset, office page)
//! is keyed by the MD5 hex digest of its absolute URL. The backend uses the
//! same digest as its dedup key, so the mapping has to stay stable.

/// Lowercase MD5 hex digest of `content`.
pub fn content_id(content: &str) -> String {
    format!("{:x}", md5::compute(content.as_bytes()))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digest() {
        assert_eq!(content_id("mock"), "17404a596cbd0d1e6c7d23fcd845ab82");
    }

    #[test]
    fn url_digest_is_stable() {
        assert_eq!(
            content_id("https://sub-page/"),
            "acddc71dab316d120cc5d84b5565c874"
        );
    }

    #[test]
    fn distinct_inputs_distinct_ids() {
        assert_ne!(content_id("a"), content_id("b"));
    }
}
