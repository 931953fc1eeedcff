pub mod extract;
pub mod filter;

use serde_json::Value;

/// The `page` element of a raw feed response.
pub fn page(raw: &Value) -> Option<&Value> {
    raw.get("item")?.get("page")
}

/// Page type of a raw feed response, empty when absent.
pub fn page_type(raw: &Value) -> &str {
    page(raw)
        .and_then(|p| p.get("pagetype"))
        .and_then(Value::as_str)
        .unwrap_or("")
}

/// Top-level content clusters of a raw feed response.
pub fn clusters(raw: &Value) -> Option<&Value> {
    page(raw)?.get("cluster")
}
