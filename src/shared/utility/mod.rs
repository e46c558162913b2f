use axum::http::HeaderMap;

/// Value of a header as a string, or empty when absent or not visible ASCII.
pub fn header_value(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
        .unwrap_or_default()
}

/// Fresh custom id for an interactive element, unique across restarts.
pub fn new_custom_id(prefix: &str) -> String {
    format!("{}:{}", prefix, uuid::Uuid::now_v7().simple())
}
