/// Current UTC timestamp in milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a fresh resource ID.
///
/// UUID v4 rendered as a string. Used by both the bill manager and the
/// receipt ledger so every stored record shares one ID scheme.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
