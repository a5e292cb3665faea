//! Identifier header lookup.

use crate::processing::event::HeaderSet;

/// Header that triggers aggregation unless configured otherwise.
pub const DEFAULT_IDENTIFIER_HEADER: &str = "userid";

/// Return the value of the first `key` header, ignoring ASCII case.
///
/// Only the first match is considered; an empty value there means no
/// identifier. Invalid UTF-8 is replaced lossily.
pub fn extract_identifier(headers: &HeaderSet, key: &str) -> Option<String> {
    headers
        .iter()
        .find(|h| h.key.eq_ignore_ascii_case(key))
        .filter(|h| !h.raw_value.is_empty())
        .map(|h| String::from_utf8_lossy(&h.raw_value).into_owned())
}
