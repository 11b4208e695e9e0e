//! Derives the per-caller cache partition key from a bearer credential.
//!
//! The credential is treated as opaque `header.payload.signature` text.
//! Nothing here decodes or verifies anything: the key only partitions cache
//! entries per caller and must never stand in for an authenticated identity.

/// Sentinel principal used when no usable credential is present.
pub const UNKNOWN_PRINCIPAL: &str = "unknown";

/// Characters of the payload segment kept in the principal key.
const PRINCIPAL_LEN: usize = 10;

/// Derives the principal key from the raw value of an `Authorization` header.
///
/// Strips the literal `Bearer ` scheme prefix when present, splits the
/// remainder on `.` and keeps the first [`PRINCIPAL_LEN`] characters of the
/// second segment. A missing header or a token with fewer than two segments
/// yields [`UNKNOWN_PRINCIPAL`]. Never fails, whatever the input looks like.
pub fn principal_key(authorization: Option<&str>) -> String {
    let Some(raw) = authorization else {
        return UNKNOWN_PRINCIPAL.to_string();
    };
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw);
    match token.split('.').nth(1) {
        Some(payload) => payload.chars().take(PRINCIPAL_LEN).collect(),
        None => UNKNOWN_PRINCIPAL.to_string(),
    }
}

/// Cache key under which a caller's todo listing is stored.
pub fn todos_cache_key(principal: &str) -> String {
    format!("todos:user:{principal}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_header_falls_back_to_sentinel() {
        assert_eq!(principal_key(None), UNKNOWN_PRINCIPAL);
    }

    #[test]
    fn well_formed_token_uses_first_ten_chars_of_payload() {
        let key = principal_key(Some("Bearer aaa.bbbbbbbbbbbbbbbbbbbb.ccc"));
        assert_eq!(key, "bbbbbbbbbb");
    }

    #[test]
    fn short_payload_is_kept_whole() {
        assert_eq!(principal_key(Some("Bearer aaa.bbb.ccc")), "bbb");
    }

    #[test]
    fn payload_of_exactly_ten_chars_is_kept_whole() {
        assert_eq!(principal_key(Some("Bearer x.0123456789.sig")), "0123456789");
    }

    #[test]
    fn two_segment_token_still_has_a_payload() {
        assert_eq!(principal_key(Some("Bearer head.payload")), "payload");
    }

    #[test]
    fn single_segment_token_falls_back_to_sentinel() {
        assert_eq!(principal_key(Some("Bearer opaquetoken")), UNKNOWN_PRINCIPAL);
    }

    #[test]
    fn empty_header_value_falls_back_to_sentinel() {
        assert_eq!(principal_key(Some("")), UNKNOWN_PRINCIPAL);
    }

    #[test]
    fn bare_scheme_prefix_falls_back_to_sentinel() {
        assert_eq!(principal_key(Some("Bearer ")), UNKNOWN_PRINCIPAL);
    }

    #[test]
    fn empty_payload_segment_yields_empty_key() {
        // "aaa..ccc" has an empty second segment; the slice of it is empty.
        assert_eq!(principal_key(Some("Bearer aaa..ccc")), "");
    }

    #[test]
    fn scheme_prefix_is_case_sensitive() {
        // "bearer " is not stripped, so the whole value is sliced as a token.
        assert_eq!(principal_key(Some("bearer aaa.zzz.ccc")), "zzz");
    }

    #[test]
    fn non_bearer_scheme_without_dots_falls_back_to_sentinel() {
        assert_eq!(principal_key(Some("Basic dXNlcjpwdw==")), UNKNOWN_PRINCIPAL);
    }

    #[test]
    fn multibyte_payload_is_sliced_on_char_boundaries() {
        let key = principal_key(Some("Bearer aaa.ééééééééééé.ccc"));
        assert_eq!(key, "éééééééééé");
        assert_eq!(key.chars().count(), 10);
    }

    #[test]
    fn cache_key_embeds_the_principal() {
        assert_eq!(todos_cache_key("bbbbbbbbbb"), "todos:user:bbbbbbbbbb");
        assert_eq!(
            todos_cache_key(UNKNOWN_PRINCIPAL),
            "todos:user:unknown"
        );
    }
}
