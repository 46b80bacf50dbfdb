//! Identifier helpers
//!
//! Small utilities around the opaque identifier type: generation, parsing,
//! a compact URL-safe form for logs and JSON payloads, and the short prefix
//! used in tracing fields.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use uuid::Uuid;

/// Generate a new random identifier.
#[must_use]
pub fn random() -> Uuid {
    Uuid::new_v4()
}

/// Whether the string parses as a canonical identifier.
#[must_use]
pub fn is_valid(raw: &str) -> bool {
    Uuid::parse_str(raw).is_ok()
}

/// Parse an identifier from its canonical string form.
///
/// # Errors
/// Returns the underlying parse error for malformed input.
pub fn parse(raw: &str) -> Result<Uuid, uuid::Error> {
    Uuid::parse_str(raw)
}

/// Encode as unpadded URL-safe base64 (22 characters).
#[must_use]
pub fn to_base64(id: Uuid) -> String {
    URL_SAFE_NO_PAD.encode(id.as_bytes())
}

/// Decode an identifier from its unpadded URL-safe base64 form.
#[must_use]
pub fn from_base64(raw: &str) -> Option<Uuid> {
    let bytes = URL_SAFE_NO_PAD.decode(raw).ok()?;
    Uuid::from_slice(&bytes).ok()
}

/// First hyphen group of the canonical form, for compact log lines.
#[must_use]
pub fn short_id(id: Uuid) -> String {
    id.to_string()
        .split('-')
        .next()
        .unwrap_or_default()
        .to_string()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_is_valid() {
        let id = random();
        assert!(is_valid(&id.to_string()));
    }

    #[test]
    fn test_is_valid_rejects_garbage() {
        assert!(!is_valid("not-an-id"));
        assert!(!is_valid(""));
    }

    #[test]
    fn test_parse_round_trip() {
        let id = random();
        assert_eq!(parse(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn test_base64_round_trip() {
        for _ in 0..32 {
            let id = random();
            let encoded = to_base64(id);
            assert_eq!(encoded.len(), 22);
            assert_eq!(from_base64(&encoded), Some(id));
        }
    }

    #[test]
    fn test_base64_rejects_bad_input() {
        assert_eq!(from_base64("not base64!!"), None);
        assert_eq!(from_base64(""), None);
    }

    #[test]
    fn test_short_id_is_first_group() {
        let id = parse("6ba4281c-4d9f-4f3a-8c7e-9d2b5f1e6a3c").unwrap();
        assert_eq!(short_id(id), "6ba4281c");
    }
}
