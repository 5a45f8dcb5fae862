//! Transfer encodings used by the envelope.
//!
//! Payloads are Base64 encoded and hard-wrapped; non-ASCII header values use
//! RFC 2047 encoded words.

use crate::error::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Maximum encoded line length for Base64 bodies (RFC 2045).
pub const MAX_LINE_LENGTH: usize = 76;

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64, hard-wrapped at [`MAX_LINE_LENGTH`] characters.
///
/// Every line, including the last one, ends with CRLF. Empty input yields an
/// empty string.
#[must_use]
pub fn encode_base64_wrapped(data: &[u8]) -> String {
    let encoded = encode_base64(data);
    let mut result = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2 + 2);

    // Base64 output is pure ASCII, so byte offsets are char boundaries.
    let mut rest = encoded.as_str();
    while !rest.is_empty() {
        let (line, tail) = rest.split_at(rest.len().min(MAX_LINE_LENGTH));
        result.push_str(line);
        result.push_str("\r\n");
        rest = tail;
    }

    result
}

/// Decodes Base64 data, ignoring line breaks and other whitespace.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(cleaned).map_err(Into::into)
}

/// Longest encoded word RFC 2047 allows.
const MAX_ENCODED_WORD: usize = 75;

/// Encodes a header value using RFC 2047 if needed.
///
/// Format: `=?charset?B?encoded-text?=`. Plain ASCII values without `=?` are
/// returned unchanged. Long values become several space-separated encoded
/// words, each split on a character boundary.
#[must_use]
pub fn encode_rfc2047(text: &str, charset: &str) -> String {
    if text.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) && !text.contains("=?") {
        return text.to_string();
    }

    let overhead = "=?".len() + charset.len() + "?B?".len() + "?=".len();
    // Raw bytes per word, rounded down to a whole base64 quantum.
    let budget = (MAX_ENCODED_WORD.saturating_sub(overhead) / 4 * 3).max(4);

    let mut words = Vec::new();
    let mut chunk = String::new();
    for c in text.chars() {
        if !chunk.is_empty() && chunk.len() + c.len_utf8() > budget {
            words.push(format!("=?{charset}?B?{}?=", encode_base64(chunk.as_bytes())));
            chunk.clear();
        }
        chunk.push(c);
    }
    if !chunk.is_empty() {
        words.push(format!("=?{charset}?B?{}?=", encode_base64(chunk.as_bytes())));
    }
    words.join(" ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");

        let decoded = decode_base64(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_wrapped_short_payload() {
        assert_eq!(encode_base64_wrapped(b"Hello"), "SGVsbG8=\r\n");
    }

    #[test]
    fn test_wrapped_empty_payload() {
        assert_eq!(encode_base64_wrapped(b""), "");
    }

    #[test]
    fn test_wrapped_line_lengths() {
        // 57 input bytes encode to exactly 76 characters.
        let data = vec![0xAB_u8; 57 * 3 + 10];
        let wrapped = encode_base64_wrapped(&data);
        let lines: Vec<&str> = wrapped.split_terminator("\r\n").collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[..3].iter().all(|l| l.len() == MAX_LINE_LENGTH));
        assert!(lines[3].len() < MAX_LINE_LENGTH);
        assert!(wrapped.ends_with("\r\n"));
        assert_eq!(decode_base64(&wrapped).unwrap(), data);
    }

    #[test]
    fn test_rfc2047_encode() {
        assert_eq!(encode_rfc2047("Hello", "utf-8"), "Hello");

        let encoded = encode_rfc2047("Héllo", "utf-8");
        assert_eq!(encoded, "=?utf-8?B?SMOpbGxv?=");
    }

    #[test]
    fn test_rfc2047_encodes_control_characters() {
        let encoded = encode_rfc2047("Hi\r\nBcc: x@y.z", "utf-8");
        assert!(encoded.starts_with("=?utf-8?B?"));
        assert!(!encoded.contains('\n'));
    }

    #[test]
    fn test_rfc2047_splits_long_values() {
        let subject = "é".repeat(40);
        let encoded = encode_rfc2047(&subject, "utf-8");
        let words: Vec<&str> = encoded.split(' ').collect();
        assert_eq!(words.len(), 2);
        assert!(words.iter().all(|w| w.len() <= MAX_ENCODED_WORD));

        let decoded: Vec<u8> = words
            .iter()
            .flat_map(|w| {
                let payload = w.trim_start_matches("=?utf-8?B?").trim_end_matches("?=");
                decode_base64(payload).unwrap()
            })
            .collect();
        assert_eq!(String::from_utf8(decoded).unwrap(), subject);
    }
}
