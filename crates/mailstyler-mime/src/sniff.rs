//! Content-type sniffing from leading payload bytes.
//!
//! Signatures are checked in table order against at most the first 512 bytes.
//! The first match wins; payloads without binary control bytes are plain text
//! and everything else is [`OCTET_STREAM`].

/// Fallback content type for unrecognized binary payloads.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Number of leading bytes considered.
const SNIFF_LEN: usize = 512;

/// Byte signature of a known format.
enum Signature {
    /// Exact prefix.
    Prefix(&'static [u8], &'static str),
    /// Prefix with `?` wildcards (`None` positions match any byte).
    Masked(&'static [Option<u8>], &'static str),
    /// HTML tag prefix, case-insensitive, after leading whitespace, followed by
    /// a space or `>`.
    Html(&'static [u8]),
    /// Exact prefix after leading whitespace.
    AfterWhitespace(&'static [u8], &'static str),
}

const HTML: &str = "text/html; charset=utf-8";

const fn b(byte: u8) -> Option<u8> {
    Some(byte)
}

const ANY: Option<u8> = None;

static SIGNATURES: &[Signature] = &[
    Signature::Html(b"<!DOCTYPE HTML"),
    Signature::Html(b"<HTML"),
    Signature::Html(b"<HEAD"),
    Signature::Html(b"<SCRIPT"),
    Signature::Html(b"<IFRAME"),
    Signature::Html(b"<H1"),
    Signature::Html(b"<DIV"),
    Signature::Html(b"<FONT"),
    Signature::Html(b"<TABLE"),
    Signature::Html(b"<A"),
    Signature::Html(b"<STYLE"),
    Signature::Html(b"<TITLE"),
    Signature::Html(b"<B"),
    Signature::Html(b"<BODY"),
    Signature::Html(b"<BR"),
    Signature::Html(b"<P"),
    Signature::Html(b"<!--"),
    Signature::AfterWhitespace(b"<?xml", "text/xml; charset=utf-8"),
    Signature::Prefix(b"%PDF-", "application/pdf"),
    Signature::Prefix(b"%!PS-Adobe-", "application/postscript"),
    // Byte order marks
    Signature::Prefix(&[0xFE, 0xFF], "text/plain; charset=utf-16be"),
    Signature::Prefix(&[0xFF, 0xFE], "text/plain; charset=utf-16le"),
    Signature::Prefix(&[0xEF, 0xBB, 0xBF], "text/plain; charset=utf-8"),
    // Images
    Signature::Prefix(&[0x00, 0x00, 0x01, 0x00], "image/x-icon"),
    Signature::Prefix(&[0x00, 0x00, 0x02, 0x00], "image/x-icon"),
    Signature::Prefix(b"BM", "image/bmp"),
    Signature::Prefix(b"GIF87a", "image/gif"),
    Signature::Prefix(b"GIF89a", "image/gif"),
    Signature::Masked(
        &[
            b(b'R'), b(b'I'), b(b'F'), b(b'F'), ANY, ANY, ANY, ANY,
            b(b'W'), b(b'E'), b(b'B'), b(b'P'), b(b'V'), b(b'P'),
        ],
        "image/webp",
    ),
    Signature::Prefix(b"\x89PNG\x0D\x0A\x1A\x0A", "image/png"),
    Signature::Prefix(&[0xFF, 0xD8, 0xFF], "image/jpeg"),
    // Audio and video
    Signature::Masked(
        &[
            b(b'F'), b(b'O'), b(b'R'), b(b'M'), ANY, ANY, ANY, ANY,
            b(b'A'), b(b'I'), b(b'F'), b(b'F'),
        ],
        "audio/aiff",
    ),
    Signature::Prefix(b"ID3", "audio/mpeg"),
    Signature::Prefix(b"OggS\x00", "application/ogg"),
    Signature::Prefix(b"MThd\x00\x00\x00\x06", "audio/midi"),
    Signature::Masked(
        &[
            b(b'R'), b(b'I'), b(b'F'), b(b'F'), ANY, ANY, ANY, ANY,
            b(b'A'), b(b'V'), b(b'I'), b(b' '),
        ],
        "video/avi",
    ),
    Signature::Masked(
        &[
            b(b'R'), b(b'I'), b(b'F'), b(b'F'), ANY, ANY, ANY, ANY,
            b(b'W'), b(b'A'), b(b'V'), b(b'E'),
        ],
        "audio/wave",
    ),
    Signature::Prefix(&[0x1A, 0x45, 0xDF, 0xA3], "video/webm"),
    // Fonts
    Signature::Prefix(b"wOFF", "font/woff"),
    Signature::Prefix(b"wOF2", "font/woff2"),
    Signature::Prefix(b"OTTO", "font/otf"),
    Signature::Prefix(&[0x00, 0x01, 0x00, 0x00], "font/ttf"),
    // Archives
    Signature::Prefix(&[0x1F, 0x8B, 0x08], "application/x-gzip"),
    Signature::Prefix(b"PK\x03\x04", "application/zip"),
    Signature::Prefix(b"Rar!\x1A\x07\x00", "application/x-rar-compressed"),
    Signature::Prefix(b"Rar!\x1A\x07\x01\x00", "application/x-rar-compressed"),
    Signature::Prefix(b"\x00asm", "application/wasm"),
];

impl Signature {
    fn matches(&self, data: &[u8]) -> Option<&'static str> {
        match self {
            Self::Prefix(prefix, ct) => data.starts_with(prefix).then_some(*ct),
            Self::Masked(pattern, ct) => {
                let hit = data.len() >= pattern.len()
                    && pattern
                        .iter()
                        .zip(data)
                        .all(|(p, d)| p.is_none_or(|p| p == *d));
                hit.then_some(*ct)
            }
            Self::AfterWhitespace(prefix, ct) => {
                skip_whitespace(data).starts_with(prefix).then_some(*ct)
            }
            Self::Html(tag) => {
                let data = skip_whitespace(data);
                if data.len() <= tag.len() {
                    return None;
                }
                let (head, rest) = data.split_at(tag.len());
                let same = head
                    .iter()
                    .zip(tag.iter())
                    .all(|(d, t)| d.to_ascii_uppercase() == *t);
                (same && matches!(rest.first(), Some(b' ' | b'>'))).then_some(HTML)
            }
        }
    }
}

fn skip_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !matches!(b, b'\t' | b'\n' | 0x0C | b'\r' | b' '))
        .unwrap_or(data.len());
    &data[start..]
}

const fn is_binary(byte: u8) -> bool {
    matches!(byte, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

/// Determines the content type of a payload from its leading bytes.
///
/// Always returns a valid MIME type; [`OCTET_STREAM`] when nothing matches.
#[must_use]
pub fn detect_content_type(data: &[u8]) -> &'static str {
    let data = &data[..data.len().min(SNIFF_LEN)];

    if let Some(ct) = SIGNATURES.iter().find_map(|sig| sig.matches(data)) {
        return ct;
    }

    if data.iter().any(|&b| is_binary(b)) {
        OCTET_STREAM
    } else {
        "text/plain; charset=utf-8"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_images() {
        assert_eq!(
            detect_content_type(b"\x89PNG\x0D\x0A\x1A\x0A\x00\x00\x00\x0DIHDR"),
            "image/png"
        );
        assert_eq!(detect_content_type(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]), "image/jpeg");
        assert_eq!(detect_content_type(b"GIF89a\x01\x00"), "image/gif");
        assert_eq!(detect_content_type(b"RIFF\x24\x00\x00\x00WEBPVP8 "), "image/webp");
    }

    #[test]
    fn test_documents() {
        assert_eq!(detect_content_type(b"%PDF-1.7\n%\xE2\xE3"), "application/pdf");
        assert_eq!(detect_content_type(b"PK\x03\x04\x14\x00"), "application/zip");
        assert_eq!(
            detect_content_type(b"  <?xml version=\"1.0\"?>"),
            "text/xml; charset=utf-8"
        );
    }

    #[test]
    fn test_html_is_case_insensitive_and_needs_terminator() {
        assert_eq!(detect_content_type(b"\n  <html><body></body></html>"), HTML);
        assert_eq!(detect_content_type(b"<!doctype html>"), HTML);
        assert_eq!(detect_content_type(b"<p class=\"x\">hi</p>"), HTML);
        // "<pre>" starts with "<P" but the next byte is not a terminator
        assert_eq!(
            detect_content_type(b"<pre>x</pre>"),
            "text/plain; charset=utf-8"
        );
    }

    #[test]
    fn test_text_and_binary_fallbacks() {
        assert_eq!(
            detect_content_type(b"name,total\nann,3\n"),
            "text/plain; charset=utf-8"
        );
        assert_eq!(detect_content_type(b""), "text/plain; charset=utf-8");
        assert_eq!(detect_content_type(&[0x01, 0x02, 0x03, 0x04, 0x05]), OCTET_STREAM);
    }

    #[test]
    fn test_only_first_512_bytes_are_considered() {
        let mut data = vec![b'a'; SNIFF_LEN];
        data.push(0x00);
        assert_eq!(detect_content_type(&data), "text/plain; charset=utf-8");
    }
}
