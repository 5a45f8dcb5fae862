//! Multipart envelope assembly and inspection.
//!
//! Layout of an assembled envelope:
//!
//! ```text
//! MIME-Version: 1.0
//! From: <sender>
//! To: <to,...>
//! Cc: <cc,...>                     (only when non-empty)
//! Subject: <subject>
//! Content-Type: multipart/mixed; boundary=<token>
//!
//! --<token>
//! Content-Type: text/html; charset="UTF-8"
//!
//! <html>
//! --<token>
//! Content-Type: <sniffed>
//! Content-Transfer-Encoding: base64
//! Content-Disposition: attachment; filename="<name>"
//!
//! <base64, 76 columns>
//! --<token>--
//! ```
//!
//! Every line ends with CRLF. Inline images follow the attachments and carry
//! `Content-Disposition: inline` plus a `Content-ID` header.

use crate::content_type::ContentType;
use crate::encoding::{decode_base64, encode_base64_wrapped, encode_rfc2047};
use crate::error::{Error, Result};
use crate::header::Headers;
use crate::message::{Attachment, InlineImage, MailMessage};
use crate::sniff::detect_content_type;
use rand::RngCore;
use std::fmt::{self, Write as _};

/// Content type of the HTML part.
const HTML_CONTENT_TYPE: &str = "text/html; charset=\"UTF-8\"";

/// Random bytes per boundary token (rendered as twice as many hex digits).
const BOUNDARY_BYTES: usize = 30;

/// Fresh tokens drawn before giving up on a collision-free boundary.
const MAX_BOUNDARY_ATTEMPTS: usize = 8;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit text.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "binary" => Self::Binary,
            _ => Self::SevenBit, // Default (includes "7bit")
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// Multipart boundary token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary(String);

impl Boundary {
    /// Generates a random token of 60 lowercase hex digits.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0_u8; BOUNDARY_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);

        let mut token = String::with_capacity(BOUNDARY_BYTES * 2);
        for byte in bytes {
            let _ = write!(token, "{byte:02x}");
        }
        Self(token)
    }

    /// Wraps a caller-supplied token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One body part of a multipart envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Part body as transmitted (already transfer-encoded).
    pub body: Vec<u8>,
}

impl Part {
    /// Creates a new part.
    #[must_use]
    pub const fn new(headers: Headers, body: Vec<u8>) -> Self {
        Self { headers, body }
    }

    /// Creates the HTML part. The body is not transfer-encoded.
    #[must_use]
    pub fn html(html: &str) -> Self {
        let mut headers = Headers::new();
        headers.add("Content-Type", HTML_CONTENT_TYPE);
        Self::new(headers, html.as_bytes().to_vec())
    }

    /// Creates an attachment part.
    #[must_use]
    pub fn attachment(attachment: &Attachment) -> Self {
        Self::binary(&attachment.data, &attachment.file_name, "attachment", None)
    }

    /// Creates an inline image part.
    #[must_use]
    pub fn inline_image(image: &InlineImage) -> Self {
        Self::binary(&image.data, &image.file_name, "inline", Some(&image.cid))
    }

    fn binary(data: &[u8], file_name: &str, disposition: &str, cid: Option<&str>) -> Self {
        let mut headers = Headers::new();
        headers.add("Content-Type", detect_content_type(data));
        headers.add("Content-Transfer-Encoding", TransferEncoding::Base64.to_string());
        headers.add(
            "Content-Disposition",
            format!("{disposition}; filename=\"{file_name}\""),
        );
        if let Some(cid) = cid {
            headers.add("Content-ID", format!("<{cid}>"));
        }

        Self::new(headers, encode_base64_wrapped(data).into_bytes())
    }

    /// Gets the content type.
    ///
    /// # Errors
    ///
    /// Returns an error if the content type header is missing or invalid.
    pub fn content_type(&self) -> Result<ContentType> {
        self.headers
            .get("Content-Type")
            .ok_or_else(|| Error::InvalidContentType("Missing Content-Type".to_string()))
            .and_then(ContentType::parse)
    }

    /// Gets the transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("Content-Transfer-Encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// Returns the content identifier without angle brackets.
    #[must_use]
    pub fn content_id(&self) -> Option<&str> {
        self.headers
            .get("Content-ID")
            .map(|v| v.trim().trim_start_matches('<').trim_end_matches('>'))
    }

    /// Returns the disposition type (`attachment` or `inline`).
    #[must_use]
    pub fn disposition(&self) -> Option<&str> {
        self.headers
            .get("Content-Disposition")
            .and_then(|v| v.split(';').next())
            .map(str::trim)
    }

    /// Returns the `filename` parameter of the disposition.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.headers
            .get("Content-Disposition")?
            .split(';')
            .skip(1)
            .filter_map(|p| p.trim().split_once('='))
            .find(|(k, _)| k.trim().eq_ignore_ascii_case("filename"))
            .map(|(_, v)| v.trim().trim_matches('"'))
    }

    /// Decodes the body according to the transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails.
    pub fn decode_body(&self) -> Result<Vec<u8>> {
        match self.transfer_encoding() {
            TransferEncoding::Base64 => decode_base64(&String::from_utf8_lossy(&self.body)),
            _ => Ok(self.body.clone()),
        }
    }

    /// Gets the decoded body as a string.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding or UTF-8 conversion fails.
    pub fn body_text(&self) -> Result<String> {
        let decoded = self.decode_body()?;
        String::from_utf8(decoded).map_err(Into::into)
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.headers.to_string().as_bytes());
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
    }
}

/// A fully built multipart message.
#[derive(Debug, Clone)]
pub struct Envelope {
    boundary: Boundary,
    headers: Headers,
    parts: Vec<Part>,
}

impl Envelope {
    /// Builds the envelope for a message with a freshly generated boundary.
    ///
    /// A new token is drawn whenever the previous one occurs inside a part.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BoundaryCollision`] if no collision-free token was found.
    pub fn build(message: &MailMessage, sender: &str) -> Result<Self> {
        let parts = Self::build_parts(message);
        let mut last_error = None;

        for _ in 0..MAX_BOUNDARY_ATTEMPTS {
            let boundary = Boundary::generate();
            match Self::check_collisions(&boundary, message, &parts) {
                Ok(()) => return Ok(Self::from_parts(message, sender, boundary, parts)),
                Err(e) => {
                    tracing::warn!(boundary = %boundary, "Boundary collision, drawing a new token");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(Error::MissingBoundary))
    }

    /// Builds the envelope with a caller-supplied boundary.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BoundaryCollision`] if the token occurs inside a part.
    pub fn build_with_boundary(
        message: &MailMessage,
        sender: &str,
        boundary: Boundary,
    ) -> Result<Self> {
        if boundary.as_str().is_empty() {
            return Err(Error::MissingBoundary);
        }
        let parts = Self::build_parts(message);
        Self::check_collisions(&boundary, message, &parts)?;
        Ok(Self::from_parts(message, sender, boundary, parts))
    }

    /// Builds and serializes the envelope in one step.
    ///
    /// # Errors
    ///
    /// See [`Envelope::build`].
    pub fn assemble(message: &MailMessage, sender: &str) -> Result<Vec<u8>> {
        Ok(Self::build(message, sender)?.to_bytes())
    }

    /// Builds and serializes the envelope with a caller-supplied boundary.
    ///
    /// # Errors
    ///
    /// See [`Envelope::build_with_boundary`].
    pub fn assemble_with_boundary(
        message: &MailMessage,
        sender: &str,
        boundary: Boundary,
    ) -> Result<Vec<u8>> {
        Ok(Self::build_with_boundary(message, sender, boundary)?.to_bytes())
    }

    fn build_parts(message: &MailMessage) -> Vec<Part> {
        let mut parts = Vec::with_capacity(1 + message.attachments.len() + message.inline_images.len());
        parts.push(Part::html(&message.html));
        parts.extend(message.attachments.iter().map(Part::attachment));
        parts.extend(message.inline_images.iter().map(Part::inline_image));
        parts
    }

    fn check_collisions(boundary: &Boundary, message: &MailMessage, parts: &[Part]) -> Result<()> {
        let token = boundary.as_str().as_bytes();
        let labels = std::iter::once("HTML body".to_string())
            .chain(message.attachments.iter().map(|a| format!("attachment {}", a.file_name)))
            .chain(message.inline_images.iter().map(|i| format!("inline image {}", i.cid)));

        for (part, location) in parts.iter().zip(labels) {
            if find(&part.body, token, 0).is_some() {
                return Err(Error::BoundaryCollision {
                    boundary: boundary.to_string(),
                    location,
                });
            }
        }
        Ok(())
    }

    fn from_parts(message: &MailMessage, sender: &str, boundary: Boundary, parts: Vec<Part>) -> Self {
        let mut headers = Headers::new();
        headers.add("MIME-Version", "1.0");
        headers.add("From", sender);
        headers.add("To", message.to.join(","));
        if !message.cc.is_empty() {
            headers.add("Cc", message.cc.join(","));
        }
        headers.add("Subject", encode_rfc2047(&message.subject, "utf-8"));
        headers.add(
            "Content-Type",
            ContentType::multipart_mixed(boundary.as_str()).to_string(),
        );

        tracing::debug!(
            parts = parts.len(),
            attachments = message.attachments.len(),
            inline_images = message.inline_images.len(),
            "Envelope built"
        );

        Self {
            boundary,
            headers,
            parts,
        }
    }

    /// Returns the boundary token.
    #[must_use]
    pub const fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    /// Returns the top-level headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the body parts in order.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Serializes the envelope to wire bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let delimiter = format!("--{}", self.boundary);
        let mut out = Vec::new();

        out.extend_from_slice(self.headers.to_string().as_bytes());
        out.extend_from_slice(b"\r\n");

        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.extend_from_slice(b"\r\n");
            }
            out.extend_from_slice(delimiter.as_bytes());
            out.extend_from_slice(b"\r\n");
            part.write_to(&mut out);
        }

        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(delimiter.as_bytes());
        out.extend_from_slice(b"--\r\n");
        out
    }

    /// Parses an assembled `multipart/*` envelope back into headers and parts.
    ///
    /// # Errors
    ///
    /// Returns an error if the content type is missing or not multipart, if the
    /// boundary parameter is missing, or if no closing delimiter is found.
    pub fn parse(bytes: &[u8]) -> Result<ParsedEnvelope> {
        let (header_block, body) = split_head(bytes)
            .ok_or_else(|| Error::InvalidMultipart("Missing header terminator".to_string()))?;

        let headers = Headers::parse(&String::from_utf8_lossy(header_block));
        let content_type = headers
            .get("Content-Type")
            .ok_or_else(|| Error::InvalidContentType("Missing Content-Type".to_string()))
            .and_then(ContentType::parse)?;
        if !content_type.is_multipart() {
            return Err(Error::InvalidMultipart(format!(
                "Expected multipart content, got {}",
                content_type.mime_type()
            )));
        }
        let boundary = content_type
            .boundary()
            .filter(|b| !b.is_empty())
            .ok_or(Error::MissingBoundary)?
            .to_string();

        let delimiter = format!("--{boundary}");
        let next_delimiter = format!("\r\n--{boundary}");

        let mut pos = if body.starts_with(delimiter.as_bytes()) {
            0
        } else {
            find(body, next_delimiter.as_bytes(), 0)
                .map(|p| p + 2)
                .ok_or_else(|| Error::InvalidMultipart("No opening delimiter".to_string()))?
        };

        let mut parts = Vec::new();
        loop {
            let after = pos + delimiter.len();
            if body[after..].starts_with(b"--") {
                break;
            }

            let start = find(body, b"\r\n", after)
                .map(|p| p + 2)
                .ok_or_else(|| Error::InvalidMultipart("Unterminated delimiter line".to_string()))?;
            let end = find(body, next_delimiter.as_bytes(), start)
                .ok_or_else(|| Error::InvalidMultipart("No closing delimiter".to_string()))?;

            parts.push(parse_part(&body[start..end]));
            pos = end + 2;
        }

        Ok(ParsedEnvelope {
            headers,
            boundary,
            parts,
        })
    }
}

/// The result of parsing an assembled envelope.
#[derive(Debug, Clone)]
pub struct ParsedEnvelope {
    /// Top-level headers.
    pub headers: Headers,
    /// Boundary token from the `Content-Type` header.
    pub boundary: String,
    /// Body parts in order.
    pub parts: Vec<Part>,
}

impl ParsedEnvelope {
    /// Finds the inline part with the given content identifier.
    #[must_use]
    pub fn part_by_cid(&self, cid: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.content_id() == Some(cid))
    }
}

fn parse_part(raw: &[u8]) -> Part {
    if let Some(body) = raw.strip_prefix(b"\r\n") {
        return Part::new(Headers::new(), body.to_vec());
    }
    match split_head(raw) {
        Some((head, body)) => Part::new(
            Headers::parse(&String::from_utf8_lossy(head)),
            body.to_vec(),
        ),
        None => Part::new(Headers::parse(&String::from_utf8_lossy(raw)), Vec::new()),
    }
}

/// Splits at the first blank line, returning the header block (with its final
/// CRLF) and the remainder.
fn split_head(bytes: &[u8]) -> Option<(&[u8], &[u8])> {
    find(bytes, b"\r\n\r\n", 0).map(|p| (&bytes[..p + 2], &bytes[p + 4..]))
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> MailMessage {
        MailMessage::new("Hi", "<p>Hello</p>").to("a@x.com")
    }

    #[test]
    fn test_boundary_generate() {
        let a = Boundary::generate();
        let b = Boundary::generate();
        assert_eq!(a.as_str().len(), 60);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_exact_layout() {
        let message = MailMessage::new("Hi", "Hello Ann")
            .to("a@x.com")
            .to("b@x.com")
            .attach(Attachment::new("a.txt", b"hello".to_vec()));

        let bytes =
            Envelope::assemble_with_boundary(&message, "me@x.com", Boundary::new("XYZ")).unwrap();

        let expected = concat!(
            "MIME-Version: 1.0\r\n",
            "From: me@x.com\r\n",
            "To: a@x.com,b@x.com\r\n",
            "Subject: Hi\r\n",
            "Content-Type: multipart/mixed; boundary=XYZ\r\n",
            "\r\n",
            "--XYZ\r\n",
            "Content-Type: text/html; charset=\"UTF-8\"\r\n",
            "\r\n",
            "Hello Ann",
            "\r\n--XYZ\r\n",
            "Content-Type: text/plain; charset=utf-8\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "Content-Disposition: attachment; filename=\"a.txt\"\r\n",
            "\r\n",
            "aGVsbG8=\r\n",
            "\r\n--XYZ--\r\n",
        );
        assert_eq!(String::from_utf8(bytes).unwrap(), expected);
    }

    #[test]
    fn test_cc_header_only_when_present() {
        let envelope = Envelope::build(&sample(), "me@x.com").unwrap();
        assert!(envelope.headers().get("Cc").is_none());

        let envelope = Envelope::build(&sample().cc("c@x.com").cc("d@x.com"), "me@x.com").unwrap();
        assert_eq!(envelope.headers().get("Cc"), Some("c@x.com,d@x.com"));
        assert_eq!(
            envelope.headers().names(),
            vec!["MIME-Version", "From", "To", "Cc", "Subject", "Content-Type"]
        );
    }

    #[test]
    fn test_inline_image_part() {
        let png = b"\x89PNG\x0D\x0A\x1A\x0Arest".to_vec();
        let message = sample()
            .attach(Attachment::new("r.pdf", b"%PDF-1.4".to_vec()))
            .inline_image(InlineImage::new("logo@x", "logo.png", png.clone()));

        let envelope = Envelope::build(&message, "me@x.com").unwrap();
        let parts = envelope.parts();
        assert_eq!(parts.len(), 3);

        assert_eq!(parts[1].disposition(), Some("attachment"));
        assert_eq!(parts[1].headers.get("Content-Type"), Some("application/pdf"));

        let inline = &parts[2];
        assert_eq!(inline.disposition(), Some("inline"));
        assert_eq!(inline.file_name(), Some("logo.png"));
        assert_eq!(inline.headers.get("Content-ID"), Some("<logo@x>"));
        assert_eq!(inline.content_id(), Some("logo@x"));
        assert_eq!(inline.headers.get("Content-Type"), Some("image/png"));
        assert_eq!(inline.decode_body().unwrap(), png);
    }

    #[test]
    fn test_collision_in_html_body() {
        let message = MailMessage::new("Hi", "<p>token XYZ inside</p>").to("a@x.com");
        let err = Envelope::build_with_boundary(&message, "me@x.com", Boundary::new("XYZ"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::BoundaryCollision { ref location, .. } if location == "HTML body"
        ));
    }

    #[test]
    fn test_collision_in_encoded_payload() {
        // "aGVsbG8=" is the encoding of "hello"
        let message = sample().attach(Attachment::new("h.txt", b"hello".to_vec()));
        let err = Envelope::build_with_boundary(&message, "me@x.com", Boundary::new("GVsb"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::BoundaryCollision { ref location, .. } if location == "attachment h.txt"
        ));
    }

    #[test]
    fn test_empty_boundary_rejected() {
        let err =
            Envelope::build_with_boundary(&sample(), "me@x.com", Boundary::new("")).unwrap_err();
        assert!(matches!(err, Error::MissingBoundary));
    }

    #[test]
    fn test_non_ascii_subject_is_encoded() {
        let message = MailMessage::new("Grüße", "x").to("a@x.com");
        let envelope = Envelope::build(&message, "me@x.com").unwrap();
        assert!(envelope.headers().get("Subject").unwrap().starts_with("=?utf-8?B?"));
    }

    #[test]
    fn test_parse_roundtrip_structure() {
        let message = sample()
            .attach(Attachment::new("a.bin", vec![0, 1, 2, 3, 255]))
            .inline_image(InlineImage::new("img1", "i.gif", b"GIF89a..".to_vec()));
        let bytes = Envelope::assemble(&message, "me@x.com").unwrap();

        let parsed = Envelope::parse(&bytes).unwrap();
        assert_eq!(parsed.boundary.len(), 60);
        assert_eq!(parsed.headers.get("Subject"), Some("Hi"));
        assert_eq!(parsed.parts.len(), 3);
        assert_eq!(parsed.parts[0].body_text().unwrap(), "<p>Hello</p>");
        assert_eq!(parsed.parts[1].decode_body().unwrap(), vec![0, 1, 2, 3, 255]);
        assert_eq!(
            parsed.part_by_cid("img1").unwrap().decode_body().unwrap(),
            b"GIF89a.."
        );
    }

    #[test]
    fn test_parse_rejects_single_part() {
        let raw = b"Content-Type: text/plain\r\n\r\nhello";
        assert!(matches!(
            Envelope::parse(raw),
            Err(Error::InvalidMultipart(_))
        ));
    }

    #[test]
    fn test_parse_requires_closing_delimiter() {
        let raw = b"Content-Type: multipart/mixed; boundary=B\r\n\r\n--B\r\n\r\nbody";
        assert!(Envelope::parse(raw).is_err());
    }
}
