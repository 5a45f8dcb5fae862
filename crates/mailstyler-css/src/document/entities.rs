//! Character references in attribute values.

use std::borrow::Cow;

/// Named references worth decoding in `style` values.
const NAMED: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{a0}'),
];

/// Longest reference body accepted, `#x10FFFF` included.
const MAX_REFERENCE: usize = 8;

/// Decodes named and numeric character references.
///
/// Unknown or unterminated references are kept as written.
#[must_use]
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match reference(rest) {
            Some((ch, len)) => {
                out.push(ch);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Escapes a value for a double-quoted attribute.
#[must_use]
pub fn escape_attribute(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '"']) {
        return Cow::Borrowed(value);
    }
    Cow::Owned(value.replace('&', "&amp;").replace('"', "&quot;"))
}

/// Parses the reference at the start of `text`, returning the character and
/// the number of bytes consumed.
fn reference(text: &str) -> Option<(char, usize)> {
    let body = text.get(1..)?;
    let end = body.bytes().take(MAX_REFERENCE + 1).position(|b| b == b';')?;
    let name = &body[..end];

    let ch = if let Some(number) = name.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse::<u32>().ok()?,
        };
        char::from_u32(code)?
    } else {
        NAMED.iter().find(|(n, _)| *n == name).map(|(_, c)| *c)?
    };
    Some((ch, end + 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_named_and_numeric() {
        assert_eq!(
            decode_entities("&quot;Open Sans&quot; &#39;a&#x27; &amp;&lt;&gt;"),
            "\"Open Sans\" 'a' &<>"
        );
        assert_eq!(decode_entities("&#8212;"), "\u{2014}");
    }

    #[test]
    fn test_unknown_references_are_kept() {
        assert_eq!(decode_entities("a & b"), "a & b");
        assert_eq!(decode_entities("&copy;&bogus"), "&copy;&bogus");
        assert_eq!(decode_entities("&#xD800;"), "&#xD800;");
        assert_eq!(decode_entities("&"), "&");
        assert!(matches!(decode_entities("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn test_escape_attribute() {
        assert_eq!(escape_attribute(r#"url(a?x=1&y=2) "b""#), "url(a?x=1&amp;y=2) &quot;b&quot;");
        assert!(matches!(escape_attribute("red"), Cow::Borrowed("red")));
    }
}
