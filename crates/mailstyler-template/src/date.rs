//! Date formatting for the `formatDate` template function.
//!
//! Layouts containing `%` are `strftime` patterns. Anything else is read as a
//! reference layout built from the date `Mon Jan 2 15:04:05 MST 2006`, where
//! each component of that date stands for the matching component of the
//! formatted time.

use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

use crate::value::Value;

/// Reference layout components, longest first where prefixes overlap.
const REFERENCE: &[(&str, &str)] = &[
    ("January", "%B"),
    ("Jan", "%b"),
    ("Monday", "%A"),
    ("Mon", "%a"),
    ("2006", "%Y"),
    ("002", "%j"),
    ("01", "%m"),
    ("02", "%d"),
    ("03", "%I"),
    ("04", "%M"),
    ("05", "%S"),
    ("06", "%y"),
    ("_2", "%e"),
    ("15", "%H"),
    ("1", "%-m"),
    ("2", "%-d"),
    ("3", "%-I"),
    ("4", "%-M"),
    ("5", "%-S"),
    ("PM", "%p"),
    ("pm", "%P"),
    ("-07:00", "%:z"),
    ("-0700", "%z"),
];

/// Formats `time` (RFC 3339 text or unix seconds) with `layout`.
pub(crate) fn format_date(time: &Value, layout: &str) -> Result<String, String> {
    let time = parse_time(time)?;
    if layout.contains('%') {
        strftime(&time, layout)
    } else {
        let utc = time.offset().local_minus_utc() == 0;
        strftime(&time, &reference_to_strftime(layout, utc))
    }
}

fn parse_time(value: &Value) -> Result<DateTime<FixedOffset>, String> {
    match value {
        Value::Text(text) | Value::Html(text) => parse_text(text.trim())
            .ok_or_else(|| format!("cannot parse {text:?} as a time")),
        Value::Number(seconds) => {
            let whole = seconds.floor();
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let nanos = ((seconds - whole) * 1e9).round() as u32;
            #[allow(clippy::cast_possible_truncation)]
            let whole = whole as i64;
            DateTime::from_timestamp(whole, nanos)
                .map(|t| t.fixed_offset())
                .ok_or_else(|| format!("timestamp {seconds} out of range"))
        }
        other => Err(format!("wrong type for time; got {}", other.kind())),
    }
}

fn parse_text(text: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(text) {
        return Some(time);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc().fixed_offset());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

fn strftime(time: &DateTime<FixedOffset>, layout: &str) -> Result<String, String> {
    let items: Vec<Item<'_>> = StrftimeItems::new(layout).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(format!("invalid layout {layout:?}"));
    }
    let mut out = String::new();
    write!(out, "{}", time.format_with_items(items.iter()))
        .map_err(|_| format!("cannot format time with layout {layout:?}"))?;
    Ok(out)
}

/// Translates a reference layout into `strftime` syntax. Zone components
/// depend on whether the time is in UTC.
fn reference_to_strftime(layout: &str, utc: bool) -> String {
    let mut out = String::with_capacity(layout.len() * 2);
    let mut rest = layout;

    'scan: while let Some(c) = rest.chars().next() {
        let zone = [
            ("Z07:00", if utc { "Z" } else { "%:z" }),
            ("Z0700", if utc { "Z" } else { "%z" }),
            ("MST", if utc { "UTC" } else { "%z" }),
        ];
        for (token, replacement) in zone.iter().chain(REFERENCE) {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(replacement);
                rest = tail;
                continue 'scan;
            }
        }

        if matches!(c, '.' | ',') {
            let digits = &rest[1..];
            let run = digits
                .find(|d: char| d != '0' && d != '9')
                .unwrap_or(digits.len());
            let next_is_digit = digits[run..].starts_with(|d: char| d.is_ascii_digit());
            if run > 0 && !next_is_digit {
                out.push_str(match run {
                    1..=3 => "%.3f",
                    4..=6 => "%.6f",
                    _ => "%.9f",
                });
                rest = &digits[run..];
                continue;
            }
        }

        if c == '%' {
            out.push_str("%%");
        } else {
            out.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn format(time: &str, layout: &str) -> String {
        format_date(&Value::from(time), layout).unwrap()
    }

    #[test]
    fn test_reference_layouts() {
        let time = "2024-03-05T14:07:09Z";
        assert_eq!(format(time, "2006-01-02 15:04:05"), "2024-03-05 14:07:09");
        assert_eq!(format(time, "Jan 2, 2006"), "Mar 5, 2024");
        assert_eq!(
            format(time, "Monday, January 2, 2006 at 3:04PM"),
            "Tuesday, March 5, 2024 at 2:07PM"
        );
        assert_eq!(format(time, "02/01/06 MST"), "05/03/24 UTC");
        assert_eq!(format(time, "2006-01-02T15:04:05Z07:00"), "2024-03-05T14:07:09Z");
    }

    #[test]
    fn test_offsets_and_fractions() {
        let time = "2024-03-05T16:07:09.5+02:00";
        assert_eq!(format(time, "15:04:05.000 -0700"), "16:07:09.500 +0200");
        assert_eq!(format(time, "Z07:00"), "+02:00");
    }

    #[test]
    fn test_strftime_layouts() {
        assert_eq!(format("2024-03-05T14:07:09Z", "%Y/%m/%d"), "2024/03/05");
        assert_eq!(format("2024-03-05", "%d %B %Y"), "05 March 2024");
        assert!(format_date(&Value::from("2024-03-05"), "%Q").is_err());
    }

    #[test]
    fn test_unix_seconds() {
        assert_eq!(
            format_date(&Value::Number(0.0), "2006-01-02").unwrap(),
            "1970-01-01"
        );
        assert_eq!(
            format_date(&Value::Number(1_700_000_000.0), "2006-01-02 15:04").unwrap(),
            "2023-11-14 22:13"
        );
    }

    #[test]
    fn test_bad_input() {
        assert!(format_date(&Value::from("yesterday"), "2006").is_err());
        assert!(format_date(&Value::Bool(true), "2006").is_err());
    }

    #[test]
    fn test_literal_percent_in_reference_layout() {
        assert_eq!(reference_to_strftime("100%", true), "%-m00%%");
    }
}
