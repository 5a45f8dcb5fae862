//! SMTP extensions advertised in the EHLO reply.

use std::collections::HashSet;

/// SMTP extension discovered from an EHLO reply.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    /// STARTTLS - TLS upgrade
    StartTls,
    /// AUTH - SASL mechanisms, upper-cased
    Auth(Vec<String>),
    /// SIZE - Maximum message size
    Size(Option<usize>),
    /// 8BITMIME - 8-bit MIME transport
    EightBitMime,
    /// PIPELINING - Command pipelining
    Pipelining,
    /// SMTPUTF8 - UTF-8 email addresses
    SmtpUtf8,
    /// Any other keyword, as sent
    Unknown(String),
}

impl Extension {
    /// Parses an extension line from an EHLO reply.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            return Self::Unknown(line.to_string());
        };

        match keyword.to_ascii_uppercase().as_str() {
            "STARTTLS" => Self::StartTls,
            "AUTH" => Self::Auth(parts.map(str::to_ascii_uppercase).collect()),
            "SIZE" => Self::Size(parts.next().and_then(|s| s.parse().ok())),
            "8BITMIME" => Self::EightBitMime,
            "PIPELINING" => Self::Pipelining,
            "SMTPUTF8" => Self::SmtpUtf8,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// Server capabilities from the EHLO reply.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    /// Server hostname from the greeting.
    pub hostname: String,
    /// Supported extensions.
    pub extensions: HashSet<Extension>,
}

impl ServerInfo {
    /// Replaces the extension set with the lines of an EHLO reply (the first
    /// line is the server greeting and is skipped).
    pub fn set_extensions(&mut self, ehlo_lines: &[String]) {
        self.extensions = ehlo_lines.iter().skip(1).map(|l| Extension::parse(l)).collect();
    }

    /// Checks if STARTTLS is supported.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.extensions.contains(&Extension::StartTls)
    }

    /// Checks if the SASL mechanism is advertised.
    #[must_use]
    pub fn supports_auth(&self, mechanism: &str) -> bool {
        self.extensions.iter().any(|ext| match ext {
            Extension::Auth(mechanisms) => {
                mechanisms.iter().any(|m| m.eq_ignore_ascii_case(mechanism))
            }
            _ => false,
        })
    }

    /// Returns the maximum message size, if advertised.
    #[must_use]
    pub fn max_message_size(&self) -> Option<usize> {
        self.extensions.iter().find_map(|ext| match ext {
            Extension::Size(size) => *size,
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extensions() {
        assert_eq!(Extension::parse("STARTTLS"), Extension::StartTls);
        assert_eq!(
            Extension::parse("auth plain Login"),
            Extension::Auth(vec!["PLAIN".to_string(), "LOGIN".to_string()])
        );
        assert_eq!(Extension::parse("SIZE 35882577"), Extension::Size(Some(35_882_577)));
        assert_eq!(Extension::parse("SIZE"), Extension::Size(None));
        assert_eq!(
            Extension::parse("X-CUSTOM 1"),
            Extension::Unknown("X-CUSTOM 1".to_string())
        );
    }

    #[test]
    fn test_server_info() {
        let mut info = ServerInfo::default();
        info.set_extensions(&[
            "mx.example.com greets you".to_string(),
            "SIZE 1000".to_string(),
            "AUTH LOGIN PLAIN".to_string(),
        ]);
        assert!(!info.supports_starttls());
        assert!(info.supports_auth("plain"));
        assert!(!info.supports_auth("XOAUTH2"));
        assert_eq!(info.max_message_size(), Some(1000));
    }
}
