//! SMTP command builder.

use crate::types::Address;

/// SMTP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// EHLO - Extended greeting
    Ehlo {
        /// Client hostname
        hostname: String,
    },
    /// STARTTLS - Upgrade to TLS
    StartTls,
    /// AUTH PLAIN with an initial response
    AuthPlain {
        /// Base64 encoded `\0user\0password`
        initial_response: String,
    },
    /// MAIL FROM - Start mail transaction
    MailFrom {
        /// Sender address
        from: Address,
    },
    /// RCPT TO - Add recipient
    RcptTo {
        /// Recipient address
        to: Address,
    },
    /// DATA - Begin message data
    Data,
    /// QUIT - Close connection
    Quit,
}

impl Command {
    /// Returns the command verb, used in logs and errors.
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Ehlo { .. } => "EHLO",
            Self::StartTls => "STARTTLS",
            Self::AuthPlain { .. } => "AUTH",
            Self::MailFrom { .. } => "MAIL",
            Self::RcptTo { .. } => "RCPT",
            Self::Data => "DATA",
            Self::Quit => "QUIT",
        }
    }

    /// Serializes the command to bytes.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let line = match self {
            Self::Ehlo { hostname } => format!("EHLO {hostname}"),
            Self::StartTls => "STARTTLS".to_string(),
            Self::AuthPlain { initial_response } => format!("AUTH PLAIN {initial_response}"),
            Self::MailFrom { from } => format!("MAIL FROM:<{from}>"),
            Self::RcptTo { to } => format!("RCPT TO:<{to}>"),
            Self::Data => "DATA".to_string(),
            Self::Quit => "QUIT".to_string(),
        };
        let mut buf = line.into_bytes();
        buf.extend_from_slice(b"\r\n");
        buf
    }
}

/// Prepares a message for the DATA phase.
///
/// Line endings are normalized to CRLF, lines starting with `.` are
/// dot-stuffed and the terminating `.` line is appended.
#[must_use]
pub fn encode_data(message: &[u8]) -> Vec<u8> {
    let body = message
        .strip_suffix(b"\n")
        .map_or(message, |m| m.strip_suffix(b"\r").unwrap_or(m));

    let mut out = Vec::with_capacity(message.len() + message.len() / 64 + 8);
    for line in body.split(|&b| b == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.first() == Some(&b'.') {
            out.push(b'.');
        }
        out.extend_from_slice(line);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b".\r\n");
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize() {
        let cases = [
            (
                Command::Ehlo {
                    hostname: "client.example.com".to_string(),
                },
                "EHLO client.example.com\r\n",
            ),
            (Command::StartTls, "STARTTLS\r\n"),
            (
                Command::AuthPlain {
                    initial_response: "AHVzZXIAcGFzcw==".to_string(),
                },
                "AUTH PLAIN AHVzZXIAcGFzcw==\r\n",
            ),
            (
                Command::MailFrom {
                    from: Address::new("sender@example.com").unwrap(),
                },
                "MAIL FROM:<sender@example.com>\r\n",
            ),
            (
                Command::RcptTo {
                    to: Address::new("recipient@example.com").unwrap(),
                },
                "RCPT TO:<recipient@example.com>\r\n",
            ),
            (Command::Data, "DATA\r\n"),
            (Command::Quit, "QUIT\r\n"),
        ];
        for (command, expected) in cases {
            assert_eq!(command.serialize(), expected.as_bytes(), "{}", command.verb());
        }
    }

    #[test]
    fn test_encode_data_normalizes_and_stuffs() {
        assert_eq!(
            encode_data(b"Subject: x\n\n.hidden\r\nlast"),
            b"Subject: x\r\n\r\n..hidden\r\nlast\r\n.\r\n"
        );
    }

    #[test]
    fn test_encode_data_trailing_newline() {
        assert_eq!(encode_data(b"body\r\n"), b"body\r\n.\r\n");
        assert_eq!(encode_data(b"body\n"), b"body\r\n.\r\n");
        assert_eq!(encode_data(b"--b--\r\n\r\n"), b"--b--\r\n\r\n.\r\n");
    }
}
