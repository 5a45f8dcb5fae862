//! One-shot message submission.

use std::fmt;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use crate::connection::{Client, Connected, bounded, connect, connect_tls};
use crate::error::{Error, Result};
use crate::types::Address;

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Security {
    /// No encryption.
    None,
    /// STARTTLS upgrade after plaintext connect, when the server offers it.
    #[default]
    StartTls,
    /// Implicit TLS (connect directly with TLS).
    Tls,
}

/// Submission settings.
#[derive(Clone)]
pub struct SmtpConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Login name for `AUTH PLAIN`.
    pub username: String,
    /// Password. Authentication is skipped when absent or empty.
    pub password: Option<String>,
    /// Connection security.
    pub security: Security,
    /// Limit applied to connecting and to every command round trip.
    pub timeout: Option<Duration>,
    /// Name sent with EHLO.
    pub client_name: String,
}

impl SmtpConfig {
    /// Creates settings for a server with STARTTLS and no credentials.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: String::new(),
            password: None,
            security: Security::default(),
            timeout: None,
            client_name: "localhost".to_string(),
        }
    }

    /// Sets the credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: Option<String>) -> Self {
        self.username = username.into();
        self.password = password;
        self
    }

    /// Sets the security mode.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("security", &self.security)
            .field("timeout", &self.timeout)
            .field("client_name", &self.client_name)
            .finish()
    }
}

/// SMTP transport: one connection per message.
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    config: SmtpConfig,
}

impl SmtpTransport {
    /// Creates a transport.
    #[must_use]
    pub const fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    /// Returns the settings.
    #[must_use]
    pub const fn config(&self) -> &SmtpConfig {
        &self.config
    }

    /// Connects, submits `message` for every recipient and disconnects.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid addresses, connection or TLS failures,
    /// rejected commands and timeouts. Addresses are checked before connecting.
    pub async fn send(&self, from: &str, recipients: &[String], message: &[u8]) -> Result<()> {
        let (from, recipients) = parse_envelope(from, recipients)?;
        let config = &self.config;

        debug!(host = %config.host, port = config.port, security = ?config.security, "Connecting to SMTP server");
        let stream = match config.security {
            Security::Tls => bounded(config.timeout, connect_tls(&config.host, config.port)).await?,
            Security::StartTls | Security::None => {
                bounded(config.timeout, connect(&config.host, config.port)).await?
            }
        };

        let client = Client::from_stream(stream, config.timeout)
            .await?
            .ehlo(&config.client_name)
            .await?;

        let client = match config.security {
            Security::StartTls if client.server_info().supports_starttls() => {
                client.starttls(&config.host).await?
            }
            Security::StartTls => {
                warn!(host = %config.host, "Server does not offer STARTTLS, continuing unencrypted");
                client
            }
            Security::Tls | Security::None => client,
        };

        let encrypted = client.is_encrypted();
        deliver(client, config, encrypted, from, &recipients, message).await
    }
}

/// Validates the sender and recipients.
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] for a malformed address and
/// [`Error::NoRecipients`] when `recipients` is empty.
pub fn parse_envelope(from: &str, recipients: &[String]) -> Result<(Address, Vec<Address>)> {
    let from = Address::new(from)?;
    if recipients.is_empty() {
        return Err(Error::NoRecipients);
    }
    let recipients = recipients
        .iter()
        .map(|r| Address::new(r.as_str()))
        .collect::<Result<Vec<_>>>()?;
    Ok((from, recipients))
}

/// Hosts that may receive `AUTH PLAIN` without TLS.
const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1", "::1"];

/// Runs the transaction on an established session: optional `AUTH PLAIN`,
/// `MAIL FROM`, one `RCPT TO` per recipient, `DATA` and `QUIT`.
///
/// `encrypted` tells whether the session runs over TLS. Credentials are only
/// sent in the clear to a loopback host.
///
/// # Errors
///
/// Returns [`Error::InsecureAuth`] before any credentials are written when
/// the session is unencrypted, and otherwise the first rejected command or
/// I/O failure.
pub async fn deliver<S>(
    client: Client<S, Connected>,
    config: &SmtpConfig,
    encrypted: bool,
    from: Address,
    recipients: &[Address],
    message: &[u8],
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (first, rest) = recipients.split_first().ok_or(Error::NoRecipients)?;

    if config.password().is_some() && !encrypted && !is_loopback(&config.host) {
        return Err(Error::InsecureAuth(config.host.clone()));
    }
    if config.password().is_some() && !client.server_info().supports_auth("PLAIN") {
        warn!("Server does not advertise AUTH PLAIN, trying anyway");
    }
    let transaction = match config.password() {
        Some(password) => {
            client
                .auth_plain(&config.username, password)
                .await?
                .mail_from(from)
                .await?
        }
        None => client.mail_from(from).await?,
    };

    let mut client = transaction.rcpt_to(first.clone()).await?;
    for recipient in rest {
        client = client.rcpt_to(recipient.clone()).await?;
    }

    client.data().await?.send_message(message).await?.quit().await
}

fn is_loopback(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    LOOPBACK_HOSTS.iter().any(|h| h.eq_ignore_ascii_case(host))
}
