//! Type-state SMTP client.

use std::marker::PhantomData;
use std::time::Duration;

use base64::Engine;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

use super::{SmtpStream, bounded};
use crate::command::{Command, encode_data};
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{Address, Reply, ReplyCode, ServerInfo};

/// Type-state marker for connected state.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker for authenticated state.
#[derive(Debug)]
pub struct Authenticated;

/// Type-state marker for mail transaction started.
#[derive(Debug)]
pub struct MailTransaction;

/// Type-state marker for recipient added.
#[derive(Debug)]
pub struct RecipientAdded;

/// Type-state marker for data mode.
#[derive(Debug)]
pub struct Data;

/// SMTP client with type-state pattern.
///
/// `S` is the underlying stream; any `AsyncRead + AsyncWrite` works, which
/// lets tests drive the dialog with an in-memory mock.
pub struct Client<S, State> {
    stream: BufReader<S>,
    server_info: ServerInfo,
    client_name: String,
    timeout: Option<Duration>,
    _state: PhantomData<State>,
}

impl<S, State> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("server_info", &self.server_info)
            .field("client_name", &self.client_name)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the server information.
    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    fn into_state<Next>(self) -> Client<S, Next> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            client_name: self.client_name,
            timeout: self.timeout,
            _state: PhantomData,
        }
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let limit = self.timeout;
        let writer = self.stream.get_mut();
        bounded(limit, async {
            writer.write_all(data).await?;
            writer.flush().await?;
            Ok(())
        })
        .await
    }

    async fn read_reply(&mut self) -> Result<Reply> {
        let limit = self.timeout;
        let stream = &mut self.stream;
        let fut = async {
            let mut lines = Vec::new();
            loop {
                let mut line = String::new();
                if stream.read_line(&mut line).await? == 0 {
                    return Err(Error::Protocol("connection closed by server".into()));
                }
                let line = line.trim_end_matches(['\r', '\n']).to_string();
                if line.is_empty() {
                    continue;
                }
                let is_last = is_last_reply_line(&line);
                lines.push(line);
                if is_last {
                    break;
                }
            }
            parse_reply(&lines)
        };
        bounded(limit, fut).await
    }

    async fn send_command(&mut self, cmd: &Command) -> Result<Reply> {
        debug!(command = cmd.verb(), "SMTP >");
        self.write_all(&cmd.serialize()).await?;
        let reply = self.read_reply().await?;
        debug!(command = cmd.verb(), code = reply.code.as_u16(), "SMTP <");
        Ok(reply)
    }

    /// Sends a command and requires a 2xx reply.
    async fn expect_success(&mut self, cmd: &Command) -> Result<Reply> {
        let reply = self.send_command(cmd).await?;
        if reply.is_success() {
            Ok(reply)
        } else {
            Err(reply.rejected(cmd.verb()))
        }
    }

    /// Sends QUIT and closes the session (available in any state).
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(&Command::Quit).await?;
        if !reply.is_success() && reply.code != ReplyCode::CLOSING {
            return Err(reply.rejected("QUIT"));
        }
        let _ = self.stream.get_mut().shutdown().await;
        Ok(())
    }
}

impl<S> Client<S, Connected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a client from a stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or the server is not ready.
    pub async fn from_stream(stream: S, timeout: Option<Duration>) -> Result<Self> {
        let mut client = Self {
            stream: BufReader::new(stream),
            server_info: ServerInfo::default(),
            client_name: String::new(),
            timeout,
            _state: PhantomData,
        };

        let greeting = client.read_reply().await?;
        if greeting.code != ReplyCode::SERVICE_READY {
            return Err(greeting.rejected("greeting"));
        }

        client.server_info.hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();
        debug!(server = %client.server_info.hostname, "SMTP greeting received");

        Ok(client)
    }

    /// Sends EHLO and discovers server capabilities.
    ///
    /// # Errors
    ///
    /// Returns an error if the EHLO command fails.
    pub async fn ehlo(mut self, client_hostname: &str) -> Result<Self> {
        let cmd = Command::Ehlo {
            hostname: client_hostname.to_string(),
        };
        let reply = self.expect_success(&cmd).await?;
        self.server_info.set_extensions(&reply.message);
        self.client_name = client_hostname.to_string();
        Ok(self)
    }

    /// Authenticates using the PLAIN mechanism.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication is rejected.
    pub async fn auth_plain(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        let credentials = format!("\0{username}\0{password}");
        let cmd = Command::AuthPlain {
            initial_response: base64::engine::general_purpose::STANDARD.encode(credentials),
        };
        self.expect_success(&cmd).await?;
        debug!(username, "SMTP authenticated");
        Ok(self.into_state())
    }

    /// Starts a mail transaction without authentication (if the server allows).
    ///
    /// # Errors
    ///
    /// Returns an error if the MAIL FROM command fails.
    pub async fn mail_from(mut self, from: Address) -> Result<Client<S, MailTransaction>> {
        self.expect_success(&Command::MailFrom { from }).await?;
        Ok(self.into_state())
    }
}

impl<State> Client<SmtpStream, State> {
    /// Returns true once the session runs over TLS.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.stream.get_ref().is_tls()
    }
}

impl Client<SmtpStream, Connected> {
    /// Upgrades the connection to TLS using STARTTLS and repeats EHLO.
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS is not advertised or the upgrade fails.
    pub async fn starttls(mut self, hostname: &str) -> Result<Self> {
        if !self.server_info.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        let reply = self.send_command(&Command::StartTls).await?;
        if reply.code != ReplyCode::SERVICE_READY {
            return Err(reply.rejected("STARTTLS"));
        }

        let stream = self.stream.into_inner();
        let upgraded = bounded(self.timeout, stream.upgrade_to_tls(hostname)).await?;
        let client_name = self.client_name;
        let client = Self {
            stream: BufReader::new(upgraded),
            server_info: ServerInfo {
                hostname: self.server_info.hostname,
                ..ServerInfo::default()
            },
            client_name: String::new(),
            timeout: self.timeout,
            _state: PhantomData,
        };
        debug!(server = hostname, "SMTP connection upgraded to TLS");

        client.ehlo(&client_name).await
    }
}

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Starts a mail transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the MAIL FROM command fails.
    pub async fn mail_from(mut self, from: Address) -> Result<Client<S, MailTransaction>> {
        self.expect_success(&Command::MailFrom { from }).await?;
        Ok(self.into_state())
    }
}

impl<S> Client<S, MailTransaction>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Adds the first recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Client<S, RecipientAdded>> {
        self.expect_success(&Command::RcptTo { to }).await?;
        Ok(self.into_state())
    }
}

impl<S> Client<S, RecipientAdded>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Adds another recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Self> {
        self.expect_success(&Command::RcptTo { to }).await?;
        Ok(self)
    }

    /// Begins sending message data.
    ///
    /// # Errors
    ///
    /// Returns an error if the DATA command fails.
    pub async fn data(mut self) -> Result<Client<S, Data>> {
        let reply = self.send_command(&Command::Data).await?;
        if reply.code != ReplyCode::START_DATA {
            return Err(reply.rejected("DATA"));
        }
        Ok(self.into_state())
    }
}

impl<S> Client<S, Data>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Sends the message content and completes the transaction.
    ///
    /// Line endings are normalized to CRLF, leading dots are stuffed and the
    /// terminating `.` line is added.
    ///
    /// # Errors
    ///
    /// Returns an error if sending fails or the server rejects the message.
    pub async fn send_message(mut self, message: &[u8]) -> Result<Client<S, Connected>> {
        self.write_all(&encode_data(message)).await?;
        let reply = self.read_reply().await?;
        if !reply.is_success() {
            return Err(reply.rejected("message"));
        }
        debug!(bytes = message.len(), "SMTP message accepted");
        Ok(self.into_state())
    }
}
