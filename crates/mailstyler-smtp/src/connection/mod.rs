//! SMTP connection management with type-state pattern.

mod client;
mod stream;

use std::future::Future;
use std::time::Duration;

pub use client::{Authenticated, Client, Connected, Data, MailTransaction, RecipientAdded};
pub use stream::{SmtpStream, connect, connect_tls};

use crate::error::{Error, Result};

/// Runs `fut`, failing with [`Error::Timeout`] once `timeout` elapses.
pub(crate) async fn bounded<T>(
    timeout: Option<Duration>,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| Error::Timeout(limit))?,
        None => fut.await,
    }
}
