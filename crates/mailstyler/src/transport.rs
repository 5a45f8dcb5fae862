//! Mail dispatch.

use async_trait::async_trait;
use mailstyler_smtp::SmtpTransport;

use crate::error::TransportError;

/// Delivers an assembled message.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `message` from `sender` to every address in `recipients`.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails for any reason. Nothing is retried.
    async fn send(
        &self,
        sender: &str,
        recipients: &[String],
        message: &[u8],
    ) -> Result<(), TransportError>;
}

#[async_trait]
impl Transport for SmtpTransport {
    async fn send(
        &self,
        sender: &str,
        recipients: &[String],
        message: &[u8],
    ) -> Result<(), TransportError> {
        Self::send(self, sender, recipients, message).await
    }
}
