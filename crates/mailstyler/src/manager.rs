//! The mail manager.

use std::sync::Arc;

use mailstyler_mime::{Envelope, MailMessage};
use mailstyler_smtp::SmtpTransport;
use mailstyler_template::{FuncMap, Value};
use tracing::{debug, info};

use crate::config::ManagerConfig;
use crate::error::Result;
use crate::service::{CssTools, CssToolsService, StylesheetSource, TemplateService, Templates};
use crate::transport::Transport;

/// Renders, styles, assembles and sends mail.
///
/// Holds only immutable configuration and shared services, so one manager
/// can serve concurrent callers.
#[derive(Clone)]
pub struct Manager {
    config: ManagerConfig,
    templates: Arc<dyn Templates>,
    css_tools: Arc<dyn CssTools>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Manager {
    /// Creates a manager that sends over SMTP.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`](crate::ConfigError) found by
    /// [`ManagerConfig::validate`].
    pub fn new(config: ManagerConfig) -> Result<Self> {
        let transport = Arc::new(SmtpTransport::new(config.smtp_config()));
        Self::with_transport(config, transport)
    }

    /// Creates a manager with a custom transport.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`](crate::ConfigError) found by
    /// [`ManagerConfig::validate`].
    pub fn with_transport(config: ManagerConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        if let Err(errors) = config.validate() {
            if let Some(first) = errors.into_iter().next() {
                return Err(first.into());
            }
        }

        let templates: Arc<dyn Templates> = Arc::new(TemplateService::new(&config.template_root));
        let css_tools = Arc::new(CssToolsService::new(
            Arc::clone(&templates),
            StylesheetSource::new(&config.css_root),
            config.inline.clone(),
        ));

        debug!(server = %config.smtp_server, port = config.smtp_port, "Manager created");
        Ok(Self {
            config,
            templates,
            css_tools,
            transport,
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Renders a template with builtin functions only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Template`](crate::Error::Template) on failure.
    pub fn render_template(&self, template: &str, data: &Value) -> Result<String> {
        Ok(self.templates.render_template(template, data)?)
    }

    /// Renders a template with the default functions plus `funcs`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Template`](crate::Error::Template) on failure.
    pub fn render_template_with_funcs(
        &self,
        template: &str,
        data: &Value,
        funcs: Option<&FuncMap>,
    ) -> Result<String> {
        Ok(self.templates.render_template_with_funcs(template, data, funcs)?)
    }

    /// Renders a template and inlines a stylesheet from the CSS root.
    ///
    /// # Errors
    ///
    /// Render errors take precedence over stylesheet errors.
    pub async fn render_template_with_css(
        &self,
        template: &str,
        stylesheet: &str,
        data: Value,
    ) -> Result<String> {
        self.css_tools
            .render_template_with_css(template, stylesheet, data)
            .await
    }

    /// Renders a template with the default functions plus `funcs` and
    /// inlines a stylesheet from the CSS root.
    ///
    /// # Errors
    ///
    /// Render errors take precedence over stylesheet errors.
    pub async fn render_template_with_funcs_and_css(
        &self,
        template: &str,
        stylesheet: &str,
        data: Value,
        funcs: Option<FuncMap>,
    ) -> Result<String> {
        self.css_tools
            .render_template_with_funcs_and_css(template, stylesheet, data, funcs)
            .await
    }

    /// Assembles `message` into wire bytes without sending it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Assembly`](crate::Error::Assembly) on failure.
    pub fn build_message(&self, message: &MailMessage) -> Result<Vec<u8>> {
        Ok(Envelope::assemble(message, &self.config.smtp_sender)?)
    }

    /// Assembles `message` and sends it to its `to` and `cc` recipients.
    ///
    /// # Errors
    ///
    /// Returns an assembly error before anything is sent, or the transport
    /// error if delivery fails.
    pub async fn send_mail(&self, message: &MailMessage) -> Result<()> {
        let bytes = self.build_message(message)?;
        let recipients = message.all_recipients();
        self.transport
            .send(&self.config.smtp_sender, &recipients, &bytes)
            .await?;

        info!(
            subject = %message.subject,
            recipients = recipients.len(),
            bytes = bytes.len(),
            "Mail sent"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, Error};

    #[test]
    fn test_new_rejects_invalid_config() {
        let err = Manager::new(ManagerConfig::new("", 587, "a@example.com")).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::EmptyServer)));

        // Only the first problem is reported.
        let err = Manager::new(ManagerConfig::new("smtp.example.com", 0, "")).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::InvalidPort)));
    }

    #[test]
    fn test_build_message_uses_sender() {
        let manager = Manager::new(ManagerConfig::new("smtp.example.com", 587, "news@example.com")).unwrap();
        let bytes = manager
            .build_message(&MailMessage::new("Hi", "<p>x</p>").to("a@x.com"))
            .unwrap();
        let parsed = Envelope::parse(&bytes).unwrap();
        assert_eq!(parsed.headers.get("From"), Some("news@example.com"));
        assert_eq!(parsed.headers.get("Subject"), Some("Hi"));
    }
}
