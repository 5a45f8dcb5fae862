//! Manager configuration and validation.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use mailstyler_css::InlineOptions;
use mailstyler_smtp::{Address, Security, SmtpConfig};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Result of validating a configuration.
pub type ValidationResult = Result<(), Vec<ConfigError>>;

/// Settings for a [`Manager`](crate::Manager).
///
/// The sender address doubles as the SMTP login name.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// SMTP server hostname.
    pub smtp_server: String,
    /// SMTP server port.
    pub smtp_port: u16,
    /// Sender address and login name.
    pub smtp_sender: String,
    /// SMTP password. Authentication is skipped when absent or empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_password: Option<String>,
    /// Connection security.
    pub security: Security,
    /// Per-command SMTP timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Directory templates are loaded from.
    pub template_root: PathBuf,
    /// Directory stylesheets are loaded from.
    pub css_root: PathBuf,
    /// Inlining behavior.
    pub inline: InlineOptions,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            smtp_server: String::new(),
            smtp_port: 587,
            smtp_sender: String::new(),
            smtp_password: None,
            security: Security::default(),
            timeout_secs: None,
            template_root: PathBuf::from("templates"),
            css_root: PathBuf::from("templates/css"),
            inline: InlineOptions::default(),
        }
    }
}

impl ManagerConfig {
    /// Creates a configuration for a server and sender with default paths.
    #[must_use]
    pub fn new(
        smtp_server: impl Into<String>,
        smtp_port: u16,
        smtp_sender: impl Into<String>,
    ) -> Self {
        Self {
            smtp_server: smtp_server.into(),
            smtp_port,
            smtp_sender: smtp_sender.into(),
            ..Self::default()
        }
    }

    /// Parses a configuration from JSON. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a value has the wrong type.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Sets the SMTP password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.smtp_password = Some(password.into());
        self
    }

    /// Sets the connection security.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the SMTP timeout in seconds.
    #[must_use]
    pub const fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Sets the template directory.
    #[must_use]
    pub fn template_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.template_root = root.into();
        self
    }

    /// Sets the stylesheet directory.
    #[must_use]
    pub fn css_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.css_root = root.into();
        self
    }

    /// Sets the inlining options.
    #[must_use]
    pub const fn inline(mut self, options: InlineOptions) -> Self {
        self.inline = options;
        self
    }

    /// Checks every field and returns all problems found.
    ///
    /// # Errors
    ///
    /// Returns the list of [`ConfigError`]s, in field order.
    pub fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        if self.smtp_server.trim().is_empty() {
            errors.push(ConfigError::EmptyServer);
        }
        if self.smtp_port == 0 {
            errors.push(ConfigError::InvalidPort);
        }
        if self.smtp_sender.trim().is_empty() {
            errors.push(ConfigError::EmptySender);
        } else if Address::new(self.smtp_sender.as_str()).is_err() {
            errors.push(ConfigError::InvalidSender(self.smtp_sender.clone()));
        }
        if self.timeout_secs == Some(0) {
            errors.push(ConfigError::ZeroTimeout);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Builds the SMTP transport settings.
    #[must_use]
    pub fn smtp_config(&self) -> SmtpConfig {
        SmtpConfig::new(self.smtp_server.as_str(), self.smtp_port)
            .credentials(self.smtp_sender.as_str(), self.smtp_password.clone())
            .security(self.security)
            .timeout(self.timeout_secs.map(Duration::from_secs))
    }
}

impl fmt::Debug for ManagerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerConfig")
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_sender", &self.smtp_sender)
            .field("smtp_password", &self.smtp_password.as_ref().map(|_| "<redacted>"))
            .field("security", &self.security)
            .field("timeout_secs", &self.timeout_secs)
            .field("template_root", &self.template_root)
            .field("css_root", &self.css_root)
            .field("inline", &self.inline)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn valid() -> ManagerConfig {
        ManagerConfig::new("smtp.example.com", 587, "news@example.com")
    }

    #[test]
    fn test_valid_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_reports_every_problem() {
        let config = ManagerConfig::new("  ", 0, "").timeout_secs(0);
        let errors = config.validate().unwrap_err();
        assert_eq!(
            errors,
            vec![
                ConfigError::EmptyServer,
                ConfigError::InvalidPort,
                ConfigError::EmptySender,
                ConfigError::ZeroTimeout,
            ]
        );
    }

    #[test]
    fn test_malformed_sender() {
        let config = ManagerConfig::new("smtp.example.com", 587, "not an address");
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field(), "smtp_sender");
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = ManagerConfig::from_json(
            r#"{"smtp_server": "mail.example.com", "smtp_sender": "a@example.com", "security": "tls"}"#,
        )
        .unwrap();
        assert_eq!(config.smtp_port, 587);
        assert_eq!(config.security, Security::Tls);
        assert_eq!(config.template_root, PathBuf::from("templates"));
        assert_eq!(config.css_root, PathBuf::from("templates/css"));
        assert!(config.inline.remove_classes);
        assert!(config.smtp_password.is_none());
    }

    #[test]
    fn test_smtp_config_uses_sender_as_login() {
        let config = valid().password("secret").timeout_secs(30);
        let smtp = config.smtp_config();
        assert_eq!(smtp.host, "smtp.example.com");
        assert_eq!(smtp.username, "news@example.com");
        assert_eq!(smtp.password.as_deref(), Some("secret"));
        assert_eq!(smtp.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_debug_redacts_password() {
        let debug = format!("{:?}", valid().password("hunter2"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
