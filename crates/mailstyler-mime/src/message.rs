//! Outgoing message content.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A binary attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Attachment {
    /// File name shown to the recipient.
    pub file_name: String,
    /// Raw payload.
    pub data: Vec<u8>,
}

impl Attachment {
    /// Creates a new attachment.
    #[must_use]
    pub fn new(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            data,
        }
    }
}

/// An image referenced from the HTML body through `cid:<cid>`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InlineImage {
    /// Content identifier, unique within the message.
    pub cid: String,
    /// File name shown to the recipient.
    pub file_name: String,
    /// Raw payload.
    pub data: Vec<u8>,
}

impl InlineImage {
    /// Creates a new inline image.
    #[must_use]
    pub fn new(cid: impl Into<String>, file_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            cid: cid.into(),
            file_name: file_name.into(),
            data,
        }
    }
}

/// An HTML message ready for assembly.
///
/// CIDs are not checked against `cid:` references in the body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MailMessage {
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html: String,
    /// Primary recipients.
    pub to: Vec<String>,
    /// Carbon-copy recipients.
    pub cc: Vec<String>,
    /// Attachments, in order.
    pub attachments: Vec<Attachment>,
    /// Inline images, in order.
    pub inline_images: Vec<InlineImage>,
}

impl MailMessage {
    /// Creates a new message with a subject and HTML body.
    #[must_use]
    pub fn new(subject: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            html: html.into(),
            ..Self::default()
        }
    }

    /// Adds a recipient.
    #[must_use]
    pub fn to(mut self, recipient: impl Into<String>) -> Self {
        self.to.push(recipient.into());
        self
    }

    /// Adds a CC recipient.
    #[must_use]
    pub fn cc(mut self, recipient: impl Into<String>) -> Self {
        self.cc.push(recipient.into());
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Adds an inline image.
    #[must_use]
    pub fn inline_image(mut self, image: InlineImage) -> Self {
        self.inline_images.push(image);
        self
    }

    /// Returns all envelope recipients: `to` followed by `cc`, without deduplication.
    #[must_use]
    pub fn all_recipients(&self) -> Vec<String> {
        self.to.iter().chain(&self.cc).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let message = MailMessage::new("Hi", "<p>x</p>")
            .to("a@x.com")
            .cc("b@x.com")
            .attach(Attachment::new("a.txt", b"a".to_vec()))
            .inline_image(InlineImage::new("logo", "logo.png", vec![1, 2]));

        assert_eq!(message.subject, "Hi");
        assert_eq!(message.to, vec!["a@x.com"]);
        assert_eq!(message.cc, vec!["b@x.com"]);
        assert_eq!(message.attachments.len(), 1);
        assert_eq!(message.inline_images[0].cid, "logo");
    }

    #[test]
    fn test_all_recipients_keeps_duplicates() {
        let message = MailMessage::new("Hi", "")
            .to("a@x.com")
            .to("b@x.com")
            .cc("a@x.com");

        assert_eq!(
            message.all_recipients(),
            vec!["a@x.com", "b@x.com", "a@x.com"]
        );
    }
}
