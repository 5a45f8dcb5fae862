//! Property tests for assembled envelopes.

#![allow(clippy::unwrap_used)]

use mailstyler_mime::{Attachment, Envelope, InlineImage, MailMessage, encoding::MAX_LINE_LENGTH};
use proptest::prelude::*;

fn message_with(attachments: Vec<Vec<u8>>, html: String) -> MailMessage {
    let mut message = MailMessage::new("Report", html).to("a@x.com").cc("b@x.com");
    for (i, data) in attachments.into_iter().enumerate() {
        message = message.attach(Attachment::new(format!("file{i}.bin"), data));
    }
    message
}

proptest! {
    #[test]
    fn attachments_survive_assembly(
        attachments in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..2048), 0..4),
        html in "[ -~]{0,200}",
    ) {
        let message = message_with(attachments.clone(), html.clone());
        let bytes = Envelope::assemble(&message, "me@x.com").unwrap();
        let parsed = Envelope::parse(&bytes).unwrap();

        prop_assert_eq!(parsed.parts.len(), attachments.len() + 1);
        prop_assert_eq!(parsed.parts[0].body_text().unwrap(), html);
        for (part, original) in parsed.parts[1..].iter().zip(&attachments) {
            prop_assert_eq!(&part.decode_body().unwrap(), original);
        }
    }

    #[test]
    fn boundary_never_occurs_in_parts(
        data in prop::collection::vec(any::<u8>(), 1..4096),
        html in ".{0,300}",
    ) {
        let message = message_with(vec![data], html)
            .inline_image(InlineImage::new("cid1", "x.png", vec![0x89, b'P', b'N', b'G']));
        let envelope = Envelope::build(&message, "me@x.com").unwrap();
        let token = envelope.boundary().as_str().as_bytes();

        for part in envelope.parts() {
            prop_assert!(!part.body.windows(token.len()).any(|w| w == token));
        }
    }

    #[test]
    fn encoded_lines_are_wrapped(data in prop::collection::vec(any::<u8>(), 0..4096)) {
        let message = message_with(vec![data], String::new());
        let envelope = Envelope::build(&message, "me@x.com").unwrap();
        let body = String::from_utf8(envelope.parts()[1].body.clone()).unwrap();

        for line in body.split_terminator("\r\n") {
            prop_assert!(line.len() <= MAX_LINE_LENGTH);
            prop_assert!(!line.contains('\n'));
        }
        prop_assert!(body.is_empty() || body.ends_with("\r\n"));
    }
}

#[test]
fn single_html_part_envelope() {
    let message = MailMessage::new("Hi", "Hello Ann").to("a@x.com");
    let bytes = Envelope::assemble(&message, "sender@x.com").unwrap();
    let parsed = Envelope::parse(&bytes).unwrap();

    assert_eq!(parsed.headers.get("To"), Some("a@x.com"));
    assert_eq!(parsed.headers.get("From"), Some("sender@x.com"));
    assert_eq!(parsed.parts.len(), 1);
    assert_eq!(
        parsed.parts[0].headers.get("Content-Type"),
        Some("text/html; charset=\"UTF-8\"")
    );
    assert_eq!(parsed.parts[0].body_text().unwrap(), "Hello Ann");
}
