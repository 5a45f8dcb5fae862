//! End-to-end pipeline tests with an in-memory transport.

#![allow(clippy::unwrap_used)]

use std::fs;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mailstyler::{
    Attachment, Error, FuncMap, InlineImage, MailMessage, Manager, ManagerConfig, Stage,
    StylesheetError, Transport, TransportError, Value,
};
use mailstyler_mime::Envelope;

#[derive(Debug, Clone)]
struct Sent {
    sender: String,
    recipients: Vec<String>,
    message: Vec<u8>,
}

#[derive(Default)]
struct MockTransport {
    sent: Mutex<Vec<Sent>>,
    fail: bool,
}

impl MockTransport {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        sender: &str,
        recipients: &[String],
        message: &[u8],
    ) -> Result<(), TransportError> {
        if self.fail {
            return Err(TransportError::Rejected {
                command: "RCPT",
                code: 550,
                message: "mailbox unavailable".into(),
            });
        }
        self.sent.lock().unwrap().push(Sent {
            sender: sender.to_string(),
            recipients: recipients.to_vec(),
            message: message.to_vec(),
        });
        Ok(())
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    manager: Manager,
    transport: Arc<MockTransport>,
}

fn fixture_with(transport: MockTransport) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let templates = dir.path().join("templates");
    let css = templates.join("css");
    fs::create_dir_all(&css).unwrap();

    fs::write(templates.join("hello.html"), "Hello {{.Name}}").unwrap();
    fs::write(
        templates.join("card.html"),
        r#"<div class="card"><p class="note">{{.Name | toUpper}}</p><p>{{shout .Name}}</p></div>"#,
    )
    .unwrap();
    fs::write(templates.join("broken.html"), "{{if .Name}}unterminated").unwrap();
    fs::write(templates.join("bad_markup.html"), r#"<p class="x>{{.Name}}"#).unwrap();
    fs::write(
        css.join("card.css"),
        "p { color: red; } .note { color: blue; } .card { padding: 8px !important; }",
    )
    .unwrap();
    fs::write(css.join("empty.css"), "").unwrap();
    fs::write(css.join("broken.css"), "p { color: red").unwrap();

    let config = ManagerConfig::new("smtp.example.com", 587, "news@example.com")
        .template_root(&templates)
        .css_root(&css);
    let transport = Arc::new(transport);
    let manager = Manager::with_transport(config, transport.clone()).unwrap();

    Fixture {
        _dir: dir,
        manager,
        transport,
    }
}

fn fixture() -> Fixture {
    fixture_with(MockTransport::default())
}

fn shout() -> FuncMap {
    FuncMap::new().with("shout", |args| Ok(Value::from(format!("{}!", args[0]))))
}

#[tokio::test]
async fn hello_ann_end_to_end() {
    let f = fixture();
    let data = Value::from_iter([("Name", "Ann")]);

    let html = f.manager.render_template("hello.html", &data).unwrap();
    assert_eq!(html, "Hello Ann");

    let message = MailMessage::new("Hi", html).to("a@x.com");
    f.manager.send_mail(&message).await.unwrap();

    let sent = f.transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].sender, "news@example.com");
    assert_eq!(sent[0].recipients, vec!["a@x.com".to_string()]);

    let parsed = Envelope::parse(&sent[0].message).unwrap();
    assert_eq!(parsed.headers.get("Subject"), Some("Hi"));
    assert_eq!(parsed.headers.get("To"), Some("a@x.com"));
    assert_eq!(parsed.parts.len(), 1);
    assert_eq!(
        parsed.parts[0].headers.get("Content-Type"),
        Some(r#"text/html; charset="UTF-8""#)
    );
    assert_eq!(parsed.parts[0].body, b"Hello Ann");
}

#[tokio::test]
async fn styled_render_inlines_the_stylesheet() {
    let f = fixture();
    let data = Value::from_iter([("Name", "ann")]);

    let html = f
        .manager
        .render_template_with_funcs_and_css("card.html", "card.css", data, Some(shout()))
        .await
        .unwrap();

    assert!(html.contains(r#"<div style="padding: 8px !important;">"#), "{html}");
    assert!(html.contains(r#"<p style="color: blue;">ANN</p>"#), "{html}");
    assert!(html.contains(r#"<p style="color: red;">ann!</p>"#), "{html}");
    assert!(!html.contains("class="));
}

#[tokio::test]
async fn empty_stylesheet_leaves_content_alone() {
    let f = fixture();
    let html = f
        .manager
        .render_template_with_css("hello.html", "empty.css", Value::from_iter([("Name", "Ann")]))
        .await
        .unwrap();
    assert!(html.contains("<style></style>"), "{html}");
    assert!(html.contains("Hello Ann"));
}

#[tokio::test]
async fn missing_stylesheet_stops_the_pipeline() {
    let f = fixture();
    let err = f
        .manager
        .render_template_with_css("hello.html", "nope.css", Value::from_iter([("Name", "Ann")]))
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::Stylesheet(StylesheetError::NotFound { ref name, .. }) if name == "nope.css"),
        "{err}"
    );
    assert_eq!(err.stage(), Stage::Stylesheet);
    assert!(f.transport.sent().is_empty());
}

#[tokio::test]
async fn unparsable_stylesheet_stops_the_pipeline() {
    let f = fixture();
    let err = f
        .manager
        .render_template_with_css("hello.html", "broken.css", Value::from_iter([("Name", "Ann")]))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Stylesheet(StylesheetError::Parse(_))), "{err}");
    assert_eq!(err.stage(), Stage::Stylesheet);
    assert!(f.transport.sent().is_empty());
}

#[tokio::test]
async fn unparsable_markup_fails_at_inlining() {
    let f = fixture();
    let err = f
        .manager
        .render_template_with_css("bad_markup.html", "card.css", Value::from_iter([("Name", "Ann")]))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Document(_)), "{err}");
    assert_eq!(err.stage(), Stage::Inline);
    assert!(f.transport.sent().is_empty());
}

#[tokio::test]
async fn render_error_wins_over_stylesheet_error() {
    let f = fixture();
    let err = f
        .manager
        .render_template_with_css("broken.html", "nope.css", Value::Null)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Template(_)), "{err}");

    let err = f
        .manager
        .render_template_with_css("absent.html", "nope.css", Value::Null)
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Stage::Render);
}

#[tokio::test]
async fn plain_render_has_no_default_functions() {
    let f = fixture();
    let data = Value::from_iter([("Name", "ann")]);

    let err = f
        .manager
        .render_template_with_css("card.html", "card.css", data.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Template(_)), "{err}");

    // Defaults without custom functions still miss `shout`.
    let err = f
        .manager
        .render_template_with_funcs("card.html", &data, None)
        .unwrap_err();
    assert!(err.to_string().contains(r#"function "shout" not defined"#), "{err}");
}

#[tokio::test]
async fn attachments_and_inline_images_reach_the_transport() {
    let f = fixture();
    let payload: Vec<u8> = (0..=255).collect();
    let message = MailMessage::new("Report", r#"<img src="cid:logo">"#)
        .to("a@x.com")
        .to("b@x.com")
        .cc("c@x.com")
        .attach(Attachment::new("data.bin", payload.clone()))
        .inline_image(InlineImage::new("logo", "logo.gif", b"GIF89a...".to_vec()));

    f.manager.send_mail(&message).await.unwrap();

    let sent = f.transport.sent();
    assert_eq!(sent[0].recipients, vec!["a@x.com", "b@x.com", "c@x.com"]);

    let parsed = Envelope::parse(&sent[0].message).unwrap();
    assert_eq!(parsed.headers.get("To"), Some("a@x.com,b@x.com"));
    assert_eq!(parsed.headers.get("Cc"), Some("c@x.com"));
    assert_eq!(parsed.parts.len(), 3);
    assert_eq!(parsed.parts[1].decode_body().unwrap(), payload);
    let logo = parsed.part_by_cid("logo").unwrap();
    assert_eq!(logo.decode_body().unwrap(), b"GIF89a...");
}

#[tokio::test]
async fn transport_failures_are_reported() {
    let f = fixture_with(MockTransport::failing());
    let err = f
        .manager
        .send_mail(&MailMessage::new("Hi", "x").to("a@x.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::Rejected { code: 550, .. })), "{err}");
    assert_eq!(err.stage(), Stage::Transport);
}

#[test]
fn invalid_config_is_rejected() {
    let config = ManagerConfig::new("smtp.example.com", 587, "not-an-address");
    let err = Manager::with_transport(config, Arc::new(MockTransport::default())).unwrap_err();
    assert_eq!(err.stage(), Stage::Config);
}
