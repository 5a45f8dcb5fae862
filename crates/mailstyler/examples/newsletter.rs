//! Example: render the bundled newsletter, inline its stylesheet and send it
//!
//! Without a configuration file the assembled message is printed instead of
//! sent.
//!
//! ## Running
//!
//! ```bash
//! cargo run --package mailstyler --example newsletter
//! MAILSTYLER_CONFIG=mail.json cargo run --package mailstyler --example newsletter -- ann@example.com
//! ```
//!
//! `mail.json` holds a `ManagerConfig`, for example
//! `{"smtp_server": "smtp.example.com", "smtp_sender": "news@example.com", "smtp_password": "..."}`.

use std::path::Path;

use anyhow::Context;
use mailstyler::{Attachment, FuncMap, InlineImage, MailMessage, Manager, ManagerConfig, Value};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Issue {
    name: String,
    number: u32,
    published: String,
    articles: Vec<Article>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Article {
    title: String,
    summary: String,
    read_minutes: u32,
}

// 1x1 transparent PNG.
const LOGO: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailstyler=debug,mailstyler_smtp=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let assets = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/templates");
    let (config, dry_run) = match std::env::var("MAILSTYLER_CONFIG") {
        Ok(path) => {
            let json = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            (ManagerConfig::from_json(&json)?, false)
        }
        Err(_) => (
            ManagerConfig::new("localhost", 2525, "news@example.com").security(mailstyler::Security::None),
            true,
        ),
    };
    let config = config.template_root(&assets).css_root(assets.join("css"));
    let recipient = std::env::args().nth(1).unwrap_or_else(|| "ann@example.com".to_string());

    let manager = Manager::new(config)?;

    let issue = Issue {
        name: "ann".into(),
        number: 42,
        published: "2024-03-05T09:00:00Z".into(),
        articles: vec![
            Article {
                title: "Inline styles & you".into(),
                summary: "Why mail clients ignore <style> blocks.".into(),
                read_minutes: 4,
            },
            Article {
                title: "Tables, still".into(),
                summary: "Layout that survives every inbox.".into(),
                read_minutes: 7,
            },
        ],
    };
    let data = Value::from_serialize(&issue)?;
    let funcs = FuncMap::new().with("minutes", |args| {
        let n = args.first().and_then(Value::as_f64).unwrap_or_default();
        Ok(Value::from(if (n - 1.0).abs() < f64::EPSILON {
            "1 minute".to_string()
        } else {
            format!("{n} minutes")
        }))
    });

    let html = manager
        .render_template_with_funcs_and_css("newsletter.html", "newsletter.css", data, Some(funcs))
        .await?;

    let message = MailMessage::new(format!("Newsletter #{}", issue.number), html)
        .to(recipient)
        .attach(Attachment::new("issue-42.txt", b"Plain text edition.\n".to_vec()))
        .inline_image(InlineImage::new("logo", "logo.png", LOGO.to_vec()));

    if dry_run {
        let bytes = manager.build_message(&message)?;
        println!("{}", String::from_utf8_lossy(&bytes));
        info!(bytes = bytes.len(), "Dry run, nothing sent");
    } else {
        manager.send_mail(&message).await?;
    }
    Ok(())
}
