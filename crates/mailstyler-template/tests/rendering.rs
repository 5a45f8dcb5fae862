//! Rendering template files with serialized data.

#![allow(clippy::unwrap_used)]

use std::fs;

use mailstyler_template::{Error, FuncMap, TemplateRenderer, Value, escape_html};
use proptest::prelude::*;
use serde::Serialize;

const ORDER: &str = r#"{{define "line"}}<tr><td>{{.Name}}</td><td>{{printf "%.2f" .Price}}</td></tr>{{end -}}
<h1>Thanks, {{.Customer.Name | title}}!</h1>
{{- if .Items}}
<table>
{{- range .Items}}
{{template "line" .}}
{{- end}}
</table>
{{- else}}
<p>No items.</p>
{{- end}}
<p>Placed {{formatDate .PlacedAt "Jan 2, 2006"}}{{with .Note}} ({{.}}){{end}}</p>"#;

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Order {
    customer: Customer,
    items: Vec<Line>,
    placed_at: String,
    note: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Customer {
    name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Line {
    name: String,
    price: f64,
}

fn order(items: Vec<Line>) -> Value {
    Value::from_serialize(&Order {
        customer: Customer {
            name: "ann lee".into(),
        },
        items,
        placed_at: "2024-03-05T14:07:09Z".into(),
        note: Some("gift <wrap>".into()),
    })
    .unwrap()
}

fn renderer() -> (tempfile::TempDir, TemplateRenderer) {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("order.html"), ORDER).unwrap();
    fs::write(dir.path().join("hello.html"), "Hello {{.Name}}").unwrap();
    fs::write(dir.path().join("broken.html"), "line one\n{{if .X}}never closed").unwrap();
    let renderer = TemplateRenderer::new(dir.path());
    (dir, renderer)
}

#[test]
fn order_confirmation() {
    let (_dir, renderer) = renderer();
    let data = order(vec![
        Line {
            name: "Pen & Ink".into(),
            price: 3.5,
        },
        Line {
            name: "Paper".into(),
            price: 12.0,
        },
    ]);

    let html = renderer.render_with_funcs("order.html", &data, None).unwrap();
    assert_eq!(
        html,
        "<h1>Thanks, Ann Lee!</h1>\n<table>\n\
         <tr><td>Pen &amp; Ink</td><td>3.50</td></tr>\n\
         <tr><td>Paper</td><td>12.00</td></tr>\n\
         </table>\n<p>Placed Mar 5, 2024 (gift &lt;wrap&gt;)</p>"
    );
}

#[test]
fn order_without_items() {
    let (_dir, renderer) = renderer();
    let html = renderer.render_with_funcs("order.html", &order(Vec::new()), None).unwrap();
    assert!(html.contains("<p>No items.</p>"));
    assert!(!html.contains("<table>"));
}

#[test]
fn hello_ann() {
    let (_dir, renderer) = renderer();
    let data = Value::from_iter([("Name", "Ann")]);
    assert_eq!(renderer.render("hello.html", &data).unwrap(), "Hello Ann");
}

#[test]
fn parse_errors_name_the_file_and_line() {
    let (_dir, renderer) = renderer();
    let err = renderer.render("broken.html", &Value::Null).unwrap_err();
    assert!(matches!(err, Error::Parse { line: 2, .. }), "{err}");
    assert_eq!(err.template_name(), "broken.html");
}

#[test]
fn plain_render_rejects_default_functions() {
    let (_dir, renderer) = renderer();
    let err = renderer.render("order.html", &order(Vec::new())).unwrap_err();
    assert!(err.to_string().contains(r#"function "title" not defined"#), "{err}");
}

#[test]
fn custom_function_registry() {
    let (dir, renderer) = renderer();
    fs::write(dir.path().join("price.html"), "{{money .Cents}}").unwrap();
    let funcs = FuncMap::new().with("money", |args| {
        let cents = args.first().and_then(Value::as_f64).ok_or("money expects a number")?;
        Ok(Value::Text(format!("${:.2}", cents / 100.0)))
    });

    let data = Value::from_iter([("Cents", 1999)]);
    let html = renderer.render_with_funcs("price.html", &data, Some(&funcs)).unwrap();
    assert_eq!(html, "$19.99");

    let err = renderer
        .render_with_funcs("price.html", &Value::from_iter([("Cents", "x")]), Some(&funcs))
        .unwrap_err();
    assert!(err.to_string().contains("error calling money: money expects a number"));
}

proptest! {
    #[test]
    fn rendering_is_deterministic(name in "\\PC{0,40}") {
        let (_dir, renderer) = renderer();
        let data = Value::from_iter([("Name", name.clone())]);
        let first = renderer.render("hello.html", &data).unwrap();
        let second = renderer.render("hello.html", &data).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first, format!("Hello {}", escape_html(&name)));
    }

    #[test]
    fn escaped_text_has_no_markup(text in "\\PC{0,60}") {
        let escaped = escape_html(&text);
        prop_assert!(!escaped.contains('<'));
        prop_assert!(!escaped.contains('>'));
        prop_assert!(!escaped.contains('"'));
    }
}
