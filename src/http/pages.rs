//! Server-rendered pages for each check-in phase.

use axum::response::Html;

use crate::session::{Flash, Identity, RegistrationNotice};

const ZXING_SCRIPT: &str = "https://unpkg.com/@zxing/library@0.21.3/umd/index.min.js";

/// Escape text for an HTML body or a double-quoted attribute
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

fn flash_area(flashes: &[Flash]) -> String {
    flashes
        .iter()
        .map(|flash| {
            format!(
                r#"<div class="alert alert-{}" role="alert">{}</div>"#,
                flash.level.as_str(),
                escape(&flash.message)
            )
        })
        .collect()
}

fn layout(title: &str, flashes: &[Flash], body: &str) -> Html<String> {
    Html(format!(
        r#"<!doctype html>
<html lang="es">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>
body {{ font-family: system-ui, sans-serif; max-width: 32rem; margin: 2rem auto; padding: 0 1rem; }}
.alert {{ padding: .75rem 1rem; border-radius: .375rem; margin-bottom: 1rem; }}
.alert-success {{ background: #d1e7dd; color: #0f5132; }}
.alert-warning {{ background: #fff3cd; color: #664d03; }}
.alert-danger {{ background: #f8d7da; color: #842029; }}
.card {{ border: 1px solid #ddd; border-radius: .375rem; padding: 1rem; margin-bottom: 1rem; }}
label, input, button {{ display: block; width: 100%; margin-bottom: .75rem; }}
input, button {{ padding: .5rem; font-size: 1rem; box-sizing: border-box; }}
video {{ width: 100%; border-radius: .375rem; background: #000; }}
</style>
</head>
<body>
<h1>{title}</h1>
{flashes}
{body}
</body>
</html>"#,
        title = escape(title),
        flashes = flash_area(flashes),
        body = body,
    ))
}

fn optional(value: &Option<String>) -> String {
    match value {
        Some(v) if !v.is_empty() => escape(v),
        _ => "-".to_string(),
    }
}

/// LOOKUP, with the existing registration card when a duplicate was found.
pub fn lookup_page(flashes: &[Flash], last: Option<&RegistrationNotice>) -> Html<String> {
    let card = last
        .map(|notice| {
            format!(
                r#"<div class="card" id="last-registration">
<h2>Existing registration</h2>
<p><strong>Name:</strong> {name}</p>
<p><strong>Code:</strong> {code}</p>
<p><strong>Registered at:</strong> {timestamp}</p>
<p><strong>Zone:</strong> {zone}</p>
<p><strong>Table:</strong> {table}</p>
</div>"#,
                name = escape(&notice.full_name),
                code = escape(&notice.code),
                timestamp = escape(&notice.timestamp),
                zone = optional(&notice.zone),
                table = optional(&notice.table),
            )
        })
        .unwrap_or_default();

    let body = format!(
        r#"{card}
<form method="post" action="/">
<label for="documento">Document number</label>
<input id="documento" name="documento" inputmode="numeric" autocomplete="off" autofocus required>
<button type="submit">Search</button>
</form>"#
    );
    layout("Event check-in", flashes, &body)
}

pub fn new_registrant_page(flashes: &[Flash], document: &str) -> Html<String> {
    let body = format!(
        r#"<p>Document <strong>{document}</strong> is not registered yet. Please fill in your details.</p>
<form method="post" action="/nuevo-registro">
<label for="nombre">Full name</label>
<input id="nombre" name="nombre" autocomplete="name" required>
<label for="celular">Mobile phone</label>
<input id="celular" name="celular" inputmode="tel" autocomplete="tel" required>
<button type="submit">Continue</button>
</form>
<p><a href="/">Back</a></p>"#,
        document = escape(document),
    );
    layout("New registration", flashes, &body)
}

/// SCAN: camera widget posting the decoded text, plus a manual fallback.
pub fn scan_page(flashes: &[Flash], identity: &Identity) -> Html<String> {
    let body = format!(
        r#"<p>Hello <strong>{name}</strong> (document {document}). Point the camera at your code.</p>
<video id="video" playsinline></video>
<p id="scan-status">Starting camera...</p>
<form method="post" action="/set-codigo">
<label for="manual_codigo">Or type the code</label>
<input id="manual_codigo" name="manual_codigo" autocomplete="off">
<button type="submit">Use this code</button>
</form>
<p><a href="/">Start over</a></p>
<script src="{zxing}"></script>
<script>
(function () {{
  var status = document.getElementById("scan-status");
  if (typeof ZXing === "undefined") {{
    status.textContent = "Scanner unavailable, type the code instead.";
    return;
  }}
  var reader = new ZXing.BrowserMultiFormatReader();
  var sent = false;
  reader.decodeFromVideoDevice(null, "video", function (result) {{
    if (!result || sent) {{ return; }}
    sent = true;
    status.textContent = "Code detected, saving...";
    fetch("/set-codigo", {{
      method: "POST",
      headers: {{ "Content-Type": "application/json", "Accept": "application/json" }},
      body: JSON.stringify({{ codigo: result.getText() }})
    }})
      .then(function (response) {{ return response.json(); }})
      .then(function (data) {{
        if (data.ok) {{
          reader.reset();
          window.location.href = "/confirmar";
        }} else {{
          sent = false;
          status.textContent = data.error || "Could not read the code.";
        }}
      }})
      .catch(function () {{
        sent = false;
        status.textContent = "Network error, try again.";
      }});
  }}).then(function () {{
    status.textContent = "Scanning...";
  }}).catch(function () {{
    status.textContent = "Camera unavailable, type the code instead.";
  }});
}})();
</script>"#,
        name = escape(&identity.full_name),
        document = escape(&identity.document),
        zxing = ZXING_SCRIPT,
    );
    layout("Scan your code", flashes, &body)
}

pub fn confirm_page(flashes: &[Flash], identity: &Identity, code: Option<&str>) -> Html<String> {
    let action = match code {
        Some(_) => r#"<form method="post" action="/confirmar">
<button type="submit">Confirm registration</button>
</form>"#
            .to_string(),
        None => r#"<p><a href="/scan">Scan a code first</a></p>"#.to_string(),
    };

    let body = format!(
        r#"<div class="card">
<p><strong>Document:</strong> {document}</p>
<p><strong>Name:</strong> {name}</p>
<p><strong>Phone:</strong> {phone}</p>
<p><strong>Code:</strong> <span id="codigo">{code}</span></p>
</div>
{action}
<p><a href="/scan">Scan again</a> | <a href="/">Start over</a></p>"#,
        document = escape(&identity.document),
        name = escape(&identity.full_name),
        phone = escape(&identity.phone),
        code = code.map(escape).unwrap_or_else(|| "-".to_string()),
    );
    layout("Confirm registration", flashes, &body)
}
