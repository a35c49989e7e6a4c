//! Synthesized responses for when every fallback tier is exhausted.

use fallow_core::ResponseSnapshot;

/// Body of the cache-first offline notice.
pub const OFFLINE_TEXT: &str = "Offline - this resource is not available without a network connection.";

const OFFLINE_DOCUMENT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Offline</title>
  <style>
    html, body { height: 100%; margin: 0; }
    body {
      display: flex;
      align-items: center;
      justify-content: center;
      background: #0f172a;
      color: #e2e8f0;
      font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
      text-align: center;
    }
    main { max-width: 28rem; padding: 2rem; }
    h1 { font-size: 1.5rem; margin: 0 0 0.75rem; }
    p { color: #94a3b8; line-height: 1.5; margin: 0 0 1.5rem; }
    button {
      background: #3b82f6;
      border: 0;
      border-radius: 0.5rem;
      color: #fff;
      cursor: pointer;
      font-size: 1rem;
      padding: 0.75rem 1.5rem;
    }
    button:hover { background: #2563eb; }
  </style>
</head>
<body>
  <main>
    <h1>You are offline</h1>
    <p>This page could not be loaded and no saved copy is available. Check your connection and try again.</p>
    <button type="button" onclick="window.location.reload()">Reload</button>
  </main>
</body>
</html>
"#;

fn headers(content_type: &str) -> Vec<(String, String)> {
    vec![
        ("content-type".to_string(), content_type.to_string()),
        ("cache-control".to_string(), "no-store".to_string()),
    ]
}

/// 503 plain-text notice for a cache-first miss with no network.
pub fn offline_text() -> ResponseSnapshot {
    ResponseSnapshot::new(503, headers("text/plain; charset=utf-8"), OFFLINE_TEXT)
}

/// 503 JSON error for a network-first request with nothing cached.
pub fn offline_json(message: &str) -> ResponseSnapshot {
    let body = serde_json::json!({ "error": "Offline", "message": message });
    ResponseSnapshot::new(503, headers("application/json"), body.to_string())
}

/// Standalone offline page for a navigation with nothing cached.
pub fn offline_document() -> ResponseSnapshot {
    ResponseSnapshot::new(200, headers("text/html; charset=utf-8"), OFFLINE_DOCUMENT)
}
