// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use actix_web::{http::header::ContentType, HttpResponse};

const ENTRY_HTML: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Mail Query</title></head>
<body>
  <h1>Ask your inbox</h1>
  <p>Sign in with Google to ask questions about your email.</p>
  <a href="/api/auth/google">Sign in with Google</a>
</body>
</html>
"#;

const DASHBOARD_HTML: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Mail Query</title></head>
<body>
  <h1>Ask your inbox</h1>
  <form id="ask">
    <input id="q" size="60" placeholder="How much did I spend on flights last month?">
    <button type="submit">Ask</button>
  </form>
  <pre id="answer"></pre>
  <form method="post" action="/api/auth/logout"><button type="submit">Sign out</button></form>
  <script>
    document.getElementById('ask').addEventListener('submit', async (e) => {
      e.preventDefault();
      const token = await (await fetch('/api/auth/token')).json();
      const res = await fetch('/api/query', {
        method: 'POST',
        headers: {'Content-Type': 'application/json'},
        body: JSON.stringify({query: document.getElementById('q').value, token})
      });
      const body = await res.json();
      document.getElementById('answer').textContent =
        body.answer + (body.emails ? '\n\n' + body.emails.join('\n---\n') : '');
    });
  </script>
</body>
</html>
"#;

/// GET /
pub async fn entry() -> HttpResponse {
    HttpResponse::Ok().content_type(ContentType::html()).body(ENTRY_HTML)
}

/// GET /dashboard
pub async fn dashboard() -> HttpResponse {
    HttpResponse::Ok().content_type(ContentType::html()).body(DASHBOARD_HTML)
}

/// GET /api/health
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}
