//! HTML templates for the web front end, rendered with minijinja.
//!
//! Templates are compiled into the binary and auto-escaped (`.html` names).

use minijinja::Environment;
use serde::Serialize;

const BASE: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{% block title %}PDF Analyzer{% endblock %}</title>
<style>
  body { font-family: sans-serif; max-width: 60rem; margin: 2rem auto; padding: 0 1rem; }
  nav a { margin-right: 1rem; }
  .message { padding: .5rem 1rem; background: #eef6ee; border-left: 4px solid #3a3; }
  .message.error { background: #fbeaea; border-left-color: #c33; }
  .page { display: flex; gap: 1rem; margin: 1rem 0; border-top: 1px solid #ddd; padding-top: 1rem; }
  .page img { max-width: 20rem; border: 1px solid #ccc; }
  .page pre { white-space: pre-wrap; flex: 1; }
  table { border-collapse: collapse; } td, th { padding: .25rem .75rem; border-bottom: 1px solid #ddd; }
</style>
</head>
<body>
<nav><a href="/">Upload</a><a href="/history">History</a></nav>
{% if message %}<p class="message{% if is_error %} error{% endif %}">{{ message }}</p>{% endif %}
{% block body %}{% endblock %}
</body>
</html>
"#;

const UPLOAD: &str = r#"{% extends "base.html" %}
{% block body %}
<h1>Upload PDF for Analysis</h1>
<form method="post" action="/" enctype="multipart/form-data">
  <label>PDF File: <input type="file" name="pdf" accept="application/pdf" required></label><br>
  <label>Google Credentials JSON: <input type="file" name="credentials" required></label><br>
  <label>OpenAI API Key: <input type="password" name="openai_api_key"{% if not has_default_key %} required{% endif %}></label>
  {% if has_default_key %}<small>(optional: a server key is configured)</small>{% endif %}<br>
  <label>Prompt:<br>
    <textarea name="prompt" rows="4" cols="50">{{ default_prompt }}</textarea>
  </label><br>
  <input type="submit" value="Start">
</form>
{% endblock %}
"#;

const HISTORY: &str = r#"{% extends "base.html" %}
{% block title %}History · PDF Analyzer{% endblock %}
{% block body %}
<h1>History</h1>
{% if sessions %}
<table>
  <tr><th>#</th><th>File</th><th>Pages</th><th>Prompt</th><th>Created</th><th>Saved to</th></tr>
  {% for s in sessions %}
  <tr>
    <td><a href="/history/{{ s.id }}">{{ s.id }}</a></td>
    <td>{{ s.file_name }}</td>
    <td>{{ s.pages }}</td>
    <td>{{ s.prompt }}</td>
    <td>{{ s.created_at }}</td>
    <td>{{ s.saved_document or "" }}</td>
  </tr>
  {% endfor %}
</table>
{% else %}
<p>No analyses yet.</p>
{% endif %}
{% endblock %}
"#;

const DETAIL: &str = r#"{% extends "base.html" %}
{% block title %}{{ session.file_name }} · PDF Analyzer{% endblock %}
{% block body %}
<h1>{{ session.file_name }}</h1>
<p>Prompt: <em>{{ session.prompt }}</em> · {{ session.pages }} pages · {{ session.created_at }}</p>
{% if session.saved_document %}<p>Last saved to document <code>{{ session.saved_document }}</code></p>{% endif %}
<form method="post" action="/save/{{ session.id }}">
  <label>New document title: <input type="text" name="title" value="{{ default_title }}"></label>
  <label>or existing document id/URL: <input type="text" name="document_id"></label>
  <input type="submit" value="Save to Google Docs">
</form>
{% for r in results %}
<div class="page">
  <img src="{{ r.image_uri }}" alt="Page {{ r.page_num }}">
  <div><h3>Page {{ r.page_num }}</h3><pre>{{ r.description }}</pre></div>
</div>
{% endfor %}
{% endblock %}
"#;

const ERROR: &str = r#"{% extends "base.html" %}
{% block title %}Error · PDF Analyzer{% endblock %}
{% block body %}<h1>{{ heading }}</h1>{% endblock %}
"#;

/// Compiled template set.
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template("base.html", BASE)?;
        env.add_template("upload.html", UPLOAD)?;
        env.add_template("history.html", HISTORY)?;
        env.add_template("detail.html", DETAIL)?;
        env.add_template("error.html", ERROR)?;
        Ok(Self { env })
    }

    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String, minijinja::Error> {
        self.env.get_template(name)?.render(ctx)
    }
}
