//! The demo's template renderer.
//!
//! Not a template engine: every `*.html` file in the views directory is loaded
//! once at startup, and rendering replaces `{{ key }}` with the HTML-escaped
//! value of `key` in the data object. `{{ reverse "name" "arg" ... }}` is
//! replaced with the path of the named route.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::Error;
use crate::render::Renderer;
use crate::router::Routes;

pub struct Views {
    templates: HashMap<String, String>,
}

impl Views {
    /// Loads every `*.html` file of `dir`, keyed by file name.
    pub fn load(dir: &Path) -> Result<Self, Error> {
        let mut templates = HashMap::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "html") {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    templates.insert(name.to_owned(), fs::read_to_string(&path)?);
                }
            }
        }
        debug!(dir = %dir.display(), count = templates.len(), "templates loaded");
        Ok(Self { templates })
    }

    pub fn from_templates<I, K, V>(templates: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self { templates: templates.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

impl Renderer for Views {
    fn render(&self, name: &str, data: &serde_json::Value, routes: &Routes) -> Result<String, Error> {
        let source = self
            .templates
            .get(name)
            .ok_or_else(|| Error::Encoding(format!("unknown template `{name}`")))?;

        let mut out = String::with_capacity(source.len());
        let mut rest = source.as_str();

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find("}}")
                .ok_or_else(|| Error::Encoding(format!("unclosed `{{{{` in `{name}`")))?;

            let key = after[..end].trim();
            let value = match key.strip_prefix("reverse ") {
                Some(args) => reverse(routes, args)
                    .ok_or_else(|| Error::Encoding(format!("`{name}` cannot reverse `{args}`")))?,
                None => match data.get(key) {
                    Some(serde_json::Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => return Err(Error::Encoding(format!("`{name}` uses undefined `{key}`"))),
                },
            };
            out.push_str(&html_escape::encode_text(&value));
            rest = &after[end + 2..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// `"foobar"` or `"user" "42"`: a route name, then its parameters.
fn reverse(routes: &Routes, args: &str) -> Option<String> {
    let args: Vec<&str> = args.split_whitespace().map(|a| a.trim_matches('"')).collect();
    let (route, values) = args.split_first()?;
    routes.reverse(route, values)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::router::Router;

    fn render(views: &Views, name: &str, data: serde_json::Value) -> Result<String, Error> {
        views.render(name, &data, &Routes::default())
    }

    fn views() -> Views {
        Views::from_templates([("hello.html", "<p>Hello, {{ name }}! {{count}}</p>")])
    }

    #[test]
    fn substitutes_and_escapes() {
        let html = render(&views(), "hello.html", json!({ "name": "<Dolly>", "count": 3 })).unwrap();
        assert_eq!(html, "<p>Hello, &lt;Dolly&gt;! 3</p>");
    }

    #[test]
    fn unknown_template_or_key_is_an_encoding_error() {
        assert!(matches!(render(&views(), "nope.html", json!({})), Err(Error::Encoding(_))));
        assert!(matches!(render(&views(), "hello.html", json!({ "name": "x" })), Err(Error::Encoding(_))));
    }

    #[test]
    fn loads_html_files_from_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("template.html"), "Hi {{ name }}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let views = Views::load(dir.path()).unwrap();
        assert_eq!(render(&views, "template.html", json!({ "name": "Dolly!" })).unwrap(), "Hi Dolly!");
        assert!(render(&views, "notes.txt", json!({})).is_err());
    }

    #[test]
    fn reverse_links_to_named_routes() {
        async fn h(_: crate::Context) -> &'static str { "" }
        let router = Router::new()
            .get("/something", h)
            .named("foobar")
            .get("/users/:id", h)
            .named("user");
        let views = Views::from_templates([
            ("links.html", r#"<a href="{{ reverse "foobar" }}">x</a> <a href="{{ reverse "user" "42" }}">y</a>"#),
            ("broken.html", r#"{{ reverse "nope" }}"#),
        ]);

        let html = views.render("links.html", &json!({}), router.routes()).unwrap();
        assert_eq!(html, r#"<a href="/something">x</a> <a href="/users/42">y</a>"#);

        let err = views.render("broken.html", &json!({}), router.routes()).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }
}
