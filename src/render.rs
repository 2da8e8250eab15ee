//! Content negotiation: typed handler results and the injected renderer.
//!
//! The router only picks the status and content type. Producing the bytes is
//! delegated: `serde_json` for [`Json`], `quick-xml` for [`Xml`], and the
//! [`Renderer`] installed with [`Router::renderer`](crate::Router::renderer)
//! for [`Template`]. Any failure there is an [`Error::Encoding`].

use http::StatusCode;
use serde::Serialize;

use crate::error::Error;
use crate::response::{ContentType, Responder, Response};
use crate::router::Routes;

/// Turns a named template and its data into a document.
///
/// The router treats it as a black box: it either returns the rendered body
/// or an error, usually [`Error::Encoding`]. `routes` lets templates link to
/// named routes with [`Routes::reverse`].
pub trait Renderer: Send + Sync + 'static {
    fn render(&self, name: &str, data: &serde_json::Value, routes: &Routes) -> Result<String, Error>;
}

/// Placeholder used until an application installs a real renderer.
pub(crate) struct NoRenderer;

impl Renderer for NoRenderer {
    fn render(&self, name: &str, _: &serde_json::Value, _: &Routes) -> Result<String, Error> {
        Err(Error::Encoding(format!("no renderer installed for template `{name}`")))
    }
}

/// What a [`Responder`] can draw on besides itself: the installed renderer
/// and the router's named routes.
pub struct Output<'a> {
    renderer: &'a dyn Renderer,
    routes: &'a Routes,
}

impl<'a> Output<'a> {
    pub(crate) fn new(renderer: &'a dyn Renderer, routes: &'a Routes) -> Self {
        Self { renderer, routes }
    }

    pub fn render(&self, name: &str, data: &serde_json::Value) -> Result<String, Error> {
        self.renderer.render(name, data, self.routes)
    }

    pub fn routes(&self) -> &Routes {
        self.routes
    }
}

/// A value encoded as JSON.
pub struct Json<T>(pub T);

impl<T: Serialize> Responder for Json<T> {
    fn respond(self, _: &Output<'_>) -> Result<Response, Error> {
        let body = serde_json::to_vec(&self.0).map_err(|e| Error::Encoding(e.to_string()))?;
        Ok(Response::json(body))
    }
}

/// A value encoded as XML; the root element is named after the type.
pub struct Xml<T>(pub T);

impl<T: Serialize> Responder for Xml<T> {
    fn respond(self, _: &Output<'_>) -> Result<Response, Error> {
        let body = quick_xml::se::to_string(&self.0).map_err(|e| Error::Encoding(e.to_string()))?;
        Ok(Response::builder().bytes(ContentType::Xml, body.into_bytes()))
    }
}

/// An HTML document, sent as is.
pub struct Html<S>(pub S);

impl<S: Into<String>> Responder for Html<S> {
    fn respond(self, _: &Output<'_>) -> Result<Response, Error> {
        Ok(Response::html(self.0))
    }
}

/// A named template rendered by the injected [`Renderer`].
pub struct Template {
    status: StatusCode,
    name: String,
    data: serde_json::Value,
}

impl Template {
    pub fn new(name: impl Into<String>, data: serde_json::Value) -> Self {
        Self { status: StatusCode::OK, name: name.into(), data }
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl Responder for Template {
    fn respond(self, out: &Output<'_>) -> Result<Response, Error> {
        let body = out.render(&self.name, &self.data)?;
        Ok(Response::builder().status(self.status).bytes(ContentType::Html, body.into_bytes()))
    }
}

/// Redirect instruction.
pub struct Redirect {
    status: StatusCode,
    location: String,
}

impl Redirect {
    /// `301 Moved Permanently`.
    pub fn permanent(location: impl Into<String>) -> Self {
        Self { status: StatusCode::MOVED_PERMANENTLY, location: location.into() }
    }

    /// `302 Found`.
    pub fn to(location: impl Into<String>) -> Self {
        Self { status: StatusCode::FOUND, location: location.into() }
    }
}

impl Responder for Redirect {
    fn respond(self, _: &Output<'_>) -> Result<Response, Error> {
        Ok(Response::redirect(self.status, &self.location))
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq, Serialize)]
    struct User {
        name: String,
        email: String,
    }

    fn jon() -> User {
        User { name: "Jon".into(), email: "jon@labstack.com".into() }
    }

    fn respond(r: impl Responder) -> Result<Response, Error> {
        r.respond(&Output::new(&NoRenderer, &Routes::default()))
    }

    #[tokio::test]
    async fn json_round_trips() {
        let res = respond(Json(jon())).unwrap();
        assert_eq!(res.header("content-type"), Some("application/json"));

        let body = res.into_bytes().await.unwrap();
        assert_eq!(serde_json::from_slice::<User>(&body).unwrap(), jon());
    }

    #[tokio::test]
    async fn xml_round_trips() {
        let res = respond(Xml(jon())).unwrap();
        assert_eq!(res.header("content-type"), Some("application/xml"));

        let body = res.into_bytes().await.unwrap();
        let xml = std::str::from_utf8(&body).unwrap();
        assert_eq!(xml, "<User><name>Jon</name><email>jon@labstack.com</email></User>");
        assert_eq!(quick_xml::de::from_str::<User>(xml).unwrap(), jon());
    }

    #[test]
    fn template_without_renderer_is_an_encoding_error() {
        let err = respond(Template::new("template.html", serde_json::json!({}))).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[test]
    fn redirect_kinds() {
        let res = respond(Redirect::permanent("https://www.inter.it/jp")).unwrap();
        assert_eq!(res.status_code(), StatusCode::MOVED_PERMANENTLY);

        let res = respond(Redirect::to("/")).unwrap();
        assert_eq!(res.status_code(), StatusCode::FOUND);
        assert_eq!(res.header("location"), Some("/"));
    }
}
