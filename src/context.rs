//! Per-request context.
//!
//! One `Context` is built for every request and moved through the middleware
//! chain into the handler. It is never shared between requests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{COOKIE, HeaderMap};
use http::Extensions;
use serde::de::DeserializeOwned;

use crate::cookie::Cookie;
use crate::error::{Error, ErrorHandler, default_handler};
use crate::method::Method;
use crate::pattern::WILDCARD;
use crate::render::{NoRenderer, Renderer};
use crate::router::Routes;

/// An incoming request together with everything routing learned about it.
pub struct Context {
    method: Method,
    path: String,
    raw_query: Option<String>,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
    route: Option<Arc<str>>,
    params: HashMap<String, String>,
    extensions: Extensions,
    pub(crate) renderer: Arc<dyn Renderer>,
    pub(crate) routes: Arc<Routes>,
    pub(crate) errors: ErrorHandler,
}

impl Context {
    /// Builds a context for `method` and a request target such as
    /// `/show?team=a&member=b`.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, raw_query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };
        let query = raw_query
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            method,
            path: path.to_owned(),
            raw_query: raw_query.map(str::to_owned),
            query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_addr: None,
            route: None,
            params: HashMap::new(),
            extensions: Extensions::new(),
            renderer: Arc::new(NoRenderer),
            routes: Arc::default(),
            errors: Arc::new(default_handler),
        }
    }

    /// Shorthand for `Context::new(Method::Get, target)`.
    pub fn get(target: &str) -> Self {
        Self::new(Method::Get, target)
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub(crate) fn attach(&mut self, renderer: Arc<dyn Renderer>, routes: Arc<Routes>, errors: ErrorHandler) {
        self.renderer = renderer;
        self.routes = routes;
        self.errors = errors;
    }

    pub(crate) fn set_route(&mut self, route: Arc<str>, params: HashMap<String, String>) {
        self.route = Some(route);
        self.params = params;
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn raw_query(&self) -> Option<&str> { self.raw_query.as_deref() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }
    pub fn body(&self) -> &Bytes { &self.body }
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }

    /// The pattern of the matched route (e.g. `/users/:id`), once routed.
    pub fn route(&self) -> Option<&str> { self.route.as_deref() }

    /// Header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter, percent-decoded.
    ///
    /// For a route `/users/:id`, `ctx.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// The remainder captured by a trailing `*` segment.
    pub fn wildcard(&self) -> Option<&str> {
        self.param(WILDCARD)
    }

    /// First value of a query parameter.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// Every value of a repeated query parameter, in request order.
    pub fn query_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.query.iter().filter(move |(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// Looks up a request cookie by name.
    pub fn cookie(&self, name: &str) -> Option<Cookie> {
        self.headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(Cookie::parse_header)
            .find(|c| c.name() == name)
    }

    /// Binds path parameters, then query parameters, into `T`.
    ///
    /// Path parameters win when both carry the same key. All values arrive
    /// as strings, so `T`'s fields should be `String` or `Option<String>`.
    pub fn bind<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let mut fields = serde_json::Map::new();
        for (k, v) in &self.params {
            if k != WILDCARD {
                fields.insert(k.clone(), v.clone().into());
            }
        }
        for (k, v) in &self.query {
            fields.entry(k.clone()).or_insert_with(|| v.clone().into());
        }
        serde_json::from_value(serde_json::Value::Object(fields)).map_err(|e| Error::Bind(e.to_string()))
    }

    /// Typed capabilities attached by middleware.
    pub fn extensions(&self) -> &Extensions { &self.extensions }
    pub fn extensions_mut(&mut self) -> &mut Extensions { &mut self.extensions }

    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    /// Rebuilds the path of a named route, filling its parameters in order.
    pub fn reverse(&self, name: &str, values: &[&str]) -> Option<String> {
        self.routes.reverse(name, values)
    }
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        name: String,
        email: String,
    }

    fn routed(target: &str, params: &[(&str, &str)]) -> Context {
        let mut ctx = Context::get(target);
        let params = params.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        ctx.set_route(Arc::from("/test"), params);
        ctx
    }

    #[test]
    fn splits_and_decodes_the_query() {
        let ctx = Context::get("/show?team=a%20b&member=c&member=d");
        assert_eq!(ctx.path(), "/show");
        assert_eq!(ctx.raw_query(), Some("team=a%20b&member=c&member=d"));
        assert_eq!(ctx.query("team"), Some("a b"));
        assert_eq!(ctx.query("member"), Some("c"));
        assert_eq!(ctx.query_all("member").collect::<Vec<_>>(), ["c", "d"]);
        assert_eq!(ctx.query("missing"), None);
    }

    #[test]
    fn bind_prefers_path_parameters() {
        let ctx = routed("/u?name=query&email=q@x.com", &[("name", "path")]);
        let user: User = ctx.bind().unwrap();
        assert_eq!(user, User { name: "path".into(), email: "q@x.com".into() });
    }

    #[test]
    fn bind_reports_missing_fields() {
        let ctx = routed("/u", &[("name", "jon")]);
        let err = ctx.bind::<User>().unwrap_err();
        assert!(matches!(err, Error::Bind(ref msg) if msg.contains("email")), "{err}");
    }

    #[test]
    fn finds_cookies_across_headers() {
        let mut ctx = Context::get("/readCookie");
        ctx.headers_mut().append(COOKIE, HeaderValue::from_static("theme=dark"));
        ctx.headers_mut().append(COOKIE, HeaderValue::from_static("lang=it; username=jon"));

        assert_eq!(ctx.cookie("username").map(|c| c.value().to_owned()).as_deref(), Some("jon"));
        assert!(ctx.cookie("session").is_none());
    }
}
