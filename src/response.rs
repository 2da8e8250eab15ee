//! Outgoing HTTP response type and the [`Responder`] conversion trait.
//!
//! Build a [`Response`] in your handler and return it, or return any other
//! [`Responder`] (text, [`Json`](crate::Json), [`Template`](crate::Template), …)
//! and let the router turn it into one.

use std::path::Path;
use std::{fmt, io};

use bytes::Bytes;
use futures_util::TryStreamExt;
use futures_util::stream::BoxStream;
use http::StatusCode;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::Frame;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;
use tracing::warn;

use crate::cookie::Cookie;
use crate::error::Error;
use crate::render::Output;

/// The body type handed to hyper.
pub(crate) type HttpBody = UnsyncBoxBody<Bytes, io::Error>;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`ResponseBuilder::bytes`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    Css,          // text/css
    Gif,          // image/gif
    Html,         // text/html; charset=utf-8
    Ico,          // image/x-icon
    Javascript,   // text/javascript
    Jpeg,         // image/jpeg
    Json,         // application/json
    OctetStream,  // application/octet-stream  (binary / file download)
    Pdf,          // application/pdf
    Png,          // image/png
    Svg,          // image/svg+xml
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Css         => "text/css",
            Self::Gif         => "image/gif",
            Self::Html        => "text/html; charset=utf-8",
            Self::Ico         => "image/x-icon",
            Self::Javascript  => "text/javascript",
            Self::Jpeg        => "image/jpeg",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Pdf         => "application/pdf",
            Self::Png         => "image/png",
            Self::Svg         => "image/svg+xml",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }

    /// Guesses from a file extension; unknown extensions are binary.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "css"          => Self::Css,
            "gif"          => Self::Gif,
            "htm" | "html" => Self::Html,
            "ico"          => Self::Ico,
            "js" | "mjs"   => Self::Javascript,
            "jpg" | "jpeg" => Self::Jpeg,
            "json"         => Self::Json,
            "pdf"          => Self::Pdf,
            "png"          => Self::Png,
            "svg"          => Self::Svg,
            "txt"          => Self::Text,
            "xml"          => Self::Xml,
            _              => Self::OctetStream,
        }
    }
}

// ── Body ──────────────────────────────────────────────────────────────────────

enum Body {
    Full(Bytes),
    Stream(BoxStream<'static, io::Result<Bytes>>),
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// # Shortcuts (200 OK, no custom headers needed)
///
/// ```rust
/// use vireo::{Response, StatusCode};
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
/// ```
///
/// # Builder (custom status or headers)
///
/// ```rust
/// use vireo::{ContentType, Response, StatusCode};
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .json(br#"{"id":42}"#.to_vec());
///
/// Response::builder()
///     .bytes(ContentType::Xml, b"<ok/>".to_vec());
/// ```
pub struct Response {
    body: Body,
    headers: Vec<(String, String)>,
    status: StatusCode,
}

impl Response {
    /// `200 OK`, `application/json`.
    pub fn json(body: Vec<u8>) -> Self {
        Self::builder().json(body)
    }

    /// `200 OK`, `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// `200 OK`, `text/html; charset=utf-8`.
    pub fn html(body: impl Into<String>) -> Self {
        Self::builder().bytes(ContentType::Html, body.into().into_bytes())
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self::builder().status(code).no_body()
    }

    /// Redirect to `location` with a 3xx `code`.
    pub fn redirect(code: StatusCode, location: &str) -> Self {
        Self::builder().status(code).header("location", location).no_body()
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: StatusCode::OK }
    }

    /// Reads a whole file; the content type follows its extension.
    pub async fn file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::builder().bytes(ContentType::from_path(path), bytes))
    }

    /// Streams a file in chunks instead of buffering it.
    pub async fn stream_file(path: impl AsRef<Path>, content_type: &str) -> Result<Self, Error> {
        let file = tokio::fs::File::open(path).await?;
        Ok(Self::builder().stream(content_type, file))
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }

    /// Case-insensitive lookup of the first header named `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn push_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_owned(), value.to_owned()));
    }

    /// Collects the body, draining the stream if there is one.
    pub async fn into_bytes(self) -> io::Result<Bytes> {
        match self.body {
            Body::Full(bytes) => Ok(bytes),
            Body::Stream(stream) => {
                let chunks: Vec<Bytes> = stream.try_collect().await?;
                Ok(chunks.concat().into())
            }
        }
    }

    pub(crate) fn into_http(self) -> http::Response<HttpBody> {
        let body: HttpBody = match self.body {
            Body::Full(bytes) => Full::new(bytes).map_err(|never| -> io::Error { match never {} }).boxed_unsync(),
            Body::Stream(stream) => StreamBody::new(stream.map_ok(Frame::data)).boxed_unsync(),
        };

        let mut res = http::Response::new(body);
        *res.status_mut() = self.status;

        let headers = res.headers_mut();
        for (name, value) in &self.headers {
            match (
                http::HeaderName::from_bytes(name.as_bytes()),
                http::HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => { headers.append(name, value); }
                _ => warn!(header = %name, "dropping invalid response header"),
            }
        }
        res
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = match &self.body {
            Body::Full(bytes) => format!("{} bytes", bytes.len()),
            Body::Stream(_) => "stream".to_owned(),
        };
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &body)
            .finish()
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`.
/// Terminated by a typed body method.
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Adds a `Set-Cookie` header.
    pub fn cookie(self, cookie: &Cookie) -> Self {
        self.header("set-cookie", &cookie.to_string())
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json(self, body: Vec<u8>) -> Response {
        self.finish(ContentType::Json.as_str(), Body::Full(body.into()))
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish(ContentType::Text.as_str(), Body::Full(body.into().into()))
    }

    /// Terminate with a typed body. Use this for XML, HTML, binary, etc.
    pub fn bytes(self, content_type: ContentType, body: Vec<u8>) -> Response {
        self.finish(content_type.as_str(), Body::Full(body.into()))
    }

    /// Terminate with a body read from `reader` chunk by chunk.
    pub fn stream<R>(self, content_type: &str, reader: R) -> Response
    where
        R: AsyncRead + Send + 'static,
    {
        self.finish(content_type, Body::Stream(Box::pin(ReaderStream::new(reader))))
    }

    /// Terminate with no body (e.g. `204 No Content`, redirects).
    pub fn no_body(self) -> Response {
        Response { body: Body::Full(Bytes::new()), headers: self.headers, status: self.status }
    }

    fn finish(self, content_type: &str, body: Body) -> Response {
        let mut headers = vec![("content-type".to_owned(), content_type.to_owned())];
        headers.extend(self.headers);
        Response { body, headers, status: self.status }
    }
}

// ── Responder ─────────────────────────────────────────────────────────────────

/// Conversion of a handler's return value into a [`Response`].
///
/// `out` carries the renderer injected with
/// [`Router::renderer`](crate::Router::renderer) and the named routes; only
/// [`Template`](crate::Template) uses them. Encoding failures surface as
/// [`Error::Encoding`] and are mapped by the router's error handler.
///
/// # Example: your own type
///
/// ```rust
/// use vireo::{Error, Output, Responder, Response};
///
/// struct Pong;
///
/// impl Responder for Pong {
///     fn respond(self, _: &Output<'_>) -> Result<Response, Error> {
///         Ok(Response::text("pong"))
///     }
/// }
/// ```
pub trait Responder {
    fn respond(self, out: &Output<'_>) -> Result<Response, Error>;
}

impl Responder for Response {
    fn respond(self, _: &Output<'_>) -> Result<Response, Error> { Ok(self) }
}

impl Responder for &'static str {
    fn respond(self, _: &Output<'_>) -> Result<Response, Error> { Ok(Response::text(self)) }
}

impl Responder for String {
    fn respond(self, _: &Output<'_>) -> Result<Response, Error> { Ok(Response::text(self)) }
}

/// Return a status directly from a handler: `return StatusCode::NO_CONTENT`
impl Responder for StatusCode {
    fn respond(self, _: &Output<'_>) -> Result<Response, Error> { Ok(Response::status(self)) }
}

impl<R: Responder> Responder for Result<R, Error> {
    fn respond(self, out: &Output<'_>) -> Result<Response, Error> {
        self?.respond(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_content_type_from_extension() {
        assert_eq!(ContentType::from_path(Path::new("img/toka1.JPG")), ContentType::Jpeg);
        assert_eq!(ContentType::from_path(Path::new("site.css")), ContentType::Css);
        assert_eq!(ContentType::from_path(Path::new("LICENSE")), ContentType::OctetStream);
    }

    #[test]
    fn redirect_sets_location() {
        let res = Response::redirect(StatusCode::MOVED_PERMANENTLY, "https://www.inter.it/jp");
        assert_eq!(res.status_code(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(res.header("Location"), Some("https://www.inter.it/jp"));
    }

    #[test]
    fn content_type_comes_first() {
        let res = Response::builder()
            .status(StatusCode::CREATED)
            .header("location", "/users/99")
            .json(b"{}".to_vec());
        assert_eq!(res.headers()[0], ("content-type".to_owned(), "application/json".to_owned()));
        assert_eq!(res.header("location"), Some("/users/99"));
    }

    #[tokio::test]
    async fn streamed_bodies_collect() {
        let res = Response::builder().stream("text/plain", &b"chunked body"[..]);
        assert_eq!(&res.into_bytes().await.unwrap()[..], b"chunked body");
    }

    #[test]
    fn invalid_headers_are_dropped_on_conversion() {
        let res = Response::builder().header("bad header", "x").text("ok").into_http();
        assert_eq!(res.headers().len(), 1);
        assert_eq!(res.status(), StatusCode::OK);
    }
}
