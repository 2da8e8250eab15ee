//! The demo application: static assets, content negotiation, cookies and a
//! custom context, all wired onto one router.

mod custom;
mod views;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::AppConfig;
use crate::context::Context;
use crate::cookie::Cookie;
use crate::error::Error;
use crate::middleware::{BodyLimit, trace};
use crate::render::{Html, Json, Redirect, Template, Xml};
use crate::response::Response;
use crate::router::Router;

pub use custom::{Capabilities, CustomContext, Greeter, custom_context};
pub use views::Views;

const COOKIE_NAME: &str = "username";

/// The record of the JSON, XML and bind routes.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct User {
    pub name: String,
    pub email: String,
}

/// Builds the demo router. Pure construction: nothing is served until the
/// router is handed to [`Server::serve`](crate::Server::serve).
///
/// Fails if the views directory cannot be read or a size in `config` is
/// invalid.
pub fn build_router(config: &AppConfig) -> Result<Router, Error> {
    let limit = config.body_limit_bytes().map_err(|e| Error::Internal(e.to_string()))?;
    let views = Views::load(&config.views_dir)?;
    let image = Arc::new(config.image.clone());
    let redirect_to = Arc::new(config.redirect_to.clone());

    let router = Router::new()
        .with(trace())
        .with(custom_context)
        .with(BodyLimit::new(limit))
        .renderer(views)
        .static_files("/", &config.assets_dir)
        .get("/", index)
        .get("/something", something)
        .named("foobar")
        .get("/json", json)
        .get("/xml", xml)
        .get("/file", {
            let image = Arc::clone(&image);
            move |_: Context| file(Arc::clone(&image))
        })
        .get("/sendStreamFile", move |_: Context| stream_file(Arc::clone(&image)))
        .get("/redirect", move |_: Context| {
            let to = Arc::clone(&redirect_to);
            async move { Redirect::permanent(to.as_str()) }
        })
        .any("/users/*", any_user)
        .get("/users/:id", get_user)
        .get("/show", show)
        .get("/bind/users/:name/:email", bind_user)
        .get("/customContext", custom)
        .get("/writeCookie", write_cookie)
        .get("/readCookie", read_cookie);

    info!(assets = %config.assets_dir.display(), body_limit = limit, "router built");
    Ok(router)
}

fn jon() -> User {
    User { name: "Jon".to_owned(), email: "jon@labstack.com".to_owned() }
}

async fn index(_: Context) -> Html<&'static str> {
    Html("<strong>Hello, World!</strong>")
}

async fn something(_: Context) -> Template {
    Template::new("template.html", serde_json::json!({ "name": "Dolly!" }))
}

async fn json(_: Context) -> Json<User> {
    Json(jon())
}

async fn xml(_: Context) -> Xml<User> {
    Xml(jon())
}

async fn file(image: Arc<PathBuf>) -> Result<Response, Error> {
    Response::file(image.as_path()).await
}

async fn stream_file(image: Arc<PathBuf>) -> Result<Response, Error> {
    Response::stream_file(image.as_path(), "image/jpg").await
}

async fn any_user(_: Context) -> &'static str {
    "any!!"
}

async fn get_user(ctx: Context) -> String {
    ctx.param("id").unwrap_or_default().to_owned()
}

async fn show(ctx: Context) -> String {
    let team = ctx.query("team").unwrap_or_default();
    let member = ctx.query("member").unwrap_or_default();
    format!("team:{team}, member:{member}")
}

async fn bind_user(ctx: Context) -> Result<Json<User>, Error> {
    Ok(Json(ctx.bind::<User>()?))
}

async fn custom(ctx: Context) -> Result<&'static str, Error> {
    let cc = CustomContext::from_context(ctx)?;
    cc.foo();
    cc.bar();
    Ok("OK")
}

async fn write_cookie(_: Context) -> Response {
    let cookie = Cookie::new(COOKIE_NAME, "jon").expires(Utc::now() + Duration::hours(24));
    Response::builder().cookie(&cookie).text("write a cookie")
}

async fn read_cookie(ctx: Context) -> Result<&'static str, Error> {
    // A request without the cookie is the client's mistake: 400 rather than 500.
    let cookie = ctx
        .cookie(COOKIE_NAME)
        .ok_or_else(|| Error::Bind(format!("missing cookie `{COOKIE_NAME}`")))?;
    info!(name = cookie.name(), value = cookie.value(), "cookie read");
    Ok("read a cookie")
}
