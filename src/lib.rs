//! # vireo
//!
//! A small HTTP router on hyper: method + path routing with `:named` and `*`
//! wildcard segments, an ordered middleware chain, and content negotiation
//! through typed handler results. The [`app`] module is the demo server
//! built on it.
//!
//! - Radix-tree routing via [`matchit`]; literal > named > wildcard
//! - Middleware: first registered is outermost, any layer may short-circuit
//! - One error type, mapped to responses at a single boundary
//! - Graceful shutdown on SIGTERM or Ctrl-C, draining in-flight requests
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use vireo::{Context, Error, Json, Router, Server};
//!
//! #[derive(serde::Serialize, serde::Deserialize)]
//! struct User { name: String, email: String }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let app = Router::new()
//!         .with(vireo::middleware::trace())
//!         .get("/users/:id", get_user)
//!         .get("/bind/users/:name/:email", bind_user);
//!
//!     Server::bind(([0, 0, 0, 0], 3000).into()).serve(app).await
//! }
//!
//! async fn get_user(ctx: Context) -> String {
//!     ctx.param("id").unwrap_or_default().to_owned()
//! }
//!
//! async fn bind_user(ctx: Context) -> Result<Json<User>, Error> {
//!     Ok(Json(ctx.bind()?))
//! }
//! ```

mod context;
mod cookie;
mod error;
mod fs;
mod handler;
mod method;
mod pattern;
mod render;
mod response;
mod router;
mod server;

pub mod app;
pub mod config;
pub mod logging;
pub mod middleware;

pub use context::Context;
pub use cookie::Cookie;
pub use error::{Error, ErrorHandler, default_handler};
pub use handler::{BoxFuture, Handler};
pub use method::Method;
pub use middleware::{Middleware, Next};
pub use render::{Html, Json, Output, Redirect, Renderer, Template, Xml};
pub use response::{ContentType, Responder, Response, ResponseBuilder};
pub use router::{Resolved, Router, Routes};
pub use server::Server;

pub use http::StatusCode;
