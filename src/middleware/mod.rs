//! Middleware layer.
//!
//! Middleware wraps the handler: it sees the [`Context`] on the way in and
//! the `Result<Response, Error>` on the way out. It is the place for
//! cross-cutting concerns such as tracing, request limits and attaching
//! capabilities to the context.
//!
//! # Order
//!
//! The first middleware registered with [`Router::with`](crate::Router::with)
//! is the **outermost** layer: it runs first on the way in and last on the
//! way out. Routing happens before the chain runs, so every layer can read
//! [`Context::route`] and the path parameters; unmatched requests still pass
//! through the chain and reach an endpoint that fails with `NotFound` or
//! `MethodNotAllowed`.
//!
//! # Short-circuit
//!
//! A layer that returns without calling [`Next::run`] stops the request
//! there: no inner layer and no handler runs.
//!
//! ```rust
//! use vireo::{Context, Error, Next, Response, Router, StatusCode};
//!
//! async fn require_token(ctx: Context, next: Next) -> Result<Response, Error> {
//!     if ctx.header("x-token").is_none() {
//!         return Ok(Response::status(StatusCode::UNAUTHORIZED));
//!     }
//!     next.run(ctx).await
//! }
//!
//! let app = Router::new().with(require_token);
//! ```

mod limit;
mod trace;

use std::future::Future;
use std::sync::Arc;

pub use limit::{BodyLimit, parse_size};
pub use trace::{RequestId, Trace, trace};

use crate::context::Context;
use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler};
use crate::response::Response;

/// One layer of the chain.
///
/// Implemented for every `Fn(Context, Next) -> impl Future<Output =
/// Result<Response, Error>>`, and by the built-in layers.
pub trait Middleware: Send + Sync + 'static {
    fn handle(&self, ctx: Context, next: Next) -> BoxFuture;
}

impl<F, Fut> Middleware for F
where
    F: Fn(Context, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, Error>> + Send + 'static,
{
    fn handle(&self, ctx: Context, next: Next) -> BoxFuture {
        Box::pin((self)(ctx, next))
    }
}

pub(crate) type Chain = Arc<Vec<Arc<dyn Middleware>>>;

/// What the chain ends in once every layer has run.
pub(crate) enum Endpoint {
    Handler(BoxedHandler),
    Fail(Error),
}

/// The rest of the chain, handed to each layer.
pub struct Next {
    chain: Chain,
    index: usize,
    endpoint: Endpoint,
}

impl Next {
    pub(crate) fn new(chain: Chain, endpoint: Endpoint) -> Self {
        Self { chain, index: 0, endpoint }
    }

    /// Runs the remaining layers and then the handler.
    pub async fn run(self, ctx: Context) -> Result<Response, Error> {
        self.call(ctx).await
    }

    fn call(mut self, ctx: Context) -> BoxFuture {
        match self.chain.get(self.index).cloned() {
            Some(layer) => {
                self.index += 1;
                layer.handle(ctx, self)
            }
            None => match self.endpoint {
                Endpoint::Handler(handler) => handler.call(ctx),
                Endpoint::Fail(err) => Box::pin(async move { Err(err) }),
            },
        }
    }
}
