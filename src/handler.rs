//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! The router holds handlers of *different* types in one table, so each one
//! is hidden behind a trait object (`dyn ErasedHandler`).
//!
//! ```text
//! async fn get_user(ctx: Context) -> String { … }   ← user writes this
//!        ↓ router.get("/users/:id", get_user)
//! get_user.into_boxed_handler()                      ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(get_user))                      ← stored as BoxedHandler
//!        ↓
//! handler.call(ctx) at request time                  ← one vtable dispatch
//!        ↓
//! Box::pin(async { get_user(ctx).await.respond(&output) })
//! ```
//!
//! The result is `Result<Response, Error>`: handler errors are not turned
//! into responses here but travel back through the middleware chain to
//! [`Router::dispatch`](crate::Router::dispatch).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::error::Error;
use crate::render::Output;
use crate::response::{Responder, Response};

/// A heap-allocated, type-erased future that resolves to a response or an error.
///
/// `Send + 'static` let tokio move the future across threads.
pub type BoxFuture = Pin<Box<dyn Future<Output = Result<Response, Error>> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, ctx: Context) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is satisfied by any `async fn` (or
/// closure returning a future) with the signature:
///
/// ```text
/// async fn name(ctx: Context) -> impl Responder
/// ```
///
/// The trait is sealed: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: Responder + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: Responder + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Newtype bridging a concrete handler `F` to [`ErasedHandler`].
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: Responder + Send + 'static,
{
    fn call(&self, ctx: Context) -> BoxFuture {
        // The context moves into the handler; keep what the conversion
        // needs after it returns.
        let renderer = Arc::clone(&ctx.renderer);
        let routes = Arc::clone(&ctx.routes);
        let fut = (self.0)(ctx);
        Box::pin(async move { fut.await.respond(&Output::new(&*renderer, &routes)) })
    }
}
