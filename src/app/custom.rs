//! Custom request context.
//!
//! The extra methods live on a [`Capabilities`] trait. [`CustomContext`]
//! implements it by holding the framework [`Context`] and the greeter that the
//! [`custom_context`] middleware attached, never by extending `Context` itself.

use tracing::info;

use crate::context::Context;
use crate::error::Error;
use crate::handler::BoxFuture;
use crate::middleware::Next;

/// Methods the demo adds on top of the framework context.
pub trait Capabilities {
    fn foo(&self) -> &'static str;
    fn bar(&self) -> &'static str;
}

/// Attached to every request by [`custom_context`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Greeter;

pub struct CustomContext {
    ctx: Context,
    greeter: Greeter,
}

impl CustomContext {
    /// Fails when the `custom_context` middleware is not installed.
    pub fn from_context(ctx: Context) -> Result<Self, Error> {
        let greeter = *ctx
            .extension::<Greeter>()
            .ok_or_else(|| Error::Internal("custom context middleware not installed".to_owned()))?;
        Ok(Self { ctx, greeter })
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }
}

impl Capabilities for CustomContext {
    fn foo(&self) -> &'static str {
        info!(greeter = ?self.greeter, path = self.ctx.path(), "foo");
        "foo"
    }

    fn bar(&self) -> &'static str {
        info!(greeter = ?self.greeter, path = self.ctx.path(), "bar");
        "bar"
    }
}

/// Middleware attaching the [`Greeter`] capability.
pub fn custom_context(mut ctx: Context, next: Next) -> BoxFuture {
    ctx.extensions_mut().insert(Greeter);
    Box::pin(next.run(ctx))
}
