//! Per-request tracing span.

use std::sync::Arc;
use std::time::Instant;

use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use super::Middleware;
use crate::context::Context;
use crate::handler::BoxFuture;
use crate::middleware::Next;

const REQUEST_ID: &str = "x-request-id";

/// The id of the current request, available to inner layers and handlers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Opens a span with method, uri, remote ip and request id around the rest
/// of the chain, and logs status and latency when the response is ready.
///
/// An incoming `x-request-id` is reused (the proxy usually sets one);
/// otherwise a UUID v4 is generated. The id is echoed on the response.
///
/// Errors from inner layers are turned into responses here, through the
/// router's error handler, so error responses carry the id too. Layers
/// registered before `Trace` therefore see those as `Ok`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Trace;

pub fn trace() -> Trace {
    Trace
}

impl Middleware for Trace {
    fn handle(&self, mut ctx: Context, next: Next) -> BoxFuture {
        let id = ctx
            .header(REQUEST_ID)
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        ctx.extensions_mut().insert(RequestId(id.clone()));
        let errors = Arc::clone(&ctx.errors);

        let remote_ip = ctx.remote_addr().map(|a| a.ip().to_string()).unwrap_or_default();
        let uri = match ctx.raw_query() {
            Some(q) => format!("{}?{q}", ctx.path()),
            None => ctx.path().to_owned(),
        };
        let span = info_span!(
            "request",
            id = %id,
            method = %ctx.method(),
            uri = %uri,
            host = ctx.header("host").unwrap_or_default(),
            remote_ip = %remote_ip,
        );

        Box::pin(
            async move {
                let started = Instant::now();
                let result = next.run(ctx).await;
                let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

                let mut res = match result {
                    Ok(res) => {
                        info!(status = res.status_code().as_u16(), latency_ms, "request completed");
                        res
                    }
                    Err(err) => {
                        warn!(status = err.status().as_u16(), latency_ms, error = %err, "request failed");
                        errors(err)
                    }
                };
                res.push_header(REQUEST_ID, &id);
                Ok(res)
            }
            .instrument(span),
        )
    }
}
