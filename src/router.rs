//! Request router.
//!
//! One table per HTTP method. Literal and `:named` routes live in a `matchit`
//! radix tree (O(path-length) lookup, literal segments win over parameters);
//! `*` wildcard routes live in a short list consulted when the tree misses,
//! longest prefix first and literal before parameter. Build the router once at startup, then hand it to
//! [`Server::serve`](crate::Server::serve); it is read-only from then on.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use futures_util::FutureExt;
use matchit::{InsertError, Router as MatchitRouter};
use tracing::error;

use crate::context::Context;
use crate::error::{Error, ErrorHandler, default_handler};
use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::middleware::{Chain, Endpoint, Middleware, Next};
use crate::pattern::Pattern;
use crate::render::{NoRenderer, Renderer};
use crate::response::Response;

#[derive(Clone)]
struct Route {
    pattern: Pattern,
    handler: BoxedHandler,
}

#[derive(Default)]
struct Table {
    tree: MatchitRouter<Route>,
    wildcards: Vec<Route>,
}

impl Table {
    fn insert(&mut self, route: Route) -> Result<(), Error> {
        if route.pattern.is_wildcard() {
            if let Some(existing) = self.wildcards.iter().find(|r| r.pattern.same_shape(&route.pattern)) {
                return Err(Error::Conflict {
                    pattern: route.pattern.source().to_string(),
                    existing: existing.pattern.source().to_string(),
                });
            }
            // Most specific first; equally specific patterns stay in registration order.
            let at = self
                .wildcards
                .iter()
                .position(|r| route.pattern.specificity(&r.pattern).is_lt())
                .unwrap_or(self.wildcards.len());
            self.wildcards.insert(at, route);
            return Ok(());
        }

        let pattern = route.pattern.source().to_string();
        self.tree.insert(route.pattern.to_tree_path(), route).map_err(|e| match e {
            InsertError::Conflict { with } => Error::Conflict { pattern, existing: with },
            other => Error::InvalidRoute { pattern, reason: other.to_string() },
        })
    }

    /// Raw (still percent-encoded) parameters of the best match.
    fn find(&self, path: &str) -> Option<(&Route, Vec<(String, String)>)> {
        if let Ok(matched) = self.tree.at(path) {
            let params = matched.params.iter().map(|(k, v)| (k.to_owned(), v.to_owned())).collect();
            return Some((matched.value, params));
        }
        self.wildcards
            .iter()
            .find_map(|route| route.pattern.match_wildcard(path).map(|params| (route, params)))
    }
}

/// Named routes, for building paths back from a route name.
#[derive(Clone, Default)]
pub struct Routes(HashMap<String, Pattern>);

impl Routes {
    /// Fills the named route's parameters (and wildcard) in order.
    pub fn reverse(&self, name: &str, values: &[&str]) -> Option<String> {
        self.0.get(name)?.reverse(values)
    }
}

/// The result of resolving a method + path pair.
pub struct Resolved {
    route: Arc<str>,
    params: HashMap<String, String>,
    handler: BoxedHandler,
}

impl Resolved {
    /// The matched pattern, e.g. `/users/:id`.
    pub fn route(&self) -> &str { &self.route }

    /// Percent-decoded parameters; a wildcard remainder is stored under `*`.
    pub fn params(&self) -> &HashMap<String, String> { &self.params }
}

/// The application router.
///
/// Each registration method returns `self` so registrations chain:
///
/// ```rust
/// use vireo::{Context, Router};
///
/// async fn get_user(ctx: Context) -> String {
///     ctx.param("id").unwrap_or_default().to_owned()
/// }
/// async fn any_user(_: Context) -> &'static str { "any!!" }
///
/// let app = Router::new()
///     .get("/users/:id", get_user)
///     .any("/users/*", any_user);
/// ```
pub struct Router {
    routes: HashMap<Method, Table>,
    middleware: Chain,
    renderer: Arc<dyn Renderer>,
    named: Arc<Routes>,
    errors: ErrorHandler,
    last: Option<Pattern>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            middleware: Arc::default(),
            renderer: Arc::new(NoRenderer),
            named: Arc::default(),
            errors: Arc::new(default_handler),
            last: None,
        }
    }

    // ── Registration ─────────────────────────────────────────────────────────

    /// Registers `handler` for `method` + `pattern`.
    ///
    /// Fails with [`Error::Conflict`] when the same (or an equally shaped)
    /// pattern is already registered for the method, and with
    /// [`Error::InvalidRoute`] when the pattern is malformed.
    pub fn route(&mut self, method: Method, pattern: &str, handler: impl Handler) -> Result<(), Error> {
        self.insert(&[method], pattern, handler.into_boxed_handler())
    }

    fn insert(&mut self, methods: &[Method], pattern: &str, handler: BoxedHandler) -> Result<(), Error> {
        let pattern = Pattern::parse(pattern)?;
        for method in methods {
            let route = Route { pattern: pattern.clone(), handler: Arc::clone(&handler) };
            self.routes.entry(*method).or_default().insert(route)?;
        }
        self.last = Some(pattern);
        Ok(())
    }

    /// Register a handler for a method + pattern pair. Returns `self` for chaining.
    ///
    /// # Panics
    ///
    /// Panics on a conflicting or malformed pattern. Routes are registered
    /// once at startup, so this surfaces as a startup failure. Use
    /// [`Router::route`] to handle the error instead.
    pub fn on(mut self, method: Method, pattern: &str, handler: impl Handler) -> Self {
        if let Err(e) = self.route(method, pattern, handler) {
            panic!("{e}");
        }
        self
    }

    pub fn get(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Get, pattern, handler)
    }

    pub fn post(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Post, pattern, handler)
    }

    pub fn put(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Put, pattern, handler)
    }

    pub fn delete(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Delete, pattern, handler)
    }

    /// Registers `handler` for every method in [`Method::ALL`].
    pub fn any(mut self, pattern: &str, handler: impl Handler) -> Self {
        if let Err(e) = self.insert(&Method::ALL, pattern, handler.into_boxed_handler()) {
            panic!("{e}");
        }
        self
    }

    /// Names the most recently registered route for [`Router::reverse`].
    pub fn named(mut self, name: &str) -> Self {
        if let Some(pattern) = self.last.clone() {
            Arc::make_mut(&mut self.named).0.insert(name.to_owned(), pattern);
        }
        self
    }

    /// Serves files under `dir` for `GET prefix/*`.
    ///
    /// Literal and parameter routes under the same prefix still take
    /// precedence. Paths escaping `dir` (`..`) are answered with 404.
    pub fn static_files(self, prefix: &str, dir: impl Into<PathBuf>) -> Self {
        let dir = Arc::new(dir.into());
        let pattern = format!("{}/*", prefix.trim_end_matches('/'));
        self.get(&pattern, move |ctx: Context| {
            let dir = Arc::clone(&dir);
            async move { crate::fs::serve(&dir, ctx.wildcard().unwrap_or_default()).await }
        })
    }

    /// Appends a middleware layer. The first one added is the outermost.
    pub fn with(mut self, layer: impl Middleware) -> Self {
        Arc::make_mut(&mut self.middleware).push(Arc::new(layer));
        self
    }

    /// Installs the renderer used by [`Template`](crate::Template) responses.
    pub fn renderer(mut self, renderer: impl Renderer) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }

    /// Replaces the error-to-response mapping used by [`Router::dispatch`].
    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(Error) -> Response + Send + Sync + 'static,
    {
        self.errors = Arc::new(handler);
        self
    }

    // ── Lookup ───────────────────────────────────────────────────────────────

    /// Rebuilds the path of a named route, filling its parameters in order.
    pub fn reverse(&self, name: &str, values: &[&str]) -> Option<String> {
        self.named.reverse(name, values)
    }

    /// The named routes, as handed to the [`Renderer`].
    pub fn routes(&self) -> &Routes {
        &self.named
    }

    /// Resolves `method` + `path` to a route.
    ///
    /// Returns [`Error::MethodNotAllowed`] when the path is routed for other
    /// methods only, [`Error::NotFound`] when it is not routed at all, and
    /// [`Error::Bind`] when a parameter does not decode to UTF-8.
    pub fn resolve(&self, method: Method, path: &str) -> Result<Resolved, Error> {
        let Some((route, raw)) = self.routes.get(&method).and_then(|t| t.find(path)) else {
            let allowed = self.allowed(path);
            return Err(if allowed.is_empty() {
                Error::NotFound { method: method.to_string(), path: path.to_owned() }
            } else {
                Error::MethodNotAllowed { method: method.to_string(), path: path.to_owned(), allowed }
            });
        };

        let mut params = HashMap::with_capacity(raw.len());
        for (name, value) in raw {
            let decoded = urlencoding::decode(&value)
                .map_err(|_| Error::Bind(format!("parameter `{name}` is not valid UTF-8")))?;
            params.insert(name, decoded.into_owned());
        }

        Ok(Resolved {
            route: Arc::clone(route.pattern.source()),
            params,
            handler: Arc::clone(&route.handler),
        })
    }

    /// Methods that have a route matching `path`, sorted.
    pub fn allowed(&self, path: &str) -> Vec<Method> {
        let mut allowed: Vec<Method> = self
            .routes
            .iter()
            .filter(|(_, table)| table.find(path).is_some())
            .map(|(method, _)| *method)
            .collect();
        allowed.sort();
        allowed
    }

    // ── Dispatch ─────────────────────────────────────────────────────────────

    /// Routes `ctx` and runs the middleware chain and the handler.
    ///
    /// Errors are returned as is; [`Router::dispatch`] is the boundary that
    /// maps them to responses.
    pub async fn call(&self, mut ctx: Context) -> Result<Response, Error> {
        ctx.attach(Arc::clone(&self.renderer), Arc::clone(&self.named), Arc::clone(&self.errors));

        let endpoint = match self.resolve(ctx.method(), ctx.path()) {
            Ok(resolved) => {
                ctx.set_route(resolved.route, resolved.params);
                Endpoint::Handler(resolved.handler)
            }
            Err(err) => Endpoint::Fail(err),
        };

        Next::new(Arc::clone(&self.middleware), endpoint).run(ctx).await
    }

    /// Handles one request end to end. Never fails: errors, including a
    /// panicking handler, go through the error handler.
    pub async fn dispatch(&self, ctx: Context) -> Response {
        match AssertUnwindSafe(self.call(ctx)).catch_unwind().await {
            Ok(Ok(res)) => res,
            Ok(Err(err)) => self.handle_error(err),
            Err(_) => {
                error!("handler panicked");
                self.handle_error(Error::Internal("handler panicked".to_owned()))
            }
        }
    }

    /// Maps an error raised outside [`Router::call`] (e.g. by the transport).
    pub fn handle_error(&self, err: Error) -> Response {
        (self.errors)(err)
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
