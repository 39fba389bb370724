use crate::handler::{Handler, MethodHandler, RequestHandler, SplitHandler};
use crate::middleware::{Middleware, MiddlewareChain};
use crate::request::PathParams;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Method key consulted when a route has no handler for the exact method.
///
/// Dispatch falls back to this key on its own, so a route never needs to
/// register a method twice to serve it through a catch-all handler. A plain
/// exact-key lookup without the fallback is [`Route::handler_for`].
pub const ALL_METHODS: &str = "ALL";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Wildcard,
}

impl Segment {
    fn parse(raw: &str) -> Self {
        if raw == "*" {
            Segment::Wildcard
        } else if let Some(name) = raw.strip_prefix('{').and_then(|rest| rest.strip_suffix('}')) {
            Segment::Param(name.to_string())
        } else {
            Segment::Literal(raw.to_string())
        }
    }
}

/// A URL pattern with its per-method handlers and route-scoped middleware.
///
/// Patterns are split into non-empty `/`-separated segments:
/// - `{name}` matches any single segment and binds it as path parameter `name`
/// - `*` matches the rest of the path, zero or more segments
/// - anything else must equal the request segment exactly
///
/// Without a `*` the segment counts must be equal, so `/api/users` matches
/// neither `/api` nor `/api/users/alice`.
pub struct Route {
    path: String,
    pattern: Vec<Segment>,
    handlers: HashMap<String, Arc<MethodHandler>>,
    middlewares: MiddlewareChain,
}

impl Route {
    pub(crate) fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let pattern = path.split('/').filter(|segment| !segment.is_empty()).map(Segment::parse).collect();
        Self { path, pattern, handlers: HashMap::new(), middlewares: MiddlewareChain::new() }
    }

    /// The pattern this route was registered with.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Registers `handler` for `method`, replacing any previous handler for it.
    ///
    /// The method is case-insensitive; [`ALL_METHODS`] registers the catch-all.
    pub fn add_handler(&mut self, method: &str, handler: Handler) -> &mut Self {
        self.handlers.insert(method.to_ascii_uppercase(), Arc::new(handler.into()));
        self
    }

    pub fn get<H: RequestHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.add_handler("GET", Handler::new(handler))
    }

    pub fn post<H: RequestHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.add_handler("POST", Handler::new(handler))
    }

    pub fn put<H: RequestHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.add_handler("PUT", Handler::new(handler))
    }

    pub fn patch<H: RequestHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.add_handler("PATCH", Handler::new(handler))
    }

    pub fn delete<H: RequestHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.add_handler("DELETE", Handler::new(handler))
    }

    pub fn all<H: RequestHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.add_handler(ALL_METHODS, Handler::new(handler))
    }

    /// Registers one split handler under every listed method.
    pub fn add_splitter<I, M>(&mut self, methods: I, split: SplitHandler) -> &mut Self
    where
        I: IntoIterator<Item = M>,
        M: AsRef<str>,
    {
        let shared = Arc::new(MethodHandler::from(split));
        for method in methods {
            self.handlers.insert(method.as_ref().to_ascii_uppercase(), Arc::clone(&shared));
        }
        self
    }

    /// Appends a middleware that runs after the global chain and before the method handler.
    pub fn add_middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.middlewares.push(middleware);
        self
    }

    pub(crate) fn middlewares(&self) -> &MiddlewareChain {
        &self.middlewares
    }

    /// The handler registered for exactly this method, without the `ALL` fallback.
    pub fn handler_for(&self, method: &str) -> Option<&MethodHandler> {
        self.handlers.get(&method.to_ascii_uppercase()).map(Arc::as_ref)
    }

    /// The handler answering `method`: the exact registration first, then `ALL`.
    pub fn resolve(&self, method: &str) -> Option<&MethodHandler> {
        self.handler_for(method).or_else(|| self.handlers.get(ALL_METHODS).map(Arc::as_ref))
    }

    /// Matches the request path segments, returning the bound parameters on success.
    pub fn matches(&self, segments: &[String]) -> Option<PathParams> {
        let mut params = PathParams::empty();
        let mut remaining = segments.iter();

        for segment in &self.pattern {
            match segment {
                Segment::Wildcard => return Some(params),
                Segment::Param(name) => params.push(name, remaining.next()?),
                Segment::Literal(literal) => {
                    if remaining.next()? != literal {
                        return None;
                    }
                }
            }
        }

        remaining.next().is_none().then_some(params)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<_> = self.handlers.keys().collect();
        methods.sort();
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("methods", &methods)
            .field("middlewares", &self.middlewares)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{ALL_METHODS, Route, Segment};
    use crate::handler::{Handler, MethodHandler, SplitHandler, handler_fn, sync_splitter};

    fn segments(path: &str) -> Vec<String> {
        path.split('/').filter(|s| !s.is_empty()).map(String::from).collect()
    }

    fn ok_handler() -> Handler {
        Handler::new(handler_fn(|_req| Box::pin(async move { Ok("ok") })))
    }

    #[test]
    fn test_parse_segment() {
        assert_eq!(Segment::parse("*"), Segment::Wildcard);
        assert_eq!(Segment::parse("{id}"), Segment::Param("id".into()));
        assert_eq!(Segment::parse("{id"), Segment::Literal("{id".into()));
        assert_eq!(Segment::parse("users"), Segment::Literal("users".into()));
    }

    #[test]
    fn test_param_binding() {
        let route = Route::new("/api/users/{username}");

        let params = route.matches(&segments("/api/users/alice")).unwrap();
        assert_eq!(params.get("username"), Some("alice"));
        assert_eq!(params.len(), 1);

        assert!(route.matches(&segments("/api/users")).is_none());
        assert!(route.matches(&segments("/api/users/alice/extra")).is_none());
        assert!(route.matches(&segments("/api/groups/alice")).is_none());
    }

    #[test]
    fn test_wildcard() {
        let route = Route::new("/files/*");

        let params = route.matches(&segments("/files/a/b/c")).unwrap();
        assert!(params.is_empty());
        assert!(route.matches(&segments("/files")).is_some());
        assert!(route.matches(&segments("/other/a")).is_none());
    }

    #[test]
    fn test_literal_and_root() {
        let route = Route::new("/api/watchlist");
        assert!(route.matches(&segments("/api/watchlist")).is_some());
        assert!(route.matches(&segments("/api//watchlist/")).is_some());
        assert!(route.matches(&segments("/api")).is_none());

        let root = Route::new("/");
        assert!(root.matches(&segments("/")).is_some());
        assert!(root.matches(&segments("/api")).is_none());
    }

    #[test]
    fn test_resolve_prefers_exact_method() {
        let mut route = Route::new("/api/quotes");
        route.all(handler_fn(|_req| Box::pin(async move { Ok("all") })));
        assert!(route.resolve("GET").is_some());
        assert!(route.handler_for("GET").is_none());

        route.add_handler("get", ok_handler());
        assert!(route.handler_for("GET").is_some());
        assert!(route.handler_for(ALL_METHODS).is_some());
        assert!(std::ptr::eq(route.resolve("GET").unwrap(), route.handler_for("GET").unwrap()));
    }

    #[test]
    fn test_reregistration_overwrites() {
        let mut route = Route::new("/api/quotes");
        route.add_handler("POST", ok_handler());
        route.add_handler("POST", ok_handler().with(crate::middleware::QueryParser));

        match route.handler_for("POST") {
            Some(MethodHandler::Direct(handler)) => assert!(format!("{handler:?}").contains("len: 1")),
            other => panic!("unexpected handler: {other:?}"),
        }
    }

    #[test]
    fn test_add_splitter_shares_handler() {
        let mut route = Route::new("/api/session");
        let split = SplitHandler::new(sync_splitter(|_req| 0)).candidate(handler_fn(|_req| Box::pin(async move { Ok("ok") })));
        route.add_splitter(["get", "POST"], split);

        let get = route.handler_for("GET").unwrap();
        let post = route.handler_for("POST").unwrap();
        assert!(matches!(get, MethodHandler::Split(_)));
        assert!(std::ptr::eq(get, post));
        assert!(route.handler_for("DELETE").is_none());
    }
}
