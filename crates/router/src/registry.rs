use crate::body::BoxError;
use crate::handler::{HandlerResult, RequestHandler, invoke_terminal};
use crate::middleware::{Flow, Middleware, MiddlewareChain};
use crate::responder::Responder;
use crate::route::Route;
use crate::{RequestContext, ResponseBody};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::HeaderName;
use http::{Request, Response, StatusCode};
use http_body::Body as HttpBody;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use tracing::debug;

static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// The default fallback: `404 not found` as plain text.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotFound;

#[async_trait]
impl RequestHandler for NotFound {
    async fn invoke(&self, req: &mut RequestContext) -> HandlerResult {
        Ok((StatusCode::NOT_FOUND, "404 not found").response_to(req))
    }
}

/// Holds the routes, the global middleware and the fallback handler.
///
/// A registry is filled at startup through `&mut self` and then shared
/// immutably (by reference or in an `Arc`) while requests are dispatched.
///
/// ```
/// use micro_router::{JSend, Registry, handler_fn};
/// use micro_router::middleware::QueryParser;
///
/// let mut registry = Registry::new();
/// registry.add_middleware(QueryParser);
/// registry
///     .route("/api/users/{username}")
///     .get(handler_fn(|req| Box::pin(async move { Ok(JSend::success(req.param("username").map(String::from))) })));
/// assert_eq!(registry.routes().len(), 1);
/// ```
pub struct Registry {
    routes: Vec<Route>,
    middlewares: MiddlewareChain,
    fallback: Box<dyn RequestHandler>,
    trust_forwarded_for: bool,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Returns the route registered with exactly this pattern, creating it when absent.
    pub fn route(&mut self, pattern: &str) -> &mut Route {
        let index = match self.routes.iter().position(|route| route.path() == pattern) {
            Some(index) => index,
            None => {
                self.routes.push(Route::new(pattern));
                self.routes.len() - 1
            }
        };
        &mut self.routes[index]
    }

    /// Returns the route registered with exactly this pattern without creating one.
    pub fn find_route(&mut self, pattern: &str) -> Option<&mut Route> {
        self.routes.iter_mut().find(|route| route.path() == pattern)
    }

    /// The routes in registration order, which is also matching order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Appends a middleware that runs for every request, before route matching.
    pub fn add_middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.middlewares.push(middleware);
        self
    }

    /// Replaces the handler answering requests that no route accepts.
    pub fn set_fallback<H: RequestHandler + 'static>(&mut self, fallback: H) -> &mut Self {
        self.fallback = Box::new(fallback);
        self
    }

    /// Runs a request through the pipeline and returns its response.
    ///
    /// `peer` is the address of the connected client, used as the client
    /// address unless a trusted `X-Forwarded-For` header names another one.
    pub async fn dispatch<B>(&self, request: Request<B>, peer: Option<SocketAddr>) -> Response<ResponseBody>
    where
        B: HttpBody<Data = Bytes> + Send + Sync + 'static,
        B::Error: Into<BoxError>,
    {
        let mut req = RequestContext::new(request);
        let remote_addr = self.client_addr(&req, peer);
        req.set_remote_addr(remote_addr);

        let mut response = self.run(&mut req).await;
        req.apply_response_headers(&mut response);
        response
    }

    async fn run(&self, req: &mut RequestContext) -> Response<ResponseBody> {
        if let Flow::Done(response) = self.middlewares.run(req).await {
            return response;
        }

        let method = req.method().as_str().to_string();
        let matched = self.routes.iter().find_map(|route| {
            let handler = route.resolve(&method)?;
            let params = route.matches(req.segments())?;
            Some((route, handler, params))
        });

        match matched {
            Some((route, handler, params)) => {
                debug!(method = %method, path = req.path(), route = route.path(), "route matched");
                req.set_params(params);
                if let Flow::Done(response) = route.middlewares().run(req).await {
                    return response;
                }
                handler.dispatch(req).await
            }
            None => {
                debug!(method = %method, path = req.path(), "no route matched, using fallback");
                invoke_terminal(self.fallback.as_ref(), req).await
            }
        }
    }

    fn client_addr(&self, req: &RequestContext, peer: Option<SocketAddr>) -> Option<IpAddr> {
        if self.trust_forwarded_for {
            let forwarded = req
                .headers()
                .get(&X_FORWARDED_FOR)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(',').next())
                .and_then(|first| first.trim().parse::<IpAddr>().ok());
            if forwarded.is_some() {
                return forwarded;
            }
        }
        peer.map(|addr| addr.ip())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("routes", &self.routes)
            .field("middlewares", &self.middlewares)
            .field("trust_forwarded_for", &self.trust_forwarded_for)
            .finish_non_exhaustive()
    }
}

pub struct RegistryBuilder {
    fallback: Option<Box<dyn RequestHandler>>,
    trust_forwarded_for: bool,
}

impl RegistryBuilder {
    fn new() -> Self {
        Self { fallback: None, trust_forwarded_for: true }
    }

    /// Whether the first `X-Forwarded-For` entry is taken as the client address. On by default.
    pub fn trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    pub fn fallback(mut self, fallback: impl RequestHandler + 'static) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    pub fn build(self) -> Registry {
        Registry {
            routes: vec![],
            middlewares: MiddlewareChain::new(),
            fallback: self.fallback.unwrap_or_else(|| Box::new(NotFound)),
            trust_forwarded_for: self.trust_forwarded_for,
        }
    }
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("custom_fallback", &self.fallback.is_some())
            .field("trust_forwarded_for", &self.trust_forwarded_for)
            .finish()
    }
}
