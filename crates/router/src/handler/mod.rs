//! Terminal request handlers and the per-method handler variants a route stores.
//!
//! A [`RequestHandler`] produces the response for a request that made it
//! through every middleware chain. A route stores one [`MethodHandler`] per
//! method: either a [`Handler`] (handler-scoped middleware followed by one
//! terminal handler) or a [`SplitHandler`] that picks one of several terminal
//! handlers at request time.

mod split;

pub use split::{FnSplitter, SplitHandler, Splitter, SyncSplitter, splitter_fn, sync_splitter};

use crate::body::BoxError;
use crate::middleware::{Flow, Middleware, MiddlewareChain};
use crate::responder::Responder;
use crate::{RequestContext, ResponseBody, RouteError};
use async_trait::async_trait;
use futures::future::BoxFuture;
use http::Response;
use std::fmt;
use std::marker::PhantomData;
use tracing::error;

pub type HandlerResult = Result<Response<ResponseBody>, BoxError>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, req: &mut RequestContext) -> HandlerResult;
}

#[async_trait]
impl<H: RequestHandler + ?Sized> RequestHandler for Box<H> {
    async fn invoke(&self, req: &mut RequestContext) -> HandlerResult {
        self.as_ref().invoke(req).await
    }
}

/// A handler backed by an async closure whose output is any [`Responder`].
pub struct FnHandler<F, R> {
    f: F,
    _phantom: PhantomData<fn() -> R>,
}

/// Creates a request handler from a closure returning a boxed future.
///
/// ```
/// use micro_router::{JSend, handler_fn};
///
/// let handler = handler_fn(|req| {
///     Box::pin(async move {
///         let name = req.param("username").unwrap_or("anonymous").to_string();
///         Ok(JSend::success(name))
///     })
/// });
/// # let _ = handler;
/// ```
pub fn handler_fn<F, R>(f: F) -> FnHandler<F, R>
where
    F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, Result<R, BoxError>> + Send + Sync,
    R: Responder + Send,
{
    FnHandler { f, _phantom: PhantomData }
}

#[async_trait]
impl<F, R> RequestHandler for FnHandler<F, R>
where
    F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, Result<R, BoxError>> + Send + Sync,
    R: Responder + Send,
{
    async fn invoke(&self, req: &mut RequestContext) -> HandlerResult {
        let responder = (self.f)(req).await?;
        Ok(responder.response_to(req))
    }
}

impl<F, R> fmt::Debug for FnHandler<F, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

/// Runs a terminal handler, turning an escaped error into a 500 response.
pub(crate) async fn invoke_terminal(handler: &dyn RequestHandler, req: &mut RequestContext) -> Response<ResponseBody> {
    match handler.invoke(req).await {
        Ok(response) => response,
        Err(e) => {
            error!(cause = %e, method = %req.method(), path = req.path(), "request handler failed");
            RouteError::handler(e).response_to(req)
        }
    }
}

/// A terminal handler preceded by its own middleware.
pub struct Handler {
    middlewares: MiddlewareChain,
    handler: Box<dyn RequestHandler>,
}

impl Handler {
    pub fn new<H: RequestHandler + 'static>(handler: H) -> Self {
        Self { middlewares: MiddlewareChain::new(), handler: Box::new(handler) }
    }

    /// Appends a middleware that runs right before the terminal handler.
    #[must_use]
    pub fn with<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(middleware);
        self
    }

    pub async fn dispatch(&self, req: &mut RequestContext) -> Response<ResponseBody> {
        if let Flow::Done(response) = self.middlewares.run(req).await {
            return response;
        }
        invoke_terminal(self.handler.as_ref(), req).await
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").field("middlewares", &self.middlewares).finish_non_exhaustive()
    }
}

/// What a route stores for one method.
#[derive(Debug)]
pub enum MethodHandler {
    Direct(Handler),
    Split(SplitHandler),
}

impl MethodHandler {
    pub async fn dispatch(&self, req: &mut RequestContext) -> Response<ResponseBody> {
        match self {
            MethodHandler::Direct(handler) => handler.dispatch(req).await,
            MethodHandler::Split(split) => split.dispatch(req).await,
        }
    }
}

impl From<Handler> for MethodHandler {
    fn from(handler: Handler) -> Self {
        MethodHandler::Direct(handler)
    }
}

impl From<SplitHandler> for MethodHandler {
    fn from(split: SplitHandler) -> Self {
        MethodHandler::Split(split)
    }
}
