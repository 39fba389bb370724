//! Middleware and the sequential chain that runs them.
//!
//! A middleware inspects or mutates the [`RequestContext`] and then either lets
//! the request continue with [`Flow::Next`] or answers it itself with
//! [`Flow::Done`]. Stopping early is an ordinary outcome (an authentication
//! middleware rejecting a request, a parser refusing a malformed body), not an
//! error.
//!
//! The registry runs three chains per request, in order: the global chain, the
//! matched route's chain and the method handler's chain.
//!
//! # Example
//!
//! ```
//! use micro_router::middleware::{middleware_fn, Flow, MiddlewareChain};
//!
//! let mut chain = MiddlewareChain::new();
//! chain.push(middleware_fn(|req| {
//!     Box::pin(async move {
//!         req.response_headers_mut().insert("x-served-by", http::HeaderValue::from_static("micro-router"));
//!         Flow::Next
//!     })
//! }));
//! assert_eq!(chain.len(), 1);
//! ```

mod auth;
mod body;
mod cookie;
mod query;

pub use auth::{Authenticate, Authenticator};
pub use body::BodyParser;
pub use cookie::CookieParser;
pub use query::QueryParser;

use crate::{RequestContext, ResponseBody};
use async_trait::async_trait;
use futures::future::BoxFuture;
use http::Response;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// What the pipeline does after a middleware step.
#[derive(Debug)]
pub enum Flow {
    /// Run the next step.
    Next,
    /// Stop here and send this response.
    Done(Response<ResponseBody>),
}

impl Flow {
    pub fn is_next(&self) -> bool {
        matches!(self, Flow::Next)
    }
}

#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, req: &mut RequestContext) -> Flow;
}

#[async_trait]
impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    async fn handle(&self, req: &mut RequestContext) -> Flow {
        self.as_ref().handle(req).await
    }
}

#[async_trait]
impl<M: Middleware + ?Sized> Middleware for Box<M> {
    async fn handle(&self, req: &mut RequestContext) -> Flow {
        self.as_ref().handle(req).await
    }
}

/// A middleware backed by an async closure.
pub struct FnMiddleware<F> {
    f: F,
}

/// Creates a middleware from a closure returning a boxed future.
///
/// The closure receives the request mutably for the lifetime of its future, so
/// it is written as `|req| Box::pin(async move { ... })`.
pub fn middleware_fn<F>(f: F) -> FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, Flow> + Send + Sync,
{
    FnMiddleware { f }
}

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, Flow> + Send + Sync,
{
    async fn handle(&self, req: &mut RequestContext) -> Flow {
        (self.f)(req).await
    }
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware").finish_non_exhaustive()
    }
}

/// An ordered list of middleware run one after another.
///
/// The chain finishes with [`Flow::Next`] only when every middleware returned
/// `Next`; the first `Done` ends it and the remaining middleware never run. An
/// empty chain finishes immediately. No timeout is applied: a middleware that
/// never completes holds its request forever.
#[derive(Default)]
pub struct MiddlewareChain {
    inner: Vec<Box<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self { inner: vec![] }
    }

    pub fn push<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.inner.push(Box::new(middleware));
        self
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub async fn run(&self, req: &mut RequestContext) -> Flow {
        for (index, middleware) in self.inner.iter().enumerate() {
            if let Flow::Done(response) = middleware.handle(req).await {
                debug!(index, status = %response.status(), path = req.path(), "middleware chain stopped early");
                return Flow::Done(response);
            }
        }
        Flow::Next
    }
}

#[async_trait]
impl Middleware for MiddlewareChain {
    async fn handle(&self, req: &mut RequestContext) -> Flow {
        self.run(req).await
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain").field("len", &self.inner.len()).finish()
    }
}
