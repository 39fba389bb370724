use crate::handler::{RequestHandler, invoke_terminal};
use crate::middleware::{Flow, Middleware, MiddlewareChain};
use crate::responder::Responder;
use crate::{RequestContext, ResponseBody, RouteError};
use async_trait::async_trait;
use futures::future::BoxFuture;
use http::Response;
use std::fmt;
use tracing::{debug, error};

/// Chooses which candidate of a [`SplitHandler`] answers a request.
///
/// The returned value is an index into the candidates, in registration order.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Splitter: Send + Sync {
    async fn split(&self, req: &RequestContext) -> usize;
}

pub struct FnSplitter<F> {
    f: F,
}

/// Creates a splitter from an async closure, written as `|req| Box::pin(async move { ... })`.
pub fn splitter_fn<F>(f: F) -> FnSplitter<F>
where
    F: for<'a> Fn(&'a RequestContext) -> BoxFuture<'a, usize> + Send + Sync,
{
    FnSplitter { f }
}

#[async_trait]
impl<F> Splitter for FnSplitter<F>
where
    F: for<'a> Fn(&'a RequestContext) -> BoxFuture<'a, usize> + Send + Sync,
{
    async fn split(&self, req: &RequestContext) -> usize {
        (self.f)(req).await
    }
}

impl<F> fmt::Debug for FnSplitter<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSplitter").finish_non_exhaustive()
    }
}

pub struct SyncSplitter<F> {
    f: F,
}

/// Creates a splitter from a plain function of the request.
pub fn sync_splitter<F>(f: F) -> SyncSplitter<F>
where
    F: Fn(&RequestContext) -> usize + Send + Sync,
{
    SyncSplitter { f }
}

#[async_trait]
impl<F> Splitter for SyncSplitter<F>
where
    F: Fn(&RequestContext) -> usize + Send + Sync,
{
    async fn split(&self, req: &RequestContext) -> usize {
        (self.f)(req)
    }
}

impl<F> fmt::Debug for SyncSplitter<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncSplitter").finish_non_exhaustive()
    }
}

/// Selects one of several terminal handlers per request.
///
/// Dispatch runs the split handler's own middleware, asks the splitter for an
/// index and invokes that candidate. An index outside the candidate list is a
/// server-side defect: it is logged and answered with a 500 JSend error, and
/// no candidate runs.
///
/// A split handler registered under several methods of a route is shared
/// between them.
pub struct SplitHandler {
    splitter: Box<dyn Splitter>,
    candidates: Vec<Box<dyn RequestHandler>>,
    middlewares: MiddlewareChain,
}

impl SplitHandler {
    pub fn new<S: Splitter + 'static>(splitter: S) -> Self {
        Self { splitter: Box::new(splitter), candidates: vec![], middlewares: MiddlewareChain::new() }
    }

    /// Appends a candidate; the first one is selected by index `0`.
    #[must_use]
    pub fn candidate<H: RequestHandler + 'static>(mut self, handler: H) -> Self {
        self.candidates.push(Box::new(handler));
        self
    }

    #[must_use]
    pub fn with<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(middleware);
        self
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub async fn dispatch(&self, req: &mut RequestContext) -> Response<ResponseBody> {
        if let Flow::Done(response) = self.middlewares.run(req).await {
            return response;
        }

        let index = self.splitter.split(req).await;
        match self.candidates.get(index) {
            Some(candidate) => {
                debug!(index, path = req.path(), "splitter selected candidate");
                invoke_terminal(candidate.as_ref(), req).await
            }
            None => {
                let e = RouteError::splitter_out_of_range(index, self.candidates.len());
                error!(cause = %e, method = %req.method(), path = req.path(), "invalid splitter result");
                e.response_to(req)
            }
        }
    }
}

impl fmt::Debug for SplitHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitHandler")
            .field("candidates", &self.candidates.len())
            .field("middlewares", &self.middlewares)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{MockSplitter, SplitHandler, splitter_fn, sync_splitter};
    use crate::RequestContext;
    use crate::handler::{MockRequestHandler, handler_fn};
    use crate::middleware::{Flow, middleware_fn};
    use crate::responder::Responder;
    use bytes::Bytes;
    use http::header::COOKIE;
    use http::{Request, Response, StatusCode};
    use http_body_util::{BodyExt, Empty};
    use serde_json::{Value, json};

    fn ctx() -> RequestContext {
        RequestContext::new(Request::builder().uri("/").header(COOKIE, "auth-token=t1").body(Empty::<Bytes>::new()).unwrap())
    }

    fn answering(status: StatusCode) -> MockRequestHandler {
        let mut handler = MockRequestHandler::new();
        handler.expect_invoke().times(1).returning(move |_| {
            let mut response = Response::new(().into());
            *response.status_mut() = status;
            Ok(response)
        });
        handler
    }

    fn unused() -> MockRequestHandler {
        let mut handler = MockRequestHandler::new();
        handler.expect_invoke().never();
        handler
    }

    #[tokio::test]
    async fn test_selects_candidate_by_index() {
        let split = SplitHandler::new(sync_splitter(|req| usize::from(req.headers().contains_key(COOKIE))))
            .candidate(unused())
            .candidate(answering(StatusCode::ACCEPTED));

        assert_eq!(split.len(), 2);
        assert_eq!(split.dispatch(&mut ctx()).await.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_async_splitter() {
        let split = SplitHandler::new(splitter_fn(|req| Box::pin(async move { req.segments().len() })))
            .candidate(answering(StatusCode::NO_CONTENT))
            .candidate(unused());

        assert_eq!(split.dispatch(&mut ctx()).await.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_index_out_of_range_invokes_no_candidate() {
        let mut splitter = MockSplitter::new();
        splitter.expect_split().times(1).return_const(2_usize);

        let split = SplitHandler::new(splitter).candidate(unused()).candidate(unused());

        let response = split.dispatch(&mut ctx()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, json!({"status": "error", "message": "internal server error"}));
    }

    #[tokio::test]
    async fn test_middleware_stop_skips_splitter() {
        let mut splitter = MockSplitter::new();
        splitter.expect_split().never();

        let split = SplitHandler::new(splitter)
            .candidate(unused())
            .with(middleware_fn(|req| {
                Box::pin(async move { Flow::Done((StatusCode::FORBIDDEN, "forbidden").response_to(req)) })
            }));

        assert_eq!(split.dispatch(&mut ctx()).await.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_candidate_sees_middleware_state() {
        let split = SplitHandler::new(sync_splitter(|req| usize::from(req.extensions().get::<bool>().copied().unwrap_or(false))))
            .candidate(handler_fn(|_req| Box::pin(async move { Ok("anonymous") })))
            .candidate(handler_fn(|_req| Box::pin(async move { Ok("member") })))
            .with(middleware_fn(|req| {
                Box::pin(async move {
                    req.extensions_mut().insert(true);
                    Flow::Next
                })
            }));

        let body = split.dispatch(&mut ctx()).await.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, Bytes::from_static(b"member"));
    }
}
