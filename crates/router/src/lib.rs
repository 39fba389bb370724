//! Request routing and middleware dispatch on top of the `http` crate types.
//!
//! A [`Registry`] holds URL-pattern [`Route`]s, a global middleware chain and a
//! fallback handler. Dispatching a request runs, in order:
//!
//! 1. the global middleware chain,
//! 2. the first route whose pattern matches the path and which has a handler
//!    for the method (the exact method first, then [`ALL_METHODS`]),
//! 3. that route's middleware chain,
//! 4. the method's [`Handler`] (its own middleware, then the terminal handler)
//!    or [`SplitHandler`] (its own middleware, then the candidate picked by the
//!    splitter).
//!
//! Any middleware may stop the request by answering it with [`Flow::Done`](middleware::Flow::Done).
//! Requests no route accepts go to the fallback, `404 not found` by default.
//!
//! Standard middleware for query strings, cookies, request bodies and
//! authentication lives in [`middleware`]. Responses are built from anything
//! implementing [`Responder`], including the [`JSend`] envelope and [`Redirect`].
//!
//! # Example
//!
//! ```
//! use micro_router::middleware::{CookieParser, QueryParser};
//! use micro_router::{JSend, Registry, handler_fn};
//! use http::{Method, Request, StatusCode};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut registry = Registry::new();
//! registry.add_middleware(QueryParser).add_middleware(CookieParser);
//! registry.route("/api/quotes/{symbol}").get(handler_fn(|req| {
//!     Box::pin(async move {
//!         let symbol = req.param("symbol").unwrap_or_default().to_uppercase();
//!         Ok(JSend::success(symbol))
//!     })
//! }));
//!
//! let request = Request::builder().method(Method::GET).uri("/api/quotes/aapl").body(String::new()).unwrap();
//! let response = registry.dispatch(request, None).await;
//! assert_eq!(response.status(), StatusCode::OK);
//! # }
//! ```

mod body;
mod error;
mod handler;
pub mod middleware;
mod registry;
mod request;
mod responder;
mod route;

pub use body::{BoxError, ReqBody, ResponseBody};
pub use error::RouteError;
pub use handler::{
    FnHandler, FnSplitter, Handler, HandlerResult, MethodHandler, RequestHandler, SplitHandler, Splitter, SyncSplitter,
    handler_fn, splitter_fn, sync_splitter,
};
pub use registry::{NotFound, Registry, RegistryBuilder};
pub use request::{PathParams, RequestContext};
pub use responder::{JSend, Redirect, Responder};
pub use route::{ALL_METHODS, Route};

pub use micro_query::{CookieOptions, EXPIRED_DATE, ParseError, QueryMap, SameSite, build_cookie, parse_cookie, parse_query};
