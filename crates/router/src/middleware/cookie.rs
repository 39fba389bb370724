use crate::middleware::{Flow, Middleware};
use crate::responder::Responder;
use crate::{RequestContext, RouteError};
use async_trait::async_trait;
use http::header::COOKIE;
use micro_query::{QueryMap, parse_cookie};
use tracing::warn;

/// Parses the `Cookie` header into [`RequestContext::cookies`].
///
/// Each `Cookie` header is handed to the cookie codec as sent, and the maps
/// are merged with later headers winning. A missing header leaves the map
/// empty; a malformed or non-ascii one is answered with 400.
#[derive(Debug, Default, Clone, Copy)]
pub struct CookieParser;

impl CookieParser {
    fn parse_headers(req: &RequestContext) -> Result<QueryMap, RouteError> {
        let mut cookies = QueryMap::new();
        for value in req.headers().get_all(COOKIE) {
            let header = value.to_str().map_err(|e| RouteError::invalid_header(format!("cookie: {e}")))?;
            cookies.extend(parse_cookie(header).map_err(|e| RouteError::syntax("cookie", e))?);
        }
        Ok(cookies)
    }
}

#[async_trait]
impl Middleware for CookieParser {
    async fn handle(&self, req: &mut RequestContext) -> Flow {
        match Self::parse_headers(req) {
            Ok(cookies) => {
                req.set_cookies(cookies);
                Flow::Next
            }
            Err(e) => {
                warn!(cause = %e, path = req.path(), "malformed cookie header");
                Flow::Done(e.response_to(req))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::RequestContext;
    use crate::middleware::{CookieParser, Flow, Middleware};
    use bytes::Bytes;
    use http::header::COOKIE;
    use http::{Request, StatusCode};
    use http_body_util::Empty;
    use serde_json::json;

    fn ctx(cookies: &[&str]) -> RequestContext {
        let mut builder = Request::builder().uri("/");
        for cookie in cookies {
            builder = builder.header(COOKIE, *cookie);
        }
        RequestContext::new(builder.body(Empty::<Bytes>::new()).unwrap())
    }

    #[tokio::test]
    async fn test_parse_cookies() {
        let mut req = ctx(&["x=1; y=true;"]);
        assert!(CookieParser.handle(&mut req).await.is_next());
        assert_eq!(req.cookie("x"), Some(&json!(1)));
        assert_eq!(req.cookie("y"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn test_multiple_cookie_headers() {
        let mut req = ctx(&["sid=abc;", "theme=dark"]);
        assert!(CookieParser.handle(&mut req).await.is_next());
        assert_eq!(req.cookies().len(), 2);
        assert_eq!(req.cookie("sid"), Some(&json!("abc")));
        assert_eq!(req.cookie("theme"), Some(&json!("dark")));
    }

    #[tokio::test]
    async fn test_no_cookie_header() {
        let mut req = ctx(&[]);
        assert!(CookieParser.handle(&mut req).await.is_next());
        assert!(req.cookies().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_cookie_header() {
        let mut req = ctx(&["=bad"]);
        match CookieParser.handle(&mut req).await {
            Flow::Done(response) => assert_eq!(response.status(), StatusCode::BAD_REQUEST),
            Flow::Next => panic!("malformed cookie should stop the chain"),
        }
        assert!(req.cookies().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_trailing_separator_is_rejected() {
        for header in ["x=1;;", "x=1; ;"] {
            let mut req = ctx(&[header]);
            match CookieParser.handle(&mut req).await {
                Flow::Done(response) => assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{header}"),
                Flow::Next => panic!("{header} should stop the chain"),
            }
        }
    }

    #[tokio::test]
    async fn test_later_cookie_header_wins() {
        let mut req = ctx(&["theme=light; sid=abc", "theme=dark"]);
        assert!(CookieParser.handle(&mut req).await.is_next());
        assert_eq!(req.cookie("theme"), Some(&json!("dark")));
        assert_eq!(req.cookie("sid"), Some(&json!("abc")));
    }
}
