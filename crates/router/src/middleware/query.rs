use crate::middleware::{Flow, Middleware};
use crate::responder::Responder;
use crate::{RequestContext, RouteError};
use async_trait::async_trait;
use micro_query::parse_query;
use tracing::warn;

/// Parses the query string into [`RequestContext::query`], converting values.
///
/// A malformed query string is answered with 400.
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryParser;

#[async_trait]
impl Middleware for QueryParser {
    async fn handle(&self, req: &mut RequestContext) -> Flow {
        let raw = req.uri().query().unwrap_or_default();
        match parse_query(raw, true) {
            Ok(query) => {
                req.set_query(query);
                Flow::Next
            }
            Err(e) => {
                warn!(cause = %e, path = req.path(), "malformed query string");
                Flow::Done(RouteError::syntax("query", e).response_to(req))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::RequestContext;
    use crate::middleware::{Flow, Middleware, QueryParser};
    use bytes::Bytes;
    use http::{Request, StatusCode};
    use http_body_util::Empty;
    use serde_json::json;

    fn ctx(uri: &str) -> RequestContext {
        RequestContext::new(Request::builder().uri(uri).body(Empty::<Bytes>::new()).unwrap())
    }

    #[tokio::test]
    async fn test_parse_query() {
        let mut req = ctx("/search?q=rust&page=2&exact=false");
        assert!(QueryParser.handle(&mut req).await.is_next());
        assert_eq!(req.query().get("q"), Some(&json!("rust")));
        assert_eq!(req.query().get("page"), Some(&json!(2)));
        assert_eq!(req.query().get("exact"), Some(&json!(false)));
    }

    #[tokio::test]
    async fn test_no_query() {
        let mut req = ctx("/search");
        assert!(QueryParser.handle(&mut req).await.is_next());
        assert!(req.query().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_query() {
        let mut req = ctx("/search?q=%2");
        match QueryParser.handle(&mut req).await {
            Flow::Done(response) => assert_eq!(response.status(), StatusCode::BAD_REQUEST),
            Flow::Next => panic!("malformed query should stop the chain"),
        }
    }
}
