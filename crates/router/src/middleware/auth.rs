use crate::RequestContext;
use crate::middleware::{Flow, Middleware};
use crate::responder::Responder;
use async_trait::async_trait;
use tracing::debug;

/// Resolves the caller of a request.
///
/// On success the identity is stored in the request extensions, where later
/// steps read it with [`RequestContext::identity`]. On failure the error is
/// sent as the response, so an authenticator decides how a rejection looks
/// (a 401 envelope, a [`Redirect`](crate::Redirect) to a login page, ...).
#[async_trait]
pub trait Authenticator: Send + Sync {
    type Identity: Clone + Send + Sync + 'static;
    type Error: Responder + Send;

    async fn authenticate(&self, req: &RequestContext) -> Result<Self::Identity, Self::Error>;
}

/// Middleware running an [`Authenticator`] and stopping the pipeline when it rejects.
#[derive(Debug, Clone)]
pub struct Authenticate<A> {
    authenticator: A,
}

impl<A: Authenticator> Authenticate<A> {
    pub fn new(authenticator: A) -> Self {
        Self { authenticator }
    }
}

#[async_trait]
impl<A: Authenticator> Middleware for Authenticate<A> {
    async fn handle(&self, req: &mut RequestContext) -> Flow {
        match self.authenticator.authenticate(req).await {
            Ok(identity) => {
                req.extensions_mut().insert(identity);
                Flow::Next
            }
            Err(e) => {
                debug!(path = req.path(), "request rejected by authenticator");
                Flow::Done(e.response_to(req))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::middleware::{Authenticate, Authenticator, Flow, Middleware};
    use crate::{JSend, Redirect, RequestContext};
    use async_trait::async_trait;
    use bytes::Bytes;
    use http::header::{AUTHORIZATION, LOCATION};
    use http::{Request, StatusCode};
    use http_body_util::Empty;

    #[derive(Debug, Clone, PartialEq)]
    struct User {
        name: String,
    }

    struct BearerToken;

    #[async_trait]
    impl Authenticator for BearerToken {
        type Identity = User;
        type Error = (StatusCode, JSend);

        async fn authenticate(&self, req: &RequestContext) -> Result<User, Self::Error> {
            let token = req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok());
            match token {
                Some("Bearer alice-token") => Ok(User { name: "alice".into() }),
                _ => Err((StatusCode::UNAUTHORIZED, JSend::fail("unknown token".into()))),
            }
        }
    }

    struct LoginPage;

    #[async_trait]
    impl Authenticator for LoginPage {
        type Identity = User;
        type Error = Redirect;

        async fn authenticate(&self, _req: &RequestContext) -> Result<User, Redirect> {
            Err(Redirect::to("/login"))
        }
    }

    fn ctx(token: Option<&str>) -> RequestContext {
        let mut builder = Request::builder().uri("/api/watchlist");
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, token);
        }
        RequestContext::new(builder.body(Empty::<Bytes>::new()).unwrap())
    }

    #[tokio::test]
    async fn test_identity_is_stored() {
        let mut req = ctx(Some("Bearer alice-token"));
        assert!(Authenticate::new(BearerToken).handle(&mut req).await.is_next());
        assert_eq!(req.identity::<User>(), Some(&User { name: "alice".into() }));
    }

    #[tokio::test]
    async fn test_rejection_stops_the_pipeline() {
        let mut req = ctx(Some("Bearer stolen"));
        match Authenticate::new(BearerToken).handle(&mut req).await {
            Flow::Done(response) => assert_eq!(response.status(), StatusCode::UNAUTHORIZED),
            Flow::Next => panic!("unknown token must be rejected"),
        }
        assert_eq!(req.identity::<User>(), None);
    }

    #[tokio::test]
    async fn test_rejection_as_redirect() {
        let mut req = ctx(None);
        match Authenticate::new(LoginPage).handle(&mut req).await {
            Flow::Done(response) => {
                assert_eq!(response.status(), StatusCode::FOUND);
                assert_eq!(response.headers()[LOCATION], "/login");
            }
            Flow::Next => panic!("login page authenticator always redirects"),
        }
    }
}
