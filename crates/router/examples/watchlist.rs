//! A small stock-watchlist API dispatched with in-memory requests.
//!
//! Run with `cargo run -p micro-router --example watchlist`.

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use http::{Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use micro_router::middleware::{Authenticate, Authenticator, BodyParser, CookieParser, QueryParser};
use micro_router::{
    BoxError, CookieOptions, JSend, Redirect, Registry, RequestContext, SameSite, SplitHandler, handler_fn,
    sync_splitter,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone)]
struct User {
    name: String,
}

/// Accepts `Authorization: Bearer <name>` for a fixed set of users.
struct StaticTokens {
    users: Vec<&'static str>,
}

#[async_trait]
impl Authenticator for StaticTokens {
    type Identity = User;
    type Error = (StatusCode, JSend);

    async fn authenticate(&self, req: &RequestContext) -> Result<User, Self::Error> {
        let token = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        match token {
            Some(name) if self.users.contains(&name) => Ok(User { name: name.to_string() }),
            _ => Err((StatusCode::UNAUTHORIZED, JSend::fail(json!({"reason": "unknown token"})))),
        }
    }
}

fn registry() -> Registry {
    let mut registry = Registry::new();
    registry.add_middleware(QueryParser).add_middleware(CookieParser).add_middleware(BodyParser::new().limit(16 * 1024));

    registry.route("/api/quotes/{symbol}").get(handler_fn(|req| {
        Box::pin(async move {
            let symbol = req.param("symbol").unwrap_or_default().to_uppercase();
            let currency = req.query().get("currency").cloned().unwrap_or_else(|| json!("USD"));
            Ok(JSend::success(json!({"symbol": symbol, "price": 187.5, "currency": currency})))
        })
    }));

    let watchlist = registry.route("/api/watchlist");
    watchlist.add_middleware(Authenticate::new(StaticTokens { users: vec!["alice", "bob"] }));
    watchlist.get(handler_fn(|req| {
        Box::pin(async move {
            let user = req.identity::<User>().map(|user| user.name.clone()).unwrap_or_default();
            Ok(JSend::success(json!({"owner": user, "symbols": ["AAPL", "MSFT"]})))
        })
    }));
    watchlist.post(handler_fn(|req| {
        Box::pin(async move {
            match req.payload().get("symbol").and_then(|symbol| symbol.as_str()) {
                Some(symbol) => Ok((StatusCode::CREATED, JSend::success(json!({"added": symbol})))),
                None => Ok((StatusCode::BAD_REQUEST, JSend::fail(json!({"symbol": "is required"})))),
            }
        })
    }));

    // signed-in visitors (session cookie present) land on the dashboard, everyone else on the login page
    let session = SplitHandler::new(sync_splitter(|req| usize::from(req.cookie("session").is_some())))
        .candidate(handler_fn(|req| {
            Box::pin(async move {
                req.set_cookie("visited", "true", &CookieOptions::new().path("/").same_site(SameSite::Lax))?;
                Ok::<_, BoxError>(Redirect::to("/login"))
            })
        }))
        .candidate(handler_fn(|_req| Box::pin(async move { Ok(Redirect::to("/dashboard")) })));
    registry.route("/").add_splitter(["GET", "HEAD"], session);

    registry.route("/logout").all(handler_fn(|req| {
        Box::pin(async move {
            req.set_cookie("session", "", &CookieOptions::expired())?;
            Ok::<_, BoxError>(JSend::empty())
        })
    }));

    registry
}

async fn send(registry: &Registry, request: Request<Full<Bytes>>) -> Result<(), BoxError> {
    let line = format!("{} {}", request.method(), request.uri());
    let response = registry.dispatch(request, None).await;
    let status = response.status();
    let cookies: Vec<_> = response.headers().get_all(SET_COOKIE).iter().filter_map(|v| v.to_str().ok()).collect();
    let cookies = cookies.join(" | ");
    let body = response.into_body().collect().await?.to_bytes();
    info!(%status, cookies = %cookies, body = %String::from_utf8_lossy(&body), "{line}");
    Ok(())
}

fn request(method: Method, uri: &str) -> http::request::Builder {
    Request::builder().method(method).uri(uri)
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let registry = Arc::new(registry());

    send(&registry, request(Method::GET, "/api/quotes/aapl?currency=EUR").body(Full::default())?).await?;
    send(&registry, request(Method::GET, "/api/watchlist").body(Full::default())?).await?;
    send(&registry, request(Method::GET, "/api/watchlist").header(AUTHORIZATION, "Bearer alice").body(Full::default())?)
        .await?;
    send(
        &registry,
        request(Method::POST, "/api/watchlist")
            .header(AUTHORIZATION, "Bearer bob")
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from_static(br#"{"symbol":"NVDA"}"#)))?,
    )
    .await?;
    send(
        &registry,
        request(Method::POST, "/api/watchlist")
            .header(AUTHORIZATION, "Bearer bob")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Full::new(Bytes::from_static(b"symbol=TSLA&shares=10")))?,
    )
    .await?;
    send(&registry, request(Method::GET, "/").body(Full::default())?).await?;
    send(&registry, request(Method::GET, "/").header(COOKIE, "session=s3cr3t").body(Full::default())?).await?;
    send(&registry, request(Method::POST, "/logout").body(Full::default())?).await?;
    send(&registry, request(Method::GET, "/api/quotes?q=%zz").body(Full::default())?).await?;
    send(&registry, request(Method::DELETE, "/api/quotes/aapl").body(Full::default())?).await?;

    Ok(())
}
