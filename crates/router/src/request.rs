//! Per-request state shared by middleware, splitters and handlers.
//!
//! This module contains the core types for working with a request while it is dispatched:
//! - `RequestContext`: the request head, the unread body and everything derived from them
//! - `PathParams`: placeholder values bound while matching a route pattern

use crate::body::{BoxError, ReqBody};
use bytes::Bytes;
use http::header::{InvalidHeaderValue, SET_COOKIE};
use http::{Extensions, HeaderMap, HeaderValue, Method, Request, Response, Uri, Version};
use http_body::Body as HttpBody;
use micro_query::{CookieOptions, QueryMap, build_cookie};
use serde_json::Value;
use std::net::IpAddr;

/// Represents one request while it travels through the middleware pipeline.
///
/// The context is created by the registry when dispatch starts and dropped once
/// the response has been produced. Derived fields start out empty and are
/// filled in by the registry (client address, path segments, route parameters)
/// or by middleware (query, cookies, body, identity).
#[derive(Debug)]
pub struct RequestContext {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Option<ReqBody>,
    segments: Vec<String>,
    params: PathParams,
    query: QueryMap,
    cookies: QueryMap,
    payload: Value,
    remote_addr: Option<IpAddr>,
    extensions: Extensions,
    response_headers: HeaderMap,
}

impl RequestContext {
    /// Creates a context from a request, splitting the path into its non-empty segments.
    pub fn new<B>(request: Request<B>) -> Self
    where
        B: HttpBody<Data = Bytes> + Send + Sync + 'static,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = request.into_parts();
        let segments = split_segments(parts.uri.path());

        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body: Some(ReqBody::new(body)),
            segments,
            params: PathParams::empty(),
            query: QueryMap::new(),
            cookies: QueryMap::new(),
            payload: Value::Object(serde_json::Map::new()),
            remote_addr: None,
            extensions: parts.extensions,
            response_headers: HeaderMap::new(),
        }
    }

    /// Returns the HTTP method of the request
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the URI of the request
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the raw path of the request, without the query
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Returns the HTTP version of the request
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns the HTTP headers of the request
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Takes the unread body. Returns `None` once a middleware has consumed it.
    pub fn take_body(&mut self) -> Option<ReqBody> {
        self.body.take()
    }

    /// The non-empty `/`-separated segments of the path, not percent-decoded.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns the placeholder values bound by the matched route
    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// Shorthand for `self.params().get(name)`
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub(crate) fn set_params(&mut self, params: PathParams) {
        self.params = params;
    }

    /// The parsed query string, empty until a query middleware ran.
    pub fn query(&self) -> &QueryMap {
        &self.query
    }

    pub fn set_query(&mut self, query: QueryMap) {
        self.query = query;
    }

    /// The parsed `Cookie` header, empty until a cookie middleware ran.
    pub fn cookies(&self) -> &QueryMap {
        &self.cookies
    }

    pub fn cookie(&self, name: &str) -> Option<&Value> {
        self.cookies.get(name)
    }

    pub fn set_cookies(&mut self, cookies: QueryMap) {
        self.cookies = cookies;
    }

    /// The decoded request body, an empty object until a body middleware ran.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn set_payload(&mut self, payload: Value) {
        self.payload = payload;
    }

    /// The client address: the first `X-Forwarded-For` entry when trusted, else the peer.
    pub fn remote_addr(&self) -> Option<IpAddr> {
        self.remote_addr
    }

    pub(crate) fn set_remote_addr(&mut self, remote_addr: Option<IpAddr>) {
        self.remote_addr = remote_addr;
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Returns the identity an authentication middleware stored for this request.
    pub fn identity<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    /// Headers merged into whatever response ends up being sent for this request.
    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    pub fn response_headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.response_headers
    }

    /// Queues a `Set-Cookie` header for the eventual response.
    pub fn set_cookie(&mut self, key: &str, value: &str, options: &CookieOptions) -> Result<(), InvalidHeaderValue> {
        let cookie = HeaderValue::try_from(build_cookie(key, value, options))?;
        self.response_headers.append(SET_COOKIE, cookie);
        Ok(())
    }

    /// Merges the pending headers into `response`. `Set-Cookie` values are added
    /// next to the response's own; any other pending name replaces the response's values.
    pub(crate) fn apply_response_headers<B>(&self, response: &mut Response<B>) {
        let headers = response.headers_mut();
        for name in self.response_headers.keys() {
            if *name != SET_COOKIE {
                headers.remove(name);
            }
            for value in self.response_headers.get_all(name) {
                headers.append(name.clone(), value.clone());
            }
        }
    }
}

fn split_segments(path: &str) -> Vec<String> {
    path.split('/').filter(|segment| !segment.is_empty()).map(String::from).collect()
}

/// Represents path parameters extracted from the URL path of an HTTP request.
///
/// In the pattern `/users/{id}`, `id` is a path parameter; matching `/users/7`
/// binds `id` to `7`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    inner: Vec<(String, String)>,
}

impl PathParams {
    /// Creates an empty PathParams instance with no parameters
    #[inline]
    pub fn empty() -> Self {
        Self { inner: Vec::new() }
    }

    pub(crate) fn push(&mut self, name: &str, value: &str) {
        self.inner.push((name.to_string(), value.to_string()));
    }

    /// Returns true if there are no path parameters
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of path parameters
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Gets the value of a path parameter by its name.
    /// When a name repeats in the pattern, the last binding wins.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner.iter().rev().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}
