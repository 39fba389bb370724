//! Response handling module that converts handler results into HTTP responses.
//!
//! This module provides the [`Responder`] trait which defines how different types
//! can be converted into HTTP responses. It includes implementations for common types
//! like Option, String, etc., plus the two response conventions handlers use most:
//! the [`JSend`] envelope and [`Redirect`].

use crate::RequestContext;
use crate::body::ResponseBody;
use http::header::{CONTENT_TYPE, LOCATION};
use http::{HeaderValue, Response, StatusCode};
use mime::Mime;
use serde::Serialize;
use serde_json::Value;
use std::convert::Infallible;
use tracing::error;

/// Renders a media type as a header value. `Mime` always displays as visible ascii.
fn content_type(media: &Mime) -> HeaderValue {
    HeaderValue::from_str(media.as_ref()).unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"))
}

/// A trait for types that can be converted into HTTP responses.
///
/// Types implementing this trait can be returned directly from request handlers
/// and will be automatically converted into HTTP responses.
pub trait Responder {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody>;
}

/// Implementation for Result allows handlers to return Result types directly.
/// The Ok and Err variants must both implement Responder.
impl<T: Responder, E: Responder> Responder for Result<T, E> {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        match self {
            Ok(t) => t.response_to(req),
            Err(e) => e.response_to(req),
        }
    }
}

/// Implementation for Option allows handlers to return Option types.
/// None case returns an empty response.
impl<T: Responder> Responder for Option<T> {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        match self {
            Some(t) => t.response_to(req),
            None => Response::new(ResponseBody::empty()),
        }
    }
}

/// Implementation for Response allows passing through pre-built responses.
/// The response body is converted to the internal ResponseBody type.
impl<B> Responder for Response<B>
where
    B: Into<ResponseBody>,
{
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        self.map(Into::into)
    }
}

/// Implementation for (StatusCode, T) tuple allows setting a status code
/// along with the response content.
impl<T: Responder> Responder for (StatusCode, T) {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        let (status, responder) = self;
        let mut response = responder.response_to(req);
        *response.status_mut() = status;
        response
    }
}

/// Implementation for (T, StatusCode) tuple - same as above but with reversed order.
impl<T: Responder> Responder for (T, StatusCode) {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        let (responder, status) = self;
        (status, responder).response_to(req)
    }
}

/// Implementation for Box<T> allows boxing responders.
impl<T: Responder> Responder for Box<T> {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        (*self).response_to(req)
    }
}

/// Implementation for unit type () returns an empty response.
impl Responder for () {
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        Response::new(ResponseBody::empty())
    }
}

/// Implementation for static strings returns them as plain text responses.
impl Responder for &'static str {
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        plain_text(ResponseBody::from(self))
    }
}

/// Implementation for String returns it as a plain text response.
impl Responder for String {
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        plain_text(ResponseBody::from(self))
    }
}

impl Responder for Infallible {
    fn response_to(self, _req: &RequestContext) -> Response<ResponseBody> {
        match self {}
    }
}

fn plain_text(body: ResponseBody) -> Response<ResponseBody> {
    let mut response = Response::new(body);
    response.headers_mut().insert(CONTENT_TYPE, content_type(&mime::TEXT_PLAIN_UTF_8));
    response
}

/// The `{status, data | message}` envelope used for API replies.
///
/// - `success`: `{"status":"success","data":<value or null>}`, answered with 200
/// - `fail`: `{"status":"fail","data":<reason>}`, a client-caused failure, answered with 400
/// - `error`: `{"status":"error","message":<text>}`, a server-side failure, answered with 500
///
/// Pair it with a [`StatusCode`] to answer with a different status, e.g.
/// `(StatusCode::NOT_FOUND, JSend::fail(..))`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JSend<T = Value> {
    Success { data: Option<T> },
    Fail { data: T },
    Error { message: String },
}

impl<T> JSend<T> {
    pub fn success(data: T) -> Self {
        Self::Success { data: Some(data) }
    }

    pub fn fail(data: T) -> Self {
        Self::Fail { data }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Success { .. } => StatusCode::OK,
            Self::Fail { .. } => StatusCode::BAD_REQUEST,
            Self::Error { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl JSend {
    /// A success envelope with `"data": null`.
    pub fn empty() -> Self {
        Self::Success { data: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into() }
    }
}

impl<T: Serialize> Responder for JSend<T> {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        let status = self.status_code();
        match serde_json::to_vec(&self) {
            Ok(json) => {
                let mut response = Response::new(ResponseBody::from(json));
                *response.status_mut() = status;
                response.headers_mut().insert(CONTENT_TYPE, content_type(&mime::APPLICATION_JSON));
                response
            }
            Err(e) => {
                error!(cause = %e, path = req.path(), "failed to serialize response envelope");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").response_to(req)
            }
        }
    }
}

/// Answers with `302 Found` and a `Location` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    location: String,
}

impl Redirect {
    pub fn to(location: impl Into<String>) -> Self {
        Self { location: location.into() }
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

impl Responder for Redirect {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        match HeaderValue::try_from(self.location) {
            Ok(location) => {
                let mut response = Response::new(ResponseBody::empty());
                *response.status_mut() = StatusCode::FOUND;
                response.headers_mut().insert(LOCATION, location);
                response
            }
            Err(e) => {
                error!(cause = %e, path = req.path(), "redirect location is not a valid header value");
                (StatusCode::INTERNAL_SERVER_ERROR, JSend::error("internal server error")).response_to(req)
            }
        }
    }
}
