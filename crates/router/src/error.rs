use crate::body::BoxError;
use crate::responder::{JSend, Responder};
use crate::{RequestContext, ResponseBody};
use http::{Response, StatusCode};
use micro_query::ParseError;
use serde_json::json;
use thiserror::Error;

/// Failures the router and its standard middleware know how to answer.
///
/// Every variant maps to exactly one status code through its [`Responder`]
/// implementation: client-caused failures become a JSend `fail` envelope,
/// server-side ones a JSend `error` envelope without internal details.
#[derive(Error, Debug)]
pub enum RouteError {
    #[error("malformed {part}: {source}")]
    Syntax {
        part: &'static str,
        #[source]
        source: ParseError,
    },

    #[error("malformed json body: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("unsupported media type: {content_type}")]
    UnsupportedMedia { content_type: String },

    #[error("request body exceeds the limit of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("splitter selected candidate {index}, but only {len} are registered")]
    SplitterOutOfRange { index: usize, len: usize },

    #[error("request handler failed: {source}")]
    Handler { source: BoxError },
}

impl RouteError {
    pub fn syntax(part: &'static str, source: ParseError) -> Self {
        Self::Syntax { part, source }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn unsupported_media<S: ToString>(content_type: S) -> Self {
        Self::UnsupportedMedia { content_type: content_type.to_string() }
    }

    pub fn payload_too_large(limit: usize) -> Self {
        Self::PayloadTooLarge { limit }
    }

    pub fn splitter_out_of_range(index: usize, len: usize) -> Self {
        Self::SplitterOutOfRange { index, len }
    }

    pub fn handler<E: Into<BoxError>>(source: E) -> Self {
        Self::Handler { source: source.into() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Syntax { .. } | Self::Json { .. } | Self::InvalidHeader { .. } | Self::InvalidBody { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::UnsupportedMedia { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::SplitterOutOfRange { .. } | Self::Handler { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Responder for RouteError {
    fn response_to(self, req: &RequestContext) -> Response<ResponseBody> {
        let status = self.status_code();
        if status.is_server_error() {
            (status, JSend::error("internal server error")).response_to(req)
        } else {
            (status, JSend::fail(json!({ "reason": self.to_string() }))).response_to(req)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::RouteError;
    use http::StatusCode;
    use micro_query::ParseError;

    #[test]
    fn test_status_codes() {
        assert_eq!(RouteError::syntax("query", ParseError::empty_key(0)).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(RouteError::invalid_header("not ascii").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(RouteError::invalid_body("not utf-8").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(RouteError::unsupported_media("text/xml").status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(RouteError::payload_too_large(8).status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(RouteError::splitter_out_of_range(2, 2).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(RouteError::handler("db down").status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_messages() {
        let error = RouteError::syntax("cookie", ParseError::empty_key(0));
        assert_eq!(error.to_string(), "malformed cookie: empty key at position 0");

        let error = RouteError::splitter_out_of_range(2, 2);
        assert_eq!(error.to_string(), "splitter selected candidate 2, but only 2 are registered");
    }
}
