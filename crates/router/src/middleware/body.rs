use crate::middleware::{Flow, Middleware};
use crate::responder::Responder;
use crate::{RequestContext, RouteError};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use mime::Mime;
use micro_query::parse_query;
use serde_json::Value;
use tracing::warn;

const DEFAULT_LIMIT: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Form,
    Json,
}

/// Reads and decodes the request body into [`RequestContext::payload`].
///
/// Only requests declaring a `Content-Type` are read. Supported types are
/// `application/x-www-form-urlencoded` (decoded like a query string into an
/// object) and `application/json`. Any other declared type is answered with
/// 415, a malformed payload with 400 and a payload above the limit with 413.
#[derive(Debug, Clone, Copy)]
pub struct BodyParser {
    limit: usize,
    convert_values: bool,
}

impl Default for BodyParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BodyParser {
    /// A parser with a 1 MiB limit that converts form values.
    pub fn new() -> Self {
        Self { limit: DEFAULT_LIMIT, convert_values: true }
    }

    /// Maximum number of body bytes read before answering 413.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Whether form values are converted to booleans and numbers.
    #[must_use]
    pub fn convert_values(mut self, convert_values: bool) -> Self {
        self.convert_values = convert_values;
        self
    }

    async fn parse(&self, req: &mut RequestContext) -> Result<Option<Value>, RouteError> {
        let Some(content_type) = req.headers().get(CONTENT_TYPE) else {
            return Ok(None);
        };
        let kind = body_kind(content_type.to_str().map_err(RouteError::invalid_header)?)?;

        let bytes = match req.take_body() {
            Some(body) => body.read_to_bytes(self.limit).await?,
            None => Bytes::new(),
        };

        match kind {
            BodyKind::Form => {
                let text = std::str::from_utf8(&bytes).map_err(RouteError::invalid_body)?;
                let form = parse_query(text, self.convert_values).map_err(|e| RouteError::syntax("body", e))?;
                Ok(Some(Value::Object(form)))
            }
            BodyKind::Json => Ok(Some(serde_json::from_slice(&bytes)?)),
        }
    }
}

fn body_kind(content_type: &str) -> Result<BodyKind, RouteError> {
    let mime = content_type.parse::<Mime>().map_err(|_err| RouteError::unsupported_media(content_type))?;
    let essence = mime.essence_str();

    if essence.eq_ignore_ascii_case(mime::APPLICATION_WWW_FORM_URLENCODED.essence_str()) {
        Ok(BodyKind::Form)
    } else if essence.eq_ignore_ascii_case(mime::APPLICATION_JSON.essence_str()) {
        Ok(BodyKind::Json)
    } else {
        Err(RouteError::unsupported_media(content_type))
    }
}

#[async_trait]
impl Middleware for BodyParser {
    async fn handle(&self, req: &mut RequestContext) -> Flow {
        match self.parse(req).await {
            Ok(Some(payload)) => {
                req.set_payload(payload);
                Flow::Next
            }
            Ok(None) => Flow::Next,
            Err(e) => {
                warn!(cause = %e, path = req.path(), "failed to parse request body");
                Flow::Done(e.response_to(req))
            }
        }
    }
}
