//! Cookie header parsing and `Set-Cookie` value construction.

use crate::scanner::{Dialect, Scanner};
use crate::{ParseError, QueryMap};
use std::fmt;

/// The `Expires` value that makes a browser drop a cookie immediately.
pub const EXPIRED_DATE: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// Parses a `Cookie` request header into a map, converting values.
///
/// Unlike [`parse_query`](crate::parse_query), only `;` separates pairs,
/// whitespace before a key is skipped, and a trailing `;` is accepted. An empty
/// header means "no cookies" rather than an error.
///
/// # Example
/// ```
/// use micro_query::parse_cookie;
/// use serde_json::json;
///
/// let cookies = parse_cookie("x=1; y=true;").unwrap();
/// assert_eq!(cookies.get("x"), Some(&json!(1)));
/// assert_eq!(cookies.get("y"), Some(&json!(true)));
/// ```
pub fn parse_cookie(header: &str) -> Result<QueryMap, ParseError> {
    Scanner::new(header, Dialect::COOKIE, true).scan()
}

/// The `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Strict => f.write_str("Strict"),
            SameSite::Lax => f.write_str("Lax"),
            SameSite::None => f.write_str("None"),
        }
    }
}

/// Optional attributes appended by [`build_cookie`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieOptions {
    domain: Option<String>,
    path: Option<String>,
    expires: Option<String>,
    max_age: Option<i64>,
    same_site: Option<SameSite>,
    http_only: bool,
    secure: bool,
}

impl CookieOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options that clear a cookie: `Path=/` and an `Expires` in the past.
    pub fn expired() -> Self {
        Self::new().path("/").expires(EXPIRED_DATE)
    }

    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets `Expires`, which must already be formatted as an http date.
    #[must_use]
    pub fn expires(mut self, expires: impl Into<String>) -> Self {
        self.expires = Some(expires.into());
        self
    }

    #[must_use]
    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    #[must_use]
    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    #[must_use]
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }
}

/// Builds a `Set-Cookie` header value.
///
/// Attributes are emitted in a fixed order and only when set: `Domain`, `Path`,
/// `Expires`, `Max-Age`, `SameSite`, then the `HttpOnly` and `Secure` flags.
/// Neither the key nor the value is encoded.
///
/// # Example
/// ```
/// use micro_query::{build_cookie, CookieOptions, SameSite};
///
/// let options = CookieOptions::new().path("/").same_site(SameSite::Lax).http_only(true);
/// assert_eq!(build_cookie("sid", "abc", &options), "sid=abc; Path=/; SameSite=Lax; HttpOnly");
/// ```
pub fn build_cookie(key: &str, value: &str, options: &CookieOptions) -> String {
    let mut attributes = vec![format!("{key}={value}")];

    if let Some(domain) = &options.domain {
        attributes.push(format!("Domain={domain}"));
    }
    if let Some(path) = &options.path {
        attributes.push(format!("Path={path}"));
    }
    if let Some(expires) = &options.expires {
        attributes.push(format!("Expires={expires}"));
    }
    if let Some(max_age) = options.max_age {
        attributes.push(format!("Max-Age={max_age}"));
    }
    if let Some(same_site) = options.same_site {
        attributes.push(format!("SameSite={same_site}"));
    }
    if options.http_only {
        attributes.push("HttpOnly".to_string());
    }
    if options.secure {
        attributes.push("Secure".to_string());
    }

    attributes.join("; ")
}
