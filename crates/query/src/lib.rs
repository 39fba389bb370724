//! Query string and cookie codec used by `micro-router`.
//!
//! Both parsers are a single left-to-right scan over the
//! input with a key buffer and a value buffer, strict percent-decoding and
//! optional best-effort conversion of values into booleans and numbers.
//!
//! # Example
//!
//! ```
//! use micro_query::parse_query;
//! use serde_json::json;
//!
//! let query = parse_query("a=1&b=true&c=hello", true).unwrap();
//! assert_eq!(query.get("a"), Some(&json!(1)));
//! assert_eq!(query.get("b"), Some(&json!(true)));
//! assert_eq!(query.get("c"), Some(&json!("hello")));
//!
//! assert!(parse_query("a=%2", true).is_err());
//! ```
//!
//! Cookie headers go through the same scanner with a more forgiving framing,
//! see [`parse_cookie`]. [`build_cookie`] produces `Set-Cookie` values.

mod cookie;
mod error;
mod scanner;
mod value;

pub use cookie::CookieOptions;
pub use cookie::EXPIRED_DATE;
pub use cookie::SameSite;
pub use cookie::build_cookie;
pub use cookie::parse_cookie;
pub use error::ParseError;
pub use value::coerce;

use scanner::{Dialect, Scanner};

/// Decoded key/value pairs. Values are strings unless conversion was requested.
pub type QueryMap = serde_json::Map<String, serde_json::Value>;

/// Parses a raw query string (without the leading `?`).
///
/// `=` separates a key from its value, `&` and `;` separate pairs and `%XX`
/// is percent-decoded. An empty key anywhere, including after a dangling
/// separator, is an error; an empty input is an empty map.
///
/// With `convert_values`, values are passed through [`coerce`].
pub fn parse_query(raw: &str, convert_values: bool) -> Result<QueryMap, ParseError> {
    Scanner::new(raw, Dialect::QUERY, convert_values).scan()
}
