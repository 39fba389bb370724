use serde_json::{Number, Value};

/// Best-effort conversion of a decoded value.
///
/// `""` and `"true"` become `true`, `"false"` becomes `false`, a value that
/// parses completely as a finite number becomes a number, anything else stays
/// a string.
pub fn coerce(raw: String) -> Value {
    match raw.as_str() {
        "" | "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        other => match parse_number(other) {
            Some(number) => Value::Number(number),
            None => Value::String(raw),
        },
    }
}

fn parse_number(raw: &str) -> Option<Number> {
    if let Ok(int) = raw.parse::<i64>() {
        return Some(int.into());
    }
    if let Ok(uint) = raw.parse::<u64>() {
        return Some(uint.into());
    }
    // `f64::from_str` accepts "inf" and "NaN", which json numbers cannot hold
    raw.parse::<f64>().ok().and_then(Number::from_f64)
}

#[cfg(test)]
mod tests {
    use super::coerce;
    use serde_json::{Value, json};

    fn coerced(raw: &str) -> Value {
        coerce(raw.to_string())
    }

    #[test]
    fn test_booleans() {
        assert_eq!(coerced("true"), json!(true));
        assert_eq!(coerced(""), json!(true));
        assert_eq!(coerced("false"), json!(false));
        assert_eq!(coerced("TRUE"), json!("TRUE"));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(coerced("1"), json!(1));
        assert_eq!(coerced("-42"), json!(-42));
        assert_eq!(coerced("18446744073709551615"), json!(18_446_744_073_709_551_615_u64));
        assert_eq!(coerced("2.5"), json!(2.5));
        assert_eq!(coerced("1e3"), json!(1000.0));
    }

    #[test]
    fn test_not_numbers() {
        assert_eq!(coerced("12abc"), json!("12abc"));
        assert_eq!(coerced(" "), json!(" "));
        assert_eq!(coerced(" 1"), json!(" 1"));
        assert_eq!(coerced("inf"), json!("inf"));
        assert_eq!(coerced("NaN"), json!("NaN"));
    }
}
