//! Lax coercion of JSON values into declared kinds.
//!
//! Raw strings from the path, query, headers, and cookies enter here as
//! `Value::String`, so one set of rules covers every parameter source.

use serde_json::{Number, Value, json};

use super::Kind;
use crate::error::{ErrorKind, FieldError, Loc, LocSegment, child};

const TRUE_WORDS: [&str; 6] = ["true", "1", "yes", "on", "t", "y"];
const FALSE_WORDS: [&str; 6] = ["false", "0", "no", "off", "f", "n"];

/// Coerces `value` into `kind`, pushing any failure onto `errors`.
///
/// Returns `None` when at least one error was recorded for this value.
pub fn coerce(
    kind: &Kind,
    value: &Value,
    loc: &[LocSegment],
    errors: &mut Vec<FieldError>,
) -> Option<Value> {
    let coerced = match kind {
        Kind::Str => value.as_str().map(|s| Value::String(s.to_owned())),
        Kind::Int => to_int(value),
        Kind::Float => to_float(value),
        Kind::Bool => to_bool(value),
        Kind::Url => value.as_str().filter(|s| is_absolute_url(s)).map(Value::from),
        Kind::Enum(members) => value
            .as_str()
            .filter(|s| members.iter().any(|m| m == s))
            .map(Value::from),
        Kind::List(inner) => return coerce_list(inner, value, loc, errors),
        Kind::Model(model) => return model.validate_into(value, loc, errors),
    };

    if coerced.is_none() {
        errors.push(type_error(kind, loc.to_vec()));
    }
    coerced
}

fn coerce_list(
    inner: &Kind,
    value: &Value,
    loc: &[LocSegment],
    errors: &mut Vec<FieldError>,
) -> Option<Value> {
    let Value::Array(items) = value else {
        errors.push(type_error(&Kind::List(Box::new(inner.clone())), loc.to_vec()));
        return None;
    };

    let before = errors.len();
    let out: Vec<Value> = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| coerce(inner, item, &child(loc, i), errors))
        .collect();
    (errors.len() == before).then_some(Value::Array(out))
}

fn to_int(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) if n.is_u64() || n.is_i64() => n.as_i64().map(Value::from),
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
            .map(|f| Value::from(f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
        _ => None,
    }
}

fn to_float(value: &Value) -> Option<Value> {
    let f = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    Number::from_f64(f).map(Value::Number)
}

fn to_bool(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(b) => Some(Value::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(Value::Bool(true)),
            Some(0) => Some(Value::Bool(false)),
            _ => None,
        },
        Value::String(s) => {
            let word = s.trim().to_ascii_lowercase();
            if TRUE_WORDS.contains(&word.as_str()) {
                Some(Value::Bool(true))
            } else if FALSE_WORDS.contains(&word.as_str()) {
                Some(Value::Bool(false))
            } else {
                None
            }
        }
        _ => None,
    }
}

fn is_absolute_url(raw: &str) -> bool {
    url::Url::parse(raw).is_ok_and(|u| u.has_host())
}

/// The conversion failure reported for a value that does not fit `kind`.
pub(crate) fn type_error(kind: &Kind, loc: Loc) -> FieldError {
    match kind {
        Kind::Str => FieldError::new(loc, ErrorKind::StringType, "Input should be a valid string"),
        Kind::Int => FieldError::new(
            loc,
            ErrorKind::IntParsing,
            "Input should be a valid integer, unable to parse string as an integer",
        ),
        Kind::Float => FieldError::new(
            loc,
            ErrorKind::FloatParsing,
            "Input should be a valid number, unable to parse string as a number",
        ),
        Kind::Bool => FieldError::new(
            loc,
            ErrorKind::BoolParsing,
            "Input should be a valid boolean, unable to interpret input",
        ),
        Kind::Url => FieldError::new(
            loc,
            ErrorKind::UrlParsing,
            "Input should be a valid absolute URL",
        ),
        Kind::Enum(members) => {
            let quoted: Vec<String> = members.iter().map(|m| format!("'{m}'")).collect();
            FieldError::new(
                loc,
                ErrorKind::Enum,
                format!("Input should be one of {}", quoted.join(", ")),
            )
            .with_ctx(json!({ "expected": members }))
        }
        Kind::List(_) => FieldError::new(loc, ErrorKind::ListType, "Input should be a valid list"),
        Kind::Model(model) => model.not_an_object(&loc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(kind: &Kind, value: Value) -> Result<Value, Vec<FieldError>> {
        let mut errors = Vec::new();
        match coerce(kind, &value, &["query".into(), "x".into()], &mut errors) {
            Some(v) if errors.is_empty() => Ok(v),
            _ => Err(errors),
        }
    }

    #[test]
    fn int_from_string_and_number() {
        assert_eq!(run(&Kind::Int, json!("7")).unwrap(), json!(7));
        assert_eq!(run(&Kind::Int, json!(7)).unwrap(), json!(7));
        assert_eq!(run(&Kind::Int, json!(7.0)).unwrap(), json!(7));
        assert_eq!(run(&Kind::Int, json!("abc")).unwrap_err()[0].kind, ErrorKind::IntParsing);
        assert!(run(&Kind::Int, json!("7.5")).is_err());
        assert!(run(&Kind::Int, json!(7.5)).is_err());
    }

    #[test]
    fn int_must_fit_i64() {
        assert_eq!(run(&Kind::Int, json!(i64::MAX)).unwrap(), json!(i64::MAX));
        assert_eq!(run(&Kind::Int, json!(i64::MIN)).unwrap(), json!(i64::MIN));
        assert_eq!(run(&Kind::Int, json!(u64::MAX)).unwrap_err()[0].kind, ErrorKind::IntParsing);
        assert!(run(&Kind::Int, json!("9223372036854775808")).is_err());
        assert_eq!(run(&Kind::Int, json!("9223372036854775807")).unwrap(), json!(i64::MAX));
    }

    #[test]
    fn float_accepts_numbers_and_strings() {
        assert_eq!(run(&Kind::Float, json!("2.5")).unwrap(), json!(2.5));
        assert_eq!(run(&Kind::Float, json!(3)).unwrap(), json!(3.0));
        assert!(run(&Kind::Float, json!(true)).is_err());
    }

    #[test]
    fn bool_words() {
        for word in ["on", "True", "1", "yes"] {
            assert_eq!(run(&Kind::Bool, json!(word)).unwrap(), json!(true), "{word}");
        }
        for word in ["off", "FALSE", "0", "no"] {
            assert_eq!(run(&Kind::Bool, json!(word)).unwrap(), json!(false), "{word}");
        }
        assert_eq!(run(&Kind::Bool, json!("maybe")).unwrap_err()[0].kind, ErrorKind::BoolParsing);
    }

    #[test]
    fn strings_are_not_coerced_from_numbers() {
        assert_eq!(run(&Kind::Str, json!(5)).unwrap_err()[0].kind, ErrorKind::StringType);
    }

    #[test]
    fn enum_lists_members_on_mismatch() {
        let kind = Kind::Enum(&["pepper", "salt", "maggi"]);
        assert_eq!(run(&kind, json!("salt")).unwrap(), json!("salt"));

        let err = &run(&kind, json!("ketchup")).unwrap_err()[0];
        assert_eq!(err.kind, ErrorKind::Enum);
        assert_eq!(err.ctx, Some(json!({"expected": ["pepper", "salt", "maggi"]})));
        assert!(err.msg.contains("'maggi'"));
    }

    #[test]
    fn enum_match_is_exact() {
        let kind = Kind::Enum(&["pepper", "salt", "maggi"]);
        assert!(run(&kind, json!("Pepper")).is_err());
    }

    #[test]
    fn url_must_be_absolute() {
        assert!(run(&Kind::Url, json!("https://example.com/a.png")).is_ok());
        assert!(run(&Kind::Url, json!("/relative/a.png")).is_err());
        assert!(run(&Kind::Url, json!("not a url")).is_err());
        assert!(run(&Kind::Url, json!("mailto:someone@example.com")).is_err());
    }

    #[test]
    fn list_reports_each_bad_index() {
        let errors = run(&Kind::list(Kind::Int), json!(["1", "x", "3", "y"])).unwrap_err();
        let locs: Vec<_> = errors.iter().map(|e| e.loc.last().cloned()).collect();
        assert_eq!(locs, vec![Some(LocSegment::Index(1)), Some(LocSegment::Index(3))]);
    }

    #[test]
    fn list_requires_array() {
        assert_eq!(
            run(&Kind::list(Kind::Str), json!("3")).unwrap_err()[0].kind,
            ErrorKind::ListType
        );
    }
}
