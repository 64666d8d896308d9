use regex::Regex;
use serde_json::{Map, Value, json};

use crate::error::{ErrorKind, FieldError, LocSegment};

/// Declared limits checked after a value has been coerced.
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    ge: Option<f64>,
    gt: Option<f64>,
    le: Option<f64>,
    lt: Option<f64>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<Regex>,
}

impl Constraints {
    /// Checks `value` against every declared limit, recording each violation.
    ///
    /// Numeric bounds apply to numbers, length bounds to strings (in
    /// characters) and lists (in items), and the pattern to strings. `null`
    /// is never checked.
    pub fn check(&self, value: &Value, loc: &[LocSegment], errors: &mut Vec<FieldError>) {
        match value {
            Value::Number(n) => {
                if let Some(x) = n.as_f64() {
                    self.check_bounds(x, loc, errors);
                }
            }
            Value::String(s) => {
                self.check_length(s.chars().count(), true, loc, errors);
                if let Some(re) = &self.pattern {
                    if !re.is_match(s) {
                        errors.push(
                            FieldError::new(
                                loc.to_vec(),
                                ErrorKind::StringPatternMismatch,
                                format!("String should match pattern '{}'", source(re)),
                            )
                            .with_ctx(json!({ "pattern": source(re) })),
                        );
                    }
                }
            }
            Value::Array(items) => self.check_length(items.len(), false, loc, errors),
            _ => {}
        }
    }

    fn check_bounds(&self, x: f64, loc: &[LocSegment], errors: &mut Vec<FieldError>) {
        if let Some(limit) = self.ge.filter(|&l| x < l) {
            errors.push(bound_error(loc, ErrorKind::GreaterThanEqual, "greater than or equal to", "ge", limit));
        }
        if let Some(limit) = self.gt.filter(|&l| x <= l) {
            errors.push(bound_error(loc, ErrorKind::GreaterThan, "greater than", "gt", limit));
        }
        if let Some(limit) = self.le.filter(|&l| x > l) {
            errors.push(bound_error(loc, ErrorKind::LessThanEqual, "less than or equal to", "le", limit));
        }
        if let Some(limit) = self.lt.filter(|&l| x >= l) {
            errors.push(bound_error(loc, ErrorKind::LessThan, "less than", "lt", limit));
        }
    }

    fn check_length(&self, len: usize, is_str: bool, loc: &[LocSegment], errors: &mut Vec<FieldError>) {
        let unit = if is_str { "character" } else { "item" };
        if let Some(min) = self.min_length.filter(|&min| len < min) {
            let kind = if is_str { ErrorKind::StringTooShort } else { ErrorKind::TooShort };
            errors.push(
                FieldError::new(loc.to_vec(), kind, format!("Should have at least {min} {unit}(s)"))
                    .with_ctx(json!({ "min_length": min })),
            );
        }
        if let Some(max) = self.max_length.filter(|&max| len > max) {
            let kind = if is_str { ErrorKind::StringTooLong } else { ErrorKind::TooLong };
            errors.push(
                FieldError::new(loc.to_vec(), kind, format!("Should have at most {max} {unit}(s)"))
                    .with_ctx(json!({ "max_length": max })),
            );
        }
    }
}

fn bound_error(loc: &[LocSegment], kind: ErrorKind, phrase: &str, key: &str, limit: f64) -> FieldError {
    let mut ctx = Map::new();
    ctx.insert(key.to_owned(), json!(limit));
    FieldError::new(loc.to_vec(), kind, format!("Input should be {phrase} {limit}"))
        .with_ctx(Value::Object(ctx))
}

// Patterns are stored anchored as `^(?:...)$`; report what the caller wrote.
fn source(re: &Regex) -> &str {
    let s = re.as_str();
    s.strip_prefix("^(?:")
        .and_then(|s| s.strip_suffix(")$"))
        .unwrap_or(s)
}

/// Builder methods shared by everything that carries [`Constraints`].
pub trait Constrain: Sized {
    fn constraints_mut(&mut self) -> &mut Constraints;

    #[must_use]
    fn ge(mut self, limit: impl Into<f64>) -> Self {
        self.constraints_mut().ge = Some(limit.into());
        self
    }

    #[must_use]
    fn gt(mut self, limit: impl Into<f64>) -> Self {
        self.constraints_mut().gt = Some(limit.into());
        self
    }

    #[must_use]
    fn le(mut self, limit: impl Into<f64>) -> Self {
        self.constraints_mut().le = Some(limit.into());
        self
    }

    #[must_use]
    fn lt(mut self, limit: impl Into<f64>) -> Self {
        self.constraints_mut().lt = Some(limit.into());
        self
    }

    #[must_use]
    fn min_length(mut self, len: usize) -> Self {
        self.constraints_mut().min_length = Some(len);
        self
    }

    #[must_use]
    fn max_length(mut self, len: usize) -> Self {
        self.constraints_mut().max_length = Some(len);
        self
    }

    /// Requires the whole string to match `pattern`.
    ///
    /// # Errors
    ///
    /// Returns the regex compile error for an invalid pattern.
    fn pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        let anchored = Regex::new(&format!("^(?:{pattern})$"))?;
        self.constraints_mut().pattern = Some(anchored);
        Ok(self)
    }
}
