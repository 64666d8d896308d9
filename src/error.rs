//! Error taxonomy shared by registration, binding, and dispatch.
//!
//! Registration problems surface as [`RouteError`] when the route table is
//! built. Everything that can go wrong while serving a request is an
//! [`ApiError`], which knows its own status code and wire representation.

use std::fmt;

use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::http::{Method, Response, StatusCode};

/// One step in an error location: an object key or a list index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LocSegment {
    Key(String),
    Index(usize),
}

impl From<&str> for LocSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_owned())
    }
}

impl From<String> for LocSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for LocSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// Path from the request source down to the offending value,
/// e.g. `["body", "item", "price"]` or `["body", 0, "url"]`.
pub type Loc = Vec<LocSegment>;

/// Returns `loc` extended by one segment.
pub(crate) fn child(loc: &[LocSegment], segment: impl Into<LocSegment>) -> Loc {
    let mut next = loc.to_vec();
    next.push(segment.into());
    next
}

/// Machine-readable reason attached to a [`FieldError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Missing,
    JsonInvalid,
    StringType,
    IntParsing,
    FloatParsing,
    BoolParsing,
    UrlParsing,
    Enum,
    ListType,
    ModelType,

    GreaterThanEqual,
    GreaterThan,
    LessThanEqual,
    LessThan,
    StringTooShort,
    StringTooLong,
    StringPatternMismatch,
    TooShort,
    TooLong,
}

impl ErrorKind {
    /// `true` for declared-constraint violations, `false` for binding failures
    /// (missing values, conversion failures, enum mismatches, bad JSON).
    pub fn is_constraint(self) -> bool {
        matches!(
            self,
            Self::GreaterThanEqual
                | Self::GreaterThan
                | Self::LessThanEqual
                | Self::LessThan
                | Self::StringTooShort
                | Self::StringTooLong
                | Self::StringPatternMismatch
                | Self::TooShort
                | Self::TooLong
        )
    }
}

/// A single failing parameter, as reported in a 422 body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub loc: Loc,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ctx: Option<Value>,
}

impl FieldError {
    pub fn new(loc: Loc, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            loc,
            msg: msg.into(),
            kind,
            ctx: None,
        }
    }

    #[must_use]
    pub fn with_ctx(mut self, ctx: Value) -> Self {
        self.ctx = Some(ctx);
        self
    }

    pub fn missing(loc: Loc) -> Self {
        Self::new(loc, ErrorKind::Missing, "Field required")
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path: Vec<String> = self
            .loc
            .iter()
            .map(|seg| match seg {
                LocSegment::Key(k) => k.clone(),
                LocSegment::Index(i) => i.to_string(),
            })
            .collect();
        write!(f, "{}: {}", path.join("."), self.msg)
    }
}

/// The request phase in which a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Matching,
    Binding,
    Validating,
    Invoking,
    Serializing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Matching => "matching",
            Self::Binding => "binding",
            Self::Validating => "validating",
            Self::Invoking => "invoking",
            Self::Serializing => "serializing",
        })
    }
}

/// Everything that can end a request with a non-success status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no route matches {method} {path}")]
    NotFound { method: Method, path: String },

    #[error("request binding failed ({} parameter error(s))", .0.len())]
    Binding(Vec<FieldError>),

    #[error("request validation failed ({} constraint violation(s))", .0.len())]
    Validation(Vec<FieldError>),

    #[error("handler fault: {0}")]
    HandlerFault(String),
}

impl ApiError {
    /// Classifies a non-empty set of field errors.
    ///
    /// Any binding failure makes the whole set a [`ApiError::Binding`];
    /// only pure constraint violations are reported as [`ApiError::Validation`].
    pub fn from_field_errors(errors: Vec<FieldError>) -> Self {
        if errors.iter().all(|e| e.kind.is_constraint()) {
            Self::Validation(errors)
        } else {
            Self::Binding(errors)
        }
    }

    pub fn fault(msg: impl Into<String>) -> Self {
        Self::HandlerFault(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NotFound,
            Self::Binding(_) | Self::Validation(_) => StatusCode::UnprocessableEntity,
            Self::HandlerFault(_) => StatusCode::InternalServerError,
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Self::NotFound { .. } => Phase::Matching,
            Self::Binding(_) => Phase::Binding,
            Self::Validation(_) => Phase::Validating,
            Self::HandlerFault(_) => Phase::Invoking,
        }
    }

    /// Field errors carried by a 422, empty otherwise.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::Binding(errors) | Self::Validation(errors) => errors,
            _ => &[],
        }
    }

    /// Renders the error for the caller. Fault details stay server-side.
    pub fn into_response(self) -> Response {
        let body = match &self {
            Self::NotFound { .. } => json!({ "detail": "Not Found" }),
            Self::Binding(errors) | Self::Validation(errors) => json!({ "detail": errors }),
            Self::HandlerFault(_) => json!({ "detail": "Internal Server Error" }),
        };
        Response::json(self.status(), &body)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::HandlerFault(err.to_string())
    }
}

/// Route table construction failures.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("{method} {path} is ambiguous with already registered {existing}")]
    Ambiguous {
        method: Method,
        path: String,
        existing: String,
    },

    #[error("parameter `{name}` declared twice on {path}")]
    DuplicateParam { name: String, path: String },

    #[error("path parameter `{name}` does not appear in {path}")]
    UnknownPathParam { name: String, path: String },

    #[error("invalid path pattern {path}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("invalid constraint pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(parts: &[&str]) -> Loc {
        parts.iter().map(|p| LocSegment::from(*p)).collect()
    }

    #[test]
    fn constraint_only_errors_are_validation() {
        let err = ApiError::from_field_errors(vec![FieldError::new(
            loc(&["path", "item_id"]),
            ErrorKind::GreaterThanEqual,
            "Input should be greater than or equal to 1",
        )]);
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(err.status(), StatusCode::UnprocessableEntity);
        assert_eq!(err.phase(), Phase::Validating);
    }

    #[test]
    fn mixed_errors_are_binding() {
        let err = ApiError::from_field_errors(vec![
            FieldError::new(loc(&["path", "item_id"]), ErrorKind::LessThan, "too big"),
            FieldError::missing(loc(&["query", "q"])),
        ]);
        assert!(matches!(err, ApiError::Binding(ref e) if e.len() == 2));
        assert_eq!(err.field_errors().len(), 2);
    }

    #[test]
    fn unprocessable_body_lists_every_error() {
        let errors = vec![
            FieldError::missing(loc(&["query", "mandatory"])),
            FieldError::new(
                vec!["body".into(), 0.into(), "url".into()],
                ErrorKind::UrlParsing,
                "Input should be a valid URL",
            ),
        ];
        let body = ApiError::Binding(errors).into_response().json_body().unwrap();
        assert_eq!(body["detail"][0]["loc"], json!(["query", "mandatory"]));
        assert_eq!(body["detail"][0]["type"], "missing");
        assert_eq!(body["detail"][1]["loc"], json!(["body", 0, "url"]));
        assert_eq!(body["detail"][1]["type"], "url_parsing");
        assert!(body["detail"][0].get("ctx").is_none());
    }

    #[test]
    fn fault_hides_detail() {
        let res = ApiError::fault("database exploded").into_response();
        assert_eq!(res.status(), StatusCode::InternalServerError);
        let body = res.json_body().unwrap();
        assert_eq!(body, json!({"detail": "Internal Server Error"}));
    }

    #[test]
    fn not_found_has_no_detail() {
        let res = ApiError::NotFound {
            method: Method::Get,
            path: "/nope".into(),
        }
        .into_response();
        assert_eq!(res.status(), StatusCode::NotFound);
        assert_eq!(res.json_body().unwrap(), json!({"detail": "Not Found"}));
    }

    #[test]
    fn field_error_display_joins_loc() {
        let e = FieldError::missing(vec!["body".into(), "item".into(), 2.into()]);
        assert_eq!(e.to_string(), "body.item.2: Field required");
    }
}
