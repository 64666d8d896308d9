//! Request binding: resolving declared parameters to concrete values.
//!
//! A [`Binder`] is built once per route from its [`ParamSpec`]s. For each
//! request it reads every parameter from its [`Source`], coerces it to the
//! declared [`Kind`](crate::model::Kind), and checks its constraints. All
//! failures are collected before the request is rejected, so a 422 lists
//! every offending parameter at once and the handler is never invoked with
//! a partial set of values.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::context::PathParams;
use crate::error::{ApiError, ErrorKind, FieldError, Loc, LocSegment, RouteError};
use crate::http::Request;
use crate::model::{Kind, coerce};

mod spec;

pub use spec::{ParamSpec, Source};

/// Resolved binding plan for one route.
#[derive(Debug, Clone)]
pub struct Binder {
    params: Vec<ParamSpec>,
    /// Body parameters are read from keys of a top-level object instead of
    /// taking the whole body.
    embed_body: bool,
}

impl Binder {
    /// Validates `params` against the route `path` and its `{name}` segments.
    ///
    /// Segments without a declaration are bound as required strings.
    ///
    /// # Errors
    ///
    /// - [`RouteError::DuplicateParam`] when two parameters share a name.
    /// - [`RouteError::UnknownPathParam`] when a path parameter has no segment.
    pub fn new<'a>(
        path: &str,
        segment_names: impl IntoIterator<Item = &'a str>,
        mut params: Vec<ParamSpec>,
    ) -> Result<Self, RouteError> {
        for (i, spec) in params.iter().enumerate() {
            if params[..i].iter().any(|p| p.name() == spec.name()) {
                return Err(RouteError::DuplicateParam {
                    name: spec.name().to_owned(),
                    path: path.to_owned(),
                });
            }
        }

        let segment_names: Vec<&str> = segment_names.into_iter().collect();
        if let Some(stray) = params
            .iter()
            .find(|p| p.source() == Source::Path && !segment_names.contains(&p.name()))
        {
            return Err(RouteError::UnknownPathParam {
                name: stray.name().to_owned(),
                path: path.to_owned(),
            });
        }

        for name in segment_names {
            if !params.iter().any(|p| p.source() == Source::Path && p.name() == name) {
                if params.iter().any(|p| p.name() == name) {
                    return Err(RouteError::DuplicateParam {
                        name: name.to_owned(),
                        path: path.to_owned(),
                    });
                }
                params.push(ParamSpec::path(name, Kind::Str));
            }
        }

        let body: Vec<&ParamSpec> = params.iter().filter(|p| p.source() == Source::Body).collect();
        let embed_body = body.len() > 1 || body.iter().any(|p| p.is_embedded());

        Ok(Self { params, embed_body })
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Binds every declared parameter from `request` and the path `captures`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Binding`] or [`ApiError::Validation`] carrying every
    /// failing parameter.
    pub fn bind(&self, request: &Request, captures: &PathParams) -> Result<BoundParams, ApiError> {
        let mut errors = Vec::new();
        let mut values = HashMap::with_capacity(self.params.len());
        let body = self.read_body(request, &mut errors);

        for spec in &self.params {
            let key = spec.key();
            let loc = self.loc_for(spec, &key);

            let raw = match spec.source() {
                Source::Path => captures.get(spec.name()).map(Value::from),
                Source::Query => collect(spec.kind(), request.query_values(&key), Repeat::Last),
                Source::Header => {
                    collect(spec.kind(), request.headers().get_all(&key), Repeat::First)
                }
                Source::Cookie => request.cookie(&key).map(Value::from),
                Source::Body => match &body {
                    BodyState::Skipped => continue,
                    BodyState::Absent => None,
                    BodyState::Whole(v) => Some(v.clone()),
                    BodyState::Keys(map) => map.get(&key).filter(|v| !v.is_null()).cloned(),
                },
            };

            match raw {
                None if spec.is_required() => errors.push(FieldError::missing(loc)),
                None => {
                    values.insert(spec.name().to_owned(), spec.default_value());
                }
                Some(raw) => {
                    if let Some(value) = coerce(spec.kind(), &raw, &loc, &mut errors) {
                        spec.constraints().check(&value, &loc, &mut errors);
                        values.insert(spec.name().to_owned(), value);
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(BoundParams { values })
        } else {
            debug!(errors = errors.len(), "parameter binding rejected");
            Err(ApiError::from_field_errors(errors))
        }
    }

    fn loc_for(&self, spec: &ParamSpec, key: &str) -> Loc {
        let mut loc: Loc = vec![spec.source().as_str().into()];
        if spec.source() != Source::Body || self.embed_body {
            loc.push(LocSegment::from(key));
        }
        loc
    }

    fn read_body(&self, request: &Request, errors: &mut Vec<FieldError>) -> BodyState {
        if !self.params.iter().any(|p| p.source() == Source::Body) {
            return BodyState::Skipped;
        }

        let raw = request.body();
        if raw.iter().all(u8::is_ascii_whitespace) {
            return BodyState::Absent;
        }

        let parsed: Value = match serde_json::from_slice(raw) {
            Ok(v) => v,
            Err(e) => {
                errors.push(FieldError::new(
                    vec!["body".into()],
                    ErrorKind::JsonInvalid,
                    format!("JSON decode error: {e}"),
                ));
                return BodyState::Skipped;
            }
        };

        match (self.embed_body, parsed) {
            (_, Value::Null) => BodyState::Absent,
            (false, v) => BodyState::Whole(v),
            (true, Value::Object(map)) => BodyState::Keys(map),
            (true, _) => {
                errors.push(FieldError::new(
                    vec!["body".into()],
                    ErrorKind::ModelType,
                    "Input should be a valid object",
                ));
                BodyState::Skipped
            }
        }
    }
}

enum BodyState {
    /// No body parameters, or the body was already rejected.
    Skipped,
    Absent,
    Whole(Value),
    Keys(serde_json::Map<String, Value>),
}

/// Which occurrence a scalar parameter takes when its key repeats.
#[derive(Clone, Copy)]
enum Repeat {
    First,
    Last,
}

/// Gathers the raw value for one query or header parameter.
///
/// List kinds collect every occurrence in order. A scalar query key takes
/// its last occurrence (`?q=1&q=2` binds `2`); a scalar header takes the
/// first line.
fn collect<'a>(kind: &Kind, mut values: impl Iterator<Item = &'a str>, repeat: Repeat) -> Option<Value> {
    if kind.is_list() {
        let all: Vec<Value> = values.map(Value::from).collect();
        return (!all.is_empty()).then_some(Value::Array(all));
    }
    match repeat {
        Repeat::First => values.next(),
        Repeat::Last => values.last(),
    }
    .map(Value::from)
}

/// Values produced by a successful [`Binder::bind`], keyed by parameter name.
#[derive(Debug, Clone, Default)]
pub struct BoundParams {
    values: HashMap<String, Value>,
}

impl BoundParams {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Deserializes a bound value into a handler-side type.
    ///
    /// # Errors
    ///
    /// A missing or mismatched value is a handler fault: the binder has
    /// already guaranteed every declared parameter's shape.
    pub fn extract<T: DeserializeOwned>(&self, name: &str) -> Result<T, ApiError> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| ApiError::fault(format!("parameter `{name}` was not declared")))?;
        Ok(serde_json::from_value(value.clone())?)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Constrain, Field, Model};
    use serde_json::json;

    fn request(raw: &str) -> Request {
        Request::parse(raw.as_bytes()).unwrap().0
    }

    fn post(path: &str, body: &str) -> Request {
        request(&format!(
            "POST {path} HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        ))
    }

    fn captures(pairs: &[(&str, &str)]) -> PathParams {
        let mut p = PathParams::new();
        for (k, v) in pairs {
            p.insert((*k).to_owned(), (*v).to_owned());
        }
        p
    }

    fn item() -> Model {
        Model::new("Item")
            .field(Field::new("name", Kind::Str))
            .field(Field::new("price", Kind::Float))
    }

    #[test]
    fn undeclared_segments_bind_as_strings() {
        let binder = Binder::new("/names/name/{name}", ["name"], vec![]).unwrap();
        let bound = binder
            .bind(&request("GET /names/name/ola HTTP/1.1\r\n\r\n"), &captures(&[("name", "ola")]))
            .unwrap();
        assert_eq!(bound.get("name"), Some(&json!("ola")));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = Binder::new(
            "/x",
            [],
            vec![ParamSpec::query("q", Kind::Str), ParamSpec::header("q", Kind::Str)],
        )
        .unwrap_err();
        assert!(matches!(err, RouteError::DuplicateParam { .. }));
    }

    #[test]
    fn rejects_path_param_without_segment() {
        let err = Binder::new("/x", [], vec![ParamSpec::path("id", Kind::Int)]).unwrap_err();
        assert!(matches!(err, RouteError::UnknownPathParam { .. }));
    }

    #[test]
    fn query_scalars_defaults_and_missing() {
        let binder = Binder::new(
            "/get-query-params",
            [],
            vec![
                ParamSpec::query("mandatory", Kind::Str),
                ParamSpec::query("flag", Kind::Bool).default(json!(false)),
                ParamSpec::query("extra", Kind::Str).optional(),
            ],
        )
        .unwrap();

        let bound = binder
            .bind(
                &request("GET /get-query-params?mandatory=zupa&flag=on HTTP/1.1\r\n\r\n"),
                &PathParams::new(),
            )
            .unwrap();
        assert_eq!(bound.get("flag"), Some(&json!(true)));
        assert_eq!(bound.get("extra"), Some(&Value::Null));

        let err = binder
            .bind(&request("GET /get-query-params HTTP/1.1\r\n\r\n"), &PathParams::new())
            .unwrap_err();
        let errors = err.field_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].loc, vec![LocSegment::from("query"), "mandatory".into()]);
    }

    #[test]
    fn repeated_scalar_query_takes_last() {
        let binder = Binder::new("/x", [], vec![ParamSpec::query("n", Kind::Int)]).unwrap();
        let bound = binder
            .bind(&request("GET /x?n=1&n=2 HTTP/1.1\r\n\r\n"), &PathParams::new())
            .unwrap();
        assert_eq!(bound.get("n"), Some(&json!(2)));
    }

    #[test]
    fn repeated_scalar_header_takes_first() {
        let binder = Binder::new("/x", [], vec![ParamSpec::header("x_token", Kind::Str)]).unwrap();
        let bound = binder
            .bind(
                &request("GET /x HTTP/1.1\r\nX-Token: foo\r\nX-Token: bar\r\n\r\n"),
                &PathParams::new(),
            )
            .unwrap();
        assert_eq!(bound.get("x_token"), Some(&json!("foo")));
    }

    #[test]
    fn repeated_query_keys_keep_order() {
        let binder = Binder::new(
            "/items-multi-q/",
            [],
            vec![ParamSpec::query("q", Kind::list(Kind::Str)).default(json!(["zupa"]))],
        )
        .unwrap();
        let bound = binder
            .bind(&request("GET /items-multi-q/?q=3&q=90 HTTP/1.1\r\n\r\n"), &PathParams::new())
            .unwrap();
        assert_eq!(bound.get("q"), Some(&json!(["3", "90"])));

        let bound = binder
            .bind(&request("GET /items-multi-q/ HTTP/1.1\r\n\r\n"), &PathParams::new())
            .unwrap();
        assert_eq!(bound.get("q"), Some(&json!(["zupa"])));
    }

    #[test]
    fn aliased_query_with_constraints() {
        let binder = Binder::new(
            "/items/",
            [],
            vec![
                ParamSpec::query("q", Kind::Str)
                    .alias("item-query")
                    .optional()
                    .min_length(3)
                    .pattern("^fixedquery$")
                    .unwrap(),
            ],
        )
        .unwrap();

        let bound = binder
            .bind(&request("GET /items/?q=fixedquery HTTP/1.1\r\n\r\n"), &PathParams::new())
            .unwrap();
        assert_eq!(bound.get("q"), Some(&Value::Null));

        let err = binder
            .bind(&request("GET /items/?item-query=ab HTTP/1.1\r\n\r\n"), &PathParams::new())
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref e) if e.len() == 2));
        assert_eq!(err.field_errors()[0].loc, vec![LocSegment::from("query"), "item-query".into()]);
    }

    #[test]
    fn headers_and_cookies() {
        let binder = Binder::new(
            "/names/name/prz",
            [],
            vec![
                ParamSpec::cookie("ads_id", Kind::Str).optional(),
                ParamSpec::header("user_agent", Kind::Str).optional(),
                ParamSpec::header("x_token", Kind::list(Kind::Str)).optional(),
            ],
        )
        .unwrap();
        let req = request(
            "GET /names/name/prz HTTP/1.1\r\nUser-Agent: test\r\nX-Token: foo\r\nCookie: ads_id=7\r\nx-token: bar\r\n\r\n",
        );
        let bound = binder.bind(&req, &PathParams::new()).unwrap();
        assert_eq!(bound.get("ads_id"), Some(&json!("7")));
        assert_eq!(bound.get("user_agent"), Some(&json!("test")));
        assert_eq!(bound.get("x_token"), Some(&json!(["foo", "bar"])));

        let bound = binder
            .bind(&request("GET /names/name/prz HTTP/1.1\r\n\r\n"), &PathParams::new())
            .unwrap();
        assert_eq!(bound.get("x_token"), Some(&Value::Null));
    }

    #[test]
    fn single_body_is_not_nested() {
        let binder = Binder::new("/items/", [], vec![ParamSpec::body("item", Kind::model(item()))]).unwrap();
        let bound = binder
            .bind(&post("/items/", r#"{"name":"Foo","price":1.5}"#), &PathParams::new())
            .unwrap();
        assert_eq!(bound.get("item"), Some(&json!({"name": "Foo", "price": 1.5})));

        let err = binder
            .bind(&post("/items/", r#"{"item":{"name":"Foo","price":1.5}}"#), &PathParams::new())
            .unwrap_err();
        assert_eq!(err.field_errors()[0].loc, vec![LocSegment::from("body"), "name".into()]);
    }

    #[test]
    fn embedded_body_requires_key() {
        let binder = Binder::new(
            "/items/single-model/{item_id}",
            ["item_id"],
            vec![
                ParamSpec::path("item_id", Kind::Int),
                ParamSpec::body("item", Kind::model(item())).embed(),
            ],
        )
        .unwrap();
        let caps = captures(&[("item_id", "5")]);

        let bound = binder
            .bind(&post("/items/single-model/5", r#"{"item":{"name":"Foo","price":2}}"#), &caps)
            .unwrap();
        assert_eq!(bound.get("item_id"), Some(&json!(5)));
        assert_eq!(bound.get("item"), Some(&json!({"name": "Foo", "price": 2.0})));

        let err = binder
            .bind(&post("/items/single-model/5", r#"{"name":"Foo","price":2}"#), &caps)
            .unwrap_err();
        assert_eq!(err.field_errors()[0].loc, vec![LocSegment::from("body"), "item".into()]);
        assert_eq!(err.field_errors()[0].kind, ErrorKind::Missing);
    }

    #[test]
    fn multiple_body_params_each_take_a_key() {
        let user = Model::new("User").field(Field::new("username", Kind::Str));
        let binder = Binder::new(
            "/items/{item_id}",
            ["item_id"],
            vec![
                ParamSpec::path("item_id", Kind::Int),
                ParamSpec::body("item", Kind::model(item())),
                ParamSpec::body("user", Kind::model(user)),
                ParamSpec::body("counter", Kind::Int),
            ],
        )
        .unwrap();
        let body = r#"{"item":{"name":"Foo","price":3},"user":{"username":"prz"},"counter":6}"#;
        let bound = binder
            .bind(&post("/items/1", body), &captures(&[("item_id", "1")]))
            .unwrap();
        assert_eq!(bound.get("counter"), Some(&json!(6)));
        assert_eq!(bound.get("user"), Some(&json!({"username": "prz"})));
        assert_eq!(bound.len(), 4);
    }

    #[test]
    fn malformed_json_is_reported_once() {
        let binder = Binder::new("/items/", [], vec![ParamSpec::body("item", Kind::model(item()))]).unwrap();
        let err = binder.bind(&post("/items/", "{nope"), &PathParams::new()).unwrap_err();
        assert_eq!(err.field_errors().len(), 1);
        assert_eq!(err.field_errors()[0].kind, ErrorKind::JsonInvalid);
    }

    #[test]
    fn missing_body_is_reported() {
        let binder = Binder::new("/items/", [], vec![ParamSpec::body("item", Kind::model(item()))]).unwrap();
        let err = binder.bind(&post("/items/", ""), &PathParams::new()).unwrap_err();
        assert_eq!(err.field_errors()[0].loc, vec![LocSegment::from("body")]);
        assert_eq!(err.field_errors()[0].kind, ErrorKind::Missing);
    }

    #[test]
    fn every_failing_parameter_is_listed() {
        let binder = Binder::new(
            "/new-path/{item_id}",
            ["item_id"],
            vec![
                ParamSpec::path("item_id", Kind::Int).ge(1).lt(1000),
                ParamSpec::query("q", Kind::Str),
            ],
        )
        .unwrap();
        let err = binder
            .bind(&request("GET /new-path/0 HTTP/1.1\r\n\r\n"), &captures(&[("item_id", "0")]))
            .unwrap_err();
        let kinds: Vec<_> = err.field_errors().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ErrorKind::GreaterThanEqual, ErrorKind::Missing]);
        assert!(matches!(err, ApiError::Binding(_)));
    }

    #[test]
    fn extract_into_handler_types() {
        let binder = Binder::new("/names/age/{age}", ["age"], vec![ParamSpec::path("age", Kind::Int)]).unwrap();
        let bound = binder
            .bind(&request("GET /names/age/7 HTTP/1.1\r\n\r\n"), &captures(&[("age", "7")]))
            .unwrap();
        let age: i64 = bound.extract("age").unwrap();
        assert_eq!(age, 7);
        assert!(bound.extract::<i64>("nope").is_err());
    }
}
