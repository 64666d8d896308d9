//! Response shaping: allow-list projection of outgoing values.
//!
//! A handler may return a richer value than its declared response model,
//! typically the input model it was given. Projection keeps only the
//! declared fields, so anything else (a password, an internal flag) never
//! reaches the wire even though the returned value carries it.

use serde_json::{Map, Value};

use super::{Kind, Model};
use crate::error::{FieldError, LocSegment, child};

impl Model {
    /// Projects `value` onto exactly this model's field set.
    ///
    /// Nested models and lists of models are projected recursively. An absent
    /// optional field is filled with its default (or `null`).
    ///
    /// # Errors
    ///
    /// Returns the missing required fields, or a type error when `value` is
    /// not an object. Either means the handler broke its response contract.
    ///
    /// ```
    /// use routebind::model::{Field, Kind, Model};
    /// use serde_json::json;
    ///
    /// let out = Model::new("UserOut").field(Field::new("username", Kind::Str));
    /// let shaped = out.project(&json!({"username": "prz", "password": "hunter2"})).unwrap();
    /// assert_eq!(shaped, json!({"username": "prz"}));
    /// ```
    pub fn project(&self, value: &Value) -> Result<Value, Vec<FieldError>> {
        let mut errors = Vec::new();
        let projected = project_model(self, value, &["response".into()], &mut errors);
        if errors.is_empty() {
            Ok(projected)
        } else {
            Err(errors)
        }
    }
}

fn project_model(model: &Model, value: &Value, loc: &[LocSegment], errors: &mut Vec<FieldError>) -> Value {
    let Value::Object(source) = value else {
        errors.push(model.not_an_object(loc));
        return Value::Null;
    };

    let mut out = Map::with_capacity(model.fields.len());
    for field in &model.fields {
        let field_loc = child(loc, field.name.as_str());
        let projected = match source.get(&field.name) {
            Some(Value::Null) | None if field.required => {
                errors.push(FieldError::missing(field_loc));
                continue;
            }
            Some(Value::Null) | None => field.fallback(),
            Some(v) => project_kind(&field.kind, v, &field_loc, errors),
        };
        out.insert(field.name.clone(), projected);
    }
    Value::Object(out)
}

fn project_kind(kind: &Kind, value: &Value, loc: &[LocSegment], errors: &mut Vec<FieldError>) -> Value {
    match (kind, value) {
        (Kind::Model(model), v) => project_model(model, v, loc, errors),
        (Kind::List(inner), Value::Array(items)) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| project_kind(inner, item, &child(loc, i), errors))
                .collect(),
        ),
        (_, v) => v.clone(),
    }
}
