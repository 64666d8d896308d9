//! Declarative value shapes: kinds, constraints, and models.
//!
//! A [`Model`] is an ordered list of [`Field`]s. Models are declared once at
//! startup and used in two directions:
//!
//! - inbound, [`Model::validate`] coerces a JSON body into the declared shape,
//!   collecting every [`FieldError`] instead of stopping at the first;
//! - outbound, [`Model::project`] filters a handler's return value down to an
//!   allow-list of fields (see [`projection`]).

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{ErrorKind, FieldError, LocSegment, child};

mod coerce;
mod constraints;
pub mod projection;

pub use coerce::coerce;
pub use constraints::{Constrain, Constraints};

/// The type of a parameter or model field.
#[derive(Debug, Clone)]
pub enum Kind {
    Str,
    Int,
    Float,
    Bool,
    /// Absolute URL with a host, kept as its string form.
    Url,
    /// String that must equal one of the listed member values exactly.
    Enum(&'static [&'static str]),
    List(Box<Kind>),
    Model(Arc<Model>),
}

impl Kind {
    pub fn list(inner: Kind) -> Self {
        Self::List(Box::new(inner))
    }

    pub fn model(model: Model) -> Self {
        Self::Model(Arc::new(model))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// Human readable type name, as reported back by the tutorial handlers.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Str => "string",
            Self::Int => "integer",
            Self::Float => "number",
            Self::Bool => "boolean",
            Self::Url => "url",
            Self::Enum(_) => "enum",
            Self::List(_) => "array",
            Self::Model(_) => "object",
        }
    }
}

/// A named, typed member of a [`Model`].
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    kind: Kind,
    required: bool,
    default: Option<Value>,
    constraints: Constraints,
}

impl Field {
    /// A required field.
    pub fn new(name: impl Into<String>, kind: Kind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            default: None,
            constraints: Constraints::default(),
        }
    }

    /// Makes the field optional; an absent value becomes `null`.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Makes the field optional with a fallback value.
    #[must_use]
    pub fn default(mut self, value: Value) -> Self {
        self.required = false;
        self.default = Some(value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Value used when the field is absent: the default, else `null`.
    fn fallback(&self) -> Value {
        self.default.clone().unwrap_or(Value::Null)
    }
}

impl Constrain for Field {
    fn constraints_mut(&mut self) -> &mut Constraints {
        &mut self.constraints
    }
}

/// A request or response shape.
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    fields: Vec<Field>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Appends a field. A field with the same name replaces the earlier one.
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    /// Starts a new model carrying every field of `self`.
    ///
    /// ```
    /// use routebind::model::{Field, Kind, Model};
    ///
    /// let user = Model::new("User").field(Field::new("username", Kind::Str));
    /// let user_in = user.extend("UserIn").field(Field::new("password", Kind::Str));
    /// assert_eq!(user_in.field_names().collect::<Vec<_>>(), ["username", "password"]);
    /// ```
    pub fn extend(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: self.fields.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Coerces `value` into this model, located at `loc` for error reporting.
    ///
    /// Keys that are not declared are dropped. Absent optional fields are
    /// filled with their default (or `null`).
    ///
    /// # Errors
    ///
    /// Returns every field error found, in declaration order.
    pub fn validate(&self, value: &Value, loc: &[LocSegment]) -> Result<Value, Vec<FieldError>> {
        let mut errors = Vec::new();
        let coerced = self.validate_into(value, loc, &mut errors);
        match coerced {
            Some(v) if errors.is_empty() => Ok(v),
            _ => Err(errors),
        }
    }

    pub(crate) fn not_an_object(&self, loc: &[LocSegment]) -> FieldError {
        FieldError::new(
            loc.to_vec(),
            ErrorKind::ModelType,
            format!("Input should be a valid object ({})", self.name),
        )
    }

    pub(crate) fn validate_into(
        &self,
        value: &Value,
        loc: &[LocSegment],
        errors: &mut Vec<FieldError>,
    ) -> Option<Value> {
        let Value::Object(input) = value else {
            errors.push(self.not_an_object(loc));
            return None;
        };

        let before = errors.len();
        let mut out = Map::with_capacity(self.fields.len());
        for field in &self.fields {
            let field_loc = child(loc, field.name.as_str());
            match input.get(&field.name) {
                None | Some(Value::Null) if !field.required => {
                    out.insert(field.name.clone(), field.fallback());
                }
                None | Some(Value::Null) => errors.push(FieldError::missing(field_loc)),
                Some(raw) => {
                    if let Some(v) = coerce(&field.kind, raw, &field_loc, errors) {
                        field.constraints.check(&v, &field_loc, errors);
                        out.insert(field.name.clone(), v);
                    }
                }
            }
        }

        (errors.len() == before).then_some(Value::Object(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item() -> Model {
        Model::new("Item")
            .field(Field::new("name", Kind::Str))
            .field(Field::new("description", Kind::Str).optional())
            .field(Field::new("price", Kind::Float))
            .field(Field::new("tax", Kind::Float).optional())
    }

    fn body() -> Vec<LocSegment> {
        vec!["body".into()]
    }

    #[test]
    fn validate_fills_optionals_and_drops_unknown() {
        let v = item()
            .validate(&json!({"name": "Foo", "price": 2, "color": "red"}), &body())
            .unwrap();
        assert_eq!(
            v,
            json!({"name": "Foo", "description": null, "price": 2.0, "tax": null})
        );
    }

    #[test]
    fn validate_collects_every_error() {
        let errors = item()
            .validate(&json!({"price": "cheap"}), &body())
            .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].kind, ErrorKind::Missing);
        assert_eq!(errors[0].loc, vec![LocSegment::from("body"), "name".into()]);
        assert_eq!(errors[1].kind, ErrorKind::FloatParsing);
    }

    #[test]
    fn validate_rejects_non_object() {
        let errors = item().validate(&json!([1, 2]), &body()).unwrap_err();
        assert_eq!(errors[0].kind, ErrorKind::ModelType);
    }

    #[test]
    fn nested_models_report_full_location() {
        let image = Model::new("Image")
            .field(Field::new("url", Kind::Url))
            .field(Field::new("name", Kind::Str));
        let offer = Model::new("Offer")
            .field(Field::new("name", Kind::Str))
            .field(Field::new("images", Kind::list(Kind::model(image))).optional());

        let errors = offer
            .validate(
                &json!({"name": "o", "images": [{"url": "https://a.example/x.png", "name": "a"}, {"url": "nope", "name": "b"}]}),
                &body(),
            )
            .unwrap_err();
        assert_eq!(
            errors[0].loc,
            vec![LocSegment::from("body"), "images".into(), 1.into(), "url".into()]
        );
    }

    #[test]
    fn field_constraints_apply() {
        let m = Model::new("Named").field(Field::new("name", Kind::Str).min_length(3));
        let errors = m.validate(&json!({"name": "ab"}), &body()).unwrap_err();
        assert_eq!(errors[0].kind, ErrorKind::StringTooShort);
    }

    #[test]
    fn redeclared_field_replaces() {
        let m = item().field(Field::new("price", Kind::Int));
        assert_eq!(m.fields().len(), 4);
        assert!(matches!(m.fields()[2].kind(), Kind::Int));
    }
}
