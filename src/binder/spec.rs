use std::fmt;

use serde_json::Value;

use crate::model::{Constrain, Constraints, Kind};

/// Where a parameter's value comes from. Every parameter has exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Path,
    Query,
    Body,
    Header,
    Cookie,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Body => "body",
            Self::Header => "header",
            Self::Cookie => "cookie",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration of one handler parameter.
///
/// ```
/// use routebind::binder::{ParamSpec, Source};
/// use routebind::model::{Constrain, Kind};
///
/// let q = ParamSpec::query("q", Kind::Str)
///     .alias("item-query")
///     .optional()
///     .min_length(3)
///     .max_length(50)
///     .pattern("^fixedquery$")
///     .unwrap();
/// assert_eq!(q.source(), Source::Query);
/// assert_eq!(q.key(), "item-query");
/// ```
#[derive(Debug, Clone)]
pub struct ParamSpec {
    name: String,
    source: Source,
    kind: Kind,
    required: bool,
    default: Option<Value>,
    constraints: Constraints,
    alias: Option<String>,
    embed: bool,
}

impl ParamSpec {
    fn new(name: impl Into<String>, source: Source, kind: Kind) -> Self {
        Self {
            name: name.into(),
            source,
            kind,
            required: true,
            default: None,
            constraints: Constraints::default(),
            alias: None,
            embed: false,
        }
    }

    pub fn path(name: impl Into<String>, kind: Kind) -> Self {
        Self::new(name, Source::Path, kind)
    }

    pub fn query(name: impl Into<String>, kind: Kind) -> Self {
        Self::new(name, Source::Query, kind)
    }

    pub fn body(name: impl Into<String>, kind: Kind) -> Self {
        Self::new(name, Source::Body, kind)
    }

    /// A header parameter. Unless aliased, `_` in the name is looked up as `-`.
    pub fn header(name: impl Into<String>, kind: Kind) -> Self {
        Self::new(name, Source::Header, kind)
    }

    pub fn cookie(name: impl Into<String>, kind: Kind) -> Self {
        Self::new(name, Source::Cookie, kind)
    }

    /// Binds `null` when the value is absent.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Binds `value` when the value is absent.
    #[must_use]
    pub fn default(mut self, value: Value) -> Self {
        self.required = false;
        self.default = Some(value);
        self
    }

    /// Reads the value under `alias` instead of the parameter name.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Nests a lone body parameter under its own key.
    #[must_use]
    pub fn embed(mut self) -> Self {
        self.embed = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_embedded(&self) -> bool {
        self.embed
    }

    pub(crate) fn default_value(&self) -> Value {
        self.default.clone().unwrap_or(Value::Null)
    }

    pub(crate) fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    /// The key the value is read under in its source.
    pub fn key(&self) -> String {
        match (&self.alias, self.source) {
            (Some(alias), _) => alias.clone(),
            (None, Source::Header) => self.name.replace('_', "-"),
            (None, _) => self.name.clone(),
        }
    }
}

impl Constrain for ParamSpec {
    fn constraints_mut(&mut self) -> &mut Constraints {
        &mut self.constraints
    }
}
