use std::fmt;

use crate::context::PathParams;
use crate::error::RouteError;

// A single path segment: a literal or a `{name}` capture.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled route pattern such as `/items/single-model/{item_id}`.
///
/// A trailing slash is not significant: `/items/` and `/items` compile to the
/// same segments.
#[derive(Debug, Clone)]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Compiles `path` into segments.
    ///
    /// # Errors
    ///
    /// - [`RouteError::InvalidPath`] for a path without a leading `/`, an
    ///   empty `{}` capture, or stray braces.
    /// - [`RouteError::DuplicateParam`] when a capture name repeats.
    pub fn parse(path: &str) -> Result<Self, RouteError> {
        let invalid = |reason| RouteError::InvalidPath {
            path: path.to_owned(),
            reason,
        };

        if !path.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }

        let mut segments = Vec::new();
        for seg in path.split('/').filter(|s| !s.is_empty()) {
            let segment = match seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some("") => return Err(invalid("empty parameter name")),
                Some(name) if name.contains(['{', '}']) => return Err(invalid("unbalanced braces")),
                Some(name) => Segment::Param(name.to_owned()),
                None if seg.contains(['{', '}']) => return Err(invalid("unbalanced braces")),
                None => Segment::Literal(seg.to_owned()),
            };

            if let Segment::Param(name) = &segment {
                if segments.contains(&segment) {
                    return Err(RouteError::DuplicateParam {
                        name: name.clone(),
                        path: path.to_owned(),
                    });
                }
            }
            segments.push(segment);
        }

        Ok(Self {
            raw: path.to_owned(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Number of literal segments. Higher wins when several routes match.
    pub fn specificity(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// `true` if some path is matched by both patterns.
    pub fn overlaps(&self, other: &Pattern) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (Segment::Literal(a), Segment::Literal(b)) => a == b,
                    _ => true,
                })
    }

    /// Matches `path`, returning the percent-decoded captures.
    ///
    /// Bytes that do not decode to UTF-8 become U+FFFD, so such a path still
    /// reaches its route instead of falling through to a 404.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = PathParams::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            let bytes = urlencoding::decode_binary(part.as_bytes());
            let decoded = String::from_utf8_lossy(&bytes);
            match segment {
                Segment::Literal(lit) if *lit == decoded => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => params.insert(name.clone(), decoded.into_owned()),
            }
        }
        Some(params)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
