//! Per-request context handed through middleware to the endpoint handler.
//!
//! A [`Context`] starts out holding the request and the path segments the
//! router captured. Once binding succeeds it also carries the
//! [`BoundParams`], which is what handlers read their arguments from.

use std::collections::HashMap;

use serde::de::DeserializeOwned;

use crate::binder::BoundParams;
use crate::error::ApiError;
use crate::http::Request;

/// Raw path segments captured by the matched route, already percent-decoded.
#[derive(Default, Debug, Clone)]
pub struct PathParams {
    map: HashMap<String, String>,
}

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: String, value: String) {
        self.map.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Per-request state: the request, its path captures and its bound parameters.
pub struct Context {
    request: Request,
    path: PathParams,
    bound: BoundParams,
}

impl Context {
    /// A context for a request that matched no route.
    pub fn new(request: Request) -> Self {
        Self::with_params(request, PathParams::new())
    }

    pub fn with_params(request: Request, path: PathParams) -> Self {
        Self {
            request,
            path,
            bound: BoundParams::default(),
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn path_params(&self) -> &PathParams {
        &self.path
    }

    /// Bound parameters. Empty until the route's binder has run.
    pub fn bound(&self) -> &BoundParams {
        &self.bound
    }

    /// Reads a bound parameter as `T`.
    ///
    /// # Errors
    ///
    /// [`ApiError::HandlerFault`] if `name` was never declared on the route or
    /// does not deserialize into `T`.
    pub fn param<T: DeserializeOwned>(&self, name: &str) -> Result<T, ApiError> {
        self.bound.extract(name)
    }

    pub(crate) fn set_bound(&mut self, bound: BoundParams) {
        self.bound = bound;
    }
}
