//! Request routing: the route table, specificity matching, and dispatch.
//!
//! Routes are declared as an [`Endpoint`] (method, path pattern, parameter
//! specs, optional response model) plus an async handler. Patterns use
//! `{name}` segments:
//!
//! | Pattern                         | Example match                | Captured            |
//! |---------------------------------|------------------------------|---------------------|
//! | `/names/name/prz`               | `/names/name/prz`            | *(none)*            |
//! | `/names/name/{name}`            | `/names/name/ola`            | `name → "ola"`      |
//! | `/items/single-model/{item_id}` | `/items/single-model/5`      | `item_id → "5"`     |
//!
//! Trailing slashes are not significant. When several routes match, the
//! one with the most literal segments wins regardless of registration order;
//! two routes that could match the same path with the same number of literal
//! segments are rejected at registration.
//!
//! Every request walks `matching → binding → validating → invoking →
//! serializing`, and leaves through a 404, 422, or 500 on the first failing
//! phase.

use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error};

use crate::binder::{Binder, ParamSpec};
use crate::context::{Context, PathParams};
use crate::error::{ApiError, Phase, RouteError};
use crate::http::{Method, Request, Response, StatusCode};
use crate::middleware::{Middleware, MiddlewareHandler, Next, from_middleware};
use crate::model::Model;

mod pattern;

pub use pattern::Pattern;

/// Type-erased async endpoint handler.
///
/// Handlers read their arguments from [`Context::param`] and return the JSON
/// value to send, or an [`ApiError`].
pub type Handler = Arc<
    dyn Fn(Context) -> Pin<Box<dyn Future<Output = Result<Value, ApiError>> + Send>>
        + Send
        + Sync
        + 'static,
>;

/// Conversion trait for async handler functions.
///
/// Any `Fn(Context) -> impl Future<Output = Result<Value, ApiError>> + Send`
/// that is also `Send + Sync + 'static` implements this automatically.
pub trait IntoHandler: Send + Sync + 'static {
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Result<Value, ApiError>> + Send>>;
}

impl<T, F> IntoHandler for T
where
    T: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = Result<Value, ApiError>> + Send + 'static,
{
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Result<Value, ApiError>> + Send>> {
        Box::pin((self)(ctx))
    }
}

/// Declaration of one route, before it is compiled into the table.
///
/// ```
/// use routebind::binder::ParamSpec;
/// use routebind::model::{Constrain, Kind};
/// use routebind::router::Endpoint;
///
/// let endpoint = Endpoint::get("/new-path/{item_id}")
///     .param(ParamSpec::path("item_id", Kind::Int).ge(1).lt(1000))
///     .param(ParamSpec::query("q", Kind::Str));
/// assert_eq!(endpoint.path(), "/new-path/{item_id}");
/// ```
#[derive(Debug, Clone)]
pub struct Endpoint {
    method: Method,
    path: String,
    params: Vec<ParamSpec>,
    response_model: Option<Model>,
}

impl Endpoint {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Vec::new(),
            response_model: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    #[must_use]
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Projects every successful handler result onto `model`.
    #[must_use]
    pub fn response_model(mut self, model: Model) -> Self {
        self.response_model = Some(model);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

// A compiled, immutable route.
struct Route {
    method: Method,
    pattern: Pattern,
    binder: Binder,
    response_model: Option<Model>,
    handler: Handler,
}

impl Route {
    async fn respond(&self, ctx: Context) -> Response {
        match self.run(ctx).await {
            Ok(value) => Response::json(StatusCode::Ok, &value),
            Err(err) => {
                match &err {
                    ApiError::HandlerFault(msg) => {
                        error!(route = %self.pattern, phase = %err.phase(), error = %msg, "handler fault");
                    }
                    other => {
                        debug!(route = %self.pattern, phase = %other.phase(), error = %other, "request rejected");
                    }
                }
                err.into_response()
            }
        }
    }

    async fn run(&self, mut ctx: Context) -> Result<Value, ApiError> {
        debug!(route = %self.pattern, phase = %Phase::Binding);
        let bound = self.binder.bind(ctx.request(), ctx.path_params())?;
        ctx.set_bound(bound);

        debug!(route = %self.pattern, phase = %Phase::Invoking);
        let value = tokio::spawn((self.handler)(ctx))
            .await
            .map_err(|join| ApiError::fault(format!("handler task failed: {join}")))??;

        let Some(model) = &self.response_model else {
            return Ok(value);
        };
        debug!(route = %self.pattern, phase = %Phase::Serializing);
        model.project(&value).map_err(|errors| {
            let detail: Vec<String> = errors.iter().map(ToString::to_string).collect();
            error!(route = %self.pattern, phase = %Phase::Serializing, model = model.name(), "response does not fit its model");
            ApiError::fault(format!("response model {}: {}", model.name(), detail.join("; ")))
        })
    }
}

/// The route table.
///
/// # Examples
///
/// ```rust,no_run
/// use routebind::router::{Endpoint, Router};
/// use serde_json::json;
///
/// let mut router = Router::new();
/// router
///     .add(Endpoint::get("/"), |_ctx| async { Ok(json!({"message": "Hello World"})) })
///     .unwrap();
/// ```
pub struct Router {
    // Sorted by descending specificity; registration order among equals.
    routes: Vec<Arc<Route>>,
    middlewares: Vec<MiddlewareHandler>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            middlewares: Vec::new(),
        }
    }

    /// Compiles `endpoint` and adds it to the table.
    ///
    /// # Errors
    ///
    /// - [`RouteError::Ambiguous`] when an equally specific route for the
    ///   same method can match a common path.
    /// - Any pattern or parameter error from compiling the endpoint.
    pub fn add(&mut self, endpoint: Endpoint, handler: impl IntoHandler) -> Result<(), RouteError> {
        let Endpoint {
            method,
            path,
            params,
            response_model,
        } = endpoint;

        let pattern = Pattern::parse(&path)?;
        let binder = Binder::new(&path, pattern.param_names(), params)?;

        let specificity = pattern.specificity();
        if let Some(existing) = self.routes.iter().find(|r| {
            r.method == method && r.pattern.specificity() == specificity && r.pattern.overlaps(&pattern)
        }) {
            return Err(RouteError::Ambiguous {
                method,
                path,
                existing: existing.pattern.to_string(),
            });
        }

        debug!(%method, %path, specificity, "route registered");
        let handler: Handler = Arc::new(move |ctx| handler.call(ctx));
        let at = self
            .routes
            .iter()
            .position(|r| r.pattern.specificity() < specificity)
            .unwrap_or(self.routes.len());
        self.routes.insert(
            at,
            Arc::new(Route {
                method,
                pattern,
                binder,
                response_model,
                handler,
            }),
        );
        Ok(())
    }

    /// Appends a middleware layer. Layers run in the order they were added.
    pub fn layer(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.middlewares.push(from_middleware(Arc::new(middleware)));
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    // First route in specificity order whose method and pattern match.
    fn find(&self, method: &Method, path: &str) -> Option<(Arc<Route>, PathParams)> {
        self.routes
            .iter()
            .filter(|r| &r.method == method)
            .find_map(|r| r.pattern.matches(path).map(|params| (Arc::clone(r), params)))
    }

    /// Runs `request` through the middleware chain and the matching route.
    pub async fn dispatch(&self, request: Request) -> Response {
        debug!(method = %request.method(), path = %request.path(), phase = %Phase::Matching);

        let mut chain = self.middlewares.clone();
        let ctx = match self.find(request.method(), request.path()) {
            Some((route, params)) => {
                chain.push(endpoint_step(route));
                Context::with_params(request, params)
            }
            None => {
                chain.push(not_found_step());
                Context::new(request)
            }
        };
        Next::new(chain).run(ctx).await
    }
}

type StepFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

fn endpoint_step(route: Arc<Route>) -> MiddlewareHandler {
    Arc::new(move |ctx: Context, _next: Next| -> StepFuture {
        let route = Arc::clone(&route);
        Box::pin(async move { route.respond(ctx).await })
    })
}

fn not_found_step() -> MiddlewareHandler {
    Arc::new(|ctx: Context, _next: Next| -> StepFuture {
        let err = ApiError::NotFound {
            method: ctx.request().method().clone(),
            path: ctx.request().path().to_owned(),
        };
        debug!(phase = %err.phase(), error = %err, "request rejected");
        Box::pin(async move { err.into_response() })
    })
}
