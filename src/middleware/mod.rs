//! Middleware pipeline: composable logic around endpoint dispatch.
//!
//! The router builds one chain per request: every registered layer in
//! registration order, followed by the terminal step (the matched endpoint,
//! or the 404 responder when nothing matched).
//!
//! - [`Middleware`] is the trait all layers implement.
//! - [`Next`] is the cursor into the rest of the chain.
//! - [`MiddlewareHandler`] is the type-erased form the chain stores.
//! - [`LoggerMiddleware`] logs one line per request.

use std::{future::Future, pin::Pin, sync::Arc};

use tokio::time::Instant;
use tracing::info;

use crate::context::Context;
use crate::error::ApiError;
use crate::http::Response;

/// A cursor into the remaining middleware chain for a single request.
///
/// `Next` is consumed by [`run`](Self::run), so a layer can forward the
/// request at most once.
///
/// ```rust,no_run
/// use std::pin::Pin;
/// use routebind::{Response, context::Context, middleware::{Middleware, Next}};
///
/// struct PassThrough;
///
/// impl Middleware for PassThrough {
///     fn handle(
///         &self,
///         ctx: Context,
///         next: Next,
///     ) -> Pin<Box<dyn std::future::Future<Output = Response> + Send>> {
///         Box::pin(async move { next.run(ctx).await })
///     }
/// }
/// ```
pub struct Next {
    middlewares: Arc<[MiddlewareHandler]>,
    index: usize,
}

/// A type-erased, reference-counted chain step.
pub type MiddlewareHandler = Arc<
    dyn Fn(Context, Next) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync + 'static,
>;

/// Converts a [`Middleware`] implementation into a [`MiddlewareHandler`].
pub fn from_middleware<M>(middleware: Arc<M>) -> MiddlewareHandler
where
    M: Middleware + 'static,
{
    Arc::new(move |ctx: Context, next: Next| middleware.handle(ctx, next))
}

impl Next {
    pub fn new(middlewares: impl Into<Arc<[MiddlewareHandler]>>) -> Self {
        Self {
            middlewares: middlewares.into(),
            index: 0,
        }
    }

    /// Invokes the next step and returns its response.
    ///
    /// Running past the end of the chain means no step produced a response,
    /// which is reported as a 500.
    pub async fn run(mut self, ctx: Context) -> Response {
        match self.middlewares.get(self.index).cloned() {
            Some(handler) => {
                self.index += 1;
                handler(ctx, self).await
            }
            None => ApiError::fault("middleware chain ended without a response").into_response(),
        }
    }
}

/// A layer in the request pipeline.
///
/// Implementors may pass through (`next.run(ctx).await`), short-circuit by
/// returning a [`Response`] without calling `next`, or decorate the response
/// produced downstream.
pub trait Middleware: Send + Sync {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>>;
}

/// Logs method, path, status, and elapsed time once the response is ready.
///
/// ```text
/// GET /names/age/7 - 200 (143µs)
/// ```
pub struct LoggerMiddleware;

impl Middleware for LoggerMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        Box::pin(async move {
            let start = Instant::now();
            let method = ctx.request().method().to_string();
            let path = ctx.request().path().to_owned();

            let response = next.run(ctx).await;

            info!(
                "{} {} - {} ({:?})",
                method,
                path,
                response.status().as_u16(),
                start.elapsed()
            );
            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Request, StatusCode};

    fn ctx() -> Context {
        let (req, _) = Request::parse(b"GET /mw HTTP/1.1\r\n\r\n").unwrap();
        Context::new(req)
    }

    fn terminal(status: StatusCode) -> MiddlewareHandler {
        Arc::new(
            move |_ctx: Context, _next: Next| -> Pin<Box<dyn Future<Output = Response> + Send>> {
                Box::pin(async move { Response::new(status) })
            },
        )
    }

    struct Stamp(&'static str);

    impl Middleware for Stamp {
        fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
            let tag = self.0;
            Box::pin(async move { next.run(ctx).await.header("X-Layer", tag) })
        }
    }

    struct Deny;

    impl Middleware for Deny {
        fn handle(&self, _ctx: Context, _next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
            Box::pin(async { Response::new(StatusCode::BadRequest) })
        }
    }

    #[tokio::test]
    async fn empty_chain_is_a_fault() {
        let res = Next::new(Vec::<MiddlewareHandler>::new()).run(ctx()).await;
        assert_eq!(res.status(), StatusCode::InternalServerError);
    }

    #[tokio::test]
    async fn layers_run_in_order_and_decorate() {
        let chain = vec![
            from_middleware(Arc::new(Stamp("outer"))),
            from_middleware(Arc::new(Stamp("inner"))),
            terminal(StatusCode::Ok),
        ];
        let res = Next::new(chain).run(ctx()).await;
        assert_eq!(res.status(), StatusCode::Ok);
        let layers: Vec<_> = res.headers().get_all("x-layer").collect();
        assert_eq!(layers, vec!["inner", "outer"]);
    }

    #[tokio::test]
    async fn short_circuit_skips_terminal() {
        let chain = vec![from_middleware(Arc::new(Deny)), terminal(StatusCode::Ok)];
        let res = Next::new(chain).run(ctx()).await;
        assert_eq!(res.status(), StatusCode::BadRequest);
    }

    #[tokio::test]
    async fn logger_passes_response_through() {
        let chain = vec![from_middleware(Arc::new(LoggerMiddleware)), terminal(StatusCode::Created)];
        let res = Next::new(chain).run(ctx()).await;
        assert_eq!(res.status(), StatusCode::Created);
    }
}
