//! # routebind
//!
//! Route matching and request binding for a small JSON API, on a
//! from-scratch async HTTP/1.1 server.
//!
//! Routes are declared with their parameters up front. The router picks the
//! most specific matching route, binds every parameter from its source
//! (path, query, body, header, or cookie), checks declared constraints, and
//! only then calls the handler. Whatever the handler returns can be
//! projected onto a response model, so undeclared fields never leave the
//! server.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use routebind::binder::ParamSpec;
//! use routebind::model::Kind;
//! use routebind::router::{Endpoint, Router};
//! use routebind::{ApiError, Context, Server, ServerConfig};
//! use serde_json::json;
//!
//! async fn read_age(ctx: Context) -> Result<serde_json::Value, ApiError> {
//!     Ok(json!({ "Age": ctx.param::<i64>("age")? }))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut router = Router::new();
//!     router.add(
//!         Endpoint::get("/names/age/{age}").param(ParamSpec::path("age", Kind::Int)),
//!         read_age,
//!     )?;
//!
//!     let server = Server::bind(&ServerConfig::default()).await?;
//!     server.serve(router).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod binder;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod middleware;
pub mod model;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use context::Context;
pub use error::{ApiError, FieldError, RouteError};
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use router::{Endpoint, Router};
pub use server::{Server, ServerError};
