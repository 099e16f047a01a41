//! # twig
//!
//! A small HTTP/1.1 web framework: a segment trie router with `:name` and
//! `*name` parameters, route groups with shared middleware, and an onion-style
//! middleware chain with panic recovery.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use twig::{Engine, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut engine = Engine::with_defaults();
//!     engine.get("/hello/:name", |c| {
//!         let name = c.param("name").unwrap_or("stranger").to_owned();
//!         c.string(StatusCode::Ok, format!("Hello, {name}!\n"));
//!     })?;
//!     engine.get("/assets/*filepath", |c| {
//!         let file = c.param("filepath").unwrap_or_default().to_owned();
//!         c.json(StatusCode::Ok, &serde_json::json!({ "filepath": file }));
//!     })?;
//!
//!     engine.run("127.0.0.1:9999").await?;
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;
pub mod http;
pub mod middleware;
pub mod router;
pub mod server;

pub use context::{Context, Params};
pub use engine::{Engine, RouterGroup};
pub use error::RouteError;
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use middleware::{Logger, Middleware, Recovery};
pub use router::{HandlerFunc, Router};
pub use server::{Server, ServerError};
