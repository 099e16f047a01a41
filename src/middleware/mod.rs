//! Middleware — handlers that wrap the rest of the chain.
//!
//! A middleware is an ordinary handler that calls [`Context::next`] somewhere
//! in its body. Code before the call runs on the way in, code after it runs on
//! the way out, once every handler nested deeper has returned:
//!
//! ```text
//! Logger ─┐                                   ┌─ Logger (logs status + latency)
//!         Recovery ─┐               ┌─ Recovery (turns a panic into a 500)
//!                   route handler ──┘
//! ```
//!
//! ## Core types
//!
//! - [`Middleware`] — trait implemented by all middleware, including every
//!   `Fn(&mut Context)` closure.
//! - [`from_middleware`] — erases a [`Middleware`] into a [`HandlerFunc`] chain
//!   entry.
//! - [`Logger`] — request/response logger.
//! - [`Recovery`] — panic-to-500 converter.

use std::sync::Arc;
use std::time::Instant;

mod recovery;

pub use recovery::Recovery;

use crate::context::Context;
use crate::router::HandlerFunc;

/// The core trait for all middleware.
///
/// Implementors receive the request's [`Context`] and may:
///
/// - **Pass through** — call `ctx.next()` and do nothing else.
/// - **Short-circuit** — write a response and return without calling `next`,
///   or call [`Context::fail`] / [`Context::abort`].
/// - **Decorate** — call `ctx.next()` and inspect or amend the response it left.
///
/// Closures taking `&mut Context` implement this trait, so
/// `group.use_middleware(|c: &mut Context| c.next())` works directly.
pub trait Middleware: Send + Sync {
    fn handle(&self, ctx: &mut Context);
}

impl<F> Middleware for F
where
    F: Fn(&mut Context) + Send + Sync,
{
    fn handle(&self, ctx: &mut Context) {
        self(ctx)
    }
}

/// Converts a [`Middleware`] into a [`HandlerFunc`] chain entry.
///
/// # Examples
///
/// ```rust,no_run
/// use twig::middleware::{Logger, from_middleware};
///
/// let handler = from_middleware(Logger);
/// ```
pub fn from_middleware<M>(middleware: M) -> HandlerFunc
where
    M: Middleware + 'static,
{
    Arc::new(move |ctx: &mut Context| middleware.handle(ctx))
}

/// Logs method, path, final status and latency of every request.
///
/// Install it before [`Recovery`] so requests that panic are logged with the
/// `500` that recovery wrote:
///
/// ```text
/// [200] GET /hello/geek in 18.2µs
/// ```
pub struct Logger;

impl Middleware for Logger {
    fn handle(&self, ctx: &mut Context) {
        let start = Instant::now();

        ctx.next();

        let status = ctx.status_code().as_u16();
        let elapsed = start.elapsed();
        if ctx.status_code().is_server_error() {
            tracing::warn!(
                status,
                method = %ctx.method(),
                path = %ctx.path(),
                "[{status}] {} {} in {elapsed:?}",
                ctx.method(),
                ctx.path()
            );
        } else {
            tracing::info!(
                status,
                method = %ctx.method(),
                path = %ctx.path(),
                "[{status}] {} {} in {elapsed:?}",
                ctx.method(),
                ctx.path()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::http::{Request, StatusCode};

    fn get(path: &str) -> Request {
        let raw = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        Request::parse(raw.as_bytes()).unwrap().0
    }

    struct Tag(&'static str, Arc<Mutex<Vec<&'static str>>>);

    impl Middleware for Tag {
        fn handle(&self, ctx: &mut Context) {
            self.1.lock().unwrap().push(self.0);
            ctx.next();
        }
    }

    #[test]
    fn struct_and_closure_middleware_share_a_chain() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let closure_seen = Arc::clone(&seen);
        let chain = vec![
            from_middleware(Tag("struct", Arc::clone(&seen))),
            from_middleware(move |c: &mut Context| {
                closure_seen.lock().unwrap().push("closure");
                c.next();
            }),
            from_middleware(|c: &mut Context| c.string(StatusCode::Ok, "ok")),
        ];
        let mut ctx = Context::with_handlers(get("/"), chain);
        ctx.next();

        assert_eq!(*seen.lock().unwrap(), ["struct", "closure"]);
        assert_eq!(ctx.response().content(), b"ok");
    }

    #[test]
    fn logger_passes_response_through() {
        let chain = vec![
            from_middleware(Logger),
            from_middleware(|c: &mut Context| c.string(StatusCode::Accepted, "queued")),
        ];
        let mut ctx = Context::with_handlers(get("/jobs"), chain);
        ctx.next();

        assert_eq!(ctx.status_code(), StatusCode::Accepted);
        assert_eq!(ctx.response().content(), b"queued");
    }
}
