use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::{self, AssertUnwindSafe};

use super::Middleware;
use crate::context::Context;
use crate::http::StatusCode;

/// Converts a panic anywhere deeper in the chain into a `500` response.
///
/// The rest of the chain runs inside [`std::panic::catch_unwind`]. When a
/// handler panics, handlers that had not started yet never run, handlers that
/// were unwinding skip their "after" code, and this middleware logs the panic
/// message with a backtrace and answers:
///
/// ```text
/// HTTP/1.1 500 Internal Server Error
/// Content-Type: application/json
///
/// {"message":"Internal Server Error"}
/// ```
///
/// Middleware installed before `Recovery` still sees the request complete
/// normally, which is why [`Logger`](super::Logger) goes first.
pub struct Recovery;

impl Middleware for Recovery {
    fn handle(&self, ctx: &mut Context) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| ctx.next()));

        if let Err(payload) = outcome {
            let message = panic_message(payload.as_ref());
            let trace = Backtrace::force_capture();
            tracing::error!(
                method = %ctx.method(),
                path = %ctx.path(),
                "{message}\nTraceback:\n{trace}"
            );
            ctx.reset_response();
            ctx.fail(StatusCode::InternalServerError, "Internal Server Error");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked with a non-string payload".to_owned()
    }
}
