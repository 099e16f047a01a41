//! Per-request context: path parameters, the handler chain and its cursor, and
//! the response being written.
//!
//! A [`Context`] is created by the [`Engine`](crate::engine::Engine) for every
//! request and owned exclusively by that request's chain. Handlers receive it
//! as `&mut Context` and call [`Context::next`] to run the rest of the chain:
//!
//! ```rust,no_run
//! use std::time::Instant;
//! use twig::context::Context;
//!
//! fn timing(c: &mut Context) {
//!     let start = Instant::now();
//!     c.next();
//!     tracing::info!(elapsed = ?start.elapsed(), "handled {}", c.path());
//! }
//! ```

use std::collections::HashMap;

use serde::Serialize;

use crate::http::{Method, Request, Response, StatusCode};
use crate::router::HandlerFunc;

/// Path parameters extracted from the matched route.
///
/// Keys are the names of the `:name` and `*name` segments of the matched
/// pattern; values are the corresponding pieces of the request path.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Params {
    map: HashMap<String, String>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.map.insert(key.into(), value.into());
    }

    /// Get a parameter by name. Unknown names yield `None`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
}

/// Per-request state threaded through the handler chain.
pub struct Context {
    request: Request,
    method: Method,
    path: String,
    params: Params,
    handlers: Vec<HandlerFunc>,
    // Position of the next handler to run.
    index: usize,
    response: Response,
}

impl Context {
    /// Create a context for `request` with an empty chain.
    pub fn new(request: Request) -> Self {
        let method = request.method().clone();
        let path = request.path().to_owned();
        let keep_alive = request.is_keep_alive();
        let mut response = Response::new(StatusCode::Ok);
        response.set_keep_alive(keep_alive);
        Self {
            request,
            method,
            path,
            params: Params::new(),
            handlers: Vec::new(),
            index: 0,
            response,
        }
    }

    /// Create a context that will run `handlers` in order.
    pub fn with_handlers(request: Request, handlers: Vec<HandlerFunc>) -> Self {
        let mut ctx = Self::new(request);
        ctx.handlers = handlers;
        ctx
    }

    /// Run the handler at the cursor, advancing the cursor past it first.
    ///
    /// Whatever the handler does after its own `next` call runs once every
    /// handler nested deeper has returned. A handler that does not call `next`
    /// ends the chain: later handlers never run for this request. Calling
    /// `next` on an exhausted or aborted chain does nothing.
    pub fn next(&mut self) {
        if let Some(handler) = self.handlers.get(self.index).cloned() {
            self.index += 1;
            handler(self);
        }
    }

    /// Skip every handler that has not started yet.
    ///
    /// Handlers already on the call stack still finish the code after their
    /// `next` call.
    pub fn abort(&mut self) {
        self.index = self.handlers.len();
    }

    pub fn is_aborted(&self) -> bool {
        self.index >= self.handlers.len()
    }

    /// Abort the chain and respond with `status` and `{"message": message}`.
    pub fn fail(&mut self, status: StatusCode, message: &str) {
        self.abort();
        self.json(status, &ErrorBody { message });
    }

    pub(crate) fn push_handler(&mut self, handler: HandlerFunc) {
        self.handlers.push(handler);
    }

    pub(crate) fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Value of the path parameter `key`, e.g. `name` for `/hello/:name`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key)
    }

    /// Decoded query string value for `key`.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.request.query_param(key)
    }

    /// Decoded url-encoded form body value for `key`.
    pub fn post_form(&self, key: &str) -> Option<String> {
        self.request.form_value(key)
    }

    pub fn status(&mut self, status: StatusCode) {
        self.response.set_status(status);
    }

    // Drop whatever a handler had written before it faulted.
    pub(crate) fn reset_response(&mut self) {
        self.response.reset();
    }

    pub fn status_code(&self) -> StatusCode {
        self.response.status()
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.response.set_header(name, value);
    }

    /// Respond with a `text/plain` body.
    pub fn string(&mut self, status: StatusCode, body: impl Into<String>) {
        let body: String = body.into();
        self.set_header("Content-Type", "text/plain; charset=utf-8");
        self.status(status);
        self.response.set_body(body);
    }

    /// Respond with `value` serialized as JSON.
    ///
    /// A value that fails to serialize produces a `500` with the serializer
    /// error as plain text instead.
    pub fn json<T>(&mut self, status: StatusCode, value: &T)
    where
        T: Serialize + ?Sized,
    {
        match serde_json::to_vec(value) {
            Ok(body) => {
                self.set_header("Content-Type", "application/json");
                self.status(status);
                self.response.set_body(body);
            }
            Err(e) => {
                tracing::error!(error = %e, path = %self.path, "failed to serialize JSON response");
                self.string(StatusCode::InternalServerError, e.to_string());
            }
        }
    }

    /// Respond with raw bytes; the content type is left to the caller.
    pub fn data(&mut self, status: StatusCode, body: impl Into<Vec<u8>>) {
        self.status(status);
        self.response.set_body(body);
    }

    /// Respond with an HTML document given as a string.
    pub fn html(&mut self, status: StatusCode, body: impl Into<String>) {
        let body: String = body.into();
        self.set_header("Content-Type", "text/html; charset=utf-8");
        self.status(status);
        self.response.set_body(body);
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn into_response(self) -> Response {
        self.response
    }
}
