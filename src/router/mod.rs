//! Request routing — map (method, path) pairs to handlers through per-method
//! segment tries.
//!
//! Three segment kinds are supported:
//!
//! | Pattern              | Example match              | Captured params                |
//! |----------------------|----------------------------|--------------------------------|
//! | `/users`             | `/users`                   | *(none)*                       |
//! | `/users/:id`         | `/users/42`                | `id → "42"`                    |
//! | `/files/*filepath`   | `/files/docs/readme.txt`   | `filepath → "docs/readme.txt"` |
//!
//! Leading, trailing and repeated slashes are ignored on both patterns and
//! paths. A literal and a parameter may share a position (`/hello/:name` and
//! `/hello/b/c`); lookup backtracks between them and only a route whose segment
//! count fits the path can match.

use std::collections::HashMap;
use std::sync::Arc;

mod trie;

pub use trie::{Node, parse_pattern};

use crate::context::{Context, Params};
use crate::error::RouteError;
use crate::http::{Method, StatusCode};

/// A type-erased handler: route handlers and middleware share this shape.
///
/// Handlers are stored behind `Arc<dyn Fn(…)>` so a request's chain can be
/// assembled by cloning pointers, and the frozen router can be shared across
/// connection tasks.
pub type HandlerFunc = Arc<dyn Fn(&mut Context) + Send + Sync + 'static>;

/// Method-keyed route tries plus the handler table.
///
/// Registration takes `&mut self` and happens before serving; lookup takes
/// `&self`, so a router frozen behind an `Arc` needs no locking.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use twig::http::Method;
/// use twig::router::Router;
///
/// let mut router = Router::new();
/// router
///     .add_route(Method::Get, "/hello/:name", Arc::new(|_c: &mut twig::Context| {}))
///     .unwrap();
///
/// let (node, params) = router.get_route(&Method::Get, "/hello/geek").unwrap();
/// assert_eq!(node.pattern(), "/hello/:name");
/// assert_eq!(params.get("name"), Some("geek"));
/// assert!(router.get_route(&Method::Post, "/hello/geek").is_none());
/// ```
#[derive(Default)]
pub struct Router {
    roots: HashMap<Method, Node>,
    handlers: HashMap<String, HandlerFunc>,
}

fn handler_key(method: &Method, pattern: &str) -> String {
    format!("{method}-{pattern}")
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `method` requests matching `pattern`.
    ///
    /// Registering the same (method, pattern) pair again replaces the handler.
    ///
    /// # Errors
    ///
    /// - [`RouteError::MissingLeadingSlash`] if `pattern` does not start with `/`.
    /// - [`RouteError::WildcardNotLast`] if a segment follows a `*` segment.
    /// - [`RouteError::Conflict`] if a different pattern already ends on the
    ///   same trie node, e.g. `/a/:x` and `/a/:y`.
    pub fn add_route(
        &mut self,
        method: Method,
        pattern: &str,
        handler: HandlerFunc,
    ) -> Result<(), RouteError> {
        validate_pattern(pattern)?;
        let parts = parse_pattern(pattern);

        let root = self.roots.entry(method.clone()).or_insert_with(Node::root);
        if let Some(existing) = root.wildcard_clash(&parts, 0) {
            return Err(RouteError::Conflict {
                method: method.to_string(),
                pattern: pattern.to_owned(),
                existing: existing.to_owned(),
            });
        }
        if let Some(existing) = root.locate(&parts, 0) {
            if !existing.pattern().is_empty() && existing.pattern() != pattern {
                return Err(RouteError::Conflict {
                    method: method.to_string(),
                    pattern: pattern.to_owned(),
                    existing: existing.pattern().to_owned(),
                });
            }
        }
        root.insert(pattern, &parts, 0);

        tracing::debug!(%method, pattern, "route registered");
        self.handlers.insert(handler_key(&method, pattern), handler);
        Ok(())
    }

    /// Resolve `path` against the routes registered for `method`.
    ///
    /// Returns the terminating trie node and the parameters bound from its
    /// pattern, or `None` when nothing matches (including when no route was
    /// ever registered for `method`).
    pub fn get_route(&self, method: &Method, path: &str) -> Option<(&Node, Params)> {
        let search_parts = parse_pattern(path);
        let node = self.roots.get(method)?.search(&search_parts, 0)?;

        let mut params = Params::new();
        for (index, part) in parse_pattern(node.pattern()).into_iter().enumerate() {
            if let Some(name) = part.strip_prefix(':') {
                if let Some(value) = search_parts.get(index) {
                    params.insert(name, *value);
                }
            } else if let Some(name) = part.strip_prefix('*') {
                if !name.is_empty() {
                    params.insert(name, search_parts[index..].join("/"));
                }
                break;
            }
        }
        Some((node, params))
    }

    /// Route terminus patterns registered for `method`, in trie order.
    pub fn routes(&self, method: &Method) -> Vec<&str> {
        fn collect<'a>(node: &'a Node, out: &mut Vec<&'a str>) {
            if !node.pattern().is_empty() {
                out.push(node.pattern());
            }
            for child in node.children() {
                collect(child, out);
            }
        }

        let mut out = Vec::new();
        if let Some(root) = self.roots.get(method) {
            collect(root, &mut out);
        }
        out
    }

    /// Resolve the context's request, append the matching handler (or a 404
    /// handler) to its chain, and start the chain.
    pub fn handle(&self, ctx: &mut Context) {
        let resolved = self
            .get_route(ctx.method(), ctx.path())
            .and_then(|(node, params)| {
                let handler = self.handlers.get(&handler_key(ctx.method(), node.pattern()))?;
                Some((Arc::clone(handler), params))
            });

        match resolved {
            Some((handler, params)) => {
                ctx.set_params(params);
                ctx.push_handler(handler);
            }
            None => {
                tracing::debug!(method = %ctx.method(), path = %ctx.path(), "no route matched");
                ctx.push_handler(Arc::new(not_found));
            }
        }
        ctx.next();
    }
}

fn not_found(c: &mut Context) {
    let body = format!("404 NOT FOUND: {}\n", c.path());
    c.string(StatusCode::NotFound, body);
}

fn validate_pattern(pattern: &str) -> Result<(), RouteError> {
    if !pattern.starts_with('/') {
        return Err(RouteError::MissingLeadingSlash {
            pattern: pattern.to_owned(),
        });
    }

    let mut segments = pattern.split('/').filter(|s| !s.is_empty());
    while let Some(segment) = segments.next() {
        if segment.starts_with('*') && segments.next().is_some() {
            return Err(RouteError::WildcardNotLast {
                pattern: pattern.to_owned(),
                segment: segment.to_owned(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::http::Request;

    fn make_request(method: &str, path: &str) -> Request {
        let raw = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        let (req, _) = Request::parse(raw.as_bytes()).unwrap();
        req
    }

    fn noop() -> HandlerFunc {
        Arc::new(|_c: &mut Context| {})
    }

    fn replying(body: &'static str) -> HandlerFunc {
        Arc::new(move |c: &mut Context| c.string(StatusCode::Ok, body))
    }

    fn test_router() -> Router {
        let mut r = Router::new();
        for pattern in ["/", "/hello/:name", "/hello/b/c", "/hi/:name", "/assets/*filepath"] {
            r.add_route(Method::Get, pattern, noop()).unwrap();
        }
        r
    }

    fn dispatch(router: &Router, method: &str, path: &str) -> Context {
        let mut ctx = Context::new(make_request(method, path));
        router.handle(&mut ctx);
        ctx
    }

    #[test]
    fn get_route_binds_named_parameter() {
        let r = test_router();
        let (node, params) = r.get_route(&Method::Get, "/hello/xhl").unwrap();
        assert_eq!(node.pattern(), "/hello/:name");
        assert_eq!(params.get("name"), Some("xhl"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn literal_route_wins_where_segment_count_fits() {
        let r = test_router();
        let (node, params) = r.get_route(&Method::Get, "/hello/b/c").unwrap();
        assert_eq!(node.pattern(), "/hello/b/c");
        assert!(params.is_empty());
    }

    #[test]
    fn trailing_wildcard_joins_remainder() {
        let r = test_router();
        let (node, params) = r.get_route(&Method::Get, "/assets/css/main.css").unwrap();
        assert_eq!(node.pattern(), "/assets/*filepath");
        assert_eq!(params.get("filepath"), Some("css/main.css"));
    }

    #[test]
    fn unnamed_wildcard_binds_nothing() {
        let mut r = Router::new();
        r.add_route(Method::Get, "/static/*", noop()).unwrap();
        let (_, params) = r.get_route(&Method::Get, "/static/a/b").unwrap();
        assert!(params.is_empty());
    }

    #[test]
    fn root_route_matches_slash() {
        let r = test_router();
        let (node, _) = r.get_route(&Method::Get, "/").unwrap();
        assert_eq!(node.pattern(), "/");
    }

    #[test]
    fn unmatched_lookups_are_none() {
        let r = test_router();
        assert!(r.get_route(&Method::Post, "/hello/xhl").is_none());
        assert!(r.get_route(&Method::Get, "/hello").is_none());
        assert!(r.get_route(&Method::Get, "/hello/a/b/c").is_none());
        assert!(r.get_route(&Method::Get, "/nope").is_none());
        assert!(Router::new().get_route(&Method::Get, "/").is_none());
    }

    #[test]
    fn re_registration_replaces_handler() {
        let mut r = Router::new();
        r.add_route(Method::Get, "/path", replying("first")).unwrap();
        r.add_route(Method::Get, "/path", replying("second")).unwrap();
        let ctx = dispatch(&r, "GET", "/path");
        assert_eq!(ctx.response().content(), b"second");
        assert_eq!(r.routes(&Method::Get), vec!["/path"]);
    }

    #[test]
    fn handle_sets_params_before_running_handler() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let mut r = Router::new();
        r.add_route(
            Method::Get,
            "/users/:id/posts/:post",
            Arc::new(move |c: &mut Context| {
                *sink.lock().unwrap() = Some((
                    c.param("id").map(str::to_owned),
                    c.param("post").map(str::to_owned),
                ));
            }),
        )
        .unwrap();

        dispatch(&r, "GET", "/users/7/posts/99");
        assert_eq!(
            *seen.lock().unwrap(),
            Some((Some("7".to_owned()), Some("99".to_owned())))
        );
    }

    #[test]
    fn handle_writes_not_found_body() {
        let r = test_router();
        let ctx = dispatch(&r, "GET", "/missing/page");
        assert_eq!(ctx.status_code(), StatusCode::NotFound);
        assert_eq!(ctx.response().content(), b"404 NOT FOUND: /missing/page\n");
    }

    #[test]
    fn methods_have_separate_tries() {
        let mut r = Router::new();
        r.add_route(Method::Get, "/r", replying("get")).unwrap();
        r.add_route(Method::Delete, "/r", replying("delete")).unwrap();
        assert_eq!(dispatch(&r, "DELETE", "/r").response().content(), b"delete");
        assert_eq!(dispatch(&r, "GET", "/r").response().content(), b"get");
        assert_eq!(dispatch(&r, "PUT", "/r").status_code(), StatusCode::NotFound);
    }

    #[test]
    fn rejects_pattern_without_leading_slash() {
        let mut r = Router::new();
        let err = r.add_route(Method::Get, "hello", noop()).unwrap_err();
        assert!(matches!(err, RouteError::MissingLeadingSlash { .. }));
    }

    #[test]
    fn rejects_segment_after_wildcard() {
        let mut r = Router::new();
        let err = r
            .add_route(Method::Get, "/p/*name/ignored", noop())
            .unwrap_err();
        assert_eq!(
            err,
            RouteError::WildcardNotLast {
                pattern: "/p/*name/ignored".to_owned(),
                segment: "*name".to_owned(),
            }
        );
    }

    #[test]
    fn rejects_colliding_parameter_names() {
        let mut r = Router::new();
        r.add_route(Method::Get, "/a/:x", noop()).unwrap();
        let err = r.add_route(Method::Get, "/a/:y", noop()).unwrap_err();
        assert!(matches!(err, RouteError::Conflict { ref existing, .. } if existing == "/a/:x"));
        // the original route still resolves
        let (_, params) = r.get_route(&Method::Get, "/a/1").unwrap();
        assert_eq!(params.get("x"), Some("1"));
    }

    #[test]
    fn rejects_wildcard_over_parameter_slot() {
        let mut r = Router::new();
        r.add_route(Method::Get, "/a/:x/b", noop()).unwrap();
        let err = r.add_route(Method::Get, "/a/*rest", noop()).unwrap_err();
        assert!(matches!(err, RouteError::Conflict { ref existing, .. } if existing == "/a/:x/b"));

        let (node, params) = r.get_route(&Method::Get, "/a/foo/b").unwrap();
        assert_eq!(node.pattern(), "/a/:x/b");
        assert_eq!(params.get("x"), Some("foo"));
        assert!(r.get_route(&Method::Get, "/a/foo/bar").is_none());
    }

    #[test]
    fn rejects_parameter_route_below_wildcard() {
        let mut r = Router::new();
        r.add_route(Method::Get, "/a/*rest", noop()).unwrap();
        let err = r.add_route(Method::Get, "/a/:x/b", noop()).unwrap_err();
        assert!(matches!(err, RouteError::Conflict { ref existing, .. } if existing == "/a/*rest"));

        let (node, params) = r.get_route(&Method::Get, "/a/1/b").unwrap();
        assert_eq!(node.pattern(), "/a/*rest");
        assert_eq!(params.get("rest"), Some("1/b"));
        assert_eq!(r.routes(&Method::Get), ["/a/*rest"]);
    }

    #[test]
    fn slash_variants_collapse_to_one_route() {
        let mut r = Router::new();
        r.add_route(Method::Get, "/docs/", noop()).unwrap();
        let err = r.add_route(Method::Get, "//docs", noop()).unwrap_err();
        assert!(matches!(err, RouteError::Conflict { .. }));
        assert!(r.get_route(&Method::Get, "/docs").is_some());
    }
}
