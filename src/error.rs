//! Route registration errors.
//!
//! These are programmer mistakes in the route table. They surface while the
//! application registers routes at startup, never while serving a request.

use thiserror::Error;

/// A route pattern that cannot be added to the router.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("route pattern {pattern:?} must begin with '/'")]
    MissingLeadingSlash { pattern: String },

    #[error("wildcard segment {segment:?} must be the last segment of {pattern:?}")]
    WildcardNotLast { pattern: String, segment: String },

    #[error("{method} {pattern:?} conflicts with existing route {existing:?}")]
    Conflict {
        method: String,
        pattern: String,
        existing: String,
    },
}
