//! HTTP/1.1 protocol types used by the router and the bundled transport.
//!
//! [`Method`] keys the per-method route tries, [`StatusCode`] is what handlers
//! write through the [`Context`](crate::context::Context), and
//! [`Request`] / [`Response`] are what the [`Server`](crate::server::Server)
//! exchanges with the [`Engine`](crate::engine::Engine).

use std::fmt;

pub mod headers;
pub mod request;
pub mod response;

pub use headers::Headers;
pub use request::{Request, RequestError};
pub use response::Response;

macro_rules! status_codes {
    ($($variant:ident = $code:literal, $reason:literal;)+) => {
        /// An HTTP response status code.
        ///
        /// # Examples
        ///
        /// ```
        /// use twig::http::StatusCode;
        ///
        /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
        /// assert_eq!(StatusCode::from_u16(500), Some(StatusCode::InternalServerError));
        /// assert_eq!(StatusCode::Ok.to_string(), "200 OK");
        /// ```
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum StatusCode {
            $($variant = $code,)+
        }

        impl StatusCode {
            /// Looks up the variant for a numeric code, if this crate knows it.
            pub fn from_u16(code: u16) -> Option<Self> {
                match code {
                    $($code => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// Returns the canonical reason phrase for this status code.
            pub fn canonical_reason(self) -> &'static str {
                match self {
                    $(Self::$variant => $reason,)+
                }
            }
        }
    };
}

status_codes! {
    Continue = 100, "Continue";
    Ok = 200, "OK";
    Created = 201, "Created";
    Accepted = 202, "Accepted";
    NoContent = 204, "No Content";
    MovedPermanently = 301, "Moved Permanently";
    Found = 302, "Found";
    NotModified = 304, "Not Modified";
    BadRequest = 400, "Bad Request";
    Unauthorized = 401, "Unauthorized";
    Forbidden = 403, "Forbidden";
    NotFound = 404, "Not Found";
    Conflict = 409, "Conflict";
    PayloadTooLarge = 413, "Payload Too Large";
    UnprocessableEntity = 422, "Unprocessable Entity";
    TooManyRequests = 429, "Too Many Requests";
    InternalServerError = 500, "Internal Server Error";
    NotImplemented = 501, "Not Implemented";
    BadGateway = 502, "Bad Gateway";
    ServiceUnavailable = 503, "Service Unavailable";
}

impl StatusCode {
    /// Returns the numeric status code as a `u16`.
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// `true` for 5xx codes.
    pub fn is_server_error(self) -> bool {
        self.as_u16() >= 500
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.canonical_reason())
    }
}

impl From<StatusCode> for u16 {
    fn from(code: StatusCode) -> u16 {
        code.as_u16()
    }
}

/// An HTTP request method.
///
/// Each method gets its own route trie in the [`Router`](crate::router::Router).
/// Parsing is case-insensitive and extension methods are stored uppercased,
/// so `"get"` and `"GET"` resolve against the same trie.
///
/// # Examples
///
/// ```
/// use twig::http::Method;
///
/// let method: Method = "get".parse().unwrap();
/// assert_eq!(method, Method::Get);
/// assert_eq!(method.as_str(), "GET");
///
/// let purge: Method = "purge".parse().unwrap();
/// assert_eq!(purge.as_str(), "PURGE");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
    Connect,
    Trace,
    /// A non-standard extension method, always uppercase.
    Custom(String),
}

impl Method {
    /// Returns the uppercase method name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch => "PATCH",
            Self::Connect => "CONNECT",
            Self::Trace => "TRACE",
            Self::Custom(s) => s.as_str(),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        Ok(match upper.as_str() {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "HEAD" => Self::Head,
            "OPTIONS" => Self::Options,
            "PATCH" => Self::Patch,
            "CONNECT" => Self::Connect,
            "TRACE" => Self::Trace,
            _ => Self::Custom(upper),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_u16() {
        assert_eq!(StatusCode::from_u16(404), Some(StatusCode::NotFound));
        assert_eq!(StatusCode::from_u16(799), None);
        assert_eq!(u16::from(StatusCode::Created), 201);
    }

    #[test]
    fn server_error_classification() {
        assert!(StatusCode::InternalServerError.is_server_error());
        assert!(!StatusCode::NotFound.is_server_error());
    }

    #[test]
    fn method_parse_is_case_insensitive() {
        assert_eq!("post".parse::<Method>().unwrap(), Method::Post);
        assert_eq!("Delete".parse::<Method>().unwrap(), Method::Delete);
        assert_eq!(
            "mkcol".parse::<Method>().unwrap(),
            Method::Custom("MKCOL".to_owned())
        );
    }
}
