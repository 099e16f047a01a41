//! Async TCP transport using Tokio.
//!
//! Accepts connections, parses HTTP/1.1 requests and hands each one to a
//! synchronous request handler, normally a frozen [`Engine`](crate::Engine).
//! Persistent connections (keep-alive) are supported.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::http::{Request, RequestError, Response, StatusCode};

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Maximum size of a complete HTTP request we will buffer before rejecting it (8 MiB).
const MAX_REQUEST_SIZE: usize = 8 * 1024 * 1024;

/// Initial read buffer capacity per connection.
const INITIAL_BUF_SIZE: usize = 4096;

/// A bound listener, ready to serve.
///
/// # Examples
///
/// ```rust,no_run
/// use twig::http::{Request, Response, StatusCode};
/// use twig::server::Server;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = Server::bind("127.0.0.1:8080").await?;
///     server
///         .run(|_req: Request| Response::new(StatusCode::Ok).body("Hello!"))
///         .await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Binds the server to the given TCP address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound.
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self, ServerError> {
        let addr = addr.as_ref();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.to_owned(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until the process ends.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the listener itself fails.
    pub async fn run<H>(self, handler: H) -> Result<(), ServerError>
    where
        H: Fn(Request) -> Response + Send + Sync + 'static,
    {
        self.run_until(handler, std::future::pending()).await
    }

    /// Serve until `shutdown` resolves. Connections already accepted keep
    /// running on their own tasks.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the listener itself fails.
    pub async fn run_until<H, S>(self, handler: H, shutdown: S) -> Result<(), ServerError>
    where
        H: Fn(Request) -> Response + Send + Sync + 'static,
        S: Future<Output = ()>,
    {
        let handler = Arc::new(handler);
        info!(address = %self.local_addr, "twig listening");

        tokio::pin!(shutdown);
        loop {
            let (stream, peer_addr) = tokio::select! {
                () = &mut shutdown => {
                    info!(address = %self.local_addr, "shutdown requested, no longer accepting");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!(error = %e, "failed to accept connection");
                        continue;
                    }
                },
            };

            debug!(peer = %peer_addr, "connection accepted");
            let handler = Arc::clone(&handler);

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer_addr, handler).await {
                    warn!(peer = %peer_addr, error = %e, "connection closed with error");
                }
            });
        }
    }
}

/// Reads requests off one connection until the peer closes it or a response
/// carries `Connection: close`.
async fn handle_connection<H>(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    handler: Arc<H>,
) -> Result<(), std::io::Error>
where
    H: Fn(Request) -> Response + Send + Sync + 'static,
{
    let mut buf = BytesMut::with_capacity(INITIAL_BUF_SIZE);

    loop {
        let bytes_read = stream.read_buf(&mut buf).await?;

        if bytes_read == 0 {
            debug!(peer = %peer_addr, "connection closed by peer");
            break;
        }

        if buf.len() > MAX_REQUEST_SIZE {
            warn!(peer = %peer_addr, "request too large, sending 413");
            let response = Response::new(StatusCode::PayloadTooLarge)
                .body("Request entity too large")
                .keep_alive(false);
            stream.write_all(&response.into_bytes()).await?;
            break;
        }

        // A single read may carry several pipelined requests.
        while !buf.is_empty() {
            let (head, body_offset) = match Request::parse(&buf) {
                Ok(pair) => pair,
                Err(RequestError::Incomplete) => break,
                Err(e) => {
                    warn!(peer = %peer_addr, error = %e, "bad request, sending 400");
                    let response = Response::new(StatusCode::BadRequest)
                        .body(format!("Bad Request: {e}"))
                        .keep_alive(false);
                    stream.write_all(&response.into_bytes()).await?;
                    return Ok(());
                }
            };

            let declared = head.content_length().unwrap_or(0);
            let total_needed = match body_offset.checked_add(declared) {
                Some(total) if total <= MAX_REQUEST_SIZE => total,
                _ => {
                    warn!(peer = %peer_addr, declared, "declared body too large, sending 413");
                    let response = Response::new(StatusCode::PayloadTooLarge)
                        .body("Request entity too large")
                        .keep_alive(false);
                    stream.write_all(&response.into_bytes()).await?;
                    return Ok(());
                }
            };
            if buf.len() < total_needed {
                break;
            }

            // Parse again over exactly this request's bytes so its body does not
            // swallow whatever was pipelined after it.
            let frame = buf.split_to(total_needed);
            let request = match Request::parse(&frame) {
                Ok((request, _)) => request,
                Err(_) => head,
            };

            let keep_alive = request.is_keep_alive();
            debug!(
                peer = %peer_addr,
                method = %request.method(),
                path = %request.path(),
                "dispatching request"
            );

            let response = handler(request);
            stream.write_all(&response.into_bytes()).await?;
            stream.flush().await?;

            if !keep_alive {
                debug!(peer = %peer_addr, "Connection: close, shutting down");
                return Ok(());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use tokio::sync::oneshot;

    use super::*;

    async fn send(addr: SocketAddr, raw: &[u8]) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn oversized_content_length_is_rejected_up_front() {
        let server = Server::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let serving = tokio::spawn(server.run_until(
            |_req: Request| Response::new(StatusCode::Ok).body("handled"),
            async move {
                let _ = stop_rx.await;
            },
        ));

        for declared in [usize::MAX, MAX_REQUEST_SIZE + 1] {
            let raw = format!(
                "POST /upload HTTP/1.1\r\nHost: localhost\r\nContent-Length: {declared}\r\n\r\n"
            );
            let response = send(addr, raw.as_bytes()).await;
            assert!(response.starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
            assert!(response.contains("Connection: close\r\n"));
            assert!(!response.contains("handled"));
        }

        let response = send(
            addr,
            b"POST /upload HTTP/1.1\r\nHost: localhost\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.ends_with("handled"));

        stop_tx.send(()).unwrap();
        serving.await.unwrap().unwrap();
    }
}
