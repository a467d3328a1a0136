//! The hyper/tokio transport.
//!
//! One task per connection; each request is translated into the
//! [`crate::http`] contract, handled on the blocking pool (source reads
//! and first-time compression are synchronous), and translated back.

use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use futures::TryStreamExt;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody as HttpStreamBody};
use hyper::body::{Frame, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, StatusCode};
use hyper_util::rt::TokioIo;
use percent_encoding::percent_decode_str;
use tokio::net::TcpListener;
use tracing::{debug, error, info};
use webres_core::ResourceRegistry;

use crate::admin;
use crate::error::{Result, ServerError};
use crate::handler::ResourceHandler;
use crate::http::{Request, Response, ResponseBody};

/// Transport configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind.
    pub addr: SocketAddr,
    /// Mount prefix stripped from request paths before resource lookup;
    /// empty mounts at the root. Must start with `/` when set.
    pub alias: String,
    /// Whether `GET <alias>/-/resources` serves the diagnostic
    /// inventory.
    pub admin: bool,
}

impl ServerConfig {
    /// Creates a config mounting at the root with the admin endpoint
    /// disabled.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            alias: String::new(),
            admin: false,
        }
    }

    /// Sets the mount prefix; a trailing `/` is dropped.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        let mut alias = alias.into();
        while alias.ends_with('/') {
            alias.pop();
        }
        self.alias = alias;
        self
    }

    /// Enables or disables the diagnostic inventory endpoint.
    pub fn with_admin(mut self, enabled: bool) -> Self {
        self.admin = enabled;
        self
    }
}

/// The resource server: accept loop plus request translation.
pub struct ResourceServer {
    registry: Arc<ResourceRegistry>,
    handler: ResourceHandler,
    config: ServerConfig,
}

impl ResourceServer {
    /// Creates a server over the given registry.
    pub fn new(registry: Arc<ResourceRegistry>, config: ServerConfig) -> Self {
        let handler = ResourceHandler::new(Arc::clone(&registry));
        Self {
            registry,
            handler,
            config,
        }
    }

    /// Binds the configured address and serves until the task is
    /// cancelled.
    pub async fn listen(self) -> Result<()> {
        if !self.config.alias.is_empty() && !self.config.alias.starts_with('/') {
            return Err(ServerError::InvalidAlias {
                alias: self.config.alias.clone(),
                reason: "mount prefix must start with '/'".to_string(),
            });
        }
        let listener = TcpListener::bind(self.config.addr).await?;
        info!(addr = %self.config.addr, alias = %self.config.alias, "resource server listening");
        self.serve_listener(listener).await
    }

    /// Serves connections from an already-bound listener.
    ///
    /// Separated from [`ResourceServer::listen`] so tests can bind to an
    /// ephemeral port first.
    pub async fn serve_listener(self, listener: TcpListener) -> Result<()> {
        let shared = Arc::new(self);
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(%peer, "connection accepted");
                    let shared = Arc::clone(&shared);
                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let service = service_fn(move |req| {
                            let shared = Arc::clone(&shared);
                            async move { Ok::<_, Infallible>(shared.serve(req).await) }
                        });
                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await
                        {
                            // Disconnects mid-stream land here; cached
                            // entry variants are unaffected.
                            debug!(%peer, %err, "connection ended with error");
                        }
                    });
                }
                Err(err) => {
                    error!(%err, "failed to accept connection");
                }
            }
        }
    }

    async fn serve(&self, req: hyper::Request<Incoming>) -> hyper::Response<BoxBody<Bytes, io::Error>> {
        let path = percent_decode_str(req.uri().path())
            .decode_utf8_lossy()
            .to_string();

        let Some(path) = strip_alias(&path, &self.config.alias) else {
            return to_hyper(Response::not_found());
        };

        if self.config.admin && path == "/-/resources" && req.method() == Method::GET {
            return to_hyper(self.inventory_response());
        }

        let request = Request {
            method: req.method().clone(),
            path,
            query: req.uri().query().map(str::to_string),
            headers: req.headers().clone(),
        };

        let handler = self.handler.clone();
        let response = match tokio::task::spawn_blocking(move || handler.handle(&request)).await {
            Ok(response) => response,
            Err(err) => {
                error!(%err, "request handler panicked");
                Response::internal_error()
            }
        };
        to_hyper(response)
    }

    fn inventory_response(&self) -> Response {
        match admin::inventory_json(&self.registry) {
            Ok(json) => {
                let mut response = Response::new(StatusCode::OK).with_text(json);
                response.headers.insert(
                    hyper::header::CONTENT_TYPE,
                    hyper::header::HeaderValue::from_static("application/json"),
                );
                response
            }
            Err(err) => {
                error!(%err, "failed to serialize inventory");
                Response::internal_error()
            }
        }
    }
}

/// Strips the mount prefix; `None` means the request is outside it.
fn strip_alias(path: &str, alias: &str) -> Option<String> {
    if alias.is_empty() {
        return Some(path.to_string());
    }
    let rest = path.strip_prefix(alias)?;
    if rest.is_empty() {
        Some("/".to_string())
    } else if rest.starts_with('/') {
        Some(rest.to_string())
    } else {
        // `/staticfoo` does not live under `/static`.
        None
    }
}

fn to_hyper(response: Response) -> hyper::Response<BoxBody<Bytes, io::Error>> {
    let body = match response.body {
        ResponseBody::Empty => Empty::<Bytes>::new()
            .map_err(|never| match never {})
            .boxed(),
        ResponseBody::Full(bytes) => Full::new(bytes).map_err(|never| match never {}).boxed(),
        ResponseBody::Stream(stream) => HttpStreamBody::new(stream.map_ok(Frame::data)).boxed(),
    };

    let mut hyper_response = hyper::Response::new(body);
    *hyper_response.status_mut() = response.status;
    *hyper_response.headers_mut() = response.headers;
    hyper_response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_alias_root_mount() {
        assert_eq!(strip_alias("/ui/app.js", "").unwrap(), "/ui/app.js");
    }

    #[test]
    fn test_strip_alias_prefix_mount() {
        assert_eq!(
            strip_alias("/static/ui/app.js", "/static").unwrap(),
            "/ui/app.js"
        );
        assert_eq!(strip_alias("/static", "/static").unwrap(), "/");
        assert_eq!(strip_alias("/other/app.js", "/static"), None);
        assert_eq!(strip_alias("/staticfoo/app.js", "/static"), None);
    }

    #[test]
    fn test_config_alias_normalization() {
        let config = ServerConfig::new("127.0.0.1:0".parse().unwrap()).with_alias("/static/");
        assert_eq!(config.alias, "/static");
    }

    #[test]
    fn test_to_hyper_preserves_status_and_headers() {
        let response = Response::bad_request("bad constraint");
        let hyper_response = to_hyper(response);
        assert_eq!(hyper_response.status(), StatusCode::BAD_REQUEST);
        assert!(
            hyper_response
                .headers()
                .contains_key(hyper::header::CONTENT_TYPE)
        );
    }
}
