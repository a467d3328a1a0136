//! Minimal request/response contract between transport and handler.
//!
//! The handler never touches hyper's connection types; it works against
//! these structs, and the [`crate::server`] module translates at the
//! transport boundary. That keeps the handler testable without a socket.

use std::io;
use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{self, Stream};
use hyper::{HeaderMap, Method, StatusCode};
use percent_encoding::percent_decode_str;
use webres_core::AcceptEncoding;

/// Size of body chunks written to the wire.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Type alias for streaming response bodies.
pub type StreamBody = Pin<Box<dyn Stream<Item = Result<Bytes, io::Error>> + Send + Sync>>;

/// An inbound resource request.
#[derive(Debug)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Decoded request path, alias already stripped.
    pub path: String,
    /// Raw query string, if any.
    pub query: Option<String>,
    /// Request headers.
    pub headers: HeaderMap,
}

impl Request {
    /// Creates a GET request for the given path.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
        }
    }

    /// Creates a HEAD request for the given path.
    pub fn head(path: impl Into<String>) -> Self {
        Self {
            method: Method::HEAD,
            ..Self::get(path)
        }
    }

    /// Attaches a raw query string.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Attaches a header; invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            hyper::header::HeaderName::try_from(name),
            hyper::header::HeaderValue::try_from(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// The first value of a query parameter, percent-decoded.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        for pair in query.split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            if percent_decode_str(key).decode_utf8_lossy() == name {
                // '+' means space only in the still-encoded form; a
                // literal plus arrives as %2B and must survive.
                let value = value.replace('+', " ");
                return Some(percent_decode_str(&value).decode_utf8_lossy().into_owned());
            }
        }
        None
    }

    /// The `If-None-Match` header, if present and valid UTF-8.
    pub fn if_none_match(&self) -> Option<&str> {
        self.headers
            .get(hyper::header::IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok())
    }

    /// The parsed `Accept-Encoding` header; empty when absent.
    pub fn accept_encoding(&self) -> AcceptEncoding {
        self.headers
            .get(hyper::header::ACCEPT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(AcceptEncoding::parse)
            .unwrap_or_else(AcceptEncoding::empty)
    }
}

/// Response body forms the handler produces.
pub enum ResponseBody {
    /// No body (304, HEAD).
    Empty,
    /// A small in-memory body (error messages, inventory JSON).
    Full(Bytes),
    /// Resource bytes streamed in fixed-size chunks.
    Stream(StreamBody),
}

impl std::fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseBody::Empty => f.write_str("Empty"),
            ResponseBody::Full(bytes) => write!(f, "Full({} bytes)", bytes.len()),
            ResponseBody::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// An outbound response.
#[derive(Debug)]
pub struct Response {
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Body.
    pub body: ResponseBody,
}

impl Response {
    /// Creates an empty response with the given status.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: ResponseBody::Empty,
        }
    }

    /// 404 with a deliberately generic message - no hint about which
    /// lookup level missed or which versions exist.
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND).with_text("resource not found")
    }

    /// 400 with a readable message.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST).with_text(message.into())
    }

    /// 405 for anything but GET and HEAD.
    pub fn method_not_allowed() -> Self {
        let mut response = Self::new(StatusCode::METHOD_NOT_ALLOWED);
        response.headers.insert(
            hyper::header::ALLOW,
            hyper::header::HeaderValue::from_static("GET, HEAD"),
        );
        response
    }

    /// 500 with no detail leaked to the client.
    pub fn internal_error() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR).with_text("internal server error")
    }

    /// Sets a plain-text body with matching Content-Type and
    /// Content-Length.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let bytes = Bytes::from(text.into());
        self.headers.insert(
            hyper::header::CONTENT_TYPE,
            hyper::header::HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        if let Ok(len) = hyper::header::HeaderValue::try_from(bytes.len().to_string()) {
            self.headers.insert(hyper::header::CONTENT_LENGTH, len);
        }
        self.body = ResponseBody::Full(bytes);
        self
    }

    /// Replaces the body with a chunked stream over the given bytes.
    pub fn with_chunked_body(mut self, bytes: Bytes) -> Self {
        self.body = ResponseBody::Stream(chunked(bytes));
        self
    }
}

/// Splits a cached variant into fixed-size frames.
///
/// `Bytes::slice` is a cheap refcount bump, so the chunks all share the
/// entry's immutable cache.
pub fn chunked(bytes: Bytes) -> StreamBody {
    let chunks: Vec<Result<Bytes, io::Error>> = (0..bytes.len())
        .step_by(CHUNK_SIZE)
        .map(|start| {
            let end = usize::min(start + CHUNK_SIZE, bytes.len());
            Ok(bytes.slice(start..end))
        })
        .collect();
    Box::pin(stream::iter(chunks))
}
