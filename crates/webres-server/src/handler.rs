//! Per-request orchestration.
//!
//! One request walks `parse path → lookup → negotiate encoding →
//! conditional check → serve`, falling out early to 404 (bad path,
//! nothing registered, no version in range), 400 (malformed version
//! constraint - deliberately distinct from 404), 405 (method), or 500
//! (source I/O failure).

use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use hyper::{Method, StatusCode, header};
use tracing::{debug, error};
use webres_core::{ContentEncoding, ResourceRegistry, VersionConstraint};

use crate::http::{Request, Response};

/// Handles resource GET/HEAD requests against a shared registry.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use hyper::StatusCode;
/// use webres_core::{BytesSource, ModuleId, ResourceEntry, ResourceRegistry, Version};
/// use webres_server::{Request, ResourceHandler};
///
/// let registry = Arc::new(ResourceRegistry::new());
/// registry.add(
///     ResourceEntry::new(
///         ModuleId::new("mod-a"),
///         "ui",
///         "app.js",
///         Version::new(1, 2, 0),
///         BytesSource::new(&b"console.log('hi');"[..]),
///     )
///     .unwrap(),
/// );
///
/// let handler = ResourceHandler::new(registry);
/// let response = handler.handle(&Request::get("/ui/app.js"));
/// assert_eq!(response.status, StatusCode::OK);
/// ```
#[derive(Debug, Clone)]
pub struct ResourceHandler {
    registry: Arc<ResourceRegistry>,
}

impl ResourceHandler {
    /// Creates a handler over the given registry.
    pub fn new(registry: Arc<ResourceRegistry>) -> Self {
        Self { registry }
    }

    /// Runs one request to completion.
    ///
    /// Never panics on client input; every outcome is a well-formed
    /// response. The registry lock is released before any source I/O
    /// happens (the entry is an `Arc` clone by then).
    pub fn handle(&self, request: &Request) -> Response {
        if request.method != Method::GET && request.method != Method::HEAD {
            return Response::method_not_allowed();
        }

        let Some((library, file_name)) = parse_path(&request.path) else {
            debug!(path = %request.path, "unparseable resource path");
            return Response::not_found();
        };

        let version_param = request.query_param("version");
        let constraint = match VersionConstraint::parse(version_param.as_deref()) {
            Ok(constraint) => constraint,
            Err(err) => {
                debug!(path = %request.path, %err, "malformed version constraint");
                return Response::bad_request(err.to_string());
            }
        };

        let entry = match self.registry.lookup(&library, &file_name, &constraint) {
            Ok(entry) => entry,
            Err(_) => {
                debug!(%library, %file_name, "resource not found");
                return Response::not_found();
            }
        };

        let encoding = request.accept_encoding().negotiate(entry.available_encodings());

        let bytes = match entry.variant(encoding) {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(
                    library = %entry.library(),
                    file = %entry.file_name(),
                    %encoding,
                    %err,
                    "failed to materialize resource variant"
                );
                return Response::internal_error();
            }
        };

        let mut response = Response::new(StatusCode::OK);
        let headers = &mut response.headers;
        if let Ok(value) = header::HeaderValue::try_from(entry.content_type()) {
            headers.insert(header::CONTENT_TYPE, value);
        }
        if let Ok(value) = header::HeaderValue::try_from(http_date(entry.last_modified())) {
            headers.insert(header::LAST_MODIFIED, value);
        }
        if let Ok(value) = header::HeaderValue::try_from(format!("\"{}\"", entry.etag())) {
            headers.insert(header::ETAG, value);
        }
        if let Ok(value) = header::HeaderValue::try_from(bytes.len().to_string()) {
            headers.insert(header::CONTENT_LENGTH, value);
        }
        if encoding != ContentEncoding::Identity {
            headers.insert(
                header::CONTENT_ENCODING,
                header::HeaderValue::from_static(match encoding {
                    ContentEncoding::Gzip => "gzip",
                    ContentEncoding::Deflate => "deflate",
                    ContentEncoding::Identity => unreachable!(),
                }),
            );
        }

        if etag_matches(request.if_none_match(), entry.etag()) {
            response.status = StatusCode::NOT_MODIFIED;
            return response;
        }

        if request.method == Method::HEAD {
            return response;
        }

        response.with_chunked_body(bytes)
    }
}

/// Splits `/lib/sub/name.js` into library `lib/sub` and file `name.js`.
///
/// A path with an empty final segment (trailing slash) is rejected -
/// there is no partial-path guessing.
fn parse_path(path: &str) -> Option<(String, String)> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.rsplit_once('/') {
        None => Some((String::new(), trimmed.to_string())),
        Some((_, "")) => None,
        Some((library, file_name)) => Some((library.to_string(), file_name.to_string())),
    }
}

/// RFC-1123 date in GMT with fixed English names, locale-independent.
fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// `If-None-Match` is a comma-separated list of quoted ETags; any exact
/// match against the entry's quoted ETag wins.
fn etag_matches(header: Option<&str>, etag: &str) -> bool {
    let Some(header) = header else {
        return false;
    };
    let quoted = format!("\"{etag}\"");
    header.split(',').any(|candidate| candidate.trim() == quoted)
}
