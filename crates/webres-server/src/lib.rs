//! # Webres Server
//!
//! HTTP transport and module-host integration on top of [`webres_core`].
//!
//! - [`http`] - the minimal request/response contract between transport
//!   and handler
//! - [`handler`] - the per-request state machine: path parsing, registry
//!   lookup, encoding negotiation, conditional requests, body streaming
//! - [`extender`] - consumes module registration and removal events and
//!   keeps the registry in sync
//! - [`admin`] - read-only diagnostic inventory of registered resources
//! - [`server`] - tokio/hyper accept loop binding it all together

#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod admin;
pub mod error;
pub mod extender;
pub mod handler;
pub mod http;
pub mod server;

pub use error::{Result, ServerError};
pub use extender::{ManifestEntry, ModuleEvent, ModuleRegistration, ResourceExtender};
pub use handler::ResourceHandler;
pub use http::{Request, Response};
pub use server::{ResourceServer, ServerConfig};
