//! # Webres
//!
//! Versioned web resource registry and content-negotiation engine.
//!
//! Webres serves static assets (scripts, styles, images) contributed at
//! runtime by independently loaded and unloaded modules. Each module
//! declares one or more resource groups through a manifest capability: a
//! library name, a resource folder, and a version. Clients request an
//! asset by `library/file_name`, optionally pinned to a version range,
//! and receive the best-matching variant with correct HTTP caching
//! semantics (ETag, Last-Modified, conditional 304, Accept-Encoding
//! negotiation).
//!
//! ## Crates
//!
//! - [`webres_core`] - the concurrent versioned index, version-range
//!   resolution, lazy per-encoding variant cache, and negotiation logic
//! - [`webres_server`] - hyper-based HTTP transport, the request handler
//!   state machine, module-host integration, and the diagnostic inventory
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use webres::core::ResourceRegistry;
//! use webres::server::{ResourceServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Arc::new(ResourceRegistry::new());
//!     let config = ServerConfig::new("127.0.0.1:8080".parse()?);
//!     ResourceServer::new(registry, config).listen().await?;
//!     Ok(())
//! }
//! ```

pub use webres_core as core;
pub use webres_server as server;

pub use webres_core::{ResourceEntry, ResourceRegistry, Version, VersionConstraint};
pub use webres_server::{ResourceServer, ServerConfig};
