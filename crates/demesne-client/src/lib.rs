//! Domain asset acquisition and progressive splat streaming.
//!
//! A "domain" is a captured physical space served as a set of named blobs.
//! This crate owns the protocol side of getting them: the two-step
//! credential exchange, catalog resolution, metadata interpretation, and the
//! downloads themselves.
//!
//! # Architecture
//!
//! - [`DomainClient::load_domain`] - one call from domain id to
//!   [`DomainDataCollection`]: authenticate, resolve the catalog, interpret
//!   metadata, then fetch the optional assets concurrently
//! - [`DomainClient::stream_splat`] - progressive tile delivery as growing
//!   [`SplatSnapshot`]s, independent of the full load
//! - Required steps fail the load; optional assets degrade to `None`
//!
//! Catalog classification lives in `demesne-catalog`; retry, timeout,
//! cancellation, and progress live in `demesne-fetch`.

mod config;
mod domain;
mod error;
mod metadata;
mod portal;
mod session;
mod splat;

pub use config::ClientConfig;
pub use domain::{DomainClient, DomainDataCollection};
pub use error::DomainError;
pub use metadata::DomainMetadata;
pub use portal::Portal;
pub use session::DomainSession;
pub use splat::{PartitionTile, SingleSplat, SplatSnapshot};
