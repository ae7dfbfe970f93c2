//! Catalog model for spatial-domain assets.
//!
//! A domain server lists its stored files as flat catalog entries. This
//! crate turns those entries into typed asset references: navigation and
//! occlusion meshes, domain metadata, refined point clouds, and gaussian
//! splats in single-file or partitioned-tile form. [`ResolvedCatalog`]
//! classifies a listing once and answers the lookups the loading pipeline
//! needs, including LOD selection over partition tiles.

mod asset;
mod item;
mod partition;
mod resolve;

pub use asset::{AssetKind, AssetRef, Lod, ParseLodError, SplatFormat, classify};
pub use item::CatalogItem;
pub use partition::{ParsePartitionError, PartitionRef};
pub use resolve::ResolvedCatalog;
