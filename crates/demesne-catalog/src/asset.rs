//! Asset classification over catalog names and data types.
//!
//! Every naming rule of the domain catalog lives here, in one place, so the
//! full rule set can be enumerated by tests. Classification is pure: the
//! same `(name, data_type)` pair always yields the same kind, and at most
//! one kind.

use std::str::FromStr;

use thiserror::Error;

use crate::item::CatalogItem;
use crate::partition::PartitionRef;

/// Splat partition level-of-detail tier.
///
/// `coarse` and `fine` form a two-tier scheme (wide/cheap plus
/// near/expensive); `full` is a single-tier fallback used only when the
/// tiered scheme was never generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lod {
    Full,
    Coarse,
    Fine,
}

#[derive(Debug, Error)]
#[error("unknown LOD tier: {0}")]
pub struct ParseLodError(pub String);

impl Lod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lod::Full => "full",
            Lod::Coarse => "coarse",
            Lod::Fine => "fine",
        }
    }
}

impl FromStr for Lod {
    type Err = ParseLodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Lod::Full),
            "coarse" => Ok(Lod::Coarse),
            "fine" => Ok(Lod::Fine),
            _ => Err(ParseLodError(s.to_string())),
        }
    }
}

impl std::fmt::Display for Lod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared byte format of a splat payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplatFormat {
    Splat,
    Sog,
}

impl SplatFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplatFormat::Splat => "splat",
            SplatFormat::Sog => "sog",
        }
    }
}

impl std::fmt::Display for SplatFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a catalog item is, once its name and data type are understood.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetKind {
    NavMesh,
    OcclusionMesh,
    Metadata,
    PointCloud { refinement: String },
    SplatSingle { refinement: String, format: SplatFormat },
    SplatPartition(PartitionRef),
}

/// A classified catalog entry: the kind plus the originating item id.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetRef {
    pub item_id: String,
    pub kind: AssetKind,
}

const SINGLE_SPLAT_DATA_TYPES: [&str; 5] = [
    "refined_splat",
    "splat_data",
    "splat_data_sog",
    "splat",
    "gaussian_splat",
];

const SINGLE_SPLAT_NAME_PREFIXES: [&str; 3] = ["refined_splat_", "splat_", "gaussian_splat_"];

/// Classify one catalog item into an asset reference.
///
/// Unrecognized items yield `None`; absence is not an error.
pub fn classify(item: &CatalogItem) -> Option<AssetRef> {
    let kind = classify_kind(&item.name, &item.data_type)?;
    Some(AssetRef {
        item_id: item.id.clone(),
        kind,
    })
}

fn classify_kind(name: &str, data_type: &str) -> Option<AssetKind> {
    if name == "domain_metadata" {
        return Some(AssetKind::Metadata);
    }

    match data_type {
        "obj" => match name {
            "navmesh_v1" => Some(AssetKind::NavMesh),
            "occlusionmesh_v1" => Some(AssetKind::OcclusionMesh),
            _ => None,
        },
        "refined_pointcloud_ply" => {
            let refinement = name.strip_prefix("refined_pointcloud_")?;
            (!refinement.is_empty()).then(|| AssetKind::PointCloud {
                refinement: refinement.to_string(),
            })
        }
        dt if SINGLE_SPLAT_DATA_TYPES.contains(&dt) => {
            let refinement = SINGLE_SPLAT_NAME_PREFIXES
                .iter()
                .find_map(|prefix| name.strip_prefix(prefix))?;
            (!refinement.is_empty()).then(|| AssetKind::SplatSingle {
                refinement: refinement.to_string(),
                format: format_for(dt),
            })
        }
        "splat_partition" | "splat_partition_sog" => PartitionRef::parse(name, format_for(data_type))
            .ok()
            .map(AssetKind::SplatPartition),
        _ => None,
    }
}

fn format_for(data_type: &str) -> SplatFormat {
    if data_type.ends_with("_sog") {
        SplatFormat::Sog
    } else {
        SplatFormat::Splat
    }
}
