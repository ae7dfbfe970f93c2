//! Catalog resolution: classify once, look up by kind.

use crate::asset::{AssetKind, AssetRef, Lod, classify};
use crate::item::CatalogItem;

/// A domain catalog with every entry classified.
///
/// Construction is pure and idempotent. Lookups follow catalog order; the
/// first match wins when entries collide.
#[derive(Debug, Clone)]
pub struct ResolvedCatalog {
    items: Vec<CatalogItem>,
    refs: Vec<AssetRef>,
}

impl ResolvedCatalog {
    pub fn new(items: Vec<CatalogItem>) -> Self {
        let refs = items.iter().filter_map(classify).collect();
        Self { items, refs }
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    /// Every classified reference, in catalog order.
    pub fn refs(&self) -> &[AssetRef] {
        &self.refs
    }

    pub fn item(&self, id: &str) -> Option<&CatalogItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn nav_mesh(&self) -> Option<&AssetRef> {
        self.refs
            .iter()
            .find(|r| matches!(r.kind, AssetKind::NavMesh))
    }

    pub fn occlusion_mesh(&self) -> Option<&AssetRef> {
        self.refs
            .iter()
            .find(|r| matches!(r.kind, AssetKind::OcclusionMesh))
    }

    pub fn metadata(&self) -> Option<&AssetRef> {
        self.refs
            .iter()
            .find(|r| matches!(r.kind, AssetKind::Metadata))
    }

    pub fn point_cloud(&self, refinement: &str) -> Option<&AssetRef> {
        self.refs.iter().find(|r| match &r.kind {
            AssetKind::PointCloud { refinement: found } => found == refinement,
            _ => false,
        })
    }

    pub fn splat_single(&self, refinement: &str) -> Option<&AssetRef> {
        self.refs.iter().find(|r| match &r.kind {
            AssetKind::SplatSingle { refinement: found, .. } => found == refinement,
            _ => false,
        })
    }

    /// Every partition tile for the refinement, in catalog order.
    pub fn splat_partitions(&self, refinement: &str) -> Vec<&AssetRef> {
        self.refs
            .iter()
            .filter(|r| match &r.kind {
                AssetKind::SplatPartition(p) => p.refinement == refinement,
                _ => false,
            })
            .collect()
    }

    /// Partition tiles after LOD selection.
    ///
    /// When any `coarse` or `fine` tile exists the two tiers are used
    /// together and `full` tiles are discarded; otherwise the `full` set
    /// stands alone. Catalog order is preserved.
    pub fn select_splat_partitions(&self, refinement: &str) -> Vec<&AssetRef> {
        let all = self.splat_partitions(refinement);
        let has_tiered = all
            .iter()
            .any(|r| partition_lod(r).is_some_and(|lod| lod != Lod::Full));

        all.into_iter()
            .filter(|r| match partition_lod(r) {
                Some(lod) if has_tiered => lod != Lod::Full,
                Some(lod) => lod == Lod::Full,
                None => false,
            })
            .collect()
    }
}

fn partition_lod(asset: &AssetRef) -> Option<Lod> {
    match &asset.kind {
        AssetKind::SplatPartition(p) => Some(p.lod),
        _ => None,
    }
}
