//! Progressive splat delivery.
//!
//! Tiles download strictly sequentially, in catalog order, and every
//! successful tile yields a snapshot of everything downloaded so far.
//! Snapshots only ever grow; a failed tile is skipped and never appears.

use std::collections::VecDeque;

use bytes::Bytes;
use demesne_catalog::{AssetKind, Lod, PartitionRef, ResolvedCatalog, SplatFormat};
use demesne_fetch::{BoxStream, HttpClient, ProgressCallback};
use futures_util::stream;
use tokio_util::sync::CancellationToken;

use crate::domain::DomainClient;
use crate::session::DomainSession;

/// One downloaded splat partition tile.
#[derive(Debug, Clone)]
pub struct PartitionTile {
    pub item_id: String,
    pub lod: Lod,
    pub tile_size: u32,
    pub tile_x: i32,
    pub tile_z: i32,
    pub format: SplatFormat,
    pub bytes: Bytes,
}

impl PartitionTile {
    fn from_plan(plan: TilePlan, bytes: Bytes) -> Self {
        Self {
            item_id: plan.item_id,
            lod: plan.partition.lod,
            tile_size: plan.partition.tile_size,
            tile_x: plan.partition.tile_x,
            tile_z: plan.partition.tile_z,
            format: plan.partition.format,
            bytes,
        }
    }
}

/// A whole splat delivered as one file.
#[derive(Debug, Clone)]
pub struct SingleSplat {
    pub item_id: String,
    pub format: SplatFormat,
    pub bytes: Bytes,
}

/// A growing view of the splat data downloaded so far.
#[derive(Debug, Clone)]
pub enum SplatSnapshot {
    /// Every tile downloaded so far, in download order. Each snapshot
    /// extends the previous one.
    Partitioned(Vec<PartitionTile>),
    /// The whole splat as one terminal snapshot.
    Single(SingleSplat),
}

#[derive(Debug, Clone)]
struct TilePlan {
    item_id: String,
    partition: PartitionRef,
}

#[derive(Debug, Clone)]
struct SinglePlan {
    item_id: String,
    format: SplatFormat,
}

/// Download plan for one streaming invocation. Never re-enters discovery;
/// a new refinement id requires a new invocation.
#[derive(Debug)]
enum StreamState {
    Partitioned {
        pending: VecDeque<TilePlan>,
        complete: Vec<PartitionTile>,
        fallback: Option<SinglePlan>,
    },
    Single(SinglePlan),
    Done,
}

struct StreamCursor {
    state: StreamState,
    session: DomainSession,
    cancel: CancellationToken,
    on_progress: Option<ProgressCallback>,
}

/// Resolve which splat representation applies for the refinement.
///
/// Tiles come pre-filtered by the catalog's LOD policy; the single-file
/// splat is kept aside as the fallback for when no tile can be delivered.
fn discover(catalog: &ResolvedCatalog, refinement: &str) -> StreamState {
    let pending: VecDeque<TilePlan> = catalog
        .select_splat_partitions(refinement)
        .into_iter()
        .filter_map(|r| match &r.kind {
            AssetKind::SplatPartition(partition) => Some(TilePlan {
                item_id: r.item_id.clone(),
                partition: partition.clone(),
            }),
            _ => None,
        })
        .collect();

    let fallback = catalog
        .splat_single(refinement)
        .and_then(|r| match &r.kind {
            AssetKind::SplatSingle { format, .. } => Some(SinglePlan {
                item_id: r.item_id.clone(),
                format: *format,
            }),
            _ => None,
        });

    if pending.is_empty() {
        match fallback {
            Some(single) => StreamState::Single(single),
            None => StreamState::Done,
        }
    } else {
        StreamState::Partitioned {
            pending,
            complete: Vec::new(),
            fallback,
        }
    }
}

impl<C: HttpClient> DomainClient<C> {
    /// Stream the splat data for one refinement as growing snapshots.
    ///
    /// Partition tiles selected by the LOD policy download one at a time, in
    /// catalog order, and each successful tile yields a
    /// [`SplatSnapshot::Partitioned`] extending the last. A failed tile is
    /// logged and skipped. When the catalog has no tiles for the refinement,
    /// or every tile failed, the single-file splat is downloaded instead and
    /// emitted as one [`SplatSnapshot::Single`]. A domain with neither
    /// completes without emitting; that is not an error.
    ///
    /// Cancelling stops further downloads without retracting snapshots the
    /// consumer already holds. The stream never re-enters discovery.
    pub fn stream_splat(
        &self,
        session: &DomainSession,
        catalog: &ResolvedCatalog,
        refinement: &str,
        cancel: CancellationToken,
        on_progress: Option<ProgressCallback>,
    ) -> BoxStream<'_, SplatSnapshot> {
        let cursor = StreamCursor {
            state: discover(catalog, refinement),
            session: session.clone(),
            cancel,
            on_progress,
        };
        Box::pin(stream::unfold(cursor, move |mut cursor| async move {
            let snapshot = self.next_snapshot(&mut cursor).await?;
            Some((snapshot, cursor))
        }))
    }

    /// Advance the download plan until a snapshot is ready or the plan is
    /// exhausted.
    async fn next_snapshot(&self, cursor: &mut StreamCursor) -> Option<SplatSnapshot> {
        loop {
            match std::mem::replace(&mut cursor.state, StreamState::Done) {
                StreamState::Partitioned {
                    mut pending,
                    mut complete,
                    fallback,
                } => {
                    while let Some(plan) = pending.pop_front() {
                        match self
                            .fetch_item(
                                &cursor.session,
                                &plan.item_id,
                                &cursor.cancel,
                                cursor.on_progress.as_ref(),
                            )
                            .await
                        {
                            Ok(bytes) => {
                                complete.push(PartitionTile::from_plan(plan, bytes));
                                let snapshot = SplatSnapshot::Partitioned(complete.clone());
                                cursor.state = StreamState::Partitioned {
                                    pending,
                                    complete,
                                    fallback,
                                };
                                return Some(snapshot);
                            }
                            // Stop downloading; emitted snapshots stay with
                            // the consumer.
                            Err(err) if err.is_cancelled() => return None,
                            Err(err) => {
                                tracing::warn!(
                                    item_id = %plan.item_id,
                                    domain_id = %cursor.session.domain_id,
                                    error = %err,
                                    "splat tile download failed, skipping"
                                );
                            }
                        }
                    }
                    // Drained. Only an all-failed partition set falls back to
                    // the single file; a partial delivery is terminal.
                    if complete.is_empty() {
                        if let Some(single) = fallback {
                            cursor.state = StreamState::Single(single);
                        }
                    }
                }
                StreamState::Single(plan) => {
                    match self
                        .fetch_item(
                            &cursor.session,
                            &plan.item_id,
                            &cursor.cancel,
                            cursor.on_progress.as_ref(),
                        )
                        .await
                    {
                        Ok(bytes) => {
                            return Some(SplatSnapshot::Single(SingleSplat {
                                item_id: plan.item_id,
                                format: plan.format,
                                bytes,
                            }));
                        }
                        Err(err) if err.is_cancelled() => return None,
                        Err(err) => {
                            tracing::warn!(
                                item_id = %plan.item_id,
                                domain_id = %cursor.session.domain_id,
                                error = %err,
                                "single splat download failed, ending stream"
                            );
                            return None;
                        }
                    }
                }
                StreamState::Done => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use demesne_catalog::CatalogItem;

    use super::*;

    fn item(id: &str, name: &str, data_type: &str) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            name: name.to_string(),
            data_type: data_type.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            size: None,
        }
    }

    fn tile(id: &str, lod: &str, x: i32, z: i32) -> CatalogItem {
        item(
            id,
            &format!("splat_partition_{}_10_{}_{}_r1", lod, x, z),
            "splat_partition",
        )
    }

    #[test]
    fn test_discover_plans_selected_tiles_in_order() {
        let catalog = ResolvedCatalog::new(vec![
            tile("t1", "coarse", 0, 0),
            tile("t2", "full", 0, 0),
            tile("t3", "fine", 1, 0),
        ]);
        match discover(&catalog, "r1") {
            StreamState::Partitioned {
                pending,
                complete,
                fallback,
            } => {
                let ids: Vec<&str> = pending.iter().map(|p| p.item_id.as_str()).collect();
                // Tiered tiles win; the full tile never enters the plan
                assert_eq!(ids, vec!["t1", "t3"]);
                assert!(complete.is_empty());
                assert!(fallback.is_none());
            }
            other => panic!("expected partitioned plan, got {:?}", other),
        }
    }

    #[test]
    fn test_discover_keeps_single_as_fallback() {
        let catalog = ResolvedCatalog::new(vec![
            tile("t1", "full", 0, 0),
            item("s1", "refined_splat_r1", "refined_splat"),
        ]);
        match discover(&catalog, "r1") {
            StreamState::Partitioned { fallback, .. } => {
                assert_eq!(fallback.unwrap().item_id, "s1");
            }
            other => panic!("expected partitioned plan, got {:?}", other),
        }
    }

    #[test]
    fn test_discover_without_tiles_goes_single() {
        let catalog = ResolvedCatalog::new(vec![item("s1", "splat_r1", "splat_data_sog")]);
        match discover(&catalog, "r1") {
            StreamState::Single(plan) => {
                assert_eq!(plan.item_id, "s1");
                assert_eq!(plan.format, SplatFormat::Sog);
            }
            other => panic!("expected single plan, got {:?}", other),
        }
    }

    #[test]
    fn test_discover_without_splat_data_is_done() {
        let catalog = ResolvedCatalog::new(vec![item("nav", "navmesh_v1", "obj")]);
        assert!(matches!(discover(&catalog, "r1"), StreamState::Done));
    }

    #[test]
    fn test_discover_ignores_other_refinements() {
        let catalog = ResolvedCatalog::new(vec![
            tile("t1", "fine", 0, 0),
            item("s2", "refined_splat_r2", "refined_splat"),
        ]);
        assert!(matches!(discover(&catalog, "r2"), StreamState::Single(_)));
        match discover(&catalog, "r1") {
            StreamState::Partitioned { fallback, .. } => assert!(fallback.is_none()),
            other => panic!("expected partitioned plan, got {:?}", other),
        }
    }
}
