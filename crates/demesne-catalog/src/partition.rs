//! Partition tile naming grammar.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::asset::{Lod, SplatFormat};

static PARTITION_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^splat_partition_(?<lod>full|coarse|fine)_(?<size>[0-9]+)_(?<x>-?[0-9]+)_(?<z>-?[0-9]+)_(?<refinement>.+)$",
    )
    .unwrap()
});

#[derive(Debug, Error)]
#[error("invalid partition name: {0}")]
pub struct ParsePartitionError(pub String);

/// A splat partition tile reference parsed from a catalog name.
///
/// Tile coordinates are signed grid indices; `tile_size` is the grid cell
/// edge length and is never negative by grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionRef {
    pub lod: Lod,
    pub tile_size: u32,
    pub tile_x: i32,
    pub tile_z: i32,
    pub refinement: String,
    pub format: SplatFormat,
}

impl PartitionRef {
    /// Parse `splat_partition_(lod)_(size)_(x)_(z)_(refinement)`.
    ///
    /// Numeric fields that overflow their type are rejected the same way as
    /// any non-matching name.
    pub fn parse(name: &str, format: SplatFormat) -> Result<Self, ParsePartitionError> {
        let caps = PARTITION_NAME_REGEX
            .captures(name)
            .ok_or_else(|| ParsePartitionError(name.to_string()))?;

        let lod: Lod = caps["lod"]
            .parse()
            .map_err(|_| ParsePartitionError(name.to_string()))?;
        let tile_size = caps["size"]
            .parse()
            .map_err(|_| ParsePartitionError(name.to_string()))?;
        let tile_x = caps["x"]
            .parse()
            .map_err(|_| ParsePartitionError(name.to_string()))?;
        let tile_z = caps["z"]
            .parse()
            .map_err(|_| ParsePartitionError(name.to_string()))?;

        Ok(Self {
            lod,
            tile_size,
            tile_x,
            tile_z,
            refinement: caps["refinement"].to_string(),
            format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fine_tile_with_negative_coordinate() {
        let part = PartitionRef::parse("splat_partition_fine_10_-2_3_abc", SplatFormat::Splat)
            .unwrap();
        assert_eq!(part.lod, Lod::Fine);
        assert_eq!(part.tile_size, 10);
        assert_eq!(part.tile_x, -2);
        assert_eq!(part.tile_z, 3);
        assert_eq!(part.refinement, "abc");
        assert_eq!(part.format, SplatFormat::Splat);
    }

    #[test]
    fn test_parse_all_lod_tiers() {
        for (name, lod) in [
            ("splat_partition_full_16_0_0_r1", Lod::Full),
            ("splat_partition_coarse_16_1_-1_r1", Lod::Coarse),
            ("splat_partition_fine_16_-3_-4_r1", Lod::Fine),
        ] {
            assert_eq!(
                PartitionRef::parse(name, SplatFormat::Splat).unwrap().lod,
                lod
            );
        }
    }

    #[test]
    fn test_refinement_may_contain_underscores() {
        let part =
            PartitionRef::parse("splat_partition_coarse_8_0_0_run_2024_05", SplatFormat::Splat)
                .unwrap();
        assert_eq!(part.refinement, "run_2024_05");
    }

    #[test]
    fn test_format_is_passed_through() {
        let part =
            PartitionRef::parse("splat_partition_full_8_0_0_r1", SplatFormat::Sog).unwrap();
        assert_eq!(part.format, SplatFormat::Sog);
    }

    #[test]
    fn test_rejects_unknown_lod() {
        assert!(PartitionRef::parse("splat_partition_mid_8_0_0_r1", SplatFormat::Splat).is_err());
    }

    #[test]
    fn test_rejects_missing_refinement() {
        assert!(PartitionRef::parse("splat_partition_fine_10_-2_3", SplatFormat::Splat).is_err());
        assert!(PartitionRef::parse("splat_partition_fine_10_-2_3_", SplatFormat::Splat).is_err());
    }

    #[test]
    fn test_rejects_non_numeric_fields() {
        assert!(PartitionRef::parse("splat_partition_fine_x_0_0_r1", SplatFormat::Splat).is_err());
        assert!(
            PartitionRef::parse("splat_partition_fine_10_0.5_0_r1", SplatFormat::Splat).is_err()
        );
    }

    #[test]
    fn test_rejects_negative_tile_size() {
        assert!(
            PartitionRef::parse("splat_partition_fine_-10_0_0_r1", SplatFormat::Splat).is_err()
        );
    }

    #[test]
    fn test_rejects_overflowing_tile_size() {
        assert!(
            PartitionRef::parse(
                "splat_partition_fine_99999999999999999999_0_0_r1",
                SplatFormat::Splat
            )
            .is_err()
        );
    }

    #[test]
    fn test_rejects_unrelated_names() {
        assert!(PartitionRef::parse("navmesh_v1", SplatFormat::Splat).is_err());
        assert!(PartitionRef::parse("splat_partition", SplatFormat::Splat).is_err());
    }
}
