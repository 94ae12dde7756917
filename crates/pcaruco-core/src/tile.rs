//! Per-sensor tile extraction.

use crate::{PointCloud, TileMask};

/// Return the sub-cloud of points whose tile byte has `mask` set.
///
/// Relative order is preserved and the input is left untouched. A tile with
/// no points yields an empty cloud.
pub fn extract_tile(cloud: &PointCloud, mask: TileMask) -> PointCloud {
    let mut out = PointCloud::empty();
    for (p, tile) in cloud.iter() {
        if mask.matches(tile) {
            out.push(*p, tile);
        }
    }
    log::debug!(
        "tile {}: {} of {} points",
        mask,
        out.len(),
        cloud.len()
    );
    out
}

/// Extract every tile in `masks`, in the given order.
pub fn split_tiles(cloud: &PointCloud, masks: &[TileMask]) -> Vec<(TileMask, PointCloud)> {
    masks
        .iter()
        .map(|&mask| (mask, extract_tile(cloud, mask)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point;

    fn cloud_with_tiles(tiles: &[u8]) -> PointCloud {
        let points = tiles
            .iter()
            .enumerate()
            .map(|(i, _)| Point::new(i as f32, -(i as f32), 0.5, [i as u8, 0, 0]))
            .collect();
        PointCloud::new(points, tiles.to_vec()).expect("cloud")
    }

    #[test]
    fn exclusive_tiles_partition_the_cloud() {
        let tiles = [1u8, 2, 4, 8, 8, 4, 2, 1, 1, 2];
        let cloud = cloud_with_tiles(&tiles);

        let parts = split_tiles(&cloud, &TileMask::DEFAULT_SET);
        let total: usize = parts.iter().map(|(_, c)| c.len()).sum();
        assert_eq!(total, cloud.len());

        for (mask, part) in &parts {
            assert!(part.tiles().iter().all(|&t| t == mask.bit()));
            let expected = tiles.iter().filter(|&&t| t == mask.bit()).count();
            assert_eq!(part.len(), expected);
        }

        let mut union: Vec<Point> = parts
            .iter()
            .flat_map(|(_, c)| c.points().iter().copied())
            .collect();
        union.sort_by(|a, b| a.x.total_cmp(&b.x));
        assert_eq!(union, cloud.points());
    }

    #[test]
    fn extraction_preserves_relative_order() {
        let cloud = cloud_with_tiles(&[2, 1, 2, 1, 2]);
        let tile = extract_tile(&cloud, TileMask::TILE_2);
        let xs: Vec<f32> = tile.points().iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn shared_points_appear_in_every_matching_tile() {
        let cloud = cloud_with_tiles(&[3, 1, 2]);
        assert_eq!(extract_tile(&cloud, TileMask::TILE_1).len(), 2);
        assert_eq!(extract_tile(&cloud, TileMask::TILE_2).len(), 2);
    }

    #[test]
    fn missing_tile_yields_empty_cloud() {
        let cloud = cloud_with_tiles(&[1, 1, 2]);
        let before = cloud.clone();
        let tile = extract_tile(&cloud, TileMask::TILE_8);
        assert!(tile.is_empty());
        assert_eq!(cloud, before);
    }
}
