//! Points, tile masks and tiled point clouds.

use serde::{Deserialize, Serialize};

/// One colored 3D sample.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Point {
    pub fn new(x: f32, y: f32, z: f32, rgb: [u8; 3]) -> Self {
        Self {
            x,
            y,
            z,
            r: rgb[0],
            g: rgb[1],
            b: rgb[2],
        }
    }

    #[inline]
    pub fn rgb(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    #[inline]
    pub fn position(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

/// Errors raised while building a [`TileMask`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TileMaskError {
    #[error("tile mask must have exactly one bit set (got {0:#04x})")]
    NotSingleBit(u8),
}

/// A single sensor tile, identified by one bit of the per-point tile byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct TileMask(u8);

impl TileMask {
    pub const TILE_1: TileMask = TileMask(1);
    pub const TILE_2: TileMask = TileMask(2);
    pub const TILE_4: TileMask = TileMask(4);
    pub const TILE_8: TileMask = TileMask(8);

    /// The four camera tiles of a standard capture rig, in processing order.
    pub const DEFAULT_SET: [TileMask; 4] =
        [Self::TILE_1, Self::TILE_2, Self::TILE_4, Self::TILE_8];

    pub fn new(bit: u8) -> Result<Self, TileMaskError> {
        if bit.count_ones() == 1 {
            Ok(Self(bit))
        } else {
            Err(TileMaskError::NotSingleBit(bit))
        }
    }

    #[inline]
    pub fn bit(self) -> u8 {
        self.0
    }

    /// True if a point carrying `tile_byte` belongs to this tile.
    #[inline]
    pub fn matches(self, tile_byte: u8) -> bool {
        tile_byte & self.0 != 0
    }
}

impl TryFrom<u8> for TileMask {
    type Error = TileMaskError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TileMask> for u8 {
    fn from(mask: TileMask) -> Self {
        mask.0
    }
}

impl std::fmt::Display for TileMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TileMask {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let value = match s.strip_prefix("0x") {
            Some(hex) => u8::from_str_radix(hex, 16),
            None => s.parse::<u8>(),
        }
        .map_err(|e| format!("invalid tile mask '{s}': {e}"))?;
        TileMask::new(value).map_err(|e| e.to_string())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PointCloudError {
    #[error("point/tile length mismatch ({points} points, {tiles} tile entries)")]
    LengthMismatch { points: usize, tiles: usize },
}

/// Ordered points plus the per-point tile byte stored alongside them.
///
/// `points.len() == tiles.len()` always holds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointCloud {
    points: Vec<Point>,
    tiles: Vec<u8>,
}

impl PointCloud {
    pub fn new(points: Vec<Point>, tiles: Vec<u8>) -> Result<Self, PointCloudError> {
        if points.len() != tiles.len() {
            return Err(PointCloudError::LengthMismatch {
                points: points.len(),
                tiles: tiles.len(),
            });
        }
        Ok(Self { points, tiles })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn push(&mut self, point: Point, tile_byte: u8) {
        self.points.push(point);
        self.tiles.push(tile_byte);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    #[inline]
    pub fn tiles(&self) -> &[u8] {
        &self.tiles
    }

    /// Iterate `(point, tile_byte)` pairs in stored order.
    pub fn iter(&self) -> impl Iterator<Item = (&Point, u8)> + '_ {
        self.points.iter().zip(self.tiles.iter().copied())
    }

    /// Bitwise OR of every tile byte in the cloud.
    pub fn tile_union(&self) -> u8 {
        self.tiles.iter().fold(0u8, |acc, &t| acc | t)
    }
}
