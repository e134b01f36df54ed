//! Web Mercator tile envelopes.
//!
//! Converts an XYZ tile index into its bounding box in EPSG:3857 meters.
//!
//! ```text
//!  y_max ┌──────────┬──────────┐   row 0 is the northernmost row,
//!        │ (1,0,0)  │ (1,1,0)  │   while projected Y grows northward
//!        ├──────────┼──────────┤
//!        │ (1,0,1)  │ (1,1,1)  │
//!  y_min └──────────┴──────────┘
//!      x_min                 x_max
//! ```

use std::fmt;

// =============================================================================
// Constants
// =============================================================================

/// Half the circumference of the Web Mercator world square, in meters.
pub const WORLD_MERC_MAX: f64 = 20037508.3427892;

/// Western/southern edge of the Web Mercator world square.
pub const WORLD_MERC_MIN: f64 = -WORLD_MERC_MAX;

/// Side length of the Web Mercator world square.
pub const WORLD_MERC_SIZE: f64 = WORLD_MERC_MAX - WORLD_MERC_MIN;

/// Deepest zoom level served. Past roughly z54 the tile size drops below the
/// f64 spacing near the world edge and envelopes collapse to zero width.
pub const MAX_ZOOM: u8 = 30;

// =============================================================================
// Tile Index
// =============================================================================

/// A cell of the power-of-two tile pyramid.
///
/// `x` and `y` are expected to lie in `0..2^zoom`, but this is not enforced:
/// indices outside the pyramid produce envelopes outside the world square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileIndex {
    /// Zoom level (0 = one tile for the whole world)
    pub zoom: u8,

    /// Column, counted from the west
    pub x: u32,

    /// Row, counted from the north
    pub y: u32,
}

impl TileIndex {
    pub fn new(zoom: u8, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }

    /// Number of tiles along one axis at this zoom level.
    pub fn tiles_per_axis(&self) -> f64 {
        2f64.powi(i32::from(self.zoom))
    }

    /// Whether `x` and `y` address a tile inside the pyramid at this zoom.
    pub fn is_within_bounds(&self) -> bool {
        let n = self.tiles_per_axis();
        f64::from(self.x) < n && f64::from(self.y) < n
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

// =============================================================================
// Envelope
// =============================================================================

/// Axis-aligned bounding box in Web Mercator meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Envelope {
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }
}

/// Compute the Web Mercator envelope of a tile.
///
/// Pure and total. No rounding or snapping is applied; the database clips at
/// these boundaries on its own.
pub fn compute_envelope(tile: TileIndex) -> Envelope {
    let tile_size = WORLD_MERC_SIZE / tile.tiles_per_axis();

    // f64 arithmetic keeps `x + 1` from overflowing at u32::MAX
    let x = f64::from(tile.x);
    let y = f64::from(tile.y);

    Envelope {
        x_min: WORLD_MERC_MIN + tile_size * x,
        x_max: WORLD_MERC_MIN + tile_size * (x + 1.0),
        y_min: WORLD_MERC_MAX - tile_size * (y + 1.0),
        y_max: WORLD_MERC_MAX - tile_size * y,
    }
}

// =============================================================================
// Tests
// =============================================================================
