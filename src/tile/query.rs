//! Query builder for MVT tiles.
//!
//! Turns an [`Envelope`] and a [`LayerId`] into a single PostGIS query that
//! returns one `bytea` column holding the encoded tile. The query is composed
//! of three CTE stages:
//!
//! ```text
//! bounds   densified tile polygon (EPSG:3857) + its box2d
//!    │
//!    ▼
//! mvtgeom  layer rows intersecting the bounds, reprojected and clipped
//!    │     into tile space by ST_AsMVTGeom
//!    ▼
//! encode   ST_AsMVT over all rows (empty bytea when nothing matches)
//! ```
//!
//! Only numeric values are ever written into the query text. Table and
//! column names come from a [`GeometrySource`] whose identifiers are checked
//! by [`GeometrySource::validate`] before the server starts.

use std::fmt;
use std::num::NonZeroI64;
use std::str::FromStr;

use crate::error::ConfigError;

use super::envelope::{Envelope, TileIndex};

// =============================================================================
// Constants
// =============================================================================

/// Number of segments each tile edge is split into before reprojection.
pub const DENSIFY_FACTOR: u32 = 4;

/// SRID of the tile (output) coordinate system.
pub const WEB_MERCATOR_SRID: i32 = 3857;

/// SRID of the stored geometries.
pub const DEFAULT_SOURCE_SRID: i32 = 4326;

/// Default table holding layer geometries.
pub const DEFAULT_TABLE: &str = "maps_layers_geometries";

/// Default geometry column.
pub const DEFAULT_GEOMETRY_COLUMN: &str = "geom";

/// Default per-geometry id column.
pub const DEFAULT_ID_COLUMN: &str = "id_geometry";

/// Default column referencing the owning layer.
pub const DEFAULT_LAYER_COLUMN: &str = "layer_id";

// =============================================================================
// Layer Id
// =============================================================================

/// Primary key of a data layer. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(NonZeroI64);

impl LayerId {
    /// Returns `None` for zero or negative ids.
    pub fn new(id: i64) -> Option<Self> {
        if id > 0 {
            NonZeroI64::new(id).map(LayerId)
        } else {
            None
        }
    }

    pub fn get(self) -> i64 {
        self.0.get()
    }
}

impl FromStr for LayerId {
    type Err = InvalidLayerId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>()
            .ok()
            .and_then(LayerId::new)
            .ok_or(InvalidLayerId)
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The text was not a positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidLayerId;

// =============================================================================
// Geometry Source
// =============================================================================

/// Where layer geometries live in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometrySource {
    /// Table name, optionally schema-qualified (`schema.table`)
    pub table: String,

    /// Geometry column, stored in `srid`
    pub geometry_column: String,

    /// Column emitted as the `id_geometry` feature attribute
    pub id_column: String,

    /// Column matched against the requested layer id
    pub layer_column: String,

    /// SRID of the stored geometries
    pub srid: i32,
}

impl Default for GeometrySource {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            geometry_column: DEFAULT_GEOMETRY_COLUMN.to_string(),
            id_column: DEFAULT_ID_COLUMN.to_string(),
            layer_column: DEFAULT_LAYER_COLUMN.to_string(),
            srid: DEFAULT_SOURCE_SRID,
        }
    }
}

impl GeometrySource {
    /// Check that every name is safe to splice into SQL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_qualified_identifier(&self.table) {
            return Err(ConfigError::InvalidIdentifier {
                field: "table",
                value: self.table.clone(),
            });
        }

        let columns = [
            ("geometry_column", &self.geometry_column),
            ("id_column", &self.id_column),
            ("layer_column", &self.layer_column),
        ];
        for (field, value) in columns {
            if !is_identifier(value) {
                return Err(ConfigError::InvalidIdentifier {
                    field,
                    value: value.clone(),
                });
            }
        }

        if self.srid <= 0 {
            return Err(ConfigError::OutOfRange {
                field: "source_srid",
                reason: format!("must be a positive SRID, got {}", self.srid),
            });
        }

        Ok(())
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// An identifier with at most one `schema.` qualifier.
fn is_qualified_identifier(name: &str) -> bool {
    match name.split_once('.') {
        Some((schema, table)) => is_identifier(schema) && is_identifier(table),
        None => is_identifier(name),
    }
}

// =============================================================================
// Tile Query
// =============================================================================

/// A generated tile query together with what it was built for.
#[derive(Debug, Clone, PartialEq)]
pub struct TileQuery {
    /// SQL text returning one row with one `bytea` column
    pub sql: String,

    /// Layer the query selects from
    pub layer: LayerId,

    /// Tile the envelope was computed from, if known
    pub tile: Option<TileIndex>,
}

impl TileQuery {
    pub fn as_str(&self) -> &str {
        &self.sql
    }
}

// =============================================================================
// Query Builder
// =============================================================================

/// Builds tile queries against a fixed [`GeometrySource`].
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    source: GeometrySource,
}

impl QueryBuilder {
    /// Create a builder for the given source.
    ///
    /// Fails when the source names are not plain identifiers.
    pub fn new(source: GeometrySource) -> Result<Self, ConfigError> {
        source.validate()?;
        Ok(Self { source })
    }

    pub fn source(&self) -> &GeometrySource {
        &self.source
    }

    /// Build the query for a tile index.
    pub fn build_for_tile(&self, tile: TileIndex, env: &Envelope, layer: LayerId) -> TileQuery {
        TileQuery {
            tile: Some(tile),
            ..self.build(env, layer)
        }
    }

    /// Build the query for an arbitrary Web Mercator envelope.
    pub fn build(&self, env: &Envelope, layer: LayerId) -> TileQuery {
        let bounds = bounds_sql(env);
        let GeometrySource {
            table,
            geometry_column: geom,
            id_column,
            layer_column,
            srid,
        } = &self.source;

        let sql = format!(
            r#"
        WITH
        bounds AS (
            SELECT env AS geom,
                   env::box2d AS b2d
            FROM (SELECT {bounds} AS env) AS e
        ),
        mvtgeom AS (
            SELECT ST_AsMVTGeom(ST_Transform(t.{geom}, {WEB_MERCATOR_SRID}), bounds.b2d) AS geom,
                   t.{id_column} AS id_geometry,
                   t.{layer_column} AS id_layer
            FROM {table} t, bounds
            WHERE ST_Intersects(t.{geom}, ST_Transform(bounds.geom, {srid}))
              AND t.{layer_column} = {layer}
        )
        SELECT COALESCE(ST_AsMVT(mvtgeom.*), ''::bytea) FROM mvtgeom
    "#,
            layer = layer.get(),
        );

        TileQuery {
            sql,
            layer,
            tile: None,
        }
    }
}

/// Build a tile query against the default geometry source.
pub fn build_tile_query(env: &Envelope, layer: LayerId) -> TileQuery {
    QueryBuilder::default().build(env, layer)
}

/// The densified tile polygon in Web Mercator.
fn bounds_sql(env: &Envelope) -> String {
    let segment = env.width() / f64::from(DENSIFY_FACTOR);
    format!(
        "ST_Segmentize(ST_MakeEnvelope({}, {}, {}, {}, {WEB_MERCATOR_SRID}), {})",
        env.x_min, env.y_min, env.x_max, env.y_max, segment
    )
}

// =============================================================================
// Tests
// =============================================================================
