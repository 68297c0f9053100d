//! Tileset documents and traversal results.
//!
//! Documents are parsed straight into these types. Trees are read-only once
//! parsed and are dropped as soon as the walker has planned them.

use serde::{Deserialize, Deserializer};
use tilewalk_geo::{BoundingSphere, GeodeticRegion, OrientedBox};

use crate::error::{Error, Result};

/// How a node's content relates to its children's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Refine {
    /// Children are drawn in addition to the parent.
    #[serde(alias = "add")]
    Add,
    /// Children supersede the parent.
    #[default]
    #[serde(alias = "replace")]
    Replace,
}

/// What a content URI points at, judged by its path suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Another tileset document (`.json`), expanded on demand.
    Tileset,
    /// Binary geometry, anything that is not a tileset document.
    Geometry,
}

impl ContentKind {
    /// Classify a content URI. The query string and fragment are ignored.
    #[must_use]
    pub fn of(uri: &str) -> Self {
        let path = uri.split(['?', '#']).next().unwrap_or(uri);
        if path.to_ascii_lowercase().ends_with(".json") {
            ContentKind::Tileset
        } else {
            ContentKind::Geometry
        }
    }
}

/// The bounding volume of a tile node.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "RawBoundingVolume")]
pub enum BoundingVolume {
    /// Oriented box in ECEF.
    Box(OrientedBox),
    /// Sphere in ECEF.
    Sphere(BoundingSphere),
    /// Geodetic region (radians and meters).
    Region(GeodeticRegion),
}

#[derive(Deserialize)]
struct RawBoundingVolume {
    #[serde(rename = "box")]
    obb: Option<[f64; 12]>,
    sphere: Option<[f64; 4]>,
    region: Option<[f64; 6]>,
}

impl TryFrom<RawBoundingVolume> for BoundingVolume {
    type Error = String;

    // Documents that declare several kinds get the tightest one we support.
    fn try_from(raw: RawBoundingVolume) -> std::result::Result<Self, Self::Error> {
        if let Some(values) = raw.obb {
            return Ok(BoundingVolume::Box(OrientedBox::from_array(&values)));
        }
        if let Some(values) = raw.region {
            return Ok(BoundingVolume::Region(GeodeticRegion::from_array(values)));
        }
        if let Some([x, y, z, radius]) = raw.sphere {
            return Ok(BoundingVolume::Sphere(BoundingSphere::new(
                glam::DVec3::new(x, y, z),
                radius,
            )));
        }
        Err("bounding volume has no box, sphere or region".to_string())
    }
}

/// A node of a tileset tree.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileNode {
    /// Volume enclosing this node and all of its descendants.
    pub bounding_volume: BoundingVolume,
    /// Geometric error in meters.
    #[serde(default)]
    pub geometric_error: f64,
    /// Refine mode declared on this node, if any.
    #[serde(default)]
    pub refine: Option<Refine>,
    /// Content URI, resolved to an absolute URL once fetched through the
    /// client.
    #[serde(default, rename = "content", deserialize_with = "content_uri")]
    pub content_uri: Option<String>,
    /// Child nodes.
    #[serde(default)]
    pub children: Vec<TileNode>,
}

impl TileNode {
    /// Kind of content this node carries, if any.
    #[must_use]
    pub fn content_kind(&self) -> Option<ContentKind> {
        self.content_uri.as_deref().map(ContentKind::of)
    }

    /// Visit this node and every descendant, parents first, stopping at the
    /// first error.
    pub(crate) fn try_for_each_mut(
        &mut self,
        mut f: impl FnMut(&mut TileNode) -> Result<()>,
    ) -> Result<()> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            f(node)?;
            stack.extend(node.children.iter_mut());
        }
        Ok(())
    }
}

fn content_uri<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    struct Content {
        #[serde(alias = "url")]
        uri: String,
    }

    Ok(Option::<Content>::deserialize(d)?.map(|c| c.uri))
}

/// A parsed tileset document.
#[derive(Debug, Clone)]
pub struct Tileset {
    /// `asset.version` of the document.
    pub asset_version: String,
    /// Top-level geometric error.
    pub root_geometric_error: f64,
    /// Root node.
    pub root: TileNode,
    /// Refine mode declared at the top of the document.
    pub refine: Option<Refine>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TilesetDocument {
    #[serde(default)]
    asset: Asset,
    #[serde(default)]
    geometric_error: f64,
    root: TileNode,
    #[serde(default)]
    refine: Option<Refine>,
}

#[derive(Default, Deserialize)]
struct Asset {
    #[serde(default)]
    version: String,
}

impl Tileset {
    /// Parse a tileset document.
    ///
    /// `url` is only used for error reporting. Content URIs are left as they
    /// appear in the document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the document is malformed.
    pub fn from_json(url: &str, data: &[u8]) -> Result<Self> {
        let doc: TilesetDocument = serde_json::from_slice(data).map_err(|e| Error::Json {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            asset_version: doc.asset.version,
            root_geometric_error: doc.geometric_error,
            refine: doc.refine.or(doc.root.refine),
            root: doc.root,
        })
    }
}

/// A tile selected for download.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedTile {
    /// Absolute content URL.
    pub content_uri: String,
    /// Geometry depth at which the tile was selected.
    pub depth: u32,
    /// The tile's bounding volume.
    pub bounding_volume: BoundingVolume,
    /// Resolved refine mode of the tile.
    pub refine: Refine,
}

/// Hard limits for one traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalBudgets {
    /// Maximum number of planned tiles.
    pub max_tiles: usize,
    /// Maximum number of sub-tileset documents fetched.
    pub max_json_fetches: usize,
    /// Maximum number of nodes popped from the work list.
    pub max_node_visits: usize,
}

impl Default for TraversalBudgets {
    fn default() -> Self {
        Self {
            max_tiles: 5_000,
            max_json_fetches: 1_000,
            max_node_visits: 250_000,
        }
    }
}

/// A sub-tileset that could not be fetched or parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    /// The URI that failed.
    pub uri: String,
    /// Why it failed.
    pub message: String,
}

/// Counters and flags describing one traversal.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraversalStats {
    pub planned_tiles: usize,
    pub json_fetches: usize,
    pub json_fetch_failures: usize,
    pub node_visits: usize,
    pub prunes: usize,
    pub heuristic_leaf_stops: usize,
    pub hit_tile_budget: bool,
    pub hit_json_budget: bool,
    pub hit_node_budget: bool,
    pub cancelled: bool,
    /// Sub-tileset failures, in the order they happened.
    pub failures: Vec<FetchFailure>,
    /// Why the plan is empty. `None` when tiles were planned.
    pub empty_plan_reason: Option<String>,
}

impl TraversalStats {
    /// True if any budget stopped the traversal.
    #[must_use]
    pub fn hit_any_budget(&self) -> bool {
        self.hit_tile_budget || self.hit_json_budget || self.hit_node_budget
    }
}

/// The result of planning a traversal.
#[derive(Debug, Clone, Default)]
pub struct TraversalOutcome {
    /// Planned tiles in traversal order, without duplicates.
    pub tiles: Vec<PlannedTile>,
    /// Statistics for this traversal.
    pub stats: TraversalStats,
}
