//! Area-of-interest traversal of tileset trees.
//!
//! The walker performs a depth-first search over a tileset, pruning every node
//! whose bounding volume misses the area of interest and following sub-tileset
//! pointers as it meets them. The result is an ordered, de-duplicated plan of
//! geometry tiles to acquire.

use std::collections::HashSet;
use std::ops::ControlFlow;

use tilewalk_geo::AoiFootprint;
use tokio_util::sync::CancellationToken;

use crate::aoi::AreaOfInterest;
use crate::client::Client;
use crate::error::Result;
use crate::session::{Session, canonical_url};
use crate::transport::Transport;
use crate::types::{
    BoundingVolume, ContentKind, FetchFailure, PlannedTile, Refine, TileNode, Tileset,
    TraversalBudgets, TraversalOutcome, TraversalStats,
};

/// Regions within this factor of the target footprint stop descending early.
const LEAF_SIZE_SLACK: f64 = 1.15;

/// Plans the geometry tiles needed to cover an area of interest.
#[derive(Debug, Clone)]
pub struct TilesetWalker {
    footprint: AoiFootprint,
    max_lod: u32,
    target_footprint_m: f64,
    budgets: TraversalBudgets,
    cancel: CancellationToken,
}

impl TilesetWalker {
    /// Create a walker for `aoi`, descending at most `max_lod` geometry levels.
    ///
    /// `relax_meters` widens the area in every intersection test.
    ///
    /// # Errors
    ///
    /// Returns an error if `relax_meters` is negative or the area cannot be
    /// summarized.
    pub fn new(aoi: &AreaOfInterest, max_lod: u32, relax_meters: f64) -> Result<Self> {
        let footprint = aoi.footprint(relax_meters)?;
        let levels = i32::try_from(max_lod).unwrap_or(i32::MAX);
        let target_footprint_m = footprint.diagonal_m() / 2f64.powi(levels);

        Ok(Self {
            footprint,
            max_lod,
            target_footprint_m,
            budgets: TraversalBudgets::default(),
            cancel: CancellationToken::new(),
        })
    }

    /// Replace the default budgets.
    #[must_use]
    pub fn with_budgets(mut self, budgets: TraversalBudgets) -> Self {
        self.budgets = budgets;
        self
    }

    /// Stop the traversal when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The area summary every node is tested against.
    #[must_use]
    pub fn footprint(&self) -> &AoiFootprint {
        &self.footprint
    }

    /// Deepest geometry level planned.
    #[must_use]
    pub fn max_lod(&self) -> u32 {
        self.max_lod
    }

    /// Limits that end the walk early.
    #[must_use]
    pub fn budgets(&self) -> TraversalBudgets {
        self.budgets
    }

    /// Tile size, in meters, at which a region is detailed enough.
    #[must_use]
    pub fn target_footprint_meters(&self) -> f64 {
        self.target_footprint_m
    }

    /// Broad-phase test of a bounding volume against the area of interest.
    #[must_use]
    pub fn intersects(&self, volume: &BoundingVolume) -> bool {
        match volume {
            BoundingVolume::Box(obb) => self.footprint.intersects_box(obb),
            BoundingVolume::Sphere(sphere) => self.footprint.intersects_sphere(sphere),
            BoundingVolume::Region(region) => self.footprint.intersects_region(region),
        }
    }

    fn is_detailed_enough(&self, volume: &BoundingVolume) -> bool {
        let BoundingVolume::Region(region) = volume else {
            return false;
        };
        let (width, height) = region.size_meters();
        let limit = LEAF_SIZE_SLACK * self.target_footprint_m;
        width <= limit && height <= limit
    }

    /// Walk `tileset` and plan the geometry tiles intersecting the area.
    ///
    /// Never fails: unreachable sub-tilesets are recorded in the statistics
    /// and skipped, and budgets or cancellation end the walk early with
    /// whatever was planned so far.
    pub async fn plan_downloads<T: Transport>(
        &self,
        client: &Client<T>,
        session: &mut Session,
        tileset: Tileset,
    ) -> TraversalOutcome {
        let mut traversal = Traversal {
            walker: self,
            client,
            session,
            stack: Vec::new(),
            visited: HashSet::new(),
            planned: HashSet::new(),
            intersected: false,
            outcome: TraversalOutcome::default(),
        };
        traversal.stack.push(Pending {
            node: tileset.root,
            depth: 0,
            refine: tileset.refine.unwrap_or_default(),
        });

        while let Some(pending) = traversal.stack.pop() {
            if traversal.visit(pending).await.is_break() {
                break;
            }
        }

        traversal.finish()
    }
}

/// Plan the tiles of `tileset` intersecting `aoi` with default budgets.
///
/// # Errors
///
/// Returns an error only if the walker cannot be created from its arguments.
pub async fn plan_downloads<T: Transport>(
    client: &Client<T>,
    session: &mut Session,
    tileset: Tileset,
    max_lod: u32,
    aoi: &AreaOfInterest,
    relax_meters: f64,
) -> Result<TraversalOutcome> {
    let walker = TilesetWalker::new(aoi, max_lod, relax_meters)?;
    Ok(walker.plan_downloads(client, session, tileset).await)
}

struct Pending {
    node: TileNode,
    depth: u32,
    refine: Refine,
}

struct Traversal<'a, T: Transport> {
    walker: &'a TilesetWalker,
    client: &'a Client<T>,
    session: &'a mut Session,
    stack: Vec<Pending>,
    /// Sub-tileset URLs already fetched or attempted.
    visited: HashSet<String>,
    /// Content URLs already planned.
    planned: HashSet<String>,
    /// True once any node passed the area test.
    intersected: bool,
    outcome: TraversalOutcome,
}

impl<T: Transport> Traversal<'_, T> {
    async fn visit(&mut self, pending: Pending) -> ControlFlow<()> {
        let Pending {
            node,
            depth,
            refine: inherited,
        } = pending;
        let budgets = self.walker.budgets;

        if self.walker.cancel.is_cancelled() {
            self.outcome.stats.cancelled = true;
            return ControlFlow::Break(());
        }
        if self.outcome.stats.node_visits >= budgets.max_node_visits {
            self.outcome.stats.hit_node_budget = true;
            return ControlFlow::Break(());
        }
        self.outcome.stats.node_visits += 1;

        if !self.walker.intersects(&node.bounding_volume) {
            self.outcome.stats.prunes += 1;
            return ControlFlow::Continue(());
        }
        self.intersected = true;

        let refine = node.refine.unwrap_or(inherited);
        let kind = node.content_kind();

        let mut leaf = node.children.is_empty()
            || (depth >= self.walker.max_lod && kind != Some(ContentKind::Tileset));
        if !leaf
            && kind == Some(ContentKind::Geometry)
            && self.walker.is_detailed_enough(&node.bounding_volume)
        {
            self.outcome.stats.heuristic_leaf_stops += 1;
            leaf = true;
        }

        let TileNode {
            bounding_volume,
            content_uri,
            children,
            ..
        } = node;

        if leaf {
            match (kind, content_uri) {
                (Some(ContentKind::Tileset), Some(uri)) => {
                    if let Some(root) = self.fetch_subtileset(&uri, depth, refine).await? {
                        self.stack.push(root);
                    }
                }
                (Some(ContentKind::Geometry), Some(uri)) => {
                    self.plan(uri, depth, bounding_volume, refine)?;
                }
                _ => {}
            }
            return ControlFlow::Continue(());
        }

        let mut next = Vec::with_capacity(children.len());
        for child in children {
            if child.content_kind() != Some(ContentKind::Tileset) {
                next.push(Pending {
                    node: child,
                    depth: depth + 1,
                    refine,
                });
                continue;
            }

            // Pointers are collapsed: the sub-tileset root takes the pointer's
            // place at the parent's depth.
            if !self.walker.intersects(&child.bounding_volume) {
                self.outcome.stats.prunes += 1;
                continue;
            }
            self.intersected = true;
            let child_refine = child.refine.unwrap_or(refine);
            if let Some(uri) = child.content_uri.as_deref()
                && let Some(root) = self.fetch_subtileset(uri, depth, child_refine).await?
            {
                next.push(root);
            }
        }
        // Reversed so children pop in document order.
        self.stack.extend(next.into_iter().rev());

        if refine == Refine::Add
            && kind == Some(ContentKind::Geometry)
            && let Some(uri) = content_uri
        {
            self.plan(uri, depth, bounding_volume, refine)?;
        }

        ControlFlow::Continue(())
    }

    async fn fetch_subtileset(
        &mut self,
        uri: &str,
        depth: u32,
        refine: Refine,
    ) -> ControlFlow<(), Option<Pending>> {
        let key = canonical_url(uri);
        if self.visited.contains(&key) {
            tracing::debug!(url = %key, "sub-tileset already visited");
            return ControlFlow::Continue(None);
        }
        if self.walker.cancel.is_cancelled() {
            self.outcome.stats.cancelled = true;
            return ControlFlow::Break(());
        }
        if self.outcome.stats.json_fetches >= self.walker.budgets.max_json_fetches {
            self.outcome.stats.hit_json_budget = true;
            return ControlFlow::Break(());
        }

        self.visited.insert(key.clone());
        self.outcome.stats.json_fetches += 1;

        match self.client.fetch_tileset(self.session, uri).await {
            Ok(tileset) => ControlFlow::Continue(Some(Pending {
                node: tileset.root,
                depth,
                refine: tileset.refine.unwrap_or(refine),
            })),
            Err(e) => {
                tracing::warn!(url = %key, error = %e, "skipping sub-tileset");
                self.outcome.stats.json_fetch_failures += 1;
                self.outcome.stats.failures.push(FetchFailure {
                    uri: key,
                    message: e.to_string(),
                });
                ControlFlow::Continue(None)
            }
        }
    }

    fn plan(
        &mut self,
        uri: String,
        depth: u32,
        bounding_volume: BoundingVolume,
        refine: Refine,
    ) -> ControlFlow<()> {
        let key = canonical_url(&uri);
        if self.planned.contains(&key) {
            return ControlFlow::Continue(());
        }
        if self.outcome.tiles.len() >= self.walker.budgets.max_tiles {
            self.outcome.stats.hit_tile_budget = true;
            return ControlFlow::Break(());
        }

        self.planned.insert(key);
        self.outcome.tiles.push(PlannedTile {
            content_uri: uri,
            depth,
            bounding_volume,
            refine,
        });
        ControlFlow::Continue(())
    }

    fn finish(self) -> TraversalOutcome {
        let mut outcome = self.outcome;
        outcome.stats.planned_tiles = outcome.tiles.len();
        if outcome.tiles.is_empty() {
            outcome.stats.empty_plan_reason =
                Some(empty_plan_reason(&outcome.stats, self.intersected));
        }

        let stats = &outcome.stats;
        tracing::info!(
            tiles = stats.planned_tiles,
            json_fetches = stats.json_fetches,
            json_failures = stats.json_fetch_failures,
            node_visits = stats.node_visits,
            prunes = stats.prunes,
            heuristic_leaf_stops = stats.heuristic_leaf_stops,
            "traversal finished"
        );
        if stats.hit_any_budget() {
            tracing::warn!(
                tiles = stats.hit_tile_budget,
                json = stats.hit_json_budget,
                nodes = stats.hit_node_budget,
                "traversal stopped by budget"
            );
        }
        if let Some(reason) = &stats.empty_plan_reason {
            tracing::warn!(reason = %reason, "no tiles planned");
        }

        outcome
    }
}

fn empty_plan_reason(stats: &TraversalStats, intersected: bool) -> String {
    if stats.cancelled {
        return "Traversal cancelled before reaching geometry".to_string();
    }
    if stats.hit_any_budget() {
        let hit: Vec<&str> = [
            (stats.hit_tile_budget, "tiles"),
            (stats.hit_json_budget, "sub-tileset fetches"),
            (stats.hit_node_budget, "node visits"),
        ]
        .into_iter()
        .filter_map(|(hit, name)| hit.then_some(name))
        .collect();
        return format!(
            "Budget exhausted before reaching geometry ({})",
            hit.join(", ")
        );
    }
    if let Some(first) = stats.failures.first() {
        return format!(
            "Malformed or unreachable tileset ({} failed, first {}: {})",
            stats.failures.len(),
            first.uri,
            first.message
        );
    }
    if stats.prunes > 0 && !intersected {
        return "All nodes pruned by AOI".to_string();
    }
    "No geometry content within max LOD".to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::DVec3;
    use serde_json::{Value, json};
    use tilewalk_geo::{BoundingSphere, GeodeticPoint, OrientedBox, enu_basis};

    use super::*;
    use crate::client::tests::{ROOT, client};
    use crate::transport::mock::MockTransport;

    const BASE: &str = "https://tiles.example.com/v1/3dtiles/";

    fn url(path: &str) -> String {
        format!("{BASE}{path}")
    }

    /// Roughly 750 m by 1.1 km around central Zurich.
    fn aoi() -> AreaOfInterest {
        AreaOfInterest::from_bounds(8.545, 47.365, 8.555, 47.375).unwrap()
    }

    fn walker(max_lod: u32) -> TilesetWalker {
        TilesetWalker::new(&aoi(), max_lod, 0.0).unwrap()
    }

    fn region(west: f64, south: f64, east: f64, north: f64) -> Value {
        json!({
            "region": [
                west.to_radians(),
                south.to_radians(),
                east.to_radians(),
                north.to_radians(),
                -100.0,
                1000.0
            ]
        })
    }

    fn inside() -> Value {
        region(8.5, 47.3, 8.6, 47.4)
    }

    fn outside() -> Value {
        region(10.0, 47.3, 10.1, 47.4)
    }

    fn node(volume: Value, content: Option<&str>, children: Vec<Value>) -> Value {
        let mut node = json!({
            "boundingVolume": volume,
            "geometricError": 10.0,
            "children": children,
        });
        if let Some(uri) = content {
            node["content"] = json!({ "uri": uri });
        }
        node
    }

    fn refined(mut node: Value, refine: &str) -> Value {
        node["refine"] = json!(refine);
        node
    }

    fn doc(root: Value) -> String {
        json!({
            "asset": { "version": "1.1" },
            "geometricError": 100.0,
            "root": root,
        })
        .to_string()
    }

    async fn walk(
        walker: &TilesetWalker,
        root: Value,
        documents: &[(&str, Value)],
    ) -> (TraversalOutcome, Arc<MockTransport>) {
        let mock = Arc::new(MockTransport::new());
        mock.serve(ROOT, doc(root));
        for (path, root) in documents {
            mock.serve(&url(path), doc(root.clone()));
        }

        let client = client(&mock);
        let mut session = Session::new("test-key").unwrap();
        let tileset = client.fetch_root(&mut session).await.unwrap();
        let outcome = walker.plan_downloads(&client, &mut session, tileset).await;
        (outcome, mock)
    }

    fn uris(outcome: &TraversalOutcome) -> Vec<String> {
        outcome
            .tiles
            .iter()
            .map(|t| t.content_uri.clone())
            .collect()
    }

    #[test]
    fn test_target_footprint() {
        let walker = walker(5);
        let expected = walker.footprint().diagonal_m() / 32.0;
        assert!((walker.target_footprint_meters() - expected).abs() < 1e-9);
        // The ECEF box around a 750 m by 1.1 km area has a ~1.47 km diagonal.
        assert!(walker.target_footprint_meters() > 40.0);
        assert!(walker.target_footprint_meters() < 50.0);
    }

    #[test]
    fn test_intersects_each_volume_kind() {
        let walker = walker(3);
        let center = GeodeticPoint::new(8.55, 47.37, 0.0);
        let far = GeodeticPoint::new(-74.0, 40.7, 0.0);

        let sphere = |p: GeodeticPoint| {
            BoundingVolume::Sphere(BoundingSphere::new(p.to_ecef(), 100.0))
        };
        assert!(walker.intersects(&sphere(center)));
        assert!(!walker.intersects(&sphere(far)));

        let obb = |p: GeodeticPoint| {
            BoundingVolume::Box(OrientedBox::from_basis(
                p.to_ecef(),
                enu_basis(p.lon_deg, p.lat_deg),
                DVec3::splat(100.0),
            ))
        };
        assert!(walker.intersects(&obb(center)));
        assert!(!walker.intersects(&obb(far)));

        let inside: TileNode = serde_json::from_value(node(inside(), None, vec![])).unwrap();
        let outside: TileNode = serde_json::from_value(node(outside(), None, vec![])).unwrap();
        assert!(walker.intersects(&inside.bounding_volume));
        assert!(!walker.intersects(&outside.bounding_volume));
    }

    #[tokio::test]
    async fn test_disjoint_root_is_pruned() {
        let root = node(outside(), Some("a.glb"), vec![]);
        let (outcome, _) = walk(&walker(3), root, &[]).await;

        assert!(outcome.tiles.is_empty());
        assert_eq!(outcome.stats.prunes, 1);
        assert_eq!(
            outcome.stats.empty_plan_reason.as_deref(),
            Some("All nodes pruned by AOI")
        );
    }

    #[tokio::test]
    async fn test_children_in_document_order() {
        let root = node(
            inside(),
            None,
            vec![
                node(inside(), Some("a.glb"), vec![]),
                node(outside(), Some("far.glb"), vec![]),
                node(inside(), Some("b.glb"), vec![]),
            ],
        );
        let (outcome, _) = walk(&walker(3), root, &[]).await;

        assert_eq!(uris(&outcome), [url("a.glb"), url("b.glb")]);
        assert!(outcome.tiles.iter().all(|t| t.depth == 1));
        assert_eq!(outcome.stats.prunes, 1);
        assert_eq!(outcome.stats.planned_tiles, 2);
        assert_eq!(outcome.stats.empty_plan_reason, None);
    }

    #[tokio::test]
    async fn test_replace_parent_with_pruned_children_contributes_nothing() {
        let root = refined(
            node(
                inside(),
                Some("parent.glb"),
                vec![
                    node(outside(), Some("a.glb"), vec![]),
                    node(outside(), Some("b.glb"), vec![]),
                ],
            ),
            "REPLACE",
        );
        let (outcome, _) = walk(&walker(3), root, &[]).await;

        assert!(outcome.tiles.is_empty());
        assert_eq!(outcome.stats.prunes, 2);
        // The parent itself met the area, so not everything was pruned.
        assert_eq!(
            outcome.stats.empty_plan_reason.as_deref(),
            Some("No geometry content within max LOD")
        );
    }

    #[tokio::test]
    async fn test_add_parent_contributes_with_children() {
        let root = refined(
            node(
                inside(),
                Some("parent.glb"),
                vec![
                    node(inside(), Some("child.glb"), vec![]),
                    node(outside(), Some("far.glb"), vec![]),
                ],
            ),
            "ADD",
        );
        let (outcome, _) = walk(&walker(3), root, &[]).await;

        assert_eq!(uris(&outcome), [url("parent.glb"), url("child.glb")]);
        assert_eq!(outcome.tiles[0].depth, 0);
        assert_eq!(outcome.tiles[0].refine, Refine::Add);
        assert_eq!(outcome.tiles[1].refine, Refine::Add);
    }

    #[tokio::test]
    async fn test_max_lod_stops_descent() {
        let root = node(
            inside(),
            Some("coarse.glb"),
            vec![node(inside(), Some("fine.glb"), vec![])],
        );
        let (outcome, _) = walk(&walker(0), root, &[]).await;

        assert_eq!(uris(&outcome), [url("coarse.glb")]);
        assert_eq!(outcome.tiles[0].depth, 0);
    }

    #[tokio::test]
    async fn test_small_region_stops_early() {
        let tiny = region(8.5499, 47.3699, 8.5501, 47.3701);
        let root = node(
            inside(),
            None,
            vec![node(
                tiny.clone(),
                Some("tiny.glb"),
                vec![node(tiny, Some("finer.glb"), vec![])],
            )],
        );
        let (outcome, _) = walk(&walker(5), root, &[]).await;

        assert_eq!(uris(&outcome), [url("tiny.glb")]);
        assert_eq!(outcome.stats.heuristic_leaf_stops, 1);
    }

    #[tokio::test]
    async fn test_sub_tileset_keeps_depth() {
        let root = node(inside(), None, vec![node(inside(), Some("sub.json"), vec![])]);
        let sub = node(inside(), None, vec![node(inside(), Some("leaf.glb"), vec![])]);
        let (outcome, mock) = walk(&walker(1), root, &[("sub.json", sub)]).await;

        assert_eq!(uris(&outcome), [url("leaf.glb")]);
        assert_eq!(outcome.tiles[0].depth, 1);
        assert_eq!(outcome.stats.json_fetches, 1);
        assert_eq!(mock.get_count(&url("sub.json")), 1);
    }

    #[tokio::test]
    async fn test_sub_tileset_refine_is_inherited() {
        let root = refined(
            node(inside(), None, vec![node(inside(), Some("sub.json"), vec![])]),
            "ADD",
        );
        let sub = node(inside(), None, vec![node(inside(), Some("leaf.glb"), vec![])]);
        let (outcome, _) = walk(&walker(3), root, &[("sub.json", sub)]).await;

        assert_eq!(outcome.tiles.len(), 1);
        assert_eq!(outcome.tiles[0].refine, Refine::Add);
    }

    #[tokio::test]
    async fn test_duplicates_are_visited_once() {
        let root = node(
            inside(),
            None,
            vec![
                node(inside(), Some("sub.json"), vec![]),
                node(inside(), Some("sub.json?session=other"), vec![]),
                node(inside(), Some("same.glb"), vec![]),
            ],
        );
        let sub = node(inside(), None, vec![node(inside(), Some("same.glb"), vec![])]);
        let (outcome, mock) = walk(&walker(3), root, &[("sub.json", sub)]).await;

        assert_eq!(uris(&outcome), [url("same.glb")]);
        assert_eq!(outcome.stats.json_fetches, 1);
        assert_eq!(mock.get_count(&url("sub.json")), 1);
    }

    #[tokio::test]
    async fn test_pruned_pointer_is_not_fetched() {
        let root = node(
            inside(),
            None,
            vec![
                node(outside(), Some("far.json"), vec![]),
                node(inside(), Some("a.glb"), vec![]),
            ],
        );
        let far = node(inside(), Some("b.glb"), vec![]);
        let (outcome, mock) = walk(&walker(3), root, &[("far.json", far)]).await;

        assert_eq!(uris(&outcome), [url("a.glb")]);
        assert_eq!(outcome.stats.json_fetches, 0);
        assert_eq!(mock.get_count(&url("far.json")), 0);
    }

    #[tokio::test]
    async fn test_unreachable_sub_tileset_is_recorded() {
        let root = node(
            inside(),
            None,
            vec![
                node(inside(), Some("missing.json"), vec![]),
                node(inside(), Some("a.glb"), vec![]),
            ],
        );
        let (outcome, _) = walk(&walker(3), root, &[]).await;

        assert_eq!(uris(&outcome), [url("a.glb")]);
        assert_eq!(outcome.stats.json_fetch_failures, 1);
        assert_eq!(outcome.stats.failures.len(), 1);
        assert_eq!(outcome.stats.failures[0].uri, url("missing.json"));
        assert!(outcome.stats.failures[0].message.contains("404"));
    }

    #[tokio::test]
    async fn test_only_failures_explain_empty_plan() {
        let root = node(inside(), None, vec![node(inside(), Some("missing.json"), vec![])]);
        let (outcome, _) = walk(&walker(3), root, &[]).await;

        assert!(outcome.tiles.is_empty());
        let reason = outcome.stats.empty_plan_reason.unwrap();
        assert!(reason.starts_with("Malformed or unreachable tileset"), "{reason}");
    }

    #[tokio::test]
    async fn test_pruned_children_of_empty_node_are_not_all_pruned() {
        let root = node(
            inside(),
            None,
            vec![
                node(inside(), None, vec![]),
                node(outside(), Some("far.glb"), vec![]),
            ],
        );
        let (outcome, _) = walk(&walker(3), root, &[]).await;

        assert!(outcome.tiles.is_empty());
        assert_eq!(outcome.stats.prunes, 1);
        assert_eq!(
            outcome.stats.empty_plan_reason.as_deref(),
            Some("No geometry content within max LOD")
        );
    }

    #[tokio::test]
    async fn test_no_geometry_explains_empty_plan() {
        let root = node(inside(), None, vec![node(inside(), None, vec![])]);
        let (outcome, _) = walk(&walker(3), root, &[]).await;

        assert_eq!(
            outcome.stats.empty_plan_reason.as_deref(),
            Some("No geometry content within max LOD")
        );
    }

    #[tokio::test]
    async fn test_tile_budget() {
        let children = (0..5)
            .map(|i| node(inside(), Some(&format!("{i}.glb")), vec![]))
            .collect();
        let walker = walker(3).with_budgets(TraversalBudgets {
            max_tiles: 3,
            ..TraversalBudgets::default()
        });
        let (outcome, _) = walk(&walker, node(inside(), None, children), &[]).await;

        assert_eq!(outcome.tiles.len(), 3);
        assert!(outcome.stats.hit_tile_budget);
        assert_eq!(outcome.stats.empty_plan_reason, None);
    }

    #[tokio::test]
    async fn test_json_budget_stops_fetching() {
        let root = node(
            inside(),
            None,
            vec![
                node(inside(), Some("a.json"), vec![]),
                node(inside(), Some("b.json"), vec![]),
                node(inside(), Some("c.json"), vec![]),
            ],
        );
        let sub = |name: &str| node(inside(), Some(name), vec![]);
        let documents = [
            ("a.json", sub("a.glb")),
            ("b.json", sub("b.glb")),
            ("c.json", sub("c.glb")),
        ];
        let walker = walker(3).with_budgets(TraversalBudgets {
            max_json_fetches: 1,
            ..TraversalBudgets::default()
        });
        let (outcome, mock) = walk(&walker, root, &documents).await;

        assert!(outcome.stats.hit_json_budget);
        assert_eq!(outcome.stats.json_fetches, 1);
        assert_eq!(mock.get_count(&url("a.json")), 1);
        assert_eq!(mock.get_count(&url("b.json")), 0);
        assert_eq!(mock.get_count(&url("c.json")), 0);
        let reason = outcome.stats.empty_plan_reason.unwrap();
        assert!(reason.starts_with("Budget exhausted"), "{reason}");
    }

    #[tokio::test]
    async fn test_node_budget() {
        let root = node(inside(), None, vec![node(inside(), Some("a.glb"), vec![])]);
        let walker = walker(3).with_budgets(TraversalBudgets {
            max_node_visits: 1,
            ..TraversalBudgets::default()
        });
        let (outcome, _) = walk(&walker, root, &[]).await;

        assert!(outcome.tiles.is_empty());
        assert_eq!(outcome.stats.node_visits, 1);
        assert!(outcome.stats.hit_node_budget);
        let reason = outcome.stats.empty_plan_reason.unwrap();
        assert!(reason.contains("node visits"), "{reason}");
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let walker = walker(3).with_cancellation(token);
        let root = node(inside(), Some("a.glb"), vec![]);
        let (outcome, _) = walk(&walker, root, &[]).await;

        assert!(outcome.tiles.is_empty());
        assert!(outcome.stats.cancelled);
        assert_eq!(
            outcome.stats.empty_plan_reason.as_deref(),
            Some("Traversal cancelled before reaching geometry")
        );
    }

    #[tokio::test]
    async fn test_free_function() {
        let mock = Arc::new(MockTransport::new());
        mock.serve(ROOT, doc(node(inside(), Some("a.glb"), vec![])));
        let client = client(&mock);
        let mut session = Session::new("test-key").unwrap();
        let tileset = client.fetch_root(&mut session).await.unwrap();

        let outcome = plan_downloads(&client, &mut session, tileset, 3, &aoi(), 25.0)
            .await
            .unwrap();
        assert_eq!(uris(&outcome), [url("a.glb")]);
    }
}
