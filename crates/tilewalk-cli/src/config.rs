//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use glam::DVec3;
use tilewalk::{
    AreaOfInterest, DEFAULT_ROOT_URL, Error, GeodeticPoint, LocalFrame, Result, TraversalBudgets,
};

/// Default number of geometry levels to descend.
const DEFAULT_MAX_LOD: u32 = 4;
/// Default widening of the area in every intersection test, in meters.
const DEFAULT_RELAX_METERS: f64 = 25.0;
/// Default download cap (512 MiB).
const DEFAULT_CAP_BYTES: u64 = 512 * 1024 * 1024;
/// Default cache directory.
const DEFAULT_CACHE_DIR: &str = "tile-cache";

#[derive(Parser, Debug)]
#[command(about = "Plan and fetch 3D tiles covering an area of interest")]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Walk the tileset and print the tiles covering the area.
    Plan(PlanArgs),
    /// Plan, then download the tiles into the cache.
    Fetch(FetchArgs),
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// API key for the tile service.
    #[arg(long, env = "TILEWALK_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Root tileset URL.
    #[arg(long, default_value = DEFAULT_ROOT_URL)]
    pub root_url: String,

    #[command(flatten)]
    pub area: AreaArgs,

    #[command(flatten)]
    pub frame: FrameArgs,

    /// Geometry levels to descend below the root.
    #[arg(long, default_value_t = DEFAULT_MAX_LOD)]
    pub max_lod: u32,

    /// Widening of the area in meters.
    #[arg(long, default_value_t = DEFAULT_RELAX_METERS)]
    pub relax: f64,

    /// Maximum number of planned tiles.
    #[arg(long)]
    pub max_tiles: Option<usize>,

    /// Maximum number of sub-tileset documents fetched.
    #[arg(long)]
    pub max_json_fetches: Option<usize>,

    /// Maximum number of tree nodes visited.
    #[arg(long)]
    pub max_node_visits: Option<usize>,
}

impl PlanArgs {
    #[must_use]
    pub fn budgets(&self) -> TraversalBudgets {
        let defaults = TraversalBudgets::default();
        TraversalBudgets {
            max_tiles: self.max_tiles.unwrap_or(defaults.max_tiles),
            max_json_fetches: self.max_json_fetches.unwrap_or(defaults.max_json_fetches),
            max_node_visits: self.max_node_visits.unwrap_or(defaults.max_node_visits),
        }
    }

    pub fn area_of_interest(&self) -> Result<AreaOfInterest> {
        let area = &self.area;
        if let Some(GeoRing(points)) = area.bbox.as_ref().or(area.ring.as_ref()) {
            return AreaOfInterest::from_geodetic(points.clone());
        }
        if let Some(LocalRing(points)) = &area.local_ring {
            return AreaOfInterest::from_local(self.frame.frame()?.as_ref(), points);
        }
        Err(Error::Config {
            context: "area of interest",
            detail: "one of --bbox, --ring or --local-ring is required".to_string(),
        })
    }
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    #[command(flatten)]
    pub plan: PlanArgs,

    /// Directory for downloaded tiles.
    #[arg(long, default_value = DEFAULT_CACHE_DIR)]
    pub cache_dir: PathBuf,

    /// Stop before the downloaded total exceeds this many bytes.
    #[arg(long, default_value_t = DEFAULT_CAP_BYTES)]
    pub cap_bytes: u64,

    /// Only use tiles already in the cache.
    #[arg(long)]
    pub no_download: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct AreaArgs {
    /// Area as `west,south,east,north` in degrees.
    #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
    pub bbox: Option<GeoRing>,

    /// Area as `lon,lat;lon,lat;...` in degrees.
    #[arg(long, value_parser = parse_ring, allow_hyphen_values = true)]
    pub ring: Option<GeoRing>,

    /// Area as `x,y;x,y;...` in model units, placed with `--frame-origin`.
    #[arg(long, value_parser = parse_local_ring, allow_hyphen_values = true)]
    pub local_ring: Option<LocalRing>,
}

/// Geo-reference of the model frame used by `--local-ring`.
#[derive(Args, Debug)]
pub struct FrameArgs {
    /// Model origin as `lon,lat[,height]`.
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    pub frame_origin: Option<GeodeticPoint>,

    /// Meters per model unit.
    #[arg(long, default_value_t = 1.0)]
    pub meters_per_unit: f64,

    /// Heading of the model's +y axis, clockwise from north, in degrees.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub heading: f64,
}

impl FrameArgs {
    pub fn frame(&self) -> Result<Option<LocalFrame>> {
        Ok(self
            .frame_origin
            .map(|origin| LocalFrame::new(origin, self.meters_per_unit, self.heading))
            .transpose()?)
    }
}

#[derive(Debug, Clone)]
pub struct GeoRing(Vec<GeodeticPoint>);

#[derive(Debug, Clone)]
pub struct LocalRing(Vec<DVec3>);

fn parse_numbers(s: &str) -> std::result::Result<Vec<f64>, String> {
    s.split(',')
        .map(|v| {
            v.trim()
                .parse::<f64>()
                .map_err(|e| format!("invalid number '{}': {e}", v.trim()))
        })
        .collect()
}

fn parse_bbox(s: &str) -> std::result::Result<GeoRing, String> {
    let &[west, south, east, north] = parse_numbers(s)?.as_slice() else {
        return Err(format!("expected west,south,east,north, got '{s}'"));
    };
    if south >= north {
        return Err(format!("south ({south}) must be below north ({north})"));
    }
    Ok(GeoRing(vec![
        GeodeticPoint::new(west, south, 0.0),
        GeodeticPoint::new(east, south, 0.0),
        GeodeticPoint::new(east, north, 0.0),
        GeodeticPoint::new(west, north, 0.0),
    ]))
}

fn parse_point(s: &str) -> std::result::Result<GeodeticPoint, String> {
    match parse_numbers(s)?.as_slice() {
        &[lon, lat] => Ok(GeodeticPoint::new(lon, lat, 0.0)),
        &[lon, lat, height] => Ok(GeodeticPoint::new(lon, lat, height)),
        _ => Err(format!("expected lon,lat[,height], got '{s}'")),
    }
}

fn parse_ring(s: &str) -> std::result::Result<GeoRing, String> {
    s.split(';')
        .filter(|p| !p.trim().is_empty())
        .map(parse_point)
        .collect::<std::result::Result<_, _>>()
        .map(GeoRing)
}

fn parse_local_ring(s: &str) -> std::result::Result<LocalRing, String> {
    s.split(';')
        .filter(|p| !p.trim().is_empty())
        .map(|p| match parse_numbers(p)?.as_slice() {
            &[x, y] => Ok(DVec3::new(x, y, 0.0)),
            &[x, y, z] => Ok(DVec3::new(x, y, z)),
            _ => Err(format!("expected x,y[,z], got '{p}'")),
        })
        .collect::<std::result::Result<_, _>>()
        .map(LocalRing)
}
