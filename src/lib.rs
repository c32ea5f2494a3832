//! Helpers for pulling OpenStreetMap data through the Overpass API and
//! rebuilding way outlines as polygon rings.
//!
//! The pipeline runs strictly left to right: [`build_query`] produces an
//! Overpass QL string, [`load_or_fetch`] turns it into a list of
//! [`Element`]s (serving a validated on-disk CSV cache first),
//! [`join_ways_to_nodes`] expands each way into per-node rows, and
//! [`assemble_polygons`] groups those rows into one ring per way id.
//! [`reverse_geocode`] and the comparison writers in [`compare`] are side
//! helpers around the same data.
//!
//! Everything is synchronous and blocking; there is no retry, rate limiting
//! or concurrent fetching.

mod cache;
pub mod compare;
mod geometry;
mod join;
mod nominatim;
mod overpass;

pub use cache::{cache_path, load_or_fetch, read_cache, write_cache, CacheConfig};
pub use geometry::{assemble_polygons, PolygonCollection, DEFAULT_CRS};
pub use join::{join_ways_to_nodes, WayNodeRow};
pub use nominatim::{reverse_geocode, OsmType, ReverseGeocode, NOMINATIM_URL};
pub use overpass::{
    build_query, fetch_elements, parse_elements, BoundingBox, Element, DEFAULT_ENTITY,
    OVERPASS_URL,
};

use std::path::PathBuf;

/// Errors surfaced by the fetch, cache and comparison helpers.
///
/// Unresolvable node references and missing Nominatim coordinates are not
/// errors; the former are dropped with a logged warning and the latter come
/// back as `None`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed: network, DNS, or a non-200 status.
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response JSON didn't have the shape geometry construction needs.
    #[error("unexpected response shape: {0}")]
    Schema(String),

    /// A cache file failed integrity validation. Delete the file (and its
    /// metadata sidecar) to force a refetch.
    #[error("corrupt cache file {}: {message}", path.display())]
    CacheCorrupt { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("GeoJSON error: {0}")]
    Geojson(#[from] geojson::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// End-to-end convenience: build the query, load elements (cache first),
/// join ways against nodes, and assemble one ring per matched way.
pub fn fetch_polygons(
    tags: &[&str],
    objects: &[&str],
    bbox: &BoundingBox,
    entity: &str,
    config: &CacheConfig,
    crs: &str,
) -> Result<PolygonCollection> {
    let query = build_query(tags, objects, bbox, entity);
    let elements = load_or_fetch(&query, bbox, objects, config)?;
    let rows = join_ways_to_nodes(&elements);
    Ok(assemble_polygons(&rows, crs))
}
