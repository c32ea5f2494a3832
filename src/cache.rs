use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fs_err::File;
use log::info;
use serde::{Deserialize, Serialize};

use crate::overpass::{fetch_elements, BoundingBox, Element};
use crate::{Error, Result};

/// Where cache files live and how long a hit stays fresh. `ttl: None`
/// serves a hit forever, which matches having no staleness policy at all.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub dir: PathBuf,
    pub ttl: Option<Duration>,
}

impl CacheConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// One file per (bounding box, object set): the four bbox components and
/// the object names joined by underscores.
pub fn cache_path(dir: &Path, bbox: &BoundingBox, objects: &[&str]) -> PathBuf {
    dir.join(format!(
        "osm_data_{}_osm_objects_{}.csv",
        bbox.underscore_key(),
        objects.join("_")
    ))
}

fn meta_path(path: &Path) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(".meta.json");
    PathBuf::from(raw)
}

/// Flat CSV form of an element: header `type,id,lat,lon,nodes,tags`, with
/// `nodes` and `tags` as JSON literals. Reads parse both strictly; a
/// truncated `nodes` literal is a corrupt entry, never a shorter ring.
#[derive(Serialize, Deserialize)]
struct CacheRow {
    #[serde(rename = "type")]
    kind: String,
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    nodes: String,
    tags: String,
}

/// Sidecar written after the data file; a row-count mismatch on read marks
/// the cache entry corrupt, and `fetched_unix` drives the TTL check.
#[derive(Serialize, Deserialize)]
struct CacheMeta {
    rows: usize,
    fetched_unix: u64,
}

fn to_row(element: &Element) -> Result<CacheRow> {
    Ok(match element {
        Element::Node {
            id,
            lat,
            lon,
            attributes,
        } => CacheRow {
            kind: "node".to_string(),
            id: *id,
            lat: Some(*lat),
            lon: Some(*lon),
            nodes: String::new(),
            tags: serde_json::to_string(attributes)?,
        },
        Element::Way {
            id,
            nodes,
            attributes,
        } => CacheRow {
            kind: "way".to_string(),
            id: *id,
            lat: None,
            lon: None,
            nodes: serde_json::to_string(nodes)?,
            tags: serde_json::to_string(attributes)?,
        },
    })
}

fn from_row(row: CacheRow, path: &Path) -> Result<Element> {
    let corrupt = |message: String| Error::CacheCorrupt {
        path: path.to_path_buf(),
        message,
    };
    match row.kind.as_str() {
        "node" => {
            let (Some(lat), Some(lon)) = (row.lat, row.lon) else {
                return Err(corrupt(format!("node {} has no coordinates", row.id)));
            };
            let attributes = serde_json::from_str(&row.tags)
                .map_err(|err| corrupt(format!("bad tags literal for node {}: {err}", row.id)))?;
            Ok(Element::Node {
                id: row.id,
                lat,
                lon,
                attributes,
            })
        }
        "way" => {
            let nodes: Vec<i64> = serde_json::from_str(&row.nodes)
                .map_err(|err| corrupt(format!("bad nodes literal for way {}: {err}", row.id)))?;
            let attributes = serde_json::from_str(&row.tags)
                .map_err(|err| corrupt(format!("bad tags literal for way {}: {err}", row.id)))?;
            Ok(Element::Way {
                id: row.id,
                nodes,
                attributes,
            })
        }
        other => Err(corrupt(format!("unknown element type {other:?}"))),
    }
}

/// Writes the element table, then its metadata sidecar. A write that dies
/// before the sidecar leaves an entry that fails validation.
pub fn write_cache(path: &Path, elements: &[Element]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_writer(File::create(path)?);
    for element in elements {
        writer.serialize(to_row(element)?)?;
    }
    writer.flush()?;

    let meta = CacheMeta {
        rows: elements.len(),
        fetched_unix: unix_now(),
    };
    fs_err::write(meta_path(path), serde_json::to_string(&meta)?)?;
    Ok(())
}

/// Reads a cache entry back, validating it: the metadata sidecar must be
/// present and readable, every row must parse strictly, and the row count
/// must match the sidecar.
pub fn read_cache(path: &Path) -> Result<Vec<Element>> {
    let meta = read_meta(path)?;

    let mut elements = Vec::new();
    for record in csv::Reader::from_reader(File::open(path)?).deserialize() {
        let row: CacheRow = record.map_err(|err| Error::CacheCorrupt {
            path: path.to_path_buf(),
            message: format!("unreadable row: {err}"),
        })?;
        elements.push(from_row(row, path)?);
    }
    if elements.len() != meta.rows {
        return Err(Error::CacheCorrupt {
            path: path.to_path_buf(),
            message: format!("expected {} rows, found {}", meta.rows, elements.len()),
        });
    }
    Ok(elements)
}

fn read_meta(path: &Path) -> Result<CacheMeta> {
    let corrupt = |message: String| Error::CacheCorrupt {
        path: path.to_path_buf(),
        message,
    };
    let meta_file = meta_path(path);
    match fs_err::read_to_string(&meta_file) {
        Ok(raw) => {
            serde_json::from_str(&raw).map_err(|err| corrupt(format!("bad metadata sidecar: {err}")))
        }
        Err(err) => Err(corrupt(format!(
            "missing metadata sidecar {}: {err}",
            meta_file.display()
        ))),
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

fn is_stale(meta: &CacheMeta, ttl: Option<Duration>) -> bool {
    match ttl {
        Some(ttl) => unix_now().saturating_sub(meta.fetched_unix) > ttl.as_secs(),
        None => false,
    }
}

/// The fetch-or-cache entry point: derive the cache path from the bbox and
/// object names, serve a validated hit, refetch on a miss or a stale
/// entry. A corrupt entry is an error, not a refetch; delete the file to
/// recover.
pub fn load_or_fetch(
    query: &str,
    bbox: &BoundingBox,
    objects: &[&str],
    config: &CacheConfig,
) -> Result<Vec<Element>> {
    let path = cache_path(&config.dir, bbox, objects);
    if path.exists() {
        let meta = read_meta(&path)?;
        if !is_stale(&meta, config.ttl) {
            info!("cache hit for {}", path.display());
            return read_cache(&path);
        }
        info!("cache entry {} is stale, refetching", path.display());
    } else {
        info!("cache miss for {}, fetching from Overpass", path.display());
    }

    let elements = fetch_elements(query)?;
    write_cache(&path, &elements)?;
    Ok(elements)
}
