use std::collections::BTreeMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The public Overpass instance every fetch goes through.
pub const OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Entity key used when the caller doesn't pick one.
pub const DEFAULT_ENTITY: &str = "building";

/// Sent on every request; Nominatim's usage policy requires one.
pub(crate) const USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Core element fields a promoted OSM tag may not shadow.
const RESERVED_FIELDS: &[&str] = &["type", "id", "lat", "lon", "nodes"];

/// A bounding box in the OSM convention: (south, west, north, east), in
/// degrees. Only used to parameterize queries and derive cache keys.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// The four components joined by underscores, for cache keys.
    pub(crate) fn underscore_key(&self) -> String {
        format!("{}_{}_{}_{}", self.south, self.west, self.north, self.east)
    }
}

/// One raw OSM entity from an Overpass response.
///
/// Core fields have a fixed schema; the nested `tags` mapping is promoted
/// into the open `attributes` map instead of becoming dynamic top-level
/// fields, so tag keys can never shadow `id` or the coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Node {
        id: i64,
        lat: f64,
        lon: f64,
        #[serde(default, rename = "tags")]
        attributes: BTreeMap<String, String>,
    },
    Way {
        id: i64,
        /// Ordered node references. A closed way repeats its first id last.
        nodes: Vec<i64>,
        #[serde(default, rename = "tags")]
        attributes: BTreeMap<String, String>,
    },
}

impl Element {
    pub fn id(&self) -> i64 {
        match self {
            Element::Node { id, .. } | Element::Way { id, .. } => *id,
        }
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        match self {
            Element::Node { attributes, .. } | Element::Way { attributes, .. } => attributes,
        }
    }
}

/// Builds the Overpass QL string: one filter clause per (tag, object) pair,
/// in tag-then-object order, wrapped in a 60 second JSON-output block and
/// followed by the recursion that also fetches node geometry for matched
/// ways.
///
/// Caller strings are interpolated verbatim; empty `tags` or `objects`
/// yields a syntactically valid query matching nothing.
pub fn build_query(tags: &[&str], objects: &[&str], bbox: &BoundingBox, entity: &str) -> String {
    let mut query = String::from("[out:json][timeout:60];(");
    for tag in tags {
        for object in objects {
            query.push_str(&format!(
                "{}[\"{}\"~\"{}\"]({},{},{},{});",
                object, entity, tag, bbox.south, bbox.west, bbox.north, bbox.east
            ));
        }
    }
    query.push_str(");out body;>;out skel qt;");
    query
}

#[derive(Deserialize)]
struct OverpassResponse {
    elements: Vec<Element>,
}

/// Parses an Overpass JSON body into elements.
///
/// A body without an `elements` array, or with a node missing coordinates,
/// is a schema error for the whole call; coordinates are never defaulted.
pub fn parse_elements(body: &str) -> Result<Vec<Element>> {
    let raw: serde_json::Value = serde_json::from_str(body)?;
    let response: OverpassResponse =
        serde_json::from_value(raw).map_err(|err| Error::Schema(err.to_string()))?;
    for element in &response.elements {
        for key in element.attributes().keys() {
            if RESERVED_FIELDS.contains(&key.as_str()) {
                warn!(
                    "element {} carries a tag named {key:?} colliding with a core field",
                    element.id()
                );
            }
        }
    }
    Ok(response.elements)
}

/// One blocking GET against Overpass with the query in the `data`
/// parameter. No retry and no client-side timeout; the query itself asks
/// the server for a 60 second budget.
pub fn fetch_elements(query: &str) -> Result<Vec<Element>> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .build()?;
    let body = client
        .get(OVERPASS_URL)
        .query(&[("data", query)])
        .send()?
        .error_for_status()?
        .text()?;
    parse_elements(&body)
}
