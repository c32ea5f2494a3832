use std::collections::BTreeMap;

use geo::{Coord, LineString, Polygon};

use crate::WayNodeRow;

/// NZGD2000. Callers can override per call; nothing here reprojects.
pub const DEFAULT_CRS: &str = "EPSG:4167";

/// One ring per way id, tagged with the CRS the coordinates are expressed
/// in. Rings are (lon, lat): longitude is x.
#[derive(Clone, Debug, PartialEq)]
pub struct PolygonCollection {
    pub crs: String,
    pub rings: BTreeMap<i64, LineString>,
}

impl PolygonCollection {
    /// The ring as a geo polygon. geo forces ring closure on construction,
    /// so only use this on output paths that can take the extra closing
    /// point; the stored ring is exactly what the way's nodes produced.
    pub fn polygon(&self, way_id: i64) -> Option<Polygon> {
        self.rings
            .get(&way_id)
            .map(|ring| Polygon::new(ring.clone(), Vec::new()))
    }

    pub fn len(&self) -> usize {
        self.rings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }
}

/// Groups rows by way id, in sample order, into one ring per way.
///
/// Ways are assumed to arrive already closed (first and last node
/// coincide); nothing verifies or forces closure, and a way left with
/// fewer than 3 distinct points yields a degenerate ring rather than an
/// error.
pub fn assemble_polygons(rows: &[WayNodeRow], crs: &str) -> PolygonCollection {
    let mut grouped: BTreeMap<i64, Vec<(usize, Coord)>> = BTreeMap::new();
    for row in rows {
        grouped.entry(row.way_id).or_default().push((
            row.sample_num,
            Coord {
                x: row.lon,
                y: row.lat,
            },
        ));
    }

    let mut rings = BTreeMap::new();
    for (way_id, mut points) in grouped {
        points.sort_by_key(|(sample_num, _)| *sample_num);
        rings.insert(
            way_id,
            LineString::new(points.into_iter().map(|(_, pt)| pt).collect()),
        );
    }

    PolygonCollection {
        crs: crs.to_string(),
        rings,
    }
}
