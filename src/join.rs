use std::collections::HashMap;

use log::warn;

use crate::Element;

/// One (way, position-in-way) record after joining way node references
/// against node coordinates. The same node id shows up in multiple rows
/// when several ways reference it, or twice in one way when the way is
/// closed.
#[derive(Clone, Debug, PartialEq)]
pub struct WayNodeRow {
    pub way_id: i64,
    /// 0-based position of the node within the way's node list.
    pub sample_num: usize,
    pub node_id: i64,
    pub lat: f64,
    pub lon: f64,
}

/// Expands each way's node-id list into one row per (way, position) and
/// attaches coordinates from the nodes in the same batch.
///
/// Node ids that don't resolve are dropped with a warning; a way
/// referencing missing nodes just ends up with fewer rows. Output is
/// grouped by way and ordered by position within each way.
pub fn join_ways_to_nodes(elements: &[Element]) -> Vec<WayNodeRow> {
    let mut node_mapping: HashMap<i64, (f64, f64)> = HashMap::new();
    for element in elements {
        if let Element::Node { id, lat, lon, .. } = element {
            node_mapping.insert(*id, (*lat, *lon));
        }
    }

    let mut rows = Vec::new();
    let mut dropped = 0;
    for element in elements {
        let Element::Way {
            id: way_id, nodes, ..
        } = element
        else {
            continue;
        };
        for (sample_num, node_id) in nodes.iter().enumerate() {
            match node_mapping.get(node_id) {
                Some((lat, lon)) => rows.push(WayNodeRow {
                    way_id: *way_id,
                    sample_num,
                    node_id: *node_id,
                    lat: *lat,
                    lon: *lon,
                }),
                None => {
                    warn!("way {way_id} references node {node_id} missing from this batch");
                    dropped += 1;
                }
            }
        }
    }
    if dropped > 0 {
        warn!("dropped {dropped} unresolvable node references");
    }
    rows
}
