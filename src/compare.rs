//! Side-by-side comparison of assembled OSM polygons against statistical
//! and administrative boundary datasets (StatsNZ area units, LINZ building
//! and residential outlines, council parks).
//!
//! Each comparison goes to an explicit writer target as GeoJSON features
//! carrying a `layer` property; a viewer can split on `layer` to get
//! shared-axes panels.

use std::io::Write;
use std::path::Path;

use geo::Polygon;
use geojson::{Feature, FeatureCollection, FeatureWriter, GeoJson};
use log::info;

use crate::{Error, PolygonCollection, Result};

/// Reads a boundary dataset from a GeoJSON file.
pub fn load_boundaries(path: &Path) -> Result<FeatureCollection> {
    let raw = fs_err::read_to_string(path)?;
    match raw.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => Ok(collection),
        _ => Err(Error::Schema(format!(
            "{} isn't a FeatureCollection",
            path.display()
        ))),
    }
}

/// Writes the features of each named layer whose `filter_column` property
/// equals `unit_name`, stamped with a `layer` property, to the writer
/// target. Features without the filter column are skipped. Pass two layers
/// for a unit/residential comparison, three to add buildings, four to add
/// parks.
pub fn write_comparison<W: Write>(
    out: W,
    layers: &[(&str, &FeatureCollection)],
    filter_column: &str,
    unit_name: &str,
) -> Result<()> {
    let mut writer = FeatureWriter::from_writer(out);
    for (layer_name, collection) in layers {
        let mut written = 0;
        for feature in &collection.features {
            if feature.property(filter_column).and_then(|value| value.as_str()) != Some(unit_name) {
                continue;
            }
            let mut feature = feature.clone();
            feature.set_property("layer", *layer_name);
            writer.write_feature(&feature)?;
            written += 1;
        }
        info!("layer {layer_name}: {written} features match {filter_column}={unit_name:?}");
    }
    writer.finish()?;
    Ok(())
}

/// Writes assembled way polygons as one GeoJSON layer, keyed by way id, for
/// comparison against boundary datasets.
pub fn write_polygon_layer<W: Write>(
    out: W,
    collection: &PolygonCollection,
    layer_name: &str,
) -> Result<()> {
    let mut writer = FeatureWriter::from_writer(out);
    for (way_id, ring) in &collection.rings {
        let polygon = Polygon::new(ring.clone(), Vec::new());
        let mut feature = Feature::from(geojson::Value::from(&polygon));
        feature.set_property("osm", format!("way/{way_id}"));
        feature.set_property("crs", collection.crs.clone());
        feature.set_property("layer", layer_name);
        writer.write_feature(&feature)?;
    }
    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assemble_polygons, WayNodeRow, DEFAULT_CRS};

    fn boundaries(raw: &str) -> FeatureCollection {
        match raw.parse::<GeoJson>().unwrap() {
            GeoJson::FeatureCollection(collection) => collection,
            _ => panic!("not a FeatureCollection"),
        }
    }

    const UNITS: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature",
         "properties": {"AU2013_V1_00_NAME": "Wellington Central"},
         "geometry": {"type": "Point", "coordinates": [174.77, -41.28]}},
        {"type": "Feature",
         "properties": {"AU2013_V1_00_NAME": "Auckland Central East"},
         "geometry": {"type": "Point", "coordinates": [174.76, -36.85]}},
        {"type": "Feature",
         "properties": {},
         "geometry": {"type": "Point", "coordinates": [0, 0]}}
    ]}"#;

    #[test]
    fn test_write_comparison_filters_and_stamps_layers() {
        let units = boundaries(UNITS);
        let residences = boundaries(UNITS);

        let mut buffer: Vec<u8> = Vec::new();
        write_comparison(
            &mut buffer,
            &[("area_unit", &units), ("residential", &residences)],
            "AU2013_V1_00_NAME",
            "Auckland Central East",
        )
        .unwrap();

        let written = boundaries(std::str::from_utf8(&buffer).unwrap());
        assert_eq!(2, written.features.len());
        let layers: Vec<&str> = written
            .features
            .iter()
            .map(|f| f.property("layer").unwrap().as_str().unwrap())
            .collect();
        assert_eq!(vec!["area_unit", "residential"], layers);
        for feature in &written.features {
            assert_eq!(
                "Auckland Central East",
                feature
                    .property("AU2013_V1_00_NAME")
                    .unwrap()
                    .as_str()
                    .unwrap()
            );
        }
    }

    #[test]
    fn test_write_comparison_no_matches_is_empty_not_error() {
        let units = boundaries(UNITS);
        let mut buffer: Vec<u8> = Vec::new();
        write_comparison(
            &mut buffer,
            &[("area_unit", &units)],
            "AU2013_V1_00_NAME",
            "Nowhere",
        )
        .unwrap();

        let written = boundaries(std::str::from_utf8(&buffer).unwrap());
        assert!(written.features.is_empty());
    }

    #[test]
    fn test_write_polygon_layer_keys_by_way_id() {
        let rows = vec![
            WayNodeRow {
                way_id: 100,
                sample_num: 0,
                node_id: 1,
                lat: 0.0,
                lon: 0.0,
            },
            WayNodeRow {
                way_id: 100,
                sample_num: 1,
                node_id: 2,
                lat: 0.0,
                lon: 1.0,
            },
            WayNodeRow {
                way_id: 100,
                sample_num: 2,
                node_id: 3,
                lat: 1.0,
                lon: 1.0,
            },
            WayNodeRow {
                way_id: 100,
                sample_num: 3,
                node_id: 1,
                lat: 0.0,
                lon: 0.0,
            },
        ];
        let collection = assemble_polygons(&rows, DEFAULT_CRS);

        let mut buffer: Vec<u8> = Vec::new();
        write_polygon_layer(&mut buffer, &collection, "osm_buildings").unwrap();

        let written = boundaries(std::str::from_utf8(&buffer).unwrap());
        assert_eq!(1, written.features.len());
        let feature = &written.features[0];
        assert_eq!("way/100", feature.property("osm").unwrap().as_str().unwrap());
        assert_eq!(
            DEFAULT_CRS,
            feature.property("crs").unwrap().as_str().unwrap()
        );
        assert_eq!(
            "osm_buildings",
            feature.property("layer").unwrap().as_str().unwrap()
        );
    }
}
