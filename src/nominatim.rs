use serde::Serialize;
use serde_json::Value;

use crate::overpass::USER_AGENT;
use crate::Result;

/// Nominatim's reverse geocoding endpoint.
pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/reverse";

/// Which kind of OSM entity an id refers to, in Nominatim's single-letter
/// convention.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OsmType {
    Way,
    Node,
}

impl OsmType {
    fn letter(self) -> &'static str {
        match self {
            OsmType::Way => "W",
            OsmType::Node => "N",
        }
    }
}

/// Centre coordinates for one OSM id. `None` means Nominatim had no value
/// for that coordinate, which is a data condition, not a failure.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReverseGeocode {
    pub osm_id: i64,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Looks up the centre coordinates of a way or node. Transport failures
/// propagate; a response without coordinates does not.
pub fn reverse_geocode(osm_type: OsmType, osm_id: i64) -> Result<ReverseGeocode> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .build()?;
    let id = osm_id.to_string();
    let body: Value = client
        .get(NOMINATIM_URL)
        .query(&[
            ("osm_type", osm_type.letter()),
            ("osm_id", id.as_str()),
            ("format", "json"),
        ])
        .send()?
        .error_for_status()?
        .json()?;
    Ok(parse_reverse(osm_id, &body))
}

/// Nominatim serializes coordinates as JSON strings; an absent or
/// unreadable value becomes the `None` marker.
fn parse_reverse(osm_id: i64, body: &Value) -> ReverseGeocode {
    ReverseGeocode {
        osm_id,
        lat: coordinate(body, "lat"),
        lon: coordinate(body, "lon"),
    }
}

fn coordinate(body: &Value, key: &str) -> Option<f64> {
    match body.get(key)? {
        Value::String(raw) => raw.parse().ok(),
        Value::Number(number) => number.as_f64(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_reverse_with_coordinates() {
        let body = json!({
            "lat": "-36.8484597",
            "lon": "174.7633315",
            "display_name": "Auckland, New Zealand"
        });
        assert_eq!(
            ReverseGeocode {
                osm_id: 48029394,
                lat: Some(-36.8484597),
                lon: Some(174.7633315),
            },
            parse_reverse(48029394, &body)
        );
    }

    #[test]
    fn test_missing_lat_yields_sentinel_not_error() {
        let body = json!({"lon": "174.7633315"});
        let result = parse_reverse(48029394, &body);

        assert_eq!(48029394, result.osm_id);
        assert_eq!(None, result.lat);
        assert_eq!(Some(174.7633315), result.lon);
    }

    #[test]
    fn test_error_response_yields_sentinels() {
        let body = json!({"error": "Unable to geocode"});
        let result = parse_reverse(7, &body);
        assert_eq!(
            ReverseGeocode {
                osm_id: 7,
                lat: None,
                lon: None,
            },
            result
        );
    }
}
