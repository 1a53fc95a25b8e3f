use serde::{Deserialize, Serialize};

/// One waypoint of a traveled path. The backend always sends `lon,lat` order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }
}

/// Decodes a `"lon,lat;lon,lat;..."` polyline string.
///
/// Malformed numeric tokens decode to NaN instead of failing, so a single bad
/// pair can't take down the whole buffer. Callers that need a drawable path
/// should go through `decode_clean`.
pub fn decode(raw: &str) -> Vec<GeoPoint> {
    if raw.is_empty() {
        return Vec::new();
    }
    let mut points = Vec::new();
    for pair in raw.split(';') {
        if pair.is_empty() {
            continue;
        }
        let mut tokens = pair.splitn(2, ',');
        points.push(GeoPoint {
            lon: parse_token(tokens.next()),
            lat: parse_token(tokens.next()),
        });
    }
    points
}

/// `decode` with NaN and incomplete waypoints dropped.
pub fn decode_clean(raw: &str) -> Vec<GeoPoint> {
    decode(raw).into_iter().filter(GeoPoint::is_valid).collect()
}

fn parse_token(token: Option<&str>) -> f64 {
    match token {
        Some(token) => token.trim().parse().unwrap_or(f64::NAN),
        None => f64::NAN,
    }
}
