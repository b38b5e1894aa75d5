use super::{ApiStatus, endpoint};
use crate::{
    cache::Client,
    error::{Error, Result},
    models::LatLng,
};
use serde::Deserialize;
use tracing::trace;

static SERVICE: &str = "directions";

/// A value as both human readable text and its raw number (meters or seconds)
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct TextValue {
    pub text: String,
    pub value: u64,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Leg {
    pub start_address: String,
    pub end_address: String,
    pub start_location: LatLng,
    pub end_location: LatLng,
    pub distance: TextValue,
    pub duration: TextValue,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Polyline {
    pub points: String,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Route {
    pub legs: Vec<Leg>,
    /// Visiting order of the waypoints as sent, when optimization was requested
    pub waypoint_order: Vec<usize>,
    pub overview_polyline: Polyline,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DirectionsResponse {
    #[serde(flatten)]
    status: ApiStatus,
    routes: Vec<Route>,
}

#[derive(Clone)]
pub struct DirectionsClient {
    client: Client,
    base_url: String,
    key: String,
}

impl DirectionsClient {
    pub fn new(client: Client, base_url: &str, key: &str) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            key: key.into(),
        }
    }

    /// Driving directions from `origin` to `destination` through `waypoints`.
    /// With `optimize` set, the API is free to reorder the waypoints.
    pub async fn driving(
        &self,
        origin: &str,
        destination: &str,
        waypoints: &[String],
        optimize: bool,
    ) -> Result<Route> {
        trace!(origin, destination, waypoints = waypoints.len(), "Fetching directions...");
        let waypoints = waypoints_param(waypoints, optimize);
        let mut query = vec![
            ("origin", origin),
            ("destination", destination),
            ("mode", "driving"),
            ("key", self.key.as_str()),
        ];
        if !waypoints.is_empty() {
            query.push(("waypoints", waypoints.as_str()));
        }

        let res: DirectionsResponse = self
            .client
            .get_json(endpoint(&self.base_url, "directions/json"), &query)
            .await?;
        if !res.status.check(SERVICE)? {
            return Err(Error::api(
                SERVICE,
                &res.status.status,
                Some(String::from("no route found")),
            ));
        }
        res.routes
            .into_iter()
            .next()
            .ok_or_else(|| Error::api(SERVICE, &res.status.status, Some("empty route list".into())))
    }
}

fn waypoints_param(waypoints: &[String], optimize: bool) -> String {
    if waypoints.is_empty() {
        return String::new();
    }
    let joined = waypoints.join("|");
    if optimize {
        return format!("optimize:true|{joined}");
    }
    joined
}

/// Decode an encoded polyline, as found in `overview_polyline`.
/// Truncated input yields the points decoded so far.
pub fn decode_polyline(encoded: &str) -> Vec<LatLng> {
    let bytes = encoded.as_bytes();
    let mut points = Vec::new();
    let (mut idx, mut lat, mut lng) = (0usize, 0i64, 0i64);

    while idx < bytes.len() {
        let Some(dlat) = next_delta(bytes, &mut idx) else {
            break;
        };
        let Some(dlng) = next_delta(bytes, &mut idx) else {
            break;
        };
        lat += dlat;
        lng += dlng;
        points.push(LatLng::new(lat as f64 / 1e5, lng as f64 / 1e5));
    }

    points
}

fn next_delta(bytes: &[u8], idx: &mut usize) -> Option<i64> {
    let mut result: i64 = 0;
    let mut shift = 0;
    loop {
        let b = (*bytes.get(*idx)? as i64) - 63;
        *idx += 1;
        result |= (b & 0x1f) << shift;
        shift += 5;
        if b < 0x20 {
            break;
        }
        if shift > 60 {
            return None;
        }
    }
    Some(if result & 1 != 0 { !(result >> 1) } else { result >> 1 })
}
