//! Route planning over the scraped addresses.
//!
//! The directions API is asked for a driving route from a start location through every address,
//! ending at the last one, and is free to reorder the stops in between. The result is reported as
//! a CSV summary, an HTML map and a maps link for navigation on a phone.

use crate::{
    error::{Error, Result},
    google::directions::{DirectionsClient, Leg, decode_polyline},
    models::LatLng,
    util::encode_path_segment,
};
use minijinja::{Environment, context};
use serde::Serialize;
use std::{collections::HashSet, path::Path, time::Duration};
use tracing::{debug, info, warn};

pub static NAV_URL: &str = "https://www.google.com/maps/dir/";
/// The directions API accepts at most this many waypoints
pub const MAX_STOPS: usize = 25;

static MAP_TEMPLATE_NAME: &str = "route_map.html";
static MAP_TEMPLATE: &str = include_str!("../templates/route_map.html");

const METERS_PER_MILE: f64 = 1609.344;

/// Initial view of the map
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapView {
    pub center: LatLng,
    pub zoom: u8,
}

impl Default for MapView {
    fn default() -> Self {
        // Columbia, SC
        Self {
            center: LatLng::new(34.0007, -81.0348),
            zoom: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RouteLeg {
    pub start: String,
    pub end: String,
    /// Human readable, e.g. "5.2 mi"
    pub distance: String,
    /// Human readable, e.g. "12 mins"
    pub duration: String,
    pub distance_meters: u64,
    pub duration_secs: u64,
    pub start_location: LatLng,
    pub end_location: LatLng,
}

impl From<Leg> for RouteLeg {
    fn from(leg: Leg) -> Self {
        Self {
            start: leg.start_address,
            end: leg.end_address,
            distance: leg.distance.text,
            duration: leg.duration.text,
            distance_meters: leg.distance.value,
            duration_secs: leg.duration.value,
            start_location: leg.start_location,
            end_location: leg.end_location,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoutePlan {
    pub start: String,
    /// Stops in visiting order
    pub stops: Vec<String>,
    pub legs: Vec<RouteLeg>,
    /// Decoded overview polyline
    pub path: Vec<LatLng>,
}

impl RoutePlan {
    pub fn total_distance_meters(&self) -> u64 {
        self.legs.iter().map(|l| l.distance_meters).sum()
    }

    pub fn total_duration(&self) -> Duration {
        Duration::from_secs(self.legs.iter().map(|l| l.duration_secs).sum())
    }

    /// Maps link with the start and all stops in visiting order
    pub fn navigation_link(&self) -> String {
        let segments: Vec<String> = std::iter::once(&self.start)
            .chain(&self.stops)
            .map(|s| encode_path_segment(s))
            .collect();
        format!("{NAV_URL}{}", segments.join("/"))
    }

    pub fn log_totals(&self) {
        let meters = self.total_distance_meters();
        info!(
            "Total: {} stops, {:.1} mi ({:.1} km), {}",
            self.stops.len(),
            meters as f64 / METERS_PER_MILE,
            meters as f64 / 1000.0,
            humantime::format_duration(self.total_duration())
        );
    }
}

/// Trim, drop empty and repeated addresses, and cap the number of stops
pub fn prepare_stops<I>(addresses: I, max_stops: usize) -> Result<Vec<String>>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    let mut stops: Vec<String> = addresses
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty() && seen.insert(a.clone()))
        .collect();

    if stops.len() > max_stops {
        warn!(
            "Route limited to the first {max_stops} of {} addresses",
            stops.len()
        );
        stops.truncate(max_stops);
    }
    if stops.len() < 2 {
        return Err(Error::NotEnoughStops(stops.len()));
    }
    Ok(stops)
}

pub struct RoutePlanner {
    directions: DirectionsClient,
}

impl RoutePlanner {
    pub fn new(directions: DirectionsClient) -> Self {
        Self { directions }
    }

    /// Optimized driving route from `start` through all `stops`, ending at the last stop
    pub async fn plan(&self, start: &str, stops: &[String]) -> Result<RoutePlan> {
        let Some((destination, waypoints)) = stops.split_last().filter(|_| stops.len() >= 2) else {
            return Err(Error::NotEnoughStops(stops.len()));
        };

        let route = self
            .directions
            .driving(start, destination, waypoints, true)
            .await?;
        debug!(order = ?route.waypoint_order, legs = route.legs.len(), "Got route");

        Ok(RoutePlan {
            start: start.into(),
            stops: visiting_order(waypoints, destination, &route.waypoint_order),
            path: decode_polyline(&route.overview_polyline.points),
            legs: route.legs.into_iter().map(RouteLeg::from).collect(),
        })
    }
}

/// Waypoints reordered as given by the API, followed by the destination.
/// An order that isn't a permutation of the waypoints is ignored.
fn visiting_order(waypoints: &[String], destination: &str, order: &[usize]) -> Vec<String> {
    let valid = order.len() == waypoints.len()
        && order.iter().collect::<HashSet<_>>().len() == order.len()
        && order.iter().all(|&i| i < waypoints.len());

    let mut stops: Vec<String> = if valid {
        order.iter().map(|&i| waypoints[i].clone()).collect()
    } else {
        if !order.is_empty() {
            warn!(?order, "Ignoring invalid waypoint order");
        }
        waypoints.to_vec()
    };
    stops.push(destination.into());
    stops
}

#[derive(Serialize)]
struct SummaryRow<'a> {
    #[serde(rename = "Start")]
    start: &'a str,
    #[serde(rename = "End")]
    end: &'a str,
    #[serde(rename = "Distance")]
    distance: &'a str,
    #[serde(rename = "Duration")]
    duration: &'a str,
}

/// One row per leg: start, end, distance and duration
pub fn write_summary_csv<P: AsRef<Path>>(path: P, plan: &RoutePlan) -> Result<()> {
    let mut w = csv::Writer::from_path(path)?;
    for leg in &plan.legs {
        w.serialize(SummaryRow {
            start: &leg.start,
            end: &leg.end,
            distance: &leg.distance,
            duration: &leg.duration,
        })?;
    }
    w.flush()?;
    Ok(())
}

fn environment() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.add_template(MAP_TEMPLATE_NAME, MAP_TEMPLATE)?;
    Ok(env)
}

/// Standalone HTML page with the route drawn on a map
pub fn render_map(plan: &RoutePlan, view: &MapView) -> Result<String> {
    let env = environment()?;
    let tmpl = env.get_template(MAP_TEMPLATE_NAME)?;
    Ok(tmpl.render(context! {
        title => "Optimized Route",
        center => view.center,
        zoom => view.zoom,
        legs => plan.legs,
        path => plan.path,
        destination => plan.legs.last(),
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Client, Opts};
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    fn addresses(a: &[&str]) -> Vec<String> {
        a.iter().map(|s| s.to_string()).collect()
    }

    fn leg(start: &str, end: &str, meters: u64, secs: u64) -> RouteLeg {
        RouteLeg {
            start: start.into(),
            end: end.into(),
            distance: format!("{meters} m"),
            duration: format!("{secs} s"),
            distance_meters: meters,
            duration_secs: secs,
            start_location: LatLng::new(34.0, -81.0),
            end_location: LatLng::new(34.1, -81.1),
        }
    }

    fn plan() -> RoutePlan {
        RoutePlan {
            start: "123 Main St, Columbia, SC".into(),
            stops: addresses(&["2 Oak Ave, Irmo, SC", "9 Pine Rd, Cayce, SC"]),
            legs: vec![
                leg("123 Main St, Columbia, SC", "2 Oak Ave, Irmo, SC", 16093, 900),
                leg("2 Oak Ave, Irmo, SC", "9 Pine Rd, Cayce, SC", 8000, 600),
            ],
            path: vec![LatLng::new(34.0, -81.0), LatLng::new(34.1, -81.1)],
        }
    }

    #[test]
    fn stops_are_deduped_and_capped() {
        let s = prepare_stops(addresses(&["a", " b ", "", "a", "c", "d"]), 3).unwrap();
        assert_eq!(addresses(&["a", "b", "c"]), s);

        assert!(matches!(
            prepare_stops(addresses(&["a", "a", " "]), MAX_STOPS),
            Err(Error::NotEnoughStops(1))
        ));
        assert!(matches!(
            prepare_stops(Vec::new(), MAX_STOPS),
            Err(Error::NotEnoughStops(0))
        ));
    }

    #[test]
    fn optimized_order() {
        let w = addresses(&["a", "b", "c"]);
        assert_eq!(addresses(&["c", "a", "b", "z"]), visiting_order(&w, "z", &[2, 0, 1]));
        assert_eq!(addresses(&["a", "b", "c", "z"]), visiting_order(&w, "z", &[]));
        assert_eq!(addresses(&["a", "b", "c", "z"]), visiting_order(&w, "z", &[0, 0, 1]));
        assert_eq!(addresses(&["a", "b", "c", "z"]), visiting_order(&w, "z", &[0, 5, 1]));
    }

    #[test]
    fn nav_link() {
        assert_eq!(
            "https://www.google.com/maps/dir/123+Main+St%2C+Columbia%2C+SC/2+Oak+Ave%2C+Irmo%2C+SC/9+Pine+Rd%2C+Cayce%2C+SC",
            plan().navigation_link()
        );
    }

    #[test]
    fn totals() {
        let p = plan();
        assert_eq!(24093, p.total_distance_meters());
        assert_eq!(Duration::from_secs(1500), p.total_duration());
    }

    #[test]
    fn summary_csv() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("Optimized_Route.csv");
        write_summary_csv(&f, &plan()).unwrap();
        let text = std::fs::read_to_string(&f).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(3, lines.len());
        assert_eq!("Start,End,Distance,Duration", lines[0]);
        assert_eq!(
            r#""123 Main St, Columbia, SC","2 Oak Ave, Irmo, SC",16093 m,900 s"#,
            lines[1]
        );
    }

    #[test]
    fn map_html() {
        let html = render_map(&plan(), &MapView::default()).unwrap();
        assert!(html.contains("setView([34.0007, -81.0348], 10)"));
        assert!(html.contains("2 Oak Ave, Irmo, SC"));
        assert!(html.contains("9 Pine Rd, Cayce, SC"));
        assert!(html.contains("L.polyline"));
    }

    #[tokio::test]
    async fn plan_route() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/directions/json"))
            .and(query_param("origin", "Home"))
            .and(query_param("destination", "C"))
            .and(query_param("waypoints", "optimize:true|A|B"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "routes": [{
                    "waypoint_order": [1, 0],
                    "overview_polyline": {"points": "_p~iF~ps|U_ulLnnqC"},
                    "legs": [
                        {"start_address": "Home", "end_address": "B",
                         "distance": {"text": "1 mi", "value": 1609}, "duration": {"text": "3 mins", "value": 180}},
                        {"start_address": "B", "end_address": "A",
                         "distance": {"text": "2 mi", "value": 3218}, "duration": {"text": "5 mins", "value": 300}},
                        {"start_address": "A", "end_address": "C",
                         "distance": {"text": "3 mi", "value": 4828}, "duration": {"text": "7 mins", "value": 420}}
                    ]
                }]
            })))
            .mount(&server)
            .await;

        let client = Client::build(Opts::default()).await.unwrap();
        let planner = RoutePlanner::new(DirectionsClient::new(client, &server.uri(), "k"));
        let plan = planner
            .plan("Home", &addresses(&["A", "B", "C"]))
            .await
            .unwrap();

        assert_eq!(addresses(&["B", "A", "C"]), plan.stops);
        assert_eq!(3, plan.legs.len());
        assert_eq!("2 mi", plan.legs[1].distance);
        assert_eq!(2, plan.path.len());
        assert_eq!(Duration::from_secs(900), plan.total_duration());
        assert_eq!("https://www.google.com/maps/dir/Home/B/A/C", plan.navigation_link());

        assert!(matches!(
            planner.plan("Home", &addresses(&["A"])).await,
            Err(Error::NotEnoughStops(1))
        ));
    }
}
