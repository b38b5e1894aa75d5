// Glue between the command line and the pipelines: read input, run, write output.

use crate::{
    cache::Client,
    cli::{Commands, MapsArgs},
    google::{directions::DirectionsClient, places::PlacesClient, search::CustomSearchClient},
    models::{Lookup, Owners},
    owners::{BbbSource, OwnerFinder, SearchSource, WebsiteSource},
    route::{self, MapView, RoutePlanner},
    runlog::RunLog,
    scrape::{DEFAULT_CITIES, DEFAULT_KEYWORDS, PlacesScraper},
    sheet,
};
use anyhow::{Context, Result};
use compact_str::CompactString;
use indicatif::{ProgressBar, ProgressStyle};
use std::{fs, path::Path, sync::Arc, time::Duration};
use tracing::info;

pub async fn run(command: Commands, client: Client, run_log: Arc<RunLog>) -> Result<()> {
    match command {
        Commands::Scrape {
            output,
            cities,
            keywords,
            max_pages,
            delay,
            page_delay,
            maps,
        } => {
            let scraper = PlacesScraper::new(places_client(&client, &maps), run_log)
                .with_request_delay(delay)
                .with_page_delay(page_delay)
                .with_max_pages(max_pages);
            scrape(&scraper, &cities, &keywords, &output).await
        }
        Commands::Owners {
            input,
            output,
            api_key,
            cse_id,
            concurrency,
            retries,
            retry_delay,
            search_url,
            bbb_url,
        } => {
            let search = CustomSearchClient::new(client.clone(), &search_url, &api_key, &cse_id);
            let finder = OwnerFinder::new(
                WebsiteSource::new(client.clone(), run_log.clone()),
                SearchSource::new(search, run_log.clone())
                    .with_attempts(retries)
                    .with_base_delay(retry_delay),
                BbbSource::new(client, &bbb_url, run_log.clone())?,
            )
            .with_concurrency(concurrency);
            owners(&finder, &input, &output, &run_log).await
        }
        Commands::Route {
            input,
            start,
            max_stops,
            csv,
            map,
            link,
            center,
            zoom,
            maps,
        } => {
            let planner = RoutePlanner::new(DirectionsClient::new(client, &maps.maps_url, &maps.key));
            let outputs = RouteOutputs {
                csv: &csv,
                map: &map,
                link: &link,
            };
            plan_route(&planner, &input, &start, max_stops, MapView { center, zoom }, outputs).await
        }
    }
}

fn places_client(client: &Client, maps: &MapsArgs) -> PlacesClient {
    PlacesClient::new(client.clone(), &maps.maps_url, &maps.key)
}

fn progress_bar(len: u64, unit: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.cyan}} [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {unit} {{msg}}"
            ))?
            .progress_chars("=>-"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

async fn scrape(
    scraper: &PlacesScraper,
    cities: &[CompactString],
    keywords: &[CompactString],
    output: &Path,
) -> Result<()> {
    let cities: Vec<&str> = if cities.is_empty() {
        DEFAULT_CITIES.to_vec()
    } else {
        cities.iter().map(|c| c.as_str()).collect()
    };
    let keywords: Vec<&str> = if keywords.is_empty() {
        DEFAULT_KEYWORDS.to_vec()
    } else {
        keywords.iter().map(|k| k.as_str()).collect()
    };

    let pb = progress_bar(0, "searches")?;
    let businesses = scraper.run(&cities, &keywords, &pb).await;
    pb.finish_and_clear();

    sheet::write_businesses(output, &businesses)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(
        "Scraping complete, saved {} businesses to {}",
        businesses.len(),
        output.display()
    );
    Ok(())
}

async fn owners(
    finder: &OwnerFinder<WebsiteSource, SearchSource, BbbSource>,
    input: &Path,
    output: &Path,
    run_log: &RunLog,
) -> Result<()> {
    let businesses = sheet::read_businesses(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    run_log.success(format!(
        "Starting owner lookup for {} businesses from {}",
        businesses.len(),
        input.display()
    ));

    let pb = progress_bar(businesses.len() as u64, "businesses")?;
    let owners = finder.find_all(&businesses, &pb).await;
    pb.finish();

    let businesses: Vec<_> = businesses
        .into_iter()
        .zip(owners)
        .map(|(b, o)| b.with_owners(o))
        .collect();
    let found = |f: fn(&Owners) -> &Lookup| {
        businesses
            .iter()
            .filter_map(|b| b.owners.as_ref())
            .filter(|o| f(o).is_found())
            .count()
    };
    info!(
        "Owners found: {} by website, {} by search, {} on BBB, of {} businesses",
        found(|o| &o.website),
        found(|o| &o.google),
        found(|o| &o.bbb),
        businesses.len()
    );

    sheet::write_businesses(output, &businesses)
        .with_context(|| format!("failed to write {}", output.display()))?;
    run_log.success(format!(
        "Owner lookup complete, results saved to {}",
        output.display()
    ));
    Ok(())
}

struct RouteOutputs<'a> {
    csv: &'a Path,
    map: &'a Path,
    link: &'a Path,
}

async fn plan_route(
    planner: &RoutePlanner,
    input: &Path,
    start: &str,
    max_stops: usize,
    view: MapView,
    out: RouteOutputs<'_>,
) -> Result<()> {
    let addresses = sheet::read_addresses(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let stops = route::prepare_stops(addresses, max_stops)?;
    info!("Planning route from {start} through {} stops", stops.len());

    let plan = planner
        .plan(start, &stops)
        .await
        .context("could not optimize route")?;
    for (i, leg) in plan.legs.iter().enumerate() {
        info!(
            "{}. {} -> {}: {} ({})",
            i + 1,
            leg.start,
            leg.end,
            leg.distance,
            leg.duration
        );
    }
    plan.log_totals();

    route::write_summary_csv(out.csv, &plan)
        .with_context(|| format!("failed to write {}", out.csv.display()))?;
    info!("Route saved to {}", out.csv.display());

    fs::write(out.map, route::render_map(&plan, &view)?)
        .with_context(|| format!("failed to write {}", out.map.display()))?;
    info!("Interactive map saved as {}", out.map.display());

    let link = plan.navigation_link();
    fs::write(out.link, format!("{link}\n"))
        .with_context(|| format!("failed to write {}", out.link.display()))?;
    println!("Open this link on your phone for navigation:\n{link}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Opts;
    use crate::models::{Business, LatLng};
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    async fn client() -> Client {
        Client::build(Opts::default()).await.unwrap()
    }

    fn maps_args(server: &MockServer) -> MapsArgs {
        MapsArgs {
            key: "k".into(),
            maps_url: server.uri().into(),
        }
    }

    #[tokio::test]
    async fn scrape_to_csv() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/place/textsearch/json"))
            .and(query_param("query", "Roofer in Irmo, SC"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "results": [{"place_id": "p1", "name": "Top Roof", "formatted_address": "5 Elm St, Irmo, SC"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/place/details/json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": "OK", "result": {}})),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("businesses.csv");
        let cmd = Commands::Scrape {
            output: out.clone(),
            cities: vec!["Irmo, SC".into()],
            keywords: vec!["Roofer".into()],
            max_pages: 1,
            delay: Duration::ZERO,
            page_delay: Duration::ZERO,
            maps: maps_args(&server),
        };
        run(cmd, client().await, Arc::new(RunLog::disabled()))
            .await
            .unwrap();

        let b = sheet::read_businesses(&out).unwrap();
        assert_eq!(1, b.len());
        assert_eq!("Top Roof", b[0].name);
        assert_eq!(None, b[0].phone);
        let text = fs::read_to_string(&out).unwrap();
        assert!(text.contains("Roofer,N/A,N/A"));
    }

    #[tokio::test]
    async fn owners_from_csv() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "Owner of Top Roof"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"items": [{"snippet": "Tom Top, owner"}]})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>no results</p>"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        let output = dir.path().join("out.csv");
        sheet::write_businesses(&input, &[Business::new("Top Roof")]).unwrap();

        let cmd = Commands::Owners {
            input,
            output: output.clone(),
            api_key: "k".into(),
            cse_id: "cx".into(),
            concurrency: None,
            retries: 1,
            retry_delay: Duration::ZERO,
            search_url: format!("{}/customsearch", server.uri()).into(),
            bbb_url: server.uri().into(),
        };
        run(cmd, client().await, Arc::new(RunLog::new(dir.path())))
            .await
            .unwrap();

        let b = sheet::read_businesses(&output).unwrap();
        let owners = b[0].owners.clone().unwrap();
        assert_eq!(Lookup::NoWebsite, owners.website);
        assert_eq!(Lookup::Found("Tom Top, owner".into()), owners.google);
        assert_eq!(Lookup::NotFound, owners.bbb);
        assert!(dir.path().join("success_log.txt").exists());
        assert!(dir.path().join("failure_log.txt").exists());
    }

    #[tokio::test]
    async fn route_outputs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/directions/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "routes": [{
                    "waypoint_order": [0],
                    "overview_polyline": {"points": "_p~iF~ps|U"},
                    "legs": [
                        {"start_address": "Home", "end_address": "A",
                         "distance": {"text": "1 mi", "value": 1609}, "duration": {"text": "3 mins", "value": 180}},
                        {"start_address": "A", "end_address": "B",
                         "distance": {"text": "2 mi", "value": 3218}, "duration": {"text": "5 mins", "value": 300}}
                    ]
                }]
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        fs::write(&input, "Name,Address\nx,A\ny,B\nz,A\n").unwrap();
        let (csv, map, link) = (
            dir.path().join("route.csv"),
            dir.path().join("map.html"),
            dir.path().join("link.txt"),
        );

        let cmd = Commands::Route {
            input,
            start: "Home".into(),
            max_stops: 25,
            csv: csv.clone(),
            map: map.clone(),
            link: link.clone(),
            center: LatLng::new(34.0007, -81.0348),
            zoom: 10,
            maps: maps_args(&server),
        };
        run(cmd, client().await, Arc::new(RunLog::disabled()))
            .await
            .unwrap();

        assert_eq!(3, fs::read_to_string(&csv).unwrap().lines().count());
        assert!(fs::read_to_string(&map).unwrap().contains("leaflet"));
        assert_eq!(
            "https://www.google.com/maps/dir/Home/A/B\n",
            fs::read_to_string(&link).unwrap()
        );
    }

    #[tokio::test]
    async fn route_needs_two_stops() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");

        for sheet in ["Name,Address\nx,A\n", "Name,Address\nx,\ny,N/A\n"] {
            fs::write(&input, sheet).unwrap();
            let cmd = Commands::Route {
                input: input.clone(),
                start: "Home".into(),
                max_stops: 25,
                csv: dir.path().join("route.csv"),
                map: dir.path().join("map.html"),
                link: dir.path().join("link.txt"),
                center: LatLng::new(34.0, -81.0),
                zoom: 10,
                maps: MapsArgs {
                    key: "k".into(),
                    maps_url: "http://127.0.0.1:9".into(),
                },
            };
            let err = run(cmd, client().await, Arc::new(RunLog::disabled()))
                .await
                .unwrap_err();
            assert!(err.to_string().contains("not enough locations"), "{sheet}");
        }
    }
}
