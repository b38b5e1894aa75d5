use crate::models::LatLng;
use nom::{
    Parser,
    character::complete::{char, space0},
    number::complete::double,
    sequence::{delimited, separated_pair},
};
use scraper::{ElementRef, Selector};

pub fn sel(selector: &str) -> Selector {
    Selector::parse(selector).unwrap()
}

pub fn get_text(e: &ElementRef) -> String {
    reduce_whitespace(&e.text().collect::<String>())
}

pub fn reduce_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Parse "lat,lng", e.g. "34.0007,-81.0348". Used as a clap value parser.
pub fn parse_lat_lng(s: &str) -> Result<LatLng, String> {
    let res = separated_pair(
        double::<_, ()>,
        delimited(space0, char(','), space0),
        double,
    )
    .parse(s.trim());

    match res {
        Ok(("", (lat, lng))) => {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
                return Err(format!("coordinates out of range: {s}"));
            }
            Ok(LatLng::new(lat, lng))
        }
        _ => Err(format!("expected \"lat,lng\", got {s:?}")),
    }
}

/// Prepend https:// to bare hostnames, as listings often omit the scheme
pub fn with_scheme(site: &str) -> String {
    let site = site.trim();
    if site.starts_with("http") {
        return site.into();
    }
    format!("https://{site}")
}

/// Encode a path segment for maps links. Spaces become '+', like the maps site does itself.
pub fn encode_path_segment(s: &str) -> String {
    urlencoding::encode(s.trim()).replace("%20", "+")
}
