//! Coordinates embedded in Google Maps links.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::GeoPoint;

const NUMBER: &str = r"[-+]?\d{1,3}(?:\.\d+)?";

/// `!3d<lat>!4d<lon>`: the pin of a place page
static PIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"!3d({NUMBER})!4d({NUMBER})")).expect("pin pattern")
});

/// `@<lat>,<lon>,<zoom>z`: the viewport center
static VIEWPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"@({NUMBER}),({NUMBER})")).expect("viewport pattern")
});

/// A bare `lat,lon` pair as used in query parameters and search paths
static PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^\s*({NUMBER})\s*,\s*({NUMBER})\s*$")).expect("pair pattern")
});

const COORDINATE_PARAMS: [&str; 4] = ["q", "query", "ll", "destination"];

/// Extract in-range coordinates from a map link.
///
/// Place pins win over the viewport center, which wins over query
/// parameters and `/search/<lat>,<lon>` paths.
pub fn coordinates_from_map_url(link: &str) -> Option<GeoPoint> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }

    if let Some(point) = captured_point(&PIN, link) {
        return Some(point);
    }
    if let Some(point) = captured_point(&VIEWPORT, link) {
        return Some(point);
    }

    let parsed = url::Url::parse(link).ok()?;

    for (key, value) in parsed.query_pairs() {
        if COORDINATE_PARAMS.contains(&key.as_ref()) {
            if let Some(point) = captured_point(&PAIR, &value) {
                return Some(point);
            }
        }
    }

    let segments: Vec<String> = parsed
        .path_segments()?
        .map(|s| {
            url::form_urlencoded::parse(s.as_bytes())
                .map(|(k, _)| k.into_owned())
                .collect::<String>()
        })
        .collect();
    segments
        .windows(2)
        .filter(|w| w[0] == "search" || w[0] == "place")
        .find_map(|w| captured_point(&PAIR, &w[1]))
}

fn captured_point(pattern: &Regex, haystack: &str) -> Option<GeoPoint> {
    let caps = pattern.captures(haystack)?;
    let lat: f64 = caps.get(1)?.as_str().parse().ok()?;
    let lon: f64 = caps.get(2)?.as_str().parse().ok()?;
    GeoPoint::new(lat, lon)
}
