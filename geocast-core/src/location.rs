use serde::{Deserialize, Serialize};
use std::fmt;

/// A named point on the map. Every resolution path ends in one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl City {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }

    /// Forecast-office lookup URL for this point.
    ///
    /// api.weather.gov only accepts four decimals and redirects anything longer.
    pub fn office_url(&self, base_url: &str) -> String {
        format!(
            "{}/points/{:.4},{:.4}",
            base_url.trim_end_matches('/'),
            self.latitude,
            self.longitude
        )
    }

    /// File-name friendly version of the name, used for raw dumps.
    pub fn slug(&self) -> String {
        let slug: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect();

        slug.split('-').filter(|s| !s.is_empty()).collect::<Vec<_>>().join("-")
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.6}, {:.6})", self.name, self.latitude, self.longitude)
    }
}

const WELL_KNOWN: &[(&str, f64, f64)] = &[
    ("Seattle", 47.6062, -122.3321),
    ("Austin", 30.2672, -97.7431),
    ("Cleveland", 41.4993, -81.6944),
    ("Hartford", 41.7658, -72.6734),
    ("Boston", 42.3601, -71.0589),
    ("Los Angeles", 34.0522, -118.2437),
    ("Pittsburgh", 40.4406, -79.9959),
];

/// Cities offered by the interactive picker.
pub fn well_known_cities() -> Vec<City> {
    WELL_KNOWN
        .iter()
        .map(|&(name, lat, lon)| City::new(name, lat, lon))
        .collect()
}

pub fn well_known(name: &str) -> Option<City> {
    WELL_KNOWN
        .iter()
        .find(|(known, _, _)| known.eq_ignore_ascii_case(name.trim()))
        .map(|&(name, lat, lon)| City::new(name, lat, lon))
}

/// What the user asked us to locate. Built once at the command boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationInput {
    Point { lat: f64, lon: f64 },
    City(String),
    Ip(String),
    /// Nothing given; locate the caller by their public IP.
    Auto,
}

impl LocationInput {
    /// Pick exactly one input by presence: point, then city, then IP.
    ///
    /// Blank strings count as absent. Nothing is merged or cross-checked.
    pub fn from_parts(point: Option<(f64, f64)>, city: Option<String>, ip: Option<String>) -> Self {
        let present = |s: Option<String>| s.filter(|s| !s.trim().is_empty());

        if let Some((lat, lon)) = point {
            LocationInput::Point { lat, lon }
        } else if let Some(city) = present(city) {
            LocationInput::City(city)
        } else if let Some(ip) = present(ip) {
            LocationInput::Ip(ip)
        } else {
            LocationInput::Auto
        }
    }
}

impl fmt::Display for LocationInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationInput::Point { lat, lon } => write!(f, "point {lat},{lon}"),
            LocationInput::City(name) => write!(f, "city '{name}'"),
            LocationInput::Ip(ip) => write!(f, "ip {ip}"),
            LocationInput::Auto => f.write_str("device ip"),
        }
    }
}
