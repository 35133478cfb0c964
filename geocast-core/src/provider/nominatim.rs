//! OpenStreetMap Nominatim client for forward geocoding.
//!
//! Base URL: https://nominatim.openstreetmap.org
//!
//! Only `/search` is used; a point lookup is a search whose free-form query is
//! `"lat,lon"`. Nominatim rejects anonymous traffic, so every request carries
//! the caller-supplied client identification as its `User-Agent`.

use async_trait::async_trait;
use reqwest::{Client, header::USER_AGENT};
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf};
use tracing::{debug, error, warn};

use crate::{
    config::Config,
    dump::dump_if_enabled,
    error::{GeocastError, Result, Stage},
    location::City,
    provider::ServiceId,
};

use super::Geocoder;

pub const RESULT_LIMIT: u32 = 25;

/// Response formats that come back as a plain array of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    Json,
    #[default]
    JsonV2,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::JsonV2 => "jsonv2",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query parameters for `/search`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    /// Free-form query string.
    pub q: String,
    pub format: Format,
    pub limit: u32,
    pub name_details: bool,
}

impl SearchParams {
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            ..Self::default()
        }
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn name_details(mut self, name_details: bool) -> Self {
        self.name_details = name_details;
        self
    }

    /// Query pairs in the order they are rendered.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("q", self.q.clone()),
            ("format", self.format.to_string()),
            ("limit", self.limit.to_string()),
        ];

        if self.name_details {
            pairs.push(("namedetails", "1".to_string()));
        }

        pairs
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            q: String::new(),
            format: Format::default(),
            limit: RESULT_LIMIT,
            name_details: false,
        }
    }
}

/// Renders `q=..&format=..&limit=..`, or nothing without a query.
impl fmt::Display for SearchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.q.is_empty() {
            return Ok(());
        }

        let rendered: Vec<String> = self
            .pairs()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();

        f.write_str(&rendered.join("&"))
    }
}

/// One entry of a `/search` response, in the service's relevance order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    #[serde(default)]
    pub place_id: u64,
    #[serde(default)]
    pub licence: String,
    #[serde(default)]
    pub osm_type: String,
    #[serde(default)]
    pub osm_id: u64,
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub place_rank: u32,
    #[serde(default)]
    pub importance: f64,
    #[serde(default)]
    pub addresstype: String,
    #[serde(default)]
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub boundingbox: Vec<String>,
}

impl GeocodeResult {
    /// Unparseable coordinates become `0.0`; the result is trusted otherwise.
    pub fn to_city(&self) -> City {
        City::new(
            self.display_name.clone(),
            parse_coordinate("lat", &self.lat),
            parse_coordinate("lon", &self.lon),
        )
    }
}

fn parse_coordinate(field: &str, value: &str) -> f64 {
    value.trim().parse().unwrap_or_else(|_| {
        warn!("Geocode result has malformed {field} '{value}', using 0");
        0.0
    })
}

#[derive(Debug, Clone)]
pub struct NominatimClient {
    base_url: String,
    user_agent: String,
    dump_dir: Option<PathBuf>,
    http: Client,
}

impl NominatimClient {
    /// `user_agent` identifies this application to the service and must not be empty.
    pub fn new(user_agent: impl Into<String>) -> Result<Self> {
        let user_agent = user_agent.into();

        if user_agent.trim().is_empty() {
            return Err(GeocastError::config(
                "a client identification (User-Agent) is required for Nominatim",
            ));
        }

        Ok(Self {
            base_url: ServiceId::Nominatim.default_base_url().to_string(),
            user_agent,
            dump_dir: None,
            http: Client::new(),
        })
    }

    /// `fallback_user_agent` is used when the config has none.
    pub fn from_config(config: &Config, fallback_user_agent: &str) -> Result<Self> {
        Ok(Self::new(config.user_agent_or(fallback_user_agent))?
            .with_base_url(config.base_url(ServiceId::Nominatim)))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_dump_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.dump_dir = dir;
        self
    }

    /// Run a search. Failures are logged and yield no results; callers decide
    /// whether an empty answer is an error.
    pub async fn search(&self, params: &SearchParams) -> Vec<GeocodeResult> {
        match self.try_search(params).await {
            Ok(results) => results,
            Err(e) => {
                error!("{e}");
                Vec::new()
            }
        }
    }

    async fn try_search(&self, params: &SearchParams) -> Result<Vec<GeocodeResult>> {
        let url = format!("{}/search", self.base_url.trim_end_matches('/'));

        debug!("Searching {url}?{params}");

        let network = |source| GeocastError::Network {
            stage: Stage::Geocode,
            url: url.clone(),
            source,
        };

        let res = self
            .http
            .get(&url)
            .header(USER_AGENT, &self.user_agent)
            .query(&params.pairs())
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(network)?;

        let body = res.text().await.map_err(network)?;

        dump_if_enabled(self.dump_dir.as_deref(), "search.json", &body);

        serde_json::from_str(&body).map_err(|e| GeocastError::decode(Stage::Geocode, e.to_string()))
    }

    async fn first_match(&self, params: SearchParams) -> Result<City> {
        let results = self.search(&params).await;

        let best = results
            .first()
            .ok_or_else(|| GeocastError::NotFound(params.q.clone()))?;

        debug!("Best of {} results for '{}': {}", results.len(), params.q, best.display_name);

        Ok(best.to_city())
    }

    pub async fn geocode_by_city(&self, name: &str) -> Result<City> {
        self.first_match(SearchParams::new(name)).await
    }

    pub async fn geocode_by_point(&self, lat: f64, lon: f64) -> Result<City> {
        self.first_match(SearchParams::new(format!("{lat},{lon}"))).await
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn geocode_by_city(&self, name: &str) -> Result<City> {
        NominatimClient::geocode_by_city(self, name).await
    }

    async fn geocode_by_point(&self, lat: f64, lon: f64) -> Result<City> {
        NominatimClient::geocode_by_point(self, lat, lon).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const UA: &str = "geocast-tests";

    fn seattle() -> serde_json::Value {
        serde_json::json!([{
            "place_id": 312908827,
            "licence": "Data © OpenStreetMap contributors, ODbL 1.0. http://osm.org/copyright",
            "osm_type": "relation",
            "osm_id": 237385,
            "lat": "47.6038321",
            "lon": "-122.330062",
            "category": "boundary",
            "type": "administrative",
            "place_rank": 16,
            "importance": 0.6729791735643788,
            "addresstype": "city",
            "name": "Seattle",
            "display_name": "Seattle, King County, Washington, United States",
            "boundingbox": ["47.4810022", "47.7341354", "-122.4596960", "-122.2244330"]
        }])
    }

    fn client_for(server: &MockServer) -> NominatimClient {
        NominatimClient::new(UA).unwrap().with_base_url(server.uri())
    }

    #[test]
    fn params_render_defaults() {
        assert_eq!(SearchParams::new("Austin").to_string(), "q=Austin&format=jsonv2&limit=25");
    }

    #[test]
    fn params_render_is_independent_of_setter_order() {
        let a = SearchParams::new("Austin").name_details(true).format(Format::JsonV2);
        let b = SearchParams::new("Austin").format(Format::JsonV2).name_details(true);

        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(a.to_string(), "q=Austin&format=jsonv2&limit=25&namedetails=1");
        assert_eq!(a.to_string(), a.to_string());
    }

    #[tokio::test]
    async fn json_format_is_decoded_like_jsonv2() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(seattle()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let results = client
            .search(&SearchParams::new("Seattle").format(Format::Json))
            .await;

        assert_eq!(results.len(), 1);
    }

    #[test]
    fn params_without_query_render_empty() {
        assert_eq!(SearchParams::default().to_string(), "");
    }

    #[test]
    fn empty_user_agent_is_rejected() {
        let err = NominatimClient::new("  ").unwrap_err();
        assert!(matches!(err, GeocastError::Config(_)));
    }

    #[test]
    fn malformed_coordinates_default_to_zero() {
        let result: GeocodeResult = serde_json::from_value(serde_json::json!({
            "lat": "not-a-number",
            "lon": "-122.330062",
            "display_name": "Somewhere"
        }))
        .unwrap();

        let city = result.to_city();
        assert_eq!(city.latitude, 0.0);
        assert_eq!(city.longitude, -122.330062);
    }

    #[tokio::test]
    async fn search_sends_params_and_user_agent() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "Seattle"))
            .and(query_param("format", "jsonv2"))
            .and(query_param("limit", "25"))
            .and(header("User-Agent", UA))
            .respond_with(ResponseTemplate::new(200).set_body_json(seattle()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let results = client.search(&SearchParams::new("Seattle")).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Seattle");
        assert_eq!(results[0].kind, "administrative");
    }

    #[tokio::test]
    async fn search_swallows_errors() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.search(&SearchParams::new("Seattle")).await.is_empty());
    }

    #[tokio::test]
    async fn search_swallows_bad_json() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.search(&SearchParams::new("Seattle")).await.is_empty());
    }

    #[tokio::test]
    async fn geocode_by_city_takes_first_result() {
        let server = MockServer::start().await;

        let mut body = seattle();
        if let Some(list) = body.as_array_mut() {
            list.push(serde_json::json!({
                "lat": "47.0", "lon": "-122.0", "display_name": "Seattle Heights"
            }));
        }

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "Seattle"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let city = client.geocode_by_city("Seattle").await.unwrap();

        assert_eq!(city.name, "Seattle, King County, Washington, United States");
        assert_eq!(city.latitude, 47.6038321);
        assert_eq!(city.longitude, -122.330062);
    }

    #[tokio::test]
    async fn geocode_by_point_queries_full_precision() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "47.6062,-122.3321"))
            .respond_with(ResponseTemplate::new(200).set_body_json(seattle()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let city = client.geocode_by_point(47.6062, -122.3321).await.unwrap();

        assert!(city.name.contains("Seattle"));
    }

    #[tokio::test]
    async fn no_results_is_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let client = client_for(&server);

        match client.geocode_by_city("Atlantis").await.unwrap_err() {
            GeocastError::NotFound(q) => assert_eq!(q, "Atlantis"),
            other => panic!("expected NotFound, got {other:?}"),
        }
        assert!(matches!(
            client.geocode_by_point(0.0, 0.0).await.unwrap_err(),
            GeocastError::NotFound(_)
        ));
    }
}
