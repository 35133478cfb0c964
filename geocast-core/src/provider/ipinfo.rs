use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use crate::{
    config::Config,
    dump::dump_if_enabled,
    error::{GeocastError, Result, Stage},
    location::City,
    provider::ServiceId,
};

use super::IpLocator;

/// Marker ipinfo.io puts in the body for private and reserved addresses.
const BOGON_MARKER: &str = "bogon";

/// Response of `GET https://ipinfo.io/{ip}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpLocation {
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub country: String,
    /// `"lat,lon"`
    pub loc: String,
    #[serde(default)]
    pub org: String,
    #[serde(default)]
    pub postal: String,
    #[serde(default)]
    pub timezone: String,
}

impl IpLocation {
    pub fn point(&self) -> Result<(f64, f64)> {
        let malformed = || GeocastError::decode(Stage::IpLookup, format!("malformed loc '{}'", self.loc));

        let (lat, lon) = self.loc.split_once(',').ok_or_else(malformed)?;
        let lat = lat.trim().parse::<f64>().map_err(|_| malformed())?;
        let lon = lon.trim().parse::<f64>().map_err(|_| malformed())?;

        Ok((lat, lon))
    }

    pub fn to_city(&self) -> Result<City> {
        let (lat, lon) = self.point()?;
        Ok(City::new(self.city.clone(), lat, lon))
    }
}

/// Four dot-separated groups of one to three digits, none of the first three
/// being a bare `0`.
pub fn validate_ip_address(ip: &str) -> bool {
    let parts: Vec<&str> = ip.split('.').collect();

    if parts.len() != 4 {
        return false;
    }

    let well_formed = parts
        .iter()
        .all(|p| (1..=3).contains(&p.len()) && p.bytes().all(|b| b.is_ascii_digit()));

    well_formed && parts[..3].iter().all(|p| *p != "0")
}

/// Client for the https://ipinfo.io API.
#[derive(Debug, Clone)]
pub struct IpInfoClient {
    token: String,
    base_url: String,
    dump_dir: Option<PathBuf>,
    http: Client,
}

impl IpInfoClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: ServiceId::IpInfo.default_base_url().to_string(),
            dump_dir: None,
            http: Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.ipinfo_token().unwrap_or_default())
            .with_base_url(config.base_url(ServiceId::IpInfo))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_dump_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.dump_dir = dir;
        self
    }

    /// Locate `ip`, or the caller's own public address when `ip` is `None`.
    pub async fn geolocate(&self, ip: Option<&str>) -> Result<IpLocation> {
        if self.token.trim().is_empty() {
            return Err(GeocastError::config("IPInfo token is required"));
        }

        let base = self.base_url.trim_end_matches('/');
        let url = match ip {
            Some(ip) if !validate_ip_address(ip) => {
                return Err(GeocastError::validation(format!("invalid IP address '{ip}'")));
            }
            Some(ip) => format!("{base}/{ip}"),
            None => base.to_string(),
        };

        debug!("Geolocating {} via {}", ip.unwrap_or("device IP"), url);

        let network = |source| GeocastError::Network {
            stage: Stage::IpLookup,
            url: url.clone(),
            source,
        };

        let res = self
            .http
            .get(&url)
            .query(&[("token", self.token.as_str())])
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(|e| network(e.without_url()))?;

        let body = res.text().await.map_err(|e| network(e.without_url()))?;

        if body.contains(BOGON_MARKER) {
            return Err(GeocastError::PrivateAddress(
                ip.unwrap_or("device IP").to_string(),
            ));
        }

        dump_if_enabled(self.dump_dir.as_deref(), "ipinfo.json", &body);

        serde_json::from_str(&body).map_err(|e| GeocastError::decode(Stage::IpLookup, e.to_string()))
    }
}

#[async_trait]
impl IpLocator for IpInfoClient {
    async fn geolocate(&self, ip: Option<&str>) -> Result<IpLocation> {
        IpInfoClient::geolocate(self, ip).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const AUSTIN: &str =
        r#"{"city": "Austin", "region": "Texas", "country": "US", "loc": "30.2672,-97.7431"}"#;

    #[test]
    fn validate_accepts_dotted_quads() {
        for ip in ["8.8.8.8", "192.168.1.254", "1.1.1.0", "10.20.30.40"] {
            assert!(validate_ip_address(ip), "{ip} should be valid");
        }
    }

    #[test]
    fn validate_rejects_malformed_input() {
        for ip in [
            "invalid",
            "",
            "8.8.8",
            "8.8.8.8.8",
            "8..8.8",
            "8.8.8.",
            "1234.1.1.1",
            "a.b.c.d",
            "0.1.2.3",
            "1.0.2.3",
            "1.2.0.3",
            "127.0.0.1",
            "10.0.0.1",
        ] {
            assert!(!validate_ip_address(ip), "{ip:?} should be invalid");
        }
    }

    #[test]
    fn point_parses_loc() {
        let rec: IpLocation = serde_json::from_str(AUSTIN).unwrap();

        assert_eq!(rec.point().unwrap(), (30.2672, -97.7431));
        assert_eq!(rec.to_city().unwrap(), City::new("Austin", 30.2672, -97.7431));
    }

    #[test]
    fn point_rejects_malformed_loc() {
        let rec = IpLocation {
            loc: "30.2672".into(),
            ..serde_json::from_str(AUSTIN).unwrap()
        };

        let err = rec.point().unwrap_err();
        assert!(matches!(err, GeocastError::Decode { stage: Stage::IpLookup, .. }));
    }

    #[tokio::test]
    async fn geolocate_explicit_ip() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/8.8.8.8"))
            .and(query_param("token", "valid_token"))
            .respond_with(ResponseTemplate::new(200).set_body_string(AUSTIN))
            .expect(1)
            .mount(&server)
            .await;

        let client = IpInfoClient::new("valid_token").with_base_url(server.uri());
        let rec = client.geolocate(Some("8.8.8.8")).await.unwrap();

        assert_eq!(rec.city, "Austin");
        assert_eq!(rec.region, "Texas");
    }

    #[tokio::test]
    async fn geolocate_without_ip_hits_base_endpoint() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .and(query_param("token", "valid_token"))
            .respond_with(ResponseTemplate::new(200).set_body_string(AUSTIN))
            .expect(1)
            .mount(&server)
            .await;

        let client = IpInfoClient::new("valid_token").with_base_url(server.uri());
        let city = client.geolocate(None).await.unwrap().to_city().unwrap();

        assert_eq!(city.name, "Austin");
    }

    #[tokio::test]
    async fn empty_token_sends_nothing() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(AUSTIN))
            .expect(0)
            .mount(&server)
            .await;

        let client = IpInfoClient::new("").with_base_url(server.uri());
        let err = client.geolocate(Some("8.8.8.8")).await.unwrap_err();

        assert!(matches!(err, GeocastError::Config(_)));
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn invalid_ip_sends_nothing() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(AUSTIN))
            .expect(0)
            .mount(&server)
            .await;

        let client = IpInfoClient::new("valid_token").with_base_url(server.uri());
        let err = client.geolocate(Some("invalid_ip")).await.unwrap_err();

        assert!(matches!(err, GeocastError::Validation(_)));
    }

    #[tokio::test]
    async fn bogon_is_a_private_address() {
        let server = MockServer::start().await;

        // Not a location shape at all, so a decode attempt would fail differently.
        Mock::given(method("GET"))
            .and(path("/192.168.1.1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"ip": "192.168.1.1", "bogon": true}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = IpInfoClient::new("valid_token").with_base_url(server.uri());
        let err = client.geolocate(Some("192.168.1.1")).await.unwrap_err();

        match err {
            GeocastError::PrivateAddress(ip) => assert_eq!(ip, "192.168.1.1"),
            other => panic!("expected PrivateAddress, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn bogon_device_ip_is_a_private_address() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"ip": "10.0.0.1", "bogon": true}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = IpInfoClient::new("valid_token").with_base_url(server.uri());
        let err = client.geolocate(None).await.unwrap_err();

        match err {
            GeocastError::PrivateAddress(ip) => assert_eq!(ip, "device IP"),
            other => panic!("expected PrivateAddress, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_loc_is_a_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"ip": "8.8.8.8", "city": "Austin"}"#),
            )
            .mount(&server)
            .await;

        let client = IpInfoClient::new("valid_token").with_base_url(server.uri());
        let err = client.geolocate(Some("8.8.8.8")).await.unwrap_err();

        assert!(matches!(err, GeocastError::Decode { stage: Stage::IpLookup, .. }));
    }

    #[tokio::test]
    async fn error_status_is_a_network_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let client = IpInfoClient::new("bad_token").with_base_url(server.uri());
        let err = client.geolocate(Some("8.8.8.8")).await.unwrap_err();

        match err {
            GeocastError::Network { stage, url, .. } => {
                assert_eq!(stage, Stage::IpLookup);
                assert_eq!(url, format!("{}/8.8.8.8", server.uri()));
                assert!(!url.contains("bad_token"));
            }
            other => panic!("expected Network, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dump_dir_receives_raw_body() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().expect("tempdir");

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(AUSTIN))
            .mount(&server)
            .await;

        let client = IpInfoClient::new("valid_token")
            .with_base_url(server.uri())
            .with_dump_dir(Some(dir.path().to_path_buf()));
        client.geolocate(None).await.unwrap();

        assert!(dir.path().join("ipinfo.json").exists());
    }
}
