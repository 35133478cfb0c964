use crate::{
    error::Result,
    location::City,
    provider::{ipinfo::IpLocation, nws::ForecastPeriod},
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug};

pub mod ipinfo;
pub mod nominatim;
pub mod nws;

/// The upstream services geocast talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceId {
    IpInfo,
    Nominatim,
    Nws,
}

impl ServiceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceId::IpInfo => "ipinfo",
            ServiceId::Nominatim => "nominatim",
            ServiceId::Nws => "nws",
        }
    }

    pub const fn all() -> &'static [ServiceId] {
        &[ServiceId::IpInfo, ServiceId::Nominatim, ServiceId::Nws]
    }

    /// Public endpoint used when the config does not override it.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ServiceId::IpInfo => "https://ipinfo.io",
            ServiceId::Nominatim => "https://nominatim.openstreetmap.org",
            ServiceId::Nws => "https://api.weather.gov",
        }
    }
}

impl std::fmt::Display for ServiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ServiceId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "ipinfo" => Ok(ServiceId::IpInfo),
            "nominatim" => Ok(ServiceId::Nominatim),
            "nws" => Ok(ServiceId::Nws),
            _ => Err(anyhow::anyhow!(
                "Unknown service '{value}'. Supported services: ipinfo, nominatim, nws."
            )),
        }
    }
}

/// Place name or coordinates to a [`City`].
#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    async fn geocode_by_city(&self, name: &str) -> Result<City>;

    async fn geocode_by_point(&self, lat: f64, lon: f64) -> Result<City>;
}

/// IP address (or the caller's own, when `None`) to a location record.
#[async_trait]
pub trait IpLocator: Send + Sync + Debug {
    async fn geolocate(&self, ip: Option<&str>) -> Result<IpLocation>;
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn get_weather(&self, city: &City) -> Result<Vec<ForecastPeriod>>;
}
