//! Core library for the `geocast` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Clients for ipinfo.io, Nominatim and api.weather.gov behind small traits
//! - Location resolution from a point, a city name or an IP address
//! - Shared domain models (cities, forecast periods)
//!
//! It is used by `geocast-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod dump;
pub mod error;
pub mod location;
pub mod provider;
pub mod resolver;

pub use config::Config;
pub use error::{GeocastError, Stage};
pub use location::{City, LocationInput, well_known, well_known_cities};
pub use provider::{
    Geocoder, IpLocator, ServiceId, WeatherProvider,
    ipinfo::{IpInfoClient, IpLocation, validate_ip_address},
    nominatim::{GeocodeResult, NominatimClient, SearchParams},
    nws::{ForecastPeriod, NwsClient, RelativeDay},
};
pub use resolver::LocationResolver;
