//! Location resolution.
//!
//! Turns a [`LocationInput`] into one [`City`] using exactly one upstream
//! service, chosen by the input variant. The most specific input wins (a point
//! over a city name over an IP address over the caller's own address), and a
//! failure on the chosen branch ends resolution: nothing falls through to a
//! less specific input.

use tracing::{debug, error};

use crate::{
    error::Result,
    location::{City, LocationInput},
    provider::{Geocoder, IpLocator},
};

pub struct LocationResolver<'a> {
    geocoder: &'a dyn Geocoder,
    locator: &'a dyn IpLocator,
}

impl<'a> LocationResolver<'a> {
    pub fn new(geocoder: &'a dyn Geocoder, locator: &'a dyn IpLocator) -> Self {
        Self { geocoder, locator }
    }

    pub async fn try_resolve(&self, input: &LocationInput) -> Result<City> {
        debug!("Resolving location from {input}");

        let city = match input {
            LocationInput::Point { lat, lon } => self.geocoder.geocode_by_point(*lat, *lon).await?,
            LocationInput::City(name) => self.geocoder.geocode_by_city(name).await?,
            LocationInput::Ip(ip) => self.locator.geolocate(Some(ip)).await?.to_city()?,
            LocationInput::Auto => {
                debug!("No IP address provided, will attempt to use device IP.");
                self.locator.geolocate(None).await?.to_city()?
            }
        };

        debug!("Resolved {input} to {city}");

        Ok(city)
    }

    /// Like [`try_resolve`](Self::try_resolve), but the error is logged and
    /// swallowed. `None` means there is nothing to forecast.
    pub async fn resolve(&self, input: &LocationInput) -> Option<City> {
        match self.try_resolve(input).await {
            Ok(city) => Some(city),
            Err(e) => {
                error!("Could not resolve {input}: {e}");
                None
            }
        }
    }
}
