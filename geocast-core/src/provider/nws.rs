//! api.weather.gov client.
//!
//! Forecasts are a two-step lookup: `/points/{lat},{lon}` names the forecast
//! office and grid cell for a point, and its `properties.forecast` URL serves
//! the periods, e.g.
//!
//! - `https://api.weather.gov/points/30.2672,-97.7431` (Austin, TX)
//! - `https://api.weather.gov/gridpoints/EWX/156,91/forecast`

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use reqwest::{Client, header::USER_AGENT};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::path::PathBuf;
use tracing::debug;

use crate::{
    config::Config,
    dump::dump_if_enabled,
    error::{GeocastError, Result, Stage},
    location::City,
    provider::ServiceId,
};

use super::WeatherProvider;

/// Metadata for a grid point. Only the forecast URL is used.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastOffice {
    #[serde(default)]
    pub id: Option<String>,
    pub properties: OfficeProperties,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficeProperties {
    pub forecast: String,
    pub forecast_hourly: Option<String>,
    pub forecast_grid_data: Option<String>,
    pub forecast_zone: Option<String>,
    pub time_zone: Option<String>,
    pub county: Option<String>,
    pub fire_weather_zone: Option<String>,
    pub observation_stations: Option<String>,
    pub radar_station: Option<String>,
}

impl ForecastOffice {
    pub fn forecast_url(&self) -> &str {
        &self.properties.forecast
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Forecast {
    properties: ForecastProperties,
}

#[derive(Debug, Clone, Deserialize)]
struct ForecastProperties {
    periods: Vec<ForecastPeriod>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Precipitation {
    #[serde(default)]
    pub unit_code: String,
    #[serde(default)]
    pub value: Option<i32>,
}

/// One forecast time slot, e.g. "Tonight" or "Saturday".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPeriod {
    pub number: u32,
    #[serde(rename = "name")]
    pub label: String,
    #[serde(default)]
    pub start_time: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub end_time: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub is_daytime: bool,
    pub temperature: i32,
    #[serde(default)]
    pub temperature_unit: String,
    #[serde(default)]
    pub temperature_trend: Option<String>,
    #[serde(default)]
    pub probability_of_precipitation: Precipitation,
    #[serde(default)]
    pub wind_speed: String,
    #[serde(default)]
    pub wind_direction: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub short_forecast: String,
    #[serde(default)]
    pub detailed_forecast: String,
}

/// Where a period falls relative to the viewer's today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeDay {
    Today,
    Tomorrow,
    Later,
    Unknown,
}

fn strip_wmo(unit: &str) -> &str {
    unit.strip_prefix("wmoUnit:").unwrap_or(unit)
}

impl ForecastPeriod {
    /// Temperature with its unit, e.g. `98°F`.
    pub fn temp(&self) -> String {
        format!("{}°{}", self.temperature, strip_wmo(&self.temperature_unit))
    }

    /// Chance of precipitation, e.g. `20%`. A null value reads as 0.
    pub fn precipitation(&self) -> String {
        let pop = &self.probability_of_precipitation;
        let unit = match strip_wmo(&pop.unit_code) {
            "percent" => "%",
            other => other,
        };

        format!("{}{}", pop.value.unwrap_or(0), unit)
    }

    pub fn wind(&self) -> String {
        format!("{} {}", self.wind_speed, self.wind_direction)
    }

    /// Compared on the period's own calendar date, in the offset it was issued with.
    pub fn relative_day(&self, today: NaiveDate) -> RelativeDay {
        let Some(start) = self.start_time else {
            return RelativeDay::Unknown;
        };

        let date = start.date_naive();
        if date == today {
            RelativeDay::Today
        } else if today.succ_opt() == Some(date) {
            RelativeDay::Tomorrow
        } else {
            RelativeDay::Later
        }
    }
}

#[derive(Debug, Clone)]
pub struct NwsClient {
    base_url: String,
    user_agent: String,
    dump_dir: Option<PathBuf>,
    http: Client,
}

impl NwsClient {
    /// api.weather.gov requires a `User-Agent`, so `user_agent` must not be empty.
    pub fn new(user_agent: impl Into<String>) -> Result<Self> {
        let user_agent = user_agent.into();

        if user_agent.trim().is_empty() {
            return Err(GeocastError::config(
                "a client identification (User-Agent) is required for api.weather.gov",
            ));
        }

        Ok(Self {
            base_url: ServiceId::Nws.default_base_url().to_string(),
            user_agent,
            dump_dir: None,
            http: Client::new(),
        })
    }

    pub fn from_config(config: &Config, fallback_user_agent: &str) -> Result<Self> {
        Ok(Self::new(config.user_agent_or(fallback_user_agent))?
            .with_base_url(config.base_url(ServiceId::Nws)))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_dump_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.dump_dir = dir;
        self
    }

    async fn fetch<T: DeserializeOwned>(&self, stage: Stage, url: &str, dump_name: &str) -> Result<T> {
        debug!("Fetching {stage} from {url}");

        let network = |source| GeocastError::Network {
            stage,
            url: url.to_string(),
            source,
        };

        let res = self
            .http
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(network)?;

        let body = res.text().await.map_err(network)?;

        dump_if_enabled(self.dump_dir.as_deref(), dump_name, &body);

        serde_json::from_str(&body).map_err(|e| GeocastError::decode(stage, e.to_string()))
    }

    pub async fn forecast_office(&self, city: &City) -> Result<ForecastOffice> {
        let url = city.office_url(&self.base_url);
        self.fetch(Stage::OfficeLookup, &url, &format!("{}-office.json", city.slug()))
            .await
    }

    /// Periods for `city`, in the order the service returned them.
    pub async fn get_weather(&self, city: &City) -> Result<Vec<ForecastPeriod>> {
        let office = self.forecast_office(city).await?;

        debug!("Found: {}", office.forecast_url());

        let forecast: Forecast = self
            .fetch(
                Stage::ForecastLookup,
                office.forecast_url(),
                &format!("{}-forecast.json", city.slug()),
            )
            .await?;

        Ok(forecast.properties.periods)
    }
}

#[async_trait]
impl WeatherProvider for NwsClient {
    async fn get_weather(&self, city: &City) -> Result<Vec<ForecastPeriod>> {
        NwsClient::get_weather(self, city).await
    }
}
