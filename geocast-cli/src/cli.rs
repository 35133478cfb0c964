use std::path::PathBuf;

use anyhow::{Context, anyhow};
use clap::{Args, Parser, Subcommand};
use geocast_core::{
    City, Config, IpInfoClient, LocationInput, LocationResolver, NominatimClient, NwsClient,
    ServiceId,
};
use tracing::{debug, warn};

use crate::{configure, interactive, view};

/// Sent to Nominatim and api.weather.gov when the config names no client.
const DEFAULT_USER_AGENT: &str = concat!("geocast/", env!("CARGO_PKG_VERSION"));

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "geocast",
    version,
    about = "Location aware weather forecasts for the command line.",
    long_about = "Geocast is a command line utility that provides location aware weather forecasts.\n\
                  It can be used to fetch the weather forecast for a specific city, latitude and\n\
                  longitude, or the current device's IP address."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// "me" (the default) or a city name to forecast.
    pub query: Option<String>,

    #[command(flatten)]
    pub options: Options,
}

#[derive(Debug, Clone, Args)]
pub struct Options {
    /// The city name to fetch the forecast for.
    #[arg(long, short = 'c', short_alias = 'n', alias = "cn", global = true)]
    pub city: Option<String>,

    /// The IP address to fetch the forecast for.
    #[arg(long, global = true)]
    pub ip: Option<String>,

    /// The point to fetch the forecast for.
    #[arg(
        long = "pt",
        short = 'p',
        value_name = "LAT,LON",
        value_parser = parse_point,
        allow_hyphen_values = true,
        global = true
    )]
    pub point: Option<(f64, f64)>,

    /// 0 - default, 1 - temperature, 2 - short forecast, 3 - detailed forecast.
    #[arg(
        long,
        short = 'v',
        default_value_t = 0,
        value_parser = clap::value_parser!(u8).range(0..=3),
        global = true
    )]
    pub verbosity: u8,

    /// Include forecast data beyond the next period.
    #[arg(long, short = 'e', global = true)]
    pub extended: bool,

    /// Browse the forecast periods interactively.
    #[arg(long, short = 'i', global = true)]
    pub interactive: bool,

    /// Write raw service responses to this directory.
    #[arg(long, value_name = "DIR", global = true)]
    pub dump: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the weather forecast.
    #[command(visible_alias = "f")]
    Forecast,

    /// Geocode a city or IP address, or reverse geocode a latitude and longitude.
    #[command(visible_aliases = ["g", "gc"])]
    Geocode,

    /// Choose one of a few well-known cities and browse its forecast.
    #[command(visible_alias = "i")]
    Interactive,

    /// Store credentials for a service.
    Configure {
        /// Service short name: "ipinfo", "nominatim" or "nws".
        service: String,
    },
}

fn parse_point(value: &str) -> Result<(f64, f64), String> {
    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON but got '{value}'"))?;

    let coordinate = |s: &str| {
        s.trim()
            .parse::<f64>()
            .map_err(|_| format!("'{}' is not a number", s.trim()))
    };

    let (lat, lon) = (coordinate(lat)?, coordinate(lon)?);

    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(format!("{lat},{lon} is outside the valid latitude/longitude range"));
    }

    Ok((lat, lon))
}

/// Clients built from the config for one invocation.
struct Services {
    config: Config,
    ipinfo: IpInfoClient,
    nominatim: NominatimClient,
    nws: NwsClient,
}

impl Services {
    fn new(dump: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut config = Config::load()?;
        config.apply_env();

        Ok(Self {
            ipinfo: IpInfoClient::from_config(&config).with_dump_dir(dump.clone()),
            nominatim: NominatimClient::from_config(&config, DEFAULT_USER_AGENT)?
                .with_dump_dir(dump.clone()),
            nws: NwsClient::from_config(&config, DEFAULT_USER_AGENT)?.with_dump_dir(dump),
            config,
        })
    }

    async fn resolve(&self, input: &LocationInput) -> anyhow::Result<City> {
        let needs_token = matches!(input, LocationInput::Ip(_) | LocationInput::Auto);
        if needs_token && !self.config.is_service_configured(ServiceId::IpInfo) {
            warn!(
                "No ipinfo.io token configured.\n\
                 Hint: run `geocast configure ipinfo` or set IPINFO_TOKEN."
            );
        }

        LocationResolver::new(&self.nominatim, &self.ipinfo)
            .resolve(input)
            .await
            .ok_or_else(|| anyhow!("Could not determine a location to forecast"))
    }

    async fn forecast(&self, city: &City, options: &Options) -> anyhow::Result<()> {
        let periods = self
            .nws
            .get_weather(city)
            .await
            .with_context(|| format!("Failed to fetch the forecast for {city}"))?;

        debug!("Verbosity level: {}, extended: {}", options.verbosity, options.extended);

        view::print_forecast(&periods, options.verbosity.into(), options.extended).await;
        Ok(())
    }
}

impl Options {
    pub fn location_input(&self) -> LocationInput {
        LocationInput::from_parts(self.point, self.city.clone(), self.ip.clone())
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let options = self.options;

        match self.command {
            Some(Command::Configure { service }) => configure::run(&service),
            Some(Command::Interactive) => {
                let services = Services::new(options.dump.clone())?;
                let city = interactive::pick_city()?;
                println!("You picked {city}");
                interactive::browse(&services.nws, &city).await
            }
            Some(Command::Geocode) => {
                let services = Services::new(options.dump.clone())?;
                let city = services.resolve(&options.location_input()).await?;
                println!("{}", view::city_table(&city));
                Ok(())
            }
            Some(Command::Forecast) => {
                let services = Services::new(options.dump.clone())?;
                let city = services.resolve(&options.location_input()).await?;
                services.forecast(&city, &options).await
            }
            None => run_root(self.query, options).await,
        }
    }
}

/// No subcommand: forecast "me" (flags, then the device IP), or a city named
/// by the positional argument.
async fn run_root(query: Option<String>, options: Options) -> anyhow::Result<()> {
    let services = Services::new(options.dump.clone())?;

    match query.filter(|q| !q.eq_ignore_ascii_case("me")) {
        None => {
            debug!("Default command invoked.");
            let city = services.resolve(&options.location_input()).await?;

            if options.interactive {
                println!("{}", view::city_line(&city));
                interactive::browse(&services.nws, &city).await
            } else {
                services.forecast(&city, &options).await
            }
        }
        Some(name) => {
            let city = services
                .nominatim
                .geocode_by_city(&name)
                .await
                .with_context(|| format!("Failed to geocode '{name}'"))?;

            println!("{}", view::city_line(&city));
            services.forecast(&city, &options).await
        }
    }
}
