//! Error taxonomy shared by every client in the crate.

use std::fmt;

use thiserror::Error;

/// Which upstream call an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    IpLookup,
    Geocode,
    OfficeLookup,
    ForecastLookup,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::IpLookup => "ip lookup",
            Stage::Geocode => "geocode",
            Stage::OfficeLookup => "forecast office lookup",
            Stage::ForecastLookup => "forecast lookup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum GeocastError {
    /// A required credential or setting is missing. No request was made.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed user input, rejected before any request.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The IP resolved, but it is private or reserved ("bogon").
    #[error("IP address {0} is private (may be local)")]
    PrivateAddress(String),

    /// The upstream service answered with zero results.
    #[error("No results for query: {0}")]
    NotFound(String),

    /// Transport failure or a non-2xx status.
    #[error("{stage} request to {url} failed: {source}")]
    Network {
        stage: Stage,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The body did not have the expected shape.
    #[error("Failed to decode {stage} response: {reason}")]
    Decode { stage: Stage, reason: String },
}

impl GeocastError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    pub fn decode<S: Into<String>>(stage: Stage, reason: S) -> Self {
        Self::Decode {
            stage,
            reason: reason.into(),
        }
    }

    /// The upstream call this error belongs to, when there is one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Network { stage, .. } | Self::Decode { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type Result<T, E = GeocastError> = std::result::Result<T, E>;
