//! Live grid data adapters.
//!
//! Each adapter fetches a public grid-mix snapshot and reshapes it into a
//! [`LiveSeed`] scaled to microgrid range. Fetching never fails loudly:
//! [`SeedSource::fetch`] logs the problem and yields `None`, and the caller
//! keeps using whatever seed it had before.

pub mod eia;
pub mod electricity_maps;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sim::types::LiveSeed;

/// Default Electricity Maps zone (California ISO).
pub const DEFAULT_ZONE: &str = "US-CAL-CISO";
/// Default EIA balancing authority (ERCOT).
pub const DEFAULT_RESPONDENT: &str = "TEX";
/// Default interval between live fetches (ms).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 20_000;

/// Where generation-mix data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Purely synthetic generation.
    #[default]
    Simulation,
    /// Electricity Maps power breakdown.
    ElectricityMaps,
    /// U.S. EIA hourly fuel-type data.
    Eia,
}

impl DataSource {
    /// Returns the display label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Simulation => "SIMULATION",
            Self::ElectricityMaps => "ELECTRICITY_MAPS",
            Self::Eia => "EIA",
        }
    }

    /// `true` for sources that poll an external API.
    pub fn is_live(self) -> bool {
        self != Self::Simulation
    }

    /// Next source in dashboard cycling order.
    pub fn cycle(self) -> Self {
        match self {
            Self::Simulation => Self::ElectricityMaps,
            Self::ElectricityMaps => Self::Eia,
            Self::Eia => Self::Simulation,
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from a live data fetch.
#[derive(Debug, thiserror::Error)]
pub enum LiveDataError {
    /// No API key configured for the selected provider.
    #[error("no API key configured for {0}")]
    MissingApiKey(DataSource),

    /// This build was compiled without the `live` feature.
    #[error("live data requires the `live` feature")]
    Unavailable,

    /// The HTTP request itself failed.
    #[cfg(feature = "live")]
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a non-2xx status.
    #[error("provider API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The provider returned no usable records.
    #[error("provider returned no usable data")]
    NoData,
}

/// Provider credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiKeys {
    pub electricity_maps: Option<String>,
    pub eia: Option<String>,
}

impl ApiKeys {
    fn for_source(&self, source: DataSource) -> Option<&str> {
        let key = match source {
            DataSource::Simulation => None,
            DataSource::ElectricityMaps => self.electricity_maps.as_deref(),
            DataSource::Eia => self.eia.as_deref(),
        };
        key.filter(|k| !k.trim().is_empty())
    }
}

/// Anything that can hand the engine a fresh live seed.
pub trait SeedSource {
    /// Attempts one fetch; `None` means "keep the previous seed".
    fn fetch(&mut self) -> Option<LiveSeed>;
}

impl<F> SeedSource for F
where
    F: FnMut() -> Option<LiveSeed>,
{
    fn fetch(&mut self) -> Option<LiveSeed> {
        self()
    }
}

/// Source that never produces a seed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSeed;

impl SeedSource for NoSeed {
    fn fetch(&mut self) -> Option<LiveSeed> {
        None
    }
}

/// Configured connection to one live provider.
#[derive(Debug, Clone)]
pub struct LiveFeed {
    source: DataSource,
    zone: String,
    respondent: String,
    keys: ApiKeys,
    #[cfg(feature = "live")]
    client: reqwest::blocking::Client,
}

impl LiveFeed {
    /// Creates a feed.
    ///
    /// # Arguments
    ///
    /// * `source` - Provider to poll
    /// * `zone` - Electricity Maps zone
    /// * `respondent` - EIA balancing authority code
    /// * `keys` - Provider credentials
    pub fn new(source: DataSource, zone: String, respondent: String, keys: ApiKeys) -> Self {
        Self {
            source,
            zone,
            respondent,
            keys,
            #[cfg(feature = "live")]
            client: reqwest::blocking::Client::new(),
        }
    }

    pub fn source(&self) -> DataSource {
        self.source
    }

    /// Switches provider without rebuilding the client.
    pub fn set_source(&mut self, source: DataSource) {
        self.source = source;
    }

    /// Fetches one snapshot.
    ///
    /// # Returns
    ///
    /// `Ok(None)` for the simulation source.
    ///
    /// # Errors
    ///
    /// Returns a [`LiveDataError`] for a missing key, a transport or HTTP
    /// failure, a malformed body, or an empty dataset.
    pub fn try_fetch(&self) -> Result<Option<LiveSeed>, LiveDataError> {
        if !self.source.is_live() {
            return Ok(None);
        }
        let key = self
            .keys
            .for_source(self.source)
            .ok_or(LiveDataError::MissingApiKey(self.source))?;
        self.fetch_with_key(key).map(Some)
    }

    #[cfg(feature = "live")]
    fn fetch_with_key(&self, key: &str) -> Result<LiveSeed, LiveDataError> {
        match self.source {
            DataSource::ElectricityMaps => electricity_maps::fetch(&self.client, key, &self.zone),
            DataSource::Eia => eia::fetch(&self.client, key, &self.respondent),
            DataSource::Simulation => Err(LiveDataError::NoData),
        }
    }

    #[cfg(not(feature = "live"))]
    fn fetch_with_key(&self, _key: &str) -> Result<LiveSeed, LiveDataError> {
        tracing::debug!(zone = %self.zone, respondent = %self.respondent, "live fetch skipped");
        Err(LiveDataError::Unavailable)
    }
}

impl SeedSource for LiveFeed {
    fn fetch(&mut self) -> Option<LiveSeed> {
        match self.try_fetch() {
            Ok(seed) => {
                if seed.is_some() {
                    tracing::debug!(source = %self.source, "live seed refreshed");
                }
                seed
            }
            Err(err) => {
                tracing::warn!(source = %self.source, %err, "live fetch failed, keeping previous seed");
                None
            }
        }
    }
}

/// Returns the response unchanged on 2xx, or [`LiveDataError::Api`].
#[cfg(feature = "live")]
pub(crate) fn ensure_success(
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, LiveDataError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(LiveDataError::Api {
        status: status.as_u16(),
        body,
    })
}
