//! Negotiation narrator seam.
//!
//! A [`Narrator`] turns an anomaly into a short multi-agent transcript and a
//! recommended corrective action. The engine never talks to a narrator
//! directly: callers resolve a trigger through [`narrate_or_fallback`] and
//! hand the result back, which keeps the engine synchronous and testable.

pub mod prompt;
pub mod scripted;

#[cfg(feature = "live")]
pub mod gemini;

use serde::{Deserialize, Serialize};

use crate::sim::actions::FALLBACK_ACTION;
use crate::sim::anomaly::{Anomaly, AnomalyThresholds};
use crate::sim::types::{AgentRole, MetricSample};

pub use scripted::ScriptedNarrator;

/// Default generative model for the HTTP narrator.
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Returned when a summary call succeeds but produces no text.
pub const EMPTY_REPORT_FALLBACK: &str = "Report generation failed.";
/// Returned when a summary call fails outright.
pub const FAILED_REPORT_FALLBACK: &str = "Error generating report.";

/// Everything a narrator sees about an incident.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NarrationRequest {
    /// Sample that tripped the threshold.
    pub sample: MetricSample,
    pub anomaly: Anomaly,
    /// Thresholds in force at trigger time.
    pub thresholds: AnomalyThresholds,
    /// Optimization bias (0-100) at trigger time.
    pub bias: f64,
}

/// One transcript line before it is stamped into the agent log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentLine {
    pub role: AgentRole,
    pub message: String,
}

impl AgentLine {
    pub fn new(role: AgentRole, message: impl Into<String>) -> Self {
        Self {
            role,
            message: message.into(),
        }
    }
}

/// Narrator output: a transcript and the action it recommends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Narration {
    pub transcript: Vec<AgentLine>,
    /// Corrective action name; unknown names are applied as a no-op.
    pub action: String,
}

impl Narration {
    /// Empty transcript recommending `IGNORE`.
    pub fn fallback() -> Self {
        Self {
            transcript: Vec::new(),
            action: FALLBACK_ACTION.to_string(),
        }
    }
}

/// Errors from a narrator backend.
#[derive(Debug, thiserror::Error)]
pub enum NarrationError {
    /// No API key was configured for a remote narrator.
    #[error("narrator API key missing")]
    MissingApiKey,

    /// The narrator was requested but this build lacks the `live` feature.
    #[error("narrator \"{0}\" requires the `live` feature")]
    Unavailable(&'static str),

    /// The HTTP request itself failed.
    #[cfg(feature = "live")]
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("narrator API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The response could not be interpreted.
    #[error("malformed narrator response: {0}")]
    Malformed(String),
}

/// Produces negotiation transcripts and compliance summaries.
pub trait Narrator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Narrates the negotiation for one anomaly.
    ///
    /// # Errors
    ///
    /// Backend-specific; callers normally go through [`narrate_or_fallback`].
    fn narrate(&self, request: &NarrationRequest) -> Result<Narration, NarrationError>;

    /// Writes a brief compliance summary for the current state.
    ///
    /// # Errors
    ///
    /// Backend-specific; callers normally go through [`summary_or_fallback`].
    fn compliance_summary(&self, sample: &MetricSample) -> Result<String, NarrationError>;
}

/// Which narrator backend to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum NarratorKind {
    /// Deterministic local transcripts.
    #[default]
    Scripted,
    /// Generative Language API (requires the `live` feature and a key).
    Gemini,
}

impl NarratorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scripted => "scripted",
            Self::Gemini => "gemini",
        }
    }
}

/// Builds a narrator.
///
/// A remote backend that cannot be configured (no key, or compiled out) is
/// replaced by an [`UnconfiguredNarrator`], so every negotiation degrades to
/// the `IGNORE` fallback instead of stopping the run.
///
/// # Arguments
///
/// * `kind` - Backend to build
/// * `model` - Model identifier for remote backends
/// * `api_key` - Key for remote backends
pub fn build_narrator(kind: NarratorKind, model: &str, api_key: Option<String>) -> Box<dyn Narrator> {
    match kind {
        NarratorKind::Scripted => Box::new(ScriptedNarrator),
        NarratorKind::Gemini => build_gemini(model, api_key),
    }
}

#[cfg(feature = "live")]
fn build_gemini(model: &str, api_key: Option<String>) -> Box<dyn Narrator> {
    match api_key.filter(|k| !k.trim().is_empty()) {
        Some(key) => Box::new(gemini::GeminiNarrator::new(key, model.to_string())),
        None => {
            tracing::warn!("GEMINI_API_KEY not set, negotiations will recommend IGNORE");
            Box::new(UnconfiguredNarrator { missing_key: true })
        }
    }
}

#[cfg(not(feature = "live"))]
fn build_gemini(_model: &str, _api_key: Option<String>) -> Box<dyn Narrator> {
    tracing::warn!("built without the `live` feature, negotiations will recommend IGNORE");
    Box::new(UnconfiguredNarrator { missing_key: false })
}

/// Stand-in for a remote narrator that could not be set up.
///
/// Every call fails with the configuration error.
#[derive(Debug, Clone, Copy)]
pub struct UnconfiguredNarrator {
    missing_key: bool,
}

impl UnconfiguredNarrator {
    fn error(&self) -> NarrationError {
        if self.missing_key {
            NarrationError::MissingApiKey
        } else {
            NarrationError::Unavailable("gemini")
        }
    }
}

impl Narrator for UnconfiguredNarrator {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn narrate(&self, _request: &NarrationRequest) -> Result<Narration, NarrationError> {
        Err(self.error())
    }

    fn compliance_summary(&self, _sample: &MetricSample) -> Result<String, NarrationError> {
        Err(self.error())
    }
}

/// Narrates `request`, degrading to [`Narration::fallback`] on any error.
pub fn narrate_or_fallback(narrator: &dyn Narrator, request: &NarrationRequest) -> Narration {
    match narrator.narrate(request) {
        Ok(narration) => narration,
        Err(err) => {
            tracing::warn!(narrator = narrator.name(), %err, "negotiation failed, recommending IGNORE");
            Narration::fallback()
        }
    }
}

/// Produces a compliance summary, substituting the fixed fallback texts.
pub fn summary_or_fallback(narrator: &dyn Narrator, sample: &MetricSample) -> String {
    match narrator.compliance_summary(sample) {
        Ok(text) if text.trim().is_empty() => EMPTY_REPORT_FALLBACK.to_string(),
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(narrator = narrator.name(), %err, "compliance summary failed");
            FAILED_REPORT_FALLBACK.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::types::WeatherForecast;

    struct Broken;

    impl Narrator for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn narrate(&self, _request: &NarrationRequest) -> Result<Narration, NarrationError> {
            Err(NarrationError::Malformed("no logs".into()))
        }

        fn compliance_summary(&self, _sample: &MetricSample) -> Result<String, NarrationError> {
            Err(NarrationError::MissingApiKey)
        }
    }

    struct Mute;

    impl Narrator for Mute {
        fn name(&self) -> &'static str {
            "mute"
        }

        fn narrate(&self, _request: &NarrationRequest) -> Result<Narration, NarrationError> {
            Ok(Narration::fallback())
        }

        fn compliance_summary(&self, _sample: &MetricSample) -> Result<String, NarrationError> {
            Ok("   ".into())
        }
    }

    fn request() -> NarrationRequest {
        NarrationRequest {
            sample: MetricSample {
                tick: 4,
                timestamp_ms: 8000,
                load_kw: 500.0,
                solar_kw: 100.0,
                wind_kw: 100.0,
                grid_supply_kw: 300.0,
                battery_discharge_kw: 0.0,
                voltage_v: 205.0,
                frequency_hz: 49.8,
                co2_intensity: 250.0,
                cost_per_kwh: 0.14,
                weather_forecast: WeatherForecast::Clear,
                accumulated_co2_saved_kg: 2.0,
                is_live: false,
            },
            anomaly: Anomaly::VoltageDrop { limit_percent: 9.0 },
            thresholds: AnomalyThresholds::default(),
            bias: 50.0,
        }
    }

    #[test]
    fn failing_narrator_degrades_to_ignore() {
        let narration = narrate_or_fallback(&Broken, &request());
        assert!(narration.transcript.is_empty());
        assert_eq!(narration.action, "IGNORE");
    }

    #[test]
    fn summary_fallbacks() {
        let sample = request().sample;
        assert_eq!(summary_or_fallback(&Broken, &sample), FAILED_REPORT_FALLBACK);
        assert_eq!(summary_or_fallback(&Mute, &sample), EMPTY_REPORT_FALLBACK);
    }

    #[test]
    fn scripted_narrator_always_builds() {
        let narrator = build_narrator(NarratorKind::Scripted, DEFAULT_MODEL, None);
        assert_eq!(narrator.name(), "scripted");
    }

    #[test]
    fn gemini_without_key_degrades_to_ignore() {
        let narrator = build_narrator(NarratorKind::Gemini, DEFAULT_MODEL, Some("  ".into()));
        assert_eq!(narrator.name(), "gemini");

        let narration = narrate_or_fallback(narrator.as_ref(), &request());
        assert!(narration.transcript.is_empty());
        assert_eq!(narration.action, "IGNORE");
        assert_eq!(
            summary_or_fallback(narrator.as_ref(), &request().sample),
            FAILED_REPORT_FALLBACK
        );
    }
}
