use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Environment variable overriding [`Settings::api_url`].
pub const ENV_API_URL: &str = "PORTFOLIO_API_URL";

/// Environment variable overriding [`Settings::request_timeout_secs`].
pub const ENV_REQUEST_TIMEOUT: &str = "PORTFOLIO_REQUEST_TIMEOUT_SECS";

/// How the length of a price series is converted into years when
/// estimating an annual return.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Annualization {
    /// `years = samples / per_year`. The backend serves monthly closes,
    /// so the default is 12 samples per year.
    SampleCount { per_year: f64 },
    /// `years` from the calendar span between the first and last sample.
    DateSpan,
}

impl Default for Annualization {
    fn default() -> Self {
        Annualization::SampleCount { per_year: 12.0 }
    }
}

/// Client configuration. Missing fields take their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the portfolio backend (no trailing slash needed)
    pub api_url: String,

    /// Per-request timeout, native targets only
    pub request_timeout_secs: u64,

    /// Annualization used by the historical return estimator
    pub annualization: Annualization,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 30,
            annualization: Annualization::default(),
        }
    }
}

impl Settings {
    /// Defaults overlaid with `PORTFOLIO_API_URL` / `PORTFOLIO_REQUEST_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Settings::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let mut settings = Self::default();

        if let Some(url) = lookup(ENV_API_URL) {
            settings.api_url = url;
        }
        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT) {
            settings.request_timeout_secs = raw.trim().parse().map_err(|_| {
                CoreError::Validation(format!(
                    "{ENV_REQUEST_TIMEOUT} must be a whole number of seconds, got '{raw}'"
                ))
            })?;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the client cannot work with.
    pub fn validate(&self) -> Result<(), CoreError> {
        let url = self.api_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CoreError::Validation(format!(
                "API URL '{}' must start with http:// or https://",
                self.api_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(CoreError::Validation(
                "Request timeout must be at least 1 second".into(),
            ));
        }
        if let Annualization::SampleCount { per_year } = self.annualization {
            if !per_year.is_finite() || per_year <= 0.0 {
                return Err(CoreError::Validation(format!(
                    "Samples per year must be positive, got {per_year}"
                )));
            }
        }
        Ok(())
    }

    /// `api_url` without a trailing slash, ready for joining paths.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.api_url.trim().trim_end_matches('/')
    }
}
