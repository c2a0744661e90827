use std::str::FromStr;

use anyhow::Context;

/// Tuning knobs for the scoring, trend and recommendation calculations.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    /// Number of most recent records used for the score and repetition check.
    pub recent_window: usize,
    /// Fewer records than this classify as insufficient data.
    pub min_trend_records: usize,
    /// Mean relative change beyond which a trend is improving or declining.
    pub trend_threshold: f64,
    /// Recent repetition rate above which storytelling is flagged.
    pub repetition_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            recent_window: 7,
            min_trend_records: 4,
            trend_threshold: 0.05,
            repetition_threshold: 0.15,
        }
    }
}

impl ScoringConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            recent_window: env_or("COGNITIVE_RECENT_WINDOW", defaults.recent_window)?,
            min_trend_records: env_or(
                "COGNITIVE_MIN_TREND_RECORDS",
                defaults.min_trend_records,
            )?,
            trend_threshold: env_or("COGNITIVE_TREND_THRESHOLD", defaults.trend_threshold)?,
            repetition_threshold: env_or(
                "COGNITIVE_REPETITION_THRESHOLD",
                defaults.repetition_threshold,
            )?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub days: u32,
    pub alert_limit: usize,
    pub conversation_limit: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            days: 30,
            alert_limit: 10,
            conversation_limit: 10,
        }
    }
}

/// Credentials for the remote document generation service.
#[derive(Debug, Clone)]
pub struct DocGenConfig {
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
    pub template_path: Option<std::path::PathBuf>,
}

pub const DEFAULT_DOCGEN_BASE_URL: &str = "https://na1.fusion.foxit.com";

impl DocGenConfig {
    /// Returns `None` unless both the client id and secret are set.
    pub fn from_env() -> Option<Self> {
        let client_id = non_empty_var("DOCGEN_CLIENT_ID")?;
        let client_secret = non_empty_var("DOCGEN_CLIENT_SECRET")?;
        Some(Self {
            client_id,
            client_secret,
            base_url: non_empty_var("DOCGEN_BASE_URL")
                .unwrap_or_else(|| DEFAULT_DOCGEN_BASE_URL.to_string()),
            template_path: non_empty_var("DOCGEN_TEMPLATE").map(Into::into),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match non_empty_var(key) {
        Some(raw) => parse_setting(key, &raw),
        None => Ok(default),
    }
}

fn parse_setting<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("{key} has an invalid value: {raw:?}"))
}
