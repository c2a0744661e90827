use std::fmt;

use serde::Serialize;

use crate::config::ScoringConfig;
use crate::metrics::average_metric;
use crate::models::{MetricRecord, TOPIC_COHERENCE, VOCABULARY_DIVERSITY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    InsufficientData,
    Improving,
    Declining,
    Stable,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Trend::InsufficientData => "insufficient_data",
            Trend::Improving => "improving",
            Trend::Declining => "declining",
            Trend::Stable => "stable",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compares the older half of the history with the newer half.
///
/// The split index is `len / 2`, so with an odd count the extra record lands
/// in the newer half. Changes exactly at the threshold count as stable.
pub fn classify_trend(trends: &[MetricRecord], config: &ScoringConfig) -> Trend {
    if trends.len() < config.min_trend_records {
        return Trend::InsufficientData;
    }

    let (first_half, second_half) = trends.split_at(trends.len() / 2);

    let vocab_change = relative_change(
        average_metric(first_half, VOCABULARY_DIVERSITY),
        average_metric(second_half, VOCABULARY_DIVERSITY),
    );
    let coherence_change = relative_change(
        average_metric(first_half, TOPIC_COHERENCE),
        average_metric(second_half, TOPIC_COHERENCE),
    );
    let avg_change = (vocab_change + coherence_change) / 2.0;

    if avg_change > config.trend_threshold {
        Trend::Improving
    } else if avg_change < -config.trend_threshold {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

fn relative_change(before: f64, after: f64) -> f64 {
    if before > 0.0 {
        (after - before) / before
    } else {
        0.0
    }
}
