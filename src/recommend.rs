use crate::config::ScoringConfig;
use crate::metrics::{average_metric, recent_window};
use crate::models::{AlertRecord, Baseline, MetricRecord, REPETITION_RATE};
use crate::trend::{classify_trend, Trend};

pub const BULLET: &str = "• ";

pub const CONSULT_PROVIDER: &str =
    "Consult with healthcare provider about recent high-priority alerts";
pub const SCHEDULE_ASSESSMENT: &str = "Consider scheduling cognitive assessment with doctor";
pub const INCREASE_ENGAGEMENT: &str = "Increase engagement activities and social interaction";
pub const MONITOR_REPETITION: &str = "Monitor for repetitive storytelling patterns";
pub const CONTINUE_CONVERSATIONS: &str = "Continue regular daily conversations";
pub const MAINTAIN_ROUTINE: &str = "Maintain current care routine";

/// Caregiver recommendations, most urgent first, one bullet per line.
///
/// The baseline is accepted for parity with the scoring inputs; none of the
/// current rules read it.
pub fn build_recommendations(
    trends: &[MetricRecord],
    alerts: &[AlertRecord],
    _baseline: Option<&Baseline>,
    config: &ScoringConfig,
) -> String {
    let mut lines: Vec<&str> = Vec::new();

    if alerts.iter().any(AlertRecord::is_high_severity) {
        lines.push(CONSULT_PROVIDER);
    }

    if trends.len() >= config.min_trend_records
        && classify_trend(trends, config) == Trend::Declining
    {
        lines.push(SCHEDULE_ASSESSMENT);
        lines.push(INCREASE_ENGAGEMENT);
    }

    let recent_repetition =
        average_metric(recent_window(trends, config.recent_window), REPETITION_RATE);
    if recent_repetition > config.repetition_threshold {
        lines.push(MONITOR_REPETITION);
    }

    if lines.is_empty() {
        lines.push(CONTINUE_CONVERSATIONS);
        lines.push(MAINTAIN_ROUTINE);
    }

    lines
        .iter()
        .map(|line| format!("{BULLET}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
