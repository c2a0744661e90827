use crate::config::ScoringConfig;
use crate::metrics::{average_metric, recent_window};
use crate::models::{
    Baseline, MetricRecord, REPETITION_RATE, TOPIC_COHERENCE, VOCABULARY_DIVERSITY,
};

pub const DEFAULT_VOCABULARY_BASELINE: f64 = 0.5;
pub const DEFAULT_COHERENCE_BASELINE: f64 = 0.8;
pub const DEFAULT_REPETITION_BASELINE: f64 = 0.05;

const VOCABULARY_WEIGHT: f64 = 0.4;
const COHERENCE_WEIGHT: f64 = 0.4;
const REPETITION_WEIGHT: f64 = 0.2;
const NEUTRAL_COMPONENT: f64 = 50.0;

/// Scores recent performance against the patient's own baseline, 0 to 100.
///
/// Without trend data or an established baseline the score is 0.
pub fn cognitive_score(
    trends: &[MetricRecord],
    baseline: Option<&Baseline>,
    config: &ScoringConfig,
) -> u32 {
    let baseline = match baseline {
        Some(baseline) if baseline.established && !trends.is_empty() => baseline,
        _ => return 0,
    };

    let recent = recent_window(trends, config.recent_window);
    let vocab_avg = average_metric(recent, VOCABULARY_DIVERSITY);
    let coherence_avg = average_metric(recent, TOPIC_COHERENCE);
    let repetition_avg = average_metric(recent, REPETITION_RATE);

    let vocab_baseline = baseline
        .vocabulary_diversity
        .unwrap_or(DEFAULT_VOCABULARY_BASELINE);
    let coherence_baseline = baseline
        .topic_coherence
        .unwrap_or(DEFAULT_COHERENCE_BASELINE);
    let repetition_baseline = baseline
        .repetition_rate
        .unwrap_or(DEFAULT_REPETITION_BASELINE);

    let vocab_score = capped_ratio_score(vocab_avg, vocab_baseline);
    let coherence_score = capped_ratio_score(coherence_avg, coherence_baseline);
    // Lower repetition is better: inverted, floored at 0, not capped.
    let repetition_score = if repetition_baseline > 0.0 {
        (100.0 - repetition_avg / repetition_baseline * 100.0).max(0.0)
    } else {
        NEUTRAL_COMPONENT
    };

    let overall = vocab_score * VOCABULARY_WEIGHT
        + coherence_score * COHERENCE_WEIGHT
        + repetition_score * REPETITION_WEIGHT;

    // `as` truncates toward zero and saturates negatives at 0.
    (overall as u32).min(100)
}

fn capped_ratio_score(average: f64, baseline: f64) -> f64 {
    if baseline > 0.0 {
        (average / baseline * 100.0).min(100.0)
    } else {
        NEUTRAL_COMPONENT
    }
}
