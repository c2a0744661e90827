use chrono::{NaiveDate, Utc};
use tracing::{error, info};

use crate::config::{ReportOptions, ScoringConfig};
use crate::metrics::average_metric;
use crate::models::{
    AlertRecord, Baseline, ConversationRecord, MetricRecord, Patient, PatientAge, TemplateData,
    REPETITION_RATE, TOPIC_COHERENCE, VOCABULARY_DIVERSITY,
};
use crate::recommend::build_recommendations;
use crate::render::{error_document, Renderer};
use crate::score::cognitive_score;
use crate::store::DataStore;
use crate::trend::classify_trend;

pub const PATIENT_NOT_FOUND: &str = "Patient not found";

/// Everything fetched for one report, before any scoring.
#[derive(Debug, Clone)]
pub struct ReportInputs {
    pub patient: Patient,
    pub trends: Vec<MetricRecord>,
    pub baseline: Option<Baseline>,
    pub alerts: Vec<AlertRecord>,
    pub conversations: Vec<ConversationRecord>,
}

pub struct ReportGenerator<S, R> {
    store: S,
    renderer: R,
    scoring: ScoringConfig,
    options: ReportOptions,
}

impl<S: DataStore, R: Renderer> ReportGenerator<S, R> {
    pub fn new(store: S, renderer: R, scoring: ScoringConfig, options: ReportOptions) -> Self {
        Self {
            store,
            renderer,
            scoring,
            options,
        }
    }

    /// Fetches everything a report needs. `None` when the patient is unknown.
    pub async fn fetch_inputs(
        &self,
        patient_id: &str,
        days: u32,
    ) -> anyhow::Result<Option<ReportInputs>> {
        let Some(patient) = self.store.get_patient(patient_id).await? else {
            return Ok(None);
        };

        let (trends, baseline, alerts, conversations) = tokio::try_join!(
            self.store.get_cognitive_trends(patient_id, days),
            self.store.get_cognitive_baseline(patient_id),
            self.store.get_alerts(patient_id, self.options.alert_limit),
            self.store
                .get_conversations(patient_id, self.options.conversation_limit),
        )?;

        Ok(Some(ReportInputs {
            patient,
            trends,
            baseline,
            alerts,
            conversations,
        }))
    }

    /// Template values for today's report, or `None` for an unknown patient.
    pub async fn template(
        &self,
        patient_id: &str,
        days: u32,
    ) -> anyhow::Result<Option<TemplateData>> {
        let today = Utc::now().date_naive();
        Ok(self
            .fetch_inputs(patient_id, days)
            .await?
            .map(|inputs| assemble_template(&inputs, days, today, &self.scoring)))
    }

    /// Renders the report document. An unknown patient yields a small error
    /// document instead of an `Err`; store and renderer failures propagate.
    pub async fn generate(&self, patient_id: &str, days: u32) -> anyhow::Result<Vec<u8>> {
        info!(patient_id, days, "generating cognitive report");

        let Some(data) = self.template(patient_id, days).await? else {
            error!(patient_id, "patient not found");
            return Ok(error_document(PATIENT_NOT_FOUND));
        };

        let bytes = self.renderer.render(&data).await?;
        info!(patient_id, bytes = bytes.len(), "report generated");
        Ok(bytes)
    }
}

/// Builds the renderer's flat key set from fetched data. Pure: the same
/// inputs and date always give the same template.
pub fn assemble_template(
    inputs: &ReportInputs,
    days: u32,
    report_date: NaiveDate,
    config: &ScoringConfig,
) -> TemplateData {
    let baseline = inputs.baseline.as_ref();

    TemplateData {
        patient_name: inputs
            .patient
            .name
            .clone()
            .unwrap_or_else(|| "Unknown".to_string()),
        patient_age: inputs
            .patient
            .age
            .map(PatientAge::Years)
            .unwrap_or_default(),
        report_date,
        report_period_days: days,
        cognitive_score: cognitive_score(&inputs.trends, baseline, config),
        trend: classify_trend(&inputs.trends, config).to_string(),
        baseline_vocabulary: baseline
            .and_then(|b| b.vocabulary_diversity)
            .unwrap_or(0.0),
        baseline_coherence: baseline.and_then(|b| b.topic_coherence).unwrap_or(0.0),
        baseline_established: baseline.is_some_and(|b| b.established),
        avg_vocabulary: average_metric(&inputs.trends, VOCABULARY_DIVERSITY),
        avg_coherence: average_metric(&inputs.trends, TOPIC_COHERENCE),
        avg_repetition: average_metric(&inputs.trends, REPETITION_RATE),
        total_alerts: inputs.alerts.len(),
        high_severity_alerts: inputs
            .alerts
            .iter()
            .filter(|alert| alert.is_high_severity())
            .count(),
        total_conversations: inputs.conversations.len(),
        recommendations: build_recommendations(&inputs.trends, &inputs.alerts, baseline, config),
    }
}
