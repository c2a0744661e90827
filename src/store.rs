use async_trait::async_trait;

use crate::models::{AlertRecord, Baseline, ConversationRecord, MetricRecord, Patient};

/// Read access to everything a report needs about one patient.
///
/// Absence is data, not failure: a missing patient or baseline is `Ok(None)`
/// and empty histories are empty vectors. `Err` means the store itself failed.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn get_patient(&self, patient_id: &str) -> anyhow::Result<Option<Patient>>;

    /// Metric records from the last `days` days, oldest first.
    async fn get_cognitive_trends(
        &self,
        patient_id: &str,
        days: u32,
    ) -> anyhow::Result<Vec<MetricRecord>>;

    async fn get_cognitive_baseline(&self, patient_id: &str) -> anyhow::Result<Option<Baseline>>;

    /// Most recent alerts first.
    async fn get_alerts(&self, patient_id: &str, limit: usize) -> anyhow::Result<Vec<AlertRecord>>;

    /// Most recent conversations first.
    async fn get_conversations(
        &self,
        patient_id: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<ConversationRecord>>;
}
