use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const VOCABULARY_DIVERSITY: &str = "vocabulary_diversity";
pub const TOPIC_COHERENCE: &str = "topic_coherence";
pub const REPETITION_RATE: &str = "repetition_rate";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    pub name: Option<String>,
    pub age: Option<u32>,
}

/// One conversation's worth of measurements. A metric may be missing from the
/// map or present as `None`; both count as "not observed".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub recorded_at: DateTime<Utc>,
    pub values: BTreeMap<String, Option<f64>>,
}

impl MetricRecord {
    pub fn new(recorded_at: DateTime<Utc>) -> Self {
        Self {
            recorded_at,
            values: BTreeMap::new(),
        }
    }

    #[cfg(test)]
    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.values.insert(name.to_string(), Some(value));
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied().flatten()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub vocabulary_diversity: Option<f64>,
    pub topic_coherence: Option<f64>,
    pub repetition_rate: Option<f64>,
    pub established: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub severity: String,
    pub alert_type: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl AlertRecord {
    pub fn is_high_severity(&self) -> bool {
        self.severity == "high"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PatientAge {
    Years(u32),
    Unknown(String),
}

impl Default for PatientAge {
    fn default() -> Self {
        PatientAge::Unknown("Unknown".to_string())
    }
}

impl std::fmt::Display for PatientAge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatientAge::Years(years) => write!(f, "{years}"),
            PatientAge::Unknown(label) => f.write_str(label),
        }
    }
}

/// Flat values handed to a renderer. Every field is always populated, so the
/// serialized object carries every key a template may reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateData {
    pub patient_name: String,
    pub patient_age: PatientAge,
    pub report_date: NaiveDate,
    pub report_period_days: u32,
    pub cognitive_score: u32,
    pub trend: String,
    pub baseline_vocabulary: f64,
    pub baseline_coherence: f64,
    pub baseline_established: bool,
    pub avg_vocabulary: f64,
    pub avg_coherence: f64,
    pub avg_repetition: f64,
    pub total_alerts: usize,
    pub high_severity_alerts: usize,
    pub total_conversations: usize,
    pub recommendations: String,
}

impl TemplateData {
    /// String-valued text tags for document templates (`{{patient_name}}` etc).
    pub fn document_values(&self) -> anyhow::Result<BTreeMap<String, String>> {
        let value = serde_json::to_value(self)?;
        let object = value
            .as_object()
            .ok_or_else(|| anyhow::anyhow!("template data did not serialize to an object"))?;

        Ok(object
            .iter()
            .map(|(key, value)| {
                let text = match value {
                    serde_json::Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                (key.clone(), text)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_template() -> TemplateData {
        TemplateData {
            patient_name: "Dorothy Hale".to_string(),
            patient_age: PatientAge::Years(82),
            report_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            report_period_days: 30,
            cognitive_score: 87,
            trend: "stable".to_string(),
            baseline_vocabulary: 0.52,
            baseline_coherence: 0.81,
            baseline_established: true,
            avg_vocabulary: 0.5,
            avg_coherence: 0.79,
            avg_repetition: 0.06,
            total_alerts: 2,
            high_severity_alerts: 1,
            total_conversations: 9,
            recommendations: "• Continue regular daily conversations".to_string(),
        }
    }

    #[test]
    fn missing_and_null_metrics_read_as_absent() {
        let mut record = MetricRecord::new(Utc::now()).with(VOCABULARY_DIVERSITY, 0.4);
        record.values.insert(TOPIC_COHERENCE.to_string(), None);

        assert_eq!(record.get(VOCABULARY_DIVERSITY), Some(0.4));
        assert_eq!(record.get(TOPIC_COHERENCE), None);
        assert_eq!(record.get(REPETITION_RATE), None);
    }

    #[test]
    fn template_serializes_every_renderer_key() {
        let value = serde_json::to_value(sample_template()).unwrap();
        let object = value.as_object().unwrap();
        for key in [
            "patient_name",
            "patient_age",
            "report_date",
            "report_period_days",
            "cognitive_score",
            "trend",
            "baseline_vocabulary",
            "baseline_coherence",
            "baseline_established",
            "avg_vocabulary",
            "avg_coherence",
            "avg_repetition",
            "total_alerts",
            "high_severity_alerts",
            "total_conversations",
            "recommendations",
        ] {
            assert!(object.contains_key(key), "missing {key}");
        }
        assert_eq!(object.len(), 16);
        assert_eq!(object["report_date"], "2026-03-01");
        assert_eq!(object["patient_age"], 82);
    }

    #[test]
    fn unknown_age_serializes_as_text() {
        let mut template = sample_template();
        template.patient_age = PatientAge::default();
        let value = serde_json::to_value(&template).unwrap();
        assert_eq!(value["patient_age"], "Unknown");
    }

    #[test]
    fn document_values_are_plain_strings() {
        let values = sample_template().document_values().unwrap();
        assert_eq!(values["patient_name"], "Dorothy Hale");
        assert_eq!(values["cognitive_score"], "87");
        assert_eq!(values["baseline_established"], "true");
        assert_eq!(values["patient_age"], "82");
    }
}
