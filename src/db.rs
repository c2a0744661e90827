use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    AlertRecord, Baseline, ConversationRecord, MetricRecord, Patient, REPETITION_RATE,
    TOPIC_COHERENCE, VOCABULARY_DIVERSITY,
};
use crate::store::DataStore;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub fn trend_cutoff(days: u32) -> DateTime<Utc> {
    Utc::now() - Duration::days(i64::from(days))
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DataStore for PgStore {
    async fn get_patient(&self, patient_id: &str) -> anyhow::Result<Option<Patient>> {
        let row = sqlx::query("SELECT id, name, age FROM cognitive_health.patients WHERE id = $1")
            .bind(patient_id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to fetch patient")?;

        Ok(row.map(|row| {
            let age: Option<i32> = row.get("age");
            Patient {
                id: row.get("id"),
                name: row.get("name"),
                age: age.and_then(|age| u32::try_from(age).ok()),
            }
        }))
    }

    async fn get_cognitive_trends(
        &self,
        patient_id: &str,
        days: u32,
    ) -> anyhow::Result<Vec<MetricRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT recorded_at, vocabulary_diversity, topic_coherence, repetition_rate
            FROM cognitive_health.cognitive_trends
            WHERE patient_id = $1 AND recorded_at >= $2
            ORDER BY recorded_at ASC
            "#,
        )
        .bind(patient_id)
        .bind(trend_cutoff(days))
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch cognitive trends")?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let mut record = MetricRecord::new(row.get("recorded_at"));
            for name in [VOCABULARY_DIVERSITY, TOPIC_COHERENCE, REPETITION_RATE] {
                let value: Option<f64> = row.get(name);
                record.values.insert(name.to_string(), value);
            }
            records.push(record);
        }

        debug!(patient_id, days, count = records.len(), "fetched cognitive trends");
        Ok(records)
    }

    async fn get_cognitive_baseline(&self, patient_id: &str) -> anyhow::Result<Option<Baseline>> {
        let row = sqlx::query(
            r#"
            SELECT vocabulary_diversity, topic_coherence, repetition_rate, established
            FROM cognitive_health.cognitive_baselines
            WHERE patient_id = $1
            "#,
        )
        .bind(patient_id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch cognitive baseline")?;

        Ok(row.map(|row| Baseline {
            vocabulary_diversity: row.get("vocabulary_diversity"),
            topic_coherence: row.get("topic_coherence"),
            repetition_rate: row.get("repetition_rate"),
            established: row.get("established"),
        }))
    }

    async fn get_alerts(&self, patient_id: &str, limit: usize) -> anyhow::Result<Vec<AlertRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT severity, alert_type, message, created_at
            FROM cognitive_health.alerts
            WHERE patient_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(patient_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch alerts")?;

        Ok(rows
            .into_iter()
            .map(|row| AlertRecord {
                severity: row.get("severity"),
                alert_type: row.get("alert_type"),
                message: row.get("message"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn get_conversations(
        &self,
        patient_id: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<ConversationRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, started_at, summary
            FROM cognitive_health.conversations
            WHERE patient_id = $1
            ORDER BY started_at DESC
            LIMIT $2
            "#,
        )
        .bind(patient_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch conversations")?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let id: Uuid = row.get("id");
                ConversationRecord {
                    id: id.to_string(),
                    started_at: row.get("started_at"),
                    summary: row.get("summary"),
                }
            })
            .collect())
    }
}

const DEMO_PATIENT_ID: &str = "patient-001";

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO cognitive_health.patients (id, name, age)
        VALUES ($1, $2, $3)
        ON CONFLICT (id) DO UPDATE
        SET name = EXCLUDED.name, age = EXCLUDED.age
        "#,
    )
    .bind(DEMO_PATIENT_ID)
    .bind("Dorothy Hale")
    .bind(82_i32)
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO cognitive_health.cognitive_baselines
        (patient_id, vocabulary_diversity, topic_coherence, repetition_rate, established)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (patient_id) DO UPDATE
        SET vocabulary_diversity = EXCLUDED.vocabulary_diversity,
            topic_coherence = EXCLUDED.topic_coherence,
            repetition_rate = EXCLUDED.repetition_rate,
            established = EXCLUDED.established
        "#,
    )
    .bind(DEMO_PATIENT_ID)
    .bind(0.52_f64)
    .bind(0.81_f64)
    .bind(0.05_f64)
    .bind(true)
    .execute(pool)
    .await?;

    // Two weeks of daily check-ins drifting slightly downward.
    let today = Utc::now();
    for day in 0..14_i64 {
        let drift = day as f64 * 0.004;
        let recorded_at = today - Duration::days(14 - day);
        sqlx::query(
            r#"
            INSERT INTO cognitive_health.cognitive_trends
            (id, patient_id, recorded_at, vocabulary_diversity, topic_coherence,
             repetition_rate, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(DEMO_PATIENT_ID)
        .bind(recorded_at)
        .bind(0.54 - drift)
        .bind(0.82 - drift)
        .bind(0.05 + drift / 2.0)
        .bind(format!("seed-trend-{day:03}"))
        .execute(pool)
        .await?;
    }

    let alerts = [
        ("seed-alert-001", "medium", "repetition", "Retold the same story twice in one call", 5),
        ("seed-alert-002", "high", "confusion", "Unsure of the current day during check-in", 2),
    ];
    for (source_key, severity, alert_type, message, days_ago) in alerts {
        sqlx::query(
            r#"
            INSERT INTO cognitive_health.alerts
            (id, patient_id, severity, alert_type, message, created_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(DEMO_PATIENT_ID)
        .bind(severity)
        .bind(alert_type)
        .bind(message)
        .bind(today - Duration::days(days_ago))
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    let conversations = [
        ("seed-conv-001", "Talked about the garden and her granddaughter's visit", 3),
        ("seed-conv-002", "Morning check-in, asked twice about lunch plans", 2),
        ("seed-conv-003", "Recalled a trip to the coast in detail", 1),
    ];
    for (source_key, summary, days_ago) in conversations {
        sqlx::query(
            r#"
            INSERT INTO cognitive_health.conversations
            (id, patient_id, started_at, summary, source_key)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(DEMO_PATIENT_ID)
        .bind(today - Duration::days(days_ago))
        .bind(summary)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    Ok(())
}

#[derive(Debug, serde::Deserialize)]
pub struct MetricCsvRow {
    pub patient_id: String,
    pub recorded_at: DateTime<Utc>,
    pub vocabulary_diversity: Option<f64>,
    pub topic_coherence: Option<f64>,
    pub repetition_rate: Option<f64>,
    pub source_key: Option<String>,
}

pub fn read_metric_csv(csv_path: &std::path::Path) -> anyhow::Result<Vec<MetricCsvRow>> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    parse_metric_rows(&mut reader)
}

fn parse_metric_rows<R: std::io::Read>(
    reader: &mut csv::Reader<R>,
) -> anyhow::Result<Vec<MetricCsvRow>> {
    let mut rows = Vec::new();
    for (index, result) in reader.deserialize::<MetricCsvRow>().enumerate() {
        rows.push(result.with_context(|| format!("invalid metric row {}", index + 1))?);
    }
    Ok(rows)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let rows = read_metric_csv(csv_path)?;
    let mut inserted = 0usize;

    for row in rows {
        sqlx::query(
            r#"
            INSERT INTO cognitive_health.patients (id)
            VALUES ($1)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&row.patient_id)
        .execute(pool)
        .await?;

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO cognitive_health.cognitive_trends
            (id, patient_id, recorded_at, vocabulary_diversity, topic_coherence,
             repetition_rate, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.patient_id)
        .bind(row.recorded_at)
        .bind(row.vocabulary_diversity)
        .bind(row.topic_coherence)
        .bind(row.repetition_rate)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}
