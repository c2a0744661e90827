use std::io::BufWriter;
use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use base64::Engine;
use printpdf::{BuiltinFont, Mm, PdfDocument};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::DocGenConfig;
use crate::models::TemplateData;

const GENERATE_PATH: &str = "/document-generation/api/GenerateDocumentBase64";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Turns assembled template values into a finished document.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, data: &TemplateData) -> anyhow::Result<Vec<u8>>;
}

/// Lays the report out locally as a single-page PDF.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfRenderer;

#[async_trait]
impl Renderer for PdfRenderer {
    async fn render(&self, data: &TemplateData) -> anyhow::Result<Vec<u8>> {
        render_report_pdf(data)
    }
}

pub fn render_report_pdf(data: &TemplateData) -> anyhow::Result<Vec<u8>> {
    let (doc, page1, layer1) =
        PdfDocument::new("Cognitive Health Report", Mm(210.0), Mm(297.0), "Layer 1");
    let layer = doc.get_page(page1).get_layer(layer1);
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| anyhow!("PDF font error: {e}"))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| anyhow!("PDF font error: {e}"))?;

    let mut y = Mm(280.0);

    layer.use_text("Cognitive Health Report", 18.0, Mm(20.0), y, &bold);
    y -= Mm(8.0);
    layer.use_text(
        format!(
            "Report date: {}  |  Period: last {} days",
            data.report_date, data.report_period_days
        ),
        9.0,
        Mm(20.0),
        y,
        &font,
    );
    y -= Mm(12.0);

    layer.use_text("PATIENT", 11.0, Mm(20.0), y, &bold);
    y -= Mm(6.0);
    for line in [
        format!("Name: {}", data.patient_name),
        format!("Age: {}", data.patient_age),
    ] {
        layer.use_text(line, 10.0, Mm(25.0), y, &font);
        y -= Mm(5.0);
    }
    y -= Mm(6.0);

    layer.use_text("COGNITIVE SUMMARY", 11.0, Mm(20.0), y, &bold);
    y -= Mm(6.0);
    for line in [
        format!("Overall cognitive score: {}/100", data.cognitive_score),
        format!("Trend: {}", trend_label(&data.trend)),
        format!(
            "Vocabulary diversity: {:.2} (baseline {:.2})",
            data.avg_vocabulary, data.baseline_vocabulary
        ),
        format!(
            "Topic coherence: {:.2} (baseline {:.2})",
            data.avg_coherence, data.baseline_coherence
        ),
        format!("Repetition rate: {:.2}", data.avg_repetition),
        format!(
            "Baseline established: {}",
            if data.baseline_established { "yes" } else { "no" }
        ),
    ] {
        layer.use_text(line, 10.0, Mm(25.0), y, &font);
        y -= Mm(5.0);
    }
    y -= Mm(6.0);

    layer.use_text("ACTIVITY", 11.0, Mm(20.0), y, &bold);
    y -= Mm(6.0);
    for line in [
        format!("Conversations reviewed: {}", data.total_conversations),
        format!(
            "Alerts: {} ({} high severity)",
            data.total_alerts, data.high_severity_alerts
        ),
    ] {
        layer.use_text(line, 10.0, Mm(25.0), y, &font);
        y -= Mm(5.0);
    }
    y -= Mm(6.0);

    layer.use_text("RECOMMENDATIONS", 11.0, Mm(20.0), y, &bold);
    y -= Mm(6.0);
    for recommendation in data.recommendations.lines() {
        for line in wrap_text(recommendation, 90) {
            layer.use_text(line, 10.0, Mm(25.0), y, &font);
            y -= Mm(5.0);
        }
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| anyhow!("PDF save error: {e}"))?;
    buf.into_inner()
        .map_err(|e| anyhow!("PDF buffer error: {e}"))
}

fn trend_label(trend: &str) -> String {
    match trend {
        "insufficient_data" => "Insufficient data".to_string(),
        other => {
            let mut chars = other.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}

fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Minimal one-line PDF returned in place of a report. Byte-for-byte stable
/// for a given message.
pub fn error_document(message: &str) -> Vec<u8> {
    let escaped = message
        .replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)");
    let stream = format!("BT /F1 12 Tf 50 700 Td (Error: {escaped}) Tj ET");
    format!(
        "%PDF-1.4\n\
         1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n\
         2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n\
         3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Resources << /Font << /F1 << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> >> >> \
         /Contents 4 0 R >> endobj\n\
         4 0 obj << /Length {} >>\nstream\n{}\nendstream\nendobj\n\
         trailer << /Size 5 /Root 1 0 R >>\n%%EOF\n",
        stream.len(),
        stream
    )
    .into_bytes()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    output_format: &'a str,
    currency_culture: &'a str,
    document_values: std::collections::BTreeMap<String, String>,
    base64_file_string: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    base64_file_string: String,
}

/// Fills a DOCX template through a remote document generation API.
///
/// Any failure on the remote side falls back to the local PDF layout, so a
/// caregiver always receives a document.
pub struct DocumentGenerationRenderer {
    client: reqwest::Client,
    base_url: String,
    template_base64: Option<String>,
    fallback: PdfRenderer,
}

impl DocumentGenerationRenderer {
    pub fn new(config: &DocGenConfig) -> anyhow::Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "client_id",
            config
                .client_id
                .parse()
                .context("client id is not a valid header value")?,
        );
        headers.insert(
            "client_secret",
            config
                .client_secret
                .parse()
                .context("client secret is not a valid header value")?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build document generation client")?;

        let template_base64 = match &config.template_path {
            Some(path) => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("failed to read template {}", path.display()))?;
                Some(base64::engine::general_purpose::STANDARD.encode(bytes))
            }
            None => None,
        };

        info!(base_url = %config.base_url, "document generation renderer configured");
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            template_base64,
            fallback: PdfRenderer,
        })
    }

    async fn generate_remote(
        &self,
        data: &TemplateData,
        template: &str,
    ) -> anyhow::Result<Vec<u8>> {
        let request = GenerateRequest {
            output_format: "pdf",
            currency_culture: "en-US",
            document_values: data.document_values()?,
            base64_file_string: template,
        };

        let response = self
            .client
            .post(format!("{}{GENERATE_PATH}", self.base_url))
            .json(&request)
            .send()
            .await
            .context("document generation request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("document generation returned {status}: {body}");
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .context("document generation response was not valid JSON")?;
        if parsed.base64_file_string.is_empty() {
            anyhow::bail!("document generation returned an empty document");
        }

        base64::engine::general_purpose::STANDARD
            .decode(parsed.base64_file_string)
            .context("document generation returned invalid base64")
    }
}

#[async_trait]
impl Renderer for DocumentGenerationRenderer {
    async fn render(&self, data: &TemplateData) -> anyhow::Result<Vec<u8>> {
        let Some(template) = &self.template_base64 else {
            info!("no document template configured, using local PDF layout");
            return self.fallback.render(data).await;
        };

        match self.generate_remote(data, template).await {
            Ok(bytes) => {
                info!(bytes = bytes.len(), "generated report document");
                Ok(bytes)
            }
            Err(err) => {
                warn!(error = %err, "document generation failed, using local PDF layout");
                self.fallback.render(data).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PatientAge;
    use chrono::NaiveDate;

    fn sample_template() -> TemplateData {
        TemplateData {
            patient_name: "Dorothy Hale".to_string(),
            patient_age: PatientAge::Years(82),
            report_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            report_period_days: 30,
            cognitive_score: 74,
            trend: "declining".to_string(),
            baseline_vocabulary: 0.52,
            baseline_coherence: 0.81,
            baseline_established: true,
            avg_vocabulary: 0.47,
            avg_coherence: 0.74,
            avg_repetition: 0.08,
            total_alerts: 2,
            high_severity_alerts: 1,
            total_conversations: 6,
            recommendations: "• Consider scheduling cognitive assessment with doctor\n\
                              • Increase engagement activities and social interaction"
                .to_string(),
        }
    }

    fn docgen_config(template_path: Option<std::path::PathBuf>) -> DocGenConfig {
        DocGenConfig {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
            template_path,
        }
    }

    #[tokio::test]
    async fn local_renderer_produces_a_pdf() {
        let bytes = PdfRenderer.render(&sample_template()).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn error_document_is_small_and_stable() {
        let first = error_document("Patient not found");
        let second = error_document("Patient not found");
        assert_eq!(first, second);
        assert!(first.starts_with(b"%PDF-1.4"));
        let text = String::from_utf8(first).unwrap();
        assert!(text.contains("(Error: Patient not found)"));
    }

    #[test]
    fn error_document_escapes_parentheses() {
        let text = String::from_utf8(error_document("bad (id)")).unwrap();
        assert!(text.contains("(Error: bad \\(id\\))"));
    }

    #[test]
    fn wraps_long_lines_on_word_boundaries() {
        let lines = wrap_text("one two three four", 9);
        assert_eq!(lines, vec!["one two", "three", "four"]);
        assert!(wrap_text("", 10).is_empty());
    }

    #[test]
    fn trend_labels_read_naturally() {
        assert_eq!(trend_label("insufficient_data"), "Insufficient data");
        assert_eq!(trend_label("stable"), "Stable");
    }

    #[tokio::test]
    async fn docgen_without_template_uses_local_layout() {
        let renderer = DocumentGenerationRenderer::new(&docgen_config(None)).unwrap();
        let bytes = renderer.render(&sample_template()).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn docgen_falls_back_when_service_is_unreachable() {
        let file_name = format!("report-template-{}.docx", uuid::Uuid::new_v4());
        let path = std::env::temp_dir().join(file_name);
        std::fs::write(&path, b"not really a docx").unwrap();

        let renderer = DocumentGenerationRenderer::new(&docgen_config(Some(path.clone()))).unwrap();
        let bytes = renderer.render(&sample_template()).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn request_uses_camel_case_fields() {
        let request = GenerateRequest {
            output_format: "pdf",
            currency_culture: "en-US",
            document_values: sample_template().document_values().unwrap(),
            base64_file_string: "AAAA",
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["outputFormat"], "pdf");
        assert_eq!(value["base64FileString"], "AAAA");
        assert_eq!(value["documentValues"]["cognitive_score"], "74");
    }
}
