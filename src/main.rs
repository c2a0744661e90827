use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod metrics;
mod models;
mod recommend;
mod render;
mod report;
mod score;
mod store;
mod trend;

use config::{DocGenConfig, ReportOptions, ScoringConfig};
use db::PgStore;
use render::{DocumentGenerationRenderer, PdfRenderer, Renderer};
use report::ReportGenerator;

#[derive(Parser)]
#[command(name = "cognitive-report")]
#[command(about = "Cognitive health summaries for caregivers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a realistic demo patient
    Seed,
    /// Import conversation metrics from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print the score, trend and recommendations for a patient
    Score {
        #[arg(long)]
        patient: String,
        #[arg(long, default_value_t = ReportOptions::default().days)]
        since_days: u32,
        /// Print the full template values as JSON
        #[arg(long)]
        json: bool,
    },
    /// Render the caregiver report document
    Report {
        #[arg(long)]
        patient: String,
        #[arg(long, default_value_t = ReportOptions::default().days)]
        since_days: u32,
        #[arg(long, default_value = "report.pdf")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} metric records from {}.", csv.display());
        }
        Commands::Score {
            patient,
            since_days,
            json,
        } => {
            let generator = report_generator(pool, PdfRenderer)?;
            let Some(data) = generator.template(&patient, since_days).await? else {
                println!("No patient found with id {patient}.");
                return Ok(());
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&data)?);
                return Ok(());
            }

            println!(
                "{} (age {}) over the last {} days",
                data.patient_name, data.patient_age, data.report_period_days
            );
            println!("Cognitive score: {}/100", data.cognitive_score);
            println!("Trend: {}", data.trend);
            println!(
                "Alerts: {} ({} high), conversations: {}",
                data.total_alerts, data.high_severity_alerts, data.total_conversations
            );
            println!("Recommendations:");
            println!("{}", data.recommendations);
        }
        Commands::Report {
            patient,
            since_days,
            out,
        } => {
            let bytes = match DocGenConfig::from_env() {
                Some(docgen) => {
                    let renderer = DocumentGenerationRenderer::new(&docgen)?;
                    report_generator(pool, renderer)?
                        .generate(&patient, since_days)
                        .await?
                }
                None => {
                    info!("document generation credentials not set, rendering locally");
                    report_generator(pool, PdfRenderer)?
                        .generate(&patient, since_days)
                        .await?
                }
            };
            std::fs::write(&out, &bytes)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {} ({} bytes).", out.display(), bytes.len());
        }
    }

    Ok(())
}

fn report_generator<R: Renderer>(
    pool: sqlx::PgPool,
    renderer: R,
) -> anyhow::Result<ReportGenerator<PgStore, R>> {
    let scoring = ScoringConfig::from_env()?;
    Ok(ReportGenerator::new(
        PgStore::new(pool),
        renderer,
        scoring,
        ReportOptions::default(),
    ))
}
