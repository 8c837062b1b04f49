use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

mod db;
mod models;
mod performance;
mod report;

use performance::ApprovalPolicy;

#[derive(Parser)]
#[command(name = "learner-performance-tracker")]
#[command(about = "Competency summaries and certificate eligibility for learner programs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import grade records from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Summarize a learner's performance in one program
    Summarize {
        #[arg(long)]
        email: String,
        #[arg(long)]
        program: String,
        /// Print the summary as JSON instead of text
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Generate a markdown performance report
    Report {
        #[arg(long)]
        email: String,
        #[arg(long)]
        program: String,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
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
            println!("Inserted {inserted} grade records from {}.", csv.display());
        }
        Commands::Summarize {
            email,
            program,
            json,
        } => {
            let records = db::fetch_records(&pool, &email, &program).await?;
            let learner_id = records
                .first()
                .map(|r| r.learner_id)
                .unwrap_or_else(uuid::Uuid::nil);
            let policy = ApprovalPolicy::default();
            let summary = performance::summarize(learner_id, &program, &records, policy);

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }

            println!(
                "{} in {}: overall {:.2}, {} of {} competencies approved ({:.1}%), trend {}",
                email,
                program,
                summary.overall_average,
                summary.approved_competencies,
                summary.total_competencies,
                summary.completion_percentage,
                summary.trend.label()
            );
            for breakdown in summary.competencies.iter() {
                println!(
                    "- {}: avg {:.2} over {} activities ({})",
                    breakdown.competency,
                    breakdown.average,
                    breakdown.record_count,
                    breakdown.status.label()
                );
            }
            println!(
                "Certificate eligible: {}",
                if performance::certificate_eligible(&summary, policy) {
                    "yes"
                } else {
                    "no"
                }
            );
        }
        Commands::Report {
            email,
            program,
            out,
        } => {
            let records = db::fetch_records(&pool, &email, &program).await?;
            let learner_id = records
                .first()
                .map(|r| r.learner_id)
                .unwrap_or_else(uuid::Uuid::nil);
            let policy = ApprovalPolicy::default();
            let summary = performance::summarize(learner_id, &program, &records, policy);
            let report = report::build_report(&summary, &records, policy);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
