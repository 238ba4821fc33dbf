//! PlanQA CLI - run plan quality profiles against plan fixtures.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use planqa_core::{EvaluationReport, Plan, PlanningItem};
use planqa_quality::{BuiltinCheck, QualityProfile};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "planqa")]
#[command(about = "Plan quality assertion checks", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a plan against a quality profile
    Check {
        /// Plan fixture (JSON)
        #[arg(long)]
        plan: PathBuf,
        /// Quality profile (JSON)
        #[arg(long)]
        profile: PathBuf,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List built-in check names
    Checks,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check { plan, profile, json } => {
            let plan = Plan::load(&plan)
                .with_context(|| format!("Failed to load plan {}", plan.display()))?;
            let profile = QualityProfile::load(&profile)
                .with_context(|| format!("Failed to load profile {}", profile.display()))?;

            let report = profile.evaluate(&plan);
            info!("Evaluation {} finished for {}", report.id, plan.id());

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&profile, &report);
            }

            Ok(if report.passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Checks => {
            for name in BuiltinCheck::NAMES {
                println!("{name}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_report(profile: &QualityProfile, report: &EvaluationReport) {
    println!("Plan {} | profile {}", report.plan_id, profile.name);
    for (check, result) in profile.checks.iter().zip(&report.results) {
        println!("  {:<40} {}", check.name(), result);
    }

    let summary = &report.summary;
    println!(
        "Summary: {} checks, {} passed, {} not applicable, AL1 {}, AL2 {}, AL3 {}",
        summary.total,
        summary.passed,
        summary.not_applicable,
        summary.action_level_1,
        summary.action_level_2,
        summary.action_level_3,
    );
    match &report.cumulative {
        Some(result) => println!("Result: {result}"),
        None => println!("Result: no checks run"),
    }
}
