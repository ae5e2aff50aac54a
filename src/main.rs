//! ckd-sentinel CLI
//!
//! Usage:
//!   ckd-sentinel [--config <file>] assess --input <request.json> [--patient-id <id> --patient-name <name>]
//!   ckd-sentinel [--config <file>] alerts --input <alerts.json> [--patient-id <id>] [--query <q>] [--priority <p>] [--category <c>]
//!   ckd-sentinel [--config <file>] history --input <visits.json> --patient-id <id>

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ckd_sentinel_lib::alerts::{self, AlertError, AlertGenerator, PatientRef, PriorityCounts};
use ckd_sentinel_lib::clinical::{self, Assessment, AssessmentRequest};
use ckd_sentinel_lib::config::{ConfigError, EngineConfig, APP_NAME, APP_VERSION};
use ckd_sentinel_lib::history::{
    self, DeclineFinding, Demographics, SourceError, TimelinePoint, VisitRecord, VisitSource,
};
use ckd_sentinel_lib::models::{Alert, AlertFilter, CategoryFilter, PriorityFilter};
use ckd_sentinel_lib::patient_cache::{CacheError, PatientHistoryCache};

#[derive(Parser)]
#[command(name = "ckd-sentinel")]
#[command(version)]
#[command(about = "CKD risk classification and alert feed", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine config (JSON). Defaults are used when omitted.
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify one set of labs and print the follow-up plan
    Assess {
        /// Assessment request (JSON)
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Raise alerts for this patient id
        #[arg(long, requires = "patient_name")]
        patient_id: Option<String>,

        #[arg(long, requires = "patient_id")]
        patient_name: Option<String>,
    },

    /// Filter and summarize an alert snapshot
    Alerts {
        /// JSON array of alerts
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Case-insensitive text search
        #[arg(short, long)]
        query: Option<String>,

        /// "all", Critical, High, Medium or Low
        #[arg(short, long, default_value = "all")]
        priority: PriorityFilter,

        /// "all", Risk, Test, Prediction, Medication or Referral
        #[arg(long, default_value = "all")]
        category: CategoryFilter,

        /// Only this patient's alerts
        #[arg(long)]
        patient_id: Option<String>,
    },

    /// Build a patient's eGFR/uACR timeline and check for rapid decline
    History {
        /// Patients and visits (JSON)
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        #[arg(long)]
        patient_id: String,
    },
}

#[derive(Error, Debug)]
enum CliError {
    #[error("Failed to read {0}: {1}")]
    Read(String, String),

    #[error("Invalid JSON in {0}: {1}")]
    Json(String, String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Alert(#[from] AlertError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Unknown patient: {0}")]
    UnknownPatient(String),
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, CliError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| CliError::Read(path.display().to_string(), e.to_string()))?;
    serde_json::from_str(&raw).map_err(|e| CliError::Json(path.display().to_string(), e.to_string()))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::Json("output".into(), e.to_string()))?;
    println!("{out}");
    Ok(())
}

// ---------------------------------------------------------------------------
// assess
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct AssessOutput {
    assessment: Assessment,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    alerts: Vec<Alert>,
}

fn run_assess(
    config: &EngineConfig,
    input: &Path,
    patient: Option<PatientRef>,
    now: DateTime<Utc>,
) -> Result<(), CliError> {
    let request: AssessmentRequest = read_json(input)?;
    let assessment = clinical::assess(&request, config);

    let alerts = match patient {
        Some(p) => AlertGenerator::new(config).from_assessment(&p, &request, &assessment, now)?,
        None => Vec::new(),
    };

    print_json(&AssessOutput { assessment, alerts })
}

// ---------------------------------------------------------------------------
// alerts
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct FeedOutput<'a> {
    summary: PriorityCounts,
    expired: usize,
    active: Vec<&'a Alert>,
    acknowledged: Vec<&'a Alert>,
}

fn run_alerts(
    input: &Path,
    patient_id: Option<&str>,
    filter: &AlertFilter,
    now: DateTime<Utc>,
) -> Result<(), CliError> {
    let raw = std::fs::read_to_string(input)
        .map_err(|e| CliError::Read(input.display().to_string(), e.to_string()))?;
    let snapshot = alerts::load_alerts(&input.display().to_string(), &raw)?;

    let mut matching: Vec<&Alert> = match patient_id {
        Some(id) => alerts::for_patient(&snapshot, id)
            .into_iter()
            .filter(|a| filter.matches(a))
            .collect(),
        None => filter.apply(&snapshot),
    };
    alerts::sort_for_display(&mut matching);
    let expired = matching.iter().filter(|a| a.is_expired(now)).count();
    let parts = alerts::partition(matching);

    tracing::debug!(
        total = snapshot.len(),
        patient_id,
        active = parts.active.len(),
        acknowledged = parts.acknowledged.len(),
        "Feed filtered"
    );

    print_json(&FeedOutput {
        summary: alerts::summarize(&snapshot),
        expired,
        active: parts.active,
        acknowledged: parts.acknowledged,
    })
}

// ---------------------------------------------------------------------------
// history
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct PatientEntry {
    id: String,
    name: String,
    demographics: Demographics,
}

/// Visit export loaded from disk, served through [`VisitSource`].
#[derive(Deserialize)]
struct VisitExport {
    patients: Vec<PatientEntry>,
    visits: Vec<VisitRecord>,
}

impl VisitSource for VisitExport {
    fn visits(&self, patient_id: &str) -> Result<Vec<VisitRecord>, SourceError> {
        if !self.patients.iter().any(|p| p.id == patient_id) {
            return Err(SourceError::PatientNotFound(patient_id.to_string()));
        }
        Ok(self
            .visits
            .iter()
            .filter(|v| v.patient_id == patient_id)
            .cloned()
            .collect())
    }
}

#[derive(Serialize)]
struct HistoryOutput {
    patient_id: String,
    timeline: Vec<TimelinePoint>,
    decline: Option<DeclineFinding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    alert: Option<Alert>,
}

fn run_history(
    config: &EngineConfig,
    input: &Path,
    patient_id: &str,
    now: DateTime<Utc>,
) -> Result<(), CliError> {
    let export: VisitExport = read_json(input)?;
    let patient = export
        .patients
        .iter()
        .find(|p| p.id == patient_id)
        .ok_or_else(|| CliError::UnknownPatient(patient_id.to_string()))?;

    let mut cache = PatientHistoryCache::new(config.cache_ttl());
    let visits = cache.get_or_load(patient_id, &export, now)?;

    let timeline = history::build_timeline(&patient.demographics, visits, config);
    let decline = history::detect_rapid_decline(&timeline, &config.rapid_decline);
    let alert = match &decline {
        Some(finding) => {
            let who = PatientRef {
                id: patient.id.clone(),
                name: patient.name.clone(),
            };
            Some(AlertGenerator::new(config).from_decline(&who, finding, now)?)
        }
        None => None,
    };

    print_json(&HistoryOutput {
        patient_id: patient_id.to_string(),
        timeline,
        decline,
        alert,
    })
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let now = Utc::now();

    match cli.command {
        Commands::Assess {
            input,
            patient_id,
            patient_name,
        } => {
            let patient = patient_id
                .zip(patient_name)
                .map(|(id, name)| PatientRef { id, name });
            run_assess(&config, &input, patient, now)
        }
        Commands::Alerts {
            input,
            query,
            priority,
            category,
            patient_id,
        } => {
            let filter = AlertFilter {
                query,
                priority,
                category,
            };
            run_alerts(&input, patient_id.as_deref(), &filter, now)
        }
        Commands::History { input, patient_id } => run_history(&config, &input, &patient_id, now),
    }
}

fn main() -> ExitCode {
    ckd_sentinel_lib::init_tracing();
    let cli = Cli::parse();
    tracing::debug!("{} v{}", APP_NAME, APP_VERSION);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
