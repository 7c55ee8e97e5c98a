//! `elig` - eligibility verification and triage from the command line.
//!
//! ## Commands
//!
//! - `triage`: run the triage rules over a patient and optional result
//! - `classify`: thin-data assessment of a result
//! - `merge`: merge a primary and a fallback result
//! - `contact`: pre-auth routing contact for a patient
//! - `oon`: out-of-network estimate waterfall
//! - `medicaid`: Medicaid detection and state rules
//! - `mtc`: missing tooth clause risk for planned prosthetics
//! - `integrity`: benefit completeness grade
//! - `adjustments`: staff actions for claim adjustment codes
//! - `verify`: run the verification pipeline over a patient list
//! - `schedule`: plan (and optionally dispatch) automatic verifications

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use elig_core::{
    assess, classify, detect_state, evaluate_mtc, is_medicaid, merge, MtcRisk, resolve_payer_contact, run_waterfall,
    state_rules, triage, FeeSchedule, OonInput, Patient, ResultSource, Trigger,
    VerificationResult, METRICS,
};
use elig_pipeline::{
    AutoTriggerScheduler, FixtureSource, HttpSource, HttpSourceConfig, MemoryVerificationStore,
    PipelineConfig, VerificationPhaseController, VerificationSource, VerifyOutcome,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "elig")]
#[command(author = "Eligibility Engineering")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Dental eligibility verification and triage", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Pipeline configuration file (TOML)
    #[arg(long, global = true, env = "ELIG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Triage a patient against a verification result
    Triage {
        /// Patient file (JSON)
        #[arg(short, long)]
        patient: PathBuf,

        /// Verification result file (JSON); omit for "not yet run"
        #[arg(short, long)]
        result: Option<PathBuf>,

        /// Print one line per reason instead of JSON
        #[arg(long)]
        text: bool,
    },

    /// Decide whether a result is thin and needs the fallback source
    Classify {
        /// Verification result file (JSON)
        result: PathBuf,
    },

    /// Merge a primary result with a fallback result
    Merge {
        /// Primary (api) result file
        primary: PathBuf,

        /// Fallback (portal) result file
        secondary: PathBuf,
    },

    /// Show who to send a pre-authorization to
    Contact {
        #[arg(short, long)]
        patient: PathBuf,

        #[arg(short, long)]
        result: Option<PathBuf>,
    },

    /// Estimate out-of-network patient responsibility
    Oon {
        /// Request file (JSON, cents or dollars)
        request: PathBuf,
    },

    /// Medicaid detection for a patient
    Medicaid {
        #[arg(short, long)]
        patient: PathBuf,
    },

    /// Missing tooth clause risk for planned prosthetics
    Mtc {
        #[arg(short, long)]
        patient: PathBuf,

        /// Verification result file (JSON); omit when the clause is unknown
        #[arg(short, long)]
        result: Option<PathBuf>,
    },

    /// Grade how complete a result's benefit data is
    Integrity {
        result: PathBuf,

        /// Procedure text the grade is relevant to
        #[arg(long, default_value = "")]
        procedure: String,
    },

    /// Staff actions for HIPAA claim adjustment reason codes
    Adjustments {
        #[arg(required = true)]
        codes: Vec<u32>,
    },

    /// Verify patients through the api → fallback → merge pipeline
    Verify {
        /// Patient list (JSON array)
        #[arg(short, long)]
        patients: PathBuf,

        /// Answer api requests from `<patient_id>.json` fixtures instead of HTTP
        #[arg(long)]
        fixtures: Option<PathBuf>,

        /// Answer fallback requests from fixtures instead of HTTP
        #[arg(long)]
        fallback_fixtures: Option<PathBuf>,

        /// What caused this run
        #[arg(long, default_value = "manual")]
        trigger: String,
    },

    /// Plan automatic verifications for upcoming appointments
    Schedule {
        #[arg(short, long)]
        patients: PathBuf,

        /// Run the plan against fixtures after printing it
        #[arg(long)]
        fixtures: Option<PathBuf>,

        /// Seed for dispatch jitter
        #[arg(long, default_value = "0")]
        seed: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    elig_core::init_tracing(cli.json, level);

    let config = load_config(cli.config.as_deref())?;

    let outcome = match cli.command {
        Commands::Triage {
            patient,
            result,
            text,
        } => cmd_triage(&patient, result.as_deref(), text),
        Commands::Classify { result } => cmd_classify(&result),
        Commands::Merge { primary, secondary } => cmd_merge(&primary, &secondary),
        Commands::Contact { patient, result } => cmd_contact(&patient, result.as_deref()),
        Commands::Oon { request } => cmd_oon(&request),
        Commands::Medicaid { patient } => cmd_medicaid(&patient),
        Commands::Mtc { patient, result } => cmd_mtc(&patient, result.as_deref()),
        Commands::Integrity { result, procedure } => cmd_integrity(&result, &procedure),
        Commands::Adjustments { codes } => cmd_adjustments(&codes),
        Commands::Verify {
            patients,
            fixtures,
            fallback_fixtures,
            trigger,
        } => {
            cmd_verify(
                config,
                &patients,
                fixtures.as_deref(),
                fallback_fixtures.as_deref(),
                &trigger,
            )
            .await
        }
        Commands::Schedule {
            patients,
            fixtures,
            seed,
        } => cmd_schedule(config, &patients, fixtures.as_deref(), seed).await,
    };

    METRICS.flush();
    outcome
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read JSON file: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {:?}", path))
}

fn read_optional<T: serde::de::DeserializeOwned>(path: Option<&Path>) -> Result<Option<T>> {
    path.map(|p| read_json_file::<T>(p)).transpose()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Environment defaults, overridden field by field by the TOML file.
fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let Some(path) = path else {
        return Ok(PipelineConfig::from_env());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    toml::from_str(&content).with_context(|| format!("Invalid config in {:?}", path))
}

// ---------------------------------------------------------------------------
// Pure commands
// ---------------------------------------------------------------------------

fn cmd_triage(patient: &Path, result: Option<&Path>, text: bool) -> Result<()> {
    let patient: Patient = read_json_file(patient)?;
    let result: Option<VerificationResult> = read_optional(result)?;
    let t = triage(&patient, result.as_ref());

    if !text {
        return print_json(&t);
    }
    println!("{} {}", t.level(), patient.id);
    for reason in t.block() {
        println!("  block:  {}", reason);
    }
    for reason in t.notify() {
        println!("  notify: {}", reason);
    }
    for reason in t.notices() {
        println!("  notice: {}", reason);
    }
    Ok(())
}

fn cmd_classify(result: &Path) -> Result<()> {
    let result: VerificationResult = read_json_file(result)?;
    print_json(&classify(Some(&result)))
}

fn cmd_merge(primary: &Path, secondary: &Path) -> Result<()> {
    let primary: VerificationResult = read_json_file(primary)?;
    let secondary: VerificationResult = read_json_file(secondary)?;
    print_json(&merge(&primary, &secondary))
}

fn cmd_contact(patient: &Path, result: Option<&Path>) -> Result<()> {
    let patient: Patient = read_json_file(patient)?;
    let result: Option<VerificationResult> = read_optional(result)?;
    print_json(&resolve_payer_contact(&patient, result.as_ref()))
}

fn cmd_oon(request: &Path) -> Result<()> {
    let input: OonInput = read_json_file(request)?;
    let req = input.normalize().context("Invalid out-of-network request")?;
    print_json(&run_waterfall(&req, FeeSchedule::builtin()))
}

fn cmd_medicaid(patient: &Path) -> Result<()> {
    let patient: Patient = read_json_file(patient)?;
    let state = detect_state(&patient);
    let rules = state.and_then(state_rules).map(|r| r.to_info());
    print_json(&json!({
        "patient_id": patient.id,
        "medicaid": is_medicaid(&patient),
        "state": state,
        "rules": rules,
    }))
}

fn mtc_risk(patient: &Path, result: Option<&Path>) -> Result<MtcRisk> {
    let patient: Patient = read_json_file(patient)?;
    let result: VerificationResult = read_optional(result)?.unwrap_or_default();
    Ok(evaluate_mtc(&patient, &result))
}

fn cmd_mtc(patient: &Path, result: Option<&Path>) -> Result<()> {
    print_json(&mtc_risk(patient, result)?)
}

fn cmd_integrity(result: &Path, procedure: &str) -> Result<()> {
    let result: VerificationResult = read_json_file(result)?;
    print_json(&assess(&result, procedure))
}

fn cmd_adjustments(codes: &[u32]) -> Result<()> {
    print_json(&elig_core::adjustment::resolve(codes))
}

// ---------------------------------------------------------------------------
// Pipeline commands
// ---------------------------------------------------------------------------

fn build_controller(
    config: PipelineConfig,
    fixtures: Option<&Path>,
    fallback_fixtures: Option<&Path>,
) -> Result<VerificationPhaseController> {
    let api: Arc<dyn VerificationSource> = match fixtures {
        Some(dir) => Arc::new(
            FixtureSource::from_dir("api", dir)
                .with_context(|| format!("Failed to load fixtures from {:?}", dir))?,
        ),
        None => {
            let mut http = HttpSourceConfig::from_env("ELIG_SOURCE", "api", ResultSource::Api)?;
            http.timeout_secs = config.source_timeout_secs;
            Arc::new(HttpSource::new(http)?)
        }
    };

    let fallback: Option<Arc<dyn VerificationSource>> = match fallback_fixtures {
        Some(dir) => Some(Arc::new(
            FixtureSource::from_dir("rpa", dir)
                .with_context(|| format!("Failed to load fallback fixtures from {:?}", dir))?,
        )),
        None if std::env::var("ELIG_FALLBACK_URL").is_ok() => {
            let mut http = HttpSourceConfig::from_env("ELIG_FALLBACK", "rpa", ResultSource::Rpa)?;
            http.timeout_secs = config.source_timeout_secs;
            Some(Arc::new(HttpSource::new(http)?))
        }
        None => None,
    };

    let store = Arc::new(MemoryVerificationStore::new());
    let controller = VerificationPhaseController::new(store, api, config);
    Ok(match fallback {
        Some(fb) => controller.with_fallback(fb),
        None => controller,
    })
}

#[derive(Serialize)]
struct VerifyReport {
    patient_id: String,
    phase: Option<String>,
    skipped: bool,
    result: Option<VerificationResult>,
    triage: elig_core::TriageResult,
}

async fn report(
    controller: &VerificationPhaseController,
    patient: &Patient,
    outcome: &VerifyOutcome,
) -> Result<VerifyReport> {
    Ok(VerifyReport {
        patient_id: patient.id.clone(),
        phase: outcome.phase().map(|p| p.to_string()),
        skipped: outcome.is_skipped(),
        result: outcome.result().cloned(),
        triage: controller.triage(patient).await?,
    })
}

async fn cmd_verify(
    config: PipelineConfig,
    patients: &Path,
    fixtures: Option<&Path>,
    fallback_fixtures: Option<&Path>,
    trigger: &str,
) -> Result<()> {
    let trigger: Trigger = trigger.parse()?;
    let patients: Vec<Patient> = read_json_file(patients)?;
    let controller = build_controller(config, fixtures, fallback_fixtures)?;

    info!(count = patients.len(), trigger = %trigger, "verifying patients");
    let outcomes = controller.verify_batch(&patients, trigger).await;

    let mut reports = Vec::with_capacity(patients.len());
    for (patient, outcome) in patients.iter().zip(outcomes) {
        let outcome = outcome.with_context(|| format!("Verification failed for {}", patient.id))?;
        reports.push(report(&controller, patient, &outcome).await?);
    }
    print_json(&reports)
}

async fn cmd_schedule(
    config: PipelineConfig,
    patients: &Path,
    fixtures: Option<&Path>,
    seed: u64,
) -> Result<()> {
    let patients: Vec<Patient> = read_json_file(patients)?;
    let scheduler = AutoTriggerScheduler::new(config.clone());
    let mut rng = StdRng::seed_from_u64(seed);
    let now = chrono::Utc::now();

    let Some(dir) = fixtures else {
        let plan = scheduler.plan(&patients, &Default::default(), now, &mut rng);
        let rows: Vec<_> = plan
            .iter()
            .map(|e| {
                json!({
                    "patient_id": e.patient.id,
                    "trigger": e.trigger,
                    "delay_ms": e.delay.as_millis() as u64,
                })
            })
            .collect();
        return print_json(&rows);
    };

    let controller = build_controller(config, Some(dir), None)?;
    let plan = scheduler
        .plan_for(&controller, &patients, now, &mut rng)
        .await?;
    let planned: Vec<Patient> = plan.iter().map(|e| e.patient.clone()).collect();

    let mut reports = Vec::with_capacity(planned.len());
    for (patient, handle) in planned.iter().zip(scheduler.dispatch(&controller, plan)) {
        let outcome = handle
            .await
            .context("Scheduled verification task failed")??;
        reports.push(report(&controller, patient, &outcome).await?);
    }
    print_json(&reports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_file_overrides_only_named_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("elig.toml");
        std::fs::write(&path, "stagger_ms = 5\nmax_concurrent = 2\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.stagger_ms, 5);
        assert_eq!(config.max_concurrent, 2);
        assert_eq!(config.window_7d_hours, PipelineConfig::default().window_7d_hours);
    }

    #[test]
    fn bad_config_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "stagger_ms = \"soon\"").unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("broken.toml"));
    }

    #[test]
    fn mtc_reads_patient_chart_and_clause() {
        let dir = tempfile::tempdir().unwrap();
        let patient = dir.path().join("patient.json");
        let result = dir.path().join("result.json");
        std::fs::write(
            &patient,
            r#"{"id": "p9", "procedure": "D6010 implant #3",
                "tooth_history": [{"tooth": "3", "procedure": "D7210", "date": "2021-08-02"}]}"#,
        )
        .unwrap();
        std::fs::write(
            &result,
            r#"{"verification_status": "verified", "plan_status": "active",
                "plan_begin_date": "2022-01-01", "missing_tooth_clause": {"applies": true}}"#,
        )
        .unwrap();

        let risk = mtc_risk(&patient, Some(&result)).unwrap();
        assert_eq!(risk.flag, Some(elig_core::MtcFlag::PreExisting));

        let unknown = mtc_risk(&patient, None).unwrap();
        assert_eq!(unknown.flag, Some(elig_core::MtcFlag::StatusUnknown));
        assert!(unknown.requires_scraper);
    }

    #[tokio::test]
    async fn verify_against_fixtures_merges_thin_answers() {
        let api = tempfile::tempdir().unwrap();
        let rpa = tempfile::tempdir().unwrap();
        std::fs::write(
            api.path().join("p1.json"),
            r#"{"verification_status": "verified", "plan_status": "active",
                "annual_maximum_cents": 150000, "annual_remaining_cents": 0}"#,
        )
        .unwrap();
        std::fs::write(
            rpa.path().join("p1.json"),
            r#"{"preventive": {}, "missing_tooth_clause": {"applies": false},
                "frequency_limits": {}}"#,
        )
        .unwrap();

        let controller =
            build_controller(PipelineConfig::default(), Some(api.path()), Some(rpa.path()))
                .unwrap();
        let patient = Patient::new("p1", "D2740 crown");
        let outcome = controller.verify(&patient, Trigger::Manual).await.unwrap();
        let report = report(&controller, &patient, &outcome).await.unwrap();

        assert_eq!(report.phase.as_deref(), Some("complete"));
        let result = report.result.unwrap();
        assert_eq!(result.source, Some(ResultSource::Hybrid));
        assert!(result.missing_tooth_clause.is_some());
        assert!(report.triage.block().iter().any(|b| b == "annual max exhausted"));
    }
}
