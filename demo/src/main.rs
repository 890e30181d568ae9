//! VIGIL appliance monitor: demo scenarios and store inspection CLI.
//!
//! The scenario subcommands drive a simulated appliance through the reference
//! scenarios. The store subcommands operate on a `JsonFileStore` directory
//! (`ledger.json`, `state.json`, `settings.json`).
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- liveness-loss
//!   cargo run -p demo -- report --store /var/lib/vigil ENCLOSURE_OPENED LOCKED
//!   cargo run -p demo -- status --store /var/lib/vigil
//!   cargo run -p demo -- ledger --store /var/lib/vigil --limit 20
//!   cargo run -p demo -- verify --store /var/lib/vigil

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use vigil_config::MonitorConfig;
use vigil_contracts::{
    error::{VigilError, VigilResult},
    status::ReportedStatus,
};
use vigil_core::{traits::TracingNotifier, Collaborators, EventDisposition, SecurityMonitor};
use vigil_ledger::{verify_entries, DurableStore, JsonFileStore};
use vigil_ref_appliance::scenarios::{
    ledger_tamper, liveness_loss, maintenance_cycle, mixed_cause, step_up_lockout, tamper_lockdown,
};

// ── CLI definition ────────────────────────────────────────────────────────────

/// VIGIL: tamper-evident security monitor for HSM appliances.
#[derive(Parser)]
#[command(
    name = "vigil",
    about = "VIGIL appliance security monitor",
    long_about = "Runs the VIGIL reference scenarios, or inspects and drives a monitor\n\
                  whose ledger and state live in a store directory."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all six reference scenarios in sequence.
    RunAll,
    /// Scenario 1: lid switch lockdown and step-up reset.
    TamperLockdown,
    /// Scenario 2: heartbeat loss, grace window, auto-recovery.
    LivenessLoss,
    /// Scenario 3: liveness loss plus voltage glitch (no auto-recovery).
    MixedCause,
    /// Scenario 4: three wrong step-up codes lock the appliance.
    StepUpLockout,
    /// Scenario 5: maintenance mode under step-up.
    MaintenanceCycle,
    /// Scenario 6: an edited ledger entry is found by index.
    LedgerTamper,
    /// Report a sensor event to the monitor backed by a store directory.
    Report {
        #[command(flatten)]
        target: StoreArgs,
        /// Event name, e.g. ENCLOSURE_OPENED.
        event: String,
        /// LOCKED for a tamper signal, SAFE for an informational event.
        status: String,
    },
    /// Print the current status as JSON (runs the liveness check).
    Status {
        #[command(flatten)]
        target: StoreArgs,
    },
    /// Print ledger entries, newest first, as JSON.
    Ledger {
        #[command(flatten)]
        target: StoreArgs,
        /// Maximum number of entries to print.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Verify the stored hash chain. Exits non-zero if it is broken.
    Verify {
        /// Store directory.
        #[arg(long)]
        store: PathBuf,
    },
}

#[derive(clap::Args)]
struct StoreArgs {
    /// Store directory (created if missing).
    #[arg(long)]
    store: PathBuf,
    /// Monitor configuration TOML. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::RunAll => {
            print_banner();
            run_all()
        }
        Command::TamperLockdown => tamper_lockdown::run_scenario(),
        Command::LivenessLoss => liveness_loss::run_scenario(),
        Command::MixedCause => mixed_cause::run_scenario(),
        Command::StepUpLockout => step_up_lockout::run_scenario(),
        Command::MaintenanceCycle => maintenance_cycle::run_scenario(),
        Command::LedgerTamper => ledger_tamper::run_scenario(),
        Command::Report { target, event, status } => report(&target, &event, &status),
        Command::Status { target } => status(&target),
        Command::Ledger { target, limit } => ledger(&target, limit),
        Command::Verify { store } => verify(&store),
    };

    if let Err(e) = result {
        eprintln!("vigil: {}", e);
        std::process::exit(1);
    }
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

fn run_all() -> VigilResult<()> {
    tamper_lockdown::run_scenario()?;
    liveness_loss::run_scenario()?;
    mixed_cause::run_scenario()?;
    step_up_lockout::run_scenario()?;
    maintenance_cycle::run_scenario()?;
    ledger_tamper::run_scenario()?;
    println!("All scenarios completed successfully.");
    Ok(())
}

// ── Store commands ────────────────────────────────────────────────────────────

fn open_monitor(target: &StoreArgs) -> VigilResult<SecurityMonitor> {
    let config = match &target.config {
        Some(path) => MonitorConfig::from_file(path)?,
        None => MonitorConfig::default(),
    };
    let store = Arc::new(JsonFileStore::open(&target.store)?);
    info!(store = %target.store.display(), "opening monitor");
    SecurityMonitor::open(config, Collaborators::new(store, Arc::new(TracingNotifier)))
}

fn report(target: &StoreArgs, event: &str, status: &str) -> VigilResult<()> {
    let reported: ReportedStatus = status.parse()?;
    let monitor = open_monitor(target)?;
    match monitor.report_event(event, reported)? {
        EventDisposition::Ignored => println!("ignored: sensing is disabled"),
        EventDisposition::Recorded(ack) => {
            println!("{}", to_json(&ack.entry)?);
            if let Some(warning) = ack.persistence_warning {
                eprintln!("warning: {}", warning);
            }
        }
    }
    Ok(())
}

fn status(target: &StoreArgs) -> VigilResult<()> {
    let monitor = open_monitor(target)?;
    println!("{}", to_json(&monitor.query_status()?)?);
    Ok(())
}

fn ledger(target: &StoreArgs, limit: Option<usize>) -> VigilResult<()> {
    let monitor = open_monitor(target)?;
    println!("{}", to_json(&monitor.list_ledger(limit)?)?);
    Ok(())
}

/// Verify without opening a monitor, so a capacity setting cannot trim the
/// evidence before it is checked.
fn verify(dir: &Path) -> VigilResult<()> {
    let store = JsonFileStore::open(dir)?;
    let report = verify_entries(&store.load_entries()?);
    println!("{}", to_json(&report)?);
    if !report.valid {
        return Err(VigilError::InvalidReport {
            reason: format!(
                "ledger chain broken at index {}",
                report.first_broken_index.unwrap_or_default()
            ),
        });
    }
    Ok(())
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> VigilResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| VigilError::InvalidReport {
        reason: format!("failed to render JSON: {}", e),
    })
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("VIGIL: Appliance Security Monitor");
    println!("Reference Appliance Demo");
    println!("=================================");
    println!();
    println!("Every state change is serialized and recorded:");
    println!("  [1] Sensor, heartbeat, or operator input enters one locked boundary");
    println!("  [2] Tamper causes are checked against the cause catalog");
    println!("  [3] Status and trigger set change together with the ledger tip");
    println!("  [4] The entry is SHA-256 chained to its predecessor and persisted");
    println!("  [5] Alerts go out after the lock is released");
    println!();
}
