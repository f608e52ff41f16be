//! SafeTrail ledger: operator CLI
//!
//! Opens the chain file named by the configuration (or `--chain-file`) and
//! runs one command against it.
//!
//! Usage:
//!   safetrail init
//!   safetrail register --identity A1234567 --type passport \
//!       --valid-from 2025-01-01 --valid-until 2025-04-01
//!   safetrail verify
//!   safetrail state
//!   safetrail show
//!   safetrail backfill --input kyc-export.json

use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use safetrail_contracts::{block::VerificationType, error::LedgerError};
use safetrail_core::{config::LedgerConfig, lazy::LazyLedger};
use safetrail_kyc::{validity_end, KycError, KycRecord, KycRegistrar};
use safetrail_store::open_ledger;

// ── CLI definition ────────────────────────────────────────────────────────────

/// SafeTrail: tamper-evident tourist verification ledger.
#[derive(Parser)]
#[command(
    name = "safetrail",
    about = "SafeTrail tourist verification ledger",
    long_about = "Registers KYC verifications on a local SHA-256 hash chain and\n\
                  audits the chain's linkage."
)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Chain file path; overrides `chain_file` from the configuration.
    #[arg(long, global = true)]
    chain_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the chain file if needed and print the chain state.
    Init,
    /// Append one verification block.
    Register {
        /// Identity number hashed into the block (never stored).
        #[arg(long)]
        identity: String,
        /// Trip identifier; defaults to TRIP-<epoch millis>.
        #[arg(long)]
        trip_id: Option<String>,
        /// Start of validity (RFC 3339 or YYYY-MM-DD); defaults to now.
        #[arg(long, value_parser = parse_date)]
        valid_from: Option<DateTime<Utc>>,
        /// End of validity; defaults to valid-from plus the configured window.
        #[arg(long, value_parser = parse_date)]
        valid_until: Option<DateTime<Utc>>,
        /// aadhar or passport.
        #[arg(long = "type", value_name = "TYPE")]
        verification_type: VerificationType,
    },
    /// Check chain linkage; exits with status 2 when broken.
    Verify,
    /// Print block count, head hash and validity as JSON.
    State,
    /// Print every block as JSON.
    Show,
    /// Register a JSON array of exported KYC records.
    Backfill {
        #[arg(long)]
        input: PathBuf,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Kyc(#[from] KycError),

    #[error("cannot read '{path}': {reason}")]
    Input { path: PathBuf, reason: String },

    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref(), cli.chain_file) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("safetrail: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // RUST_LOG wins over the configured filter.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_target(false)
        .compact()
        .init();

    match run(cli.command, &config) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("safetrail: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>, chain_file: Option<PathBuf>) -> Result<LedgerConfig, LedgerError> {
    let mut config = match path {
        Some(path) => LedgerConfig::from_file(path)?,
        None => LedgerConfig::default(),
    };
    if let Some(chain_file) = chain_file {
        config.chain_file = chain_file;
    }
    Ok(config)
}

// ── Command dispatch ──────────────────────────────────────────────────────────

fn run(command: Command, config: &LedgerConfig) -> Result<ExitCode, CliError> {
    let ledger = LazyLedger::new(|| open_ledger(config));

    match command {
        Command::Init => {
            let ledger = ledger.get()?;
            info!(location = %ledger.location(), "ledger ready");
            print_json(&ledger.chain_state()?)?;
        }

        Command::Register {
            identity,
            trip_id,
            valid_from,
            valid_until,
            verification_type,
        } => {
            let valid_from = valid_from.unwrap_or_else(Utc::now);
            let valid_until = match valid_until {
                Some(valid_until) => valid_until,
                None => validity_end(valid_from, config.validity_days)?,
            };
            let trip_id =
                trip_id.unwrap_or_else(|| format!("TRIP-{}", Utc::now().timestamp_millis()));

            let block = ledger.get()?.register_tourist(
                &identity,
                trip_id,
                valid_from,
                valid_until,
                verification_type,
            )?;
            print_json(&block)?;
        }

        Command::Verify => {
            let valid = ledger.get()?.verify_chain()?;
            println!("Chain integrity check: {}", if valid { "PASSED" } else { "FAILED" });
            if !valid {
                return Ok(ExitCode::from(2));
            }
        }

        Command::State => print_json(&ledger.get()?.chain_state()?)?,

        Command::Show => print_json(&ledger.get()?.blocks()?)?,

        Command::Backfill { input } => {
            let records = read_records(&input)?;
            let registrar = KycRegistrar::new(ledger.get()?, config.validity_days);
            let report = registrar.backfill(&records)?;
            print_json(&report)?;
            if !report.chain_valid {
                return Ok(ExitCode::from(2));
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn read_records(path: &Path) -> Result<Vec<KycRecord>, CliError> {
    let input_error = |reason: String| CliError::Input {
        path: path.to_path_buf(),
        reason,
    };
    let contents = std::fs::read_to_string(path).map_err(|e| input_error(e.to_string()))?;
    serde_json::from_str(&contents).map_err(|e| input_error(e.to_string()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Accept RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
fn parse_date(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| format!("'{}' is not an RFC 3339 timestamp or YYYY-MM-DD date", s))
}
