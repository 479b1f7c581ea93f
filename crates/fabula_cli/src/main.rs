//! `fabula` command line tool.
//!
//! # Responsibility
//! - Run consistency checks and chronological reorders against a project
//!   database without the desktop shell.
//! - Keep output deterministic and line-oriented for scripting.

use clap::{Parser, Subcommand};
use fabula_core::{
    core_version, default_log_level, init_logging, open_db, EngineConfig, ParadoxKind,
    SqliteTemporalStore, TimelineEngine,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "fabula")]
#[command(about = "Story-time consistency tools for manuscript projects")]
struct Cli {
    /// Absolute directory for rolling log files
    #[arg(long, global = true)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print paradox warnings, narrative connectors and dependency cycles
    Check {
        /// Project database
        db: PathBuf,
        /// Orphan-gap threshold in days
        #[arg(long)]
        gap_days: Option<i64>,
    },
    /// Preview (or commit with --apply) the chronological manuscript order
    Reorder {
        /// Project database
        db: PathBuf,
        /// Write the new order to the database
        #[arg(long)]
        apply: bool,
        /// Number of preview entries
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the core version
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        if let Err(err) = init_logging(default_log_level(), log_dir) {
            eprintln!("warning: logging disabled: {err}");
        }
    }

    match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<ExitCode, Box<dyn Error>> {
    match command {
        Command::Check { db, gap_days } => {
            let mut config = EngineConfig::default();
            if let Some(days) = gap_days {
                config.orphan_gap_threshold_days = days;
            }
            check(db, config)
        }
        Command::Reorder { db, apply, limit } => {
            let mut config = EngineConfig::default();
            if let Some(limit) = limit {
                config.reorder_preview_len = limit;
            }
            reorder(db, apply, config)
        }
        Command::Version => {
            println!("fabula_core version={}", core_version());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn check(db: PathBuf, config: EngineConfig) -> Result<ExitCode, Box<dyn Error>> {
    let conn = open_db(&db)?;
    let store = SqliteTemporalStore::try_new(&conn)?;
    let engine = TimelineEngine::from_store(store, config)?;

    println!(
        "scenes={} assigned={} unassigned={} calendar={}",
        engine.records().len(),
        engine.assigned_scenes().len(),
        engine.unassigned_scenes().len(),
        engine.calendar().system.as_str()
    );
    for warning in engine.paradox_warnings() {
        println!(
            "warning kind={} scenes={} message={}",
            kind_label(warning.kind),
            warning.scene_ids.join(","),
            warning.message
        );
    }
    for connector in engine.narrative_connectors() {
        if connector.is_flashback {
            println!("flashback from={} to={}", connector.from, connector.to);
        }
    }
    let cycles = engine.dependency_cycles();
    for cycle in &cycles {
        println!("cycle scenes={}", cycle.join(","));
    }

    if engine.paradox_warnings().is_empty() && cycles.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(2))
    }
}

fn reorder(db: PathBuf, apply: bool, config: EngineConfig) -> Result<ExitCode, Box<dyn Error>> {
    let conn = open_db(&db)?;
    let store = SqliteTemporalStore::try_new(&conn)?;
    let mut engine = TimelineEngine::from_store(store, config)?;

    let preview = engine.preview_chronological_reorder();
    for (position, entry) in preview.entries.iter().enumerate() {
        println!(
            "{position:>4} {} [{}] {}",
            entry.id,
            entry.time_key.as_deref().unwrap_or("unassigned"),
            entry.title
        );
    }
    println!("total={} changed={}", preview.total, preview.changed);

    if apply && preview.changed {
        engine.apply_chronological_reorder()?;
        println!("applied=true");
    }
    Ok(ExitCode::SUCCESS)
}

fn kind_label(kind: ParadoxKind) -> &'static str {
    match kind {
        ParadoxKind::SimultaneousPresence => "simultaneous_presence",
        ParadoxKind::CausalityViolation => "causality_violation",
        ParadoxKind::OrphanGap => "orphan_gap",
    }
}
