//! `optimize`: read a session's documents back and write a tuned config.

use std::fs;
use std::path::{Path, PathBuf};

use reptrack_config::Config;
use reptrack_core::session::validate_session_id;
use reptrack_core::{OptimizationReport, RepAttempt, ReptrackError, SessionSummary, StateTransition};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::cli::OptimizeArgs;

/// File name used when `--out` is not given.
pub const OPTIMIZED_CONFIG: &str = "optimized_config.toml";

fn source_err(msg: String) -> eyre::Report {
    eyre::Report::new(ReptrackError::Source(msg))
}

/// Id of the latest session in `dir`, by file name.
fn latest_session(dir: &Path) -> eyre::Result<String> {
    let entries = fs::read_dir(dir)
        .map_err(|e| source_err(format!("open session documents {}: {e}", dir.display())))?;
    entries
        .filter_map(Result::ok)
        .filter_map(|e| {
            let name = e.file_name().into_string().ok()?;
            name.strip_prefix("transitions_")?
                .strip_suffix(".json")
                .map(str::to_owned)
        })
        .max()
        .ok_or_else(|| {
            source_err(format!(
                "no session documents (transitions_*.json) in {}",
                dir.display()
            ))
        })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> eyre::Result<T> {
    let text = fs::read_to_string(path)
        .map_err(|e| source_err(format!("open session document {}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| source_err(format!("parse session document {}: {e}", path.display())))
}

fn write_config(path: &Path, session_id: &str, cfg: &Config) -> eyre::Result<()> {
    let body = reptrack_config::to_toml(cfg)
        .map_err(|e| eyre::Report::new(ReptrackError::State(format!("render config: {e}"))))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            eyre::Report::new(ReptrackError::Io(format!(
                "create directory {}: {e}",
                parent.display()
            )))
        })?;
    }
    let text = format!("# Tuned by `reptrack optimize` from session {session_id}\n\n{body}");
    fs::write(path, text).map_err(|e| {
        eyre::Report::new(ReptrackError::Io(format!("write {}: {e}", path.display())))
    })?;
    tracing::info!(path = %path.display(), session = session_id, "tuned config written");
    Ok(())
}

pub fn run_optimize(cfg: &Config, args: OptimizeArgs, json: bool) -> eyre::Result<()> {
    let dir = args
        .in_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&cfg.output.dir));
    let id = match args.session_id {
        Some(id) => {
            validate_session_id(&id).map_err(eyre::Report::new)?;
            id
        }
        None => latest_session(&dir)?,
    };

    let transitions: Vec<StateTransition> = read_json(&dir.join(format!("transitions_{id}.json")))?;
    let attempts: Vec<RepAttempt> = read_json(&dir.join(format!("attempts_{id}.json")))?;
    let summary_path = dir.join(format!("summary_{id}.json"));
    let success_rate = if summary_path.exists() {
        Some(read_json::<SessionSummary>(&summary_path)?.success_rate)
    } else {
        None
    };

    let report = OptimizationReport::analyze(&transitions, &attempts, cfg);
    let tuned = report.apply(cfg);
    tuned.validate().map_err(|e| {
        eyre::Report::new(ReptrackError::Config(format!("tuned config rejected: {e}")))
    })?;

    let written = if args.dry_run {
        None
    } else {
        let path = args.out.clone().unwrap_or_else(|| dir.join(OPTIMIZED_CONFIG));
        write_config(&path, &id, &tuned)?;
        Some(path)
    };

    if json {
        let v = json!({
            "session_id": id,
            "success_rate": success_rate,
            "report": report,
            "recommendations": report.reasons(),
            "config": tuned,
            "config_file": written,
        });
        println!("{v}");
    } else {
        print_report(&id, success_rate, &report, written.as_deref());
    }
    Ok(())
}

fn print_report(
    id: &str,
    success_rate: Option<f64>,
    report: &OptimizationReport,
    written: Option<&Path>,
) {
    println!("--- Optimization for session {id} ---");
    println!(
        "Transitions: {}  Attempts: {}{}",
        report.transitions,
        report.attempts,
        success_rate
            .map(|r| format!("  Success rate: {r:.1}%"))
            .unwrap_or_default()
    );
    if !report.common_transitions.is_empty() {
        println!("Most common transitions:");
        for t in &report.common_transitions {
            println!("  {} -> {}: {} ({:.1}%)", t.from, t.to, t.count, t.percent);
        }
    }
    println!(
        "Rapid phase changes: {} ({:.1}%)",
        report.smoothing.rapid_changes, report.smoothing.jitter_percent
    );
    let reasons = report.reasons();
    if reasons.is_empty() {
        println!("Recommendations: none (not enough data)");
    } else {
        println!("Recommendations:");
        for r in reasons {
            println!("  {r}");
        }
    }
    if let Some(p) = written {
        println!("Wrote {}", p.display());
    }
}
