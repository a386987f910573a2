//! Session documents: one pretty-printed JSON file per concern.

use std::fs;
use std::path::{Path, PathBuf};

use reptrack_core::{ReptrackError, SessionReport};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ExportPaths {
    pub transitions: PathBuf,
    pub attempts: PathBuf,
    pub summary: PathBuf,
}

fn io_err(what: &str, path: &Path, e: impl std::fmt::Display) -> eyre::Report {
    eyre::Report::new(ReptrackError::Io(format!("{what} {}: {e}", path.display())))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> eyre::Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| eyre::Report::new(ReptrackError::State(format!("serialize: {e}"))))?;
    fs::write(path, text).map_err(|e| io_err("write", path, e))
}

/// Write `transitions_<id>.json`, `attempts_<id>.json` and `summary_<id>.json` into `dir`.
pub fn write_report(dir: &Path, report: &SessionReport) -> eyre::Result<ExportPaths> {
    fs::create_dir_all(dir).map_err(|e| io_err("create directory", dir, e))?;
    let id = &report.summary.session_id;
    let paths = ExportPaths {
        transitions: dir.join(format!("transitions_{id}.json")),
        attempts: dir.join(format!("attempts_{id}.json")),
        summary: dir.join(format!("summary_{id}.json")),
    };
    write_json(&paths.transitions, &report.transitions)?;
    write_json(&paths.attempts, &report.attempts)?;
    write_json(&paths.summary, &report.summary)?;
    tracing::info!(dir = %dir.display(), session = %id, "session documents written");
    Ok(paths)
}
