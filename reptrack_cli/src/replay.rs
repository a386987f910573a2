//! `replay`: run one tracking session over a recorded samples CSV.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{SystemTime, UNIX_EPOCH};

use eyre::WrapErr;
use reptrack_core::mocks::VecSource;
use reptrack_core::{MonotonicClock, ReptrackError, RunParams, RunStats, Session, SessionReport};
use serde_json::json;

use crate::cli::ReplayArgs;
use crate::export::{ExportPaths, write_report};

/// `session_<unix seconds>` when the caller did not pick an id.
fn default_session_id() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("session_{secs}")
}

pub fn build_session(cfg: &reptrack_config::Config, id: String) -> eyre::Result<Session> {
    Session::builder()
        .session_id(id)
        .phase((&cfg.phase).into())
        .counter((&cfg.counter).into())
        .diagnostics((&cfg.diagnostics).into())
        .gate((&cfg.gate).into())
        .build()
}

pub fn run_replay(
    cfg: &reptrack_config::Config,
    args: ReplayArgs,
    json: bool,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<()> {
    let frames = reptrack_config::load_samples_csv(&args.samples)
        .map_err(|e| eyre::Report::new(ReptrackError::Source(e.to_string())))?;
    let id = args.session_id.clone().unwrap_or_else(default_session_id);
    let mut session = build_session(cfg, id)?;

    let params = RunParams {
        pace: args.pace,
        max_frames: args.max_frames,
    };
    let mut source = VecSource::new(frames);
    let stats = reptrack_core::run(
        &mut source,
        &mut session,
        &MonotonicClock::new(),
        params,
        Some(shutdown.as_ref()),
    )
    .wrap_err("replay failed")?;
    let report = session.finish();

    let files = if args.no_export {
        None
    } else {
        let dir = args
            .out_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(&cfg.output.dir));
        Some(write_report(&dir, &report)?)
    };

    if json {
        println!("{}", summary_json(&stats, &report, files.as_ref()));
    } else {
        print_summary(&stats, &report, files.as_ref());
    }
    Ok(())
}

fn summary_json(stats: &RunStats, report: &SessionReport, files: Option<&ExportPaths>) -> String {
    json!({
        "session_id": report.summary.session_id,
        "frames": stats.frames,
        "invalid_frames": stats.invalid_frames,
        "interrupted": stats.interrupted,
        "total_reps": report.stats.total_reps,
        "valid_reps": report.stats.valid_reps,
        "stats": report.stats,
        "summary": report.summary,
        "files": files,
    })
    .to_string()
}

fn print_summary(stats: &RunStats, report: &SessionReport, files: Option<&ExportPaths>) {
    let s = &report.summary;
    let p = &report.stats;
    println!("--- Session {} ---", s.session_id);
    println!(
        "Frames: {} ({} treated as no detection){}",
        stats.frames,
        stats.invalid_frames,
        if stats.interrupted { " [interrupted]" } else { "" }
    );
    println!("Reps: {} valid / {} completed", p.valid_reps, p.total_reps);
    if p.valid_reps > 0 {
        println!(
            "Duration avg/fastest/slowest (s): {:.2} / {:.2} / {:.2}",
            p.average_duration, p.fastest_rep, p.slowest_rep
        );
        println!(
            "Form avg: {:.1}  Consistency: {:.1}",
            p.average_form_score, p.consistency_score
        );
    }
    println!(
        "Attempts: {} ({} successful, {:.1}% success)",
        s.rep_attempts, s.successful_reps, s.success_rate
    );
    if let Some(a) = &s.angle_statistics {
        println!(
            "Angles min/mean/max (deg): {:.1} / {:.1} / {:.1}",
            a.min, a.mean, a.max
        );
    }
    if !s.common_failure_patterns.is_empty() {
        println!("Failures:");
        for f in &s.common_failure_patterns {
            println!("  {f}");
        }
    }
    if !s.recommendations.is_empty() {
        println!("Recommendations:");
        for r in &s.recommendations {
            println!("  {r}");
        }
    }
    if let Some(f) = files {
        println!("Wrote {}", f.summary.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_prefixed() {
        assert!(default_session_id().starts_with("session_"));
    }

    #[test]
    fn session_builds_from_default_config() {
        let cfg = reptrack_config::Config::default();
        let s = build_session(&cfg, "x".into()).unwrap();
        assert_eq!(s.id(), "x");
    }
}
