//! `reptrack` command-line entry point.

mod cli;
mod error_fmt;
mod export;
mod optimize;
mod replay;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use reptrack_config::Config;
use reptrack_core::ReptrackError;
use serde_json::json;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if !cli.json {
        let _ = color_eyre::install();
    }

    if let Err(e) = run(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        tracing::debug!(error = ?e, "command failed");
        std::process::exit(exit_code_for_error(&e));
    }
}

fn run(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;

    match cli.cmd {
        Commands::Replay(args) => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&shutdown);
            if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                tracing::warn!(error = %e, "failed to install Ctrl-C handler; replay cannot be interrupted");
            }
            replay::run_replay(&cfg, args, cli.json, shutdown)
        }
        Commands::CheckConfig => {
            print_config(&cfg, cli.json);
            Ok(())
        }
        Commands::Optimize(args) => optimize::run_optimize(&cfg, args, cli.json),
    }
}

fn load_config(path: Option<&Path>) -> eyre::Result<Config> {
    let cfg = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .wrap_err_with(|| format!("read config {}", p.display()))?;
            toml::from_str::<Config>(&text)
                .wrap_err_with(|| format!("parse config {}", p.display()))?
        }
        None => Config::default(),
    };
    cfg.validate()
        .map_err(|e| eyre::Report::new(ReptrackError::Config(e.to_string())))?;
    Ok(cfg)
}

/// Console logs go to stderr so stdout stays machine-readable; `[logging] file`
/// adds a JSON-lines sink.
fn init_tracing(
    json: bool,
    cli_level: Option<&str>,
    logging: &reptrack_config::Logging,
) -> eyre::Result<()> {
    let level = cli_level
        .or(logging.level.as_deref())
        .unwrap_or("info");
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| eyre::Report::new(ReptrackError::Config(format!("log level {level:?}: {e}"))))?,
    };

    let (pretty, json_layer) = if json {
        (None, Some(fmt::layer().json().with_writer(std::io::stderr)))
    } else {
        (
            Some(fmt::layer().with_target(false).with_writer(std::io::stderr)),
            None,
        )
    };

    let file_layer = match logging.file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path.file_name().ok_or_else(|| {
                eyre::Report::new(ReptrackError::Config(
                    "logging.file must name a file".to_string(),
                ))
            })?;
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer))
        }
        None => None,
    };

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json_layer)
        .with(file_layer)
        .try_init();
    Ok(())
}

fn print_config(cfg: &Config, json: bool) {
    let (p, c, d, g) = (&cfg.phase, &cfg.counter, &cfg.diagnostics, &cfg.gate);
    if json {
        let v = json!({
            "ok": true,
            "phase": {
                "top_threshold": p.top_threshold,
                "bottom_threshold": p.bottom_threshold,
                "hysteresis": p.hysteresis,
                "movement_threshold": p.movement_threshold,
                "min_dwell_frames": p.min_dwell_frames,
            },
            "counter": {
                "min_rep_duration_s": c.min_rep_duration_s,
                "max_rep_duration_s": c.max_rep_duration_s,
                "min_form_score": c.min_form_score,
                "stall_timeout_s": c.stall_timeout_s,
                "max_top_hold_s": c.max_top_hold_s,
            },
            "diagnostics": {
                "attempt_timeout_s": d.attempt_timeout_s,
                "max_attempt_phases": d.max_attempt_phases,
                "too_slow_s": d.too_slow_s,
                "angle_buffer": d.angle_buffer,
                "state_buffer": d.state_buffer,
            },
            "gate": {
                "min_confidence": g.min_confidence,
                "min_visible_keypoints": g.min_visible_keypoints,
            },
            "output_dir": cfg.output.dir,
        });
        println!("{v}");
        return;
    }
    println!("Config OK");
    println!(
        "Phase: top {}° / bottom {}° (hysteresis {}°, movement {}°, dwell {} frames)",
        p.top_threshold, p.bottom_threshold, p.hysteresis, p.movement_threshold, p.min_dwell_frames
    );
    println!(
        "Counter: rep duration {}..{} s, min form {}, stall timeout {}, top hold {} s",
        c.min_rep_duration_s,
        c.max_rep_duration_s,
        c.min_form_score,
        c.stall_timeout_s
            .map_or_else(|| "none".to_string(), |t| format!("{t} s")),
        c.max_top_hold_s
    );
    println!(
        "Diagnostics: attempt timeout {} s, max {} phases, too slow {} s",
        d.attempt_timeout_s, d.max_attempt_phases, d.too_slow_s
    );
    println!(
        "Gate: confidence >= {}, keypoints >= {}",
        g.min_confidence, g.min_visible_keypoints
    );
    println!("Output: {}", cfg.output.dir);
}
