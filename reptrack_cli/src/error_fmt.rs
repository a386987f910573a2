//! Human-readable error descriptions and structured JSON error formatting.

use reptrack_core::error::{BuildError, ReptrackError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSessionId => {
                "What happened: No session id was provided.\nLikely causes: An empty --session-id was passed.\nHow to fix: Pass a non-empty id (e.g., `reptrack replay --session-id morning ...`) or omit the flag to generate one.".to_string()
            }
            BuildError::UnsafeSessionId(id) => format!(
                "What happened: Session id {id:?} cannot be used in output file names.\nLikely causes: The id contains a path separator or is '.'/'..'.\nHow to fix: Pass a plain id such as `morning_1` to --session-id."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid tracking configuration ({msg}).\nLikely causes: Out-of-range thresholds in the TOML.\nHow to fix: Run `reptrack check-config` against the file, fix the reported field, then rerun."
            ),
        };
    }

    if let Some(re) = err.downcast_ref::<ReptrackError>() {
        return match re {
            ReptrackError::Config(msg) => format!(
                "What happened: Configuration is invalid ({msg}).\nLikely causes: A value in the TOML is out of range or inconsistent with another.\nHow to fix: Edit the named field in the config file and rerun `reptrack check-config`."
            ),
            ReptrackError::Source(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("samples csv must have headers") {
                    "What happened: Invalid headers in samples CSV.\nLikely causes: Columns renamed or reordered.\nHow to fix: Use the header 'timestamp,angle,confidence,visible_keypoints[,form_score]'.".to_string()
                } else if lower.contains("non-decreasing") {
                    format!(
                        "What happened: Sample timestamps go backwards ({msg}).\nLikely causes: Concatenated recordings or a clock reset.\nHow to fix: Sort the CSV by timestamp or split it into separate sessions."
                    )
                } else if lower.contains("session document") {
                    format!(
                        "What happened: Could not load session documents ({msg}).\nLikely causes: No replay has exported into this directory yet, or the files were edited by hand.\nHow to fix: Run `reptrack replay` first, or point --in-dir at its output directory."
                    )
                } else if lower.contains("open samples csv") {
                    format!(
                        "What happened: Could not open the samples file ({msg}).\nLikely causes: Wrong path or missing permissions.\nHow to fix: Check the --samples path."
                    )
                } else {
                    format!(
                        "What happened: The angle source failed ({msg}).\nLikely causes: Malformed rows or an interrupted pose pipeline.\nHow to fix: Re-run with --log-level=debug and check the reported row."
                    )
                }
            }
            ReptrackError::Io(msg) => format!(
                "What happened: Could not write output ({msg}).\nLikely causes: Output directory not writable or disk full.\nHow to fix: Pass a writable --out-dir/--out or fix [output] dir in the config."
            ),
            ReptrackError::State(msg) => format!(
                "What happened: {msg}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config parsing
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("parse config") || lower.contains("read config") {
        let cause = err.root_cause();
        return format!(
            "What happened: The config file could not be loaded ({cause}).\nLikely causes: Wrong path, TOML syntax error or a value of the wrong type.\nHow to fix: Fix the file (see etc/reptrack.toml for a sample) or omit --config to use defaults."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Short stable name for the error class, used in JSON output.
pub fn error_reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidSession";
    }
    match err.downcast_ref::<ReptrackError>() {
        Some(ReptrackError::Config(_)) => "Config",
        Some(ReptrackError::Source(_)) => "Source",
        Some(ReptrackError::Io(_)) => "Io",
        Some(ReptrackError::State(_)) => "State",
        None => "Error",
    }
}

/// Stable exit codes: 3 config, 4 angle source, 5 output; anything else 1.
/// (clap reports usage errors itself with code 2.)
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 3;
    }
    match err.downcast_ref::<ReptrackError>() {
        Some(ReptrackError::Config(_)) => 3,
        Some(ReptrackError::Source(_)) => 4,
        Some(ReptrackError::Io(_)) => 5,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": error_reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
