#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and sample-recording parsing for the rep tracker.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The samples CSV loader enforces headers and timestamp ordering before
//!   handing frames to the replay runner.
use reptrack_traits::{AngleSample, Frame};
use serde::{Deserialize, Serialize};

/// Phase detection thresholds (degrees / frames).
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PhaseCfg {
    /// Angle at or above which the joint counts as extended (Top).
    pub top_threshold: f64,
    /// Angle at or below which the joint counts as flexed (Bottom).
    pub bottom_threshold: f64,
    /// Band widening applied while already in the phase it favors.
    pub hysteresis: f64,
    /// Minimum frame-to-frame change that counts as movement.
    pub movement_threshold: f64,
    /// Updates a phase must persist before a transition away is accepted.
    pub min_dwell_frames: u32,
}

impl Default for PhaseCfg {
    fn default() -> Self {
        Self {
            top_threshold: 150.0,
            bottom_threshold: 100.0,
            hysteresis: 5.0,
            movement_threshold: 3.0,
            min_dwell_frames: 1,
        }
    }
}

/// Repetition gates.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CounterCfg {
    pub min_rep_duration_s: f64,
    pub max_rep_duration_s: f64,
    /// Reps whose mean form score falls below this are not counted.
    pub min_form_score: f64,
    /// Abandon a half-finished cycle after this many seconds. Absent = wait forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stall_timeout_s: Option<f64>,
    /// Longest rest at Top before a rep window starts timing from the latest frame.
    pub max_top_hold_s: f64,
}

impl Default for CounterCfg {
    fn default() -> Self {
        Self {
            min_rep_duration_s: 2.0,
            max_rep_duration_s: 10.0,
            min_form_score: 60.0,
            stall_timeout_s: None,
            max_top_hold_s: 2.0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DiagnosticsCfg {
    /// Attempts open longer than this fail as runaway.
    pub attempt_timeout_s: f64,
    /// Attempts with more logged phases than this fail as runaway.
    pub max_attempt_phases: usize,
    /// Failed attempts slower than this are classified `too_slow`.
    pub too_slow_s: f64,
    /// Rolling angle buffer used for session statistics.
    pub angle_buffer: usize,
    /// Rolling phase buffer used for pattern inspection.
    pub state_buffer: usize,
}

impl Default for DiagnosticsCfg {
    fn default() -> Self {
        Self {
            attempt_timeout_s: 15.0,
            max_attempt_phases: 50,
            too_slow_s: 12.0,
            angle_buffer: 50,
            state_buffer: 20,
        }
    }
}

/// Per-sample admission gate applied before the state machine sees a frame.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct GateCfg {
    pub min_confidence: f64,
    pub min_visible_keypoints: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Logging {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>, // path to .log (JSON lines)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Output {
    /// Directory receiving the transition, attempt and summary documents.
    pub dir: String,
}

impl Default for Output {
    fn default() -> Self {
        Self {
            dir: "rep_analysis_logs".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub phase: PhaseCfg,
    pub counter: CounterCfg,
    pub diagnostics: DiagnosticsCfg,
    pub gate: GateCfg,
    pub logging: Logging,
    pub output: Output,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Render a config back to TOML; `load_toml` reads the result unchanged.
pub fn to_toml(cfg: &Config) -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Phase
        let p = &self.phase;
        for (name, v) in [
            ("phase.top_threshold", p.top_threshold),
            ("phase.bottom_threshold", p.bottom_threshold),
        ] {
            if !(v.is_finite() && v > 0.0 && v <= 180.0) {
                eyre::bail!("{name} must be in (0, 180]");
            }
        }
        if p.bottom_threshold >= p.top_threshold {
            eyre::bail!("phase.bottom_threshold must be < phase.top_threshold");
        }
        if !p.hysteresis.is_finite() || p.hysteresis < 0.0 {
            eyre::bail!("phase.hysteresis must be >= 0");
        }
        if 2.0 * p.hysteresis >= p.top_threshold - p.bottom_threshold {
            eyre::bail!("phase.hysteresis must be less than half the top/bottom gap");
        }
        if !p.movement_threshold.is_finite() || p.movement_threshold < 0.0 {
            eyre::bail!("phase.movement_threshold must be >= 0");
        }
        if p.min_dwell_frames == 0 {
            eyre::bail!("phase.min_dwell_frames must be >= 1");
        }

        // Counter
        let c = &self.counter;
        if !c.min_rep_duration_s.is_finite() || c.min_rep_duration_s < 0.0 {
            eyre::bail!("counter.min_rep_duration_s must be >= 0");
        }
        if !c.max_rep_duration_s.is_finite() || c.max_rep_duration_s <= c.min_rep_duration_s {
            eyre::bail!("counter.max_rep_duration_s must be > counter.min_rep_duration_s");
        }
        if !(0.0..=100.0).contains(&c.min_form_score) {
            eyre::bail!("counter.min_form_score must be in [0, 100]");
        }
        if let Some(t) = c.stall_timeout_s
            && !(t.is_finite() && t > 0.0)
        {
            eyre::bail!("counter.stall_timeout_s must be > 0");
        }
        if !(c.max_top_hold_s.is_finite() && c.max_top_hold_s > 0.0) {
            eyre::bail!("counter.max_top_hold_s must be > 0");
        }

        // Diagnostics
        let d = &self.diagnostics;
        if !d.attempt_timeout_s.is_finite() || d.attempt_timeout_s <= 0.0 {
            eyre::bail!("diagnostics.attempt_timeout_s must be > 0");
        }
        if d.max_attempt_phases == 0 {
            eyre::bail!("diagnostics.max_attempt_phases must be >= 1");
        }
        if !d.too_slow_s.is_finite() || d.too_slow_s <= 0.0 {
            eyre::bail!("diagnostics.too_slow_s must be > 0");
        }
        if d.angle_buffer == 0 {
            eyre::bail!("diagnostics.angle_buffer must be >= 1");
        }
        if d.state_buffer == 0 {
            eyre::bail!("diagnostics.state_buffer must be >= 1");
        }

        // Gate
        if !(0.0..=1.0).contains(&self.gate.min_confidence) {
            eyre::bail!("gate.min_confidence must be in [0.0, 1.0]");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot}");
        }

        Ok(())
    }
}

/// Recorded samples CSV schema.
///
/// Expected headers:
/// timestamp,angle,confidence,visible_keypoints[,form_score]
///
/// Example:
/// timestamp,angle,confidence,visible_keypoints,form_score
/// 0.000,178.2,0.91,33,95
/// 0.033,177.9,0.92,33,
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct SampleRow {
    pub timestamp: f64,
    pub angle: f64,
    pub confidence: f64,
    pub visible_keypoints: u32,
    #[serde(default)]
    pub form_score: Option<f64>,
}

impl From<SampleRow> for Frame {
    fn from(r: SampleRow) -> Self {
        Frame::new(
            AngleSample::new(r.angle, r.confidence, r.visible_keypoints, r.timestamp),
            r.form_score,
        )
    }
}

const SAMPLE_HEADERS: [&str; 4] = ["timestamp", "angle", "confidence", "visible_keypoints"];

/// Parse a samples recording from any reader.
pub fn parse_samples_csv<R: std::io::Read>(reader: R) -> eyre::Result<Vec<Frame>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    // Enforce exact headers, form_score optional
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read samples CSV headers: {}", e))?
        .clone();
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    let base_ok = actual.len() >= SAMPLE_HEADERS.len()
        && actual[..SAMPLE_HEADERS.len()]
            .iter()
            .zip(SAMPLE_HEADERS)
            .all(|(a, e)| a == e);
    let tail_ok = match actual.len() {
        4 => true,
        5 => actual[4] == "form_score",
        _ => false,
    };
    if !(base_ok && tail_ok) {
        eyre::bail!(
            "samples CSV must have headers 'timestamp,angle,confidence,visible_keypoints[,form_score]', got: {}",
            actual.join(",")
        );
    }

    let mut frames = Vec::new();
    let mut last_ts = f64::NEG_INFINITY;
    for (idx, rec) in rdr.deserialize::<SampleRow>().enumerate() {
        let row = match rec {
            Ok(row) => row,
            Err(e) => eyre::bail!("invalid CSV row {}: {}", idx + 2, e),
        };
        if !row.timestamp.is_finite() {
            eyre::bail!("invalid CSV row {}: timestamp must be finite", idx + 2);
        }
        if row.timestamp < last_ts {
            eyre::bail!(
                "samples timestamps must be non-decreasing (row {}: {} < {})",
                idx + 2,
                row.timestamp,
                last_ts
            );
        }
        last_ts = row.timestamp;
        frames.push(Frame::from(row));
    }
    Ok(frames)
}

pub fn load_samples_csv(path: &std::path::Path) -> eyre::Result<Vec<Frame>> {
    let file = std::fs::File::open(path)
        .map_err(|e| eyre::eyre!("open samples CSV {:?}: {}", path, e))?;
    parse_samples_csv(file).map_err(|e| eyre::eyre!("{:?}: {}", path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        Config::default().validate().expect("defaults are valid");
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg = load_toml("").expect("parse");
        assert_eq!(cfg.phase.top_threshold, 150.0);
        assert_eq!(cfg.counter.stall_timeout_s, None);
        assert_eq!(cfg.output.dir, "rep_analysis_logs");
    }

    #[test]
    fn rendered_toml_reloads() {
        let mut cfg = Config::default();
        cfg.phase.top_threshold = 158.5;
        cfg.counter.stall_timeout_s = Some(20.0);
        let text = to_toml(&cfg).expect("render");
        assert!(text.contains("[phase]"));
        assert!(!text.contains("rotation"));
        let back = load_toml(&text).expect("reload");
        assert_eq!(back.phase.top_threshold, 158.5);
        assert_eq!(back.counter.stall_timeout_s, Some(20.0));
        assert!(back.logging.file.is_none());
        back.validate().expect("still valid");
    }
}
