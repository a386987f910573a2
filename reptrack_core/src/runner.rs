use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eyre::WrapErr;
use serde::Serialize;

use reptrack_traits::{AngleSource, Clock};

use crate::error::{ReptrackError, Result};
use crate::session::Session;

/// How a replay should be driven.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunParams {
    /// Sleep the inter-sample delta between frames (real-time replay).
    pub pace: bool,
    /// Stop after this many frames.
    pub max_frames: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub frames: u64,
    pub invalid_frames: u64,
    pub reps_completed: u32,
    /// Stopped by the shutdown flag before the source ran dry.
    pub interrupted: bool,
}

#[inline]
fn stop_requested(shutdown: Option<&AtomicBool>) -> bool {
    shutdown.is_some_and(|f| f.load(Ordering::Relaxed))
}

/// Gap to sleep before a frame at `ts` when pacing; zero for the first frame,
/// for non-increasing timestamps and for gaps too large to represent.
#[inline]
fn pace_delay(prev: Option<f64>, ts: f64) -> Duration {
    match prev {
        Some(p) if ts > p => Duration::try_from_secs_f64(ts - p).unwrap_or(Duration::ZERO),
        _ => Duration::ZERO,
    }
}

/// Pull frames from `source` into `session` until the source is exhausted,
/// `max_frames` is reached or `shutdown` is raised.
pub fn run<S, C>(
    source: &mut S,
    session: &mut Session,
    clock: &C,
    params: RunParams,
    shutdown: Option<&AtomicBool>,
) -> Result<RunStats>
where
    S: AngleSource + ?Sized,
    C: Clock,
{
    let mut stats = RunStats::default();
    let mut prev_ts: Option<f64> = None;
    let started = clock.now();
    tracing::info!(session = session.id(), pace = params.pace, max_frames = ?params.max_frames, "replay start");

    loop {
        if stop_requested(shutdown) {
            stats.interrupted = true;
            tracing::warn!(frames = stats.frames, "replay interrupted");
            break;
        }
        if params.max_frames.is_some_and(|m| stats.frames >= m) {
            break;
        }

        let frame = match source.next_frame() {
            Ok(Some(f)) => f,
            Ok(None) => break,
            Err(e) => {
                return Err(eyre::Report::new(ReptrackError::Source(e.to_string())))
                    .wrap_err_with(|| format!("reading frame {}", stats.frames + 1));
            }
        };

        if params.pace {
            clock.sleep(pace_delay(prev_ts, frame.sample.timestamp));
            prev_ts = Some(frame.sample.timestamp);
        }

        let status = session.process(&frame);
        stats.frames += 1;
        if !status.accepted {
            stats.invalid_frames += 1;
        }
        if status.rep_completed {
            stats.reps_completed += 1;
        }
    }

    tracing::info!(
        frames = stats.frames,
        invalid = stats.invalid_frames,
        reps = stats.reps_completed,
        elapsed_s = clock.secs_since(started),
        "replay done"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pace_delay_only_moves_forward() {
        assert_eq!(pace_delay(None, 1.0), Duration::ZERO);
        assert_eq!(pace_delay(Some(1.0), 1.5), Duration::from_millis(500));
        assert_eq!(pace_delay(Some(2.0), 1.5), Duration::ZERO);
        assert_eq!(pace_delay(Some(2.0), f64::NAN), Duration::ZERO);
    }

    #[test]
    fn stop_flag() {
        let f = AtomicBool::new(false);
        assert!(!stop_requested(None));
        assert!(!stop_requested(Some(&f)));
        f.store(true, Ordering::Relaxed);
        assert!(stop_requested(Some(&f)));
    }
}
