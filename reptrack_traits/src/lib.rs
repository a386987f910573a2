pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// One joint-angle measurement produced by the pose collaborator.
///
/// `angle == 0.0` is the sentinel for "no usable detection this frame".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleSample {
    /// Joint angle in degrees.
    pub angle: f64,
    /// Pose confidence in `[0, 1]`.
    pub confidence: f64,
    /// Number of keypoints visible in the frame.
    pub visible_keypoints: u32,
    /// Monotonic capture time in seconds.
    pub timestamp: f64,
}

impl AngleSample {
    pub fn new(angle: f64, confidence: f64, visible_keypoints: u32, timestamp: f64) -> Self {
        Self {
            angle,
            confidence,
            visible_keypoints,
            timestamp,
        }
    }

    /// True when the producer reported a detection (non-zero, finite angle).
    #[inline]
    pub fn has_detection(&self) -> bool {
        self.angle != 0.0 && self.angle.is_finite()
    }
}

/// A sample plus the optional form score computed for the same frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub sample: AngleSample,
    pub form_score: Option<f64>,
}

impl Frame {
    pub fn new(sample: AngleSample, form_score: Option<f64>) -> Self {
        Self { sample, form_score }
    }
}

impl From<AngleSample> for Frame {
    fn from(sample: AngleSample) -> Self {
        Self {
            sample,
            form_score: None,
        }
    }
}

/// Source of per-frame angle samples (live pose pipeline, recorded file, ...).
///
/// `Ok(None)` signals the end of the stream.
pub trait AngleSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error + Send + Sync>>;
}

impl<S: AngleSource + ?Sized> AngleSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error + Send + Sync>> {
        (**self).next_frame()
    }
}
