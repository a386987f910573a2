//! In-memory angle sources for replays and tests.

use std::collections::VecDeque;

use reptrack_traits::{AngleSource, Frame};

/// Replays a fixed list of frames, then reports end of stream.
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    frames: VecDeque<Frame>,
}

impl VecSource {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl AngleSource for VecSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.frames.pop_front())
    }
}

/// Yields the given frames, then fails on the next read.
pub struct FailingSource {
    inner: VecSource,
}

impl FailingSource {
    pub fn after(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            inner: VecSource::new(frames),
        }
    }
}

impl AngleSource for FailingSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error + Send + Sync>> {
        match self.inner.next_frame()? {
            Some(f) => Ok(Some(f)),
            None => Err(Box::new(std::io::Error::other("pose pipeline dropped"))),
        }
    }
}
