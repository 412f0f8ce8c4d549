use anyhow::{bail, Result};

/// Steps through frames `init..end` of a sequence, one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencePlayer {
    init: usize,
    end: usize,
    current: Option<usize>,
}

impl SequencePlayer {
    /// A player over `init..end` of a sequence of `len` frames.
    pub fn new(len: usize, init: usize, end: usize) -> Result<Self> {
        if end > len {
            bail!("Sequence end {end} is past the last frame ({len} frames)");
        }
        if init > end {
            bail!("Sequence start {init} is after its end {end}");
        }
        Ok(Self {
            init,
            end,
            current: (init < end).then_some(init),
        })
    }

    /// Frame currently shown, `None` once playback has finished.
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    /// Move to the next frame and return it.
    pub fn advance(&mut self) -> Option<usize> {
        self.current = self.current.map(|i| i + 1).filter(|&i| i < self.end);
        self.current
    }

    pub fn is_finished(&self) -> bool {
        self.current.is_none()
    }

    /// Start over from the first frame of the range.
    pub fn rewind(&mut self) {
        self.current = (self.init < self.end).then_some(self.init);
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.init..self.end
    }
}
