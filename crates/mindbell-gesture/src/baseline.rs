//! Zero-reference capture after a warm-up period.

use crate::sample::ChannelValues;

/// Captures the reference point that later deltas are measured against.
///
/// The first frames after activation can carry stale values from the
/// capture device, so a configurable number of frames is skipped before
/// the baseline is taken. The frame that sets the baseline yields no delta.
#[derive(Debug, Clone)]
pub struct BaselineCapture {
    baseline: Option<ChannelValues>,
    frames_to_skip: u32,
    frames_remaining: u32,
}

impl BaselineCapture {
    pub fn new(frames_to_skip: u32) -> Self {
        Self {
            baseline: None,
            frames_to_skip,
            frames_remaining: frames_to_skip,
        }
    }

    /// Observe one smoothed sample and return its delta from the baseline.
    pub fn observe(&mut self, smoothed: ChannelValues) -> Option<ChannelValues> {
        if self.frames_remaining > 0 {
            self.frames_remaining -= 1;
            return None;
        }

        match self.baseline {
            Some(baseline) => Some(smoothed - baseline),
            None => {
                self.baseline = Some(smoothed);
                None
            }
        }
    }

    pub fn baseline(&self) -> Option<ChannelValues> {
        self.baseline
    }

    pub fn is_set(&self) -> bool {
        self.baseline.is_some()
    }

    pub fn frames_remaining(&self) -> u32 {
        self.frames_remaining
    }

    /// Change the warm-up length used by the next reset.
    pub fn set_frames_to_skip(&mut self, frames_to_skip: u32) {
        self.frames_to_skip = frames_to_skip;
    }

    /// Unset the baseline and restart the warm-up count.
    pub fn reset(&mut self) {
        self.baseline = None;
        self.frames_remaining = self.frames_to_skip;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(primary: f64, lateral: f64) -> ChannelValues {
        ChannelValues::new(primary, lateral)
    }

    #[test]
    fn test_skip_then_capture_then_delta() {
        let mut capture = BaselineCapture::new(3);

        for _ in 0..3 {
            assert_eq!(capture.observe(values(9.0, 9.0)), None);
        }
        assert!(!capture.is_set());

        // (N+1)th sets the baseline without a delta
        assert_eq!(capture.observe(values(0.1, -0.2)), None);
        assert!(capture.is_set());

        // (N+2)th yields sample - baseline
        let delta = capture.observe(values(0.3, 0.0)).unwrap();
        assert!((delta.primary - 0.2).abs() < 1e-12);
        assert!((delta.lateral - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_zero_skip_captures_first_frame() {
        let mut capture = BaselineCapture::new(0);
        assert_eq!(capture.observe(values(1.0, 1.0)), None);
        assert_eq!(capture.observe(values(1.0, 1.5)), Some(values(0.0, 0.5)));
    }

    #[test]
    fn test_baseline_is_set_once() {
        let mut capture = BaselineCapture::new(0);
        capture.observe(values(0.5, 0.5));
        for _ in 0..10 {
            capture.observe(values(2.0, 2.0));
        }
        assert_eq!(capture.baseline(), Some(values(0.5, 0.5)));
    }

    #[test]
    fn test_reset_restores_skip_count() {
        let mut capture = BaselineCapture::new(2);
        for _ in 0..4 {
            capture.observe(values(0.0, 0.0));
        }
        assert!(capture.is_set());

        capture.set_frames_to_skip(1);
        capture.reset();
        assert!(!capture.is_set());
        assert_eq!(capture.frames_remaining(), 1);
    }
}
