//! Exponential low-pass filtering of raw channels.

/// Single-channel IIR smoother.
///
/// `smoothed = (1 - factor) * raw + factor * previous`. A higher factor is
/// smoother and slower to follow the input.
#[derive(Debug, Clone, Default)]
pub struct SignalSmoother {
    value: f64,
    initialized: bool,
}

impl SignalSmoother {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw value and return the smoothed value.
    ///
    /// The first call after a reset passes the raw value through unchanged.
    pub fn update(&mut self, raw: f64, factor: f64) -> f64 {
        if !self.initialized {
            self.value = raw;
            self.initialized = true;
        } else {
            self.value = (1.0 - factor) * raw + factor * self.value;
        }
        self.value
    }

    /// Current smoothed value, if any sample has been seen.
    pub fn value(&self) -> Option<f64> {
        self.initialized.then_some(self.value)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
        self.initialized = false;
    }
}
