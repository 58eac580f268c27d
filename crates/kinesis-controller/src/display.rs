//! Sinks for the fuel gauge.

/// Receives the fuel fill ratio once per frame.
pub trait FuelDisplay {
    /// Show `ratio` in [0, 1].
    fn set_fill(&mut self, ratio: f32);
}

impl<F: FnMut(f32)> FuelDisplay for F {
    fn set_fill(&mut self, ratio: f32) {
        self(ratio)
    }
}

/// Display that remembers the last value it was given.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FuelGauge {
    fill: f32,
    updates: u64,
}

impl FuelGauge {
    /// Last fill ratio shown.
    pub fn fill(&self) -> f32 {
        self.fill
    }

    /// Number of frames that updated the gauge.
    pub fn updates(&self) -> u64 {
        self.updates
    }
}

impl FuelDisplay for FuelGauge {
    fn set_fill(&mut self, ratio: f32) {
        self.fill = ratio.clamp(0.0, 1.0);
        self.updates += 1;
    }
}
