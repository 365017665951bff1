use serde::{Deserialize, Serialize};

/// Online mean and population variance accumulator (Welford).
#[derive(Debug, Copy, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RunningStat {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RunningStat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_value(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// Number of samples seen, used as the minimum sample gate before alerting.
    pub fn sample_count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population variance, `0.0` before any sample.
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Distance of `value` from the running mean in standard deviations.
    ///
    /// Returns `0.0` (no deviation) when fewer than two samples exist or the standard deviation
    /// is zero, so callers never observe `NaN` or infinity.
    pub fn num_std_dev(&self, value: f64) -> f64 {
        let std_dev = self.std_dev();
        if self.count < 2 || std_dev <= f64::EPSILON {
            return 0.0;
        }
        (value - self.mean).abs() / std_dev
    }

    /// True if `value` lies at least `k` standard deviations from the mean.
    pub fn exceeds(&self, value: f64, k: f64) -> bool {
        self.num_std_dev(value) >= k
    }
}
