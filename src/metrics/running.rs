//! Online accumulators for the forward-pass diagnostics.
//!
//! Uses the incremental mean update for numerical stability, so no values are
//! stored.

/// Online mean.
#[derive(Debug, Clone, Default)]
pub struct RunningMean {
    mean: f64,
    count: usize,
}

impl RunningMean {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one value.
    pub fn update(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
    }

    /// Current mean. NaN when nothing was added.
    pub fn compute(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.mean
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn reset(&mut self) {
        self.mean = 0.0;
        self.count = 0;
    }
}

/// Means over all values and over the strictly positive / non-positive split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchMeans {
    pub all: f64,
    pub positive: f64,
    pub non_positive: f64,
    pub positive_count: usize,
    pub non_positive_count: usize,
}

impl BranchMeans {
    /// Summarises `values`. An empty branch yields a NaN mean.
    pub fn from_slice(values: &[f32]) -> Self {
        let mut all = RunningMean::new();
        let mut positive = RunningMean::new();
        let mut non_positive = RunningMean::new();
        for &v in values {
            let v = f64::from(v);
            all.update(v);
            if v > 0.0 {
                positive.update(v);
            } else {
                non_positive.update(v);
            }
        }
        Self {
            all: all.compute(),
            positive: positive.compute(),
            non_positive: non_positive.compute(),
            positive_count: positive.count(),
            non_positive_count: non_positive.count(),
        }
    }
}
