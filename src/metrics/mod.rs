//! Forward-pass diagnostics.
//!
//! The kernel can report summary means of its inputs and outputs to an
//! injectable [`StatsObserver`]. Observers only read; they never influence
//! the numeric results.
//!
//! # Example
//!
//! ```rust,ignore
//! use pnelu::metrics::TracingObserver;
//! use pnelu::nn::{Pnelu, PneluConfig};
//!
//! let layer = Pnelu::new(PneluConfig::default()).with_observer(TracingObserver::new());
//! ```

pub mod running;

pub use running::{BranchMeans, RunningMean};

/// Means reported after one forward call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForwardStats {
    pub input: BranchMeans,
    pub output: BranchMeans,
}

impl ForwardStats {
    pub fn collect(input: &[f32], output: &[f32]) -> Self {
        Self {
            input: BranchMeans::from_slice(input),
            output: BranchMeans::from_slice(output),
        }
    }
}

/// Sink for forward diagnostics.
pub trait StatsObserver: Send {
    fn observe(&mut self, layer: &str, stats: &ForwardStats);
}

impl<F> StatsObserver for F
where
    F: FnMut(&str, &ForwardStats) + Send,
{
    fn observe(&mut self, layer: &str, stats: &ForwardStats) {
        self(layer, stats)
    }
}

/// Emits the six means as a `tracing` debug event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl TracingObserver {
    pub fn new() -> Self {
        Self
    }
}

impl StatsObserver for TracingObserver {
    fn observe(&mut self, layer: &str, stats: &ForwardStats) {
        tracing::debug!(
            layer,
            input_mean = stats.input.all,
            input_pos_mean = stats.input.positive,
            input_neg_mean = stats.input.non_positive,
            output_mean = stats.output.all,
            output_pos_mean = stats.output.positive,
            output_neg_mean = stats.output.non_positive,
            "forward statistics"
        );
    }
}
