//! Parameter update rules.
//!
//! Optimizers read the gradients accumulated by backward passes and update
//! parameter values in place. Gradients are left untouched; call
//! `Layer::zero_grad` before the next accumulation.

use crate::nn::module::Parameter;

/// Common interface for optimizers.
pub trait Optimizer {
    /// Performs one update step over `parameters`.
    fn step(&self, parameters: Vec<&mut Parameter>);
}

/// Stochastic gradient descent: `value -= lr * diff`.
pub struct Sgd {
    lr: f32,
}

impl Sgd {
    pub fn new(lr: f32) -> Self {
        Self { lr }
    }

    pub fn lr(&self) -> f32 {
        self.lr
    }
}

impl Optimizer for Sgd {
    fn step(&self, parameters: Vec<&mut Parameter>) {
        for param in parameters {
            if !param.requires_grad() {
                continue;
            }
            let (value, diff) = param.value_mut_and_diff();
            ndarray::azip!((v in value, &g in diff) *v -= self.lr * g);
        }
    }
}
