//! Initialisation strategies for learnable coefficients.

use ndarray::ArrayD;
use ndarray_rand::rand_distr::{Normal, Uniform};
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::runtime::backend::{KernelError, KernelResult};

/// Fills a freshly allocated parameter tensor in place.
pub trait Filler: Send {
    fn fill(&self, values: &mut ArrayD<f32>) -> KernelResult<()>;
}

/// Serializable description of a built-in filler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FillerConfig {
    Constant {
        value: f32,
    },
    Uniform {
        min: f32,
        max: f32,
        #[serde(default)]
        seed: Option<u64>,
    },
    Gaussian {
        mean: f32,
        std: f32,
        #[serde(default)]
        seed: Option<u64>,
    },
    /// Uniform in `[0, 1)`, then each row along axis 0 scaled to sum to 1.
    PositiveUnitball {
        #[serde(default)]
        seed: Option<u64>,
    },
}

impl Default for FillerConfig {
    fn default() -> Self {
        FillerConfig::Constant { value: 1.0 }
    }
}

fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

impl Filler for FillerConfig {
    fn fill(&self, values: &mut ArrayD<f32>) -> KernelResult<()> {
        match *self {
            FillerConfig::Constant { value } => {
                values.fill(value);
            }
            FillerConfig::Uniform { min, max, seed } => {
                if max <= min || !(max - min).is_finite() {
                    return Err(KernelError::ConfigurationError(format!(
                        "uniform filler needs min < max, got [{}, {}]",
                        min, max
                    )));
                }
                let mut rng = rng_for(seed);
                *values = ArrayD::random_using(values.raw_dim(), Uniform::new(min, max), &mut rng);
            }
            FillerConfig::Gaussian { mean, std, seed } => {
                if !(std >= 0.0) {
                    return Err(KernelError::ConfigurationError(format!(
                        "gaussian filler needs std >= 0, got {}",
                        std
                    )));
                }
                let normal = Normal::new(mean, std).map_err(|e| {
                    KernelError::ConfigurationError(format!("gaussian filler: {}", e))
                })?;
                let mut rng = rng_for(seed);
                *values = ArrayD::random_using(values.raw_dim(), normal, &mut rng);
            }
            FillerConfig::PositiveUnitball { seed } => {
                let mut rng = rng_for(seed);
                *values =
                    ArrayD::random_using(values.raw_dim(), Uniform::new(0.0f32, 1.0), &mut rng);
                let rows = values.shape().first().copied().unwrap_or(1).max(1);
                let per_row = values.len() / rows;
                if let Some(flat) = values.as_slice_mut() {
                    for row in flat.chunks_mut(per_row.max(1)) {
                        let sum: f32 = row.iter().sum();
                        if sum > 0.0 {
                            row.iter_mut().for_each(|v| *v /= sum);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
