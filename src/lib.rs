//! # pnelu: parametric nonlinear activation kernel
//!
//! A CPU implementation of the PNELU activation and its exact gradients:
//!
//! ```text
//! y = max(x, 0) + slope[c] * (max(0, 1 + (1 - t) * min(x, 0))^(1 / (1 - t)) - 1)
//! ```
//!
//! `slope` is learnable, one value per channel (axis 1) or one shared value,
//! and `t` is a fixed shape parameter. The layer supports separate and
//! in-place execution and accumulates the slope gradient across backward
//! calls until the caller clears it.
//!
//! ## Usage Example
//!
//! ```no_run
//! use pnelu::nn::{Layer, Pnelu, PneluConfig};
//! use pnelu::tensor::Tensor;
//!
//! let mut act = Pnelu::new(PneluConfig::new(0.5));
//! let x = Tensor::from_shape_vec(&[2, 3, 4], vec![0.1; 24]).unwrap();
//! let mut y = Tensor::zeros(&[1]);
//! act.setup(x.shape()).unwrap();
//! act.reshape(&x, &mut y).unwrap();
//! act.forward(&x, &mut y).unwrap();
//!
//! let dy = Tensor::from_shape_vec(&[2, 3, 4], vec![1.0; 24]).unwrap();
//! let mut dx = Tensor::zeros(&[2, 3, 4]);
//! act.zero_grad();
//! act.backward(&x, &y, &dy, Some(&mut dx)).unwrap();
//! ```

pub mod metrics;
pub mod nn;
pub mod optimizers;
pub mod runtime;
pub mod tensor;

pub use nn::{Layer, Parameter, Pnelu, PneluConfig};
pub use runtime::{KernelError, KernelResult};
pub use tensor::Tensor;
