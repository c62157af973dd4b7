//! # Layers
//!
//! - [`Pnelu`]: parametric nonlinear activation with learnable slopes
//! - [`Layer`]: the setup / reshape / forward / backward contract
//! - [`Parameter`]: learnable tensor with an accumulated gradient
//! - [`Filler`], [`FillerConfig`]: parameter initialisation strategies
//!
//! ## Example
//!
//! ```ignore
//! use pnelu::nn::{Layer, Pnelu, PneluConfig};
//! use pnelu::tensor::Tensor;
//!
//! let mut act = Pnelu::new(PneluConfig::new(0.5).with_channel_shared(true));
//! act.setup(x.shape())?;
//! act.reshape(&x, &mut y)?;
//! act.forward(&x, &mut y)?;
//! act.backward(&x, &y, &dy, Some(&mut dx))?;
//! ```

pub mod filler;
pub mod module;
pub mod pnelu;

pub use filler::{Filler, FillerConfig};
pub use module::{Layer, Parameter};
pub use pnelu::{Placement, Pnelu, PneluConfig};
