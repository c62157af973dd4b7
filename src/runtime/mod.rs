//! Execution backends for the activation numerics.
//!
//! `backend` declares the device seam and the shared error type,
//! `cpu_backend` is the only implementation shipped here.

pub mod backend;
pub mod cpu_backend;

pub use backend::{Backend, ChannelGeometry, KernelError, KernelResult, ShapeParam};
pub use cpu_backend::CpuBackend;
