//! Concrete n-dimensional tensor used by the kernel.
//!
//! A thin wrapper over `ndarray::ArrayD<f32>` that always keeps its storage in
//! standard (row-major, contiguous) layout so the kernel can work on flat
//! slices. Axis 0 is the batch, axis 1 the channel.

use crate::runtime::backend::{KernelError, KernelResult};
use ndarray::{ArrayD, IxDyn};

/// Caller-owned tensor of `f32` values.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: ArrayD<f32>,
}

impl Tensor {
    /// Creates a zero-filled tensor of the given shape.
    pub fn zeros(shape: &[usize]) -> Self {
        Self {
            data: ArrayD::zeros(IxDyn(shape)),
        }
    }

    /// Creates a tensor from a flat vector in row-major order.
    pub fn from_shape_vec(shape: &[usize], values: Vec<f32>) -> KernelResult<Self> {
        let data = ArrayD::from_shape_vec(IxDyn(shape), values)
            .map_err(|e| KernelError::ShapeError(format!("{:?}: {}", shape, e)))?;
        Ok(Self { data })
    }

    /// Wraps an existing array, copying it into standard layout if needed.
    pub fn from_array(array: ArrayD<f32>) -> Self {
        let data = if array.is_standard_layout() {
            array
        } else {
            array.as_standard_layout().into_owned()
        };
        Self { data }
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Resizes to `shape`. Keeps the current contents when the shape already
    /// matches, otherwise reallocates with zeros.
    pub fn reshape(&mut self, shape: &[usize]) {
        if self.data.shape() != shape {
            self.data = ArrayD::zeros(IxDyn(shape));
        }
    }

    /// Copies `other`'s values into `self`, reshaping first when needed.
    pub fn copy_from(&mut self, other: &Tensor) {
        self.reshape(other.shape());
        self.data.assign(&other.data);
    }

    pub fn data(&self) -> &[f32] {
        // Standard layout is maintained by every constructor.
        self.data.as_slice().unwrap_or_default()
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        self.data.as_slice_mut().unwrap_or_default()
    }
}
