//! Core `Layer` trait and the learnable `Parameter` it exposes.

use crate::runtime::backend::{KernelError, KernelResult};
use crate::tensor::Tensor;
use ndarray::{ArrayD, IxDyn};

/// Named learnable tensor together with its accumulated gradient.
///
/// The gradient is only ever added to by backward passes; clearing it between
/// update steps is the caller's job (see [`Parameter::zero_grad`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    value: ArrayD<f32>,
    diff: ArrayD<f32>,
    requires_grad: bool,
}

impl Parameter {
    /// Creates a zero-filled parameter of the given shape.
    pub fn zeros(name: impl Into<String>, shape: &[usize]) -> Self {
        Self {
            name: name.into(),
            value: ArrayD::zeros(IxDyn(shape)),
            diff: ArrayD::zeros(IxDyn(shape)),
            requires_grad: true,
        }
    }

    /// Wraps existing values, e.g. coefficients restored from a checkpoint.
    pub fn from_array(name: impl Into<String>, value: ArrayD<f32>) -> Self {
        let value = value.as_standard_layout().into_owned();
        let diff = ArrayD::zeros(value.raw_dim());
        Self {
            name: name.into(),
            value,
            diff,
            requires_grad: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the parameter; value, gradient and `requires_grad` are kept.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Number of scalar values.
    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Current values.
    pub fn value(&self) -> &ArrayD<f32> {
        &self.value
    }

    /// Value as a flat slice.
    pub fn data(&self) -> &[f32] {
        self.value.as_slice().unwrap_or_default()
    }

    pub fn value_mut(&mut self) -> &mut ArrayD<f32> {
        &mut self.value
    }

    /// Gradient accumulated since the last `zero_grad`.
    pub fn diff(&self) -> &ArrayD<f32> {
        &self.diff
    }

    pub fn diff_mut(&mut self) -> &mut ArrayD<f32> {
        &mut self.diff
    }

    /// Value and gradient as flat slices, borrowed together.
    pub fn value_and_diff_mut(&mut self) -> (&[f32], &mut [f32]) {
        (
            self.value.as_slice().unwrap_or_default(),
            self.diff.as_slice_mut().unwrap_or_default(),
        )
    }

    /// Mutable value alongside the read-only gradient, for optimizers.
    pub fn value_mut_and_diff(&mut self) -> (&mut ArrayD<f32>, &ArrayD<f32>) {
        (&mut self.value, &self.diff)
    }

    /// Whether backward passes accumulate into `diff`.
    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    pub fn set_requires_grad(&mut self, requires_grad: bool) {
        self.requires_grad = requires_grad;
    }

    /// Clears the accumulated gradient.
    pub fn zero_grad(&mut self) {
        self.diff.fill(0.0);
    }

    /// Replaces the value, keeping the shape. The gradient is cleared.
    pub fn load_value(&mut self, value: &ArrayD<f32>) -> KernelResult<()> {
        if value.shape() != self.value.shape() {
            return Err(KernelError::ShapeError(format!(
                "parameter '{}' has shape {:?}, got {:?}",
                self.name,
                self.value.shape(),
                value.shape()
            )));
        }
        self.value.assign(value);
        self.zero_grad();
        Ok(())
    }
}

/// The contract a layer exposes to whatever framework drives it.
///
/// Call order per shape: `setup` once, `reshape` (or `reshape_in_place`) whenever
/// the input shape may have changed, then strictly alternating forward and
/// backward calls of the matching placement.
pub trait Layer {
    /// Registry name of the layer.
    fn layer_type(&self) -> &'static str;

    /// Allocates or validates parameters for a `[batch, channel, ...]` input.
    fn setup(&mut self, bottom_shape: &[usize]) -> KernelResult<()>;

    /// Resizes `top` to match `bottom`; selects separate-buffer execution.
    fn reshape(&mut self, bottom: &Tensor, top: &mut Tensor) -> KernelResult<()>;

    /// Selects in-place execution where one tensor is both input and output.
    fn reshape_in_place(&mut self, blob: &Tensor) -> KernelResult<()>;

    fn forward(&mut self, bottom: &Tensor, top: &mut Tensor) -> KernelResult<()>;

    fn forward_in_place(&mut self, blob: &mut Tensor) -> KernelResult<()>;

    /// Accumulates parameter gradients and, when `bottom_diff` is given,
    /// writes the gradient with respect to `bottom`.
    fn backward(
        &mut self,
        bottom: &Tensor,
        top: &Tensor,
        top_diff: &Tensor,
        bottom_diff: Option<&mut Tensor>,
    ) -> KernelResult<()>;

    /// In-place backward: `diff` holds the output gradient on entry and, when
    /// `propagate_down` is set, the input gradient on exit.
    fn backward_in_place(
        &mut self,
        top: &Tensor,
        diff: &mut Tensor,
        propagate_down: bool,
    ) -> KernelResult<()>;

    fn parameters(&self) -> Vec<&Parameter>;

    fn parameters_mut(&mut self) -> Vec<&mut Parameter>;

    /// Clears every parameter gradient.
    fn zero_grad(&mut self) {
        for param in self.parameters_mut() {
            param.zero_grad();
        }
    }
}
