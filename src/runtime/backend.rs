//! Abstract interface for execution backends, shared error type and the
//! value types every backend receives.

use thiserror::Error;

/// Errors raised by the activation kernel. Shared by every backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    #[error("Tensor shape error: {0}. Check the input tensor dimensions.")]
    ShapeError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

pub type KernelResult<T> = std::result::Result<T, KernelError>;

/// Validated shape parameter `t` of the activation.
///
/// Holds the precomputed `1 - t` and `1 / (1 - t)` so the hot loops never
/// divide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeParam {
    t: f32,
    one_minus_t: f32,
    inv_one_minus_t: f32,
}

impl ShapeParam {
    /// Validates `t`. Fails for `t == 1` (the exponent `1 / (1 - t)` is
    /// undefined) and for non-finite values.
    pub fn new(t: f32) -> KernelResult<Self> {
        if !t.is_finite() {
            return Err(KernelError::ConfigurationError(format!(
                "shape parameter t must be finite, got {}",
                t
            )));
        }
        let one_minus_t = 1.0 - t;
        if one_minus_t == 0.0 {
            return Err(KernelError::ConfigurationError(
                "shape parameter t must not equal 1 (division by 1 - t)".to_string(),
            ));
        }
        Ok(Self {
            t,
            one_minus_t,
            inv_one_minus_t: 1.0 / one_minus_t,
        })
    }

    pub fn t(&self) -> f32 {
        self.t
    }

    pub fn one_minus_t(&self) -> f32 {
        self.one_minus_t
    }

    pub fn inv_one_minus_t(&self) -> f32 {
        self.inv_one_minus_t
    }

    /// Clamped base of the negative branch: `max(0, 1 + (1 - t) * min(x, 0))`.
    #[inline]
    pub fn base(&self, x: f32) -> f32 {
        (1.0 + self.one_minus_t * x.min(0.0)).max(0.0)
    }

    /// Negative-branch curve `base(x)^(1 / (1 - t)) - 1`, i.e. `dy / dslope`.
    #[inline]
    pub fn curve(&self, x: f32) -> f32 {
        self.base(x).powf(self.inv_one_minus_t) - 1.0
    }
}

/// Flat-index layout of a `[batch, channel, spatial...]` tensor as seen by
/// the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelGeometry {
    /// Batch size (axis 0).
    pub num: usize,
    /// Channel count (axis 1).
    pub channels: usize,
    /// Product of the axes after the channel axis.
    pub dim: usize,
    /// `channels` when the slope is shared, otherwise 1.
    pub div_factor: usize,
}

impl ChannelGeometry {
    /// Builds the geometry for `shape`. Requires at least two axes.
    pub fn new(shape: &[usize], channel_shared: bool) -> KernelResult<Self> {
        if shape.len() < 2 {
            return Err(KernelError::ShapeError(format!(
                "expected at least 2 axes [batch, channel, ...], got {:?}",
                shape
            )));
        }
        let channels = shape[1];
        if channels == 0 {
            return Err(KernelError::ShapeError(format!(
                "channel axis must not be empty, got {:?}",
                shape
            )));
        }
        Ok(Self {
            num: shape[0],
            channels,
            dim: shape[2..].iter().product(),
            div_factor: if channel_shared { channels } else { 1 },
        })
    }

    /// Elements in one sample (`count / num`).
    pub fn sample_count(&self) -> usize {
        self.channels * self.dim
    }

    /// Number of coefficients a slope vector must hold for this layout.
    pub fn slope_len(&self) -> usize {
        if self.div_factor == 1 {
            self.channels
        } else {
            1
        }
    }

    /// Coefficient index for flat element `i`.
    #[inline]
    pub fn slope_index(&self, i: usize) -> usize {
        ((i / self.dim) % self.channels) / self.div_factor
    }
}

/// Device seam for the elementwise numerics. Every method is a pure loop over
/// caller-owned slices; the layer is responsible for validating lengths.
pub trait Backend {
    /// `top[i] = f(bottom[i])`.
    fn forward(
        &self,
        bottom: &[f32],
        top: &mut [f32],
        slope: &[f32],
        geometry: &ChannelGeometry,
        t: &ShapeParam,
    );

    /// Overwrites `data` with `f(data)`.
    fn forward_in_place(
        &self,
        data: &mut [f32],
        slope: &[f32],
        geometry: &ChannelGeometry,
        t: &ShapeParam,
    );

    /// Adds `dL / dslope` into `slope_diff`. `multiplier` and `scratch` are
    /// per-sample buffers of `geometry.sample_count()` elements.
    #[allow(clippy::too_many_arguments)]
    fn slope_backward(
        &self,
        bottom: &[f32],
        top_diff: &[f32],
        geometry: &ChannelGeometry,
        t: &ShapeParam,
        multiplier: &[f32],
        scratch: &mut [f32],
        slope_diff: &mut [f32],
    );

    /// Writes `dL / dx` into `bottom_diff`. The output itself is not needed:
    /// the derivative is recomputed from `bottom`.
    fn input_backward(
        &self,
        bottom: &[f32],
        top_diff: &[f32],
        slope: &[f32],
        geometry: &ChannelGeometry,
        t: &ShapeParam,
        bottom_diff: &mut [f32],
    );

    /// Same as [`Backend::input_backward`] but `diff` holds `dy` on entry and
    /// `dx` on exit.
    fn input_backward_in_place(
        &self,
        bottom: &[f32],
        diff: &mut [f32],
        slope: &[f32],
        geometry: &ChannelGeometry,
        t: &ShapeParam,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_param_rejects_one() {
        let err = ShapeParam::new(1.0).unwrap_err();
        assert!(matches!(err, KernelError::ConfigurationError(_)));
        assert!(ShapeParam::new(f32::NAN).is_err());
        assert!(ShapeParam::new(f32::INFINITY).is_err());
    }

    #[test]
    fn shape_param_base_is_clamped() {
        let t = ShapeParam::new(0.5).unwrap();
        assert_eq!(t.base(-10.0), 0.0);
        assert_eq!(t.base(3.0), 1.0);
        assert!((t.base(-1.0) - 0.5).abs() < 1e-7);
        assert!((t.curve(-2.0) + 1.0).abs() < 1e-7);
    }

    #[test]
    fn geometry_maps_flat_indices_to_channels() {
        let g = ChannelGeometry::new(&[2, 3, 2, 2], false).unwrap();
        assert_eq!(g.dim, 4);
        assert_eq!(g.sample_count(), 12);
        assert_eq!(g.slope_index(0), 0);
        assert_eq!(g.slope_index(4), 1);
        assert_eq!(g.slope_index(11), 2);
        // second sample starts over at channel 0
        assert_eq!(g.slope_index(12), 0);

        let shared = ChannelGeometry::new(&[2, 3, 2, 2], true).unwrap();
        assert_eq!(shared.slope_len(), 1);
        assert!((0..24).all(|i| shared.slope_index(i) == 0));
    }

    #[test]
    fn geometry_two_axes_has_unit_dim() {
        let g = ChannelGeometry::new(&[4, 5], false).unwrap();
        assert_eq!(g.dim, 1);
        assert_eq!(g.slope_index(7), 2);
    }

    #[test]
    fn geometry_requires_two_axes() {
        let err = ChannelGeometry::new(&[6], false).unwrap_err();
        assert!(matches!(err, KernelError::ShapeError(_)));
        assert!(ChannelGeometry::new(&[2, 0, 3], true).is_err());
    }
}
