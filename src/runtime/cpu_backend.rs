//! CPU backend: plain elementwise loops over contiguous `f32` slices.

use super::backend::{Backend, ChannelGeometry, ShapeParam};

/// Reference CPU implementation of the activation numerics.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        Self
    }
}

/// `max(x, 0) + slope * (max(0, 1 + (1 - t) * min(x, 0))^(1 / (1 - t)) - 1)`
#[inline]
fn activate(x: f32, slope: f32, t: &ShapeParam) -> f32 {
    x.max(0.0) + slope * t.curve(x)
}

/// `dy/dx`. On the negative branch this is `slope * base^(t / (1 - t))`,
/// which equals `(slope + y)^t * slope^(1 - t)` wherever the latter is defined
/// and stays finite for zero or negative slopes. Zero where the forward clamp
/// saturated the base, matching the flat output there.
#[inline]
fn local_grad(x: f32, slope: f32, t: &ShapeParam) -> f32 {
    if x > 0.0 {
        return 1.0;
    }
    let base = t.base(x);
    if base == 0.0 {
        0.0
    } else {
        slope * base.powf(t.t() * t.inv_one_minus_t())
    }
}

impl Backend for CpuBackend {
    fn forward(
        &self,
        bottom: &[f32],
        top: &mut [f32],
        slope: &[f32],
        geometry: &ChannelGeometry,
        t: &ShapeParam,
    ) {
        for (i, (y, &x)) in top.iter_mut().zip(bottom).enumerate() {
            *y = activate(x, slope[geometry.slope_index(i)], t);
        }
    }

    fn forward_in_place(
        &self,
        data: &mut [f32],
        slope: &[f32],
        geometry: &ChannelGeometry,
        t: &ShapeParam,
    ) {
        for (i, v) in data.iter_mut().enumerate() {
            *v = activate(*v, slope[geometry.slope_index(i)], t);
        }
    }

    fn slope_backward(
        &self,
        bottom: &[f32],
        top_diff: &[f32],
        geometry: &ChannelGeometry,
        t: &ShapeParam,
        multiplier: &[f32],
        scratch: &mut [f32],
        slope_diff: &mut [f32],
    ) {
        let sample = geometry.sample_count();
        let dim = geometry.dim;
        // Per sample: stage every contribution in `scratch`, then reduce each
        // channel's span against the ones multiplier.
        for n in 0..geometry.num {
            let offset = n * sample;
            let xs = &bottom[offset..offset + sample];
            let dys = &top_diff[offset..offset + sample];
            for ((s, &x), &dy) in scratch.iter_mut().zip(xs).zip(dys) {
                *s = if x <= 0.0 { dy * t.curve(x) } else { 0.0 };
            }
            for c in 0..geometry.channels {
                let span = c * dim..(c + 1) * dim;
                let partial: f32 = scratch[span.clone()]
                    .iter()
                    .zip(&multiplier[span])
                    .map(|(s, m)| s * m)
                    .sum();
                slope_diff[c / geometry.div_factor] += partial;
            }
        }
    }

    fn input_backward(
        &self,
        bottom: &[f32],
        top_diff: &[f32],
        slope: &[f32],
        geometry: &ChannelGeometry,
        t: &ShapeParam,
        bottom_diff: &mut [f32],
    ) {
        for (i, dx) in bottom_diff.iter_mut().enumerate() {
            let s = slope[geometry.slope_index(i)];
            *dx = top_diff[i] * local_grad(bottom[i], s, t);
        }
    }

    fn input_backward_in_place(
        &self,
        bottom: &[f32],
        diff: &mut [f32],
        slope: &[f32],
        geometry: &ChannelGeometry,
        t: &ShapeParam,
    ) {
        for (i, d) in diff.iter_mut().enumerate() {
            let s = slope[geometry.slope_index(i)];
            *d *= local_grad(bottom[i], s, t);
        }
    }
}
