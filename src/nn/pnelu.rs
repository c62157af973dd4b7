//! PNELU: parametric nonlinear activation with learnable per-channel slopes.
//!
//! ```text
//! y = max(x, 0) + slope[c] * (max(0, 1 + (1 - t) * min(x, 0))^(1 / (1 - t)) - 1)
//! ```
//!
//! Positive inputs pass through unchanged. The negative branch is a saturating
//! curve whose shape is set by `t` (`t -> 0` gives a clipped linear slope) and
//! whose depth is the learnable `slope[c]`, one per channel or one shared by
//! all channels.

use crate::metrics::{ForwardStats, StatsObserver};
use crate::nn::filler::{Filler, FillerConfig};
use crate::nn::module::{Layer, Parameter};
use crate::runtime::backend::{Backend, ChannelGeometry, KernelError, KernelResult, ShapeParam};
use crate::runtime::cpu_backend::CpuBackend;
use crate::tensor::Tensor;
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

/// Configuration for the PNELU layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PneluConfig {
    /// One slope for all channels instead of one per channel.
    pub channel_shared: bool,
    /// Shape parameter. Must be finite and different from 1.
    pub t: f32,
    /// How the slope vector is initialised at setup.
    pub filler: FillerConfig,
}

impl Default for PneluConfig {
    fn default() -> Self {
        Self {
            channel_shared: false,
            t: 0.0,
            filler: FillerConfig::default(),
        }
    }
}

impl PneluConfig {
    /// Per-channel configuration with shape parameter `t` and the default
    /// constant filler.
    pub fn new(t: f32) -> Self {
        Self {
            t,
            ..Default::default()
        }
    }

    /// Uses one slope for every channel when `true`.
    pub fn with_channel_shared(mut self, channel_shared: bool) -> Self {
        self.channel_shared = channel_shared;
        self
    }

    /// Replaces the shape parameter. Validated by `validate` and at setup.
    pub fn with_t(mut self, t: f32) -> Self {
        self.t = t;
        self
    }

    /// Selects the initialisation used when setup allocates the slope.
    pub fn with_filler(mut self, filler: FillerConfig) -> Self {
        self.filler = filler;
        self
    }

    /// Parses a JSON configuration, e.g.
    /// `{"channel_shared": true, "t": 0.5, "filler": {"type": "constant", "value": 0.25}}`.
    /// Missing fields take their defaults.
    pub fn from_json(json: &str) -> KernelResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            KernelError::ConfigurationError(format!("invalid PNELU config: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that `t` is finite and different from 1.
    pub fn validate(&self) -> KernelResult<()> {
        ShapeParam::new(self.t).map(|_| ())
    }
}

/// How the layer's input and output relate in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Input and output are distinct tensors.
    Separate,
    /// One tensor is overwritten; the input is kept in the backup buffer.
    InPlace,
}

/// The PNELU layer.
///
/// # Example
///
/// ```rust
/// use pnelu::nn::{Layer, Pnelu, PneluConfig};
/// use pnelu::tensor::Tensor;
///
/// let mut layer = Pnelu::new(PneluConfig::new(0.5));
/// let x = Tensor::from_shape_vec(&[1, 1, 3], vec![-2.0, 0.0, 3.0]).unwrap();
/// let mut y = Tensor::zeros(&[1]);
/// layer.setup(x.shape()).unwrap();
/// layer.reshape(&x, &mut y).unwrap();
/// layer.forward(&x, &mut y).unwrap();
/// assert_eq!(y.data(), &[-1.0, 0.0, 3.0]);
/// ```
pub struct Pnelu<B: Backend = CpuBackend> {
    name: String,
    config: PneluConfig,
    backend: B,
    slope: Option<Parameter>,
    custom_filler: Option<Box<dyn Filler>>,
    /// Per-sample ones, used to reduce staged slope contributions.
    multiplier: Vec<f32>,
    /// Per-sample staging buffer for the slope gradient.
    backward_buff: Vec<f32>,
    /// Copy of the input taken before an in-place forward overwrites it.
    backup: Tensor,
    placement: Option<Placement>,
    observer: Option<Box<dyn StatsObserver>>,
}

impl Pnelu<CpuBackend> {
    pub fn new(config: PneluConfig) -> Self {
        Self::with_backend(config, CpuBackend::new())
    }
}

impl<B: Backend> Pnelu<B> {
    /// Builds the layer on a specific backend. Nothing is allocated until
    /// `setup`.
    pub fn with_backend(config: PneluConfig, backend: B) -> Self {
        Self {
            name: "pnelu".to_string(),
            config,
            backend,
            slope: None,
            custom_filler: None,
            multiplier: Vec::new(),
            backward_buff: Vec::new(),
            backup: Tensor::zeros(&[0]),
            placement: None,
            observer: None,
        }
    }

    /// Sets the layer name; the slope parameter is named `<name>.slope`.
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        if let Some(slope) = self.slope.as_mut() {
            slope.set_name(format!("{}.slope", name));
        }
        self
    }

    /// Replaces the configured filler with a custom strategy.
    pub fn with_filler<F: Filler + 'static>(mut self, filler: F) -> Self {
        self.custom_filler = Some(Box::new(filler));
        self
    }

    /// Attaches a diagnostics sink called after every forward pass.
    pub fn with_observer<O: StatsObserver + 'static>(mut self, observer: O) -> Self {
        self.set_observer(observer);
        self
    }

    pub fn set_observer<O: StatsObserver + 'static>(&mut self, observer: O) {
        self.observer = Some(Box::new(observer));
    }

    /// Detaches the diagnostics sink; forward no longer collects means.
    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &PneluConfig {
        &self.config
    }

    /// Changes `t`. Checked on the next setup, forward or backward call.
    pub fn set_t(&mut self, t: f32) {
        self.config.t = t;
    }

    /// Execution mode chosen by the last reshape, if any.
    pub fn placement(&self) -> Option<Placement> {
        self.placement
    }

    /// The slope parameter, once set up or restored.
    pub fn slope(&self) -> Option<&Parameter> {
        self.slope.as_ref()
    }

    pub fn slope_mut(&mut self) -> Option<&mut Parameter> {
        self.slope.as_mut()
    }

    /// Restores slope values, e.g. from a checkpoint. A later `setup` only
    /// validates their count instead of re-initialising them.
    pub fn load_slope(&mut self, values: ArrayD<f32>) {
        self.slope = Some(Parameter::from_array(format!("{}.slope", self.name), values));
    }

    /// Enables or disables accumulation of the slope gradient.
    pub fn set_param_propagate_down(&mut self, enabled: bool) {
        if let Some(slope) = self.slope.as_mut() {
            slope.set_requires_grad(enabled);
        }
    }

    /// Input copy kept by the last in-place forward.
    pub fn backup(&self) -> &Tensor {
        &self.backup
    }

    fn geometry_for(&self, shape: &[usize]) -> KernelResult<ChannelGeometry> {
        let geometry = ChannelGeometry::new(shape, self.config.channel_shared)?;
        let slope = self.slope.as_ref().ok_or_else(not_set_up)?;
        if slope.len() != geometry.slope_len() {
            return Err(KernelError::ShapeError(format!(
                "input has {} channels but the layer holds {} slope values{}",
                geometry.channels,
                slope.len(),
                if self.config.channel_shared {
                    " (channel_shared)"
                } else {
                    ""
                }
            )));
        }
        Ok(geometry)
    }

    fn expect_placement(&self, wanted: Placement) -> KernelResult<()> {
        match self.placement {
            Some(p) if p == wanted => Ok(()),
            Some(p) => Err(KernelError::ConfigurationError(format!(
                "layer '{}' was reshaped for {:?} execution, called as {:?}",
                self.name, p, wanted
            ))),
            None => Err(KernelError::ConfigurationError(format!(
                "layer '{}' must be reshaped before forward/backward",
                self.name
            ))),
        }
    }

    fn check_scratch(&self, geometry: &ChannelGeometry) -> KernelResult<()> {
        if self.multiplier.len() != geometry.sample_count() {
            return Err(KernelError::ShapeError(format!(
                "per-sample size changed from {} to {} without reshape",
                self.multiplier.len(),
                geometry.sample_count()
            )));
        }
        Ok(())
    }

    fn resize_scratch(&mut self, sample_count: usize) {
        if self.multiplier.len() != sample_count {
            self.multiplier = vec![1.0; sample_count];
            self.backward_buff = vec![0.0; sample_count];
        }
    }

    fn observe(&mut self, input: &[f32], output: &[f32]) {
        if let Some(observer) = self.observer.as_mut() {
            let stats = ForwardStats::collect(input, output);
            observer.observe(&self.name, &stats);
        }
    }
}

fn not_set_up() -> KernelError {
    KernelError::ConfigurationError("setup must run before the slope is used".to_string())
}

fn same_shape(what: &str, expected: &[usize], actual: &[usize]) -> KernelResult<()> {
    if expected != actual {
        return Err(KernelError::ShapeError(format!(
            "{} has shape {:?}, expected {:?}",
            what, actual, expected
        )));
    }
    Ok(())
}

impl<B: Backend> Layer for Pnelu<B> {
    fn layer_type(&self) -> &'static str {
        "PNELU"
    }

    fn setup(&mut self, bottom_shape: &[usize]) -> KernelResult<()> {
        ShapeParam::new(self.config.t)?;
        let geometry = ChannelGeometry::new(bottom_shape, self.config.channel_shared)?;
        let expected = geometry.slope_len();

        match self.slope.as_ref().map(Parameter::len) {
            Some(restored) => {
                tracing::debug!(layer = %self.name, "slope already initialised, skipping filler");
                if restored != expected {
                    return Err(KernelError::ConfigurationError(format!(
                        "restored slope has {} values, expected {} (channel_shared = {})",
                        restored,
                        expected,
                        self.config.channel_shared
                    )));
                }
            }
            None => {
                let mut slope = Parameter::zeros(format!("{}.slope", self.name), &[expected]);
                match self.custom_filler.as_ref() {
                    Some(filler) => filler.fill(slope.value_mut())?,
                    None => self.config.filler.fill(slope.value_mut())?,
                }
                if slope.value().shape() != [expected] {
                    return Err(KernelError::ConfigurationError(format!(
                        "filler produced slope shape {:?}, expected [{}]",
                        slope.value().shape(),
                        expected
                    )));
                }
                self.slope = Some(slope);
            }
        }

        if let Some(slope) = self.slope.as_mut() {
            slope.set_requires_grad(true);
        }
        self.resize_scratch(geometry.sample_count());
        tracing::debug!(
            layer = %self.name,
            channels = geometry.channels,
            channel_shared = self.config.channel_shared,
            t = self.config.t,
            "PNELU set up"
        );
        Ok(())
    }

    fn reshape(&mut self, bottom: &Tensor, top: &mut Tensor) -> KernelResult<()> {
        let geometry = self.geometry_for(bottom.shape())?;
        top.reshape(bottom.shape());
        self.resize_scratch(geometry.sample_count());
        self.placement = Some(Placement::Separate);
        Ok(())
    }

    fn reshape_in_place(&mut self, blob: &Tensor) -> KernelResult<()> {
        let geometry = self.geometry_for(blob.shape())?;
        self.backup.reshape(blob.shape());
        self.resize_scratch(geometry.sample_count());
        if self.placement != Some(Placement::InPlace) {
            tracing::debug!(layer = %self.name, "switching to in-place execution");
        }
        self.placement = Some(Placement::InPlace);
        Ok(())
    }

    fn forward(&mut self, bottom: &Tensor, top: &mut Tensor) -> KernelResult<()> {
        self.expect_placement(Placement::Separate)?;
        let t = ShapeParam::new(self.config.t)?;
        let geometry = self.geometry_for(bottom.shape())?;
        same_shape("top", bottom.shape(), top.shape())?;

        let slope = self.slope.as_ref().ok_or_else(not_set_up)?;
        self.backend
            .forward(bottom.data(), top.data_mut(), slope.data(), &geometry, &t);
        self.observe(bottom.data(), top.data());
        Ok(())
    }

    fn forward_in_place(&mut self, blob: &mut Tensor) -> KernelResult<()> {
        self.expect_placement(Placement::InPlace)?;
        let t = ShapeParam::new(self.config.t)?;
        let geometry = self.geometry_for(blob.shape())?;
        same_shape("backup buffer", blob.shape(), self.backup.shape())?;

        // Must happen before the overwrite: backward needs the original input.
        self.backup.copy_from(blob);
        let slope = self.slope.as_ref().ok_or_else(not_set_up)?;
        self.backend
            .forward_in_place(blob.data_mut(), slope.data(), &geometry, &t);

        if let Some(observer) = self.observer.as_mut() {
            let stats = ForwardStats::collect(self.backup.data(), blob.data());
            observer.observe(&self.name, &stats);
        }
        Ok(())
    }

    fn backward(
        &mut self,
        bottom: &Tensor,
        top: &Tensor,
        top_diff: &Tensor,
        bottom_diff: Option<&mut Tensor>,
    ) -> KernelResult<()> {
        self.expect_placement(Placement::Separate)?;
        let t = ShapeParam::new(self.config.t)?;
        let geometry = self.geometry_for(bottom.shape())?;
        same_shape("top", bottom.shape(), top.shape())?;
        same_shape("top diff", bottom.shape(), top_diff.shape())?;
        if let Some(dx) = bottom_diff.as_deref() {
            same_shape("bottom diff", bottom.shape(), dx.shape())?;
        }
        self.check_scratch(&geometry)?;

        let slope = self.slope.as_mut().ok_or_else(not_set_up)?;
        if slope.requires_grad() {
            let (_, slope_diff) = slope.value_and_diff_mut();
            self.backend.slope_backward(
                bottom.data(),
                top_diff.data(),
                &geometry,
                &t,
                &self.multiplier,
                &mut self.backward_buff,
                slope_diff,
            );
        }
        if let Some(dx) = bottom_diff {
            self.backend.input_backward(
                bottom.data(),
                top_diff.data(),
                slope.data(),
                &geometry,
                &t,
                dx.data_mut(),
            );
        }
        Ok(())
    }

    fn backward_in_place(
        &mut self,
        top: &Tensor,
        diff: &mut Tensor,
        propagate_down: bool,
    ) -> KernelResult<()> {
        self.expect_placement(Placement::InPlace)?;
        let t = ShapeParam::new(self.config.t)?;
        let geometry = self.geometry_for(top.shape())?;
        same_shape("diff", top.shape(), diff.shape())?;
        same_shape("backup buffer", top.shape(), self.backup.shape())?;
        self.check_scratch(&geometry)?;

        let slope = self.slope.as_mut().ok_or_else(not_set_up)?;
        // `diff` is read as dy here and overwritten with dx below, so the
        // slope gradient has to be complete first.
        if slope.requires_grad() {
            let (_, slope_diff) = slope.value_and_diff_mut();
            self.backend.slope_backward(
                self.backup.data(),
                diff.data(),
                &geometry,
                &t,
                &self.multiplier,
                &mut self.backward_buff,
                slope_diff,
            );
        }
        if propagate_down {
            self.backend.input_backward_in_place(
                self.backup.data(),
                diff.data_mut(),
                slope.data(),
                &geometry,
                &t,
            );
        }
        Ok(())
    }

    fn parameters(&self) -> Vec<&Parameter> {
        self.slope.iter().collect()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        self.slope.iter_mut().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tensor(shape: &[usize], values: Vec<f32>) -> Tensor {
        Tensor::from_shape_vec(shape, values).unwrap()
    }

    fn ready(config: PneluConfig, x: &Tensor) -> (Pnelu, Tensor) {
        let mut layer = Pnelu::new(config);
        let mut y = Tensor::zeros(&[1]);
        layer.setup(x.shape()).unwrap();
        layer.reshape(x, &mut y).unwrap();
        (layer, y)
    }

    #[test]
    fn test_setup_allocates_per_channel_slope() {
        let mut layer = Pnelu::new(PneluConfig::default());
        layer.setup(&[2, 3, 4]).unwrap();
        let slope = layer.slope().unwrap();
        assert_eq!(slope.len(), 3);
        assert_eq!(slope.name(), "pnelu.slope");
        assert!(slope.value().iter().all(|&v| v == 1.0));
        assert!(slope.requires_grad());
        assert_eq!(layer.multiplier.len(), 12);
        assert!(layer.multiplier.iter().all(|&v| v == 1.0));
        assert_eq!(layer.backward_buff.len(), 12);
        assert_eq!(layer.layer_type(), "PNELU");
    }

    #[test]
    fn test_setup_shared_allocates_single_slope() {
        let mut layer = Pnelu::new(PneluConfig::default().with_channel_shared(true));
        layer.setup(&[2, 5]).unwrap();
        assert_eq!(layer.slope().unwrap().len(), 1);
    }

    #[test]
    fn test_setup_uses_configured_filler() {
        let config = PneluConfig::default().with_filler(FillerConfig::Constant { value: 0.25 });
        let mut layer = Pnelu::new(config).with_name("act1");
        layer.setup(&[1, 2]).unwrap();
        let slope = layer.slope().unwrap();
        assert_eq!(slope.name(), "act1.slope");
        assert!(slope.value().iter().all(|&v| v == 0.25));
    }

    #[test]
    fn test_setup_keeps_restored_slope() {
        let mut layer = Pnelu::new(PneluConfig::default());
        layer.load_slope(ArrayD::from_shape_vec(ndarray::IxDyn(&[2]), vec![0.3, 0.7]).unwrap());
        layer.setup(&[4, 2, 3]).unwrap();
        assert_eq!(layer.slope().unwrap().data(), &[0.3, 0.7]);
    }

    #[test]
    fn test_rename_keeps_slope_state() {
        let x = tensor(&[1, 1, 2], vec![-0.5, 0.5]);
        let (mut layer, mut y) = ready(PneluConfig::new(0.0), &x);
        layer.forward(&x, &mut y).unwrap();
        let dy = tensor(&[1, 1, 2], vec![1.0, 1.0]);
        layer.backward(&x, &y, &dy, None).unwrap();
        layer.set_param_propagate_down(false);

        let layer = layer.with_name("act2");
        let slope = layer.slope().unwrap();
        assert_eq!(slope.name(), "act2.slope");
        assert!(!slope.requires_grad());
        assert!((slope.diff().as_slice().unwrap()[0] + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_setup_rejects_restored_slope_of_wrong_length() {
        let mut layer = Pnelu::new(PneluConfig::default().with_channel_shared(true));
        layer.load_slope(ArrayD::from_shape_vec(ndarray::IxDyn(&[2]), vec![0.3, 0.7]).unwrap());
        let err = layer.setup(&[4, 2, 3]).unwrap_err();
        assert!(matches!(err, KernelError::ConfigurationError(_)));
    }

    #[test]
    fn test_setup_rejects_custom_filler_with_wrong_shape() {
        struct Resizing;
        impl Filler for Resizing {
            fn fill(&self, values: &mut ArrayD<f32>) -> KernelResult<()> {
                *values = ArrayD::zeros(ndarray::IxDyn(&[7]));
                Ok(())
            }
        }
        let mut layer = Pnelu::new(PneluConfig::default()).with_filler(Resizing);
        let err = layer.setup(&[1, 3]).unwrap_err();
        assert!(matches!(err, KernelError::ConfigurationError(_)));
        assert!(layer.slope().is_none());
    }

    #[test]
    fn test_setup_rejects_one_axis() {
        let mut layer = Pnelu::new(PneluConfig::default());
        assert!(matches!(
            layer.setup(&[5]),
            Err(KernelError::ShapeError(_))
        ));
    }

    #[test]
    fn test_setup_rejects_t_one() {
        let mut layer = Pnelu::new(PneluConfig::new(1.0));
        assert!(matches!(
            layer.setup(&[1, 1, 3]),
            Err(KernelError::ConfigurationError(_))
        ));
        assert!(layer.slope().is_none());
    }

    #[test]
    fn test_reshape_rejects_channel_mismatch() {
        let mut layer = Pnelu::new(PneluConfig::default());
        layer.setup(&[1, 3, 2]).unwrap();
        let x = Tensor::zeros(&[1, 4, 2]);
        let mut y = Tensor::zeros(&[1]);
        assert!(matches!(
            layer.reshape(&x, &mut y),
            Err(KernelError::ShapeError(_))
        ));
    }

    #[test]
    fn test_reshape_before_setup_fails() {
        let mut layer = Pnelu::new(PneluConfig::default());
        let x = Tensor::zeros(&[1, 3]);
        let mut y = Tensor::zeros(&[1]);
        assert!(layer.reshape(&x, &mut y).is_err());
    }

    #[test]
    fn test_forward_requires_reshape() {
        let mut layer = Pnelu::new(PneluConfig::default());
        layer.setup(&[1, 1, 2]).unwrap();
        let x = tensor(&[1, 1, 2], vec![1.0, -1.0]);
        let mut y = Tensor::zeros(&[1, 1, 2]);
        assert!(matches!(
            layer.forward(&x, &mut y),
            Err(KernelError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_forward_worked_example() {
        let x = tensor(&[1, 1, 3], vec![-2.0, 0.0, 3.0]);
        let (mut layer, mut y) = ready(PneluConfig::new(0.5), &x);
        assert_eq!(y.shape(), x.shape());
        layer.forward(&x, &mut y).unwrap();
        assert_eq!(y.data(), &[-1.0, 0.0, 3.0]);
    }

    #[test]
    fn test_forward_rejects_mismatched_top() {
        let x = tensor(&[1, 1, 3], vec![-2.0, 0.0, 3.0]);
        let (mut layer, _) = ready(PneluConfig::new(0.5), &x);
        let mut wrong = Tensor::zeros(&[1, 1, 4]);
        assert!(matches!(
            layer.forward(&x, &mut wrong),
            Err(KernelError::ShapeError(_))
        ));
    }

    #[test]
    fn test_in_place_calls_rejected_in_separate_mode() {
        let x = tensor(&[1, 1, 2], vec![1.0, -1.0]);
        let (mut layer, y) = ready(PneluConfig::default(), &x);
        let mut blob = x.clone();
        assert!(layer.forward_in_place(&mut blob).is_err());
        let mut diff = Tensor::zeros(&[1, 1, 2]);
        assert!(layer.backward_in_place(&y, &mut diff, true).is_err());
        assert_eq!(blob, x);
    }

    #[test]
    fn test_in_place_forward_fills_backup() {
        let mut layer = Pnelu::new(PneluConfig::new(0.5));
        let mut blob = tensor(&[1, 1, 3], vec![-2.0, 0.0, 3.0]);
        layer.setup(blob.shape()).unwrap();
        layer.reshape_in_place(&blob).unwrap();
        assert_eq!(layer.placement(), Some(Placement::InPlace));
        layer.forward_in_place(&mut blob).unwrap();
        assert_eq!(blob.data(), &[-1.0, 0.0, 3.0]);
        assert_eq!(layer.backup().data(), &[-2.0, 0.0, 3.0]);
    }

    #[test]
    fn test_backward_skips_slope_when_disabled() {
        let x = tensor(&[1, 1, 2], vec![-0.5, 0.5]);
        let (mut layer, mut y) = ready(PneluConfig::new(0.5), &x);
        layer.forward(&x, &mut y).unwrap();
        layer.set_param_propagate_down(false);
        let dy = tensor(&[1, 1, 2], vec![1.0, 1.0]);
        let mut dx = Tensor::zeros(&[1, 1, 2]);
        layer.backward(&x, &y, &dy, Some(&mut dx)).unwrap();
        assert_eq!(layer.slope().unwrap().diff().as_slice().unwrap(), &[0.0]);
        assert_eq!(dx.data()[1], 1.0);
    }

    #[test]
    fn test_backward_accumulates_without_reset() {
        let x = tensor(&[1, 1, 2], vec![-0.5, 0.5]);
        let (mut layer, mut y) = ready(PneluConfig::new(0.0), &x);
        layer.forward(&x, &mut y).unwrap();
        let dy = tensor(&[1, 1, 2], vec![1.0, 1.0]);
        layer.backward(&x, &y, &dy, None).unwrap();
        layer.backward(&x, &y, &dy, None).unwrap();
        // t = 0: dy/dslope = max(x, -1) = -0.5 per call
        let diff = layer.slope().unwrap().diff().as_slice().unwrap()[0];
        assert!((diff + 1.0).abs() < 1e-6);
        layer.zero_grad();
        assert_eq!(layer.slope().unwrap().diff().as_slice().unwrap(), &[0.0]);
    }

    #[test]
    fn test_observer_sees_means() {
        use std::sync::{Arc, Mutex};
        let seen: Arc<Mutex<Vec<ForwardStats>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let x = tensor(&[1, 1, 3], vec![-2.0, 0.0, 3.0]);
        let (layer, mut y) = ready(PneluConfig::new(0.5), &x);
        let mut layer = layer.with_observer(move |_: &str, stats: &ForwardStats| {
            if let Ok(mut v) = sink.lock() {
                v.push(*stats);
            }
        });
        layer.forward(&x, &mut y).unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!((seen[0].input.all - 1.0 / 3.0).abs() < 1e-9);
        assert!((seen[0].input.positive - 3.0).abs() < 1e-9);
        assert!((seen[0].output.non_positive + 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_config_from_json() {
        let config = PneluConfig::from_json(
            r#"{"channel_shared": true, "t": 0.5, "filler": {"type": "constant", "value": 0.25}}"#,
        )
        .unwrap();
        assert!(config.channel_shared);
        assert_eq!(config.t, 0.5);
        assert_eq!(config.filler, FillerConfig::Constant { value: 0.25 });

        let defaults = PneluConfig::from_json("{}").unwrap();
        assert_eq!(defaults, PneluConfig::default());

        assert!(matches!(
            PneluConfig::from_json(r#"{"t": 1.0}"#),
            Err(KernelError::ConfigurationError(_))
        ));
        assert!(PneluConfig::from_json("not json").is_err());
    }
}
