//! Decay kernels ("radiators") that spread an event's weight over nearby
//! pixels and fade it with age.

use heatmap_common::{DAY_MS, HOUR_MS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Name of the kernel used when a request names none or an unknown one.
pub const DEFAULT_RADIATOR: &str = "default";

/// Largest support radius any kernel may report, in pixels.
pub const MAX_SUPPORT_RADIUS: i64 = 256;

/// Temporal horizon of the built-in kernels.
pub const DEFAULT_HORIZON_MS: i64 = 7 * DAY_MS;

/// A named, pure decay kernel.
///
/// `contribute` must return exactly 0 when `|dx|` or `|dy|` exceeds
/// `support_radius(scale)`, when `dt_ms` is negative, or when it exceeds
/// `temporal_horizon_ms()`. Implementations are shared across threads.
pub trait Radiator: Send + Sync {
    fn name(&self) -> &str;

    /// Half-width in pixels of the square outside which the kernel is zero.
    fn support_radius(&self, scale: f64) -> i64;

    /// Oldest event age, in milliseconds, that still contributes.
    fn temporal_horizon_ms(&self) -> i64;

    /// Weight contributed to a pixel `(dx, dy)` away from an event that is
    /// `dt_ms` old. Never negative.
    fn contribute(&self, dx: i64, dy: i64, dt_ms: i64, timedecay: f64, scale: f64) -> f64;
}

impl fmt::Debug for dyn Radiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Radiator")
            .field("name", &self.name())
            .field("horizon_ms", &self.temporal_horizon_ms())
            .finish()
    }
}

/// Radial falloff profiles for [`KernelRadiator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelShape {
    /// `1 - t`
    Linear,
    /// Normal curve with sigma at a third of the radius
    Gaussian,
    /// Flat
    Disk,
    /// `(1 - t)^2`
    Quadratic,
}

impl KernelShape {
    /// Spatial weight at normalized distance `t` in `[0, 1)`.
    pub fn falloff(&self, t: f64) -> f64 {
        match self {
            KernelShape::Linear => 1.0 - t,
            KernelShape::Gaussian => {
                const SIGMA: f64 = 1.0 / 3.0;
                (-(t * t) / (2.0 * SIGMA * SIGMA)).exp()
            }
            KernelShape::Disk => 1.0,
            KernelShape::Quadratic => (1.0 - t) * (1.0 - t),
        }
    }
}

impl fmt::Display for KernelShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KernelShape::Linear => "linear",
            KernelShape::Gaussian => "gaussian",
            KernelShape::Disk => "disk",
            KernelShape::Quadratic => "quadratic",
        };
        f.write_str(name)
    }
}

/// Scale factor actually applied: non-finite or non-positive values mean 1.
pub fn effective_scale(scale: f64) -> f64 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    }
}

/// Age factor `timedecay^(dt / 1h)` with `timedecay` clamped to `[0, 1]`.
///
/// A decay of 1 keeps events at full weight for the whole horizon, a decay of
/// 0 keeps only events of age 0.
pub fn time_factor(dt_ms: i64, timedecay: f64) -> f64 {
    let decay = if timedecay.is_nan() {
        1.0
    } else {
        timedecay.clamp(0.0, 1.0)
    };
    decay.powf(dt_ms as f64 / HOUR_MS as f64)
}

/// Radially symmetric kernel: a shape, a base radius at scale 1, and a
/// temporal horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelRadiator {
    name: String,
    shape: KernelShape,
    base_radius: f64,
    horizon_ms: i64,
}

impl KernelRadiator {
    pub fn new(
        name: impl Into<String>,
        shape: KernelShape,
        base_radius: f64,
        horizon_ms: i64,
    ) -> Self {
        Self {
            name: name.into(),
            shape,
            base_radius,
            horizon_ms,
        }
    }

    /// Linear cone of 16 pixels, the kernel behind [`DEFAULT_RADIATOR`].
    pub fn default_cone() -> Self {
        Self::new(DEFAULT_RADIATOR, KernelShape::Linear, 16.0, DEFAULT_HORIZON_MS)
    }

    pub fn shape(&self) -> KernelShape {
        self.shape
    }

    pub fn base_radius(&self) -> f64 {
        self.base_radius
    }
}

impl Radiator for KernelRadiator {
    fn name(&self) -> &str {
        &self.name
    }

    fn support_radius(&self, scale: f64) -> i64 {
        let radius = (self.base_radius * effective_scale(scale)).ceil();
        if radius.is_nan() || radius < 0.0 {
            return 0;
        }
        (radius.min(MAX_SUPPORT_RADIUS as f64)) as i64
    }

    fn temporal_horizon_ms(&self) -> i64 {
        self.horizon_ms
    }

    fn contribute(&self, dx: i64, dy: i64, dt_ms: i64, timedecay: f64, scale: f64) -> f64 {
        if dt_ms < 0 || dt_ms > self.horizon_ms {
            return 0.0;
        }

        let radius = self.support_radius(scale);
        if dx.abs() > radius || dy.abs() > radius {
            return 0.0;
        }

        let distance = ((dx * dx + dy * dy) as f64).sqrt();
        if distance > radius as f64 {
            return 0.0;
        }

        let spatial = self.shape.falloff(distance / (radius as f64 + 1.0));
        (spatial * time_factor(dt_ms, timedecay)).max(0.0)
    }
}

/// Name → kernel table.
///
/// Filled at startup and shared read-only afterwards. Names are
/// case-insensitive.
#[derive(Clone)]
pub struct RadiatorRegistry {
    radiators: HashMap<String, Arc<dyn Radiator>>,
    fallback: Arc<dyn Radiator>,
}

impl RadiatorRegistry {
    /// Registry holding only the default cone.
    pub fn new() -> Self {
        let fallback: Arc<dyn Radiator> = Arc::new(KernelRadiator::default_cone());
        let mut radiators = HashMap::new();
        radiators.insert(DEFAULT_RADIATOR.to_string(), Arc::clone(&fallback));
        Self { radiators, fallback }
    }

    /// Registry with every built-in kernel: `default`, `gaussian`, `disk`,
    /// `spot`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(KernelRadiator::new(
            "gaussian",
            KernelShape::Gaussian,
            24.0,
            DEFAULT_HORIZON_MS,
        )));
        registry.register(Arc::new(KernelRadiator::new(
            "disk",
            KernelShape::Disk,
            8.0,
            DEFAULT_HORIZON_MS,
        )));
        registry.register(Arc::new(KernelRadiator::new(
            "spot",
            KernelShape::Quadratic,
            4.0,
            DEFAULT_HORIZON_MS,
        )));
        registry
    }

    /// Add or replace a kernel. Replacing `default` also changes the
    /// fallback. Returns the kernel previously registered under that name.
    pub fn register(&mut self, radiator: Arc<dyn Radiator>) -> Option<Arc<dyn Radiator>> {
        let key = radiator.name().to_ascii_lowercase();
        if key == DEFAULT_RADIATOR {
            self.fallback = Arc::clone(&radiator);
        }
        self.radiators.insert(key, radiator)
    }

    /// Kernel registered under `name`, or the default kernel.
    pub fn get(&self, name: &str) -> Arc<dyn Radiator> {
        match self.lookup(name) {
            Some(radiator) => radiator,
            None => {
                debug!(radiator = name, "Unknown radiator, using default");
                Arc::clone(&self.fallback)
            }
        }
    }

    /// Kernel registered under `name`, without fallback.
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Radiator>> {
        self.radiators.get(&name.to_ascii_lowercase()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.radiators.contains_key(&name.to_ascii_lowercase())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.radiators.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.radiators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.radiators.is_empty()
    }
}

impl Default for RadiatorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for RadiatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RadiatorRegistry")
            .field("names", &self.names())
            .finish()
    }
}
