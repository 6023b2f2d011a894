//! Style configuration: custom palettes and radiators loaded from JSON (or
//! embedded in the engine's YAML configuration).

use crate::palette::{Palette, PaletteRegistry};
use crate::radiator::{KernelRadiator, KernelShape, RadiatorRegistry, MAX_SUPPORT_RADIUS};
use heatmap_common::{Color, HeatmapError, HeatmapResult, HOUR_MS};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Style configuration loaded from JSON
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StyleConfig {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub palettes: Vec<PaletteDefinition>,
    #[serde(default)]
    pub radiators: Vec<RadiatorDefinition>,
}

/// A custom palette: either hex color stops or a single seed color.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaletteDefinition {
    pub name: String,
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stops: Vec<String>,
    pub seed: Option<String>,
}

/// A custom radiator built from one of the kernel shapes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RadiatorDefinition {
    pub name: String,
    pub shape: KernelShape,
    /// Support radius in pixels at scale 1
    pub radius: f64,
    #[serde(default = "default_horizon_hours")]
    pub horizon_hours: f64,
}

fn default_horizon_hours() -> f64 {
    168.0
}

impl StyleConfig {
    /// Load style configuration from JSON string
    pub fn from_json(json_str: &str) -> HeatmapResult<Self> {
        Ok(serde_json::from_str(json_str)?)
    }

    /// Load style configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> HeatmapResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            HeatmapError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Register every valid definition; invalid ones are logged and skipped.
    ///
    /// Returns the number of entries registered.
    pub fn apply_to(
        &self,
        radiators: &mut RadiatorRegistry,
        palettes: &mut PaletteRegistry,
    ) -> usize {
        let mut applied = 0;

        for definition in &self.palettes {
            match definition.build() {
                Ok(palette) => {
                    palettes.register(palette);
                    applied += 1;
                }
                Err(e) => warn!(palette = %definition.name, error = %e, "Skipping palette"),
            }
        }

        for definition in &self.radiators {
            match definition.build() {
                Ok(radiator) => {
                    radiators.register(Arc::new(radiator));
                    applied += 1;
                }
                Err(e) => warn!(radiator = %definition.name, error = %e, "Skipping radiator"),
            }
        }

        info!(
            version = %self.version,
            applied,
            skipped = self.palettes.len() + self.radiators.len() - applied,
            "Applied style configuration"
        );
        applied
    }
}

impl PaletteDefinition {
    pub fn build(&self) -> HeatmapResult<Palette> {
        if self.name.trim().is_empty() {
            return Err(HeatmapError::InvalidPalette("palette name is empty".into()));
        }

        match (&self.seed, self.stops.is_empty()) {
            (Some(seed), true) => {
                let palette = Palette::generate(Color::from_hex(seed)?);
                Palette::from_entries(self.name.as_str(), palette.entries())
            }
            (None, false) => {
                let stops = self
                    .stops
                    .iter()
                    .map(|s| Color::from_hex(s))
                    .collect::<HeatmapResult<Vec<_>>>()?;
                Palette::from_stops(self.name.as_str(), &stops)
            }
            (Some(_), false) => Err(HeatmapError::InvalidPalette(format!(
                "palette '{}' sets both stops and seed",
                self.name
            ))),
            (None, true) => Err(HeatmapError::InvalidPalette(format!(
                "palette '{}' needs stops or a seed",
                self.name
            ))),
        }
    }
}

impl RadiatorDefinition {
    pub fn build(&self) -> HeatmapResult<KernelRadiator> {
        if self.name.trim().is_empty() {
            return Err(HeatmapError::ConfigError("radiator name is empty".into()));
        }
        let max = MAX_SUPPORT_RADIUS as f64;
        if !(self.radius.is_finite() && self.radius > 0.0 && self.radius <= max) {
            return Err(HeatmapError::ConfigError(format!(
                "radiator '{}': radius {} outside (0, {}]",
                self.name, self.radius, MAX_SUPPORT_RADIUS
            )));
        }
        if !self.horizon_hours.is_finite() || self.horizon_hours <= 0.0 {
            return Err(HeatmapError::ConfigError(format!(
                "radiator '{}': horizon_hours must be positive",
                self.name
            )));
        }

        let horizon_ms = (self.horizon_hours * HOUR_MS as f64).round() as i64;
        Ok(KernelRadiator::new(
            self.name.as_str(),
            self.shape,
            self.radius,
            horizon_ms,
        ))
    }
}
