//! Engine configuration loader.
//!
//! Loads the heatmap list, engine limits, and custom radiators/palettes from
//! a YAML file. Custom styles can also live in a separate JSON style file
//! referenced by `styles_file`; inline entries are applied after it and win
//! on name clashes.

use heatmap_common::{HeatmapError, HeatmapResult, MAX_ZOOM};
use point_store::DEFAULT_INDEX_ZOOM;
use renderer::{PaletteDefinition, RadiatorDefinition, StyleConfig, DEFAULT_MAX_BUCKET_COUNT};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

/// Top-level engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Geocell index zoom for heatmaps that do not set their own
    #[serde(default = "default_index_zoom")]
    pub index_zoom: u8,
    /// Largest accepted `bucketcount`
    #[serde(default = "default_max_bucket_count")]
    pub max_bucket_count: u32,
    /// Optional JSON style file, relative to the configuration file
    #[serde(default)]
    pub styles_file: Option<PathBuf>,
    #[serde(default)]
    pub radiators: Vec<RadiatorDefinition>,
    #[serde(default)]
    pub palettes: Vec<PaletteDefinition>,
    #[serde(default)]
    pub heatmaps: Vec<HeatmapDefinition>,
}

/// One configured heatmap.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HeatmapDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub index_zoom: Option<u8>,
}

fn default_index_zoom() -> u8 {
    DEFAULT_INDEX_ZOOM
}

fn default_max_bucket_count() -> u32 {
    DEFAULT_MAX_BUCKET_COUNT
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            index_zoom: default_index_zoom(),
            max_bucket_count: default_max_bucket_count(),
            styles_file: None,
            radiators: Vec::new(),
            palettes: Vec::new(),
            heatmaps: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Parse a YAML document.
    pub fn from_yaml(yaml: &str) -> HeatmapResult<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| HeatmapError::ConfigError(format!("YAML error: {}", e)))
    }

    /// Load and validate a configuration file. A relative `styles_file` is
    /// resolved against the file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> HeatmapResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            HeatmapError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;

        let mut config = Self::from_yaml(&content)?;
        if let (Some(styles), Some(dir)) = (&config.styles_file, path.parent()) {
            if styles.is_relative() {
                config.styles_file = Some(dir.join(styles));
            }
        }
        config.validate()?;

        info!(
            path = %path.display(),
            heatmaps = config.heatmaps.len(),
            radiators = config.radiators.len(),
            palettes = config.palettes.len(),
            "Loaded engine configuration"
        );
        Ok(config)
    }

    /// Check limits and heatmap names.
    pub fn validate(&self) -> HeatmapResult<()> {
        if self.index_zoom > MAX_ZOOM {
            return Err(HeatmapError::ConfigError(format!(
                "index_zoom {} exceeds {}",
                self.index_zoom, MAX_ZOOM
            )));
        }
        if self.max_bucket_count == 0 {
            return Err(HeatmapError::ConfigError(
                "max_bucket_count must be at least 1".into(),
            ));
        }

        let mut seen = HashSet::new();
        for heatmap in &self.heatmaps {
            if heatmap.name.trim().is_empty() {
                return Err(HeatmapError::ConfigError("heatmap name is empty".into()));
            }
            if !seen.insert(heatmap.name.as_str()) {
                return Err(HeatmapError::ConfigError(format!(
                    "heatmap '{}' is defined twice",
                    heatmap.name
                )));
            }
            if let Some(zoom) = heatmap.index_zoom {
                if zoom > MAX_ZOOM {
                    return Err(HeatmapError::ConfigError(format!(
                        "heatmap '{}': index_zoom {} exceeds {}",
                        heatmap.name, zoom, MAX_ZOOM
                    )));
                }
            }
        }
        Ok(())
    }

    /// Custom styles: the style file's entries followed by the inline ones.
    pub fn style(&self) -> HeatmapResult<StyleConfig> {
        let mut style = match &self.styles_file {
            Some(path) => StyleConfig::from_file(path)?,
            None => StyleConfig::default(),
        };
        style.palettes.extend(self.palettes.iter().cloned());
        style.radiators.extend(self.radiators.iter().cloned());
        Ok(style)
    }

    /// Index zoom for one heatmap.
    pub fn index_zoom_for(&self, heatmap: &HeatmapDefinition) -> u8 {
        heatmap.index_zoom.unwrap_or(self.index_zoom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{write_temp_file, SAMPLE_CONFIG_YAML};

    #[test]
    fn test_parse_sample() {
        let config = EngineConfig::from_yaml(SAMPLE_CONFIG_YAML).unwrap();
        assert_eq!(config.index_zoom, 10);
        assert_eq!(config.max_bucket_count, 64);
        assert_eq!(config.radiators.len(), 1);
        assert_eq!(config.palettes.len(), 2);
        assert_eq!(config.heatmaps.len(), 2);
        assert_eq!(config.heatmaps[0].description.as_deref(), Some("Venue check-ins"));
        assert!(config.heatmaps[1].description.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_yaml("heatmaps: []").unwrap();
        assert_eq!(config.index_zoom, DEFAULT_INDEX_ZOOM);
        assert_eq!(config.max_bucket_count, DEFAULT_MAX_BUCKET_COUNT);
        assert!(config.styles_file.is_none());
    }

    #[test]
    fn test_validation_errors() {
        let duplicate = "heatmaps:\n  - name: a\n  - name: a\n";
        let err = EngineConfig::from_yaml(duplicate).unwrap().validate().unwrap_err();
        assert!(err.to_string().contains("defined twice"));

        let zoom = "index_zoom: 31\n";
        assert!(EngineConfig::from_yaml(zoom).unwrap().validate().is_err());

        let buckets = "max_bucket_count: 0\n";
        assert!(EngineConfig::from_yaml(buckets).unwrap().validate().is_err());

        assert!(EngineConfig::from_yaml("index_zoom: [").is_err());
    }

    #[test]
    fn test_styles_file_is_relative_to_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("styles.json"),
            r##"{ "palettes": [ { "name": "from-file", "seed": "#00ff00" } ] }"##,
        )
        .unwrap();
        let config_path = dir.path().join("engine.yaml");
        std::fs::write(
            &config_path,
            "styles_file: styles.json\npalettes:\n  - name: inline\n    seed: \"#0000ff\"\n",
        )
        .unwrap();

        let config = EngineConfig::from_file(&config_path).unwrap();
        let style = config.style().unwrap();
        let names: Vec<_> = style.palettes.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["from-file", "inline"]);
    }

    #[test]
    fn test_missing_file() {
        let file = write_temp_file("", ".yaml");
        let path = file.path().with_extension("missing");
        assert!(matches!(
            EngineConfig::from_file(path),
            Err(HeatmapError::ConfigError(_))
        ));
    }
}
