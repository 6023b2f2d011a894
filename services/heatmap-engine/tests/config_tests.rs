//! Loading engine configuration files.

use heatmap_common::HeatmapError;
use heatmap_engine::{Engine, EngineConfig};
use test_utils::{write_temp_config, SAMPLE_CONFIG_YAML};

#[test]
fn test_load_sample_file() {
    let file = write_temp_config(SAMPLE_CONFIG_YAML);
    let config = EngineConfig::from_file(file.path()).unwrap();
    let engine = Engine::from_config(config).unwrap();

    let summary = engine.summary();
    let names: Vec<_> = summary.heatmaps.iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, vec!["checkins", "photos"]);
    assert_eq!(summary.heatmaps[0].description.as_deref(), Some("Venue check-ins"));
    assert!(summary.heatmaps.iter().all(|h| h.index_zoom == 10 && h.events == 0));
    assert_eq!(summary.max_bucket_count, 64);

    assert_eq!(
        summary.radiators,
        vec!["default", "disk", "gaussian", "spot", "wide"]
    );
    assert!(summary.palettes.iter().any(|p| p == "ocean"));
    assert!(summary.palettes.iter().any(|p| p == "FIRE"));
}

#[test]
fn test_per_heatmap_index_zoom() {
    let yaml = "index_zoom: 8\nheatmaps:\n  - name: coarse\n  - name: fine\n    index_zoom: 14\n";
    let engine = Engine::from_config(EngineConfig::from_yaml(yaml).unwrap()).unwrap();
    let zoom = |name: &str| engine.heatmaps().get_heat_map(name).unwrap().store().index_zoom();
    assert_eq!(zoom("coarse"), 8);
    assert_eq!(zoom("fine"), 14);
}

#[test]
fn test_invalid_styles_are_skipped() {
    let yaml = r##"
radiators:
  - name: flat
    shape: disk
    radius: 0
  - name: ok
    shape: linear
    radius: 10
palettes:
  - name: broken
    stops: ["nothex", "#ffffff"]
  - name: lonely
    stops: ["#ffffff"]
heatmaps:
  - name: a
"##;
    let engine = Engine::from_config(EngineConfig::from_yaml(yaml).unwrap()).unwrap();
    assert!(!engine.radiators().contains("flat"));
    assert!(engine.radiators().contains("ok"));
    assert!(engine.palettes().get("broken").is_none());
    assert!(engine.palettes().get("lonely").is_none());
    assert_eq!(engine.palettes().len(), 4);
}

#[test]
fn test_missing_styles_file_fails() {
    let file = write_temp_config("styles_file: does-not-exist.json\n");
    let config = EngineConfig::from_file(file.path()).unwrap();
    assert!(matches!(
        Engine::from_config(config),
        Err(HeatmapError::ConfigError(_))
    ));
}

#[test]
fn test_unknown_shape_is_rejected() {
    let yaml = "radiators:\n  - name: odd\n    shape: hexagon\n    radius: 4\n";
    assert!(matches!(
        EngineConfig::from_yaml(yaml),
        Err(HeatmapError::ConfigError(_))
    ));
}

#[test]
fn test_duplicate_heatmaps_rejected_on_load() {
    let file = write_temp_config("heatmaps:\n  - name: x\n  - name: x\n");
    assert!(EngineConfig::from_file(file.path()).is_err());
}
