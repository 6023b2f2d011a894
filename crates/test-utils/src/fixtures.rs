//! Common test fixtures.
//!
//! A fixed clock and sample configuration files.

use std::io::Write;
use tempfile::NamedTempFile;

/// Reference instant used instead of the wall clock (2023-11-14T22:13:20Z).
pub const FIXED_NOW: i64 = 1_700_000_000_000;

/// Engine configuration exercising every section of the YAML format.
pub const SAMPLE_CONFIG_YAML: &str = r##"
index_zoom: 10
max_bucket_count: 64
radiators:
  - name: wide
    shape: gaussian
    radius: 48
    horizon_hours: 24
palettes:
  - name: ocean
    stops: ["#00000000", "#0040ff80", "#00ffffff"]
  - name: redseed
    seed: "#ff0000"
heatmaps:
  - name: checkins
    description: Venue check-ins
  - name: photos
"##;

/// Write `contents` to a temporary file that lives as long as the handle.
pub fn write_temp_file(contents: &str, suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("heatmap-test-")
        .suffix(suffix)
        .tempfile()
        .expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}

/// Write a YAML configuration to a temporary file.
pub fn write_temp_config(yaml: &str) -> NamedTempFile {
    write_temp_file(yaml, ".yaml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_temp_config() {
        let file = write_temp_config(SAMPLE_CONFIG_YAML);
        let read = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(read, SAMPLE_CONFIG_YAML);
        assert!(file.path().to_string_lossy().ends_with(".yaml"));
    }
}
