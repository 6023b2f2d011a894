//! Loading style files from disk.

use renderer::{PaletteRegistry, RadiatorRegistry, StyleConfig};
use test_utils::write_temp_file;

#[test]
fn test_style_file_round_trip() {
    let file = write_temp_file(
        r##"{
            "version": "2",
            "palettes": [ { "name": "mint", "seed": "#3eb489" } ],
            "radiators": [ { "name": "pin", "shape": "quadratic", "radius": 2.5 } ]
        }"##,
        ".json",
    );

    let config = StyleConfig::from_file(file.path()).unwrap();
    assert_eq!(config.version, "2");

    let mut radiators = RadiatorRegistry::with_builtins();
    let mut palettes = PaletteRegistry::with_builtins();
    assert_eq!(config.apply_to(&mut radiators, &mut palettes), 2);

    assert_eq!(radiators.get("pin").support_radius(1.0), 3);
    assert_eq!(palettes.get("MINT").unwrap().name(), "mint");
}

#[test]
fn test_invalid_json_is_config_error() {
    let file = write_temp_file("{ not json", ".json");
    let err = StyleConfig::from_file(file.path()).unwrap_err();
    assert!(!err.is_client_error());
}
