//! 256-entry color ramps indexed by normalized intensity.

use heatmap_common::{Color, HeatmapError, HeatmapResult};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Number of entries in every palette.
pub const PALETTE_SIZE: usize = 256;

/// Name of the palette used when a request names none or an unknown one.
pub const DEFAULT_PALETTE: &str = "FIRE";

const FIRE_STOPS: [Color; 6] = [
    Color::new(0, 0, 0, 0),
    Color::new(128, 0, 0, 160),
    Color::new(255, 0, 0, 208),
    Color::new(255, 128, 0, 240),
    Color::new(255, 255, 0, 255),
    Color::new(255, 255, 255, 255),
];

const ICE_STOPS: [Color; 6] = [
    Color::new(0, 0, 0, 0),
    Color::new(0, 0, 128, 160),
    Color::new(0, 0, 255, 208),
    Color::new(0, 128, 255, 240),
    Color::new(0, 255, 255, 255),
    Color::new(255, 255, 255, 255),
];

const GRAY_STOPS: [Color; 2] = [Color::new(0, 0, 0, 0), Color::new(255, 255, 255, 255)];

const RAINBOW_STOPS: [Color; 6] = [
    Color::new(0, 0, 255, 0),
    Color::new(0, 0, 255, 128),
    Color::new(0, 255, 255, 176),
    Color::new(0, 255, 0, 208),
    Color::new(255, 255, 0, 240),
    Color::new(255, 0, 0, 255),
];

static FIRE: Lazy<Arc<Palette>> = Lazy::new(|| Arc::new(Palette::interpolate("FIRE", &FIRE_STOPS)));

/// An immutable ramp of 256 RGBA entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    name: String,
    entries: Box<[Color; PALETTE_SIZE]>,
}

impl Palette {
    /// Build from exactly 256 colors.
    pub fn from_entries(name: impl Into<String>, entries: &[Color]) -> HeatmapResult<Self> {
        let name = name.into();
        let entries: [Color; PALETTE_SIZE] = entries.try_into().map_err(|_| {
            HeatmapError::InvalidPalette(format!(
                "palette '{}' has {} entries, expected {}",
                name,
                entries.len(),
                PALETTE_SIZE
            ))
        })?;
        Ok(Self {
            name,
            entries: Box::new(entries),
        })
    }

    /// Build from exactly 256 packed `0xRRGGBBAA` values.
    pub fn from_packed(name: impl Into<String>, packed: &[u32]) -> HeatmapResult<Self> {
        let colors: Vec<Color> = packed.iter().map(|&p| Color::from_packed(p)).collect();
        Self::from_entries(name, &colors)
    }

    /// Spread `stops` evenly over the ramp and interpolate linearly between
    /// them. Needs at least two stops.
    pub fn from_stops(name: impl Into<String>, stops: &[Color]) -> HeatmapResult<Self> {
        let name = name.into();
        if stops.len() < 2 {
            return Err(HeatmapError::InvalidPalette(format!(
                "palette '{}' needs at least 2 color stops, got {}",
                name,
                stops.len()
            )));
        }
        Ok(Self::interpolate(name, stops))
    }

    fn interpolate(name: impl Into<String>, stops: &[Color]) -> Self {
        let segments = stops.len() - 1;
        let mut entries = [Color::transparent(); PALETTE_SIZE];

        for (i, entry) in entries.iter_mut().enumerate() {
            let position = i as f64 / (PALETTE_SIZE - 1) as f64 * segments as f64;
            let segment = (position.floor() as usize).min(segments - 1);
            *entry = stops[segment].lerp(stops[segment + 1], position - segment as f64);
        }

        Self {
            name: name.into(),
            entries: Box::new(entries),
        }
    }

    /// Derive a ramp from one seed color: black to the seed over the lower
    /// half, the seed to white over the upper half, alpha equal to the index.
    ///
    /// Luminance and alpha never decrease along the ramp.
    pub fn generate(seed: Color) -> Self {
        const HALF: usize = PALETTE_SIZE / 2;
        let black = Color::new(0, 0, 0, 255);
        let white = Color::new(255, 255, 255, 255);
        let seed = Color { a: 255, ..seed };
        let mut entries = [Color::transparent(); PALETTE_SIZE];

        for (i, entry) in entries.iter_mut().enumerate() {
            let rgb = if i < HALF {
                black.lerp(seed, i as f64 / (HALF - 1) as f64)
            } else {
                seed.lerp(white, (i - HALF) as f64 / (HALF - 1) as f64)
            };
            *entry = Color { a: i as u8, ..rgb };
        }

        Self {
            name: seed.to_hex()[..7].to_string(),
            entries: Box::new(entries),
        }
    }

    /// The shared FIRE ramp.
    pub fn fire() -> Arc<Palette> {
        Arc::clone(&FIRE)
    }

    pub fn ice() -> Palette {
        Self::interpolate("ICE", &ICE_STOPS)
    }

    pub fn gray() -> Palette {
        Self::interpolate("GRAY", &GRAY_STOPS)
    }

    pub fn rainbow() -> Palette {
        Self::interpolate("RAINBOW", &RAINBOW_STOPS)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry(&self, index: u8) -> Color {
        self.entries[index as usize]
    }

    pub fn first(&self) -> Color {
        self.entries[0]
    }

    pub fn last(&self) -> Color {
        self.entries[PALETTE_SIZE - 1]
    }

    pub fn entries(&self) -> &[Color] {
        &self.entries[..]
    }

    /// Entries packed as `0xRRGGBBAA`.
    pub fn packed(&self) -> Vec<u32> {
        self.entries.iter().map(Color::packed).collect()
    }

    /// Color for a normalized intensity, with the entry's alpha scaled by
    /// `opacity`.
    ///
    /// Intensity is clamped to `[0, 1]` (NaN counts as 0) and opacity to
    /// `[0, 1]`.
    #[inline]
    pub fn map(&self, intensity: f64, opacity: f64) -> Color {
        let index = if intensity.is_nan() {
            0
        } else {
            (intensity * 255.0).round().clamp(0.0, 255.0) as usize
        };
        let opacity = if opacity.is_nan() { 0.0 } else { opacity };
        self.entries[index].with_alpha_scaled(opacity)
    }
}

/// Name → palette table. Names are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct PaletteRegistry {
    palettes: HashMap<String, Arc<Palette>>,
}

impl PaletteRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding FIRE, ICE, GRAY and RAINBOW.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_shared(Palette::fire());
        registry.register(Palette::ice());
        registry.register(Palette::gray());
        registry.register(Palette::rainbow());
        registry
    }

    /// Add or replace a palette. Returns the one it replaced.
    pub fn register(&mut self, palette: Palette) -> Option<Arc<Palette>> {
        self.register_shared(Arc::new(palette))
    }

    pub fn register_shared(&mut self, palette: Arc<Palette>) -> Option<Arc<Palette>> {
        self.palettes
            .insert(palette.name().to_ascii_uppercase(), palette)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Palette>> {
        self.palettes.get(&name.to_ascii_uppercase()).cloned()
    }

    /// Palette for a request parameter.
    ///
    /// - absent or unknown name: FIRE
    /// - `#RRGGBB`: generated from that seed; an unparsable seed falls back to FIRE
    ///
    /// Fails with `PaletteNotFound` only when FIRE itself is missing.
    pub fn resolve(&self, requested: Option<&str>) -> HeatmapResult<Arc<Palette>> {
        let requested = requested.map(str::trim).filter(|name| !name.is_empty());

        if let Some(name) = requested {
            if name.starts_with('#') {
                match Color::from_hex(name) {
                    Ok(seed) => return Ok(Arc::new(Palette::generate(seed))),
                    Err(e) => debug!(palette = name, error = %e, "Invalid seed, using FIRE"),
                }
            } else if let Some(palette) = self.get(name) {
                return Ok(palette);
            } else {
                debug!(palette = name, "Unknown palette, using {}", DEFAULT_PALETTE);
            }
        }

        self.get(DEFAULT_PALETTE)
            .ok_or_else(|| {
                HeatmapError::PaletteNotFound(requested.unwrap_or(DEFAULT_PALETTE).to_string())
            })
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.palettes.values().map(|p| p.name().to_string()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.palettes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.palettes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_ramps_start_transparent() {
        let registry = PaletteRegistry::with_builtins();
        for name in registry.names() {
            let palette = registry.get(&name).unwrap();
            assert_eq!(palette.first().a, 0, "{}", name);
            assert_eq!(palette.last().a, 255, "{}", name);
        }
    }

    #[test]
    fn test_from_stops_hits_endpoints() {
        let stops = [Color::new(0, 0, 0, 0), Color::new(200, 100, 50, 255)];
        let palette = Palette::from_stops("two", &stops).unwrap();
        assert_eq!(palette.first(), stops[0]);
        assert_eq!(palette.last(), stops[1]);
        assert!(Palette::from_stops("one", &stops[..1]).is_err());
    }

    #[test]
    fn test_from_packed_requires_256_entries() {
        let packed: Vec<u32> = (0..256u32).map(|i| i << 8 | 0xff).collect();
        let palette = Palette::from_packed("packed", &packed).unwrap();
        assert_eq!(palette.entry(3), Color::new(0, 0, 3, 255));
        assert_eq!(palette.packed(), packed);

        assert!(matches!(
            Palette::from_packed("short", &packed[..10]),
            Err(HeatmapError::InvalidPalette(_))
        ));
    }

    #[test]
    fn test_map_indexing() {
        let palette = Palette::gray();
        assert_eq!(palette.map(0.0, 1.0), palette.first());
        assert_eq!(palette.map(1.0, 1.0), palette.last());
        assert_eq!(palette.map(2.0, 1.0), palette.last());
        assert_eq!(palette.map(-1.0, 1.0), palette.first());
        assert_eq!(palette.map(f64::NAN, 1.0), palette.first());
        assert_eq!(palette.map(0.5, 1.0), palette.entry(128));
        assert_eq!(palette.map(1.0, 0.5).a, 128);
        assert_eq!(palette.map(1.0, 0.0).a, 0);
    }

    #[test]
    fn test_resolve() {
        let registry = PaletteRegistry::with_builtins();
        assert_eq!(registry.resolve(None).unwrap().name(), "FIRE");
        assert_eq!(registry.resolve(Some("ice")).unwrap().name(), "ICE");
        assert_eq!(registry.resolve(Some("nope")).unwrap().name(), "FIRE");
        assert_eq!(registry.resolve(Some("#00ff00")).unwrap().name(), "#00ff00");
        assert_eq!(registry.resolve(Some("#zzzzzz")).unwrap().name(), "FIRE");
        assert_eq!(registry.resolve(Some("#12345")).unwrap().name(), "FIRE");

        let empty = PaletteRegistry::new();
        assert!(matches!(
            empty.resolve(Some("ice")),
            Err(HeatmapError::PaletteNotFound(_))
        ));
    }
}
