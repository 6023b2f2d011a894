//! Test support shared by every crate in the workspace: deterministic event
//! generators, a fixed clock, configuration fixtures, and a couple of
//! assertion macros.
//!
//! Pull it in as a path dev-dependency and import from the crate root:
//! `use test_utils::{event_at, FIXED_NOW};`

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Assert that an RGBA tile buffer is fully transparent.
///
/// ```ignore
/// use test_utils::assert_transparent;
///
/// assert_transparent!(&tile.pixels);
/// ```
#[macro_export]
macro_rules! assert_transparent {
    ($pixels:expr) => {{
        let pixels: &[u8] = $pixels;
        if let Some(index) = pixels.chunks_exact(4).position(|px| px[3] != 0) {
            panic!(
                "assertion failed: pixel {} is not transparent (alpha {})",
                index,
                pixels[index * 4 + 3]
            );
        }
    }};
}
