//! Thread-local buffer pools for reducing allocation overhead.
//!
//! Each render needs a 256x256 accumulation buffer of `f64` intensities and a
//! 256x256 RGBA output. Instead of allocating fresh `Vec`s for each tile,
//! buffers are cached per thread and reused across requests.
//!
//! ## Design
//!
//! - **Thread-local storage**: each thread has its own buffer cache, so
//!   concurrent renders never contend.
//! - **Automatic clearing**: buffers are zeroed before every use.
//! - **Reentrancy**: if the pooled buffer is already borrowed on this thread
//!   (a rayon worker picking up a second render while the first waits on a
//!   parallel section), a fresh buffer is allocated for that call.
//!
//! ## Usage
//!
//! ```ignore
//! use renderer::buffer_pool::{with_accumulation_buffer, take_pixel_buffer};
//!
//! let peak = with_accumulation_buffer(256, 256, |intensity| {
//!     // Accumulate...
//!     intensity.iter().cloned().fold(0.0, f64::max)
//! });
//! ```

use std::cell::RefCell;

/// Standard tile size in pixels
const TILE_256: usize = 256 * 256;

// Thread-local intensity buffer (f64 per pixel)
thread_local! {
    static ACCUMULATION_BUFFER: RefCell<Vec<f64>> = RefCell::new(Vec::with_capacity(TILE_256));
}

// Thread-local pixel buffer (RGBA, 4 bytes per pixel)
thread_local! {
    static PIXEL_BUFFER: RefCell<Vec<u8>> = RefCell::new(Vec::with_capacity(TILE_256 * 4));
}

/// Get a reusable, zeroed `f64` buffer of `width * height` entries.
#[inline]
pub fn with_accumulation_buffer<F, R>(width: usize, height: usize, f: F) -> R
where
    F: FnOnce(&mut [f64]) -> R,
{
    let size = width * height;
    ACCUMULATION_BUFFER.with(|buf| match buf.try_borrow_mut() {
        Ok(mut buf) => {
            if buf.len() < size {
                buf.resize(size, 0.0);
            }
            buf[..size].fill(0.0);
            f(&mut buf[..size])
        }
        Err(_) => f(&mut vec![0.0; size]),
    })
}

/// Get a reusable RGBA pixel buffer, returning owned Vec.
///
/// The buffer is zeroed (transparent), filled by `f`, then moved out and
/// replaced with a new allocation of the same capacity.
#[inline]
pub fn take_pixel_buffer<F>(width: usize, height: usize, f: F) -> Vec<u8>
where
    F: FnOnce(&mut [u8]),
{
    let size = width * height * 4;
    PIXEL_BUFFER.with(|buf| match buf.try_borrow_mut() {
        Ok(mut buf) => {
            buf.clear();
            buf.resize(size, 0);
            f(&mut buf[..]);
            std::mem::replace(&mut *buf, Vec::with_capacity(optimal_capacity(size)))
        }
        Err(_) => {
            let mut fresh = vec![0u8; size];
            f(&mut fresh);
            fresh
        }
    })
}

/// Return an optimal pre-allocation capacity for the given size.
#[inline]
fn optimal_capacity(size: usize) -> usize {
    if size <= TILE_256 * 4 {
        TILE_256 * 4
    } else {
        size.next_power_of_two()
    }
}
