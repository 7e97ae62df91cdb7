//! # Color-ID Picking
//!
//! Every enabled object is drawn into an off-screen target with a flat color
//! that encodes its index in the scene:
//!
//! ```text
//! r = id & 0xFF
//! g = (id >> 8) & 0xFF
//! b = (id >> 16) & 0xFF
//! ```
//!
//! The target is cleared to white, which decodes to [`SENTINEL`]. A click reads
//! back the single texel under the cursor and turns it into a selection.
//!
//! ```rust
//! use wardrobe_designer::picking::{decode_pixel, encode_index, resolve, SENTINEL};
//!
//! let [r, g, b] = encode_index(300).unwrap();
//! assert_eq!(decode_pixel([r, g, b, 255]), 300);
//! assert_eq!(resolve([255, 255, 255, 255], 10), None);
//! assert_eq!(decode_pixel([255, 255, 255, 255]), SENTINEL);
//! ```

use crate::render::{RenderBackend, RowOrder, TargetId};

/// Packed value of the white clear color. Never a valid object ID.
pub const SENTINEL: u32 = 0x00FF_FFFF;

/// Clear color of the picking target.
pub const CLEAR_COLOR: [f64; 4] = [1.0, 1.0, 1.0, 1.0];

/// RGB channels for `index`, or `None` if it does not fit below the sentinel.
pub fn encode_index(index: usize) -> Option<[u8; 3]> {
    if index >= SENTINEL as usize {
        return None;
    }
    Some([
        (index & 0xFF) as u8,
        ((index >> 8) & 0xFF) as u8,
        ((index >> 16) & 0xFF) as u8,
    ])
}

/// Flat shader color for `index`, as normalized RGBA.
pub fn index_to_color(index: usize) -> Option<[f32; 4]> {
    encode_index(index).map(|[r, g, b]| {
        [
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            1.0,
        ]
    })
}

/// Repacks a read-back texel. Alpha is ignored.
pub fn decode_pixel(pixel: [u8; 4]) -> u32 {
    u32::from(pixel[0]) | (u32::from(pixel[1]) << 8) | (u32::from(pixel[2]) << 16)
}

/// Selection for a texel given the current scene length.
pub fn resolve(pixel: [u8; 4], scene_len: usize) -> Option<usize> {
    let id = decode_pixel(pixel);
    if id == SENTINEL {
        return None;
    }

    let id = id as usize;
    if id >= scene_len {
        log::debug!("Pick id {id} out of range for {scene_len} objects");
        return None;
    }
    Some(id)
}

/// Maps a window-space cursor (origin top-left) onto a texel of a target.
///
/// Returns `None` when the cursor lies outside the target.
pub fn cursor_to_texel(
    cursor: (f64, f64),
    target_size: (u32, u32),
    row_order: RowOrder,
) -> Option<(u32, u32)> {
    let (width, height) = target_size;
    let (x, y) = cursor;
    if x < 0.0 || y < 0.0 || !x.is_finite() || !y.is_finite() {
        return None;
    }

    let (x, y) = (x.floor() as u64, y.floor() as u64);
    if x >= u64::from(width) || y >= u64::from(height) {
        return None;
    }

    let (x, y) = (x as u32, y as u32);
    match row_order {
        RowOrder::TopDown => Some((x, y)),
        RowOrder::BottomUp => Some((x, height - 1 - y)),
    }
}

/// Reads the picking target under `cursor` and decodes it.
///
/// The picking pass must have been rendered this frame. Every failure mode
/// (outside the target, failed readback, sentinel, stale id) means no object.
pub fn pick_at<B: RenderBackend + ?Sized>(
    backend: &mut B,
    cursor: (f64, f64),
    scene_len: usize,
) -> Option<usize> {
    let Some((x, y)) = cursor_to_texel(cursor, backend.viewport_size(), backend.row_order()) else {
        log::debug!("Cursor {cursor:?} outside picking target");
        return None;
    };

    let pixel = backend.read_pixel(TargetId::Picking, x, y)?;
    let picked = resolve(pixel, scene_len);
    log::debug!("Picked {picked:?} at ({x}, {y})");
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn test_valid_pixels_round_trip() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..2000 {
            let scene_len = rng.random_range(1..=SENTINEL as usize);
            let pixel: [u8; 4] = [rng.random(), rng.random(), rng.random(), 255];
            let packed = decode_pixel(pixel) as usize;

            match resolve(pixel, scene_len) {
                Some(id) => {
                    assert!(id < scene_len);
                    let [r, g, b] = encode_index(id).unwrap();
                    assert_eq!([r, g, b], [pixel[0], pixel[1], pixel[2]]);
                }
                None => assert!(packed >= scene_len || packed == SENTINEL as usize),
            }
        }
    }

    #[test]
    fn test_channel_layout() {
        assert_eq!(encode_index(0), Some([0, 0, 0]));
        assert_eq!(encode_index(0x0A0B0C), Some([0x0C, 0x0B, 0x0A]));
        assert_eq!(encode_index(SENTINEL as usize), None);
        assert_eq!(index_to_color(255), Some([1.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_sentinel_is_never_a_selection() {
        assert_eq!(resolve([255, 255, 255, 0], usize::MAX), None);
        assert_eq!(resolve([255, 255, 255, 255], 1 << 24), None);
    }

    #[test]
    fn test_out_of_range_is_no_selection() {
        let [r, g, b] = encode_index(3).unwrap();
        assert_eq!(resolve([r, g, b, 255], 3), None);
        assert_eq!(resolve([r, g, b, 255], 4), Some(3));
    }

    #[test]
    fn test_cursor_mapping() {
        assert_eq!(cursor_to_texel((0.0, 0.0), (4, 3), RowOrder::TopDown), Some((0, 0)));
        assert_eq!(cursor_to_texel((0.0, 0.0), (4, 3), RowOrder::BottomUp), Some((0, 2)));
        assert_eq!(cursor_to_texel((3.9, 2.5), (4, 3), RowOrder::BottomUp), Some((3, 0)));
        assert_eq!(cursor_to_texel((4.0, 0.0), (4, 3), RowOrder::TopDown), None);
        assert_eq!(cursor_to_texel((-0.5, 1.0), (4, 3), RowOrder::TopDown), None);
        assert_eq!(cursor_to_texel((f64::NAN, 1.0), (4, 3), RowOrder::TopDown), None);
    }
}
