//! Progress-overlay masking and background compositing.

use image::{Rgba, RgbaImage, imageops};

/// Paint the unfilled span of the progress overlay with opaque white.
///
/// `offset` is the progress bar's own configured offset: it positions the
/// fill rectangle *within the overlay image*. The rectangle runs from
/// `offset.x + width * fraction` to `offset.x + width` at full overlay
/// height, inclusive of its far corner and clipped to the overlay bounds.
pub fn mask_unfilled(overlay: &mut RgbaImage, offset: (i32, i32), fraction: f64) {
    let (w, h) = (i64::from(overlay.width()), i64::from(overlay.height()));
    let x0 = (f64::from(offset.0) + w as f64 * fraction).floor() as i64;
    let x1 = i64::from(offset.0) + w;
    let y0 = i64::from(offset.1);
    let y1 = i64::from(offset.1) + h;

    let fill = Rgba([255, 255, 255, 255]);
    for y in y0.max(0)..=y1.min(h - 1) {
        for x in x0.max(0)..=x1.min(w - 1) {
            overlay.put_pixel(x as u32, y as u32, fill);
        }
    }
}

/// Composite `overlay` onto `background` with its top-left at `offset`,
/// source-over, using the overlay's own alpha as the mask.
///
/// `offset` comes from the selected background variant, not from the
/// progress bar's configured offset.
pub fn overlay_at(background: &mut RgbaImage, overlay: &RgbaImage, offset: (i32, i32)) {
    imageops::overlay(background, overlay, i64::from(offset.0), i64::from(offset.1));
}
