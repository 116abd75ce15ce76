//! Font loading and percentage-badge rendering.
//!
//! TrueType faces come from an injected [`FontStore`]. When a configured
//! face cannot be loaded the pipeline degrades to [`LoadedFace::Builtin`], a
//! fixed-size bitmap glyph set covering the characters a percentage badge
//! can contain; a build never fails because of a font.

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use image::RgbaImage;
use parking_lot::Mutex;
use rusttype::{Font, Scale, point};

use crate::error::{GaugeError, GaugeResult};

/// Named font lookup used by the compositor.
pub trait FontStore {
    /// Whether `name` is present in this store.
    fn contains(&self, name: &str) -> bool;

    /// Load a TrueType face by name.
    fn load(&self, name: &str) -> GaugeResult<Arc<Font<'static>>>;

    /// Font name substituted when a configured font is missing.
    fn default_name(&self) -> &str;
}

/// Filesystem-backed font store with an in-process parse cache.
pub struct FsFontStore {
    root: PathBuf,
    default_name: String,
    cache: Mutex<HashMap<String, Arc<Font<'static>>>>,
}

impl FsFontStore {
    /// Store rooted at `root`, substituting `default_name` for missing fonts.
    pub fn new(root: impl Into<PathBuf>, default_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            default_name: default_name.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }
}

impl FontStore for FsFontStore {
    fn contains(&self, name: &str) -> bool {
        self.root.join(name).is_file()
    }

    fn load(&self, name: &str) -> GaugeResult<Arc<Font<'static>>> {
        if let Some(font) = self.cache.lock().get(name) {
            return Ok(Arc::clone(font));
        }

        let path = self.root.join(name);
        let bytes = std::fs::read(&path).map_err(|e| {
            GaugeError::asset_load(format!("read font '{}': {e}", path.display()))
        })?;
        let font = Font::try_from_vec(bytes)
            .ok_or_else(|| GaugeError::asset_load(format!("parse font '{name}'")))?;

        let font = Arc::new(font);
        self.cache
            .lock()
            .insert(name.to_string(), Arc::clone(&font));
        Ok(font)
    }

    fn default_name(&self) -> &str {
        &self.default_name
    }
}

/// Face used to draw the percentage badge.
pub enum LoadedFace {
    /// A loaded TrueType face at a fixed pixel size.
    Truetype {
        /// Parsed font.
        font: Arc<Font<'static>>,
        /// Uniform glyph scale in pixels.
        size_px: f32,
    },
    /// Built-in fixed bitmap glyphs; the configured point size is ignored.
    Builtin,
}

const BUILTIN_GLYPH_W: i32 = 5;
const BUILTIN_GLYPH_H: i32 = 7;
const BUILTIN_GLYPH_GAP: i32 = 1;

// 5x7 rows, bit 4 is the leftmost column.
fn builtin_glyph(ch: char) -> Option<[u8; 7]> {
    Some(match ch {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '%' => [0x18, 0x19, 0x02, 0x04, 0x08, 0x13, 0x03],
        '-' => [0x00, 0x00, 0x00, 0x0E, 0x00, 0x00, 0x00],
        _ => return None,
    })
}

impl LoadedFace {
    /// Pixel dimensions of `text` when drawn with this face.
    pub fn measure(&self, text: &str) -> (i32, i32) {
        if text.is_empty() {
            return (0, 0);
        }
        match self {
            LoadedFace::Truetype { font, size_px } => {
                let scale = Scale::uniform(*size_px);
                let v_metrics = font.v_metrics(scale);
                let width = font
                    .layout(text, scale, point(0.0, v_metrics.ascent))
                    .filter_map(|g| g.pixel_bounding_box())
                    .map(|bb| bb.max.x)
                    .max()
                    .unwrap_or(0);
                let height = (v_metrics.ascent - v_metrics.descent).ceil() as i32;
                (width, height)
            }
            LoadedFace::Builtin => {
                let chars = text.chars().count() as i32;
                (
                    chars * (BUILTIN_GLYPH_W + BUILTIN_GLYPH_GAP) - BUILTIN_GLYPH_GAP,
                    BUILTIN_GLYPH_H,
                )
            }
        }
    }

    /// Draw `text` onto `canvas` with its top-left corner at `origin`.
    ///
    /// Pixels outside the canvas are clipped; an off-canvas origin draws
    /// whatever still lands inside rather than failing.
    pub fn draw(&self, canvas: &mut RgbaImage, origin: (i32, i32), text: &str, color: [u8; 4]) {
        match self {
            LoadedFace::Truetype { font, size_px } => {
                let scale = Scale::uniform(*size_px);
                let v_metrics = font.v_metrics(scale);
                // origin is top-left; rusttype positions by baseline.
                let start = point(origin.0 as f32, origin.1 as f32 + v_metrics.ascent);
                for glyph in font.layout(text, scale, start) {
                    if let Some(bb) = glyph.pixel_bounding_box() {
                        glyph.draw(|gx, gy, coverage| {
                            blend_px(
                                canvas,
                                gx as i32 + bb.min.x,
                                gy as i32 + bb.min.y,
                                color,
                                coverage,
                            );
                        });
                    }
                }
            }
            LoadedFace::Builtin => {
                let mut caret_x = origin.0;
                for ch in text.chars() {
                    if let Some(rows) = builtin_glyph(ch) {
                        for (row, bits) in rows.iter().enumerate() {
                            for col in 0..BUILTIN_GLYPH_W {
                                if (bits >> (BUILTIN_GLYPH_W - 1 - col)) & 1 == 1 {
                                    blend_px(
                                        canvas,
                                        caret_x + col,
                                        origin.1 + row as i32,
                                        color,
                                        1.0,
                                    );
                                }
                            }
                        }
                    }
                    caret_x += BUILTIN_GLYPH_W + BUILTIN_GLYPH_GAP;
                }
            }
        }
    }
}

fn blend_px(canvas: &mut RgbaImage, x: i32, y: i32, color: [u8; 4], coverage: f32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    if x >= canvas.width() || y >= canvas.height() {
        return;
    }

    let alpha = (coverage.clamp(0.0, 1.0) * f32::from(color[3])).round() as u8;
    if alpha == 0 {
        return;
    }

    let dst = canvas.get_pixel_mut(x, y);
    let sa = f32::from(alpha) / 255.0;
    let inv = 1.0 - sa;
    for i in 0..3 {
        dst.0[i] = (f32::from(color[i]) * sa + f32::from(dst.0[i]) * inv) as u8;
    }
    dst.0[3] = dst.0[3].max(alpha);
}
