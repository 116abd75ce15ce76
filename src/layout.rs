//! Alignment arithmetic for the percentage badge.

/// Text alignment inside the configured text box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Align {
    /// Anchor is the absolute top-left draw position.
    Left,
    /// Text is centered in the box, shifted by the anchor.
    #[default]
    Center,
    /// Anchor is an inward margin from the box's far edge.
    Right,
}

impl Align {
    /// Parse a config string; unrecognized values degrade to center.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "left" => Align::Left,
            "right" => Align::Right,
            _ => Align::Center,
        }
    }
}

/// Top-left draw position for text of `text_size` inside `box_size`.
///
/// For `Left` and `Center` the anchor is an absolute offset; for `Right` it
/// acts as an inward margin from the far edge. Coordinates are not clamped:
/// text larger than the box yields a negative origin and is drawn partly
/// off-canvas rather than resized or rejected.
pub fn aligned_origin(
    align: Align,
    anchor: (i32, i32),
    box_size: (i32, i32),
    text_size: (i32, i32),
) -> (i32, i32) {
    match align {
        Align::Center => (
            anchor.0 + (box_size.0 - text_size.0) / 2,
            anchor.1 + (box_size.1 - text_size.1) / 2,
        ),
        Align::Right => (
            (box_size.0 - text_size.0) - anchor.0,
            (box_size.1 - text_size.1) - anchor.1,
        ),
        Align::Left => anchor,
    }
}

/// Badge text for a percentage: integer value, no decimal places.
pub fn percent_label(percent: f64) -> String {
    format!("{}%", percent as i64)
}
