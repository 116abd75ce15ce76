//! Per-creative visual configuration: raw entries, tagged sections, grouping.
//!
//! Raw key/value entries come from an external [`ConfigSource`]. Each entry
//! is parsed into a closed [`Section`] kind with its required fields enforced
//! up front, then grouped by creative id into [`CreativeConfig`] values.
//! A malformed entry or an incomplete creative is rejected and reported; it
//! never aborts collection of the remaining creatives.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    error::{GaugeError, GaugeResult},
    layout::Align,
    text::FontStore,
};

/// One raw section from the external config source.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct RawEntry {
    /// Section name, unique within the source.
    pub id: String,
    /// Untyped key/value fields.
    pub fields: BTreeMap<String, String>,
}

impl RawEntry {
    /// Entry with no fields, for building configs in code.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Set a field, builder style.
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    fn i32_field(&self, key: &str, default: i32) -> GaugeResult<i32> {
        match self.fields.get(key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse::<i32>().map_err(|_| {
                GaugeError::config(format!(
                    "[{}] field '{key}' is not an integer: '{raw}'",
                    self.id
                ))
            }),
        }
    }
}

/// Source of raw per-creative configuration entries.
pub trait ConfigSource {
    /// All entries for the current run.
    fn get_all(&self) -> GaugeResult<Vec<RawEntry>>;
}

/// Progress-bar overlay description.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ProgressBarSpec {
    /// Opaque image reference resolved by the image fetcher.
    pub image: String,
    /// Where the fill mask is painted within the overlay image.
    pub offset: (i32, i32),
}

/// One candidate background image tied to a percentage range.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct BackgroundSpec {
    /// Opaque image reference resolved by the image fetcher.
    pub image: String,
    /// Inclusive lower bound, clamped to [0, 100].
    pub min_percent: i32,
    /// Exclusive upper bound, clamped to [0, 100]; `>= 100` is open-ended.
    pub max_percent: i32,
    /// Where the progress overlay is pasted onto this background.
    pub offset: (i32, i32),
}

/// Styling for the optional percentage badge.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TextStyle {
    /// Font name resolved by the font store.
    pub font: String,
    /// Straight-alpha RGBA fill color.
    pub color: [u8; 4],
    /// Point size for TrueType rendering.
    pub size: i32,
    /// Alignment inside the text box.
    pub align: Align,
    /// Anchor offset; absolute for left/center, inward margin for right.
    pub anchor: (i32, i32),
    /// Text box dimensions the badge is aligned within.
    pub box_size: (i32, i32),
}

/// One parsed config section, tagged by item kind.
#[derive(Clone, Debug)]
pub enum Section {
    /// A `progress_bar` section.
    ProgressBar {
        /// Creative this section belongs to.
        creative_id: String,
        /// Parsed overlay spec.
        spec: ProgressBarSpec,
    },
    /// A `bg_image` section.
    Background {
        /// Creative this section belongs to.
        creative_id: String,
        /// Parsed background variant.
        spec: BackgroundSpec,
    },
    /// A `font_prefs` section.
    FontPrefs {
        /// Creative this section belongs to.
        creative_id: String,
        /// Parsed badge styling.
        style: TextStyle,
    },
}

/// Complete visual recipe for one creative.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct CreativeConfig {
    /// Opaque identifier, unique across the run.
    pub creative_id: String,
    /// Required progress overlay.
    pub progress_bar: ProgressBarSpec,
    /// Ordered background variants; never empty.
    pub backgrounds: Vec<BackgroundSpec>,
    /// Optional percentage badge styling.
    pub text: Option<TextStyle>,
}

/// A config entry or creative rejected during collection.
#[derive(Debug)]
pub struct ConfigRejection {
    /// Creative the rejection applies to, when attributable.
    pub creative_id: Option<String>,
    /// Why it was rejected.
    pub error: GaugeError,
}

/// Parse a `#RRGGBB` color string into straight-alpha RGBA.
pub fn parse_hex_color(s: &str) -> GaugeResult<[u8; 4]> {
    let t = s.trim().trim_start_matches('#');
    if t.len() != 6 {
        return Err(GaugeError::config(format!("invalid font_color '{s}'")));
    }
    let b =
        hex::decode(t).map_err(|_| GaugeError::config(format!("invalid font_color '{s}'")))?;
    Ok([b[0], b[1], b[2], 255])
}

/// Parse one raw entry into its tagged section.
///
/// Required fields: `creative_id`, a recognized `item_type`, and `image_url`
/// for image-bearing kinds. Percentage bounds are clamped to [0, 100];
/// numeric coercion failure rejects only this entry.
pub fn parse_entry(entry: &RawEntry) -> GaugeResult<Section> {
    let creative_id = entry
        .str_field("creative_id")
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GaugeError::config(format!("[{}] missing creative_id", entry.id)))?
        .to_string();
    let item_type = entry
        .str_field("item_type")
        .ok_or_else(|| GaugeError::config(format!("[{}] missing item_type", entry.id)))?;

    let offset = (
        entry.i32_field("x_offset", 0)?,
        entry.i32_field("y_offset", 0)?,
    );

    match item_type {
        "progress_bar" => Ok(Section::ProgressBar {
            creative_id,
            spec: ProgressBarSpec {
                image: required_image(entry)?,
                offset,
            },
        }),
        "bg_image" => {
            let min_percent = entry.i32_field("min_percentage", 0)?.clamp(0, 100);
            let max_percent = entry.i32_field("max_percentage", 100)?.clamp(0, 100);
            if min_percent > max_percent {
                return Err(GaugeError::config(format!(
                    "[{}] min_percentage {min_percent} exceeds max_percentage {max_percent}",
                    entry.id
                )));
            }
            Ok(Section::Background {
                creative_id,
                spec: BackgroundSpec {
                    image: required_image(entry)?,
                    min_percent,
                    max_percent,
                    offset,
                },
            })
        }
        "font_prefs" => Ok(Section::FontPrefs {
            creative_id,
            style: TextStyle {
                font: entry
                    .str_field("font")
                    .filter(|s| !s.is_empty())
                    .unwrap_or("Georgia.ttf")
                    .to_string(),
                color: parse_hex_color(entry.str_field("font_color").unwrap_or("#9A7D2E"))?,
                size: entry.i32_field("font_size", 16)?,
                align: Align::parse(entry.str_field("align").unwrap_or("center")),
                anchor: offset,
                box_size: (
                    entry.i32_field("x_offset_len", 300)?,
                    entry.i32_field("y_offset_len", 250)?,
                ),
            },
        }),
        other => Err(GaugeError::config(format!(
            "[{}] unknown item_type '{other}'",
            entry.id
        ))),
    }
}

fn required_image(entry: &RawEntry) -> GaugeResult<String> {
    entry
        .str_field("image_url")
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| GaugeError::config(format!("[{}] missing image_url", entry.id)))
}

/// Group parsed sections into per-creative configs.
///
/// The last `progress_bar` and `font_prefs` entry per creative win;
/// `bg_image` entries accumulate in declaration order. A creative missing a
/// progress bar or all background sections is rejected with a report.
/// Configured fonts absent from `fonts` are substituted with the store's
/// default name. Creatives are returned in stable id order.
pub fn collect_creatives(
    entries: &[RawEntry],
    fonts: &dyn FontStore,
) -> (Vec<CreativeConfig>, Vec<ConfigRejection>) {
    let mut rejections = Vec::new();
    let mut ids = BTreeSet::new();
    let mut bars: BTreeMap<String, ProgressBarSpec> = BTreeMap::new();
    let mut backgrounds: BTreeMap<String, Vec<BackgroundSpec>> = BTreeMap::new();
    let mut styles: BTreeMap<String, TextStyle> = BTreeMap::new();

    for entry in entries {
        match parse_entry(entry) {
            Ok(Section::ProgressBar { creative_id, spec }) => {
                ids.insert(creative_id.clone());
                bars.insert(creative_id, spec);
            }
            Ok(Section::Background { creative_id, spec }) => {
                ids.insert(creative_id.clone());
                backgrounds.entry(creative_id).or_default().push(spec);
            }
            Ok(Section::FontPrefs {
                creative_id,
                mut style,
            }) => {
                if !fonts.contains(&style.font) {
                    tracing::warn!(
                        entry = %entry.id,
                        font = %style.font,
                        "configured font not found, using default"
                    );
                    style.font = fonts.default_name().to_string();
                }
                ids.insert(creative_id.clone());
                styles.insert(creative_id, style);
            }
            Err(error) => {
                tracing::error!(entry = %entry.id, %error, "rejected config entry");
                rejections.push(ConfigRejection {
                    creative_id: entry.str_field("creative_id").map(str::to_string),
                    error,
                });
            }
        }
    }

    let mut creatives = Vec::new();
    for id in ids {
        match (bars.remove(&id), backgrounds.remove(&id)) {
            (Some(progress_bar), Some(bgs)) if !bgs.is_empty() => {
                creatives.push(CreativeConfig {
                    creative_id: id.clone(),
                    progress_bar,
                    backgrounds: bgs,
                    text: styles.remove(&id),
                });
            }
            _ => {
                let error = GaugeError::config(format!(
                    "creative '{id}' is missing a progress_bar or bg_image section"
                ));
                tracing::error!(creative = %id, %error, "excluded creative");
                rejections.push(ConfigRejection {
                    creative_id: Some(id),
                    error,
                });
            }
        }
    }

    (creatives, rejections)
}
