//! Creative composition pipeline and batch orchestration.
//!
//! [`Compositor`] builds one creative: select the background for the
//! percentage, mask the progress overlay, paste it at the background's
//! offset, draw the optional percentage badge. [`BatchRunner`] drives a whole
//! regeneration run over injected collaborators with per-creative error
//! isolation: one creative's failure is reported and recorded, never
//! propagated to its siblings.

use std::{
    io::Cursor,
    path::{Path, PathBuf},
};

use anyhow::Context;
use image::{ImageFormat, RgbaImage};

use crate::{
    assets::ImageFetch,
    composite,
    config::{ConfigSource, CreativeConfig, TextStyle, collect_creatives},
    error::{GaugeError, GaugeResult},
    layout::{aligned_origin, percent_label},
    select::select_background,
    text::{FontStore, LoadedFace},
};

/// Provider of the current goal-completion percentage.
pub trait GoalSource {
    /// Current value in [0, 100].
    fn percent(&self) -> GaugeResult<f64>;
}

/// Destination for finished creatives.
pub trait UploadSink {
    /// Deliver the encoded image for `creative_id`.
    fn upload(&self, creative_id: &str, image: &[u8]) -> GaugeResult<()>;
}

/// Terminal state of one creative in a batch run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreativeStatus {
    /// Required config sections were missing or invalid.
    Excluded,
    /// Composition, encoding, or persistence failed.
    BuildFailed,
    /// Image produced, persisted, and accepted by the sink.
    Uploaded,
    /// Image produced and persisted but rejected by the sink.
    UploadFailed,
}

/// Per-creative outcome of a batch run.
#[derive(Clone, Debug)]
pub struct CreativeReport {
    /// The creative this report is for.
    pub creative_id: String,
    /// Terminal state reached.
    pub status: CreativeStatus,
    /// True when no background range matched and the last variant was used.
    pub fallback_background: bool,
    /// Persisted output path, when one was produced.
    pub output: Option<PathBuf>,
}

/// A finished composition plus how it was selected.
pub struct BuiltCreative {
    /// The composited raster.
    pub image: RgbaImage,
    /// True when the background selection fell back to the last variant.
    pub fallback_background: bool,
}

/// Composites a single creative from its config and a percentage.
pub struct Compositor<'a> {
    fetcher: &'a dyn ImageFetch,
    fonts: &'a dyn FontStore,
}

impl<'a> Compositor<'a> {
    /// Compositor over the given collaborators.
    pub fn new(fetcher: &'a dyn ImageFetch, fonts: &'a dyn FontStore) -> Self {
        Self { fetcher, fonts }
    }

    /// Build the composited image for `creative` at `percent`.
    ///
    /// A fallback background selection is reported and rendered, not failed.
    /// A font that cannot be loaded degrades to the built-in face. Asset
    /// fetch failures abort this creative only.
    #[tracing::instrument(skip(self, creative), fields(creative = %creative.creative_id))]
    pub fn build(&self, creative: &CreativeConfig, percent: f64) -> GaugeResult<BuiltCreative> {
        let selection = select_background(&creative.backgrounds, percent).ok_or_else(|| {
            GaugeError::selection(format!(
                "creative '{}' has no background variants",
                creative.creative_id
            ))
        })?;
        if selection.fallback {
            tracing::warn!(
                creative = %creative.creative_id,
                percent,
                "no background range matched, using last variant"
            );
        }

        let mut background = self.fetcher.load(&selection.variant.image)?;
        let mut bar = self.fetcher.load(&creative.progress_bar.image)?;

        composite::mask_unfilled(&mut bar, creative.progress_bar.offset, percent / 100.0);
        composite::overlay_at(&mut background, &bar, selection.variant.offset);

        if let Some(style) = &creative.text {
            let face = self.load_face(style);
            let label = percent_label(percent);
            let origin = aligned_origin(
                style.align,
                style.anchor,
                style.box_size,
                face.measure(&label),
            );
            face.draw(&mut background, origin, &label, style.color);
        }

        Ok(BuiltCreative {
            image: background,
            fallback_background: selection.fallback,
        })
    }

    fn load_face(&self, style: &TextStyle) -> LoadedFace {
        match self.fonts.load(&style.font) {
            Ok(font) => LoadedFace::Truetype {
                font,
                size_px: style.size as f32,
            },
            Err(error) => {
                tracing::warn!(font = %style.font, %error, "font load failed, using built-in face");
                LoadedFace::Builtin
            }
        }
    }
}

/// Encode a composited image to PNG bytes.
pub fn encode_png(image: &RgbaImage) -> GaugeResult<Vec<u8>> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .context("encode png")?;
    Ok(buf)
}

/// Deterministic output path for a creative id.
pub fn output_path(root: &Path, creative_id: &str) -> PathBuf {
    root.join(format!("creative_{creative_id}.png"))
}

/// Drives a whole regeneration run with per-creative error isolation.
pub struct BatchRunner<'a> {
    fetcher: &'a dyn ImageFetch,
    fonts: &'a dyn FontStore,
    output_root: PathBuf,
}

impl<'a> BatchRunner<'a> {
    /// Runner persisting outputs under `output_root`.
    pub fn new(
        fetcher: &'a dyn ImageFetch,
        fonts: &'a dyn FontStore,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fetcher,
            fonts,
            output_root: output_root.into(),
        }
    }

    /// Regenerate and upload every configured creative.
    ///
    /// `percent` overrides the goal source when supplied. The run always
    /// attempts every discovered creative id and returns one report per id,
    /// in stable id order. Only collaborator failures that precede the
    /// per-creative loop (config source, goal source) fail the run itself.
    pub fn run(
        &self,
        source: &dyn ConfigSource,
        goal: &dyn GoalSource,
        sink: &dyn UploadSink,
        percent: Option<f64>,
    ) -> GaugeResult<Vec<CreativeReport>> {
        let entries = source.get_all()?;
        let (creatives, rejections) = collect_creatives(&entries, self.fonts);
        let percent = match percent {
            Some(p) => p,
            None => goal.percent()?,
        };

        let mut reports = Vec::new();
        for rejection in &rejections {
            let Some(creative_id) = &rejection.creative_id else {
                continue;
            };
            if reports
                .iter()
                .any(|r: &CreativeReport| &r.creative_id == creative_id)
            {
                continue;
            }
            reports.push(CreativeReport {
                creative_id: creative_id.clone(),
                status: CreativeStatus::Excluded,
                fallback_background: false,
                output: None,
            });
        }

        for creative in &creatives {
            reports.push(self.process(creative, percent, sink));
        }

        reports.sort_by(|a, b| a.creative_id.cmp(&b.creative_id));
        Ok(reports)
    }

    fn process(
        &self,
        creative: &CreativeConfig,
        percent: f64,
        sink: &dyn UploadSink,
    ) -> CreativeReport {
        let creative_id = creative.creative_id.clone();
        let compositor = Compositor::new(self.fetcher, self.fonts);

        let built = match compositor.build(creative, percent) {
            Ok(built) => built,
            Err(error) => {
                tracing::error!(creative = %creative_id, %error, "build failed");
                return CreativeReport {
                    creative_id,
                    status: CreativeStatus::BuildFailed,
                    fallback_background: false,
                    output: None,
                };
            }
        };

        let path = output_path(&self.output_root, &creative_id);
        let bytes = match encode_png(&built.image).and_then(|bytes| {
            persist(&path, &bytes)?;
            Ok(bytes)
        }) {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::error!(creative = %creative_id, %error, "failed to persist creative");
                return CreativeReport {
                    creative_id,
                    status: CreativeStatus::BuildFailed,
                    fallback_background: built.fallback_background,
                    output: None,
                };
            }
        };

        match sink.upload(&creative_id, &bytes) {
            Ok(()) => {
                tracing::debug!(creative = %creative_id, path = %path.display(), "uploaded creative");
                CreativeReport {
                    creative_id,
                    status: CreativeStatus::Uploaded,
                    fallback_background: built.fallback_background,
                    output: Some(path),
                }
            }
            Err(error) => {
                tracing::error!(creative = %creative_id, %error, "upload failed");
                CreativeReport {
                    creative_id,
                    status: CreativeStatus::UploadFailed,
                    fallback_background: built.fallback_background,
                    output: Some(path),
                }
            }
        }
    }
}

fn persist(path: &Path, bytes: &[u8]) -> GaugeResult<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| {
            GaugeError::persistence(format!("create output dir '{}': {e}", dir.display()))
        })?;
    }
    std::fs::write(path, bytes)
        .map_err(|e| GaugeError::persistence(format!("write '{}': {e}", path.display())))
}
