//! Goal-driven dynamic creative compositing.
//!
//! The engine turns a goal-completion percentage plus per-creative visual
//! configuration into finished ad images:
//!
//! 1. **Collect**: raw config entries -> validated [`CreativeConfig`]s
//! 2. **Select**: percentage -> background variant (first match wins)
//! 3. **Composite**: mask the progress overlay, paste it onto the background
//! 4. **Text**: optional aligned percentage badge
//! 5. **Persist + upload**: deterministic PNG per creative, handed to the sink
//!
//! External collaborators (config storage, goal value, image bytes, fonts,
//! upload) are injected through traits, so batch runs are deterministic and
//! testable. Every failure is scoped to a single creative: a batch always
//! attempts every configured creative id.
#![forbid(unsafe_code)]

pub mod assets;
pub mod composite;
pub mod config;
pub mod error;
pub mod layout;
pub mod pipeline;
pub mod select;
pub mod text;

#[cfg(feature = "http")]
pub use assets::HttpImageFetch;
pub use assets::{FsImageFetch, ImageFetch, decode_image, normalize_rel_path};
pub use composite::{mask_unfilled, overlay_at};
pub use config::{
    BackgroundSpec, ConfigRejection, ConfigSource, CreativeConfig, ProgressBarSpec, RawEntry,
    Section, TextStyle, collect_creatives, parse_entry, parse_hex_color,
};
pub use error::{GaugeError, GaugeResult};
pub use layout::{Align, aligned_origin, percent_label};
pub use pipeline::{
    BatchRunner, BuiltCreative, Compositor, CreativeReport, CreativeStatus, GoalSource,
    UploadSink, encode_png, output_path,
};
pub use select::{Selection, select_background};
pub use text::{FontStore, FsFontStore, LoadedFace};
