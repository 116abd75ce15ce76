//! Raster asset fetching and decoding.
//!
//! Image references in creative config are opaque; an [`ImageFetch`]
//! implementation resolves them. [`FsImageFetch`] serves normalized relative
//! paths under a root directory; [`HttpImageFetch`] (behind the `http`
//! feature) fetches URLs with a blocking client. Fetch failures abort only
//! the creative being built.

use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::error::{GaugeError, GaugeResult};

/// Loader of raster assets by opaque reference.
pub trait ImageFetch {
    /// Fetch and decode the image behind `reference`.
    fn load(&self, reference: &str) -> GaugeResult<RgbaImage>;
}

/// Decode encoded image bytes into straight-alpha RGBA8.
pub fn decode_image(bytes: &[u8]) -> GaugeResult<RgbaImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| GaugeError::asset_load(format!("decode image: {e}")))?;
    Ok(dyn_img.to_rgba8())
}

/// Normalize and validate a store-relative asset path.
///
/// The normalized result uses `/` separators, removes `.` segments, and
/// rejects absolute paths or parent traversals (`..`).
pub fn normalize_rel_path(reference: &str) -> GaugeResult<String> {
    let s = reference.replace('\\', "/");
    if s.starts_with('/') {
        return Err(GaugeError::asset_load("asset paths must be relative"));
    }
    if s.is_empty() {
        return Err(GaugeError::asset_load("asset path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(GaugeError::asset_load("asset paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(GaugeError::asset_load("asset path must contain a file name"));
    }

    Ok(out.join("/"))
}

/// Filesystem-backed image fetcher rooted at a directory.
pub struct FsImageFetch {
    root: PathBuf,
}

impl FsImageFetch {
    /// Fetcher resolving references relative to `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory used when resolving references.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ImageFetch for FsImageFetch {
    fn load(&self, reference: &str) -> GaugeResult<RgbaImage> {
        let rel = normalize_rel_path(reference)?;
        let path = self.root.join(Path::new(&rel));
        let bytes = std::fs::read(&path).map_err(|e| {
            GaugeError::asset_load(format!("read image '{}': {e}", path.display()))
        })?;
        decode_image(&bytes)
    }
}

/// HTTP image fetcher for URL references.
#[cfg(feature = "http")]
pub struct HttpImageFetch {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "http")]
impl HttpImageFetch {
    /// Fetcher with a fresh blocking client.
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }
}

#[cfg(feature = "http")]
impl Default for HttpImageFetch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "http")]
impl ImageFetch for HttpImageFetch {
    fn load(&self, reference: &str) -> GaugeResult<RgbaImage> {
        let resp = self
            .client
            .get(reference)
            .send()
            .map_err(|e| GaugeError::asset_load(format!("fetch '{reference}': {e}")))?;
        if !resp.status().is_success() {
            return Err(GaugeError::asset_load(format!(
                "fetch '{reference}': http status {}",
                resp.status()
            )));
        }
        let bytes = resp
            .bytes()
            .map_err(|e| GaugeError::asset_load(format!("fetch '{reference}': {e}")))?;
        decode_image(&bytes)
    }
}
