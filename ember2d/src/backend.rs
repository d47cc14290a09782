//! Texture backends: the boundary between the engine core and whatever owns
//! pixel data (a GPU renderer, an image decoder, or nothing at all).

use std::collections::{HashMap, HashSet};

use anyhow::{bail, Context, Result};
use image::RgbaImage;

/// Opaque handle used to reference pixel data owned by a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawTexture(u64);

impl RawTexture {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// A texture freshly created by a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadedTexture {
    pub raw: RawTexture,
    pub width: u32,
    pub height: u32,
}

/// RGBA color, 8 bits per channel.
pub type Color = [u8; 4];

/// Creates and destroys backend textures on behalf of the engine.
///
/// The engine guarantees that every handle returned by a `create_*` call is
/// passed to [`TextureBackend::destroy_texture`] exactly once.
pub trait TextureBackend {
    /// Load a texture from an image file.
    fn create_texture(&mut self, path: &str) -> Result<LoadedTexture>;

    /// Rasterize `text` with a previously loaded font.
    ///
    /// Font loading lives outside the engine core, so backends without a
    /// text rasterizer simply refuse.
    fn create_text_texture(&mut self, font: &str, text: &str, _color: Color) -> Result<LoadedTexture> {
        bail!("this backend cannot rasterize text `{text}` with font `{font}`")
    }

    /// Release a texture created by this backend.
    fn destroy_texture(&mut self, raw: RawTexture);
}

/// Backend that decodes image files into CPU-side RGBA buffers.
pub struct ImageBackend {
    next_id: u64,
    images: HashMap<RawTexture, RgbaImage>,
}

impl ImageBackend {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            images: HashMap::new(),
        }
    }

    /// Pixels of a live texture.
    pub fn pixels(&self, raw: RawTexture) -> Option<&RgbaImage> {
        self.images.get(&raw)
    }

    /// Number of textures currently held.
    pub fn live_count(&self) -> usize {
        self.images.len()
    }
}

impl Default for ImageBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TextureBackend for ImageBackend {
    fn create_texture(&mut self, path: &str) -> Result<LoadedTexture> {
        let image = image::open(path)
            .with_context(|| format!("Loading texture {path}"))?
            .to_rgba8();
        let (width, height) = image.dimensions();

        let raw = RawTexture::new(self.next_id);
        self.next_id += 1;
        self.images.insert(raw, image);

        Ok(LoadedTexture { raw, width, height })
    }

    fn destroy_texture(&mut self, raw: RawTexture) {
        if self.images.remove(&raw).is_none() {
            log::warn!("Destroying unknown texture {:?}", raw);
        }
    }
}

/// Backend that never touches the disk.
///
/// Hands out handles with fixed dimensions and keeps count of what was
/// created and destroyed. Useful for map tooling and tests.
pub struct HeadlessBackend {
    next_id: u64,
    default_size: (u32, u32),
    sizes: HashMap<String, (u32, u32)>,
    failing: HashSet<String>,
    live: HashSet<RawTexture>,
    created: usize,
    destroyed: usize,
    invalid_destroys: usize,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            default_size: (32, 32),
            sizes: HashMap::new(),
            failing: HashSet::new(),
            live: HashSet::new(),
            created: 0,
            destroyed: 0,
            invalid_destroys: 0,
        }
    }

    /// Dimensions reported for any path without an explicit size.
    #[must_use]
    pub fn with_default_size(mut self, width: u32, height: u32) -> Self {
        self.default_size = (width, height);
        self
    }

    /// Dimensions reported for one specific path.
    #[must_use]
    pub fn with_texture_size(mut self, path: impl Into<String>, width: u32, height: u32) -> Self {
        self.sizes.insert(path.into(), (width, height));
        self
    }

    /// Make every `create_texture` call for `path` fail.
    #[must_use]
    pub fn failing_on(mut self, path: impl Into<String>) -> Self {
        self.failing.insert(path.into());
        self
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn created_count(&self) -> usize {
        self.created
    }

    pub fn destroyed_count(&self) -> usize {
        self.destroyed
    }

    /// Number of destroy calls for handles that were not live (double frees).
    pub fn invalid_destroy_count(&self) -> usize {
        self.invalid_destroys
    }

    fn allocate(&mut self, width: u32, height: u32) -> LoadedTexture {
        let raw = RawTexture::new(self.next_id);
        self.next_id += 1;
        self.live.insert(raw);
        self.created += 1;
        LoadedTexture { raw, width, height }
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TextureBackend for HeadlessBackend {
    fn create_texture(&mut self, path: &str) -> Result<LoadedTexture> {
        if self.failing.contains(path) {
            bail!("texture `{path}` is unavailable");
        }
        let (width, height) = self.sizes.get(path).copied().unwrap_or(self.default_size);
        Ok(self.allocate(width, height))
    }

    fn create_text_texture(&mut self, _font: &str, text: &str, _color: Color) -> Result<LoadedTexture> {
        // Fixed 8x16 cells, enough for layout checks.
        let width = 8 * text.chars().count() as u32;
        Ok(self.allocate(width, 16))
    }

    fn destroy_texture(&mut self, raw: RawTexture) {
        if self.live.remove(&raw) {
            self.destroyed += 1;
        } else {
            log::error!("Texture {:?} destroyed twice or never created", raw);
            self.invalid_destroys += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_tracks_lifecycle() {
        let mut backend = HeadlessBackend::new().with_texture_size("big.png", 64, 48);
        let a = backend.create_texture("big.png").unwrap();
        let b = backend.create_texture("small.png").unwrap();
        assert_eq!((a.width, a.height), (64, 48));
        assert_eq!((b.width, b.height), (32, 32));
        assert_ne!(a.raw, b.raw);
        assert_eq!(backend.live_count(), 2);

        backend.destroy_texture(a.raw);
        backend.destroy_texture(a.raw);
        assert_eq!(backend.live_count(), 1);
        assert_eq!(backend.destroyed_count(), 1);
        assert_eq!(backend.invalid_destroy_count(), 1);
    }

    #[test]
    fn headless_failing_path() {
        let mut backend = HeadlessBackend::new().failing_on("missing.png");
        assert!(backend.create_texture("missing.png").is_err());
        assert_eq!(backend.created_count(), 0);
    }

    #[test]
    fn image_backend_reports_missing_file() {
        let mut backend = ImageBackend::new();
        let err = backend
            .create_texture("/definitely/not/here.png")
            .unwrap_err();
        assert!(format!("{err:#}").contains("/definitely/not/here.png"));
        assert_eq!(backend.live_count(), 0);
    }

    #[test]
    fn image_backend_decodes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.png");
        RgbaImage::from_pixel(5, 3, image::Rgba([255, 0, 0, 255]))
            .save(&path)
            .unwrap();

        let mut backend = ImageBackend::new();
        let loaded = backend.create_texture(path.to_str().unwrap()).unwrap();
        assert_eq!((loaded.width, loaded.height), (5, 3));
        assert_eq!(
            backend.pixels(loaded.raw).unwrap().get_pixel(0, 0),
            &image::Rgba([255, 0, 0, 255])
        );

        backend.destroy_texture(loaded.raw);
        assert_eq!(backend.live_count(), 0);
    }
}
