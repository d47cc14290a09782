use std::collections::HashMap;

use anyhow::Result;

use crate::arena::Arena;
use crate::backend::{LoadedTexture, TextureBackend};
use crate::entities::{Texture, TextureId};

/// Owns textures and caches them by path.
///
/// Objects and parallax layers only hold [`TextureId`]s, so a texture shared by
/// many of them is destroyed exactly once, when the store unloads it.
pub struct TextureStore {
    textures: Arena<Texture>,
    by_path: HashMap<String, TextureId>,
}

impl TextureStore {
    /// Create a new store with no textures.
    pub fn new() -> Self {
        Self {
            textures: Arena::new(),
            by_path: HashMap::new(),
        }
    }

    /// Load a texture from a file path, reusing it if already loaded.
    pub fn load(&mut self, backend: &mut dyn TextureBackend, path: &str) -> Result<TextureId> {
        // Check cache first
        if let Some(id) = self.by_path.get(path) {
            return Ok(*id);
        }

        let loaded = backend.create_texture(path)?;
        let id = self.textures.insert(Texture {
            path: Some(path.to_string()),
            raw: loaded.raw,
            width: loaded.width,
            height: loaded.height,
        });
        self.by_path.insert(path.to_string(), id);
        log::debug!("Loaded texture `{}` ({}x{})", path, loaded.width, loaded.height);
        Ok(id)
    }

    /// Take ownership of a generated texture that has no source path.
    pub fn insert_generated(&mut self, loaded: LoadedTexture) -> TextureId {
        self.textures.insert(Texture {
            path: None,
            raw: loaded.raw,
            width: loaded.width,
            height: loaded.height,
        })
    }

    pub fn get(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id)
    }

    /// Look up a cached texture by path.
    pub fn find(&self, path: &str) -> Option<TextureId> {
        self.by_path.get(path).copied()
    }

    pub fn contains(&self, id: TextureId) -> bool {
        self.textures.contains(id)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Iterate over all textures in load order.
    pub fn iter(&self) -> impl Iterator<Item = (TextureId, &Texture)> + '_ {
        self.textures.iter()
    }

    /// Destroy one texture. Returns false if it was already gone.
    pub fn unload(&mut self, backend: &mut dyn TextureBackend, id: TextureId) -> bool {
        let Some(texture) = self.textures.remove(id) else {
            return false;
        };
        if let Some(path) = &texture.path {
            self.by_path.remove(path);
        }
        backend.destroy_texture(texture.raw);
        true
    }

    /// Destroy every texture in the store.
    pub fn clear(&mut self, backend: &mut dyn TextureBackend) {
        for texture in self.textures.drain() {
            backend.destroy_texture(texture.raw);
        }
        self.by_path.clear();
    }
}

impl Default for TextureStore {
    fn default() -> Self {
        Self::new()
    }
}
