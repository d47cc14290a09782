use anyhow::{Context, Result};

use crate::arena::{Arena, Id};
use crate::assets::TextureStore;
use crate::backend::{Color, TextureBackend};
use crate::entities::{Attributes, Object};
use crate::math::Vec2;

pub type TextId = Id<HudText>;

/// Text element drawn in screen-space HUD coordinates (pixels).
#[derive(Clone, Debug, PartialEq)]
pub struct HudText {
    pub text: String,
    pub color: Color,
    /// Textured object marked `TEXT | UI`, positioned in screen pixels.
    pub object: Object,
}

/// Screen-space text drawn on top of the world.
///
/// HUD texts live apart from the [`World`](crate::world::World) and have
/// their own id space: they are never written to a map, a map load never
/// touches them, and a world [`ObjectId`](crate::entities::ObjectId) cannot
/// address one. Each text owns the texture it was rasterized into.
pub struct Hud {
    textures: TextureStore,
    texts: Arena<HudText>,
}

impl Hud {
    /// Create an empty HUD.
    pub fn new() -> Self {
        Self {
            textures: TextureStore::new(),
            texts: Arena::new(),
        }
    }

    /// Rasterize `text` and place it at `position` in screen pixels.
    pub fn create_text(
        &mut self,
        backend: &mut dyn TextureBackend,
        font: &str,
        text: &str,
        color: Color,
        position: Vec2,
    ) -> Result<TextId> {
        let loaded = backend
            .create_text_texture(font, text, color)
            .with_context(|| format!("failed to render text `{text}`"))?;
        let texture = self.textures.insert_generated(loaded);

        let mut object = Object::new(texture, position, loaded.width, loaded.height);
        object.attributes = Attributes::TEXT | Attributes::UI;
        Ok(self.texts.insert(HudText {
            text: text.to_string(),
            color,
            object,
        }))
    }

    /// Remove a text along with its texture.
    ///
    /// Only HUD ids are accepted:
    ///
    /// ```compile_fail
    /// use ember2d::{HeadlessBackend, Hud, Vec2, World};
    ///
    /// let mut backend = HeadlessBackend::new();
    /// let mut world = World::new();
    /// let tex = world.load_texture(&mut backend, "crate.png").unwrap();
    /// let object = world.create_object(tex, Vec2::ZERO).unwrap();
    ///
    /// let mut hud = Hud::new();
    /// hud.remove_text(&mut backend, object);
    /// ```
    pub fn remove_text(&mut self, backend: &mut dyn TextureBackend, id: TextId) -> bool {
        let Some(text) = self.texts.remove(id) else {
            return false;
        };
        self.textures.unload(backend, text.object.texture);
        true
    }

    pub fn text(&self, id: TextId) -> Option<&HudText> {
        self.texts.get(id)
    }

    pub fn texts(&self) -> &Arena<HudText> {
        &self.texts
    }

    pub fn textures(&self) -> &TextureStore {
        &self.textures
    }

    /// Remove every text and destroy its texture.
    pub fn clear(&mut self, backend: &mut dyn TextureBackend) {
        self.texts.clear();
        self.textures.clear(backend);
    }
}

impl Default for Hud {
    fn default() -> Self {
        Self::new()
    }
}
