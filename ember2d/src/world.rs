use anyhow::{anyhow, bail, Result};

use crate::arena::Arena;
use crate::assets::TextureStore;
use crate::backend::{LoadedTexture, TextureBackend};
use crate::entities::{
    Attributes, Object, ObjectId, Parallax, ParallaxId, PhysicsObject, PhysicsObjectId, Player,
    TextureId,
};
use crate::map::MapInfo;
use crate::math::{Vec2, Viewport};

/// Gravity used by a world that has not loaded a map yet.
pub const DEFAULT_GRAVITY: f32 = 9.81;

/// Everything that makes up a level: textures, objects, physics objects,
/// parallax layers, the player, and world-wide settings.
///
/// The world owns every entity. Links between entities are ids, and every
/// mutator keeps them consistent:
/// - objects and parallax layers only reference live textures
/// - a physics object references a live object, at most one per object
/// - the player references a live physics object or nothing
pub struct World {
    textures: TextureStore,
    objects: Arena<Object>,
    physics_objects: Arena<PhysicsObject>,
    parallax: Arena<Parallax>,
    player: Player,
    gravity: f32,
    scroll: Vec2,
    max_scroll_x: f32,
    info: MapInfo,
}

impl World {
    /// Create a new, empty world.
    pub fn new() -> Self {
        Self {
            textures: TextureStore::new(),
            objects: Arena::new(),
            physics_objects: Arena::new(),
            parallax: Arena::new(),
            player: Player::new(),
            gravity: DEFAULT_GRAVITY,
            scroll: Vec2::ZERO,
            max_scroll_x: 0.0,
            info: MapInfo::default(),
        }
    }

    // --- textures ---

    pub fn textures(&self) -> &TextureStore {
        &self.textures
    }

    /// Load (or reuse) the texture at `path`.
    pub fn load_texture(&mut self, backend: &mut dyn TextureBackend, path: &str) -> Result<TextureId> {
        self.textures.load(backend, path)
    }

    /// Take ownership of a texture the backend generated without a file.
    ///
    /// Such textures can be drawn but not saved in a map.
    pub fn adopt_texture(&mut self, loaded: LoadedTexture) -> TextureId {
        self.textures.insert_generated(loaded)
    }

    /// Destroy a texture nothing references any more.
    pub fn unload_texture(&mut self, backend: &mut dyn TextureBackend, id: TextureId) -> Result<()> {
        if !self.textures.contains(id) {
            bail!("texture {:?} does not exist", id);
        }
        if let Some((object, _)) = self.objects.iter().find(|(_, o)| o.texture == id) {
            bail!("texture {:?} is still used by object {:?}", id, object);
        }
        if let Some((layer, _)) = self.parallax.iter().find(|(_, p)| p.texture == id) {
            bail!("texture {:?} is still used by parallax layer {:?}", id, layer);
        }
        self.textures.unload(backend, id);
        Ok(())
    }

    // --- objects ---

    pub fn objects(&self) -> &Arena<Object> {
        &self.objects
    }

    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(id)
    }

    /// Place a new object using an already loaded texture.
    pub fn create_object(&mut self, texture: TextureId, position: Vec2) -> Result<ObjectId> {
        let tex = self
            .textures
            .get(texture)
            .ok_or_else(|| anyhow!("texture {:?} does not exist", texture))?;
        let object = Object::new(texture, position, tex.width, tex.height);
        Ok(self.objects.insert(object))
    }

    /// Place an object that keeps its screen x while the camera scrolls,
    /// such as a backdrop piece anchored to the horizon.
    pub fn create_parallax_object(&mut self, texture: TextureId, position: Vec2) -> Result<ObjectId> {
        let id = self.create_object(texture, position)?;
        if let Some(object) = self.objects.get_mut(id) {
            object.attributes.insert(Attributes::PARALLAX);
        }
        Ok(id)
    }

    /// Remove an object along with any physics object attached to it.
    ///
    /// The object's texture stays loaded; other objects may share it.
    pub fn remove_object(&mut self, id: ObjectId) -> bool {
        if self.objects.remove(id).is_none() {
            return false;
        }

        let attached: Vec<PhysicsObjectId> = self
            .physics_objects
            .iter()
            .filter(|(_, p)| p.object == id)
            .map(|(pid, _)| pid)
            .collect();
        for pid in attached {
            self.physics_objects.remove(pid);
            if self.player.physics_object == Some(pid) {
                log::warn!("Removed the player's object; the world has no player now");
                self.player.physics_object = None;
            }
        }
        true
    }

    // --- physics objects ---

    pub fn physics_objects(&self) -> &Arena<PhysicsObject> {
        &self.physics_objects
    }

    pub fn physics_object(&self, id: PhysicsObjectId) -> Option<&PhysicsObject> {
        self.physics_objects.get(id)
    }

    pub fn physics_object_mut(&mut self, id: PhysicsObjectId) -> Option<&mut PhysicsObject> {
        self.physics_objects.get_mut(id)
    }

    /// Give an existing object physics.
    pub fn make_physics_object(&mut self, object: ObjectId, mass: f32) -> Result<PhysicsObjectId> {
        let obj = self
            .objects
            .get_mut(object)
            .ok_or_else(|| anyhow!("object {:?} does not exist", object))?;
        if obj.has(Attributes::PHYSICS) {
            bail!("object {:?} already has a physics object", object);
        }
        obj.attributes.insert(Attributes::PHYSICS);
        Ok(self.physics_objects.insert(PhysicsObject { object, mass }))
    }

    /// Strip physics from an object. The object itself stays.
    pub fn remove_physics_object(&mut self, id: PhysicsObjectId) -> bool {
        let Some(physics) = self.physics_objects.remove(id) else {
            return false;
        };
        if let Some(object) = self.objects.get_mut(physics.object) {
            object.attributes.remove(Attributes::PHYSICS | Attributes::PLAYER);
        }
        if self.player.physics_object == Some(id) {
            self.player.physics_object = None;
        }
        true
    }

    // --- parallax ---

    pub fn parallax_layers(&self) -> &Arena<Parallax> {
        &self.parallax
    }

    pub fn create_parallax(&mut self, texture: TextureId, distance: u64) -> Result<ParallaxId> {
        if !self.textures.contains(texture) {
            bail!("texture {:?} does not exist", texture);
        }
        Ok(self.parallax.insert(Parallax { texture, distance }))
    }

    pub fn remove_parallax(&mut self, id: ParallaxId) -> bool {
        self.parallax.remove(id).is_some()
    }

    // --- player ---

    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Mutable access for movement intents and tuning values.
    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    /// Hand control of a physics object to the player, or remove the player.
    pub fn set_player(&mut self, physics_object: Option<PhysicsObjectId>) -> Result<()> {
        let new_object = match physics_object {
            Some(pid) => Some(
                self.physics_objects
                    .get(pid)
                    .ok_or_else(|| anyhow!("physics object {:?} does not exist", pid))?
                    .object,
            ),
            None => None,
        };

        if let Some(old) = self.player_object() {
            if let Some(object) = self.objects.get_mut(old) {
                object.attributes.remove(Attributes::PLAYER);
            }
        }
        if let Some(object) = new_object.and_then(|id| self.objects.get_mut(id)) {
            object.attributes.insert(Attributes::PLAYER);
        }
        self.player.physics_object = physics_object;
        Ok(())
    }

    /// Object controlled by the player, if any.
    pub fn player_object(&self) -> Option<ObjectId> {
        self.player
            .physics_object
            .and_then(|pid| self.physics_objects.get(pid))
            .map(|p| p.object)
    }

    // --- world settings ---

    pub fn gravity(&self) -> f32 {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: f32) {
        self.gravity = gravity;
    }

    /// Header of the map this world was loaded from (or will be saved with).
    pub fn info(&self) -> &MapInfo {
        &self.info
    }

    pub fn set_info(&mut self, info: MapInfo) {
        self.info = info;
    }

    pub fn scroll(&self) -> Vec2 {
        self.scroll
    }

    pub fn max_scroll_x(&self) -> f32 {
        self.max_scroll_x
    }

    pub fn set_max_scroll_x(&mut self, max_scroll_x: f32) {
        self.max_scroll_x = max_scroll_x;
    }

    // --- camera ---

    /// Re-derive screen rects of world objects from position and scroll.
    ///
    /// World y grows upwards, screen y grows downwards. UI and player objects
    /// are positioned elsewhere; parallax objects only follow vertically.
    pub fn refresh_screen_rects(&mut self, viewport: Viewport) {
        let scroll = self.scroll;
        for (_, object) in self.objects.iter_mut() {
            if object.has(Attributes::UI) || object.has(Attributes::PLAYER) {
                continue;
            }
            if !object.has(Attributes::PARALLAX) {
                object.rect.x = (object.position.x - scroll.x) as i32;
            }
            object.rect.y = (-object.position.y + viewport.height as f32 - scroll.y) as i32;
        }
    }

    /// Scroll the camera so `id` stays in view.
    ///
    /// Horizontally the object is kept centred while the scroll has room to
    /// move; vertically it is kept between 25% and 75% of the half height.
    pub fn scroll_to_object(&mut self, id: ObjectId, viewport: Viewport) -> Result<()> {
        let object = self
            .objects
            .get_mut(id)
            .ok_or_else(|| anyhow!("object {:?} does not exist", id))?;

        let rect = object.rect;
        let mid = rect.center();
        let half_w = viewport.width as f32 / 2.0;
        let half_h = viewport.height as f32 / 2.0;
        let (obj_half_w, obj_half_h) = (rect.w as f32 / 2.0, rect.h as f32 / 2.0);

        if mid.x < half_w && self.scroll.x != 0.0 {
            self.scroll.x -= half_w - mid.x;
            object.rect.x = (half_w - obj_half_w) as i32;
        } else if mid.x > half_w && self.scroll.x != self.max_scroll_x {
            self.scroll.x += mid.x - half_w;
            object.rect.x = (half_w - obj_half_w) as i32;
        }

        let upper = half_h * 0.75;
        let lower = half_h * 0.25;
        if mid.y > upper {
            self.scroll.y -= mid.y - upper;
            object.rect.y = (upper - obj_half_h) as i32;
        } else if mid.y < lower && self.scroll.y <= 0.0 {
            self.scroll.y += lower - mid.y;
            object.rect.y = (lower - obj_half_h) as i32;
        }

        if self.scroll.x < 0.0 {
            self.scroll.x = 0.0;
        } else if self.scroll.x > self.max_scroll_x {
            self.scroll.x = self.max_scroll_x;
        }
        if self.scroll.y < 0.0 {
            self.scroll.y = 0.0;
        }

        self.refresh_screen_rects(viewport);
        Ok(())
    }

    // --- lifecycle ---

    /// Drop every entity and destroy every texture exactly once.
    pub fn release(&mut self, backend: &mut dyn TextureBackend) {
        self.objects.clear();
        self.physics_objects.clear();
        self.parallax.clear();
        self.player.physics_object = None;
        self.textures.clear(backend);
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
