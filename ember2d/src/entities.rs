//! Entity types making up a world: textures, objects, physics objects,
//! parallax layers, and the player.
//!
//! Cross-entity links are non-owning [`Id`]s into the arenas held by
//! [`World`](crate::world::World); nothing here owns another entity.

use bitflags::bitflags;

use crate::arena::Id;
use crate::backend::RawTexture;
use crate::math::{Rect, Vec2};

pub type TextureId = Id<Texture>;
pub type ObjectId = Id<Object>;
pub type PhysicsObjectId = Id<PhysicsObject>;
pub type ParallaxId = Id<Parallax>;

/// A backend texture plus the metadata the engine needs about it.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    /// Source image path. `None` for generated textures (rendered text).
    pub path: Option<String>,
    pub raw: RawTexture,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Textures with a source path can be written to map files.
    pub fn is_persistent(&self) -> bool {
        self.path.is_some()
    }
}

bitflags! {
    /// Per-object attribute flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Attributes: u32 {
        const TEXT = 1 << 0;
        const UI = 1 << 1;
        /// Scrolls vertically with the world but keeps its screen x.
        const PARALLAX = 1 << 2;
        const PLAYER = 1 << 3;
        const PHYSICS = 1 << 4;
    }
}

/// A textured object placed in the world.
#[derive(Clone, Debug, PartialEq)]
pub struct Object {
    pub position: Vec2,
    pub texture: TextureId,
    pub attributes: Attributes,
    /// Where the object lands on screen. Derived from position and scroll.
    pub rect: Rect,
}

impl Object {
    pub fn new(texture: TextureId, position: Vec2, width: u32, height: u32) -> Self {
        Self {
            position,
            texture,
            attributes: Attributes::empty(),
            rect: Rect::new(position.x as i32, position.y as i32, width as i32, height as i32),
        }
    }

    pub fn has(&self, attributes: Attributes) -> bool {
        self.attributes.contains(attributes)
    }
}

/// Physics data attached to exactly one object.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsObject {
    pub object: ObjectId,
    pub mass: f32,
}

/// Scrolling background layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Parallax {
    pub texture: TextureId,
    /// Scroll divisor: larger values scroll slower. 0 keeps the layer fixed.
    pub distance: u64,
}

impl Parallax {
    /// Horizontal offset of this layer for the given world scroll.
    pub fn offset(&self, scroll: Vec2) -> f32 {
        if self.distance == 0 {
            0.0
        } else {
            -scroll.x / self.distance as f32
        }
    }
}

/// Movement direction the player can intend to go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Currently held movement intents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Movement {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl Movement {
    fn flag_mut(&mut self, direction: Direction) -> &mut bool {
        match direction {
            Direction::Up => &mut self.up,
            Direction::Down => &mut self.down,
            Direction::Left => &mut self.left,
            Direction::Right => &mut self.right,
        }
    }

    pub fn any(&self) -> bool {
        self.up || self.down || self.left || self.right
    }
}

/// The world's single player.
#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    /// Physics object the player controls. `None` means there is no player.
    pub physics_object: Option<PhysicsObjectId>,
    pub speed: f32,
    pub jump_force: f32,
    pub movement: Movement,
    pub grounded: bool,
}

impl Player {
    pub fn new() -> Self {
        Self {
            physics_object: None,
            speed: 1.0,
            jump_force: 1.0,
            movement: Movement::default(),
            grounded: false,
        }
    }

    /// State the player is put in before a map is applied.
    pub fn reset(&mut self) {
        self.physics_object = None;
        self.speed = 0.0;
        self.jump_force = 0.0;
        self.movement = Movement::default();
        self.grounded = true;
    }

    pub fn exists(&self) -> bool {
        self.physics_object.is_some()
    }

    /// Start moving in `direction` (key down).
    pub fn press(&mut self, direction: Direction) {
        *self.movement.flag_mut(direction) = true;
    }

    /// Stop moving in `direction` (key up).
    pub fn release(&mut self, direction: Direction) {
        *self.movement.flag_mut(direction) = false;
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}
