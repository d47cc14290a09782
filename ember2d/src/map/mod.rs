//! Binary map files.
//!
//! A map is stored as a sequence of sections, each referencing earlier ones
//! by position:
//!
//! ```text
//! string  map name, author, version, description   (NUL-terminated UTF-8)
//! f32     gravity
//! u64     texture count,  then per texture:  string path
//! u64     parallax count, then per layer:    u64 texture index, u64 distance
//! u64     object count,   then per object:   u64 texture index, f32 x, f32 y
//! u64     physics count,  then per entry:    u64 object index, f32 mass
//! i64     player physics index (-1 = no player)
//! f32     player speed
//! f32     player jump force
//! ```
//!
//! Every number is little-endian. The texture section defines the index space
//! for parallax layers and objects, the object section the one for physics
//! objects, and the physics section the one for the player.
//!
//! Loading goes bytes → [`MapData`] → validated → staged [`World`](crate::world::World), and only
//! replaces the live world once everything succeeded. Saving resolves every
//! reference into a [`MapData`] before the first byte is written.

mod decode;
mod encode;
mod wire;

use std::collections::HashSet;

use crate::error::MapError;

pub use decode::decode_map;
pub use encode::encode_map;

/// Player index meaning "this map has no player".
pub const NO_PLAYER: i64 = -1;

/// Informational header of a map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapInfo {
    pub name: String,
    pub author: String,
    pub version: String,
    pub description: String,
}

impl Default for MapInfo {
    fn default() -> Self {
        Self {
            name: "Untitled Map".into(),
            author: "Unknown".into(),
            version: "1.0".into(),
            description: String::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParallaxRecord {
    pub texture: u64,
    pub distance: u64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObjectRecord {
    pub texture: u64,
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhysicsRecord {
    pub object: u64,
    pub mass: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerRecord {
    /// Index into the physics section, or [`NO_PLAYER`].
    pub physics_object: i64,
    pub speed: f32,
    pub jump_force: f32,
}

impl Default for PlayerRecord {
    fn default() -> Self {
        Self {
            physics_object: NO_PLAYER,
            speed: 0.0,
            jump_force: 0.0,
        }
    }
}

/// Index-based, in-memory form of a map file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapData {
    pub info: MapInfo,
    pub gravity: f32,
    pub textures: Vec<String>,
    pub parallax: Vec<ParallaxRecord>,
    pub objects: Vec<ObjectRecord>,
    pub physics_objects: Vec<PhysicsRecord>,
    pub player: PlayerRecord,
}

impl MapData {
    /// Check every record only references entries of earlier sections.
    pub fn validate(&self) -> Result<(), MapError> {
        let textures = self.textures.len();
        for (entry, layer) in self.parallax.iter().enumerate() {
            check_index("parallax", entry, "texture", layer.texture, textures)?;
        }
        for (entry, object) in self.objects.iter().enumerate() {
            check_index("object", entry, "texture", object.texture, textures)?;
        }

        let mut with_physics = HashSet::new();
        for (entry, physics) in self.physics_objects.iter().enumerate() {
            check_index("physics object", entry, "object", physics.object, self.objects.len())?;
            if !with_physics.insert(physics.object) {
                return Err(MapError::DuplicatePhysicsObject {
                    entry,
                    object: physics.object,
                });
            }
        }

        let player = self.player.physics_object;
        let available = self.physics_objects.len();
        if player != NO_PLAYER && !(0..available as i64).contains(&player) {
            return Err(MapError::InvalidPlayerIndex {
                index: player,
                available,
            });
        }
        Ok(())
    }
}

fn check_index(
    section: &'static str,
    entry: usize,
    target: &'static str,
    index: u64,
    available: usize,
) -> Result<(), MapError> {
    if index >= available as u64 {
        return Err(MapError::IndexOutOfRange {
            section,
            entry,
            target,
            index,
            available,
        });
    }
    Ok(())
}
