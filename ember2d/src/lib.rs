//! Ember2D - a small 2D engine core.
//!
//! The engine owns textures, textured objects, physics-object records,
//! parallax layers and a player, and stores levels in a compact binary map
//! format. Drawing and windowing are left to whatever implements
//! [`TextureBackend`].

pub mod arena;
pub mod assets;
pub mod backend;
pub mod engine;
pub mod entities;
pub mod error;
pub mod hud;
pub mod map;
pub mod math;
pub mod world;

pub use crate::arena::{Arena, Id};
pub use crate::assets::TextureStore;
pub use crate::backend::{Color, HeadlessBackend, ImageBackend, LoadedTexture, RawTexture, TextureBackend};
pub use crate::engine::{Engine, EngineConfig};
pub use crate::entities::{
    Attributes, Direction, Movement, Object, ObjectId, Parallax, ParallaxId, PhysicsObject,
    PhysicsObjectId, Player, Texture, TextureId,
};
pub use crate::error::{ErrorKind, MapError};
pub use crate::hud::{Hud, HudText, TextId};
pub use crate::map::{decode_map, encode_map, MapData, MapInfo};
pub use crate::math::{Rect, Vec2, Viewport};
pub use crate::world::World;
