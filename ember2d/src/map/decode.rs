use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::backend::TextureBackend;
use crate::entities::{ObjectId, PhysicsObjectId, TextureId};
use crate::error::MapError;
use crate::math::Vec2;
use crate::world::World;

use super::wire::{capacity_for, read_count, read_cstring, read_f32, read_i64, read_u64};
use super::{MapData, MapInfo, ObjectRecord, ParallaxRecord, PhysicsRecord, PlayerRecord};

/// Parse a whole map stream into records.
///
/// Only the byte layout is checked here; see [`MapData::validate`] for
/// cross-references.
pub fn decode_map<R: Read>(reader: &mut R) -> Result<MapData, MapError> {
    let info = MapInfo {
        name: read_cstring(reader, "map name")?,
        author: read_cstring(reader, "map author")?,
        version: read_cstring(reader, "map version")?,
        description: read_cstring(reader, "map description")?,
    };
    let gravity = read_f32(reader, "gravity")?;

    let count = read_count(reader, "texture count")?;
    let mut textures = Vec::with_capacity(capacity_for(count));
    for _ in 0..count {
        textures.push(read_cstring(reader, "texture path")?);
    }

    let count = read_count(reader, "parallax count")?;
    let mut parallax = Vec::with_capacity(capacity_for(count));
    for _ in 0..count {
        parallax.push(ParallaxRecord {
            texture: read_u64(reader, "parallax texture index")?,
            distance: read_u64(reader, "parallax distance")?,
        });
    }

    let count = read_count(reader, "object count")?;
    let mut objects = Vec::with_capacity(capacity_for(count));
    for _ in 0..count {
        objects.push(ObjectRecord {
            texture: read_u64(reader, "object texture index")?,
            x: read_f32(reader, "object x")?,
            y: read_f32(reader, "object y")?,
        });
    }

    let count = read_count(reader, "physics object count")?;
    let mut physics_objects = Vec::with_capacity(capacity_for(count));
    for _ in 0..count {
        physics_objects.push(PhysicsRecord {
            object: read_u64(reader, "physics object index")?,
            mass: read_f32(reader, "physics object mass")?,
        });
    }

    let player = PlayerRecord {
        physics_object: read_i64(reader, "player index")?,
        speed: read_f32(reader, "player speed")?,
        jump_force: read_f32(reader, "player jump force")?,
    };

    Ok(MapData {
        info,
        gravity,
        textures,
        parallax,
        objects,
        physics_objects,
        player,
    })
}

impl MapData {
    /// Build a brand-new world from these records.
    ///
    /// Nothing is created through the backend unless the records validate.
    /// If a texture fails to load, every texture created so far is destroyed
    /// again before the error is returned.
    pub fn instantiate(&self, backend: &mut dyn TextureBackend) -> Result<World, MapError> {
        self.validate()?;

        let mut world = World::new();
        world.set_info(self.info.clone());
        world.set_gravity(self.gravity);

        match self.populate(&mut world, backend) {
            Ok(()) => Ok(world),
            Err(e) => {
                world.release(backend);
                Err(e)
            }
        }
    }

    fn populate(&self, world: &mut World, backend: &mut dyn TextureBackend) -> Result<(), MapError> {
        log::info!("Loading {} textures", self.textures.len());
        let mut textures: Vec<TextureId> = Vec::with_capacity(self.textures.len());
        for path in &self.textures {
            let id = world
                .load_texture(backend, path)
                .map_err(|e| MapError::Texture {
                    path: path.clone(),
                    source: e.into(),
                })?;
            textures.push(id);
        }

        log::info!("Loading {} parallax layers", self.parallax.len());
        for (entry, layer) in self.parallax.iter().enumerate() {
            let texture = lookup(&textures, layer.texture, "parallax", entry, "texture")?;
            world
                .create_parallax(texture, layer.distance)
                .map_err(|_| unresolved("parallax", entry, "texture"))?;
        }

        log::info!("Loading {} objects", self.objects.len());
        let mut objects: Vec<ObjectId> = Vec::with_capacity(self.objects.len());
        for (entry, record) in self.objects.iter().enumerate() {
            let texture = lookup(&textures, record.texture, "object", entry, "texture")?;
            let id = world
                .create_object(texture, Vec2::new(record.x, record.y))
                .map_err(|_| unresolved("object", entry, "texture"))?;
            log::debug!(
                "Loaded object `{}` at ({}, {})",
                self.textures[record.texture as usize],
                record.x,
                record.y
            );
            objects.push(id);
        }

        log::info!("Loading {} physics objects", self.physics_objects.len());
        let mut physics: Vec<PhysicsObjectId> = Vec::with_capacity(self.physics_objects.len());
        for (entry, record) in self.physics_objects.iter().enumerate() {
            let object = lookup(&objects, record.object, "physics object", entry, "object")?;
            let id = world
                .make_physics_object(object, record.mass)
                .map_err(|_| unresolved("physics object", entry, "object"))?;
            physics.push(id);
        }

        let player = world.player_mut();
        player.reset();
        player.speed = self.player.speed;
        player.jump_force = self.player.jump_force;

        match usize::try_from(self.player.physics_object) {
            Ok(index) => {
                let id = lookup(&physics, index as u64, "player", 0, "physics object")?;
                world
                    .set_player(Some(id))
                    .map_err(|_| unresolved("player", 0, "physics object"))?;
                log::info!("Loaded player index {}", index);
            }
            Err(_) => log::info!("Map has no player"),
        }
        Ok(())
    }
}

fn lookup<T: Copy>(
    ids: &[T],
    index: u64,
    section: &'static str,
    entry: usize,
    target: &'static str,
) -> Result<T, MapError> {
    usize::try_from(index)
        .ok()
        .and_then(|i| ids.get(i).copied())
        .ok_or(MapError::IndexOutOfRange {
            section,
            entry,
            target,
            index,
            available: ids.len(),
        })
}

fn unresolved(section: &'static str, entry: usize, target: &'static str) -> MapError {
    MapError::UnresolvedReference {
        section,
        entry,
        target,
    }
}

impl World {
    /// Replace this world with the map read from `reader`.
    ///
    /// Loading is all-or-nothing: on error the world is left exactly as it
    /// was. On success the previous world's textures are destroyed and the
    /// scroll starts from zero again.
    pub fn load_map_from<R: Read>(
        &mut self,
        backend: &mut dyn TextureBackend,
        reader: &mut R,
    ) -> Result<(), MapError> {
        let data = decode_map(reader)?;
        log::info!(
            "Loading into {} by {}\nVersion: {}\n{}",
            data.info.name,
            data.info.author,
            data.info.version,
            data.info.description
        );

        let mut staged = data.instantiate(backend)?;
        staged.set_max_scroll_x(self.max_scroll_x());

        let mut previous = std::mem::replace(self, staged);
        previous.release(backend);

        log::info!("Map {} loaded successfully.", data.info.name);
        Ok(())
    }

    /// Replace this world with the map stored at `path`.
    pub fn load_map(
        &mut self,
        backend: &mut dyn TextureBackend,
        path: impl AsRef<Path>,
    ) -> Result<(), MapError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            log::error!("Failed to open map file ({}): {}", path.display(), e);
            MapError::Io(e)
        })?;
        self.load_map_from(backend, &mut BufReader::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;
    use crate::entities::Attributes;
    use crate::map::NO_PLAYER;
    use std::io::Cursor;

    /// Hand-assembled map: two textures, one parallax layer, three objects
    /// (two sharing a texture), one physics object acting as player.
    fn sample_bytes() -> Vec<u8> {
        let mut b = Vec::new();
        for s in ["Caves", "Ana", "2.1", "Dark and damp"] {
            b.extend_from_slice(s.as_bytes());
            b.push(0);
        }
        b.extend_from_slice(&4.5f32.to_le_bytes());

        b.extend_from_slice(&2u64.to_le_bytes());
        b.extend_from_slice(b"rock.png\0sky.png\0");

        b.extend_from_slice(&1u64.to_le_bytes());
        b.extend_from_slice(&1u64.to_le_bytes());
        b.extend_from_slice(&3u64.to_le_bytes());

        b.extend_from_slice(&3u64.to_le_bytes());
        for (tex, x, y) in [(0u64, 0.0f32, 0.0f32), (0, 32.0, 0.0), (1, 64.0, 16.0)] {
            b.extend_from_slice(&tex.to_le_bytes());
            b.extend_from_slice(&x.to_le_bytes());
            b.extend_from_slice(&y.to_le_bytes());
        }

        b.extend_from_slice(&1u64.to_le_bytes());
        b.extend_from_slice(&2u64.to_le_bytes());
        b.extend_from_slice(&1.5f32.to_le_bytes());

        b.extend_from_slice(&0i64.to_le_bytes());
        b.extend_from_slice(&3.0f32.to_le_bytes());
        b.extend_from_slice(&7.0f32.to_le_bytes());
        b
    }

    #[test]
    fn decodes_every_section() {
        let data = decode_map(&mut Cursor::new(sample_bytes())).unwrap();
        assert_eq!(data.info.name, "Caves");
        assert_eq!(data.info.description, "Dark and damp");
        assert_eq!(data.gravity, 4.5);
        assert_eq!(data.textures, vec!["rock.png", "sky.png"]);
        assert_eq!(data.parallax, vec![ParallaxRecord { texture: 1, distance: 3 }]);
        assert_eq!(data.objects.len(), 3);
        assert_eq!(data.objects[2], ObjectRecord { texture: 1, x: 64.0, y: 16.0 });
        assert_eq!(data.physics_objects, vec![PhysicsRecord { object: 2, mass: 1.5 }]);
        assert_eq!(data.player.physics_object, 0);
        assert_eq!((data.player.speed, data.player.jump_force), (3.0, 7.0));
    }

    #[test]
    fn load_builds_linked_world() {
        let mut backend = HeadlessBackend::new();
        let mut world = World::new();
        world
            .load_map_from(&mut backend, &mut Cursor::new(sample_bytes()))
            .unwrap();

        assert_eq!(world.gravity(), 4.5);
        assert_eq!(world.info().author, "Ana");

        let textures: Vec<TextureId> = world.textures().iter().map(|(id, _)| id).collect();
        assert_eq!(textures.len(), 2);
        assert_eq!(textures[0].index(), 0);
        assert_eq!(textures[1].index(), 1);

        let layer = world.parallax_layers().iter().next().map(|(_, p)| *p).unwrap();
        assert_eq!((layer.texture, layer.distance), (textures[1], 3));

        let objects: Vec<_> = world.objects().iter().map(|(_, o)| o.clone()).collect();
        assert_eq!(objects[0].texture, objects[1].texture);
        assert_eq!(objects[2].texture, textures[1]);

        let player_object = world.player_object().unwrap();
        let hero = world.object(player_object).unwrap();
        assert_eq!(hero.position, Vec2::new(64.0, 16.0));
        assert!(hero.has(Attributes::PLAYER | Attributes::PHYSICS));

        let player = world.player();
        assert_eq!((player.speed, player.jump_force), (3.0, 7.0));
        assert!(player.grounded);
        assert!(!player.movement.any());
        assert_eq!(backend.live_count(), 2);
    }

    #[test]
    fn repeated_path_loads_one_texture() {
        let mut b = Vec::new();
        b.extend_from_slice(b"Twins\0Ana\01.0\0\0");
        b.extend_from_slice(&9.81f32.to_le_bytes());
        b.extend_from_slice(&3u64.to_le_bytes());
        b.extend_from_slice(b"a.png\0a.png\0b.png\0");
        b.extend_from_slice(&1u64.to_le_bytes());
        b.extend_from_slice(&2u64.to_le_bytes());
        b.extend_from_slice(&5u64.to_le_bytes());
        b.extend_from_slice(&2u64.to_le_bytes());
        for (tex, x) in [(1u64, 0.0f32), (2, 32.0)] {
            b.extend_from_slice(&tex.to_le_bytes());
            b.extend_from_slice(&x.to_le_bytes());
            b.extend_from_slice(&0.0f32.to_le_bytes());
        }
        b.extend_from_slice(&0u64.to_le_bytes());
        b.extend_from_slice(&NO_PLAYER.to_le_bytes());
        b.extend_from_slice(&1.0f32.to_le_bytes());
        b.extend_from_slice(&1.0f32.to_le_bytes());

        let mut backend = HeadlessBackend::new();
        let mut world = World::new();
        world.load_map_from(&mut backend, &mut Cursor::new(b)).unwrap();

        let path = |id: TextureId| world.textures().get(id).and_then(|t| t.path.clone()).unwrap();
        let textures: Vec<String> = world.textures().iter().map(|(id, _)| path(id)).collect();
        assert_eq!(textures, vec!["a.png", "b.png"]);
        assert_eq!(backend.created_count(), 2);

        let layers: Vec<(String, u64)> = world
            .parallax_layers()
            .iter()
            .map(|(_, p)| (path(p.texture), p.distance))
            .collect();
        assert_eq!(layers, vec![("b.png".to_string(), 5)]);

        let objects: Vec<String> = world.objects().iter().map(|(_, o)| path(o.texture)).collect();
        assert_eq!(objects, vec!["a.png", "b.png"]);
    }

    #[test]
    fn map_without_player() {
        let mut bytes = sample_bytes();
        let tail = bytes.len() - 16;
        bytes[tail..tail + 8].copy_from_slice(&NO_PLAYER.to_le_bytes());

        let mut backend = HeadlessBackend::new();
        let mut world = World::new();
        world.load_map_from(&mut backend, &mut Cursor::new(bytes)).unwrap();
        assert!(!world.player().exists());
        assert_eq!(world.player().speed, 3.0);
    }

    #[test]
    fn truncated_physics_section() {
        let bytes = sample_bytes();
        // stop two bytes into the last mass field
        let cut = bytes.len() - 16 - 2;
        let err = decode_map(&mut Cursor::new(&bytes[..cut])).unwrap_err();
        assert!(matches!(err, MapError::Truncated("physics object mass")));
    }

    #[test]
    fn texture_failure_releases_staged_textures() {
        let mut backend = HeadlessBackend::new().failing_on("sky.png");
        let mut world = World::new();
        let err = world
            .load_map_from(&mut backend, &mut Cursor::new(sample_bytes()))
            .unwrap_err();

        assert!(matches!(err, MapError::Texture { ref path, .. } if path == "sky.png"));
        assert_eq!(backend.created_count(), 1);
        assert_eq!(backend.live_count(), 0);
        assert!(world.textures().is_empty());
    }

    #[test]
    fn missing_file_is_io_error() {
        let mut backend = HeadlessBackend::new();
        let mut world = World::new();
        let err = world
            .load_map(&mut backend, "/no/such/dir/level.map")
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Io);
    }
}
