use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::entities::TextureId;
use crate::error::MapError;
use crate::world::World;

use super::wire::{check_cstring, write_count, write_cstring, write_f32, write_i64, write_u64};
use super::{MapData, ObjectRecord, ParallaxRecord, PhysicsRecord, PlayerRecord, NO_PLAYER};

impl MapData {
    /// Snapshot a world into index-based records.
    ///
    /// Reverse lookups are built once per category. Any reference that cannot
    /// be expressed in the file (a texture without a source path, a link to
    /// an entity that no longer exists) fails the whole snapshot.
    pub fn from_world(world: &World) -> Result<MapData, MapError> {
        let info = world.info().clone();
        check_cstring(&info.name, "map name")?;
        check_cstring(&info.author, "map author")?;
        check_cstring(&info.version, "map version")?;
        check_cstring(&info.description, "map description")?;

        // Only textures loaded from a file have a place in the index space.
        let mut texture_index: HashMap<TextureId, u64> = HashMap::new();
        let mut textures = Vec::new();
        for (id, texture) in world.textures().iter() {
            if let Some(path) = &texture.path {
                check_cstring(path, "texture path")?;
                texture_index.insert(id, textures.len() as u64);
                textures.push(path.clone());
            }
        }

        let mut parallax = Vec::with_capacity(world.parallax_layers().len());
        for (entry, (_, layer)) in world.parallax_layers().iter().enumerate() {
            let texture = *texture_index
                .get(&layer.texture)
                .ok_or(unresolved("parallax", entry, "texture"))?;
            parallax.push(ParallaxRecord {
                texture,
                distance: layer.distance,
            });
        }

        let mut objects = Vec::with_capacity(world.objects().len());
        for (entry, (id, object)) in world.objects().iter().enumerate() {
            let Some(&texture) = texture_index.get(&object.texture) else {
                log::error!("Couldn't find a saveable texture for object {:?}", id);
                return Err(unresolved("object", entry, "texture"));
            };
            objects.push(ObjectRecord {
                texture,
                x: object.position.x,
                y: object.position.y,
            });
        }

        let object_index = world.objects().position_map();
        let mut physics_objects = Vec::with_capacity(world.physics_objects().len());
        for (entry, (_, physics)) in world.physics_objects().iter().enumerate() {
            let object = *object_index
                .get(&physics.object)
                .ok_or(unresolved("physics object", entry, "object"))?;
            physics_objects.push(PhysicsRecord {
                object: object as u64,
                mass: physics.mass,
            });
        }

        let player = world.player();
        let physics_object = match player.physics_object {
            None => NO_PLAYER,
            Some(id) => {
                let position = world.physics_objects().position_map().get(&id).copied();
                match position {
                    Some(position) => position as i64,
                    None => {
                        log::error!("Failed to find player physics object {:?}", id);
                        return Err(unresolved("player", 0, "physics object"));
                    }
                }
            }
        };

        Ok(MapData {
            info,
            gravity: world.gravity(),
            textures,
            parallax,
            objects,
            physics_objects,
            player: PlayerRecord {
                physics_object,
                speed: player.speed,
                jump_force: player.jump_force,
            },
        })
    }
}

fn unresolved(section: &'static str, entry: usize, target: &'static str) -> MapError {
    MapError::UnresolvedReference {
        section,
        entry,
        target,
    }
}

/// Write records in map file layout.
pub fn encode_map<W: Write>(data: &MapData, writer: &mut W) -> Result<(), MapError> {
    write_cstring(writer, &data.info.name, "map name")?;
    write_cstring(writer, &data.info.author, "map author")?;
    write_cstring(writer, &data.info.version, "map version")?;
    write_cstring(writer, &data.info.description, "map description")?;
    write_f32(writer, data.gravity)?;

    write_count(writer, data.textures.len())?;
    for path in &data.textures {
        write_cstring(writer, path, "texture path")?;
    }

    write_count(writer, data.parallax.len())?;
    for layer in &data.parallax {
        write_u64(writer, layer.texture)?;
        write_u64(writer, layer.distance)?;
    }

    write_count(writer, data.objects.len())?;
    for object in &data.objects {
        write_u64(writer, object.texture)?;
        write_f32(writer, object.x)?;
        write_f32(writer, object.y)?;
    }

    write_count(writer, data.physics_objects.len())?;
    for physics in &data.physics_objects {
        write_u64(writer, physics.object)?;
        write_f32(writer, physics.mass)?;
    }

    // The player tail is written even without a player so the layout
    // never depends on content.
    write_i64(writer, data.player.physics_object)?;
    write_f32(writer, data.player.speed)?;
    write_f32(writer, data.player.jump_force)?;
    Ok(())
}

impl World {
    /// Write this world as a map.
    pub fn save_map_to<W: Write>(&self, writer: &mut W) -> Result<(), MapError> {
        let data = MapData::from_world(self)?;
        encode_map(&data, writer)
    }

    /// Write this world to the map file at `path`.
    ///
    /// References are resolved before anything touches the disk, and the
    /// bytes go to a temporary file that only replaces `path` once it is
    /// complete. A failed save leaves an existing file untouched.
    pub fn save_map(&self, path: impl AsRef<Path>) -> Result<(), MapError> {
        let path = path.as_ref();
        let data = MapData::from_world(self)?;
        write_replacing(path, |writer| encode_map(&data, writer)).map_err(|e| {
            log::error!("Failed to save map ({}): {}", path.display(), e);
            e
        })?;

        log::info!("Saved map to {}", path.display());
        Ok(())
    }
}

/// Run `write` against a temporary file next to `path`, then move it over
/// `path`. On error the temporary file is removed and `path` is not touched.
fn write_replacing<F>(path: &Path, write: F) -> Result<(), MapError>
where
    F: FnOnce(&mut BufWriter<&mut File>) -> Result<(), MapError>,
{
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;

    let mut writer = BufWriter::new(temp.as_file_mut());
    write(&mut writer)?;
    writer.flush()?;
    drop(writer);

    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| MapError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{HeadlessBackend, TextureBackend};
    use crate::error::ErrorKind;
    use crate::map::decode_map;
    use crate::math::Vec2;
    use std::io::Cursor;

    #[test]
    fn empty_world_layout() {
        let world = World::new();
        let mut bytes = Vec::new();
        world.save_map_to(&mut bytes).unwrap();

        let header = b"Untitled Map\0Unknown\01.0\0\0";
        assert_eq!(&bytes[..header.len()], header);
        let rest = &bytes[header.len()..];
        // gravity + four zero counts + player tail
        assert_eq!(rest.len(), 4 + 4 * 8 + 8 + 4 + 4);
        assert_eq!(&rest[4 + 32..4 + 40], &NO_PLAYER.to_le_bytes());
    }

    #[test]
    fn indices_skip_removed_entities() {
        let mut backend = HeadlessBackend::new();
        let mut world = World::new();
        let a = world.load_texture(&mut backend, "a.png").unwrap();
        let b = world.load_texture(&mut backend, "b.png").unwrap();
        let first = world.create_object(a, Vec2::new(1.0, 1.0)).unwrap();
        let second = world.create_object(b, Vec2::new(2.0, 2.0)).unwrap();
        world.create_object(b, Vec2::new(3.0, 3.0)).unwrap();
        let phys = world.make_physics_object(second, 4.0).unwrap();
        world.set_player(Some(phys)).unwrap();

        world.remove_object(first);
        world.unload_texture(&mut backend, a).unwrap();

        let data = MapData::from_world(&world).unwrap();
        assert_eq!(data.textures, vec!["b.png"]);
        assert_eq!(data.objects[0], ObjectRecord { texture: 0, x: 2.0, y: 2.0 });
        assert_eq!(data.physics_objects, vec![PhysicsRecord { object: 0, mass: 4.0 }]);
        assert_eq!(data.player.physics_object, 0);
        data.validate().unwrap();
    }

    #[test]
    fn generated_texture_cannot_be_saved() {
        let mut backend = HeadlessBackend::new();
        let mut world = World::new();
        let loaded = backend.create_text_texture("ui", "score", [255; 4]).unwrap();
        let generated = world.adopt_texture(loaded);
        world.create_object(generated, Vec2::ZERO).unwrap();

        let mut bytes = Vec::new();
        let err = world.save_map_to(&mut bytes).unwrap_err();
        assert!(matches!(
            err,
            MapError::UnresolvedReference { section: "object", entry: 0, target: "texture" }
        ));
        assert_eq!(err.kind(), ErrorKind::Reference);
        assert!(bytes.is_empty());
    }

    #[test]
    fn dangling_player_is_rejected() {
        let mut world = World::new();
        world.player_mut().physics_object = Some(crate::arena::Id::from_index(5));
        let err = MapData::from_world(&world).unwrap_err();
        assert!(matches!(err, MapError::UnresolvedReference { section: "player", .. }));
    }

    #[test]
    fn header_comes_from_world_info() {
        let mut world = World::new();
        world.set_info(crate::map::MapInfo {
            name: "Dunes".into(),
            author: "Kit".into(),
            version: "0.3".into(),
            description: "Hot".into(),
        });
        let mut bytes = Vec::new();
        world.save_map_to(&mut bytes).unwrap();
        let data = decode_map(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(data.info, *world.info());
    }

    #[test]
    fn interrupted_write_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.map");
        std::fs::write(&path, b"previous map").unwrap();

        let err = write_replacing(&path, |writer| {
            writer.write_all(b"half a ma")?;
            Err(MapError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")))
        })
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(std::fs::read(&path).unwrap(), b"previous map");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn save_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.map");
        std::fs::write(&path, b"stale").unwrap();

        let world = World::new();
        world.save_map(&path).unwrap();
        let mut expected = Vec::new();
        world.save_map_to(&mut expected).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), expected);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn nul_in_header_is_a_format_error() {
        let mut world = World::new();
        let mut info = world.info().clone();
        info.author = "bad\0name".into();
        world.set_info(info);
        let err = MapData::from_world(&world).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }
}
