use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::backend::{Color, TextureBackend};
use crate::error::MapError;
use crate::hud::{Hud, TextId};
use crate::math::{Vec2, Viewport};
use crate::world::World;

/// Configuration values for the engine window and runtime behavior.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
    /// Target frames per second for the game loop driving the engine.
    pub fps: u32,
    /// Font used by [`Engine::create_text`].
    pub default_font: String,
    /// How far the camera may scroll right, in pixels.
    pub max_scroll_x: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "Ember2D Game".into(),
            width: 1280,
            height: 720,
            vsync: true,
            fps: 60,
            default_font: "default".into(),
            max_scroll_x: 0.0,
        }
    }
}

impl EngineConfig {
    /// Parse settings from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("invalid settings in {}", path.display()))
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.width, self.height)
    }
}

/// Owns the texture backend, the current world and the HUD.
///
/// Every texture created through the engine is destroyed exactly once, either
/// when its owner removes it or in [`Engine::shutdown`], which also runs on
/// drop.
pub struct Engine<B: TextureBackend> {
    config: EngineConfig,
    backend: B,
    world: World,
    hud: Hud,
    running: bool,
}

impl<B: TextureBackend> Engine<B> {
    /// Create a new engine with default configuration.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, EngineConfig::default())
    }

    pub fn with_config(backend: B, config: EngineConfig) -> Self {
        let mut world = World::new();
        world.set_max_scroll_x(config.max_scroll_x);
        Self {
            config,
            backend,
            world,
            hud: Hud::new(),
            running: true,
        }
    }

    /// Override the window title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.config.title = title.into();
        self
    }

    /// Override the viewport size in pixels.
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.config.width = width;
        self.config.height = height;
        self
    }

    /// Enable or disable vertical sync.
    #[must_use]
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.config.vsync = vsync;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn hud(&self) -> &Hud {
        &self.hud
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// World and backend together, for loading textures into the world.
    pub fn world_and_backend(&mut self) -> (&mut World, &mut B) {
        (&mut self.world, &mut self.backend)
    }

    /// Replace the current world with the map at `path`.
    pub fn load_map(&mut self, path: impl AsRef<Path>) -> Result<(), MapError> {
        self.world.load_map(&mut self.backend, path)
    }

    pub fn load_map_from<R: Read>(&mut self, reader: &mut R) -> Result<(), MapError> {
        self.world.load_map_from(&mut self.backend, reader)
    }

    /// Save the current world to `path`.
    pub fn save_map(&self, path: impl AsRef<Path>) -> Result<(), MapError> {
        self.world.save_map(path)
    }

    pub fn save_map_to<W: Write>(&self, writer: &mut W) -> Result<(), MapError> {
        self.world.save_map_to(writer)
    }

    /// Add a HUD text using the configured default font.
    pub fn create_text(&mut self, text: &str, color: Color, position: Vec2) -> Result<TextId> {
        self.hud
            .create_text(&mut self.backend, &self.config.default_font, text, color, position)
    }

    pub fn remove_text(&mut self, id: TextId) -> bool {
        self.hud.remove_text(&mut self.backend, id)
    }

    /// Keep the player's object in view.
    pub fn scroll_to_player(&mut self) -> Result<()> {
        let object = self
            .world
            .player_object()
            .context("the world has no player to follow")?;
        self.world.scroll_to_object(object, self.config.viewport())
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Release every texture held by the HUD and the world.
    ///
    /// Calling this more than once is harmless.
    pub fn shutdown(&mut self) {
        if !self.running {
            return;
        }
        self.hud.clear(&mut self.backend);
        self.world.release(&mut self.backend);
        self.running = false;
        log::info!("Engine shut down");
    }
}

impl<B: TextureBackend> Drop for Engine<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
