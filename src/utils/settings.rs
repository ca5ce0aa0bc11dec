use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::*;
use crate::world::generator::GeneratorKind;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot access settings file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("cannot encode settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct EngineSettings {
    #[serde(default)]
    pub world: WorldSettings,
    #[serde(default)]
    pub camera: CameraSettings,
    #[serde(default)]
    pub physics: PhysicsSettings,
    #[serde(default)]
    pub lighting: LightingSettings,
    #[serde(default)]
    pub debug: DebugSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct WorldSettings {
    /// Chunks per side of the loaded window, odd.
    pub window_chunks: i32,
    pub generator: GeneratorKind,
    /// Fresh random seed when unset.
    pub seed: Option<u32>,
    /// Chunk files directory; the platform data directory when unset.
    pub save_dir: Option<PathBuf>,
    /// Block table to use instead of the builtin one.
    pub registry: Option<PathBuf>,
    /// Hand chunk saves to a worker thread.
    pub background_saves: bool,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            window_chunks: WINDOW_CHUNKS,
            generator: GeneratorKind::default(),
            seed: None,
            save_dir: None,
            registry: None,
            background_saves: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CameraSettings {
    pub width: i32,
    pub height: i32,
    pub follow_player: bool,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            follow_player: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PhysicsSettings {
    /// Blocks per second squared.
    pub gravity: f32,
    /// Blocks per second.
    pub jump_velocity: f32,
    /// Screen pixels per second.
    pub walk_speed: f32,
    /// Frames at least this long skip physics.
    pub stall_threshold_ms: u32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            jump_velocity: JUMP_VELOCITY,
            walk_speed: WALK_SPEED,
            stall_threshold_ms: STALL_THRESHOLD_MS,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LightingSettings {
    pub ambient: u8,
    /// Subtracted per opaque block above.
    pub top_cost: i32,
    /// Subtracted per transparent, non-air block above.
    pub translucent_cost: i32,
    /// Subtracted per opaque lateral neighbor.
    pub side_cost: i32,
}

impl Default for LightingSettings {
    fn default() -> Self {
        Self {
            ambient: AMBIENT_LIGHT,
            top_cost: 20,
            translucent_cost: 5,
            side_cost: 10,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct DebugSettings {
    /// Log a summary line for every frame instead of every hundredth.
    pub log_every_frame: bool,
    /// Build the draw list every frame even when nothing consumes it.
    pub build_draw_list: bool,
}

impl EngineSettings {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match Self::load(path.as_ref()) {
            Err(ConfigError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No settings at {}, using defaults", path.as_ref().display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let io_error = |source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        fs::write(path, self.to_toml()?).map_err(io_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_sections_use_defaults() {
        let settings = EngineSettings::from_toml("[physics]\ngravity = 20.0\n").unwrap();
        assert_eq!(settings.physics.gravity, 20.0);
        assert_eq!(settings.physics.jump_velocity, JUMP_VELOCITY);
        assert_eq!(settings.world, WorldSettings::default());
        assert_eq!(settings.lighting, LightingSettings::default());
    }

    #[test]
    fn test_generator_kind_names() {
        let settings = EngineSettings::from_toml("[world]\ngenerator = \"noise\"\nseed = 7\n").unwrap();
        assert_eq!(settings.world.generator, GeneratorKind::Noise);
        assert_eq!(settings.world.seed, Some(7));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");

        let mut settings = EngineSettings::default();
        settings.world.window_chunks = 5;
        settings.camera.follow_player = false;
        settings.debug.log_every_frame = true;
        settings.save(&path).unwrap();

        assert_eq!(EngineSettings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = EngineSettings::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings, EngineSettings::default());
    }

    #[test]
    fn test_malformed_file_is_error() {
        assert!(matches!(
            EngineSettings::from_toml("[world]\nwindow_chunks = \"three\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}
