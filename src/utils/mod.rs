pub mod settings;

pub use settings::{
    CameraSettings, ConfigError, DebugSettings, EngineSettings, LightingSettings, PhysicsSettings,
    WorldSettings,
};
