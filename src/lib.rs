// Core module with coordinates, blocks, chunks and the block registry
pub mod core;

// Map window, generators, background saving and the frame context
pub mod world;

// Draw-list building
pub mod render;

// Other modules
pub mod camera;
pub mod constants;
pub mod entity;
pub mod input;
pub mod lighting;
pub mod save;
pub mod utils;

// Re-exports
pub use crate::camera::Camera;
pub use crate::constants::*;
pub use crate::core::{Block, BlockRegistry, Chunk, ChunkPos, Coordinate, Face, RelCoord, Side};
pub use crate::entity::{Entity, EntityId};
pub use crate::input::InputIntents;
pub use crate::lighting::{LightEngine, LightFalloff, LightSample, SubtractiveFalloff};
pub use crate::render::{DrawEntry, RenderOrder};
pub use crate::save::{ChunkStore, FileStore, MemoryStore, NullStore, StoreError};
pub use crate::utils::settings::{ConfigError, EngineSettings};
pub use crate::world::{BackgroundStore, ChunkGenerator, Direction, FrameReport, Map, WorldCommand, WorldContext};
