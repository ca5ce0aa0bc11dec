//! World state and streaming
//! Contains the map window, chunk generation, background saving and the frame context.

pub mod context;
pub mod generator;
pub mod loader;
pub mod map;

// Re-export commonly used types
pub use context::{FrameReport, WorldCommand, WorldContext};
pub use generator::{ChunkGenerator, GeneratorKind, create_generator};
pub use loader::BackgroundStore;
pub use map::{Direction, Map, WindowBounds};
