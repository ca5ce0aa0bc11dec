//! Core data structures of the voxel grid
//! Contains coordinates, blocks, the block registry and chunks.

pub mod block;
pub mod chunk;
pub mod coord;
pub mod registry;

// Re-export commonly used types
pub use block::{Block, Face, SavedBlock};
pub use chunk::{Chunk, SavedChunk};
pub use coord::{ChunkPos, Coordinate, RelCoord, Side};
pub use registry::{Animation, BlockDescriptor, BlockRegistry, RegistryError};
