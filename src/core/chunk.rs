use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::core::block::{Block, SavedBlock};
use crate::core::coord::{ChunkPos, RelCoord};
use crate::core::registry::BlockRegistry;

#[derive(Clone, Debug)]
pub struct Chunk {
    pub pos: ChunkPos,
    blocks: Vec<Block>,
    /// Changed by gameplay since it was generated or loaded.
    pub modified: bool,
}

/// On-disk form of a chunk.
#[derive(Serialize, Deserialize)]
pub struct SavedChunk {
    pub cx: i32,
    pub cy: i32,
    pub blocks: Vec<SavedBlock>,
}

impl Chunk {
    pub fn new(pos: ChunkPos) -> Self {
        Chunk {
            pos,
            blocks: vec![Block::air(); BLOCKS_PER_CHUNK],
            modified: false,
        }
    }

    pub fn get_block(&self, rel: RelCoord) -> Block {
        if rel.is_inside() {
            self.blocks[rel.index()]
        } else {
            Block::air()
        }
    }

    pub fn block(&self, rel: RelCoord) -> Option<&Block> {
        rel.is_inside().then(|| &self.blocks[rel.index()])
    }

    pub fn block_mut(&mut self, rel: RelCoord) -> Option<&mut Block> {
        if rel.is_inside() {
            Some(&mut self.blocks[rel.index()])
        } else {
            None
        }
    }

    /// Sets a block during generation; does not mark the chunk modified.
    pub fn set_block(&mut self, rel: RelCoord, block: Block) {
        if let Some(slot) = self.block_mut(rel) {
            *slot = block;
        }
    }

    /// Sets a block on behalf of gameplay.
    pub fn set_block_modified(&mut self, rel: RelCoord, block: Block) -> bool {
        if let Some(slot) = self.block_mut(rel) {
            *slot = block;
            self.modified = true;
            return true;
        }
        false
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut [Block] {
        &mut self.blocks
    }

    pub fn iter(&self) -> impl Iterator<Item = (RelCoord, &Block)> {
        self.blocks
            .iter()
            .enumerate()
            .map(|(i, block)| (RelCoord::from_index(i), block))
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(Block::is_air)
    }

    /// Fills every block of the layers `z_min..z_max`.
    pub fn fill_layers(&mut self, z_min: i32, z_max: i32, block: Block) {
        for z in z_min.max(0)..z_max.min(CHUNK_Z) {
            for y in 0..CHUNK_Y {
                for x in 0..CHUNK_X {
                    self.set_block(RelCoord { x, y, z }, block);
                }
            }
        }
    }

    pub fn to_saved(&self) -> SavedChunk {
        SavedChunk {
            cx: self.pos.x,
            cy: self.pos.y,
            blocks: self.blocks.iter().map(Block::to_saved).collect(),
        }
    }

    /// Rebuilds a chunk; a block list of the wrong size yields `None`.
    pub fn from_saved(registry: &BlockRegistry, saved: SavedChunk) -> Option<Self> {
        if saved.blocks.len() != BLOCKS_PER_CHUNK {
            return None;
        }
        Some(Chunk {
            pos: ChunkPos::new(saved.cx, saved.cy),
            blocks: saved
                .blocks
                .into_iter()
                .map(|b| Block::from_saved(registry, b))
                .collect(),
            modified: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_chunk_is_air() {
        let chunk = Chunk::new(ChunkPos::new(2, -1));
        assert_eq!(chunk.blocks().len(), BLOCKS_PER_CHUNK);
        assert!(chunk.is_empty());
        assert!(!chunk.modified);
    }

    #[test]
    fn test_set_and_get() {
        let registry = BlockRegistry::builtin().unwrap();
        let mut chunk = Chunk::new(ChunkPos::default());
        let rel = RelCoord { x: 3, y: 17, z: 4 };
        chunk.set_block(rel, Block::new(&registry, 3, 0));
        assert_eq!(chunk.get_block(rel).id, 3);
        assert!(!chunk.modified);

        assert!(chunk.set_block_modified(rel, Block::air()));
        assert!(chunk.modified);
        assert!(chunk.get_block(rel).is_air());
    }

    #[test]
    fn test_outside_access_is_air() {
        let chunk = Chunk::new(ChunkPos::default());
        let outside = RelCoord { x: CHUNK_X, y: 0, z: 0 };
        assert!(chunk.get_block(outside).is_air());
        assert!(chunk.block(outside).is_none());
    }

    #[test]
    fn test_saved_roundtrip() {
        let registry = BlockRegistry::builtin().unwrap();
        let mut chunk = Chunk::new(ChunkPos::new(-3, 5));
        chunk.fill_layers(0, 2, Block::new(&registry, 2, 0));
        chunk.set_block(RelCoord { x: 1, y: 1, z: 2 }, Block::new(&registry, 70, 3));

        let restored = Chunk::from_saved(&registry, chunk.to_saved()).unwrap();
        assert_eq!(restored.pos, chunk.pos);
        assert_eq!(restored.blocks(), chunk.blocks());
    }

    #[test]
    fn test_truncated_save_rejected() {
        let registry = BlockRegistry::builtin().unwrap();
        let mut saved = Chunk::new(ChunkPos::default()).to_saved();
        saved.blocks.pop();
        assert!(Chunk::from_saved(&registry, saved).is_none());
    }
}
