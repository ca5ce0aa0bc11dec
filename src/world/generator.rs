//! Deterministic chunk generation
//!
//! A generator must return the same chunk for the same position and seed; the
//! map relies on it when a chunk that was never saved re-enters the window.

use std::sync::Arc;

use fastnoise_lite::{FastNoiseLite, FractalType, NoiseType};
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::core::{Block, BlockRegistry, Chunk, ChunkPos, RelCoord};

const GRASS: u16 = 1;
const DIRT: u16 = 2;
const STONE: u16 = 3;
const SAND: u16 = 8;
const WATER: u16 = 9;
const CAMPFIRE: u16 = 70;

pub const SEA_LEVEL: i32 = 3;

pub trait ChunkGenerator {
    fn generate(&self, pos: ChunkPos) -> Chunk;
}

impl<G: ChunkGenerator + ?Sized> ChunkGenerator for Box<G> {
    fn generate(&self, pos: ChunkPos) -> Chunk {
        (**self).generate(pos)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    Empty,
    #[default]
    Flat,
    Noise,
}

impl std::str::FromStr for GeneratorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "empty" => Ok(GeneratorKind::Empty),
            "flat" => Ok(GeneratorKind::Flat),
            "noise" => Ok(GeneratorKind::Noise),
            other => Err(format!("unknown generator '{}', expected empty, flat or noise", other)),
        }
    }
}

pub fn create_generator(
    kind: GeneratorKind,
    seed: u32,
    registry: Arc<BlockRegistry>,
) -> Box<dyn ChunkGenerator> {
    match kind {
        GeneratorKind::Empty => Box::new(EmptyGenerator),
        GeneratorKind::Flat => Box::new(FlatGenerator::new(registry)),
        GeneratorKind::Noise => Box::new(NoiseGenerator::new(seed, registry)),
    }
}

pub struct EmptyGenerator;

impl ChunkGenerator for EmptyGenerator {
    fn generate(&self, pos: ChunkPos) -> Chunk {
        Chunk::new(pos)
    }
}

/// Horizontal layers stacked from z = 0 upwards.
pub struct FlatGenerator {
    registry: Arc<BlockRegistry>,
    layers: Vec<(u16, i32)>,
}

impl FlatGenerator {
    pub fn new(registry: Arc<BlockRegistry>) -> Self {
        Self::with_layers(registry, vec![(STONE, 1), (DIRT, 1), (GRASS, 1)])
    }

    pub fn with_layers(registry: Arc<BlockRegistry>, layers: Vec<(u16, i32)>) -> Self {
        FlatGenerator { registry, layers }
    }

    pub fn surface_height(&self) -> i32 {
        self.layers.iter().map(|(_, thickness)| thickness).sum()
    }
}

impl ChunkGenerator for FlatGenerator {
    fn generate(&self, pos: ChunkPos) -> Chunk {
        let mut chunk = Chunk::new(pos);
        let mut z = 0;
        for &(id, thickness) in &self.layers {
            chunk.fill_layers(z, z + thickness, Block::new(&self.registry, id, 0));
            z += thickness;
        }
        chunk
    }
}

/// Rolling terrain from a fractal heightmap, flooded up to [`SEA_LEVEL`].
pub struct NoiseGenerator {
    registry: Arc<BlockRegistry>,
    noise_height: FastNoiseLite,
    pub seed: u32,
}

impl NoiseGenerator {
    pub fn new(seed: u32, registry: Arc<BlockRegistry>) -> Self {
        let mut noise = FastNoiseLite::with_seed(seed as i32);
        noise.set_noise_type(Some(NoiseType::OpenSimplex2));
        noise.set_fractal_type(Some(FractalType::FBm));
        noise.set_fractal_octaves(Some(3));
        noise.set_fractal_lacunarity(Some(2.0));
        noise.set_fractal_gain(Some(0.5));
        noise.set_frequency(Some(0.04));

        NoiseGenerator {
            registry,
            noise_height: noise,
            seed,
        }
    }

    /// Number of solid layers in the column, at least one.
    pub fn terrain_height(&self, x: i32, y: i32) -> i32 {
        // Rows are half as tall as columns are wide on the ground plane
        let n = self.noise_height.get_noise_2d(x as f32, y as f32 * 0.5);
        let height = 1.0 + (n + 1.0) * 0.5 * (CHUNK_Z - 4) as f32;
        (height as i32).clamp(1, CHUNK_Z - 2)
    }

    fn position_hash(&self, x: i32, y: i32) -> u32 {
        let mut h = self.seed ^ (x as u32).wrapping_mul(0x9E37_79B1) ^ (y as u32).wrapping_mul(0x85EB_CA77);
        h ^= h >> 15;
        h = h.wrapping_mul(0x2C1B_3C6D);
        h ^ (h >> 12)
    }
}

impl ChunkGenerator for NoiseGenerator {
    fn generate(&self, pos: ChunkPos) -> Chunk {
        let mut chunk = Chunk::new(pos);
        let (ox, oy) = pos.block_origin();
        let block = |id| Block::new(&self.registry, id, 0);

        for ry in 0..CHUNK_Y {
            for rx in 0..CHUNK_X {
                let height = self.terrain_height(ox + rx, oy + ry);
                for z in 0..height {
                    let id = if z < height - 2 {
                        STONE
                    } else if z < height - 1 {
                        DIRT
                    } else if height <= SEA_LEVEL {
                        SAND
                    } else {
                        GRASS
                    };
                    chunk.set_block(RelCoord { x: rx, y: ry, z }, block(id));
                }
                for z in height..SEA_LEVEL {
                    chunk.set_block(RelCoord { x: rx, y: ry, z }, block(WATER));
                }
                if height > SEA_LEVEL && self.position_hash(ox + rx, oy + ry) % 211 == 0 {
                    chunk.set_block(RelCoord { x: rx, y: ry, z: height }, block(CAMPFIRE));
                }
            }
        }
        chunk
    }
}
