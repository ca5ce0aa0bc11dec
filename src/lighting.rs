//! On-demand brightness for every block of the map window
//!
//! Each block gets a [`LightSample`] describing what shades it: the blocks
//! stacked above it in its column and the opaque cubes in front of it on the
//! screen (bottom-left, bottom, bottom-right at the same height). A
//! [`LightFalloff`] turns the sample into a level in `0..=LIGHT_MAX`.
//!
//! All levels are computed from the current grid before any is written, so
//! the result does not depend on iteration order and a second run with no
//! grid change writes the same values.

use crate::constants::*;
use crate::core::{Block, Coordinate, RelCoord, Side};
use crate::utils::settings::LightingSettings;
use crate::world::map::Map;

const LATERAL_SIDES: [Side; 3] = [Side::BottomLeft, Side::Bottom, Side::BottomRight];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LightSample {
    pub ambient: u8,
    pub opaque_above: u32,
    pub translucent_above: u32,
    pub opaque_lateral: u32,
}

pub trait LightFalloff {
    /// Unclamped light level for a sample.
    fn intensity(&self, sample: &LightSample) -> i32;
}

/// Subtracts a fixed cost per occluder from the ambient level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubtractiveFalloff {
    pub top_cost: i32,
    pub translucent_cost: i32,
    pub side_cost: i32,
}

impl Default for SubtractiveFalloff {
    fn default() -> Self {
        let settings = LightingSettings::default();
        SubtractiveFalloff {
            top_cost: settings.top_cost,
            translucent_cost: settings.translucent_cost,
            side_cost: settings.side_cost,
        }
    }
}

impl LightFalloff for SubtractiveFalloff {
    fn intensity(&self, sample: &LightSample) -> i32 {
        sample.ambient as i32
            - self.top_cost * sample.opaque_above as i32
            - self.translucent_cost * sample.translucent_above as i32
            - self.side_cost * sample.opaque_lateral as i32
    }
}

pub struct LightEngine {
    pub ambient: u8,
    falloff: Box<dyn LightFalloff>,
}

impl LightEngine {
    pub fn new(ambient: u8, falloff: Box<dyn LightFalloff>) -> Self {
        LightEngine {
            ambient: ambient.min(LIGHT_MAX),
            falloff,
        }
    }

    pub fn from_settings(settings: &LightingSettings) -> Self {
        let falloff = SubtractiveFalloff {
            top_cost: settings.top_cost,
            translucent_cost: settings.translucent_cost,
            side_cost: settings.side_cost,
        };
        LightEngine::new(settings.ambient, Box::new(falloff))
    }

    pub fn set_falloff(&mut self, falloff: Box<dyn LightFalloff>) {
        self.falloff = falloff;
    }

    fn level(&self, sample: &LightSample) -> u8 {
        self.falloff.intensity(sample).clamp(0, LIGHT_MAX as i32) as u8
    }

    fn lateral_occluders(map: &Map, c: Coordinate) -> u32 {
        LATERAL_SIDES
            .iter()
            .filter(|&&side| map.block(c.neighbor(side)).is_opaque_cube())
            .count() as u32
    }

    /// Sample for a single block, scanning its column.
    pub fn sample(&self, map: &Map, c: Coordinate) -> LightSample {
        let mut sample = LightSample {
            ambient: self.ambient,
            opaque_lateral: Self::lateral_occluders(map, c),
            ..Default::default()
        };
        for z in c.z + 1..CHUNK_Z {
            count_occluder(&mut sample, map.block(Coordinate::new(c.x, c.y, z)));
        }
        sample
    }

    /// Recomputes the level of every block in the window. Returns how many
    /// levels changed.
    pub fn recalculate(&self, map: &mut Map) -> usize {
        let mut levels = vec![0u8; map.chunks().len() * BLOCKS_PER_CHUNK];

        for (slot, chunk) in map.chunks().iter().enumerate() {
            let base = slot * BLOCKS_PER_CHUNK;
            for y in 0..CHUNK_Y {
                for x in 0..CHUNK_X {
                    // Walk the column top-down so the blocks above are already counted
                    let mut column = LightSample {
                        ambient: self.ambient,
                        ..Default::default()
                    };
                    for z in (0..CHUNK_Z).rev() {
                        let rel = RelCoord { x, y, z };
                        let c = Coordinate::from_chunk_relative(chunk.pos, rel);
                        let sample = LightSample {
                            opaque_lateral: Self::lateral_occluders(map, c),
                            ..column
                        };
                        levels[base + rel.index()] = self.level(&sample);
                        count_occluder(&mut column, map.block_unchecked(c));
                    }
                }
            }
        }

        let mut changed = 0;
        for (slot, chunk) in map.chunks_mut().iter_mut().enumerate() {
            let base = slot * BLOCKS_PER_CHUNK;
            for (i, block) in chunk.blocks_mut().iter_mut().enumerate() {
                let level = levels[base + i];
                if block.lightlevel != level {
                    block.lightlevel = level;
                    changed += 1;
                }
            }
        }
        tracing::debug!("Light pass updated {} blocks", changed);
        changed
    }
}

fn count_occluder(sample: &mut LightSample, block: &Block) {
    if block.is_opaque_cube() {
        sample.opaque_above += 1;
    } else if !block.is_air() {
        sample.translucent_above += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::{BlockRegistry, ChunkPos};
    use crate::save::NullStore;
    use crate::world::generator::{EmptyGenerator, FlatGenerator};

    fn registry() -> Arc<BlockRegistry> {
        Arc::new(BlockRegistry::builtin().unwrap())
    }

    fn engine() -> LightEngine {
        LightEngine::from_settings(&LightingSettings::default())
    }

    #[test]
    fn test_open_sky_is_ambient() {
        let mut map = Map::new(registry(), 3, ChunkPos::default(), &EmptyGenerator, &mut NullStore);
        let c = Coordinate::new(4, 10, 0);
        map.place(c, 1, 0);
        engine().recalculate(&mut map);
        assert_eq!(map.block(c).lightlevel, AMBIENT_LIGHT);
        assert_eq!(map.block(c.above()).lightlevel, AMBIENT_LIGHT);
    }

    #[test]
    fn test_column_and_lateral_occluders() {
        let mut map = Map::new(registry(), 3, ChunkPos::default(), &EmptyGenerator, &mut NullStore);
        let c = Coordinate::new(4, 10, 0);
        map.place(c, 1, 0);
        map.place(Coordinate::new(4, 10, 3), 3, 0);
        map.place(Coordinate::new(4, 10, 5), 9, 0);
        map.place(c.neighbor(Side::Bottom), 20, 0);

        let engine = engine();
        let sample = engine.sample(&map, c);
        assert_eq!(sample.opaque_above, 1);
        assert_eq!(sample.translucent_above, 1);
        assert_eq!(sample.opaque_lateral, 1);

        engine.recalculate(&mut map);
        let costs = LightingSettings::default();
        let expected = AMBIENT_LIGHT as i32 - costs.top_cost - costs.translucent_cost - costs.side_cost;
        assert_eq!(map.block(c).lightlevel as i32, expected);
    }

    #[test]
    fn test_levels_clamp_at_zero() {
        let mut map = Map::new(registry(), 3, ChunkPos::default(), &EmptyGenerator, &mut NullStore);
        for z in 0..CHUNK_Z {
            map.place(Coordinate::new(0, 0, z), 3, 0);
        }
        engine().recalculate(&mut map);
        assert_eq!(map.block(Coordinate::new(0, 0, 0)).lightlevel, 0);
    }

    #[test]
    fn test_recalculation_is_idempotent() {
        let registry = registry();
        let generator = FlatGenerator::new(registry.clone());
        let mut map = Map::new(registry, 3, ChunkPos::default(), &generator, &mut NullStore);
        map.place(Coordinate::new(2, 2, 5), 20, 0);

        let engine = engine();
        assert!(engine.recalculate(&mut map) > 0);
        let first: Vec<u8> = map.iter_blocks().map(|(_, _, b)| b.lightlevel).collect();
        assert_eq!(engine.recalculate(&mut map), 0);
        let second: Vec<u8> = map.iter_blocks().map(|(_, _, b)| b.lightlevel).collect();
        assert_eq!(first, second);
    }

    struct Constant(i32);

    impl LightFalloff for Constant {
        fn intensity(&self, _sample: &LightSample) -> i32 {
            self.0
        }
    }

    #[test]
    fn test_custom_falloff() {
        let mut map = Map::new(registry(), 3, ChunkPos::default(), &EmptyGenerator, &mut NullStore);
        let mut engine = engine();
        engine.set_falloff(Box::new(Constant(250)));
        engine.recalculate(&mut map);
        assert!(map.iter_blocks().all(|(_, _, b)| b.lightlevel == LIGHT_MAX));
    }
}
