//! Sliding window of loaded chunks
//!
//! The map keeps `size × size` chunks around a center chunk. Slot `dy * size + dx`
//! holds the chunk at `origin + (dx, dy)`, where `origin` is the window's
//! top-left chunk. Shifting the window moves retained chunks between slots,
//! persists the evicted ones if gameplay changed them and loads (or generates)
//! the chunks that enter.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::constants::*;
use crate::core::{Block, BlockRegistry, Chunk, ChunkPos, Coordinate, RelCoord};
use crate::entity::{Entity, EntityId};
use crate::input::InputIntents;
use crate::save::ChunkStore;
use crate::utils::settings::PhysicsSettings;
use crate::world::generator::ChunkGenerator;

/// Compass direction of a one-chunk window shift. North is towards negative y.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// Chunk offset `(dx, dy)` of the shift.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::NorthEast => (1, -1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::South => (0, 1),
            Direction::SouthWest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
        }
    }

    /// Combines independent horizontal and vertical decisions, each in
    /// `-1..=1`. `None` when neither axis moves.
    pub fn from_offset(dx: i32, dy: i32) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|d| d.offset() == (dx.signum(), dy.signum()))
    }
}

/// Block-space rectangle covered by the window, max exclusive. Every z in
/// `0..CHUNK_Z` is inside.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct WindowBounds {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl WindowBounds {
    pub fn contains(&self, c: Coordinate) -> bool {
        (self.min_x..self.max_x).contains(&c.x)
            && (self.min_y..self.max_y).contains(&c.y)
            && (0..CHUNK_Z).contains(&c.z)
    }
}

/// Chunks moved in or out by one window shift.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShiftReport {
    pub evicted: usize,
    pub saved: usize,
    pub loaded: usize,
    pub generated: usize,
}

pub struct Map {
    registry: Arc<BlockRegistry>,
    size: i32,
    center: ChunkPos,
    chunks: Vec<Chunk>,
    entities: Vec<Entity>,
    next_entity_id: EntityId,
    air: Block,
    animation_clock_ms: u64,
}

impl Map {
    /// Populates a `size × size` window around `center`. `size` is forced odd.
    pub fn new(
        registry: Arc<BlockRegistry>,
        size: i32,
        center: ChunkPos,
        generator: &dyn ChunkGenerator,
        store: &mut dyn ChunkStore,
    ) -> Self {
        let size = size.max(1) | 1;
        let mut map = Map {
            registry,
            size,
            center,
            chunks: Vec::with_capacity((size * size) as usize),
            entities: Vec::new(),
            next_entity_id: 0,
            air: Block::air(),
            animation_clock_ms: 0,
        };

        let origin = map.origin();
        let mut report = ShiftReport::default();
        for dy in 0..size {
            for dx in 0..size {
                let chunk = load_or_generate(origin.offset(dx, dy), generator, store, &mut report);
                map.chunks.push(chunk);
            }
        }
        tracing::info!(
            "Map window {}x{} around {:?}: {} loaded, {} generated",
            size,
            size,
            center,
            report.loaded,
            report.generated
        );
        map
    }

    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.registry
    }

    pub fn size(&self) -> i32 {
        self.size
    }

    pub fn center(&self) -> ChunkPos {
        self.center
    }

    /// Top-left chunk of the window.
    pub fn origin(&self) -> ChunkPos {
        self.center.offset(-self.size / 2, -self.size / 2)
    }

    pub fn blocks_x(&self) -> i32 {
        self.size * CHUNK_X
    }

    pub fn blocks_y(&self) -> i32 {
        self.size * CHUNK_Y
    }

    pub fn window_bounds(&self) -> WindowBounds {
        let (min_x, min_y) = self.origin().block_origin();
        WindowBounds {
            min_x,
            min_y,
            max_x: min_x + self.blocks_x(),
            max_y: min_y + self.blocks_y(),
        }
    }

    pub fn contains(&self, c: Coordinate) -> bool {
        self.window_bounds().contains(c)
    }

    /// Window slot of `pos`, if the chunk is loaded.
    pub fn chunk_slot(&self, pos: ChunkPos) -> Option<usize> {
        let origin = self.origin();
        let dx = pos.x - origin.x;
        let dy = pos.y - origin.y;
        if (0..self.size).contains(&dx) && (0..self.size).contains(&dy) {
            Some((dy * self.size + dx) as usize)
        } else {
            None
        }
    }

    fn locate(&self, c: Coordinate) -> Option<(usize, RelCoord)> {
        if !(0..CHUNK_Z).contains(&c.z) {
            return None;
        }
        let (chunk, rel) = c.to_chunk_relative();
        self.chunk_slot(chunk).map(|slot| (slot, rel))
    }

    /// Chunks in slot order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Chunks in slot order, for passes that rewrite derived block state.
    /// Gameplay edits go through [`Map::set_block`].
    pub fn chunks_mut(&mut self) -> &mut [Chunk] {
        &mut self.chunks
    }

    pub fn chunk(&self, pos: ChunkPos) -> Option<&Chunk> {
        self.chunk_slot(pos).map(|slot| &self.chunks[slot])
    }

    /// The block at `c`, or an air sentinel outside the window.
    pub fn block(&self, c: Coordinate) -> &Block {
        match self.locate(c) {
            Some((slot, rel)) => &self.chunks[slot].blocks()[rel.index()],
            None => &self.air,
        }
    }

    /// Direct access for callers that already iterate inside the window.
    ///
    /// # Panics
    ///
    /// Panics if `c` lies outside [`Map::window_bounds`].
    pub fn block_unchecked(&self, c: Coordinate) -> &Block {
        let Some((slot, rel)) = self.locate(c) else {
            panic!("{:?} is outside the map window", c);
        };
        &self.chunks[slot].blocks()[rel.index()]
    }

    /// Mutable access that leaves the chunk's dirty flag alone; used by
    /// derived-state passes (visibility, light).
    pub fn block_mut(&mut self, c: Coordinate) -> Option<&mut Block> {
        let (slot, rel) = self.locate(c)?;
        self.chunks[slot].block_mut(rel)
    }

    /// Replaces the block at `c` on behalf of gameplay. Returns false and does
    /// nothing outside the window.
    pub fn set_block(&mut self, c: Coordinate, block: Block) -> bool {
        match self.locate(c) {
            Some((slot, rel)) => self.chunks[slot].set_block_modified(rel, block),
            None => false,
        }
    }

    pub fn place(&mut self, c: Coordinate, id: u16, variant: u8) -> bool {
        let block = Block::new(&self.registry, id, variant);
        self.set_block(c, block)
    }

    pub fn is_obstacle(&self, c: Coordinate) -> bool {
        self.block(c).obstacle
    }

    /// The free cell on top of the highest obstacle in column `(x, y)`.
    pub fn surface(&self, x: i32, y: i32) -> Coordinate {
        let z = (0..CHUNK_Z)
            .rev()
            .find(|&z| self.is_obstacle(Coordinate::new(x, y, z)))
            .map_or(0, |z| (z + 1).min(CHUNK_Z - 1));
        Coordinate::new(x, y, z)
    }

    /// Every block of the window with its slot and absolute coordinate, in
    /// slot order.
    pub fn iter_blocks(&self) -> impl Iterator<Item = (usize, Coordinate, &Block)> {
        self.chunks.iter().enumerate().flat_map(|(slot, chunk)| {
            chunk
                .iter()
                .map(move |(rel, block)| (slot, Coordinate::from_chunk_relative(chunk.pos, rel), block))
        })
    }

    /// Shifts the window one chunk towards `direction`.
    pub fn set_center(
        &mut self,
        direction: Direction,
        generator: &dyn ChunkGenerator,
        store: &mut dyn ChunkStore,
    ) -> ShiftReport {
        let (dx, dy) = direction.offset();
        let previous = self.center;
        self.center = previous.offset(dx, dy);

        let mut report = ShiftReport::default();
        let mut retained: FxHashMap<ChunkPos, Chunk> = FxHashMap::default();
        for chunk in std::mem::take(&mut self.chunks) {
            if self.chunk_slot(chunk.pos).is_some() {
                retained.insert(chunk.pos, chunk);
                continue;
            }
            report.evicted += 1;
            if chunk.modified {
                match store.save(&chunk) {
                    Ok(()) => report.saved += 1,
                    Err(e) => tracing::warn!("Failed to save chunk {:?}: {}", chunk.pos, e),
                }
            }
        }

        let origin = self.origin();
        for sy in 0..self.size {
            for sx in 0..self.size {
                let pos = origin.offset(sx, sy);
                let chunk = match retained.remove(&pos) {
                    Some(chunk) => chunk,
                    None => load_or_generate(pos, generator, store, &mut report),
                };
                self.chunks.push(chunk);
            }
        }

        tracing::debug!(
            "Map center {:?} -> {:?}: {} evicted ({} saved), {} loaded, {} generated",
            previous,
            self.center,
            report.evicted,
            report.saved,
            report.loaded,
            report.generated
        );
        report
    }

    /// Saves every modified chunk and clears its flag.
    pub fn persist_all(&mut self, store: &mut dyn ChunkStore) -> usize {
        let mut saved = 0;
        for chunk in self.chunks.iter_mut().filter(|c| c.modified) {
            match store.save(chunk) {
                Ok(()) => {
                    chunk.modified = false;
                    saved += 1;
                }
                Err(e) => tracing::warn!("Failed to save chunk {:?}: {}", chunk.pos, e),
            }
        }
        if let Err(e) = store.flush() {
            tracing::warn!("Failed to flush chunk store: {}", e);
        }
        saved
    }

    /// Advances the animation clock and cycles the variant of animated kinds.
    /// Returns the number of blocks whose variant changed.
    pub fn tick_blocks(&mut self, delta_ms: u32) -> usize {
        self.animation_clock_ms += delta_ms as u64;
        let clock = self.animation_clock_ms;
        let registry = &self.registry;

        let mut changed = 0;
        for chunk in &mut self.chunks {
            for block in chunk.blocks_mut() {
                if block.is_air() {
                    continue;
                }
                let Some(animation) = registry.get(block.id).animation else {
                    continue;
                };
                if animation.frames == 0 || animation.frame_ms == 0 {
                    continue;
                }
                let frame = ((clock / animation.frame_ms as u64) % animation.frames as u64) as u8;
                if block.variant != frame {
                    block.variant = frame;
                    changed += 1;
                }
            }
        }
        changed
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    /// Adds an entity and assigns its id.
    pub fn spawn(&mut self, mut entity: Entity) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        entity.id = id;
        self.entities.push(entity);
        id
    }

    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        let index = self.entities.iter().position(|e| e.id == id)?;
        Some(self.entities.remove(index))
    }

    /// Runs one physics step for every entity. Intents drive only the
    /// `controlled` entity. Returns true if any entity changed voxel.
    pub fn tick_entities(
        &mut self,
        delta_ms: u32,
        controlled: Option<EntityId>,
        intents: &InputIntents,
        physics: &PhysicsSettings,
    ) -> bool {
        let mut entities = std::mem::take(&mut self.entities);
        let idle = InputIntents::default();
        let mut changed = false;
        for entity in &mut entities {
            let intents = if Some(entity.id) == controlled { intents } else { &idle };
            changed |= entity.update(self, delta_ms, intents, physics);
        }
        self.entities = entities;
        changed
    }
}

fn load_or_generate(
    pos: ChunkPos,
    generator: &dyn ChunkGenerator,
    store: &mut dyn ChunkStore,
    report: &mut ShiftReport,
) -> Chunk {
    match store.load(pos) {
        Ok(Some(chunk)) if chunk.pos == pos => {
            report.loaded += 1;
            return chunk;
        }
        Ok(Some(chunk)) => {
            tracing::warn!("Store returned chunk {:?} for {:?}, regenerating", chunk.pos, pos);
        }
        Ok(None) => {}
        Err(e) => tracing::warn!("Failed to load chunk {:?}: {}", pos, e),
    }
    report.generated += 1;
    let mut chunk = generator.generate(pos);
    chunk.pos = pos;
    chunk.modified = false;
    chunk
}
