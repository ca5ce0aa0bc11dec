//! Back-to-front draw list for the painter's algorithm

use std::cmp::Ordering;

use glam::IVec2;

use crate::constants::*;
use crate::camera::Camera;
use crate::core::{Block, Coordinate};
use crate::entity::{Entity, EntityId};
use crate::render::viewport::Rect;
use crate::world::map::Map;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawSource {
    Block { slot: usize },
    Entity(EntityId),
}

/// One drawable unit, in paint order inside the list returned by
/// [`RenderOrder::build`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawEntry {
    pub coord: Coordinate,
    /// Top-left corner of the sprite on screen.
    pub screen_position: IVec2,
    pub sprite_id: u16,
    pub variant: u8,
    pub side_visible: [bool; 3],
    pub lightlevel: u8,
    pub depth: i32,
    pub source: DrawSource,
}

/// Paint-order key. Taller sprites and sprites pushed down on screen sort
/// later so they overdraw what they overlap.
pub fn depth(c: Coordinate, offset_y: i32, height: i32) -> i32 {
    DIM * c.y + c.row_parity() * DIM2 + DIM * c.z + offset_y + (height.max(1) - 1) * DIM
}

fn block_screen_position(c: Coordinate, block: &Block) -> IVec2 {
    c.screen_position() + block.offset - IVec2::new(0, (block.height.max(1) as i32 - 1) * DIM2)
}

fn entity_screen_position(entity: &Entity) -> IVec2 {
    entity.coord.screen_position() + entity.render_offset() - IVec2::new(0, (entity.height - 1) * DIM2)
}

fn compare(a: &DrawEntry, b: &DrawEntry) -> Ordering {
    let rank = |e: &DrawEntry| match e.source {
        DrawSource::Block { slot } => (0, slot, 0),
        DrawSource::Entity(id) => (1, 0, id),
    };
    let (a_kind, a_slot, a_id) = rank(a);
    let (b_kind, b_slot, b_id) = rank(b);
    a.depth
        .cmp(&b.depth)
        .then(a_kind.cmp(&b_kind))
        .then(a_slot.cmp(&b_slot))
        .then(a.coord.x.cmp(&b.coord.x))
        .then(a.coord.y.cmp(&b.coord.y))
        .then(a.coord.z.cmp(&b.coord.z))
        .then(a_id.cmp(&b_id))
}

pub struct RenderOrder;

impl RenderOrder {
    /// Every visible block plus every entity whose feet are on screen,
    /// sorted back to front. Two builds over the same state are identical.
    pub fn build(map: &Map, camera: &Camera) -> Vec<DrawEntry> {
        let mut entries: Vec<DrawEntry> = map
            .iter_blocks()
            .filter(|(_, _, block)| block.visible)
            .map(|(slot, c, block)| DrawEntry {
                coord: c,
                screen_position: block_screen_position(c, block),
                sprite_id: block.id,
                variant: block.variant,
                side_visible: block.side_visible,
                lightlevel: block.lightlevel,
                depth: depth(c, block.offset.y, block.height as i32),
                source: DrawSource::Block { slot },
            })
            .collect();

        for entity in map.entities() {
            let feet = Rect::tile(entity.coord.screen_position() + entity.render_offset(), DIM);
            if !camera.viewport.intersects(&feet) {
                continue;
            }
            entries.push(DrawEntry {
                coord: entity.coord,
                screen_position: entity_screen_position(entity),
                sprite_id: entity.kind,
                variant: entity.variant,
                side_visible: [true; 3],
                lightlevel: map.block(entity.coord).lightlevel,
                depth: depth(entity.coord, entity.render_offset().y, entity.height),
                source: DrawSource::Entity(entity.id),
            });
        }

        entries.sort_by(compare);
        entries
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::{BlockRegistry, ChunkPos};
    use crate::save::NullStore;
    use crate::world::generator::{EmptyGenerator, FlatGenerator, NoiseGenerator};

    fn setup(map: &mut Map, center: Coordinate) -> Camera {
        let mut camera = Camera::new(Rect::from_size(0, 0, 1280, 720));
        camera.center_on(center);
        camera.raytrace(map);
        camera
    }

    #[test]
    fn test_depth_formula() {
        assert_eq!(depth(Coordinate::new(0, 0, 0), 0, 1), 0);
        assert_eq!(depth(Coordinate::new(5, 3, 2), 0, 1), DIM * 3 + DIM2 + DIM * 2);
        assert_eq!(depth(Coordinate::new(0, 2, 0), -4, 2), DIM * 2 - 4 + DIM);
    }

    #[test]
    fn test_build_is_stable_and_sorted() {
        let registry = Arc::new(BlockRegistry::builtin().unwrap());
        let generator = NoiseGenerator::new(42, registry.clone());
        let mut map = Map::new(registry, 3, ChunkPos::default(), &generator, &mut NullStore);
        let camera = setup(&mut map, Coordinate::new(5, 20, 0));

        let first = RenderOrder::build(&map, &camera);
        let second = RenderOrder::build(&map, &camera);
        assert!(!first.is_empty());
        assert_eq!(first, second);
        assert!(first.windows(2).all(|w| compare(&w[0], &w[1]) != Ordering::Greater));
    }

    #[test]
    fn test_only_visible_blocks_are_listed() {
        let registry = Arc::new(BlockRegistry::builtin().unwrap());
        let generator = FlatGenerator::new(registry.clone());
        let mut map = Map::new(registry, 3, ChunkPos::default(), &generator, &mut NullStore);
        let camera = setup(&mut map, Coordinate::new(5, 20, 2));

        let entries = RenderOrder::build(&map, &camera);
        assert!(entries.iter().all(|e| e.sprite_id == 1));
        assert!(entries.iter().all(|e| e.side_visible[1]));
    }

    #[test]
    fn test_entity_sorts_after_its_floor() {
        let registry = Arc::new(BlockRegistry::builtin().unwrap());
        let generator = FlatGenerator::new(registry.clone());
        let mut map = Map::new(registry, 3, ChunkPos::default(), &generator, &mut NullStore);
        let standing = Coordinate::new(5, 20, 3);
        let id = map.spawn(Entity::player(standing));
        let camera = setup(&mut map, standing);

        let entries = RenderOrder::build(&map, &camera);
        let entity_at = entries
            .iter()
            .position(|e| e.source == DrawSource::Entity(id))
            .unwrap();
        let floor_at = entries
            .iter()
            .position(|e| e.coord == standing.below())
            .unwrap();
        assert!(floor_at < entity_at);
        assert_eq!(entries[entity_at].sprite_id, PLAYER_ID);
        assert_eq!(
            entries[entity_at].screen_position,
            standing.screen_position() - IVec2::new(0, DIM2)
        );
    }

    #[test]
    fn test_block_offset_moves_sprite_and_depth_alike() {
        let registry = Arc::new(BlockRegistry::builtin().unwrap());
        let mut map = Map::new(registry.clone(), 3, ChunkPos::default(), &EmptyGenerator, &mut NullStore);
        let c = Coordinate::new(5, 20, 0);
        let mut block = Block::new(&registry, 3, 0);
        block.offset = IVec2::new(6, 12);
        map.set_block(c, block);
        let camera = setup(&mut map, c);

        let entries = RenderOrder::build(&map, &camera);
        let entry = entries.iter().find(|e| e.coord == c).unwrap();
        assert_eq!(entry.screen_position, c.screen_position() + IVec2::new(6, 12));
        assert_eq!(entry.screen_position, Camera::block_rect(c, &block).min);
        assert_eq!(entry.depth, depth(c, 0, 1) + 12);
    }
}
