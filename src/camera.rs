//! Viewport, scroll borders and visibility
//!
//! In this projection every cell `(x, y, z)` is drawn at the same screen spot
//! as `(x, y - 2, z - 1)`, with the former in front. A ray therefore runs
//! front-to-back along `(0, -2, -1)` and everything behind the first opaque
//! cube on it is covered. Faces are hidden by the opaque cubes directly in
//! front of them: bottom-left covers the left face, bottom-right the right
//! face and the block above the top face.

use glam::IVec2;

use crate::constants::*;
use crate::core::{Block, Coordinate, Face, Side};
use crate::entity::EntityId;
use crate::render::viewport::Rect;
use crate::utils::settings::CameraSettings;
use crate::world::map::{Direction, Map};

/// Block columns and rows (on the z = 0 plane) touched by the viewport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockBounds {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RaytraceStats {
    pub visible: usize,
    pub occluded: usize,
    pub outside: usize,
}

pub struct Camera {
    pub viewport: Rect,
    pub follow: Option<EntityId>,
    bounds: Option<BlockBounds>,
}

impl Camera {
    pub fn new(viewport: Rect) -> Self {
        Camera {
            viewport,
            follow: None,
            bounds: None,
        }
    }

    pub fn from_settings(settings: &CameraSettings) -> Self {
        Camera::new(Rect::from_size(0, 0, settings.width, settings.height))
    }

    pub fn follow(&mut self, entity: Option<EntityId>) {
        self.follow = entity;
    }

    pub fn center_on(&mut self, c: Coordinate) {
        self.viewport
            .center_on(c.screen_position() + IVec2::new(DIM2, DIM4));
    }

    pub fn bounds(&self) -> Option<BlockBounds> {
        self.bounds
    }

    fn window_origin_px(map: &Map) -> IVec2 {
        let bounds = map.window_bounds();
        IVec2::new(bounds.min_x * DIM, bounds.min_y * DIM4)
    }

    /// Block columns between the window's left edge and the viewport's.
    pub fn left_border(&self, map: &Map) -> i32 {
        (self.viewport.min.x - Self::window_origin_px(map).x).div_euclid(DIM)
    }

    pub fn right_border(&self, map: &Map) -> i32 {
        (self.viewport.max.x - Self::window_origin_px(map).x).div_euclid(DIM)
    }

    /// Rows between the window's top edge and the viewport's.
    pub fn top_border(&self, map: &Map) -> i32 {
        (self.viewport.min.y - Self::window_origin_px(map).y).div_euclid(DIM4)
    }

    pub fn bottom_border(&self, map: &Map) -> i32 {
        (self.viewport.max.y - Self::window_origin_px(map).y).div_euclid(DIM4)
    }

    /// Window shift needed to keep the viewport inside the loaded chunks.
    /// Horizontal and vertical needs are decided independently.
    pub fn streaming_direction(&self, map: &Map) -> Option<Direction> {
        let dx = if self.left_border(map) <= 0 {
            -1
        } else if self.right_border(map) >= map.blocks_x() - 1 {
            1
        } else {
            0
        };
        let dy = if self.top_border(map) <= 0 {
            -1
        } else if self.bottom_border(map) >= map.blocks_y() - 1 {
            1
        } else {
            0
        };
        Direction::from_offset(dx, dy)
    }

    fn covered_bounds(&self) -> BlockBounds {
        BlockBounds {
            min_x: self.viewport.min.x.div_euclid(DIM),
            min_y: self.viewport.min.y.div_euclid(DIM4),
            max_x: self.viewport.max.x.div_euclid(DIM),
            max_y: self.viewport.max.y.div_euclid(DIM4),
        }
    }

    /// Recenters on the followed entity. Returns true when the covered
    /// block bounds changed, which owes a visibility pass.
    pub fn update(&mut self, map: &Map) -> bool {
        if let Some(entity) = self.follow.and_then(|id| map.entity(id)) {
            let anchor = entity.coord.screen_position() + entity.offset.round().as_ivec2();
            self.viewport.center_on(anchor);
        }
        let bounds = self.covered_bounds();
        let changed = self.bounds != Some(bounds);
        self.bounds = Some(bounds);
        changed
    }

    /// Screen area a block's sprite covers.
    pub fn block_rect(c: Coordinate, block: &Block) -> Rect {
        Rect::tile(c.screen_position() + block.offset, DIM)
    }

    pub fn in_viewport(&self, c: Coordinate, block: &Block) -> bool {
        self.viewport.intersects(&Self::block_rect(c, block))
    }

    /// Recomputes `visible` and the per-face flags of every block in the
    /// window.
    pub fn raytrace(&self, map: &mut Map) -> RaytraceStats {
        let bounds = map.window_bounds();
        let slots = map.chunks().len();
        let mut occluded = vec![false; slots * BLOCKS_PER_CHUNK];
        let mut faces = vec![[false; 3]; slots * BLOCKS_PER_CHUNK];
        let mut stats = RaytraceStats::default();

        let index_of = |map: &Map, c: Coordinate| -> Option<usize> {
            let (chunk, rel) = c.to_chunk_relative();
            map.chunk_slot(chunk)
                .map(|slot| slot * BLOCKS_PER_CHUNK + rel.index())
        };

        // Rays start at cells with nothing in front of them inside the window
        for (_, head, _) in map.iter_blocks() {
            if bounds.contains(Coordinate::new(head.x, head.y + 2, head.z + 1)) {
                continue;
            }
            let mut covered = false;
            let mut c = head;
            while bounds.contains(c) {
                let block = map.block_unchecked(c);
                if let Some(i) = index_of(map, c) {
                    occluded[i] = covered;
                }
                if block.is_opaque_cube() {
                    covered = true;
                }
                c = Coordinate::new(c.x, c.y - 2, c.z - 1);
            }
        }

        for (slot, c, block) in map.iter_blocks() {
            let (_, rel) = c.to_chunk_relative();
            let i = slot * BLOCKS_PER_CHUNK + rel.index();
            if !block.is_renderable() {
                continue;
            }
            if !self.in_viewport(c, block) {
                stats.outside += 1;
                continue;
            }
            if occluded[i] {
                stats.occluded += 1;
                continue;
            }
            faces[i] = if block.volumetric {
                [
                    !map.block(c.neighbor(Side::BottomLeft)).is_opaque_cube(),
                    !map.block(c.above()).is_opaque_cube(),
                    !map.block(c.neighbor(Side::BottomRight)).is_opaque_cube(),
                ]
            } else {
                [true; 3]
            };
            if faces[i].iter().any(|&f| f) {
                stats.visible += 1;
            } else {
                stats.occluded += 1;
            }
        }

        for (slot, chunk) in map.chunks_mut().iter_mut().enumerate() {
            let base = slot * BLOCKS_PER_CHUNK;
            for (i, block) in chunk.blocks_mut().iter_mut().enumerate() {
                block.set_visible(false);
                for face in Face::ALL {
                    if faces[base + i][face as usize] {
                        block.set_side_visible(face, true);
                    }
                }
            }
        }

        tracing::debug!(
            "Raytrace: {} visible, {} occluded, {} outside the viewport",
            stats.visible,
            stats.occluded,
            stats.outside
        );
        stats
    }
}
