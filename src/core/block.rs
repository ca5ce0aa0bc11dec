use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::core::registry::{BlockDescriptor, BlockRegistry};

/// The three faces an isometric block shows to the camera.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Face {
    Left = 0,
    Top = 1,
    Right = 2,
}

impl Face {
    pub const ALL: [Face; 3] = [Face::Left, Face::Top, Face::Right];
}

/// One voxel of the grid. Physics and rendering flags are copied from the
/// registry descriptor when the block is created.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Block {
    pub id: u16,
    pub variant: u8,
    pub obstacle: bool,
    pub transparent: bool,
    pub liquid: bool,
    pub invisible: bool,
    pub volumetric: bool,
    pub height: u8,
    pub visible: bool,
    pub side_visible: [bool; 3],
    pub lightlevel: u8,
    pub offset: IVec2,
}

/// The persisted part of a block. Flags are rebuilt from the registry on load.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SavedBlock {
    pub id: u16,
    pub variant: u8,
    pub lightlevel: u8,
    pub offset: (i32, i32),
}

impl Default for Block {
    fn default() -> Self {
        Block::air()
    }
}

impl Block {
    pub const fn air() -> Self {
        Block {
            id: AIR_ID,
            variant: 0,
            obstacle: false,
            transparent: true,
            liquid: false,
            invisible: true,
            volumetric: true,
            height: 1,
            visible: false,
            side_visible: [false; 3],
            lightlevel: LIGHT_DEFAULT,
            offset: IVec2::ZERO,
        }
    }

    pub fn new(registry: &BlockRegistry, id: u16, variant: u8) -> Self {
        Self::from_descriptor(registry.get(id), id, variant)
    }

    fn from_descriptor(descriptor: &BlockDescriptor, id: u16, variant: u8) -> Self {
        if id == AIR_ID {
            return Block::air();
        }
        Block {
            id,
            variant,
            obstacle: descriptor.obstacle,
            transparent: descriptor.transparent,
            liquid: descriptor.liquid,
            invisible: descriptor.invisible,
            volumetric: descriptor.volumetric,
            height: descriptor.height.max(1),
            visible: false,
            side_visible: [false; 3],
            lightlevel: LIGHT_DEFAULT,
            offset: IVec2::ZERO,
        }
    }

    pub fn is_air(&self) -> bool {
        self.id == AIR_ID
    }

    /// Whether the block can ever be drawn.
    pub fn is_renderable(&self) -> bool {
        !self.is_air() && !self.invisible
    }

    /// Hides light and everything behind it.
    pub fn is_opaque_cube(&self) -> bool {
        !self.transparent && self.volumetric && !self.is_air()
    }

    /// Hiding a block hides every face with it.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if !visible {
            self.side_visible = [false; 3];
        }
    }

    /// Showing any face makes the block visible.
    pub fn set_side_visible(&mut self, face: Face, visible: bool) {
        if visible {
            self.visible = true;
        }
        self.side_visible[face as usize] = visible;
    }

    pub fn side_visible(&self, face: Face) -> bool {
        self.side_visible[face as usize]
    }

    pub fn set_lightlevel(&mut self, level: i32) {
        self.lightlevel = level.clamp(0, LIGHT_MAX as i32) as u8;
    }

    pub fn to_saved(&self) -> SavedBlock {
        SavedBlock {
            id: self.id,
            variant: self.variant,
            lightlevel: self.lightlevel,
            offset: (self.offset.x, self.offset.y),
        }
    }

    pub fn from_saved(registry: &BlockRegistry, saved: SavedBlock) -> Self {
        let mut block = Block::new(registry, saved.id, saved.variant);
        block.set_lightlevel(saved.lightlevel as i32);
        block.offset = IVec2::new(saved.offset.0, saved.offset.1);
        block
    }
}
