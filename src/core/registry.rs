//! Data-driven table of block kinds
//!
//! Loaded once at session start from TOML and shared read-only. Ids missing
//! from the table resolve to the `undefined` descriptor so rendering and
//! physics degrade instead of failing.

use std::path::Path;

use glam::IVec2;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::AIR_ID;

const BUILTIN_BLOCKS: &str = include_str!("../../assets/blocks.toml");

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("cannot read block registry {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed block registry: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("block id {0} is reserved for air")]
    ReservedId(u16),
    #[error("block id {0} is defined twice")]
    Duplicate(u16),
}

/// Cycles a block's variant over time, e.g. flickering fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Animation {
    pub frames: u8,
    pub frame_ms: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockDescriptor {
    pub id: u16,
    pub name: String,
    #[serde(default = "default_true")]
    pub obstacle: bool,
    #[serde(default)]
    pub transparent: bool,
    #[serde(default)]
    pub liquid: bool,
    /// Never drawn, even when inside the viewport.
    #[serde(default)]
    pub invisible: bool,
    /// Drawn as three faces; otherwise as one upright sprite.
    #[serde(default = "default_true")]
    pub volumetric: bool,
    #[serde(default = "default_height")]
    pub height: u8,
    #[serde(default)]
    pub animation: Option<Animation>,
    /// Atlas origins of the left, top and right face, one entry per variant.
    #[serde(default)]
    pub sprites: Vec<[[i32; 2]; 3]>,
}

fn default_true() -> bool {
    true
}

fn default_height() -> u8 {
    1
}

impl BlockDescriptor {
    fn air() -> Self {
        BlockDescriptor {
            id: AIR_ID,
            name: "air".to_string(),
            obstacle: false,
            transparent: true,
            liquid: false,
            invisible: true,
            volumetric: true,
            height: 1,
            animation: None,
            sprites: Vec::new(),
        }
    }

    fn undefined() -> Self {
        BlockDescriptor {
            id: u16::MAX,
            name: "undefined".to_string(),
            obstacle: true,
            transparent: false,
            liquid: false,
            invisible: false,
            volumetric: true,
            height: 1,
            animation: None,
            sprites: Vec::new(),
        }
    }

    pub fn sprite_origin(&self, variant: u8, face: usize) -> Option<IVec2> {
        self.sprites
            .get(variant as usize)
            .and_then(|faces| faces.get(face))
            .map(|[x, y]| IVec2::new(*x, *y))
    }
}

#[derive(Deserialize)]
struct RegistryFile {
    #[serde(default)]
    block: Vec<BlockDescriptor>,
}

#[derive(Debug, Clone)]
pub struct BlockRegistry {
    descriptors: FxHashMap<u16, BlockDescriptor>,
    undefined: BlockDescriptor,
}

impl BlockRegistry {
    /// The block table shipped with the engine.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_toml(BUILTIN_BLOCKS)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = toml::from_str(text)?;
        let mut descriptors = FxHashMap::default();
        descriptors.insert(AIR_ID, BlockDescriptor::air());

        for descriptor in file.block {
            if descriptor.id == AIR_ID {
                return Err(RegistryError::ReservedId(AIR_ID));
            }
            let id = descriptor.id;
            if descriptors.insert(id, descriptor).is_some() {
                return Err(RegistryError::Duplicate(id));
            }
        }

        tracing::debug!("Block registry loaded with {} kinds", descriptors.len());
        Ok(BlockRegistry {
            descriptors,
            undefined: BlockDescriptor::undefined(),
        })
    }

    /// Descriptor for `id`, or the `undefined` kind for unknown ids.
    pub fn get(&self, id: u16) -> &BlockDescriptor {
        self.descriptors.get(&id).unwrap_or(&self.undefined)
    }

    pub fn contains(&self, id: u16) -> bool {
        self.descriptors.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
