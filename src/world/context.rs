//! The session object
//!
//! `WorldContext` owns the map, cameras and light engine together with the
//! chunk generator and store, and runs one frame at a time:
//!
//! 1. apply queued commands
//! 2. shift the map window if the primary viewport reached its border
//! 3. tick animated blocks
//! 4. tick entities
//! 5. update every camera
//! 6. raytrace, then light, if anything since the last pass owes it
//!
//! The first camera is the primary one: it drives streaming and visibility
//! and follows the player. Further cameras only get their own draw lists.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::camera::Camera;
use crate::constants::*;
use crate::core::{Block, BlockRegistry, ChunkPos, Coordinate};
use crate::entity::{Entity, EntityId};
use crate::input::InputIntents;
use crate::lighting::LightEngine;
use crate::render::{DrawEntry, RenderOrder};
use crate::save::ChunkStore;
use crate::utils::settings::{EngineSettings, PhysicsSettings};
use crate::world::generator::ChunkGenerator;
use crate::world::map::{Direction, Map};

/// Mutations requested between frames.
#[derive(Clone, Debug, PartialEq)]
pub enum WorldCommand {
    PlaceBlock { coord: Coordinate, id: u16, variant: u8 },
    RemoveBlock(Coordinate),
    SpawnEntity(Entity),
    RemoveEntity(EntityId),
    RequestRecalc,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub frame: u64,
    pub commands: usize,
    pub shifted: Option<Direction>,
    pub animated: usize,
    pub voxel_changed: bool,
    pub recalculated: bool,
    pub visible: usize,
}

pub struct WorldContext {
    registry: Arc<BlockRegistry>,
    pub map: Map,
    cameras: Vec<Camera>,
    pub light: LightEngine,
    generator: Box<dyn ChunkGenerator>,
    store: Box<dyn ChunkStore>,
    physics: PhysicsSettings,
    follow_player: bool,
    player: Option<EntityId>,
    recalc_requested: bool,
    commands: VecDeque<WorldCommand>,
    frame: u64,
}

impl WorldContext {
    pub fn new(
        registry: Arc<BlockRegistry>,
        settings: &EngineSettings,
        generator: Box<dyn ChunkGenerator>,
        mut store: Box<dyn ChunkStore>,
    ) -> Self {
        let map = Map::new(
            registry.clone(),
            settings.world.window_chunks,
            ChunkPos::default(),
            generator.as_ref(),
            store.as_mut(),
        );
        let mut camera = Camera::from_settings(&settings.camera);
        let (cx, cy) = map.center().block_origin();
        camera.center_on(Coordinate::new(cx + CHUNK_X / 2, cy + CHUNK_Y / 2, 0));

        WorldContext {
            registry,
            map,
            cameras: vec![camera],
            light: LightEngine::from_settings(&settings.lighting),
            generator,
            store,
            physics: settings.physics.clone(),
            follow_player: settings.camera.follow_player,
            player: None,
            recalc_requested: true,
            commands: VecDeque::new(),
            frame: 0,
        }
    }

    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.registry
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn queue(&mut self, command: WorldCommand) {
        self.commands.push_back(command);
    }

    pub fn request_recalc(&mut self) {
        self.recalc_requested = true;
    }

    pub fn is_recalc_requested(&self) -> bool {
        self.recalc_requested
    }

    /// The primary camera.
    pub fn camera(&self) -> &Camera {
        &self.cameras[0]
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.cameras[0]
    }

    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    pub fn camera_at_mut(&mut self, index: usize) -> Option<&mut Camera> {
        self.cameras.get_mut(index)
    }

    /// Adds a secondary viewport and returns its index.
    pub fn add_camera(&mut self, camera: Camera) -> usize {
        self.cameras.push(camera);
        self.recalc_requested = true;
        self.cameras.len() - 1
    }

    /// Spawns the controlled character standing on the surface of `(x, y)`.
    pub fn spawn_player(&mut self, x: i32, y: i32) -> EntityId {
        let id = self.map.spawn(Entity::player(self.map.surface(x, y)));
        self.player = Some(id);
        if self.follow_player {
            self.camera_mut().follow(Some(id));
        }
        self.recalc_requested = true;
        tracing::info!("Player {} spawned at {:?}", id, self.map.surface(x, y));
        id
    }

    pub fn player(&self) -> Option<&Entity> {
        self.player.and_then(|id| self.map.entity(id))
    }

    fn apply_command(&mut self, command: WorldCommand) {
        match command {
            WorldCommand::PlaceBlock { coord, id, variant } => {
                if self.map.place(coord, id, variant) {
                    self.recalc_requested = true;
                } else {
                    tracing::debug!("Ignoring placement outside the window at {:?}", coord);
                }
            }
            WorldCommand::RemoveBlock(coord) => {
                if self.map.set_block(coord, Block::air()) {
                    self.recalc_requested = true;
                }
            }
            WorldCommand::SpawnEntity(entity) => {
                self.map.spawn(entity);
                self.recalc_requested = true;
            }
            WorldCommand::RemoveEntity(id) => {
                if self.map.remove_entity(id).is_some() {
                    if self.player == Some(id) {
                        self.player = None;
                        self.camera_mut().follow(None);
                    }
                    self.recalc_requested = true;
                }
            }
            WorldCommand::RequestRecalc => self.recalc_requested = true,
        }
    }

    /// Advances the world by one frame of `delta_ms` milliseconds.
    pub fn frame(&mut self, delta_ms: u32, intents: &InputIntents) -> FrameReport {
        let mut report = FrameReport {
            frame: self.frame,
            ..Default::default()
        };

        while let Some(command) = self.commands.pop_front() {
            self.apply_command(command);
            report.commands += 1;
        }

        if let Some(direction) = self.camera().streaming_direction(&self.map) {
            self.map
                .set_center(direction, self.generator.as_ref(), self.store.as_mut());
            report.shifted = Some(direction);
            self.recalc_requested = true;
        }

        report.animated = self.map.tick_blocks(delta_ms);

        report.voxel_changed = self
            .map
            .tick_entities(delta_ms, self.player, intents, &self.physics);
        if report.voxel_changed {
            self.recalc_requested = true;
        }

        for camera in &mut self.cameras {
            if camera.update(&self.map) {
                self.recalc_requested = true;
            }
        }

        if self.recalc_requested {
            let stats = self.cameras[0].raytrace(&mut self.map);
            self.light.recalculate(&mut self.map);
            self.recalc_requested = false;
            report.recalculated = true;
            report.visible = stats.visible;
        }

        self.frame += 1;
        tracing::trace!("{:?}", report);
        report
    }

    /// Paint-ordered draw list for the primary camera.
    pub fn draw_list(&self) -> Vec<DrawEntry> {
        RenderOrder::build(&self.map, self.camera())
    }

    /// Draw list for the camera at `index`, or `None` if there is no such camera.
    pub fn draw_list_for(&self, index: usize) -> Option<Vec<DrawEntry>> {
        self.cameras
            .get(index)
            .map(|camera| RenderOrder::build(&self.map, camera))
    }

    /// Persists every modified chunk and waits for the store to settle.
    pub fn save_all(&mut self) -> usize {
        let saved = self.map.persist_all(self.store.as_mut());
        tracing::info!("Saved {} modified chunks", saved);
        saved
    }
}
