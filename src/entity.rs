//! Dynamic occupants of the map
//!
//! An entity stands on an integer cube coordinate and carries a continuous
//! height plus a horizontal pixel offset inside that tile's footprint. Physics
//! moves the continuous state and reports when the integer cell changes, since
//! that invalidates visibility and light.

use glam::{IVec2, Vec2, Vec3};

use crate::constants::*;
use crate::core::{Coordinate, Side};
use crate::input::InputIntents;
use crate::utils::settings::PhysicsSettings;
use crate::world::map::Map;

pub type EntityId = u32;

/// Offset of a tile footprint's center, where a freshly placed entity stands.
pub const TILE_CENTER: Vec2 = Vec2::new(DIM2 as f32, DIM4 as f32);

const CEILING_GAP: f32 = 1e-3;

#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    /// Registry id used to draw the entity.
    pub kind: u16,
    /// Facing; also the sprite variant.
    pub variant: u8,
    /// Cells occupied upwards from `coord`.
    pub height: i32,
    pub coord: Coordinate,
    /// Continuous height in blocks.
    pub z: f32,
    pub velocity_z: f32,
    /// Pixel offset inside the tile's `DIM × DIM/2` footprint.
    pub offset: Vec2,
}

impl Entity {
    pub fn new(kind: u16, height: i32, coord: Coordinate) -> Self {
        Entity {
            id: 0,
            kind,
            variant: 0,
            height: height.max(1),
            coord,
            z: coord.z as f32,
            velocity_z: 0.0,
            offset: TILE_CENTER,
        }
    }

    pub fn player(coord: Coordinate) -> Self {
        Entity::new(PLAYER_ID, PLAYER_HEIGHT, coord)
    }

    /// Height above the occupied cell's floor.
    pub fn sub_z(&self) -> f32 {
        self.z - self.coord.z as f32
    }

    /// Continuous position in block units.
    pub fn position(&self) -> Vec3 {
        let delta = self.offset - TILE_CENTER;
        let row = self.coord.y as f32 + delta.y / DIM4 as f32;
        let column = self.coord.x as f32 + (self.coord.row_parity() * DIM2) as f32 / DIM as f32 + delta.x / DIM as f32;
        Vec3::new(column, row, self.z)
    }

    /// Pixel offset from the occupied tile's screen position, including
    /// the fraction of a block the entity floats above its cell.
    pub fn render_offset(&self) -> IVec2 {
        let delta = self.offset - TILE_CENTER;
        IVec2::new(delta.x.round() as i32, (delta.y - self.sub_z() * DIM2 as f32).round() as i32)
    }

    /// Cells covered by the entity's body, feet first.
    pub fn occupied(&self) -> impl Iterator<Item = Coordinate> + '_ {
        (0..self.height).map(move |h| Coordinate::new(self.coord.x, self.coord.y, self.coord.z + h))
    }

    fn supported(&self, map: &Map) -> bool {
        self.coord.z == 0 || map.is_obstacle(self.coord.below())
    }

    pub fn is_standing(&self, map: &Map) -> bool {
        self.velocity_z == 0.0 && self.sub_z() == 0.0 && self.supported(map)
    }

    /// Starts a jump if the entity stands on something.
    pub fn jump(&mut self, map: &Map, velocity: f32) -> bool {
        if self.is_standing(map) {
            self.velocity_z = velocity;
            true
        } else {
            false
        }
    }

    /// One physics step. Returns true if the occupied cell changed.
    pub fn update(&mut self, map: &Map, delta_ms: u32, intents: &InputIntents, physics: &PhysicsSettings) -> bool {
        if delta_ms >= physics.stall_threshold_ms {
            return false;
        }
        let dt = delta_ms as f32 / 1000.0;

        let mut changed = self.walk(map, dt, intents, physics.walk_speed);

        if intents.jump {
            self.jump(map, physics.jump_velocity);
        }

        if !self.is_standing(map) {
            self.velocity_z -= physics.gravity * dt;
            self.z += self.velocity_z * dt;
        }
        changed |= self.resolve_vertical(map);
        changed
    }

    fn resolve_vertical(&mut self, map: &Map) -> bool {
        let mut changed = false;

        while self.sub_z() < 0.0 && self.coord.z > 0 && !map.is_obstacle(self.coord.below()) {
            self.coord = self.coord.below();
            changed = true;
        }

        while self.sub_z() >= 1.0 && self.coord.z < CHUNK_Z - self.height {
            let head_above = Coordinate::new(self.coord.x, self.coord.y, self.coord.z + self.height);
            if map.is_obstacle(head_above) {
                break;
            }
            self.coord = self.coord.above();
            changed = true;
        }

        if self.sub_z() >= 1.0 {
            // Head against a ceiling or the top of the world
            self.z = self.coord.z as f32 + 1.0 - CEILING_GAP;
            self.velocity_z = self.velocity_z.min(0.0);
        }

        if self.velocity_z <= 0.0 && self.sub_z() <= 0.0 && self.supported(map) {
            self.velocity_z = 0.0;
            self.z = self.coord.z as f32;
        }
        changed
    }

    fn walk(&mut self, map: &Map, dt: f32, intents: &InputIntents, walk_speed: f32) -> bool {
        let direction = intents.direction();
        if direction == Vec2::ZERO {
            return false;
        }
        self.variant = facing_variant(direction);

        // Ground-plane rows are half as tall on screen as tiles are wide
        let step = direction * walk_speed * intents.sprint_factor.max(0.0) * dt * Vec2::new(1.0, 0.5);
        let moved = self.offset + step;

        let side = Side::from_tile_offset(moved.x.floor() as i32, moved.y.floor() as i32);
        if side == Side::Center {
            self.offset = moved;
            return false;
        }

        let target = self.coord.neighbor(side);
        let blocked = self.occupied().any(|cell| map.is_obstacle(cell.neighbor(side)));
        if blocked {
            return false;
        }

        let shift = (target.screen_position() - self.coord.screen_position()).as_vec2();
        self.offset = (moved - shift).clamp(Vec2::ZERO, Vec2::new((DIM - 1) as f32, (DIM2 - 1) as f32));
        self.coord = target;
        true
    }
}

/// Sprite variant for a walking direction: 1 south-west clockwise to 8 south.
pub fn facing_variant(direction: Vec2) -> u8 {
    const THRESHOLD: f32 = 0.38;
    let sx = if direction.x > THRESHOLD { 1 } else if direction.x < -THRESHOLD { -1 } else { 0 };
    let sy = if direction.y > THRESHOLD { 1 } else if direction.y < -THRESHOLD { -1 } else { 0 };
    match (sx, sy) {
        (-1, 1) => 1,
        (-1, 0) => 2,
        (-1, -1) => 3,
        (0, -1) => 4,
        (1, -1) => 5,
        (1, 0) => 6,
        (1, 1) => 7,
        _ => 8,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::{BlockRegistry, ChunkPos};
    use crate::save::NullStore;
    use crate::world::generator::EmptyGenerator;

    const TICK_MS: u32 = 10;

    fn empty_map() -> Map {
        let registry = Arc::new(BlockRegistry::builtin().unwrap());
        Map::new(registry, 3, ChunkPos::default(), &EmptyGenerator, &mut NullStore)
    }

    fn idle() -> InputIntents {
        InputIntents::default()
    }

    #[test]
    fn test_falls_over_air() {
        let map = empty_map();
        let physics = PhysicsSettings::default();
        let mut entity = Entity::player(Coordinate::new(2, 4, 5));

        for _ in 0..100 {
            entity.update(&map, TICK_MS, &idle(), &physics);
        }
        assert!(entity.z < 5.0);
        assert!(entity.coord.z < 5);
        assert!(entity.coord.z as f32 <= entity.z);
    }

    #[test]
    fn test_lands_in_crossing_tick() {
        let mut map = empty_map();
        let physics = PhysicsSettings::default();
        map.place(Coordinate::new(2, 4, 2), 3, 0);
        let mut entity = Entity::player(Coordinate::new(2, 4, 5));

        for _ in 0..200 {
            entity.update(&map, TICK_MS, &idle(), &physics);
            assert!(entity.coord.z >= 3);
            assert!(entity.sub_z() >= 0.0, "sank into the floor at z {}", entity.z);
        }
        assert_eq!(entity.coord.z, 3);
        assert_eq!(entity.z, 3.0);
        assert_eq!(entity.velocity_z, 0.0);
        assert!(entity.is_standing(&map));
    }

    #[test]
    fn test_stall_skips_physics() {
        let map = empty_map();
        let physics = PhysicsSettings::default();
        let mut entity = Entity::player(Coordinate::new(0, 0, 6));
        assert!(!entity.update(&map, 500, &idle(), &physics));
        assert_eq!(entity.z, 6.0);
        assert_eq!(entity.velocity_z, 0.0);
    }

    #[test]
    fn test_jump_only_when_standing() {
        let map = empty_map();
        let physics = PhysicsSettings::default();
        let mut entity = Entity::player(Coordinate::new(0, 0, 0));
        assert!(entity.is_standing(&map));

        let jump = InputIntents { jump: true, ..Default::default() };
        entity.update(&map, TICK_MS, &jump, &physics);
        assert!(entity.velocity_z > 0.0);
        assert!(entity.z > 0.0);

        // No double jump in mid air
        let airborne_velocity = entity.velocity_z;
        assert!(!entity.jump(&map, physics.jump_velocity));
        assert_eq!(entity.velocity_z, airborne_velocity);

        // Comes back down onto the ground plane
        for _ in 0..300 {
            entity.update(&map, TICK_MS, &idle(), &physics);
        }
        assert!(entity.is_standing(&map));
        assert_eq!(entity.coord.z, 0);
    }

    #[test]
    fn test_jump_crosses_voxels() {
        let map = empty_map();
        let physics = PhysicsSettings::default();
        let mut entity = Entity::player(Coordinate::new(0, 0, 0));
        let jump = InputIntents { jump: true, ..Default::default() };

        let mut crossings = 0;
        crossings += entity.update(&map, TICK_MS, &jump, &physics) as usize;
        for _ in 0..300 {
            crossings += entity.update(&map, TICK_MS, &idle(), &physics) as usize;
        }
        // v²/2g is above one block, so up and back down
        assert_eq!(crossings, 2);
    }

    #[test]
    fn test_ceiling_stops_jump() {
        let mut map = empty_map();
        let physics = PhysicsSettings::default();
        // Head is at z 1, so a block at z 2 caps the jump
        map.place(Coordinate::new(0, 0, 2), 3, 0);
        let mut entity = Entity::player(Coordinate::new(0, 0, 0));
        let jump = InputIntents { jump: true, ..Default::default() };

        let mut crossed = entity.update(&map, TICK_MS, &jump, &physics);
        for _ in 0..300 {
            crossed |= entity.update(&map, TICK_MS, &idle(), &physics);
            assert!(entity.sub_z() < 1.0);
        }
        assert!(!crossed);
        assert_eq!(entity.coord.z, 0);
    }

    #[test]
    fn test_walk_steps_into_neighbor() {
        let map = empty_map();
        let physics = PhysicsSettings::default();
        let start = Coordinate::new(3, 6, 0);
        let mut entity = Entity::player(start);
        let right = InputIntents { move_right: true, ..Default::default() };

        let mut changed = false;
        for _ in 0..40 {
            changed |= entity.update(&map, TICK_MS, &right, &physics);
        }
        assert!(changed);
        assert_eq!(entity.coord.y, start.y);
        assert!(entity.coord.x > start.x);
        assert_eq!(entity.variant, 6);
    }

    #[test]
    fn test_walk_blocked_by_obstacle() {
        let mut map = empty_map();
        let physics = PhysicsSettings::default();
        let start = Coordinate::new(3, 6, 0);
        map.place(start.neighbor(Side::Right), 20, 0);
        map.place(start.neighbor(Side::TopRight), 20, 0);
        map.place(start.neighbor(Side::BottomRight), 20, 0);
        let mut entity = Entity::player(start);
        let right = InputIntents { move_right: true, ..Default::default() };

        for _ in 0..100 {
            assert!(!entity.update(&map, TICK_MS, &right, &physics));
        }
        assert_eq!(entity.coord, start);
        assert_eq!(Side::from_tile_offset(entity.offset.x as i32, entity.offset.y as i32), Side::Center);
    }

    #[test]
    fn test_position_and_body() {
        let entity = Entity::player(Coordinate::new(3, 5, 2));
        // Odd rows sit half a tile to the right
        assert_eq!(entity.position(), Vec3::new(3.5, 5.0, 2.0));
        let body: Vec<_> = entity.occupied().collect();
        assert_eq!(body, vec![Coordinate::new(3, 5, 2), Coordinate::new(3, 5, 3)]);
    }

    #[test]
    fn test_facing_variants() {
        assert_eq!(facing_variant(Vec2::new(0.0, 1.0)), 8);
        assert_eq!(facing_variant(Vec2::new(-1.0, 0.0)), 2);
        assert_eq!(facing_variant(Vec2::new(0.7, -0.7)), 5);
    }
}
