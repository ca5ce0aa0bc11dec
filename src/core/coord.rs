//! Coordinate spaces of the isometric grid
//!
//! Absolute cube coordinates, chunk-relative coordinates and screen pixels.
//! Rows are staggered: odd `y` rows are shifted half a tile to the right, and
//! two rows make up one tile height on screen.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::constants::*;

/// Absolute integer position of one voxel.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// Position of a chunk in the chunk grid. Chunks tile the x/y plane only.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub y: i32,
}

/// Position of a block inside its chunk.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct RelCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, y: i32) -> Self {
        ChunkPos { x, y }
    }

    /// Absolute x/y of the chunk's first block.
    pub fn block_origin(self) -> (i32, i32) {
        (self.x * CHUNK_X, self.y * CHUNK_Y)
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        ChunkPos::new(self.x + dx, self.y + dy)
    }
}

impl RelCoord {
    pub fn is_inside(self) -> bool {
        (0..CHUNK_X).contains(&self.x) && (0..CHUNK_Y).contains(&self.y) && (0..CHUNK_Z).contains(&self.z)
    }

    /// Flat index into a chunk's block array (x fastest, then y, then z).
    pub fn index(self) -> usize {
        (self.z * CHUNK_X * CHUNK_Y + self.y * CHUNK_X + self.x) as usize
    }

    pub fn from_index(index: usize) -> Self {
        let i = index as i32;
        RelCoord {
            x: i % CHUNK_X,
            y: (i / CHUNK_X) % CHUNK_Y,
            z: i / (CHUNK_X * CHUNK_Y),
        }
    }
}

impl Coordinate {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Coordinate { x, y, z }
    }

    /// Splits the coordinate into its chunk and the position inside that chunk.
    /// Division rounds towards negative infinity.
    pub fn to_chunk_relative(self) -> (ChunkPos, RelCoord) {
        let chunk = ChunkPos::new(self.x.div_euclid(CHUNK_X), self.y.div_euclid(CHUNK_Y));
        let rel = RelCoord {
            x: self.x.rem_euclid(CHUNK_X),
            y: self.y.rem_euclid(CHUNK_Y),
            z: self.z,
        };
        (chunk, rel)
    }

    pub fn from_chunk_relative(chunk: ChunkPos, rel: RelCoord) -> Self {
        let (ox, oy) = chunk.block_origin();
        Coordinate::new(ox + rel.x, oy + rel.y, rel.z)
    }

    pub fn chunk(self) -> ChunkPos {
        self.to_chunk_relative().0
    }

    pub fn above(self) -> Self {
        Coordinate::new(self.x, self.y, self.z + 1)
    }

    pub fn below(self) -> Self {
        Coordinate::new(self.x, self.y, self.z - 1)
    }

    /// 1 for odd rows, 0 for even rows (negative rows included).
    pub fn row_parity(self) -> i32 {
        self.y.rem_euclid(2)
    }

    /// Top-left pixel of the tile's top face on screen.
    pub fn screen_position(self) -> IVec2 {
        IVec2::new(
            self.x * DIM + self.row_parity() * DIM2,
            self.y * DIM4 - self.z * DIM2,
        )
    }

    /// The tile on the screen-adjacent `side`, same height.
    pub fn neighbor(self, side: Side) -> Self {
        let odd = self.row_parity();
        let even = 1 - odd;
        let (dx, dy) = match side {
            Side::Top => (0, -2),
            Side::TopRight => (odd, -1),
            Side::Right => (1, 0),
            Side::BottomRight => (odd, 1),
            Side::Bottom => (0, 2),
            Side::BottomLeft => (-even, 1),
            Side::Left => (-1, 0),
            Side::TopLeft => (-even, -1),
            Side::Center => (0, 0),
        };
        Coordinate::new(self.x + dx, self.y + dy, self.z)
    }

    /// Resolves a screen pixel to the tile whose top face contains it, assuming
    /// the tile lies at height `z`.
    pub fn from_screen(px: i32, py: i32, z: i32) -> Self {
        let py = py + z * DIM2;
        let x = px.div_euclid(DIM);
        let y = py.div_euclid(DIM2) * 2;
        let local_x = px - x * DIM;
        let local_y = py - y * DIM4;
        Coordinate::new(x, y, z).neighbor(Side::from_tile_offset(local_x, local_y))
    }
}

/// Screen-adjacent tiles, clockwise from the top. `Center` is the tile itself.
///
/// ```text
/// 7 0 1
/// 6 8 2
/// 5 4 3
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Side {
    Top = 0,
    TopRight = 1,
    Right = 2,
    BottomRight = 3,
    Bottom = 4,
    BottomLeft = 5,
    Left = 6,
    TopLeft = 7,
    Center = 8,
}

impl Side {
    pub const NEIGHBORS: [Side; 8] = [
        Side::Top,
        Side::TopRight,
        Side::Right,
        Side::BottomRight,
        Side::Bottom,
        Side::BottomLeft,
        Side::Left,
        Side::TopLeft,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Side> {
        match index {
            8 => Some(Side::Center),
            i => Side::NEIGHBORS.get(i as usize).copied(),
        }
    }

    /// Classifies a pixel of a tile's `DIM × DIM/2` bounding box into the
    /// region of the neighbor it belongs to. Pixels inside the diamond give
    /// `Center`. Vertical offsets are doubled so the diamond becomes a square.
    pub fn from_tile_offset(px: i32, py: i32) -> Side {
        let y = py * 2;
        let mut side = Side::Center;
        if px + y <= DIM2 {
            side = Side::TopLeft;
        }
        if px - y >= DIM2 {
            side = if side == Side::TopLeft { Side::Top } else { Side::TopRight };
        }
        if px + y >= 3 * DIM2 {
            side = if side == Side::TopRight { Side::Right } else { Side::BottomRight };
        }
        if y - px >= DIM2 {
            side = match side {
                Side::BottomRight => Side::Bottom,
                Side::TopLeft => Side::Left,
                _ => Side::BottomLeft,
            };
        }
        side
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_relative_roundtrip() {
        for x in -25..25 {
            for y in -85..85 {
                for z in [0, 3, CHUNK_Z - 1] {
                    let c = Coordinate::new(x, y, z);
                    let (chunk, rel) = c.to_chunk_relative();
                    assert!(rel.is_inside(), "{:?} -> {:?}", c, rel);
                    assert_eq!(Coordinate::from_chunk_relative(chunk, rel), c);
                }
            }
        }
    }

    #[test]
    fn test_negative_coordinates_floor() {
        let (chunk, rel) = Coordinate::new(-1, -1, 0).to_chunk_relative();
        assert_eq!(chunk, ChunkPos::new(-1, -1));
        assert_eq!(rel.x, CHUNK_X - 1);
        assert_eq!(rel.y, CHUNK_Y - 1);

        let (chunk, rel) = Coordinate::new(-CHUNK_X, 0, 0).to_chunk_relative();
        assert_eq!(chunk, ChunkPos::new(-1, 0));
        assert_eq!(rel.x, 0);
    }

    #[test]
    fn test_rel_index_roundtrip() {
        for index in [0, 1, 57, BLOCKS_PER_CHUNK - 1] {
            assert_eq!(RelCoord::from_index(index).index(), index);
        }
    }

    #[test]
    fn test_screen_position() {
        assert_eq!(Coordinate::new(0, 0, 0).screen_position(), IVec2::new(0, 0));
        assert_eq!(Coordinate::new(2, 1, 0).screen_position(), IVec2::new(2 * DIM + DIM2, DIM4));
        assert_eq!(Coordinate::new(0, 0, 1).screen_position(), IVec2::new(0, -DIM2));
        // odd negative rows are shifted too
        assert_eq!(Coordinate::new(0, -1, 0).screen_position(), IVec2::new(DIM2, -DIM4));
    }

    #[test]
    fn test_neighbors_are_screen_adjacent() {
        for origin in [Coordinate::new(4, 4, 0), Coordinate::new(4, 5, 0)] {
            let base = origin.screen_position();
            let expect = [
                (Side::Top, IVec2::new(0, -DIM2)),
                (Side::TopRight, IVec2::new(DIM2, -DIM4)),
                (Side::Right, IVec2::new(DIM, 0)),
                (Side::BottomRight, IVec2::new(DIM2, DIM4)),
                (Side::Bottom, IVec2::new(0, DIM2)),
                (Side::BottomLeft, IVec2::new(-DIM2, DIM4)),
                (Side::Left, IVec2::new(-DIM, 0)),
                (Side::TopLeft, IVec2::new(-DIM2, -DIM4)),
            ];
            for (side, delta) in expect {
                assert_eq!(origin.neighbor(side).screen_position() - base, delta, "{:?}", side);
            }
            assert_eq!(origin.neighbor(Side::Center), origin);
        }
    }

    #[test]
    fn test_side_from_tile_offset() {
        assert_eq!(Side::from_tile_offset(DIM2, DIM4), Side::Center);
        assert_eq!(Side::from_tile_offset(2, 2), Side::TopLeft);
        assert_eq!(Side::from_tile_offset(DIM - 2, 2), Side::TopRight);
        assert_eq!(Side::from_tile_offset(DIM - 2, DIM2 - 2), Side::BottomRight);
        assert_eq!(Side::from_tile_offset(2, DIM2 - 2), Side::BottomLeft);
        // corners where two regions meet
        assert_eq!(Side::from_tile_offset(DIM2, 0), Side::Top);
        assert_eq!(Side::from_tile_offset(0, DIM4), Side::Left);
        assert_eq!(Side::from_tile_offset(DIM, DIM4), Side::Right);
    }

    #[test]
    fn test_side_index_roundtrip() {
        for i in 0..=8 {
            assert_eq!(Side::from_index(i).map(Side::index), Some(i));
        }
        assert_eq!(Side::from_index(9), None);
    }

    #[test]
    fn test_from_screen_picks_tile() {
        for c in [Coordinate::new(3, 5, 0), Coordinate::new(2, 4, 0), Coordinate::new(-3, -7, 2)] {
            let center = c.screen_position() + IVec2::new(DIM2, DIM4);
            assert_eq!(Coordinate::from_screen(center.x, center.y, c.z), c);
        }
    }
}
