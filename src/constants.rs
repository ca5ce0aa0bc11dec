// Tile geometry (screen pixels)
pub const DIM: i32 = 160;
pub const DIM2: i32 = DIM / 2;
pub const DIM4: i32 = DIM / 4;

// Chunk extents in blocks
pub const CHUNK_X: i32 = 10;
pub const CHUNK_Y: i32 = 40;
pub const CHUNK_Z: i32 = 10;
pub const BLOCKS_PER_CHUNK: usize = (CHUNK_X * CHUNK_Y * CHUNK_Z) as usize;

// Streaming window, chunks per side (odd)
pub const WINDOW_CHUNKS: i32 = 3;

// Light levels
pub const LIGHT_MAX: u8 = 100;
pub const LIGHT_DEFAULT: u8 = 50;
pub const AMBIENT_LIGHT: u8 = 100;

// Physics
pub const GRAVITY: f32 = 9.81;
pub const STALL_THRESHOLD_MS: u32 = 500;
pub const JUMP_VELOCITY: f32 = 5.0;
pub const WALK_SPEED: f32 = 400.0;

// Registry ids with engine meaning
pub const AIR_ID: u16 = 0;
pub const PLAYER_ID: u16 = 40;
pub const PLAYER_HEIGHT: i32 = 2;
