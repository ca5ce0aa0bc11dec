//! Chunk persistence
//!
//! The map talks to storage only through [`ChunkStore`]: `load` answers
//! `Ok(None)` when a chunk was never saved, and the map generates it instead.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::core::{BlockRegistry, Chunk, ChunkPos, SavedChunk};

const MAGIC_HEADER: &[u8; 4] = b"ISVC";
pub const CHUNK_FILE_EXTENSION: &str = "chunk";

/// Upper bound on an encoded chunk body. A full chunk of saved blocks is far
/// below this, so anything larger is a damaged length header.
pub const MAX_CHUNK_BODY: u64 = 1 << 20;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Encoding(#[from] bincode::Error),
    #[error("not a chunk file")]
    BadMagic,
    #[error("chunk body of {0} bytes exceeds the {MAX_CHUNK_BODY} byte limit")]
    Oversized(u64),
    #[error("chunk data for {0:?} is corrupt")]
    Corrupt(ChunkPos),
    #[error("storage worker has stopped")]
    Disconnected,
}

/// Load/save provider keyed by chunk position.
pub trait ChunkStore {
    fn load(&mut self, pos: ChunkPos) -> Result<Option<Chunk>, StoreError>;
    fn save(&mut self, chunk: &Chunk) -> Result<(), StoreError>;

    /// Blocks until every accepted save has reached its destination.
    fn flush(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

impl<S: ChunkStore + ?Sized> ChunkStore for Box<S> {
    fn load(&mut self, pos: ChunkPos) -> Result<Option<Chunk>, StoreError> {
        (**self).load(pos)
    }

    fn save(&mut self, chunk: &Chunk) -> Result<(), StoreError> {
        (**self).save(chunk)
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        (**self).flush()
    }
}

/// Magic header, little-endian body length, bincode body.
pub fn encode_chunk(chunk: &Chunk) -> Result<Vec<u8>, StoreError> {
    let body = bincode::serialize(&chunk.to_saved())?;
    let mut bytes = Vec::with_capacity(body.len() + 12);
    bytes.extend_from_slice(MAGIC_HEADER);
    bytes.extend_from_slice(&(body.len() as u64).to_le_bytes());
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

pub fn decode_chunk<R: Read>(reader: &mut R, registry: &BlockRegistry) -> Result<Chunk, StoreError> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC_HEADER {
        return Err(StoreError::BadMagic);
    }

    let mut size_bytes = [0u8; 8];
    reader.read_exact(&mut size_bytes)?;
    let size = u64::from_le_bytes(size_bytes);
    if size > MAX_CHUNK_BODY {
        return Err(StoreError::Oversized(size));
    }

    let mut data = Vec::with_capacity(size as usize);
    reader.take(size).read_to_end(&mut data)?;
    if data.len() as u64 != size {
        return Err(StoreError::Io(std::io::ErrorKind::UnexpectedEof.into()));
    }

    let saved: SavedChunk = bincode::deserialize(&data)?;
    let pos = ChunkPos::new(saved.cx, saved.cy);
    Chunk::from_saved(registry, saved).ok_or(StoreError::Corrupt(pos))
}

/// Never finds anything and forgets every save.
#[derive(Default)]
pub struct NullStore;

impl ChunkStore for NullStore {
    fn load(&mut self, _pos: ChunkPos) -> Result<Option<Chunk>, StoreError> {
        Ok(None)
    }

    fn save(&mut self, _chunk: &Chunk) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Keeps encoded chunks in memory for the lifetime of the session.
pub struct MemoryStore {
    registry: Arc<BlockRegistry>,
    chunks: FxHashMap<ChunkPos, Vec<u8>>,
}

impl MemoryStore {
    pub fn new(registry: Arc<BlockRegistry>) -> Self {
        MemoryStore {
            registry,
            chunks: FxHashMap::default(),
        }
    }

    pub fn contains(&self, pos: ChunkPos) -> bool {
        self.chunks.contains_key(&pos)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

impl ChunkStore for MemoryStore {
    fn load(&mut self, pos: ChunkPos) -> Result<Option<Chunk>, StoreError> {
        match self.chunks.get(&pos) {
            Some(bytes) => decode_chunk(&mut bytes.as_slice(), &self.registry).map(Some),
            None => Ok(None),
        }
    }

    fn save(&mut self, chunk: &Chunk) -> Result<(), StoreError> {
        self.chunks.insert(chunk.pos, encode_chunk(chunk)?);
        Ok(())
    }
}

/// One file per chunk inside a world directory.
pub struct FileStore {
    registry: Arc<BlockRegistry>,
    dir: PathBuf,
}

impl FileStore {
    pub fn open<P: AsRef<Path>>(dir: P, registry: Arc<BlockRegistry>) -> Result<Self, StoreError> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(FileStore {
            registry,
            dir: dir.as_ref().to_path_buf(),
        })
    }

    pub fn path_for(&self, pos: ChunkPos) -> PathBuf {
        self.dir
            .join(format!("{}_{}.{}", pos.x, pos.y, CHUNK_FILE_EXTENSION))
    }
}

impl ChunkStore for FileStore {
    fn load(&mut self, pos: ChunkPos) -> Result<Option<Chunk>, StoreError> {
        let path = self.path_for(pos);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut reader = BufReader::new(file);
        let chunk = decode_chunk(&mut reader, &self.registry)?;
        if chunk.pos != pos {
            return Err(StoreError::Corrupt(pos));
        }
        Ok(Some(chunk))
    }

    fn save(&mut self, chunk: &Chunk) -> Result<(), StoreError> {
        let path = self.path_for(chunk.pos);
        let tmp = path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            writer.write_all(&encode_chunk(chunk)?)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}
