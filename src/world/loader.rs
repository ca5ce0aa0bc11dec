//! Write-behind chunk persistence
//!
//! Evicted chunks are handed to a worker thread so streaming never waits on
//! the disk. Loads still answer synchronously: a chunk whose save is still in
//! flight is served from memory, anything else goes to the wrapped store.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Sender, bounded};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::core::{Chunk, ChunkPos};
use crate::save::{ChunkStore, StoreError};

const QUEUE_CAPACITY: usize = 64;

enum Request {
    Save { pos: ChunkPos, generation: u64 },
    Flush(Sender<()>),
}

type InFlight = Arc<Mutex<FxHashMap<ChunkPos, (u64, Chunk)>>>;

/// Wraps a store so saves complete on a background thread.
pub struct BackgroundStore<S: ChunkStore + Send + 'static> {
    request_tx: Option<Sender<Request>>,
    in_flight: InFlight,
    inner: Arc<Mutex<S>>,
    failures: Arc<AtomicUsize>,
    worker: Option<JoinHandle<()>>,
    generation: u64,
}

impl<S: ChunkStore + Send + 'static> BackgroundStore<S> {
    pub fn new(store: S) -> Result<Self, StoreError> {
        let (request_tx, request_rx) = bounded::<Request>(QUEUE_CAPACITY);
        let in_flight: InFlight = Arc::new(Mutex::new(FxHashMap::default()));
        let inner = Arc::new(Mutex::new(store));
        let failures = Arc::new(AtomicUsize::new(0));

        let worker = {
            let in_flight = in_flight.clone();
            let inner = inner.clone();
            let failures = failures.clone();
            thread::Builder::new()
                .name("chunk-save".to_string())
                .spawn(move || {
                    while let Ok(request) = request_rx.recv() {
                        match request {
                            Request::Save { pos, generation } => {
                                let pending = in_flight
                                    .lock()
                                    .get(&pos)
                                    .filter(|(g, _)| *g == generation)
                                    .map(|(_, chunk)| chunk.clone());
                                // A newer save of the same chunk is queued behind us
                                let Some(chunk) = pending else { continue };

                                if let Err(e) = inner.lock().save(&chunk) {
                                    failures.fetch_add(1, Ordering::Relaxed);
                                    tracing::warn!("Failed to save chunk {:?}: {}", pos, e);
                                }

                                let mut in_flight = in_flight.lock();
                                if in_flight.get(&pos).is_some_and(|(g, _)| *g == generation) {
                                    in_flight.remove(&pos);
                                }
                            }
                            Request::Flush(ack) => {
                                let _ = ack.send(());
                            }
                        }
                    }
                })?
        };

        Ok(BackgroundStore {
            request_tx: Some(request_tx),
            in_flight,
            inner,
            failures,
            worker: Some(worker),
            generation: 0,
        })
    }

    /// Saves that failed on the worker since the store was created.
    pub fn failure_count(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn pending_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    fn sender(&self) -> Result<&Sender<Request>, StoreError> {
        self.request_tx.as_ref().ok_or(StoreError::Disconnected)
    }
}

impl<S: ChunkStore + Send + 'static> ChunkStore for BackgroundStore<S> {
    fn load(&mut self, pos: ChunkPos) -> Result<Option<Chunk>, StoreError> {
        if let Some((_, chunk)) = self.in_flight.lock().get(&pos) {
            let mut chunk = chunk.clone();
            chunk.modified = false;
            return Ok(Some(chunk));
        }
        self.inner.lock().load(pos)
    }

    fn save(&mut self, chunk: &Chunk) -> Result<(), StoreError> {
        self.generation += 1;
        let generation = self.generation;
        self.in_flight
            .lock()
            .insert(chunk.pos, (generation, chunk.clone()));

        self.sender()?
            .send(Request::Save { pos: chunk.pos, generation })
            .map_err(|_| StoreError::Disconnected)
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        let (ack_tx, ack_rx) = bounded(1);
        self.sender()?
            .send(Request::Flush(ack_tx))
            .map_err(|_| StoreError::Disconnected)?;
        ack_rx.recv().map_err(|_| StoreError::Disconnected)?;
        self.inner.lock().flush()
    }
}

impl<S: ChunkStore + Send + 'static> Drop for BackgroundStore<S> {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain the queue and exit
        self.request_tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Block, BlockRegistry, RelCoord};
    use crate::save::MemoryStore;

    fn modified_chunk(registry: &BlockRegistry, pos: ChunkPos, id: u16) -> Chunk {
        let mut chunk = Chunk::new(pos);
        chunk.set_block_modified(RelCoord { x: 0, y: 0, z: 0 }, Block::new(registry, id, 0));
        chunk
    }

    #[test]
    fn test_save_then_load_after_flush() {
        let registry = Arc::new(BlockRegistry::builtin().unwrap());
        let mut store = BackgroundStore::new(MemoryStore::new(registry.clone())).unwrap();
        let pos = ChunkPos::new(3, 3);

        store.save(&modified_chunk(&registry, pos, 5)).unwrap();
        store.flush().unwrap();
        assert_eq!(store.pending_count(), 0);
        assert_eq!(store.failure_count(), 0);

        let loaded = store.load(pos).unwrap().unwrap();
        assert_eq!(loaded.get_block(RelCoord { x: 0, y: 0, z: 0 }).id, 5);
        assert!(!loaded.modified);
    }

    #[test]
    fn test_latest_save_wins() {
        let registry = Arc::new(BlockRegistry::builtin().unwrap());
        let mut store = BackgroundStore::new(MemoryStore::new(registry.clone())).unwrap();
        let pos = ChunkPos::new(0, 1);

        store.save(&modified_chunk(&registry, pos, 2)).unwrap();
        store.save(&modified_chunk(&registry, pos, 7)).unwrap();
        // Served from memory or from the inner store, it is always the newest
        let loaded = store.load(pos).unwrap().unwrap();
        assert_eq!(loaded.get_block(RelCoord { x: 0, y: 0, z: 0 }).id, 7);

        store.flush().unwrap();
        let loaded = store.load(pos).unwrap().unwrap();
        assert_eq!(loaded.get_block(RelCoord { x: 0, y: 0, z: 0 }).id, 7);
    }

    #[test]
    fn test_unknown_chunk_is_absent() {
        let registry = Arc::new(BlockRegistry::builtin().unwrap());
        let mut store = BackgroundStore::new(MemoryStore::new(registry)).unwrap();
        assert!(store.load(ChunkPos::new(-9, 9)).unwrap().is_none());
    }
}
