//! The pluggable edit-delta persistence interface and the built-in disk
//! backend.
//!
//! Saves are synchronous boolean calls; loads are decoupled from disk or
//! network latency by answering through a channel of [`ChunkChanges`]
//! records that the volume drains on its tick. A missing save is "no edits",
//! never an error.

use std::path::{Path, PathBuf};

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::chunk::ChunkKey;

/// A loaded delta payload on its way back to the owning chunk.
#[derive(Clone, Debug)]
pub struct ChunkChanges {
    /// Identifier of the volume the chunk belongs to.
    pub volume_id: String,
    /// Chunk-lattice position.
    pub position: ChunkKey,
    /// Raw delta bytes (possibly empty: "no edits on file").
    pub data: Vec<u8>,
}

/// Sender half used by persisters to deliver loaded deltas.
pub type ChangesSender = Sender<ChunkChanges>;
/// Receiver half drained by the volume each tick.
pub type ChangesReceiver = Receiver<ChunkChanges>;

/// Creates the delivery channel pair shared by a volume and its persister.
pub fn changes_channel() -> (ChangesSender, ChangesReceiver) {
    unbounded()
}

/// Stores and retrieves per-chunk edit deltas.
///
/// One persister instance is bound per volume. Implementations may batch
/// multiple chunk loads into a single backend request; each answered chunk
/// is delivered as its own [`ChunkChanges`] record.
pub trait VoxelDataPersister: Send + Sync {
    /// Readiness gate, polled every tick until the backend is usable.
    fn is_ready(&self) -> bool;

    /// Persists `data` for one chunk. Returns `false` on backend failure.
    fn save_chunk(&self, volume_id: &str, position: ChunkKey, data: &[u8]) -> bool;

    /// Requests an asynchronous load of one chunk's delta.
    ///
    /// Returns `false` only when the request itself could not be issued; a
    /// chunk with no stored edits is a successful load that delivers nothing.
    fn load_chunk(&self, volume_id: &str, position: ChunkKey) -> bool;
}

/// One-file-per-chunk persister rooted at a base directory.
pub struct DiskPersister {
    base: PathBuf,
    delivery: ChangesSender,
}

impl DiskPersister {
    /// Creates the persister, ensuring the base directory exists.
    pub fn new(base: impl Into<PathBuf>, delivery: ChangesSender) -> std::io::Result<Self> {
        let base = base.into();
        std::fs::create_dir_all(&base)?;
        Ok(Self { base, delivery })
    }

    fn chunk_path(&self, volume_id: &str, (x, y, z): ChunkKey) -> PathBuf {
        self.base.join(format!("{volume_id}_{x}_{y}_{z}.chunk"))
    }

    /// The directory chunk files are written under.
    pub fn base(&self) -> &Path {
        &self.base
    }
}

impl VoxelDataPersister for DiskPersister {
    fn is_ready(&self) -> bool {
        true
    }

    fn save_chunk(&self, volume_id: &str, position: ChunkKey, data: &[u8]) -> bool {
        let path = self.chunk_path(volume_id, position);
        match std::fs::write(&path, data) {
            Ok(()) => {
                tracing::debug!(?position, bytes = data.len(), "saved chunk delta");
                true
            }
            Err(error) => {
                tracing::error!(?position, %error, "failed to save chunk delta");
                false
            }
        }
    }

    fn load_chunk(&self, volume_id: &str, position: ChunkKey) -> bool {
        let path = self.chunk_path(volume_id, position);
        if !path.exists() {
            // No edits on file.
            return true;
        }
        match std::fs::read(&path) {
            Ok(data) => self
                .delivery
                .send(ChunkChanges {
                    volume_id: volume_id.to_owned(),
                    position,
                    data,
                })
                .is_ok(),
            Err(error) => {
                tracing::error!(?position, %error, "failed to load chunk delta");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_then_load_delivers_bytes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (tx, rx) = changes_channel();
        let persister = DiskPersister::new(dir.path(), tx).expect("create persister");

        let payload = vec![1u8, 2, 3, 4];
        assert!(persister.save_chunk("world", (1, -2, 3), &payload));
        assert!(persister.load_chunk("world", (1, -2, 3)));

        let delivered = rx.try_recv().expect("delta delivered");
        assert_eq!(delivered.volume_id, "world");
        assert_eq!(delivered.position, (1, -2, 3));
        assert_eq!(delivered.data, payload);
    }

    #[test]
    fn test_missing_save_is_success_without_delivery() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (tx, rx) = changes_channel();
        let persister = DiskPersister::new(dir.path(), tx).expect("create persister");

        assert!(persister.load_chunk("world", (9, 9, 9)));
        assert!(rx.try_recv().is_err(), "no edits means no delivery");
    }

    #[test]
    fn test_volumes_do_not_collide() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (tx, rx) = changes_channel();
        let persister = DiskPersister::new(dir.path(), tx).expect("create persister");

        assert!(persister.save_chunk("alpha", (0, 0, 0), &[1]));
        assert!(persister.save_chunk("beta", (0, 0, 0), &[2]));

        assert!(persister.load_chunk("alpha", (0, 0, 0)));
        let delivered = rx.try_recv().expect("delta delivered");
        assert_eq!(delivered.data, vec![1]);
    }
}
