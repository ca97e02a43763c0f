//! Best-score persistence.
//!
//! The engine itself never touches storage; a front end wraps a
//! [`BestScoreStore`] in [`BestScore`] and reports every new score to it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::Score;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("postcard error: {0}")]
    Postcard(#[from] postcard::Error),
}

/// Somewhere the best score survives between sessions.
pub trait BestScoreStore {
    /// Stored best score, 0 if nothing has been saved yet.
    fn load(&self) -> Result<Score, StoreError>;
    fn save(&mut self, best: Score) -> Result<(), StoreError>;
}

/// In-process store; nothing outlives the value.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    best: Score,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BestScoreStore for MemoryStore {
    fn load(&self) -> Result<Score, StoreError> {
        Ok(self.best)
    }

    fn save(&mut self, best: Score) -> Result<(), StoreError> {
        self.best = best;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct BestRecord {
    best: Score,
}

/// Postcard-encoded best score in a single file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        FileStore { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BestScoreStore for FileStore {
    fn load(&self) -> Result<Score, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let record: BestRecord = postcard::from_bytes(&bytes)?;
        Ok(record.best)
    }

    fn save(&mut self, best: Score) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let bytes = postcard::to_allocvec(&BestRecord { best })?;
        fs::write(&self.path, bytes)?;
        Ok(())
    }
}

/// Cached best score backed by a store; saves only on improvement.
///
/// ```
/// use game_2048::store::{BestScore, MemoryStore};
/// let mut best = BestScore::open(MemoryStore::new()).unwrap();
/// assert!(best.observe(120).unwrap());
/// assert!(!best.observe(80).unwrap());
/// assert_eq!(best.best(), 120);
/// ```
#[derive(Debug)]
pub struct BestScore<S> {
    store: S,
    best: Score,
}

impl<S: BestScoreStore> BestScore<S> {
    pub fn open(store: S) -> Result<Self, StoreError> {
        let best = store.load()?;
        Ok(BestScore { store, best })
    }

    #[inline]
    pub fn best(&self) -> Score {
        self.best
    }

    /// Record `score`; returns true if it beat the previous best.
    ///
    /// The cached value is raised even when saving fails, so the session keeps
    /// showing the right best score.
    pub fn observe(&mut self, score: Score) -> Result<bool, StoreError> {
        if score <= self.best {
            return Ok(false);
        }
        self.best = score;
        self.store.save(score)?;
        Ok(true)
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_zero() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("best.bin"));
        assert_eq!(store.load().unwrap(), 0);
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("best.bin");
        {
            let mut best = BestScore::open(FileStore::new(&path)).unwrap();
            assert!(best.observe(2048).unwrap());
            assert!(!best.observe(1024).unwrap());
        }
        let reopened = BestScore::open(FileStore::new(&path)).unwrap();
        assert_eq!(reopened.best(), 2048);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("best.bin");
        fs::write(&path, b"").unwrap();
        assert!(matches!(FileStore::new(&path).load(), Err(StoreError::Postcard(_))));
    }

    #[test]
    fn equal_score_does_not_save() {
        let mut best = BestScore::open(MemoryStore { best: 64 }).unwrap();
        assert!(!best.observe(64).unwrap());
        assert!(best.observe(65).unwrap());
        assert_eq!(best.store().load().unwrap(), 65);
    }
}
