//! Game records: seed plus accepted moves, enough to rebuild any game exactly.
//!
//! File layout: 4-byte magic, postcard-encoded [`GameRecord`], then a CRC32C
//! (little-endian) of everything before it.

use std::fs;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::engine::{EngineError, Move, Score, Tile, TileSource};
use crate::game::Game;

const MAGIC: &[u8; 4] = b"G2R1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub size: usize,
    pub seed: u64,
    /// Accepted moves only, in play order.
    pub moves: Vec<Move>,
    pub final_score: Score,
    pub highest_tile: Tile,
    pub started_unix_s: u64,
}

#[derive(thiserror::Error, Debug)]
pub enum RecordError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("postcard error: {0}")]
    Postcard(#[from] postcard::Error),
    #[error("invalid record: {0}")]
    Engine(#[from] EngineError),
    #[error("bad magic")]
    Magic,
    #[error("file too short or malformed")]
    Malformed,
    #[error("checksum mismatch")]
    Checksum,
    #[error("replay diverged: recorded score {recorded}, replayed {replayed}")]
    Diverged { recorded: Score, replayed: Score },
}

impl GameRecord {
    pub fn new(size: usize, seed: u64) -> Self {
        GameRecord {
            size,
            seed,
            moves: Vec::new(),
            final_score: 0,
            highest_tile: 0,
            started_unix_s: now_unix_seconds(),
        }
    }

    pub fn push(&mut self, dir: Move) {
        self.moves.push(dir);
    }

    /// Copy the summary fields from the live game.
    pub fn finish<S: TileSource>(&mut self, game: &Game<S>) {
        self.final_score = game.score();
        self.highest_tile = game.grid().highest_tile();
    }

    /// Replay the record and check the final score matches.
    pub fn verify(&self) -> Result<Game<StdRng>, RecordError> {
        let game = replay(self)?;
        if game.score() != self.final_score {
            return Err(RecordError::Diverged { recorded: self.final_score, replayed: game.score() });
        }
        Ok(game)
    }
}

/// Rebuild the game by replaying every recorded move on a freshly seeded game.
///
/// ```
/// use game_2048::engine::Move;
/// use game_2048::game::Game;
/// use game_2048::record::{replay, GameRecord};
///
/// let mut game = Game::seeded(4, 7).unwrap();
/// let mut rec = GameRecord::new(4, 7);
/// for dir in [Move::Left, Move::Up, Move::Right, Move::Down] {
///     if game.apply_turn(dir).accepted {
///         rec.push(dir);
///     }
/// }
/// rec.finish(&game);
/// assert_eq!(replay(&rec).unwrap().grid(), game.grid());
/// ```
pub fn replay(record: &GameRecord) -> Result<Game<StdRng>, RecordError> {
    let mut game = Game::seeded(record.size, record.seed)?;
    for &dir in &record.moves {
        game.apply_turn(dir);
    }
    Ok(game)
}

pub fn encode(record: &GameRecord) -> Result<Vec<u8>, RecordError> {
    let mut buf = MAGIC.to_vec();
    buf.extend_from_slice(&postcard::to_allocvec(record)?);
    let checksum = crc32c::crc32c(&buf);
    buf.extend_from_slice(&checksum.to_le_bytes());
    Ok(buf)
}

pub fn decode(bytes: &[u8]) -> Result<GameRecord, RecordError> {
    if bytes.len() < MAGIC.len() + 4 {
        return Err(RecordError::Malformed);
    }
    let (content, trailer) = bytes.split_at(bytes.len() - 4);
    let file_crc = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    if crc32c::crc32c(content) != file_crc {
        return Err(RecordError::Checksum);
    }
    if &content[..4] != MAGIC {
        return Err(RecordError::Magic);
    }
    Ok(postcard::from_bytes(&content[4..])?)
}

pub fn write_to_path<P: AsRef<Path>>(path: P, record: &GameRecord) -> Result<(), RecordError> {
    let bytes = encode(record)?;
    fs::write(path, bytes)?;
    Ok(())
}

pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<GameRecord, RecordError> {
    let bytes = fs::read(path)?;
    decode(&bytes)
}

pub fn now_unix_seconds() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}
