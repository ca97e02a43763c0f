//! Game session: owns the grid, score and status, and runs the turn protocol.
//!
//! A turn is applied as one unit: the next grid is fully computed (shift,
//! spawn, terminal check) before it replaces the current one, so callers never
//! observe a half-updated board.

use log::{debug, info, trace};
use rand::{rngs::StdRng, SeedableRng};

use crate::engine::{EngineError, Grid, Move, Score, Spawn, TileSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Active,
    Over,
}

/// What a single call to [`Game::apply_turn`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Turn {
    /// False when the move changed nothing or the game was already over.
    pub accepted: bool,
    pub score_delta: Score,
    /// Tile placed after an accepted move.
    pub spawned: Option<Spawn>,
    pub score: Score,
    pub status: Status,
}

/// One game of 2048 driven by an injectable random source.
///
/// ```
/// use game_2048::engine::Move;
/// use game_2048::game::{Game, Status};
///
/// let mut game = Game::seeded(4, 42).unwrap();
/// assert_eq!(game.grid().count_empty(), 14);
/// let turn = game.apply_turn(Move::Left);
/// assert_eq!(turn.score, game.score());
/// assert_eq!(game.status(), Status::Active);
/// ```
#[derive(Debug, Clone)]
pub struct Game<S = StdRng> {
    grid: Grid,
    score: Score,
    status: Status,
    moves: u64,
    source: S,
}

impl Game<StdRng> {
    /// Deterministic game: the same `seed` and moves always give the same boards.
    pub fn seeded(size: usize, seed: u64) -> Result<Self, EngineError> {
        Game::new(size, StdRng::seed_from_u64(seed))
    }
}

impl<S: TileSource> Game<S> {
    /// Empty `size`x`size` grid with two spawned tiles, score 0.
    pub fn new(size: usize, source: S) -> Result<Self, EngineError> {
        let mut game = Game {
            grid: Grid::new(size)?,
            score: 0,
            status: Status::Active,
            moves: 0,
            source,
        };
        game.populate();
        Ok(game)
    }

    /// Start over on a fresh grid of the same size, keeping the random source.
    pub fn restart(&mut self) {
        self.grid.clear();
        self.score = 0;
        self.moves = 0;
        self.populate();
    }

    fn populate(&mut self) {
        self.grid.spawn_tile(&mut self.source);
        self.grid.spawn_tile(&mut self.source);
        // Two spawns leave at least two empty cells on any valid size.
        self.status = if self.grid.is_terminal() { Status::Over } else { Status::Active };
        info!("new {0}x{0} game", self.grid.size());
    }

    /// Run one turn: shift, and if the grid changed, score, spawn and check for game over.
    ///
    /// A move that changes nothing is rejected without consuming a spawn.
    pub fn apply_turn(&mut self, dir: Move) -> Turn {
        if self.status == Status::Over {
            trace!("ignoring {dir}: game is over");
            return self.rejected();
        }
        let result = self.grid.shift(dir);
        if !result.changed {
            trace!("ignoring {dir}: nothing moves");
            return self.rejected();
        }

        let mut next = result.grid;
        let spawned = next.spawn_tile(&mut self.source);
        let status = if next.is_terminal() { Status::Over } else { Status::Active };

        self.grid = next;
        self.score = self.score.saturating_add(result.score_delta);
        self.status = status;
        self.moves += 1;
        debug!("{dir}: +{} (score {})", result.score_delta, self.score);
        if status == Status::Over {
            info!(
                "game over after {} moves: score {}, highest tile {}",
                self.moves,
                self.score,
                self.grid.highest_tile()
            );
        }

        Turn {
            accepted: true,
            score_delta: result.score_delta,
            spawned,
            score: self.score,
            status,
        }
    }

    /// Apply a turn from a raw key name. Unknown keys are ignored and return `None`.
    pub fn apply_key(&mut self, key: &str) -> Option<Turn> {
        match Move::from_key(key) {
            Some(dir) => Some(self.apply_turn(dir)),
            None => {
                trace!("ignoring unknown key {key:?}");
                None
            }
        }
    }

    fn rejected(&self) -> Turn {
        Turn {
            accepted: false,
            score_delta: 0,
            spawned: None,
            score: self.score,
            status: self.status,
        }
    }

    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[inline]
    pub fn score(&self) -> Score {
        self.score
    }

    #[inline]
    pub fn status(&self) -> Status {
        self.status
    }

    #[inline]
    pub fn is_over(&self) -> bool {
        self.status == Status::Over
    }

    /// Number of accepted moves since the last (re)start.
    #[inline]
    pub fn moves(&self) -> u64 {
        self.moves
    }
}
