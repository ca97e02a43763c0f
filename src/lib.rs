//! game-2048: a deterministic 2048 board engine
//!
//! This crate provides:
//! - A square `Grid` of side 2..=256 with the slide/merge rules (`engine` module)
//! - A `Game` session that runs the turn protocol: shift, score, spawn, game-over check (`game`)
//! - Best-score persistence behind a small trait (`store`)
//! - Replayable game records (`record`) and TOML settings (`config`)
//!
//! Quick start:
//! ```
//! use game_2048::engine::{Grid, Move};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! // Deterministic grid initialization with a seeded RNG
//! let mut rng = StdRng::seed_from_u64(42);
//! let g0 = Grid::new(4).unwrap().with_random_tile(&mut rng).with_random_tile(&mut rng);
//! let res = g0.shift(Move::Left);
//! assert_eq!(res.grid.tile_sum(), g0.tile_sum());
//! ```
//!
//! Full loop
//! ```
//! use game_2048::engine::Move;
//! use game_2048::game::Game;
//! use game_2048::store::{BestScore, MemoryStore};
//!
//! let mut game = Game::seeded(4, 123).unwrap();
//! let mut best = BestScore::open(MemoryStore::new()).unwrap();
//! for dir in Move::ALL.iter().cycle().take(64) {
//!     if game.is_over() {
//!         break;
//!     }
//!     if game.apply_turn(*dir).accepted {
//!         best.observe(game.score()).unwrap();
//!     }
//! }
//! assert_eq!(best.best(), game.score());
//! ```
//!
pub mod config;
pub mod engine;
pub mod game;
pub mod record;
pub mod store;
