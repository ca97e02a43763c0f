use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{info, warn};

use game_2048::config::Config;
use game_2048::engine::{Move, Score, TileSource};
use game_2048::game::{Game, Status};
use game_2048::record::{self, GameRecord};
use game_2048::store::{BestScore, BestScoreStore, FileStore, MemoryStore, StoreError};

#[derive(Debug, Parser)]
#[command(name = "game-2048", version, about = "Play 2048 in the terminal")]
struct Args {
    #[command(subcommand)]
    cmd: Option<Cmd>,

    /// TOML settings file (size, seed, best_score_path)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Board side length (overrides config)
    #[arg(long, value_name = "N")]
    size: Option<usize>,

    /// Seed for the first game (overrides config)
    #[arg(long, value_name = "N")]
    seed: Option<u64>,

    /// Persist the best score to this file (overrides config)
    #[arg(long, value_name = "FILE")]
    best_file: Option<PathBuf>,

    /// Write a replayable record of the last game played to this path
    #[arg(long, value_name = "FILE")]
    record: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Replay a recorded game and print the final board
    Replay {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
}

/// Either store, chosen at startup.
enum AnyStore {
    Memory(MemoryStore),
    File(FileStore),
}

impl BestScoreStore for AnyStore {
    fn load(&self) -> Result<Score, StoreError> {
        match self {
            AnyStore::Memory(s) => s.load(),
            AnyStore::File(s) => s.load(),
        }
    }

    fn save(&mut self, best: Score) -> Result<(), StoreError> {
        match self {
            AnyStore::Memory(s) => s.save(best),
            AnyStore::File(s) => s.save(best),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    if let Some(Cmd::Replay { path }) = &args.cmd {
        return replay(path);
    }

    let mut cfg = match &args.config {
        Some(path) => Config::from_toml(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(size) = args.size {
        cfg.size = size;
    }
    if args.seed.is_some() {
        cfg.seed = args.seed;
    }
    if args.best_file.is_some() {
        cfg.best_score_path = args.best_file.clone();
    }
    cfg.validate()?;

    let store = match &cfg.best_score_path {
        Some(path) => AnyStore::File(FileStore::new(path)),
        None => AnyStore::Memory(MemoryStore::new()),
    };
    let mut best = BestScore::open(store).context("loading best score")?;
    play(&cfg, &mut best, args.record.as_deref())
}

fn play(cfg: &Config, best: &mut BestScore<AnyStore>, record_path: Option<&Path>) -> anyhow::Result<()> {
    let mut seed = cfg.seed.unwrap_or_else(rand::random);
    let mut game = Game::seeded(cfg.size, seed)?;
    let mut rec = GameRecord::new(cfg.size, seed);
    info!("seed {seed}");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        render(&game, best.best());
        if game.status() == Status::Over {
            println!("Game Over! [n] new game, [q] quit");
        } else {
            println!("Move with w/a/s/d or up/down/left/right, [n] new game, [q] quit");
        }
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let line = line?;
        match line.trim() {
            "q" | "quit" => break,
            "n" | "new" => {
                save_record(record_path, &mut rec, &game);
                seed = rand::random();
                game = Game::seeded(cfg.size, seed)?;
                rec = GameRecord::new(cfg.size, seed);
                info!("seed {seed}");
            }
            key => {
                let Some(dir) = Move::from_key(key) else { continue };
                let turn = game.apply_turn(dir);
                if !turn.accepted {
                    continue;
                }
                rec.push(dir);
                if turn.score_delta > 0 {
                    println!("+{}", turn.score_delta);
                }
                if let Err(e) = best.observe(turn.score) {
                    warn!("could not save best score: {e}");
                }
            }
        }
    }
    save_record(record_path, &mut rec, &game);
    Ok(())
}

fn save_record<S: TileSource>(path: Option<&Path>, rec: &mut GameRecord, game: &Game<S>) {
    let Some(path) = path else { return };
    if rec.moves.is_empty() {
        return;
    }
    rec.finish(game);
    if let Err(e) = record::write_to_path(path, rec) {
        warn!("failed to write record to {}: {e}", path.display());
    }
}

fn render<S: TileSource>(game: &Game<S>, best: Score) {
    println!();
    println!("Score: {}  Best: {}", game.score(), best);
    print!("{}", game.grid());
}

fn replay(path: &Path) -> anyhow::Result<()> {
    let rec = record::read_from_path(path).with_context(|| format!("reading {}", path.display()))?;
    let game = rec.verify()?;
    println!(
        "{}x{} game, seed {}, {} moves",
        rec.size,
        rec.size,
        rec.seed,
        rec.moves.len()
    );
    print!("{}", game.grid());
    println!("Score: {}  Highest tile: {}  Over: {}", game.score(), rec.highest_tile, game.is_over());
    Ok(())
}
