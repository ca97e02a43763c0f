use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A direction to move/merge tiles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

pub type Tile = u64;
pub type Score = u64;

/// Side length used when no size is configured.
pub const DEFAULT_SIZE: usize = 4;
/// Smallest board that still allows merges on both axes.
pub const MIN_SIZE: usize = 2;
/// Largest accepted side length.
pub const MAX_SIZE: usize = 256;
/// Probability that a spawned tile is a 2 rather than a 4.
pub const TWO_PROBABILITY: f64 = 0.9;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("board size {size} is outside {min}..={max}")]
    InvalidSize { size: usize, min: usize, max: usize },
    #[error("board rows must form a square (row {row} has {len} cells, expected {expected})")]
    NotSquare { row: usize, len: usize, expected: usize },
    #[error("unknown move: {0:?}")]
    UnknownMove(String),
}

impl Move {
    /// All four directions in a fixed order.
    pub const ALL: [Move; 4] = [Move::Up, Move::Down, Move::Left, Move::Right];

    /// Map a raw key name to a direction.
    ///
    /// Arrow key names and WASD are accepted; anything else is `None`.
    ///
    /// ```
    /// use game_2048::engine::Move;
    /// assert_eq!(Move::from_key("ArrowUp"), Some(Move::Up));
    /// assert_eq!(Move::from_key("a"), Some(Move::Left));
    /// assert_eq!(Move::from_key("x"), None);
    /// ```
    pub fn from_key(key: &str) -> Option<Move> {
        match key.trim().to_ascii_lowercase().as_str() {
            "arrowup" | "up" | "w" => Some(Move::Up),
            "arrowdown" | "down" | "s" => Some(Move::Down),
            "arrowleft" | "left" | "a" => Some(Move::Left),
            "arrowright" | "right" | "d" => Some(Move::Right),
            _ => None,
        }
    }
}

impl FromStr for Move {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Move::from_key(s).ok_or_else(|| EngineError::UnknownMove(s.to_string()))
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Move::Up => "up",
            Move::Down => "down",
            Move::Left => "left",
            Move::Right => "right",
        };
        f.write_str(name)
    }
}

/// Source of the two random draws a spawn needs.
///
/// Every `rand::Rng` is a `TileSource`, so a seeded `StdRng` gives fully
/// reproducible games. Tests can implement it directly to script spawns.
pub trait TileSource {
    /// Uniform index in `0..len`. Never called with `len == 0`.
    fn pick_index(&mut self, len: usize) -> usize;
    /// True when the new tile is a 2 (probability [`TWO_PROBABILITY`]).
    fn spawn_two(&mut self) -> bool;
}

impl<R: Rng + ?Sized> TileSource for R {
    fn pick_index(&mut self, len: usize) -> usize {
        self.gen_range(0..len)
    }

    fn spawn_two(&mut self) -> bool {
        self.gen_bool(TWO_PROBABILITY)
    }
}

/// A tile placed by [`Grid::spawn_tile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spawn {
    pub row: usize,
    pub col: usize,
    pub value: Tile,
}

/// Outcome of sliding a grid in one direction. No randomness involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveResult {
    pub grid: Grid,
    /// Sum of every merged tile produced by the move.
    pub score_delta: Score,
    /// True iff at least one cell differs from the input grid.
    pub changed: bool,
}

/// Square board of tile values stored row-major. `0` is an empty cell.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Grid {
    size: usize,
    cells: Vec<Tile>,
}

impl Grid {
    /// Empty `size`x`size` grid.
    ///
    /// ```
    /// use game_2048::engine::Grid;
    /// let g = Grid::new(4).unwrap();
    /// assert_eq!(g.count_empty(), 16);
    /// assert!(Grid::new(1).is_err());
    /// ```
    pub fn new(size: usize) -> Result<Self, EngineError> {
        check_size(size)?;
        Ok(Grid { size, cells: vec![0; size * size] })
    }

    /// Build a grid from explicit rows; the rows must form a square.
    pub fn from_rows<R: AsRef<[Tile]>>(rows: &[R]) -> Result<Self, EngineError> {
        let size = rows.len();
        let mut grid = Grid::new(size)?;
        for (r, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != size {
                return Err(EngineError::NotSquare { row: r, len: row.len(), expected: size });
            }
            grid.cells[r * size..(r + 1) * size].copy_from_slice(row);
        }
        Ok(grid)
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Value at (`row`, `col`), or `None` when out of bounds.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<Tile> {
        if row < self.size && col < self.size {
            Some(self.cells[row * self.size + col])
        } else {
            None
        }
    }

    /// All cells in row-major order.
    #[inline]
    pub fn cells(&self) -> &[Tile] {
        &self.cells
    }

    /// Iterate over rows as slices.
    pub fn rows(&self) -> impl Iterator<Item = &[Tile]> + '_ {
        self.cells.chunks(self.size)
    }

    /// Empty every cell, keeping the size.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Copy of the grid as nested rows.
    pub fn to_rows(&self) -> Vec<Vec<Tile>> {
        self.rows().map(|r| r.to_vec()).collect()
    }

    pub fn count_empty(&self) -> usize {
        self.cells.iter().filter(|&&v| v == 0).count()
    }

    /// Highest tile value present (0 on an empty grid).
    pub fn highest_tile(&self) -> Tile {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    /// Sum of all tile values. Unchanged by moves; only spawns raise it.
    pub fn tile_sum(&self) -> Tile {
        self.cells.iter().fold(0, |acc: Tile, &v| acc.saturating_add(v))
    }

    /// Slide and merge every line toward `dir`.
    ///
    /// ```
    /// use game_2048::engine::{Grid, Move};
    /// let g = Grid::from_rows(&[[2, 2, 2, 2], [0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]).unwrap();
    /// let res = g.shift(Move::Left);
    /// assert_eq!(res.grid.to_rows()[0], vec![4, 4, 0, 0]);
    /// assert_eq!(res.score_delta, 8);
    /// assert!(res.changed);
    /// ```
    pub fn shift(&self, dir: Move) -> MoveResult {
        let n = self.size;
        let mut next = self.clone();
        let mut line = vec![0; n];
        let mut score_delta: Score = 0;
        for lane in 0..n {
            for (k, slot) in line.iter_mut().enumerate() {
                *slot = self.cells[line_index(n, dir, lane, k)];
            }
            score_delta = score_delta.saturating_add(slide_line(&mut line));
            for (k, &v) in line.iter().enumerate() {
                next.cells[line_index(n, dir, lane, k)] = v;
            }
        }
        let changed = next.cells != self.cells;
        MoveResult { grid: next, score_delta, changed }
    }

    /// Place a 2 (90%) or 4 (10%) on a uniformly chosen empty cell.
    ///
    /// A full grid is left untouched and `None` is returned.
    pub fn spawn_tile<S: TileSource + ?Sized>(&mut self, source: &mut S) -> Option<Spawn> {
        let empty: Vec<usize> = self
            .cells
            .iter()
            .enumerate()
            .filter(|(_, &v)| v == 0)
            .map(|(i, _)| i)
            .collect();
        if empty.is_empty() {
            return None;
        }
        let idx = empty[source.pick_index(empty.len())];
        let value = if source.spawn_two() { 2 } else { 4 };
        self.cells[idx] = value;
        Some(Spawn { row: idx / self.size, col: idx % self.size, value })
    }

    /// Consuming variant of [`Grid::spawn_tile`].
    ///
    /// ```
    /// use game_2048::engine::Grid;
    /// use rand::{rngs::StdRng, SeedableRng};
    /// let mut rng = StdRng::seed_from_u64(123);
    /// let g = Grid::new(4).unwrap().with_random_tile(&mut rng).with_random_tile(&mut rng);
    /// assert_eq!(g.count_empty(), 14);
    /// ```
    pub fn with_random_tile<S: TileSource + ?Sized>(mut self, source: &mut S) -> Self {
        self.spawn_tile(source);
        self
    }

    /// True iff the grid is full and no two neighbours on either axis are equal.
    pub fn is_terminal(&self) -> bool {
        if self.cells.contains(&0) {
            return false;
        }
        let n = self.size;
        for r in 0..n {
            for c in 0..n {
                let v = self.cells[r * n + c];
                if c + 1 < n && v == self.cells[r * n + c + 1] {
                    return false;
                }
                if r + 1 < n && v == self.cells[(r + 1) * n + c] {
                    return false;
                }
            }
        }
        true
    }

    /// True if `dir` would change the grid.
    pub fn can_move(&self, dir: Move) -> bool {
        self.shift(dir).changed
    }
}

/// Reject side lengths outside `MIN_SIZE..=MAX_SIZE`.
pub fn check_size(size: usize) -> Result<(), EngineError> {
    if !(MIN_SIZE..=MAX_SIZE).contains(&size) {
        return Err(EngineError::InvalidSize { size, min: MIN_SIZE, max: MAX_SIZE });
    }
    Ok(())
}

// Storage index of the `k`-th cell of line `lane`, counted in the direction tiles slide.
#[inline]
fn line_index(n: usize, dir: Move, lane: usize, k: usize) -> usize {
    let last = n - 1;
    match dir {
        Move::Left => lane * n + k,
        Move::Right => lane * n + (last - k),
        Move::Up => k * n + lane,
        Move::Down => (last - k) * n + lane,
    }
}

/// Move non-zero tiles to the front, keeping their order; zeros fill the tail.
pub fn compact(line: &mut [Tile]) {
    let mut write = 0;
    for read in 0..line.len() {
        let v = line[read];
        if v != 0 {
            line[read] = 0;
            line[write] = v;
            write += 1;
        }
    }
}

/// Single forward scan merging equal adjacent pairs. A merged tile is skipped,
/// so it cannot merge again in the same pass. Returns the points gained.
/// Tiles and points saturate at `u64::MAX`.
pub fn merge_pass(line: &mut [Tile]) -> Score {
    let mut gained: Score = 0;
    let mut i = 0;
    while i + 1 < line.len() {
        if line[i] != 0 && line[i] == line[i + 1] {
            line[i] = line[i].saturating_mul(2);
            line[i + 1] = 0;
            gained = gained.saturating_add(line[i]);
            i += 2;
        } else {
            i += 1;
        }
    }
    gained
}

/// Compact, merge, compact again. `line` is given in slide order.
///
/// ```
/// use game_2048::engine::slide_line;
/// let mut line = [2, 0, 2, 4];
/// assert_eq!(slide_line(&mut line), 4);
/// assert_eq!(line, [4, 4, 0, 0]);
/// ```
pub fn slide_line(line: &mut [Tile]) -> Score {
    compact(line);
    let gained = merge_pass(line);
    compact(line);
    gained
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Grid{:?}", self.to_rows())
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.highest_tile().max(2).to_string().len().max(4) + 2;
        let rule = "-".repeat((width + 1) * self.size - 1);
        for (r, row) in self.rows().enumerate() {
            if r > 0 {
                writeln!(f, "{}", rule)?;
            }
            let cells: Vec<String> = row.iter().map(|&v| format_val(v, width)).collect();
            writeln!(f, "{}", cells.join("|"))?;
        }
        Ok(())
    }
}

fn format_val(val: Tile, width: usize) -> String {
    match val {
        0 => " ".repeat(width),
        x => format!("{:^width$}", x, width = width),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn row(values: [Tile; 4]) -> Grid {
        Grid::from_rows(&[values, [0; 4], [0; 4], [0; 4]]).unwrap()
    }

    fn first_row(g: &Grid) -> Vec<Tile> {
        g.rows().next().unwrap().to_vec()
    }

    #[test]
    fn it_compacts() {
        let mut line = [0, 2, 0, 4];
        compact(&mut line);
        assert_eq!(line, [2, 4, 0, 0]);
        let mut line = [0, 0, 0, 0];
        compact(&mut line);
        assert_eq!(line, [0, 0, 0, 0]);
    }

    #[test]
    fn merge_pass_does_not_cascade() {
        let mut line = [2, 2, 2, 2];
        assert_eq!(merge_pass(&mut line), 8);
        assert_eq!(line, [4, 0, 4, 0]);
        let mut line = [4, 4, 8, 0];
        assert_eq!(merge_pass(&mut line), 8);
        assert_eq!(line, [8, 0, 8, 0]);
    }

    #[test]
    fn test_shift_left() {
        let res = row([2, 2, 2, 2]).shift(Move::Left);
        assert_eq!(first_row(&res.grid), vec![4, 4, 0, 0]);
        assert_eq!(res.score_delta, 8);

        let res = row([0, 2, 0, 2]).shift(Move::Left);
        assert_eq!(first_row(&res.grid), vec![4, 0, 0, 0]);
        assert_eq!(res.score_delta, 4);

        let res = row([2, 0, 2, 4]).shift(Move::Left);
        assert_eq!(first_row(&res.grid), vec![4, 4, 0, 0]);
        assert_eq!(res.score_delta, 4);

        let res = row([2, 4, 2, 4]).shift(Move::Left);
        assert!(!res.changed);
        assert_eq!(res.score_delta, 0);
    }

    #[test]
    fn test_shift_right() {
        let res = row([0, 2, 0, 2]).shift(Move::Right);
        assert_eq!(first_row(&res.grid), vec![0, 0, 0, 4]);
        assert_eq!(res.score_delta, 4);

        let res = row([2, 2, 2, 0]).shift(Move::Right);
        assert_eq!(first_row(&res.grid), vec![0, 0, 2, 4]);
        assert_eq!(res.score_delta, 4);

        let res = row([8, 4, 4, 4]).shift(Move::Right);
        assert_eq!(first_row(&res.grid), vec![0, 8, 4, 8]);
    }

    #[test]
    fn test_shift_up_and_down() {
        let g = Grid::from_rows(&[[2, 0, 4, 0], [2, 0, 0, 0], [4, 0, 4, 2], [4, 2, 0, 2]]).unwrap();

        let up = g.shift(Move::Up);
        assert_eq!(
            up.grid.to_rows(),
            vec![vec![4, 2, 8, 4], vec![8, 0, 0, 0], vec![0, 0, 0, 0], vec![0, 0, 0, 0]]
        );
        assert_eq!(up.score_delta, 4 + 8 + 8 + 4);

        let down = g.shift(Move::Down);
        assert_eq!(
            down.grid.to_rows(),
            vec![vec![0, 0, 0, 0], vec![0, 0, 0, 0], vec![4, 0, 0, 0], vec![8, 2, 8, 4]]
        );
        assert_eq!(down.score_delta, 24);
    }

    #[test]
    fn unchanged_move_is_idempotent() {
        let g = Grid::from_rows(&[[2, 4, 8, 16], [4, 8, 16, 32], [0, 0, 0, 0], [0, 0, 0, 0]]).unwrap();
        let first = g.shift(Move::Up);
        assert!(!first.changed);
        assert_eq!(first.grid, g);
        let second = first.grid.shift(Move::Up);
        assert!(!second.changed);
        assert_eq!(second.grid, first.grid);
    }

    #[test]
    fn left_then_right_on_packed_row_keeps_it() {
        let g = row([2, 4, 8, 16]);
        let left = g.shift(Move::Left);
        assert!(!left.changed);
        let right = left.grid.shift(Move::Right);
        assert!(!right.changed);
        assert_eq!(right.grid, g);
    }

    #[test]
    fn moves_conserve_tile_sum() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut g = Grid::new(4).unwrap();
        for _ in 0..10 {
            g.spawn_tile(&mut rng);
        }
        for _ in 0..40 {
            for dir in Move::ALL {
                let before = g.tile_sum();
                let res = g.shift(dir);
                assert_eq!(res.grid.tile_sum(), before);
                g = res.grid;
                if let Some(s) = g.spawn_tile(&mut rng) {
                    assert_eq!(g.tile_sum(), before + s.value);
                }
            }
        }
    }

    #[test]
    fn it_spawn_fills_grid() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut g = Grid::new(4).unwrap();
        for _ in 0..16 {
            let s = g.spawn_tile(&mut rng).unwrap();
            assert!(s.value == 2 || s.value == 4);
            assert_eq!(g.get(s.row, s.col), Some(s.value));
        }
        assert_eq!(g.count_empty(), 0);
        let full = g.clone();
        assert_eq!(g.spawn_tile(&mut rng), None);
        assert_eq!(g, full);
    }

    #[test]
    fn it_is_terminal() {
        assert!(Grid::from_rows(&[[2, 4], [4, 2]]).unwrap().is_terminal());
        assert!(!Grid::from_rows(&[[2, 2], [4, 8]]).unwrap().is_terminal());
        assert!(!Grid::from_rows(&[[2, 4], [2, 8]]).unwrap().is_terminal());
        assert!(!Grid::from_rows(&[[2, 4], [8, 0]]).unwrap().is_terminal());
        assert!(!Grid::new(4).unwrap().is_terminal());
    }

    #[test]
    fn terminal_matches_no_legal_move() {
        let g = Grid::from_rows(&[[2, 4, 2], [4, 2, 4], [2, 4, 2]]).unwrap();
        assert!(g.is_terminal());
        assert!(Move::ALL.iter().all(|&d| !g.can_move(d)));
    }

    #[test]
    fn it_rejects_bad_shapes() {
        assert_eq!(
            Grid::new(0),
            Err(EngineError::InvalidSize { size: 0, min: MIN_SIZE, max: MAX_SIZE })
        );
        let ragged: Vec<Vec<Tile>> = vec![vec![2, 4], vec![2]];
        assert_eq!(
            Grid::from_rows(&ragged),
            Err(EngineError::NotSquare { row: 1, len: 1, expected: 2 })
        );
    }

    #[test]
    fn oversized_grid_is_rejected() {
        assert!(matches!(Grid::new(1usize << 32), Err(EngineError::InvalidSize { .. })));
        assert!(matches!(Grid::new(usize::MAX), Err(EngineError::InvalidSize { .. })));
        assert!(matches!(Grid::new(MAX_SIZE + 1), Err(EngineError::InvalidSize { .. })));
        let g = Grid::new(MAX_SIZE).unwrap();
        assert_eq!(g.cells().len(), MAX_SIZE * MAX_SIZE);
    }

    #[test]
    fn cells_always_cover_the_square() {
        let mut rng = StdRng::seed_from_u64(1);
        for size in [MIN_SIZE, 3, 4, 7] {
            let g = Grid::new(size).unwrap().with_random_tile(&mut rng);
            assert_eq!(g.cells().len(), size * size);
            assert_eq!(g.rows().count(), size);
            for dir in Move::ALL {
                assert_eq!(g.shift(dir).grid.cells().len(), size * size);
            }
        }
    }

    #[test]
    fn huge_tiles_saturate_instead_of_overflowing() {
        let top: Tile = 1 << 63;
        let g = Grid::from_rows(&[[top, top], [0, 0]]).unwrap();
        let res = g.shift(Move::Left);
        assert_eq!(res.grid.to_rows()[0], vec![Tile::MAX, 0]);
        assert_eq!(res.score_delta, Score::MAX);
        assert_eq!(g.tile_sum(), Tile::MAX);

        let mut line = [Tile::MAX, Tile::MAX, 4, 4];
        assert_eq!(merge_pass(&mut line), Score::MAX);
        assert_eq!(line, [Tile::MAX, 0, 8, 0]);
    }

    #[test]
    fn it_parses_moves() {
        assert_eq!("ArrowRight".parse::<Move>(), Ok(Move::Right));
        assert_eq!("S".parse::<Move>(), Ok(Move::Down));
        assert!(matches!("jump".parse::<Move>(), Err(EngineError::UnknownMove(_))));
    }

    #[test]
    fn it_displays_grid() {
        let g = Grid::from_rows(&[[2, 0], [0, 2048]]).unwrap();
        let text = g.to_string();
        assert!(text.contains("2048"));
        assert_eq!(text.lines().count(), 3);
    }
}
