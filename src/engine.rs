//! Grid model for the block-chaining puzzle.
//!
//! This module defines the game's fundamental components:
//! - `Block`: a colored block occupying one cell, with an optional `Special` bonus.
//! - `CellKey`: the canonical `"row,col"` identity of a cell used for set membership.
//! - `Grid`: the rectangular playfield and the pure queries over it (adjacency,
//!   connected same-color region search) plus the column compaction and refill
//!   primitives that the gravity step is built from.
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{EngineError, ParseCellKeyError};

/// Index into the level's palette. Always in `0..color_count` for the active level.
pub type ColorIndex = u8;

/// The kind of a special block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialKind {
    Bomb,
    Rainbow,
    Star,
}

/// A score bonus attached to a block.
///
/// Generation never produces these; they exist so front-ends and future rules
/// can place them. Use [`Special::new`] so the multiplier always matches the kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Special {
    pub kind: SpecialKind,
    pub multiplier: u32,
}

impl Special {
    /// Builds the special for `kind` with its fixed multiplier.
    ///
    /// # Examples
    /// ```
    /// use block_blast::engine::{Special, SpecialKind};
    /// assert_eq!(Special::new(SpecialKind::Star).multiplier, 2);
    /// assert_eq!(Special::new(SpecialKind::Rainbow).multiplier, 3);
    /// assert_eq!(Special::new(SpecialKind::Bomb).multiplier, 5);
    /// ```
    pub fn new(kind: SpecialKind) -> Self {
        let multiplier = match kind {
            SpecialKind::Star => 2,
            SpecialKind::Rainbow => 3,
            SpecialKind::Bomb => 5,
        };
        Special { kind, multiplier }
    }
}

/// A colored block sitting in one grid cell.
///
/// Blocks are never edited in place by the engine: when a block moves or is
/// created a new value is written into the destination cell.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    pub color_index: ColorIndex,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special: Option<Special>,
}

impl Block {
    /// Creates a plain block with an explicit id.
    pub fn new(id: impl Into<String>, color_index: ColorIndex) -> Self {
        Block {
            id: id.into(),
            color_index,
            special: None,
        }
    }

    /// Creates a block whose id is stamped from its position, as done for
    /// freshly generated and reshuffled grids.
    pub fn at(row: usize, col: usize, color_index: ColorIndex) -> Self {
        Block::new(format!("block-{}-{}", row, col), color_index)
    }

    /// Creates a block that dropped in from above during a refill.
    pub fn refill(row: usize, col: usize, color_index: ColorIndex) -> Self {
        Block::new(format!("block-new-{}-{}", row, col), color_index)
    }

    /// Returns a copy of this block carrying `special`.
    pub fn with_special(mut self, special: Special) -> Self {
        self.special = Some(special);
        self
    }
}

/// Canonical identity of a grid cell.
///
/// Displays and parses as `"row,col"`, which is also its serialized form.
///
/// # Examples
/// ```
/// use block_blast::engine::CellKey;
/// let key = CellKey::new(2, 3);
/// assert_eq!(key.to_string(), "2,3");
/// assert_eq!("2,3".parse::<CellKey>().unwrap(), key);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CellKey {
    pub row: usize,
    pub col: usize,
}

impl CellKey {
    pub fn new(row: usize, col: usize) -> Self {
        CellKey { row, col }
    }

    /// True iff `other` is one step away horizontally or vertically.
    pub fn is_adjacent_to(&self, other: &CellKey) -> bool {
        is_adjacent(self.row, self.col, other.row, other.col)
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.row, self.col)
    }
}

impl FromStr for CellKey {
    type Err = ParseCellKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (row, col) = s
            .split_once(',')
            .ok_or_else(|| ParseCellKeyError(s.to_string()))?;
        let row = row
            .trim()
            .parse::<usize>()
            .map_err(|_| ParseCellKeyError(s.to_string()))?;
        let col = col
            .trim()
            .parse::<usize>()
            .map_err(|_| ParseCellKeyError(s.to_string()))?;
        Ok(CellKey { row, col })
    }
}

impl From<CellKey> for String {
    fn from(key: CellKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for CellKey {
    type Error = ParseCellKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Checks whether two cells are orthogonal neighbours.
///
/// Two cells are adjacent iff they differ by exactly one in exactly one axis,
/// i.e. their Manhattan distance is 1. Diagonals are not adjacent.
///
/// # Examples
/// ```
/// use block_blast::engine::is_adjacent;
/// assert!(is_adjacent(1, 1, 0, 1));
/// assert!(is_adjacent(1, 1, 1, 2));
/// assert!(!is_adjacent(1, 1, 2, 2)); // diagonal
/// assert!(!is_adjacent(1, 1, 1, 1)); // same cell
/// ```
pub fn is_adjacent(r1: usize, c1: usize, r2: usize, c2: usize) -> bool {
    r1.abs_diff(r2) + c1.abs_diff(c2) == 1
}

// Uniform draw used by every generation path so colors stay in range.
pub(crate) fn random_color(rng: &mut impl Rng, color_count: ColorIndex) -> ColorIndex {
    rng.gen_range(0..color_count)
}

/// Creates a `rows × cols` grid of uniformly random blocks. Shorthand for
/// [`Grid::new_random`]; the result is not guaranteed to be playable.
pub fn create_grid(
    rows: usize,
    cols: usize,
    color_count: ColorIndex,
    rng: &mut impl Rng,
) -> Result<Grid, EngineError> {
    Grid::new_random(rows, cols, color_count, rng)
}

/// Returns the ANSI background color code used to paint a color index.
fn ansi_background(color: Option<ColorIndex>) -> &'static str {
    match color {
        None => "40",
        Some(0) => "41",
        Some(1) => "42",
        Some(2) => "44",
        Some(3) => "43",
        Some(4) => "45",
        Some(5) => "46",
        Some(6) => "47",
        Some(_) => "101",
    }
}

/// The rectangular playfield: `rows × cols` cells, each either a block or empty.
///
/// Dimensions are fixed for the lifetime of a grid. The session replaces the
/// whole grid on level start, restart, gravity and reshuffle rather than
/// editing cells from outside these transitions.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Vec<Option<Block>>>,
}

impl Grid {
    /// Creates a grid with every cell empty.
    ///
    /// # Examples
    /// ```
    /// use block_blast::engine::Grid;
    /// let grid = Grid::new_empty(3, 4);
    /// assert_eq!(grid.block_count(), 0);
    /// assert_eq!((grid.rows(), grid.cols()), (3, 4));
    /// ```
    pub fn new_empty(rows: usize, cols: usize) -> Self {
        Grid {
            rows,
            cols,
            cells: vec![vec![None; cols]; rows],
        }
    }

    /// Creates a grid filled with uniformly random colors in `0..color_count`.
    ///
    /// Playability is not guaranteed here; run the result through
    /// [`crate::playability::ensure_playable`] before handing it to a player.
    ///
    /// # Arguments
    /// * `rows`, `cols`: grid dimensions, both at least 1.
    /// * `color_count`: number of colors, at least 1.
    /// * `rng`: the random source; seed it for reproducible boards.
    ///
    /// # Returns
    /// * `Ok(Grid)` with every cell holding a block stamped `block-row-col`.
    /// * `Err(EngineError)` if the dimensions or color count are zero.
    pub fn new_random(
        rows: usize,
        cols: usize,
        color_count: ColorIndex,
        rng: &mut impl Rng,
    ) -> Result<Self, EngineError> {
        if rows == 0 || cols == 0 {
            return Err(EngineError::InvalidDimensions { rows, cols });
        }
        if color_count == 0 {
            return Err(EngineError::InvalidColorCount(color_count));
        }

        let mut grid = Grid::new_empty(rows, cols);
        for r in 0..rows {
            for c in 0..cols {
                grid.cells[r][c] = Some(Block::at(r, c, random_color(rng, color_count)));
            }
        }
        Ok(grid)
    }

    /// Builds a grid from prepared rows. All rows must have the same length.
    pub(crate) fn from_rows(cells: Vec<Vec<Option<Block>>>) -> Self {
        let rows = cells.len();
        let cols = cells.first().map_or(0, Vec::len);
        debug_assert!(cells.iter().all(|row| row.len() == cols));
        Grid { rows, cols, cells }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Whether `(row, col)` lies inside the grid.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }

    /// Returns the block at `(row, col)`, or `None` for empty or out-of-bounds cells.
    pub fn get(&self, row: usize, col: usize) -> Option<&Block> {
        self.cells.get(row)?.get(col)?.as_ref()
    }

    /// Returns the color at `(row, col)`, or `None` for empty or out-of-bounds cells.
    pub fn color_at(&self, row: usize, col: usize) -> Option<ColorIndex> {
        self.get(row, col).map(|b| b.color_index)
    }

    /// Writes `block` into `(row, col)`.
    ///
    /// # Panics
    /// Panics if the coordinates are outside the grid.
    pub fn set(&mut self, row: usize, col: usize, block: Option<Block>) {
        self.cells[row][col] = block;
    }

    /// Iterates over every occupied cell in row-major order.
    pub fn blocks(&self) -> impl Iterator<Item = (CellKey, &Block)> + '_ {
        self.cells.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .filter_map(move |(c, cell)| cell.as_ref().map(|b| (CellKey::new(r, c), b)))
        })
    }

    /// Number of occupied cells.
    pub fn block_count(&self) -> usize {
        self.blocks().count()
    }

    /// Whether every occupied cell has a color in `0..color_count`.
    pub fn colors_within(&self, color_count: ColorIndex) -> bool {
        self.blocks().all(|(_, b)| b.color_index < color_count)
    }

    /// Returns the colors row by row, `None` for empty cells.
    pub fn color_rows(&self) -> Vec<Vec<Option<ColorIndex>>> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|c| c.as_ref().map(|b| b.color_index)).collect())
            .collect()
    }

    /// Finds every cell reachable from `(row, col)` through orthogonal neighbours of `color`.
    ///
    /// The search uses an explicit work-list, so recursion depth does not grow with
    /// the board. Cells already in `visited` are skipped, which lets callers exclude
    /// cells that are pending removal by pre-seeding them. Every returned cell is
    /// added to `visited`, so calling again with the same set yields nothing.
    ///
    /// # Arguments
    /// * `row`, `col`: the origin cell.
    /// * `color`: the color the region must share. The origin itself must have it.
    /// * `visited`: cells to skip; updated with the cells of the region.
    ///
    /// # Returns
    /// The keys of the region including the origin, in discovery order. Empty if the
    /// origin is out of bounds, empty, of another color, or already visited.
    pub fn find_connected_region(
        &self,
        row: usize,
        col: usize,
        color: ColorIndex,
        visited: &mut HashSet<CellKey>,
    ) -> Vec<CellKey> {
        let origin = CellKey::new(row, col);
        if self.color_at(row, col) != Some(color) || visited.contains(&origin) {
            return Vec::new();
        }

        let mut region = Vec::new();
        let mut stack = vec![origin];
        visited.insert(origin);

        let dr = [0, 1, 0, -1]; // right, down, left, up
        let dc = [1, 0, -1, 0];

        while let Some(current) = stack.pop() {
            region.push(current);

            for i in 0..4 {
                let nr = current.row as isize + dr[i];
                let nc = current.col as isize + dc[i];
                if nr < 0 || nc < 0 {
                    continue;
                }
                let next = CellKey::new(nr as usize, nc as usize);
                // color_at is None outside the grid, so bounds are covered here
                if self.color_at(next.row, next.col) == Some(color) && visited.insert(next) {
                    stack.push(next);
                }
            }
        }

        region
    }

    /// Splits the board into its same-color regions of at least `min_len` cells.
    ///
    /// Cells in `excluded` are treated as already gone. Tiles within each region
    /// are sorted, and regions are sorted by their first cell, giving a canonical
    /// order that is convenient for tests and deterministic strategies.
    pub fn find_all_regions(
        &self,
        min_len: usize,
        excluded: &HashSet<CellKey>,
    ) -> Vec<Vec<CellKey>> {
        let mut visited = excluded.clone();
        let mut regions = Vec::new();

        for r in 0..self.rows {
            for c in 0..self.cols {
                let Some(color) = self.color_at(r, c) else {
                    continue;
                };
                let mut region = self.find_connected_region(r, c, color, &mut visited);
                if !region.is_empty() && region.len() >= min_len {
                    region.sort_unstable();
                    regions.push(region);
                }
            }
        }

        regions.sort_unstable_by_key(|g| g[0]);
        regions
    }

    /// Empties every listed cell. Keys outside the grid are ignored.
    pub fn remove_cells<'a>(&mut self, keys: impl IntoIterator<Item = &'a CellKey>) {
        for key in keys {
            if self.contains(key.row, key.col) {
                self.cells[key.row][key.col] = None;
            }
        }
    }

    /// Packs each column's blocks to the bottom, keeping their top-to-bottom order.
    ///
    /// Columns are independent. After this call every column is a run of empty
    /// cells followed by a run of blocks.
    pub fn compact_columns(&mut self) {
        for c in 0..self.cols {
            let mut empty_slot = self.rows; // one past the lowest slot still free
            for r in (0..self.rows).rev() {
                if self.cells[r][c].is_some() {
                    empty_slot -= 1;
                    if r != empty_slot {
                        let block = self.cells[r][c].take();
                        self.cells[empty_slot][c] = block;
                    }
                }
            }
        }
    }

    /// Fills every empty cell with a new random block, column by column, top to bottom.
    ///
    /// Meant to run after [`Grid::compact_columns`], when the empty cells are the
    /// top of each column.
    ///
    /// # Returns
    /// The newly created blocks in creation order.
    pub fn refill(&mut self, color_count: ColorIndex, rng: &mut impl Rng) -> Vec<Block> {
        let mut created = Vec::new();
        for c in 0..self.cols {
            for r in 0..self.rows {
                if self.cells[r][c].is_none() {
                    let block = Block::refill(r, c, random_color(rng, color_count));
                    created.push(block.clone());
                    self.cells[r][c] = Some(block);
                }
            }
        }
        created
    }

    /// Renders the board for a terminal, marking highlighted cells.
    ///
    /// The output includes row and column numbers and paints each cell with ANSI
    /// background colors. Highlighted cells show `[]`.
    pub fn to_string_with_highlight(&self, highlight: &HashSet<CellKey>) -> String {
        let mut output = String::new();

        output.push_str("   ");
        for c in 0..self.cols {
            output.push_str(&format!("{:<2}", c));
        }
        output.push('\n');

        for r in 0..self.rows {
            output.push_str(&format!("{:<3}", r));
            for c in 0..self.cols {
                let color_code = ansi_background(self.color_at(r, c));
                let content = if highlight.contains(&CellKey::new(r, c)) {
                    "[]"
                } else {
                    "  "
                };
                output.push_str(&format!("\x1b[1;{}m{}\x1b[m", color_code, content));
            }
            if r + 1 < self.rows {
                output.push('\n');
            }
        }

        output
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_with_highlight(&HashSet::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::grid_from_str_array;
    use proptest::prelude::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn keys(cells: &[(usize, usize)]) -> Vec<CellKey> {
        cells.iter().map(|&(r, c)| CellKey::new(r, c)).collect()
    }

    #[test]
    fn test_special_multipliers() {
        assert_eq!(Special::new(SpecialKind::Star).multiplier, 2);
        assert_eq!(Special::new(SpecialKind::Rainbow).multiplier, 3);
        assert_eq!(Special::new(SpecialKind::Bomb).multiplier, 5);
        let block = Block::at(0, 0, 1).with_special(Special::new(SpecialKind::Bomb));
        assert_eq!(block.special.map(|s| s.kind), Some(SpecialKind::Bomb));
    }

    #[test]
    fn test_cell_key_round_trip_and_errors() {
        let key: CellKey = "10,7".parse().unwrap();
        assert_eq!(key, CellKey::new(10, 7));
        assert!("10".parse::<CellKey>().is_err());
        assert!("a,1".parse::<CellKey>().is_err());
        assert!("1,-1".parse::<CellKey>().is_err());

        let json = serde_json::to_string(&CellKey::new(3, 4)).unwrap();
        assert_eq!(json, "\"3,4\"");
        let back: CellKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CellKey::new(3, 4));
    }

    #[test]
    fn test_is_adjacent() {
        assert!(is_adjacent(0, 0, 0, 1));
        assert!(is_adjacent(0, 0, 1, 0));
        assert!(!is_adjacent(0, 0, 1, 1));
        assert!(!is_adjacent(0, 0, 0, 2));
        assert!(!is_adjacent(3, 3, 3, 3));
    }

    #[test]
    fn test_new_random_grid_in_range_and_deterministic() {
        let mut rng = SmallRng::seed_from_u64(514514);
        let grid = Grid::new_random(6, 5, 3, &mut rng).unwrap();
        assert_eq!(grid.block_count(), 30);
        assert!(grid.colors_within(3));
        assert_eq!(grid.get(2, 4).unwrap().id, "block-2-4");

        let mut rng_again = SmallRng::seed_from_u64(514514);
        let again = Grid::new_random(6, 5, 3, &mut rng_again).unwrap();
        assert_eq!(grid, again, "same seed must give the same grid");
    }

    #[test]
    fn test_new_random_rejects_degenerate_input() {
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(
            Grid::new_random(0, 5, 3, &mut rng),
            Err(EngineError::InvalidDimensions { rows: 0, cols: 5 })
        );
        assert_eq!(
            Grid::new_random(3, 3, 0, &mut rng),
            Err(EngineError::InvalidColorCount(0))
        );
    }

    #[test]
    fn test_get_out_of_bounds_is_none() {
        let grid = grid_from_str_array(&["01", "10"]).unwrap();
        assert_eq!(grid.color_at(0, 1), Some(1));
        assert!(grid.get(2, 0).is_none());
        assert!(grid.get(0, 2).is_none());
    }

    #[test]
    fn test_find_connected_region_row_of_three() {
        let grid = grid_from_str_array(&[
            "2221", //
            "0101", //
            "1010",
        ])
        .unwrap();
        let mut visited = HashSet::new();
        let mut region = grid.find_connected_region(0, 0, 2, &mut visited);
        region.sort_unstable();
        assert_eq!(region, keys(&[(0, 0), (0, 1), (0, 2)]));
        let as_strings: Vec<String> = region.iter().map(ToString::to_string).collect();
        assert_eq!(as_strings, vec!["0,0", "0,1", "0,2"]);
    }

    #[test]
    fn test_find_connected_region_respects_visited() {
        let grid = grid_from_str_array(&["000", "010"]).unwrap();
        let mut visited = HashSet::new();
        visited.insert(CellKey::new(0, 1)); // pending removal splits the region
        let mut left = grid.find_connected_region(0, 0, 0, &mut visited);
        left.sort_unstable();
        assert_eq!(left, keys(&[(0, 0), (1, 0)]));

        // Already visited origin yields nothing.
        assert!(grid.find_connected_region(1, 0, 0, &mut visited).is_empty());
    }

    #[test]
    fn test_find_connected_region_wrong_color_or_empty() {
        let grid = grid_from_str_array(&["0.", "11"]).unwrap();
        let mut visited = HashSet::new();
        assert!(grid.find_connected_region(0, 0, 1, &mut visited).is_empty());
        assert!(grid.find_connected_region(0, 1, 0, &mut visited).is_empty());
        assert!(grid.find_connected_region(5, 5, 0, &mut visited).is_empty());
    }

    #[test]
    fn test_find_connected_region_snake() {
        let grid = grid_from_str_array(&[
            "00000", //
            "11110", //
            "00000", //
            "01111", //
            "00000",
        ])
        .unwrap();
        let mut visited = HashSet::new();
        let region = grid.find_connected_region(0, 0, 0, &mut visited);
        assert_eq!(region.len(), 17);
    }

    #[test]
    fn test_find_all_regions() {
        let grid = grid_from_str_array(&[
            "0011", //
            "2231", //
            "3332",
        ])
        .unwrap();
        let regions = grid.find_all_regions(2, &HashSet::new());
        assert_eq!(
            regions,
            vec![
                keys(&[(0, 0), (0, 1)]),
                keys(&[(0, 2), (0, 3), (1, 3)]),
                keys(&[(1, 0), (1, 1)]),
                keys(&[(1, 2), (2, 0), (2, 1), (2, 2)]),
            ]
        );
        let big = grid.find_all_regions(3, &HashSet::new());
        assert_eq!(big.len(), 2);
    }

    #[test]
    fn test_compact_columns_preserves_order() {
        // Single column [A, ., B, .] from top to bottom.
        let mut grid = grid_from_str_array(&["0", ".", "1", "."]).unwrap();
        let a = grid.get(0, 0).cloned();
        let b = grid.get(2, 0).cloned();
        grid.compact_columns();
        assert!(grid.get(0, 0).is_none());
        assert!(grid.get(1, 0).is_none());
        assert_eq!(grid.get(2, 0).cloned(), a);
        assert_eq!(grid.get(3, 0).cloned(), b);
    }

    #[test]
    fn test_compact_columns_independent() {
        let mut grid = grid_from_str_array(&["0.1", "...", "2.."]).unwrap();
        grid.compact_columns();
        let expected = grid_from_str_array(&["...", "0..", "2.1"]).unwrap();
        assert_eq!(grid.color_rows(), expected.color_rows());
    }

    #[test]
    fn test_refill_fills_top_cells_only() {
        let mut grid = grid_from_str_array(&["..", ".0", "11"]).unwrap();
        let mut rng = SmallRng::seed_from_u64(9);
        let created = grid.refill(4, &mut rng);
        assert_eq!(created.len(), 3);
        assert_eq!(grid.block_count(), 6);
        assert!(grid.colors_within(4));
        assert_eq!(grid.get(0, 0).unwrap().id, "block-new-0-0");
        assert_eq!(grid.get(1, 1).unwrap().id, "block-1-1");
    }

    #[test]
    fn test_remove_cells_ignores_out_of_bounds() {
        let mut grid = grid_from_str_array(&["01", "23"]).unwrap();
        grid.remove_cells(&[CellKey::new(0, 0), CellKey::new(9, 9)]);
        assert!(grid.get(0, 0).is_none());
        assert_eq!(grid.block_count(), 3);
    }

    #[test]
    fn test_display_grid_formatting() {
        let grid = grid_from_str_array(&["01", "2."]).unwrap();
        let display = format!("{}", grid);
        assert!(display.starts_with("   0 1 "));
        assert_eq!(display.lines().count(), 3);

        let mut highlight = HashSet::new();
        highlight.insert(CellKey::new(0, 1));
        assert!(grid.to_string_with_highlight(&highlight).contains("[]"));
    }

    proptest! {
        #[test]
        fn test_adjacency_is_symmetric_and_manhattan(r1 in 0usize..20, c1 in 0usize..20, r2 in 0usize..20, c2 in 0usize..20) {
            prop_assert_eq!(is_adjacent(r1, c1, r2, c2), is_adjacent(r2, c2, r1, c1));
            let manhattan = r1.abs_diff(r2) + c1.abs_diff(c2);
            prop_assert_eq!(is_adjacent(r1, c1, r2, c2), manhattan == 1);
        }

        #[test]
        fn test_region_is_closed_and_single_colored(seed in any::<u64>(), row in 0usize..6, col in 0usize..5) {
            let mut rng = SmallRng::seed_from_u64(seed);
            let grid = Grid::new_random(6, 5, 3, &mut rng).unwrap();
            let color = grid.color_at(row, col).unwrap();
            let mut visited = HashSet::new();
            let region = grid.find_connected_region(row, col, color, &mut visited);
            let members: HashSet<CellKey> = region.iter().copied().collect();
            prop_assert_eq!(members.len(), region.len(), "no cell visited twice");
            prop_assert!(members.contains(&CellKey::new(row, col)));
            for key in &region {
                prop_assert_eq!(grid.color_at(key.row, key.col), Some(color));
                // Any same-colored neighbour of a member is a member.
                for (nr, nc) in [(key.row + 1, key.col), (key.row, key.col + 1)] {
                    if grid.color_at(nr, nc) == Some(color) {
                        prop_assert!(members.contains(&CellKey::new(nr, nc)));
                    }
                }
            }
        }

        #[test]
        fn test_compaction_keeps_column_order(seed in any::<u64>()) {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut grid = Grid::new_random(7, 4, 5, &mut rng).unwrap();
            for r in 0..7 {
                for c in 0..4 {
                    if rng.gen_bool(0.4) {
                        grid.set(r, c, None);
                    }
                }
            }
            let before: Vec<Vec<String>> = (0..4)
                .map(|c| (0..7).filter_map(|r| grid.get(r, c).map(|b| b.id.clone())).collect())
                .collect();
            grid.compact_columns();
            for c in 0..4 {
                let after: Vec<String> = (0..7).filter_map(|r| grid.get(r, c).map(|b| b.id.clone())).collect();
                prop_assert_eq!(&after, &before[c]);
                let first_block = (0..7).find(|&r| grid.get(r, c).is_some()).unwrap_or(7);
                prop_assert!((first_block..7).all(|r| grid.get(r, c).is_some()));
            }
        }
    }
}
