//! Playability guarantee: detecting whether any chain can still be made and
//! repairing the board when none can.
use log::{info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::engine::{random_color, Block, CellKey, ColorIndex, Grid};
use crate::error::EngineError;

/// Smallest number of connected same-colored blocks that form a match.
pub const MIN_MATCH_LEN: usize = 3;

/// Limits and bias of the reshuffle repair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReshufflePolicy {
    /// Shuffles tried before the grid is thrown away and regenerated.
    pub max_attempts: u32,
    /// Chance that each relocated block is also recolored.
    pub recolor_probability: f64,
    /// Full regenerations tried before giving up.
    pub max_regenerations: u32,
}

impl Default for ReshufflePolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            recolor_probability: 0.3,
            max_regenerations: 100,
        }
    }
}

impl ReshufflePolicy {
    pub fn sanitized(mut self) -> Self {
        self.max_attempts = self.max_attempts.max(1);
        self.max_regenerations = self.max_regenerations.max(1);
        self.recolor_probability = self.recolor_probability.clamp(0.0, 1.0);
        self
    }
}

/// What [`ensure_playable`] had to do to hand back a playable grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repair {
    /// The input already had a valid move and is returned unchanged.
    Untouched,
    /// The input was reshuffled `attempts` times until a move appeared.
    Reshuffled { attempts: u32 },
    /// Shuffling did not help; a fresh grid was generated `regenerations` times.
    Regenerated { regenerations: u32 },
}

impl Repair {
    pub fn changed(&self) -> bool {
        !matches!(self, Repair::Untouched)
    }
}

/// Checks whether the grid holds at least one region of `MIN_MATCH_LEN` or more.
///
/// Every cell is examined at most once: cells already swallowed by a region are
/// skipped. Returns as soon as a large enough region is found.
///
/// # Examples
/// ```
/// use block_blast::playability::has_valid_move;
/// use block_blast::utils::grid_from_str_array;
///
/// assert!(has_valid_move(&grid_from_str_array(&["001", "102"]).unwrap()));
/// assert!(!has_valid_move(&grid_from_str_array(&["012", "120"]).unwrap()));
/// ```
pub fn has_valid_move(grid: &Grid) -> bool {
    let mut visited = HashSet::new();
    for r in 0..grid.rows() {
        for c in 0..grid.cols() {
            let Some(color) = grid.color_at(r, c) else {
                continue;
            };
            if visited.contains(&CellKey::new(r, c)) {
                continue;
            }
            if grid.find_connected_region(r, c, color, &mut visited).len() >= MIN_MATCH_LEN {
                return true;
            }
        }
    }
    false
}

/// Randomly redistributes the grid's blocks over the cells they occupy.
///
/// The blocks are permuted with a Fisher–Yates shuffle across the same list of
/// occupied positions, so empty cells stay empty. Each block gets an id matching
/// its new position and, with probability `recolor_probability`, a new uniformly
/// random color. The recoloring makes a playable result more likely at the cost of
/// not preserving the original color multiset.
///
/// # Arguments
/// * `grid`: the grid to shuffle. It is not modified.
/// * `color_count`: palette size used for recoloring.
/// * `recolor_probability`: chance in `[0, 1]` that a block is recolored.
/// * `rng`: the random source.
pub fn shuffle(
    grid: &Grid,
    color_count: ColorIndex,
    recolor_probability: f64,
    rng: &mut impl Rng,
) -> Grid {
    let mut positions = Vec::new();
    let mut blocks = Vec::new();
    for (key, block) in grid.blocks() {
        positions.push(key);
        blocks.push(block.clone());
    }

    blocks.shuffle(rng);

    let mut shuffled = Grid::new_empty(grid.rows(), grid.cols());
    for (key, block) in positions.into_iter().zip(blocks) {
        let mut color = block.color_index;
        if color_count > 0 && rng.gen_bool(recolor_probability.clamp(0.0, 1.0)) {
            color = random_color(rng, color_count);
        }
        let mut moved = Block::at(key.row, key.col, color);
        moved.special = block.special;
        shuffled.set(key.row, key.col, Some(moved));
    }
    shuffled
}

/// Returns a grid guaranteed to contain a valid move.
///
/// If `grid` already has a move it is returned as is. Otherwise it is reshuffled up
/// to `policy.max_attempts` times; if that fails, brand new grids are generated and
/// each one is put through the same shuffle loop, so whatever is returned has been
/// verified with [`has_valid_move`].
///
/// # Returns
/// * `Ok((Grid, Repair))`: a playable grid and what it took to get it.
/// * `Err(EngineError)`: the board is too small to ever hold a match, the color
///   count is zero, or `policy.max_regenerations` fresh grids all failed.
pub fn ensure_playable(
    grid: Grid,
    color_count: ColorIndex,
    policy: &ReshufflePolicy,
    rng: &mut impl Rng,
) -> Result<(Grid, Repair), EngineError> {
    if has_valid_move(&grid) {
        return Ok((grid, Repair::Untouched));
    }
    if color_count == 0 {
        return Err(EngineError::InvalidColorCount(color_count));
    }
    if grid.rows() * grid.cols() < MIN_MATCH_LEN {
        return Err(EngineError::NoPlayableGrid { regenerations: 0 });
    }

    let (rows, cols) = (grid.rows(), grid.cols());
    let mut current = grid;
    let mut regenerations = 0;

    loop {
        let mut attempts = 0;
        while !has_valid_move(&current) && attempts < policy.max_attempts {
            current = shuffle(&current, color_count, policy.recolor_probability, rng);
            attempts += 1;
        }

        if has_valid_move(&current) {
            let repair = if regenerations == 0 {
                info!("board reshuffled after {} attempt(s)", attempts);
                Repair::Reshuffled { attempts }
            } else {
                info!("board regenerated {} time(s)", regenerations);
                Repair::Regenerated { regenerations }
            };
            return Ok((current, repair));
        }

        if regenerations >= policy.max_regenerations {
            warn!(
                "giving up on a playable {}x{} grid with {} colors",
                rows, cols, color_count
            );
            return Err(EngineError::NoPlayableGrid { regenerations });
        }

        // Shuffling could not help; start over from a fresh grid.
        current = Grid::new_random(rows, cols, color_count, rng)?;
        regenerations += 1;
    }
}

/// Generates a fresh grid and makes it playable. Used at every level start.
pub fn create_playable_grid(
    rows: usize,
    cols: usize,
    color_count: ColorIndex,
    policy: &ReshufflePolicy,
    rng: &mut impl Rng,
) -> Result<Grid, EngineError> {
    let grid = Grid::new_random(rows, cols, color_count, rng)?;
    ensure_playable(grid, color_count, policy, rng).map(|(grid, _)| grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::grid_from_str_array;
    use proptest::prelude::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    // No color appears more than twice, so no shuffle without recoloring can help.
    fn stuck_grid() -> Grid {
        grid_from_str_array(&["0123", "4567", "0123", "4567"]).unwrap()
    }

    fn color_histogram(grid: &Grid) -> Vec<usize> {
        let mut counts = vec![0; 10];
        for (_, b) in grid.blocks() {
            counts[b.color_index as usize] += 1;
        }
        counts
    }

    #[test]
    fn test_has_valid_move_l_shape() {
        let grid = grid_from_str_array(&["01", "00"]).unwrap();
        assert!(has_valid_move(&grid));
    }

    #[test]
    fn test_has_valid_move_needs_connected_cells() {
        assert!(has_valid_move(&grid_from_str_array(&["001", "102"]).unwrap()));
        // Three zeros, but the one at (1,2) does not touch the pair.
        assert!(!has_valid_move(&grid_from_str_array(&["001", "120"]).unwrap()));
    }

    #[test]
    fn test_has_valid_move_pairs_only() {
        let grid = grid_from_str_array(&["0011", "1100"]).unwrap();
        assert!(!has_valid_move(&grid));
        assert!(!has_valid_move(&Grid::new_empty(3, 3)));
    }

    #[test]
    fn test_shuffle_keeps_positions_and_restamps_ids() {
        let grid = grid_from_str_array(&["01.", "2.3", "456"]).unwrap();
        let mut rng = SmallRng::seed_from_u64(7);
        let shuffled = shuffle(&grid, 7, 0.0, &mut rng);

        assert_eq!(shuffled.block_count(), grid.block_count());
        assert!(shuffled.get(0, 2).is_none());
        assert!(shuffled.get(1, 1).is_none());
        for (key, block) in shuffled.blocks() {
            assert_eq!(block.id, format!("block-{}-{}", key.row, key.col));
        }
        // Without recoloring the color multiset is preserved.
        assert_eq!(color_histogram(&shuffled), color_histogram(&grid));
    }

    #[test]
    fn test_shuffle_recolor_stays_in_range() {
        let grid = stuck_grid();
        let mut rng = SmallRng::seed_from_u64(11);
        let shuffled = shuffle(&grid, 8, 1.0, &mut rng);
        assert!(shuffled.colors_within(8));
        assert_eq!(shuffled.block_count(), 16);
    }

    #[test]
    fn test_ensure_playable_untouched() {
        let grid = grid_from_str_array(&["000", "123"]).unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        let (out, repair) =
            ensure_playable(grid.clone(), 4, &ReshufflePolicy::default(), &mut rng).unwrap();
        assert_eq!(repair, Repair::Untouched);
        assert_eq!(out, grid);
    }

    #[test]
    fn test_ensure_playable_repairs_stuck_board() {
        let grid = grid_from_str_array(&["01201", "12012", "20120", "01201", "12012", "20120"])
            .unwrap();
        assert!(!has_valid_move(&grid));

        let mut rng = SmallRng::seed_from_u64(2024);
        let (out, repair) =
            ensure_playable(grid, 3, &ReshufflePolicy::default(), &mut rng).unwrap();
        assert!(has_valid_move(&out));
        assert!(repair.changed());
        assert!(out.colors_within(3));
        assert_eq!(out.block_count(), 30);
    }

    #[test]
    fn test_ensure_playable_falls_back_to_regeneration() {
        let policy = ReshufflePolicy {
            recolor_probability: 0.0,
            ..ReshufflePolicy::default()
        };
        let mut rng = SmallRng::seed_from_u64(99);
        let (out, repair) = ensure_playable(stuck_grid(), 8, &policy, &mut rng).unwrap();
        assert!(has_valid_move(&out));
        assert!(matches!(repair, Repair::Regenerated { regenerations } if regenerations >= 1));
        assert_eq!((out.rows(), out.cols()), (4, 4));
        assert!(out.colors_within(8));
    }

    #[test]
    fn test_ensure_playable_gives_up_on_tiny_board() {
        let grid = grid_from_str_array(&["01"]).unwrap();
        let mut rng = SmallRng::seed_from_u64(3);
        assert_eq!(
            ensure_playable(grid, 2, &ReshufflePolicy::default(), &mut rng),
            Err(EngineError::NoPlayableGrid { regenerations: 0 })
        );
    }

    #[test]
    fn test_ensure_playable_respects_regeneration_cap() {
        // Nine colors on a 1x3 strip almost never line up; one regeneration allowed.
        let policy = ReshufflePolicy {
            max_attempts: 1,
            recolor_probability: 0.0,
            max_regenerations: 1,
        };
        let grid = grid_from_str_array(&["012"]).unwrap();
        let mut rng = SmallRng::seed_from_u64(5);
        match ensure_playable(grid, 9, &policy, &mut rng) {
            Ok((out, _)) => assert!(has_valid_move(&out)),
            Err(e) => assert_eq!(e, EngineError::NoPlayableGrid { regenerations: 1 }),
        }
    }

    #[test]
    fn test_sanitized_policy() {
        let policy = ReshufflePolicy {
            max_attempts: 0,
            recolor_probability: 2.0,
            max_regenerations: 0,
        }
        .sanitized();
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.max_regenerations, 1);
        assert_eq!(policy.recolor_probability, 1.0);
    }

    proptest! {
        #[test]
        fn test_ensure_playable_always_returns_playable(seed in any::<u64>(), colors in 3u8..=8, rows in 5usize..=10, cols in 5usize..=9) {
            let mut rng = SmallRng::seed_from_u64(seed);
            let grid = Grid::new_random(rows, cols, colors, &mut rng).unwrap();
            let (out, _) = ensure_playable(grid, colors, &ReshufflePolicy::default(), &mut rng).unwrap();
            prop_assert!(has_valid_move(&out));
            prop_assert!(out.colors_within(colors));
            prop_assert_eq!((out.rows(), out.cols()), (rows, cols));
        }
    }
}
