//! Gravity and refill: turning a grid with matched cells into the next grid.
use rand::Rng;
use std::collections::BTreeSet;

use crate::engine::{Block, CellKey, ColorIndex, Grid};
use crate::error::EngineError;
use crate::playability::{ensure_playable, Repair, ReshufflePolicy};

/// The result of one gravity step.
#[derive(Clone, Debug)]
pub struct GravityOutcome {
    /// The grid to commit. Already verified playable.
    pub grid: Grid,
    /// Blocks that dropped in from the top during the refill.
    pub new_blocks: Vec<Block>,
    /// What the playability guarantee had to do after the refill.
    pub repair: Repair,
}

/// Removes the matched cells, lets the columns settle and refills from the top.
///
/// 1. Every cell in `matched` is emptied (keys outside the grid are ignored).
/// 2. Each column is compacted downward, keeping the relative order of its blocks.
/// 3. The empty cells left at the top of each column get new random blocks.
/// 4. If the refilled grid has no valid move, the playability guarantee repairs it
///    and the repaired grid is returned instead.
///
/// The input grid is not modified; the caller commits the returned grid.
///
/// # Errors
/// Only when the playability repair gives up, see [`ensure_playable`].
pub fn apply_gravity(
    grid: &Grid,
    matched: &BTreeSet<CellKey>,
    color_count: ColorIndex,
    policy: &ReshufflePolicy,
    rng: &mut impl Rng,
) -> Result<GravityOutcome, EngineError> {
    let mut next = grid.clone();
    next.remove_cells(matched);
    next.compact_columns();
    let new_blocks = next.refill(color_count, rng);

    let (grid, repair) = ensure_playable(next, color_count, policy, rng)?;
    Ok(GravityOutcome {
        grid,
        new_blocks,
        repair,
    })
}
