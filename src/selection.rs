//! The in-progress chain the player is building.
use log::debug;
use serde::{Deserialize, Serialize};

use crate::engine::{CellKey, Grid};

/// How a click changed the selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectOutcome {
    /// The selection was empty and now holds the clicked cell.
    Started,
    /// The clicked cell continued the chain and was appended.
    Extended,
    /// The clicked cell did not continue the chain; it is now the only member.
    Restarted,
    /// The clicked cell is already part of the chain. Nothing changed.
    AlreadySelected,
    /// The click was outside the grid or on an empty cell.
    Ignored,
}

/// An insertion-ordered set of cells forming the current chain.
///
/// Only the most recently appended cell is checked when extending: a new cell
/// must be orthogonally adjacent to it and share its color. Earlier members do not
/// need to be adjacent to the new one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    cells: Vec<CellKey>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// The most recently appended cell.
    pub fn last(&self) -> Option<CellKey> {
        self.cells.last().copied()
    }

    pub fn contains(&self, key: &CellKey) -> bool {
        self.cells.contains(key)
    }

    /// The chain in selection order.
    pub fn cells(&self) -> &[CellKey] {
        &self.cells
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Empties the selection and returns its cells in selection order.
    pub fn take(&mut self) -> Vec<CellKey> {
        std::mem::take(&mut self.cells)
    }

    /// Applies a click on `(row, col)`.
    ///
    /// An empty selection starts at the clicked cell. Otherwise the cell is appended
    /// when it is adjacent to the last selected cell and has the same color; any
    /// other click discards the chain and starts a new one at the clicked cell.
    /// There is no deselect: every accepted click either extends or restarts.
    ///
    /// Clicks outside the grid or on empty cells are ignored.
    pub fn select(&mut self, grid: &Grid, row: usize, col: usize) -> SelectOutcome {
        let Some(block) = grid.get(row, col) else {
            debug!("click on ({}, {}) ignored, no block there", row, col);
            return SelectOutcome::Ignored;
        };
        let key = CellKey::new(row, col);

        let Some(last) = self.last() else {
            self.cells.push(key);
            return SelectOutcome::Started;
        };

        let continues = last.is_adjacent_to(&key)
            && grid.color_at(last.row, last.col) == Some(block.color_index);

        if continues {
            if self.contains(&key) {
                return SelectOutcome::AlreadySelected;
            }
            self.cells.push(key);
            SelectOutcome::Extended
        } else {
            self.cells.clear();
            self.cells.push(key);
            SelectOutcome::Restarted
        }
    }
}
