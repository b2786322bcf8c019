use crate::engine::{Block, Grid};
use crate::error::GridParseError;

/// Widest fixture accepted by [`grid_from_str_array`].
pub const MAX_FIXTURE_COLS: usize = 32;

/// Parses an array of string slices into a `Grid`.
///
/// Each string slice represents a row, starting from the top (row 0). The grid
/// is as wide as the longest row; shorter rows are padded with empty cells.
///
/// Valid characters for cells are:
/// - `'0'..='9'`: a block of that color index
/// - `'.'`: an empty cell
///
/// Blocks get position-stamped ids (`block-row-col`), exactly like freshly
/// generated grids.
///
/// # Returns
/// * `Ok(Grid)` if parsing is successful.
/// * `Err(GridParseError)` if there are no rows, a row is wider than
///   `MAX_FIXTURE_COLS`, or an unrecognized character is encountered.
///
/// # Examples
/// ```
/// use block_blast::utils::grid_from_str_array;
///
/// let grid = grid_from_str_array(&["012", "1."]).unwrap();
/// assert_eq!(grid.cols(), 3);
/// assert_eq!(grid.color_at(0, 2), Some(2));
/// assert_eq!(grid.color_at(1, 1), None);
/// assert_eq!(grid.color_at(1, 2), None); // padded
///
/// assert!(grid_from_str_array(&["0x1"]).is_err());
/// ```
pub fn grid_from_str_array(s: &[&str]) -> Result<Grid, GridParseError> {
    if s.is_empty() {
        return Err(GridParseError::Empty);
    }

    let cols = s.iter().map(|row| row.chars().count()).max().unwrap_or(0);
    if cols == 0 {
        return Err(GridParseError::Empty);
    }

    let mut cells = Vec::with_capacity(s.len());
    for (r, row_str) in s.iter().enumerate() {
        let found = row_str.chars().count();
        if found > MAX_FIXTURE_COLS {
            return Err(GridParseError::RowTooLong {
                row: r,
                expected: MAX_FIXTURE_COLS,
                found,
            });
        }

        let mut row = vec![None; cols];
        for (c, ch) in row_str.chars().enumerate() {
            row[c] = match ch {
                '.' => None,
                d if d.is_ascii_digit() => Some(Block::at(r, c, d as u8 - b'0')),
                _ => return Err(GridParseError::UnrecognizedChar { ch, row: r, col: c }),
            };
        }
        cells.push(row);
    }

    Ok(Grid::from_rows(cells))
}

/// Like [`grid_from_str_array`], but also checks every color is below `color_count`.
pub fn grid_from_str_array_checked(
    s: &[&str],
    color_count: u8,
) -> Result<Grid, GridParseError> {
    let grid = grid_from_str_array(s)?;
    if let Some((key, block)) = grid.blocks().find(|(_, b)| b.color_index >= color_count) {
        return Err(GridParseError::ColorOutOfRange {
            color: block.color_index,
            row: key.row,
            col: key.col,
            color_count,
        });
    }
    Ok(grid)
}
