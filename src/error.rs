//! Error types shared across the engine.
//!
//! Gameplay commands on [`crate::session::Session`] never surface these; they are
//! logged and absorbed there. The free functions of the engine and the
//! persistence/configuration layers return them so callers can decide.

use std::io;

use thiserror::Error;

/// Failures while building or repairing a grid.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A grid needs at least one row and one column.
    #[error("invalid grid dimensions {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },
    /// Colors are drawn from `0..color_count`, so zero colors cannot fill a grid.
    #[error("invalid color count {0}")]
    InvalidColorCount(u8),
    /// The grid could not be made playable within the regeneration budget.
    #[error("no playable grid after {regenerations} regenerations")]
    NoPlayableGrid { regenerations: u32 },
}

/// Failures while parsing a text fixture into a grid.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridParseError {
    #[error("grid fixture has no rows")]
    Empty,
    #[error("row {row} is too long. Expected at most {expected} characters, found {found}")]
    RowTooLong {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unrecognized character '{ch}' in row {row} col {col}")]
    UnrecognizedChar { ch: char, row: usize, col: usize },
    #[error("color {color} at row {row} col {col} is outside 0..{color_count}")]
    ColorOutOfRange {
        color: u8,
        row: usize,
        col: usize,
        color_count: u8,
    },
}

/// A `"row,col"` key that could not be parsed back into coordinates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("malformed cell key {0:?}")]
pub struct ParseCellKeyError(pub String);

/// Failures of a progress store. Always treated as best-effort by the session.
#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("progress io error: {0}")]
    Io(#[from] io::Error),
    #[error("progress data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("progress store unavailable: {0}")]
    Unavailable(String),
}

/// Failures while loading a [`crate::config::SessionConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}
