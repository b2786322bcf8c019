//! Level progression: board size, palette, score target and time limit per level.
use serde::{Deserialize, Serialize};

use crate::engine::ColorIndex;

/// Board and goal settings of one level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelConfig {
    pub level: u32,
    pub rows: usize,
    pub cols: usize,
    pub color_count: ColorIndex,
    pub target_score: u64,
    /// Seconds available to reach `target_score`.
    pub time_limit: u32,
}

const fn tier(
    level: u32,
    rows: usize,
    cols: usize,
    color_count: ColorIndex,
    target_score: u64,
    time_limit: u32,
) -> LevelConfig {
    LevelConfig {
        level,
        rows,
        cols,
        color_count,
        target_score,
        time_limit,
    }
}

/// The explicitly tuned levels. Later levels are extrapolated from the last one.
pub const LEVEL_TABLE: [LevelConfig; 10] = [
    tier(1, 6, 5, 3, 500, 60),
    tier(2, 6, 5, 4, 1000, 60),
    tier(3, 7, 6, 4, 1500, 75),
    tier(4, 7, 6, 5, 2000, 75),
    tier(5, 8, 7, 5, 2500, 90),
    tier(6, 8, 7, 6, 3000, 90),
    tier(7, 9, 8, 6, 3500, 105),
    tier(8, 9, 8, 7, 4000, 105),
    tier(9, 10, 9, 7, 4500, 120),
    tier(10, 10, 9, 8, 5000, 120),
];

pub const MAX_ROWS: usize = 12;
pub const MAX_COLS: usize = 10;
pub const MAX_COLORS: ColorIndex = 8;
pub const MAX_TIME_LIMIT: u32 = 180;

/// Looks up the configuration of `level`.
///
/// Levels inside the table are returned as tuned. Past the table every two levels
/// add a row and a column (up to 12×10), every three levels add a color (up to 8),
/// each level adds 500 to the target and 5 seconds to the clock (up to 180).
/// Level 0 is treated as level 1, so the lookup is total.
///
/// # Examples
/// ```
/// use block_blast::levels::level_config;
/// assert_eq!(level_config(1).target_score, 500);
/// assert_eq!(level_config(12).rows, 11);
/// assert_eq!(level_config(12).target_score, 6000);
/// ```
pub fn level_config(level: u32) -> LevelConfig {
    let level = level.max(1);
    if let Some(config) = LEVEL_TABLE.iter().find(|c| c.level == level) {
        return *config;
    }

    let last = LEVEL_TABLE[LEVEL_TABLE.len() - 1];
    let diff = level - last.level;
    LevelConfig {
        level,
        rows: (last.rows + (diff / 2) as usize).min(MAX_ROWS),
        cols: (last.cols + (diff / 2) as usize).min(MAX_COLS),
        color_count: (last.color_count as u32 + diff / 3).min(MAX_COLORS as u32) as ColorIndex,
        target_score: last.target_score + u64::from(diff) * 500,
        time_limit: last.time_limit.saturating_add(diff.saturating_mul(5)).min(MAX_TIME_LIMIT),
    }
}

/// Source of level configurations consumed by the session.
///
/// Implementations must be deterministic and defined for every level ≥ 1.
pub trait LevelProvider {
    fn level_config(&self, level: u32) -> LevelConfig;
}

/// The built-in progression, see [`level_config`].
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardLevels;

impl LevelProvider for StandardLevels {
    fn level_config(&self, level: u32) -> LevelConfig {
        level_config(level)
    }
}
