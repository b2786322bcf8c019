//! Long-term player progress: best score, furthest level, games played and the
//! most recent scores, plus the stores it is persisted to.
//!
//! The session treats every store as best-effort. Errors are returned here and
//! logged and swallowed by [`crate::session::Session`].
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::ProgressError;

/// Number of recent scores kept in a snapshot.
pub const RECENT_SCORES_LEN: usize = 10;

/// The persisted progress record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressSnapshot {
    pub high_score: u64,
    /// Furthest level reached. Never below 1.
    pub max_level: u32,
    pub total_games: u32,
    /// Oldest first, at most [`RECENT_SCORES_LEN`] entries.
    pub recent_scores: Vec<u64>,
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self {
            high_score: 0,
            max_level: 1,
            total_games: 0,
            recent_scores: Vec::new(),
        }
    }
}

fn keep_recent(scores: &mut Vec<u64>) {
    if scores.len() > RECENT_SCORES_LEN {
        scores.drain(..scores.len() - RECENT_SCORES_LEN);
    }
}

impl ProgressSnapshot {
    pub fn sanitized(mut self) -> Self {
        self.max_level = self.max_level.max(1);
        keep_recent(&mut self.recent_scores);
        self
    }

    /// Records a finished game.
    ///
    /// Always counts the game and appends its score to the recent list; the best
    /// score and furthest level only move when exceeded.
    ///
    /// # Returns
    /// `true` when `score` is a new best.
    pub fn record_game(&mut self, score: u64, level: u32) -> bool {
        self.total_games = self.total_games.saturating_add(1);
        self.recent_scores.push(score);
        keep_recent(&mut self.recent_scores);
        self.record_level(level);

        let new_best = score > self.high_score;
        if new_best {
            self.high_score = score;
        }
        new_best
    }

    /// Raises the furthest level reached. Returns whether it changed.
    pub fn record_level(&mut self, level: u32) -> bool {
        if level > self.max_level {
            self.max_level = level;
            true
        } else {
            false
        }
    }

    /// Combines two records of the same player.
    ///
    /// Scalars take the maximum of both sides. Recent scores are this record's
    /// followed by `other`'s, trimmed to the last [`RECENT_SCORES_LEN`].
    ///
    /// # Examples
    /// ```
    /// use block_blast::progress::ProgressSnapshot;
    ///
    /// let local = ProgressSnapshot { high_score: 900, max_level: 4, total_games: 3, recent_scores: vec![1, 2] };
    /// let remote = ProgressSnapshot { high_score: 700, max_level: 6, total_games: 2, recent_scores: vec![3] };
    /// let merged = local.merge(&remote);
    /// assert_eq!((merged.high_score, merged.max_level, merged.total_games), (900, 6, 3));
    /// assert_eq!(merged.recent_scores, vec![1, 2, 3]);
    /// ```
    pub fn merge(&self, other: &ProgressSnapshot) -> ProgressSnapshot {
        let mut recent_scores = self.recent_scores.clone();
        recent_scores.extend_from_slice(&other.recent_scores);
        keep_recent(&mut recent_scores);

        ProgressSnapshot {
            high_score: self.high_score.max(other.high_score),
            max_level: self.max_level.max(other.max_level).max(1),
            total_games: self.total_games.max(other.total_games),
            recent_scores,
        }
    }

    /// Mean of the recent scores, rounded. Zero when there are none.
    pub fn average_score(&self) -> u64 {
        if self.recent_scores.is_empty() {
            return 0;
        }
        let sum: u64 = self.recent_scores.iter().sum();
        let len = self.recent_scores.len() as u64;
        (sum + len / 2) / len
    }

    pub fn milestones(&self) -> Vec<Milestone> {
        let level = u64::from(self.max_level);
        let games = u64::from(self.total_games);
        vec![
            Milestone::new("Newcomer", "Play your first game", games, 1),
            Milestone::new("Explorer", "Reach level 5", level, 5),
            Milestone::new("Champion", "Score 1000 points in one game", self.high_score, 1000),
            Milestone::new("Veteran", "Play 10 games", games, 10),
            Milestone::new("Master", "Reach level 10", level, 10),
        ]
    }
}

/// An achievement derived from a [`ProgressSnapshot`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Milestone {
    pub name: &'static str,
    pub description: &'static str,
    pub unlocked: bool,
    /// How far along the player is, in `[0, 1]`.
    pub progress: f64,
}

impl Milestone {
    fn new(name: &'static str, description: &'static str, value: u64, goal: u64) -> Self {
        Milestone {
            name,
            description,
            unlocked: value >= goal,
            progress: (value as f64 / goal as f64).min(1.0),
        }
    }
}

/// Somewhere a [`ProgressSnapshot`] can be loaded from and saved to.
pub trait ProgressStore {
    fn load(&self) -> Result<ProgressSnapshot, ProgressError>;
    fn save(&self, snapshot: &ProgressSnapshot) -> Result<(), ProgressError>;
}

/// Stores progress as pretty-printed JSON in a single file.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProgressStore for JsonFileStore {
    /// A missing file is a fresh player, not an error.
    fn load(&self) -> Result<ProgressSnapshot, ProgressError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(ProgressSnapshot::default())
            }
            Err(e) => return Err(e.into()),
        };
        let snapshot: ProgressSnapshot = serde_json::from_slice(&bytes)?;
        Ok(snapshot.sanitized())
    }

    fn save(&self, snapshot: &ProgressSnapshot) -> Result<(), ProgressError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(snapshot)?;
        fs::write(&self.path, text)?;
        Ok(())
    }
}

/// An in-memory store for tests and headless play.
///
/// Clones share the same contents. A failing store rejects every call, which is
/// how persistence outages are simulated.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    snapshot: ProgressSnapshot,
    failing: bool,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: ProgressSnapshot) -> Self {
        let store = Self::new();
        store.inner.borrow_mut().snapshot = snapshot;
        store
    }

    /// A store whose every load and save fails.
    pub fn failing() -> Self {
        let store = Self::new();
        store.set_failing(true);
        store
    }

    pub fn set_failing(&self, failing: bool) {
        self.inner.borrow_mut().failing = failing;
    }

    /// The current contents, bypassing the failure switch.
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.inner.borrow().snapshot.clone()
    }

    /// Number of successful saves.
    pub fn saves(&self) -> usize {
        self.inner.borrow().saves
    }
}

impl ProgressStore for MemoryStore {
    fn load(&self) -> Result<ProgressSnapshot, ProgressError> {
        let inner = self.inner.borrow();
        if inner.failing {
            return Err(ProgressError::Unavailable("memory store offline".into()));
        }
        Ok(inner.snapshot.clone())
    }

    fn save(&self, snapshot: &ProgressSnapshot) -> Result<(), ProgressError> {
        let mut inner = self.inner.borrow_mut();
        if inner.failing {
            return Err(ProgressError::Unavailable("memory store offline".into()));
        }
        inner.snapshot = snapshot.clone();
        inner.saves += 1;
        Ok(())
    }
}
