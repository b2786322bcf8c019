//! The session controller: owns the grid and all game state, exposes the player
//! and lifecycle commands, and runs the deferred steps of the click pipeline.
//!
//! Everything happens on the caller's thread. Delayed steps (match check, gravity,
//! settle check, auto-shuffle, message clearing, end of game) are queued in a
//! [`Scheduler`] tagged with the current epoch and executed from [`Session::tick`].
//! Lifecycle transitions bump the epoch and cancel the queue, so a step scheduled
//! for an earlier game can never touch the current one.
use log::{debug, error, info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::config::{ms, SessionConfig};
use crate::engine::{CellKey, Grid};
use crate::gravity::apply_gravity;
use crate::hints::possible_moves;
use crate::levels::{LevelConfig, LevelProvider, StandardLevels};
use crate::playability::{create_playable_grid, ensure_playable, has_valid_move, shuffle, MIN_MATCH_LEN};
use crate::progress::{ProgressSnapshot, ProgressStore};
use crate::scheduler::Scheduler;
use crate::scoring::{chain_points, Combo};
use crate::selection::{SelectOutcome, Selection};

pub const SHUFFLING_MESSAGE: &str = "No moves left, shuffling the board...";
pub const SHUFFLED_MESSAGE: &str = "Board shuffled! Keep playing.";
pub const GAME_OVER_MESSAGE: &str = "Time's up!";

/// Where the session is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    Menu,
    Ready,
    Playing,
    Paused,
    /// No move was left; the board is about to be reshuffled.
    Shuffling,
    GameOver,
}

/// Why the grid was replaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridChange {
    NewLevel,
    Gravity,
    Reshuffle,
}

/// Notifications delivered to subscribers after each state change.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    StateChanged { from: GameState, to: GameState },
    ScoreChanged { score: u64, earned: u64, multiplier: f64 },
    SelectionChanged { cells: Vec<CellKey> },
    MatchCommitted { cells: Vec<CellKey>, points: u64 },
    GridReplaced { reason: GridChange },
    LevelAdvanced { level: u32, target_score: u64 },
    MessageChanged { message: Option<String> },
    GameOver { score: u64, new_best: bool },
}

/// Everything a front-end reads to draw the game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub game_state: GameState,
    pub score: u64,
    pub high_score: u64,
    pub level: u32,
    pub target_score: u64,
    /// Seconds.
    pub time_left: f64,
    pub combo_multiplier: f64,
    pub grid: Grid,
    /// In selection order.
    pub selected_blocks: Vec<CellKey>,
    pub matched_blocks: Vec<CellKey>,
    pub message: Option<String>,
    pub possible_moves: Vec<CellKey>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Deferred {
    CheckMatches,
    ApplyGravity,
    SettleCheck,
    AutoShuffle,
    EndGame,
    ClearMessage { seq: u64, state: GameState },
}

type Observer = Box<dyn FnMut(&SessionEvent)>;

/// One player's game.
pub struct Session {
    config: SessionConfig,
    levels: Box<dyn LevelProvider>,
    clock: Box<dyn Clock>,
    store: Option<Box<dyn ProgressStore>>,
    rng: SmallRng,

    state: GameState,
    level: u32,
    level_config: LevelConfig,
    score: u64,
    high_score: u64,
    time_left: f64,
    grid: Grid,
    selection: Selection,
    matched: BTreeSet<CellKey>,
    combo: Combo,
    message: Option<String>,
    message_seq: u64,
    progress: ProgressSnapshot,

    epoch: u64,
    scheduler: Scheduler<Deferred>,
    // Set from the moment the pipeline commits a match until its gravity lands.
    resolving: bool,
    check_pending: bool,
    end_pending: bool,

    observers: Vec<Observer>,
}

impl Session {
    /// Creates a session in the menu, using the wall clock, the standard levels
    /// and no persistence.
    pub fn new(config: SessionConfig) -> Self {
        let config = config.sanitized();
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let levels: Box<dyn LevelProvider> = Box::new(StandardLevels);
        let level_config = levels.level_config(1);

        Session {
            combo: Combo::new(config.combo),
            config,
            levels,
            clock: Box::new(SystemClock::new()),
            store: None,
            rng,
            state: GameState::Menu,
            level: 1,
            level_config,
            score: 0,
            high_score: 0,
            time_left: f64::from(level_config.time_limit),
            grid: Grid::new_empty(level_config.rows, level_config.cols),
            selection: Selection::new(),
            matched: BTreeSet::new(),
            message: None,
            message_seq: 0,
            progress: ProgressSnapshot::default(),
            epoch: 0,
            scheduler: Scheduler::new(),
            resolving: false,
            check_pending: false,
            end_pending: false,
            observers: Vec::new(),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_levels(mut self, levels: impl LevelProvider + 'static) -> Self {
        self.levels = Box::new(levels);
        self.level_config = self.levels.level_config(self.level);
        self.time_left = f64::from(self.level_config.time_limit);
        self.grid = Grid::new_empty(self.level_config.rows, self.level_config.cols);
        self
    }

    /// Attaches a progress store and loads the saved progress from it.
    ///
    /// A store that fails to load leaves the session with fresh progress.
    pub fn with_store(mut self, store: impl ProgressStore + 'static) -> Self {
        match store.load() {
            Ok(progress) => {
                self.high_score = self.high_score.max(progress.high_score);
                self.progress = progress;
            }
            Err(e) => warn!("could not load saved progress: {}", e),
        }
        self.store = Some(Box::new(store));
        self
    }

    /// Registers a callback invoked for every [`SessionEvent`].
    pub fn subscribe(&mut self, observer: impl FnMut(&SessionEvent) + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn high_score(&self) -> u64 {
        self.high_score
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn level_config(&self) -> &LevelConfig {
        &self.level_config
    }

    pub fn target_score(&self) -> u64 {
        self.level_config.target_score
    }

    /// Seconds left on the level clock.
    pub fn time_left(&self) -> f64 {
        self.time_left
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn selected_blocks(&self) -> &[CellKey] {
        self.selection.cells()
    }

    pub fn matched_blocks(&self) -> &BTreeSet<CellKey> {
        &self.matched
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn combo_multiplier(&self) -> f64 {
        self.combo.multiplier()
    }

    pub fn progress(&self) -> &ProgressSnapshot {
        &self.progress
    }

    /// Whether a committed match is still waiting for its gravity step.
    pub fn is_resolving(&self) -> bool {
        self.resolving
    }

    /// Time until the next deferred step is due, if any is pending.
    pub fn next_due_in(&self) -> Option<Duration> {
        let due = self.scheduler.next_due()?;
        Some(due.saturating_sub(self.clock.now()))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            game_state: self.state,
            score: self.score,
            high_score: self.high_score,
            level: self.level,
            target_score: self.level_config.target_score,
            time_left: self.time_left,
            combo_multiplier: self.combo.multiplier(),
            grid: self.grid.clone(),
            selected_blocks: self.selection.cells().to_vec(),
            matched_blocks: self.matched.iter().copied().collect(),
            message: self.message.clone(),
            possible_moves: possible_moves(&self.grid, &self.matched).into_iter().collect(),
        }
    }

    // ---- lifecycle -------------------------------------------------------

    pub fn show_menu(&mut self) {
        self.reset_transient();
        self.set_state(GameState::Menu);
        self.clear_message();
    }

    /// Moves from the menu or a finished game to the ready screen.
    pub fn ready(&mut self) {
        if !matches!(self.state, GameState::Menu | GameState::GameOver) {
            debug!("ready ignored in state {:?}", self.state);
            return;
        }
        self.set_state(GameState::Ready);
    }

    /// Starts a new game at level 1 with a score of zero.
    pub fn start_game(&mut self) {
        self.score = 0;
        self.begin_level(1);
        info!("game started (best so far {})", self.high_score);
        self.set_message(
            "Level 1 — let's go!".to_string(),
            self.config.timings.start_message,
        );
    }

    /// Replays the current level from a score of zero.
    pub fn restart_game(&mut self) {
        if self.state == GameState::Menu {
            debug!("restart ignored in the menu");
            return;
        }
        self.score = 0;
        self.begin_level(self.level);
        info!("level {} restarted", self.level);
        self.set_message(
            format!("Level {} — starting over!", self.level),
            self.config.timings.start_message,
        );
    }

    /// Moves on to the next level. The score carries over.
    pub fn advance_level(&mut self) {
        if matches!(self.state, GameState::Menu | GameState::Ready) {
            debug!("advance ignored in state {:?}", self.state);
            return;
        }
        if !self.begin_level(self.level + 1) {
            return;
        }
        info!(
            "advanced to level {} with score {} (next target {})",
            self.level, self.score, self.level_config.target_score
        );

        if self.progress.record_level(self.level) {
            self.save_progress();
        }
        self.emit(SessionEvent::LevelAdvanced {
            level: self.level,
            target_score: self.level_config.target_score,
        });
        self.set_message(
            format!("Level {} — great!", self.level),
            self.config.timings.level_message,
        );
    }

    pub fn pause_game(&mut self) {
        if self.state == GameState::Playing {
            self.set_state(GameState::Paused);
        }
    }

    pub fn resume_game(&mut self) {
        if self.state == GameState::Paused {
            self.set_state(GameState::Playing);
        }
    }

    /// Ends the game and records it.
    ///
    /// Calling it again once the game is over only zeroes the clock.
    pub fn end_game(&mut self) {
        if self.state == GameState::GameOver {
            self.time_left = 0.0;
            return;
        }
        if matches!(self.state, GameState::Menu | GameState::Ready) {
            debug!("end ignored in state {:?}", self.state);
            return;
        }

        self.reset_transient();
        self.time_left = 0.0;
        self.set_state(GameState::GameOver);

        let new_best = self.progress.record_game(self.score, self.level);
        self.high_score = self.high_score.max(self.score);
        self.save_progress();
        info!(
            "game over at level {} with score {}{}",
            self.level,
            self.score,
            if new_best { " (new best)" } else { "" }
        );

        self.emit(SessionEvent::GameOver {
            score: self.score,
            new_best,
        });
        self.set_message(
            GAME_OVER_MESSAGE.to_string(),
            self.config.timings.game_over_message,
        );
    }

    /// Reshuffles the board and resumes play.
    ///
    /// Only while playing or shuffling, and not while a match is resolving.
    pub fn shuffle_board(&mut self) {
        if !matches!(self.state, GameState::Playing | GameState::Shuffling) {
            debug!("shuffle ignored in state {:?}", self.state);
            return;
        }
        if self.resolving || !self.matched.is_empty() {
            debug!("shuffle ignored while a match is resolving");
            return;
        }

        let color_count = self.level_config.color_count;
        let policy = self.config.reshuffle;
        let shuffled = shuffle(
            &self.grid,
            color_count,
            policy.recolor_probability,
            &mut self.rng,
        );
        match ensure_playable(shuffled, color_count, &policy, &mut self.rng) {
            Ok((grid, _)) => {
                self.grid = grid;
                self.emit(SessionEvent::GridReplaced {
                    reason: GridChange::Reshuffle,
                });
            }
            Err(e) => error!("reshuffle failed, keeping the previous grid: {}", e),
        }

        if !self.selection.is_empty() {
            self.selection.clear();
            self.emit(SessionEvent::SelectionChanged { cells: Vec::new() });
        }
        self.set_state(GameState::Playing);
        self.set_message(
            SHUFFLED_MESSAGE.to_string(),
            self.config.timings.shuffle_message,
        );
    }

    // ---- play ------------------------------------------------------------

    /// Applies a click to the current chain. Ignored unless playing.
    pub fn select_block(&mut self, row: usize, col: usize) -> SelectOutcome {
        if self.state != GameState::Playing || self.resolving {
            debug!("click on ({}, {}) ignored in state {:?}", row, col, self.state);
            return SelectOutcome::Ignored;
        }
        if self.matched.contains(&CellKey::new(row, col)) {
            debug!("click on ({}, {}) ignored, cell already matched", row, col);
            return SelectOutcome::Ignored;
        }

        let outcome = self.selection.select(&self.grid, row, col);
        if matches!(
            outcome,
            SelectOutcome::Started | SelectOutcome::Extended | SelectOutcome::Restarted
        ) {
            self.emit(SessionEvent::SelectionChanged {
                cells: self.selection.cells().to_vec(),
            });
        }
        outcome
    }

    /// Commits the current chain when it has at least three cells.
    ///
    /// The chain's cells join the matched set (on top of any still pending) and the
    /// chain points, times the combo multiplier, are added to the score.
    ///
    /// # Returns
    /// `true` if a match was committed. Shorter chains are left untouched.
    pub fn check_for_matches(&mut self) -> bool {
        if self.state != GameState::Playing || self.selection.len() < MIN_MATCH_LEN {
            return false;
        }

        let cells = self.selection.take();
        let points = chain_points(cells.len());
        self.matched.extend(cells.iter().copied());
        self.emit(SessionEvent::SelectionChanged { cells: Vec::new() });
        self.emit(SessionEvent::MatchCommitted { cells, points });
        self.add_score(points);
        true
    }

    /// Adds `points` scaled by the combo multiplier. Returns the points earned.
    pub fn add_score(&mut self, points: u64) -> u64 {
        let multiplier = self.combo.register(self.clock.now());
        let earned = self.combo.apply(points);
        self.score += earned;
        self.emit(SessionEvent::ScoreChanged {
            score: self.score,
            earned,
            multiplier,
        });
        earned
    }

    /// Removes the matched cells, lets the board settle and refills it.
    ///
    /// Reaching the target score advances the level right away. Otherwise a
    /// playability check is scheduled after the settle delay.
    pub fn update_grid(&mut self) {
        if self.matched.is_empty() {
            return;
        }

        match apply_gravity(
            &self.grid,
            &self.matched,
            self.level_config.color_count,
            &self.config.reshuffle,
            &mut self.rng,
        ) {
            Ok(outcome) => {
                if outcome.repair.changed() {
                    debug!("gravity result repaired: {:?}", outcome.repair);
                }
                self.grid = outcome.grid;
                self.emit(SessionEvent::GridReplaced {
                    reason: GridChange::Gravity,
                });
            }
            Err(e) => error!("gravity failed, keeping the previous grid: {}", e),
        }
        self.matched.clear();
        self.resolving = false;

        if self.score >= self.level_config.target_score {
            self.advance_level();
            return;
        }
        self.schedule(Deferred::SettleCheck, self.config.timings.settle_delay);
    }

    /// Counts the level clock down by `delta` seconds while playing.
    ///
    /// When the clock hits zero the end of the game is scheduled, once.
    pub fn update_time_left(&mut self, delta: f64) {
        if self.state != GameState::Playing {
            return;
        }
        self.time_left = (self.time_left - delta.max(0.0)).max(0.0);
        if self.time_left <= 0.0 && !self.end_pending {
            self.end_pending = true;
            self.schedule(Deferred::EndGame, 0);
        }
    }

    /// A click from the input layer: selects, then runs the match pipeline.
    ///
    /// After the match-check delay the chain is checked; a committed match blocks
    /// further clicks until its gravity has been applied after the gravity delay.
    /// At most one match check is pending at a time.
    pub fn activate_cell(&mut self, row: usize, col: usize) -> SelectOutcome {
        if self.resolving {
            debug!("click on ({}, {}) ignored while a match resolves", row, col);
            return SelectOutcome::Ignored;
        }
        let outcome = self.select_block(row, col);
        if outcome != SelectOutcome::Ignored && !self.check_pending {
            self.check_pending = true;
            self.schedule(Deferred::CheckMatches, self.config.timings.match_check_delay);
        }
        outcome
    }

    /// Advances the session by one frame of `delta` seconds.
    ///
    /// Runs the level clock, then every deferred step that is due. While paused
    /// the deferred steps are held and run once play resumes.
    pub fn tick(&mut self, delta: f64) {
        self.update_time_left(delta);
        self.run_due();
    }

    pub fn clear_message(&mut self) {
        if self.message.take().is_some() {
            self.emit(SessionEvent::MessageChanged { message: None });
        }
    }

    /// Reconciles local progress with another store.
    ///
    /// The merged record is saved to both sides and its best score adopted. Any
    /// failure is logged and leaves local progress as it was.
    pub fn sync_progress(&mut self, remote: &dyn ProgressStore) {
        let theirs = match remote.load() {
            Ok(theirs) => theirs,
            Err(e) => {
                warn!("progress sync skipped, remote load failed: {}", e);
                return;
            }
        };

        let merged = theirs.merge(&self.progress);
        if let Err(e) = remote.save(&merged) {
            warn!("progress sync could not save remotely: {}", e);
        }
        self.progress = merged;
        self.high_score = self.high_score.max(self.progress.high_score);
        self.save_progress();
    }

    // ---- internals -------------------------------------------------------

    // The level, its config and its grid are committed together. When no grid
    // can be built the previous level stays in effect and `false` is returned.
    fn begin_level(&mut self, level: u32) -> bool {
        self.reset_transient();
        let level = level.max(1);
        let config = self.levels.level_config(level);

        let started = match create_playable_grid(
            config.rows,
            config.cols,
            config.color_count,
            &self.config.reshuffle,
            &mut self.rng,
        ) {
            Ok(grid) => {
                self.level = level;
                self.level_config = config;
                self.grid = grid;
                self.emit(SessionEvent::GridReplaced {
                    reason: GridChange::NewLevel,
                });
                true
            }
            Err(e) => {
                error!("no grid for level {}, staying on level {}: {}", level, self.level, e);
                false
            }
        };
        self.time_left = f64::from(self.level_config.time_limit);
        self.set_state(GameState::Playing);
        started
    }

    // Starts a new epoch: everything pending belongs to the old one.
    fn reset_transient(&mut self) {
        self.epoch += 1;
        self.scheduler.cancel_all();
        self.selection.clear();
        self.matched.clear();
        self.combo.reset();
        self.resolving = false;
        self.check_pending = false;
        self.end_pending = false;
    }

    fn set_state(&mut self, to: GameState) {
        let from = self.state;
        if from != to {
            self.state = to;
            self.emit(SessionEvent::StateChanged { from, to });
        }
    }

    // The message clears itself after `clear_after_ms` if it is still current and
    // the state has not changed.
    fn set_message(&mut self, text: String, clear_after_ms: u64) {
        self.message_seq += 1;
        self.message = Some(text.clone());
        self.emit(SessionEvent::MessageChanged {
            message: Some(text),
        });
        self.schedule(
            Deferred::ClearMessage {
                seq: self.message_seq,
                state: self.state,
            },
            clear_after_ms,
        );
    }

    fn begin_auto_shuffle(&mut self) {
        info!("no moves left on level {}, shuffling", self.level);
        self.set_state(GameState::Shuffling);
        self.message_seq += 1;
        self.message = Some(SHUFFLING_MESSAGE.to_string());
        self.emit(SessionEvent::MessageChanged {
            message: self.message.clone(),
        });
        self.schedule(Deferred::AutoShuffle, self.config.timings.auto_shuffle_delay);
    }

    fn save_progress(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&self.progress) {
                warn!("could not save progress: {}", e);
            }
        }
    }

    fn schedule(&mut self, task: Deferred, delay_ms: u64) {
        self.scheduler
            .schedule(self.clock.now(), ms(delay_ms), self.epoch, task);
    }

    fn run_due(&mut self) {
        while self.state != GameState::Paused {
            let Some(entry) = self.scheduler.pop_due(self.clock.now()) else {
                return;
            };
            if entry.epoch != self.epoch {
                debug!(
                    "dropping stale {:?} from epoch {} (current {})",
                    entry.task, entry.epoch, self.epoch
                );
                continue;
            }
            self.handle(entry.task);
        }
    }

    fn handle(&mut self, task: Deferred) {
        match task {
            Deferred::CheckMatches => {
                self.check_pending = false;
                if self.check_for_matches() {
                    self.resolving = true;
                    self.schedule(Deferred::ApplyGravity, self.config.timings.gravity_delay);
                }
            }
            Deferred::ApplyGravity => self.update_grid(),
            Deferred::SettleCheck => {
                if self.state == GameState::Playing
                    && !self.resolving
                    && self.matched.is_empty()
                    && !has_valid_move(&self.grid)
                {
                    self.begin_auto_shuffle();
                }
            }
            Deferred::AutoShuffle => {
                if self.state == GameState::Shuffling {
                    self.shuffle_board();
                }
            }
            Deferred::EndGame => {
                if self.end_pending {
                    self.end_game();
                }
            }
            Deferred::ClearMessage { seq, state } => {
                if self.message_seq == seq && self.state == state {
                    self.clear_message();
                }
            }
        }
    }

    fn emit(&mut self, event: SessionEvent) {
        for observer in &mut self.observers {
            observer(&event);
        }
    }
}
