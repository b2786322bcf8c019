//! # Block Blast Library
//!
//! This library provides the rule engine of a chain-matching block puzzle: link
//! three or more orthogonally adjacent blocks of one color, clear them, let the
//! columns settle and refill, and climb through levels against the clock.
//!
//! It is used by three binaries:
//! - `human_player`: interactive play in the terminal.
//! - `autoplay`: one scripted game with an event trace.
//! - `strategy_evaluator`: compares the hint strategies over many seeded games.
//!
//! ## Modules
//! - `engine`: blocks, cell keys and the `Grid` with its region search, compaction
//!   and refill primitives.
//! - `gravity`: the remove, compact, refill and repair step after a match.
//! - `playability`: detecting a stuck board and reshuffling or regenerating it.
//! - `selection`: the chain the player is building.
//! - `scoring`: chain points and the combo multiplier.
//! - `levels`: board size, palette, target and time limit of every level.
//! - `session`: the state-owning controller with its commands, deferred steps,
//!   observers and snapshots.
//! - `progress`: best score, furthest level and history, and where they are stored.
//! - `hints`: possible-move highlighting and chain suggestions.
//! - `autoplay`: a scripted player built on `hints` and `session`.
//! - `scheduler`, `clock`: deferred continuations and the time source behind them.
//! - `config`, `error`: session settings and error types.
//! - `utils`: parsing grids from text fixtures.

pub mod autoplay;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod gravity;
pub mod hints;
pub mod levels;
pub mod playability;
pub mod progress;
pub mod scheduler;
pub mod scoring;
pub mod selection;
pub mod session;
pub mod utils;
