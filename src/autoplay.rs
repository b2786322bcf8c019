//! A scripted player that drives a [`Session`] the way a person would: by
//! clicking cells and letting time pass.
use log::debug;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::clock::ManualClock;
use crate::config::SessionConfig;
use crate::hints::{suggest_chain, Strategy};
use crate::session::{GameState, GridChange, Session, SessionEvent};

/// Summary of one scripted game.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayReport {
    pub final_score: u64,
    pub level_reached: u32,
    /// Matches committed.
    pub matches: u32,
    /// Board reshuffles, automatic or not.
    pub shuffles: u32,
    /// Simulated seconds until the game ended or the time budget ran out.
    pub seconds_played: f64,
}

#[derive(Default)]
struct Tally {
    matches: u32,
    shuffles: u32,
}

/// Plays with a [`Strategy`], pausing `think_time` between moves.
///
/// Time is simulated with a [`ManualClock`] advanced in steps of `frame`, so a
/// game of several minutes runs in milliseconds and the same seed always plays
/// the same game.
#[derive(Clone, Copy, Debug)]
pub struct AutoPlayer {
    pub strategy: Strategy,
    pub think_time: Duration,
    pub frame: Duration,
}

impl AutoPlayer {
    pub fn new(strategy: Strategy) -> Self {
        AutoPlayer {
            strategy,
            think_time: Duration::from_millis(250),
            frame: Duration::from_millis(50),
        }
    }

    pub fn with_think_time(mut self, think_time: Duration) -> Self {
        self.think_time = think_time;
        self
    }

    /// Plays a fresh game built from `config` for at most `max_duration` of
    /// simulated time.
    pub fn play(&self, config: SessionConfig, max_duration: Duration) -> PlayReport {
        let clock = ManualClock::new();
        let mut session = Session::new(config).with_clock(clock.clone());
        self.run(&mut session, &clock, max_duration)
    }

    /// Starts a game on `session` and plays it until it is over or
    /// `max_duration` has passed.
    ///
    /// `clock` must be the clock the session reads. Moves are made only through
    /// [`Session::activate_cell`] and [`Session::tick`].
    pub fn run(
        &self,
        session: &mut Session,
        clock: &ManualClock,
        max_duration: Duration,
    ) -> PlayReport {
        let tally = Rc::new(RefCell::new(Tally::default()));
        let sink = Rc::clone(&tally);
        session.subscribe(move |event| match event {
            SessionEvent::MatchCommitted { .. } => sink.borrow_mut().matches += 1,
            SessionEvent::GridReplaced {
                reason: GridChange::Reshuffle,
            } => sink.borrow_mut().shuffles += 1,
            _ => {}
        });

        session.start_game();
        let frame = self.frame.max(Duration::from_millis(1));
        let mut elapsed = Duration::ZERO;
        let mut next_move_at = self.think_time;

        while session.state() != GameState::GameOver && elapsed < max_duration {
            let idle = session.state() == GameState::Playing
                && !session.is_resolving()
                && session.matched_blocks().is_empty()
                && session.selected_blocks().is_empty();

            if idle && elapsed >= next_move_at {
                match suggest_chain(session.grid(), session.matched_blocks(), self.strategy) {
                    Some(chain) => {
                        for cell in &chain {
                            session.activate_cell(cell.row, cell.col);
                        }
                    }
                    None => debug!("{} found no move, waiting", self.strategy),
                }
                next_move_at = elapsed + self.think_time;
            }

            clock.advance(frame);
            session.tick(frame.as_secs_f64());
            elapsed += frame;
        }

        let tally = tally.borrow();
        PlayReport {
            final_score: session.score(),
            level_reached: session.level(),
            matches: tally.matches,
            shuffles: tally.shuffles,
            seconds_played: elapsed.as_secs_f64(),
        }
    }
}
