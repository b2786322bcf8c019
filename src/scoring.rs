//! Scoring rules: chain points and the time-decay combo multiplier.
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Points for committing a chain of `len` cells, before the combo multiplier.
///
/// `len * 10 * max(1, len - 2)`: a 3-chain is worth 30, a 4-chain 80, a 5-chain 150.
///
/// # Examples
/// ```
/// use block_blast::scoring::chain_points;
/// assert_eq!(chain_points(3), 30);
/// assert_eq!(chain_points(4), 80);
/// assert_eq!(chain_points(5), 150);
/// ```
pub fn chain_points(len: usize) -> u64 {
    let len = len as u64;
    len * 10 * len.saturating_sub(2).max(1)
}

/// Tuning of the combo multiplier.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComboRules {
    /// Matches closer together than this keep the combo going.
    pub window_ms: u64,
    /// Added to the multiplier for each match inside the window.
    pub step: f64,
    /// Upper bound of the multiplier.
    pub cap: f64,
}

impl Default for ComboRules {
    fn default() -> Self {
        Self {
            window_ms: 1000,
            step: 0.5,
            cap: 3.0,
        }
    }
}

impl ComboRules {
    pub fn sanitized(mut self) -> Self {
        self.step = self.step.max(0.0);
        self.cap = self.cap.max(1.0);
        self
    }
}

/// Combo state carried across matches within a level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Combo {
    rules: ComboRules,
    multiplier: f64,
    last_match: Option<Duration>,
}

impl Combo {
    pub fn new(rules: ComboRules) -> Self {
        Combo {
            rules,
            multiplier: 1.0,
            last_match: None,
        }
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Time of the last registered match, if any.
    pub fn last_match(&self) -> Option<Duration> {
        self.last_match
    }

    /// Back to a multiplier of 1 with no previous match.
    pub fn reset(&mut self) {
        self.multiplier = 1.0;
        self.last_match = None;
    }

    /// Registers a match at `now` and returns the multiplier that applies to it.
    ///
    /// Inside the window the multiplier grows by `step` up to `cap`; after a gap of
    /// at least `window_ms` (or on the first match) it falls back to 1.
    pub fn register(&mut self, now: Duration) -> f64 {
        let window = Duration::from_millis(self.rules.window_ms);
        let within = self
            .last_match
            .is_some_and(|last| now.saturating_sub(last) < window);

        self.multiplier = if within {
            (self.multiplier + self.rules.step).min(self.rules.cap)
        } else {
            1.0
        };
        self.last_match = Some(now);
        self.multiplier
    }

    /// Applies the multiplier to `points`, rounding to the nearest whole point.
    pub fn apply(&self, points: u64) -> u64 {
        (points as f64 * self.multiplier).round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_chain_points_table() {
        assert_eq!(chain_points(0), 0);
        assert_eq!(chain_points(1), 10);
        assert_eq!(chain_points(3), 30);
        assert_eq!(chain_points(6), 240);
    }

    #[test]
    fn test_first_match_has_no_bonus() {
        let mut combo = Combo::new(ComboRules::default());
        assert_eq!(combo.register(ms(0)), 1.0);
        assert_eq!(combo.apply(30), 30);
    }

    #[test]
    fn test_quick_matches_build_up_to_cap() {
        let mut combo = Combo::new(ComboRules::default());
        combo.register(ms(10_000));
        assert_eq!(combo.register(ms(10_500)), 1.5);
        assert_eq!(combo.register(ms(11_000)), 2.0);
        assert_eq!(combo.register(ms(11_900)), 2.5);
        assert_eq!(combo.register(ms(12_000)), 3.0);
        assert_eq!(combo.register(ms(12_100)), 3.0);
        assert_eq!(combo.apply(30), 90);
    }

    #[test]
    fn test_gap_resets_multiplier() {
        let mut combo = Combo::new(ComboRules::default());
        combo.register(ms(0));
        combo.register(ms(200));
        assert_eq!(combo.multiplier(), 1.5);
        assert_eq!(combo.register(ms(1_200)), 1.0, "exactly one window apart resets");
        assert_eq!(combo.register(ms(5_000)), 1.0);
    }

    #[test]
    fn test_reset_forgets_last_match() {
        let mut combo = Combo::new(ComboRules::default());
        combo.register(ms(100));
        combo.register(ms(200));
        combo.reset();
        assert_eq!(combo.last_match(), None);
        assert_eq!(combo.register(ms(300)), 1.0);
    }

    #[test]
    fn test_half_step_scores_stay_whole() {
        let mut combo = Combo::new(ComboRules::default());
        combo.register(ms(0));
        combo.register(ms(1));
        assert_eq!(combo.apply(chain_points(3)), 45);
    }
}
