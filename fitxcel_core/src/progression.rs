//! Progression math for experience and levels.
//!
//! Each level `n` needs `base_xp + (n - 1) * scaling` experience to clear.
//! Clearing a level resets experience to zero and awards one level point;
//! a single grant may clear any number of levels.

use crate::{Error, LevelProgress, Result, XpState};

/// Experience needed to clear level 1
pub const BASE_XP: u32 = 100;

/// Extra experience needed per level above 1
pub const SCALING: u32 = 20;

/// Linear level curve parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelCurve {
    base_xp: u32,
    scaling: u32,
}

impl Default for LevelCurve {
    fn default() -> Self {
        Self {
            base_xp: BASE_XP,
            scaling: SCALING,
        }
    }
}

impl LevelCurve {
    /// Curve with the given parameters; `base_xp` must be positive
    pub fn new(base_xp: u32, scaling: u32) -> Result<Self> {
        if base_xp == 0 {
            return Err(Error::Config("progression.base_xp must be positive".into()));
        }
        Ok(Self { base_xp, scaling })
    }

    pub fn base_xp(&self) -> u32 {
        self.base_xp
    }

    pub fn scaling(&self) -> u32 {
        self.scaling
    }

    /// Experience required to clear `level`.
    ///
    /// Level 0 is treated as level 1. Always at least `base_xp`.
    pub fn threshold(&self, level: u32) -> u64 {
        let steps = u64::from(level.max(1) - 1);
        u64::from(self.base_xp).saturating_add(steps.saturating_mul(u64::from(self.scaling)))
    }

    /// Resolve an XP grant against the current triple.
    ///
    /// Non-positive grants return `state` unchanged.
    pub fn apply_xp(&self, state: XpState, amount: i64) -> XpState {
        if amount <= 0 {
            return state;
        }

        let next = self.resolve(state, state.experience.saturating_add(amount as u64));
        tracing::debug!(
            "Granted {} XP: level {} -> {}, experience {}",
            amount,
            state.level,
            next.level,
            next.experience
        );
        if next.level > state.level {
            tracing::info!(
                "Granted {} XP: level {} -> {}, {} level points",
                amount,
                state.level,
                next.level,
                next.level_points
            );
        }

        next
    }

    /// Re-resolve stored experience against this curve.
    ///
    /// A triple written under a steeper curve may hold experience at or past
    /// its level's threshold here. The surplus is converted into level-ups so
    /// no experience is lost. A consistent triple comes back unchanged.
    pub fn normalize(&self, state: XpState) -> XpState {
        self.resolve(state, state.experience)
    }

    /// Spend `pool` experience starting from an empty `state.level`.
    ///
    /// Whole levels are cleared in one step: the count is the largest `k`
    /// whose cumulative cost fits in `pool`, found by binary search.
    fn resolve(&self, state: XpState, pool: u64) -> XpState {
        let level = state.level.max(1);
        let max_levels = u64::from(u32::MAX - level);

        let mut low = 0;
        let mut high = max_levels.min(pool / self.threshold(level));
        while low < high {
            let mid = low + (high - low).div_ceil(2);
            if self.cost(level, mid) <= u128::from(pool) {
                low = mid;
            } else {
                high = mid - 1;
            }
        }

        let cleared = low;
        // cost(cleared) <= pool, so the difference fits in u64
        let leftover = pool - self.cost(level, cleared) as u64;
        let level = level + cleared as u32;
        let mut experience = leftover;

        let ceiling = self.threshold(level) - 1;
        if experience > ceiling {
            // Only reachable at the top level, where there is nothing left to clear
            tracing::warn!(
                "Level {} is the highest level; discarding {} XP",
                level,
                experience - ceiling
            );
            experience = ceiling;
        }

        XpState {
            experience,
            level,
            level_points: state.level_points.saturating_add(cleared as u32),
        }
    }

    /// Experience needed to clear `count` levels starting empty at `level`
    fn cost(&self, level: u32, count: u64) -> u128 {
        let first = u128::from(self.threshold(level));
        let count = u128::from(count);
        count * first + u128::from(self.scaling) * count * count.saturating_sub(1) / 2
    }

    /// Where `state` sits within its current level
    pub fn progress(&self, state: XpState) -> LevelProgress {
        let threshold = self.threshold(state.level);
        LevelProgress {
            level: state.level,
            experience: state.experience,
            threshold,
            remaining: threshold.saturating_sub(state.experience),
        }
    }
}

/// Threshold under the default curve
pub fn threshold(level: u32) -> u64 {
    LevelCurve::default().threshold(level)
}

/// XP grant under the default curve
pub fn apply_xp(state: XpState, amount: i64) -> XpState {
    LevelCurve::default().apply_xp(state, amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(experience: u64, level: u32, level_points: u32) -> XpState {
        XpState {
            experience,
            level,
            level_points,
        }
    }

    #[test]
    fn test_threshold_formula() {
        assert_eq!(threshold(1), 100);
        assert_eq!(threshold(2), 120);
        assert_eq!(threshold(3), 140);
        assert_eq!(threshold(11), 300);
        // Level 0 clamps to level 1
        assert_eq!(threshold(0), 100);
    }

    #[test]
    fn test_threshold_is_increasing() {
        for level in 1..200 {
            assert!(threshold(level + 1) > threshold(level));
        }
    }

    #[test]
    fn test_non_positive_grant_is_noop() {
        let state = at(40, 2, 1);
        assert_eq!(apply_xp(state, 0), state);
        assert_eq!(apply_xp(state, -25), state);
    }

    #[test]
    fn test_partial_grant_stays_in_level() {
        assert_eq!(apply_xp(at(0, 1, 0), 50), at(50, 1, 0));
        assert_eq!(apply_xp(at(50, 1, 0), 49), at(99, 1, 0));
    }

    #[test]
    fn test_exact_need_levels_up_once() {
        assert_eq!(apply_xp(at(30, 1, 0), 70), at(0, 2, 1));
        assert_eq!(apply_xp(at(0, 2, 4), 120), at(0, 3, 5));
    }

    #[test]
    fn test_multi_level_overflow() {
        // 100 clears level 1, 120 clears level 2, 30 left at level 3
        assert_eq!(apply_xp(at(0, 1, 0), 250), at(30, 3, 2));
    }

    #[test]
    fn test_large_grant_crosses_every_threshold() {
        // 100 + 120 + 140 = 360, leaving 140 of the 160 needed at level 4
        let state = apply_xp(at(0, 1, 0), 500);
        assert_eq!(state, at(140, 4, 3));
        assert!(state.experience < threshold(state.level));
    }

    #[test]
    fn test_grants_are_additive() {
        let starts = [at(0, 1, 0), at(75, 1, 2), at(119, 2, 0), at(10, 7, 3)];
        let amounts = [0, 1, 25, 99, 100, 333, 1_000];

        for start in starts {
            for a in amounts {
                for b in amounts {
                    let sequential = apply_xp(apply_xp(start, a), b);
                    let combined = apply_xp(start, a + b);
                    assert_eq!(sequential, combined, "start {:?}, a {}, b {}", start, a, b);
                    assert!(combined.experience < threshold(combined.level));
                }
            }
        }
    }

    /// One level at a time, as a reference for the bulk resolution
    fn step_by_step(curve: &LevelCurve, state: XpState, amount: u64) -> XpState {
        let mut remaining = amount;
        let mut next = state;
        loop {
            let need = curve.threshold(next.level) - next.experience;
            if remaining < need {
                next.experience += remaining;
                return next;
            }
            remaining -= need;
            next.experience = 0;
            next.level += 1;
            next.level_points += 1;
        }
    }

    #[test]
    fn test_bulk_resolution_matches_level_by_level() {
        let curves = [
            LevelCurve::default(),
            LevelCurve::new(1, 0).unwrap(),
            LevelCurve::new(7, 3).unwrap(),
        ];
        let starts = [at(0, 1, 0), at(99, 1, 4), at(5, 12, 0)];

        for curve in curves {
            for start in starts {
                if start.experience >= curve.threshold(start.level) {
                    continue;
                }
                for amount in [1, 2, 19, 100, 101, 359, 360, 361, 4_321, 98_765] {
                    assert_eq!(
                        curve.apply_xp(start, amount as i64),
                        step_by_step(&curve, start, amount),
                        "curve {:?}, start {:?}, amount {}",
                        curve,
                        start,
                        amount
                    );
                }
            }
        }
    }

    #[test]
    fn test_huge_grant_resolves_quickly() {
        let began = std::time::Instant::now();
        let state = apply_xp(at(0, 1, 0), i64::MAX);

        assert!(began.elapsed() < std::time::Duration::from_secs(1));
        assert!(state.level > 900_000_000);
        assert_eq!(state.level_points, state.level - 1);
        assert!(state.experience < threshold(state.level));
    }

    #[test]
    fn test_top_level_caps_experience() {
        // Flat curve of 1 XP per level runs out of levels before XP
        let curve = LevelCurve::new(1, 0).unwrap();
        let state = curve.apply_xp(at(0, 1, 0), i64::MAX);
        assert_eq!(state.level, u32::MAX);
        assert_eq!(state.level_points, u32::MAX - 1);
        assert_eq!(state.experience, 0);
    }

    #[test]
    fn test_normalize_converts_surplus_into_levels() {
        let curve = LevelCurve::default();
        // Written under a steeper curve: 500 XP sitting at level 1
        let state = curve.normalize(at(500, 1, 0));
        assert_eq!(state, at(140, 4, 3));
        // Nothing is lost on the next grant
        assert_eq!(curve.apply_xp(state, 1), at(141, 4, 3));
        // Consistent triples are untouched
        assert_eq!(curve.normalize(at(30, 3, 2)), at(30, 3, 2));
    }

    #[test]
    fn test_zero_base_curve_rejected() {
        assert!(matches!(LevelCurve::new(0, 0), Err(Error::Config(_))));
        assert!(matches!(LevelCurve::new(0, 20), Err(Error::Config(_))));
        assert!(LevelCurve::new(1, 0).is_ok());
    }

    #[test]
    fn test_custom_curve() {
        let curve = LevelCurve::new(50, 0).unwrap();
        assert_eq!(curve.threshold(9), 50);
        assert_eq!(curve.apply_xp(at(0, 1, 0), 175), at(25, 4, 3));
    }

    #[test]
    fn test_progress_summary() {
        let progress = LevelCurve::default().progress(at(30, 3, 2));
        assert_eq!(progress.threshold, 140);
        assert_eq!(progress.remaining, 110);
    }
}
