use core::time::Duration;

use crate::DifficultyProfile;

/// Reaction window of the first round, before the profile's rate is added.
pub const BASE_PERIOD: f64 = 3.0;

/// The period never shrinks below this many time units.
pub const MIN_PERIOD: f64 = 1.0;

/// Delay before moles appear each round, in time units.
pub const SPAWN_DELAY: f64 = 1.0;

/// Adaptive per-round reaction window, shortened by a fixed rate every round.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RoundTimer {
    period: f64,
    rate: f64,
}

impl RoundTimer {
    pub fn new(profile: &DifficultyProfile) -> Self {
        Self {
            period: BASE_PERIOD + profile.timer_change_rate,
            rate: profile.timer_change_rate,
        }
    }

    /// Current period in time units.
    pub fn period(&self) -> f64 {
        self.period
    }

    /// Shortens the period by one step and returns the new value.
    pub fn advance(&mut self) -> f64 {
        self.period = (self.period - self.rate).max(MIN_PERIOD);
        self.period
    }
}

/// Converts `units` time units into a wall-clock duration.
pub fn scaled(time_unit: Duration, units: f64) -> Duration {
    time_unit.mul_f64(units.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn starts_at_base_plus_rate() {
        let timer = RoundTimer::new(&DifficultyProfile::EZ);
        assert!((timer.period() - 3.07).abs() < EPSILON);
    }

    #[test]
    fn period_after_k_rounds_matches_closed_form() {
        for profile in [
            DifficultyProfile::NOOB,
            DifficultyProfile::EZ,
            DifficultyProfile::CASUAL,
            DifficultyProfile::PRO,
        ] {
            let rate = profile.timer_change_rate;
            let p0 = BASE_PERIOD + rate;
            let mut timer = RoundTimer::new(&profile);
            let mut previous = timer.period();

            for k in 1..200 {
                let period = timer.advance();
                let expected = (p0 - k as f64 * rate).max(MIN_PERIOD);
                assert!(
                    (period - expected).abs() < 1e-6,
                    "{} round {k}: {period} != {expected}",
                    profile.name()
                );
                assert!(period <= previous);
                previous = period;
            }
            assert_eq!(timer.period(), MIN_PERIOD);
        }
    }

    #[test]
    fn floored_period_stays_floored() {
        let mut timer = RoundTimer::new(&DifficultyProfile::PRO);
        while timer.period() > MIN_PERIOD {
            timer.advance();
        }
        assert_eq!(timer.advance(), MIN_PERIOD);
        assert_eq!(timer.advance(), MIN_PERIOD);
    }

    #[test]
    fn scales_units_into_durations() {
        let unit = Duration::from_millis(10);
        assert_eq!(scaled(unit, SPAWN_DELAY), Duration::from_millis(10));
        assert_eq!(scaled(unit, 2.5), Duration::from_micros(25_000));
        assert_eq!(scaled(unit, -1.0), Duration::ZERO);
    }
}
