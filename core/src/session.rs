use serde::{Deserialize, Serialize};

use crate::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    Running,
    /// Life reached zero.
    Over,
    /// Superseded by a new session or a return to the menu.
    Cancelled,
    /// Stopped after a contract violation.
    Aborted,
}

impl SessionPhase {
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

/// Read-only view of a session for status readouts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub profile: DifficultyProfile,
    pub score: CellCount,
    pub life: u8,
    pub period: f64,
    pub round: u32,
    pub phase: SessionPhase,
}

/// Mutable state of one play-through.
#[derive(Debug)]
pub struct GameSession {
    pub(crate) grid: GridState,
    profile: DifficultyProfile,
    score: CellCount,
    life: u8,
    timer: RoundTimer,
    round: u32,
    phase: SessionPhase,
}

impl GameSession {
    pub fn new(profile: DifficultyProfile, life: Life, config: &SessionConfig) -> Self {
        let grid = match config.seed {
            Some(seed) => GridState::seeded(profile.length, seed),
            None => GridState::new(profile.length),
        };
        Self {
            grid: grid.with_policy(config.sampling),
            profile,
            score: 0,
            life: life.get(),
            timer: RoundTimer::new(&profile),
            round: 0,
            phase: SessionPhase::Running,
        }
    }

    pub fn profile(&self) -> &DifficultyProfile {
        &self.profile
    }

    pub fn grid(&self) -> &GridState {
        &self.grid
    }

    pub fn score(&self) -> CellCount {
        self.score
    }

    pub fn life(&self) -> u8 {
        self.life
    }

    pub fn period(&self) -> f64 {
        self.timer.period()
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, SessionPhase::Over)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            profile: self.profile,
            score: self.score,
            life: self.life,
            period: self.timer.period(),
            round: self.round,
            phase: self.phase,
        }
    }

    pub(crate) fn advance_period(&mut self) -> f64 {
        self.timer.advance()
    }

    /// Credits a round's outcome. Life saturates at zero, and reaching zero
    /// ends the session.
    pub(crate) fn apply_outcome(&mut self, outcome: Outcome) {
        self.round += 1;
        self.score = self.score.saturating_add(outcome.score);
        let penalty = u8::try_from(outcome.penalty).unwrap_or(u8::MAX);
        self.life = self.life.saturating_sub(penalty);
        if self.life == 0 && self.phase.is_running() {
            self.phase = SessionPhase::Over;
        }
    }

    /// Stops a running session; a finished one keeps its phase.
    pub(crate) fn stop(&mut self, phase: SessionPhase) {
        if self.phase.is_running() {
            self.phase = phase;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(profile: DifficultyProfile, life: u8) -> GameSession {
        GameSession::new(profile, Life::new(life).unwrap(), &SessionConfig::default())
    }

    #[test]
    fn starts_fresh() {
        let session = session(DifficultyProfile::PRO, 4);
        assert_eq!(session.score(), 0);
        assert_eq!(session.life(), 4);
        assert_eq!(session.round(), 0);
        assert_eq!(session.grid().length(), 11);
        assert!(session.grid().open_cells().is_empty());
        assert!((session.period() - 3.15).abs() < 1e-9);
        assert!(session.phase().is_running());
    }

    #[test]
    fn life_never_goes_negative() {
        let mut session = session(DifficultyProfile::PRO, 2);

        session.apply_outcome(Outcome {
            score: 0,
            penalty: 5,
        });

        assert_eq!(session.life(), 0);
        assert!(session.is_over());
    }

    #[test]
    fn over_exactly_when_life_reaches_zero() {
        let mut session = session(DifficultyProfile::EZ, 3);

        session.apply_outcome(Outcome {
            score: 1,
            penalty: 1,
        });
        assert!(!session.is_over());
        session.apply_outcome(Outcome {
            score: 0,
            penalty: 1,
        });
        assert!(!session.is_over());
        session.apply_outcome(Outcome {
            score: 2,
            penalty: 1,
        });

        assert!(session.is_over());
        assert_eq!(session.score(), 3);
        assert_eq!(session.round(), 3);
    }

    #[test]
    fn stop_does_not_override_game_over() {
        let mut session = session(DifficultyProfile::NOOB, 1);
        session.apply_outcome(Outcome {
            score: 0,
            penalty: 1,
        });

        session.stop(SessionPhase::Cancelled);

        assert_eq!(session.phase(), SessionPhase::Over);
    }
}
