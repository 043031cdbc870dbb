//! Session lifecycle and the background round loop.
//!
//! The round loop and [`GameController::whack`] share one
//! `Arc<Mutex<GameSession>>`. Spawning moles, evaluating a round and closing a
//! whacked cell each happen under a single hold of that lock, so a whack either
//! lands before a round is evaluated or not at all. Only cell updates are
//! published under the lock; score, round and game-over events go out after it
//! is released.

use core::time::Duration;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use flume::{Receiver, RecvError, RecvTimeoutError, Sender};
use serde::{Deserialize, Serialize};

use crate::*;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Wall-clock length of one time unit.
    pub time_unit: Duration,
    pub sampling: SamplingPolicy,
    /// Seed for coordinate sampling, random when unset.
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            time_unit: Duration::from_secs(1),
            sampling: SamplingPolicy::default(),
            seed: None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerState {
    Idle,
    Running,
    GameOver,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WhackOutcome {
    /// An open cell was closed.
    Hit,
    /// The cell was already closed.
    Miss,
    /// No running session, or the coordinates are off the grid.
    Ignored,
}

struct ActiveSession {
    session: Arc<Mutex<GameSession>>,
    cancel: Sender<()>,
    handle: JoinHandle<()>,
}

impl ActiveSession {
    fn shutdown(self, phase: SessionPhase) {
        lock(&self.session).stop(phase);
        // disconnecting wakes the loop out of any wait
        drop(self.cancel);

        if self.handle.thread().id() == thread::current().id() {
            // called from a callback on the loop itself, which exits on return
            return;
        }
        if self.handle.join().is_err() {
            log::error!("round loop panicked");
        }
    }
}

#[derive(Default)]
struct Slot {
    active: Option<ActiveSession>,
    last: Option<(DifficultyProfile, Life)>,
}

/// Owns the current session and drives its round loop.
pub struct GameController {
    bus: Arc<EventBus>,
    config: SessionConfig,
    slot: Mutex<Slot>,
    // serializes reset publication across racing starts
    publishing: Mutex<()>,
}

impl core::fmt::Debug for GameController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GameController")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl GameController {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_bus(Arc::new(EventBus::new()), config)
    }

    pub fn with_bus(bus: Arc<EventBus>, config: SessionConfig) -> Self {
        Self {
            bus,
            config,
            slot: Mutex::default(),
            publishing: Mutex::default(),
        }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Stops any running session, then starts a new one and its round loop.
    ///
    /// When starts race, only the session left current publishes its reset
    /// after the others. Must not be called from an `on_reset` callback.
    pub fn start_session(&self, profile: DifficultyProfile, life: Life) {
        let previous = lock(&self.slot).active.take();
        if let Some(previous) = previous {
            previous.shutdown(SessionPhase::Cancelled);
        }

        log::info!(
            "new game -> difficulty: {}, life: {life}, rate: -{}",
            profile.name(),
            profile.timer_change_rate
        );
        let session = Arc::new(Mutex::new(GameSession::new(profile, life, &self.config)));

        let (cancel, cancelled) = flume::bounded(0);
        let (release, released) = flume::bounded(1);
        let round_loop = RoundLoop {
            session: Arc::clone(&session),
            bus: Arc::clone(&self.bus),
            cancelled,
            released,
            time_unit: self.config.time_unit,
        };
        let handle = thread::spawn(move || round_loop.run());

        let stale = {
            let mut slot = lock(&self.slot);
            slot.last = Some((profile, life));
            slot.active.replace(ActiveSession {
                session: Arc::clone(&session),
                cancel,
                handle,
            })
        };
        // lost a race with a concurrent start
        if let Some(stale) = stale {
            stale.shutdown(SessionPhase::Cancelled);
        }

        let _publishing = lock(&self.publishing);
        if self.is_current(&session) {
            self.bus.publish_reset(&profile);
            // the loop holds the receiver until cancelled
            let _ = release.send(());
        }
    }

    pub fn start_with(&self, settings: &Settings) {
        self.start_session(settings.profile(), settings.life);
    }

    /// Restarts with the last used profile and life. Returns `false` if no
    /// session was ever started.
    pub fn play_again(&self) -> bool {
        let last = lock(&self.slot).last;
        match last {
            Some((profile, life)) => {
                self.start_session(profile, life);
                true
            }
            None => false,
        }
    }

    /// Discards the current session without starting another.
    pub fn return_to_menu(&self) {
        let active = lock(&self.slot).active.take();
        if let Some(active) = active {
            log::info!("returning to menu");
            active.shutdown(SessionPhase::Cancelled);
        }
    }

    /// Closes an open cell of the running session.
    pub fn whack(&self, coord: Coord2) -> WhackOutcome {
        let Some(session) = self.current_session() else {
            return WhackOutcome::Ignored;
        };
        let mut session = lock(&session);
        if !session.phase().is_running() {
            return WhackOutcome::Ignored;
        }

        match session.grid.cell_at(coord) {
            Err(err) => {
                log::trace!("whack ignored: {err}");
                WhackOutcome::Ignored
            }
            Ok(CellState::Closed) => WhackOutcome::Miss,
            Ok(CellState::Open) => {
                let coords = CoordSet::from([coord]);
                match session.grid.set_state(CellState::Closed, &coords) {
                    Ok(()) => {
                        log::debug!("whacked {coord:?}");
                        self.bus.publish_update(CellState::Closed, &coords);
                        WhackOutcome::Hit
                    }
                    Err(err) => {
                        log::error!("whack failed: {err}");
                        WhackOutcome::Ignored
                    }
                }
            }
        }
    }

    pub fn state(&self) -> ControllerState {
        let Some(session) = self.current_session() else {
            return ControllerState::Idle;
        };
        let phase = lock(&session).phase();
        match phase {
            SessionPhase::Running => ControllerState::Running,
            SessionPhase::Over => ControllerState::GameOver,
            SessionPhase::Cancelled | SessionPhase::Aborted => ControllerState::Idle,
        }
    }

    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        let session = self.current_session()?;
        let snapshot = lock(&session).snapshot();
        Some(snapshot)
    }

    fn is_current(&self, session: &Arc<Mutex<GameSession>>) -> bool {
        self.current_session()
            .is_some_and(|current| Arc::ptr_eq(&current, session))
    }

    fn current_session(&self) -> Option<Arc<Mutex<GameSession>>> {
        lock(&self.slot)
            .active
            .as_ref()
            .map(|active| Arc::clone(&active.session))
    }
}

impl Default for GameController {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl Drop for GameController {
    fn drop(&mut self) {
        self.return_to_menu();
    }
}

struct RoundLoop {
    session: Arc<Mutex<GameSession>>,
    bus: Arc<EventBus>,
    cancelled: Receiver<()>,
    released: Receiver<()>,
    time_unit: Duration,
}

impl RoundLoop {
    fn run(self) {
        if !self.wait_for_release() {
            log::debug!("round loop cancelled before start");
            return;
        }
        log::info!("round loop started");
        loop {
            if self.cancelled.is_disconnected() || !self.wait(SPAWN_DELAY) {
                break;
            }
            let Some((coords, period)) = self.spawn_moles() else {
                break;
            };
            if !self.wait(period) {
                break;
            }
            let Some((report, over)) = self.close_round(&coords) else {
                break;
            };
            if self.cancelled.is_disconnected() {
                break;
            }
            self.bus.publish_score_life(report.life, report.score);
            self.bus.publish_round(&report);
            if over {
                log::info!("game over, final score: {}", report.score);
                self.bus.publish_game_over(report.score);
                break;
            }
        }
        log::info!("round loop stopped");
    }

    /// Blocks until the reset for this session is published. Returns `false`
    /// if the session is cancelled first.
    fn wait_for_release(&self) -> bool {
        flume::Selector::new()
            .recv(&self.released, |res: core::result::Result<(), RecvError>| res.is_ok())
            .recv(&self.cancelled, |_: core::result::Result<(), RecvError>| false)
            .wait()
    }

    /// Sleeps for `units` time units. Returns `false` once cancelled.
    fn wait(&self, units: f64) -> bool {
        match self.cancelled.recv_timeout(scaled(self.time_unit, units)) {
            Err(RecvTimeoutError::Timeout) => true,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    fn spawn_moles(&self) -> Option<(CoordSet, f64)> {
        let mut session = lock(&self.session);
        if !session.phase().is_running() {
            return None;
        }

        let count = usize::from(session.profile().max_moles);
        let coords = session.grid.sample_coordinates(count);
        if let Err(err) = session.grid.set_state(CellState::Open, &coords) {
            abort(&mut session, err);
            return None;
        }
        self.bus.publish_update(CellState::Open, &coords);
        Some((coords, session.period()))
    }

    /// Evaluates the round under the lock. Returns the report and whether the
    /// game just ended, or `None` if the session stopped.
    fn close_round(&self, coords: &CoordSet) -> Option<(RoundReport, bool)> {
        let mut session = lock(&self.session);
        if !session.phase().is_running() {
            return None;
        }

        let period = session.advance_period();
        let outcome = match session.grid.evaluate_outcome(coords) {
            Ok(outcome) => outcome,
            Err(err) => {
                abort(&mut session, err);
                return None;
            }
        };
        if let Err(err) = session.grid.set_state(CellState::Closed, coords) {
            abort(&mut session, err);
            return None;
        }
        self.bus.publish_update(CellState::Closed, coords);

        session.apply_outcome(outcome);
        log::debug!(
            "round {}: score +{}, life -{}, next period {period:.2}",
            session.round(),
            outcome.score,
            outcome.penalty
        );
        let report = RoundReport {
            round: session.round(),
            coords: coords.clone(),
            outcome,
            life: session.life(),
            score: session.score(),
            period,
        };
        Some((report, session.is_over()))
    }
}

fn abort(session: &mut GameSession, err: GameError) {
    log::error!("aborting session: {err}");
    session.stop(SessionPhase::Aborted);
}

// Session state is consistent between statements, so a poisoned lock is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    // rounds never get going within a test
    fn slow() -> SessionConfig {
        SessionConfig {
            time_unit: Duration::from_secs(60),
            sampling: SamplingPolicy::Distinct,
            seed: Some(42),
        }
    }

    #[test]
    fn idle_until_started() {
        let controller = GameController::new(slow());
        assert_eq!(controller.state(), ControllerState::Idle);
        assert_eq!(controller.snapshot(), None);
        assert_eq!(controller.whack((0, 0)), WhackOutcome::Ignored);
        assert!(!controller.play_again());
    }

    #[test]
    fn start_publishes_reset_and_runs() {
        let controller = GameController::new(slow());
        let (tx, rx) = flume::unbounded();
        controller.bus().on_reset(move |profile| {
            let _ = tx.send(profile.difficulty);
        });

        controller.start_session(DifficultyProfile::CASUAL, Life::new(2).unwrap());

        assert_eq!(rx.try_recv(), Ok(Difficulty::Casual));
        assert_eq!(controller.state(), ControllerState::Running);
        let snapshot = controller.snapshot().unwrap();
        assert_eq!(snapshot.life, 2);
        assert_eq!(snapshot.score, 0);
        assert_eq!(snapshot.profile, DifficultyProfile::CASUAL);
    }

    #[test]
    fn whack_outside_grid_or_on_closed_cell_changes_nothing() {
        let controller = GameController::new(slow());
        controller.start_session(DifficultyProfile::NOOB, Life::default());

        assert_eq!(controller.whack((3, 0)), WhackOutcome::Ignored);
        assert_eq!(controller.whack((0, 0)), WhackOutcome::Miss);
        assert_eq!(controller.snapshot().unwrap().score, 0);
    }

    #[test]
    fn return_to_menu_goes_idle_without_waiting_out_the_timer() {
        let controller = GameController::new(slow());
        controller.start_session(DifficultyProfile::EZ, Life::default());

        let started = std::time::Instant::now();
        controller.return_to_menu();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(controller.state(), ControllerState::Idle);
        assert!(controller.play_again());
        assert_eq!(controller.state(), ControllerState::Running);
    }

    #[test]
    fn racing_starts_publish_the_surviving_reset_last() {
        for _ in 0..50 {
            let controller = GameController::new(slow());
            let (tx, rx) = flume::unbounded();
            controller.bus().on_reset(move |profile| {
                let _ = tx.send(profile.difficulty);
            });
            let barrier = std::sync::Barrier::new(2);

            thread::scope(|scope| {
                for profile in [DifficultyProfile::EZ, DifficultyProfile::PRO] {
                    let controller = &controller;
                    let barrier = &barrier;
                    scope.spawn(move || {
                        barrier.wait();
                        controller.start_session(profile, Life::default());
                    });
                }
            });

            let last = rx.try_iter().last();
            let current = controller.snapshot().unwrap().profile.difficulty;
            assert_eq!(last, Some(current));
            assert_eq!(controller.state(), ControllerState::Running);
        }
    }

    #[test]
    fn out_of_bounds_round_aborts_the_session() {
        let controller = GameController::new(slow());
        controller.start_session(DifficultyProfile::NOOB, Life::default());
        let session = controller.current_session().unwrap();
        let (tx, rx) = flume::unbounded();
        controller.bus().on_update(move |state, coords| {
            let _ = tx.send((state, coords.clone()));
        });

        let (_cancel, cancelled) = flume::bounded(0);
        let (_release, released) = flume::bounded(1);
        let round_loop = RoundLoop {
            session: Arc::clone(&session),
            bus: Arc::clone(controller.bus()),
            cancelled,
            released,
            time_unit: Duration::from_millis(1),
        };

        assert_eq!(round_loop.close_round(&CoordSet::from([(0, 0), (5, 5)])), None);
        assert_eq!(lock(&session).phase(), SessionPhase::Aborted);
        assert_eq!(controller.state(), ControllerState::Idle);
        assert_eq!(controller.whack((0, 0)), WhackOutcome::Ignored);
        assert!(round_loop.spawn_moles().is_none());
        assert!(rx.try_recv().is_err());
    }
}
