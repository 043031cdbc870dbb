use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::*;

/// Summary of one evaluated round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundReport {
    pub round: u32,
    pub coords: CoordSet,
    pub outcome: Outcome,
    pub life: u8,
    pub score: CellCount,
    /// Period that will apply to the next round, in time units.
    pub period: f64,
}

/// Rendering side of the game, driven by the [`EventBus`].
///
/// Callbacks run synchronously on the publishing thread. Cell updates are
/// delivered while the session is locked, so implementations must hand user
/// input to [`GameController::whack`] from their own thread rather than from
/// inside [`on_cell_state_changed`](Self::on_cell_state_changed). The other
/// callbacks run without the session lock and may read
/// [`GameController::snapshot`]. Starting a session from inside
/// [`on_session_reset`](Self::on_session_reset) deadlocks.
pub trait Presentation: Send + Sync {
    fn on_cell_state_changed(&self, state: CellState, coords: &CoordSet);

    fn on_session_reset(&self, profile: &DifficultyProfile);

    fn on_score_life_changed(&self, life: u8, score: CellCount);

    /// Ends the session view. The adapter then offers
    /// [`GameController::play_again`] and [`GameController::return_to_menu`].
    fn on_game_over(&self, final_score: CellCount);

    fn on_round_evaluated(&self, _report: &RoundReport) {}
}

type UpdateListener = Box<dyn Fn(CellState, &CoordSet) + Send + Sync>;
type ResetListener = Box<dyn Fn(&DifficultyProfile) + Send + Sync>;
type ScoreLifeListener = Box<dyn Fn(u8, CellCount) + Send + Sync>;
type GameOverListener = Box<dyn Fn(CellCount) + Send + Sync>;
type RoundListener = Box<dyn Fn(&RoundReport) + Send + Sync>;

/// Synchronous publish/subscribe hub scoped to one controller.
///
/// Every publish walks its channel's subscribers in subscription order on the
/// caller's thread, so a slow subscriber delays the publisher. Subscribing
/// from inside a callback deadlocks.
#[derive(Default)]
pub struct EventBus {
    update: RwLock<Vec<UpdateListener>>,
    reset: RwLock<Vec<ResetListener>>,
    score_life: RwLock<Vec<ScoreLifeListener>>,
    game_over: RwLock<Vec<GameOverListener>>,
    round: RwLock<Vec<RoundListener>>,
}

impl core::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventBus")
            .field("update", &read(&self.update).len())
            .field("reset", &read(&self.reset).len())
            .field("score_life", &read(&self.score_life).len())
            .field("game_over", &read(&self.game_over).len())
            .field("round", &read(&self.round).len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_update(&self, listener: impl Fn(CellState, &CoordSet) + Send + Sync + 'static) {
        write(&self.update).push(Box::new(listener));
    }

    pub fn on_reset(&self, listener: impl Fn(&DifficultyProfile) + Send + Sync + 'static) {
        write(&self.reset).push(Box::new(listener));
    }

    pub fn on_score_life(&self, listener: impl Fn(u8, CellCount) + Send + Sync + 'static) {
        write(&self.score_life).push(Box::new(listener));
    }

    pub fn on_game_over(&self, listener: impl Fn(CellCount) + Send + Sync + 'static) {
        write(&self.game_over).push(Box::new(listener));
    }

    pub fn on_round(&self, listener: impl Fn(&RoundReport) + Send + Sync + 'static) {
        write(&self.round).push(Box::new(listener));
    }

    /// Subscribes `presentation` to every channel.
    pub fn attach<P: Presentation + ?Sized + 'static>(&self, presentation: Arc<P>) {
        let p = Arc::clone(&presentation);
        self.on_update(move |state, coords| p.on_cell_state_changed(state, coords));
        let p = Arc::clone(&presentation);
        self.on_reset(move |profile| p.on_session_reset(profile));
        let p = Arc::clone(&presentation);
        self.on_score_life(move |life, score| p.on_score_life_changed(life, score));
        let p = Arc::clone(&presentation);
        self.on_game_over(move |score| p.on_game_over(score));
        self.on_round(move |report| presentation.on_round_evaluated(report));
    }

    pub fn publish_update(&self, state: CellState, coords: &CoordSet) {
        log::trace!("{state:?} coords: {coords:?}");
        for listener in read(&self.update).iter() {
            listener(state, coords);
        }
    }

    pub fn publish_reset(&self, profile: &DifficultyProfile) {
        log::debug!("New game with difficulty {}", profile.name());
        for listener in read(&self.reset).iter() {
            listener(profile);
        }
    }

    pub fn publish_score_life(&self, life: u8, score: CellCount) {
        for listener in read(&self.score_life).iter() {
            listener(life, score);
        }
    }

    pub fn publish_game_over(&self, final_score: CellCount) {
        log::debug!("Game over with score {final_score}");
        for listener in read(&self.game_over).iter() {
            listener(final_score);
        }
    }

    pub fn publish_round(&self, report: &RoundReport) {
        for listener in read(&self.round).iter() {
            listener(report);
        }
    }
}

// A listener that panicked leaves the list itself intact.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Seen {
        Cells(CellState, Vec<Coord2>),
        Reset(Difficulty),
        ScoreLife(u8, CellCount),
        GameOver(CellCount),
        Round(u32),
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Seen>>,
    }

    impl Recorder {
        fn push(&self, seen: Seen) {
            self.seen.lock().unwrap().push(seen);
        }

        fn take(&self) -> Vec<Seen> {
            std::mem::take(&mut *self.seen.lock().unwrap())
        }
    }

    impl Presentation for Recorder {
        fn on_cell_state_changed(&self, state: CellState, coords: &CoordSet) {
            self.push(Seen::Cells(state, coords.iter().copied().collect()));
        }

        fn on_session_reset(&self, profile: &DifficultyProfile) {
            self.push(Seen::Reset(profile.difficulty));
        }

        fn on_score_life_changed(&self, life: u8, score: CellCount) {
            self.push(Seen::ScoreLife(life, score));
        }

        fn on_game_over(&self, final_score: CellCount) {
            self.push(Seen::GameOver(final_score));
        }

        fn on_round_evaluated(&self, report: &RoundReport) {
            self.push(Seen::Round(report.round));
        }
    }

    #[test]
    fn delivers_in_subscription_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for id in 0..3 {
            let order = Arc::clone(&order);
            bus.on_update(move |_, _| order.lock().unwrap().push(id));
        }
        bus.publish_update(CellState::Open, &CoordSet::from([(0, 0)]));

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn attached_presentation_receives_every_channel() {
        let bus = EventBus::new();
        let recorder = Arc::new(Recorder::default());
        bus.attach(Arc::clone(&recorder));

        bus.publish_reset(&DifficultyProfile::CASUAL);
        bus.publish_update(CellState::Open, &CoordSet::from([(1, 2), (0, 1)]));
        bus.publish_score_life(2, 5);
        bus.publish_round(&RoundReport {
            round: 4,
            coords: CoordSet::new(),
            outcome: Outcome::default(),
            life: 2,
            score: 5,
            period: 1.0,
        });
        bus.publish_game_over(5);

        assert_eq!(
            recorder.take(),
            vec![
                Seen::Reset(Difficulty::Casual),
                Seen::Cells(CellState::Open, vec![(0, 1), (1, 2)]),
                Seen::ScoreLife(2, 5),
                Seen::Round(4),
                Seen::GameOver(5),
            ]
        );
    }

    #[test]
    fn publish_without_subscribers_is_a_no_op() {
        let bus = EventBus::new();
        bus.publish_update(CellState::Closed, &CoordSet::new());
        bus.publish_game_over(0);
        assert!(format!("{bus:?}").contains("update: 0"));
    }

    #[test]
    fn delivery_runs_on_the_publishing_thread() {
        let bus = Arc::new(EventBus::new());
        let seen = Arc::new(Mutex::new(None));
        {
            let seen = Arc::clone(&seen);
            bus.on_game_over(move |_| *seen.lock().unwrap() = Some(std::thread::current().id()));
        }

        let publisher = {
            let bus = Arc::clone(&bus);
            std::thread::spawn(move || {
                bus.publish_game_over(1);
                std::thread::current().id()
            })
        };
        let publisher_id = publisher.join().unwrap();

        assert_eq!(*seen.lock().unwrap(), Some(publisher_id));
    }
}
