//! Headless whack-a-mole session played by a simple bot.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use flume::{Receiver, Sender};
use rand::Rng;
use whackamole_core::*;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// What log level to use
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,

    /// Difficulty: NOOB, EZ, CASUAL or PRO
    #[arg(short, long, default_value = "NOOB")]
    difficulty: String,

    /// Starting life, 1 to 9
    #[arg(short, long, default_value_t = 3)]
    life: u8,

    /// Load difficulty and life from a JSON settings file instead
    #[arg(long, conflicts_with_all = ["difficulty", "life"])]
    settings: Option<PathBuf>,

    /// Length of one time unit in milliseconds
    #[arg(long, default_value_t = 200)]
    time_unit_ms: u64,

    /// Chance that the bot goes for a given mole
    #[arg(long, default_value_t = 0.8)]
    hit_rate: f64,

    /// Stop after this many rounds even if the game is not over
    #[arg(long)]
    rounds: Option<u32>,

    /// Force a seed instead of random
    #[arg(short, long)]
    seed: Option<u64>,

    /// Always spawn the full number of moles
    #[arg(long)]
    distinct: bool,
}

enum BotMsg {
    Moles(CoordSet),
    Stop,
}

enum Finished {
    GameOver(CellCount),
    RoundLimit(u32),
}

struct ConsolePresentation {
    moles: Mutex<(Coord, CoordSet)>,
    bot: Sender<BotMsg>,
    finished: Sender<Finished>,
    round_limit: Option<u32>,
}

impl ConsolePresentation {
    fn render(&self) {
        let grid = self.moles.lock().unwrap_or_else(|p| p.into_inner());
        let (length, moles) = &*grid;
        let mut out = String::new();
        for row in 0..*length {
            for col in 0..*length {
                out.push(if moles.contains(&(row, col)) { 'o' } else { '.' });
            }
            out.push('\n');
        }
        print!("{out}");
    }
}

impl Presentation for ConsolePresentation {
    fn on_cell_state_changed(&self, state: CellState, coords: &CoordSet) {
        {
            let mut grid = self.moles.lock().unwrap_or_else(|p| p.into_inner());
            let moles = &mut grid.1;
            match state {
                CellState::Open => moles.extend(coords.iter().copied()),
                CellState::Closed => moles.retain(|coord| !coords.contains(coord)),
            }
        }
        if state.is_open() {
            self.render();
            let _ = self.bot.send(BotMsg::Moles(coords.clone()));
        }
    }

    fn on_session_reset(&self, profile: &DifficultyProfile) {
        *self.moles.lock().unwrap_or_else(|p| p.into_inner()) = (profile.length, CoordSet::new());
        println!(
            "{} grid {}x{}, up to {} moles",
            profile.name(),
            profile.length,
            profile.length,
            profile.max_moles
        );
    }

    fn on_score_life_changed(&self, life: u8, score: CellCount) {
        println!("Life: {life}   Score: {score}");
    }

    fn on_game_over(&self, final_score: CellCount) {
        let _ = self.finished.try_send(Finished::GameOver(final_score));
    }

    fn on_round_evaluated(&self, report: &RoundReport) {
        log::debug!(
            "round {} hit {} missed {}",
            report.round,
            report.outcome.score,
            report.outcome.penalty
        );
        if self.round_limit.is_some_and(|limit| report.round >= limit) {
            let _ = self.finished.try_send(Finished::RoundLimit(report.round));
        }
    }
}

fn run_bot(
    controller: Arc<GameController>,
    moles: Receiver<BotMsg>,
    hit_rate: f64,
    time_unit: Duration,
) {
    let mut rng = rand::rng();
    while let Ok(BotMsg::Moles(coords)) = moles.recv() {
        for coord in coords {
            if !rng.random_bool(hit_rate) {
                continue;
            }
            thread::sleep(time_unit.mul_f64(rng.random_range(0.0..0.9)));
            let outcome = controller.whack(coord);
            log::debug!("bot whacked {coord:?}: {outcome:?}");
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    let settings = match &args.settings {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading settings from {}", path.display()))?;
            Settings::from_json(&json)?
        }
        None => Settings::new(&args.difficulty, args.life)?,
    };
    if !(0.0..=1.0).contains(&args.hit_rate) {
        bail!("--hit-rate must be between 0 and 1, got {}", args.hit_rate);
    }

    let config = SessionConfig {
        time_unit: Duration::from_millis(args.time_unit_ms),
        sampling: if args.distinct {
            SamplingPolicy::Distinct
        } else {
            SamplingPolicy::WithReplacement
        },
        seed: args.seed,
    };
    log::debug!("settings: {settings:?}, config: {config:?}");

    let controller = Arc::new(GameController::new(config.clone()));
    let (bot_tx, bot_rx) = flume::unbounded();
    let (finished_tx, finished_rx) = flume::bounded(1);
    controller.bus().attach(Arc::new(ConsolePresentation {
        moles: Mutex::new((0, CoordSet::new())),
        bot: bot_tx.clone(),
        finished: finished_tx,
        round_limit: args.rounds,
    }));

    let bot = {
        let controller = Arc::clone(&controller);
        thread::spawn(move || run_bot(controller, bot_rx, args.hit_rate, config.time_unit))
    };

    controller.start_with(&settings);
    let finished = finished_rx
        .recv()
        .context("session ended without a result")?;
    let snapshot = controller.snapshot();
    controller.return_to_menu();
    let _ = bot_tx.send(BotMsg::Stop);
    if bot.join().is_err() {
        log::error!("bot thread panicked");
    }

    match finished {
        Finished::GameOver(score) => println!("Game over!\nFinal Score: {score}"),
        Finished::RoundLimit(round) => {
            let score = snapshot.map_or(0, |snapshot| snapshot.score);
            println!("Stopped after {round} rounds\nScore: {score}");
        }
    }
    Ok(())
}
