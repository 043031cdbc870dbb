//! Round-based whack-a-mole engine: grid state, adaptive round timer and a
//! synchronous event bus that keeps game logic apart from presentation.

pub use cell::*;
pub use controller::*;
pub use difficulty::*;
pub use error::*;
pub use event::*;
pub use grid::*;
pub use session::*;
pub use settings::*;
pub use timer::*;
pub use types::*;

mod cell;
mod controller;
mod difficulty;
mod error;
mod event;
mod grid;
mod session;
mod settings;
mod timer;
mod types;
