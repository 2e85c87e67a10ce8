// Library surface shared by the binary and the integration tests.
pub mod app_dirs;
pub mod config;
pub mod error;
pub mod input;
pub mod ledger;
pub mod number;
pub mod results_log;
pub mod round;
pub mod rules;
pub mod runtime;
pub mod session;
pub mod timer;
pub mod util;

pub use error::{GameError, SourceError};
pub use session::{Command, GameSession, Phase, SessionEvent};
