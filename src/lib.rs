pub mod app;
pub mod board;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod frontend;
pub mod loader;
pub mod logging;
pub mod rules;
pub mod scheduler;
pub mod session;

pub use app::{run, RunSummary};
pub use config::{Cli, Settings};
pub use error::GameError;
pub use session::GameEnd;
