use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::loader::LoadError;

#[derive(Debug, Error)]
pub enum GameError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("display/input failure: {0}")]
    Frontend(#[from] io::Error),
    #[error("failed to start worker thread {name}: {source}")]
    SpawnWorker {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to start checkpoint explorer: {0}")]
    SpawnExplorer(#[source] io::Error),
    #[error("failed to open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("level {level} has a live-controlled runner; headless mode needs a PAC script")]
    HeadlessNeedsScript { level: String },
}
