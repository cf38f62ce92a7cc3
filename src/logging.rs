use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing::dispatcher::{self, Dispatch};
use tracing_subscriber::EnvFilter;

use crate::error::GameError;

pub const LOG_FILTER_ENV_VAR: &str = "CHASE_LOG";

#[derive(Clone)]
pub struct LogHandle {
    dispatch: Dispatch,
}

impl LogHandle {
    pub fn open(path: &Path) -> Result<Self, GameError> {
        let file = File::create(path).map_err(|source| GameError::LogFile {
            path: path.to_path_buf(),
            source,
        })?;
        let filter = EnvFilter::try_from_env(LOG_FILTER_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new("debug"));
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(false)
            .with_thread_names(true)
            .compact()
            .finish();
        Ok(Self {
            dispatch: Dispatch::new(subscriber),
        })
    }

    pub fn disabled() -> Self {
        Self {
            dispatch: Dispatch::none(),
        }
    }

    pub fn scope<T>(&self, f: impl FnOnce() -> T) -> T {
        dispatcher::with_default(&self.dispatch, f)
    }
}
