use std::thread;

use tracing::{info, warn};

use crate::error::GameError;
use crate::frontend::Frontend;
use crate::session::{GameEnd, Session};

/// Anything other than `EXIT_WON` or `EXIT_QUIT` resumes the keeper.
pub const EXIT_LOST: i32 = 0;
pub const EXIT_QUIT: i32 = 2;
pub const EXIT_WON: i32 = 5;
const EXIT_ABNORMAL: i32 = -1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Resumed,
    Won,
    Quit,
}

impl Decision {
    pub fn from_exit_code(code: i32) -> Self {
        match code {
            EXIT_WON => Decision::Won,
            EXIT_QUIT => Decision::Quit,
            _ => Decision::Resumed,
        }
    }
}

pub fn exit_code(end: GameEnd) -> i32 {
    match end {
        GameEnd::Won => EXIT_WON,
        GameEnd::Quit => EXIT_QUIT,
        GameEnd::GameOver => EXIT_LOST,
    }
}

fn explore(mut explorer: Session, frontend: &mut dyn Frontend) -> Result<i32, GameError> {
    let end = explorer.run(frontend)?;
    let code = exit_code(end);
    info!(depth = explorer.depth(), ?end, code, "explorer finished");
    Ok(code)
}

pub fn checkpoint(
    session: &mut Session,
    frontend: &mut dyn Frontend,
) -> Result<Decision, GameError> {
    session.checkpoint_active = true;
    let explorer = session.branch();
    let depth = explorer.depth();
    let log = session.scheduler().log().clone();
    info!(depth, level = session.level_index(), "checkpoint taken");

    let status = thread::scope(|scope| {
        let handle = thread::Builder::new()
            .name(format!("explorer-{depth}"))
            .spawn_scoped(scope, move || log.scope(|| explore(explorer, frontend)))
            .map_err(GameError::SpawnExplorer)?;
        Ok::<_, GameError>(handle.join())
    })?;

    let code = match status {
        Ok(result) => result?,
        Err(_) => {
            warn!(depth, "explorer panicked");
            EXIT_ABNORMAL
        }
    };
    let decision = Decision::from_exit_code(code);
    info!(depth, code, ?decision, "checkpoint resolved");
    if decision == Decision::Resumed {
        session.checkpoint_active = false;
    }
    Ok(decision)
}
