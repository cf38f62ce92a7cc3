use tracing::info;

use crate::config::Settings;
use crate::error::GameError;
use crate::frontend::{Headless, Terminal};
use crate::loader::{load_campaign, Campaign};
use crate::logging::LogHandle;
use crate::scheduler::Scheduler;
use crate::session::{GameEnd, Session};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub end: GameEnd,
    pub points: Option<u32>,
}

pub fn run(settings: &Settings) -> Result<RunSummary, GameError> {
    let log = LogHandle::open(&settings.log_file)?;
    log.scope(|| {
        info!("=== chase startup ===");
        let mut campaign = load_campaign(&settings.level_dir)?;
        settings.apply(&mut campaign);
        if settings.headless {
            ensure_scripted(&campaign)?;
        }

        let scheduler = Scheduler::new(settings.pacing, log.clone());
        let mut session = Session::new(campaign, scheduler, settings.seed);
        let summary = if settings.headless {
            let mut frontend = Headless::new();
            let end = session.run(&mut frontend)?;
            RunSummary {
                end,
                points: frontend.draws.last().map(|d| d.points),
            }
        } else {
            let mut terminal = Terminal::open(settings.poll_interval)?;
            let end = session.run(&mut terminal)?;
            if end != GameEnd::Quit {
                terminal.wait_for_exit()?;
            }
            RunSummary { end, points: None }
        };
        info!(end = ?summary.end, "=== chase shutdown ===");
        Ok(summary)
    })
}

fn ensure_scripted(campaign: &Campaign) -> Result<(), GameError> {
    match campaign
        .levels
        .iter()
        .find(|level| level.board().runner.is_live_controlled())
    {
        Some(level) => Err(GameError::HeadlessNeedsScript {
            level: level.name.clone(),
        }),
        None => Ok(()),
    }
}
