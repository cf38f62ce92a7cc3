use std::sync::Arc;

use tracing::{debug, info};

use crate::checkpoint::{self, Decision};
use crate::error::GameError;
use crate::frontend::{DrawMode, Frontend};
use crate::loader::Campaign;
use crate::scheduler::{LevelEnd, LevelState, Scheduler};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameEnd {
    Won,
    Quit,
    GameOver,
}

#[derive(Clone)]
pub struct Session {
    campaign: Arc<Campaign>,
    scheduler: Arc<Scheduler>,
    seed: Option<u64>,
    level_index: usize,
    points: u32,
    current: Option<LevelState>,
    pub(crate) checkpoint_active: bool,
    depth: u32,
}

impl Session {
    pub fn new(campaign: Campaign, scheduler: Scheduler, seed: Option<u64>) -> Self {
        Self {
            campaign: Arc::new(campaign),
            scheduler: Arc::new(scheduler),
            seed,
            level_index: 0,
            points: 0,
            current: None,
            checkpoint_active: false,
            depth: 0,
        }
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn level_index(&self) -> usize {
        self.level_index
    }

    pub fn current(&self) -> Option<&LevelState> {
        self.current.as_ref()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub(crate) fn branch(&self) -> Self {
        let mut explorer = self.clone();
        explorer.depth += 1;
        explorer.checkpoint_active = false;
        explorer
    }

    pub fn run(&mut self, frontend: &mut dyn Frontend) -> Result<GameEnd, GameError> {
        let scheduler = Arc::clone(&self.scheduler);
        loop {
            let allow_checkpoint = !self.checkpoint_active;
            let depth = self.depth;
            let index = self.level_index;
            let campaign = &self.campaign;
            let (points, seed) = (self.points, self.seed);
            let state = self.current.get_or_insert_with(|| {
                let def = &campaign.levels[index];
                info!(level = %def.name, index, points, depth, "level loaded");
                debug!("board\n{}", def.board());
                LevelState::new(def, index, points, seed)
            });

            match scheduler.play(state, frontend, allow_checkpoint, depth)? {
                LevelEnd::Complete => {
                    self.points = state.board.runner.points;
                    if index + 1 >= self.campaign.levels.len() {
                        frontend.draw(&state.view(depth), DrawMode::Victory)?;
                        info!(points = self.points, depth, "campaign won");
                        return Ok(GameEnd::Won);
                    }
                    frontend.draw(&state.view(depth), DrawMode::LevelComplete)?;
                    self.level_index += 1;
                    self.current = None;
                }
                LevelEnd::RunnerDead => {
                    if depth == 0 {
                        frontend.draw(&state.view(depth), DrawMode::GameOver)?;
                    }
                    info!(points = state.board.runner.points, depth, "runner dead");
                    return Ok(GameEnd::GameOver);
                }
                LevelEnd::Quit => return Ok(GameEnd::Quit),
                LevelEnd::SaveRequested => match checkpoint::checkpoint(self, frontend)? {
                    Decision::Resumed => {}
                    Decision::Won => return Ok(GameEnd::Won),
                    Decision::Quit => return Ok(GameEnd::Quit),
                },
            }
        }
    }
}
