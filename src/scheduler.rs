use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, trace, warn};

use crate::board::{Board, CommandKind};
use crate::error::GameError;
use crate::frontend::{DrawMode, Frontend, View};
use crate::loader::LevelDefinition;
use crate::logging::LogHandle;
use crate::rules::{self, Outcome};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PacingMode {
    #[default]
    Threads,
    Lockstep,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelEnd {
    Complete,
    RunnerDead,
    Quit,
    SaveRequested,
}

#[derive(Clone, Debug)]
pub struct LevelState {
    pub board: Board,
    pub name: String,
    pub index: usize,
    pub tempo: Duration,
    rng: StdRng,
}

impl LevelState {
    pub fn new(def: &LevelDefinition, index: usize, points: u32, seed: Option<u64>) -> Self {
        Self::from_board(def.instantiate(points), &def.name, index, def.tempo, seed)
    }

    pub fn from_board(
        board: Board,
        name: &str,
        index: usize,
        tempo: Duration,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
            None => StdRng::from_entropy(),
        };
        Self {
            board,
            name: name.to_string(),
            index,
            tempo,
            rng,
        }
    }

    pub fn view(&self, depth: u32) -> View<'_> {
        View {
            board: &self.board,
            level_name: &self.name,
            level_index: self.index,
            depth,
        }
    }
}

#[derive(Debug)]
struct ChaserIntent {
    chaser: usize,
    seq: u64,
}

struct ChaserPacers {
    running: Arc<AtomicBool>,
    intents: Vec<Receiver<ChaserIntent>>,
    workers: Vec<JoinHandle<()>>,
}

impl ChaserPacers {
    fn start(count: usize, tempo: Duration, log: &LogHandle) -> Result<Self, GameError> {
        Self::start_with(count, tempo, log, |builder, work| builder.spawn(work))
    }

    // A failed spawn drops `pacers`, which joins the ones already running.
    fn start_with<S>(
        count: usize,
        tempo: Duration,
        log: &LogHandle,
        mut spawn: S,
    ) -> Result<Self, GameError>
    where
        S: FnMut(thread::Builder, Box<dyn FnOnce() + Send>) -> io::Result<JoinHandle<()>>,
    {
        let mut pacers = Self {
            running: Arc::new(AtomicBool::new(true)),
            intents: Vec::with_capacity(count),
            workers: Vec::with_capacity(count),
        };
        for chaser in 0..count {
            let (tx, rx) = crossbeam_channel::bounded(1);
            let running = Arc::clone(&pacers.running);
            let log = log.clone();
            let name = format!("chaser-{chaser}");
            let work: Box<dyn FnOnce() + Send> =
                Box::new(move || log.scope(|| pace(chaser, tempo, &running, &tx)));
            let handle = spawn(thread::Builder::new().name(name.clone()), work)
                .map_err(|source| GameError::SpawnWorker { name, source })?;
            pacers.intents.push(rx);
            pacers.workers.push(handle);
        }
        Ok(pacers)
    }

    fn ready(&self, chaser: usize) -> bool {
        match self.intents.get(chaser).map(Receiver::try_recv) {
            Some(Ok(intent)) => {
                trace!(chaser = intent.chaser, seq = intent.seq, "chaser intent");
                true
            }
            _ => false,
        }
    }

    fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);
        // Dropping the receivers wakes any pacer blocked on a full channel.
        self.intents.clear();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("chaser pacer panicked");
            }
        }
    }
}

impl Drop for ChaserPacers {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn pace(chaser: usize, tempo: Duration, running: &AtomicBool, tx: &Sender<ChaserIntent>) {
    debug!(chaser, "pacer started");
    let mut seq = 0;
    while running.load(Ordering::Acquire) {
        if tx.send(ChaserIntent { chaser, seq }).is_err() {
            break;
        }
        seq += 1;
        if !tempo.is_zero() {
            thread::sleep(tempo);
        }
    }
    debug!(chaser, seq, "pacer stopped");
}

pub struct Scheduler {
    pacing: PacingMode,
    log: LogHandle,
}

impl Scheduler {
    pub fn new(pacing: PacingMode, log: LogHandle) -> Self {
        Self { pacing, log }
    }

    pub fn log(&self) -> &LogHandle {
        &self.log
    }

    pub fn play(
        &self,
        state: &mut LevelState,
        frontend: &mut dyn Frontend,
        allow_checkpoint: bool,
        depth: u32,
    ) -> Result<LevelEnd, GameError> {
        let pacers = match self.pacing {
            PacingMode::Threads => Some(ChaserPacers::start(
                state.board.chasers.len(),
                state.tempo,
                &self.log,
            )?),
            PacingMode::Lockstep => None,
        };
        info!(level = %state.name, depth, chasers = state.board.chasers.len(), "level playing");

        let end = self.drive(state, frontend, allow_checkpoint, depth, pacers.as_ref());
        if let Some(pacers) = pacers {
            pacers.stop();
        }
        if let Ok(end) = &end {
            info!(level = %state.name, depth, ?end, points = state.board.runner.points, "level stopped");
        }
        end
    }

    fn drive(
        &self,
        state: &mut LevelState,
        frontend: &mut dyn Frontend,
        allow_checkpoint: bool,
        depth: u32,
        pacers: Option<&ChaserPacers>,
    ) -> Result<LevelEnd, GameError> {
        loop {
            if let Some(end) = runner_turn(state, frontend, allow_checkpoint)? {
                return Ok(end);
            }

            for chaser in 0..state.board.chasers.len() {
                if !pacers.map_or(true, |p| p.ready(chaser)) {
                    continue;
                }
                let outcome = rules::move_chaser(&mut state.board, chaser, &mut state.rng);
                trace!(chaser, ?outcome, "chaser moved");
                if outcome == Outcome::Died {
                    debug!(chaser, "runner caught");
                }
            }
            if !state.board.runner.alive {
                frontend.draw(&state.view(depth), DrawMode::Playing)?;
                return Ok(LevelEnd::RunnerDead);
            }

            frontend.draw(&state.view(depth), DrawMode::Playing)?;
            if !state.tempo.is_zero() {
                thread::sleep(state.tempo);
            }
        }
    }
}

fn runner_turn(
    state: &mut LevelState,
    frontend: &mut dyn Frontend,
    allow_checkpoint: bool,
) -> Result<Option<LevelEnd>, GameError> {
    let live = if state.board.runner.is_live_controlled() {
        match frontend.poll_command()? {
            Some(kind) => Some(kind),
            None => return Ok(None),
        }
    } else {
        None
    };

    let runner = &mut state.board.runner;
    let kind = live.or_else(|| runner.agent.script.current().map(|c| c.kind));
    match kind {
        Some(CommandKind::Quit) => {
            if live.is_none() {
                runner.agent.script.advance();
            }
            debug!("quit requested");
            return Ok(Some(LevelEnd::Quit));
        }
        Some(CommandKind::Save) => {
            if live.is_none() {
                runner.agent.script.advance();
            }
            if allow_checkpoint {
                return Ok(Some(LevelEnd::SaveRequested));
            }
            debug!("save ignored, a checkpoint is already pending");
            return Ok(None);
        }
        _ => {}
    }

    let outcome = rules::move_runner(&mut state.board, live, &mut state.rng);
    trace!(command = ?kind, ?outcome, "runner moved");
    Ok(match outcome {
        Outcome::ReachedGoal => Some(LevelEnd::Complete),
        Outcome::Died => Some(LevelEnd::RunnerDead),
        _ => None,
    })
}
