use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::loader::Campaign;
use crate::scheduler::PacingMode;

const TEMPO_ENV_VAR: &str = "CHASE_TEMPO_MS";
const FPS_ENV_VAR: &str = "CHASE_FPS";
const DEFAULT_INPUT_FPS: u64 = 60;

#[derive(Parser, Debug)]
#[command(author, version, about = "Tile-based chase game with speculative save points")]
pub struct Cli {
    /// Directory holding the numbered `*.lvl` files.
    pub level_dir: PathBuf,
    /// Where the debug log is written.
    #[arg(long, default_value = "debug.log")]
    pub log_file: PathBuf,
    /// Seed for Random commands; entropy when omitted.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Run without a terminal. Every level needs a scripted runner.
    #[arg(long)]
    pub headless: bool,
    /// Step every chaser once per tick instead of on its own thread.
    #[arg(long)]
    pub lockstep: bool,
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub level_dir: PathBuf,
    pub log_file: PathBuf,
    pub seed: Option<u64>,
    pub headless: bool,
    pub pacing: PacingMode,
    pub tempo_override: Option<Duration>,
    pub poll_interval: Duration,
}

impl Settings {
    pub fn from_cli(cli: Cli) -> Self {
        let tempo_override = read_env_u64(TEMPO_ENV_VAR).map(Duration::from_millis);
        let fps = read_env_u64(FPS_ENV_VAR).unwrap_or(DEFAULT_INPUT_FPS);
        Self {
            level_dir: cli.level_dir,
            log_file: cli.log_file,
            seed: cli.seed,
            headless: cli.headless,
            pacing: if cli.lockstep {
                PacingMode::Lockstep
            } else {
                PacingMode::Threads
            },
            tempo_override,
            poll_interval: Duration::from_micros(1_000_000 / fps.max(1)),
        }
    }

    /// Applies environment overrides that reach into loaded levels.
    pub fn apply(&self, campaign: &mut Campaign) {
        if let Some(tempo) = self.tempo_override {
            for level in &mut campaign.levels {
                level.tempo = tempo;
            }
        }
    }
}

fn read_env_u64(name: &str) -> Option<u64> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
}
