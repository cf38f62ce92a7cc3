use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::board::{Agent, Board, Chaser, Command, CommandKind, Pos, Runner, Script, Tile};

const LEVEL_EXTENSION: &str = "lvl";
const MAX_SIDE: usize = 1024;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read level directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no .lvl files found in {path}")]
    NoLevels { path: PathBuf },
    #[error("level file name has no numeric key: {path}")]
    UnnumberedLevel { path: PathBuf },
    #[error("{path}:{line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error("{path}: {message}")]
    Placement { path: PathBuf, message: String },
}

#[derive(Clone, Debug)]
pub struct LevelDefinition {
    pub name: String,
    pub tempo: Duration,
    board: Board,
}

impl LevelDefinition {
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn instantiate(&self, points: u32) -> Board {
        let mut board = self.board.clone();
        board.runner.points = points;
        board
    }
}

#[derive(Clone, Debug)]
pub struct Campaign {
    pub levels: Vec<LevelDefinition>,
}

pub fn load_campaign(dir: &Path) -> Result<Campaign, LoadError> {
    let paths = discover_levels(dir)?;
    let levels = paths
        .iter()
        .map(|path| load_level(path))
        .collect::<Result<Vec<_>, _>>()?;
    info!(dir = %dir.display(), levels = levels.len(), "campaign loaded");
    Ok(Campaign { levels })
}

pub fn discover_levels(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let entries = fs::read_dir(dir).map_err(|source| LoadError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut keyed = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(LEVEL_EXTENSION) {
            continue;
        }
        let key = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(numeric_key)
            .ok_or_else(|| LoadError::UnnumberedLevel { path: path.clone() })?;
        keyed.push((key, path));
    }

    if keyed.is_empty() {
        return Err(LoadError::NoLevels {
            path: dir.to_path_buf(),
        });
    }
    keyed.sort();
    Ok(keyed.into_iter().map(|(_, path)| path).collect())
}

fn numeric_key(stem: &str) -> Option<u64> {
    let start = stem.find(|c: char| c.is_ascii_digit())?;
    let digits: String = stem[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn read_text(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

struct ParseCtx<'a> {
    path: &'a Path,
    line: usize,
}

impl ParseCtx<'_> {
    fn error(&self, message: impl Into<String>) -> LoadError {
        LoadError::Parse {
            path: self.path.to_path_buf(),
            line: self.line,
            message: message.into(),
        }
    }

    fn number<T: std::str::FromStr>(&self, token: Option<&str>, what: &str) -> Result<T, LoadError> {
        token
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| self.error(format!("expected {what}")))
    }
}

/// Lines with their 1-based numbers, `#` comments dropped. An empty line in a
/// level file is still a board row.
fn uncommented_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.starts_with('#'))
}

#[derive(Debug, Default)]
struct LevelFile {
    dim: Option<(usize, usize)>,
    runner_script: Option<String>,
    chaser_scripts: Vec<String>,
    tempo_ms: u64,
    rows: Vec<(usize, String)>,
}

fn parse_level_file(path: &Path, text: &str) -> Result<LevelFile, LoadError> {
    let mut file = LevelFile::default();
    for (line, raw) in uncommented_lines(text) {
        let ctx = ParseCtx { path, line };
        if let Some(rest) = raw.strip_prefix("DIM ") {
            if file.dim.is_some() {
                return Err(ctx.error("duplicate DIM directive"));
            }
            let mut tokens = rest.split_whitespace();
            let width: usize = ctx.number(tokens.next(), "DIM width")?;
            let height: usize = ctx.number(tokens.next(), "DIM height")?;
            if width == 0 || height == 0 {
                return Err(ctx.error("DIM must be at least 1x1"));
            }
            if width > MAX_SIDE || height > MAX_SIDE {
                return Err(ctx.error(format!("DIM may not exceed {MAX_SIDE}x{MAX_SIDE}")));
            }
            file.dim = Some((width, height));
        } else if let Some(rest) = raw.strip_prefix("PAC ") {
            let name = rest.trim();
            if name.is_empty() {
                return Err(ctx.error("PAC needs a file name"));
            }
            file.runner_script = Some(name.to_string());
        } else if let Some(rest) = raw.strip_prefix("MON ") {
            file.chaser_scripts = rest.split_whitespace().map(str::to_string).collect();
        } else if let Some(rest) = raw.strip_prefix("TEMPO ") {
            file.tempo_ms = ctx.number(rest.split_whitespace().next(), "TEMPO milliseconds")?;
        } else {
            file.rows.push((line, raw.to_string()));
        }
    }
    Ok(file)
}

#[derive(Debug, Default)]
struct ScriptFile {
    pos: Option<Pos>,
    step_delay: u32,
    moves: Vec<Command>,
}

fn parse_script(path: &Path, text: &str) -> Result<ScriptFile, LoadError> {
    let mut script = ScriptFile::default();
    for (line, raw) in uncommented_lines(text) {
        let ctx = ParseCtx { path, line };
        let mut tokens = raw.split_whitespace();
        let Some(head) = tokens.next() else {
            continue;
        };
        match head {
            "POS" => {
                let x = ctx.number(tokens.next(), "POS x")?;
                let y = ctx.number(tokens.next(), "POS y")?;
                script.pos = Some(Pos::new(x, y));
            }
            "PASSO" => {
                script.step_delay = ctx.number(tokens.next(), "PASSO step delay")?;
            }
            _ => {
                let mut letters = head.chars();
                let kind = match (letters.next(), letters.next()) {
                    (Some(letter), None) => CommandKind::from_letter(letter),
                    _ => None,
                }
                .ok_or_else(|| ctx.error(format!("unknown command {head:?}")))?;
                let repeat = tokens.next();
                let turns = match kind {
                    CommandKind::Wait => {
                        let turns: u32 = ctx.number(repeat, "repeat count for T")?;
                        if turns == 0 {
                            return Err(ctx.error("repeat count for T must be positive"));
                        }
                        turns
                    }
                    _ => 1,
                };
                script.moves.push(Command::new(kind, turns));
            }
        }
    }
    Ok(script)
}

fn build_tiles(path: &Path, file: &LevelFile) -> Result<(usize, usize, Vec<Tile>), LoadError> {
    let Some((width, height)) = file.dim else {
        return Err(LoadError::Parse {
            path: path.to_path_buf(),
            line: 0,
            message: "missing DIM directive".to_string(),
        });
    };
    let mut tiles = vec![Tile::EMPTY; width * height];
    for (y, (line, row)) in file.rows.iter().enumerate() {
        let ctx = ParseCtx { path, line: *line };
        if y >= height {
            if row.trim().is_empty() {
                continue;
            }
            return Err(ctx.error(format!("board has more than {height} rows")));
        }
        if row.chars().count() > width {
            return Err(ctx.error(format!("row is wider than {width} tiles")));
        }
        for (x, ch) in row.chars().enumerate() {
            let tile = &mut tiles[y * width + x];
            match ch {
                'X' => *tile = Tile::WALL,
                'o' => tile.has_dot = true,
                '@' => tile.has_portal = true,
                ' ' => {}
                other => return Err(ctx.error(format!("unknown tile {other:?}"))),
            }
        }
    }
    Ok((width, height, tiles))
}

fn place(
    path: &Path,
    what: &str,
    pos: Pos,
    width: usize,
    height: usize,
    tiles: &[Tile],
    taken: &[Pos],
) -> Result<Pos, LoadError> {
    let fail = |message: String| LoadError::Placement {
        path: path.to_path_buf(),
        message,
    };
    if pos.x >= width || pos.y >= height {
        return Err(fail(format!(
            "{what} position ({}, {}) is outside the {width}x{height} board",
            pos.x, pos.y
        )));
    }
    if tiles[pos.y * width + pos.x] == Tile::WALL {
        return Err(fail(format!("{what} position ({}, {}) is a wall", pos.x, pos.y)));
    }
    if taken.contains(&pos) {
        return Err(fail(format!(
            "{what} position ({}, {}) is already occupied",
            pos.x, pos.y
        )));
    }
    Ok(pos)
}

pub fn load_level(path: &Path) -> Result<LevelDefinition, LoadError> {
    let text = read_text(path)?;
    let file = parse_level_file(path, &text)?;
    let (width, height, tiles) = build_tiles(path, &file)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let mut taken = Vec::new();
    let mut chasers = Vec::with_capacity(file.chaser_scripts.len());
    for name in &file.chaser_scripts {
        let script_path = base.join(name);
        let script = parse_script(&script_path, &read_text(&script_path)?)?;
        let Some(pos) = script.pos else {
            return Err(LoadError::Placement {
                path: script_path,
                message: "chaser script has no POS line".to_string(),
            });
        };
        let pos = place(&script_path, "chaser", pos, width, height, &tiles, &taken)?;
        taken.push(pos);
        chasers.push(Chaser::new(Agent::new(
            pos,
            script.step_delay,
            Script::new(script.moves),
        )));
    }

    let runner_agent = match &file.runner_script {
        Some(name) => {
            let script_path = base.join(name);
            let script = parse_script(&script_path, &read_text(&script_path)?)?;
            let pos = match script.pos {
                Some(pos) => place(&script_path, "runner", pos, width, height, &tiles, &taken)?,
                None => first_free_tile(path, width, &tiles, &taken)?,
            };
            Agent::new(pos, script.step_delay, Script::new(script.moves))
        }
        None => Agent::new(
            first_free_tile(path, width, &tiles, &taken)?,
            0,
            Script::default(),
        ),
    };

    let board = Board::new(width, height, tiles, Runner::new(runner_agent, 0), chasers);
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    debug!(level = %name, "loaded board\n{board}");
    Ok(LevelDefinition {
        name,
        tempo: Duration::from_millis(file.tempo_ms),
        board,
    })
}

fn first_free_tile(
    path: &Path,
    width: usize,
    tiles: &[Tile],
    taken: &[Pos],
) -> Result<Pos, LoadError> {
    tiles
        .iter()
        .enumerate()
        .map(|(idx, tile)| (Pos::new(idx % width, idx / width), tile))
        .find(|(pos, tile)| tile.is_free() && !taken.contains(pos))
        .map(|(pos, _)| pos)
        .ok_or_else(|| LoadError::Placement {
            path: path.to_path_buf(),
            message: "no free tile to place the runner on".to_string(),
        })
}
