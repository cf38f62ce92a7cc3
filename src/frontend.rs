use std::collections::VecDeque;
use std::io::{self, Stdout, Write};
use std::time::Duration;

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{ExecutableCommand, QueueableCommand};
use unicode_width::UnicodeWidthStr;

use crate::board::{Board, CommandKind, Content, Dir, Pos};

const CELL_W: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawMode {
    Playing,
    LevelComplete,
    GameOver,
    Victory,
}

pub struct View<'a> {
    pub board: &'a Board,
    pub level_name: &'a str,
    pub level_index: usize,
    pub depth: u32,
}

pub trait Frontend: Send {
    fn poll_command(&mut self) -> io::Result<Option<CommandKind>>;
    fn draw(&mut self, view: &View<'_>, mode: DrawMode) -> io::Result<()>;
}

#[derive(Clone, Copy, PartialEq)]
enum Glyph {
    Runner,
    Chaser,
    Wall,
    Empty,
    Dot,
    Portal,
}

#[derive(Clone, Copy, PartialEq)]
struct Cell {
    glyph: Glyph,
    color: Color,
}

const BLANK: Cell = Cell {
    glyph: Glyph::Empty,
    color: Color::Reset,
};

fn cell_for(board: &Board, pos: Pos) -> Cell {
    let Some(tile) = board.tile(pos) else {
        return BLANK;
    };
    match tile.content {
        Content::Runner => Cell {
            glyph: Glyph::Runner,
            color: Color::Yellow,
        },
        Content::Chaser => {
            let charged = board
                .chasers
                .iter()
                .any(|chaser| chaser.pos() == pos && chaser.charged);
            Cell {
                glyph: Glyph::Chaser,
                color: if charged { Color::Magenta } else { Color::Red },
            }
        }
        Content::Wall => Cell {
            glyph: Glyph::Wall,
            color: Color::Blue,
        },
        Content::Empty if tile.has_portal => Cell {
            glyph: Glyph::Portal,
            color: Color::Green,
        },
        Content::Empty if tile.has_dot => Cell {
            glyph: Glyph::Dot,
            color: Color::White,
        },
        Content::Empty => BLANK,
    }
}

pub struct Terminal {
    stdout: Stdout,
    last: Vec<Cell>,
    last_hud: String,
    last_size: (usize, usize),
    needs_full: bool,
    origin_x: u16,
    origin_y: u16,
    poll_interval: Duration,
}

impl Terminal {
    pub fn open(poll_interval: Duration) -> io::Result<Self> {
        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        stdout.execute(Hide)?;
        Ok(Self {
            stdout,
            last: Vec::new(),
            last_hud: String::new(),
            last_size: (0, 0),
            needs_full: true,
            origin_x: 0,
            origin_y: 1,
            poll_interval,
        })
    }

    fn draw_cell(&mut self, x: usize, y: usize, cell: Cell) -> io::Result<()> {
        let text = match cell.glyph {
            Glyph::Runner => "😃",
            Glyph::Chaser => "👻",
            Glyph::Wall => "██",
            Glyph::Empty => "  ",
            Glyph::Dot => "· ",
            Glyph::Portal => "@@",
        };
        let x_pos = self.origin_x + (x * CELL_W) as u16;
        let y_pos = self.origin_y + y as u16;
        self.stdout.queue(MoveTo(x_pos, y_pos))?;
        self.stdout.queue(SetForegroundColor(cell.color))?;
        self.stdout.queue(Print(text))?;
        let w = UnicodeWidthStr::width(text);
        if w < CELL_W {
            for _ in 0..(CELL_W - w) {
                self.stdout.queue(Print(' '))?;
            }
        }
        self.stdout.queue(ResetColor)?;
        Ok(())
    }

    fn draw_banner(&mut self, view: &View<'_>, text: &str) -> io::Result<()> {
        self.stdout
            .queue(MoveTo(self.origin_x, self.origin_y + view.board.height() as u16))?;
        self.stdout.queue(Clear(ClearType::CurrentLine))?;
        self.stdout.queue(Print(text))?;
        Ok(())
    }

    pub fn wait_for_exit(&mut self) -> io::Result<()> {
        loop {
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && key.code == KeyCode::Char('q') {
                        return Ok(());
                    }
                }
            }
        }
    }
}

impl Frontend for Terminal {
    fn poll_command(&mut self) -> io::Result<Option<CommandKind>> {
        let mut command = None;
        if !event::poll(self.poll_interval)? {
            return Ok(None);
        }
        while event::poll(Duration::from_millis(0))? {
            if let Event::Key(key) = event::read()? {
                if !matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
                    continue;
                }
                let next = match key.code {
                    KeyCode::Char('w') | KeyCode::Up => Some(CommandKind::Move(Dir::Up)),
                    KeyCode::Char('s') | KeyCode::Down => Some(CommandKind::Move(Dir::Down)),
                    KeyCode::Char('a') | KeyCode::Left => Some(CommandKind::Move(Dir::Left)),
                    KeyCode::Char('d') | KeyCode::Right => Some(CommandKind::Move(Dir::Right)),
                    KeyCode::Char('q') => Some(CommandKind::Quit),
                    KeyCode::Char('g') => Some(CommandKind::Save),
                    _ => None,
                };
                // Quit and Save are never overwritten by a later movement key.
                if matches!(command, Some(CommandKind::Quit | CommandKind::Save)) {
                    continue;
                }
                if next.is_some() {
                    command = next;
                }
            }
        }
        Ok(command)
    }

    fn draw(&mut self, view: &View<'_>, mode: DrawMode) -> io::Result<()> {
        let board = view.board;
        let needed_h = (board.height() + 2) as u16;
        let needed_w = (board.width() * CELL_W) as u16;

        self.stdout.queue(MoveTo(0, 0))?;

        let (term_w, term_h) = terminal::size()?;
        if term_w < needed_w || term_h < needed_h {
            self.stdout.queue(Clear(ClearType::All))?;
            let msg = format!(
                "Terminal too small. Need at least {}x{} (cols x rows). Current: {}x{}.",
                needed_w, needed_h, term_w, term_h
            );
            self.stdout.queue(Print(msg))?;
            self.stdout.flush()?;
            self.needs_full = true;
            return Ok(());
        }

        let size = (board.width(), board.height());
        if size != self.last_size {
            self.last = vec![BLANK; size.0 * size.1];
            self.last_size = size;
            self.stdout.queue(Clear(ClearType::All))?;
            self.needs_full = true;
        }

        let origin_x = (term_w - needed_w) / 2;
        let origin_y = (term_h - needed_h) / 2 + 1;
        if origin_x != self.origin_x || origin_y != self.origin_y {
            self.origin_x = origin_x;
            self.origin_y = origin_y;
            self.stdout.queue(Clear(ClearType::All))?;
            self.needs_full = true;
        }

        let branch = if view.depth > 0 {
            format!("  Branch: {}", view.depth)
        } else {
            String::new()
        };
        let hud = format!(
            "Level {} ({})  Points: {}  Dots: {}{}  (wasd move, g save, q quit)",
            view.level_index + 1,
            view.level_name,
            board.runner.points,
            board.dots_left(),
            branch
        );
        if self.needs_full || hud != self.last_hud {
            self.stdout.queue(MoveTo(self.origin_x, self.origin_y - 1))?;
            self.stdout.queue(SetForegroundColor(Color::White))?;
            self.stdout.queue(Clear(ClearType::CurrentLine))?;
            self.stdout.queue(Print(&hud))?;
            self.stdout.queue(ResetColor)?;
            self.last_hud = hud;
        }

        for y in 0..board.height() {
            for x in 0..board.width() {
                let cell = cell_for(board, Pos::new(x, y));
                let idx = y * board.width() + x;
                if self.needs_full || cell != self.last[idx] {
                    self.last[idx] = cell;
                    self.draw_cell(x, y, cell)?;
                }
            }
        }
        self.needs_full = false;

        match mode {
            DrawMode::Playing => {}
            DrawMode::LevelComplete => self.draw_banner(view, "LEVEL COMPLETE")?,
            DrawMode::GameOver => self.draw_banner(
                view,
                &format!(
                    "GAME OVER - Final Score: {} (press q to quit)",
                    board.runner.points
                ),
            )?,
            DrawMode::Victory => self.draw_banner(
                view,
                &format!(
                    "YOU WIN - Final Score: {} (press q to quit)",
                    board.runner.points
                ),
            )?,
        }

        self.stdout.flush()?;
        Ok(())
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        let _ = self.stdout.execute(Show);
        let _ = self.stdout.execute(LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawRecord {
    pub mode: DrawMode,
    pub depth: u32,
    pub level_index: usize,
    pub points: u32,
}

#[derive(Debug, Default)]
pub struct Headless {
    inputs: VecDeque<CommandKind>,
    pub draws: Vec<DrawRecord>,
}

impl Headless {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inputs(inputs: impl IntoIterator<Item = CommandKind>) -> Self {
        Self {
            inputs: inputs.into_iter().collect(),
            draws: Vec::new(),
        }
    }

    pub fn last_mode(&self) -> Option<DrawMode> {
        self.draws.last().map(|record| record.mode)
    }
}

impl Frontend for Headless {
    fn poll_command(&mut self) -> io::Result<Option<CommandKind>> {
        Ok(self.inputs.pop_front())
    }

    fn draw(&mut self, view: &View<'_>, mode: DrawMode) -> io::Result<()> {
        self.draws.push(DrawRecord {
            mode,
            depth: view.depth,
            level_index: view.level_index,
            points: view.board.runner.points,
        });
        Ok(())
    }
}
