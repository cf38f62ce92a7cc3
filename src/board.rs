use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pos {
    pub x: usize,
    pub y: usize,
}

impl Pos {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dir {
    Up,
    Down,
    Left,
    Right,
}

impl Dir {
    pub const ALL: [Dir; 4] = [Dir::Up, Dir::Down, Dir::Left, Dir::Right];

    pub fn delta(self) -> (isize, isize) {
        match self {
            Dir::Up => (0, -1),
            Dir::Down => (0, 1),
            Dir::Left => (-1, 0),
            Dir::Right => (1, 0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Content {
    Empty,
    Wall,
    Runner,
    Chaser,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tile {
    pub content: Content,
    pub has_dot: bool,
    pub has_portal: bool,
}

impl Tile {
    pub const EMPTY: Tile = Tile {
        content: Content::Empty,
        has_dot: false,
        has_portal: false,
    };

    pub const WALL: Tile = Tile {
        content: Content::Wall,
        has_dot: false,
        has_portal: false,
    };

    pub fn is_free(&self) -> bool {
        self.content == Content::Empty && !self.has_portal
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    Move(Dir),
    Random,
    Charge,
    Wait,
    Quit,
    Save,
}

impl CommandKind {
    pub fn from_letter(letter: char) -> Option<Self> {
        let kind = match letter {
            'W' => CommandKind::Move(Dir::Up),
            'S' => CommandKind::Move(Dir::Down),
            'A' => CommandKind::Move(Dir::Left),
            'D' => CommandKind::Move(Dir::Right),
            'R' => CommandKind::Random,
            'C' => CommandKind::Charge,
            'T' => CommandKind::Wait,
            'Q' => CommandKind::Quit,
            'G' => CommandKind::Save,
            _ => return None,
        };
        Some(kind)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Command {
    pub kind: CommandKind,
    pub turns: u32,
    pub turns_left: u32,
}

impl Command {
    pub fn new(kind: CommandKind, turns: u32) -> Self {
        let turns = turns.max(1);
        Self {
            kind,
            turns,
            turns_left: turns,
        }
    }

    pub fn once(kind: CommandKind) -> Self {
        Self::new(kind, 1)
    }
}

/// A circular list of scripted commands. An empty script means the entity is
/// driven by live input (runner) or never acts (chaser).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Script {
    moves: Vec<Command>,
    cursor: usize,
}

impl Script {
    pub fn new(moves: Vec<Command>) -> Self {
        Self { moves, cursor: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn slot(&self) -> Option<usize> {
        if self.moves.is_empty() {
            None
        } else {
            Some(self.cursor % self.moves.len())
        }
    }

    pub fn current(&self) -> Option<Command> {
        self.slot().map(|idx| self.moves[idx])
    }

    pub fn advance(&mut self) {
        if !self.moves.is_empty() {
            self.cursor = (self.cursor + 1) % self.moves.len();
        }
    }

    /// Burns one repeat of the Wait under the cursor. The cursor only moves on
    /// once the last repeat is spent, and the counter is rearmed for the next lap.
    pub fn spend_wait(&mut self) {
        let Some(idx) = self.slot() else {
            return;
        };
        let command = &mut self.moves[idx];
        if command.turns_left <= 1 {
            command.turns_left = command.turns;
            self.advance();
        } else {
            command.turns_left -= 1;
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pacing {
    pub step_delay: u32,
    pub waiting: u32,
}

impl Pacing {
    pub fn new(step_delay: u32) -> Self {
        Self {
            step_delay,
            waiting: 0,
        }
    }

    /// Returns true when this tick is skipped.
    pub fn hold(&mut self) -> bool {
        if self.waiting > 0 {
            self.waiting -= 1;
            return true;
        }
        self.waiting = self.step_delay;
        false
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Agent {
    pub pos: Pos,
    pub pacing: Pacing,
    pub script: Script,
}

impl Agent {
    pub fn new(pos: Pos, step_delay: u32, script: Script) -> Self {
        Self {
            pos,
            pacing: Pacing::new(step_delay),
            script,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Runner {
    pub agent: Agent,
    pub alive: bool,
    pub points: u32,
}

impl Runner {
    pub fn new(agent: Agent, points: u32) -> Self {
        Self {
            agent,
            alive: true,
            points,
        }
    }

    pub fn pos(&self) -> Pos {
        self.agent.pos
    }

    pub fn is_live_controlled(&self) -> bool {
        self.agent.script.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chaser {
    pub agent: Agent,
    pub charged: bool,
}

impl Chaser {
    pub fn new(agent: Agent) -> Self {
        Self {
            agent,
            charged: false,
        }
    }

    pub fn pos(&self) -> Pos {
        self.agent.pos
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    width: usize,
    height: usize,
    tiles: Vec<Tile>,
    pub runner: Runner,
    pub chasers: Vec<Chaser>,
}

impl Board {
    pub fn new(
        width: usize,
        height: usize,
        tiles: Vec<Tile>,
        runner: Runner,
        chasers: Vec<Chaser>,
    ) -> Self {
        debug_assert_eq!(tiles.len(), width * height);
        let mut board = Self {
            width,
            height,
            tiles,
            runner,
            chasers,
        };
        let runner_pos = board.runner.pos();
        board.set_content(runner_pos, Content::Runner);
        for idx in 0..board.chasers.len() {
            let pos = board.chasers[idx].pos();
            board.set_content(pos, Content::Chaser);
        }
        board
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn in_bounds(&self, x: isize, y: isize) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    pub fn step(&self, pos: Pos, dir: Dir) -> Option<Pos> {
        let (dx, dy) = dir.delta();
        let nx = pos.x as isize + dx;
        let ny = pos.y as isize + dy;
        if self.in_bounds(nx, ny) {
            Some(Pos::new(nx as usize, ny as usize))
        } else {
            None
        }
    }

    fn index(&self, pos: Pos) -> usize {
        pos.y * self.width + pos.x
    }

    pub fn tile(&self, pos: Pos) -> Option<&Tile> {
        if pos.x < self.width && pos.y < self.height {
            Some(&self.tiles[self.index(pos)])
        } else {
            None
        }
    }

    pub(crate) fn tile_mut(&mut self, pos: Pos) -> Option<&mut Tile> {
        if pos.x < self.width && pos.y < self.height {
            let idx = self.index(pos);
            Some(&mut self.tiles[idx])
        } else {
            None
        }
    }

    pub fn content(&self, pos: Pos) -> Option<Content> {
        self.tile(pos).map(|tile| tile.content)
    }

    pub(crate) fn set_content(&mut self, pos: Pos, content: Content) {
        if let Some(tile) = self.tile_mut(pos) {
            tile.content = content;
        }
    }

    pub fn dots_left(&self) -> usize {
        self.tiles.iter().filter(|tile| tile.has_dot).count()
    }

    pub fn kill_runner_at(&mut self, pos: Pos) -> bool {
        if self.runner.alive && self.runner.pos() == pos {
            self.kill_runner();
            true
        } else {
            false
        }
    }

    pub fn kill_runner(&mut self) {
        let pos = self.runner.pos();
        self.runner.alive = false;
        if self.content(pos) == Some(Content::Runner) {
            self.set_content(pos, Content::Empty);
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.height {
            for x in 0..self.width {
                let tile = &self.tiles[y * self.width + x];
                let glyph = match tile.content {
                    Content::Wall => 'X',
                    Content::Runner => 'P',
                    Content::Chaser => 'M',
                    Content::Empty if tile.has_portal => '@',
                    Content::Empty if tile.has_dot => 'o',
                    Content::Empty => ' ',
                };
                write!(f, "{glyph}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
