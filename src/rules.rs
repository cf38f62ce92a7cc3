use rand::Rng;

use crate::board::{Board, CommandKind, Content, Dir, Pos};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Obstacle {
    Wall,
    Chaser,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Valid,
    Invalid,
    Blocked(Obstacle),
    Died,
    ReachedGoal,
}

impl Outcome {
    pub fn is_rejected(self) -> bool {
        matches!(self, Outcome::Invalid | Outcome::Blocked(_))
    }
}

fn randomize(kind: CommandKind, rng: &mut impl Rng) -> CommandKind {
    match kind {
        CommandKind::Random => CommandKind::Move(Dir::ALL[rng.gen_range(0..Dir::ALL.len())]),
        other => other,
    }
}

/// Resolves one runner tick. `live` carries the command read from the input
/// boundary; when it is None the runner's script supplies the command.
pub fn move_runner(board: &mut Board, live: Option<CommandKind>, rng: &mut impl Rng) -> Outcome {
    if !board.runner.alive {
        return Outcome::Died;
    }
    if board.runner.agent.pacing.hold() {
        return Outcome::Valid;
    }

    let scripted = live.is_none();
    let kind = match live.or_else(|| board.runner.agent.script.current().map(|c| c.kind)) {
        Some(kind) => kind,
        None => return Outcome::Valid,
    };

    match randomize(kind, rng) {
        CommandKind::Wait => {
            if scripted {
                board.runner.agent.script.spend_wait();
            }
            Outcome::Valid
        }
        CommandKind::Move(dir) => {
            if scripted {
                board.runner.agent.script.advance();
            }
            step_runner(board, dir)
        }
        _ => {
            if scripted {
                board.runner.agent.script.advance();
            }
            Outcome::Invalid
        }
    }
}

fn step_runner(board: &mut Board, dir: Dir) -> Outcome {
    let from = board.runner.pos();
    let Some(to) = board.step(from, dir) else {
        return Outcome::Invalid;
    };
    let Some(target) = board.tile(to).copied() else {
        return Outcome::Invalid;
    };

    // The portal wins over whatever else is on the tile.
    if target.has_portal {
        relocate_runner(board, from, to);
        return Outcome::ReachedGoal;
    }

    match target.content {
        Content::Wall => Outcome::Blocked(Obstacle::Wall),
        Content::Chaser => {
            board.kill_runner();
            Outcome::Died
        }
        Content::Empty | Content::Runner => {
            if target.has_dot {
                if let Some(tile) = board.tile_mut(to) {
                    tile.has_dot = false;
                }
                board.runner.points += 1;
            }
            relocate_runner(board, from, to);
            Outcome::Valid
        }
    }
}

fn relocate_runner(board: &mut Board, from: Pos, to: Pos) {
    board.set_content(from, Content::Empty);
    board.runner.agent.pos = to;
    board.set_content(to, Content::Runner);
}

pub fn move_chaser(board: &mut Board, index: usize, rng: &mut impl Rng) -> Outcome {
    let Some(chaser) = board.chasers.get_mut(index) else {
        return Outcome::Invalid;
    };
    if chaser.agent.pacing.hold() {
        return Outcome::Valid;
    }
    let Some(command) = chaser.agent.script.current() else {
        return Outcome::Valid;
    };

    match randomize(command.kind, rng) {
        CommandKind::Charge => {
            chaser.agent.script.advance();
            chaser.charged = true;
            Outcome::Valid
        }
        CommandKind::Wait => {
            chaser.agent.script.spend_wait();
            Outcome::Valid
        }
        CommandKind::Move(dir) => {
            chaser.agent.script.advance();
            if std::mem::take(&mut chaser.charged) {
                slide_chaser(board, index, dir)
            } else {
                step_chaser(board, index, dir)
            }
        }
        _ => {
            chaser.agent.script.advance();
            Outcome::Invalid
        }
    }
}

fn step_chaser(board: &mut Board, index: usize, dir: Dir) -> Outcome {
    let from = board.chasers[index].pos();
    let Some(to) = board.step(from, dir) else {
        return Outcome::Invalid;
    };
    match board.content(to) {
        Some(Content::Wall) => Outcome::Blocked(Obstacle::Wall),
        Some(Content::Chaser) => Outcome::Blocked(Obstacle::Chaser),
        Some(_) => {
            let killed = board.kill_runner_at(to);
            relocate_chaser(board, index, to);
            if killed {
                Outcome::Died
            } else {
                Outcome::Valid
            }
        }
        None => Outcome::Invalid,
    }
}

/// Charged move: travel in a straight line until the edge, stopping short of
/// the first wall or chaser, or on the runner's tile (killing it).
fn slide_chaser(board: &mut Board, index: usize, dir: Dir) -> Outcome {
    let from = board.chasers[index].pos();
    let mut next = match board.step(from, dir) {
        Some(pos) => Some(pos),
        None => return Outcome::Invalid,
    };

    let mut stop = from;
    let mut obstacle = None;
    let mut hit_runner = false;
    while let Some(pos) = next {
        match board.content(pos) {
            Some(Content::Wall) => {
                obstacle = Some(Obstacle::Wall);
                break;
            }
            Some(Content::Chaser) => {
                obstacle = Some(Obstacle::Chaser);
                break;
            }
            Some(Content::Runner) => {
                stop = pos;
                hit_runner = true;
                break;
            }
            Some(Content::Empty) => {
                stop = pos;
                next = board.step(pos, dir);
            }
            None => break,
        }
    }

    if stop == from {
        return Outcome::Blocked(obstacle.unwrap_or(Obstacle::Wall));
    }

    let killed = hit_runner && board.kill_runner_at(stop);
    relocate_chaser(board, index, stop);
    if killed {
        Outcome::Died
    } else {
        Outcome::Valid
    }
}

fn relocate_chaser(board: &mut Board, index: usize, to: Pos) {
    let from = board.chasers[index].pos();
    board.set_content(from, Content::Empty);
    board.chasers[index].agent.pos = to;
    board.set_content(to, Content::Chaser);
}

#[cfg(test)]
pub(crate) mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::board::{Agent, Chaser, Command, Runner, Script, Tile};

    /// `X` wall, `o` dot, `@` portal, `P` runner, `M` chaser, space floor.
    pub(crate) fn board_from(rows: &[&str]) -> Board {
        let height = rows.len();
        let width = rows.iter().map(|row| row.len()).max().unwrap_or(0);
        let mut tiles = vec![Tile::EMPTY; width * height];
        let mut runner = None;
        let mut chasers = Vec::new();
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let tile = &mut tiles[y * width + x];
                match ch {
                    'X' => *tile = Tile::WALL,
                    'o' => tile.has_dot = true,
                    '@' => tile.has_portal = true,
                    'P' => runner = Some(Pos::new(x, y)),
                    'M' => chasers.push(Chaser::new(Agent::new(
                        Pos::new(x, y),
                        0,
                        Script::default(),
                    ))),
                    _ => {}
                }
            }
        }
        let runner = Runner::new(
            Agent::new(runner.expect("board needs a runner"), 0, Script::default()),
            0,
        );
        Board::new(width, height, tiles, runner, chasers)
    }

    pub(crate) fn script(letters: &str) -> Script {
        Script::new(
            letters
                .chars()
                .map(|ch| Command::once(CommandKind::from_letter(ch).expect("letter")))
                .collect(),
        )
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn live(dir: Dir) -> Option<CommandKind> {
        Some(CommandKind::Move(dir))
    }

    #[test]
    fn out_of_bounds_moves_are_invalid_and_leave_position() {
        let mut rng = rng();
        let mut board = board_from(&["P  ", "   "]);
        for dir in [Dir::Up, Dir::Left] {
            let before = board.clone();
            assert_eq!(move_runner(&mut board, live(dir), &mut rng), Outcome::Invalid);
            assert_eq!(board, before);
        }

        let mut board = board_from(&["  M", "P  "]);
        board.chasers[0].agent.script = script("D");
        assert_eq!(move_chaser(&mut board, 0, &mut rng), Outcome::Invalid);
        assert_eq!(board.chasers[0].pos(), Pos::new(2, 0));
    }

    #[test]
    fn runner_collects_dot_and_vacates_old_tile() {
        let mut rng = rng();
        let mut board = board_from(&["Po "]);
        assert_eq!(move_runner(&mut board, live(Dir::Right), &mut rng), Outcome::Valid);
        assert_eq!(board.runner.pos(), Pos::new(1, 0));
        assert_eq!(board.runner.points, 1);
        assert_eq!(board.content(Pos::new(0, 0)), Some(Content::Empty));
        assert_eq!(board.content(Pos::new(1, 0)), Some(Content::Runner));
        assert!(!board.tile(Pos::new(1, 0)).unwrap().has_dot);
    }

    #[test]
    fn portal_takes_precedence_over_dot() {
        let mut rng = rng();
        let mut board = board_from(&["P@"]);
        board.tile_mut(Pos::new(1, 0)).unwrap().has_dot = true;
        assert_eq!(
            move_runner(&mut board, live(Dir::Right), &mut rng),
            Outcome::ReachedGoal
        );
        assert_eq!(board.runner.pos(), Pos::new(1, 0));
        assert_eq!(board.runner.points, 0);
        assert_eq!(board.content(Pos::new(0, 0)), Some(Content::Empty));
    }

    #[test]
    fn runner_is_blocked_by_wall_and_dies_on_chaser() {
        let mut rng = rng();
        let mut board = board_from(&["XPM"]);
        assert_eq!(
            move_runner(&mut board, live(Dir::Left), &mut rng),
            Outcome::Blocked(Obstacle::Wall)
        );
        assert!(board.runner.alive);
        assert_eq!(move_runner(&mut board, live(Dir::Right), &mut rng), Outcome::Died);
        assert!(!board.runner.alive);
        assert_eq!(board.content(Pos::new(1, 0)), Some(Content::Empty));
        assert_eq!(move_runner(&mut board, live(Dir::Left), &mut rng), Outcome::Died);
    }

    #[test]
    fn runner_cannot_charge() {
        let mut rng = rng();
        let mut board = board_from(&["P "]);
        board.runner.agent.script = script("CD");
        assert_eq!(move_runner(&mut board, None, &mut rng), Outcome::Invalid);
        assert_eq!(board.runner.agent.script.cursor(), 1);
        assert_eq!(move_runner(&mut board, None, &mut rng), Outcome::Valid);
        assert_eq!(board.runner.pos(), Pos::new(1, 0));
    }

    #[test]
    fn step_delay_skips_ticks_between_moves() {
        let mut rng = rng();
        let mut board = board_from(&["P    "]);
        board.runner.agent.script = script("D");
        board.runner.agent.pacing.step_delay = 1;

        let xs: Vec<usize> = (0..4)
            .map(|_| {
                move_runner(&mut board, None, &mut rng);
                board.runner.pos().x
            })
            .collect();
        assert_eq!(xs, vec![1, 1, 2, 2]);
    }

    #[test]
    fn scripted_wait_holds_position_for_its_repeats() {
        let mut rng = rng();
        let mut board = board_from(&["P   "]);
        board.runner.agent.script =
            Script::new(vec![Command::new(CommandKind::Wait, 3), Command::once(CommandKind::Move(Dir::Right))]);
        for _ in 0..3 {
            assert_eq!(move_runner(&mut board, None, &mut rng), Outcome::Valid);
            assert_eq!(board.runner.pos(), Pos::new(0, 0));
        }
        move_runner(&mut board, None, &mut rng);
        assert_eq!(board.runner.pos(), Pos::new(1, 0));
    }

    #[test]
    fn random_resolves_to_a_cardinal_step() {
        let mut rng = rng();
        let mut board = board_from(&["   ", " P ", "   "]);
        board.runner.agent.script = script("R");
        assert_eq!(move_runner(&mut board, None, &mut rng), Outcome::Valid);
        let pos = board.runner.pos();
        assert_eq!(pos.x.abs_diff(1) + pos.y.abs_diff(1), 1);
    }

    #[test]
    fn chaser_blocked_by_wall_and_other_chaser() {
        let mut rng = rng();
        let mut board = board_from(&["XMM", "P  "]);
        board.chasers[0].agent.script = script("AD");
        assert_eq!(
            move_chaser(&mut board, 0, &mut rng),
            Outcome::Blocked(Obstacle::Wall)
        );
        assert_eq!(
            move_chaser(&mut board, 0, &mut rng),
            Outcome::Blocked(Obstacle::Chaser)
        );
        assert_eq!(board.chasers[0].pos(), Pos::new(1, 0));
    }

    #[test]
    fn chaser_stepping_onto_runner_kills_it_and_takes_the_tile() {
        let mut rng = rng();
        let mut board = board_from(&["MP"]);
        board.chasers[0].agent.script = script("D");
        assert_eq!(move_chaser(&mut board, 0, &mut rng), Outcome::Died);
        assert!(!board.runner.alive);
        assert_eq!(board.chasers[0].pos(), Pos::new(1, 0));
        assert_eq!(board.content(Pos::new(1, 0)), Some(Content::Chaser));
        assert_eq!(board.content(Pos::new(0, 0)), Some(Content::Empty));
    }

    #[test]
    fn charged_slide_reaches_the_edge_when_unobstructed() {
        let mut rng = rng();
        let mut board = board_from(&["M    ", "P    "]);
        board.chasers[0].agent.script = script("CD");
        assert_eq!(move_chaser(&mut board, 0, &mut rng), Outcome::Valid);
        assert!(board.chasers[0].charged);
        assert_eq!(board.chasers[0].pos(), Pos::new(0, 0));

        assert_eq!(move_chaser(&mut board, 0, &mut rng), Outcome::Valid);
        assert_eq!(board.chasers[0].pos(), Pos::new(4, 0));
        assert!(!board.chasers[0].charged);
        assert_eq!(board.content(Pos::new(4, 0)), Some(Content::Chaser));
        assert_eq!(board.content(Pos::new(0, 0)), Some(Content::Empty));
    }

    #[test]
    fn charged_slide_stops_one_short_of_a_wall() {
        let mut rng = rng();
        // Wall is N = 4 tiles to the right of the chaser.
        let mut board = board_from(&["M   X ", "P     "]);
        board.chasers[0].agent.script = script("CD");
        move_chaser(&mut board, 0, &mut rng);
        move_chaser(&mut board, 0, &mut rng);
        assert_eq!(board.chasers[0].pos(), Pos::new(3, 0));
    }

    #[test]
    fn charged_slide_into_adjacent_obstacle_is_blocked_and_uncharged() {
        let mut rng = rng();
        let mut board = board_from(&["MM ", "P  "]);
        board.chasers[0].agent.script = script("CD");
        move_chaser(&mut board, 0, &mut rng);
        assert_eq!(
            move_chaser(&mut board, 0, &mut rng),
            Outcome::Blocked(Obstacle::Chaser)
        );
        assert_eq!(board.chasers[0].pos(), Pos::new(0, 0));
        assert!(!board.chasers[0].charged);
    }

    #[test]
    fn charged_slide_at_edge_is_invalid_and_uncharged() {
        let mut rng = rng();
        let mut board = board_from(&["  M", "P  "]);
        board.chasers[0].agent.script = script("CD");
        move_chaser(&mut board, 0, &mut rng);
        assert_eq!(move_chaser(&mut board, 0, &mut rng), Outcome::Invalid);
        assert_eq!(board.chasers[0].pos(), Pos::new(2, 0));
        assert!(!board.chasers[0].charged);
    }

    #[test]
    fn charged_slide_kills_runner_in_its_path() {
        let mut rng = rng();
        let mut board = board_from(&["M  P "]);
        board.chasers[0].agent.script = script("CD");
        move_chaser(&mut board, 0, &mut rng);
        assert_eq!(move_chaser(&mut board, 0, &mut rng), Outcome::Died);
        assert!(!board.runner.alive);
        assert_eq!(board.chasers[0].pos(), Pos::new(3, 0));
    }

    #[test]
    fn charged_slide_honors_wall_before_runner() {
        let mut rng = rng();
        let mut board = board_from(&["M X P"]);
        board.chasers[0].agent.script = script("CD");
        move_chaser(&mut board, 0, &mut rng);
        assert_eq!(move_chaser(&mut board, 0, &mut rng), Outcome::Valid);
        assert!(board.runner.alive);
        assert_eq!(board.chasers[0].pos(), Pos::new(1, 0));
    }

    #[test]
    fn charge_is_never_left_set_after_a_move() {
        let mut rng = rng();
        let mut board = board_from(&[
            "       ",
            "  X    ",
            "   M   ",
            "       ",
            "P      ",
        ]);
        board.chasers[0].agent.script = script("CRCWCSRDCA");
        for _ in 0..200 {
            let before = board.chasers[0].agent.script.current().map(|c| c.kind);
            move_chaser(&mut board, 0, &mut rng);
            if matches!(before, Some(CommandKind::Move(_)) | Some(CommandKind::Random)) {
                assert!(!board.chasers[0].charged);
            }
            if !board.runner.alive {
                break;
            }
        }
    }
}
