use std::process::ExitCode;

use clap::Parser;

use chase::{Cli, GameEnd, Settings};

fn main() -> ExitCode {
    let settings = Settings::from_cli(Cli::parse());
    let headless = settings.headless;

    // The terminal is restored before anything is printed here.
    match chase::run(&settings) {
        Ok(summary) => {
            if headless {
                let outcome = match summary.end {
                    GameEnd::Won => "won",
                    GameEnd::Quit => "quit",
                    GameEnd::GameOver => "game over",
                };
                match summary.points {
                    Some(points) => println!("{outcome}: {points} points"),
                    None => println!("{outcome}"),
                }
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
