use anyhow::{Context, Result};
use block_blast::config::SessionConfig;
use block_blast::engine::CellKey;
use block_blast::hints::possible_moves;
use block_blast::progress::JsonFileStore;
use block_blast::session::{GameState, Session};
use clap::Parser;
use std::collections::HashSet;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Seed for reproducible boards
    #[clap(short, long)]
    seed: Option<u64>,

    /// Path to a JSON session config
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Play without reading or writing saved progress
    #[clap(long)]
    no_save: bool,
}

// Deferred steps closer than this are waited for before the next prompt.
const SETTLE_WAIT: Duration = Duration::from_millis(600);

struct Frame {
    last: Instant,
}

impl Frame {
    fn tick(&mut self, session: &mut Session) {
        let now = Instant::now();
        session.tick((now - self.last).as_secs_f64());
        self.last = now;
    }

    /// Lets the click pipeline (match check, gravity, reshuffle) play out.
    fn settle(&mut self, session: &mut Session) {
        self.tick(session);
        while let Some(wait) = session.next_due_in() {
            let shuffling = session.state() == GameState::Shuffling;
            if session.state() == GameState::Paused || (wait > SETTLE_WAIT && !shuffling) {
                break;
            }
            std::thread::sleep(wait);
            self.tick(session);
        }
    }
}

fn print_status(session: &Session, show_hints: bool) {
    println!("---------------------");
    println!(
        "Level: {}, Score: {}/{}, Best: {}, Time: {:.0}s, Combo: x{:.1}",
        session.level(),
        session.score(),
        session.target_score(),
        session.high_score(),
        session.time_left(),
        session.combo_multiplier()
    );

    let highlight: HashSet<CellKey> = if show_hints {
        possible_moves(session.grid(), session.matched_blocks())
            .into_iter()
            .collect()
    } else {
        session.selected_blocks().iter().copied().collect()
    };
    println!("{}", session.grid().to_string_with_highlight(&highlight));

    if let Some(message) = session.message() {
        println!(">> {}", message);
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => SessionConfig::default(),
    };
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    let progress_path = config.resolved_progress_path();
    let mut session = Session::new(config);
    if !args.no_save {
        session = session.with_store(JsonFileStore::new(progress_path));
    }

    println!("Welcome to Block Blast!");
    println!("Link 3 or more adjacent blocks of one color before the clock runs out.");
    session.start_game();

    let mut frame = Frame {
        last: Instant::now(),
    };
    let mut show_hints = false;

    loop {
        frame.settle(&mut session);
        print_status(&session, show_hints);

        if session.state() == GameState::GameOver {
            let progress = session.progress();
            println!();
            println!("---------------------");
            println!("GAME OVER!");
            println!("Final Score: {}", session.score());
            println!("Level Reached: {}", session.level());
            println!(
                "Games Played: {}, Average: {}",
                progress.total_games,
                progress.average_score()
            );
            println!("---------------------");
            print!("Enter 'r' to retry this level, 'n' for a new game, or 'q' to quit: ");
        } else {
            print!("Enter a cell (row col), 'h' hints, 'p' pause, 'u' resume, 's' shuffle, 'r' restart, 'n' new game, 'q' quit: ");
        }
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        frame.tick(&mut session);

        match input.trim() {
            "q" => {
                println!("Thanks for playing!");
                break;
            }
            "h" => show_hints = !show_hints,
            "p" => session.pause_game(),
            "u" => session.resume_game(),
            "s" => session.shuffle_board(),
            "r" => session.restart_game(),
            "n" => session.start_game(),
            other => {
                let parts: Vec<&str> = other.split_whitespace().collect();
                let parsed = match parts.as_slice() {
                    [r, c] => r.parse::<usize>().ok().zip(c.parse::<usize>().ok()),
                    _ => None,
                };
                match parsed {
                    Some((r, c)) if session.grid().contains(r, c) => {
                        session.activate_cell(r, c);
                    }
                    Some(_) => println!(
                        "Invalid coordinates: the board is {} rows by {} columns.",
                        session.grid().rows(),
                        session.grid().cols()
                    ),
                    None => println!("Invalid input format. Use 'row col' or one of the letter commands."),
                }
            }
        }
    }

    Ok(())
}
