use anyhow::{Context, Result};
use block_blast::autoplay::AutoPlayer;
use block_blast::clock::{Clock, ManualClock};
use block_blast::config::SessionConfig;
use block_blast::hints::Strategy;
use block_blast::session::{Session, SessionEvent};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Seed for the board generator
    #[clap(short, long, default_value_t = 0)]
    seed: u64,

    /// Chain picking strategy: longest-chain, largest-region or first-found
    #[clap(long, default_value = "longest-chain")]
    strategy: Strategy,

    /// Simulated pause between moves, in milliseconds
    #[clap(long, default_value_t = 250)]
    think_ms: u64,

    /// Stop after this many simulated seconds even if the game is not over
    #[clap(long, default_value_t = 600)]
    max_seconds: u64,

    /// Path to a JSON session config
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Print every session event
    #[clap(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => SessionConfig::default(),
    }
    .with_seed(args.seed);

    let clock = ManualClock::new();
    let mut session = Session::new(config).with_clock(clock.clone());

    let trace = clock.clone();
    let verbose = args.verbose;
    session.subscribe(move |event| {
        let at = trace.now().as_secs_f64();
        match event {
            SessionEvent::LevelAdvanced {
                level,
                target_score,
            } => println!("[{:>7.2}s] level {} (target {})", at, level, target_score),
            SessionEvent::GameOver { score, new_best } => {
                println!("[{:>7.2}s] game over with {}{}", at, score, if *new_best { " (new best)" } else { "" })
            }
            SessionEvent::MessageChanged { message: Some(m) } => println!("[{:>7.2}s] {}", at, m),
            other if verbose => println!("[{:>7.2}s] {:?}", at, other),
            _ => {}
        }
    });

    println!(
        "Autoplaying seed {} with {} ({} ms per move)...\n",
        args.seed, args.strategy, args.think_ms
    );
    let player = AutoPlayer::new(args.strategy).with_think_time(Duration::from_millis(args.think_ms));
    let report = player.run(&mut session, &clock, Duration::from_secs(args.max_seconds));

    println!("\nFinal board state:\n{}\n", session.grid());
    println!("Final score: {}", report.final_score);
    println!("Level reached: {}", report.level_reached);
    println!("Matches: {}", report.matches);
    println!("Shuffles: {}", report.shuffles);
    println!("Seconds played: {:.1}", report.seconds_played);
    Ok(())
}
