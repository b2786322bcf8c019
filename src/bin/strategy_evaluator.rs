use anyhow::Result;
use block_blast::autoplay::{AutoPlayer, PlayReport};
use block_blast::config::SessionConfig;
use block_blast::hints::Strategy;
use clap::Parser;
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Number of seeded games each strategy plays
    #[clap(short, long, default_value_t = 20)]
    boards: u64,

    /// Seed of the first game; game i uses start_seed + i
    #[clap(long, default_value_t = 0)]
    start_seed: u64,

    /// Simulated pause between moves, in milliseconds
    #[clap(long, default_value_t = 250)]
    think_ms: u64,

    /// Simulated time limit of a single game, in seconds
    #[clap(long, default_value_t = 600)]
    max_seconds: u64,
}

fn average(reports: &[PlayReport], field: impl Fn(&PlayReport) -> f64) -> f64 {
    if reports.is_empty() {
        return 0.0;
    }
    reports.iter().map(field).sum::<f64>() / reports.len() as f64
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let max_duration = Duration::from_secs(args.max_seconds);

    println!("Starting strategy evaluation for {} boards...", args.boards);

    let mut results: Vec<(Strategy, Vec<PlayReport>)> =
        Strategy::ALL.iter().map(|s| (*s, Vec::new())).collect();

    for board_idx in 0..args.boards {
        let seed = args.start_seed + board_idx;
        println!("\nEvaluating Board {} (Seed: {})", board_idx, seed);

        for (strategy, reports) in results.iter_mut() {
            let player = AutoPlayer::new(*strategy).with_think_time(Duration::from_millis(args.think_ms));
            let report = player.play(SessionConfig::default().with_seed(seed), max_duration);
            println!(
                "  Strategy: {:<15}, Score: {:<7}, Level: {:<3}, Matches: {}",
                strategy.to_string(),
                report.final_score,
                report.level_reached,
                report.matches
            );
            reports.push(report);
        }
    }

    println!("\n--- Evaluation Complete ---");
    println!("Number of boards evaluated: {}", args.boards);
    println!("\n--- Averages ---");

    let mut averages: Vec<(Strategy, f64, f64)> = results
        .iter()
        .map(|(strategy, reports)| {
            (
                *strategy,
                average(reports, |r| r.final_score as f64),
                average(reports, |r| f64::from(r.level_reached)),
            )
        })
        .collect();

    // Best average score first
    averages.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    for (strategy, score, level) in averages {
        println!(
            "Strategy {:<15}: Average Score = {:.2}, Average Level = {:.2}",
            strategy.to_string(),
            score,
            level
        );
    }
    Ok(())
}
