//! Generalship -- plays turns of a scenario for one player.
//!
//! Usage:
//!   generalship --scenario FILE [OPTIONS]
//!
//! Options:
//!   --scenario FILE  Scenario JSON to load (required)
//!   --player NAME    Player to plan for (default: first player)
//!   --turns N        Number of turns to play (default: 1)
//!   --seed N         Seed for the purchase policy (default: entropy)
//!   --config FILE    Planner configuration JSON
//!   --quiet          Suppress the summary on stderr
//!
//! Each turn prints one JSON line on stdout. Other players do not move;
//! between turns the host restores movement and collects income.

use std::env;
use std::io::{self, BufWriter, Write};
use std::process;
use std::str::FromStr;

use tracing_subscriber::EnvFilter;

use generalship::board::PlayerId;
use generalship::config::PlannerConfig;
use generalship::engine::Engine;
use generalship::host::BoardQuery;
use generalship::scenario::Scenario;

fn main() {
    let args: Vec<String> = env::args().collect();
    let mut scenario_path: Option<String> = None;
    let mut player_name: Option<String> = None;
    let mut turns: u32 = 1;
    let mut seed: Option<u64> = None;
    let mut config_path: Option<String> = None;
    let mut quiet = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--scenario" => {
                i += 1;
                scenario_path = Some(value(&args, i, "--scenario"));
            }
            "--player" => {
                i += 1;
                player_name = Some(value(&args, i, "--player"));
            }
            "--turns" => {
                i += 1;
                turns = parsed(&args, i, "--turns");
            }
            "--seed" => {
                i += 1;
                seed = Some(parsed(&args, i, "--seed"));
            }
            "--config" => {
                i += 1;
                config_path = Some(value(&args, i, "--config"));
            }
            "--quiet" => {
                quiet = true;
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    let default_level = if quiet { "error" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(io::stderr)
        .init();

    let Some(scenario_path) = scenario_path else {
        eprintln!("--scenario is required");
        print_usage();
        process::exit(1);
    };

    let mut config = match config_path {
        Some(path) => PlannerConfig::load(&path).unwrap_or_else(|e| fail(&format!("{}: {}", path, e))),
        None => PlannerConfig::default(),
    };
    if seed.is_some() {
        config.seed = seed;
    }

    let mut board = Scenario::load(&scenario_path)
        .and_then(|s| s.build())
        .unwrap_or_else(|e| fail(&format!("{}: {}", scenario_path, e)));

    let player = match &player_name {
        Some(name) => board
            .state()
            .find_player(name)
            .unwrap_or_else(|| fail(&format!("unknown player: {}", name))),
        None => PlayerId(0),
    };
    if board.players().get(player.index()).is_none() {
        fail("scenario has no players");
    }

    if !quiet {
        eprintln!(
            "Playing {} turn(s) as {} on {} territories",
            turns,
            board.player(player).name,
            board.map().len()
        );
    }

    let mut engine = Engine::new(player, config);
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut rejected = 0;
    for _ in 0..turns {
        let report = engine
            .play_turn(&mut board)
            .unwrap_or_else(|e| fail(&format!("planner error: {}", e)));
        rejected += report.rejected();
        let line = serde_json::to_string(&report).unwrap_or_else(|e| fail(&format!("cannot encode report: {}", e)));
        if writeln!(out, "{}", line).is_err() {
            fail("failed to write output");
        }
        board.end_turn(player);
    }
    if out.flush().is_err() {
        fail("failed to write output");
    }

    if !quiet {
        let owned = board.territories_of(player).len();
        eprintln!("Done: {} territories held, {} commands rejected", owned, rejected);
    }
}

fn value(args: &[String], i: usize, flag: &str) -> String {
    match args.get(i) {
        Some(v) => v.clone(),
        None => fail(&format!("missing value for {}", flag)),
    }
}

fn parsed<T: FromStr>(args: &[String], i: usize, flag: &str) -> T {
    let raw = value(args, i, flag);
    raw.parse()
        .unwrap_or_else(|_| fail(&format!("invalid {} value: {}", flag, raw)))
}

fn fail(message: &str) -> ! {
    eprintln!("{}", message);
    process::exit(1);
}

fn print_usage() {
    eprintln!("Usage: generalship --scenario FILE [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario FILE  Scenario JSON to load (required)");
    eprintln!("  --player NAME    Player to plan for (default: first player)");
    eprintln!("  --turns N        Number of turns to play (default: 1)");
    eprintln!("  --seed N         Seed for the purchase policy (default: entropy)");
    eprintln!("  --config FILE    Planner configuration JSON");
    eprintln!("  --quiet          Suppress the summary on stderr");
    eprintln!("  --help           Show this help");
}
