//! Integration tests for the generalship planner.
//!
//! Plays whole turns of the demo scenario through the library against the
//! in-memory host, and runs the binary end to end.

use std::process::{Command, Stdio};

use generalship::board::{PlayerId, UnitId};
use generalship::config::PlannerConfig;
use generalship::engine::{Engine, TurnReport};
use generalship::host::{BoardQuery, Host, MemoryBoard};
use generalship::plan::{CommitmentLedger, Epoch, Phase, PhaseSequencer, PlanningContext};
use generalship::scenario::Scenario;

const RED: PlayerId = PlayerId(0);
const BLUE: PlayerId = PlayerId(1);

fn scenario_path() -> String {
    format!("{}/demos/two_fronts.json", env!("CARGO_MANIFEST_DIR"))
}

fn demo() -> MemoryBoard {
    Scenario::load(scenario_path()).unwrap().build().unwrap()
}

fn seeded(seed: u64) -> PlannerConfig {
    PlannerConfig {
        seed: Some(seed),
        ..PlannerConfig::default()
    }
}

fn play(board: &mut MemoryBoard, engine: &mut Engine, turns: u32) -> Vec<TurnReport> {
    let mut reports = Vec::new();
    for _ in 0..turns {
        reports.push(engine.play_turn(board).unwrap());
        board.end_turn(engine.player);
    }
    reports
}

fn unit_count(board: &MemoryBoard, player: PlayerId) -> usize {
    board
        .map()
        .territories()
        .iter()
        .map(|t| board.owned_units(t.id, player).len())
        .sum()
}

#[test]
fn demo_scenario_loads() {
    let board = demo();
    assert_eq!(board.players().len(), 2);
    assert_eq!(board.map().len(), 11);
    assert_eq!(board.budget(RED), 30);
    assert_eq!(unit_count(&board, RED), 14);
    assert_eq!(unit_count(&board, BLUE), 12);
}

#[test]
fn first_turn_moves_and_spends() {
    let mut board = demo();
    let mut engine = Engine::new(RED, seeded(11));
    let report = engine.play_turn(&mut board).unwrap();

    assert_eq!(report.player, "Red");
    assert!(report.combat.submitted + report.noncombat.submitted > 0);
    assert!(report.purchase_accepted);
    let cost: u32 = report
        .purchase
        .iter()
        .map(|(name, &qty)| {
            let kind = board.unit_types().iter().find(|k| &k.name == name).unwrap();
            kind.cost * qty
        })
        .sum();
    assert!(cost <= 30);
    assert_eq!(board.budget(RED), 30 - cost);
    assert!(report.placed <= 10, "placed {} at a factory producing 10", report.placed);
}

#[test]
fn capital_is_never_abandoned() {
    let mut board = demo();
    let mut engine = Engine::new(RED, seeded(5));
    let capital = board.player(RED).capital.unwrap();
    for round in 1..=3 {
        engine.play_turn(&mut board).unwrap();
        assert!(!board.owned_units(capital, RED).is_empty(), "empty capital in round {round}");
        board.end_turn(RED);
    }
    assert_eq!(board.territory(capital).owner, Some(RED));
}

#[test]
fn same_seed_plays_the_same_game() {
    let run = |seed| {
        let mut board = demo();
        let mut engine = Engine::new(RED, seeded(seed));
        let reports = play(&mut board, &mut engine, 3);
        serde_json::to_string(&reports).unwrap()
    };
    assert_eq!(run(42), run(42));
}

#[test]
fn both_sides_can_take_turns() {
    let mut board = demo();
    let mut red = Engine::new(RED, seeded(1));
    let mut blue = Engine::new(BLUE, seeded(2));
    for _ in 0..3 {
        red.play_turn(&mut board).unwrap();
        board.end_turn(RED);
        blue.play_turn(&mut board).unwrap();
        board.end_turn(BLUE);
    }
    assert!(unit_count(&board, RED) > 0);
    assert!(unit_count(&board, BLUE) > 0);
}

#[test]
fn every_phase_commits_each_unit_at_most_once() {
    let mut board = demo();
    let config = PlannerConfig::default();
    let mut ctx = PlanningContext::build(&board, RED, &config);
    for epoch in [Epoch::Combat, Epoch::NonCombat] {
        ctx.refresh(&board);
        board.begin_epoch(RED, epoch);
        let mut ledger = CommitmentLedger::new(epoch);
        let mut ordered: Vec<UnitId> = Vec::new();
        for &phase in Phase::sequence(epoch) {
            let orders = phase.plan(&board, &mut ctx, &mut ledger).unwrap();
            for order in &orders {
                for &u in &order.units {
                    assert!(!ordered.contains(&u), "{u:?} ordered twice in {phase}");
                    ordered.push(u);
                }
                let _ = board.submit_move(RED, order);
            }
        }
        for u in &ordered {
            assert!(ledger.is_committed(*u));
        }
    }
}

#[test]
fn sequencer_reports_match_phase_lists() {
    let mut board = demo();
    let mut ctx = PlanningContext::build(&board, RED, &PlannerConfig::default());
    let mut seq = PhaseSequencer::new();
    let [combat, noncombat] = seq.run_turn(&mut board, &mut ctx).unwrap();
    let names: Vec<&str> = combat.phases.iter().map(|p| p.phase).collect();
    assert_eq!(
        names,
        Phase::sequence(Epoch::Combat).iter().map(|p| p.name()).collect::<Vec<_>>()
    );
    assert_eq!(noncombat.phases.len(), 9);
    assert_eq!(
        combat.submitted,
        combat.phases.iter().map(|p| p.submitted).sum::<usize>()
    );
}

#[test]
fn binary_prints_one_line_per_turn() {
    let exe = env!("CARGO_BIN_EXE_generalship");
    let path = scenario_path();
    let output = Command::new(exe)
        .args(["--scenario", path.as_str(), "--turns", "3", "--seed", "9", "--quiet"])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .expect("failed to start generalship");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    for line in lines {
        let report: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(report["player"], "Red");
        assert!(report["combat"]["phases"].is_array());
        assert!(report["noncombat"]["submitted"].is_u64());
    }
}

#[test]
fn binary_plays_named_player() {
    let exe = env!("CARGO_BIN_EXE_generalship");
    let path = scenario_path();
    let output = Command::new(exe)
        .args(["--scenario", path.as_str(), "--player", "Blue", "--seed", "3", "--quiet"])
        .output()
        .expect("failed to start generalship");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("\"player\":\"Blue\""));
}

#[test]
fn binary_rejects_missing_scenario() {
    let exe = env!("CARGO_BIN_EXE_generalship");
    let output = Command::new(exe)
        .args(["--scenario", "/nonexistent/scenario.json", "--quiet"])
        .output()
        .expect("failed to start generalship");
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}
