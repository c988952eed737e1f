//! Property-based tests for planner invariants.
//!
//! Covers evaluator monotonicity, the purchase budget and slot limits,
//! at-most-once commitment, and the recruiter's route and threshold
//! guarantees.

use std::collections::HashSet;

use proptest::prelude::*;

use generalship::board::{
    BoardState, Domain, GameMap, Player, PlayerId, RuleSet, Territory, TerritoryId, Unit, UnitId, UnitType,
    UnitTypeId, UnitView,
};
use generalship::config::PlannerConfig;
use generalship::eval::StrengthEvaluator;
use generalship::host::BoardQuery;
use generalship::plan::{
    CommitmentLedger, Epoch, ForceRecruiter, PlanError, PlanningContext, PurchaseAllocator, PurchaseOption,
    RecruitKind, Recruitment, StrategyVector, StrengthTarget,
};

const RED: PlayerId = PlayerId(0);
const BLUE: PlayerId = PlayerId(1);

fn arb_unit_type() -> impl Strategy<Value = UnitType> {
    (
        0u8..3,
        0u32..6,
        0u32..6,
        1u32..3,
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        0u32..4,
    )
        .prop_map(|(domain, attack, defense, hp, artillery, supportable, sub, capacity)| UnitType {
            domain: match domain {
                0 => Domain::Land,
                1 => Domain::Sea,
                _ => Domain::Air,
            },
            attack,
            defense,
            hit_points: hp,
            is_artillery: artillery,
            artillery_supportable: supportable,
            is_submarine: sub && domain == 1,
            is_destroyer: !sub && domain == 1 && attack == 2,
            transport_capacity: if domain == 1 { capacity } else { 0 },
            ..UnitType::default()
        })
}

fn unit(id: u32) -> Unit {
    Unit {
        id: UnitId(id),
        unit_type: UnitTypeId(0),
        owner: RED,
        territory: TerritoryId(0),
        movement_left: 1,
        hits: 0,
        transported_by: None,
        moved_this_turn: false,
    }
}

/// Options with distinct unit type ids.
fn arb_options(
    cost: impl Strategy<Value = u32>,
    len: std::ops::Range<usize>,
) -> impl Strategy<Value = Vec<PurchaseOption>> {
    prop::collection::vec(arb_option(cost), len).prop_map(|mut options| {
        for (i, option) in options.iter_mut().enumerate() {
            option.unit_type = UnitTypeId(i as u16);
        }
        options
    })
}

fn arb_option(cost: impl Strategy<Value = u32>) -> impl Strategy<Value = PurchaseOption> {
    (cost, 0u32..8, 0u32..8, 0u32..5).prop_map(|(cost, attack, defense, movement)| {
        PurchaseOption {
            unit_type: UnitTypeId(0),
            cost,
            attack: attack as f32,
            defense: defense as f32,
            movement,
            is_sea: false,
        }
    })
}

fn t(i: u16) -> TerritoryId {
    TerritoryId(i)
}

/// Blue objective `0` touching Red land `1`, `2` and `3`, with `4` behind
/// `1`.
fn recruit_board(units: &[(u8, u16)]) -> BoardState {
    let mut terrs = Vec::new();
    let mut obj = Territory::land(t(0), "Objective");
    obj.owner = Some(BLUE);
    terrs.push(obj);
    for i in 1..5u16 {
        let mut terr = Territory::land(t(i), format!("R{i}"));
        terr.owner = Some(RED);
        terrs.push(terr);
    }
    let mut map = GameMap::new(terrs);
    map.connect(t(0), t(1));
    map.connect(t(0), t(2));
    map.connect(t(0), t(3));
    map.connect(t(1), t(4));
    let players = vec![
        Player { id: RED, name: "Red".into(), team: 0, capital: Some(t(4)) },
        Player { id: BLUE, name: "Blue".into(), team: 1, capital: None },
    ];
    let types = vec![
        UnitType { id: UnitTypeId(0), name: "infantry".into(), attack: 1, defense: 2, is_infantry: true, artillery_supportable: true, ..UnitType::default() },
        UnitType { id: UnitTypeId(1), name: "artillery".into(), attack: 2, defense: 2, is_artillery: true, ..UnitType::default() },
        UnitType { id: UnitTypeId(2), name: "tank".into(), attack: 3, defense: 3, movement: 2, can_blitz: true, ..UnitType::default() },
        UnitType { id: UnitTypeId(3), name: "fighter".into(), domain: Domain::Air, attack: 3, defense: 4, movement: 4, ..UnitType::default() },
    ];
    let mut state = BoardState::new(map, players, types, RuleSet::default());
    for &(ty, at) in units {
        state.add_unit(UnitTypeId(ty as u16), RED, t(at));
    }
    state
}

fn check_mixes(budget: i64, options: &[PurchaseOption], slots: u32) -> Result<(), TestCaseError> {
    let mixes = PurchaseAllocator::allocate(budget, options, slots).unwrap();
    for vector in StrategyVector::ALL {
        let mix = mixes.get(vector);
        let units: u32 = mix.values().sum();
        let cost: i128 = mix
            .iter()
            .map(|(ty, &qty)| {
                let option = options.iter().find(|o| o.unit_type == *ty).unwrap();
                i128::from(option.cost) * i128::from(qty)
            })
            .sum();
        prop_assert!(cost <= i128::from(budget), "{:?} spends {} of {}", vector, cost, budget);
        prop_assert!(units <= slots, "{:?} buys {} for {} slots", vector, units, slots);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Adding a unit to a stack never lowers its strength.
    #[test]
    fn prop_evaluate_is_monotone(
        kinds in prop::collection::vec(arb_unit_type(), 1..8),
        attacking in any::<bool>(),
        sea in any::<bool>(),
        can_die in any::<bool>(),
        subs_need_destroyer in any::<bool>(),
    ) {
        let rules = RuleSet { submarines_need_destroyer: subs_need_destroyer, ..RuleSet::default() };
        let eval = StrengthEvaluator::new(&PlannerConfig::default(), &rules);
        let units: Vec<Unit> = (0..kinds.len() as u32).map(unit).collect();
        let views: Vec<UnitView<'_>> = units.iter().zip(&kinds).map(|(unit, kind)| UnitView { unit, kind }).collect();
        for n in 1..=views.len() {
            let smaller = eval.evaluate(&views[..n - 1], attacking, sea, can_die);
            let larger = eval.evaluate(&views[..n], attacking, sea, can_die);
            prop_assert!(smaller >= 0.0);
            prop_assert!(larger + 1e-4 >= smaller, "{} < {} after adding {:?}", larger, smaller, kinds[n - 1]);
        }
    }

    /// No mix costs more than the budget or holds more units than slots.
    #[test]
    fn prop_purchase_within_budget_and_slots(
        options in arb_options(1u32..25, 0..6),
        budget in 0i64..200,
        slots in 0u32..15,
    ) {
        check_mixes(budget, &options, slots)?;
    }

    /// The same holds when budgets and unit costs approach the integer limits.
    #[test]
    fn prop_purchase_within_huge_budget(
        options in arb_options(u32::MAX / 2..=u32::MAX, 1..6),
        budget in prop_oneof![0i64..=i64::from(u32::MAX) * 3, Just(i64::MAX)],
        slots in 0u32..15,
    ) {
        check_mixes(budget, &options, slots)?;
    }

    /// A negative budget is always reported, never silently clamped.
    #[test]
    fn prop_negative_budget_is_rejected(budget in i64::MIN..0) {
        prop_assert_eq!(
            PurchaseAllocator::allocate(budget, &[], 3),
            Err(PlanError::NegativeBudget(budget))
        );
    }

    /// Each unit enters the ledger at most once per epoch.
    #[test]
    fn prop_ledger_commits_once(ids in prop::collection::vec(0u32..20, 0..40)) {
        let mut ledger = CommitmentLedger::new(Epoch::Combat);
        let mut seen = HashSet::new();
        for id in ids {
            let fresh = seen.insert(id);
            prop_assert_eq!(ledger.commit(UnitId(id)).is_ok(), fresh);
        }
        prop_assert_eq!(ledger.len(), seen.len());
    }

    /// Recruitment never reuses committed units, never sends a unit farther
    /// than it can move, and never claims more than the pool could give.
    #[test]
    fn prop_recruit_respects_ledger_and_movement(
        placed in prop::collection::vec((0u8..4, 1u16..5), 0..12),
        taken in prop::collection::vec(any::<bool>(), 12),
        need in -5.0f32..30.0,
        kind in prop::sample::select(vec![RecruitKind::Blitz, RecruitKind::Land, RecruitKind::Air]),
    ) {
        let board = recruit_board(&placed);
        let ctx = PlanningContext::build(&board, RED, &PlannerConfig::default());
        let mut ledger = CommitmentLedger::new(Epoch::Combat);
        let mut precommitted = HashSet::new();
        for (i, &skip) in taken.iter().enumerate().take(placed.len()) {
            if skip {
                ledger.commit(UnitId(i as u32)).unwrap();
                precommitted.insert(UnitId(i as u32));
            }
        }
        let before = ledger.len();

        let recruiter = ForceRecruiter::new(&board, &ctx);
        let got = recruiter.recruit(&StrengthTarget::new(t(0), need), kind, &mut ledger).unwrap();

        if need <= 0.0 {
            prop_assert_eq!(got, Recruitment::default());
            prop_assert_eq!(ledger.len(), before);
            return Ok(());
        }

        let mut used = HashSet::new();
        for order in &got.orders {
            let least = order
                .units
                .iter()
                .filter_map(|&u| board.view(u))
                .map(|v| v.unit.movement_left)
                .min()
                .unwrap_or(0);
            prop_assert!(order.route.len() <= least, "route {} for movement {}", order.route.len(), least);
            for &u in &order.units {
                prop_assert!(used.insert(u), "{:?} ordered twice", u);
                prop_assert!(!precommitted.contains(&u));
                prop_assert!(ledger.is_committed(u));
            }
        }

        let pool: Vec<UnitView<'_>> = (1..5u16).flat_map(|i| board.owned_units(t(i), RED)).collect();
        let ceiling = ctx.evaluator.evaluate(&pool, true, false, true);
        prop_assert!(got.achieved <= ceiling + 1e-4, "achieved {} above pool {}", got.achieved, ceiling);
    }
}
