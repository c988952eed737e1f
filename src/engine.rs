//! Engine state management.
//!
//! Holds the planning player, tuning configuration, engine options and the
//! purchase policy's random state, and plays whole turns against a host:
//! purchase, combat move, non-combat move, then placement. Also answers the
//! host's casualty and retreat questions.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{info, warn};

use crate::board::{PlayerId, TerritoryId, UnitId};
use crate::config::PlannerConfig;
use crate::host::{BoardQuery, Host};
use crate::plan::{
    plan_placements, plan_purchase, retreat_decision, select_casualties, EpochReport, PhaseSequencer,
    PlanError, PlanningContext, StrategyPolicy, StrategyVector,
};

/// Summary of one played turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnReport {
    pub player: String,
    pub round: u32,
    pub strategy: StrategyVector,
    /// Units bought, by unit type name.
    pub purchase: BTreeMap<String, u32>,
    pub purchase_accepted: bool,
    pub combat: EpochReport,
    pub noncombat: EpochReport,
    pub placed: usize,
    pub placements_rejected: usize,
}

impl TurnReport {
    /// Host rejections across the whole turn.
    pub fn rejected(&self) -> usize {
        self.combat.rejected
            + self.noncombat.rejected
            + self.placements_rejected
            + usize::from(!self.purchase_accepted && !self.purchase.is_empty())
    }
}

/// Holds the mutable state of the engine between turns.
pub struct Engine {
    pub player: PlayerId,
    pub config: PlannerConfig,
    pub options: HashMap<String, String>,
    policy: StrategyPolicy,
    sequencer: PhaseSequencer,
}

impl Engine {
    /// Creates an engine for `player`, seeded from the configuration.
    pub fn new(player: PlayerId, config: PlannerConfig) -> Self {
        let policy = StrategyPolicy::new(config.seed, config.strategy_weights);
        Engine {
            player,
            config,
            options: HashMap::new(),
            policy,
            sequencer: PhaseSequencer::new(),
        }
    }

    /// Sets an engine option. `Seed` reseeds the purchase policy.
    pub fn set_option(&mut self, name: String, value: Option<String>) {
        let value = value.unwrap_or_default();
        if name == "Seed" {
            let seed = value.parse::<u64>().ok();
            self.policy = StrategyPolicy::new(seed.or(self.config.seed), self.config.strategy_weights);
        }
        self.options.insert(name, value);
    }

    fn context<B: BoardQuery>(&self, board: &B) -> PlanningContext {
        PlanningContext::build(board, self.player, &self.config)
    }

    /// Plays one full turn for the engine's player.
    ///
    /// Host rejections are counted in the report and never end the turn;
    /// an error means the planner broke one of its own invariants.
    pub fn play_turn<H: Host>(&mut self, host: &mut H) -> Result<TurnReport, PlanError> {
        let player = self.player;
        let mut ctx = self.context(&*host);

        let (strategy, bought) = plan_purchase(&*host, &ctx, &mut self.policy)?;
        let purchase_accepted = if bought.is_empty() {
            true
        } else {
            match host.submit_purchase(player, &bought) {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "purchase rejected");
                    false
                }
            }
        };
        let purchase: BTreeMap<String, u32> = bought
            .iter()
            .map(|(&ty, &qty)| (host.unit_type(ty).name.clone(), qty))
            .collect();

        let [combat, noncombat] = self.sequencer.run_turn(host, &mut ctx)?;

        let mut placed = 0;
        let mut placements_rejected = 0;
        if purchase_accepted {
            ctx.refresh(&*host);
            for placement in plan_placements(&*host, &ctx, &bought) {
                match host.submit_placement(player, &placement) {
                    Ok(()) => placed += placement.units.len(),
                    Err(e) => {
                        warn!(territory = placement.territory.0, error = %e, "placement rejected");
                        placements_rejected += 1;
                    }
                }
            }
        }

        let report = TurnReport {
            player: host.player(player).name.clone(),
            round: host.round(),
            strategy,
            purchase,
            purchase_accepted,
            combat,
            noncombat,
            placed,
            placements_rejected,
        };
        info!(
            player = %report.player,
            ?strategy,
            moves = report.combat.submitted + report.noncombat.submitted,
            placed,
            rejected = report.rejected(),
            "turn played"
        );
        Ok(report)
    }

    /// Picks which of `candidates` to remove for `count` hits.
    pub fn select_casualties<B: BoardQuery>(&self, board: &B, candidates: &[UnitId], count: usize) -> Vec<UnitId> {
        select_casualties(board, &self.context(board), candidates, count)
    }

    /// Returns where to retreat from `battle`, or `None` to fight on.
    pub fn retreat_decision<B: BoardQuery>(
        &self,
        board: &B,
        battle: TerritoryId,
        options: &[TerritoryId],
    ) -> Option<TerritoryId> {
        retreat_decision(board, &self.context(board), battle, options)
    }
}
