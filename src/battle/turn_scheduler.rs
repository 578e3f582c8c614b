use std::collections::VecDeque;

use schema::Faction;

use crate::battle::action_queue::BattleAction;
use crate::battle::ai::{TurnDecision, TurnDriver};
use crate::battle::state::{BattleEvent, BattleOutcome, BattleWorld};
use crate::combatant::CombatantId;
use crate::registry::CombatantRegistry;

/// What happened when the scheduler tried to hand out the next turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStart {
    BattleOver(BattleOutcome),
    /// The actor's driver queued a skill-use.
    Queued(CombatantId),
    Passed(CombatantId),
    AwaitingInput(CombatantId),
    /// Survivors exist but nobody could be scheduled.
    Stalled,
}

/// Decides the outcome if the battle is over.
///
/// A faction with no living member counts as wiped, including one that never
/// registered anybody.
pub fn battle_outcome(registry: &CombatantRegistry) -> Option<BattleOutcome> {
    let allies_wiped = registry.survivors(Faction::Ally).next().is_none();
    let enemies_wiped = registry.survivors(Faction::Enemy).next().is_none();

    match (allies_wiped, enemies_wiped) {
        (true, true) => Some(BattleOutcome::Draw),
        (false, true) => Some(BattleOutcome::AlliesWin),
        (true, false) => Some(BattleOutcome::EnemiesWin),
        (false, false) => {
            let anyone_can_act = registry
                .iter()
                .filter(|c| c.is_alive())
                .any(|c| c.has_enough_resource_for_any_active_skill());
            (!anyone_can_act).then_some(BattleOutcome::Stalemate)
        }
    }
}

pub fn check_battle_end_condition(registry: &CombatantRegistry) -> bool {
    battle_outcome(registry).is_some()
}

/// Speed-ordered round of turns.
#[derive(Debug, Default)]
pub struct TurnScheduler {
    turn_queue: VecDeque<CombatantId>,
    current: Option<CombatantId>,
    turn_number: u32,
}

impl TurnScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the round from every living combatant: fastest first, ties
    /// broken by the lower grid index.
    pub fn initialize_queue(&mut self, registry: &CombatantRegistry) {
        let mut living: Vec<_> = registry.iter().filter(|c| c.is_alive()).collect();
        living.sort_by(|a, b| {
            b.current_stats()
                .speed
                .cmp(&a.current_stats().speed)
                .then(a.grid_index().cmp(&b.grid_index()))
        });
        self.turn_queue = living.into_iter().map(|c| c.id()).collect();
        tracing::debug!("New round: {:?}", self.turn_queue);
    }

    /// Hands the turn to the next living combatant and asks `driver` what it
    /// does with it.
    pub fn start_next_turn(&mut self, world: &mut BattleWorld, driver: &mut dyn TurnDriver) -> TurnStart {
        if let Some(outcome) = battle_outcome(&world.registry) {
            self.current = None;
            return TurnStart::BattleOver(outcome);
        }

        let actor = loop {
            if self.turn_queue.is_empty() {
                self.initialize_queue(&world.registry);
                if self.turn_queue.is_empty() {
                    tracing::warn!("Turn queue is empty while survivors remain; battle stalled");
                    self.current = None;
                    return TurnStart::Stalled;
                }
            }

            let Some(candidate) = self.turn_queue.pop_front() else {
                continue;
            };
            match world.registry.get_mut(candidate) {
                Some(combatant) if combatant.is_alive() => {
                    combatant.set_interrupt_requested(false);
                    break candidate;
                }
                _ => tracing::debug!("Skipping turn of {}", candidate),
            }
        };

        self.current = Some(actor);
        self.turn_number += 1;
        tracing::info!(
            "Turn {}: {}",
            self.turn_number,
            world.registry.name_of(actor)
        );
        world.events.push(BattleEvent::TurnStarted {
            turn_number: self.turn_number,
            combatant: actor,
        });

        match driver.decide(actor, world) {
            TurnDecision::Use(request) => {
                world
                    .queue
                    .push_back(BattleAction::new(actor, request.skill, request.targets));
                TurnStart::Queued(actor)
            }
            TurnDecision::Pass => {
                world.events.push(BattleEvent::TurnPassed { combatant: actor });
                TurnStart::Passed(actor)
            }
            TurnDecision::AwaitInput => TurnStart::AwaitingInput(actor),
        }
    }

    /// Closes the current turn and opens the next one.
    pub fn end_turn(&mut self, world: &mut BattleWorld, driver: &mut dyn TurnDriver) -> TurnStart {
        self.start_next_turn(world, driver)
    }

    /// The combatant whose turn it is.
    pub fn current(&self) -> Option<CombatantId> {
        self.current
    }

    pub fn turn_number(&self) -> u32 {
        self.turn_number
    }

    /// Combatants still waiting for a turn this round, in order.
    pub fn pending(&self) -> impl Iterator<Item = CombatantId> + '_ {
        self.turn_queue.iter().copied()
    }
}
