use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use schema::{CrowdControl, Faction, HitResult, ImmunityRule, ReactionTiming, ResourceCost, ResourceType};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::battle::action_queue::ActionQueue;
use crate::combatant::CombatantId;
use crate::config::BattleConfig;
use crate::registry::CombatantRegistry;

/// How a battle finished.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BattleOutcome {
    AlliesWin,
    EnemiesWin,
    Draw,      // Both sides wiped in the same exchange
    Stalemate, // Survivors remain but nobody can afford an active skill
    TurnLimit,
}

impl BattleOutcome {
    pub fn winner(self) -> Option<Faction> {
        match self {
            BattleOutcome::AlliesWin => Some(Faction::Ally),
            BattleOutcome::EnemiesWin => Some(Faction::Enemy),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillFailureReason {
    InsufficientResources,
    NoTargets,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    CasterDefeated,
    Interrupted,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum BattleEvent {
    // Battle Flow
    BattleStarted {
        allies: usize,
        enemies: usize,
    },
    TurnStarted {
        turn_number: u32,
        combatant: CombatantId,
    },
    TurnPassed {
        combatant: CombatantId,
    },

    // Skill Pipeline
    SkillUsed {
        caster: CombatantId,
        skill: String,
        targets: Vec<CombatantId>,
        reaction: bool,
    },
    SkillFailed {
        caster: CombatantId,
        skill: String,
        reason: SkillFailureReason,
    },
    ResourcesSpent {
        combatant: CombatantId,
        cost: ResourceCost,
    },
    ActionSkipped {
        caster: CombatantId,
        skill: String,
        reason: SkipReason,
    },
    ReactionTriggered {
        owner: CombatantId,
        skill: String,
        timing: ReactionTiming,
        source: Option<CombatantId>,
    },
    EffectChainAborted {
        caster: CombatantId,
        target: CombatantId,
    },

    // Attack Resolution
    DamageNullified {
        attacker: CombatantId,
        target: CombatantId,
    },
    AttackMissed {
        attacker: CombatantId,
        target: CombatantId,
    },
    AttackResolved {
        attacker: CombatantId,
        target: CombatantId,
        result: HitResult,
        damage: i32,
        remaining_hp: i32,
    },

    // State Changes
    ResourceRestored {
        target: CombatantId,
        resource: ResourceType,
        amount: i32,
        new_value: i32,
    },
    CrowdControlApplied {
        target: CombatantId,
        flags: CrowdControl,
        source: CombatantId,
    },
    ImmunityGranted {
        target: CombatantId,
        rule: ImmunityRule,
    },
    CombatantDefeated {
        combatant: CombatantId,
    },

    // Battle End
    BattleEnded {
        outcome: BattleOutcome,
    },
}

impl BattleEvent {
    /// Formats the event into a human-readable line using the roster for names.
    /// Returns None for silent events that should not produce user-visible text.
    pub fn format(&self, registry: &CombatantRegistry) -> Option<String> {
        let name = |id: &CombatantId| registry.name_of(*id).to_string();

        match self {
            BattleEvent::BattleStarted { allies, enemies } => {
                Some(format!("Battle started: {} allies vs {} enemies", allies, enemies))
            }
            BattleEvent::TurnStarted { turn_number, combatant } => {
                Some(format!("=== Turn {}: {} ===", turn_number, name(combatant)))
            }
            BattleEvent::TurnPassed { combatant } => Some(format!("{} waits.", name(combatant))),

            BattleEvent::SkillUsed { caster, skill, reaction, .. } => {
                if *reaction {
                    None // ReactionTriggered already announced it
                } else {
                    Some(format!("{} used {}!", name(caster), skill))
                }
            }
            BattleEvent::SkillFailed { caster, skill, reason } => match reason {
                SkillFailureReason::InsufficientResources => Some(format!(
                    "{} doesn't have the resources for {}.",
                    name(caster),
                    skill
                )),
                SkillFailureReason::NoTargets => Some(format!("{}'s {} has no target.", name(caster), skill)),
            },
            BattleEvent::ResourcesSpent { .. } => None,
            BattleEvent::ActionSkipped { caster, skill, reason } => match reason {
                SkipReason::CasterDefeated => None,
                SkipReason::Interrupted => Some(format!("{}'s {} was interrupted!", name(caster), skill)),
            },
            BattleEvent::ReactionTriggered { owner, skill, .. } => {
                Some(format!("{} reacts with {}!", name(owner), skill))
            }
            BattleEvent::EffectChainAborted { .. } => None,

            BattleEvent::DamageNullified { target, .. } => {
                Some(format!("{} is immune to the attack!", name(target)))
            }
            BattleEvent::AttackMissed { target, .. } => Some(format!("{} dodged the attack!", name(target))),
            BattleEvent::AttackResolved { target, result, damage, .. } => match result {
                HitResult::Critical => Some(format!("A critical hit! {} took {} damage!", name(target), damage)),
                HitResult::Block => Some(format!("{} blocked and took {} damage.", name(target), damage)),
                _ => Some(format!("{} took {} damage!", name(target), damage)),
            },

            BattleEvent::ResourceRestored { target, resource, amount, .. } => {
                let label = resource_label(*resource);
                match amount.cmp(&0) {
                    std::cmp::Ordering::Greater => Some(format!("{} recovered {} {}!", name(target), amount, label)),
                    std::cmp::Ordering::Less => Some(format!("{} lost {} {}.", name(target), -amount, label)),
                    std::cmp::Ordering::Equal => None,
                }
            }
            BattleEvent::CrowdControlApplied { target, flags, .. } => {
                Some(format!("{} is afflicted by {:?}!", name(target), flags))
            }
            BattleEvent::ImmunityGranted { target, .. } => {
                Some(format!("{} is protected by a ward.", name(target)))
            }
            BattleEvent::CombatantDefeated { combatant } => Some(format!("{} was defeated!", name(combatant))),

            BattleEvent::BattleEnded { outcome } => match outcome {
                BattleOutcome::AlliesWin => Some("The allies have won the battle!".to_string()),
                BattleOutcome::EnemiesWin => Some("The enemies have won the battle!".to_string()),
                BattleOutcome::Draw => Some("Both sides fell. The battle ended in a draw!".to_string()),
                BattleOutcome::Stalemate => Some("Nobody can act any more. Stalemate!".to_string()),
                BattleOutcome::TurnLimit => Some("The battle ran out of turns.".to_string()),
            },
        }
    }
}

fn resource_label(resource: ResourceType) -> &'static str {
    if resource == ResourceType::HP {
        "HP"
    } else if resource == ResourceType::SP {
        "SP"
    } else if resource == ResourceType::MP {
        "MP"
    } else {
        "resources"
    }
}

/// Event bus for collecting battle events; doubles as the battle log.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    events: Vec<BattleEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: BattleEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[BattleEvent] {
        &self.events
    }

    /// Print all events in debug format with indentation.
    pub fn print_debug(&self) {
        for event in &self.events {
            println!("  {:?}", event);
        }
    }

    /// Print all events using their formatted text, skipping silent ones.
    pub fn print_formatted(&self, registry: &CombatantRegistry) {
        for line in self.formatted_lines(registry) {
            println!("  {}", line);
        }
    }

    pub fn formatted_lines(&self, registry: &CombatantRegistry) -> Vec<String> {
        self.events.iter().filter_map(|event| event.format(registry)).collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.events)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl std::fmt::Display for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for event in &self.events {
            writeln!(f, "  {:?}", event)?;
        }
        Ok(())
    }
}

/// Source of percentile rolls in `[0, 100)`.
///
/// Tests script exact rolls; a scripted oracle panics when it runs dry so a
/// test that consumes an unexpected roll fails loudly.
#[derive(Debug, Clone)]
pub struct TurnRng {
    source: RollSource,
}

#[derive(Debug, Clone)]
enum RollSource {
    Scripted { outcomes: Vec<u8>, index: usize },
    Seeded(StdRng),
}

impl TurnRng {
    pub fn new_for_test(outcomes: Vec<u8>) -> Self {
        Self {
            source: RollSource::Scripted { outcomes, index: 0 },
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            source: RollSource::Seeded(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn new_random() -> Self {
        Self {
            source: RollSource::Seeded(StdRng::from_os_rng()),
        }
    }

    pub fn next_outcome(&mut self, reason: &str) -> i32 {
        let outcome = match &mut self.source {
            RollSource::Scripted { outcomes, index } => {
                if *index >= outcomes.len() {
                    panic!(
                        "TurnRng exhausted! Tried to get a value for: '{}'. Need more random values.",
                        reason
                    );
                }
                let outcome = outcomes[*index] as i32;
                *index += 1;
                outcome
            }
            RollSource::Seeded(rng) => rng.random_range(0..100),
        };

        tracing::trace!("[RNG] Consumed {} for: {}", outcome, reason);
        outcome
    }

    /// Uniform index into a collection of `len` items. `len` must be non-zero.
    pub fn pick_index(&mut self, len: usize, reason: &str) -> usize {
        if let RollSource::Seeded(rng) = &mut self.source {
            return rng.random_range(0..len);
        }
        (self.next_outcome(reason) as usize) % len
    }
}

/// Everything the resolver and the effect engine may touch while a skill runs.
#[derive(Debug)]
pub struct BattleWorld {
    pub registry: CombatantRegistry,
    pub rng: TurnRng,
    pub events: EventBus,
    pub config: BattleConfig,
    pub queue: ActionQueue,
}

impl BattleWorld {
    pub fn new(config: BattleConfig, rng: TurnRng) -> Self {
        Self {
            registry: CombatantRegistry::new(config.max_units_per_side),
            rng,
            events: EventBus::new(),
            config,
            queue: ActionQueue::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::Combatant;
    use pretty_assertions::assert_eq;
    use schema::StatBlock;

    fn registry_with_two() -> CombatantRegistry {
        let mut registry = CombatantRegistry::new(5);
        registry.register(Combatant::new("Knight", StatBlock::default()), Faction::Ally);
        registry.register(Combatant::new("Goblin", StatBlock::default()), Faction::Enemy);
        registry
    }

    #[test]
    fn test_silent_events_return_none() {
        let registry = registry_with_two();
        let silent_events = vec![
            BattleEvent::ResourcesSpent {
                combatant: CombatantId(0),
                cost: ResourceCost::default(),
            },
            BattleEvent::EffectChainAborted {
                caster: CombatantId(0),
                target: CombatantId(1),
            },
            BattleEvent::ActionSkipped {
                caster: CombatantId(0),
                skill: "Slash".to_string(),
                reason: SkipReason::CasterDefeated,
            },
        ];

        for event in silent_events {
            assert!(event.format(&registry).is_none(), "Event {:?} should be silent", event);
        }
    }

    #[test]
    fn test_event_text_samples() {
        let registry = registry_with_two();

        let turn = BattleEvent::TurnStarted {
            turn_number: 3,
            combatant: CombatantId(1),
        };
        assert_eq!(turn.format(&registry), Some("=== Turn 3: Goblin ===".to_string()));

        let crit = BattleEvent::AttackResolved {
            attacker: CombatantId(0),
            target: CombatantId(1),
            result: HitResult::Critical,
            damage: 42,
            remaining_hp: 0,
        };
        assert_eq!(
            crit.format(&registry),
            Some("A critical hit! Goblin took 42 damage!".to_string())
        );

        let drain = BattleEvent::ResourceRestored {
            target: CombatantId(0),
            resource: ResourceType::MP,
            amount: -5,
            new_value: 10,
        };
        assert_eq!(drain.format(&registry), Some("Knight lost 5 MP.".to_string()));
    }

    #[test]
    fn test_event_bus_exports_json() {
        let mut bus = EventBus::new();
        bus.push(BattleEvent::CombatantDefeated {
            combatant: CombatantId(1),
        });
        bus.push(BattleEvent::BattleEnded {
            outcome: BattleOutcome::AlliesWin,
        });

        let json = bus.to_json().expect("events serialize");
        assert!(json.contains("CombatantDefeated"));
        assert!(json.contains("AlliesWin"));
        assert_eq!(bus.len(), 2);
        assert!(format!("{}", bus).contains("BattleEnded"));
    }

    #[test]
    fn test_scripted_rng_replays_outcomes() {
        let mut rng = TurnRng::new_for_test(vec![7, 99, 3]);
        assert_eq!(rng.next_outcome("first"), 7);
        assert_eq!(rng.next_outcome("second"), 99);
        assert_eq!(rng.pick_index(2, "third"), 1);
    }

    #[test]
    #[should_panic(expected = "TurnRng exhausted")]
    fn test_scripted_rng_panics_when_exhausted() {
        let mut rng = TurnRng::new_for_test(vec![]);
        rng.next_outcome("nothing left");
    }

    #[test]
    fn test_seeded_rng_stays_in_percentile_range() {
        let mut first = TurnRng::seeded(42);
        let mut second = TurnRng::seeded(42);
        for _ in 0..500 {
            let roll = first.next_outcome("range");
            assert!((0..100).contains(&roll));
            assert_eq!(roll, second.next_outcome("range"));
        }
    }
}
