use std::sync::Arc;

use schema::{Faction, SkillDefinition};

use crate::battle::action_queue::BattleAction;
use crate::battle::ai::{FirstActiveSkillDriver, TurnDriver};
use crate::battle::orchestrator::ActionOrchestrator;
use crate::battle::presentation::{AnimationSignals, NullPresentation, Presentation, SignalSender};
use crate::battle::skill_effects::EffectRegistry;
use crate::battle::state::{BattleEvent, BattleOutcome, BattleWorld, EventBus, TurnRng};
use crate::battle::turn_scheduler::{battle_outcome, TurnScheduler, TurnStart};
use crate::combatant::{Combatant, CombatantId};
use crate::config::BattleConfig;
use crate::registry::CombatantRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Setup,
    Running,
    AwaitingInput(CombatantId),
    Finished(BattleOutcome),
}

/// Where `BattleSession::run` stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    NotStarted,
    AwaitingInput(CombatantId),
    Finished(BattleOutcome),
    Stalled,
}

/// One battle from roster setup to outcome.
pub struct BattleSession<P: Presentation = NullPresentation> {
    world: BattleWorld,
    scheduler: TurnScheduler,
    orchestrator: ActionOrchestrator,
    driver: Box<dyn TurnDriver>,
    presentation: P,
    signals: AnimationSignals,
    phase: Phase,
    /// Consecutive automatic turns that changed nothing.
    idle_turns: usize,
}

impl BattleSession<NullPresentation> {
    pub fn new(config: BattleConfig, rng: TurnRng) -> Self {
        Self::with_presentation(config, rng, NullPresentation)
    }
}

impl<P: Presentation> BattleSession<P> {
    pub fn with_presentation(config: BattleConfig, rng: TurnRng, presentation: P) -> Self {
        Self {
            world: BattleWorld::new(config, rng),
            scheduler: TurnScheduler::new(),
            orchestrator: ActionOrchestrator::new(EffectRegistry::standard()),
            driver: Box::new(FirstActiveSkillDriver),
            presentation,
            signals: AnimationSignals::new(),
            phase: Phase::Setup,
            idle_turns: 0,
        }
    }

    pub fn with_driver(mut self, driver: impl TurnDriver + 'static) -> Self {
        self.driver = Box::new(driver);
        self
    }

    pub fn with_effects(mut self, effects: EffectRegistry) -> Self {
        self.orchestrator = ActionOrchestrator::new(effects);
        self
    }

    /// Adds a combatant to the roster. Returns `None` when the roster refused it.
    pub fn register_character(&mut self, combatant: Combatant, faction: Faction) -> Option<CombatantId> {
        if self.phase != Phase::Setup {
            tracing::warn!("Registering {} after the battle started", combatant.name());
        }
        self.world.registry.register(combatant, faction)
    }

    pub fn start_battle(&mut self) {
        if self.phase != Phase::Setup {
            tracing::warn!("start_battle called twice; ignored");
            return;
        }

        let allies = self.world.registry.by_faction(Faction::Ally).len();
        let enemies = self.world.registry.by_faction(Faction::Enemy).len();
        tracing::info!("Battle started: {} allies vs {} enemies", allies, enemies);
        self.world.events.push(BattleEvent::BattleStarted { allies, enemies });
        self.scheduler.initialize_queue(&self.world.registry);
        self.phase = Phase::Running;
    }

    /// Queues `skill` for the combatant that is waiting on outside input.
    ///
    /// Returns false, without side effects, unless `caster` holds the turn and
    /// nothing is resolving.
    pub fn request_use_skill(
        &mut self,
        caster: CombatantId,
        skill: Arc<SkillDefinition>,
        targets: Vec<CombatantId>,
    ) -> bool {
        if self.phase != Phase::AwaitingInput(caster) || !self.world.queue.is_empty() {
            tracing::debug!("Rejected {} from {}: not their turn", skill.name, caster);
            return false;
        }

        self.world.queue.push_back(BattleAction::new(caster, skill, targets));
        self.phase = Phase::Running;
        true
    }

    /// Gives up the awaited turn.
    pub fn pass_turn(&mut self, caster: CombatantId) -> bool {
        if self.phase != Phase::AwaitingInput(caster) {
            return false;
        }
        self.world.events.push(BattleEvent::TurnPassed { combatant: caster });
        self.phase = Phase::Running;
        true
    }

    /// Handle for the presentation layer to deliver animation keys.
    pub fn signal_sender(&self) -> SignalSender {
        self.signals.sender()
    }

    /// Drives the battle until it ends or waits for outside input.
    pub async fn run(&mut self) -> SessionStatus {
        loop {
            match self.phase {
                Phase::Setup => return SessionStatus::NotStarted,
                Phase::Finished(outcome) => return SessionStatus::Finished(outcome),
                Phase::AwaitingInput(actor) => return SessionStatus::AwaitingInput(actor),
                Phase::Running => {}
            }

            let logged = self.world.events.len();
            self.orchestrator
                .drain(&mut self.world, &mut self.presentation, &mut self.signals)
                .await;
            let acted = self.world.events.events()[logged..].iter().any(|event| {
                !matches!(
                    event,
                    BattleEvent::SkillFailed { .. } | BattleEvent::ActionSkipped { .. }
                )
            });
            if acted {
                self.idle_turns = 0;
            }

            // A full round of idle turns can never make progress.
            let living = self.world.registry.iter().filter(|c| c.is_alive()).count();
            if self.idle_turns > 0 && self.idle_turns >= living {
                tracing::warn!("{} turns in a row changed nothing; declaring a stalemate", self.idle_turns);
                self.finish(battle_outcome(&self.world.registry).unwrap_or(BattleOutcome::Stalemate));
                continue;
            }

            if let Some(max_turns) = self.world.config.max_turns {
                if self.scheduler.turn_number() >= max_turns {
                    let outcome = battle_outcome(&self.world.registry).unwrap_or(BattleOutcome::TurnLimit);
                    self.finish(outcome);
                    continue;
                }
            }

            match self.scheduler.start_next_turn(&mut self.world, self.driver.as_mut()) {
                TurnStart::BattleOver(outcome) => self.finish(outcome),
                // A queued turn counts as idle until its drain shows an effect.
                TurnStart::Queued(_) | TurnStart::Passed(_) => self.idle_turns += 1,
                TurnStart::AwaitingInput(actor) => {
                    self.idle_turns = 0;
                    self.phase = Phase::AwaitingInput(actor);
                }
                TurnStart::Stalled => return SessionStatus::Stalled,
            }
        }
    }

    fn finish(&mut self, outcome: BattleOutcome) {
        tracing::info!("Battle over: {}", outcome);
        self.world.events.push(BattleEvent::BattleEnded { outcome });
        self.phase = Phase::Finished(outcome);
    }

    pub fn outcome(&self) -> Option<BattleOutcome> {
        match self.phase {
            Phase::Finished(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// The combatant whose turn it is, if any.
    pub fn current_turn(&self) -> Option<CombatantId> {
        self.scheduler.current()
    }

    pub fn turn_number(&self) -> u32 {
        self.scheduler.turn_number()
    }

    pub fn events(&self) -> &EventBus {
        &self.world.events
    }

    pub fn registry(&self) -> &CombatantRegistry {
        &self.world.registry
    }

    pub fn world(&self) -> &BattleWorld {
        &self.world
    }

    pub fn presentation(&self) -> &P {
        &self.presentation
    }
}
