use std::cmp::Reverse;
use std::collections::HashMap;
use std::time::Duration;

use schema::{EffectFamily, HitResult, ReactionTiming, ResourceCost};
use tokio::time::{sleep, sleep_until, Instant};

use crate::battle::action_queue::{BattleAction, IncomingHit};
use crate::battle::presentation::{
    AnimationSignals, Presentation, ATTACK_CLIP, ATTACK_TRIGGER, HIT_KEY, MOVE_TO_TARGET_CLIP,
    MOVE_TO_TARGET_TRIGGER, RETURN_TO_START_CLIP, RETURN_TO_START_TRIGGER,
};
use crate::battle::skill_effects::{EffectRegistry, ExecutionContext};
use crate::battle::state::{BattleEvent, BattleWorld, SkillFailureReason, SkipReason};
use crate::combatant::CombatantId;

/// One resolved strike collected for the after-hit hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitRecord {
    pub attacker: CombatantId,
    pub target: CombatantId,
    pub hit_result: HitResult,
}

/// Drains the action queue one skill-use at a time.
///
/// Reactions queued while a skill resolves are appended to the same queue and
/// run after it, so nesting never recurses.
#[derive(Debug)]
pub struct ActionOrchestrator {
    effects: EffectRegistry,
    /// Casters left standing at a target because more actions followed.
    engaged: HashMap<CombatantId, CombatantId>,
}

impl ActionOrchestrator {
    pub fn new(effects: EffectRegistry) -> Self {
        Self {
            effects,
            engaged: HashMap::new(),
        }
    }

    pub fn effects(&self) -> &EffectRegistry {
        &self.effects
    }

    pub fn effects_mut(&mut self) -> &mut EffectRegistry {
        &mut self.effects
    }

    /// Runs queued actions until the queue is empty.
    pub async fn drain<P: Presentation + ?Sized>(
        &mut self,
        world: &mut BattleWorld,
        presentation: &mut P,
        signals: &mut AnimationSignals,
    ) {
        while let Some(action) = world.queue.pop_front() {
            self.dispatch(action, world, presentation, signals).await;
        }
    }

    async fn dispatch<P: Presentation + ?Sized>(
        &mut self,
        action: BattleAction,
        world: &mut BattleWorld,
        presentation: &mut P,
        signals: &mut AnimationSignals,
    ) {
        let Some(caster) = world.registry.get_mut(action.caster) else {
            tracing::warn!("Dropping {}: caster {} is not registered", action.skill.name, action.caster);
            return;
        };

        let skip = if !caster.is_alive() {
            Some(SkipReason::CasterDefeated)
        } else if caster.is_interrupt_requested() {
            caster.set_interrupt_requested(false);
            Some(SkipReason::Interrupted)
        } else {
            None
        };

        if let Some(reason) = skip {
            tracing::debug!("{}'s {} skipped: {:?}", caster.name(), action.skill.name, reason);
            world.events.push(BattleEvent::ActionSkipped {
                caster: action.caster,
                skill: action.skill.name.clone(),
                reason,
            });
            return;
        }

        self.execute_skill(action, world, presentation, signals).await;
    }

    async fn execute_skill<P: Presentation + ?Sized>(
        &mut self,
        action: BattleAction,
        world: &mut BattleWorld,
        presentation: &mut P,
        signals: &mut AnimationSignals,
    ) {
        let BattleAction {
            caster,
            skill,
            targets,
            incoming,
        } = action;
        let is_active = skill.is_active();
        let timed = world.config.presentation.enabled;

        if targets.is_empty() {
            world.events.push(BattleEvent::SkillFailed {
                caster,
                skill: skill.name.clone(),
                reason: SkillFailureReason::NoTargets,
            });
            return;
        }

        // --- 1. Payment ---
        let mut costs = ResourceCost::default();
        if is_active {
            let (steepness, factor) = (world.config.cost_steepness, world.config.cost_factor);
            let Some(combatant) = world.registry.get_mut(caster) else {
                return;
            };
            let cost = combatant.progressive_cost(&skill, steepness, factor);
            if !combatant.pay(&cost) {
                tracing::info!("{} cannot afford {} ({:?})", combatant.name(), skill.name, cost);
                world.events.push(BattleEvent::SkillFailed {
                    caster,
                    skill: skill.name.clone(),
                    reason: SkillFailureReason::InsufficientResources,
                });
                return;
            }
            if !cost.is_zero() {
                world.events.push(BattleEvent::ResourcesSpent { combatant: caster, cost });
            }
            costs = cost;
        }

        tracing::info!(
            "{} uses {} on {:?}",
            world.registry.name_of(caster),
            skill.name,
            targets
        );
        world.events.push(BattleEvent::SkillUsed {
            caster,
            skill: skill.name.clone(),
            targets: targets.clone(),
            reaction: !is_active,
        });

        // --- 2. Approach ---
        let mut attack_end = None;
        if is_active {
            if let Some(handle) = skill.animator_override() {
                presentation.set_animator_override(caster, handle);
            }

            if self.engaged.get(&caster) != Some(&targets[0]) {
                presentation.play_animation(caster, MOVE_TO_TARGET_TRIGGER);
                if timed {
                    let move_secs = world.config.presentation.default_move_secs;
                    sleep(clip_duration(&*presentation, caster, MOVE_TO_TARGET_CLIP, move_secs)).await;
                }
            }

            presentation.play_animation(caster, ATTACK_TRIGGER);
            if timed {
                let beats = &world.config.presentation;
                let attack = clip_duration(&*presentation, caster, ATTACK_CLIP, beats.default_attack_secs);
                let slack = Duration::from_secs_f32(beats.hit_signal_slack_secs);
                attack_end = Some(Instant::now() + attack);
                signals.wait_for_key(caster, HIT_KEY, attack + slack).await;
            }

            world.fire_reactions(
                targets[0],
                Some(caster),
                ReactionTiming::PreAttack,
                IncomingHit {
                    hit_result: HitResult::Hit,
                    ..IncomingHit::default()
                },
            );
        }

        // --- 3. Effect chains, one per target ---
        let mut hits = Vec::new();
        for &target in &targets {
            if world.registry.get(target).is_none() {
                tracing::warn!("{} targets unregistered {}; chain aborted", skill.name, target);
                world.events.push(BattleEvent::EffectChainAborted { caster, target });
                continue;
            }

            let mut ctx = ExecutionContext::new(caster, target)
                .with_incoming(incoming, skill.range_type)
                .with_costs(costs);

            for (slot, record) in skill.effects.iter().enumerate() {
                let Some(record) = record else {
                    tracing::debug!("{} has an empty effect slot at {}", skill.name, slot);
                    continue;
                };
                if record.family() == EffectFamily::Conditional && !ctx.is_condition_check {
                    continue;
                }

                if let Some(trigger) = &record.animation_trigger {
                    presentation.play_animation(caster, trigger);
                }
                if timed {
                    if let Some(key) = &record.trigger_key {
                        let timeout = world.config.presentation.signal_timeout();
                        signals.wait_for_key(caster, key, timeout).await;
                    }
                }

                self.effects.process(record, &mut ctx, world);

                let interrupted = world
                    .registry
                    .get(caster)
                    .map_or(true, |c| c.is_interrupt_requested());
                if ctx.abort || interrupted {
                    tracing::debug!("{}'s {} chain on {} aborted", world.registry.name_of(caster), skill.name, target);
                    world.events.push(BattleEvent::EffectChainAborted { caster, target });
                    break;
                }
            }

            if ctx.last_hit_result != HitResult::None {
                hits.push(HitRecord {
                    attacker: caster,
                    target,
                    hit_result: ctx.last_hit_result,
                });
            }
            hits.extend(ctx.chain_hits.iter().map(|chain_hit| HitRecord {
                attacker: caster,
                target: chain_hit.target,
                hit_result: chain_hit.hit_result,
            }));
            if ctx.last_hit_result == HitResult::Miss {
                presentation.play_dodge_animation(target);
            }
        }

        if let Some(end) = attack_end {
            sleep_until(end).await;
        }

        // --- 4. After-hit hooks, fastest target first ---
        hits.sort_by_key(|hit| {
            Reverse(
                world
                    .registry
                    .get(hit.target)
                    .map_or(i32::MIN, |c| c.current_stats().speed),
            )
        });

        if is_active {
            for hit in &hits {
                world.fire_reactions(
                    hit.target,
                    Some(hit.attacker),
                    ReactionTiming::PostHit,
                    IncomingHit {
                        hit_result: hit.hit_result,
                        ..IncomingHit::default()
                    },
                );
            }
            world.fire_reactions(
                caster,
                None,
                ReactionTiming::PostAttack,
                IncomingHit {
                    hit_result: HitResult::Hit,
                    ..IncomingHit::default()
                },
            );
        }

        // --- 5. Deaths ---
        for hit in &hits {
            process_death(world, hit.target);
        }

        // --- 6. Return ---
        if is_active {
            if world.queue.is_empty() {
                presentation.play_animation(caster, RETURN_TO_START_TRIGGER);
                if timed {
                    let return_secs = world.config.presentation.default_return_secs;
                    sleep(clip_duration(&*presentation, caster, RETURN_TO_START_CLIP, return_secs)).await;
                }
                presentation.restore_default_animator(caster);
                self.engaged.remove(&caster);
            } else {
                self.engaged.insert(caster, targets[0]);
            }
        }
    }
}

impl Default for ActionOrchestrator {
    fn default() -> Self {
        Self::new(EffectRegistry::standard())
    }
}

fn process_death(world: &mut BattleWorld, target: CombatantId) {
    let Some(combatant) = world.registry.get_mut(target) else {
        return;
    };
    if combatant.is_alive() || !combatant.mark_defeated() {
        return;
    }

    tracing::info!("{} is defeated", combatant.name());
    world.events.push(BattleEvent::CombatantDefeated { combatant: target });
}

fn clip_duration<P: Presentation + ?Sized>(
    presentation: &P,
    caster: CombatantId,
    clip: &str,
    default_secs: f32,
) -> Duration {
    match presentation.animation_clip_length(caster, clip) {
        Some(secs) if secs > 0.0 => Duration::from_secs_f32(secs),
        _ => {
            tracing::warn!("No length for clip '{}' on {}; using {:.2}s", clip, caster, default_secs);
            Duration::from_secs_f32(default_secs.max(0.0))
        }
    }
}
