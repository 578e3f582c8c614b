use schema::{
    ActionEffect, EffectKind, EffectRecord, HitResult, ImmunityRule, LogicType, RestoreMode,
};

use super::{mismatched, restore_each, strike, ChainHit, CombatPort, EffectLogic, ExecutionContext};

pub struct DamageLogic;

impl EffectLogic for DamageLogic {
    fn execute(&self, record: &EffectRecord, ctx: &mut ExecutionContext, port: &mut dyn CombatPort) {
        let EffectKind::Action(ActionEffect::Damage(damage)) = &record.effect else {
            return mismatched(record, LogicType::ActionDamage);
        };

        ctx.last_hit_result = strike(damage, 1.0, ctx.target, ctx, port);
    }
}

/// Strikes the context target, then jumps to nearby combatants of the same
/// faction with a per-jump damage multiplier.
pub struct ChainDamageLogic;

impl EffectLogic for ChainDamageLogic {
    fn execute(&self, record: &EffectRecord, ctx: &mut ExecutionContext, port: &mut dyn CombatPort) {
        let EffectKind::Action(ActionEffect::ChainDamage(chain)) = &record.effect else {
            return mismatched(record, LogicType::ActionChainDamage);
        };

        let mut visited = vec![ctx.target];
        let mut current = ctx.target;
        for step in 0..chain.max_targets as usize {
            let multiplier = chain.step_multiplier(step);

            if step == 0 {
                ctx.last_hit_result = strike(&chain.damage, multiplier, ctx.target, ctx, port);
                if ctx.abort {
                    return;
                }
                continue;
            }

            let Some(next) = port.next_chain_target(current, &visited) else {
                break;
            };
            let hit_result = strike(&chain.damage, multiplier, next, ctx, port);
            if ctx.abort {
                return;
            }
            tracing::debug!("Chain step {} hit {} ({}) x{:.2}", step, next, hit_result, multiplier);

            if hit_result != HitResult::None {
                ctx.chain_hits.push(ChainHit {
                    target: next,
                    hit_result,
                });
            }
            visited.push(next);
            current = next;
        }
    }
}

pub struct ResourceRestoreLogic;

impl EffectLogic for ResourceRestoreLogic {
    fn execute(&self, record: &EffectRecord, ctx: &mut ExecutionContext, port: &mut dyn CombatPort) {
        let EffectKind::Action(ActionEffect::ResourceRestore(restore)) = &record.effect else {
            return mismatched(record, LogicType::ActionResourceRestore);
        };

        let caster_magic = match port.combatant(ctx.caster) {
            Some(caster) => caster.current_stats().magic_attack,
            None => {
                ctx.abort = true;
                return;
            }
        };

        let target = ctx.resolve(restore.target);
        restore_each(restore.resources, target, restore.allow_overheal, ctx, port, |resource, combatant| {
            match restore.mode {
                RestoreMode::FixedValue => restore.value,
                RestoreMode::PercentOfMax => {
                    (combatant.base_stats().resource(resource) as f32 * restore.value as f32 / 100.0) as i32
                }
                RestoreMode::ScalingValue => (caster_magic as f32 * restore.value as f32 / 100.0) as i32,
            }
        });
    }
}

pub struct SetImmunityLogic;

impl EffectLogic for SetImmunityLogic {
    fn execute(&self, record: &EffectRecord, ctx: &mut ExecutionContext, port: &mut dyn CombatPort) {
        let EffectKind::Action(ActionEffect::SetImmunity(immunity)) = &record.effect else {
            return mismatched(record, LogicType::ActionSetImmunity);
        };

        if port.combatant(ctx.target).is_none() {
            ctx.abort = true;
            return;
        }
        port.request_immunity(ctx.target, ImmunityRule::new(immunity.attack_type, immunity.range_type));
    }
}
