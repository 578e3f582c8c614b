//! Mutations that only run when the preceding Check passed. The gating is
//! done by the orchestrator; these algorithms never look at the flag.

use schema::{ConditionalEffect, EffectKind, EffectRecord, LogicType, ResourceType, SetMode};

use super::{mismatched, restore_each, strike, CombatPort, EffectLogic, ExecutionContext};

pub struct ConditionalAttackLogic;

impl EffectLogic for ConditionalAttackLogic {
    fn execute(&self, record: &EffectRecord, ctx: &mut ExecutionContext, port: &mut dyn CombatPort) {
        let EffectKind::Conditional(ConditionalEffect::Attack(damage)) = &record.effect else {
            return mismatched(record, LogicType::ConditionalAttack);
        };

        ctx.last_hit_result = strike(damage, 1.0, ctx.target, ctx, port);
    }
}

/// Gives back a share of what the caster paid for this skill-use.
pub struct ResourceRefundLogic;

impl EffectLogic for ResourceRefundLogic {
    fn execute(&self, record: &EffectRecord, ctx: &mut ExecutionContext, port: &mut dyn CombatPort) {
        let EffectKind::Conditional(ConditionalEffect::ResourceRefund(refund)) = &record.effect else {
            return mismatched(record, LogicType::ConditionalResourceRefund);
        };

        let costs = ctx.costs;
        let share = refund.refund_percent.clamp(0, 100) as f32 / 100.0;
        let refunded = ResourceType::ORDERED
            .into_iter()
            .filter(|resource| costs.amount(*resource) > 0)
            .fold(ResourceType::empty(), |acc, resource| acc | resource);

        restore_each(refunded, ctx.caster, false, ctx, port, |resource, _| {
            (costs.amount(resource) as f32 * share) as i32
        });
    }
}

/// Adds crowd-control flags to the target, sourced from the caster.
pub struct SetCrowdControlLogic;

impl EffectLogic for SetCrowdControlLogic {
    fn execute(&self, record: &EffectRecord, ctx: &mut ExecutionContext, port: &mut dyn CombatPort) {
        let EffectKind::Conditional(ConditionalEffect::SetCrowdControl(set)) = &record.effect else {
            return mismatched(record, LogicType::ConditionalSetCrowdControl);
        };

        if port.combatant(ctx.target).is_none() {
            ctx.abort = true;
            return;
        }
        port.request_crowd_control(ctx.target, set.flags, ctx.caster);
    }
}

pub struct SetResourceLogic;

impl EffectLogic for SetResourceLogic {
    fn execute(&self, record: &EffectRecord, ctx: &mut ExecutionContext, port: &mut dyn CombatPort) {
        let EffectKind::Conditional(ConditionalEffect::SetResource(set)) = &record.effect else {
            return mismatched(record, LogicType::ConditionalSetResource);
        };

        let target = ctx.resolve(set.target);
        restore_each(set.resources, target, false, ctx, port, |resource, combatant| {
            let current = combatant.current_stats().resource(resource);
            match set.mode {
                SetMode::FixedValue => set.value - current,
                SetMode::PercentOfCurrent => -((current as f32 * set.value as f32 / 100.0) as i32),
            }
        });
    }
}
