use schema::{CheckCondition, CheckMode, EffectKind, EffectRecord, LogicType};

use super::{mismatched, CombatPort, EffectLogic, ExecutionContext};

/// A pure test over the context and combatant state.
///
/// Returns `None` when handed a condition of another kind.
pub trait Predicate: Send + Sync {
    const LOGIC_TYPE: LogicType;

    fn evaluate(&self, condition: &CheckCondition, ctx: &ExecutionContext, port: &dyn CombatPort) -> Option<bool>;
}

/// Adapts a predicate into an effect: writes the verdict into the context
/// and aborts the chain on failure when the record asks for it.
pub struct CheckLogic<P>(pub P);

impl<P: Predicate> EffectLogic for CheckLogic<P> {
    fn execute(&self, record: &EffectRecord, ctx: &mut ExecutionContext, port: &mut dyn CombatPort) {
        let EffectKind::Check(check) = &record.effect else {
            return mismatched(record, P::LOGIC_TYPE);
        };
        let Some(passed) = self.0.evaluate(&check.condition, ctx, &*port) else {
            return mismatched(record, P::LOGIC_TYPE);
        };

        ctx.is_condition_check = passed;
        if !passed && check.break_chain_on_fail {
            ctx.abort = true;
        }
    }
}

pub struct HitResultPredicate;

impl Predicate for HitResultPredicate {
    const LOGIC_TYPE: LogicType = LogicType::CheckHitResult;

    fn evaluate(&self, condition: &CheckCondition, ctx: &ExecutionContext, _port: &dyn CombatPort) -> Option<bool> {
        let CheckCondition::HitResult(check) = condition else {
            return None;
        };

        if check.hit_result != ctx.last_hit_result {
            return Some(false);
        }
        if !check.attack_type.is_empty() && !check.attack_type.intersects(ctx.last_attack_type) {
            return Some(false);
        }
        if check.range_type != schema::RangeType::None && check.range_type != ctx.last_range_type {
            return Some(false);
        }
        Some(true)
    }
}

/// Every selected resource must satisfy the comparator.
pub struct ResourcePredicate;

impl Predicate for ResourcePredicate {
    const LOGIC_TYPE: LogicType = LogicType::CheckResource;

    fn evaluate(&self, condition: &CheckCondition, ctx: &ExecutionContext, port: &dyn CombatPort) -> Option<bool> {
        let CheckCondition::Resource(check) = condition else {
            return None;
        };
        let Some(subject) = port.combatant(ctx.resolve(check.target)) else {
            return Some(false);
        };

        let passed = schema::ResourceType::ORDERED
            .into_iter()
            .filter(|resource| check.resources.contains(*resource))
            .all(|resource| {
                let current = subject.current_stats().resource(resource);
                match check.mode {
                    CheckMode::FixedValue => check.compare.evaluate(current, check.value),
                    CheckMode::PercentOfMax => {
                        let max = subject.base_stats().resource(resource);
                        let percent = if max > 0 {
                            current as f32 * 100.0 / max as f32
                        } else {
                            0.0
                        };
                        check.compare.evaluate_f32(percent, check.value as f32)
                    }
                }
            });
        Some(passed)
    }
}

/// The target carries every requested crowd-control flag.
pub struct CrowdControlPredicate;

impl Predicate for CrowdControlPredicate {
    const LOGIC_TYPE: LogicType = LogicType::CheckCrowdControl;

    fn evaluate(&self, condition: &CheckCondition, ctx: &ExecutionContext, port: &dyn CombatPort) -> Option<bool> {
        let CheckCondition::CrowdControl(check) = condition else {
            return None;
        };

        Some(
            port.combatant(ctx.target)
                .is_some_and(|target| target.crowd_control().contains(check.flags)),
        )
    }
}
