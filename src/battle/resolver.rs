//! Attack resolution and the other pass-throughs that mutate combatant state.
//!
//! Every hp/resource/crowd-control/immunity change made during a battle goes
//! through a method in this module, so all state mutation is auditable from
//! one place.

use schema::{
    AttackType, CrowdControl, HitResult, ImmunityRule, RangeType, ReactionTiming, ResourceCost,
    ResourceType, ScopeType,
};

use crate::battle::action_queue::{BattleAction, IncomingHit};
use crate::battle::skill_effects::CombatPort;
use crate::battle::state::{BattleEvent, BattleWorld};
use crate::combatant::{Combatant, CombatantId};

/// One attack instance handed to [`BattleWorld::resolve_attack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackRequest {
    pub attacker: CombatantId,
    pub target: CombatantId,
    pub raw_physical: i32,
    pub raw_magic: i32,
    pub attack_type: AttackType,
    pub range_type: RangeType,
    /// Ignores the avoidance roll.
    pub is_true_strike: bool,
    /// Skips the block roll entirely.
    pub is_unblockable: bool,
}

/// Defense-reduced damage for one channel. Positive raw damage never drops
/// below 1; zero raw damage stays zero.
pub fn mitigate(raw: i32, defense: i32) -> i32 {
    if raw > 0 {
        (raw - defense).max(1)
    } else {
        0
    }
}

impl BattleWorld {
    /// Resolves one attack into a hit outcome and applies its damage.
    ///
    /// Roll order is avoidance, then block (unless unblockable), then critical
    /// (only when not blocked). A miss consumes only the avoidance roll.
    pub fn resolve_attack(&mut self, request: AttackRequest) -> HitResult {
        let AttackRequest { attacker, target, .. } = request;
        if self.registry.get(attacker).is_none() || self.registry.get(target).is_none() {
            tracing::warn!("Attack between unknown combatants {} -> {}", attacker, target);
            return HitResult::None;
        }

        let mut incoming = IncomingHit {
            hit_result: HitResult::Hit,
            attack_type: request.attack_type,
            range_type: request.range_type,
        };

        // 1. Pre-emptive defensive passives.
        self.fire_reactions(target, Some(attacker), ReactionTiming::PreHit, incoming);

        let (Some(attacker_stats), Some(defender)) = (
            self.registry.get(attacker).map(|c| *c.current_stats()),
            self.registry.get(target),
        ) else {
            return HitResult::None;
        };
        let defender_stats = *defender.current_stats();

        // 2. Immunity.
        let (mut raw_physical, mut raw_magic) = (request.raw_physical, request.raw_magic);
        if defender.is_immune(request.attack_type, request.range_type) {
            tracing::debug!(
                "{} is immune to {:?} {} damage",
                defender.name(),
                request.attack_type,
                request.range_type
            );
            raw_physical = 0;
            raw_magic = 0;
            self.events.push(BattleEvent::DamageNullified { attacker, target });
        }

        // 3. Mitigation.
        let reduced_physical = mitigate(raw_physical, defender_stats.phys_defense);
        let reduced_magic = mitigate(raw_magic, defender_stats.magic_defense);

        // 4. Avoidance.
        let hit_chance =
            attacker_stats.accuracy_rate - defender_stats.dodge_rate + self.config.hit_chance_offset;
        let avoidance_roll = self.rng.next_outcome("avoidance");
        if avoidance_roll >= hit_chance && !request.is_true_strike {
            tracing::debug!(
                "{} avoided {} (roll {} vs chance {})",
                self.registry.name_of(target),
                self.registry.name_of(attacker),
                avoidance_roll,
                hit_chance
            );
            self.events.push(BattleEvent::AttackMissed { attacker, target });

            incoming.hit_result = HitResult::Miss;
            self.fire_reactions(attacker, Some(target), ReactionTiming::OnAttack, incoming);
            self.fire_reactions(target, Some(attacker), ReactionTiming::OnHit, incoming);
            return HitResult::Miss;
        }

        // 5. Block.
        let is_blocked = !request.is_unblockable
            && self.rng.next_outcome("block") < defender_stats.block_rate;
        let mut multiplier = if is_blocked {
            self.config.block_damage_multiplier
        } else {
            1.0
        };

        // 6. Critical, suppressed by a block.
        let is_critical = !is_blocked && self.rng.next_outcome("critical") < attacker_stats.critical_rate;
        if is_critical {
            multiplier *= self.config.critical_damage_multiplier;
        }

        // 7. Damage.
        let final_damage = ((reduced_physical + reduced_magic) as f32 * multiplier).floor() as i32;
        let mut remaining_hp = 0;
        if let Some(defender) = self.registry.get_mut(target) {
            defender.apply_damage(final_damage);
            remaining_hp = defender.current_stats().hp;
        }

        let result = if is_critical {
            HitResult::Critical
        } else if is_blocked {
            HitResult::Block
        } else {
            HitResult::Hit
        };
        tracing::debug!(
            "{} -> {}: {} for {} ({} + {} x {:.2}), {} hp left",
            self.registry.name_of(attacker),
            self.registry.name_of(target),
            result,
            final_damage,
            reduced_physical,
            reduced_magic,
            multiplier,
            remaining_hp
        );
        self.events.push(BattleEvent::AttackResolved {
            attacker,
            target,
            result,
            damage: final_damage,
            remaining_hp,
        });

        // 8. Reactions to the judged hit.
        incoming.hit_result = result;
        self.fire_reactions(attacker, Some(target), ReactionTiming::OnAttack, incoming);
        self.fire_reactions(target, Some(attacker), ReactionTiming::OnHit, incoming);

        // 9. Landed hits interrupt the defender's queued follow-ups.
        if result.interrupts() {
            if let Some(defender) = self.registry.get_mut(target) {
                defender.set_interrupt_requested(true);
            }
        }

        result
    }

    /// Adds `amount` to each resource in `resources` and returns what was actually applied.
    pub fn restore_resource(
        &mut self,
        target: CombatantId,
        resources: ResourceType,
        amount: i32,
        allow_overheal: bool,
    ) -> ResourceCost {
        let mut applied = ResourceCost::default();
        let Some(combatant) = self.registry.get_mut(target) else {
            tracing::warn!("Restore requested for unknown combatant {}", target);
            return applied;
        };

        for resource in ResourceType::ORDERED {
            if !resources.contains(resource) {
                continue;
            }

            let delta = combatant.restore_resource(resource, amount, allow_overheal);
            applied.add_amount(resource, delta);
            if delta != 0 {
                self.events.push(BattleEvent::ResourceRestored {
                    target,
                    resource,
                    amount: delta,
                    new_value: combatant.current_stats().resource(resource),
                });
            }
        }

        applied
    }

    /// Adds crowd-control flags to `target`.
    pub fn set_crowd_control(&mut self, target: CombatantId, flags: CrowdControl, source: CombatantId) {
        if flags.is_empty() {
            return;
        }
        let Some(combatant) = self.registry.get_mut(target) else {
            tracing::warn!("Crowd control requested for unknown combatant {}", target);
            return;
        };

        combatant.add_crowd_control(flags);
        self.events.push(BattleEvent::CrowdControlApplied { target, flags, source });
    }

    /// Appends an immunity rule unless an identical one is already active.
    pub fn grant_immunity(&mut self, target: CombatantId, rule: ImmunityRule) {
        let Some(combatant) = self.registry.get_mut(target) else {
            tracing::warn!("Immunity requested for unknown combatant {}", target);
            return;
        };

        if combatant.add_immunity(rule) {
            self.events.push(BattleEvent::ImmunityGranted { target, rule });
        }
    }

    /// Drops every immunity rule carried by `target`.
    pub fn clear_immunities(&mut self, target: CombatantId) {
        if let Some(combatant) = self.registry.get_mut(target) {
            combatant.clear_immunities();
        }
    }

    /// Queues every passive of `owner` timed at `timing`.
    ///
    /// A defeated owner only fires skills whose scope includes SELF. The
    /// reaction targets its owner when the scope includes SELF, otherwise the
    /// trigger source when the scope includes ENEMY.
    pub fn fire_reactions(
        &mut self,
        owner: CombatantId,
        source: Option<CombatantId>,
        timing: ReactionTiming,
        incoming: IncomingHit,
    ) {
        let Some(combatant) = self.registry.get(owner) else {
            return;
        };

        let is_alive = combatant.is_alive();
        let mut reactions = Vec::new();
        for skill in combatant.reactions_at(timing) {
            if !is_alive && !skill.scope.contains(ScopeType::SELF) {
                continue;
            }

            let target = if skill.scope.contains(ScopeType::SELF) {
                Some(owner)
            } else if skill.scope.contains(ScopeType::ENEMY) {
                source
            } else {
                None
            };

            match target {
                Some(target) => reactions.push(BattleAction::new(owner, skill.clone(), vec![target]).with_incoming(incoming)),
                None => tracing::debug!(
                    "{}'s {} has no target for {}",
                    combatant.name(),
                    skill.name,
                    timing
                ),
            }
        }

        for action in reactions {
            tracing::debug!(
                "{} queues reaction {} ({})",
                self.registry.name_of(owner),
                action.skill.name,
                timing
            );
            self.events.push(BattleEvent::ReactionTriggered {
                owner,
                skill: action.skill.name.clone(),
                timing,
                source,
            });
            self.queue.push_back(action);
        }
    }
}

impl CombatPort for BattleWorld {
    fn combatant(&self, id: CombatantId) -> Option<&Combatant> {
        self.registry.get(id)
    }

    fn request_attack(&mut self, request: AttackRequest) -> HitResult {
        self.resolve_attack(request)
    }

    fn request_restore(
        &mut self,
        target: CombatantId,
        resources: ResourceType,
        amount: i32,
        allow_overheal: bool,
    ) -> ResourceCost {
        self.restore_resource(target, resources, amount, allow_overheal)
    }

    fn request_crowd_control(&mut self, target: CombatantId, flags: CrowdControl, source: CombatantId) {
        self.set_crowd_control(target, flags, source);
    }

    fn request_immunity(&mut self, target: CombatantId, rule: ImmunityRule) {
        self.grant_immunity(target, rule);
    }

    /// Nearest living member of `from`'s faction by grid distance, lower grid index on ties.
    fn next_chain_target(&self, from: CombatantId, visited: &[CombatantId]) -> Option<CombatantId> {
        let origin = self.registry.get(from)?;
        let origin_grid = origin.grid_index() as i32;

        self.registry
            .survivors(origin.faction())
            .filter(|candidate| !visited.contains(&candidate.id()))
            .min_by_key(|candidate| {
                let grid = candidate.grid_index() as i32;
                ((grid - origin_grid).abs(), grid)
            })
            .map(|candidate| candidate.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::state::TurnRng;
    use crate::battle::tests::common::{passive_skill, TestCombatantBuilder};
    use crate::config::BattleConfig;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use schema::{Faction, StatBlock};

    fn world(rolls: Vec<u8>) -> BattleWorld {
        BattleWorld::new(BattleConfig::headless(), TurnRng::new_for_test(rolls))
    }

    fn strike(attacker: CombatantId, target: CombatantId, physical: i32) -> AttackRequest {
        AttackRequest {
            attacker,
            target,
            raw_physical: physical,
            raw_magic: 0,
            attack_type: AttackType::PHYSICAL,
            range_type: RangeType::Melee,
            is_true_strike: false,
            is_unblockable: false,
        }
    }

    #[rstest]
    #[case(50, 20, 30)]
    #[case(20, 20, 1)]
    #[case(5, 100, 1)]
    #[case(0, 10, 0)]
    fn test_mitigation_floor(#[case] raw: i32, #[case] defense: i32, #[case] expected: i32) {
        assert_eq!(mitigate(raw, defense), expected);
    }

    #[test]
    fn test_plain_hit_deals_mitigated_damage() {
        let mut world = world(vec![50, 99, 99]);
        let attacker = TestCombatantBuilder::new("Knight").accuracy(100).register(&mut world, Faction::Ally);
        let target = TestCombatantBuilder::new("Golem")
            .hp(200)
            .phys_defense(20)
            .register(&mut world, Faction::Enemy);

        let result = world.resolve_attack(strike(attacker, target, 100));

        assert_eq!(result, HitResult::Hit);
        assert_eq!(world.registry.get(target).map(|c| c.current_stats().hp), Some(120));
        assert!(world.registry.get(target).is_some_and(|c| c.is_interrupt_requested()));
    }

    #[test]
    fn test_miss_consumes_only_avoidance_roll() {
        // Chance 85; a roll of 90 misses. The scripted oracle would panic on a second roll.
        let mut world = world(vec![90]);
        let attacker = TestCombatantBuilder::new("Archer").accuracy(85).register(&mut world, Faction::Ally);
        let target = TestCombatantBuilder::new("Thief").hp(50).register(&mut world, Faction::Enemy);

        let result = world.resolve_attack(strike(attacker, target, 30));

        assert_eq!(result, HitResult::Miss);
        assert_eq!(world.registry.get(target).map(|c| c.current_stats().hp), Some(50));
        assert!(!world.registry.get(target).is_some_and(|c| c.is_interrupt_requested()));
    }

    #[test]
    fn test_true_strike_ignores_avoidance() {
        let mut world = world(vec![99, 99, 99]);
        let attacker = TestCombatantBuilder::new("Monk").accuracy(0).register(&mut world, Faction::Ally);
        let target = TestCombatantBuilder::new("Phantom")
            .hp(50)
            .dodge(100)
            .register(&mut world, Faction::Enemy);

        let mut request = strike(attacker, target, 10);
        request.is_true_strike = true;

        assert_eq!(world.resolve_attack(request), HitResult::Hit);
        assert_eq!(world.registry.get(target).map(|c| c.current_stats().hp), Some(40));
    }

    #[test]
    fn test_block_halves_damage_and_suppresses_critical() {
        // Avoidance passes, block succeeds; no critical roll is consumed.
        let mut world = world(vec![0, 0]);
        let attacker = TestCombatantBuilder::new("Berserker")
            .accuracy(100)
            .critical(100)
            .register(&mut world, Faction::Ally);
        let target = TestCombatantBuilder::new("Paladin")
            .hp(100)
            .block(100)
            .register(&mut world, Faction::Enemy);

        let result = world.resolve_attack(strike(attacker, target, 41));

        assert_eq!(result, HitResult::Block);
        assert_eq!(world.registry.get(target).map(|c| c.current_stats().hp), Some(80));
        // Blocked hits do not interrupt.
        assert!(!world.registry.get(target).is_some_and(|c| c.is_interrupt_requested()));
    }

    #[test]
    fn test_unblockable_skips_block_roll() {
        let mut world = world(vec![0, 0]);
        let attacker = TestCombatantBuilder::new("Assassin")
            .accuracy(100)
            .critical(100)
            .register(&mut world, Faction::Ally);
        let target = TestCombatantBuilder::new("Paladin")
            .hp(100)
            .block(100)
            .register(&mut world, Faction::Enemy);

        let mut request = strike(attacker, target, 20);
        request.is_unblockable = true;

        assert_eq!(world.resolve_attack(request), HitResult::Critical);
        assert_eq!(world.registry.get(target).map(|c| c.current_stats().hp), Some(70));
    }

    #[test]
    fn test_immunity_zeroes_damage() {
        let mut world = world(vec![0, 99, 99]);
        let attacker = TestCombatantBuilder::new("Mage").accuracy(100).register(&mut world, Faction::Ally);
        let target = TestCombatantBuilder::new("Warded").hp(60).register(&mut world, Faction::Enemy);
        world.grant_immunity(target, ImmunityRule::new(AttackType::MAGIC, RangeType::None));

        let mut request = strike(attacker, target, 0);
        request.raw_magic = 45;
        request.attack_type = AttackType::MAGIC;
        request.range_type = RangeType::Ranged;

        assert_eq!(world.resolve_attack(request), HitResult::Hit);
        assert_eq!(world.registry.get(target).map(|c| c.current_stats().hp), Some(60));
        assert!(world
            .events
            .events()
            .contains(&BattleEvent::DamageNullified { attacker, target }));
    }

    #[test]
    fn test_restore_reports_applied_amounts() {
        let mut world = world(vec![]);
        let target = TestCombatantBuilder::new("Cleric")
            .stats(StatBlock {
                hp: 100,
                mp: 50,
                ..Default::default()
            })
            .current_hp(70)
            .register(&mut world, Faction::Ally);

        let applied = world.restore_resource(target, ResourceType::HP | ResourceType::MP, 40, false);

        assert_eq!(applied, ResourceCost { hp: 30, sp: 0, mp: 0 });
        assert_eq!(world.events.len(), 1);
    }

    #[test]
    fn test_crowd_control_accumulates() {
        let mut world = world(vec![]);
        let source = TestCombatantBuilder::new("Witch").register(&mut world, Faction::Enemy);
        let target = TestCombatantBuilder::new("Knight").register(&mut world, Faction::Ally);

        world.set_crowd_control(target, CrowdControl::POISON, source);
        world.set_crowd_control(target, CrowdControl::SLOW, source);

        assert_eq!(
            world.registry.get(target).map(|c| c.crowd_control()),
            Some(CrowdControl::POISON | CrowdControl::SLOW)
        );
    }

    #[test]
    fn test_duplicate_immunity_is_not_re_added() {
        let mut world = world(vec![]);
        let target = TestCombatantBuilder::new("Warded").register(&mut world, Faction::Ally);
        let rule = ImmunityRule::new(AttackType::PHYSICAL, RangeType::Melee);

        world.grant_immunity(target, rule);
        world.grant_immunity(target, rule);

        assert_eq!(world.registry.get(target).map(|c| c.immunities().len()), Some(1));
        world.clear_immunities(target);
        assert_eq!(world.registry.get(target).map(|c| c.immunities().len()), Some(0));
    }

    #[test]
    fn test_reactions_target_by_scope() {
        let mut world = world(vec![]);
        let attacker = TestCombatantBuilder::new("Raider").register(&mut world, Faction::Enemy);
        let owner = TestCombatantBuilder::new("Duelist")
            .skill(passive_skill("Riposte", ReactionTiming::OnHit, ScopeType::ENEMY | ScopeType::SINGLE))
            .skill(passive_skill("Second Wind", ReactionTiming::OnHit, ScopeType::SELF))
            .skill(passive_skill("Opening Gambit", ReactionTiming::PreAttack, ScopeType::ENEMY))
            .register(&mut world, Faction::Ally);

        world.fire_reactions(owner, Some(attacker), ReactionTiming::OnHit, IncomingHit::default());

        let riposte = world.queue.pop_front().expect("riposte queued");
        assert_eq!(riposte.skill.name, "Riposte");
        assert_eq!(riposte.targets, vec![attacker]);
        let second_wind = world.queue.pop_front().expect("second wind queued");
        assert_eq!(second_wind.targets, vec![owner]);
        assert!(world.queue.is_empty());
    }

    #[test]
    fn test_defeated_owner_only_fires_self_reactions() {
        let mut world = world(vec![]);
        let attacker = TestCombatantBuilder::new("Raider").register(&mut world, Faction::Enemy);
        let owner = TestCombatantBuilder::new("Martyr")
            .current_hp(0)
            .skill(passive_skill("Riposte", ReactionTiming::OnHit, ScopeType::ENEMY))
            .skill(passive_skill("Last Rites", ReactionTiming::OnHit, ScopeType::SELF))
            .register(&mut world, Faction::Ally);

        world.fire_reactions(owner, Some(attacker), ReactionTiming::OnHit, IncomingHit::default());

        assert_eq!(world.queue.len(), 1);
        assert_eq!(world.queue.pop_front().map(|a| a.skill.name.clone()), Some("Last Rites".to_string()));
    }

    #[test]
    fn test_chain_target_prefers_nearest_grid_then_lower_index() {
        let mut world = world(vec![]);
        let first = TestCombatantBuilder::new("Center").grid(3).register(&mut world, Faction::Enemy);
        let left = TestCombatantBuilder::new("Left").grid(2).register(&mut world, Faction::Enemy);
        let right = TestCombatantBuilder::new("Right").grid(4).register(&mut world, Faction::Enemy);
        let far = TestCombatantBuilder::new("Far").grid(5).current_hp(0).register(&mut world, Faction::Enemy);
        TestCombatantBuilder::new("Ally").grid(3).register(&mut world, Faction::Ally);

        assert_eq!(world.next_chain_target(first, &[first]), Some(left));
        assert_eq!(world.next_chain_target(first, &[first, left]), Some(right));
        // Dead combatants are never chosen.
        assert_eq!(world.next_chain_target(right, &[first, left, right]), None);
        assert!(!world.registry.get(far).is_some_and(|c| c.is_alive()));
    }
}
