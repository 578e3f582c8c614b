#[cfg(test)]
mod tests {
    use crate::battle::action_queue::BattleAction;
    use crate::battle::session::{BattleSession, SessionStatus};
    use crate::battle::state::{BattleEvent, BattleOutcome, SkipReason, TurnRng};
    use crate::battle::tests::common::{
        active_skill, check_hit, damage, drain, passive_skill, passive_skill_with, restore_own_hp,
        scripted_world, TestCombatantBuilder,
    };
    use crate::config::BattleConfig;
    use pretty_assertions::assert_eq;
    use schema::{ActionEffect, DamageEffect, EffectKind, EffectRecord, Faction, HitResult, ReactionTiming, ResourceType, ScopeType};

    fn true_strike(percent: i32) -> EffectRecord {
        EffectRecord::new(EffectKind::Action(ActionEffect::Damage(DamageEffect {
            phys_power_percent: percent,
            is_true_strike: true,
            ..Default::default()
        })))
    }

    fn position(events: &[BattleEvent], predicate: impl Fn(&BattleEvent) -> bool) -> usize {
        events
            .iter()
            .position(predicate)
            .unwrap_or_else(|| panic!("event not found in {:#?}", events))
    }

    #[tokio::test]
    async fn test_reaction_cascade_completes_before_next_turn() {
        // Arrange
        // Turn 1: Knight's slash is blocked (rolls 0, 0), so the Orc is not
        // interrupted and its Riposte runs. The riposte is blocked too
        // (rolls 0, 0), which fires the Knight's Grit without interrupting it.
        let config = BattleConfig {
            max_turns: Some(2),
            ..BattleConfig::headless()
        };
        let mut session = BattleSession::new(config, TurnRng::new_for_test(vec![0, 0, 0, 0]));
        let knight = session
            .register_character(
                TestCombatantBuilder::new("Knight")
                    .phys_attack(50)
                    .speed(20)
                    .block(100)
                    .current_hp(80)
                    .skill(active_skill("Slash", vec![damage(100)]))
                    .skill(passive_skill_with("Grit", ReactionTiming::OnHit, ScopeType::SELF, vec![restore_own_hp(5)]))
                    .build(),
                Faction::Ally,
            )
            .expect("roster has room");
        let orc = session
            .register_character(
                TestCombatantBuilder::new("Orc")
                    .phys_attack(40)
                    .block(100)
                    .skill(passive_skill_with(
                        "Riposte",
                        ReactionTiming::PostHit,
                        ScopeType::ENEMY,
                        vec![check_hit(HitResult::Block, true), true_strike(50)],
                    ))
                    .build(),
                Faction::Enemy,
            )
            .expect("roster has room");

        // Act
        session.start_battle();
        let status = session.run().await;

        // Assert
        assert_eq!(status, SessionStatus::Finished(BattleOutcome::TurnLimit));
        let events = session.events().events();

        let riposte = position(events, |e| {
            matches!(e, BattleEvent::ReactionTriggered { owner, timing: ReactionTiming::PostHit, .. } if *owner == orc)
        });
        let counter = position(events, |e| {
            matches!(e, BattleEvent::AttackResolved { attacker, result: HitResult::Block, damage: 10, .. } if *attacker == orc)
        });
        let grit = position(events, |e| {
            matches!(e, BattleEvent::ResourceRestored { target, resource, amount: 5, .. } if *target == knight && *resource == ResourceType::HP)
        });
        let second_turn = position(events, |e| matches!(e, BattleEvent::TurnStarted { turn_number: 2, .. }));

        assert!(riposte < counter && counter < grit && grit < second_turn);
        // 25 blocked damage to the Orc, 10 to the Knight, then 5 recovered.
        assert_eq!(session.registry().get(orc).map(|c| c.current_stats().hp), Some(75));
        assert_eq!(session.registry().get(knight).map(|c| c.current_stats().hp), Some(75));
    }

    #[tokio::test]
    async fn test_clean_hit_cancels_defender_counter() {
        let mut world = scripted_world(vec![0, 99, 99]);
        let slash = active_skill("Slash", vec![damage(100)]);
        let knight = TestCombatantBuilder::new("Knight")
            .phys_attack(30)
            .skill(slash.clone())
            .register(&mut world, Faction::Ally);
        let orc = TestCombatantBuilder::new("Orc")
            .skill(passive_skill_with("Riposte", ReactionTiming::PostHit, ScopeType::ENEMY, vec![true_strike(50)]))
            .register(&mut world, Faction::Enemy);
        world.queue.push_back(BattleAction::new(knight, slash, vec![orc]));

        drain(&mut world).await;

        let events = world.events.events();
        assert!(events.contains(&BattleEvent::ActionSkipped {
            caster: orc,
            skill: "Riposte".to_string(),
            reason: SkipReason::Interrupted,
        }));
        assert!(world.registry.get(orc).is_some_and(|c| !c.is_interrupt_requested()));
        assert_eq!(world.registry.get(knight).map(|c| c.current_stats().hp), Some(100));
    }

    #[tokio::test]
    async fn test_attack_hooks_fire_in_order() {
        let mut world = scripted_world(vec![0, 99, 99]);
        let slash = active_skill("Slash", vec![damage(100)]);
        let knight = TestCombatantBuilder::new("Knight")
            .phys_attack(30)
            .skill(slash.clone())
            .skill(passive_skill("Momentum", ReactionTiming::OnAttack, ScopeType::SELF))
            .skill(passive_skill("Recover", ReactionTiming::PostAttack, ScopeType::SELF))
            .register(&mut world, Faction::Ally);
        let orc = TestCombatantBuilder::new("Orc")
            .skill(passive_skill("Brace", ReactionTiming::PreAttack, ScopeType::ENEMY))
            .skill(passive_skill("Harden", ReactionTiming::PreHit, ScopeType::SELF))
            .register(&mut world, Faction::Enemy);
        world.queue.push_back(BattleAction::new(knight, slash, vec![orc]));

        drain(&mut world).await;

        let triggered: Vec<(String, ReactionTiming, Option<_>)> = world
            .events
            .events()
            .iter()
            .filter_map(|e| match e {
                BattleEvent::ReactionTriggered { skill, timing, source, .. } => Some((skill.clone(), *timing, *source)),
                _ => None,
            })
            .collect();
        assert_eq!(
            triggered,
            vec![
                ("Brace".to_string(), ReactionTiming::PreAttack, Some(knight)),
                ("Harden".to_string(), ReactionTiming::PreHit, Some(knight)),
                ("Momentum".to_string(), ReactionTiming::OnAttack, Some(orc)),
                ("Recover".to_string(), ReactionTiming::PostAttack, None),
            ]
        );

        // The clean hit interrupted the Orc, which cancels the first of its
        // queued reactions and clears the flag for the next one.
        let events = world.events.events();
        assert!(events.contains(&BattleEvent::ActionSkipped {
            caster: orc,
            skill: "Brace".to_string(),
            reason: SkipReason::Interrupted,
        }));
        assert!(events.contains(&BattleEvent::SkillUsed {
            caster: orc,
            skill: "Harden".to_string(),
            targets: vec![orc],
            reaction: true,
        }));
    }

    #[tokio::test]
    async fn test_post_hit_reactions_fire_fastest_target_first() {
        // Arrange: three clean hits in target order slow, fast, fast.
        let mut world = scripted_world([0u8, 99, 99].repeat(3));
        let sweep = active_skill("Sweep", vec![damage(100)]);
        let knight = TestCombatantBuilder::new("Knight")
            .phys_attack(10)
            .skill(sweep.clone())
            .register(&mut world, Faction::Ally);
        let mut defender = |name: &str, speed: i32, grid: u8| {
            TestCombatantBuilder::new(name)
                .speed(speed)
                .grid(grid)
                .skill(passive_skill("Steady", ReactionTiming::PostHit, ScopeType::SELF))
                .register(&mut world, Faction::Enemy)
        };
        let slow = defender("Slow", 5, 1);
        let fast_a = defender("Fast A", 30, 2);
        let fast_b = defender("Fast B", 30, 3);
        world
            .queue
            .push_back(BattleAction::new(knight, sweep, vec![slow, fast_a, fast_b]));

        // Act
        drain(&mut world).await;

        // Assert: speed descending, ties kept in target order.
        let owners: Vec<_> = world
            .events
            .events()
            .iter()
            .filter_map(|e| match e {
                BattleEvent::ReactionTriggered {
                    owner,
                    timing: ReactionTiming::PostHit,
                    ..
                } => Some(*owner),
                _ => None,
            })
            .collect();
        assert_eq!(owners, vec![fast_a, fast_b, slow]);
    }
}
