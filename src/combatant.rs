use schema::{
    CrowdControl, Faction, ImmunityRule, ReactionTiming, ResourceCost, ResourceType,
    SkillDefinition, StatBlock,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub const MAX_EQUIPPED_SKILLS: usize = 10;

/// Stable handle of a registered combatant. Indexes the registry arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CombatantId(pub usize);

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A participant in the battle.
///
/// Read access is public; every mutation is crate-private so that state only
/// changes through the combat resolver and the effect engine.
#[derive(Debug, Clone)]
pub struct Combatant {
    id: CombatantId,
    /// Token of the registry that assigned `id`.
    registry_token: Option<u64>,
    name: String,
    faction: Faction,
    grid_index: u8,
    base_stats: StatBlock,
    current_stats: StatBlock,
    crowd_control: CrowdControl,
    immunities: Vec<ImmunityRule>,
    interrupt_requested: bool,
    defeated: bool,
    equipped_skills: [Option<Arc<SkillDefinition>>; MAX_EQUIPPED_SKILLS],
    cost_steepness: Option<f32>,
    cost_factor: Option<f32>,
}

impl Combatant {
    /// Creates a combatant whose base (and current) stats are `base_stats`.
    pub fn new(name: &str, base_stats: StatBlock) -> Self {
        Self {
            id: CombatantId(usize::MAX),
            registry_token: None,
            name: name.to_string(),
            faction: Faction::Ally,
            grid_index: 1,
            base_stats,
            current_stats: base_stats,
            crowd_control: CrowdControl::empty(),
            immunities: Vec::new(),
            interrupt_requested: false,
            defeated: false,
            equipped_skills: [const { None }; MAX_EQUIPPED_SKILLS],
            cost_steepness: None,
            cost_factor: None,
        }
    }

    pub fn with_grid_index(mut self, grid_index: u8) -> Self {
        self.grid_index = grid_index;
        self
    }

    /// Folds an equipment bonus into both base and current stats.
    pub fn with_equipment(mut self, bonus: StatBlock) -> Self {
        self.base_stats = self.base_stats + bonus;
        self.current_stats = self.current_stats + bonus;
        self
    }

    /// Overrides the starting current stats (base stats stay the maximum).
    pub fn with_current_stats(mut self, current: StatBlock) -> Self {
        self.current_stats = current;
        self
    }

    /// Equips a skill into the first free slot. Extra skills beyond capacity are dropped.
    pub fn with_skill(mut self, skill: Arc<SkillDefinition>) -> Self {
        match self.equipped_skills.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => *slot = Some(skill),
            None => tracing::warn!(
                "{} has no free skill slot; '{}' was not equipped",
                self.name,
                skill.name
            ),
        }
        self
    }

    pub fn with_cost_curve(mut self, steepness: f32, factor: f32) -> Self {
        self.cost_steepness = Some(steepness);
        self.cost_factor = Some(factor);
        self
    }

    // --- Read access ---

    pub fn id(&self) -> CombatantId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn faction(&self) -> Faction {
        self.faction
    }

    pub fn grid_index(&self) -> u8 {
        self.grid_index
    }

    pub fn base_stats(&self) -> &StatBlock {
        &self.base_stats
    }

    pub fn current_stats(&self) -> &StatBlock {
        &self.current_stats
    }

    pub fn crowd_control(&self) -> CrowdControl {
        self.crowd_control
    }

    pub fn immunities(&self) -> &[ImmunityRule] {
        &self.immunities
    }

    pub fn is_alive(&self) -> bool {
        self.current_stats.hp > 0
    }

    pub fn is_interrupt_requested(&self) -> bool {
        self.interrupt_requested
    }

    pub fn is_defeated(&self) -> bool {
        self.defeated
    }

    pub fn equipped_skills(&self) -> impl Iterator<Item = &Arc<SkillDefinition>> {
        self.equipped_skills.iter().flatten()
    }

    /// Equipped passives that fire at `timing`, in slot order.
    pub fn reactions_at(&self, timing: ReactionTiming) -> impl Iterator<Item = &Arc<SkillDefinition>> {
        self.equipped_skills()
            .filter(move |skill| skill.reaction_timing() == Some(timing))
    }

    /// Whether any immunity rule matches the incoming attack.
    pub fn is_immune(&self, attack_type: schema::AttackType, range_type: schema::RangeType) -> bool {
        self.immunities
            .iter()
            .any(|rule| rule.matches(attack_type, range_type))
    }

    /// Progressive price of `skill`: the k-th costed record adds `floor(k^steepness * factor)`
    /// on top of each of its non-zero base costs.
    pub fn progressive_cost(&self, skill: &SkillDefinition, default_steepness: f32, default_factor: f32) -> ResourceCost {
        let steepness = self.cost_steepness.unwrap_or(default_steepness);
        let factor = self.cost_factor.unwrap_or(default_factor);

        let mut total = ResourceCost::default();
        let mut index = 0;
        for record in skill.records() {
            if record.cost.is_zero() {
                continue;
            }

            total.hp += progressive_step(record.cost.hp, index, steepness, factor);
            total.sp += progressive_step(record.cost.sp, index, steepness, factor);
            total.mp += progressive_step(record.cost.mp, index, steepness, factor);
            index += 1;
        }

        total
    }

    pub fn can_afford(&self, cost: &ResourceCost) -> bool {
        self.current_stats.hp >= cost.hp && self.current_stats.sp >= cost.sp && self.current_stats.mp >= cost.mp
    }

    /// Whether any equipped Active skill is affordable at its plain base cost.
    pub fn has_enough_resource_for_any_active_skill(&self) -> bool {
        self.equipped_skills()
            .filter(|skill| skill.is_active())
            .any(|skill| self.can_afford(&skill.base_cost()))
    }

    // --- Mutation (crate-private) ---

    pub(crate) fn registry_token(&self) -> Option<u64> {
        self.registry_token
    }

    pub(crate) fn assign_registration(&mut self, id: CombatantId, faction: Faction, registry_token: u64) {
        self.id = id;
        self.registry_token = Some(registry_token);
        self.faction = faction;
    }

    /// Subtracts `damage` (negative amounts count as 0) and floors hp at 0.
    /// Returns the hp actually removed.
    pub(crate) fn apply_damage(&mut self, damage: i32) -> i32 {
        let damage = damage.max(0);
        let before = self.current_stats.hp;
        self.current_stats.hp = (before - damage).max(0);
        before - self.current_stats.hp
    }

    /// Adds a signed delta to one resource and returns the applied delta.
    ///
    /// Without overheal a gain stops at the base maximum, but a value that is
    /// already above it is left alone. Results never drop below 0.
    pub(crate) fn restore_resource(&mut self, resource: ResourceType, delta: i32, allow_overheal: bool) -> i32 {
        let current = self.current_stats.resource(resource);
        let max = self.base_stats.resource(resource);

        let mut next = current + delta;
        if delta > 0 && !allow_overheal {
            next = next.min(max.max(current));
        }
        let next = next.max(0);

        self.current_stats.set_resource(resource, next);
        next - current
    }

    pub(crate) fn add_crowd_control(&mut self, flags: CrowdControl) {
        self.crowd_control |= flags;
    }

    pub(crate) fn set_interrupt_requested(&mut self, requested: bool) {
        self.interrupt_requested = requested;
    }

    /// Adds a rule unless an identical one is already present.
    pub(crate) fn add_immunity(&mut self, rule: ImmunityRule) -> bool {
        if self.immunities.contains(&rule) {
            return false;
        }
        self.immunities.push(rule);
        true
    }

    pub(crate) fn clear_immunities(&mut self) {
        self.immunities.clear();
    }

    /// Deducts `cost` if affordable. Nothing is deducted otherwise.
    pub(crate) fn pay(&mut self, cost: &ResourceCost) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        self.current_stats.hp -= cost.hp;
        self.current_stats.sp -= cost.sp;
        self.current_stats.mp -= cost.mp;
        true
    }

    pub(crate) fn mark_defeated(&mut self) -> bool {
        let newly_defeated = !self.defeated;
        self.defeated = true;
        newly_defeated
    }
}

fn progressive_step(base_cost: i32, index: i32, steepness: f32, factor: f32) -> i32 {
    if base_cost == 0 {
        return 0;
    }
    if index <= 0 {
        return base_cost;
    }

    let multiplier = (index as f32).powf(steepness);
    base_cost + (multiplier * factor) as i32
}
