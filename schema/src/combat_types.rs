use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Which side of the battle a combatant fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum Faction {
    Ally,
    Enemy,
}

impl Faction {
    pub fn opponent(self) -> Faction {
        match self {
            Faction::Ally => Faction::Enemy,
            Faction::Enemy => Faction::Ally,
        }
    }
}

bitflags! {
    /// Character resources that skills spend, restore, set or compare.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ResourceType: u8 {
        const HP = 1 << 0;
        const MP = 1 << 1;
        const SP = 1 << 2;
    }
}

impl ResourceType {
    /// Single-resource flags in the order effects visit them.
    pub const ORDERED: [ResourceType; 3] = [ResourceType::HP, ResourceType::MP, ResourceType::SP];
}

bitflags! {
    /// Damage channels of an attack. An empty set means "untyped".
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct AttackType: u8 {
        const PHYSICAL = 1 << 0;
        const MAGIC = 1 << 1;
        const MIXED = Self::PHYSICAL.bits() | Self::MAGIC.bits();
    }
}

/// Delivery range of a skill or attack. `None` doubles as the wildcard in filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum RangeType {
    #[default]
    None,
    Melee,
    Ranged,
}

/// Outcome tag of a single attack resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum HitResult {
    #[default]
    None,
    Hit,
    Miss,
    Block,
    Critical,
}

impl HitResult {
    /// Hits that land in full and interrupt the defender's queued actions.
    pub fn interrupts(self) -> bool {
        matches!(self, HitResult::Hit | HitResult::Critical)
    }
}

bitflags! {
    /// Crowd-control states a combatant can be under.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct CrowdControl: u16 {
        const AIRBORNE = 1 << 0;
        const STUN = 1 << 1;
        const FREEZE = 1 << 2;
        const POISON = 1 << 3;
        const BURN = 1 << 4;
        const BLEED = 1 << 5;
        const SLOW = 1 << 6;
        const BLIND = 1 << 7;
        const SILENCE = 1 << 9;
    }
}

/// Six-way comparator used by resource checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum CompareType {
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    #[default]
    Equal,
    NotEqual,
}

impl CompareType {
    pub fn evaluate(self, source: i32, target: i32) -> bool {
        match self {
            CompareType::GreaterThan => source > target,
            CompareType::GreaterThanOrEqual => source >= target,
            CompareType::LessThan => source < target,
            CompareType::LessThanOrEqual => source <= target,
            CompareType::Equal => source == target,
            CompareType::NotEqual => source != target,
        }
    }

    /// Floating-point form; equality is approximate.
    pub fn evaluate_f32(self, source: f32, target: f32) -> bool {
        let approximately_equal = (source - target).abs() <= f32::EPSILON * 8.0 * source.abs().max(target.abs()).max(1.0);
        match self {
            CompareType::GreaterThan => source > target,
            CompareType::GreaterThanOrEqual => source >= target,
            CompareType::LessThan => source < target,
            CompareType::LessThanOrEqual => source <= target,
            CompareType::Equal => approximately_equal,
            CompareType::NotEqual => !approximately_equal,
        }
    }
}

/// Which participant of an execution context an effect acts on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetType {
    Caster,
    #[default]
    Target,
}

/// Hook points at which passive skills may fire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum ReactionTiming {
    #[default]
    None,

    // Attacker-side triggers
    PreAttack,  // Just before the attack lands (once)
    OnAttack,   // Each time an attack resolves (per target)
    PostAttack, // After the whole attack finished (once)

    // Defender-side triggers
    PreHit,  // Before mitigation and avoidance
    OnHit,   // After the hit was judged
    PostHit, // After all attack processing (counters etc.)
}

bitflags! {
    /// Target shape of a skill. Faction bits and shape bits combine freely.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ScopeType: u16 {
        const SELF = 1 << 0;
        const ALLY = 1 << 1;
        const PARTY = Self::SELF.bits() | Self::ALLY.bits();
        const ENEMY = 1 << 3;
        const ANY_FACTION = Self::PARTY.bits() | Self::ENEMY.bits();
        const SINGLE = 1 << 5;
        const MULTI = 1 << 6;
        const ROW = 1 << 7;
        const COLUMN = 1 << 8;
        const FRONTAL = 1 << 9;
        const ALL = 1 << 10;
    }
}

/// A transient rule that zeroes matching incoming damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImmunityRule {
    pub attack_type: AttackType,
    pub range_type: RangeType,
}

impl ImmunityRule {
    pub fn new(attack_type: AttackType, range_type: RangeType) -> Self {
        Self { attack_type, range_type }
    }

    /// Untyped attacks never match. An empty rule attack set or a `None`
    /// rule range acts as a wildcard for that axis.
    pub fn matches(&self, incoming_attack: AttackType, incoming_range: RangeType) -> bool {
        if incoming_attack.is_empty() {
            return false;
        }

        let attack_match = self.attack_type.is_empty() || self.attack_type.intersects(incoming_attack);
        let range_match = self.range_type == RangeType::None || self.range_type == incoming_range;

        attack_match && range_match
    }
}
