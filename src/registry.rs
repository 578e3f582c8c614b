//! Ownership of every combatant in a battle, split into two rosters.

use schema::Faction;
use std::cell::OnceCell;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::combatant::{Combatant, CombatantId};

static NEXT_REGISTRY_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Arena of combatants plus per-faction rosters.
///
/// Combatants are never evicted; death only zeroes hp and consumers filter
/// on `is_alive`. The combined `all()` view is rebuilt lazily after each
/// registration.
#[derive(Debug, Clone)]
pub struct CombatantRegistry {
    combatants: Vec<Combatant>,
    allies: Vec<CombatantId>,
    enemies: Vec<CombatantId>,
    max_units_per_side: usize,
    all_cache: OnceCell<Vec<CombatantId>>,
    /// Stamped on every combatant registered here.
    token: u64,
}

impl CombatantRegistry {
    pub fn new(max_units_per_side: usize) -> Self {
        Self {
            combatants: Vec::new(),
            allies: Vec::new(),
            enemies: Vec::new(),
            max_units_per_side,
            all_cache: OnceCell::new(),
            token: NEXT_REGISTRY_TOKEN.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Adds a combatant to `faction`'s roster and returns its handle.
    ///
    /// Returns `None` (and changes nothing) when the roster is full or the
    /// combatant already carries a handle from this registry.
    pub fn register(&mut self, mut combatant: Combatant, faction: Faction) -> Option<CombatantId> {
        if combatant.registry_token() == Some(self.token) {
            tracing::warn!("{} is already registered as {}", combatant.name(), combatant.id());
            return None;
        }

        if self.by_faction(faction).len() >= self.max_units_per_side {
            tracing::warn!(
                "{} roster is full ({} units); {} was not registered",
                faction,
                self.max_units_per_side,
                combatant.name()
            );
            return None;
        }

        let id = CombatantId(self.combatants.len());
        combatant.assign_registration(id, faction, self.token);
        tracing::debug!("Registered {} as {} ({})", combatant.name(), id, faction);

        self.combatants.push(combatant);
        match faction {
            Faction::Ally => self.allies.push(id),
            Faction::Enemy => self.enemies.push(id),
        }
        self.all_cache = OnceCell::new();

        Some(id)
    }

    /// Allies first, then enemies, each in registration order.
    pub fn all(&self) -> &[CombatantId] {
        self.all_cache.get_or_init(|| {
            self.allies
                .iter()
                .chain(self.enemies.iter())
                .copied()
                .collect()
        })
    }

    pub fn by_faction(&self, faction: Faction) -> &[CombatantId] {
        match faction {
            Faction::Ally => &self.allies,
            Faction::Enemy => &self.enemies,
        }
    }

    pub fn get(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: CombatantId) -> Option<&mut Combatant> {
        self.combatants.get_mut(id.0)
    }

    /// Living members of `faction`, in roster order.
    pub fn survivors(&self, faction: Faction) -> impl Iterator<Item = &Combatant> {
        self.by_faction(faction)
            .iter()
            .filter_map(|id| self.get(*id))
            .filter(|combatant| combatant.is_alive())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Combatant> {
        self.all().iter().filter_map(|id| self.get(*id))
    }

    pub fn len(&self) -> usize {
        self.combatants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combatants.is_empty()
    }

    /// Display name for logs and formatted events.
    pub fn name_of(&self, id: CombatantId) -> &str {
        self.get(id).map(|combatant| combatant.name()).unwrap_or("<unknown>")
    }
}
