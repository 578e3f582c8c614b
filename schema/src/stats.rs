use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

use crate::combat_types::ResourceType;

/// Integer stat block shared by base stats, equipment bonuses and current stats.
///
/// Fields are never clamped here; debuffs may legitimately push derived
/// rates below zero. Only hp is floored, and only by the damage routine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatBlock {
    pub hp: i32,
    pub sp: i32, // Spent by physical skills
    pub mp: i32, // Spent by magic skills
    pub phys_attack: i32,
    pub magic_attack: i32,
    pub phys_defense: i32,
    pub magic_defense: i32,
    pub speed: i32,
    pub dodge_rate: i32,
    pub accuracy_rate: i32,
    pub critical_rate: i32,
    pub critical_damage_rate: i32,
    pub block_rate: i32,
    pub block_damage_reduce_rate: i32,
}

impl StatBlock {
    /// Current value of a single resource. Multi-bit or empty masks read as 0.
    pub fn resource(&self, resource: ResourceType) -> i32 {
        if resource == ResourceType::HP {
            self.hp
        } else if resource == ResourceType::SP {
            self.sp
        } else if resource == ResourceType::MP {
            self.mp
        } else {
            0
        }
    }

    pub fn set_resource(&mut self, resource: ResourceType, value: i32) {
        if resource == ResourceType::HP {
            self.hp = value;
        } else if resource == ResourceType::SP {
            self.sp = value;
        } else if resource == ResourceType::MP {
            self.mp = value;
        }
    }
}

impl Add for StatBlock {
    type Output = StatBlock;

    fn add(self, rhs: StatBlock) -> StatBlock {
        StatBlock {
            hp: self.hp + rhs.hp,
            sp: self.sp + rhs.sp,
            mp: self.mp + rhs.mp,
            phys_attack: self.phys_attack + rhs.phys_attack,
            magic_attack: self.magic_attack + rhs.magic_attack,
            phys_defense: self.phys_defense + rhs.phys_defense,
            magic_defense: self.magic_defense + rhs.magic_defense,
            speed: self.speed + rhs.speed,
            dodge_rate: self.dodge_rate + rhs.dodge_rate,
            accuracy_rate: self.accuracy_rate + rhs.accuracy_rate,
            critical_rate: self.critical_rate + rhs.critical_rate,
            critical_damage_rate: self.critical_damage_rate + rhs.critical_damage_rate,
            block_rate: self.block_rate + rhs.block_rate,
            block_damage_reduce_rate: self.block_damage_reduce_rate + rhs.block_damage_reduce_rate,
        }
    }
}

impl Sub for StatBlock {
    type Output = StatBlock;

    fn sub(self, rhs: StatBlock) -> StatBlock {
        StatBlock {
            hp: self.hp - rhs.hp,
            sp: self.sp - rhs.sp,
            mp: self.mp - rhs.mp,
            phys_attack: self.phys_attack - rhs.phys_attack,
            magic_attack: self.magic_attack - rhs.magic_attack,
            phys_defense: self.phys_defense - rhs.phys_defense,
            magic_defense: self.magic_defense - rhs.magic_defense,
            speed: self.speed - rhs.speed,
            dodge_rate: self.dodge_rate - rhs.dodge_rate,
            accuracy_rate: self.accuracy_rate - rhs.accuracy_rate,
            critical_rate: self.critical_rate - rhs.critical_rate,
            critical_damage_rate: self.critical_damage_rate - rhs.critical_damage_rate,
            block_rate: self.block_rate - rhs.block_rate,
            block_damage_reduce_rate: self.block_damage_reduce_rate - rhs.block_damage_reduce_rate,
        }
    }
}
