use std::collections::HashMap;

use crate::config::ReserveEntry;
use crate::types::AmmoType;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Magazine {
    count: u32,
    capacity: u32,
}

impl Magazine {
    pub fn new(capacity: u32) -> Self {
        Self {
            count: capacity,
            capacity,
        }
    }

    pub fn with_count(capacity: u32, count: u32) -> Self {
        Self {
            count: count.min(capacity),
            capacity,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count >= self.capacity
    }

    pub fn missing(&self) -> u32 {
        self.capacity - self.count
    }

    /// Removes one round. Returns false when the magazine was already empty.
    pub fn consume_round(&mut self) -> bool {
        if self.count == 0 {
            return false;
        }
        self.count -= 1;
        true
    }

    fn load(&mut self, rounds: u32) {
        self.count = (self.count + rounds).min(self.capacity);
    }
}

/// Rounds carried per ammo type, shared by every weapon in the loadout.
#[derive(Clone, Debug, Default)]
pub struct AmmoReserve {
    rounds: HashMap<AmmoType, u32>,
}

impl AmmoReserve {
    pub fn from_entries(entries: &[ReserveEntry]) -> Self {
        let mut reserve = Self::default();
        for entry in entries {
            reserve.add(entry.ammo, entry.rounds);
        }
        reserve
    }

    pub fn get(&self, ammo: AmmoType) -> u32 {
        self.rounds.get(&ammo).copied().unwrap_or(0)
    }

    pub fn set(&mut self, ammo: AmmoType, rounds: u32) {
        self.rounds.insert(ammo, rounds);
    }

    pub fn add(&mut self, ammo: AmmoType, rounds: u32) {
        let entry = self.rounds.entry(ammo).or_insert(0);
        *entry = entry.saturating_add(rounds);
    }

    /// Removes up to `rounds` and returns how many were actually taken.
    pub fn take(&mut self, ammo: AmmoType, rounds: u32) -> u32 {
        let entry = self.rounds.entry(ammo).or_insert(0);
        let taken = rounds.min(*entry);
        *entry -= taken;
        taken
    }
}

pub fn can_reload(magazine: &Magazine, reserve: &AmmoReserve, ammo: AmmoType) -> bool {
    !magazine.is_full() && reserve.get(ammo) > 0
}

/// Tops the magazine up from the reserve and returns the rounds moved.
pub fn transfer(magazine: &mut Magazine, reserve: &mut AmmoReserve, ammo: AmmoType) -> u32 {
    let moved = reserve.take(ammo, magazine.missing());
    magazine.load(moved);
    moved
}
