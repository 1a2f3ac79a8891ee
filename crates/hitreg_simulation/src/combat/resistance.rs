//! Процентные resistances по ключу (DamageType / AttackType).

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

/// Таблица resistances в процентах.
///
/// - 100% → урон 0
/// - иначе `damage - damage * pct * 0.01`
/// - ключа нет → урон без изменений
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ResistanceTable<K: Ord> {
    values: BTreeMap<K, f32>,
}

impl<K: Ord> Default for ResistanceTable<K> {
    fn default() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Copy> ResistanceTable<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: K, percent: f32) -> Self {
        self.insert(key, percent);
        self
    }

    pub fn insert(&mut self, key: K, percent: f32) {
        self.values.insert(key, percent);
    }

    /// Resistance для ключа (0 если нет).
    pub fn resistance(&self, key: K) -> f32 {
        self.values.get(&key).copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn calc_damage(&self, damage: f32, key: K) -> f32 {
        match self.values.get(&key) {
            None => damage,
            Some(&percent) if percent == 100.0 => 0.0,
            Some(&percent) => damage - damage * percent * 0.01,
        }
    }
}

impl<K: Ord + fmt::Display> fmt::Display for ResistanceTable<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.values.is_empty() {
            return write!(f, "empty");
        }
        for (key, percent) in &self.values {
            write!(f, "{}: {}% | ", key, percent)?;
        }
        Ok(())
    }
}
