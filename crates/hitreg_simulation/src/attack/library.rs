//! Attack library: combo-последовательности атак актёра.
//!
//! `AttackSequence` отдаёт атаку по `AttackType` и текущему combo index.
//! Каждая атака (`AttackBody`): animation clip + готовый `AttackComposite`.
//!
//! Composite собирается один раз при построении sequence через
//! `AttackDefinition::attack_info(owner)`.

use std::collections::BTreeMap;

use bevy::prelude::*;

use super::composite::AttackComposite;
use super::data::AttackType;

/// Ключ атаки в sequence: тип ввода + позиция в combo.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Reflect)]
pub struct AttackKey {
    pub attack_type: AttackType,
    pub index: u32,
}

impl AttackKey {
    pub fn new(attack_type: AttackType, index: u32) -> Self {
        Self { attack_type, index }
    }
}

/// Атака: clip для анимации + payload'ы.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttackBody {
    pub clip: Option<String>,
    pub attack: AttackComposite,
}

impl AttackBody {
    pub fn new(clip: Option<String>, attack: AttackComposite) -> Self {
        Self { clip, attack }
    }

    /// Имя clip'а или `"Null"`.
    pub fn anim_name(&self) -> &str {
        self.clip.as_deref().unwrap_or("Null")
    }
}

/// Источник composite для атаки (authored данные, script, closure).
///
/// `owner`: entity атакующего, пишется в `instigator` payload'ов.
pub trait AttackDefinition {
    fn attack_info(&self, owner: Entity) -> AttackComposite;
}

impl<F> AttackDefinition for F
where
    F: Fn(Entity) -> AttackComposite,
{
    fn attack_info(&self, owner: Entity) -> AttackComposite {
        self(owner)
    }
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum AttackSequenceError {
    #[error("Duplicate attack key {attack_type} #{index}")]
    DuplicateKey { attack_type: AttackType, index: u32 },
}

/// Combo sequence атак.
///
/// # Index
/// - `get_attack` берёт атаку по `(attack_type, current_index)`
/// - при успехе index сдвигается
/// - если index вышел за максимальный → снова 0
/// - отсутствующий ключ не сдвигает index
#[derive(Component, Clone, Debug, Default)]
pub struct AttackSequence {
    attacks: BTreeMap<AttackKey, AttackBody>,
    current_index: u32,
    max_index: u32,
}

impl AttackSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Собирает sequence из definitions для `owner`.
    pub fn from_definitions<'a, I>(owner: Entity, definitions: I) -> Result<Self, AttackSequenceError>
    where
        I: IntoIterator<Item = (AttackKey, Option<String>, &'a dyn AttackDefinition)>,
    {
        let mut sequence = Self::new();
        for (key, clip, definition) in definitions {
            sequence.insert(key, AttackBody::new(clip, definition.attack_info(owner)))?;
        }
        Ok(sequence)
    }

    pub fn insert(&mut self, key: AttackKey, body: AttackBody) -> Result<(), AttackSequenceError> {
        if self.attacks.contains_key(&key) {
            return Err(AttackSequenceError::DuplicateKey {
                attack_type: key.attack_type,
                index: key.index,
            });
        }

        self.max_index = self.max_index.max(key.index);
        self.attacks.insert(key, body);
        Ok(())
    }

    /// Следующая атака combo для `attack_type`.
    pub fn get_attack(&mut self, attack_type: AttackType) -> Option<&AttackBody> {
        if self.current_index > self.max_index {
            self.current_index = 0;
        }

        let key = AttackKey::new(attack_type, self.current_index);
        let body = self.attacks.get(&key)?;
        self.current_index += 1;
        Some(body)
    }

    pub fn reset_index(&mut self) {
        self.current_index = 0;
    }

    pub fn current_index(&self) -> u32 {
        self.current_index
    }

    pub fn max_index(&self) -> u32 {
        self.max_index
    }

    pub fn len(&self) -> usize {
        self.attacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attacks.is_empty()
    }
}
