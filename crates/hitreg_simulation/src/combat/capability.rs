//! Capabilities ударяемой цели.
//!
//! Цель может:
//! - принимать урон (`DamageReceiver`)
//! - иметь combat collider (block / parry / attack)
//! - ни то, ни другое (стена, проп)
//!
//! `StrikeTarget` объединяет оба optional lookup'а: coordinator спрашивает
//! capabilities, а не тип цели.

use std::fmt;

use bevy::prelude::*;

use super::hit_ledger::ParentLink;
use crate::attack::AttackComposite;

/// Состояние combat collider'а в момент удара.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Reflect)]
pub enum ColliderState {
    #[default]
    None,
    Block,
    Parry,
    Attack,
}

impl fmt::Display for ColliderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Результат lookup'а collider capability.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColliderProbe {
    pub entity: Entity,
    pub state: ColliderState,
}

/// Принимает данные атаки.
pub trait DamageReceiver {
    fn entity(&self) -> Entity;

    /// Группа (часть тела), по которой пришёл удар.
    fn group_id(&self) -> &str;

    /// Актёр, к которому прикреплена часть (если есть).
    fn parent(&self) -> Option<&ParentLink>;

    /// Применяет атаку, возвращает фактически применённые данные
    /// (после resistances) или `None`.
    fn apply_damage(&mut self, attack: AttackComposite) -> Option<AttackComposite>;
}

/// Ударяемая цель.
pub trait StrikeTarget {
    fn entity(&self) -> Entity;

    fn damage_receiver(&mut self) -> Option<&mut dyn DamageReceiver>;

    fn combat_collider(&self) -> Option<ColliderProbe>;
}
