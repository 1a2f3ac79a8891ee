//! Combat module: hit registration одной активации атаки.
//!
//! ECS ответственность:
//! - CombatVolumeManager: текущая атака, hit ledger, доставка данных
//! - Damageable / CombatCollider: capabilities ударяемых entities
//! - Events: VolumeOverlap (in), Struck (out)
//!
//! Вне ECS:
//! - detection volumes (trigger shapes, их активация по анимации)
//! - применение force / реакции на Struck

use bevy::prelude::*;

pub mod capability;
pub mod components;
pub mod hit_ledger;
pub mod resistance;
pub mod systems;
pub mod volume_manager;


// Re-export основных типов
pub use capability::{ColliderProbe, ColliderState, DamageReceiver, StrikeTarget};
pub use components::{CombatCollider, Damageable, Meter, Meters};
pub use hit_ledger::{
    GroupEntry, HitLedger, HitParticipant, HitRecord, HitRegistration, ParentLink, VolumeChannels,
};
pub use resistance::ResistanceTable;
pub use systems::{flush_hit_ledgers, process_volume_overlaps, roll_attack_damage, VolumeOverlap};
pub use volume_manager::{ActivationState, CombatVolumeConfig, CombatVolumeManager, Struck};

/// Combat Plugin
///
/// Регистрирует combat системы в FixedUpdate.
///
/// Порядок выполнения:
/// 1. flush_hit_ledgers: отложенный clear ledger'ов (окно атаки закрыто в прошлом тике)
/// 2. roll_attack_damage: roll RandomDamageData (DeterministicRng)
/// 3. process_volume_overlaps: VolumeOverlap → notify → Struck
pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        // Регистрация событий
        app.add_event::<VolumeOverlap>().add_event::<Struck>();
        app.init_resource::<crate::DeterministicRng>();

        app.add_systems(
            FixedUpdate,
            (flush_hit_ledgers, roll_attack_damage, process_volume_overlaps).chain(),
        );
    }
}
