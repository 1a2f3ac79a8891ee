//! Combat systems: overlap'ы от detection volumes → CombatVolumeManager.
//!
//! Detection (физика / engine triggers) живёт вне ECS и шлёт `VolumeOverlap`.
//! Порядок в FixedUpdate:
//! 1. `flush_hit_ledgers`: отложенный clear с прошлого тика
//! 2. `roll_attack_damage`: RandomDamageData текущих атак
//! 3. `process_volume_overlaps`: notify + `Struck` events

use bevy::ecs::entity::Entities;
use bevy::prelude::*;

use super::capability::{ColliderProbe, DamageReceiver, StrikeTarget};
use super::components::{CombatCollider, Damageable};
use super::hit_ledger::ParentLink;
use super::volume_manager::{CombatVolumeManager, Struck};
use crate::attack::{AttackComposite, VolumeType};
use crate::DeterministicRng;

/// Event: volume manager'а `manager` пересёкся с `target`.
#[derive(Event, Clone, Copy, Debug)]
pub struct VolumeOverlap {
    pub manager: Entity,
    pub target: Entity,
    pub volume: VolumeType,
}

/// System: выполняет отложенные clear'ы ledger'ов.
pub fn flush_hit_ledgers(mut managers: Query<&mut CombatVolumeManager>) {
    for mut manager in managers.iter_mut() {
        // Без pending clear не трогаем (change detection)
        if manager.has_pending_clear() {
            manager.begin_tick();
        }
    }
}

/// System: roll random damage текущих атак (один раз на атаку).
pub fn roll_attack_damage(
    mut managers: Query<&mut CombatVolumeManager>,
    mut rng: ResMut<DeterministicRng>,
) {
    for mut manager in managers.iter_mut() {
        let needs_roll = manager
            .current_attack()
            .is_some_and(AttackComposite::has_unrolled_damage);
        if !needs_roll {
            continue;
        }

        if let Some(attack) = manager.current_attack_mut() {
            attack.roll_random_damage(&mut rng.rng);
        }
    }
}

/// System: обработка overlap'ов.
///
/// - target despawned → overlap игнорируется
/// - manager не найден → warning
pub fn process_volume_overlaps(
    mut overlaps: EventReader<VolumeOverlap>,
    mut managers: Query<&mut CombatVolumeManager>,
    damageables: Query<&Damageable>,
    colliders: Query<&CombatCollider>,
    entities: &Entities,
    mut struck_events: EventWriter<Struck>,
) {
    for overlap in overlaps.read() {
        if !entities.contains(overlap.target) {
            continue;
        }

        let Ok(mut manager) = managers.get_mut(overlap.manager) else {
            crate::logger::log_warning(&format!(
                "VolumeOverlap: entity {:?} has no CombatVolumeManager",
                overlap.manager
            ));
            continue;
        };

        let mut target = EntityStrikeTarget::resolve(overlap.target, &damageables, &colliders);
        if let Some(struck) = manager.notify(&mut target, overlap.volume) {
            struck_events.write(struck);
        }
    }
}

/// `Damageable` как `DamageReceiver` (с resolved parent link).
struct DamageableReceiver<'a> {
    entity: Entity,
    damageable: &'a Damageable,
    parent: Option<ParentLink>,
}

impl DamageReceiver for DamageableReceiver<'_> {
    fn entity(&self) -> Entity {
        self.entity
    }

    fn group_id(&self) -> &str {
        &self.damageable.group_id
    }

    fn parent(&self) -> Option<&ParentLink> {
        self.parent.as_ref()
    }

    fn apply_damage(&mut self, attack: AttackComposite) -> Option<AttackComposite> {
        self.damageable.apply_damage(attack)
    }
}

/// Entity + её combat components.
struct EntityStrikeTarget<'a> {
    entity: Entity,
    receiver: Option<DamageableReceiver<'a>>,
    collider: Option<ColliderProbe>,
}

impl<'a> EntityStrikeTarget<'a> {
    fn resolve(
        entity: Entity,
        damageables: &'a Query<&Damageable>,
        colliders: &Query<&CombatCollider>,
    ) -> Self {
        let receiver = damageables.get(entity).ok().map(|damageable| {
            // group_id parent'а есть только если parent сам Damageable
            let parent = damageable.parent.map(|parent| ParentLink {
                entity: parent,
                group_id: damageables
                    .get(parent)
                    .ok()
                    .map(|parent_damageable| parent_damageable.group_id.clone()),
            });

            DamageableReceiver {
                entity,
                damageable,
                parent,
            }
        });

        let collider = colliders.get(entity).ok().map(|collider| ColliderProbe {
            entity,
            state: collider.state,
        });

        Self {
            entity,
            receiver,
            collider,
        }
    }
}

impl StrikeTarget for EntityStrikeTarget<'_> {
    fn entity(&self) -> Entity {
        self.entity
    }

    fn damage_receiver(&mut self) -> Option<&mut dyn DamageReceiver> {
        self.receiver
            .as_mut()
            .map(|receiver| receiver as &mut dyn DamageReceiver)
    }

    fn combat_collider(&self) -> Option<ColliderProbe> {
        self.collider
    }
}
