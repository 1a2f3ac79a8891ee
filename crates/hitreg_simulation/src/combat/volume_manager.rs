//! CombatVolumeManager: одна активация атаки.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──set_current_attack──► Armed ──enable_sending(true)──► Active
//!  ▲                                                            │
//!  └──────────────── enable_sending(false) ─────────────────────┘
//!                    (ledger clear откладывается до begin_tick)
//! ```
//!
//! Detection volumes (вне ECS) сообщают overlap'ы через `notify`.
//! Manager решает по `HitLedger`, новая ли это доставка, фильтрует composite
//! по каналу volume'а и отдаёт копию цели.

use bevy::prelude::*;
use serde::Deserialize;

use super::capability::{ColliderState, StrikeTarget};
use super::hit_ledger::{HitLedger, HitParticipant};
use crate::attack::{AttackComposite, VolumeType};
use crate::logger;

/// Настройки manager'а.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CombatVolumeConfig {
    /// Hurtbox volumes шлют damage, Pushbox шлют force.
    /// `false` → каждый volume шлёт весь composite.
    pub filter_data: bool,
    pub log_detections: bool,
    pub log_activation: bool,
    pub log_returned_composite: bool,
    /// `enable_sending(true)` сразу выполняет отложенный clear ledger'а.
    pub flush_stale_ledger_on_enable: bool,
}

impl Default for CombatVolumeConfig {
    fn default() -> Self {
        Self {
            filter_data: true,
            log_detections: false,
            log_activation: false,
            log_returned_composite: false,
            flush_stale_ledger_on_enable: false,
        }
    }
}

/// Цель получила удар (с доставкой данных или без).
///
/// `applied`: composite после resistances цели; `None`, если данные не
/// доставлялись (повторный удар, нет damage capability).
#[derive(Event, Clone, Debug)]
pub struct Struck {
    pub attacker: Entity,
    pub target: Entity,
    pub collider_state: ColliderState,
    pub applied: Option<AttackComposite>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivationState {
    Idle,
    Armed,
    Active,
}

/// Coordinator активации атаки (висит на атакующем).
#[derive(Component, Clone, Debug)]
pub struct CombatVolumeManager {
    owner: Entity,
    config: CombatVolumeConfig,
    hit_ledger: HitLedger,
    current_attack: Option<AttackComposite>,
    keep_attack: bool,
    sending_enabled: bool,
    pending_clear: bool,
    hit_non_attackable: bool,
}

impl CombatVolumeManager {
    pub fn new(owner: Entity, config: CombatVolumeConfig) -> Self {
        Self {
            owner,
            hit_ledger: HitLedger::new(config.filter_data),
            config,
            current_attack: None,
            keep_attack: false,
            sending_enabled: false,
            pending_clear: false,
            hit_non_attackable: false,
        }
    }

    /// Ставит атаку. `keep_attack`: не сбрасывать её при `enable_sending(false)`.
    pub fn set_current_attack(&mut self, attack: AttackComposite, keep_attack: bool) {
        self.current_attack = Some(attack);
        self.keep_attack = keep_attack;
    }

    /// Включает/выключает доставку.
    ///
    /// Выключение планирует clear ledger'а на следующий `begin_tick`:
    /// в этом кадре ledger ещё можно читать.
    pub fn enable_sending(&mut self, enabled: bool) {
        self.sending_enabled = enabled;

        if enabled {
            if self.config.flush_stale_ledger_on_enable && self.pending_clear {
                self.begin_tick();
            }
        } else {
            self.pending_clear = true;
            if !self.keep_attack {
                self.current_attack = None;
            }
        }

        if self.config.log_activation {
            match &self.current_attack {
                Some(attack) => logger::log(&format!(
                    "{} enabled: {}  with attack: {}",
                    self.owner, enabled, attack
                )),
                None => logger::log(&format!(
                    "{} enabled: {}  with attack: null",
                    self.owner, enabled
                )),
            }
        }
    }

    pub fn state(&self) -> ActivationState {
        match (&self.current_attack, self.sending_enabled) {
            (Some(_), true) => ActivationState::Active,
            (Some(_), false) => ActivationState::Armed,
            (None, _) => ActivationState::Idle,
        }
    }

    /// Выполняет отложенный clear (начало тика).
    pub fn begin_tick(&mut self) {
        if self.pending_clear {
            self.hit_ledger.clear();
            self.pending_clear = false;
            self.hit_non_attackable = false;
        }
    }

    pub fn has_pending_clear(&self) -> bool {
        self.pending_clear
    }

    /// Volume `volume` пересёкся с `target`.
    ///
    /// Возвращает `Struck` для каждого overlap'а в Active состоянии
    /// (кроме удара по самому себе).
    pub fn notify(&mut self, target: &mut dyn StrikeTarget, volume: VolumeType) -> Option<Struck> {
        let target_entity = target.entity();
        if target_entity == self.owner || !self.sending_enabled {
            return None;
        }
        let attack = self.current_attack.as_ref()?;

        let collider = target.combat_collider();
        let collider_state = collider.map_or(ColliderState::None, |probe| probe.state);
        let log_detections = self.config.log_detections;

        let applied = match target.damage_receiver() {
            Some(receiver) => {
                let registration = self.hit_ledger.register_participant(
                    HitParticipant {
                        entity: receiver.entity(),
                        group_id: receiver.group_id(),
                        parent: receiver.parent(),
                    },
                    volume,
                );

                if log_detections {
                    logger::log(&format!(
                        "OnDetectHit {}. Collider: {} | DamageReceiver: {}\n\t{}",
                        target_entity,
                        collider_state,
                        registration.describe(),
                        self.hit_ledger
                    ));
                }

                if registration.is_new() {
                    let delivery = if self.config.filter_data {
                        attack.sub_composite_for(volume)
                    } else {
                        attack.deep_copy()
                    };

                    if log_detections {
                        logger::log(&format!("From {} {}", volume, delivery));
                    }
                    receiver.apply_damage(delivery)
                } else {
                    None
                }
            }
            None => {
                match collider {
                    // Collider без damage capability: только для дедупликации
                    Some(probe) => {
                        self.hit_ledger.register_non_capable(probe.entity);
                    }
                    None => {
                        self.hit_non_attackable |= self.hit_ledger.register_non_capable(target_entity);
                    }
                }

                if log_detections {
                    let reason = if collider.is_some() {
                        format!("Collider: {}", collider_state)
                    } else {
                        "Does not have a usable capability.".to_string()
                    };
                    logger::log(&format!(
                        "OnDetectHit {}. {}\n\t{}",
                        target_entity, reason, self.hit_ledger
                    ));
                }
                None
            }
        };

        if self.config.log_returned_composite {
            match &applied {
                Some(composite) => logger::log(&format!(
                    "{} Returned Composite: {}",
                    target_entity, composite
                )),
                None => logger::log(&format!("{} Returned Composite: null", target_entity)),
            }
        }

        Some(Struck {
            attacker: self.owner,
            target: target_entity,
            collider_state,
            applied,
        })
    }

    pub fn owner(&self) -> Entity {
        self.owner
    }

    pub fn config(&self) -> &CombatVolumeConfig {
        &self.config
    }

    pub fn hit_ledger(&self) -> &HitLedger {
        &self.hit_ledger
    }

    pub fn current_attack(&self) -> Option<&AttackComposite> {
        self.current_attack.as_ref()
    }

    pub fn current_attack_mut(&mut self) -> Option<&mut AttackComposite> {
        self.current_attack.as_mut()
    }

    pub fn is_sending_enabled(&self) -> bool {
        self.sending_enabled
    }

    /// Был ли в этом окне удар по чему-то без capabilities.
    pub fn hit_non_attackable(&self) -> bool {
        self.hit_non_attackable
    }
}
