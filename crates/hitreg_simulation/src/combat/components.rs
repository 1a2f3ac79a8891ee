//! Combat components на ударяемых entities.

use bevy::prelude::*;
use serde::Deserialize;

use super::capability::ColliderState;
use super::resistance::ResistanceTable;
use crate::attack::{AttackComposite, AttackDataKind, AttackType, DamageData, DamageType};

/// Damage capability: entity принимает данные атаки.
///
/// Может висеть на самом актёре или на его части (hitbox руки, головы).
/// Для части `parent` указывает на актёра: ledger считает удары по
/// актёру целиком, разделяя их по `group_id`.
///
/// Resistances применяются к каждому damage payload'у:
/// сначала по DamageType, затем по AttackType.
#[derive(Component, Clone, Debug)]
pub struct Damageable {
    pub group_id: String,
    pub parent: Option<Entity>,
    pub attack_type_resistance: ResistanceTable<AttackType>,
    pub damage_type_resistance: ResistanceTable<DamageType>,
}

impl Default for Damageable {
    fn default() -> Self {
        Self {
            group_id: "null".to_string(),
            parent: None,
            attack_type_resistance: ResistanceTable::new(),
            damage_type_resistance: ResistanceTable::new(),
        }
    }
}

impl Damageable {
    pub fn new(group_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            ..Default::default()
        }
    }

    /// Часть актёра `parent`.
    pub fn part_of(group_id: impl Into<String>, parent: Entity) -> Self {
        Self {
            group_id: group_id.into(),
            parent: Some(parent),
            ..Default::default()
        }
    }

    pub fn with_damage_resistance(mut self, damage_type: DamageType, percent: f32) -> Self {
        self.damage_type_resistance.insert(damage_type, percent);
        self
    }

    pub fn with_attack_resistance(mut self, attack_type: AttackType, percent: f32) -> Self {
        self.attack_type_resistance.insert(attack_type, percent);
        self
    }

    /// Применяет resistances к damage payload'ам.
    ///
    /// Пустой composite → `None` (применять нечего).
    pub fn apply_damage(&self, mut attack: AttackComposite) -> Option<AttackComposite> {
        if attack.is_empty() {
            return None;
        }

        attack.update_each(|data| {
            if let Some(damage) = DamageData::narrow_mut(data) {
                self.adjust(damage);
            }
        });

        Some(attack)
    }

    fn adjust(&self, damage: &mut DamageData) {
        let attack_type = damage.attack_type();
        for (damage_type, value) in damage.values_mut().iter_mut() {
            let mut adjusted = *value;
            if !self.damage_type_resistance.is_empty() {
                adjusted = self.damage_type_resistance.calc_damage(adjusted, *damage_type);
            }
            if !self.attack_type_resistance.is_empty() {
                adjusted = self.attack_type_resistance.calc_damage(adjusted, attack_type);
            }
            *value = adjusted;
        }
    }
}

/// Combat collider: оружие / щит, которым можно блокировать или парировать.
#[derive(Component, Clone, Copy, Debug, Default, Reflect)]
#[reflect(Component)]
pub struct CombatCollider {
    pub state: ColliderState,
}

impl CombatCollider {
    pub fn new(state: ColliderState) -> Self {
        Self { state }
    }
}

/// Шкала с id: HP, щит и т.п.
///
/// `start_at_max` (по умолчанию) → после создания/загрузки `current == max`,
/// иначе шкала стартует с нуля.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(from = "MeterConfig")]
pub struct Meter {
    id: String,
    max_value: f32,
    start_at_max: bool,
    current_value: f32,
}

#[derive(Deserialize)]
struct MeterConfig {
    id: String,
    max_value: f32,
    #[serde(default = "default_start_at_max")]
    start_at_max: bool,
}

fn default_start_at_max() -> bool {
    true
}

impl From<MeterConfig> for Meter {
    fn from(config: MeterConfig) -> Self {
        let mut meter = Self {
            id: config.id,
            max_value: config.max_value,
            start_at_max: config.start_at_max,
            current_value: 0.0,
        };
        meter.initialize();
        meter
    }
}

impl Meter {
    pub fn new(id: impl Into<String>, max_value: f32) -> Self {
        Self::from(MeterConfig {
            id: id.into(),
            max_value,
            start_at_max: true,
        })
    }

    pub fn starting_empty(id: impl Into<String>, max_value: f32) -> Self {
        Self::from(MeterConfig {
            id: id.into(),
            max_value,
            start_at_max: false,
        })
    }

    /// Начальное значение: max при `start_at_max`, иначе не трогаем.
    pub fn initialize(&mut self) {
        if self.start_at_max {
            self.current_value = self.max_value;
        }
    }

    pub fn reset_value(&mut self) {
        self.current_value = self.max_value;
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn max_value(&self) -> f32 {
        self.max_value
    }

    pub fn set_max_value(&mut self, max_value: f32) {
        self.max_value = max_value;
    }

    pub fn current_value(&self) -> f32 {
        self.current_value
    }

    pub fn set_current_value(&mut self, value: f32) {
        self.current_value = value;
    }

    /// Уменьшает значение, не ниже 0.
    pub fn take(&mut self, amount: f32) {
        self.current_value = (self.current_value - amount).max(0.0);
    }

    pub fn is_depleted(&self) -> bool {
        self.current_value <= 0.0
    }
}

/// Шкалы entity, различаются по `id`.
#[derive(Component, Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Meters(Vec<Meter>);

impl Meters {
    pub fn new(meters: impl IntoIterator<Item = Meter>) -> Self {
        let mut result = Self::default();
        for meter in meters {
            result.insert(meter);
        }
        result
    }

    /// Добавляет шкалу. Шкала с тем же `id` заменяется.
    pub fn insert(&mut self, meter: Meter) {
        match self.get_mut(meter.id()) {
            Some(existing) => *existing = meter,
            None => self.0.push(meter),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Meter> {
        self.0.iter().find(|meter| meter.id() == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Meter> {
        self.0.iter_mut().find(|meter| meter.id() == id)
    }

    pub fn reset_all(&mut self) {
        for meter in &mut self.0 {
            meter.reset_value();
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Meter> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attack::{ForceData, ForceMode};

    #[test]
    fn test_apply_damage_adjusts_all_damage_payloads() {
        let target = Damageable::new("Body")
            .with_damage_resistance(DamageType::Fire, 50.0)
            .with_attack_resistance(AttackType::Heavy, 50.0);

        let mut attack = AttackComposite::new();
        attack.add(DamageData::new(
            None,
            AttackType::Heavy,
            [(DamageType::Fire, 20.0), (DamageType::Slash, 8.0)],
        ));
        attack.add(
            DamageData::new(None, AttackType::Light, [(DamageType::Fire, 10.0)])
                .with_tag("Burn")
                .unwrap(),
        );
        attack.add(ForceData::new(None, Vec3::X, 4.0, ForceMode::Impulse, false));

        let applied = target.apply_damage(attack).unwrap();

        let heavy = applied.get_kind::<DamageData>().unwrap();
        assert_eq!(heavy.value(DamageType::Fire), Some(5.0));
        assert_eq!(heavy.value(DamageType::Slash), Some(4.0));

        let burn = applied.get_as::<DamageData>("DamageData_Burn").unwrap();
        assert_eq!(burn.value(DamageType::Fire), Some(5.0));

        assert_eq!(applied.get_kind::<ForceData>().unwrap().magnitude(), 4.0);
    }

    #[test]
    fn test_apply_damage_empty_composite() {
        let target = Damageable::default();
        assert_eq!(target.group_id, "null");
        assert!(target.apply_damage(AttackComposite::new()).is_none());
    }

    #[test]
    fn test_meter_starts_at_max_and_resets() {
        let mut hp = Meter::new("HP", 100.0);
        assert_eq!(hp.current_value(), 100.0);

        hp.take(30.0);
        assert_eq!(hp.current_value(), 70.0);
        hp.take(500.0);
        assert_eq!(hp.current_value(), 0.0);
        assert!(hp.is_depleted());

        hp.set_max_value(120.0);
        hp.reset_value();
        assert_eq!(hp.current_value(), 120.0);
    }

    #[test]
    fn test_meter_starting_empty() {
        let mut shield = Meter::starting_empty("Shield", 50.0);
        assert_eq!(shield.current_value(), 0.0);

        // initialize не поднимает шкалу без start_at_max
        shield.initialize();
        assert_eq!(shield.current_value(), 0.0);
        shield.reset_value();
        assert_eq!(shield.current_value(), 50.0);
    }

    #[test]
    fn test_meters_by_id() {
        let mut meters = Meters::new([Meter::new("HP", 100.0), Meter::new("Shield", 40.0)]);
        meters.insert(Meter::new("HP", 150.0));

        assert_eq!(meters.iter().count(), 2);
        assert_eq!(meters.get("HP").unwrap().max_value(), 150.0);
        assert!(meters.get("Stamina").is_none());

        meters.get_mut("Shield").unwrap().take(40.0);
        meters.reset_all();
        assert_eq!(meters.get("Shield").unwrap().current_value(), 40.0);
    }

    #[test]
    fn test_meters_deserialization() {
        let meters: Meters = serde_json::from_str(
            r#"[
                { "id": "HP", "max_value": 80.0 },
                { "id": "Rage", "max_value": 10.0, "start_at_max": false }
            ]"#,
        )
        .unwrap();

        assert_eq!(meters.get("HP").unwrap().current_value(), 80.0);
        assert_eq!(meters.get("Rage").unwrap().current_value(), 0.0);
    }
}
