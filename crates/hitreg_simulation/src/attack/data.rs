//! Attack data payloads (модули данных атаки).
//!
//! Атака собирается из независимых payload'ов: damage, random damage, force.
//! Каждый payload идентифицируется строковым `id`:
//! - `id` совпадает с именем типа (`"DamageData"`, `"ForceData"`)
//! - к `id` можно дописать tag через `_` (`"ForceData_Self"`)
//! - tag позволяет хранить несколько payload'ов одного типа в одном composite
//!
//! `VolumeType` payload'а фиксируется конструктором и определяет, через какой
//! combat volume он будет доставлен цели:
//! - DamageData / RandomDamageData → Hurtbox
//! - ForceData → Pushbox
//! - ForceData (self) → None (не идёт ни через один volume)

use std::collections::BTreeMap;
use std::fmt;

use bevy::prelude::*;
use rand::Rng;
use serde::Deserialize;

/// Разделитель tag'ов в `id` payload'а.
pub const TAG_SEPARATOR: char = '_';

// ============================================================================
// Enums
// ============================================================================

/// Тип combat volume (канал доставки данных атаки).
///
/// Дискриминанты используются как channel tags в `HitLedger`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Reflect)]
pub enum VolumeType {
    Hurtbox = 0,
    Pushbox = 1,
    /// Payload проходит через любой volume.
    All = 2,
    /// Payload не доставляется через volumes (например force на самого атакующего).
    /// Volumes с этим типом не создаются.
    None = 3,
}

impl VolumeType {
    /// Channel tag (int), которым группа помечается в hit ledger.
    pub fn tag_index(self) -> u8 {
        self as u8
    }

    /// Проходит ли payload с каналом `payload` через volume `self`.
    ///
    /// `All` с любой стороны пропускает payload.
    pub fn routes(self, payload: VolumeType) -> bool {
        self == VolumeType::All || payload == self || payload == VolumeType::All
    }
}

impl fmt::Display for VolumeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Тип урона (для resistances).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Reflect, Deserialize)]
pub enum DamageType {
    None,
    Physical,
    Slash,
    Fire,
    Blunt,
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Тип атаки. Также ключ для `AttackSequence` (input → attack).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Reflect, Deserialize)]
pub enum AttackType {
    #[default]
    None,
    Light,
    Heavy,
    Special,
}

impl fmt::Display for AttackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Как physics layer применяет force (интерпретация на стороне движка).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Reflect)]
pub enum ForceMode {
    #[default]
    Force,
    Acceleration,
    Impulse,
    VelocityChange,
}

// ============================================================================
// Errors
// ============================================================================

/// Ошибки сборки payload'ов из authored данных.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum AttackDataError {
    /// Диапазон random damage невалиден (min > max или не конечное число).
    #[error("Invalid damage range for {damage_type}: [{min}, {max}]")]
    InvalidRange {
        damage_type: DamageType,
        min: f32,
        max: f32,
    },

    /// Tag пустой или содержит разделитель.
    #[error("Invalid tag {tag:?} for {id}")]
    InvalidTag { id: String, tag: String },
}

fn tagged_id(id: &str, tag: &str) -> Result<String, AttackDataError> {
    if tag.is_empty() || tag.contains(TAG_SEPARATOR) {
        return Err(AttackDataError::InvalidTag {
            id: id.to_string(),
            tag: tag.to_string(),
        });
    }
    Ok(format!("{id}{TAG_SEPARATOR}{tag}"))
}

// ============================================================================
// DamageData
// ============================================================================

/// Урон по типам + тип атаки. Доставляется через Hurtbox.
#[derive(Clone, Debug, PartialEq)]
pub struct DamageData {
    id: String,
    instigator: Option<Entity>,
    attack_type: AttackType,
    values: BTreeMap<DamageType, f32>,
}

impl DamageData {
    pub fn new(
        instigator: Option<Entity>,
        attack_type: AttackType,
        values: impl IntoIterator<Item = (DamageType, f32)>,
    ) -> Self {
        Self {
            id: <Self as AttackDataKind>::ID.to_string(),
            instigator,
            attack_type,
            values: values.into_iter().collect(),
        }
    }

    /// Дописывает tag к `id` (`"DamageData"` → `"DamageData_<tag>"`).
    pub fn with_tag(mut self, tag: &str) -> Result<Self, AttackDataError> {
        self.id = tagged_id(&self.id, tag)?;
        Ok(self)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn instigator(&self) -> Option<Entity> {
        self.instigator
    }

    pub fn attack_type(&self) -> AttackType {
        self.attack_type
    }

    pub fn values(&self) -> &BTreeMap<DamageType, f32> {
        &self.values
    }

    /// Mutable доступ для получателя (resistances и т.п.).
    pub fn values_mut(&mut self) -> &mut BTreeMap<DamageType, f32> {
        &mut self.values
    }

    pub fn value(&self, damage_type: DamageType) -> Option<f32> {
        self.values.get(&damage_type).copied()
    }

    pub fn total_damage(&self) -> f32 {
        self.values.values().sum()
    }

    fn info_string(&self) -> String {
        let values = if self.values.is_empty() {
            "Empty".to_string()
        } else {
            self.values
                .iter()
                .map(|(damage_type, value)| format!("{damage_type} {value}; "))
                .collect()
        };
        format!("AttackType: {} | DamageValues: {}", self.attack_type, values)
    }
}

// ============================================================================
// RandomDamageData
// ============================================================================

/// Диапазон случайного урона (включительно).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RandomRange {
    pub min: f32,
    pub max: f32,
}

impl RandomRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }
}

/// DamageData, значения которой выбираются случайно в диапазонах.
///
/// До `roll()` значения пустые (`total_damage() == 0`).
#[derive(Clone, Debug, PartialEq)]
pub struct RandomDamageData {
    damage: DamageData,
    ranges: BTreeMap<DamageType, RandomRange>,
    rolled: bool,
}

impl RandomDamageData {
    pub fn new(
        instigator: Option<Entity>,
        attack_type: AttackType,
        ranges: impl IntoIterator<Item = (DamageType, RandomRange)>,
    ) -> Result<Self, AttackDataError> {
        let ranges: BTreeMap<_, _> = ranges.into_iter().collect();

        for (damage_type, range) in &ranges {
            // gen_range требует конечную ширину max - min
            let valid = range.min.is_finite()
                && range.max.is_finite()
                && range.min <= range.max
                && (range.max - range.min).is_finite();
            if !valid {
                return Err(AttackDataError::InvalidRange {
                    damage_type: *damage_type,
                    min: range.min,
                    max: range.max,
                });
            }
        }

        let mut damage = DamageData::new(instigator, attack_type, []);
        damage.id = <Self as AttackDataKind>::ID.to_string();

        Ok(Self {
            damage,
            ranges,
            rolled: false,
        })
    }

    pub fn with_tag(mut self, tag: &str) -> Result<Self, AttackDataError> {
        self.damage.id = tagged_id(&self.damage.id, tag)?;
        Ok(self)
    }

    /// Выбирает конкретные значения урона для каждого диапазона.
    ///
    /// Повторный roll перезаписывает значения.
    pub fn roll<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for (damage_type, range) in &self.ranges {
            let value = rng.gen_range(range.min..=range.max);
            self.damage.values.insert(*damage_type, value);
        }
        self.rolled = true;
    }

    pub fn is_rolled(&self) -> bool {
        self.rolled
    }

    pub fn ranges(&self) -> &BTreeMap<DamageType, RandomRange> {
        &self.ranges
    }

    pub fn damage(&self) -> &DamageData {
        &self.damage
    }

    pub fn damage_mut(&mut self) -> &mut DamageData {
        &mut self.damage
    }

    fn info_string(&self) -> String {
        let ranges = if self.ranges.is_empty() {
            "Empty".to_string()
        } else {
            self.ranges
                .iter()
                .map(|(damage_type, range)| {
                    format!("{damage_type}  min: {}  max: {}; ", range.min, range.max)
                })
                .collect()
        };
        format!(
            "AttackType: {} | DamageValues: {} | Rolled: {}",
            self.damage.attack_type, ranges, self.rolled
        )
    }
}

// ============================================================================
// ForceData
// ============================================================================

/// Force (knockback / self-push).
///
/// `adjusted_direction` изначально равен `direction`; внешний код может его
/// скорректировать (например по нормали поверхности удара).
#[derive(Clone, Debug, PartialEq)]
pub struct ForceData {
    id: String,
    instigator: Option<Entity>,
    volume_type: VolumeType,
    direction: Vec3,
    adjusted_direction: Vec3,
    magnitude: f32,
    mode: ForceMode,
    applies_to_self: bool,
}

impl ForceData {
    /// Tag self-force payload'а (`"ForceData_Self"`).
    pub const SELF_TAG: &'static str = "Self";

    pub fn new(
        instigator: Option<Entity>,
        direction: Vec3,
        magnitude: f32,
        mode: ForceMode,
        applies_to_self: bool,
    ) -> Self {
        let base = <Self as AttackDataKind>::ID;
        // Self force не идёт ни через один volume, применяется атакующим напрямую
        let (id, volume_type) = if applies_to_self {
            (format!("{base}{TAG_SEPARATOR}{}", Self::SELF_TAG), VolumeType::None)
        } else {
            (base.to_string(), VolumeType::Pushbox)
        };

        Self {
            id,
            instigator,
            volume_type,
            direction,
            adjusted_direction: direction,
            magnitude,
            mode,
            applies_to_self,
        }
    }

    pub fn with_adjusted_direction(mut self, adjusted_direction: Vec3) -> Self {
        self.adjusted_direction = adjusted_direction;
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Result<Self, AttackDataError> {
        self.id = tagged_id(&self.id, tag)?;
        Ok(self)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn instigator(&self) -> Option<Entity> {
        self.instigator
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Vec3) {
        self.direction = direction;
    }

    pub fn adjusted_direction(&self) -> Vec3 {
        self.adjusted_direction
    }

    pub fn set_adjusted_direction(&mut self, adjusted_direction: Vec3) {
        self.adjusted_direction = adjusted_direction;
    }

    pub fn magnitude(&self) -> f32 {
        self.magnitude
    }

    pub fn mode(&self) -> ForceMode {
        self.mode
    }

    pub fn applies_to_self(&self) -> bool {
        self.applies_to_self
    }

    /// Итоговый вектор силы (adjusted direction × magnitude).
    pub fn force(&self) -> Vec3 {
        self.adjusted_direction * self.magnitude
    }

    fn info_string(&self) -> String {
        format!(
            "AttackForce: Force Direction-{} | Adjusted Force Direction-{} | Force-{} | Mode-{:?}",
            self.direction, self.adjusted_direction, self.magnitude, self.mode
        )
    }
}

// ============================================================================
// AttackData (sum type)
// ============================================================================

/// Один payload атаки.
#[derive(Clone, Debug, PartialEq)]
pub enum AttackData {
    Damage(DamageData),
    RandomDamage(RandomDamageData),
    Force(ForceData),
}

impl AttackData {
    pub fn id(&self) -> &str {
        match self {
            AttackData::Damage(data) => &data.id,
            AttackData::RandomDamage(data) => &data.damage.id,
            AttackData::Force(data) => &data.id,
        }
    }

    pub fn instigator(&self) -> Option<Entity> {
        match self {
            AttackData::Damage(data) => data.instigator,
            AttackData::RandomDamage(data) => data.damage.instigator,
            AttackData::Force(data) => data.instigator,
        }
    }

    /// Канал доставки (фиксирован конструктором варианта).
    pub fn volume_type(&self) -> VolumeType {
        match self {
            AttackData::Damage(_) | AttackData::RandomDamage(_) => VolumeType::Hurtbox,
            AttackData::Force(data) => data.volume_type,
        }
    }

    /// Глубокая копия: копия не делит mutable state с оригиналом.
    pub fn deep_copy(&self) -> Self {
        self.clone()
    }

    /// Tokens `id`, разделённые любым из `separators`.
    pub fn has_tag(&self, separators: &[char], tag: &str) -> bool {
        self.id().split(separators).any(|token| token == tag)
    }

    pub fn info_string(&self) -> String {
        match self {
            AttackData::Damage(data) => data.info_string(),
            AttackData::RandomDamage(data) => data.info_string(),
            AttackData::Force(data) => data.info_string(),
        }
    }
}

impl fmt::Display for AttackData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.instigator() {
            Some(instigator) => write!(f, "{} | Instigator: {}", self.id(), instigator)?,
            None => write!(f, "{} | Instigator: Null", self.id())?,
        }
        write!(
            f,
            " | Manager Pipeline: {} | {}",
            self.volume_type(),
            self.info_string()
        )
    }
}

impl From<DamageData> for AttackData {
    fn from(data: DamageData) -> Self {
        AttackData::Damage(data)
    }
}

impl From<RandomDamageData> for AttackData {
    fn from(data: RandomDamageData) -> Self {
        AttackData::RandomDamage(data)
    }
}

impl From<ForceData> for AttackData {
    fn from(data: ForceData) -> Self {
        AttackData::Force(data)
    }
}

// ============================================================================
// Typed access
// ============================================================================

/// Конкретный вид payload'а: каноническое имя + narrowing из `AttackData`.
///
/// `DamageData` также narrow'ится из `RandomDamage` (random damage тоже damage).
pub trait AttackDataKind: Sized {
    /// Каноническое `id` без tag'ов.
    const ID: &'static str;

    fn narrow(data: &AttackData) -> Option<&Self>;

    fn narrow_mut(data: &mut AttackData) -> Option<&mut Self>;
}

impl AttackDataKind for DamageData {
    const ID: &'static str = "DamageData";

    fn narrow(data: &AttackData) -> Option<&Self> {
        match data {
            AttackData::Damage(damage) => Some(damage),
            AttackData::RandomDamage(random) => Some(&random.damage),
            AttackData::Force(_) => None,
        }
    }

    fn narrow_mut(data: &mut AttackData) -> Option<&mut Self> {
        match data {
            AttackData::Damage(damage) => Some(damage),
            AttackData::RandomDamage(random) => Some(&mut random.damage),
            AttackData::Force(_) => None,
        }
    }
}

impl AttackDataKind for RandomDamageData {
    const ID: &'static str = "RandomDamageData";

    fn narrow(data: &AttackData) -> Option<&Self> {
        match data {
            AttackData::RandomDamage(random) => Some(random),
            _ => None,
        }
    }

    fn narrow_mut(data: &mut AttackData) -> Option<&mut Self> {
        match data {
            AttackData::RandomDamage(random) => Some(random),
            _ => None,
        }
    }
}

impl AttackDataKind for ForceData {
    const ID: &'static str = "ForceData";

    fn narrow(data: &AttackData) -> Option<&Self> {
        match data {
            AttackData::Force(force) => Some(force),
            _ => None,
        }
    }

    fn narrow_mut(data: &mut AttackData) -> Option<&mut Self> {
        match data {
            AttackData::Force(force) => Some(force),
            _ => None,
        }
    }
}
