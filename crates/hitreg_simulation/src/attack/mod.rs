//! Attack module: payload'ы атаки и их контейнеры.
//!
//! - `data`: DamageData / RandomDamageData / ForceData, VolumeType
//! - `composite`: AttackComposite (отсортированный по id набор payload'ов)
//! - `library`: AttackSequence (combo атак актёра)

pub mod composite;
pub mod data;
pub mod library;

#[cfg(test)]
mod composite_tests;

// Re-export основных типов
pub use composite::AttackComposite;
pub use data::{
    AttackData, AttackDataError, AttackDataKind, AttackType, DamageData, DamageType, ForceData,
    ForceMode, RandomDamageData, RandomRange, VolumeType, TAG_SEPARATOR,
};
pub use library::{AttackBody, AttackDefinition, AttackKey, AttackSequence, AttackSequenceError};
