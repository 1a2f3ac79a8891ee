//! HitReg Simulation Core
//!
//! ECS hit registration на Bevy 0.16:
//! - attack: payload'ы атаки (damage, random damage, force) и AttackComposite
//! - combat: CombatVolumeManager + HitLedger (одна доставка на entity/group/канал)
//!
//! Detection volumes и физика живут вне ECS и приходят как `VolumeOverlap` events.

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod attack;
pub mod combat;
pub mod logger;

// Re-export основных типов
pub use attack::{
    AttackBody, AttackComposite, AttackData, AttackDataError, AttackDataKind, AttackDefinition,
    AttackKey, AttackSequence, AttackType, DamageData, DamageType, ForceData, ForceMode,
    RandomDamageData, RandomRange, VolumeType,
};
pub use combat::{
    ColliderState, CombatCollider, CombatPlugin, CombatVolumeConfig, CombatVolumeManager,
    Damageable, HitLedger, Meter, Meters, Struck, VolumeOverlap,
};
pub use logger::{
    init_logger, log, log_error, log_info, log_warning, set_log_level, set_logger, LogLevel,
    LogPrinter,
};

/// Главный plugin симуляции
pub struct HitRegPlugin;

impl Plugin for HitRegPlugin {
    fn build(&self, app: &mut App) {
        app
            // Fixed timestep 60Hz для simulation tick
            .insert_resource(Time::<Fixed>::from_hz(60.0))
            // Детерминистичный RNG (seed 42, если app не задал свой)
            .init_resource::<DeterministicRng>()
            .add_plugins(CombatPlugin);
    }
}

/// Детерминистичный RNG resource (seeded), для roll'а RandomDamageData
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(42)
    }
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
///
/// `HitRegPlugin` не добавляется: tests/bin решают сами.
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(Time::<Fixed>::from_hz(60.0)); // 60Hz FixedUpdate

    app
}
