//! Strike integration test
//!
//! Headless App + HitRegPlugin, overlap'ы подаются как events.
//!
//! Проверяем:
//! - доставка через Damageable (resistances применены)
//! - одна доставка на entity/group/канал за окно атаки
//! - отложенный clear ledger'а
//! - детерминизм random damage (seed)

use bevy::prelude::*;
use hitreg_simulation::*;

/// Helper: App с HitRegPlugin
fn create_strike_app(seed: u64) -> App {
    let mut app = create_headless_app(seed);
    app.add_plugins(HitRegPlugin);
    app
}

fn sword_attack(owner: Entity) -> AttackComposite {
    let mut attack = AttackComposite::new();
    attack.add(DamageData::new(
        Some(owner),
        AttackType::Light,
        [(DamageType::Slash, 10.0), (DamageType::Fire, 5.0)],
    ));
    attack.add(ForceData::new(Some(owner), Vec3::Z, 6.0, ForceMode::Impulse, false));
    attack
}

/// Helper: attacker с активной атакой
fn spawn_attacker(app: &mut App, config: CombatVolumeConfig, attack: impl FnOnce(Entity) -> AttackComposite) -> Entity {
    let world = app.world_mut();
    let attacker = world.spawn_empty().id();

    let mut manager = CombatVolumeManager::new(attacker, config);
    manager.set_current_attack(attack(attacker), false);
    manager.enable_sending(true);
    world.entity_mut(attacker).insert(manager);

    attacker
}

fn overlap(app: &mut App, manager: Entity, target: Entity, volume: VolumeType) {
    app.world_mut().send_event(VolumeOverlap {
        manager,
        target,
        volume,
    });
}

/// Один fixed tick, возвращает Struck events этого тика
fn tick(app: &mut App) -> Vec<Struck> {
    app.world_mut().run_schedule(FixedUpdate);
    app.world_mut()
        .resource_mut::<Events<Struck>>()
        .drain()
        .collect()
}

fn manager(app: &App, entity: Entity) -> &CombatVolumeManager {
    app.world()
        .get::<CombatVolumeManager>(entity)
        .expect("attacker has CombatVolumeManager")
}

#[test]
fn test_hurtbox_and_pushbox_deliver_filtered_data() {
    let mut app = create_strike_app(42);
    let attacker = spawn_attacker(&mut app, CombatVolumeConfig::default(), sword_attack);
    let target = app
        .world_mut()
        .spawn(Damageable::new("Body").with_damage_resistance(DamageType::Fire, 50.0))
        .id();

    overlap(&mut app, attacker, target, VolumeType::Hurtbox);
    overlap(&mut app, attacker, target, VolumeType::Pushbox);
    overlap(&mut app, attacker, target, VolumeType::Hurtbox);
    let struck = tick(&mut app);

    assert_eq!(struck.len(), 3);
    assert!(struck.iter().all(|event| event.attacker == attacker && event.target == target));

    let hurt = struck[0].applied.as_ref().expect("hurtbox delivery");
    let damage = hurt.get_kind::<DamageData>().expect("damage payload");
    assert_eq!(damage.value(DamageType::Slash), Some(10.0));
    assert_eq!(damage.value(DamageType::Fire), Some(2.5));
    assert!(hurt.get_kind::<ForceData>().is_none());

    let push = struck[1].applied.as_ref().expect("pushbox delivery");
    assert!(push.get_kind::<ForceData>().is_some());
    assert!(push.get_kind::<DamageData>().is_none());

    assert!(struck[2].applied.is_none());

    // Источник атаки не изменён resistances цели
    let source = manager(&app, attacker).current_attack().expect("attack is kept while active");
    assert_eq!(
        source.get_kind::<DamageData>().and_then(|d| d.value(DamageType::Fire)),
        Some(5.0)
    );
}

#[test]
fn test_arm_then_torso_counts_as_two_groups() {
    let mut app = create_strike_app(42);
    let attacker = spawn_attacker(&mut app, CombatVolumeConfig::default(), sword_attack);
    let actor = app.world_mut().spawn(Damageable::new("Torso")).id();
    let arm = app.world_mut().spawn(Damageable::part_of("L_Arm", actor)).id();

    overlap(&mut app, attacker, arm, VolumeType::Hurtbox);
    overlap(&mut app, attacker, actor, VolumeType::Hurtbox);
    overlap(&mut app, attacker, arm, VolumeType::Hurtbox);
    let struck = tick(&mut app);

    let delivered: Vec<bool> = struck.iter().map(|event| event.applied.is_some()).collect();
    assert_eq!(delivered, vec![true, true, false]);

    let ledger = manager(&app, attacker).hit_ledger();
    assert_eq!(ledger.len(), 1);
    assert!(ledger.was_group_hit(actor, "Torso"));
    assert!(ledger.was_group_hit(actor, "L_Arm"));
}

#[test]
fn test_collider_and_wall_targets() {
    let mut app = create_strike_app(42);
    let attacker = spawn_attacker(&mut app, CombatVolumeConfig::default(), sword_attack);
    let shield = app
        .world_mut()
        .spawn(CombatCollider::new(ColliderState::Block))
        .id();
    let wall = app.world_mut().spawn_empty().id();

    overlap(&mut app, attacker, shield, VolumeType::Hurtbox);
    overlap(&mut app, attacker, wall, VolumeType::Hurtbox);
    let struck = tick(&mut app);

    assert_eq!(struck.len(), 2);
    assert_eq!(struck[0].collider_state, ColliderState::Block);
    assert_eq!(struck[1].collider_state, ColliderState::None);
    assert!(struck.iter().all(|event| event.applied.is_none()));
    assert!(manager(&app, attacker).hit_non_attackable());
}

#[test]
fn test_self_and_despawned_targets_ignored() {
    let mut app = create_strike_app(42);
    let attacker = spawn_attacker(&mut app, CombatVolumeConfig::default(), sword_attack);
    app.world_mut()
        .entity_mut(attacker)
        .insert(Damageable::new("Body"));
    let ghost = app.world_mut().spawn(Damageable::new("Body")).id();
    app.world_mut().despawn(ghost);

    overlap(&mut app, attacker, attacker, VolumeType::Hurtbox);
    overlap(&mut app, attacker, ghost, VolumeType::Hurtbox);
    let struck = tick(&mut app);

    assert!(struck.is_empty());
    assert!(manager(&app, attacker).hit_ledger().is_empty());
}

#[test]
fn test_ledger_cleared_on_next_tick_after_disable() {
    let mut app = create_strike_app(42);
    let attacker = spawn_attacker(&mut app, CombatVolumeConfig::default(), sword_attack);
    let target = app.world_mut().spawn(Damageable::new("Body")).id();

    overlap(&mut app, attacker, target, VolumeType::Hurtbox);
    tick(&mut app);

    if let Some(mut manager) = app.world_mut().get_mut::<CombatVolumeManager>(attacker) {
        manager.enable_sending(false);
    }
    // В этом кадре ledger ещё доступен
    assert!(manager(&app, attacker).hit_ledger().contains(target));

    tick(&mut app);
    assert!(manager(&app, attacker).hit_ledger().is_empty());

    // Новая атака, цель снова получает данные
    if let Some(mut manager) = app.world_mut().get_mut::<CombatVolumeManager>(attacker) {
        manager.set_current_attack(sword_attack(attacker), false);
        manager.enable_sending(true);
    }
    overlap(&mut app, attacker, target, VolumeType::Hurtbox);
    let struck = tick(&mut app);
    assert!(struck[0].applied.is_some());
}

#[test]
fn test_missing_manager_is_skipped() {
    let mut app = create_strike_app(42);
    let not_a_manager = app.world_mut().spawn_empty().id();
    let target = app.world_mut().spawn(Damageable::new("Body")).id();

    overlap(&mut app, not_a_manager, target, VolumeType::Hurtbox);
    assert!(tick(&mut app).is_empty());
}

fn rolled_crit(seed: u64) -> f32 {
    let mut app = create_strike_app(seed);
    let attacker = spawn_attacker(&mut app, CombatVolumeConfig::default(), |owner| {
        let random = RandomDamageData::new(
            Some(owner),
            AttackType::Heavy,
            [(DamageType::Blunt, RandomRange::new(1.0, 1000.0))],
        )
        .expect("valid range");
        AttackComposite::from_data(random)
    });
    let target = app.world_mut().spawn(Damageable::new("Body")).id();

    overlap(&mut app, attacker, target, VolumeType::Hurtbox);
    let struck = tick(&mut app);

    struck[0]
        .applied
        .as_ref()
        .and_then(|applied| applied.get_kind::<RandomDamageData>())
        .and_then(|random| random.damage().value(DamageType::Blunt))
        .expect("rolled blunt damage")
}

#[test]
fn test_random_damage_deterministic_per_seed() {
    let first = rolled_crit(42);
    let second = rolled_crit(42);

    assert_eq!(first, second);
    assert!((1.0..=1000.0).contains(&first));
}

#[test]
fn test_config_deserialization_defaults() {
    let config: CombatVolumeConfig =
        serde_json::from_str(r#"{ "log_detections": true }"#).expect("valid config");

    assert!(config.filter_data);
    assert!(config.log_detections);
    assert!(!config.flush_stale_ledger_on_enable);

    let unfiltered: CombatVolumeConfig =
        serde_json::from_str(r#"{ "filter_data": false, "flush_stale_ledger_on_enable": true }"#)
            .expect("valid config");
    assert!(!unfiltered.filter_data);
    assert!(unfiltered.flush_stale_ledger_on_enable);
}
