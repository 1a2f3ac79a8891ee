//! Headless симуляция HitReg
//!
//! Один атакующий, один актёр с рукой-hitbox'ом и стена.
//! Overlap'ы подаются вручную (вместо detection volumes).

use bevy::prelude::*;
use hitreg_simulation::{
    create_headless_app, log_info, AttackComposite, AttackDataKind, AttackType, CombatVolumeConfig,
    CombatVolumeManager, DamageData, DamageType, Damageable, ForceData, ForceMode, HitRegPlugin,
    Meter, Meters, RandomDamageData, RandomRange, Struck, VolumeOverlap, VolumeType,
};

fn main() {
    let seed = 42;
    println!("Starting HitReg headless simulation (seed: {})", seed);

    let mut app = create_headless_app(seed);
    app.add_plugins(HitRegPlugin);

    let world = app.world_mut();
    let attacker = world.spawn_empty().id();
    let actor = world
        .spawn((
            Damageable::new("Torso").with_damage_resistance(DamageType::Fire, 50.0),
            Meters::new([Meter::new("HP", 100.0)]),
        ))
        .id();
    let arm = world.spawn(Damageable::part_of("L_Arm", actor)).id();
    let wall = world.spawn_empty().id();

    let attack = match build_attack(attacker) {
        Ok(attack) => attack,
        Err(err) => {
            eprintln!("Invalid attack: {}", err);
            return;
        }
    };

    let mut manager = CombatVolumeManager::new(attacker, CombatVolumeConfig::default());
    manager.set_current_attack(attack, false);
    manager.enable_sending(true);
    world.entity_mut(attacker).insert(manager);

    // Тик 1: рука, торс и стена в одном кадре; Hurtbox и Pushbox
    for target in [arm, actor, wall] {
        for volume in [VolumeType::Hurtbox, VolumeType::Pushbox] {
            world.send_event(VolumeOverlap {
                manager: attacker,
                target,
                volume,
            });
        }
    }
    world.run_schedule(FixedUpdate);
    report(&mut app, 1);

    // Тик 2: конец окна атаки, повторный overlap игнорируется
    let world = app.world_mut();
    if let Some(mut manager) = world.get_mut::<CombatVolumeManager>(attacker) {
        manager.enable_sending(false);
    }
    world.send_event(VolumeOverlap {
        manager: attacker,
        target: actor,
        volume: VolumeType::Hurtbox,
    });
    world.run_schedule(FixedUpdate);
    report(&mut app, 2);

    if let Some(manager) = app.world().get::<CombatVolumeManager>(attacker) {
        log_info(&format!("Hit ledger after tick 2: {}", manager.hit_ledger()));
    }

    println!("Simulation complete!");
}

fn build_attack(owner: Entity) -> Result<AttackComposite, hitreg_simulation::AttackDataError> {
    let mut attack = AttackComposite::new();
    attack.add(DamageData::new(
        Some(owner),
        AttackType::Heavy,
        [(DamageType::Slash, 10.0), (DamageType::Fire, 5.0)],
    ));
    attack.add(
        RandomDamageData::new(
            Some(owner),
            AttackType::Heavy,
            [(DamageType::Blunt, RandomRange::new(2.0, 6.0))],
        )?
        .with_tag("Crit")?,
    );
    attack.add(ForceData::new(Some(owner), Vec3::Z, 8.0, ForceMode::Impulse, false));
    attack.add(ForceData::new(Some(owner), Vec3::NEG_Z, 2.0, ForceMode::Impulse, true));
    Ok(attack)
}

fn report(app: &mut App, tick: u32) {
    let struck: Vec<Struck> = app
        .world_mut()
        .resource_mut::<Events<Struck>>()
        .drain()
        .collect();

    println!("Tick {}: {} struck events", tick, struck.len());
    for event in struck {
        let Some(applied) = event.applied else {
            println!("  {} (no delivery, collider: {})", event.target, event.collider_state);
            continue;
        };
        println!("  {} ← {}", event.target, applied);

        let damage: f32 = applied
            .iter()
            .filter_map(DamageData::narrow)
            .map(DamageData::total_damage)
            .sum();
        if damage <= 0.0 {
            continue;
        }

        // Урон по части идёт в HP актёра
        let world = app.world_mut();
        let owner = world
            .get::<Damageable>(event.target)
            .and_then(|damageable| damageable.parent)
            .unwrap_or(event.target);
        let Some(mut meters) = world.get_mut::<Meters>(owner) else {
            continue;
        };
        if let Some(hp) = meters.get_mut("HP") {
            hp.take(damage);
            println!("    HP {} → {:.1}/{:.1}", owner, hp.current_value(), hp.max_value());
        }
    }
}
