//! Tests for AttackComposite.

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use bevy::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::attack::{
        AttackComposite, AttackData, AttackType, DamageData, DamageType, ForceData, ForceMode,
        RandomDamageData, RandomRange, VolumeType,
    };

    fn slash_fire() -> DamageData {
        DamageData::new(
            None,
            AttackType::Light,
            [(DamageType::Slash, 10.0), (DamageType::Fire, 5.0)],
        )
    }

    fn self_force() -> ForceData {
        ForceData::new(None, Vec3::NEG_Z, 3.0, ForceMode::Impulse, true)
    }

    fn push_force() -> ForceData {
        ForceData::new(None, Vec3::Z, 8.0, ForceMode::Impulse, false)
    }

    fn ids(composite: &AttackComposite) -> Vec<String> {
        composite.iter().map(|data| data.id().to_string()).collect()
    }

    fn id_set(composite: &AttackComposite) -> BTreeSet<String> {
        composite.iter().map(|data| data.id().to_string()).collect()
    }

    #[test]
    fn test_add_keeps_sorted_unique_ids() {
        let mut composite = AttackComposite::new();
        composite.add(push_force());
        composite.add(slash_fire());
        composite.add(self_force());
        composite.add(slash_fire().with_tag("Bonus").unwrap());

        assert_eq!(
            ids(&composite),
            vec!["DamageData", "DamageData_Bonus", "ForceData", "ForceData_Self"]
        );
    }

    #[test]
    fn test_add_same_id_overwrites_last_wins() {
        let mut composite = AttackComposite::new();
        composite.add(slash_fire());
        composite.add(push_force());
        composite.add(DamageData::new(None, AttackType::Heavy, [(DamageType::Blunt, 40.0)]));

        assert_eq!(composite.len(), 2);
        let damage = composite.get_kind::<DamageData>().unwrap();
        assert_eq!(damage.attack_type(), AttackType::Heavy);
        assert_eq!(damage.total_damage(), 40.0);
    }

    #[test]
    fn test_single_payload_overwrite_does_not_grow() {
        let mut composite = AttackComposite::from_data(slash_fire());
        composite.add(DamageData::new(None, AttackType::Special, []));

        assert_eq!(composite.len(), 1);
        assert_eq!(
            composite.get_kind::<DamageData>().unwrap().attack_type(),
            AttackType::Special
        );
    }

    #[test]
    fn test_update_each_replacing_payload_keeps_ids_sorted() {
        let mut composite = AttackComposite::new();
        composite.add(slash_fire());
        composite.add(push_force());

        composite.update_each(|data| {
            if data.id() == "DamageData" {
                *data = AttackData::from(self_force());
            }
        });

        assert_eq!(ids(&composite), vec!["ForceData", "ForceData_Self"]);
        assert!(composite.get_as::<ForceData>("ForceData_Self").is_some());

        composite.add(self_force());
        assert_eq!(ids(&composite), vec!["ForceData", "ForceData_Self"]);
    }

    #[test]
    fn test_update_each_changed_id_overwrites_existing() {
        let mut composite = AttackComposite::new();
        composite.add(slash_fire());
        composite.add(push_force());
        composite.add(self_force());

        // DamageData → ForceData: изменённый payload побеждает
        composite.update_each(|data| {
            if data.id() == "DamageData" {
                *data = AttackData::from(
                    ForceData::new(None, Vec3::X, 99.0, ForceMode::Force, false),
                );
            }
        });

        assert_eq!(ids(&composite), vec!["ForceData", "ForceData_Self"]);
        assert_eq!(composite.get_kind::<ForceData>().unwrap().magnitude(), 99.0);
    }

    #[test]
    fn test_update_as_moves_payload_with_new_id() {
        let mut composite = AttackComposite::new();
        composite.add(slash_fire());
        composite.add(push_force());

        let updated = composite.update_kind(|force: &mut ForceData| *force = self_force());

        assert_eq!(updated, Some(()));
        assert_eq!(ids(&composite), vec!["DamageData", "ForceData_Self"]);
        assert!(composite.get_kind::<ForceData>().is_none());
        assert!(composite.get_as::<ForceData>("ForceData_Self").is_some());

        // Нет payload'а или не тот kind → None
        assert_eq!(composite.update_kind(|force: &mut ForceData| force.magnitude()), None);
        assert_eq!(
            composite.update_as("DamageData", |force: &mut ForceData| force.magnitude()),
            None
        );
    }

    #[test]
    fn test_empty_composite_queries() {
        let composite = AttackComposite::new();

        assert!(composite.is_empty());
        assert!(composite.get_all(VolumeType::All).is_empty());
        assert!(composite.get("DamageData").is_none());
        assert!(composite.sub_composite_for(VolumeType::Hurtbox).is_empty());
        assert!(composite.sub_composite_exclude("DamageData").is_empty());
        assert_eq!(composite.to_string(), "No Components.");
    }

    #[test]
    fn test_scenario_damage_and_self_force() {
        let mut composite = AttackComposite::new();
        composite.add(slash_fire());
        composite.add(self_force());

        let hurt = composite.get_all(VolumeType::Hurtbox);
        assert_eq!(hurt.len(), 1);
        assert_eq!(hurt[0].id(), "DamageData");

        // Self force не идёт через Pushbox
        assert!(composite.get_all(VolumeType::Pushbox).is_empty());

        assert!(composite.get_as::<ForceData>("ForceData_Self").is_some());
        assert!(composite.get_kind::<ForceData>().is_none());
        assert!(composite.get_as::<DamageData>("ForceData_Self").is_none());
    }

    #[test]
    fn test_get_all_includes_all_channel_for_everyone() {
        let mut composite = AttackComposite::new();
        composite.add(slash_fire());
        composite.add(push_force());
        composite.add(self_force());

        assert_eq!(composite.get_all(VolumeType::All).len(), 3);
        assert_eq!(composite.get_all(VolumeType::Pushbox).len(), 1);
        assert_eq!(composite.get_all(VolumeType::None).len(), 1);
    }

    #[test]
    fn test_deep_copy_isolates_mutable_fields() {
        let mut source = AttackComposite::new();
        source.add(slash_fire());
        source.add(push_force());

        let mut copy = source.deep_copy();
        copy.update_kind(|force: &mut ForceData| force.set_adjusted_direction(Vec3::Y))
            .unwrap();
        copy.update_kind(|damage: &mut DamageData| damage.values_mut().insert(DamageType::Slash, 0.0))
            .unwrap();

        assert_eq!(
            source.get_kind::<ForceData>().unwrap().adjusted_direction(),
            Vec3::Z
        );
        assert_eq!(
            source.get_kind::<DamageData>().unwrap().value(DamageType::Slash),
            Some(10.0)
        );
    }

    #[test]
    fn test_sub_composite_by_id() {
        let mut composite = AttackComposite::new();
        composite.add(slash_fire());
        composite.add(push_force());

        let sub = composite.sub_composite("ForceData");
        assert_eq!(ids(&sub), vec!["ForceData"]);

        let missing = composite.sub_composite("Nope");
        assert!(missing.is_empty());

        let excluded = composite.sub_composite_exclude("DamageData");
        assert_eq!(ids(&excluded), vec!["ForceData"]);
    }

    #[test]
    fn test_channel_partition_for_every_volume() {
        let mut composite = AttackComposite::new();
        composite.add(slash_fire());
        composite.add(push_force());
        composite.add(self_force());

        for volume in [
            VolumeType::Hurtbox,
            VolumeType::Pushbox,
            VolumeType::All,
            VolumeType::None,
        ] {
            let included = id_set(&composite.sub_composite_for(volume));
            let excluded = id_set(&composite.sub_composite_exclude_for(volume));

            assert!(included.is_disjoint(&excluded), "overlap for {volume}");
            let union: BTreeSet<_> = included.union(&excluded).cloned().collect();
            assert_eq!(union, id_set(&composite), "union mismatch for {volume}");
        }
    }

    #[test]
    fn test_sub_composite_tagged() {
        let mut composite = AttackComposite::new();
        composite.add(slash_fire());
        composite.add(push_force());
        composite.add(self_force());

        let tagged = composite.sub_composite_tagged(&['_'], "Self");
        assert_eq!(ids(&tagged), vec!["ForceData_Self"]);

        let rest = composite.sub_composite_exclude_tagged(&['_'], "Self");
        assert_eq!(ids(&rest), vec!["DamageData", "ForceData"]);

        // Все исключены → валидный пустой composite
        let none = composite.sub_composite_tagged(&['_'], "Missing");
        assert!(none.is_empty());
    }

    #[test]
    fn test_sub_composite_owns_copies() {
        let mut composite = AttackComposite::from_data(push_force());
        let mut sub = composite.sub_composite_for(VolumeType::Pushbox);

        sub.update_kind(|force: &mut ForceData| force.set_adjusted_direction(Vec3::X))
            .unwrap();
        composite
            .update_kind(|force: &mut ForceData| force.set_direction(Vec3::NEG_Y))
            .unwrap();

        assert_eq!(sub.get_kind::<ForceData>().unwrap().direction(), Vec3::Z);
        assert_eq!(
            composite.get_kind::<ForceData>().unwrap().adjusted_direction(),
            Vec3::Z
        );
    }

    #[test]
    fn test_copy_attack_data() {
        let composite = AttackComposite::from_data(slash_fire());

        let copy = composite.copy_attack_data("DamageData");
        assert!(matches!(copy, Some(AttackData::Damage(_))));
        assert!(composite.copy_attack_data("ForceData").is_none());

        let typed = composite.copy_attack_data_as::<DamageData>("DamageData").unwrap();
        assert_eq!(typed.total_damage(), 15.0);
    }

    #[test]
    fn test_roll_random_damage_only_unrolled() {
        let random = RandomDamageData::new(
            None,
            AttackType::Heavy,
            [(DamageType::Fire, RandomRange::new(1.0, 100.0))],
        )
        .unwrap();

        let mut composite = AttackComposite::new();
        composite.add(random);
        composite.add(slash_fire());

        let mut rng = ChaCha8Rng::seed_from_u64(7);
        composite.roll_random_damage(&mut rng);

        let first = composite
            .get_kind::<RandomDamageData>()
            .unwrap()
            .damage()
            .value(DamageType::Fire)
            .unwrap();

        // Второй вызов не перекатывает
        composite.roll_random_damage(&mut rng);
        let second = composite
            .get_kind::<RandomDamageData>()
            .unwrap()
            .damage()
            .value(DamageType::Fire)
            .unwrap();

        assert_eq!(first, second);
        assert!((1.0..=100.0).contains(&first));
    }

    #[test]
    fn test_from_iterator_and_display() {
        let composite: AttackComposite = vec![
            AttackData::from(push_force()),
            AttackData::from(slash_fire()),
        ]
        .into_iter()
        .collect();

        let text = composite.to_string();
        assert!(text.starts_with("Components:"));
        assert!(text.contains("DamageData | Instigator: Null | Manager Pipeline: Hurtbox"));
        assert!(text.contains("ForceData | Instigator: Null | Manager Pipeline: Pushbox"));
    }
}
