//! HitLedger: кого уже ударила текущая активация атаки.
//!
//! # Структура
//!
//! ```text
//! records (sorted by Entity): Player,              StaticWall
//!                               └ groups: L_Arm_0    (нет groups)
//!                                         Body_0_1
//! ```
//!
//! - record на top-level entity (parent, если участник является частью актёра)
//! - group на каждый `group_id`, по которому прошёл удар
//! - при фильтрации group помечается каналами (`VolumeChannels`), через
//!   которые данные уже доставлены
//! - placeholder (`not_yet_hit`): группа parent'а, созданная до того, как
//!   ударили сам parent
//!
//! Entities без damage capability хранятся как record без groups.

use std::fmt;

use bevy::prelude::*;
use bitflags::bitflags;

use crate::attack::{VolumeType, TAG_SEPARATOR};

bitflags! {
    /// Каналы, через которые группа уже получила данные.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct VolumeChannels: u8 {
        const HURTBOX = 1 << 0;
        const PUSHBOX = 1 << 1;
        const ALL     = 1 << 2;
        const NONE    = 1 << 3;
    }
}

impl From<VolumeType> for VolumeChannels {
    fn from(volume: VolumeType) -> Self {
        match volume {
            VolumeType::Hurtbox => VolumeChannels::HURTBOX,
            VolumeType::Pushbox => VolumeChannels::PUSHBOX,
            VolumeType::All => VolumeChannels::ALL,
            VolumeType::None => VolumeChannels::NONE,
        }
    }
}

impl VolumeChannels {
    /// Каналы в порядке tag index.
    pub fn volumes(self) -> impl Iterator<Item = VolumeType> {
        [
            VolumeType::Hurtbox,
            VolumeType::Pushbox,
            VolumeType::All,
            VolumeType::None,
        ]
        .into_iter()
        .filter(move |volume| self.contains(VolumeChannels::from(*volume)))
    }
}

/// Группа (часть тела / hitbox group) внутри record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupEntry {
    pub name: String,
    pub channels: VolumeChannels,
    pub not_yet_hit: bool,
}

impl GroupEntry {
    fn hit(name: &str, channels: VolumeChannels) -> Self {
        Self {
            name: name.to_string(),
            channels,
            not_yet_hit: false,
        }
    }

    fn placeholder(name: &str) -> Self {
        Self {
            name: name.to_string(),
            channels: VolumeChannels::empty(),
            not_yet_hit: true,
        }
    }

    /// Tagged представление: `"Body_0_1"`, `"Torso_notHit"`.
    pub fn tag(&self) -> String {
        let mut tag = self.name.clone();
        if self.not_yet_hit {
            tag.push(TAG_SEPARATOR);
            tag.push_str("notHit");
        }
        for volume in self.channels.volumes() {
            tag.push(TAG_SEPARATOR);
            tag.push_str(&volume.tag_index().to_string());
        }
        tag
    }
}

/// Top-level entity + её ударенные группы (в порядке попадания).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HitRecord {
    pub entity: Entity,
    pub groups: Vec<GroupEntry>,
}

impl HitRecord {
    fn group_index(&self, name: &str) -> Option<usize> {
        self.groups.iter().position(|group| group.name == name)
    }
}

/// Parent участника (актёр, к которому прикреплена часть).
///
/// `group_id` = `Some` только если у parent'а есть своя damage capability.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParentLink {
    pub entity: Entity,
    pub group_id: Option<String>,
}

/// Участник удара с damage capability.
#[derive(Clone, Copy, Debug)]
pub struct HitParticipant<'a> {
    pub entity: Entity,
    pub group_id: &'a str,
    pub parent: Option<&'a ParentLink>,
}

impl HitParticipant<'_> {
    /// Entity, под которой участник хранится в ledger.
    pub fn owning_entity(&self) -> Entity {
        self.parent.map_or(self.entity, |parent| parent.entity)
    }
}

/// Результат `register_participant`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitRegistration {
    NewEntity,
    /// Record создан через sub-part, parent помечен placeholder'ом.
    NewParent,
    NewGroup,
    PlaceholderClaimed,
    NewChannel(VolumeType),
    AlreadyHit,
}

impl HitRegistration {
    /// Надо ли доставлять данные.
    pub fn is_new(self) -> bool {
        !matches!(self, HitRegistration::AlreadyHit)
    }

    pub fn describe(self) -> &'static str {
        match self {
            HitRegistration::NewEntity => "Parent not found. Added parent record.",
            HitRegistration::NewParent => {
                "Parent not found. Added group and parent with notHit placeholder."
            }
            HitRegistration::NewGroup => "Parent found. Added group.",
            HitRegistration::PlaceholderClaimed => "Object in ledger but had notHit placeholder.",
            HitRegistration::NewChannel(_) => "Group found. Added volume channel.",
            HitRegistration::AlreadyHit => "Object in ledger. Already hit on this channel.",
        }
    }
}

/// Ledger попаданий одной активации.
///
/// Records отсортированы по `Entity` (binary search).
#[derive(Clone, Debug, Default)]
pub struct HitLedger {
    filter_by_channel: bool,
    records: Vec<HitRecord>,
}

impl HitLedger {
    pub fn new(filter_by_channel: bool) -> Self {
        Self {
            filter_by_channel,
            records: Vec::new(),
        }
    }

    pub fn filter_by_channel(&self) -> bool {
        self.filter_by_channel
    }

    /// Регистрирует удар по участнику с damage capability.
    ///
    /// `is_new()` результата = надо доставить данные атаки.
    pub fn register_participant(
        &mut self,
        participant: HitParticipant<'_>,
        channel: VolumeType,
    ) -> HitRegistration {
        let channels = self.channel_tag(channel);
        let owner = participant.owning_entity();

        let index = match self.find(owner) {
            Ok(index) => index,
            Err(index) => {
                let mut groups = Vec::with_capacity(2);
                let placeholder = participant
                    .parent
                    .and_then(|parent| parent.group_id.as_deref())
                    .filter(|parent_group| *parent_group != participant.group_id);

                if let Some(parent_group) = placeholder {
                    groups.push(GroupEntry::placeholder(parent_group));
                }
                groups.push(GroupEntry::hit(participant.group_id, channels));
                self.records.insert(index, HitRecord { entity: owner, groups });

                return if placeholder.is_some() {
                    HitRegistration::NewParent
                } else {
                    HitRegistration::NewEntity
                };
            }
        };

        let filter = self.filter_by_channel;
        let record = &mut self.records[index];
        let Some(group_index) = record.group_index(participant.group_id) else {
            record.groups.push(GroupEntry::hit(participant.group_id, channels));
            return HitRegistration::NewGroup;
        };

        let group = &mut record.groups[group_index];
        if group.not_yet_hit {
            group.not_yet_hit = false;
            group.channels = channels;
            return HitRegistration::PlaceholderClaimed;
        }

        if !filter {
            return HitRegistration::AlreadyHit;
        }

        let requested = VolumeChannels::from(channel);
        let blocked = group.channels.contains(requested)
            || group.channels.contains(VolumeChannels::ALL)
            || (channel == VolumeType::All && !group.channels.is_empty());
        if blocked {
            return HitRegistration::AlreadyHit;
        }

        group.channels.insert(requested);
        HitRegistration::NewChannel(channel)
    }

    /// Регистрирует entity без damage capability.
    ///
    /// Возвращает `true`, если entity ещё не было в ledger.
    pub fn register_non_capable(&mut self, entity: Entity) -> bool {
        match self.find(entity) {
            Ok(_) => false,
            Err(index) => {
                self.records.insert(
                    index,
                    HitRecord {
                        entity,
                        groups: Vec::new(),
                    },
                );
                true
            }
        }
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.find(entity).is_ok()
    }

    /// Была ли группа реально ударена (placeholder не считается).
    pub fn was_group_hit(&self, entity: Entity, group_id: &str) -> bool {
        self.group(entity, group_id)
            .is_some_and(|group| !group.not_yet_hit)
    }

    /// Каналы, через которые группа уже получила данные.
    pub fn delivered_channels(&self, entity: Entity, group_id: &str) -> VolumeChannels {
        self.group(entity, group_id)
            .map(|group| group.channels)
            .unwrap_or_default()
    }

    pub fn record(&self, entity: Entity) -> Option<&HitRecord> {
        self.find(entity).ok().map(|index| &self.records[index])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HitRecord> {
        self.records.iter()
    }

    /// Полная очистка (новая активация атаки).
    pub fn clear(&mut self) {
        self.records.clear();
    }

    fn group(&self, entity: Entity, group_id: &str) -> Option<&GroupEntry> {
        let record = self.record(entity)?;
        record.groups.iter().find(|group| group.name == group_id)
    }

    fn channel_tag(&self, channel: VolumeType) -> VolumeChannels {
        if self.filter_by_channel {
            VolumeChannels::from(channel)
        } else {
            VolumeChannels::empty()
        }
    }

    fn find(&self, entity: Entity) -> Result<usize, usize> {
        self.records
            .binary_search_by(|record| record.entity.cmp(&entity))
    }
}

impl fmt::Display for HitLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.records.is_empty() {
            return write!(f, "HitList: Empty");
        }

        for record in &self.records {
            write!(f, "[ parent: {}", record.entity)?;
            if !record.groups.is_empty() {
                let tags: Vec<String> = record.groups.iter().map(GroupEntry::tag).collect();
                write!(f, ", groupID: {}", tags.join(", "))?;
            }
            write!(f, " ]")?;
        }
        Ok(())
    }
}
