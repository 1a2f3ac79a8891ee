//! AttackComposite: контейнер payload'ов одной атаки.
//!
//! 0..n `AttackData` собираются в composite, который передаётся цели.
//! Хранение по `id`: один payload на `id`, повторный `add` перезаписывает.
//!
//! # Storage
//!
//! - пусто
//! - один payload (без аллокации вектора)
//! - `Vec`, отсортированный по `id` (binary search)
//!
//! Методы `get*` возвращают ссылки на хранимые данные (без копий).
//! Изменение только через `update*`: после него порядок по `id` восстановлен.
//! Методы `sub_composite*` / `copy_*` возвращают глубокие копии.

use std::fmt;

use rand::Rng;

use super::data::{AttackData, AttackDataKind, RandomDamageData, VolumeType};

#[derive(Clone, Debug, Default, PartialEq)]
enum Storage {
    #[default]
    Empty,
    Single(AttackData),
    Many(Vec<AttackData>),
}

/// Набор payload'ов атаки, отсортированный по `id`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttackComposite {
    storage: Storage,
}

impl AttackComposite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(data: impl Into<AttackData>) -> Self {
        Self {
            storage: Storage::Single(data.into()),
        }
    }

    /// Добавляет payload. Payload с тем же `id` перезаписывается.
    ///
    /// Второй payload с отличным `id` переводит storage в `Vec`.
    pub fn add(&mut self, data: impl Into<AttackData>) {
        let data = data.into();

        self.storage = match std::mem::take(&mut self.storage) {
            Storage::Empty => Storage::Single(data),
            Storage::Single(existing) if existing.id() == data.id() => Storage::Single(data),
            Storage::Single(existing) => {
                let mut list = Vec::with_capacity(3);
                list.push(existing);
                insert_sorted(&mut list, data);
                Storage::Many(list)
            }
            Storage::Many(mut list) => {
                insert_sorted(&mut list, data);
                Storage::Many(list)
            }
        };
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// Payload'ы в порядке `id`.
    pub fn as_slice(&self) -> &[AttackData] {
        match &self.storage {
            Storage::Empty => &[],
            Storage::Single(data) => std::slice::from_ref(data),
            Storage::Many(list) => list.as_slice(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AttackData> {
        self.as_slice().iter()
    }

    /// Изменяет каждый payload через `f`.
    ///
    /// Если `f` сменил `id` payload'а, composite пересобирается: порядок
    /// по `id` восстанавливается, изменённый payload перезаписывает
    /// payload с тем же `id`.
    pub fn update_each(&mut self, mut f: impl FnMut(&mut AttackData)) {
        let before: Vec<String> = self.iter().map(|data| data.id().to_string()).collect();
        for data in self.as_mut_slice() {
            f(data);
        }
        self.restore_order(&before);
    }

    fn as_mut_slice(&mut self) -> &mut [AttackData] {
        match &mut self.storage {
            Storage::Empty => &mut [],
            Storage::Single(data) => std::slice::from_mut(data),
            Storage::Many(list) => list.as_mut_slice(),
        }
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.index_of(id).is_some()
    }

    // ------------------------------------------------------------------------
    // Direct access (без копий)
    // ------------------------------------------------------------------------

    pub fn get(&self, id: &str) -> Option<&AttackData> {
        self.index_of(id).map(|index| &self.as_slice()[index])
    }

    /// Payload с данным `id`, narrowed до `T`.
    ///
    /// ```ignore
    /// let self_force = composite.get_as::<ForceData>("ForceData_Self");
    /// ```
    pub fn get_as<T: AttackDataKind>(&self, id: &str) -> Option<&T> {
        self.get(id).and_then(T::narrow)
    }

    /// Изменяет payload `id`, narrowed до `T`. `None`, если такого нет.
    ///
    /// Смена `id` внутри `f` переносит payload на новое место (как `add`).
    pub fn update_as<T: AttackDataKind, R>(
        &mut self,
        id: &str,
        f: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        let index = self.index_of(id)?;
        let result = T::narrow_mut(&mut self.as_mut_slice()[index]).map(f)?;

        if self.as_slice()[index].id() != id {
            if let Some(moved) = self.remove_at(index) {
                self.add(moved);
            }
        }
        Some(result)
    }

    /// Payload, чей `id` равен каноническому имени `T` (без tag'ов).
    pub fn get_kind<T: AttackDataKind>(&self) -> Option<&T> {
        self.get_as::<T>(T::ID)
    }

    pub fn update_kind<T: AttackDataKind, R>(&mut self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.update_as::<T, R>(T::ID, f)
    }

    /// Payload'ы, которые проходят через volume `filter`.
    ///
    /// `VolumeType::All` возвращает всё. Пустой результат не ошибка.
    pub fn get_all(&self, filter: VolumeType) -> Vec<&AttackData> {
        self.iter()
            .filter(|data| filter.routes(data.volume_type()))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Copies
    // ------------------------------------------------------------------------

    /// Глубокая копия composite.
    pub fn deep_copy(&self) -> Self {
        self.clone()
    }

    pub fn copy_attack_data(&self, id: &str) -> Option<AttackData> {
        self.get(id).map(AttackData::deep_copy)
    }

    pub fn copy_attack_data_as<T: AttackDataKind + Clone>(&self, id: &str) -> Option<T> {
        self.get_as::<T>(id).cloned()
    }

    /// Копия payload'а с данным `id` (или пустой composite).
    pub fn sub_composite(&self, id: &str) -> Self {
        self.filtered(|data| data.id() == id)
    }

    /// Копии payload'ов, которые проходят через volume `volume`.
    pub fn sub_composite_for(&self, volume: VolumeType) -> Self {
        self.filtered(|data| volume.routes(data.volume_type()))
    }

    /// Копии payload'ов, у которых один из tokens `id` равен `tag`.
    ///
    /// `sub_composite_tagged(&['_'], "Self")` вернёт `"ForceData_Self"`,
    /// `"Self_DamageData"` и т.п.
    pub fn sub_composite_tagged(&self, separators: &[char], tag: &str) -> Self {
        self.filtered(|data| data.has_tag(separators, tag))
    }

    pub fn sub_composite_exclude(&self, id: &str) -> Self {
        self.filtered(|data| data.id() != id)
    }

    pub fn sub_composite_exclude_for(&self, volume: VolumeType) -> Self {
        self.filtered(|data| !volume.routes(data.volume_type()))
    }

    pub fn sub_composite_exclude_tagged(&self, separators: &[char], tag: &str) -> Self {
        self.filtered(|data| !data.has_tag(separators, tag))
    }

    /// Есть ли ещё не rolled `RandomDamageData`.
    pub fn has_unrolled_damage(&self) -> bool {
        self.iter()
            .filter_map(RandomDamageData::narrow)
            .any(|random| !random.is_rolled())
    }

    /// Roll всех ещё не rolled `RandomDamageData`.
    pub fn roll_random_damage<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for data in self.as_mut_slice() {
            if let Some(random) = RandomDamageData::narrow_mut(data) {
                if !random.is_rolled() {
                    random.roll(rng);
                }
            }
        }
    }

    fn filtered(&self, keep: impl Fn(&AttackData) -> bool) -> Self {
        self.iter().filter(|data| keep(data)).cloned().collect()
    }

    fn remove_at(&mut self, index: usize) -> Option<AttackData> {
        match std::mem::take(&mut self.storage) {
            Storage::Empty => None,
            Storage::Single(data) => Some(data),
            Storage::Many(mut list) => {
                let data = list.remove(index);
                self.storage = match list.len() {
                    0 => Storage::Empty,
                    1 => Storage::Single(list.remove(0)),
                    _ => Storage::Many(list),
                };
                Some(data)
            }
        }
    }

    /// Пересобирает storage, если `id` разошлись с `before`.
    ///
    /// Неизменённые payload'ы добавляются первыми, изменённые поверх них.
    fn restore_order(&mut self, before: &[String]) {
        let changed = self
            .iter()
            .zip(before)
            .any(|(data, id)| data.id() != id.as_str());
        if !changed {
            return;
        }

        let list: Vec<AttackData> = match std::mem::take(&mut self.storage) {
            Storage::Empty => Vec::new(),
            Storage::Single(data) => vec![data],
            Storage::Many(list) => list,
        };
        let (kept, moved): (Vec<_>, Vec<_>) = list
            .into_iter()
            .zip(before)
            .partition(|(data, id)| data.id() == id.as_str());

        self.extend(kept.into_iter().map(|(data, _)| data));
        self.extend(moved.into_iter().map(|(data, _)| data));
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.as_slice()
            .binary_search_by(|probe| probe.id().cmp(id))
            .ok()
    }
}

fn insert_sorted(list: &mut Vec<AttackData>, data: AttackData) {
    match list.binary_search_by(|probe| probe.id().cmp(data.id())) {
        Ok(index) => list[index] = data,
        Err(index) => list.insert(index, data),
    }
}

impl From<AttackData> for AttackComposite {
    fn from(data: AttackData) -> Self {
        Self::from_data(data)
    }
}

impl FromIterator<AttackData> for AttackComposite {
    fn from_iter<I: IntoIterator<Item = AttackData>>(iter: I) -> Self {
        let mut composite = Self::new();
        composite.extend(iter);
        composite
    }
}

impl Extend<AttackData> for AttackComposite {
    fn extend<I: IntoIterator<Item = AttackData>>(&mut self, iter: I) {
        for data in iter {
            self.add(data);
        }
    }
}

impl<'a> IntoIterator for &'a AttackComposite {
    type Item = &'a AttackData;
    type IntoIter = std::slice::Iter<'a, AttackData>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for AttackComposite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.storage {
            Storage::Empty => write!(f, "No Components."),
            Storage::Single(data) => write!(f, "Component:\n    {}", data),
            Storage::Many(list) => {
                writeln!(f, "Components:")?;
                for data in list {
                    writeln!(f, "    {}", data)?;
                }
                Ok(())
            }
        }
    }
}
