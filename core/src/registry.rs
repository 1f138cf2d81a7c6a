//! Bookkeeping of live tweens per target.

use crate::tween::{Tween, TweenId};
use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};

/// Identity of a target, derived from the address of its shared allocation.
///
/// The registry only holds weak references, so an address can be reused once its target is
/// dropped. Lookups always check that the stored reference is still alive.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub(crate) struct TargetKey(usize);

impl TargetKey {
    pub(crate) fn of<T: ?Sized>(target: &Rc<T>) -> Self {
        Self(Rc::as_ptr(target) as *const () as usize)
    }
}

struct TargetEntry<T: ?Sized> {
    target: Weak<T>,
    tweens: BTreeMap<TweenId, Rc<Tween>>,
}

/// Outcome of [`TargetRegistry::remove`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Removal {
    /// No such tween was registered.
    Missing,
    /// The tween was removed; its target still has other live tweens.
    Removed,
    /// The tween was removed and was the last one for its target, whose entry is now gone.
    Emptied,
}

/// Live tweens keyed by target, then by id.
///
/// A target is present exactly as long as it has at least one live tween. Targets are held weakly;
/// the registry never keeps one alive.
pub(crate) struct TargetRegistry<T: ?Sized> {
    entries: HashMap<TargetKey, TargetEntry<T>>,
}

impl<T: ?Sized> Default for TargetRegistry<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T: ?Sized> TargetRegistry<T> {
    fn entry(&self, target: &Rc<T>) -> Option<&TargetEntry<T>> {
        self.entries
            .get(&TargetKey::of(target))
            .filter(|entry| entry.target.strong_count() > 0)
    }

    /// Registers `tween` under `target`.
    ///
    /// Any entry left behind by a dropped target at the same address is replaced.
    pub(crate) fn insert(&mut self, target: &Rc<T>, tween: Rc<Tween>) {
        let entry = self
            .entries
            .entry(TargetKey::of(target))
            .or_insert_with(|| TargetEntry {
                target: Rc::downgrade(target),
                tweens: BTreeMap::new(),
            });
        if entry.target.strong_count() == 0 {
            entry.target = Rc::downgrade(target);
            entry.tweens.clear();
        }
        entry.tweens.insert(tween.id(), tween);
    }

    /// Other live tweens of the same target and property name as `tween`, oldest first.
    pub(crate) fn siblings(&self, tween: &Tween) -> Vec<Rc<Tween>> {
        let Some(entry) = self.entries.get(&tween.target()) else {
            return Vec::new();
        };
        entry
            .tweens
            .values()
            .filter(|other| other.id() != tween.id() && other.name() == tween.name())
            .cloned()
            .collect()
    }

    pub(crate) fn remove(&mut self, target: TargetKey, id: TweenId) -> Removal {
        let Some(entry) = self.entries.get_mut(&target) else {
            return Removal::Missing;
        };
        if entry.tweens.remove(&id).is_none() {
            return Removal::Missing;
        }
        if entry.tweens.is_empty() {
            self.entries.remove(&target);
            Removal::Emptied
        } else {
            Removal::Removed
        }
    }

    /// Removes every target that has been dropped, returning the tweens that were registered
    /// under them.
    pub(crate) fn take_dropped(&mut self) -> Vec<Rc<Tween>> {
        let dropped: Vec<TargetKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.target.strong_count() == 0)
            .map(|(key, _)| *key)
            .collect();
        dropped
            .into_iter()
            .filter_map(|key| self.entries.remove(&key))
            .flat_map(|entry| entry.tweens.into_values())
            .collect()
    }

    /// Removes every target, returning all registered tweens.
    pub(crate) fn drain(&mut self) -> Vec<Rc<Tween>> {
        self.entries
            .drain()
            .flat_map(|(_, entry)| entry.tweens.into_values())
            .collect()
    }

    /// Whether `target` still has an entry although the target itself has been dropped.
    pub(crate) fn is_dropped(&self, target: TargetKey) -> bool {
        self.entries
            .get(&target)
            .is_some_and(|entry| entry.target.strong_count() == 0)
    }

    pub(crate) fn contains(&self, target: &Rc<T>) -> bool {
        self.entry(target).is_some()
    }

    /// Live tweens of `target`, oldest first.
    pub(crate) fn tweens(&self, target: &Rc<T>) -> Vec<Rc<Tween>> {
        self.entry(target)
            .map(|entry| entry.tweens.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of live targets.
    pub(crate) fn len(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.target.strong_count() > 0)
            .count()
    }
}
