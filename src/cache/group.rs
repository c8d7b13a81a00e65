//! Per-type component groups and their slots.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use super::AnyArc;

/// One (type, key) position in the cache.
///
/// The slot is installed in its group before the factory runs; concurrent
/// lookups for the same key block on the cell instead of running their own
/// factory. A failed or panicking initialization leaves the cell empty.
pub(crate) struct Slot {
    cell: OnceCell<AnyArc>,
}

impl Slot {
    fn new() -> Self {
        Self { cell: OnceCell::new() }
    }

    #[inline]
    pub(crate) fn get(&self) -> Option<&AnyArc> {
        self.cell.get()
    }

    pub(crate) fn get_or_try_init<F, E>(&self, init: F) -> Result<&AnyArc, E>
    where
        F: FnOnce() -> Result<AnyArc, E>,
    {
        self.cell.get_or_try_init(init)
    }
}

/// Instances cached for one component type, keyed by disambiguator.
///
/// The key map lock is only held to look up, install or remove a slot, never
/// while a factory runs.
#[derive(Default)]
pub(crate) struct ComponentGroup {
    slots: Mutex<HashMap<String, Arc<Slot>>>,
}

impl ComponentGroup {
    /// Returns the slot for `key`, installing an empty one if needed.
    pub(crate) fn slot(&self, key: &str) -> Arc<Slot> {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get(key) {
            return slot.clone();
        }
        let slot = Arc::new(Slot::new());
        slots.insert(key.to_owned(), slot.clone());
        slot
    }

    /// Returns the live instance for `key` without creating one.
    pub(crate) fn peek(&self, key: &str) -> Option<AnyArc> {
        self.slots.lock().get(key)?.get().cloned()
    }

    /// Evicts the live instance under `key`.
    ///
    /// A slot whose factory is still running is left in place: the release
    /// is ordered before that creation.
    pub(crate) fn remove(&self, key: &str) -> Option<AnyArc> {
        let mut slots = self.slots.lock();
        let instance = slots.get(key)?.get()?.clone();
        slots.remove(key);
        Some(instance)
    }

    /// Drops the empty slot under `key` once no caller holds it any more.
    ///
    /// Failed callers release their own handle before calling this, so the
    /// last one to finish sees only the map's reference and removes it.
    pub(crate) fn discard_if_vacant(&self, key: &str) -> bool {
        let mut slots = self.slots.lock();
        let vacant = match slots.get(key) {
            // Slots are only cloned out of the map under this lock, so a
            // count of one means no lookup is using or waiting on it
            Some(current) => current.get().is_none() && Arc::strong_count(current) == 1,
            None => false,
        };
        if vacant {
            slots.remove(key);
        }
        vacant
    }

    /// Keys holding a live instance, sorted.
    pub(crate) fn live_keys(&self) -> Vec<String> {
        let slots = self.slots.lock();
        let mut keys: Vec<String> = slots
            .iter()
            .filter(|(_, slot)| slot.get().is_some())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.lock().values().filter(|slot| slot.get().is_some()).count()
    }

    #[cfg(test)]
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// Evicts every live instance and returns their keys.
    pub(crate) fn drain_live(&self) -> Vec<String> {
        let mut slots = self.slots.lock();
        let mut drained = Vec::new();
        slots.retain(|key, slot| {
            if slot.get().is_some() {
                drained.push(key.clone());
                false
            } else {
                true
            }
        });
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(v: u32) -> AnyArc {
        Arc::new(v)
    }

    #[test]
    fn slot_is_shared_per_key() {
        let group = ComponentGroup::default();
        let a = group.slot("a");
        let again = group.slot("a");
        let b = group.slot("b");
        assert!(Arc::ptr_eq(&a, &again));
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn remove_ignores_slots_still_being_created() {
        let group = ComponentGroup::default();
        let slot = group.slot("pending");
        assert!(group.remove("pending").is_none());

        slot.get_or_try_init(|| Ok::<_, ()>(value(1))).unwrap();
        assert!(group.remove("pending").is_some());
        assert!(group.peek("pending").is_none());
    }

    #[test]
    fn discard_keeps_slots_held_elsewhere() {
        let group = ComponentGroup::default();
        let first = group.slot("k");
        let second = group.slot("k");

        drop(first);
        assert!(!group.discard_if_vacant("k"));
        assert_eq!(group.slots.lock().len(), 1);

        drop(second);
        assert!(group.discard_if_vacant("k"));
        assert!(group.slots.lock().is_empty());
    }

    #[test]
    fn last_of_two_failed_callers_discards_the_slot() {
        let group = ComponentGroup::default();
        let first = group.slot("k");
        let second = group.slot("k");

        // Both initializations fail before either caller cleans up
        assert!(first.get_or_try_init(|| Err::<AnyArc, _>("first")).is_err());
        assert!(second.get_or_try_init(|| Err::<AnyArc, _>("second")).is_err());

        drop(first);
        assert!(!group.discard_if_vacant("k"));
        drop(second);
        assert!(group.discard_if_vacant("k"));
        assert!(group.peek("k").is_none());
        assert!(group.slots.lock().is_empty());
    }

    #[test]
    fn discard_keeps_live_slots() {
        let group = ComponentGroup::default();
        group.slot("k").get_or_try_init(|| Ok::<_, ()>(value(1))).unwrap();

        assert!(!group.discard_if_vacant("k"));
        assert!(group.peek("k").is_some());
    }

    #[test]
    fn len_and_keys_count_live_instances_only() {
        let group = ComponentGroup::default();
        group.slot("z").get_or_try_init(|| Ok::<_, ()>(value(1))).unwrap();
        group.slot("a").get_or_try_init(|| Ok::<_, ()>(value(2))).unwrap();
        let _pending = group.slot("m");

        assert_eq!(group.len(), 2);
        assert_eq!(group.live_keys(), vec!["a".to_string(), "z".to_string()]);

        let mut drained = group.drain_live();
        drained.sort();
        assert_eq!(drained, vec!["a".to_string(), "z".to_string()]);
        assert_eq!(group.len(), 0);
    }
}
