//! Concurrent per-kind target map with lifecycle sweeps

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;

use crate::models::Mmsi;
use crate::target::{Lifecycle, SweepAction, Target, TargetKind};

/// Lock a target, recovering the data if a previous holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A change of one target, captured while the target was locked
#[derive(Debug, Clone)]
pub enum TargetEvent {
    Updated(Target),
    Removed(TargetKind, Mmsi),
}

/// A target event stamped with its place in that target's history
#[derive(Debug)]
pub struct Notice {
    event: TargetEvent,
    version: u64,
    order: Arc<DeliveryOrder>,
}

impl Notice {
    pub fn event(&self) -> &TargetEvent {
        &self.event
    }

    /// Hand the event to `deliver` unless a later change of the same target
    /// has been delivered already. Deliveries for one target never overlap.
    pub fn deliver<F: FnOnce(&TargetEvent)>(self, deliver: F) -> bool {
        let Notice {
            event,
            version,
            order,
        } = self;
        order.deliver(version, || deliver(&event))
    }
}

/// How far the notices of one target have been delivered
#[derive(Debug, Default)]
struct DeliveryOrder {
    turn: Mutex<()>,
    delivered: AtomicU64,
}

impl DeliveryOrder {
    fn deliver<F: FnOnce()>(&self, version: u64, deliver: F) -> bool {
        let _turn = lock(&self.turn);
        if version < self.delivered.load(Ordering::Acquire) {
            return false;
        }
        deliver();
        self.delivered.store(version, Ordering::Release);
        true
    }

    fn has_delivered(&self, version: u64) -> bool {
        self.delivered.load(Ordering::Acquire) >= version
    }
}

struct SlotState<T> {
    /// `None` once evicted, until the removal has been delivered
    target: Option<T>,
    version: u64,
    /// Set when the slot leaves the map; writers holding it must look again
    detached: bool,
}

impl<T> SlotState<T> {
    fn stamp(&mut self) -> u64 {
        self.version += 1;
        self.version
    }
}

struct Slot<T> {
    state: Mutex<SlotState<T>>,
    order: Arc<DeliveryOrder>,
}

impl<T> Slot<T> {
    fn new(target: Option<T>) -> Self {
        Self {
            state: Mutex::new(SlotState {
                target,
                version: 0,
                detached: false,
            }),
            order: Arc::new(DeliveryOrder::default()),
        }
    }

    fn notice(&self, version: u64, event: TargetEvent) -> Notice {
        Notice {
            event,
            version,
            order: Arc::clone(&self.order),
        }
    }
}

/// Targets of one kind keyed by MMSI, each behind its own lock.
///
/// The map lock is never held while waiting for a target lock, except when
/// detaching evicted slots. Every change returns a [`Notice`] stamped under
/// the target lock, so notifications for one target are delivered in the
/// order the changes were made even though they run after the lock is
/// released. An evicted target stays in the map as a tombstone until its
/// removal has been delivered; a report arriving meanwhile revives it in
/// place.
pub struct TtlRegistry<T> {
    kind: TargetKind,
    entries: DashMap<Mmsi, Arc<Slot<T>>>,
}

impl<T: Lifecycle + Clone> TtlRegistry<T> {
    pub fn new(kind: TargetKind) -> Self {
        Self {
            kind,
            entries: DashMap::new(),
        }
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    /// Update the target, creating it first if needed
    pub fn upsert<C, U>(&self, mmsi: Mmsi, create: C, update: U) -> Notice
    where
        C: Fn() -> T,
        U: FnOnce(&mut T),
    {
        loop {
            let slot = Arc::clone(
                self.entries
                    .entry(mmsi)
                    .or_insert_with(|| Arc::new(Slot::new(Some(create()))))
                    .value(),
            );
            let mut state = lock(&slot.state);
            if state.detached {
                continue;
            }
            let target = state.target.get_or_insert_with(&create);
            update(target);
            let event = TargetEvent::Updated(target.to_target());
            let version = state.stamp();
            return slot.notice(version, event);
        }
    }

    /// Apply `f` to an existing target; `None` if there is none
    pub fn update_existing<F>(&self, mmsi: Mmsi, f: F) -> Option<Notice>
    where
        F: FnOnce(&mut T),
    {
        loop {
            let slot = self.entries.get(&mmsi).map(|e| Arc::clone(e.value()))?;
            let mut state = lock(&slot.state);
            if state.detached {
                continue;
            }
            let target = state.target.as_mut()?;
            f(target);
            let event = TargetEvent::Updated(target.to_target());
            let version = state.stamp();
            return Some(slot.notice(version, event));
        }
    }

    /// Replace or add a target as a whole
    pub fn insert(&self, mmsi: Mmsi, target: T) {
        loop {
            let slot = Arc::clone(
                self.entries
                    .entry(mmsi)
                    .or_insert_with(|| Arc::new(Slot::new(None)))
                    .value(),
            );
            let mut state = lock(&slot.state);
            if state.detached {
                continue;
            }
            state.target = Some(target);
            state.stamp();
            return;
        }
    }

    /// Owned copy of one target
    pub fn get(&self, mmsi: Mmsi) -> Option<T> {
        let slot = self.entries.get(&mmsi).map(|e| Arc::clone(e.value()))?;
        let state = lock(&slot.state);
        state.target.clone()
    }

    pub fn contains(&self, mmsi: Mmsi) -> bool {
        let Some(slot) = self.entries.get(&mmsi).map(|e| Arc::clone(e.value())) else {
            return false;
        };
        let state = lock(&slot.state);
        state.target.is_some()
    }

    /// Owned copies of every target
    pub fn values(&self) -> Vec<T> {
        self.slots()
            .into_iter()
            .filter_map(|(_, slot)| {
                let state = lock(&slot.state);
                state.target.clone()
            })
            .collect()
    }

    /// The current state of every target, ordered after what was already
    /// delivered for it
    pub fn notices(&self) -> Vec<Notice> {
        self.slots()
            .into_iter()
            .filter_map(|(_, slot)| {
                let state = lock(&slot.state);
                let target = state.target.as_ref()?;
                Some(slot.notice(state.version, TargetEvent::Updated(target.to_target())))
            })
            .collect()
    }

    /// Current state of one target, as [`notices`](Self::notices)
    pub fn notice(&self, mmsi: Mmsi) -> Option<Notice> {
        let slot = self.entries.get(&mmsi).map(|e| Arc::clone(e.value()))?;
        let state = lock(&slot.state);
        let target = state.target.as_ref()?;
        Some(slot.notice(state.version, TargetEvent::Updated(target.to_target())))
    }

    /// Apply `f` to every target; targets for which it returns `true` are reported
    pub fn update_all<F>(&self, mut f: F) -> Vec<Notice>
    where
        F: FnMut(&mut T) -> bool,
    {
        self.slots()
            .into_iter()
            .filter_map(|(_, slot)| {
                let mut state = lock(&slot.state);
                let target = state.target.as_mut()?;
                if !f(target) {
                    return None;
                }
                let event = TargetEvent::Updated(target.to_target());
                let version = state.stamp();
                Some(slot.notice(version, event))
            })
            .collect()
    }

    /// Number of live targets
    pub fn len(&self) -> usize {
        self.slots()
            .into_iter()
            .filter(|(_, slot)| lock(&slot.state).target.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.retain(|_, slot| {
            lock(&slot.state).detached = true;
            false
        });
    }

    /// Run the lifecycle step over every target.
    ///
    /// Iteration works on a copy of the handles so the map itself is never
    /// modified while it is being walked. Dead targets become tombstones;
    /// [`purge`](Self::purge) unmaps them once their removal is delivered.
    pub fn sweep(&self, now: DateTime<Utc>, strict: bool, history_ttl: TimeDelta) -> Vec<Notice> {
        let mut notices = Vec::new();

        for (mmsi, slot) in self.slots() {
            let mut state = lock(&slot.state);
            let Some(target) = state.target.as_mut() else {
                continue;
            };
            target.prune(history_ttl, now);
            let event = match target.sweep(now, strict) {
                SweepAction::Unchanged => continue,
                SweepAction::Changed => TargetEvent::Updated(target.to_target()),
                SweepAction::Evict => {
                    state.target = None;
                    TargetEvent::Removed(self.kind, mmsi)
                }
            };
            let version = state.stamp();
            notices.push(slot.notice(version, event));
        }

        notices
    }

    /// Unmap tombstones whose removal has been delivered; returns how many
    pub fn purge(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, slot| {
            let mut state = lock(&slot.state);
            if state.target.is_none() && slot.order.has_delivered(state.version) {
                state.detached = true;
                false
            } else {
                true
            }
        });
        before.saturating_sub(self.entries.len())
    }

    fn slots(&self) -> Vec<(Mmsi, Arc<Slot<T>>)> {
        self.entries
            .iter()
            .map(|e| (*e.key(), Arc::clone(e.value())))
            .collect()
    }
}
