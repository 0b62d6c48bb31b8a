//! Subscribers to registry changes

use std::sync::{Arc, RwLock};

use super::ttl::{Notice, TargetEvent};
use crate::models::Mmsi;
use crate::route::AddressedRouteSuggestion;
use crate::target::{Target, TargetKind, TargetSettings};

/// Receives registry changes.
///
/// Called synchronously from ingestion and the sweep, after the registry
/// locks have been released. Calls for one target never overlap and follow
/// the order its changes were made in; a change already superseded when its
/// turn comes is skipped. There is no ordering across targets. A listener
/// must not ingest messages for the target it is being told about.
pub trait TargetListener: Send + Sync {
    fn on_target_updated(&self, target: &Target);

    fn on_target_removed(&self, _kind: TargetKind, _mmsi: Mmsi) {}

    fn on_route_suggestion(&self, _suggestion: &AddressedRouteSuggestion) {}

    fn on_settings_changed(&self, _settings: &TargetSettings) {}
}

/// Listener list that may change while a notification is running
#[derive(Default)]
pub struct Listeners {
    inner: RwLock<Vec<Arc<dyn TargetListener>>>,
}

impl Listeners {
    pub fn add(&self, listener: Arc<dyn TargetListener>) {
        self.inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(listener);
    }

    pub fn remove(&self, listener: &Arc<dyn TargetListener>) -> bool {
        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let before = inner.len();
        inner.retain(|l| !same_listener(l, listener));
        inner.len() != before
    }

    pub fn len(&self) -> usize {
        self.current().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver a stamped target change in its per-target order
    pub fn deliver(&self, notice: Notice) -> bool {
        notice.deliver(|event| match event {
            TargetEvent::Updated(target) => self.target_updated(target),
            TargetEvent::Removed(kind, mmsi) => self.target_removed(*kind, *mmsi),
        })
    }

    pub fn target_updated(&self, target: &Target) {
        for listener in self.current() {
            listener.on_target_updated(target);
        }
    }

    pub fn target_removed(&self, kind: TargetKind, mmsi: Mmsi) {
        for listener in self.current() {
            listener.on_target_removed(kind, mmsi);
        }
    }

    pub fn route_suggestion(&self, suggestion: &AddressedRouteSuggestion) {
        for listener in self.current() {
            listener.on_route_suggestion(suggestion);
        }
    }

    pub fn settings_changed(&self, settings: &TargetSettings) {
        for listener in self.current() {
            listener.on_settings_changed(settings);
        }
    }

    /// Copy of the list; notification runs without holding the lock
    fn current(&self) -> Vec<Arc<dyn TargetListener>> {
        self.inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

fn same_listener(a: &Arc<dyn TargetListener>, b: &Arc<dyn TargetListener>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}
