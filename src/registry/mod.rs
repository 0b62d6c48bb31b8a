//! Target registry: message dispatch, per-kind maps and staleness sweeps.

mod listeners;
mod ttl;

pub use listeners::{Listeners, TargetListener};
pub use ttl::{Notice, TargetEvent, TtlRegistry};

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::config::RegistryConfig;
use crate::errors::RegistryError;
use crate::models::{
    AddressedRouteMessage, AisMessage, AisMessageType, AtonReport, Mmsi, PositionReport,
    RouteMessage,
};
use crate::persistence::RegistrySnapshot;
use crate::route::{
    AddressedRouteSuggestion, BroadcastRouteSuggestion, IntendedRoute, SuggestionKey,
    SuggestionStatus,
};
use crate::status::ReceptionStatus;
use crate::target::{
    AisClass, AtonTarget, Lifecycle, MobileTarget, SarTarget, StaticData, Target, TargetKind,
    TargetSettings, VesselTarget,
};

/// What a handled message changed, published once the registry is unlocked
enum Change {
    Target(Notice),
    Suggestion(AddressedRouteSuggestion),
}

/// Live picture of every AIS target in range
pub struct TargetRegistry {
    config: RegistryConfig,
    default_settings: RwLock<TargetSettings>,
    vessels: TtlRegistry<VesselTarget>,
    sar_targets: TtlRegistry<SarTarget>,
    atons: TtlRegistry<AtonTarget>,
    suggestions: DashMap<SuggestionKey, AddressedRouteSuggestion>,
    broadcast_suggestions: DashMap<SuggestionKey, BroadcastRouteSuggestion>,
    listeners: Listeners,
    status: Arc<ReceptionStatus>,
    /// Held shared by every writer and exclusively by `snapshot`, so a
    /// snapshot sees all three maps at the same instant
    gate: RwLock<()>,
}

impl TargetRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        let default_settings = config.trajectory.default_settings();
        Self {
            config,
            default_settings: RwLock::new(default_settings),
            vessels: TtlRegistry::new(TargetKind::Vessel),
            sar_targets: TtlRegistry::new(TargetKind::Sar),
            atons: TtlRegistry::new(TargetKind::Aton),
            suggestions: DashMap::new(),
            broadcast_suggestions: DashMap::new(),
            listeners: Listeners::default(),
            status: Arc::new(ReceptionStatus::new()),
            gate: RwLock::new(()),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Reception health shared with status displays
    pub fn reception_status(&self) -> Arc<ReceptionStatus> {
        Arc::clone(&self.status)
    }

    pub fn add_listener(&self, listener: Arc<dyn TargetListener>) {
        self.listeners.add(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn TargetListener>) -> bool {
        self.listeners.remove(listener)
    }

    /// Handle a decoded AIS message received now
    pub fn ingest(&self, message: AisMessage) {
        self.ingest_at(message, Utc::now());
    }

    /// Handle a decoded AIS message received at `now`
    pub fn ingest_at(&self, message: AisMessage, now: DateTime<Utc>) {
        let change = {
            let _gate = self.shared_gate();
            self.status.mark_received(now);
            self.apply(message, now)
        };

        match change {
            Some(Change::Target(notice)) => {
                self.listeners.deliver(notice);
            }
            Some(Change::Suggestion(suggestion)) => self.listeners.route_suggestion(&suggestion),
            None => {}
        }
    }

    fn apply(&self, message: AisMessage, now: DateTime<Utc>) -> Option<Change> {
        let mmsi = message.mmsi;
        match message.message_type {
            AisMessageType::PositionReport(report) => {
                self.update_mobile(mmsi, AisClass::A, &report, now)
            }
            AisMessageType::ClassBPositionReport(report) => {
                self.update_mobile(mmsi, AisClass::B, &report, now)
            }
            AisMessageType::AtonReport(report) => self.update_aton(mmsi, &report, now),
            AisMessageType::StaticVoyage(report) => {
                self.update_static(mmsi, now, |data| data.merge_voyage(&report))
            }
            AisMessageType::ClassBStaticPartA(report) => {
                self.update_static(mmsi, now, |data| data.merge_part_a(&report))
            }
            AisMessageType::ClassBStaticPartB(report) => {
                self.update_static(mmsi, now, |data| data.merge_part_b(&report))
            }
            AisMessageType::BaseStationReport(_) => {
                debug!("Base station report from {} not tracked", mmsi);
                None
            }
            AisMessageType::IntendedRoute(route) => self.update_intended_route(mmsi, &route, now),
            AisMessageType::AddressedRouteSuggestion(message) => {
                self.update_addressed_suggestion(mmsi, &message, now)
            }
            AisMessageType::BroadcastRouteSuggestion(route) => {
                self.update_broadcast_suggestion(mmsi, &route, now);
                None
            }
        }
    }

    fn is_sart(&self, mmsi: Mmsi) -> bool {
        mmsi.has_prefix(&self.config.sart_prefix)
    }

    fn update_mobile(
        &self,
        mmsi: Mmsi,
        class: AisClass,
        report: &PositionReport,
        now: DateTime<Utc>,
    ) -> Option<Change> {
        if !report.position.is_plausible() {
            debug!(
                "Dropping position report from {} with implausible position ({}, {})",
                mmsi, report.position.lat, report.position.lon
            );
            return None;
        }

        let notice = if self.is_sart(mmsi) {
            self.sar_targets.upsert(
                mmsi,
                || {
                    info!("New SART {}", mmsi);
                    SarTarget::new(mmsi, self.default_settings(), now)
                },
                |sart| sart.update_position(report, now),
            )
        } else {
            self.vessels.upsert(
                mmsi,
                || {
                    VesselTarget::new(
                        mmsi,
                        class,
                        self.default_settings(),
                        self.config.show_intended_routes,
                        now,
                    )
                },
                |vessel| {
                    vessel.mobile.update_position(report, now);
                    vessel.ais_class = class;
                },
            )
        };
        Some(Change::Target(notice))
    }

    /// Static data only ever completes a target a position report created
    fn update_static<F>(&self, mmsi: Mmsi, now: DateTime<Utc>, apply: F) -> Option<Change>
    where
        F: FnOnce(&mut StaticData),
    {
        let notice = if self.is_sart(mmsi) {
            self.sar_targets
                .update_existing(mmsi, |sart| sart.mobile.update_static(now, apply))
        } else {
            self.vessels
                .update_existing(mmsi, |vessel| vessel.mobile.update_static(now, apply))
        };

        if notice.is_none() {
            debug!("Dropping static data for unknown target {}", mmsi);
        }
        notice.map(Change::Target)
    }

    fn update_aton(&self, mmsi: Mmsi, report: &AtonReport, now: DateTime<Utc>) -> Option<Change> {
        if !report.position.is_plausible() {
            debug!("Dropping AtoN report from {} with implausible position", mmsi);
            return None;
        }
        let notice = self.atons.upsert(
            mmsi,
            || AtonTarget::new(mmsi, now),
            |aton| aton.update(report, now),
        );
        Some(Change::Target(notice))
    }

    fn update_intended_route(
        &self,
        mmsi: Mmsi,
        message: &RouteMessage,
        now: DateTime<Utc>,
    ) -> Option<Change> {
        let route = IntendedRoute::decode(message, now, &self.config.route_bounds);
        let notice = self
            .vessels
            .update_existing(mmsi, |vessel| vessel.set_intended_route(route));
        if notice.is_none() {
            debug!("Dropping intended route for unknown vessel {}", mmsi);
        }
        notice.map(Change::Target)
    }

    fn update_addressed_suggestion(
        &self,
        sender: Mmsi,
        message: &AddressedRouteMessage,
        now: DateTime<Utc>,
    ) -> Option<Change> {
        if let Some(own) = self.config.own_mmsi {
            if message.destination != own {
                debug!(
                    "Ignoring route suggestion from {} addressed to {}",
                    sender, message.destination
                );
                return None;
            }
        }

        let route = IntendedRoute::decode(&message.route, now, &self.config.route_bounds);
        let key = SuggestionKey {
            sender,
            msg_link_id: route.msg_link_id,
        };

        let suggestion = match self.suggestions.entry(key) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                if route.cancelled {
                    info!("Route suggestion {} from {} cancelled", key.msg_link_id, sender);
                    existing.workflow.cancel();
                } else if existing.status() == SuggestionStatus::Cancelled {
                    *existing = AddressedRouteSuggestion::new(sender, message.destination, route);
                } else {
                    // Repeated transmission: new route, same answer
                    let workflow = existing.workflow.clone();
                    *existing = AddressedRouteSuggestion::new(sender, message.destination, route);
                    existing.workflow = workflow;
                }
                existing.clone()
            }
            Entry::Vacant(entry) => {
                if route.cancelled {
                    debug!("Cancellation for unknown route suggestion from {}", sender);
                    return None;
                }
                info!("Route suggestion {} from {}", key.msg_link_id, sender);
                let suggestion = AddressedRouteSuggestion::new(sender, message.destination, route);
                entry.insert(suggestion).value().clone()
            }
        };
        Some(Change::Suggestion(suggestion))
    }

    fn update_broadcast_suggestion(&self, sender: Mmsi, message: &RouteMessage, now: DateTime<Utc>) {
        let route = IntendedRoute::decode(message, now, &self.config.route_bounds);
        let key = SuggestionKey {
            sender,
            msg_link_id: route.msg_link_id,
        };
        if route.cancelled {
            self.broadcast_suggestions.remove(&key);
        } else {
            self.broadcast_suggestions
                .insert(key, BroadcastRouteSuggestion { sender, route });
        }
    }

    /// Answer a route suggestion on behalf of the operator
    pub fn set_suggestion_status(
        &self,
        key: SuggestionKey,
        status: SuggestionStatus,
    ) -> Result<AddressedRouteSuggestion, RegistryError> {
        let updated = {
            let mut suggestion =
                self.suggestions
                    .get_mut(&key)
                    .ok_or(RegistryError::UnknownSuggestion {
                        sender: key.sender.value(),
                        link_id: key.msg_link_id,
                    })?;
            suggestion.workflow.set_status(status, Utc::now())?;
            suggestion.clone()
        };
        info!(
            "Route suggestion {} from {} set to {:?}",
            key.msg_link_id, key.sender, status
        );
        self.listeners.route_suggestion(&updated);
        Ok(updated)
    }

    pub fn suggestions(&self) -> Vec<AddressedRouteSuggestion> {
        self.suggestions.iter().map(|s| s.value().clone()).collect()
    }

    pub fn broadcast_suggestions(&self) -> Vec<BroadcastRouteSuggestion> {
        self.broadcast_suggestions
            .iter()
            .map(|s| s.value().clone())
            .collect()
    }

    /// Run one staleness sweep over all targets at the current time
    pub fn sweep(&self) {
        self.sweep_at(Utc::now());
    }

    /// Run one staleness sweep over all targets as of `now`
    pub fn sweep_at(&self, now: DateTime<Utc>) {
        let strict = self.config.strict_timeout;
        let history_ttl =
            TimeDelta::from_std(self.config.trajectory.max_age).unwrap_or(TimeDelta::MAX);

        let notices = {
            let _gate = self.shared_gate();
            [
                self.vessels.sweep(now, strict, history_ttl),
                self.sar_targets.sweep(now, strict, history_ttl),
                self.atons.sweep(now, strict, history_ttl),
            ]
        };

        for notices in notices {
            for notice in notices {
                self.listeners.deliver(notice);
            }
        }

        // Removals are delivered, so re-created targets start a fresh history
        let purged = self.vessels.purge() + self.sar_targets.purge() + self.atons.purge();
        if purged > 0 {
            debug!("Sweep evicted {} targets", purged);
        }
    }

    /// Announce the current state of one target again; false if unknown
    pub fn publish(&self, mmsi: Mmsi) -> bool {
        let notice = self
            .vessels
            .notice(mmsi)
            .or_else(|| self.sar_targets.notice(mmsi))
            .or_else(|| self.atons.notice(mmsi));
        match notice {
            Some(notice) => {
                self.listeners.deliver(notice);
                true
            }
            None => false,
        }
    }

    pub fn publish_all(&self) {
        let notices = [
            self.vessels.notices(),
            self.sar_targets.notices(),
            self.atons.notices(),
        ];
        for notice in notices.into_iter().flatten() {
            self.listeners.deliver(notice);
        }
    }

    /// Owned copy of a target, looked up among vessels, SARTs and AtoNs in that order
    pub fn get_target(&self, mmsi: Mmsi) -> Option<Target> {
        if let Some(vessel) = self.vessels.get(mmsi) {
            return Some(Target::Vessel(vessel));
        }
        if let Some(sart) = self.sar_targets.get(mmsi) {
            return Some(Target::Sar(sart));
        }
        self.atons.get(mmsi).map(Target::Aton)
    }

    pub fn vessels(&self) -> Vec<VesselTarget> {
        self.vessels.values()
    }

    pub fn sar_targets(&self) -> Vec<SarTarget> {
        self.sar_targets.values()
    }

    pub fn atons(&self) -> Vec<AtonTarget> {
        self.atons.values()
    }

    /// Every target of every kind
    pub fn targets(&self) -> Vec<Target> {
        let mut targets: Vec<Target> = self.vessels().into_iter().map(Target::Vessel).collect();
        targets.extend(self.sar_targets().into_iter().map(Target::Sar));
        targets.extend(self.atons().into_iter().map(Target::Aton));
        targets
    }

    pub fn target_count(&self) -> usize {
        self.vessels.len() + self.sar_targets.len() + self.atons.len()
    }

    pub fn hide_all_intended_routes(&self) {
        self.set_all_intended_routes(false);
    }

    pub fn show_all_intended_routes(&self) {
        self.set_all_intended_routes(true);
    }

    fn set_all_intended_routes(&self, show: bool) {
        let changed = {
            let _gate = self.shared_gate();
            self.vessels.update_all(|vessel| {
                if vessel.show_intended_route == show {
                    return false;
                }
                vessel.show_intended_route = show;
                true
            })
        };
        for notice in changed {
            self.listeners.deliver(notice);
        }
    }

    /// Replace the display settings of one mobile target
    pub fn set_target_settings(&self, mmsi: Mmsi, settings: TargetSettings) -> bool {
        let apply = |mobile: &mut MobileTarget| mobile.settings = settings.clone();
        let notice = {
            let _gate = self.shared_gate();
            self.vessels
                .update_existing(mmsi, |vessel| apply(&mut vessel.mobile))
                .or_else(|| {
                    self.sar_targets
                        .update_existing(mmsi, |sart| apply(&mut sart.mobile))
                })
        };
        match notice {
            Some(notice) => {
                self.listeners.deliver(notice);
                true
            }
            None => false,
        }
    }

    pub fn default_settings(&self) -> TargetSettings {
        self.default_settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Settings applied to targets created from now on
    pub fn set_default_settings(&self, settings: TargetSettings) {
        *self
            .default_settings
            .write()
            .unwrap_or_else(PoisonError::into_inner) = settings.clone();
        self.listeners.settings_changed(&settings);
    }

    /// Consistent copy of all three maps
    pub fn snapshot(&self) -> RegistrySnapshot {
        let _gate = self.gate.write().unwrap_or_else(PoisonError::into_inner);
        RegistrySnapshot {
            own_ship: None,
            vessels: self.vessels.values(),
            sar_targets: self.sar_targets.values(),
            atons: self.atons.values(),
        }
    }

    /// Load a snapshot taken earlier and re-derive statuses as of `now`.
    ///
    /// The sweep runs twice so targets that aged while the process was down
    /// go through both the gone and the dead step.
    pub fn restore(&self, snapshot: RegistrySnapshot, now: DateTime<Utc>) {
        {
            let _gate = self.shared_gate();
            for vessel in snapshot.vessels {
                self.vessels.insert(vessel.core().mmsi, vessel);
            }
            for sart in snapshot.sar_targets {
                self.sar_targets.insert(sart.core().mmsi, sart);
            }
            for aton in snapshot.atons {
                self.atons.insert(aton.core().mmsi, aton);
            }
        }
        info!("Restored {} targets", self.target_count());

        self.sweep_at(now);
        self.sweep_at(now);
        if self.target_count() == 0 {
            warn!("No targets left after restoring snapshot");
        }
    }

    /// Drop every target and suggestion
    pub fn clear(&self) {
        let _gate = self.gate.write().unwrap_or_else(PoisonError::into_inner);
        self.vessels.clear();
        self.sar_targets.clear();
        self.atons.clear();
        self.suggestions.clear();
        self.broadcast_suggestions.clear();
    }

    fn shared_gate(&self) -> RwLockReadGuard<'_, ()> {
        self.gate.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassBStaticPartA, ClassBStaticPartB, Position, StaticVoyageReport};
    use crate::target::TargetStatus;
    use crate::route::RouteBounds;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
    use std::sync::{mpsc, Mutex};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn mmsi(raw: u32) -> Mmsi {
        Mmsi::try_from(raw).unwrap()
    }

    fn position(lat: f64, sog: f32, nav_status: Option<u8>) -> PositionReport {
        PositionReport {
            position: Position::new(lat, 11.0),
            sog: Some(sog),
            cog: Some(0.0),
            heading: None,
            rot: None,
            nav_status,
            pos_acc: true,
            raim: false,
        }
    }

    fn class_a(raw: u32, lat: f64) -> AisMessage {
        AisMessage::new(
            mmsi(raw),
            AisMessageType::PositionReport(position(lat, 20.0, Some(0))),
        )
    }

    #[derive(Default)]
    struct Recorder {
        updates: Mutex<Vec<(Mmsi, TargetStatus)>>,
        removed: Mutex<Vec<Mmsi>>,
    }

    impl TargetListener for Recorder {
        fn on_target_updated(&self, target: &Target) {
            self.updates
                .lock()
                .unwrap()
                .push((target.mmsi(), target.status()));
        }

        fn on_target_removed(&self, _kind: TargetKind, mmsi: Mmsi) {
            self.removed.lock().unwrap().push(mmsi);
        }
    }

    fn registry_with_recorder() -> (TargetRegistry, Arc<Recorder>) {
        let registry = TargetRegistry::new(RegistryConfig::default());
        let recorder = Arc::new(Recorder::default());
        registry.add_listener(recorder.clone());
        (registry, recorder)
    }

    #[test]
    fn position_report_creates_vessel_and_publishes() {
        let (registry, recorder) = registry_with_recorder();
        registry.ingest_at(class_a(219_000_001, 55.0), t0());

        let target = registry.get_target(mmsi(219_000_001)).unwrap();
        let vessel = target.as_vessel().unwrap();
        assert_eq!(vessel.ais_class, AisClass::A);
        assert!(vessel.show_intended_route);
        assert_eq!(vessel.mobile.trajectory.len(), 1);
        assert_eq!(
            *recorder.updates.lock().unwrap(),
            vec![(mmsi(219_000_001), TargetStatus::Active)]
        );
        assert_eq!(registry.reception_status().last_received(), Some(t0()));
    }

    #[test]
    fn class_follows_latest_report() {
        let registry = TargetRegistry::new(RegistryConfig::default());
        registry.ingest_at(class_a(219_000_001, 55.0), t0());
        registry.ingest_at(
            AisMessage::new(
                mmsi(219_000_001),
                AisMessageType::ClassBPositionReport(position(55.0, 1.0, None)),
            ),
            t0(),
        );
        let vessel = registry.vessels().pop().unwrap();
        assert_eq!(vessel.ais_class, AisClass::B);
    }

    #[test]
    fn implausible_position_is_dropped() {
        let (registry, recorder) = registry_with_recorder();
        registry.ingest_at(class_a(219_000_001, 91.0), t0());
        assert_eq!(registry.target_count(), 0);
        assert!(recorder.updates.lock().unwrap().is_empty());
    }

    #[test]
    fn sart_prefix_wins_over_vessel() {
        let registry = TargetRegistry::new(RegistryConfig::default());
        registry.ingest_at(class_a(970_012_345, 55.0), t0());

        assert!(registry.vessels().is_empty());
        assert_eq!(registry.sar_targets().len(), 1);
        assert!(registry.get_target(mmsi(970_012_345)).unwrap().as_sar().is_some());
    }

    #[test]
    fn static_data_never_creates_targets() {
        let registry = TargetRegistry::new(RegistryConfig::default());
        let name = AisMessage::new(
            mmsi(219_000_001),
            AisMessageType::ClassBStaticPartA(ClassBStaticPartA {
                name: Some("SUULA".to_string()),
            }),
        );
        registry.ingest_at(name.clone(), t0());
        assert_eq!(registry.target_count(), 0);

        registry.ingest_at(class_a(219_000_001, 55.0), t0());
        registry.ingest_at(name, t0());
        registry.ingest_at(
            AisMessage::new(
                mmsi(219_000_001),
                AisMessageType::ClassBStaticPartB(ClassBStaticPartB {
                    ship_type: Some(36),
                    call_sign: Some("OUAB2".to_string()),
                    ..ClassBStaticPartB::default()
                }),
            ),
            t0(),
        );

        let vessel = registry.vessels().pop().unwrap();
        let data = vessel.mobile.static_data.unwrap();
        assert_eq!(data.name.as_deref(), Some("SUULA"));
        assert_eq!(data.call_sign.as_deref(), Some("OUAB2"));
        assert_eq!(data.ship_type, Some(36));
    }

    #[test]
    fn voyage_data_merges() {
        let registry = TargetRegistry::new(RegistryConfig::default());
        registry.ingest_at(class_a(219_000_001, 55.0), t0());
        registry.ingest_at(
            AisMessage::new(
                mmsi(219_000_001),
                AisMessageType::StaticVoyage(StaticVoyageReport {
                    name: Some("ARUNA CIHAN".to_string()),
                    imo: Some(9543756),
                    destination: Some("UST LUGA".to_string()),
                    draught: Some(6.8),
                    ..StaticVoyageReport::default()
                }),
            ),
            t0(),
        );
        let vessel = registry.vessels().pop().unwrap();
        assert_eq!(vessel.mobile.name(), Some("ARUNA CIHAN"));
        assert_eq!(vessel.mobile.static_data.unwrap().imo, Some(9543756));
    }

    #[test]
    fn only_the_sweep_marks_gone_and_any_report_revives() {
        let (registry, recorder) = registry_with_recorder();
        registry.ingest_at(class_a(219_000_001, 55.0), t0());

        // Ingestion long after the last report does not age other targets
        registry.ingest_at(class_a(219_000_002, 56.0), t0() + TimeDelta::hours(1));
        assert_eq!(
            registry.get_target(mmsi(219_000_001)).unwrap().status(),
            TargetStatus::Active
        );

        registry.sweep_at(t0() + TimeDelta::seconds(200));
        assert_eq!(
            registry.get_target(mmsi(219_000_001)).unwrap().status(),
            TargetStatus::Gone
        );

        registry.ingest_at(class_a(219_000_001, 55.0), t0() + TimeDelta::seconds(300));
        assert_eq!(
            registry.get_target(mmsi(219_000_001)).unwrap().status(),
            TargetStatus::Active
        );

        let statuses: Vec<TargetStatus> = recorder
            .updates
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| *m == mmsi(219_000_001))
            .map(|(_, s)| *s)
            .collect();
        assert_eq!(
            statuses,
            vec![TargetStatus::Active, TargetStatus::Gone, TargetStatus::Active]
        );
    }

    #[test]
    fn sweep_evicts_after_retention_window() {
        let (registry, recorder) = registry_with_recorder();
        registry.ingest_at(class_a(219_000_001, 55.0), t0());
        registry.sweep_at(t0() + TimeDelta::seconds(200));

        registry.sweep_at(t0() + TimeDelta::seconds(3600));
        assert!(registry.get_target(mmsi(219_000_001)).is_some());

        registry.sweep_at(t0() + TimeDelta::seconds(3601));
        assert!(registry.get_target(mmsi(219_000_001)).is_none());
        assert_eq!(*recorder.removed.lock().unwrap(), vec![mmsi(219_000_001)]);
    }

    #[test]
    fn sweep_publishes_transitions_only() {
        let (registry, recorder) = registry_with_recorder();
        registry.ingest_at(class_a(219_000_001, 55.0), t0());
        registry.sweep_at(t0() + TimeDelta::seconds(10));
        registry.sweep_at(t0() + TimeDelta::seconds(200));
        registry.sweep_at(t0() + TimeDelta::seconds(300));
        assert_eq!(recorder.updates.lock().unwrap().len(), 2);
    }

    #[test]
    fn sart_old_flag_publishes() {
        let (registry, recorder) = registry_with_recorder();
        registry.ingest_at(class_a(970_012_345, 55.0), t0());
        registry.sweep_at(t0() + TimeDelta::seconds(721));
        let sart = registry.sar_targets().pop().unwrap();
        assert!(sart.old);
        assert_eq!(sart.mobile.core.status, TargetStatus::Active);
        assert_eq!(recorder.updates.lock().unwrap().len(), 2);
    }

    #[test]
    fn route_visibility_toggles_publish_changes_only() {
        let (registry, recorder) = registry_with_recorder();
        registry.ingest_at(class_a(219_000_001, 55.0), t0());
        registry.ingest_at(class_a(219_000_002, 56.0), t0());
        recorder.updates.lock().unwrap().clear();

        registry.show_all_intended_routes();
        assert!(recorder.updates.lock().unwrap().is_empty());

        registry.hide_all_intended_routes();
        assert_eq!(recorder.updates.lock().unwrap().len(), 2);
        assert!(registry.vessels().iter().all(|v| !v.show_intended_route));
    }

    #[test]
    fn intended_route_attaches_to_known_vessel() {
        let registry = TargetRegistry::new(RegistryConfig::default());
        let route = RouteMessage {
            msg_link_id: 1,
            route_type: 1,
            start_month: 6,
            start_day: 1,
            start_hour: 12,
            start_minute: 30,
            duration: 60,
            waypoints: vec![Position::new(55.0, 11.0), Position::new(55.2, 11.0)],
            ..RouteMessage::default()
        };
        let message = AisMessage::new(mmsi(219_000_001), AisMessageType::IntendedRoute(route));

        registry.ingest_at(message.clone(), t0());
        assert_eq!(registry.target_count(), 0);

        registry.ingest_at(class_a(219_000_001, 55.0), t0());
        registry.ingest_at(message, t0());
        let vessel = registry.vessels().pop().unwrap();
        assert_eq!(vessel.visible_intended_route().unwrap().waypoints.len(), 2);
    }

    fn suggestion_message(destination: u32, duration: u32) -> AisMessage {
        AisMessage::new(
            mmsi(2_190_047),
            AisMessageType::AddressedRouteSuggestion(AddressedRouteMessage {
                destination: mmsi(destination),
                route: RouteMessage {
                    msg_link_id: 4,
                    route_type: 1,
                    start_month: 6,
                    start_day: 1,
                    start_hour: 13,
                    start_minute: 0,
                    duration,
                    waypoints: vec![Position::new(55.0, 11.0), Position::new(55.2, 11.0)],
                    ..RouteMessage::default()
                },
            }),
        )
    }

    #[test]
    fn route_suggestion_workflow() {
        let config = RegistryConfig {
            own_mmsi: Some(mmsi(219_000_001)),
            ..RegistryConfig::default()
        };
        let registry = TargetRegistry::new(config);

        registry.ingest_at(suggestion_message(219_000_999, 60), t0());
        assert!(registry.suggestions().is_empty());

        registry.ingest_at(suggestion_message(219_000_001, 60), t0());
        let suggestion = registry.suggestions().pop().unwrap();
        assert_eq!(suggestion.status(), SuggestionStatus::Pending);

        let key = suggestion.key();
        let accepted = registry
            .set_suggestion_status(key, SuggestionStatus::Accepted)
            .unwrap();
        assert!(accepted.workflow.is_replied());
        assert!(registry
            .set_suggestion_status(key, SuggestionStatus::Rejected)
            .is_err());

        // A repeat keeps the answer, a cancellation overrides it
        registry.ingest_at(suggestion_message(219_000_001, 60), t0() + TimeDelta::seconds(30));
        assert_eq!(registry.suggestions()[0].status(), SuggestionStatus::Accepted);
        registry.ingest_at(suggestion_message(219_000_001, 0), t0() + TimeDelta::seconds(60));
        let cancelled = registry.suggestions().pop().unwrap();
        assert_eq!(cancelled.status(), SuggestionStatus::Cancelled);
        assert!(cancelled.is_hidden());
    }

    #[test]
    fn unknown_suggestion_is_an_error() {
        let registry = TargetRegistry::new(RegistryConfig::default());
        let key = SuggestionKey {
            sender: mmsi(2_190_047),
            msg_link_id: 1,
        };
        assert!(matches!(
            registry.set_suggestion_status(key, SuggestionStatus::Accepted),
            Err(RegistryError::UnknownSuggestion { .. })
        ));
    }

    #[test]
    fn settings_seed_new_targets() {
        let registry = TargetRegistry::new(RegistryConfig::default());
        let settings = TargetSettings {
            visible: false,
            ..TargetSettings::default()
        };
        registry.set_default_settings(settings.clone());
        registry.ingest_at(class_a(219_000_001, 55.0), t0());
        assert!(!registry.vessels()[0].mobile.settings.visible);

        let shown = TargetSettings::default();
        assert!(registry.set_target_settings(mmsi(219_000_001), shown));
        assert!(registry.vessels()[0].mobile.settings.visible);
        assert!(!registry.set_target_settings(mmsi(219_000_002), settings));
    }

    /// Records the last event per target and holds the first one for
    /// `hold` until released
    struct Holding {
        hold: Mmsi,
        armed: AtomicBool,
        held: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
        last: Mutex<HashMap<Mmsi, Option<TargetStatus>>>,
    }

    impl Holding {
        fn new(hold: Mmsi) -> (Arc<Self>, mpsc::Receiver<()>, mpsc::Sender<()>) {
            let (held_tx, held_rx) = mpsc::channel();
            let (release_tx, release_rx) = mpsc::channel();
            let listener = Arc::new(Self {
                hold,
                armed: AtomicBool::new(false),
                held: Mutex::new(held_tx),
                release: Mutex::new(release_rx),
                last: Mutex::new(HashMap::new()),
            });
            (listener, held_rx, release_tx)
        }

        fn wait_if_held(&self, mmsi: Mmsi) {
            if mmsi == self.hold && self.armed.swap(false, AtomicOrdering::SeqCst) {
                self.held.lock().unwrap().send(()).unwrap();
                self.release.lock().unwrap().recv().unwrap();
            }
        }

        fn last(&self, mmsi: Mmsi) -> Option<Option<TargetStatus>> {
            self.last.lock().unwrap().get(&mmsi).copied()
        }
    }

    impl TargetListener for Holding {
        fn on_target_updated(&self, target: &Target) {
            self.wait_if_held(target.mmsi());
            self.last
                .lock()
                .unwrap()
                .insert(target.mmsi(), Some(target.status()));
        }

        fn on_target_removed(&self, _kind: TargetKind, mmsi: Mmsi) {
            self.wait_if_held(mmsi);
            self.last.lock().unwrap().insert(mmsi, None);
        }
    }

    #[test]
    fn revival_during_sweep_delivery_wins() {
        let vessel = mmsi(219_000_001);
        let sart = mmsi(970_012_345);
        let registry = TargetRegistry::new(RegistryConfig::default());
        let (listener, held, release) = Holding::new(vessel);
        registry.add_listener(listener.clone());
        registry.ingest_at(class_a(219_000_001, 55.0), t0());
        registry.ingest_at(class_a(970_012_345, 55.0), t0());

        listener.armed.store(true, AtomicOrdering::SeqCst);
        std::thread::scope(|scope| {
            // Vessels are delivered first, so the SART's gone notice is
            // still pending while the vessel's is held
            let sweeper = scope.spawn(|| registry.sweep_at(t0() + TimeDelta::seconds(1801)));
            held.recv().unwrap();
            assert_eq!(registry.get_target(sart).unwrap().status(), TargetStatus::Gone);

            registry.ingest_at(class_a(970_012_345, 55.0), t0() + TimeDelta::seconds(1802));
            release.send(()).unwrap();
            sweeper.join().unwrap();
        });

        assert_eq!(registry.get_target(sart).unwrap().status(), TargetStatus::Active);
        assert_eq!(listener.last(sart), Some(Some(TargetStatus::Active)));
        assert_eq!(listener.last(vessel), Some(Some(TargetStatus::Gone)));
    }

    #[test]
    fn recreation_during_sweep_delivery_is_not_removed() {
        let vessel = mmsi(219_000_001);
        let sart = mmsi(970_012_345);
        let registry = TargetRegistry::new(RegistryConfig::default());
        let (listener, held, release) = Holding::new(vessel);
        registry.add_listener(listener.clone());
        registry.ingest_at(class_a(219_000_001, 55.0), t0());
        registry.ingest_at(class_a(970_012_345, 55.0), t0());
        registry.sweep_at(t0() + TimeDelta::seconds(1801));

        listener.armed.store(true, AtomicOrdering::SeqCst);
        std::thread::scope(|scope| {
            let sweeper = scope.spawn(|| registry.sweep_at(t0() + TimeDelta::seconds(3601)));
            held.recv().unwrap();
            assert!(registry.get_target(sart).is_none());

            registry.ingest_at(class_a(970_012_345, 55.0), t0() + TimeDelta::seconds(3602));
            release.send(()).unwrap();
            sweeper.join().unwrap();
        });

        assert_eq!(listener.last(vessel), Some(None));
        assert!(registry.get_target(vessel).is_none());
        assert_eq!(registry.get_target(sart).unwrap().status(), TargetStatus::Active);
        assert_eq!(listener.last(sart), Some(Some(TargetStatus::Active)));
        assert_eq!(registry.target_count(), 1);
    }

    #[test]
    fn publish_repeats_current_state() {
        let (registry, recorder) = registry_with_recorder();
        registry.ingest_at(class_a(219_000_001, 55.0), t0());
        assert!(registry.publish(mmsi(219_000_001)));
        assert!(!registry.publish(mmsi(219_000_002)));
        registry.publish_all();
        assert_eq!(recorder.updates.lock().unwrap().len(), 3);
    }

    #[test]
    fn suggestion_with_no_usable_waypoints_is_not_offered() {
        let config = RegistryConfig {
            route_bounds: RouteBounds {
                min_lat: 59.0,
                max_lat: 61.0,
                min_lon: 19.0,
                max_lon: 31.0,
            },
            ..RegistryConfig::default()
        };
        let registry = TargetRegistry::new(config);
        let suggested = Arc::new(Mutex::new(Vec::new()));

        struct Suggestions(Arc<Mutex<Vec<SuggestionStatus>>>);
        impl TargetListener for Suggestions {
            fn on_target_updated(&self, _target: &Target) {}
            fn on_route_suggestion(&self, suggestion: &AddressedRouteSuggestion) {
                self.0.lock().unwrap().push(suggestion.status());
            }
        }
        registry.add_listener(Arc::new(Suggestions(suggested.clone())));

        // Every waypoint of this route lies outside the bounds
        registry.ingest_at(suggestion_message(219_000_001, 60), t0());
        assert!(registry.suggestions().is_empty());
        assert!(suggested.lock().unwrap().is_empty());
    }
}
