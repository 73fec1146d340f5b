use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use super::navigation_error::NavigationError;
use crate::types::position_fix::PositionFix;

/// Error codes a device location source can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationErrorCode {
    PermissionDenied,
    Unavailable,
    Timeout,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocationEvent {
    Fix(PositionFix),
    Error(LocationErrorCode),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchOptions {
    pub enable_high_accuracy: bool,
    /// Oldest acceptable fix relative to when the watch was opened.
    pub maximum_age: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            maximum_age: Duration::ZERO,
        }
    }
}

pub trait LocationSource: Send + Sync {
    fn watch(&self, options: WatchOptions) -> Result<LocationWatch, NavigationError>;

    fn open_watches(&self) -> usize;
}

/// Releases one watch registration. Called at most once per watch.
trait WatchRegistry: Send + Sync {
    fn clear_watch(&self, id: u64);
}

/// An open subscription on a location source.
///
/// The registration is released by `clear` or on drop, whichever comes first.
pub struct LocationWatch {
    id: u64,
    receiver: mpsc::UnboundedReceiver<LocationEvent>,
    registry: Option<Arc<dyn WatchRegistry>>,
}

impl LocationWatch {
    pub async fn recv(&mut self) -> Option<LocationEvent> {
        if self.registry.is_none() {
            return None;
        }
        self.receiver.recv().await
    }

    pub fn is_open(&self) -> bool {
        self.registry.is_some()
    }

    pub fn clear(&mut self) {
        if let Some(registry) = self.registry.take() {
            registry.clear_watch(self.id);
            self.receiver.close();
        }
    }
}

impl Drop for LocationWatch {
    fn drop(&mut self) {
        self.clear();
    }
}

struct Watcher {
    options: WatchOptions,
    opened_at: DateTime<Utc>,
    sender: mpsc::UnboundedSender<LocationEvent>,
}

#[derive(Default)]
struct DeviceLocationState {
    next_id: u64,
    watchers: HashMap<u64, Watcher>,
}

/// Location source fed by the operator's device.
///
/// The device pushes fixes and error codes; each open watch receives them in
/// push order.
#[derive(Clone, Default)]
pub struct DeviceLocationSource {
    state: Arc<Mutex<DeviceLocationState>>,
}

impl DeviceLocationSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fans a device reading out to every open watch. Returns how many
    /// watches accepted it.
    pub fn push(&self, event: LocationEvent) -> usize {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let mut delivered = 0;

        for (id, watcher) in state.watchers.iter() {
            if let LocationEvent::Fix(fix) = &event {
                if is_cached_fix(fix, watcher) {
                    debug!("Dropping cached fix for watch {}: {:?}", id, fix.timestamp);
                    continue;
                }
            }

            if watcher.sender.send(event.clone()).is_ok() {
                delivered += 1;
            }
        }

        delivered
    }

    /// Strictest options requested by the open watches, for the device to
    /// configure its sensor with.
    pub fn requested_options(&self) -> Option<WatchOptions> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        state
            .watchers
            .values()
            .map(|w| w.options)
            .reduce(|a, b| WatchOptions {
                enable_high_accuracy: a.enable_high_accuracy || b.enable_high_accuracy,
                maximum_age: a.maximum_age.min(b.maximum_age),
            })
    }
}

fn is_cached_fix(fix: &PositionFix, watcher: &Watcher) -> bool {
    match chrono::Duration::from_std(watcher.options.maximum_age) {
        Ok(max_age) => fix.timestamp + max_age < watcher.opened_at,
        Err(_) => false,
    }
}

impl WatchRegistry for Mutex<DeviceLocationState> {
    fn clear_watch(&self, id: u64) {
        let mut state = self.lock().unwrap_or_else(PoisonError::into_inner);
        if state.watchers.remove(&id).is_some() {
            debug!("Cleared location watch {}", id);
        }
    }
}

impl LocationSource for DeviceLocationSource {
    fn watch(&self, options: WatchOptions) -> Result<LocationWatch, NavigationError> {
        let (sender, receiver) = mpsc::unbounded_channel();

        let id = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let id = state.next_id;
            state.next_id += 1;
            state.watchers.insert(
                id,
                Watcher {
                    options,
                    opened_at: Utc::now(),
                    sender,
                },
            );
            id
        };

        debug!("Opened location watch {}", id);

        let registry: Arc<dyn WatchRegistry> = self.state.clone();
        Ok(LocationWatch {
            id,
            receiver,
            registry: Some(registry),
        })
    }

    fn open_watches(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .watchers
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::geo_point::GeoPoint;

    fn fix_now(lat: f64, lon: f64) -> PositionFix {
        PositionFix::new(GeoPoint::new(lat, lon), Some(5.0), Utc::now())
    }

    #[tokio::test]
    async fn delivers_events_in_push_order() {
        let source = DeviceLocationSource::new();
        let mut watch = source.watch(WatchOptions::default()).unwrap();

        let first = fix_now(-29.951, -71.331);
        let second = fix_now(-29.952, -71.332);
        source.push(LocationEvent::Fix(first));
        source.push(LocationEvent::Error(LocationErrorCode::Timeout));
        source.push(LocationEvent::Fix(second));

        assert_eq!(watch.recv().await, Some(LocationEvent::Fix(first)));
        assert_eq!(
            watch.recv().await,
            Some(LocationEvent::Error(LocationErrorCode::Timeout))
        );
        assert_eq!(watch.recv().await, Some(LocationEvent::Fix(second)));
    }

    #[tokio::test]
    async fn clear_is_idempotent_and_releases_registration() {
        let source = DeviceLocationSource::new();
        let mut watch = source.watch(WatchOptions::default()).unwrap();
        assert_eq!(source.open_watches(), 1);

        watch.clear();
        watch.clear();

        assert_eq!(source.open_watches(), 0);
        assert!(!watch.is_open());
        assert_eq!(watch.recv().await, None);
        assert_eq!(source.push(LocationEvent::Fix(fix_now(1.0, 1.0))), 0);
    }

    #[test]
    fn dropping_a_watch_releases_it() {
        let source = DeviceLocationSource::new();
        {
            let _a = source.watch(WatchOptions::default()).unwrap();
            let _b = source.watch(WatchOptions::default()).unwrap();
            assert_eq!(source.open_watches(), 2);
        }
        assert_eq!(source.open_watches(), 0);
    }

    #[tokio::test]
    async fn fixes_older_than_the_watch_are_not_delivered() {
        let source = DeviceLocationSource::new();
        let mut watch = source.watch(WatchOptions::default()).unwrap();

        let stale = PositionFix::new(
            GeoPoint::new(-29.95, -71.33),
            None,
            Utc::now() - chrono::Duration::minutes(5),
        );
        let fresh = fix_now(-29.951, -71.331);

        assert_eq!(source.push(LocationEvent::Fix(stale)), 0);
        assert_eq!(source.push(LocationEvent::Fix(fresh)), 1);
        assert_eq!(watch.recv().await, Some(LocationEvent::Fix(fresh)));
    }

    #[test]
    fn requested_options_prefer_the_strictest() {
        let source = DeviceLocationSource::new();
        assert_eq!(source.requested_options(), None);

        let _loose = source
            .watch(WatchOptions {
                enable_high_accuracy: false,
                maximum_age: Duration::from_secs(60),
            })
            .unwrap();
        let _strict = source.watch(WatchOptions::default()).unwrap();

        assert_eq!(source.requested_options(), Some(WatchOptions::default()));
    }
}
