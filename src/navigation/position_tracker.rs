use std::{sync::Arc, time::Duration};

use tokio::{sync::watch, time::Instant};
use tracing::{debug, info, warn};

use super::{
    location_source::{
        LocationErrorCode, LocationEvent, LocationSource, LocationWatch, WatchOptions,
    },
    navigation_error::NavigationError,
};
use crate::types::{geo_point::GeoPoint, position_fix::PositionFix};

#[derive(Debug, Clone, Copy)]
pub struct TrackerConfig {
    pub movement_threshold_meters: f64,
    /// How long to wait for the first fix before giving up.
    pub first_fix_timeout: Duration,
}

/// Suppresses fixes closer than the threshold to the last accepted one.
#[derive(Debug, Clone)]
pub struct MovementFilter {
    threshold_meters: f64,
    last: Option<GeoPoint>,
}

impl MovementFilter {
    pub fn new(threshold_meters: f64) -> Self {
        Self {
            threshold_meters,
            last: None,
        }
    }

    pub fn accept(&mut self, point: GeoPoint) -> bool {
        let material = match self.last {
            Some(last) => point.moved_from(&last, self.threshold_meters),
            None => true,
        };

        if material {
            self.last = Some(point);
        }
        material
    }
}

/// Wraps the device location stream and only lets material movement through.
pub struct PositionTracker {
    source: Arc<dyn LocationSource>,
    config: TrackerConfig,
    watch: Option<LocationWatch>,
    filter: MovementFilter,
    has_fix: bool,
    /// Fixed when the watch opens so re-polling `next_fix` does not extend it.
    first_fix_deadline: Option<Instant>,
    current: watch::Sender<Option<GeoPoint>>,
}

impl PositionTracker {
    pub fn new(source: Arc<dyn LocationSource>, config: TrackerConfig) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            source,
            config,
            watch: None,
            filter: MovementFilter::new(config.movement_threshold_meters),
            has_fix: false,
            first_fix_deadline: None,
            current,
        }
    }

    /// Opens the location watch. Calling it while already tracking is a no-op.
    pub fn start(&mut self) -> Result<(), NavigationError> {
        if self.watch.is_some() {
            return Ok(());
        }

        self.watch = Some(self.source.watch(WatchOptions::default())?);
        self.first_fix_deadline = Some(Instant::now() + self.config.first_fix_timeout);
        info!("Position tracking started");
        Ok(())
    }

    pub fn is_tracking(&self) -> bool {
        self.watch.as_ref().map(|w| w.is_open()).unwrap_or(false)
    }

    pub fn current_position(&self) -> Option<GeoPoint> {
        *self.current.borrow()
    }

    /// Change notifications for the current position.
    pub fn subscribe(&self) -> watch::Receiver<Option<GeoPoint>> {
        self.current.subscribe()
    }

    /// Waits for the next material fix.
    ///
    /// Returns `None` once stopped or when the source goes away after fixes
    /// have flowed. Errors are terminal and only returned before the first fix.
    pub async fn next_fix(&mut self) -> Option<Result<PositionFix, NavigationError>> {
        loop {
            let watch = self.watch.as_mut()?;

            let event = match self.first_fix_deadline {
                Some(deadline) if !self.has_fix => {
                    let first = tokio::time::timeout_at(deadline, watch.recv()).await;
                    match first {
                        Ok(event) => event,
                        Err(_) => {
                            self.stop();
                            return Some(Err(NavigationError::Unavailable(
                                "timed out waiting for first position fix".to_string(),
                            )));
                        }
                    }
                }
                _ => watch.recv().await,
            };

            match event {
                Some(LocationEvent::Fix(fix)) => {
                    if !self.filter.accept(fix.point()) {
                        debug!("Suppressed fix within movement threshold: {:?}", fix.point());
                        continue;
                    }

                    self.has_fix = true;
                    self.current.send_replace(Some(fix.point()));
                    return Some(Ok(fix));
                }
                Some(LocationEvent::Error(code)) if !self.has_fix => {
                    self.stop();
                    return Some(Err(match code {
                        LocationErrorCode::PermissionDenied => NavigationError::PermissionDenied,
                        LocationErrorCode::Unavailable => NavigationError::Unavailable(
                            "location source unavailable".to_string(),
                        ),
                        LocationErrorCode::Timeout => NavigationError::Unavailable(
                            "location source timed out".to_string(),
                        ),
                    }));
                }
                Some(LocationEvent::Error(code)) => {
                    warn!("Ignoring location source error after fix: {:?}", code);
                }
                None if !self.has_fix => {
                    self.stop();
                    return Some(Err(NavigationError::Unavailable(
                        "location source closed".to_string(),
                    )));
                }
                None => {
                    self.stop();
                    return None;
                }
            }
        }
    }

    /// Releases the location watch. Safe to call any number of times.
    pub fn stop(&mut self) {
        if let Some(mut watch) = self.watch.take() {
            watch.clear();
            info!("Position tracking stopped");
        }
    }
}

impl Drop for PositionTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::navigation::location_source::DeviceLocationSource;

    fn config() -> TrackerConfig {
        TrackerConfig {
            movement_threshold_meters: 10.0,
            first_fix_timeout: Duration::from_secs(30),
        }
    }

    fn fix(lat: f64, lon: f64) -> LocationEvent {
        LocationEvent::Fix(PositionFix::new(GeoPoint::new(lat, lon), None, Utc::now()))
    }

    #[test]
    fn filter_suppresses_jitter_and_keeps_material_moves() {
        let mut filter = MovementFilter::new(10.0);
        let a = GeoPoint::new(-29.951, -71.331);
        let near = GeoPoint::new(-29.95102, -71.33102);
        let far = GeoPoint::new(-29.9512, -71.3312);

        assert!(filter.accept(a));
        assert!(!filter.accept(near));
        assert!(filter.accept(far));
        assert!(a.distance_to(&far) >= 10.0);
    }

    #[test]
    fn filter_measures_against_last_accepted_not_last_seen() {
        let mut filter = MovementFilter::new(10.0);
        let a = GeoPoint::new(0.0, 0.0);
        // Three 6m steps: each is under the threshold from the previous step,
        // but the second lands 12m from the last accepted point.
        let step1 = GeoPoint::new(0.000054, 0.0);
        let step2 = GeoPoint::new(0.000108, 0.0);

        assert!(filter.accept(a));
        assert!(!filter.accept(step1));
        assert!(filter.accept(step2));
    }

    #[tokio::test]
    async fn emits_only_material_fixes_in_order() {
        let source = Arc::new(DeviceLocationSource::new());
        let mut tracker = PositionTracker::new(source.clone(), config());
        let mut changes = tracker.subscribe();
        tracker.start().unwrap();

        source.push(fix(-29.951, -71.331));
        source.push(fix(-29.95102, -71.33102));
        source.push(fix(-29.9512, -71.3312));

        let first = tracker.next_fix().await.unwrap().unwrap();
        assert_eq!(first.point(), GeoPoint::new(-29.951, -71.331));
        assert!(changes.has_changed().unwrap());
        changes.mark_unchanged();

        let second = tracker.next_fix().await.unwrap().unwrap();
        assert_eq!(second.point(), GeoPoint::new(-29.9512, -71.3312));
        assert_eq!(tracker.current_position(), Some(second.point()));
        assert!(changes.has_changed().unwrap());
    }

    #[tokio::test]
    async fn permission_denied_before_first_fix_is_terminal() {
        let source = Arc::new(DeviceLocationSource::new());
        let mut tracker = PositionTracker::new(source.clone(), config());
        tracker.start().unwrap();

        source.push(LocationEvent::Error(LocationErrorCode::PermissionDenied));

        assert_eq!(
            tracker.next_fix().await,
            Some(Err(NavigationError::PermissionDenied))
        );
        assert_eq!(source.open_watches(), 0);
        assert_eq!(tracker.next_fix().await, None);
    }

    #[tokio::test]
    async fn errors_after_first_fix_are_ignored() {
        let source = Arc::new(DeviceLocationSource::new());
        let mut tracker = PositionTracker::new(source.clone(), config());
        tracker.start().unwrap();

        source.push(fix(-29.951, -71.331));
        source.push(LocationEvent::Error(LocationErrorCode::Unavailable));
        source.push(fix(-29.96, -71.34));

        tracker.next_fix().await.unwrap().unwrap();
        let next = tracker.next_fix().await.unwrap().unwrap();

        assert_eq!(next.point(), GeoPoint::new(-29.96, -71.34));
        assert!(tracker.is_tracking());
    }

    #[tokio::test(start_paused = true)]
    async fn no_first_fix_within_timeout_is_unavailable() {
        let source = Arc::new(DeviceLocationSource::new());
        let mut tracker = PositionTracker::new(source.clone(), config());
        tracker.start().unwrap();

        let result = tracker.next_fix().await;

        assert!(matches!(result, Some(Err(NavigationError::Unavailable(_)))));
        assert_eq!(source.open_watches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn first_fix_deadline_survives_repeated_polling() {
        let source = Arc::new(DeviceLocationSource::new());
        let mut tracker = PositionTracker::new(
            source.clone(),
            TrackerConfig {
                first_fix_timeout: Duration::from_millis(300),
                ..config()
            },
        );
        tracker.start().unwrap();

        // Each poll is abandoned after 200ms, the way a select! loop drops it
        // when another branch wins.
        let mut result = None;
        for _ in 0..10 {
            let polled =
                tokio::time::timeout(Duration::from_millis(200), tracker.next_fix()).await;
            if let Ok(r) = polled {
                result = Some(r);
                break;
            }
        }

        assert!(matches!(
            result,
            Some(Some(Err(NavigationError::Unavailable(_))))
        ));
        assert_eq!(source.open_watches(), 0);
    }

    #[test]
    fn stop_is_idempotent_and_releases_the_watch() {
        let source = Arc::new(DeviceLocationSource::new());
        let mut tracker = PositionTracker::new(source.clone(), config());

        tracker.start().unwrap();
        tracker.start().unwrap();
        assert_eq!(source.open_watches(), 1);

        tracker.stop();
        tracker.stop();
        assert_eq!(source.open_watches(), 0);
        assert!(!tracker.is_tracking());
    }
}
