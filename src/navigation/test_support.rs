use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{oneshot, watch, Notify};

use super::{
    location_source::LocationEvent,
    navigation_session::{SessionSnapshot, SessionStatus},
};
use crate::{
    services::{
        geocoding_client::{
            geocoding_service::{GeocodeCandidate, Geocoder},
            types::geocoding_service_error::GeocodingServiceError,
        },
        routing_client::{
            routing_service::RoutingProvider, types::routing_service_error::RoutingServiceError,
        },
    },
    types::{geo_point::GeoPoint, position_fix::PositionFix, route_line::RouteLine},
};

pub const MAIN_ST: GeoPoint = GeoPoint::new(-29.95, -71.33);

/// Answers every query with the same candidates, or fails when `answer` is
/// `None`. A gate holds each lookup until notified.
pub struct FakeGeocoder {
    pub calls: AtomicUsize,
    pub queries: Mutex<Vec<String>>,
    pub answer: Option<Vec<GeoPoint>>,
    pub gate: Option<Arc<Notify>>,
}

impl FakeGeocoder {
    pub fn answering(points: Vec<GeoPoint>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            queries: Mutex::new(vec![]),
            answer: Some(points),
            gate: None,
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            ..Self::answering(vec![])
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn geocode(&self, query: &str) -> Result<Vec<GeocodeCandidate>, GeocodingServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        match &self.answer {
            Some(points) => Ok(points
                .iter()
                .map(|p| GeocodeCandidate {
                    point: *p,
                    display_name: query.to_string(),
                    confidence: None,
                })
                .collect()),
            None => Err(GeocodingServiceError::Internal("boom".to_string())),
        }
    }
}

/// Answers with a straight origin-destination line. A gate registered for a
/// destination holds the next lookup to it until the sender fires (or
/// forever, if the sender is kept and never used).
#[derive(Default)]
pub struct FakeRouter {
    pub calls: AtomicUsize,
    pub gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    pub fail: bool,
}

impl FakeRouter {
    pub fn gate(&self, destination: GeoPoint) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates
            .lock()
            .unwrap()
            .insert(format!("{:?}", destination), rx);
        tx
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoutingProvider for FakeRouter {
    async fn route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<RouteLine, RoutingServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self
            .gates
            .lock()
            .unwrap()
            .remove(&format!("{:?}", destination));
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if self.fail {
            return Err(RoutingServiceError::NoRoute("NoRoute".to_string()));
        }
        Ok(RouteLine::new(vec![origin, destination]))
    }
}

pub fn fix(lat: f64, lon: f64) -> LocationEvent {
    LocationEvent::Fix(PositionFix::new(GeoPoint::new(lat, lon), Some(5.0), Utc::now()))
}

pub async fn wait_for(
    snapshots: &mut watch::Receiver<SessionSnapshot>,
    what: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    tokio::time::timeout(Duration::from_secs(5), snapshots.wait_for(what))
        .await
        .expect("Timed out waiting for session snapshot")
        .expect("Session snapshot channel closed")
        .clone()
}

pub async fn wait_for_status(
    snapshots: &mut watch::Receiver<SessionSnapshot>,
    status: SessionStatus,
) -> SessionSnapshot {
    wait_for(snapshots, |s| s.status == status).await
}
