use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{
    address_resolver::{AddressResolver, ResolverConfig},
    location_source::LocationSource,
    map_view_controller::{MapViewConfig, MapViewController},
    navigation_error::NavigationError,
    position_tracker::{PositionTracker, TrackerConfig},
    render_surface::RenderSurface,
    route_engine::{RouteEngine, RouteEngineConfig, RouteOutcome, RouteUpdate},
};
use crate::{
    services::{
        geocoding_client::geocoding_service::Geocoder,
        routing_client::routing_service::RoutingProvider,
    },
    types::{geo_point::GeoPoint, route_line::RouteLine},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    AcquiringPosition,
    Geocoding,
    Active,
    Stopped,
    Failed(NavigationError),
}

impl SessionStatus {
    pub fn is_live(&self) -> bool {
        !matches!(self, SessionStatus::Stopped | SessionStatus::Failed(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: u64,
    pub destination_address: String,
    pub status: SessionStatus,
    pub last_origin: Option<GeoPoint>,
    pub destination_point: Option<GeoPoint>,
    pub route: Option<RouteLine>,
    pub route_length_meters: Option<f64>,
    /// Last routing failure while active; cleared by the next good route.
    pub route_error: Option<NavigationError>,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NavigationConfig {
    pub movement_threshold_meters: f64,
    pub lookup_timeout: Duration,
    pub position_timeout: Duration,
    pub geocode_cache_ttl: Duration,
    pub locality_hint: Option<String>,
    pub geocode_retries: u32,
    pub geocode_retry_backoff: Duration,
    pub map: MapViewConfig,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            movement_threshold_meters: 10.0,
            lookup_timeout: Duration::from_secs(10),
            position_timeout: Duration::from_secs(30),
            geocode_cache_ttl: Duration::from_secs(600),
            locality_hint: None,
            geocode_retries: 2,
            geocode_retry_backoff: Duration::from_secs(1),
            map: MapViewConfig::default(),
        }
    }
}

/// The external collaborators a session drives.
#[derive(Clone)]
pub struct SessionDeps {
    pub location_source: Arc<dyn LocationSource>,
    pub geocoder: Arc<dyn Geocoder>,
    pub router: Arc<dyn RoutingProvider>,
    pub surface: Arc<dyn RenderSurface>,
}

#[derive(Debug, Clone, Copy)]
pub enum SessionCommand {
    SetFullscreen(bool),
}

enum SessionEvent {
    Geocoded(Result<GeoPoint, NavigationError>),
}

/// Handle to one "drive to this client" episode.
///
/// The episode itself runs as a task that owns the tracker, resolver, route
/// engine and map view; the handle stops it and reads its snapshots.
pub struct NavigationSession {
    id: u64,
    destination_address: String,
    cancel: CancellationToken,
    commands: mpsc::UnboundedSender<SessionCommand>,
    snapshots: watch::Receiver<SessionSnapshot>,
    task: Option<JoinHandle<()>>,
}

impl NavigationSession {
    pub fn start(
        id: u64,
        destination_address: String,
        deps: SessionDeps,
        config: NavigationConfig,
    ) -> Self {
        let (snapshot_tx, snapshots) = watch::channel(SessionSnapshot {
            id,
            destination_address: destination_address.clone(),
            status: SessionStatus::Idle,
            last_origin: None,
            destination_point: None,
            route: None,
            route_length_meters: None,
            route_error: None,
            started_at: Utc::now(),
        });
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (events_tx, event_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let mut tracker = PositionTracker::new(
            deps.location_source,
            TrackerConfig {
                movement_threshold_meters: config.movement_threshold_meters,
                first_fix_timeout: config.position_timeout,
            },
        );
        // Subscribe before returning so no fix pushed after `start` is missed.
        let subscribed = tracker.start();
        let resolver = Arc::new(AddressResolver::new(
            deps.geocoder,
            ResolverConfig {
                locality_hint: config.locality_hint.clone(),
                cache_ttl: config.geocode_cache_ttl,
                lookup_timeout: config.lookup_timeout,
            },
        ));
        let (routes, route_rx) = RouteEngine::new(
            deps.router,
            RouteEngineConfig {
                movement_threshold_meters: config.movement_threshold_meters,
                route_timeout: config.lookup_timeout,
            },
        );
        let map = MapViewController::new(deps.surface, config.map);

        let runner = SessionRunner {
            id,
            destination_address: destination_address.clone(),
            config,
            tracker,
            resolver,
            routes,
            map,
            snapshot: snapshot_tx,
            events: events_tx,
            geocode_task: None,
            geocode_attempts: 0,
        };

        info!("Starting navigation session {} to {}", id, destination_address);
        let task = tokio::spawn(runner.run(
            subscribed,
            cancel.clone(),
            command_rx,
            event_rx,
            route_rx,
        ));

        Self {
            id,
            destination_address,
            cancel,
            commands,
            snapshots,
            task: Some(task),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn destination_address(&self) -> &str {
        &self.destination_address
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    pub fn is_live(&self) -> bool {
        self.snapshots.borrow().status.is_live()
    }

    /// Returns false once the session has finished.
    pub fn send(&self, command: SessionCommand) -> bool {
        self.is_live() && self.commands.send(command).is_ok()
    }

    /// Ends the session and waits until every subscription is released.
    /// Calling it again is a no-op.
    pub async fn stop(&mut self) {
        self.cancel.cancel();

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("Navigation session {} task failed: {}", self.id, e);
            }
        }
    }
}

impl Drop for NavigationSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct SessionRunner {
    id: u64,
    destination_address: String,
    config: NavigationConfig,
    tracker: PositionTracker,
    resolver: Arc<AddressResolver>,
    routes: RouteEngine,
    map: MapViewController,
    snapshot: watch::Sender<SessionSnapshot>,
    events: mpsc::UnboundedSender<SessionEvent>,
    geocode_task: Option<JoinHandle<()>>,
    geocode_attempts: u32,
}

impl SessionRunner {
    async fn run(
        mut self,
        subscribed: Result<(), NavigationError>,
        cancel: CancellationToken,
        mut commands: mpsc::UnboundedReceiver<SessionCommand>,
        mut events: mpsc::UnboundedReceiver<SessionEvent>,
        mut route_outcomes: mpsc::UnboundedReceiver<RouteOutcome>,
    ) {
        if let Err(e) = subscribed {
            self.fail(e);
            return;
        }
        self.set_status(SessionStatus::AcquiringPosition);

        let mut tracking = true;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    self.shutdown();
                    self.set_status(SessionStatus::Stopped);
                    info!("Navigation session {} stopped", self.id);
                    return;
                }
                fix = self.tracker.next_fix(), if tracking => match fix {
                    Some(Ok(fix)) => self.on_position(fix.point()),
                    Some(Err(e)) => {
                        self.fail(e);
                        return;
                    }
                    None => {
                        warn!("Location stream for session {} ended", self.id);
                        tracking = false;
                    }
                },
                Some(event) = events.recv() => {
                    if let Err(e) = self.on_event(event) {
                        self.fail(e);
                        return;
                    }
                }
                Some(outcome) = route_outcomes.recv() => self.on_route(outcome),
                Some(command) = commands.recv() => self.on_command(command),
            }
        }
    }

    fn status(&self) -> SessionStatus {
        self.snapshot.borrow().status.clone()
    }

    fn set_status(&self, status: SessionStatus) {
        debug!("Session {} -> {:?}", self.id, status);
        self.snapshot.send_modify(|s| s.status = status);
    }

    fn on_position(&mut self, origin: GeoPoint) {
        self.snapshot.send_modify(|s| s.last_origin = Some(origin));

        match self.status() {
            SessionStatus::AcquiringPosition => {
                self.set_status(SessionStatus::Geocoding);
                self.start_geocode(Duration::ZERO);
            }
            SessionStatus::Active => {
                self.map.set_origin(origin);
                let destination = self.snapshot.borrow().destination_point;
                if let Some(destination) = destination {
                    self.routes.request(origin, destination);
                }
            }
            _ => {}
        }
    }

    fn start_geocode(&mut self, delay: Duration) {
        self.geocode_attempts += 1;

        let resolver = self.resolver.clone();
        let address = self.destination_address.clone();
        let events = self.events.clone();

        self.geocode_task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let result = resolver.resolve(&address).await;
            let _ = events.send(SessionEvent::Geocoded(result));
        }));
    }

    fn on_event(&mut self, event: SessionEvent) -> Result<(), NavigationError> {
        match event {
            SessionEvent::Geocoded(Ok(destination)) => {
                self.geocode_task = None;
                self.activate(destination);
                Ok(())
            }
            SessionEvent::Geocoded(Err(NavigationError::LookupFailed(e)))
                if self.geocode_attempts <= self.config.geocode_retries =>
            {
                let delay = self.config.geocode_retry_backoff * self.geocode_attempts;
                warn!(
                    "Geocoding attempt {} for session {} failed ({}), retrying in {:?}",
                    self.geocode_attempts, self.id, e, delay
                );
                self.start_geocode(delay);
                Ok(())
            }
            SessionEvent::Geocoded(Err(e)) => Err(e),
        }
    }

    fn activate(&mut self, destination: GeoPoint) {
        self.snapshot
            .send_modify(|s| s.destination_point = Some(destination));
        self.set_status(SessionStatus::Active);

        self.map.mount();
        self.map
            .set_destination(destination, &self.destination_address);

        if let Some(origin) = self.tracker.current_position() {
            self.map.set_origin(origin);
            self.routes.request(origin, destination);
        }
    }

    fn on_route(&mut self, outcome: RouteOutcome) {
        match self.routes.apply(outcome) {
            RouteUpdate::Replaced(route) => {
                self.map.set_route(route.clone());
                self.snapshot.send_modify(|s| {
                    s.route_length_meters = Some(route.length_meters());
                    s.route = Some(route);
                    s.route_error = None;
                });
            }
            RouteUpdate::Stale => {}
            RouteUpdate::Failed {
                error,
                kept_previous,
            } => {
                if !kept_previous {
                    warn!(
                        "No route for session {}, showing markers only: {}",
                        self.id, error
                    );
                }
                self.snapshot.send_modify(|s| s.route_error = Some(error));
            }
        }
    }

    fn on_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::SetFullscreen(fullscreen) => self.map.set_fullscreen(fullscreen),
        }
    }

    /// Releases the location watch, drops pending lookups and clears the map.
    fn shutdown(&mut self) {
        self.tracker.stop();
        if let Some(task) = self.geocode_task.take() {
            task.abort();
        }
        self.routes.cancel();
        self.map.unmount();
    }

    fn fail(&mut self, e: NavigationError) {
        error!("Navigation session {} failed: {}", self.id, e);
        self.shutdown();
        self.set_status(SessionStatus::Failed(e));
    }
}
