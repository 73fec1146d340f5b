use std::{sync::Arc, time::Duration};

use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use super::navigation_error::NavigationError;
use crate::{
    services::routing_client::routing_service::RoutingProvider,
    types::{geo_point::GeoPoint, route_line::RouteLine},
};

#[derive(Debug, Clone, Copy)]
pub struct RouteEngineConfig {
    pub movement_threshold_meters: f64,
    pub route_timeout: Duration,
}

#[derive(Debug)]
pub struct RouteOutcome {
    pub generation: u64,
    pub destination: GeoPoint,
    pub result: Result<RouteLine, NavigationError>,
}

#[derive(Debug, PartialEq)]
pub enum RouteUpdate {
    Replaced(RouteLine),
    /// Superseded by a newer request; ignored.
    Stale,
    Failed {
        error: NavigationError,
        kept_previous: bool,
    },
}

/// Keeps one route between the operator and the destination up to date.
///
/// Lookups run as spawned tasks and report back through the outcome channel
/// returned by `new`; only the outcome of the latest request is applied.
pub struct RouteEngine {
    router: Arc<dyn RoutingProvider>,
    config: RouteEngineConfig,
    generation: u64,
    last_requested: Option<(GeoPoint, GeoPoint)>,
    route: Option<RouteLine>,
    tasks: Vec<JoinHandle<()>>,
    outcomes: mpsc::UnboundedSender<RouteOutcome>,
}

pub async fn compute_route(
    router: &dyn RoutingProvider,
    origin: GeoPoint,
    destination: GeoPoint,
    timeout: Duration,
) -> Result<RouteLine, NavigationError> {
    match tokio::time::timeout(timeout, router.route(origin, destination)).await {
        Ok(Ok(line)) if line.is_empty() => Err(NavigationError::RouteUnavailable(
            "routing service returned an empty path".to_string(),
        )),
        Ok(Ok(line)) => Ok(line),
        Ok(Err(e)) => Err(NavigationError::RouteUnavailable(e.to_string())),
        Err(_) => Err(NavigationError::RouteUnavailable(format!(
            "timed out after {:?}",
            timeout
        ))),
    }
}

impl RouteEngine {
    pub fn new(
        router: Arc<dyn RoutingProvider>,
        config: RouteEngineConfig,
    ) -> (Self, mpsc::UnboundedReceiver<RouteOutcome>) {
        let (outcomes, receiver) = mpsc::unbounded_channel();
        (
            Self {
                router,
                config,
                generation: 0,
                last_requested: None,
                route: None,
                tasks: vec![],
                outcomes,
            },
            receiver,
        )
    }

    pub fn route(&self) -> Option<&RouteLine> {
        self.route.as_ref()
    }

    pub async fn compute_route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<RouteLine, NavigationError> {
        compute_route(
            self.router.as_ref(),
            origin,
            destination,
            self.config.route_timeout,
        )
        .await
    }

    fn needs_recompute(&self, origin: GeoPoint, destination: GeoPoint) -> bool {
        match self.last_requested {
            None => true,
            Some((last_origin, last_destination)) => {
                last_destination != destination
                    || origin.moved_from(&last_origin, self.config.movement_threshold_meters)
            }
        }
    }

    /// Starts a lookup when the pair changed materially. Returns whether one
    /// was started.
    pub fn request(&mut self, origin: GeoPoint, destination: GeoPoint) -> bool {
        if !self.needs_recompute(origin, destination) {
            debug!("Route request skipped, no material change");
            return false;
        }

        self.tasks.retain(|t| !t.is_finished());
        self.generation += 1;
        self.last_requested = Some((origin, destination));

        let generation = self.generation;
        let router = self.router.clone();
        let outcomes = self.outcomes.clone();
        let timeout = self.config.route_timeout;

        info!("Requesting route {} to {:?}", generation, destination);
        self.tasks.push(tokio::spawn(async move {
            let result = compute_route(router.as_ref(), origin, destination, timeout).await;
            // The receiver is gone once the owning session has shut down.
            let _ = outcomes.send(RouteOutcome {
                generation,
                destination,
                result,
            });
        }));

        true
    }

    pub fn apply(&mut self, outcome: RouteOutcome) -> RouteUpdate {
        if outcome.generation != self.generation {
            debug!(
                "Discarding stale route {} (latest is {})",
                outcome.generation, self.generation
            );
            return RouteUpdate::Stale;
        }

        match outcome.result {
            Ok(line) => {
                self.route = Some(line.clone());
                RouteUpdate::Replaced(line)
            }
            Err(error) => {
                warn!("Route {} failed: {}", outcome.generation, error);
                RouteUpdate::Failed {
                    error,
                    kept_previous: self.route.is_some(),
                }
            }
        }
    }

    /// Aborts in-flight lookups and invalidates any outcome already queued.
    pub fn cancel(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.generation += 1;
    }
}

impl Drop for RouteEngine {
    fn drop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}
