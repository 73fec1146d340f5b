use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use tokio::sync::{watch, Mutex};
use tracing::info;

use super::{
    address_resolver::normalize_address,
    navigation_session::{
        NavigationConfig, NavigationSession, SessionCommand, SessionDeps, SessionSnapshot,
    },
};

/// Keeps at most one navigation session alive.
#[derive(Clone)]
pub struct Navigator {
    deps: SessionDeps,
    config: NavigationConfig,
    current: Arc<Mutex<Option<NavigationSession>>>,
    generation: Arc<AtomicU64>,
}

impl Navigator {
    pub fn new(deps: SessionDeps, config: NavigationConfig) -> Self {
        Self {
            deps,
            config,
            current: Arc::new(Mutex::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Starts navigating to `address`, stopping any previous session first.
    /// A live session to the same address is returned as is.
    pub async fn start(&self, address: &str) -> SessionSnapshot {
        let mut current = self.current.lock().await;

        if let Some(session) = current.as_ref() {
            if session.is_live()
                && normalize_address(session.destination_address()).to_lowercase()
                    == normalize_address(address).to_lowercase()
            {
                info!("Session {} already navigating to {}", session.id(), address);
                return session.snapshot();
            }
        }

        if let Some(mut previous) = current.take() {
            previous.stop().await;
        }

        let id = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let session = NavigationSession::start(
            id,
            address.to_string(),
            self.deps.clone(),
            self.config.clone(),
        );
        let snapshot = session.snapshot();
        *current = Some(session);

        snapshot
    }

    /// Stops the current session, if any, and returns its final snapshot.
    pub async fn stop(&self) -> Option<SessionSnapshot> {
        let mut current = self.current.lock().await;

        match current.as_mut() {
            Some(session) => {
                session.stop().await;
                Some(session.snapshot())
            }
            None => None,
        }
    }

    pub async fn snapshot(&self) -> Option<SessionSnapshot> {
        self.current.lock().await.as_ref().map(|s| s.snapshot())
    }

    pub async fn subscribe(&self) -> Option<watch::Receiver<SessionSnapshot>> {
        self.current.lock().await.as_ref().map(|s| s.subscribe())
    }

    /// Returns false when there is no live session to take the command.
    pub async fn send(&self, command: SessionCommand) -> bool {
        match self.current.lock().await.as_ref() {
            Some(session) => session.send(command),
            None => false,
        }
    }
}
