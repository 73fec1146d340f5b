use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, PoisonError},
};

use serde::{Deserialize, Serialize};

use crate::types::{geo_point::GeoPoint, route_line::RouteLine};

pub type OverlayId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Origin,
    Destination,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Overlay {
    Marker {
        kind: MarkerKind,
        point: GeoPoint,
        label: String,
    },
    Polyline {
        route: RouteLine,
    },
}

/// The map widget the engine draws into.
pub trait RenderSurface: Send + Sync {
    fn attach(&self);

    fn detach(&self);

    /// Re-measures the container after layout has settled.
    fn invalidate_size(&self);

    fn add_overlay(&self, overlay: Overlay) -> OverlayId;

    fn remove_overlay(&self, id: OverlayId);

    fn set_view(&self, center: GeoPoint, zoom: u8);

    fn set_fullscreen(&self, fullscreen: bool);
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceCounters {
    pub attaches: u32,
    pub detaches: u32,
    pub size_invalidations: u32,
    pub overlays_added: u32,
    pub overlays_removed: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapScene {
    pub mounted: bool,
    pub center: Option<GeoPoint>,
    pub zoom: Option<u8>,
    pub fullscreen: bool,
    pub overlays: Vec<Overlay>,
    pub counters: SurfaceCounters,
}

impl MapScene {
    pub fn markers(&self, kind: MarkerKind) -> Vec<GeoPoint> {
        self.overlays
            .iter()
            .filter_map(|o| match o {
                Overlay::Marker { kind: k, point, .. } if *k == kind => Some(*point),
                _ => None,
            })
            .collect()
    }

    pub fn polylines(&self) -> Vec<&RouteLine> {
        self.overlays
            .iter()
            .filter_map(|o| match o {
                Overlay::Polyline { route } => Some(route),
                _ => None,
            })
            .collect()
    }
}

#[derive(Default)]
struct SceneState {
    mounted: bool,
    center: Option<GeoPoint>,
    zoom: Option<u8>,
    fullscreen: bool,
    next_id: OverlayId,
    overlays: BTreeMap<OverlayId, Overlay>,
    counters: SurfaceCounters,
}

/// Keeps the current scene in memory so the client renderer can poll it.
#[derive(Clone, Default)]
pub struct SnapshotSurface {
    state: Arc<Mutex<SceneState>>,
}

impl SnapshotSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut SceneState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    pub fn scene(&self) -> MapScene {
        self.with_state(|s| MapScene {
            mounted: s.mounted,
            center: s.center,
            zoom: s.zoom,
            fullscreen: s.fullscreen,
            overlays: s.overlays.values().cloned().collect(),
            counters: s.counters.clone(),
        })
    }
}

impl RenderSurface for SnapshotSurface {
    fn attach(&self) {
        self.with_state(|s| {
            s.mounted = true;
            s.counters.attaches += 1;
        })
    }

    fn detach(&self) {
        self.with_state(|s| {
            s.mounted = false;
            s.center = None;
            s.zoom = None;
            s.fullscreen = false;
            s.counters.detaches += 1;
        })
    }

    fn invalidate_size(&self) {
        self.with_state(|s| s.counters.size_invalidations += 1)
    }

    fn add_overlay(&self, overlay: Overlay) -> OverlayId {
        self.with_state(|s| {
            let id = s.next_id;
            s.next_id += 1;
            s.overlays.insert(id, overlay);
            s.counters.overlays_added += 1;
            id
        })
    }

    fn remove_overlay(&self, id: OverlayId) {
        self.with_state(|s| {
            if s.overlays.remove(&id).is_some() {
                s.counters.overlays_removed += 1;
            }
        })
    }

    fn set_view(&self, center: GeoPoint, zoom: u8) {
        self.with_state(|s| {
            s.center = Some(center);
            s.zoom = Some(zoom);
        })
    }

    fn set_fullscreen(&self, fullscreen: bool) {
        self.with_state(|s| s.fullscreen = fullscreen)
    }
}
