use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::render_surface::{MarkerKind, Overlay, OverlayId, RenderSurface};
use crate::types::{geo_point::GeoPoint, route_line::RouteLine};

pub const ORIGIN_LABEL: &str = "Driver";

#[derive(Debug, Clone, Copy)]
pub struct MapViewConfig {
    /// Camera position before the first fix arrives.
    pub default_center: GeoPoint,
    pub zoom: u8,
    /// Delay before the one-time size correction after mount or resize.
    pub size_settle_delay: Duration,
}

impl Default for MapViewConfig {
    fn default() -> Self {
        Self {
            default_center: GeoPoint::new(-29.95, -71.33),
            zoom: 13,
            size_settle_delay: Duration::from_millis(200),
        }
    }
}

/// Owns the overlays an active session draws on the shared surface.
///
/// At most one origin marker, one destination marker and one route polyline
/// exist at a time. Overlay calls made while unmounted are dropped; a
/// fullscreen request is remembered and applied on mount.
pub struct MapViewController {
    surface: Arc<dyn RenderSurface>,
    config: MapViewConfig,
    mounted: bool,
    fullscreen: bool,
    origin: Option<OverlayId>,
    destination: Option<OverlayId>,
    route: Option<OverlayId>,
    pending_resize: Option<JoinHandle<()>>,
}

impl MapViewController {
    pub fn new(surface: Arc<dyn RenderSurface>, config: MapViewConfig) -> Self {
        Self {
            surface,
            config,
            mounted: false,
            fullscreen: false,
            origin: None,
            destination: None,
            route: None,
            pending_resize: None,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn mount(&mut self) {
        if self.mounted {
            return;
        }

        self.surface.attach();
        self.surface
            .set_view(self.config.default_center, self.config.zoom);
        if self.fullscreen {
            self.surface.set_fullscreen(true);
        }
        self.mounted = true;
        self.schedule_size_correction();
        info!("Map view mounted");
    }

    fn schedule_size_correction(&mut self) {
        if let Some(previous) = self.pending_resize.take() {
            previous.abort();
        }

        let surface = self.surface.clone();
        let delay = self.config.size_settle_delay;
        self.pending_resize = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            surface.invalidate_size();
        }));
    }

    fn replace(&mut self, slot: Slot, overlay: Overlay) {
        let current = match slot {
            Slot::Origin => &mut self.origin,
            Slot::Destination => &mut self.destination,
            Slot::Route => &mut self.route,
        };

        if let Some(previous) = current.take() {
            self.surface.remove_overlay(previous);
        }
        *current = Some(self.surface.add_overlay(overlay));
    }

    pub fn set_origin(&mut self, origin: GeoPoint) {
        if !self.mounted {
            debug!("Ignoring origin update while unmounted");
            return;
        }

        self.replace(
            Slot::Origin,
            Overlay::Marker {
                kind: MarkerKind::Origin,
                point: origin,
                label: ORIGIN_LABEL.to_string(),
            },
        );
        self.surface.set_view(origin, self.config.zoom);
    }

    pub fn set_destination(&mut self, destination: GeoPoint, label: &str) {
        if !self.mounted {
            debug!("Ignoring destination update while unmounted");
            return;
        }

        self.replace(
            Slot::Destination,
            Overlay::Marker {
                kind: MarkerKind::Destination,
                point: destination,
                label: label.to_string(),
            },
        );
    }

    pub fn set_route(&mut self, route: RouteLine) {
        if !self.mounted {
            debug!("Ignoring route update while unmounted");
            return;
        }

        self.replace(Slot::Route, Overlay::Polyline { route });
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        if self.fullscreen == fullscreen {
            return;
        }

        self.fullscreen = fullscreen;
        if !self.mounted {
            debug!("Fullscreen {} deferred until mount", fullscreen);
            return;
        }

        self.surface.set_fullscreen(fullscreen);
        self.schedule_size_correction();
    }

    /// Removes every overlay and detaches. Safe to call repeatedly.
    pub fn unmount(&mut self) {
        if let Some(pending) = self.pending_resize.take() {
            pending.abort();
        }

        if !self.mounted {
            return;
        }

        for id in [self.origin.take(), self.destination.take(), self.route.take()]
            .into_iter()
            .flatten()
        {
            self.surface.remove_overlay(id);
        }

        self.fullscreen = false;
        self.mounted = false;
        self.surface.detach();
        info!("Map view unmounted");
    }
}

impl Drop for MapViewController {
    fn drop(&mut self) {
        self.unmount();
    }
}

enum Slot {
    Origin,
    Destination,
    Route,
}
