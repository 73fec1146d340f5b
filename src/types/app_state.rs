use std::sync::Arc;

use crate::navigation::{
    location_source::DeviceLocationSource, navigator::Navigator, render_surface::SnapshotSurface,
};

#[derive(Clone)]
pub struct AppState {
    pub navigator: Navigator,
    pub location_source: Arc<DeviceLocationSource>,
    pub surface: SnapshotSurface,
    pub auth_key: Option<String>,
}
