use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct OsrmRouteResponseGeometry {
    /// `[longitude, latitude]` pairs, GeoJSON order.
    pub coordinates: Vec<[f64; 2]>,
}

#[derive(Serialize, Deserialize)]
pub struct OsrmRouteResponseRoute {
    pub geometry: OsrmRouteResponseGeometry,
    pub distance: f64,
    pub duration: f64,
}

#[derive(Serialize, Deserialize)]
pub struct OsrmRouteResponse {
    pub code: String,
    #[serde(default)]
    pub routes: Vec<OsrmRouteResponseRoute>,
}
