use async_trait::async_trait;

use super::types::{
    osrm_route_response::OsrmRouteResponse, routing_service_error::RoutingServiceError,
};
use crate::types::{geo_point::GeoPoint, route_line::RouteLine};

#[async_trait]
pub trait RoutingProvider: Send + Sync {
    async fn route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<RouteLine, RoutingServiceError>;
}

#[derive(Clone)]
pub struct RoutingServiceConfig {
    pub host: String,
    pub user_agent: String,
}

#[derive(Clone)]
pub struct OsrmRouter {
    config: RoutingServiceConfig,
    client: reqwest::Client,
}

impl OsrmRouter {
    pub fn new(config: RoutingServiceConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl RoutingProvider for OsrmRouter {
    async fn route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<RouteLine, RoutingServiceError> {
        let url = format!(
            "{}/route/v1/driving/{},{};{},{}?overview=full&geometries=geojson",
            self.config.host,
            origin.longitude,
            origin.latitude,
            destination.longitude,
            destination.latitude
        );

        // OSRM reports "no route" with a 400 and a JSON body, so the status
        // is not checked before decoding.
        let resp = self
            .client
            .get(&url)
            .header("user-agent", &self.config.user_agent)
            .send()
            .await
            .map_err(|e| RoutingServiceError::Internal(format!("Failed to send request: {}", e)))?;

        let body = resp.json::<OsrmRouteResponse>().await.map_err(|e| {
            RoutingServiceError::Internal(format!("Failed to get response body: {}", e))
        })?;

        if body.code != "Ok" {
            return Err(RoutingServiceError::NoRoute(body.code));
        }

        let route = body
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| RoutingServiceError::NoRoute("empty routes".to_string()))?;

        Ok(RouteLine::new(
            route
                .geometry
                .coordinates
                .into_iter()
                .map(|[lon, lat]| GeoPoint::new(lat, lon))
                .collect(),
        ))
    }
}
