use std::{env, str::FromStr, sync::Arc, time::Duration};

use axum::{middleware, routing::get, Router};
use tower_http::cors::CorsLayer;

use crate::{
    middlewares::auth::auth_middleware,
    navigation::{
        location_source::DeviceLocationSource,
        navigation_session::{NavigationConfig, SessionDeps},
        navigator::Navigator,
        render_surface::SnapshotSurface,
    },
    routes::apply_routes,
    services::{
        geocoding_client::geocoding_service::{GeocodingServiceConfig, NominatimGeocoder},
        routing_client::routing_service::{OsrmRouter, RoutingServiceConfig},
    },
    types::app_state::AppState,
};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: String,
    pub geocoding_host: String,
    pub routing_host: String,
    pub user_agent: String,
    pub auth_key: Option<String>,
    pub navigation: NavigationConfig,
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, String> {
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("{} has an invalid value: {:?}", name, raw)),
        None => Ok(default),
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let defaults = NavigationConfig::default();

        let movement_threshold_meters: f64 = parse_or(
            &lookup,
            "MOVEMENT_THRESHOLD_METERS",
            defaults.movement_threshold_meters,
        )?;
        if !movement_threshold_meters.is_finite() || movement_threshold_meters < 0.0 {
            return Err("MOVEMENT_THRESHOLD_METERS must be a non-negative number".to_string());
        }

        let navigation = NavigationConfig {
            movement_threshold_meters,
            lookup_timeout: Duration::from_secs(parse_or(&lookup, "LOOKUP_TIMEOUT_SECS", 10)?),
            position_timeout: Duration::from_secs(parse_or(
                &lookup,
                "POSITION_TIMEOUT_SECS",
                30,
            )?),
            geocode_cache_ttl: Duration::from_secs(parse_or(
                &lookup,
                "GEOCODE_CACHE_TTL_SECS",
                600,
            )?),
            locality_hint: non_empty(&lookup, "GEOCODING_LOCALITY_HINT"),
            geocode_retries: parse_or(&lookup, "GEOCODE_RETRIES", defaults.geocode_retries)?,
            ..defaults
        };

        Ok(Self {
            bind_address: non_empty(&lookup, "BIND_ADDRESS")
                .unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            geocoding_host: non_empty(&lookup, "GEOCODING_HOST")
                .unwrap_or_else(|| "https://nominatim.openstreetmap.org".to_string()),
            routing_host: non_empty(&lookup, "ROUTING_HOST")
                .unwrap_or_else(|| "https://router.project-osrm.org".to_string()),
            user_agent: format!("dispatch-nav/{}", env!("CARGO_PKG_VERSION")),
            auth_key: non_empty(&lookup, "AUTH_KEY"),
            navigation,
        })
    }
}

pub fn gen_state(config: &AppConfig) -> AppState {
    let location_source = Arc::new(DeviceLocationSource::new());
    let surface = SnapshotSurface::new();

    let deps = SessionDeps {
        location_source: location_source.clone(),
        geocoder: Arc::new(NominatimGeocoder::new(GeocodingServiceConfig {
            host: config.geocoding_host.clone(),
            user_agent: config.user_agent.clone(),
        })),
        router: Arc::new(OsrmRouter::new(RoutingServiceConfig {
            host: config.routing_host.clone(),
            user_agent: config.user_agent.clone(),
        })),
        surface: Arc::new(surface.clone()),
    };

    AppState {
        navigator: Navigator::new(deps, config.navigation.clone()),
        location_source,
        surface,
        auth_key: config.auth_key.clone(),
    }
}

pub fn gen_router(state: AppState) -> Router {
    let cors_middleware = CorsLayer::new();

    apply_routes(Router::new())
        .route("/", get(root))
        .layer(cors_middleware)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
}

pub fn gen_app(config: AppConfig) -> Router {
    gen_router(gen_state(&config))
}

async fn root() -> &'static str {
    "dispatch-nav"
}

#[cfg(test)]
pub struct MockApp {
    pub app: Router,
    pub state: AppState,
    pub geocoding_server: mockito::ServerGuard,
    pub routing_server: mockito::ServerGuard,
}

#[cfg(test)]
pub async fn gen_mock_app() -> MockApp {
    gen_mock_app_with(None).await
}

#[cfg(test)]
pub async fn gen_mock_app_with(auth_key: Option<String>) -> MockApp {
    use crate::navigation::map_view_controller::MapViewConfig;

    let geocoding_server = mockito::Server::new_async().await;
    let routing_server = mockito::Server::new_async().await;

    let config = AppConfig {
        bind_address: "127.0.0.1:0".to_string(),
        geocoding_host: geocoding_server.url(),
        routing_host: routing_server.url(),
        user_agent: "dispatch-nav-test".to_string(),
        auth_key,
        navigation: NavigationConfig {
            lookup_timeout: Duration::from_secs(2),
            geocode_retry_backoff: Duration::from_millis(10),
            map: MapViewConfig {
                size_settle_delay: Duration::ZERO,
                ..MapViewConfig::default()
            },
            ..NavigationConfig::default()
        },
    };
    let state = gen_state(&config);

    MockApp {
        app: gen_router(state.clone()),
        state,
        geocoding_server,
        routing_server,
    }
}
