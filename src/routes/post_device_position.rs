use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::Validate;

use crate::{
    navigation::location_source::LocationEvent,
    types::{app_state::AppState, geo_point::GeoPoint, position_fix::PositionFix},
    utils::{app_error::AppError, validated_json::ValidatedJson},
};

#[derive(Validate, Deserialize)]
pub struct PostDevicePositionPayload {
    #[validate(range(min = -90.0, max = 90.0, message = "Must be between -90 and 90"))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0, message = "Must be between -180 and 180"))]
    pub longitude: f64,

    #[validate(range(min = 0.0, message = "Must not be negative"))]
    pub accuracy: Option<f64>,

    /// Device capture time, kept for reference only. Fixes are stamped on
    /// receipt since the device clock may not match ours.
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize)]
pub struct DeliveryResponseData {
    /// Number of open watches the event reached.
    pub delivered: usize,
}

#[derive(Serialize, Deserialize)]
pub struct DeliveryResponse {
    pub data: DeliveryResponseData,
}

pub async fn post_device_position(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<PostDevicePositionPayload>,
) -> Result<Response, AppError> {
    let received_at = Utc::now();
    if let Some(reported_at) = payload.timestamp {
        debug!(
            "Device clock offset for fix: {} ms",
            (reported_at - received_at).num_milliseconds()
        );
    }

    let fix = PositionFix::new(
        GeoPoint::new(payload.latitude, payload.longitude),
        payload.accuracy,
        received_at,
    )
    .with_reported_at(payload.timestamp);
    let delivered = state.location_source.push(LocationEvent::Fix(fix));
    debug!("Position fix delivered to {} watches", delivered);

    Ok(Json(DeliveryResponse {
        data: DeliveryResponseData { delivered },
    })
    .into_response())
}
