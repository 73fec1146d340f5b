use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{types::app_state::AppState, utils::app_error::AppError};

#[derive(Serialize, Deserialize)]
pub struct WatchOptionsResponseData {
    pub enable_high_accuracy: bool,
    pub maximum_age_ms: u128,
}

#[derive(Serialize, Deserialize)]
pub struct WatchOptionsResponse {
    /// `None` while nobody is watching.
    pub data: Option<WatchOptionsResponseData>,
}

/// What the device should honor when sampling, per the latest open watch.
pub async fn get_device_watch_options(
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let data = state
        .location_source
        .requested_options()
        .map(|o| WatchOptionsResponseData {
            enable_high_accuracy: o.enable_high_accuracy,
            maximum_age_ms: o.maximum_age.as_millis(),
        });

    Ok(Json(WatchOptionsResponse { data }).into_response())
}
