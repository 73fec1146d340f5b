use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    navigation::navigation_session::SessionCommand,
    types::app_state::AppState,
    utils::{app_error::AppError, validated_json::ValidatedJson},
};

#[derive(Validate, Deserialize)]
pub struct PutMapFullscreenPayload {
    pub fullscreen: bool,
}

#[derive(Serialize, Deserialize)]
pub struct PutMapFullscreenResponseData {
    pub fullscreen: bool,
}

#[derive(Serialize, Deserialize)]
pub struct PutMapFullscreenResponse {
    pub data: PutMapFullscreenResponseData,
}

pub async fn put_map_fullscreen(
    State(state): State<AppState>,
    ValidatedJson(PutMapFullscreenPayload { fullscreen }): ValidatedJson<PutMapFullscreenPayload>,
) -> Result<Response, AppError> {
    if !state
        .navigator
        .send(SessionCommand::SetFullscreen(fullscreen))
        .await
    {
        return Err(AppError::conflict("No live navigation session"));
    }

    Ok(Json(PutMapFullscreenResponse {
        data: PutMapFullscreenResponseData { fullscreen },
    })
    .into_response())
}
