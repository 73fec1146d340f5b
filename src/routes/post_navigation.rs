use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::{
    navigation::navigation_session::SessionSnapshot,
    types::app_state::AppState,
    utils::{app_error::AppError, validated_json::ValidatedJson},
};

#[derive(Validate, Deserialize)]
pub struct PostNavigationPayload {
    #[validate(length(min = 1, message = "Must be at least 1 character"))]
    pub address: String,
}

#[derive(Serialize)]
pub struct NavigationResponse {
    /// `None` when no session has been started yet.
    pub data: Option<SessionSnapshot>,
}

pub async fn post_navigation(
    State(state): State<AppState>,
    ValidatedJson(PostNavigationPayload { address }): ValidatedJson<PostNavigationPayload>,
) -> Result<Response, AppError> {
    info!("Navigation requested to {}", address);
    let snapshot = state.navigator.start(&address).await;

    Ok(Json(NavigationResponse {
        data: Some(snapshot),
    })
    .into_response())
}
