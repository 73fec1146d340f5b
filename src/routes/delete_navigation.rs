use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;

use super::post_navigation::NavigationResponse;
use crate::{types::app_state::AppState, utils::app_error::AppError};

pub async fn delete_navigation(State(state): State<AppState>) -> Result<Response, AppError> {
    let snapshot = state.navigator.stop().await;
    if let Some(snapshot) = &snapshot {
        info!("Navigation session {} ended by request", snapshot.id);
    }

    Ok(Json(NavigationResponse { data: snapshot }).into_response())
}
