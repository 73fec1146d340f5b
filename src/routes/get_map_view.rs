use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    navigation::render_surface::MapScene, types::app_state::AppState,
    utils::app_error::AppError,
};

#[derive(Serialize, Deserialize)]
pub struct MapViewResponse {
    pub data: MapScene,
}

pub async fn get_map_view(State(state): State<AppState>) -> Result<Response, AppError> {
    Ok(Json(MapViewResponse {
        data: state.surface.scene(),
    })
    .into_response())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::app::gen_mock_app;

    #[tokio::test]
    async fn test_get_map_view_before_navigation() {
        let mock_app = gen_mock_app().await;

        let response = mock_app
            .app
            .oneshot(Request::builder().uri("/map").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: MapViewResponse = serde_json::from_slice(&body).unwrap();

        assert!(!body.data.mounted);
        assert!(body.data.overlays.is_empty());
        assert_eq!(body.data.counters.attaches, 0);
    }
}
