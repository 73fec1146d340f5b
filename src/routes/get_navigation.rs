use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};

use super::post_navigation::NavigationResponse;
use crate::{types::app_state::AppState, utils::app_error::AppError};

pub async fn get_navigation(State(state): State<AppState>) -> Result<Response, AppError> {
    Ok(Json(NavigationResponse {
        data: state.navigator.snapshot().await,
    })
    .into_response())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use tower::ServiceExt;

    use crate::{
        app::gen_mock_app,
        routes::test_helpers::{body_json, empty_request},
    };

    #[tokio::test]
    async fn test_get_navigation_without_session() {
        let mock_app = gen_mock_app().await;

        let response = mock_app
            .app
            .oneshot(empty_request("GET", "/navigation"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_json(response).await["data"].is_null());
    }

    #[tokio::test]
    async fn test_get_navigation_reports_live_session() {
        let mock_app = gen_mock_app().await;
        mock_app.state.navigator.start("123 Main St").await;

        let response = mock_app
            .app
            .oneshot(empty_request("GET", "/navigation"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["destination_address"], "123 Main St");
        assert!(body["data"]["route"].is_null());

        mock_app.state.navigator.stop().await;
    }
}
