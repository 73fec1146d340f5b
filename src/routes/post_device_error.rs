use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::warn;
use validator::Validate;

use super::post_device_position::{DeliveryResponse, DeliveryResponseData};
use crate::{
    navigation::location_source::{LocationErrorCode, LocationEvent},
    types::app_state::AppState,
    utils::{app_error::AppError, validated_json::ValidatedJson},
};

#[derive(Validate, Deserialize)]
pub struct PostDeviceErrorPayload {
    pub code: LocationErrorCode,
}

pub async fn post_device_error(
    State(state): State<AppState>,
    ValidatedJson(PostDeviceErrorPayload { code }): ValidatedJson<PostDeviceErrorPayload>,
) -> Result<Response, AppError> {
    warn!("Device reported location error {:?}", code);
    let delivered = state.location_source.push(LocationEvent::Error(code));

    Ok(Json(DeliveryResponse {
        data: DeliveryResponseData { delivered },
    })
    .into_response())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::{
        app::gen_mock_app,
        routes::test_helpers::{body_json, empty_request, json_request},
    };

    #[tokio::test]
    async fn test_post_device_error_fails_acquiring_session() {
        let mock_app = gen_mock_app().await;
        mock_app.state.navigator.start("123 Main St").await;

        let response = mock_app
            .app
            .clone()
            .oneshot(json_request(
                "POST",
                "/device/error",
                json!({ "code": "permission_denied" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["delivered"], 1);

        let mut snapshots = mock_app.state.navigator.subscribe().await.unwrap();
        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            snapshots.wait_for(|s| !s.status.is_live()),
        )
        .await
        .unwrap()
        .unwrap();

        let response = mock_app
            .app
            .oneshot(empty_request("GET", "/navigation"))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["data"]["status"]["state"], "failed");
        assert_eq!(body["data"]["status"]["error"]["kind"], "permission_denied");
    }

    #[tokio::test]
    async fn test_post_device_error_rejects_unknown_code() {
        let mock_app = gen_mock_app().await;

        let response = mock_app
            .app
            .oneshot(json_request(
                "POST",
                "/device/error",
                json!({ "code": "on_fire" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
