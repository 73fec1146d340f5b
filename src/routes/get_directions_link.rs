use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    navigation::directions::directions_link,
    utils::{app_error::AppError, validated_query::ValidatedQuery},
};

#[derive(Validate, Deserialize)]
pub struct GetDirectionsLinkPayload {
    #[validate(length(min = 1, message = "Must be at least 1 character"))]
    pub address: String,
}

#[derive(Serialize, Deserialize)]
pub struct GetDirectionsLinkResponseData {
    pub url: String,
}

#[derive(Serialize, Deserialize)]
pub struct GetDirectionsLinkResponse {
    pub data: GetDirectionsLinkResponseData,
}

pub async fn get_directions_link(
    ValidatedQuery(GetDirectionsLinkPayload { address }): ValidatedQuery<
        GetDirectionsLinkPayload,
    >,
) -> Result<Response, AppError> {
    Ok(Json(GetDirectionsLinkResponse {
        data: GetDirectionsLinkResponseData {
            url: directions_link(&address),
        },
    })
    .into_response())
}
