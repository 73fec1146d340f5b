use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use super::app_error::AppError;

pub struct ValidatedJson<T>(pub T);

pub fn validate_payload<T: Validate>(data: &T, kind: &str) -> Result<(), AppError> {
    data.validate()
        .map_err(|e| AppError::bad_request(&format!("Invalid {}: {}", kind, e)))
}

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::bad_request(&format!("Invalid body: {}", e.body_text())))?;

        validate_payload(&data, "body")?;

        Ok(ValidatedJson(data))
    }
}
