use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// `Json<T>` whose rejections come back as JSON [`ApiError`]s instead of
/// axum's plain-text bodies. Unparsable or mistyped bodies are
/// [`ApiError::InvalidJson`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => {
                let message = rejection.body_text();
                tracing::warn!("Rejected request body: {}", message);
                // Size and content-type failures keep their own status
                Err(match rejection.status() {
                    StatusCode::PAYLOAD_TOO_LARGE => ApiError::payload_too_large(message),
                    StatusCode::UNSUPPORTED_MEDIA_TYPE => ApiError::unsupported_media_type(message),
                    _ => ApiError::invalid_json(message),
                })
            }
        }
    }
}

/// Customer id taken from the path; must not be blank
pub fn customer_id_param(raw: &str) -> Result<&str, ApiError> {
    if raw.trim().is_empty() {
        return Err(ApiError::bad_request("Invalid customer id"));
    }
    Ok(raw)
}

/// Order id taken from the path; must be a 32-bit integer
pub fn order_id_param(raw: &str) -> Result<i32, ApiError> {
    raw.parse::<i32>()
        .map_err(|_| ApiError::bad_request(format!("Invalid order id: {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_customer_ids_are_rejected() {
        assert_eq!(customer_id_param("ALFKI").unwrap(), "ALFKI");
        assert_eq!(
            customer_id_param("  ").unwrap_err().status_code(),
            StatusCode::BAD_REQUEST
        );
        assert!(customer_id_param("").is_err());
    }

    #[test]
    fn order_ids_must_be_integers() {
        assert_eq!(order_id_param("10248").unwrap(), 10248);
        assert_eq!(order_id_param("-1").unwrap(), -1);
        assert!(order_id_param("abc").is_err());
        assert!(order_id_param("12.5").is_err());
        assert!(order_id_param(" 7").is_err());
        assert!(order_id_param("99999999999").is_err());
    }
}
