//! 请求体提取器
//!
//! 与 `axum::Json` 相同，但拒绝时返回 `CoreError`，
//! 让格式错误的请求体也使用统一的错误响应结构。

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use super::error::CoreError;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = CoreError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(CoreError::BadRequest(rejection.body_text())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::header};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Payload {
        name: String,
    }

    fn request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn valid_body_is_extracted() {
        let JsonBody(payload) = JsonBody::<Payload>::from_request(request(r#"{"name":"teff"}"#), &())
            .await
            .unwrap();
        assert_eq!(payload.name, "teff");
    }

    #[tokio::test]
    async fn malformed_body_becomes_bad_request() {
        for body in ["{", r#"{"name": 5}"#, "{}"] {
            let result = JsonBody::<Payload>::from_request(request(body), &()).await;
            assert!(matches!(result, Err(CoreError::BadRequest(_))), "{body}");
        }

        // 超出 f64 范围的数字在解析阶段就失败
        let result =
            JsonBody::<serde_json::Value>::from_request(request(r#"{"amount": 1e400}"#), &()).await;
        assert!(matches!(result, Err(CoreError::BadRequest(_))));
    }

    #[tokio::test]
    async fn missing_content_type_becomes_bad_request() {
        let req = Request::builder()
            .method("POST")
            .body(Body::from(r#"{"name":"teff"}"#))
            .unwrap();
        let result = JsonBody::<Payload>::from_request(req, &()).await;
        assert!(matches!(result, Err(CoreError::BadRequest(_))));
    }
}
