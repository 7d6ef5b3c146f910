use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct Meta {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub total: Option<i64>,
}

impl Meta {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
            total: Some(total),
        }
    }

    pub fn empty() -> Self {
        Self {
            page: None,
            per_page: None,
            total: None,
        }
    }
}

/// Data payload of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// Uniform envelope for every endpoint, success and error alike.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta,
        }
    }
}

impl ApiResponse<ErrorBody> {
    /// Error envelope; the message doubles as the error body so clients can
    /// read either field.
    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            data: Some(ErrorBody {
                error: message.clone(),
            }),
            message,
            meta: Some(Meta::empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_wraps_data_and_meta() {
        let resp = ApiResponse::success("OK", 42, Some(Meta::new(2, 20, 55)));
        assert_eq!(resp.message, "OK");
        assert_eq!(resp.data, Some(42));
        let meta = resp.meta.unwrap();
        assert_eq!(meta.page, Some(2));
        assert_eq!(meta.total, Some(55));
    }

    #[test]
    fn error_repeats_message_in_body() {
        let resp = ApiResponse::error("Not Found");
        assert_eq!(resp.message, "Not Found");
        assert_eq!(resp.data.unwrap().error, "Not Found");
    }
}
