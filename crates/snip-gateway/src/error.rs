use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use snip_core::StoreError;
use snip_shortener::ShortenerError;
use tracing::error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    /// The request carries no owner id.
    MissingUser,
    Shortener(ShortenerError),
}

impl From<ShortenerError> for AppError {
    fn from(value: ShortenerError) -> Self {
        AppError::Shortener(value)
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::MissingUser => StatusCode::UNAUTHORIZED,
            AppError::Shortener(err) => match err {
                ShortenerError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
                ShortenerError::Store(err) if err.is_validation() => StatusCode::BAD_REQUEST,
                ShortenerError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
                ShortenerError::Store(StoreError::Gone) => StatusCode::GONE,
                ShortenerError::Store(
                    StoreError::NotInitialized
                    | StoreError::Unavailable(_)
                    | StoreError::Timeout(_),
                ) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::MissingUser => "missing user id".to_string(),
            AppError::Shortener(err) => err.to_string(),
        };

        if status.is_server_error() {
            error!(%status, error = %message, "request failed");
        }

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ShortenerError) -> StatusCode {
        AppError::from(err).status()
    }

    #[test]
    fn validation_errors_are_bad_requests() {
        assert_eq!(
            status_of(ShortenerError::InvalidUrl("empty".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ShortenerError::Store(StoreError::EmptyCodeList)),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn lookup_errors_map_to_404_and_410() {
        assert_eq!(
            status_of(ShortenerError::Store(StoreError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ShortenerError::Store(StoreError::Gone)),
            StatusCode::GONE
        );
    }

    #[test]
    fn backend_errors_are_server_errors() {
        assert_eq!(
            status_of(ShortenerError::Store(StoreError::Timeout("slow".to_string()))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(ShortenerError::CodeSpaceExhausted(5)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::MissingUser.status(), StatusCode::UNAUTHORIZED);
    }
}
