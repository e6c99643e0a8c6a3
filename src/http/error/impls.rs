use actix_web::{body::BoxBody, http::StatusCode, HttpResponse};

use super::{Error, ErrorBody, ErrorKind};

impl ErrorKind {
    #[must_use]
    pub const fn status_code(self) -> StatusCode {
        match self {
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

impl actix_web::ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        self.kind.status_code()
    }

    fn error_response(&self) -> HttpResponse<BoxBody> {
        match self.kind {
            ErrorKind::Internal => {
                tracing::error!(report = ?self.report, trace = %self.trace, "Request failed");
            }
            _ => tracing::debug!(report = ?self.report, "Request rejected"),
        }
        HttpResponse::build(self.status_code()).json(ErrorBody::from(self.kind))
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::super::{Error, ErrorKind, HandlerError};
    use actix_web::{body::MessageBody, http::StatusCode, ResponseError};
    use error_stack::Report;

    #[test]
    fn internal_errors_hide_their_cause() {
        let cause = Report::new(std::io::Error::other("connection refused by 10.0.0.7"));
        let error = Error::internal(cause, HandlerError::Repository);
        assert_eq!(error.kind(), ErrorKind::Internal);

        let response = error.error_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().try_into_bytes().unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "code": "internal", "message": "Something went wrong" })
        );
    }

    #[test]
    fn not_found_maps_to_404() {
        let error = Error::not_found();
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
        assert!(matches!(
            error.report().current_context(),
            HandlerError::NotFound
        ));
    }
}
