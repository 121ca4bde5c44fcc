use crate::server::{
    session::CookiePolicy,
    upload::{UploadError, UploadStore},
};
use axum::{
    Router,
    extract::{
        FromRef, Request,
        multipart::MultipartError,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use json::Json;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;
use weblog_common::model::{
    Id, NotAuthorError,
    comment::CommentMarker,
    post::PostMarker,
    session::{SessionKey, SessionTokenDecodeError, SessionVerifyError},
    user::UserMarker,
};
use weblog_common::password::PasswordHashError;
use weblog_db::client::{DbClient, DbError};

mod json;
pub mod routes;
pub mod session;
pub mod upload;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
    pub session_key: SessionKey,
    pub cookie_policy: CookiePolicy,
    pub upload_store: Arc<UploadStore>,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Query string rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("No session cookie was provided")]
    MissingSessionCookie,
    #[error("The session token could not be decoded: {0}")]
    InvalidSessionToken(#[from] SessionTokenDecodeError),
    #[error("The session token was rejected: {0}")]
    SessionVerification(#[from] SessionVerifyError),
    #[error(transparent)]
    NotResourceAuthor(#[from] NotAuthorError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("Comment with id {0} was not found.")]
    CommentByIdNotFound(Id<CommentMarker>),
    #[error("User with id {0} was not found.")]
    UserByIdNotFound(Id<UserMarker>),
    #[error("An account with these details already exists ({0})")]
    DuplicateUser(String),
    #[error("No account is registered for this email address")]
    UnknownEmail,
    #[error("The password does not match")]
    WrongPassword,
    #[error("The profile image must be an uploaded file path")]
    ForeignImagePath,
    #[error("Multipart payload rejected: {0}")]
    Multipart(#[from] MultipartError),
    #[error("The multipart payload contained no image field")]
    MissingUploadField,
    #[error("Storing the uploaded file failed: {0}")]
    Upload(#[from] UploadError),
    #[error("Password hashing failed: {0}")]
    PasswordHash(#[from] PasswordHashError),
    #[error(transparent)]
    Database(DbError),
}

impl From<DbError> for ServerError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Duplicate(constraint) => Self::DuplicateUser(constraint),
            error => Self::Database(error),
        }
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::CommentByIdNotFound(_)
            | ServerError::UserByIdNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::MissingSessionCookie | ServerError::WrongPassword => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::InvalidSessionToken(_)
            | ServerError::SessionVerification(_)
            | ServerError::NotResourceAuthor(_) => StatusCode::FORBIDDEN,
            ServerError::QueryRejection(_)
            | ServerError::JsonRejection(_)
            | ServerError::DuplicateUser(_)
            | ServerError::UnknownEmail
            | ServerError::ForeignImagePath
            | ServerError::Multipart(_)
            | ServerError::MissingUploadField => StatusCode::BAD_REQUEST,
            ServerError::JsonResponse(_)
            | ServerError::Upload(_)
            | ServerError::PasswordHash(_)
            | ServerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short user-facing message, independent of the error detail.
    pub fn message(&self) -> &'static str {
        match self {
            ServerError::UnknownRoute(_) | ServerError::PathRejection(_) => "Not found",
            ServerError::QueryRejection(_) | ServerError::JsonRejection(_) => "Invalid request",
            ServerError::JsonResponse(_) => "Response serialization failed",
            ServerError::MissingSessionCookie => "Authentication required",
            ServerError::InvalidSessionToken(_) | ServerError::SessionVerification(_) => {
                "Invalid session token"
            }
            ServerError::NotResourceAuthor(_) => "Permission denied",
            ServerError::PostByIdNotFound(_) => "Post not found",
            ServerError::CommentByIdNotFound(_) => "Comment not found",
            ServerError::UserByIdNotFound(_) => "User not found",
            ServerError::DuplicateUser(_) => "Email or username already in use",
            ServerError::UnknownEmail => "No such user",
            ServerError::WrongPassword => "Wrong password",
            ServerError::ForeignImagePath => "Invalid profile image path",
            ServerError::Multipart(_) => "Invalid upload payload",
            ServerError::MissingUploadField => "No image provided",
            ServerError::Upload(_) => "Upload failed",
            ServerError::PasswordHash(_) | ServerError::Database(_) => "Internal server error",
        }
    }
}

/// Success envelope used by mutations that have no entity to return.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let error_response = ErrorResponse {
            status: status.as_u16(),
            message: self.message(),
            error: status.is_server_error().then(|| self.to_string()),
        };
        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weblog_common::model::{session::SessionVerifyError, user::Username};

    #[test]
    fn missing_cookie_is_unauthorized() {
        assert_eq!(
            ServerError::MissingSessionCookie.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn rejected_tokens_and_foreign_resources_are_forbidden() {
        let expired = ServerError::SessionVerification(SessionVerifyError::Expired);
        let not_author = ServerError::NotResourceAuthor(NotAuthorError { user: Id::random() });

        assert_eq!(expired.status(), StatusCode::FORBIDDEN);
        assert_eq!(not_author.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn missing_resources_are_not_found() {
        assert_eq!(
            ServerError::PostByIdNotFound(Id::random()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServerError::CommentByIdNotFound(Id::random()).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn credential_failures_map_like_the_login_flow() {
        assert_eq!(ServerError::UnknownEmail.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ServerError::WrongPassword.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn duplicate_accounts_surface_as_validation_errors() {
        let error = ServerError::from(DbError::Duplicate("users_email_key".to_owned()));

        assert!(matches!(error, ServerError::DuplicateUser(_)));
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn only_server_errors_carry_the_underlying_text() {
        let data_error = Username::new(String::new()).unwrap_err();
        let error = ServerError::from(DbError::Data(data_error.into()));

        assert!(error.status().is_server_error());
        assert!(!ServerError::UnknownEmail.status().is_server_error());
    }
}
