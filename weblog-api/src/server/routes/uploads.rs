use crate::server::{
    Result, ServerError, ServerRouter, json::Json, session::AuthenticatedUser, upload::UploadStore,
};
use axum::extract::{Multipart, State};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Serialize;
use std::sync::Arc;

pub const UPLOAD_FIELD: &str = "image";

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_post(upload_image)
}

#[derive(TypedPath)]
#[typed_path("/api/uploads/image")]
struct UploadImagePath;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct UploadResponse {
    url: String,
}

async fn upload_image(
    UploadImagePath: UploadImagePath,
    _user: AuthenticatedUser,
    State(uploads): State<Arc<UploadStore>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(ToOwned::to_owned);
        let data = field.bytes().await?;
        let url = uploads.store(file_name.as_deref(), &data).await?;

        return Ok(Json(UploadResponse { url }));
    }

    Err(ServerError::MissingUploadField)
}
