use crate::server::{
    MessageResponse, Result, ServerError, ServerRouter, json::Json, session::AuthenticatedUser,
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use weblog_common::model::{
    Id,
    comment::{Comment, CommentMarker, CreateComment},
    post::PostMarker,
};
use weblog_db::client::DbClient;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(create_comment)
        .typed_get(post_comments)
        .typed_put(update_comment)
        .typed_delete(delete_comment)
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct CommentResponse {
    message: &'static str,
    comment: Comment,
}

#[derive(TypedPath)]
#[typed_path("/api/comments")]
struct CommentsPath;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct CreateCommentRequest {
    content: String,
    post_id: Id<PostMarker>,
}

async fn create_comment(
    CommentsPath: CommentsPath,
    user: AuthenticatedUser,
    State(db): State<Arc<DbClient>>,
    Json(request): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>)> {
    db.fetch_post(request.post_id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(request.post_id))?;

    let comment = db
        .create_comment(&CreateComment {
            content: request.content,
            author: user.user_id(),
            post: request.post_id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CommentResponse {
            message: "Comment created",
            comment,
        }),
    ))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/comments/{id}", rejection(ServerError))]
struct PostCommentsPath {
    id: Id<PostMarker>,
}

async fn post_comments(
    PostCommentsPath { id }: PostCommentsPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Vec<Comment>>> {
    let comments = db.latest_comments(id).await?;

    Ok(Json(comments))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/comments/{id}", rejection(ServerError))]
struct CommentPath {
    id: Id<CommentMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
struct UpdateCommentRequest {
    content: Option<String>,
}

async fn update_comment(
    CommentPath { id }: CommentPath,
    user: AuthenticatedUser,
    State(db): State<Arc<DbClient>>,
    Json(request): Json<UpdateCommentRequest>,
) -> Result<Json<CommentResponse>> {
    let comment = db
        .fetch_comment(id)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(id))?;
    comment.ensure_author(user.user_id())?;

    let comment = db
        .update_comment(id, request.content.as_deref())
        .await?
        .ok_or(ServerError::CommentByIdNotFound(id))?;

    Ok(Json(CommentResponse {
        message: "Comment updated",
        comment,
    }))
}

async fn delete_comment(
    CommentPath { id }: CommentPath,
    user: AuthenticatedUser,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<MessageResponse>> {
    let comment = db
        .fetch_comment(id)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(id))?;
    comment.ensure_author(user.user_id())?;

    db.delete_comment(id).await?;

    Ok(Json(MessageResponse {
        message: "Comment deleted",
    }))
}
