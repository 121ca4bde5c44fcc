use crate::server::{
    MessageResponse, Result, ServerError, ServerRouter,
    json::Json,
    session::AuthenticatedUser,
    upload::UploadStore,
};
use axum::{
    extract::{FromRequestParts, Query, State},
    http::StatusCode,
};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use weblog_common::{
    content::upload_refs,
    model::{
        Id,
        post::{CreatePost, ListedPost, Post, PostMarker, UpdatePost},
    },
    pagination::Pagination,
};
use weblog_db::client::DbClient;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(create_post)
        .typed_get(list_posts)
        .typed_get(get_post)
        .typed_put(update_post)
        .typed_delete(delete_post)
        .typed_post(toggle_like)
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct PostResponse {
    message: &'static str,
    post: Post,
}

#[derive(TypedPath)]
#[typed_path("/api/posts")]
struct PostsPath;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct CreatePostRequest {
    title: String,
    content: String,
}

async fn create_post(
    PostsPath: PostsPath,
    user: AuthenticatedUser,
    State(db): State<Arc<DbClient>>,
    Json(request): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostResponse>)> {
    let post = db
        .create_post(&CreatePost {
            title: request.title,
            content: request.content,
            author: user.user_id(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PostResponse {
            message: "Post created",
            post,
        }),
    ))
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, FromRequestParts)]
#[from_request(via(Query), rejection(ServerError))]
struct ListQuery {
    page: Option<u32>,
    size: Option<u32>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct PostListResponse {
    posts: Vec<ListedPost>,
    page: u32,
    total_pages: u64,
}

async fn list_posts(
    PostsPath: PostsPath,
    query: ListQuery,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<PostListResponse>> {
    let pagination = Pagination::new(query.page, query.size);
    let (posts, total) = db.list_posts(pagination).await?;

    Ok(Json(PostListResponse {
        posts,
        page: pagination.page(),
        total_pages: pagination.total_pages(total),
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

async fn get_post(
    PostPath { id }: PostPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Post>> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}

async fn update_post(
    PostPath { id }: PostPath,
    user: AuthenticatedUser,
    State(db): State<Arc<DbClient>>,
    Json(update): Json<UpdatePost>,
) -> Result<Json<PostResponse>> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;
    post.ensure_author(user.user_id())?;

    let post = db
        .update_post(id, &update)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(PostResponse {
        message: "Post updated",
        post,
    }))
}

async fn delete_post(
    PostPath { id }: PostPath,
    user: AuthenticatedUser,
    State(db): State<Arc<DbClient>>,
    State(uploads): State<Arc<UploadStore>>,
) -> Result<Json<MessageResponse>> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;
    post.ensure_author(user.user_id())?;

    // Embedded image files go first. A failed file deletion must not
    // abort the record deletion.
    for reference in upload_refs(&post.content) {
        if let Err(error) = uploads.remove(reference).await {
            warn!(%error, reference, "Failed to delete upload referenced by removed post");
        }
    }

    db.delete_post_cascade(id).await?;

    Ok(Json(MessageResponse {
        message: "Post deleted",
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts/{id}/like", rejection(ServerError))]
struct PostLikePath {
    id: Id<PostMarker>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct LikeResponse {
    message: &'static str,
    liked: bool,
}

async fn toggle_like(
    PostLikePath { id }: PostLikePath,
    user: AuthenticatedUser,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<LikeResponse>> {
    db.fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    let liked = db.toggle_like(id, user.user_id()).await?;

    Ok(Json(LikeResponse {
        message: if liked { "Post liked" } else { "Like removed" },
        liked,
    }))
}
