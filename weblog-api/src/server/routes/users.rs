use crate::server::{
    MessageResponse, Result, ServerError, ServerRouter,
    json::Json,
    session::{AuthenticatedUser, CookiePolicy},
};
use axum::extract::State;
use axum_extra::{
    extract::CookieJar,
    routing::{RouterExt, TypedPath},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use weblog_common::{
    content::UPLOAD_PUBLIC_PREFIX,
    model::{
        comment::Comment,
        post::Post,
        user::{Email, UpdateUser, User, Username},
    },
    password::PasswordHash,
};
use weblog_db::client::DbClient;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_me)
        .typed_delete(delete_me)
        .typed_get(my_posts)
        .typed_get(my_liked)
        .typed_get(my_comments)
        .typed_patch(update_info)
        .typed_patch(update_image)
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct UserResponse {
    message: &'static str,
    user: User,
}

#[derive(TypedPath)]
#[typed_path("/api/users/me")]
struct MePath;

async fn get_me(
    MePath: MePath,
    user: AuthenticatedUser,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<User>> {
    let user = db
        .fetch_user(user.user_id())
        .await?
        .ok_or(ServerError::UserByIdNotFound(user.user_id()))?;

    Ok(Json(user))
}

/// Account removal cascades over the user's posts and comments, then
/// clears the session cookie. Files referenced by the removed posts
/// stay on disk; only single-post deletion cleans those up.
async fn delete_me(
    MePath: MePath,
    user: AuthenticatedUser,
    State(db): State<Arc<DbClient>>,
    State(cookie_policy): State<CookiePolicy>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>)> {
    db.delete_user_cascade(user.user_id()).await?;

    let jar = jar.remove(cookie_policy.removal_cookie());

    Ok((
        jar,
        Json(MessageResponse {
            message: "Account deleted",
        }),
    ))
}

#[derive(TypedPath)]
#[typed_path("/api/users/me/posts")]
struct MyPostsPath;

async fn my_posts(
    MyPostsPath: MyPostsPath,
    user: AuthenticatedUser,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Vec<Post>>> {
    let posts = db.posts_by_author(user.user_id()).await?;

    Ok(Json(posts))
}

#[derive(TypedPath)]
#[typed_path("/api/users/me/liked")]
struct MyLikedPath;

async fn my_liked(
    MyLikedPath: MyLikedPath,
    user: AuthenticatedUser,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Vec<Post>>> {
    let posts = db.posts_liked_by(user.user_id()).await?;

    Ok(Json(posts))
}

#[derive(TypedPath)]
#[typed_path("/api/users/me/comments")]
struct MyCommentsPath;

async fn my_comments(
    MyCommentsPath: MyCommentsPath,
    user: AuthenticatedUser,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Vec<Comment>>> {
    let comments = db.comments_by_author(user.user_id()).await?;

    Ok(Json(comments))
}

#[derive(TypedPath)]
#[typed_path("/api/users/me/info")]
struct MyInfoPath;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
struct UpdateInfoRequest {
    username: Option<Username>,
    email: Option<Email>,
    password: Option<String>,
}

async fn update_info(
    MyInfoPath: MyInfoPath,
    user: AuthenticatedUser,
    State(db): State<Arc<DbClient>>,
    Json(request): Json<UpdateInfoRequest>,
) -> Result<Json<UserResponse>> {
    let password_hash = request
        .password
        .as_deref()
        .map(PasswordHash::generate)
        .transpose()?;

    let updated = db
        .update_user(
            user.user_id(),
            &UpdateUser {
                username: request.username,
                email: request.email,
                password_hash,
            },
        )
        .await?
        .ok_or(ServerError::UserByIdNotFound(user.user_id()))?;

    Ok(Json(UserResponse {
        message: "Profile updated",
        user: updated,
    }))
}

#[derive(TypedPath)]
#[typed_path("/api/users/me/image")]
struct MyImagePath;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct UpdateImageRequest {
    url: String,
}

async fn update_image(
    MyImagePath: MyImagePath,
    user: AuthenticatedUser,
    State(db): State<Arc<DbClient>>,
    Json(request): Json<UpdateImageRequest>,
) -> Result<Json<UserResponse>> {
    if !request.url.starts_with(UPLOAD_PUBLIC_PREFIX) {
        return Err(ServerError::ForeignImagePath);
    }

    let updated = db
        .set_profile_image(user.user_id(), &request.url)
        .await?
        .ok_or(ServerError::UserByIdNotFound(user.user_id()))?;

    Ok(Json(UserResponse {
        message: "Profile image updated",
        user: updated,
    }))
}
