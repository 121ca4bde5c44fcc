use crate::server::{
    MessageResponse, Result, ServerError, ServerRouter,
    json::Json,
    session::{AuthenticatedUser, CookiePolicy},
};
use axum::{extract::State, http::StatusCode};
use axum_extra::{
    extract::CookieJar,
    routing::{RouterExt, TypedPath},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::UtcDateTime;
use weblog_common::{
    model::{
        session::SessionKey,
        user::{CreateUser, Email, User, Username},
    },
    password::PasswordHash,
};
use weblog_db::client::DbClient;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(register)
        .typed_post(login)
        .typed_post(logout)
        .typed_get(check)
}

#[derive(TypedPath)]
#[typed_path("/api/auth/register")]
struct RegisterPath;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct RegisterRequest {
    username: Username,
    email: Email,
    password: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct UserResponse {
    message: &'static str,
    user: User,
}

async fn register(
    RegisterPath: RegisterPath,
    State(db): State<Arc<DbClient>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let password_hash = PasswordHash::generate(&request.password)?;
    let user = db
        .create_user(&CreateUser {
            username: request.username,
            email: request.email,
            password_hash,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            message: "Account created",
            user,
        }),
    ))
}

#[derive(TypedPath)]
#[typed_path("/api/auth/login")]
struct LoginPath;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct LoginRequest {
    email: Email,
    password: String,
}

async fn login(
    LoginPath: LoginPath,
    State(db): State<Arc<DbClient>>,
    State(session_key): State<SessionKey>,
    State(cookie_policy): State<CookiePolicy>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<MessageResponse>)> {
    let (user_id, password_hash) = db
        .fetch_credentials(&request.email)
        .await?
        .ok_or(ServerError::UnknownEmail)?;

    if !password_hash.verify(&request.password)? {
        return Err(ServerError::WrongPassword);
    }

    let token = session_key.issue(user_id, UtcDateTime::now());
    let jar = jar.add(cookie_policy.session_cookie(&token));

    Ok((
        jar,
        Json(MessageResponse {
            message: "Logged in",
        }),
    ))
}

#[derive(TypedPath)]
#[typed_path("/api/auth/logout")]
struct LogoutPath;

async fn logout(
    LogoutPath: LogoutPath,
    State(cookie_policy): State<CookiePolicy>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    let jar = jar.remove(cookie_policy.removal_cookie());

    (
        jar,
        Json(MessageResponse {
            message: "Logged out",
        }),
    )
}

#[derive(TypedPath)]
#[typed_path("/api/auth/check")]
struct CheckPath;

async fn check(
    CheckPath: CheckPath,
    user: AuthenticatedUser,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<User>> {
    // The token only proves the identity existed at login time.
    let user = db
        .fetch_user(user.user_id())
        .await?
        .ok_or(ServerError::UserByIdNotFound(user.user_id()))?;

    Ok(Json(user))
}
