use crate::server::ServerRouter;
use axum::Router;

mod auth;
mod comments;
mod posts;
mod uploads;
mod users;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(auth::routes())
        .merge(posts::routes())
        .merge(comments::routes())
        .merge(users::routes())
        .merge(uploads::routes())
}
