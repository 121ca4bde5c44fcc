use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::UtcDateTime;
use weblog_common::model::{
    Id,
    session::{SessionKey, SessionToken},
    user::UserMarker,
};

pub const SESSION_COOKIE: &str = "token";

/// Cookie attributes per deployment environment. A cross-site frontend
/// needs `Secure` together with `SameSite=None`; local same-site
/// development relaxes both.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct CookiePolicy {
    pub secure: bool,
}

impl CookiePolicy {
    #[must_use]
    pub fn session_cookie(self, token: &SessionToken) -> Cookie<'static> {
        let mut cookie = Cookie::new(SESSION_COOKIE, token.to_string());
        cookie.set_http_only(true);
        cookie.set_path("/");
        if self.secure {
            cookie.set_secure(true);
            cookie.set_same_site(SameSite::None);
        } else {
            cookie.set_same_site(SameSite::Lax);
        }

        cookie
    }

    /// The cookie to pass to `CookieJar::remove`. Clearing the cookie
    /// does not invalidate tokens already copied elsewhere; they stay
    /// valid until their embedded expiry.
    #[must_use]
    pub fn removal_cookie(self) -> Cookie<'static> {
        let mut cookie = Cookie::new(SESSION_COOKIE, "");
        cookie.set_path("/");

        cookie
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct AuthenticatedUser {
    id: Id<UserMarker>,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn user_id(self) -> Id<UserMarker> {
        self.id
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    SessionKey: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = match CookieJar::from_request_parts(parts, state).await {
            Ok(jar) => jar,
            Err(infallible) => match infallible {},
        };

        let cookie = jar
            .get(SESSION_COOKIE)
            .ok_or(ServerError::MissingSessionCookie)?;
        let token: SessionToken = cookie.value().parse()?;

        let id = SessionKey::from_ref(state).verify(&token, UtcDateTime::now())?;

        Ok(Self { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::utc_datetime;

    fn token() -> SessionToken {
        let key = SessionKey::new(b"0123456789abcdef0123456789abcdef").unwrap();
        key.issue(Id::random(), utc_datetime!(2026-01-01 00:00))
    }

    #[test]
    fn session_cookie_is_http_only_on_every_policy() {
        for secure in [false, true] {
            let cookie = CookiePolicy { secure }.session_cookie(&token());
            assert_eq!(cookie.http_only(), Some(true));
            assert_eq!(cookie.path(), Some("/"));
        }
    }

    #[test]
    fn secure_policy_allows_cross_site_requests() {
        let cookie = CookiePolicy { secure: true }.session_cookie(&token());

        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::None));
    }

    #[test]
    fn development_policy_stays_same_site() {
        let cookie = CookiePolicy { secure: false }.session_cookie(&token());

        assert_eq!(cookie.secure(), None);
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }

    #[test]
    fn cookie_value_parses_back_into_the_token() {
        let token = token();
        let cookie = CookiePolicy::default().session_cookie(&token);
        let parsed: SessionToken = cookie.value().parse().unwrap();

        assert_eq!(parsed, token);
    }
}
