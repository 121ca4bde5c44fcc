pub mod comment;
pub mod post;
pub mod session;
pub mod user;

use crate::model::user::{InvalidEmailError, InvalidUsernameError, UserMarker};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, marker::PhantomData, str::FromStr};
use thiserror::Error;
use uuid::Uuid;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    Username(#[from] InvalidUsernameError),
    #[error(transparent)]
    Email(#[from] InvalidEmailError),
}

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id<Marker>(Uuid, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid, PhantomData)
    }

    #[must_use]
    pub fn random() -> Self {
        Self::new(Uuid::new_v4())
    }

    #[must_use]
    pub fn get(self) -> Uuid {
        self.0
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> FromStr for Id<Marker> {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::from_str(s).map(Self::new)
    }
}

impl<Marker> From<Uuid> for Id<Marker> {
    fn from(value: Uuid) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<Id<Marker>> for Uuid {
    fn from(value: Id<Marker>) -> Self {
        value.get()
    }
}

/// Ownership check shared by posts and comments. Produced by
/// `ensure_author` when the acting user is not the resource's author.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
#[error("User {user} is not the author of the resource")]
pub struct NotAuthorError {
    pub user: Id<UserMarker>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{post::PostMarker, user::UserMarker};

    #[test]
    fn id_roundtrips_through_display_and_parse() {
        let id: Id<UserMarker> = Id::random();
        let parsed: Id<UserMarker> = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn id_markers_do_not_mix_values() {
        let uuid = Uuid::new_v4();
        let user_id: Id<UserMarker> = uuid.into();
        let post_id: Id<PostMarker> = uuid.into();
        assert_eq!(user_id.get(), post_id.get());
    }
}
