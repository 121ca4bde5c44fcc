use crate::model::{
    Id, NotAuthorError,
    post::PostMarker,
    user::{User, UserMarker},
};
use serde::Serialize;
use time::UtcDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub content: String,
    pub author: User,
    pub post: Id<PostMarker>,
    pub created_at: UtcDateTime,
}

impl Comment {
    /// Ownership gate: must pass before any mutation of the comment.
    pub fn ensure_author(&self, user: Id<UserMarker>) -> Result<(), NotAuthorError> {
        if self.author.id == user {
            Ok(())
        } else {
            Err(NotAuthorError { user })
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreateComment {
    pub content: String,
    pub author: Id<UserMarker>,
    pub post: Id<PostMarker>,
}
