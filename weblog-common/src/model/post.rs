use crate::model::{
    Id, NotAuthorError,
    user::{User, UserMarker},
};
use serde::{Deserialize, Serialize};
use time::UtcDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

/// A blog post. `content` is an opaque HTML blob produced by the
/// frontend editor and never interpreted here, except for upload
/// reference scanning on deletion.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub title: String,
    pub content: String,
    pub author: User,
    pub likes: Vec<Id<UserMarker>>,
    pub created_at: UtcDateTime,
}

impl Post {
    #[must_use]
    pub fn liked_by(&self, user: Id<UserMarker>) -> bool {
        self.likes.contains(&user)
    }

    /// Ownership gate: must pass before any mutation of the post.
    pub fn ensure_author(&self, user: Id<UserMarker>) -> Result<(), NotAuthorError> {
        if self.author.id == user {
            Ok(())
        } else {
            Err(NotAuthorError { user })
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreatePost {
    pub title: String,
    pub content: String,
    pub author: Id<UserMarker>,
}

/// Partial edit. `None` fields keep their stored value.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct UpdatePost {
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Listing entry: a post annotated with its derived comment count.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct ListedPost {
    #[serde(flatten)]
    pub post: Post,
    pub comment_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::user::{Email, Username};
    use time::macros::utc_datetime;

    fn user(name: &str) -> User {
        User {
            id: Id::random(),
            username: Username::new(name.to_owned()).unwrap(),
            email: Email::new(format!("{name}@example.com")).unwrap(),
            profile_image: None,
            created_at: utc_datetime!(2026-01-01 00:00),
        }
    }

    fn post(author: User) -> Post {
        Post {
            id: Id::random(),
            title: "Title".to_owned(),
            content: "<p>Body</p>".to_owned(),
            author,
            likes: Vec::new(),
            created_at: utc_datetime!(2026-01-02 00:00),
        }
    }

    #[test]
    fn ensure_author_accepts_the_author() {
        let author = user("alice");
        let author_id = author.id;
        assert!(post(author).ensure_author(author_id).is_ok());
    }

    #[test]
    fn ensure_author_rejects_other_users() {
        let stranger = user("bob").id;
        let err = post(user("alice")).ensure_author(stranger).unwrap_err();
        assert_eq!(err.user, stranger);
    }

    #[test]
    fn liked_by_checks_membership() {
        let liker = user("bob").id;
        let mut subject = post(user("alice"));
        assert!(!subject.liked_by(liker));
        subject.likes.push(liker);
        assert!(subject.liked_by(liker));
    }
}
