use sqlx::prelude::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;
use weblog_common::{
    model::{
        ModelValidationError,
        comment::Comment,
        post::{ListedPost, Post},
        user::{Email, User, Username},
    },
    password::PasswordHash,
};

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct UserRecord {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub profile_image: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct CredentialsRecord {
    pub user_id: Uuid,
    pub password_hash: String,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct FullPostRecord {
    pub post_id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub likes: Vec<Uuid>,
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub profile_image: Option<String>,
    pub user_created_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct ListedPostRecord {
    #[sqlx(flatten)]
    pub post: FullPostRecord,
    pub comment_count: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct CommentRecord {
    pub comment_id: Uuid,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub profile_image: Option<String>,
    pub user_created_at: OffsetDateTime,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.user_id.into(),
            username: Username::new(value.username)?,
            email: Email::new(value.email)?,
            profile_image: value.profile_image,
            created_at: value.created_at.to_utc(),
        })
    }
}

impl From<CredentialsRecord> for PasswordHash {
    fn from(value: CredentialsRecord) -> Self {
        PasswordHash::from_phc(value.password_hash)
    }
}

impl TryFrom<FullPostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: FullPostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_id.into(),
            title: value.title,
            content: value.content,
            author: User {
                id: value.user_id.into(),
                username: Username::new(value.username)?,
                email: Email::new(value.email)?,
                profile_image: value.profile_image,
                created_at: value.user_created_at.to_utc(),
            },
            likes: value.likes.into_iter().map(Into::into).collect(),
            created_at: value.created_at.to_utc(),
        })
    }
}

impl TryFrom<ListedPostRecord> for ListedPost {
    type Error = ModelValidationError;

    fn try_from(value: ListedPostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            post: value.post.try_into()?,
            comment_count: value.comment_count.cast_unsigned(),
        })
    }
}

impl TryFrom<CommentRecord> for Comment {
    type Error = ModelValidationError;

    fn try_from(value: CommentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.comment_id.into(),
            content: value.content,
            author: User {
                id: value.user_id.into(),
                username: Username::new(value.username)?,
                email: Email::new(value.email)?,
                profile_image: value.profile_image,
                created_at: value.user_created_at.to_utc(),
            },
            post: value.post_id.into(),
            created_at: value.created_at.to_utc(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn user_record() -> UserRecord {
        UserRecord {
            user_id: Uuid::new_v4(),
            username: "alice".to_owned(),
            email: "a@x.com".to_owned(),
            profile_image: None,
            created_at: datetime!(2026-01-01 00:00 UTC),
        }
    }

    #[test]
    fn valid_user_record_converts() {
        let record = user_record();
        let user = User::try_from(record.clone()).unwrap();

        assert_eq!(user.id.get(), record.user_id);
        assert_eq!(user.username.get(), "alice");
        assert_eq!(user.email.get(), "a@x.com");
    }

    #[test]
    fn invalid_stored_email_is_a_data_error() {
        let mut record = user_record();
        record.email = "not-an-email".to_owned();

        assert!(matches!(
            User::try_from(record),
            Err(ModelValidationError::Email(_))
        ));
    }

    #[test]
    fn post_record_carries_likes_and_author() {
        let liker = Uuid::new_v4();
        let record = FullPostRecord {
            post_id: Uuid::new_v4(),
            title: "Title".to_owned(),
            content: "<p>Body</p>".to_owned(),
            created_at: datetime!(2026-01-02 00:00 UTC),
            likes: vec![liker],
            user_id: Uuid::new_v4(),
            username: "alice".to_owned(),
            email: "a@x.com".to_owned(),
            profile_image: Some("/uploads/me.png".to_owned()),
            user_created_at: datetime!(2026-01-01 00:00 UTC),
        };

        let post = Post::try_from(record.clone()).unwrap();

        assert_eq!(post.author.id.get(), record.user_id);
        assert!(post.liked_by(liker.into()));
    }
}
