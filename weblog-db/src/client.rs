use crate::record::{CommentRecord, CredentialsRecord, FullPostRecord, ListedPostRecord, UserRecord};
use sqlx::{PgPool, postgres::PgPoolOptions};
use thiserror::Error;
use weblog_common::{
    model::{
        Id, ModelValidationError,
        comment::{Comment, CommentMarker, CreateComment},
        post::{CreatePost, ListedPost, Post, PostMarker, UpdatePost},
        user::{CreateUser, Email, UpdateUser, User, UserMarker},
    },
    pagination::Pagination,
    password::PasswordHash,
};

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("Unique constraint violated: {0}")]
    Duplicate(String),
    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(value: sqlx::Error) -> Self {
        match &value {
            sqlx::Error::Database(db_error) if db_error.is_unique_violation() => Self::Duplicate(
                db_error
                    .constraint()
                    .unwrap_or("unknown constraint")
                    .to_owned(),
            ),
            _ => Self::Sqlx(value),
        }
    }
}

const USER_SELECT: &str = "
    SELECT
        users.user_id,
        users.username,
        users.email,
        users.profile_image,
        users.created_at
    FROM
        users
";

const POST_SELECT: &str = "
    SELECT
        posts.post_id,
        posts.title,
        posts.content,
        posts.created_at,
        COALESCE(likes.user_ids, ARRAY[]::UUID[]) AS likes,
        users.user_id,
        users.username,
        users.email,
        users.profile_image,
        users.created_at AS user_created_at
    FROM
        posts
        JOIN users ON users.user_id = posts.author_id
        LEFT JOIN LATERAL (
            SELECT array_agg(post_likes.user_id) AS user_ids
            FROM post_likes
            WHERE post_likes.post_id = posts.post_id
        ) likes ON TRUE
";

const LISTED_POST_SELECT: &str = "
    SELECT
        posts.post_id,
        posts.title,
        posts.content,
        posts.created_at,
        COALESCE(likes.user_ids, ARRAY[]::UUID[]) AS likes,
        (
            SELECT count(*)
            FROM comments
            WHERE comments.post_id = posts.post_id
        ) AS comment_count,
        users.user_id,
        users.username,
        users.email,
        users.profile_image,
        users.created_at AS user_created_at
    FROM
        posts
        JOIN users ON users.user_id = posts.author_id
        LEFT JOIN LATERAL (
            SELECT array_agg(post_likes.user_id) AS user_ids
            FROM post_likes
            WHERE post_likes.post_id = posts.post_id
        ) likes ON TRUE
";

const COMMENT_SELECT: &str = "
    SELECT
        comments.comment_id,
        comments.content,
        comments.created_at,
        comments.post_id,
        users.user_id,
        users.username,
        users.email,
        users.profile_image,
        users.created_at AS user_created_at
    FROM
        comments
        JOIN users ON users.user_id = comments.author_id
";

pub const LATEST_COMMENTS_LIMIT: i64 = 5;

#[derive(Debug)]
pub struct DbClient {
    pool: PgPool,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self::new(pool))
    }

    pub async fn create_user(&self, user: &CreateUser) -> Result<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "
            INSERT INTO users (user_id, username, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING user_id, username, email, profile_image, created_at
            ",
        )
        .bind(Id::<UserMarker>::random().get())
        .bind(user.username.get())
        .bind(user.email.get())
        .bind(user.password_hash.as_phc())
        .fetch_one(&self.pool)
        .await?;

        Ok(record.try_into()?)
    }

    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "{USER_SELECT} WHERE users.user_id = $1"
        ))
        .bind(user_id.get())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    /// Login lookup: id and stored password hash for an email, if the
    /// account exists.
    pub async fn fetch_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(Id<UserMarker>, PasswordHash)>> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, password_hash FROM users WHERE email = $1",
        )
        .bind(email.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(|record| (record.user_id.into(), record.into())))
    }

    pub async fn update_user(
        &self,
        user_id: Id<UserMarker>,
        update: &UpdateUser,
    ) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "
            UPDATE users
            SET
                username = COALESCE($2, username),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash)
            WHERE users.user_id = $1
            RETURNING user_id, username, email, profile_image, created_at
            ",
        )
        .bind(user_id.get())
        .bind(update.username.as_ref().map(|username| username.get()))
        .bind(update.email.as_ref().map(|email| email.get()))
        .bind(update.password_hash.as_ref().map(|hash| hash.as_phc()))
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn set_profile_image(
        &self,
        user_id: Id<UserMarker>,
        profile_image: &str,
    ) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "
            UPDATE users
            SET profile_image = $2
            WHERE users.user_id = $1
            RETURNING user_id, username, email, profile_image, created_at
            ",
        )
        .bind(user_id.get())
        .bind(profile_image)
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    /// Account deletion cascade: likes by the user, likes and comments
    /// on the user's posts, comments by the user, the user's posts, and
    /// finally the user record, all in one transaction.
    pub async fn delete_user_cascade(&self, user_id: Id<UserMarker>) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM post_likes WHERE user_id = $1")
            .bind(user_id.get())
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "
            DELETE FROM post_likes
            WHERE post_id IN (SELECT post_id FROM posts WHERE author_id = $1)
            ",
        )
        .bind(user_id.get())
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "
            DELETE FROM comments
            WHERE author_id = $1
                OR post_id IN (SELECT post_id FROM posts WHERE author_id = $1)
            ",
        )
        .bind(user_id.get())
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM posts WHERE author_id = $1")
            .bind(user_id.get())
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id.get())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(deleted.rows_affected() == 1)
    }

    pub async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        let post_id: Id<PostMarker> = Id::random();

        sqlx::query(
            "
            INSERT INTO posts (post_id, author_id, title, content)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(post_id.get())
        .bind(post.author.get())
        .bind(&post.title)
        .bind(&post.content)
        .execute(&self.pool)
        .await?;

        self.fetch_post(post_id)
            .await?
            .ok_or(DbError::Sqlx(sqlx::Error::RowNotFound))
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = sqlx::query_as::<_, FullPostRecord>(&format!(
            "{POST_SELECT} WHERE posts.post_id = $1"
        ))
        .bind(post_id.get())
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    /// One page of the public listing, newest first, each post
    /// annotated with its comment count, plus the total post count for
    /// page arithmetic.
    pub async fn list_posts(&self, pagination: Pagination) -> Result<(Vec<ListedPost>, u64)> {
        let total = sqlx::query_scalar::<_, i64>("SELECT count(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;

        let records = sqlx::query_as::<_, ListedPostRecord>(&format!(
            "{LISTED_POST_SELECT} ORDER BY posts.created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(pagination.size()))
        .bind(pagination.offset().cast_signed())
        .fetch_all(&self.pool)
        .await?;

        let posts = records
            .into_iter()
            .map(ListedPost::try_from)
            .collect::<Result<_, _>>()?;

        Ok((posts, total.cast_unsigned()))
    }

    pub async fn posts_by_author(&self, author: Id<UserMarker>) -> Result<Vec<Post>> {
        let records = sqlx::query_as::<_, FullPostRecord>(&format!(
            "{POST_SELECT} WHERE posts.author_id = $1 ORDER BY posts.created_at DESC"
        ))
        .bind(author.get())
        .fetch_all(&self.pool)
        .await?;

        let posts = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?;

        Ok(posts)
    }

    pub async fn posts_liked_by(&self, user_id: Id<UserMarker>) -> Result<Vec<Post>> {
        let records = sqlx::query_as::<_, FullPostRecord>(&format!(
            "
            {POST_SELECT}
            WHERE EXISTS (
                SELECT 1
                FROM post_likes
                WHERE post_likes.post_id = posts.post_id AND post_likes.user_id = $1
            )
            ORDER BY posts.created_at DESC
            "
        ))
        .bind(user_id.get())
        .fetch_all(&self.pool)
        .await?;

        let posts = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?;

        Ok(posts)
    }

    pub async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        update: &UpdatePost,
    ) -> Result<Option<Post>> {
        let updated = sqlx::query(
            "
            UPDATE posts
            SET
                title = COALESCE($2, title),
                content = COALESCE($3, content)
            WHERE posts.post_id = $1
            ",
        )
        .bind(post_id.get())
        .bind(update.title.as_deref())
        .bind(update.content.as_deref())
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        self.fetch_post(post_id).await
    }

    /// Post deletion cascade: likes, comments on the post, then the
    /// post record, all in one transaction. File cleanup for embedded
    /// uploads happens at the caller, before this runs.
    pub async fn delete_post_cascade(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM post_likes WHERE post_id = $1")
            .bind(post_id.get())
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM comments WHERE post_id = $1")
            .bind(post_id.get())
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM posts WHERE post_id = $1")
            .bind(post_id.get())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(deleted.rows_affected() == 1)
    }

    /// Like toggle as a pair of conditional single-row statements, so
    /// concurrent toggles by different users can never overwrite each
    /// other. Returns whether the post is liked afterwards.
    pub async fn toggle_like(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<bool> {
        let inserted = sqlx::query(
            "
            INSERT INTO post_likes (post_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(post_id.get())
        .bind(user_id.get())
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 1 {
            return Ok(true);
        }

        sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id.get())
            .bind(user_id.get())
            .execute(&self.pool)
            .await?;

        Ok(false)
    }

    pub async fn create_comment(&self, comment: &CreateComment) -> Result<Comment> {
        let comment_id: Id<CommentMarker> = Id::random();

        sqlx::query(
            "
            INSERT INTO comments (comment_id, post_id, author_id, content)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(comment_id.get())
        .bind(comment.post.get())
        .bind(comment.author.get())
        .bind(&comment.content)
        .execute(&self.pool)
        .await?;

        self.fetch_comment(comment_id)
            .await?
            .ok_or(DbError::Sqlx(sqlx::Error::RowNotFound))
    }

    pub async fn fetch_comment(&self, comment_id: Id<CommentMarker>) -> Result<Option<Comment>> {
        let record = sqlx::query_as::<_, CommentRecord>(&format!(
            "{COMMENT_SELECT} WHERE comments.comment_id = $1"
        ))
        .bind(comment_id.get())
        .fetch_optional(&self.pool)
        .await?;

        let comment = record.map(Comment::try_from).transpose()?;
        Ok(comment)
    }

    /// The newest comments on a post, capped at [`LATEST_COMMENTS_LIMIT`].
    pub async fn latest_comments(&self, post_id: Id<PostMarker>) -> Result<Vec<Comment>> {
        let records = sqlx::query_as::<_, CommentRecord>(&format!(
            "{COMMENT_SELECT} WHERE comments.post_id = $1 ORDER BY comments.created_at DESC LIMIT $2"
        ))
        .bind(post_id.get())
        .bind(LATEST_COMMENTS_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        let comments = records
            .into_iter()
            .map(Comment::try_from)
            .collect::<Result<_, _>>()?;

        Ok(comments)
    }

    pub async fn comments_by_author(&self, author: Id<UserMarker>) -> Result<Vec<Comment>> {
        let records = sqlx::query_as::<_, CommentRecord>(&format!(
            "{COMMENT_SELECT} WHERE comments.author_id = $1 ORDER BY comments.created_at DESC"
        ))
        .bind(author.get())
        .fetch_all(&self.pool)
        .await?;

        let comments = records
            .into_iter()
            .map(Comment::try_from)
            .collect::<Result<_, _>>()?;

        Ok(comments)
    }

    pub async fn update_comment(
        &self,
        comment_id: Id<CommentMarker>,
        content: Option<&str>,
    ) -> Result<Option<Comment>> {
        let updated = sqlx::query(
            "
            UPDATE comments
            SET content = COALESCE($2, content)
            WHERE comments.comment_id = $1
            ",
        )
        .bind(comment_id.get())
        .bind(content)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        self.fetch_comment(comment_id).await
    }

    pub async fn delete_comment(&self, comment_id: Id<CommentMarker>) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM comments WHERE comment_id = $1")
            .bind(comment_id.get())
            .execute(&self.pool)
            .await?;

        Ok(deleted.rows_affected() == 1)
    }
}
