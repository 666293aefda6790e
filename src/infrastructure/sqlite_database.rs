use async_trait::async_trait;
use chrono::Utc;
use sqlx::{
    sqlite::{Sqlite, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow},
    QueryBuilder, Row,
};
use std::str::FromStr;
use tracing::{debug, info, instrument};

use crate::entities::{
    from_storage_time, to_storage_time, Comment, CommentView, EntityType, Follow, Group,
    NewComment, NewGroup, NewPost, Post, PostFilter, PostView, User, UserRef,
    COMMENT_MAX_LENGTH,
};
use crate::error::{AppError, AppResult};
use crate::infrastructure::database::DatabaseInterface;

const POST_VIEW_SELECT: &str = "SELECT p.id, p.text, p.pub_date, p.image, \
     u.id AS author_id, u.username AS author_username, \
     g.id AS group_id, g.title AS group_title, g.slug AS group_slug, \
     g.description AS group_description \
     FROM posts p \
     JOIN users u ON u.id = p.author_id \
     LEFT JOIN post_groups g ON g.id = p.group_id";

/// SQLite implementation of the entity store
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let in_memory = database_url.contains(":memory:");
        if !in_memory {
            ensure_parent_dir(database_url).await?;
        }

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| {
                AppError::ConfigurationError(format!("Invalid database URL {}: {}", database_url, e))
            })?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `:memory:` opens a fresh database, so keep exactly one alive.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(8)
        };

        let pool = pool_options.connect_with(options).await.map_err(|e| {
            AppError::DatabaseError(format!("Failed to connect to {}: {}", database_url, e))
        })?;

        let db = Self { pool };
        db.initialize().await?;
        info!("SQLite store ready at {}", database_url);
        Ok(db)
    }

    pub async fn new_in_memory() -> AppResult<Self> {
        Self::connect("sqlite::memory:").await
    }

    /// Create the blog tables if they do not exist yet
    pub async fn initialize(&self) -> AppResult<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                date_joined INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS post_groups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL,
                pub_date INTEGER NOT NULL,
                author_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                group_id INTEGER REFERENCES post_groups(id) ON DELETE SET NULL,
                image TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                author_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                text TEXT NOT NULL CHECK (length(text) <= 200),
                created INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS follows (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                author_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                CONSTRAINT unique_following UNIQUE (user_id, author_id),
                CHECK (user_id <> author_id)
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_posts_pub_date ON posts(pub_date DESC)",
            "CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author_id, pub_date DESC)",
            "CREATE INDEX IF NOT EXISTS idx_posts_group ON posts(group_id, pub_date DESC)",
            "CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id, created)",
            "CREATE INDEX IF NOT EXISTS idx_follows_author ON follows(author_id)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to initialize schema: {}", e)))?;
        }
        Ok(())
    }

    async fn delete_by_id(&self, entity: EntityType, id: i64) -> AppResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?", entity.table());
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        debug!("Deleted {} {} ({} rows)", entity, id, result.rows_affected());
        Ok(result.rows_affected() > 0)
    }

    async fn count_rows(&self, entity: EntityType) -> AppResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", entity.table());
        let count: i64 = sqlx::query_scalar::<_, i64>(&sql).fetch_one(&self.pool).await?;
        Ok(count as u64)
    }
}

async fn ensure_parent_dir(database_url: &str) -> AppResult<()> {
    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: PostFilter) {
    match filter {
        PostFilter::All => {}
        PostFilter::Group(group_id) => {
            qb.push(" WHERE p.group_id = ");
            qb.push_bind(group_id);
        }
        PostFilter::Author(author_id) => {
            qb.push(" WHERE p.author_id = ");
            qb.push_bind(author_id);
        }
        PostFilter::FollowedBy(user_id) => {
            qb.push(" WHERE p.author_id IN (SELECT author_id FROM follows WHERE user_id = ");
            qb.push_bind(user_id);
            qb.push(")");
        }
    }
}

fn user_from_row(row: &SqliteRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        date_joined: from_storage_time(row.get("date_joined")),
    }
}

fn group_from_row(row: &SqliteRow) -> Group {
    Group {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        description: row.get("description"),
    }
}

fn post_view_from_row(row: &SqliteRow) -> PostView {
    let group = row
        .get::<Option<i64>, _>("group_id")
        .map(|group_id| Group {
            id: group_id,
            title: row.get("group_title"),
            slug: row.get("group_slug"),
            description: row.get("group_description"),
        });

    PostView {
        id: row.get("id"),
        text: row.get("text"),
        pub_date: from_storage_time(row.get("pub_date")),
        author: UserRef {
            id: row.get("author_id"),
            username: row.get("author_username"),
        },
        group,
        image: row.get("image"),
    }
}

#[async_trait]
impl DatabaseInterface for SqliteDatabase {
    #[instrument(skip(self))]
    async fn create_user(&self, username: &str) -> AppResult<User> {
        if !User::is_valid_username(username) {
            return Err(AppError::Validation(format!("Invalid username '{}'", username)));
        }
        let now = Utc::now();
        let result = sqlx::query("INSERT INTO users (username, date_joined) VALUES (?, ?)")
            .bind(username)
            .bind(to_storage_time(now))
            .execute(&self.pool)
            .await?;

        let user = User {
            id: result.last_insert_rowid(),
            username: username.to_string(),
            date_joined: from_storage_time(to_storage_time(now)),
        };
        info!("Created user '{}' (ID: {})", user.username, user.id);
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let row = sqlx::query("SELECT id, username, date_joined FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, id: i64) -> AppResult<bool> {
        self.delete_by_id(EntityType::User, id).await
    }

    #[instrument(skip(self))]
    async fn create_group(&self, group: NewGroup) -> AppResult<Group> {
        group.validate()?;
        let result = sqlx::query(
            "INSERT INTO post_groups (title, slug, description) VALUES (?, ?, ?)",
        )
        .bind(&group.title)
        .bind(&group.slug)
        .bind(&group.description)
        .execute(&self.pool)
        .await?;

        let created = Group {
            id: result.last_insert_rowid(),
            title: group.title,
            slug: group.slug,
            description: group.description,
        };
        info!("Created group '{}' (ID: {})", created.slug, created.id);
        Ok(created)
    }

    async fn get_group(&self, id: i64) -> AppResult<Option<Group>> {
        let row = sqlx::query("SELECT id, title, slug, description FROM post_groups WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(group_from_row))
    }

    async fn get_group_by_slug(&self, slug: &str) -> AppResult<Option<Group>> {
        let row =
            sqlx::query("SELECT id, title, slug, description FROM post_groups WHERE slug = ?")
                .bind(slug)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.as_ref().map(group_from_row))
    }

    async fn list_groups(&self) -> AppResult<Vec<Group>> {
        let rows = sqlx::query("SELECT id, title, slug, description FROM post_groups ORDER BY title")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(group_from_row).collect())
    }

    #[instrument(skip(self))]
    async fn delete_group(&self, id: i64) -> AppResult<bool> {
        self.delete_by_id(EntityType::Group, id).await
    }

    #[instrument(skip(self, post), fields(author_id = post.author_id))]
    async fn create_post(&self, post: NewPost) -> AppResult<Post> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO posts (text, pub_date, author_id, group_id, image) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&post.text)
        .bind(to_storage_time(now))
        .bind(post.author_id)
        .bind(post.group_id)
        .bind(&post.image)
        .execute(&self.pool)
        .await?;

        let created = Post {
            id: result.last_insert_rowid(),
            text: post.text,
            pub_date: from_storage_time(to_storage_time(now)),
            author_id: post.author_id,
            group_id: post.group_id,
            image: post.image,
        };
        info!("Created post {} by user {}", created.id, created.author_id);
        Ok(created)
    }

    async fn get_post(&self, id: i64) -> AppResult<Option<PostView>> {
        let mut qb = QueryBuilder::<Sqlite>::new(POST_VIEW_SELECT);
        qb.push(" WHERE p.id = ");
        qb.push_bind(id);
        let row = qb.build().fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(post_view_from_row))
    }

    #[instrument(skip(self, text))]
    async fn update_post(&self, id: i64, text: &str, group_id: Option<i64>) -> AppResult<()> {
        let result = sqlx::query("UPDATE posts SET text = ?, group_id = ? WHERE id = ?")
            .bind(text)
            .bind(group_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Post {} not found", id)));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_post(&self, id: i64) -> AppResult<bool> {
        self.delete_by_id(EntityType::Post, id).await
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
        limit: u32,
        offset: u32,
    ) -> AppResult<Vec<PostView>> {
        let mut qb = QueryBuilder::<Sqlite>::new(POST_VIEW_SELECT);
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY p.pub_date DESC, p.id DESC LIMIT ");
        qb.push_bind(limit as i64);
        qb.push(" OFFSET ");
        qb.push_bind(offset as i64);

        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(post_view_from_row).collect())
    }

    async fn count_posts(&self, filter: PostFilter) -> AppResult<u64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM posts p");
        push_filter(&mut qb, filter);
        let count: i64 = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(count as u64)
    }

    #[instrument(skip(self, comment), fields(post_id = comment.post_id))]
    async fn create_comment(&self, comment: NewComment) -> AppResult<Comment> {
        if comment.text.chars().count() > COMMENT_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "Comment must be at most {} characters",
                COMMENT_MAX_LENGTH
            )));
        }
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO comments (post_id, author_id, text, created) VALUES (?, ?, ?, ?)",
        )
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(&comment.text)
        .bind(to_storage_time(now))
        .execute(&self.pool)
        .await?;

        Ok(Comment {
            id: result.last_insert_rowid(),
            post_id: comment.post_id,
            author_id: comment.author_id,
            text: comment.text,
            created: from_storage_time(to_storage_time(now)),
        })
    }

    async fn list_comments(&self, post_id: i64) -> AppResult<Vec<CommentView>> {
        let rows = sqlx::query(
            "SELECT c.id, c.post_id, c.text, c.created, u.id AS author_id, u.username AS author_username \
             FROM comments c JOIN users u ON u.id = c.author_id \
             WHERE c.post_id = ? ORDER BY c.created, c.id",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| CommentView {
                id: row.get("id"),
                post_id: row.get("post_id"),
                author: UserRef {
                    id: row.get("author_id"),
                    username: row.get("author_username"),
                },
                text: row.get("text"),
                created: from_storage_time(row.get("created")),
            })
            .collect())
    }

    async fn count_comments(&self) -> AppResult<u64> {
        self.count_rows(EntityType::Comment).await
    }

    #[instrument(skip(self))]
    async fn create_follow(&self, user_id: i64, author_id: i64) -> AppResult<Follow> {
        let result = sqlx::query("INSERT INTO follows (user_id, author_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(author_id)
            .execute(&self.pool)
            .await?;

        Ok(Follow {
            id: result.last_insert_rowid(),
            user_id,
            author_id,
        })
    }

    #[instrument(skip(self))]
    async fn delete_follow(&self, user_id: i64, author_id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE user_id = ? AND author_id = ?")
            .bind(user_id)
            .bind(author_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn follow_exists(&self, user_id: i64, author_id: i64) -> AppResult<bool> {
        let row = sqlx::query("SELECT 1 FROM follows WHERE user_id = ? AND author_id = ?")
            .bind(user_id)
            .bind(author_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn count_follows(&self) -> AppResult<u64> {
        self.count_rows(EntityType::Follow).await
    }
}
