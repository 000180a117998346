//! SQLite-backed persistence for the orchestration core.
//!
//! One connection, schema initialized on open. Rows carry their full JSON
//! alongside the indexed columns, so queries stay cheap and the domain types
//! stay the single source of shape.

use crate::domain::{
    AgentLogEntry, CommentAction, CommentLog, ContentItem, MetricsReport, PostStatus,
    ProductCampaign, Role, User,
};
use crate::error::{CadenceError, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Store shared across scheduler jobs.
///
/// Jobs run on separate tasks; the mutex keeps "read aggregate, then
/// conditionally write" sequences short and serialized.
pub type SharedStore = Arc<Mutex<Store>>;

/// SQLite store for posts, campaigns, comment log, activity, metrics, users.
pub struct Store {
    db: Connection,
}

impl Store {
    /// Open or create a store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Connection::open(path)?;
        Self::init_schema(&db)?;
        Ok(Self { db })
    }

    /// In-memory store for tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory()?;
        Self::init_schema(&db)?;
        Ok(Self { db })
    }

    /// Wrap in the shared handle used by scheduler jobs.
    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    fn init_schema(db: &Connection) -> Result<()> {
        db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                scheduled_for INTEGER NOT NULL,
                published_at INTEGER,
                platform_post_id TEXT,
                created_at INTEGER NOT NULL,
                json_data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_posts_status ON posts(status);
            CREATE INDEX IF NOT EXISTS idx_posts_scheduled ON posts(scheduled_for);
            CREATE INDEX IF NOT EXISTS idx_posts_published ON posts(published_at);
            CREATE INDEX IF NOT EXISTS idx_posts_platform ON posts(platform_post_id);

            CREATE TABLE IF NOT EXISTS campaigns (
                id TEXT PRIMARY KEY,
                post_id TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                json_data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_campaigns_post ON campaigns(post_id);

            CREATE TABLE IF NOT EXISTS comment_log (
                comment_id TEXT PRIMARY KEY,
                action TEXT NOT NULL,
                reply TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS activity (
                id TEXT PRIMARY KEY,
                from_agent TEXT NOT NULL,
                kind TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                json_data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_activity_created ON activity(created_at);

            CREATE TABLE IF NOT EXISTS metrics (
                id TEXT PRIMARY KEY,
                created_at INTEGER NOT NULL,
                json_data TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                role TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    //=== Posts ===

    /// Insert a new content item.
    pub fn insert_post(&self, item: &ContentItem) -> Result<()> {
        let json = serde_json::to_string(item)?;
        self.db.execute(
            "INSERT INTO posts (id, status, scheduled_for, published_at, platform_post_id,
                                created_at, json_data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                item.id,
                item.status.as_str(),
                item.scheduled_for,
                item.published_at,
                item.platform_post_id,
                item.created_at,
                json,
            ],
        )?;
        Ok(())
    }

    /// Persist changed fields of an existing item.
    pub fn update_post(&self, item: &ContentItem) -> Result<()> {
        let json = serde_json::to_string(item)?;
        let changed = self.db.execute(
            "UPDATE posts SET status = ?2, scheduled_for = ?3, published_at = ?4,
                              platform_post_id = ?5, json_data = ?6
             WHERE id = ?1",
            params![
                item.id,
                item.status.as_str(),
                item.scheduled_for,
                item.published_at,
                item.platform_post_id,
                json,
            ],
        )?;
        if changed == 0 {
            return Err(CadenceError::PostNotFound(item.id.clone()));
        }
        Ok(())
    }

    /// Get a content item by id.
    pub fn get_post(&self, id: &str) -> Result<Option<ContentItem>> {
        let json: Option<String> = self
            .db
            .query_row("SELECT json_data FROM posts WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// The item the platform assigned the given id to at publish time.
    pub fn post_by_platform_id(&self, platform_id: &str) -> Result<Option<ContentItem>> {
        let json: Option<String> = self
            .db
            .query_row(
                "SELECT json_data FROM posts WHERE platform_post_id = ?1 LIMIT 1",
                [platform_id],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// List items in a given status, oldest schedule first.
    pub fn list_posts_by_status(&self, status: PostStatus) -> Result<Vec<ContentItem>> {
        let mut stmt = self.db.prepare(
            "SELECT json_data FROM posts WHERE status = ?1 ORDER BY scheduled_for, created_at",
        )?;
        let rows = stmt.query_map([status.as_str()], |row| row.get::<_, String>(0))?;

        let mut items = Vec::new();
        for row in rows {
            items.push(serde_json::from_str(&row?)?);
        }
        Ok(items)
    }

    /// The single approved item with the earliest `scheduled_for <= now`.
    pub fn next_due_approved(&self, now_ms: i64) -> Result<Option<ContentItem>> {
        let json: Option<String> = self
            .db
            .query_row(
                "SELECT json_data FROM posts
                 WHERE status = 'approved' AND scheduled_for <= ?1
                 ORDER BY scheduled_for LIMIT 1",
                [now_ms],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Count items published at or after the given timestamp.
    pub fn count_published_since(&self, since_ms: i64) -> Result<usize> {
        let count: i64 = self.db.query_row(
            "SELECT COUNT(*) FROM posts WHERE status = 'published' AND published_at >= ?1",
            [since_ms],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// `published_at` of the most recently published item.
    pub fn latest_published_at(&self) -> Result<Option<i64>> {
        let latest: Option<i64> = self.db.query_row(
            "SELECT MAX(published_at) FROM posts WHERE status = 'published'",
            [],
            |row| row.get(0),
        )?;
        Ok(latest)
    }

    /// Topics of the most recently published items, newest first.
    pub fn recent_published_topics(&self, limit: usize) -> Result<Vec<String>> {
        let mut stmt = self.db.prepare(
            "SELECT json_data FROM posts WHERE status = 'published'
             ORDER BY published_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit as i64], |row| row.get::<_, String>(0))?;

        let mut topics = Vec::new();
        for row in rows {
            let item: ContentItem = serde_json::from_str(&row?)?;
            topics.push(item.topic);
        }
        Ok(topics)
    }

    //=== Campaigns ===

    pub fn insert_campaign(&self, campaign: &ProductCampaign) -> Result<()> {
        let json = serde_json::to_string(campaign)?;
        self.db.execute(
            "INSERT INTO campaigns (id, post_id, created_at, json_data) VALUES (?1, ?2, ?3, ?4)",
            params![campaign.id, campaign.post_id, campaign.created_at, json],
        )?;
        Ok(())
    }

    /// Campaign linked to a post id, if any.
    pub fn campaign_for_post(&self, post_id: &str) -> Result<Option<ProductCampaign>> {
        let json: Option<String> = self
            .db
            .query_row(
                "SELECT json_data FROM campaigns WHERE post_id = ?1 LIMIT 1",
                [post_id],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn list_campaigns(&self) -> Result<Vec<ProductCampaign>> {
        let mut stmt = self
            .db
            .prepare("SELECT json_data FROM campaigns ORDER BY created_at")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut campaigns = Vec::new();
        for row in rows {
            campaigns.push(serde_json::from_str(&row?)?);
        }
        Ok(campaigns)
    }

    //=== Comment log ===

    /// Whether a comment has already been handled.
    pub fn has_comment(&self, comment_id: &str) -> Result<bool> {
        let count: i64 = self.db.query_row(
            "SELECT COUNT(*) FROM comment_log WHERE comment_id = ?1",
            [comment_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Record the handling of a comment.
    ///
    /// The comment id is the idempotency key; a second insert for the same
    /// id is ignored rather than erroring, so replays are harmless.
    pub fn log_comment(&self, entry: &CommentLog) -> Result<bool> {
        let changed = self.db.execute(
            "INSERT OR IGNORE INTO comment_log (comment_id, action, reply, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.comment_id,
                entry.action.as_str(),
                entry.reply,
                entry.created_at,
            ],
        )?;
        Ok(changed > 0)
    }

    /// Count handled comments with the given action.
    pub fn count_comments_by_action(&self, action: CommentAction) -> Result<usize> {
        let count: i64 = self.db.query_row(
            "SELECT COUNT(*) FROM comment_log WHERE action = ?1",
            [action.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    //=== Activity ===

    pub fn append_activity(&self, entry: &AgentLogEntry) -> Result<()> {
        let json = serde_json::to_string(entry)?;
        self.db.execute(
            "INSERT INTO activity (id, from_agent, kind, created_at, json_data)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![entry.id, entry.from, entry.kind.as_str(), entry.created_at, json],
        )?;
        Ok(())
    }

    /// Most recent activity entries, newest first.
    pub fn recent_activity(&self, limit: usize) -> Result<Vec<AgentLogEntry>> {
        let mut stmt = self
            .db
            .prepare("SELECT json_data FROM activity ORDER BY created_at DESC, id DESC LIMIT ?1")?;
        let rows = stmt.query_map([limit as i64], |row| row.get::<_, String>(0))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(serde_json::from_str(&row?)?);
        }
        Ok(entries)
    }

    //=== Metrics ===

    pub fn insert_metrics(&self, report: &MetricsReport) -> Result<()> {
        let json = serde_json::to_string(report)?;
        self.db.execute(
            "INSERT INTO metrics (id, created_at, json_data) VALUES (?1, ?2, ?3)",
            params![report.id, report.created_at, json],
        )?;
        Ok(())
    }

    /// The most recent metrics report, if any.
    pub fn latest_metrics(&self) -> Result<Option<MetricsReport>> {
        let json: Option<String> = self
            .db
            .query_row(
                "SELECT json_data FROM metrics ORDER BY created_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    //=== Users ===

    pub fn upsert_user(&self, user: &User) -> Result<()> {
        self.db.execute(
            "INSERT OR REPLACE INTO users (id, name, role) VALUES (?1, ?2, ?3)",
            params![user.id, user.name, user.role.as_str()],
        )?;
        Ok(())
    }

    /// All users with the admin role (notification fan-out targets).
    pub fn admins(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .db
            .prepare("SELECT id, name, role FROM users WHERE role = 'admin' ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut users = Vec::new();
        for row in rows {
            let (id, name, role) = row?;
            let role = Role::parse(&role)
                .ok_or_else(|| CadenceError::Validation(format!("unknown role: {}", role)))?;
            users.push(User { id, name, role });
        }
        Ok(users)
    }
}
