use crate::models::{Badge, Category, Post, Topic, ARCHETYPE_PRIVATE_MESSAGE, ARCHETYPE_REGULAR};
use chrono::Utc;
use rusqlite::{params, Connection};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("Item not found in database: {0}")]
    NotFound(String),
}

// --- Categories ---

pub fn create_category(
    conn: &Connection,
    name: &str,
    min_trust_to_post: i64,
) -> Result<i64, DbError> {
    conn.execute(
        "INSERT INTO categories (name, min_trust_to_post) VALUES (?1, ?2)",
        params![name, min_trust_to_post],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn read_category(conn: &Connection, category_id: i64) -> Option<Category> {
    conn.query_row(
        "SELECT id, name, min_trust_to_post, redirect_topic_enabled, redirect_topic_message,
                redirect_reply_enabled, redirect_reply_message
         FROM categories WHERE id = ?1",
        [category_id],
        |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                min_trust_to_post: row.get(2)?,
                redirect_topic_enabled: row.get(3)?,
                redirect_topic_message: row.get(4)?,
                redirect_reply_enabled: row.get(5)?,
                redirect_reply_message: row.get(6)?,
            })
        },
    )
    .ok()
}

pub fn update_category_redirect(
    conn: &Connection,
    category_id: i64,
    topic_enabled: bool,
    topic_message: Option<&str>,
    reply_enabled: bool,
    reply_message: Option<&str>,
) -> Result<usize, DbError> {
    let updated = conn.execute(
        "UPDATE categories SET redirect_topic_enabled = ?1, redirect_topic_message = ?2,
                redirect_reply_enabled = ?3, redirect_reply_message = ?4
         WHERE id = ?5",
        params![topic_enabled, topic_message, reply_enabled, reply_message, category_id],
    )?;
    Ok(updated)
}

// --- Topics ---

fn map_topic_row(row: &rusqlite::Row) -> rusqlite::Result<Topic> {
    Ok(Topic {
        id: row.get(0)?,
        title: row.get(1)?,
        user_id: row.get(2)?,
        category_id: row.get(3)?,
        archetype: row.get(4)?,
        post_approval: row.get(5)?,
        accepted_answer_post_id: row.get(6)?,
        created_at: row.get(7)?,
    })
}

const TOPIC_COLUMNS: &str =
    "id, title, user_id, category_id, archetype, post_approval, accepted_answer_post_id, created_at";

pub fn read_topic(conn: &Connection, topic_id: i64) -> Option<Topic> {
    conn.query_row(
        &format!("SELECT {} FROM topics WHERE id = ?1", TOPIC_COLUMNS),
        [topic_id],
        map_topic_row,
    )
    .ok()
}

/// Creates a topic together with its first post, in one transaction.
pub fn create_topic_with_first_post(
    conn: &Connection,
    user_id: i64,
    category_id: i64,
    title: &str,
    raw: &str,
) -> Result<(Topic, Post), DbError> {
    let now = Utc::now().to_rfc3339();
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO topics (title, user_id, category_id, archetype, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![title, user_id, category_id, ARCHETYPE_REGULAR, now],
    )?;
    let topic_id = tx.last_insert_rowid();
    tx.execute(
        "INSERT INTO posts (topic_id, user_id, post_number, raw, created_at)
         VALUES (?1, ?2, 1, ?3, ?4)",
        params![topic_id, user_id, raw, now],
    )?;
    let post_id = tx.last_insert_rowid();
    tx.commit()?;

    let topic = read_topic(conn, topic_id)
        .ok_or_else(|| DbError::NotFound(format!("topic {}", topic_id)))?;
    let post =
        read_post(conn, post_id).ok_or_else(|| DbError::NotFound(format!("post {}", post_id)))?;
    Ok((topic, post))
}

pub fn update_topic_title(conn: &Connection, topic_id: i64, title: &str) -> Result<(), DbError> {
    conn.execute(
        "UPDATE topics SET title = ?1 WHERE id = ?2",
        params![title, topic_id],
    )?;
    Ok(())
}

/// Converts a public topic into a private message: swaps the archetype,
/// detaches the category and keeps the author as an allowed participant.
pub fn convert_topic_to_private_message(conn: &Connection, topic_id: i64) -> Result<(), DbError> {
    let author_id: i64 = conn.query_row(
        "SELECT user_id FROM topics WHERE id = ?1",
        [topic_id],
        |row| row.get(0),
    )?;
    conn.execute(
        "UPDATE topics SET archetype = ?1, category_id = NULL WHERE id = ?2",
        params![ARCHETYPE_PRIVATE_MESSAGE, topic_id],
    )?;
    add_topic_allowed_user(conn, topic_id, author_id)?;
    Ok(())
}

/// Marks a topic as already vetted by the approval workflow.
pub fn mark_topic_post_approval(conn: &Connection, topic_id: i64) -> Result<(), DbError> {
    conn.execute(
        "UPDATE topics SET post_approval = 1 WHERE id = ?1",
        [topic_id],
    )?;
    Ok(())
}

/// One-time claim of a moderation thread. Returns false when the thread was
/// already claimed, so a second concurrent approval cannot publish twice.
pub fn claim_for_approval(conn: &Connection, topic_id: i64) -> Result<bool, DbError> {
    let updated = conn.execute(
        "UPDATE topics SET post_approval = 1 WHERE id = ?1 AND post_approval = 0",
        [topic_id],
    )?;
    Ok(updated == 1)
}

pub fn set_accepted_answer(
    conn: &Connection,
    topic_id: i64,
    post_id: i64,
) -> Result<(), DbError> {
    conn.execute(
        "UPDATE topics SET accepted_answer_post_id = ?1 WHERE id = ?2",
        params![post_id, topic_id],
    )?;
    Ok(())
}

// --- Posts ---

fn map_post_row(row: &rusqlite::Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        topic_id: row.get(1)?,
        user_id: row.get(2)?,
        post_number: row.get(3)?,
        raw: row.get(4)?,
        wiki: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const POST_COLUMNS: &str = "id, topic_id, user_id, post_number, raw, wiki, created_at";

pub fn read_post(conn: &Connection, post_id: i64) -> Option<Post> {
    conn.query_row(
        &format!("SELECT {} FROM posts WHERE id = ?1", POST_COLUMNS),
        [post_id],
        map_post_row,
    )
    .ok()
}

pub fn first_post(conn: &Connection, topic_id: i64) -> Option<Post> {
    conn.query_row(
        &format!(
            "SELECT {} FROM posts WHERE topic_id = ?1 AND post_number = 1",
            POST_COLUMNS
        ),
        [topic_id],
        map_post_row,
    )
    .ok()
}

/// Appends a post to an existing topic with the next post number.
pub fn create_post(
    conn: &Connection,
    topic_id: i64,
    user_id: i64,
    raw: &str,
    wiki: bool,
) -> Result<Post, DbError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO posts (topic_id, user_id, post_number, raw, wiki, created_at)
         VALUES (?1, ?2,
                 (SELECT COALESCE(MAX(post_number), 0) + 1 FROM posts WHERE topic_id = ?1),
                 ?3, ?4, ?5)",
        params![topic_id, user_id, raw, wiki, now],
    )?;
    let post_id = conn.last_insert_rowid();
    read_post(conn, post_id).ok_or_else(|| DbError::NotFound(format!("post {}", post_id)))
}

pub fn set_post_wiki(conn: &Connection, post_id: i64, wiki: bool) -> Result<(), DbError> {
    conn.execute(
        "UPDATE posts SET wiki = ?1 WHERE id = ?2",
        params![wiki, post_id],
    )?;
    Ok(())
}

pub fn posts_in_topic(conn: &Connection, topic_id: i64) -> Result<Vec<Post>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM posts WHERE topic_id = ?1 ORDER BY post_number",
        POST_COLUMNS
    ))?;
    let rows = stmt.query_map([topic_id], map_post_row)?;
    let mut posts = Vec::new();
    for post in rows {
        posts.push(post?);
    }
    Ok(posts)
}

// --- Tags ---

pub fn add_topic_tags(conn: &Connection, topic_id: i64, tags: &[String]) -> Result<(), DbError> {
    for tag in tags {
        conn.execute(
            "INSERT OR IGNORE INTO topic_tags (topic_id, tag) VALUES (?1, ?2)",
            params![topic_id, tag],
        )?;
    }
    Ok(())
}

pub fn topic_tags(conn: &Connection, topic_id: i64) -> Result<Vec<String>, DbError> {
    let mut stmt = conn.prepare("SELECT tag FROM topic_tags WHERE topic_id = ?1 ORDER BY tag")?;
    let rows = stmt.query_map([topic_id], |row| row.get(0))?;
    let mut tags = Vec::new();
    for tag in rows {
        tags.push(tag?);
    }
    Ok(tags)
}

// --- Private-message participants ---

pub fn add_topic_allowed_user(
    conn: &Connection,
    topic_id: i64,
    user_id: i64,
) -> Result<(), DbError> {
    conn.execute(
        "INSERT OR IGNORE INTO topic_allowed_users (topic_id, user_id) VALUES (?1, ?2)",
        params![topic_id, user_id],
    )?;
    Ok(())
}

pub fn add_topic_allowed_group(
    conn: &Connection,
    topic_id: i64,
    group_id: i64,
) -> Result<(), DbError> {
    conn.execute(
        "INSERT OR IGNORE INTO topic_allowed_groups (topic_id, group_id) VALUES (?1, ?2)",
        params![topic_id, group_id],
    )?;
    Ok(())
}

pub fn is_topic_allowed_user(conn: &Connection, topic_id: i64, user_id: i64) -> bool {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM topic_allowed_users WHERE topic_id = ?1 AND user_id = ?2)",
        params![topic_id, user_id],
        |row| row.get(0),
    )
    .unwrap_or(false)
}

pub fn topic_allowed_group_ids(conn: &Connection, topic_id: i64) -> Result<Vec<i64>, DbError> {
    let mut stmt = conn.prepare("SELECT group_id FROM topic_allowed_groups WHERE topic_id = ?1")?;
    let rows = stmt.query_map([topic_id], |row| row.get(0))?;
    let mut ids = Vec::new();
    for id in rows {
        ids.push(id?);
    }
    Ok(ids)
}

// --- Notifications ---

pub fn create_notification(
    conn: &Connection,
    user_id: i64,
    notification_type: &str,
    topic_id: i64,
    post_number: i64,
    data: &serde_json::Value,
) -> Result<(), DbError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO notifications (user_id, notification_type, topic_id, post_number, data, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![user_id, notification_type, topic_id, post_number, data.to_string(), now],
    )?;
    Ok(())
}

/// (notification_type, topic_id, data) rows for one user, oldest first.
pub fn notifications_for_user(
    conn: &Connection,
    user_id: i64,
) -> Result<Vec<(String, i64, String)>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT notification_type, topic_id, data FROM notifications
         WHERE user_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map([user_id], |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
    })?;
    let mut notifications = Vec::new();
    for n in rows {
        notifications.push(n?);
    }
    Ok(notifications)
}

// --- Badges ---

pub fn create_badge(
    conn: &Connection,
    name: &str,
    slug: &str,
    enabled: bool,
) -> Result<i64, DbError> {
    conn.execute(
        "INSERT INTO badges (name, slug, enabled) VALUES (?1, ?2, ?3)",
        params![name, slug, enabled],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn read_enabled_badge(conn: &Connection, badge_id: i64) -> Option<Badge> {
    conn.query_row(
        "SELECT id, name, slug, enabled FROM badges WHERE id = ?1 AND enabled = 1",
        [badge_id],
        |row| {
            Ok(Badge {
                id: row.get(0)?,
                name: row.get(1)?,
                slug: row.get(2)?,
                enabled: row.get(3)?,
            })
        },
    )
    .ok()
}

pub fn grant_badge(
    conn: &Connection,
    badge_id: i64,
    user_id: i64,
    post_id: i64,
) -> Result<(), DbError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO user_badges (badge_id, user_id, post_id, granted_at) VALUES (?1, ?2, ?3, ?4)",
        params![badge_id, user_id, post_id, now],
    )?;
    Ok(())
}

pub fn badge_granted(conn: &Connection, badge_id: i64, user_id: i64) -> bool {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM user_badges WHERE badge_id = ?1 AND user_id = ?2)",
        params![badge_id, user_id],
        |row| row.get(0),
    )
    .unwrap_or(false)
}

// --- Message archiving ---

pub fn archive_for_group(conn: &Connection, group_id: i64, topic_id: i64) -> Result<(), DbError> {
    conn.execute(
        "INSERT OR IGNORE INTO group_archived_messages (group_id, topic_id) VALUES (?1, ?2)",
        params![group_id, topic_id],
    )?;
    Ok(())
}

pub fn archive_for_user(conn: &Connection, user_id: i64, topic_id: i64) -> Result<(), DbError> {
    conn.execute(
        "INSERT OR IGNORE INTO user_archived_messages (user_id, topic_id) VALUES (?1, ?2)",
        params![user_id, topic_id],
    )?;
    Ok(())
}

pub fn is_archived_for_user(conn: &Connection, user_id: i64, topic_id: i64) -> bool {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM user_archived_messages WHERE user_id = ?1 AND topic_id = ?2)",
        params![user_id, topic_id],
        |row| row.get(0),
    )
    .unwrap_or(false)
}

pub fn is_archived_for_group(conn: &Connection, group_id: i64, topic_id: i64) -> bool {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM group_archived_messages WHERE group_id = ?1 AND topic_id = ?2)",
        params![group_id, topic_id],
        |row| row.get(0),
    )
    .unwrap_or(false)
}

// --- Category watchers ---

pub fn add_category_watcher(
    conn: &Connection,
    category_id: i64,
    user_id: i64,
    notification_level: i64,
) -> Result<(), DbError> {
    conn.execute(
        "INSERT OR REPLACE INTO category_users (category_id, user_id, notification_level)
         VALUES (?1, ?2, ?3)",
        params![category_id, user_id, notification_level],
    )?;
    Ok(())
}

pub fn category_watcher_ids(
    conn: &Connection,
    category_id: i64,
    min_level: i64,
    excluded_user_id: i64,
) -> Result<Vec<i64>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT user_id FROM category_users
         WHERE category_id = ?1 AND notification_level >= ?2 AND user_id != ?3
         ORDER BY user_id",
    )?;
    let rows = stmt.query_map(params![category_id, min_level, excluded_user_id], |row| {
        row.get(0)
    })?;
    let mut ids = Vec::new();
    for id in rows {
        ids.push(id?);
    }
    Ok(ids)
}

// --- System user ---

/// The reserved account that authors diversion bookkeeping posts.
pub const SYSTEM_USERNAME: &str = "system";

pub fn system_user(conn: &Connection) -> Result<crate::models::User, DbError> {
    crate::models::db_operations::users_db_operations::read_user_by_username(conn, SYSTEM_USERNAME)
        .ok_or_else(|| DbError::NotFound("system user (run setup_cli first)".to_string()))
}
