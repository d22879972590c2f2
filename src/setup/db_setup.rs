use rusqlite::{Connection, Result as RusqliteResult, Transaction};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

/// Creates the forum schema and seeds the defaults. Safe to run repeatedly.
pub fn setup_forum_db(conn: &mut Connection) -> Result<(), SetupError> {
    let tx = conn.transaction()?;

    println!("- Creating 'users' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            trust_level INTEGER NOT NULL DEFAULT 0,
            admin INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    println!("- Creating 'groups' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS groups (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )",
        [],
    )?;

    println!("- Creating 'group_users' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS group_users (
            group_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            notification_level INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (group_id, user_id),
            FOREIGN KEY (group_id) REFERENCES groups(id) ON DELETE CASCADE,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
        [],
    )?;

    println!("- Creating 'settings' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    println!("- Creating 'categories' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            min_trust_to_post INTEGER NOT NULL DEFAULT 0,
            redirect_topic_enabled INTEGER NOT NULL DEFAULT 0,
            redirect_topic_message TEXT,
            redirect_reply_enabled INTEGER NOT NULL DEFAULT 0,
            redirect_reply_message TEXT
        )",
        [],
    )?;

    println!("- Creating 'category_users' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS category_users (
            category_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            notification_level INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (category_id, user_id),
            FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE CASCADE,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
        [],
    )?;

    println!("- Creating 'topics' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS topics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            user_id INTEGER NOT NULL,
            category_id INTEGER,
            archetype TEXT NOT NULL DEFAULT 'regular' CHECK(archetype IN ('regular', 'private_message')),
            post_approval INTEGER NOT NULL DEFAULT 0,
            accepted_answer_post_id INTEGER,
            created_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id),
            FOREIGN KEY (category_id) REFERENCES categories(id)
        )",
        [],
    )?;

    println!("- Creating 'posts' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            topic_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            post_number INTEGER NOT NULL,
            raw TEXT NOT NULL,
            wiki INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            UNIQUE (topic_id, post_number),
            FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE,
            FOREIGN KEY (user_id) REFERENCES users(id)
        )",
        [],
    )?;

    println!("- Creating 'topic_tags' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS topic_tags (
            topic_id INTEGER NOT NULL,
            tag TEXT NOT NULL,
            PRIMARY KEY (topic_id, tag),
            FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE
        )",
        [],
    )?;

    println!("- Creating 'topic_allowed_users' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS topic_allowed_users (
            topic_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            PRIMARY KEY (topic_id, user_id),
            FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
        [],
    )?;

    println!("- Creating 'topic_allowed_groups' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS topic_allowed_groups (
            topic_id INTEGER NOT NULL,
            group_id INTEGER NOT NULL,
            PRIMARY KEY (topic_id, group_id),
            FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE,
            FOREIGN KEY (group_id) REFERENCES groups(id) ON DELETE CASCADE
        )",
        [],
    )?;

    println!("- Creating 'notifications' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS notifications (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            notification_type TEXT NOT NULL,
            topic_id INTEGER NOT NULL,
            post_number INTEGER NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE
        )",
        [],
    )?;

    println!("- Creating 'badges' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS badges (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            slug TEXT NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 1
        )",
        [],
    )?;

    println!("- Creating 'user_badges' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS user_badges (
            badge_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            post_id INTEGER NOT NULL,
            granted_at TEXT NOT NULL,
            PRIMARY KEY (badge_id, user_id, post_id),
            FOREIGN KEY (badge_id) REFERENCES badges(id) ON DELETE CASCADE,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
        [],
    )?;

    println!("- Creating 'group_archived_messages' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS group_archived_messages (
            group_id INTEGER NOT NULL,
            topic_id INTEGER NOT NULL,
            PRIMARY KEY (group_id, topic_id),
            FOREIGN KEY (group_id) REFERENCES groups(id) ON DELETE CASCADE,
            FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE
        )",
        [],
    )?;

    println!("- Creating 'user_archived_messages' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS user_archived_messages (
            user_id INTEGER NOT NULL,
            topic_id INTEGER NOT NULL,
            PRIMARY KEY (user_id, topic_id),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE
        )",
        [],
    )?;

    seed_initial_settings(&tx)?;
    seed_system_user(&tx)?;

    tx.commit()?;
    Ok(())
}

fn seed_initial_settings(tx: &Transaction) -> RusqliteResult<()> {
    println!("- Seeding initial settings...");
    let defaults: &[(&str, &str)] = &[
        ("post_approval_enabled", "false"),
        ("post_approval_redirect_enabled", "true"),
        ("post_approval_redirect_group", ""),
        ("post_approval_redirect_tl_max", "1"),
        ("post_approval_redirect_topic_prefix", "[%CATEGORY%] "),
        ("post_approval_button_enabled", "true"),
        ("post_approval_button_group", ""),
        ("post_approval_badge", "0"),
        (
            "post_approval_response_topic",
            "Hello %USER%, your topic has been approved and published: %POST%",
        ),
        (
            "post_approval_response_reply",
            "Hello %USER%, your reply has been approved and published: %POST%",
        ),
        (
            "post_approval_response_badge",
            "You have been awarded the %BADGE% badge for this contribution.",
        ),
        (
            "post_approval_response_topic_footer",
            "Note: your trust level would have allowed you to post this topic directly.",
        ),
        (
            "post_approval_response_reply_footer",
            "Note: your trust level would have allowed you to post this reply directly.",
        ),
        ("min_topic_title_length", "5"),
        ("max_topic_title_length", "255"),
        ("solved_enabled", "true"),
        ("uncategorized_category_id", "1"),
        ("base_url", "http://localhost:8080"),
    ];
    for (key, value) in defaults {
        tx.execute(
            "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)",
            [key, value],
        )?;
    }
    println!("  > Seeded {} default settings.", defaults.len());
    Ok(())
}

/// The system user authors the automated replies in moderation threads. The
/// '!' hash can never match a password, so the account is not logged into.
fn seed_system_user(tx: &Transaction) -> RusqliteResult<()> {
    println!("- Seeding 'system' user...");
    tx.execute(
        "INSERT OR IGNORE INTO users (username, password_hash, trust_level, admin, created_at)
         VALUES ('system', '!', 4, 1, ?1)",
        [chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}
