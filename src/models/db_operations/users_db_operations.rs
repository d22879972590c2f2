use crate::models::{Group, User};
use bcrypt::{hash, verify, BcryptError};
use chrono::Utc;
use rusqlite::{params, Connection, Error as RusqliteError, OptionalExtension};

fn bcrypt_to_rusqlite_error(e: BcryptError) -> RusqliteError {
    RusqliteError::ToSqlConversionFailure(Box::new(e))
}

pub fn create_user(
    conn: &Connection,
    username: &str,
    password: &str,
    trust_level: i64,
    admin: bool,
) -> Result<i64, RusqliteError> {
    let hashed_password = hash(password, bcrypt::DEFAULT_COST).map_err(bcrypt_to_rusqlite_error)?;
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO users (username, password_hash, trust_level, admin, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![username, hashed_password, trust_level, admin, now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn read_user(conn: &Connection, user_id: i64) -> Option<User> {
    conn.query_row(
        "SELECT id, username, trust_level, admin, created_at FROM users WHERE id = ?1",
        [user_id],
        map_user_row,
    )
    .ok()
}

pub fn read_user_by_username(conn: &Connection, username: &str) -> Option<User> {
    conn.query_row(
        "SELECT id, username, trust_level, admin, created_at FROM users WHERE username = ?1",
        [username],
        map_user_row,
    )
    .ok()
}

fn map_user_row(row: &rusqlite::Row) -> Result<User, RusqliteError> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        trust_level: row.get(2)?,
        admin: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub fn verify_credentials(conn: &Connection, username: &str, password: &str) -> Option<User> {
    let res: rusqlite::Result<String> = conn.query_row(
        "SELECT password_hash FROM users WHERE username = ?1",
        [username],
        |row| row.get(0),
    );

    if let Ok(hash) = res {
        if verify(password, &hash).unwrap_or(false) {
            return read_user_by_username(conn, username);
        }
    }
    None
}

// --- Groups and membership ---

pub fn create_group(conn: &Connection, name: &str) -> Result<i64, RusqliteError> {
    conn.execute("INSERT INTO groups (name) VALUES (?1)", [name])?;
    Ok(conn.last_insert_rowid())
}

pub fn lookup_group(conn: &Connection, name: &str) -> Option<Group> {
    conn.query_row(
        "SELECT id, name FROM groups WHERE name = ?1",
        [name],
        |row| {
            Ok(Group {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        },
    )
    .ok()
}

pub fn add_group_user(
    conn: &Connection,
    group_id: i64,
    user_id: i64,
    notification_level: i64,
) -> Result<(), RusqliteError> {
    conn.execute(
        "INSERT OR REPLACE INTO group_users (group_id, user_id, notification_level) VALUES (?1, ?2, ?3)",
        params![group_id, user_id, notification_level],
    )?;
    Ok(())
}

pub fn is_group_member(conn: &Connection, group_id: i64, user_id: i64) -> bool {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM group_users WHERE group_id = ?1 AND user_id = ?2)",
        params![group_id, user_id],
        |row| row.get(0),
    )
    .unwrap_or(false)
}

/// Group members with one of the given notification levels, excluding one user.
pub fn group_members_with_levels(
    conn: &Connection,
    group_id: i64,
    levels: &[i64],
    excluded_user_id: i64,
) -> Result<Vec<User>, RusqliteError> {
    let placeholders = levels
        .iter()
        .map(|_| "?")
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT u.id, u.username, u.trust_level, u.admin, u.created_at
         FROM users u
         JOIN group_users gu ON gu.user_id = u.id
         WHERE gu.group_id = ?1 AND u.id != ?2 AND gu.notification_level IN ({})
         ORDER BY u.id",
        placeholders
    );
    let mut stmt = conn.prepare(&sql)?;

    let mut args: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(group_id), Box::new(excluded_user_id)];
    for level in levels {
        args.push(Box::new(*level));
    }
    let params_refs: Vec<&dyn rusqlite::ToSql> = args.iter().map(|b| b.as_ref()).collect();

    let rows = stmt.query_map(params_refs.as_slice(), map_user_row)?;
    let mut users = Vec::new();
    for user in rows {
        users.push(user?);
    }
    Ok(users)
}

pub fn user_group_ids(conn: &Connection, user_id: i64) -> Result<Vec<i64>, RusqliteError> {
    let mut stmt = conn.prepare("SELECT group_id FROM group_users WHERE user_id = ?1")?;
    let rows = stmt.query_map([user_id], |row| row.get(0))?;
    let mut ids = Vec::new();
    for id in rows {
        ids.push(id?);
    }
    Ok(ids)
}

// --- Site settings ---

pub fn read_setting(conn: &Connection, key: &str) -> Option<String> {
    conn.query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
        row.get(0)
    })
    .optional()
    .unwrap_or(None)
}

pub fn update_setting(conn: &Connection, key: &str, value: &str) -> Result<(), RusqliteError> {
    conn.execute(
        "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
        [key, value],
    )?;
    Ok(())
}
