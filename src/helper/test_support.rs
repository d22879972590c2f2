//! Shared fixtures for the in-memory database tests.

use crate::helper::settings_helpers::SiteSettings;
use crate::models::db_operations::{forum_db_operations, users_db_operations};
use crate::models::{notification_levels, Post, Topic, User};
use crate::setup::db_setup;
use rusqlite::Connection;

pub const TEAM_GROUP: &str = "post-approval-team";
pub const REDIRECT_TOPIC_MESSAGE: &str =
    "Thanks for your submission! The moderation team will review it shortly.";

pub fn setup_conn() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db_setup::setup_forum_db(&mut conn).unwrap();
    conn
}

/// Turns the feature on with the team group configured for both redirecting
/// and approving, threshold at trust level 1, and returns the snapshot.
pub fn enable_post_approval(conn: &Connection) -> SiteSettings {
    users_db_operations::update_setting(conn, "post_approval_enabled", "true").unwrap();
    users_db_operations::update_setting(conn, "post_approval_redirect_enabled", "true").unwrap();
    users_db_operations::update_setting(conn, "post_approval_redirect_group", TEAM_GROUP).unwrap();
    users_db_operations::update_setting(conn, "post_approval_button_enabled", "true").unwrap();
    users_db_operations::update_setting(conn, "post_approval_button_group", TEAM_GROUP).unwrap();
    users_db_operations::update_setting(conn, "post_approval_redirect_tl_max", "1").unwrap();
    if users_db_operations::lookup_group(conn, TEAM_GROUP).is_none() {
        users_db_operations::create_group(conn, TEAM_GROUP).unwrap();
    }
    SiteSettings::load(conn)
}

pub fn create_user(conn: &Connection, username: &str, trust_level: i64) -> User {
    users_db_operations::create_user(conn, username, "password123", trust_level, false).unwrap();
    users_db_operations::read_user_by_username(conn, username).unwrap()
}

/// A trust-level-3 member of the team group, watching the group inbox.
pub fn create_moderator(conn: &Connection, username: &str) -> User {
    let user = create_user(conn, username, 3);
    let group = users_db_operations::lookup_group(conn, TEAM_GROUP).unwrap();
    users_db_operations::add_group_user(
        conn,
        group.id,
        user.id,
        notification_levels::WATCHING,
    )
    .unwrap();
    user
}

pub fn create_category(conn: &Connection, name: &str, min_trust_to_post: i64) -> i64 {
    forum_db_operations::create_category(conn, name, min_trust_to_post).unwrap()
}

pub fn create_redirect_category(conn: &Connection, name: &str) -> i64 {
    let category_id = create_category(conn, name, 0);
    forum_db_operations::update_category_redirect(
        conn,
        category_id,
        true,
        Some(REDIRECT_TOPIC_MESSAGE),
        false,
        None,
    )
    .unwrap();
    category_id
}

pub fn create_draft(
    conn: &Connection,
    author: &User,
    category_id: i64,
    title: &str,
) -> (Topic, Post) {
    forum_db_operations::create_topic_with_first_post(
        conn,
        author.id,
        category_id,
        title,
        "The raw draft body of the submission.",
    )
    .unwrap()
}

pub fn create_pm_topic(conn: &Connection, author: &User, category_id: i64) -> Topic {
    let (topic, _) = create_draft(conn, author, category_id, "A private thread");
    forum_db_operations::convert_topic_to_private_message(conn, topic.id).unwrap();
    forum_db_operations::read_topic(conn, topic.id).unwrap()
}
