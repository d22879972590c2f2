use crate::helper::redirect_helpers;
use crate::helper::settings_helpers::SiteSettings;
use crate::models::db_operations::forum_db_operations::{self, DbError};
use crate::models::db_operations::users_db_operations;
use crate::models::{notification_levels, Post, NOTIFICATION_POSTED};
use rusqlite::Connection;
use serde_json::json;

/// Notification hook run after a post is saved. Wraps the base first-post
/// fanout: posts that are about to be redirected into moderation must not
/// alert category watchers, so this is evaluated before any diversion
/// rewrites the topic.
pub fn after_save_post(conn: &Connection, settings: &SiteSettings, post: &Post) -> Result<(), DbError> {
    if post.is_first_post() {
        if let Some(topic) = forum_db_operations::read_topic(conn, post.topic_id) {
            if redirect_helpers::is_redirectable(conn, settings, &topic) {
                return Ok(());
            }
        }
    }
    notify_first_post_watchers(conn, post)
}

/// Base fanout: tell category watchers about a new topic.
fn notify_first_post_watchers(conn: &Connection, post: &Post) -> Result<(), DbError> {
    if !post.is_first_post() {
        return Ok(());
    }
    let topic = match forum_db_operations::read_topic(conn, post.topic_id) {
        Some(topic) => topic,
        None => return Ok(()),
    };
    let category_id = match topic.category_id {
        Some(id) => id,
        None => return Ok(()),
    };
    let author_username = users_db_operations::read_user(conn, topic.user_id)
        .map(|u| u.username)
        .unwrap_or_default();

    let watcher_ids = forum_db_operations::category_watcher_ids(
        conn,
        category_id,
        notification_levels::WATCHING,
        topic.user_id,
    )?;
    for user_id in watcher_ids {
        forum_db_operations::create_notification(
            conn,
            user_id,
            NOTIFICATION_POSTED,
            topic.id,
            post.post_number,
            &json!({
                "topic_title": topic.title,
                "display_username": author_username,
            }),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::test_support;
    use crate::models::db_operations::forum_db_operations;

    #[test]
    fn suppresses_fanout_for_redirectable_first_posts() {
        let conn = test_support::setup_conn();
        let settings = test_support::enable_post_approval(&conn);
        let category_id = test_support::create_redirect_category(&conn, "Creations");
        let watcher = test_support::create_user(&conn, "watcher", 3);
        forum_db_operations::add_category_watcher(
            &conn,
            category_id,
            watcher.id,
            crate::models::notification_levels::WATCHING,
        )
        .unwrap();
        let author = test_support::create_user(&conn, "newbie", 0);
        let (_, post) = test_support::create_draft(&conn, &author, category_id, "My first build");

        after_save_post(&conn, &settings, &post).unwrap();

        let notifications =
            forum_db_operations::notifications_for_user(&conn, watcher.id).unwrap();
        assert!(notifications.is_empty());
    }

    #[test]
    fn fans_out_for_ordinary_first_posts() {
        let conn = test_support::setup_conn();
        let settings = test_support::enable_post_approval(&conn);
        let category_id = test_support::create_category(&conn, "General", 0);
        let watcher = test_support::create_user(&conn, "watcher", 3);
        forum_db_operations::add_category_watcher(
            &conn,
            category_id,
            watcher.id,
            crate::models::notification_levels::WATCHING,
        )
        .unwrap();
        let author = test_support::create_user(&conn, "newbie", 0);
        let (_, post) = test_support::create_draft(&conn, &author, category_id, "Hello there");

        after_save_post(&conn, &settings, &post).unwrap();

        let notifications =
            forum_db_operations::notifications_for_user(&conn, watcher.id).unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].0, NOTIFICATION_POSTED);
    }

    #[test]
    fn never_suppresses_already_approved_topics() {
        let conn = test_support::setup_conn();
        let settings = test_support::enable_post_approval(&conn);
        let category_id = test_support::create_redirect_category(&conn, "Creations");
        let watcher = test_support::create_user(&conn, "watcher", 3);
        forum_db_operations::add_category_watcher(
            &conn,
            category_id,
            watcher.id,
            crate::models::notification_levels::WATCHING,
        )
        .unwrap();
        let author = test_support::create_user(&conn, "newbie", 0);
        let (topic, post) = test_support::create_draft(&conn, &author, category_id, "Approved one");
        forum_db_operations::mark_topic_post_approval(&conn, topic.id).unwrap();

        after_save_post(&conn, &settings, &post).unwrap();

        let notifications =
            forum_db_operations::notifications_for_user(&conn, watcher.id).unwrap();
        assert_eq!(notifications.len(), 1);
    }
}
