use crate::models::db_operations::users_db_operations;
use rusqlite::Connection;

/// Read-only snapshot of the site settings consulted by the approval
/// workflow. Loaded once per request and passed into the components, so
/// none of them reach into the settings table on their own.
#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub post_approval_enabled: bool,
    pub post_approval_redirect_enabled: bool,
    pub post_approval_redirect_group: String,
    pub post_approval_redirect_tl_max: i64,
    pub post_approval_redirect_topic_prefix: String,
    pub post_approval_button_enabled: bool,
    pub post_approval_button_group: String,
    pub post_approval_badge: i64,
    pub post_approval_response_topic: String,
    pub post_approval_response_reply: String,
    pub post_approval_response_badge: String,
    pub post_approval_response_topic_footer: String,
    pub post_approval_response_reply_footer: String,
    pub min_topic_title_length: i64,
    pub max_topic_title_length: i64,
    pub solved_enabled: bool,
    pub uncategorized_category_id: i64,
    pub base_url: String,
}

fn read_bool(conn: &Connection, key: &str, default: bool) -> bool {
    users_db_operations::read_setting(conn, key)
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(default)
}

fn read_i64(conn: &Connection, key: &str, default: i64) -> i64 {
    users_db_operations::read_setting(conn, key)
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}

fn read_string(conn: &Connection, key: &str, default: &str) -> String {
    users_db_operations::read_setting(conn, key).unwrap_or_else(|| default.to_string())
}

impl SiteSettings {
    pub fn load(conn: &Connection) -> Self {
        SiteSettings {
            post_approval_enabled: read_bool(conn, "post_approval_enabled", false),
            post_approval_redirect_enabled: read_bool(conn, "post_approval_redirect_enabled", true),
            post_approval_redirect_group: read_string(conn, "post_approval_redirect_group", ""),
            post_approval_redirect_tl_max: read_i64(conn, "post_approval_redirect_tl_max", 1),
            post_approval_redirect_topic_prefix: read_string(
                conn,
                "post_approval_redirect_topic_prefix",
                "[%CATEGORY%] ",
            ),
            post_approval_button_enabled: read_bool(conn, "post_approval_button_enabled", true),
            post_approval_button_group: read_string(conn, "post_approval_button_group", ""),
            post_approval_badge: read_i64(conn, "post_approval_badge", 0),
            post_approval_response_topic: read_string(
                conn,
                "post_approval_response_topic",
                "Hello %USER%, your topic has been approved and published: %POST%",
            ),
            post_approval_response_reply: read_string(
                conn,
                "post_approval_response_reply",
                "Hello %USER%, your reply has been approved and published: %POST%",
            ),
            post_approval_response_badge: read_string(
                conn,
                "post_approval_response_badge",
                "You have been awarded the %BADGE% badge for this contribution.",
            ),
            post_approval_response_topic_footer: read_string(
                conn,
                "post_approval_response_topic_footer",
                "Note: your trust level would have allowed you to post this topic directly.",
            ),
            post_approval_response_reply_footer: read_string(
                conn,
                "post_approval_response_reply_footer",
                "Note: your trust level would have allowed you to post this reply directly.",
            ),
            min_topic_title_length: read_i64(conn, "min_topic_title_length", 5),
            max_topic_title_length: read_i64(conn, "max_topic_title_length", 255),
            solved_enabled: read_bool(conn, "solved_enabled", true),
            uncategorized_category_id: read_i64(conn, "uncategorized_category_id", 1),
            base_url: read_string(conn, "base_url", "http://localhost:8080"),
        }
    }
}
