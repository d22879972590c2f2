use crate::helper::settings_helpers::SiteSettings;
use crate::models::db_operations::{forum_db_operations, users_db_operations};
use crate::models::{Category, Topic, User};
use rusqlite::Connection;

/// The forum's own posting rule, before any redirect logic is applied.
pub fn base_can_post_in_category(user: &User, category: &Category) -> bool {
    user.admin || user.trust_level >= category.min_trust_to_post
}

/// Permission gate for placing a topic in a category. When post approval and
/// redirect enforcement are enabled and the category redirects new topics,
/// users at or below the trust threshold are denied regardless of the base
/// permission result; otherwise the base check decides. A missing category
/// resolves to the uncategorized category first.
pub fn can_move_topic_to_category(
    conn: &Connection,
    settings: &SiteSettings,
    user: &User,
    category_id: Option<i64>,
) -> bool {
    let resolved_id = category_id.unwrap_or(settings.uncategorized_category_id);
    let category = match forum_db_operations::read_category(conn, resolved_id) {
        Some(category) => category,
        None => return false,
    };

    if settings.post_approval_enabled
        && settings.post_approval_redirect_enabled
        && category.redirect_topic_enabled
        && user.trust_level <= settings.post_approval_redirect_tl_max
    {
        return false;
    }

    base_can_post_in_category(user, &category)
}

/// Whether a user may reply on an existing topic. Private messages only
/// accept replies from their participants; public topics fall back to the
/// category posting rule.
pub fn can_create_post_on_topic(conn: &Connection, user: &User, topic: &Topic) -> bool {
    if topic.is_private_message() {
        return can_see_topic(conn, user, topic);
    }
    match topic.category_id {
        Some(category_id) => match forum_db_operations::read_category(conn, category_id) {
            Some(category) => base_can_post_in_category(user, &category),
            None => false,
        },
        None => true,
    }
}

/// Visibility: public topics are visible to everyone; private messages only
/// to direct participants and members of allowed groups.
pub fn can_see_topic(conn: &Connection, user: &User, topic: &Topic) -> bool {
    if !topic.is_private_message() {
        return true;
    }
    if forum_db_operations::is_topic_allowed_user(conn, topic.id, user.id) {
        return true;
    }
    let allowed_groups = match forum_db_operations::topic_allowed_group_ids(conn, topic.id) {
        Ok(ids) => ids,
        Err(_) => return false,
    };
    allowed_groups
        .iter()
        .any(|group_id| users_db_operations::is_group_member(conn, *group_id, user.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::test_support;

    #[test]
    fn gate_denies_low_trust_user_in_redirect_category() {
        let conn = test_support::setup_conn();
        let settings = test_support::enable_post_approval(&conn);
        let category_id = test_support::create_redirect_category(&conn, "Creations");
        let user = test_support::create_user(&conn, "newbie", 0);

        assert!(!can_move_topic_to_category(
            &conn,
            &settings,
            &user,
            Some(category_id)
        ));
    }

    #[test]
    fn gate_defers_to_base_check_for_high_trust_user() {
        let conn = test_support::setup_conn();
        let settings = test_support::enable_post_approval(&conn);
        let category_id = test_support::create_redirect_category(&conn, "Creations");
        let user = test_support::create_user(&conn, "veteran", 3);

        assert!(can_move_topic_to_category(
            &conn,
            &settings,
            &user,
            Some(category_id)
        ));
    }

    #[test]
    fn gate_is_inert_when_feature_disabled() {
        let conn = test_support::setup_conn();
        let mut settings = test_support::enable_post_approval(&conn);
        settings.post_approval_enabled = false;
        let category_id = test_support::create_redirect_category(&conn, "Creations");
        let user = test_support::create_user(&conn, "newbie", 0);

        assert!(can_move_topic_to_category(
            &conn,
            &settings,
            &user,
            Some(category_id)
        ));
    }

    #[test]
    fn missing_category_resolves_to_uncategorized() {
        let conn = test_support::setup_conn();
        let mut settings = test_support::enable_post_approval(&conn);
        let uncategorized = test_support::create_redirect_category(&conn, "Uncategorized");
        settings.uncategorized_category_id = uncategorized;
        let user = test_support::create_user(&conn, "newbie", 0);

        // The uncategorized category redirects, so None is denied too.
        assert!(!can_move_topic_to_category(&conn, &settings, &user, None));
    }

    #[test]
    fn base_check_enforces_category_minimum_trust() {
        let conn = test_support::setup_conn();
        let settings = test_support::enable_post_approval(&conn);
        let category_id = test_support::create_category(&conn, "Staff Lounge", 3);
        let user = test_support::create_user(&conn, "midlevel", 2);

        assert!(!can_move_topic_to_category(
            &conn,
            &settings,
            &user,
            Some(category_id)
        ));
    }

    #[test]
    fn pm_visibility_requires_participation() {
        let conn = test_support::setup_conn();
        let author = test_support::create_user(&conn, "author", 0);
        let outsider = test_support::create_user(&conn, "outsider", 2);
        let category_id = test_support::create_redirect_category(&conn, "Creations");
        let topic = test_support::create_pm_topic(&conn, &author, category_id);

        assert!(can_see_topic(&conn, &author, &topic));
        assert!(!can_see_topic(&conn, &outsider, &topic));
    }
}
