use crate::events::{DraftCreated, DraftCreatedSubscriber};
use crate::helper::settings_helpers::SiteSettings;
use crate::helper::template_helpers;
use crate::models::db_operations::forum_db_operations::{self, DbError};
use crate::models::db_operations::users_db_operations;
use crate::models::{notification_levels, Category, Topic, User};
use rusqlite::Connection;
use serde_json::json;

/// Redirect Decider. True only when every condition holds; any missing
/// configuration (no group name, no author, no category) makes it false.
pub fn must_redirect(
    settings: &SiteSettings,
    topic: &Topic,
    author: &User,
    category: Option<&Category>,
) -> bool {
    settings.post_approval_enabled
        && settings.post_approval_redirect_enabled
        && !settings.post_approval_redirect_group.is_empty()
        && !topic.post_approval
        && author.trust_level <= settings.post_approval_redirect_tl_max
        && category.map_or(false, |c| c.redirect_topic_enabled)
}

/// Loads the topic's author and category and evaluates `must_redirect`.
pub fn is_redirectable(conn: &Connection, settings: &SiteSettings, topic: &Topic) -> bool {
    let author = match users_db_operations::read_user(conn, topic.user_id) {
        Some(author) => author,
        None => return false,
    };
    let category = topic
        .category_id
        .and_then(|id| forum_db_operations::read_category(conn, id));
    must_redirect(settings, topic, &author, category.as_ref())
}

/// Draft Diversion: converts a freshly created draft topic into a private
/// moderation thread. A failing step aborts the remaining ones; the caller
/// treats the result as best-effort.
pub fn divert_topic(conn: &Connection, settings: &SiteSettings, topic_id: i64) -> Result<(), DbError> {
    let topic = forum_db_operations::read_topic(conn, topic_id)
        .ok_or_else(|| DbError::NotFound(format!("topic {}", topic_id)))?;
    let author = users_db_operations::read_user(conn, topic.user_id)
        .ok_or_else(|| DbError::NotFound(format!("user {}", topic.user_id)))?;
    let request_category = topic
        .category_id
        .and_then(|id| forum_db_operations::read_category(conn, id))
        .ok_or_else(|| DbError::NotFound(format!("category of topic {}", topic_id)))?;
    let group =
        users_db_operations::lookup_group(conn, &settings.post_approval_redirect_group)
            .ok_or_else(|| {
                DbError::NotFound(format!(
                    "moderation group '{}'",
                    settings.post_approval_redirect_group
                ))
            })?;
    let system_user = forum_db_operations::system_user(conn)?;

    // Turn the draft into a private message between the author and the team.
    forum_db_operations::convert_topic_to_private_message(conn, topic.id)?;

    // Prefix the title with the requested category and wiki the first post,
    // so the team can edit the draft in place.
    let prefix = template_helpers::apply(
        &settings.post_approval_redirect_topic_prefix,
        &[("%CATEGORY%", &request_category.name)],
    );
    let new_title = format!("{}{}", prefix, topic.title);
    forum_db_operations::update_topic_title(conn, topic.id, &new_title)?;
    if let Some(first_post) = forum_db_operations::first_post(conn, topic.id) {
        forum_db_operations::set_post_wiki(conn, first_post.id, true)?;
    }

    // System-authored reply explaining what happened.
    let message = request_category
        .redirect_topic_message
        .unwrap_or_default();
    forum_db_operations::create_post(conn, topic.id, system_user.id, &message, true)?;

    // Invite the moderation team.
    forum_db_operations::add_topic_allowed_group(conn, topic.id, group.id)?;

    let watchers = users_db_operations::group_members_with_levels(
        conn,
        group.id,
        &[
            notification_levels::WATCHING,
            notification_levels::WATCHING_FIRST_POST,
        ],
        author.id,
    )?;
    for member in watchers {
        forum_db_operations::create_notification(
            conn,
            member.id,
            crate::models::NOTIFICATION_INVITED_TO_PRIVATE_MESSAGE,
            topic.id,
            1,
            &json!({
                "topic_title": new_title,
                "display_username": author.username,
                "group_id": group.id,
            }),
        )?;
    }

    Ok(())
}

/// The event-bus subscriber that runs Draft Diversion after topic creation.
pub struct DiversionSubscriber;

impl DraftCreatedSubscriber for DiversionSubscriber {
    fn on_draft_created(
        &self,
        conn: &Connection,
        settings: &SiteSettings,
        event: &DraftCreated,
    ) -> Result<(), DbError> {
        let topic = match forum_db_operations::read_topic(conn, event.topic_id) {
            Some(topic) => topic,
            None => return Ok(()),
        };
        if is_redirectable(conn, settings, &topic) {
            divert_topic(conn, settings, topic.id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::test_support;
    use crate::models::db_operations::forum_db_operations;
    use crate::models::NOTIFICATION_INVITED_TO_PRIVATE_MESSAGE;

    #[test]
    fn no_redirect_when_category_does_not_redirect() {
        let conn = test_support::setup_conn();
        let settings = test_support::enable_post_approval(&conn);
        let category_id = test_support::create_category(&conn, "General", 0);
        let author = test_support::create_user(&conn, "newbie", 0);
        let (topic, _) = test_support::create_draft(&conn, &author, category_id, "My first build");

        assert!(!is_redirectable(&conn, &settings, &topic));
    }

    #[test]
    fn no_redirect_above_trust_threshold() {
        let conn = test_support::setup_conn();
        let settings = test_support::enable_post_approval(&conn);
        let category_id = test_support::create_redirect_category(&conn, "Creations");
        let author = test_support::create_user(&conn, "veteran", 2);
        let (topic, _) = test_support::create_draft(&conn, &author, category_id, "My first build");

        assert!(!is_redirectable(&conn, &settings, &topic));
    }

    #[test]
    fn no_redirect_once_marked_approved() {
        let conn = test_support::setup_conn();
        let settings = test_support::enable_post_approval(&conn);
        let category_id = test_support::create_redirect_category(&conn, "Creations");
        let author = test_support::create_user(&conn, "newbie", 0);
        let (topic, _) = test_support::create_draft(&conn, &author, category_id, "My first build");
        forum_db_operations::mark_topic_post_approval(&conn, topic.id).unwrap();
        let topic = forum_db_operations::read_topic(&conn, topic.id).unwrap();

        assert!(!is_redirectable(&conn, &settings, &topic));
    }

    #[test]
    fn no_redirect_without_configured_group() {
        let conn = test_support::setup_conn();
        let mut settings = test_support::enable_post_approval(&conn);
        settings.post_approval_redirect_group = String::new();
        let category_id = test_support::create_redirect_category(&conn, "Creations");
        let author = test_support::create_user(&conn, "newbie", 0);
        let (topic, _) = test_support::create_draft(&conn, &author, category_id, "My first build");

        assert!(!is_redirectable(&conn, &settings, &topic));
    }

    #[test]
    fn diversion_rewrites_title_and_invites_the_team() {
        let conn = test_support::setup_conn();
        let settings = test_support::enable_post_approval(&conn);
        let category_id = test_support::create_redirect_category(&conn, "Creations");
        let author = test_support::create_user(&conn, "newbie", 0);
        let moderator = test_support::create_moderator(&conn, "mod_jane");
        let (topic, _) = test_support::create_draft(&conn, &author, category_id, "My first build");

        assert!(is_redirectable(&conn, &settings, &topic));
        divert_topic(&conn, &settings, topic.id).unwrap();

        let diverted = forum_db_operations::read_topic(&conn, topic.id).unwrap();
        assert!(diverted.is_private_message());
        assert_eq!(diverted.title, "[Creations] My first build");
        assert_eq!(diverted.category_id, None);

        // First post became a wiki, and the category message was posted.
        let posts = forum_db_operations::posts_in_topic(&conn, topic.id).unwrap();
        assert_eq!(posts.len(), 2);
        assert!(posts[0].wiki);
        assert_eq!(posts[1].raw, test_support::REDIRECT_TOPIC_MESSAGE);
        assert!(posts[1].wiki);

        // Author stays a participant, team group is invited.
        assert!(forum_db_operations::is_topic_allowed_user(
            &conn, topic.id, author.id
        ));
        let group = crate::models::db_operations::users_db_operations::lookup_group(
            &conn,
            &settings.post_approval_redirect_group,
        )
        .unwrap();
        assert!(forum_db_operations::topic_allowed_group_ids(&conn, topic.id)
            .unwrap()
            .contains(&group.id));

        // Watching moderator got the invite, with the author named in it.
        let notifications =
            forum_db_operations::notifications_for_user(&conn, moderator.id).unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(
            notifications[0].0,
            NOTIFICATION_INVITED_TO_PRIVATE_MESSAGE
        );
        assert_eq!(notifications[0].1, topic.id);
        assert!(notifications[0].2.contains("newbie"));
    }

    #[test]
    fn diversion_skips_redirect_marked_topics_via_subscriber() {
        let conn = test_support::setup_conn();
        let settings = test_support::enable_post_approval(&conn);
        let category_id = test_support::create_redirect_category(&conn, "Creations");
        let author = test_support::create_user(&conn, "newbie", 0);
        let (topic, _) = test_support::create_draft(&conn, &author, category_id, "My first build");
        forum_db_operations::mark_topic_post_approval(&conn, topic.id).unwrap();

        DiversionSubscriber
            .on_draft_created(&conn, &settings, &DraftCreated { topic_id: topic.id })
            .unwrap();

        let unchanged = forum_db_operations::read_topic(&conn, topic.id).unwrap();
        assert!(!unchanged.is_private_message());
        assert_eq!(unchanged.title, "My first build");
    }

    #[test]
    fn diversion_aborts_when_group_is_missing() {
        let conn = test_support::setup_conn();
        let mut settings = test_support::enable_post_approval(&conn);
        settings.post_approval_redirect_group = "nonexistent-team".to_string();
        let category_id = test_support::create_redirect_category(&conn, "Creations");
        let author = test_support::create_user(&conn, "newbie", 0);
        let (topic, _) = test_support::create_draft(&conn, &author, category_id, "My first build");

        assert!(divert_topic(&conn, &settings, topic.id).is_err());

        // Nothing was converted: the failure happened before any step ran.
        let unchanged = forum_db_operations::read_topic(&conn, topic.id).unwrap();
        assert!(!unchanged.is_private_message());
    }
}
