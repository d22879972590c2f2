use crate::helper::alert_helpers;
use crate::helper::permission_helpers;
use crate::helper::settings_helpers::SiteSettings;
use crate::helper::template_helpers;
use crate::models::db_operations::{forum_db_operations, users_db_operations};
use crate::models::{ApiError, Category, Topic, User, ARCHETYPE_REGULAR};
use regex::Regex;
use rusqlite::Connection;
use serde::Deserialize;
use std::sync::OnceLock;

/// Input of the approval action, rebuilt per HTTP call. Exactly one of the
/// new-topic fields (`target_category_id`, `title`, `tags`) or
/// `target_topic_id` must be supplied.
#[derive(Debug, Deserialize)]
pub struct ApprovalRequest {
    pub pm_topic_id: Option<i64>,
    pub award_badge: Option<serde_json::Value>,
    pub target_category_id: Option<i64>,
    pub title: Option<String>,
    pub tags: Option<serde_json::Value>,
    pub target_topic_id: Option<i64>,
}

#[derive(Debug)]
pub struct ApprovalOutcome {
    pub url: String,
}

static TRUTHY: OnceLock<Regex> = OnceLock::new();
static FALSY: OnceLock<Regex> = OnceLock::new();

/// Accepts JSON booleans and the common truthy/falsy string spellings;
/// anything else is invalid.
pub fn to_bool(value: &serde_json::Value) -> Option<bool> {
    match value {
        serde_json::Value::Bool(b) => Some(*b),
        serde_json::Value::String(s) => {
            let truthy =
                TRUTHY.get_or_init(|| Regex::new(r"(?i)^(true|t|yes|y|1)$").unwrap());
            let falsy = FALSY.get_or_init(|| Regex::new(r"(?i)^(false|f|no|n|0)$").unwrap());
            if truthy.is_match(s) {
                Some(true)
            } else if falsy.is_match(s) {
                Some(false)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn parse_tags(tags: Option<&serde_json::Value>) -> Result<Vec<String>, ApiError> {
    let value = match tags {
        None | Some(serde_json::Value::Null) => return Ok(Vec::new()),
        Some(value) => value,
    };
    let array = value
        .as_array()
        .ok_or(ApiError::InvalidParameters("tags"))?;
    let mut parsed = Vec::new();
    for item in array {
        match item.as_str() {
            Some(tag) if !tag.is_empty() => parsed.push(tag.to_string()),
            _ => return Err(ApiError::InvalidParameters("tags")),
        }
    }
    Ok(parsed)
}

enum Destination {
    NewTopic {
        category: Category,
        title: String,
        tags: Vec<String>,
    },
    Reply {
        topic: Topic,
        category: Option<Category>,
    },
}

/// Approval Orchestrator. Validates everything before the first mutation;
/// after the one-time claim succeeds the mutation sequence runs without
/// rollback (failures surface as 500 and leave the thread claimed).
pub fn approve(
    conn: &Connection,
    settings: &SiteSettings,
    acting_user: &User,
    req: &ApprovalRequest,
) -> Result<ApprovalOutcome, ApiError> {
    if !settings.post_approval_enabled || !settings.post_approval_button_enabled {
        return Err(ApiError::NotFound);
    }
    let team = users_db_operations::lookup_group(conn, &settings.post_approval_button_group)
        .ok_or(ApiError::InvalidAccess)?;
    if !users_db_operations::is_group_member(conn, team.id, acting_user.id) {
        return Err(ApiError::InvalidAccess);
    }

    // The moderation thread must be a private message visible to the caller.
    let pm_topic_id = req
        .pm_topic_id
        .ok_or(ApiError::InvalidParameters("pm_topic_id"))?;
    let pm_topic = forum_db_operations::read_topic(conn, pm_topic_id)
        .filter(|t| t.is_private_message())
        .filter(|t| permission_helpers::can_see_topic(conn, acting_user, t))
        .ok_or(ApiError::InvalidParameters("pm_topic_id"))?;

    let award_badge = req
        .award_badge
        .as_ref()
        .and_then(to_bool)
        .ok_or(ApiError::InvalidParameters("award_badge"))?;

    let author = users_db_operations::read_user(conn, pm_topic.user_id)
        .ok_or(ApiError::NotFound)?;

    // Only affects the wording of the confirmation, never access control.
    let mut could_post_on_own = author.trust_level > settings.post_approval_redirect_tl_max;

    let destination = match (req.target_category_id, req.target_topic_id) {
        (Some(_), Some(_)) | (None, None) => {
            return Err(ApiError::InvalidParameters("target"));
        }
        (Some(category_id), None) => {
            let category = forum_db_operations::read_category(conn, category_id)
                .ok_or(ApiError::InvalidParameters("target_category_id"))?;
            if !permission_helpers::can_move_topic_to_category(
                conn,
                settings,
                acting_user,
                Some(category.id),
            ) {
                return Err(ApiError::InvalidParameters("target_category_id"));
            }

            let title = req
                .title
                .clone()
                .ok_or(ApiError::InvalidParameters("title"))?;
            let title_length = title.chars().count() as i64;
            if title_length < settings.min_topic_title_length
                || title_length > settings.max_topic_title_length
            {
                return Err(ApiError::InvalidParameters("title"));
            }

            let tags = parse_tags(req.tags.as_ref())?;

            if permission_helpers::can_move_topic_to_category(
                conn,
                settings,
                &author,
                Some(category.id),
            ) {
                could_post_on_own = true;
            }

            Destination::NewTopic {
                category,
                title,
                tags,
            }
        }
        (None, Some(topic_id)) => {
            let topic = forum_db_operations::read_topic(conn, topic_id)
                .filter(|t| t.archetype == ARCHETYPE_REGULAR)
                .ok_or(ApiError::InvalidParameters("target_topic_id"))?;
            if !permission_helpers::can_create_post_on_topic(conn, acting_user, &topic) {
                return Err(ApiError::InvalidParameters("target_topic_id"));
            }
            let category = topic
                .category_id
                .and_then(|id| forum_db_operations::read_category(conn, id));

            if permission_helpers::can_create_post_on_topic(conn, &author, &topic) {
                could_post_on_own = true;
            }

            Destination::Reply { topic, category }
        }
    };

    // One-time claim: a moderation thread publishes at most once. A second
    // approval attempt (double click, concurrent moderator) stops here.
    if !forum_db_operations::claim_for_approval(conn, pm_topic.id)? {
        return Err(ApiError::InvalidParameters("pm_topic_id"));
    }

    let draft_raw = forum_db_operations::first_post(conn, pm_topic.id)
        .map(|p| p.raw)
        .ok_or(ApiError::NotFound)?;

    // Publish as the original author, carrying the vetted marker so the
    // notification hook does not treat the new topic as a fresh draft.
    let (post, target_category, is_topic) = match destination {
        Destination::NewTopic {
            category,
            title,
            tags,
        } => {
            let (topic, post) = forum_db_operations::create_topic_with_first_post(
                conn,
                author.id,
                category.id,
                &title,
                &draft_raw,
            )?;
            forum_db_operations::mark_topic_post_approval(conn, topic.id)?;
            forum_db_operations::add_topic_tags(conn, topic.id, &tags)?;
            (post, Some(category), true)
        }
        Destination::Reply { topic, category } => {
            let post =
                forum_db_operations::create_post(conn, topic.id, author.id, &draft_raw, false)?;
            (post, category, false)
        }
    };

    // The published post takes the normal notification path; the vetted
    // marker keeps the suppressor from treating it as a fresh draft.
    alert_helpers::after_save_post(conn, settings, &post)?;

    let mut body = if is_topic {
        settings.post_approval_response_topic.clone()
    } else {
        settings.post_approval_response_reply.clone()
    };

    if award_badge && settings.post_approval_badge > 0 {
        if let Some(badge) =
            forum_db_operations::read_enabled_badge(conn, settings.post_approval_badge)
        {
            forum_db_operations::grant_badge(conn, badge.id, author.id, post.id)?;
            body.push_str("\n\n");
            body.push_str(&template_helpers::apply(
                &settings.post_approval_response_badge,
                &[(
                    "%BADGE%",
                    template_helpers::badge_link(&settings.base_url, &badge).as_str(),
                )],
            ));
        }
    }

    if could_post_on_own {
        body.push_str("\n\n");
        body.push_str(if is_topic {
            &settings.post_approval_response_topic_footer
        } else {
            &settings.post_approval_response_reply_footer
        });
    }

    body = template_helpers::apply(
        &body,
        &[
            ("%USER%", author.username.as_str()),
            (
                "%POST%",
                template_helpers::post_link(&settings.base_url, &post).as_str(),
            ),
        ],
    );
    if let Some(category) = &target_category {
        body = template_helpers::apply(&body, &[("%CATEGORY%", category.name.as_str())]);
    }

    // Confirmation reply in the moderation thread, by the acting moderator.
    let reply = forum_db_operations::create_post(conn, pm_topic.id, acting_user.id, &body, false)?;
    if settings.solved_enabled {
        forum_db_operations::set_accepted_answer(conn, pm_topic.id, reply.id)?;
    }

    archive_message(conn, acting_user, pm_topic.id)?;

    Ok(ApprovalOutcome { url: post.url() })
}

/// Archives the moderation thread for every group the acting moderator
/// shares with it, and for the moderator personally if they participate
/// directly.
fn archive_message(conn: &Connection, acting_user: &User, topic_id: i64) -> Result<(), ApiError> {
    let member_groups = users_db_operations::user_group_ids(conn, acting_user.id)?;
    let allowed_groups = forum_db_operations::topic_allowed_group_ids(conn, topic_id)?;
    for group_id in allowed_groups
        .iter()
        .filter(|id| member_groups.contains(id))
    {
        forum_db_operations::archive_for_group(conn, *group_id, topic_id)?;
    }
    if forum_db_operations::is_topic_allowed_user(conn, topic_id, acting_user.id) {
        forum_db_operations::archive_for_user(conn, acting_user.id, topic_id)?;
    }
    Ok(())
}
