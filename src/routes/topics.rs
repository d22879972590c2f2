use crate::events::{DraftCreated, EventBus};
use crate::helper::settings_helpers::SiteSettings;
use crate::helper::{alert_helpers, permission_helpers, sanitization_helpers};
use crate::middleware::AuthenticatedUser;
use crate::models::db_operations::{forum_db_operations, users_db_operations};
use crate::models::ApiError;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct NewTopicForm {
    title: String,
    raw: String,
    category_id: i64,
    tags: Option<Vec<String>>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/topics", web::post().to(create_topic));
}

/// Draft creation. The topic is persisted first; the notification hook and
/// the diversion subscriber then decide what becomes of it.
async fn create_topic(
    auth_user: AuthenticatedUser,
    pool: web::Data<crate::DbPool>,
    bus: web::Data<EventBus>,
    form: web::Json<NewTopicForm>,
) -> Result<HttpResponse, ApiError> {
    let conn = pool.get()?;
    let settings = SiteSettings::load(&conn);

    let title = sanitization_helpers::strip_all_html(&form.title);
    let title = title.trim();
    let title_length = title.chars().count() as i64;
    if title_length < settings.min_topic_title_length
        || title_length > settings.max_topic_title_length
    {
        return Err(ApiError::InvalidParameters("title"));
    }
    if form.raw.trim().is_empty() {
        return Err(ApiError::InvalidParameters("raw"));
    }

    let user = users_db_operations::read_user(&conn, auth_user.user_id)
        .ok_or(ApiError::NotFound)?;
    let category = forum_db_operations::read_category(&conn, form.category_id)
        .ok_or(ApiError::InvalidParameters("category_id"))?;
    if !permission_helpers::base_can_post_in_category(&user, &category) {
        return Err(ApiError::InvalidAccess);
    }

    let (topic, post) = forum_db_operations::create_topic_with_first_post(
        &conn,
        user.id,
        category.id,
        title,
        &form.raw,
    )?;
    if let Some(tags) = &form.tags {
        forum_db_operations::add_topic_tags(&conn, topic.id, tags)?;
    }

    alert_helpers::after_save_post(&conn, &settings, &post)?;
    bus.publish_draft_created(&conn, &settings, &DraftCreated { topic_id: topic.id });

    // The topic may have been diverted into a moderation thread by now, so
    // report its current shape.
    let topic = forum_db_operations::read_topic(&conn, topic.id).ok_or(ApiError::NotFound)?;
    Ok(HttpResponse::Ok().json(json!({
        "topic_id": topic.id,
        "post_id": post.id,
        "url": post.url(),
        "archetype": topic.archetype,
    })))
}
