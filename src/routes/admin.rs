use crate::middleware::{admin_guard, AuthenticatedUser};
use crate::models::db_operations::{forum_db_operations, users_db_operations};
use crate::models::ApiError;
use actix_session::Session;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct NewCategoryForm {
    name: String,
    min_trust_to_post: i64,
}

#[derive(Deserialize)]
struct RedirectForm {
    redirect_topic_enabled: bool,
    redirect_topic_message: Option<String>,
    redirect_reply_enabled: bool,
    redirect_reply_message: Option<String>,
}

#[derive(Deserialize)]
struct SettingForm {
    key: String,
    value: String,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/categories", web::post().to(create_category))
            .route("/categories/{id}", web::get().to(get_category))
            .route("/categories/{id}/redirect", web::put().to(update_redirect))
            .route("/settings", web::put().to(update_setting)),
    );
}

async fn create_category(
    _auth_user: AuthenticatedUser,
    session: Session,
    pool: web::Data<crate::DbPool>,
    form: web::Json<NewCategoryForm>,
) -> Result<HttpResponse, ApiError> {
    if !admin_guard(&session) {
        return Err(ApiError::InvalidAccess);
    }
    let conn = pool.get()?;
    let category_id =
        forum_db_operations::create_category(&conn, &form.name, form.min_trust_to_post)?;
    Ok(HttpResponse::Ok().json(json!({ "id": category_id })))
}

async fn get_category(
    _auth_user: AuthenticatedUser,
    session: Session,
    pool: web::Data<crate::DbPool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    if !admin_guard(&session) {
        return Err(ApiError::InvalidAccess);
    }
    let conn = pool.get()?;
    let category =
        forum_db_operations::read_category(&conn, path.into_inner()).ok_or(ApiError::NotFound)?;
    Ok(HttpResponse::Ok().json(category))
}

async fn update_redirect(
    _auth_user: AuthenticatedUser,
    session: Session,
    pool: web::Data<crate::DbPool>,
    path: web::Path<i64>,
    form: web::Json<RedirectForm>,
) -> Result<HttpResponse, ApiError> {
    if !admin_guard(&session) {
        return Err(ApiError::InvalidAccess);
    }
    let conn = pool.get()?;
    let updated = forum_db_operations::update_category_redirect(
        &conn,
        path.into_inner(),
        form.redirect_topic_enabled,
        form.redirect_topic_message.as_deref(),
        form.redirect_reply_enabled,
        form.redirect_reply_message.as_deref(),
    )?;
    if updated == 0 {
        return Err(ApiError::NotFound);
    }
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

async fn update_setting(
    _auth_user: AuthenticatedUser,
    session: Session,
    pool: web::Data<crate::DbPool>,
    form: web::Json<SettingForm>,
) -> Result<HttpResponse, ApiError> {
    if !admin_guard(&session) {
        return Err(ApiError::InvalidAccess);
    }
    let conn = pool.get()?;
    users_db_operations::update_setting(&conn, &form.key, &form.value)?;
    log::info!("Setting '{}' updated.", form.key);
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}
