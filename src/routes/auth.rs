use crate::helper::settings_helpers::SiteSettings;
use crate::middleware::AuthenticatedUser;
use crate::models::db_operations::users_db_operations;
use crate::models::ApiError;
use actix_session::Session;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/login", web::post().to(handle_login))
        .route("/logout", web::post().to(handle_logout))
        .route("/session/current", web::get().to(current_session));
}

async fn handle_login(
    session: Session,
    pool: web::Data<crate::DbPool>,
    form: web::Json<LoginForm>,
) -> Result<HttpResponse, ApiError> {
    let conn = pool.get()?;
    match users_db_operations::verify_credentials(&conn, &form.username, &form.password) {
        Some(user) => {
            session.insert("user_id", user.id).unwrap();
            session.insert("username", user.username.clone()).unwrap();
            session.insert("admin", user.admin).unwrap();
            log::info!("User '{}' logged in.", user.username);
            Ok(HttpResponse::Ok().json(json!({
                "id": user.id,
                "username": user.username,
                "trust_level": user.trust_level,
                "admin": user.admin,
            })))
        }
        None => Ok(HttpResponse::Unauthorized().json(json!({ "error": "Invalid credentials." }))),
    }
}

async fn handle_logout(session: Session) -> HttpResponse {
    session.clear();
    HttpResponse::Ok().json(json!({ "success": true }))
}

/// Session introspection; `is_post_approval` tells the client whether the
/// approve control should be offered at all.
async fn current_session(
    auth_user: AuthenticatedUser,
    pool: web::Data<crate::DbPool>,
) -> Result<HttpResponse, ApiError> {
    let conn = pool.get()?;
    let user = users_db_operations::read_user(&conn, auth_user.user_id)
        .ok_or(ApiError::NotFound)?;
    let settings = SiteSettings::load(&conn);

    let is_post_approval = settings.post_approval_enabled
        && settings.post_approval_button_enabled
        && users_db_operations::lookup_group(&conn, &settings.post_approval_button_group)
            .map(|group| users_db_operations::is_group_member(&conn, group.id, user.id))
            .unwrap_or(false);

    Ok(HttpResponse::Ok().json(json!({
        "id": user.id,
        "username": user.username,
        "trust_level": user.trust_level,
        "admin": user.admin,
        "is_post_approval": is_post_approval,
    })))
}
