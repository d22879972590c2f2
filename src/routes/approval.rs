use crate::helper::approval_helpers::{self, ApprovalRequest};
use crate::helper::settings_helpers::SiteSettings;
use crate::middleware::AuthenticatedUser;
use crate::models::db_operations::users_db_operations;
use crate::models::ApiError;
use actix_web::{web, HttpResponse};
use serde_json::json;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/post-approval", web::post().to(approve_post));
}

async fn approve_post(
    auth_user: AuthenticatedUser,
    pool: web::Data<crate::DbPool>,
    form: web::Json<ApprovalRequest>,
) -> Result<HttpResponse, ApiError> {
    let conn = pool.get()?;
    let settings = SiteSettings::load(&conn);
    let acting_user = users_db_operations::read_user(&conn, auth_user.user_id)
        .ok_or(ApiError::NotFound)?;

    let outcome = approval_helpers::approve(&conn, &settings, &acting_user, &form)?;
    log::info!(
        "'{}' approved moderation thread {:?}.",
        acting_user.username,
        form.pm_topic_id
    );
    Ok(HttpResponse::Ok().json(json!({ "url": outcome.url })))
}

#[cfg(test)]
mod tests {
    use crate::events::EventBus;
    use crate::helper::redirect_helpers;
    use crate::helper::test_support;
    use crate::routes::{approval, auth};
    use crate::setup::db_setup;
    use actix_session::{storage::CookieSessionStore, SessionMiddleware};
    use actix_web::cookie::Key;
    use actix_web::{test, web, App};
    use r2d2_sqlite::SqliteConnectionManager;

    /// A one-connection pool keeps the in-memory database alive and shared
    /// across requests.
    fn test_pool() -> crate::DbPool {
        let manager = SqliteConnectionManager::memory();
        let pool = r2d2::Pool::builder().max_size(1).build(manager).unwrap();
        let mut conn = pool.get().unwrap();
        db_setup::setup_forum_db(&mut conn).unwrap();
        pool
    }

    #[actix_web::test]
    async fn approves_over_http_with_session_cookie() {
        let pool = test_pool();
        let (pm_topic_id, target_category_id) = {
            let conn = pool.get().unwrap();
            let settings = test_support::enable_post_approval(&conn);
            let category_id = test_support::create_redirect_category(&conn, "Creations");
            let author = test_support::create_user(&conn, "newbie", 0);
            test_support::create_moderator(&conn, "mod_jane");
            let (topic, _) =
                test_support::create_draft(&conn, &author, category_id, "My first build");
            redirect_helpers::divert_topic(&conn, &settings, topic.id).unwrap();
            let target = test_support::create_category(&conn, "Published", 0);
            (topic.id, target)
        };

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pool.clone()))
                .app_data(web::Data::new(EventBus::new()))
                .wrap(SessionMiddleware::new(
                    CookieSessionStore::default(),
                    Key::from(&[0u8; 64]),
                ))
                .configure(auth::config)
                .configure(approval::config),
        )
        .await;

        // Anonymous callers are rejected before any validation runs.
        let req = test::TestRequest::post()
            .uri("/post-approval")
            .set_json(serde_json::json!({ "pm_topic_id": pm_topic_id, "award_badge": false }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);

        let req = test::TestRequest::post()
            .uri("/login")
            .set_json(serde_json::json!({
                "username": "mod_jane",
                "password": "password123",
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let session_cookie = resp.response().cookies().next().unwrap().into_owned();

        let req = test::TestRequest::post()
            .uri("/post-approval")
            .cookie(session_cookie)
            .set_json(serde_json::json!({
                "pm_topic_id": pm_topic_id,
                "award_badge": "true",
                "target_category_id": target_category_id,
                "title": "An approved build",
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["url"].as_str().unwrap().starts_with("/t/"));
    }
}
