use actix_session::{Session, SessionExt};
use actix_web::{dev, FromRequest, HttpRequest};
use serde::Serialize;
use std::future::{ready, Ready};

/// Extracted from the session cookie; handlers taking this parameter reject
/// anonymous requests with 401 before running.
#[derive(Serialize)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub username: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let session = req.get_session();
        if let (Ok(Some(user_id)), Ok(Some(username))) =
            (session.get("user_id"), session.get("username"))
        {
            ready(Ok(AuthenticatedUser { user_id, username }))
        } else {
            ready(Err(actix_web::error::ErrorUnauthorized("Not logged in.")))
        }
    }
}

pub fn admin_guard(session: &Session) -> bool {
    session.get::<bool>("admin").unwrap_or(None) == Some(true)
}
