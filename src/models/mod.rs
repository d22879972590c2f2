use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

pub mod db_operations;

pub const ARCHETYPE_REGULAR: &str = "regular";
pub const ARCHETYPE_PRIVATE_MESSAGE: &str = "private_message";

pub const NOTIFICATION_INVITED_TO_PRIVATE_MESSAGE: &str = "invited_to_private_message";
pub const NOTIFICATION_POSTED: &str = "posted";

/// Group / category notification levels, same ordinals the forum frontend uses.
pub mod notification_levels {
    pub const MUTED: i64 = 0;
    pub const REGULAR: i64 = 1;
    pub const TRACKING: i64 = 2;
    pub const WATCHING: i64 = 3;
    pub const WATCHING_FIRST_POST: i64 = 4;
}

#[derive(Debug, Serialize, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub trust_level: i64,
    pub admin: bool,
    pub created_at: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct Group {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub min_trust_to_post: i64,
    pub redirect_topic_enabled: bool,
    pub redirect_topic_message: Option<String>,
    pub redirect_reply_enabled: bool,
    pub redirect_reply_message: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
pub struct Topic {
    pub id: i64,
    pub title: String,
    pub user_id: i64,
    pub category_id: Option<i64>,
    pub archetype: String,
    pub post_approval: bool,
    pub accepted_answer_post_id: Option<i64>,
    pub created_at: String,
}

impl Topic {
    pub fn is_private_message(&self) -> bool {
        self.archetype == ARCHETYPE_PRIVATE_MESSAGE
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct Post {
    pub id: i64,
    pub topic_id: i64,
    pub user_id: i64,
    pub post_number: i64,
    pub raw: String,
    pub wiki: bool,
    pub created_at: String,
}

impl Post {
    pub fn is_first_post(&self) -> bool {
        self.post_number == 1
    }

    /// Relative URL of the post, appended to `base_url` in messages.
    pub fn url(&self) -> String {
        format!("/t/{}/{}", self.topic_id, self.post_number)
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct Badge {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub enabled: bool,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found")]
    NotFound,
    #[error("Access denied")]
    InvalidAccess,
    #[error("Invalid parameter: {0}")]
    InvalidParameters(&'static str),
    #[error("Database error: {0}")]
    Database(#[from] db_operations::forum_db_operations::DbError),
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidAccess => StatusCode::FORBIDDEN,
            ApiError::InvalidParameters(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::NotFound => {
                HttpResponse::NotFound().json(json!({ "error": "Not found." }))
            }
            ApiError::InvalidAccess => {
                HttpResponse::Forbidden().json(json!({ "error": "Access denied." }))
            }
            ApiError::InvalidParameters(field) => HttpResponse::BadRequest()
                .json(json!({ "error": format!("Invalid parameter: {}", field), "field": field })),
            other => {
                log::error!("Internal error while handling request: {}", other);
                HttpResponse::InternalServerError()
                    .json(json!({ "error": "Internal server error." }))
            }
        }
    }
}
