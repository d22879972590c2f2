use crate::helper::settings_helpers::SiteSettings;
use crate::models::db_operations::forum_db_operations::DbError;
use rusqlite::Connection;

/// Published once per topic creation, after the topic and its first post are
/// persisted and the notification hook has run.
pub struct DraftCreated {
    pub topic_id: i64,
}

pub trait DraftCreatedSubscriber: Send + Sync {
    fn on_draft_created(
        &self,
        conn: &Connection,
        settings: &SiteSettings,
        event: &DraftCreated,
    ) -> Result<(), DbError>;
}

/// Synchronous pub/sub for creation events. Subscriber failures are logged
/// and swallowed: diversion is best-effort enrichment and must never fail
/// the request that created the topic.
#[derive(Default)]
pub struct EventBus {
    draft_created: Vec<Box<dyn DraftCreatedSubscriber>>,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus::default()
    }

    pub fn subscribe_draft_created(&mut self, subscriber: Box<dyn DraftCreatedSubscriber>) {
        self.draft_created.push(subscriber);
    }

    pub fn publish_draft_created(
        &self,
        conn: &Connection,
        settings: &SiteSettings,
        event: &DraftCreated,
    ) {
        for subscriber in &self.draft_created {
            if let Err(e) = subscriber.on_draft_created(conn, settings, event) {
                log::error!(
                    "DraftCreated subscriber failed for topic {}: {}",
                    event.topic_id,
                    e
                );
            }
        }
    }
}
