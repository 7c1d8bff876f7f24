//! Storage for users, events, categories and favorites.

use async_trait::async_trait;

use crate::models::{CategoryRef, EventRecord, NormalizedEvent, User};

pub mod memory;
pub mod postgres;

pub use self::memory::MemoryEventRepository;
pub use self::postgres::PgEventRepository;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, RepositoryError>;

    async fn save_user(&self, user: &User) -> Result<(), RepositoryError>;

    /// Stored event with its categories; `favorite` is always `false`.
    async fn find_event_by_id(&self, event_id: &str) -> Result<Option<NormalizedEvent>, RepositoryError>;

    /// Favorite event ids of a user, oldest favorite first.
    async fn find_favorite_event_ids(&self, user_id: &str) -> Result<Vec<String>, RepositoryError>;

    /// Category names of an event, sorted by name.
    async fn find_categories_by_event_id(&self, event_id: &str) -> Result<Vec<String>, RepositoryError>;

    /// Case-insensitive lookup by name, creating the category on a miss.
    async fn upsert_category(&self, name: &str) -> Result<CategoryRef, RepositoryError>;

    /// Insert-or-replace by event id, replacing each event's category links.
    async fn upsert_events(&self, batch: &[EventRecord]) -> Result<(), RepositoryError>;

    /// Idempotent.
    async fn add_favorite(&self, user_id: &str, event_id: &str) -> Result<(), RepositoryError>;

    async fn remove_favorite(&self, user_id: &str, event_id: &str) -> Result<(), RepositoryError>;
}
