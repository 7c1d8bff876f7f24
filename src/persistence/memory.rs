use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{EventRepository, RepositoryError};
use crate::models::{CategoryRef, EventRecord, NormalizedEvent, User};

#[derive(Debug, Default)]
struct State {
    users: HashMap<String, User>,
    events: HashMap<String, NormalizedEvent>,
    event_categories: HashMap<String, Vec<CategoryRef>>,
    // keyed by lowercase name
    categories: HashMap<String, CategoryRef>,
    next_category_id: i64,
    // per user, in the order favorites were added
    favorites: HashMap<String, Vec<String>>,
    event_batches: usize,
}

/// In-process repository with the same semantics as the Postgres one.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventRepository {
    state: Arc<RwLock<State>>,
}

impl MemoryEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `upsert_events` calls so far.
    pub async fn event_batches(&self) -> usize {
        self.state.read().await.event_batches
    }

    pub async fn category_count(&self) -> usize {
        self.state.read().await.categories.len()
    }
}

#[async_trait]
impl EventRepository for MemoryEventRepository {
    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.state.read().await.users.get(user_id).cloned())
    }

    async fn save_user(&self, user: &User) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state.users.insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    async fn find_event_by_id(&self, event_id: &str) -> Result<Option<NormalizedEvent>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.events.get(event_id).map(|event| {
            let mut event = event.clone();
            event.categories = state
                .event_categories
                .get(event_id)
                .map(|categories| categories.iter().map(|c| c.name.clone()).collect())
                .unwrap_or_default();
            event.favorite = false;
            event
        }))
    }

    async fn find_favorite_event_ids(&self, user_id: &str) -> Result<Vec<String>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.favorites.get(user_id).cloned().unwrap_or_default())
    }

    async fn find_categories_by_event_id(&self, event_id: &str) -> Result<Vec<String>, RepositoryError> {
        let state = self.state.read().await;
        let mut names: Vec<String> = state
            .event_categories
            .get(event_id)
            .map(|categories| categories.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default();
        names.sort();
        Ok(names)
    }

    async fn upsert_category(&self, name: &str) -> Result<CategoryRef, RepositoryError> {
        let mut state = self.state.write().await;
        let key = name.to_lowercase();
        if let Some(category) = state.categories.get(&key) {
            return Ok(category.clone());
        }
        state.next_category_id += 1;
        let category = CategoryRef {
            id: state.next_category_id,
            name: name.to_string(),
        };
        state.categories.insert(key, category.clone());
        Ok(category)
    }

    async fn upsert_events(&self, batch: &[EventRecord]) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        for record in batch {
            let mut event = record.event.clone();
            event.favorite = false;
            state.event_categories.insert(event.id.clone(), record.categories.clone());
            state.events.insert(event.id.clone(), event);
        }
        state.event_batches += 1;
        Ok(())
    }

    async fn add_favorite(&self, user_id: &str, event_id: &str) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        let favorites = state.favorites.entry(user_id.to_string()).or_default();
        if !favorites.iter().any(|id| id == event_id) {
            favorites.push(event_id.to_string());
        }
        Ok(())
    }

    async fn remove_favorite(&self, user_id: &str, event_id: &str) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if let Some(favorites) = state.favorites.get_mut(user_id) {
            favorites.retain(|id| id != event_id);
        }
        Ok(())
    }
}
