//! Postgres repository.
//!
//! Expected tables: `users`, `events`, `categories` (unique index on
//! `lower(name)`), `event_categories` and `user_favorites` (with a
//! `created_at` default). Schema management lives outside this service.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use tracing::info;

use super::{EventRepository, RepositoryError};
use crate::models::{CategoryRef, EventRecord, NormalizedEvent, User};

#[derive(Clone)]
pub struct PgEventRepository {
    pool: PgPool,
}

#[derive(FromRow)]
struct EventRow {
    id: String,
    name: String,
    url: String,
    distance: f64,
    image_url: String,
    address: String,
}

impl PgEventRepository {
    pub async fn connect(database_url: &str, pool_size: u32) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;
        info!("Database connected");
        Ok(Self::new(pool))
    }

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT user_id, first_name, last_name FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn save_user(&self, user: &User) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO users (user_id, password, first_name, last_name)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (user_id) DO UPDATE
             SET password = EXCLUDED.password,
                 first_name = EXCLUDED.first_name,
                 last_name = EXCLUDED.last_name",
        )
        .bind(&user.user_id)
        .bind(&user.password)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_event_by_id(&self, event_id: &str) -> Result<Option<NormalizedEvent>, RepositoryError> {
        let row = sqlx::query_as::<_, EventRow>(
            "SELECT id, name, url, distance, image_url, address FROM events WHERE id = $1",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let categories = self.find_categories_by_event_id(&row.id).await?;

        Ok(Some(NormalizedEvent {
            id: row.id,
            name: row.name,
            url: row.url,
            distance: row.distance,
            image_url: row.image_url,
            address: row.address,
            categories: categories.into_iter().collect(),
            favorite: false,
        }))
    }

    async fn find_favorite_event_ids(&self, user_id: &str) -> Result<Vec<String>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT event_id FROM user_favorites WHERE user_id = $1 ORDER BY created_at, event_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn find_categories_by_event_id(&self, event_id: &str) -> Result<Vec<String>, RepositoryError> {
        let names = sqlx::query_scalar::<_, String>(
            "SELECT c.name
             FROM categories c
             JOIN event_categories ec ON ec.category_id = c.id
             WHERE ec.event_id = $1
             ORDER BY c.name",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    async fn upsert_category(&self, name: &str) -> Result<CategoryRef, RepositoryError> {
        let existing = sqlx::query_as::<_, CategoryRef>(
            "SELECT id, name FROM categories WHERE lower(name) = lower($1) LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(category) = existing {
            return Ok(category);
        }

        // A concurrent insert of the same name resolves to the stored row.
        let category = sqlx::query_as::<_, CategoryRef>(
            "INSERT INTO categories (name) VALUES ($1)
             ON CONFLICT ((lower(name))) DO UPDATE SET name = categories.name
             RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(category)
    }

    async fn upsert_events(&self, batch: &[EventRecord]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for record in batch {
            let event = &record.event;
            sqlx::query(
                "INSERT INTO events (id, name, url, distance, image_url, address)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT (id) DO UPDATE
                 SET name = EXCLUDED.name,
                     url = EXCLUDED.url,
                     distance = EXCLUDED.distance,
                     image_url = EXCLUDED.image_url,
                     address = EXCLUDED.address",
            )
            .bind(&event.id)
            .bind(&event.name)
            .bind(&event.url)
            .bind(event.distance)
            .bind(&event.image_url)
            .bind(&event.address)
            .execute(&mut *tx)
            .await?;

            sqlx::query("DELETE FROM event_categories WHERE event_id = $1")
                .bind(&event.id)
                .execute(&mut *tx)
                .await?;

            for category in &record.categories {
                sqlx::query(
                    "INSERT INTO event_categories (event_id, category_id) VALUES ($1, $2)
                     ON CONFLICT DO NOTHING",
                )
                .bind(&event.id)
                .bind(category.id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn add_favorite(&self, user_id: &str, event_id: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO user_favorites (user_id, event_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(event_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_favorite(&self, user_id: &str, event_id: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM user_favorites WHERE user_id = $1 AND event_id = $2")
            .bind(user_id)
            .bind(event_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
