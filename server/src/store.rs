use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx_core::Error),
    #[error("stored value is not valid JSON for this key: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct StoredValue {
    value: serde_json::Value,
    updated_at: DateTime<Utc>,
}

/// Flat key-value persistence. Each map variant keeps its whole mapping list
/// under one key.
#[derive(Debug, Clone)]
pub enum KvStore {
    Memory(Arc<RwLock<HashMap<String, StoredValue>>>),
    Postgres(PgPool),
}

impl KvStore {
    pub fn memory() -> Self {
        Self::Memory(Arc::new(RwLock::new(HashMap::new())))
    }

    pub fn backend(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Postgres(_) => "postgres",
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let raw = match self {
            Self::Memory(map) => map.read().await.get(key).map(|v| v.value.clone()),
            Self::Postgres(pool) => {
                sqlx::query_scalar::<_, serde_json::Value>(
                    "SELECT value FROM kv_store WHERE key = $1",
                )
                .bind(key)
                .fetch_optional(pool)
                .await?
            }
        };
        match raw {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(value)?;
        match self {
            Self::Memory(map) => {
                map.write().await.insert(
                    key.to_owned(),
                    StoredValue {
                        value,
                        updated_at: Utc::now(),
                    },
                );
            }
            Self::Postgres(pool) => {
                sqlx::query(
                    "INSERT INTO kv_store (key, value, updated_at) VALUES ($1, $2, NOW()) \
                     ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
                )
                .bind(key)
                .bind(value)
                .execute(pool)
                .await?;
            }
        }
        Ok(())
    }

    pub async fn updated_at(&self, key: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        match self {
            Self::Memory(map) => Ok(map.read().await.get(key).map(|v| v.updated_at)),
            Self::Postgres(pool) => Ok(sqlx::query_scalar::<_, DateTime<Utc>>(
                "SELECT updated_at FROM kv_store WHERE key = $1",
            )
            .bind(key)
            .fetch_optional(pool)
            .await?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lavender_shared::{ColorMapping, ColorRegistry, MapVariant, Rgb};
    use sqlx::postgres::PgPoolOptions;

    fn sample() -> ColorRegistry {
        ColorRegistry::from_mappings(vec![
            ColorMapping::new("Hyderabad", Rgb::new(80, 40, 20)).expect("mapping"),
        ])
    }

    #[tokio::test]
    async fn memory_store_round_trips_registry() {
        let store = KvStore::memory();
        let key = MapVariant::PrincipalStates.storage_key();
        assert!(
            store
                .get_json::<ColorRegistry>(key)
                .await
                .expect("read empty")
                .is_none()
        );
        assert!(store.updated_at(key).await.expect("timestamp").is_none());

        store.set_json(key, &sample()).await.expect("write");
        let loaded: Option<ColorRegistry> = store.get_json(key).await.expect("read back");
        assert_eq!(loaded, Some(sample()));
        assert!(store.updated_at(key).await.expect("timestamp").is_some());
    }

    #[tokio::test]
    async fn legacy_lists_load_from_store() {
        let store = KvStore::memory();
        let key = MapVariant::Presidencies.storage_key();
        store
            .set_json(
                key,
                &serde_json::json!([{"state": "Bengal Presidency", "color": "180,240,190"}]),
            )
            .await
            .expect("write legacy list");
        let loaded: ColorRegistry = store
            .get_json(key)
            .await
            .expect("read legacy list")
            .expect("present");
        assert_eq!(
            loaded.lookup_by_color(Rgb::new(180, 240, 190)),
            vec!["Bengal Presidency".to_owned()]
        );
    }

    #[tokio::test]
    async fn malformed_value_is_reported() {
        let store = KvStore::memory();
        store
            .set_json("broken", &serde_json::json!({"not": "a list"}))
            .await
            .expect("write");
        let err = store
            .get_json::<ColorRegistry>("broken")
            .await
            .expect_err("object is not a mapping list");
        assert!(matches!(err, StoreError::Json(_)));
    }

    #[tokio::test]
    async fn postgres_store_round_trips_registry() {
        let Ok(database_url) = std::env::var("DATABASE_URL") else {
            eprintln!("Skipping postgres store test: DATABASE_URL is not set");
            return;
        };
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(&database_url)
            .await
            .expect("connect real postgres");
        crate::db_migrations::run(&pool)
            .await
            .expect("run migrations");

        let store = KvStore::Postgres(pool);
        let key = "test_principal_states_map_colors";
        store.set_json(key, &sample()).await.expect("write");
        let loaded: Option<ColorRegistry> = store.get_json(key).await.expect("read back");
        assert_eq!(loaded, Some(sample()));
        assert!(store.updated_at(key).await.expect("timestamp").is_some());
    }
}
