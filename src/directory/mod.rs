//! User directory
//!
//! Lookup and update of user records keyed by the stable sender identifier.
//! In-memory backend for development; Postgres backend selected by
//! DATABASE_URL, with lazy pool creation and schema bootstrap on first use.

use crate::error::AssistantError;
use crate::models::{Priority, UserRecord};
use crate::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::{info, warn};

/// Partial update applied to one record: replace fields that are `Some`,
/// append `push_query` to the query history.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub priority: Option<Priority>,
    pub last_ai_response: Option<String>,
    pub push_query: Option<String>,
}

/// Trait for user record persistence
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find(&self, external_id: &str) -> Result<Option<UserRecord>>;
    async fn create(&self, record: UserRecord) -> Result<()>;
    async fn update(&self, external_id: &str, patch: UserPatch) -> Result<()>;
}

fn apply_patch(record: &mut UserRecord, patch: UserPatch) {
    if let Some(priority) = patch.priority {
        record.priority = priority;
    }
    if let Some(response) = patch.last_ai_response {
        record.last_ai_response = Some(response);
    }
    if let Some(query) = patch.push_query {
        record.previous_queries.push(query);
    }
}

//
// ================= In-Memory Backend =================
//

/// In-memory user directory for development and tests
pub struct InMemoryUserDirectory {
    records: Arc<RwLock<HashMap<String, UserRecord>>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find(&self, external_id: &str) -> Result<Option<UserRecord>> {
        let records = self.records.read().await;
        Ok(records.get(external_id).cloned())
    }

    async fn create(&self, record: UserRecord) -> Result<()> {
        let mut records = self.records.write().await;
        records.insert(record.external_id.clone(), record);
        Ok(())
    }

    async fn update(&self, external_id: &str, patch: UserPatch) -> Result<()> {
        let mut records = self.records.write().await;
        let record = records.get_mut(external_id).ok_or_else(|| {
            AssistantError::DirectoryError(format!("Unknown user: {}", external_id))
        })?;
        apply_patch(record, patch);
        Ok(())
    }
}

//
// ================= Postgres Backend =================
//

/// Postgres-backed user directory. The record is stored as one JSONB
/// document per external id, so the persisted field names match the wire
/// layout of the models exactly.
pub struct PgUserDirectory {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
}

impl PgUserDirectory {
    pub fn connect_lazy(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(5).connect_lazy(url)?;

        Ok(Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
        })
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS users (
                      external_id TEXT PRIMARY KEY,
                      record JSONB NOT NULL
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                Ok::<(), sqlx::Error>(())
            })
            .await?;

        Ok(())
    }

    async fn load(&self, external_id: &str) -> Result<Option<UserRecord>> {
        let row = sqlx::query("SELECT record FROM users WHERE external_id = $1")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let value: serde_json::Value = row.try_get("record")?;
        let record = serde_json::from_value(value)?;
        Ok(Some(record))
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find(&self, external_id: &str) -> Result<Option<UserRecord>> {
        self.ensure_schema().await?;
        self.load(external_id).await
    }

    async fn create(&self, record: UserRecord) -> Result<()> {
        self.ensure_schema().await?;

        let value = serde_json::to_value(&record)?;
        sqlx::query(
            "INSERT INTO users (external_id, record) VALUES ($1, $2) \
             ON CONFLICT (external_id) DO NOTHING",
        )
        .bind(&record.external_id)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, external_id: &str, patch: UserPatch) -> Result<()> {
        self.ensure_schema().await?;

        // Read-modify-write; concurrent updates to the same sender may lose
        // a history append, which the concurrency model permits.
        let mut record = self.load(external_id).await?.ok_or_else(|| {
            AssistantError::DirectoryError(format!("Unknown user: {}", external_id))
        })?;
        apply_patch(&mut record, patch);

        let value = serde_json::to_value(&record)?;
        sqlx::query("UPDATE users SET record = $2 WHERE external_id = $1")
            .bind(external_id)
            .bind(value)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Pick the directory backend from the environment: Postgres when
/// DATABASE_URL is set and the pool can be built, in-memory otherwise.
pub fn from_env() -> Arc<dyn UserDirectory> {
    if let Ok(url) = env::var("DATABASE_URL") {
        match PgUserDirectory::connect_lazy(&url) {
            Ok(directory) => {
                info!("User directory backend: postgres");
                return Arc::new(directory);
            }
            Err(error) => {
                warn!(
                    "Failed to initialize postgres directory, falling back to in-memory: {}",
                    error
                );
            }
        }
    }

    info!("User directory backend: in-memory");
    Arc::new(InMemoryUserDirectory::new())
}
