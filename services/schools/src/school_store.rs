use crate::config::DatabaseConfig;
use crate::models::{NewSchool, School};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

/// Errors returned by a [`SchoolStore`]
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("School {0} not found")]
    NotFound(i64),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence for school records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SchoolStore: Send + Sync {
    /// Insert a record; the store assigns `id`, `created_at` and `updated_at`.
    async fn create(&self, school: &NewSchool) -> Result<School, StoreError>;

    /// All records, most recently created first.
    async fn list(&self) -> Result<Vec<School>, StoreError>;

    /// Remove the record with the given id.
    async fn delete_by_id(&self, id: i64) -> Result<(), StoreError>;

    /// Connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// PostgreSQL-backed school store
pub struct PgSchoolStore {
    pool: PgPool,
}

impl PgSchoolStore {
    /// Create a new store with a connection pool
    pub async fn new(url: &str, config: &DatabaseConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout())
            .idle_timeout(Some(config.idle_timeout()))
            .connect(url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        info!("Connected to PostgreSQL database");

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run migrations")?;

        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl SchoolStore for PgSchoolStore {
    #[instrument(skip(self, school), fields(name = %school.name))]
    async fn create(&self, school: &NewSchool) -> Result<School, StoreError> {
        let created = sqlx::query_as::<_, School>(
            r#"
            INSERT INTO schools (
                name, address, city, state, contact, email_id, image,
                created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7,
                clock_timestamp(), clock_timestamp()
            )
            RETURNING id, name, address, city, state, contact, email_id, image,
                      created_at, updated_at
            "#,
        )
        .bind(&school.name)
        .bind(&school.address)
        .bind(&school.city)
        .bind(&school.state)
        .bind(&school.contact)
        .bind(&school.email_id)
        .bind(&school.image)
        .fetch_one(&self.pool)
        .await?;

        debug!(id = created.id, "School inserted");

        Ok(created)
    }

    async fn list(&self) -> Result<Vec<School>, StoreError> {
        let schools = sqlx::query_as::<_, School>(
            r#"
            SELECT id, name, address, city, state, contact, email_id, image,
                   created_at, updated_at
            FROM schools
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(schools)
    }

    #[instrument(skip(self))]
    async fn delete_by_id(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM schools WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }

        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// In-process store used for local development and tests
#[derive(Debug, Default)]
pub struct MemorySchoolStore {
    inner: RwLock<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    last_created: Option<DateTime<Utc>>,
    schools: Vec<School>,
}

impl MemorySchoolStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.inner.read().await.schools.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SchoolStore for MemorySchoolStore {
    async fn create(&self, school: &NewSchool) -> Result<School, StoreError> {
        let mut state = self.inner.write().await;

        // Keep creation times strictly increasing even within one clock tick
        let mut created_at = Utc::now();
        if let Some(last) = state.last_created {
            if created_at <= last {
                created_at = last + ChronoDuration::microseconds(1);
            }
        }
        state.last_created = Some(created_at);
        state.next_id += 1;

        let created = School {
            id: state.next_id,
            name: school.name.clone(),
            address: school.address.clone(),
            city: school.city.clone(),
            state: school.state.clone(),
            contact: school.contact.clone(),
            email_id: school.email_id.clone(),
            image: school.image.clone(),
            created_at,
            updated_at: created_at,
        };
        state.schools.push(created.clone());

        Ok(created)
    }

    async fn list(&self) -> Result<Vec<School>, StoreError> {
        let state = self.inner.read().await;
        let mut schools = state.schools.clone();
        schools.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(schools)
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), StoreError> {
        let mut state = self.inner.write().await;
        let position = state
            .schools
            .iter()
            .position(|s| s.id == id)
            .ok_or(StoreError::NotFound(id))?;
        state.schools.remove(position);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
