use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::migrate::MigrateError;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::configuration::DatabaseSettings;
use crate::domain::{EmailSubscription, SubscriberEmail};
use crate::store::{StoreError, StoreStatus, SubscriptionStore};

pub struct PostgresStore {
    pool: Pool<Postgres>,
}

#[derive(sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    email: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for EmailSubscription {
    type Error = anyhow::Error;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let email = SubscriberEmail::parse(row.email.clone())
            .with_context(|| format!("Stored email {} is not valid", row.email))?;

        Ok(Self {
            id: row.id,
            email,
            created_at: row.created_at,
        })
    }
}

impl PostgresStore {
    /// Connects eagerly: fails if the database cannot be reached.
    #[tracing::instrument(name = "Connecting to Postgres", skip(settings))]
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .acquire_timeout(settings.acquire_timeout())
            .connect(settings.connection_string().expose_secret())
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl SubscriptionStore for PostgresStore {
    #[tracing::instrument(name = "Looking up an email in the database", skip(self, email))]
    async fn find_by_email(
        &self,
        email: &SubscriberEmail,
    ) -> Result<Option<EmailSubscription>, StoreError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"SELECT id, email, created_at FROM emails WHERE email = $1"#,
        )
        .bind(email.as_ref())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to look up an email")?;

        Ok(row.map(EmailSubscription::try_from).transpose()?)
    }

    #[tracing::instrument(name = "Saving new email in the database", skip(self, subscription))]
    async fn insert(&self, subscription: &EmailSubscription) -> Result<(), StoreError> {
        sqlx::query(
            r#"
                INSERT INTO emails (id, email, created_at)
                VALUES ($1, $2, $3)
            "#,
        )
        .bind(subscription.id)
        .bind(subscription.email.as_ref())
        .bind(subscription.created_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            tracing::error!("Failed to execute query: {:?}", error);
            classify_insert_error(error, &subscription.email)
        })?;

        Ok(())
    }

    #[tracing::instrument(name = "Counting stored emails", skip(self))]
    async fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM emails"#)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count stored emails")?;

        Ok(u64::try_from(count).context("Email count out of range")?)
    }

    async fn status(&self) -> StoreStatus {
        if self.pool.is_closed() {
            return StoreStatus::Disconnected;
        }

        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => StoreStatus::Connected,
            Err(error) => {
                tracing::warn!(error.cause_chain = ?error, "Postgres is unreachable");
                StoreStatus::Disconnected
            }
        }
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

fn classify_insert_error(error: sqlx::Error, email: &SubscriberEmail) -> StoreError {
    if let Some(db_error) = error.as_database_error() {
        if db_error.is_unique_violation() {
            return StoreError::Duplicate(email.as_ref().to_string());
        }
        if db_error.is_check_violation() {
            return StoreError::Rejected(db_error.message().to_string());
        }
    }

    StoreError::Unexpected(
        anyhow::Error::new(error).context("Failed to insert new email in the database"),
    )
}
