//! PostgreSQL-backed stores

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;
use widgetgate_shared::{
    EventRecord, EventSummary, LeadRecord, NewEvent, NewLead, PropertyInfo, StoreResult,
    TenantConfigUpdate, TenantRecord, DEFAULT_AUTO_OPEN_DELAY_MS, DEFAULT_PRIMARY_COLOR,
    DEFAULT_WELCOME_MESSAGE,
};

use super::{EventStore, LeadStore, TenantStore};

#[derive(Debug, sqlx::FromRow)]
struct WidgetConfigRow {
    project_id: String,
    domains: Vec<String>,
    agent_name: Option<String>,
    primary_color: Option<String>,
    welcome_message: Option<String>,
    auto_open_delay_ms: Option<i64>,
    property_info: Value,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<WidgetConfigRow> for TenantRecord {
    fn from(row: WidgetConfigRow) -> Self {
        let property_info = match row.property_info {
            Value::Object(map) => map,
            _ => PropertyInfo::new(),
        };
        Self {
            project_id: row.project_id,
            domains: row.domains,
            agent_name: row.agent_name,
            primary_color: row
                .primary_color
                .unwrap_or_else(|| DEFAULT_PRIMARY_COLOR.to_string()),
            welcome_message: row
                .welcome_message
                .unwrap_or_else(|| DEFAULT_WELCOME_MESSAGE.to_string()),
            auto_open_delay_ms: row
                .auto_open_delay_ms
                .and_then(|ms| u64::try_from(ms).ok())
                .unwrap_or(DEFAULT_AUTO_OPEN_DELAY_MS),
            property_info,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        }
    }
}

const WIDGET_CONFIG_COLUMNS: &str = "project_id, domains, agent_name, primary_color, \
     welcome_message, auto_open_delay_ms, property_info, created_at, updated_at";

#[derive(Clone)]
pub struct PgTenantStore {
    pool: PgPool,
}

impl PgTenantStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantStore for PgTenantStore {
    async fn find_project_by_domain(&self, domain: &str) -> StoreResult<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT project_id FROM widget_configs WHERE domains @> ARRAY[$1]::text[] \
             ORDER BY updated_at DESC LIMIT 1",
        )
        .bind(domain)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(project_id,)| project_id))
    }

    async fn get(&self, project_id: &str) -> StoreResult<Option<TenantRecord>> {
        let row: Option<WidgetConfigRow> = sqlx::query_as(&format!(
            "SELECT {} FROM widget_configs WHERE project_id = $1",
            WIDGET_CONFIG_COLUMNS
        ))
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(TenantRecord::from))
    }

    async fn upsert(
        &self,
        project_id: &str,
        update: &TenantConfigUpdate,
    ) -> StoreResult<TenantRecord> {
        // Single statement, per-column COALESCE: concurrent partial updates
        // are last-write-wins per field and never tear a row
        let sql = format!(
            r#"
            INSERT INTO widget_configs
                (project_id, domains, agent_name, primary_color, welcome_message,
                 auto_open_delay_ms, property_info)
            VALUES
                ($1, COALESCE($2::text[], '{{}}'::text[]), $3, $4, $5, $6::bigint,
                 COALESCE($7::jsonb, '{{}}'::jsonb))
            ON CONFLICT (project_id) DO UPDATE SET
                domains            = COALESCE($2::text[], widget_configs.domains),
                agent_name         = COALESCE($3, widget_configs.agent_name),
                primary_color      = COALESCE($4, widget_configs.primary_color),
                welcome_message    = COALESCE($5, widget_configs.welcome_message),
                auto_open_delay_ms = COALESCE($6::bigint, widget_configs.auto_open_delay_ms),
                property_info      = COALESCE($7::jsonb, widget_configs.property_info),
                updated_at         = NOW()
            RETURNING {}
            "#,
            WIDGET_CONFIG_COLUMNS
        );

        let row: WidgetConfigRow = sqlx::query_as(&sql)
            .bind(project_id)
            .bind(update.normalized_domains())
            .bind(update.agent_name.as_deref())
            .bind(update.primary_color.as_deref())
            .bind(update.welcome_message.as_deref())
            .bind(
                update
                    .auto_open_delay_ms
                    .map(|ms| i64::try_from(ms).unwrap_or(i64::MAX)),
            )
            .bind(update.property_info.clone().map(Value::Object))
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    event_type: String,
    project_id: String,
    microsite: Option<String>,
    payload: Value,
    created_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn record(&self, event: NewEvent) -> StoreResult<EventRecord> {
        let row: EventRow = sqlx::query_as(
            r#"
            INSERT INTO widget_events (id, event_type, project_id, microsite, payload)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, event_type, project_id, microsite, payload, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&event.event_type)
        .bind(&event.project_id)
        .bind(event.microsite.as_deref())
        .bind(Value::Object(event.payload.unwrap_or_default()))
        .fetch_one(&self.pool)
        .await?;

        Ok(EventRecord {
            id: row.id,
            event_type: row.event_type,
            project_id: row.project_id,
            microsite: row.microsite,
            payload: match row.payload {
                Value::Object(map) => map,
                _ => Default::default(),
            },
            created_at: row.created_at,
        })
    }

    async fn summary(&self) -> StoreResult<EventSummary> {
        let rows: Vec<(String, String, i64)> = sqlx::query_as(
            "SELECT event_type, project_id, COUNT(*) FROM widget_events \
             GROUP BY event_type, project_id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut summary = EventSummary::default();
        for (event_type, project_id, count) in rows {
            summary.add(&event_type, &project_id, u64::try_from(count).unwrap_or(0));
        }
        Ok(summary)
    }
}

#[derive(Clone)]
pub struct PgLeadStore {
    pool: PgPool,
}

impl PgLeadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeadStore for PgLeadStore {
    async fn submit(&self, lead: NewLead) -> StoreResult<LeadRecord> {
        let mut record = LeadRecord::from_new(lead);

        let (created_at,): (OffsetDateTime,) = sqlx::query_as(
            r#"
            INSERT INTO leads (id, microsite, project_id, document)
            VALUES ($1, $2, $3, $4)
            RETURNING created_at
            "#,
        )
        .bind(record.id)
        .bind(&record.microsite)
        .bind(record.project_id.as_deref())
        .bind(&record.document)
        .fetch_one(&self.pool)
        .await?;

        record.created_at = created_at;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = widgetgate_shared::db::create_pool(&url, 2)
            .await
            .expect("Failed to create pool");
        widgetgate_shared::db::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        pool
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_pg_upsert_and_domain_lookup() {
        let store = PgTenantStore::new(pool().await);
        let project_id = format!("test-{}", Uuid::new_v4());
        let domain = format!("{}.example.test", Uuid::new_v4());

        store
            .upsert(
                &project_id,
                &TenantConfigUpdate {
                    domains: Some(vec![format!("https://www.{}/", domain)]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let merged = store
            .upsert(
                &project_id,
                &TenantConfigUpdate {
                    property_info: Some(
                        json!({"projectName": "Skyline"}).as_object().unwrap().clone(),
                    ),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(merged.domains, vec![domain.clone()]);
        assert_eq!(merged.primary_color, DEFAULT_PRIMARY_COLOR);
        assert_eq!(
            store.find_project_by_domain(&domain).await.unwrap(),
            Some(project_id)
        );
    }
}
