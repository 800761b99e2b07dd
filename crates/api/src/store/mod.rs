//! Persistence collaborators
//!
//! Tenant configs, analytics events and lead documents sit behind traits so
//! the gating and resolution layer never depends on a concrete backend.
//! `memory` backs local development and tests, `postgres` backs production.

mod memory;
mod postgres;

pub use memory::{MemoryEventStore, MemoryLeadStore, MemoryTenantStore};
pub use postgres::{PgEventStore, PgLeadStore, PgTenantStore};

use async_trait::async_trait;
use widgetgate_shared::{
    EventRecord, EventSummary, LeadRecord, NewEvent, NewLead, StoreResult, TenantConfigUpdate,
    TenantRecord,
};

/// Tenant records keyed by project id
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Project whose domain set contains the (already normalized) `domain`
    async fn find_project_by_domain(&self, domain: &str) -> StoreResult<Option<String>>;

    async fn get(&self, project_id: &str) -> StoreResult<Option<TenantRecord>>;

    /// Merge `update` into the record for `project_id`, creating it if absent
    async fn upsert(
        &self,
        project_id: &str,
        update: &TenantConfigUpdate,
    ) -> StoreResult<TenantRecord>;

    /// Cheap reachability check for readiness probes
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn record(&self, event: NewEvent) -> StoreResult<EventRecord>;

    async fn summary(&self) -> StoreResult<EventSummary>;
}

#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn submit(&self, lead: NewLead) -> StoreResult<LeadRecord>;
}
