//! In-memory stores for local development and tests

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::RwLock;
use time::OffsetDateTime;
use widgetgate_shared::{
    EventRecord, EventSummary, LeadRecord, NewEvent, NewLead, StoreError, StoreResult,
    TenantConfigUpdate, TenantRecord,
};

use super::{EventStore, LeadStore, TenantStore};

/// Tenant records in a concurrent map; updates lock only their own entry
#[derive(Default)]
pub struct MemoryTenantStore {
    records: DashMap<String, TenantRecord>,
}

impl MemoryTenantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl TenantStore for MemoryTenantStore {
    async fn find_project_by_domain(&self, domain: &str) -> StoreResult<Option<String>> {
        Ok(self
            .records
            .iter()
            .find(|entry| entry.domains.iter().any(|d| d == domain))
            .map(|entry| entry.project_id.clone()))
    }

    async fn get(&self, project_id: &str) -> StoreResult<Option<TenantRecord>> {
        Ok(self.records.get(project_id).map(|r| r.clone()))
    }

    async fn upsert(
        &self,
        project_id: &str,
        update: &TenantConfigUpdate,
    ) -> StoreResult<TenantRecord> {
        let now = OffsetDateTime::now_utc();
        let mut entry = self
            .records
            .entry(project_id.to_string())
            .or_insert_with(|| {
                let mut record = TenantRecord::default_for(project_id);
                record.created_at = Some(now);
                record
            });

        entry.apply(update);
        entry.updated_at = Some(now);
        Ok(entry.clone())
    }
}

/// Events appended to a vector
#[derive(Default)]
pub struct MemoryEventStore {
    events: RwLock<Vec<EventRecord>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("event store lock poisoned".to_string())
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn record(&self, event: NewEvent) -> StoreResult<EventRecord> {
        let record = EventRecord::from_new(event);
        self.events.write().map_err(poisoned)?.push(record.clone());
        Ok(record)
    }

    async fn summary(&self) -> StoreResult<EventSummary> {
        let events = self.events.read().map_err(poisoned)?;
        let mut summary = EventSummary::default();
        for e in events.iter() {
            summary.add(&e.event_type, &e.project_id, 1);
        }
        Ok(summary)
    }
}

/// Lead documents kept in submission order
#[derive(Default)]
pub struct MemoryLeadStore {
    leads: RwLock<Vec<LeadRecord>>,
}

impl MemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<LeadRecord> {
        self.leads.read().map(|l| l.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LeadStore for MemoryLeadStore {
    async fn submit(&self, lead: NewLead) -> StoreResult<LeadRecord> {
        let record = LeadRecord::from_new(lead);
        self.leads
            .write()
            .map_err(|_| StoreError::Unavailable("lead store lock poisoned".to_string()))?
            .push(record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_upsert_creates_then_merges() {
        let store = MemoryTenantStore::new();

        let created = store
            .upsert(
                "5796",
                &TenantConfigUpdate {
                    agent_name: Some("Riya".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(created.agent_name.as_deref(), Some("Riya"));
        assert!(created.created_at.is_some());

        let merged = store
            .upsert(
                "5796",
                &TenantConfigUpdate {
                    primary_color: Some("#000000".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(merged.agent_name.as_deref(), Some("Riya"));
        assert_eq!(merged.primary_color, "#000000");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_find_project_by_domain() {
        let store = MemoryTenantStore::new();
        store
            .upsert(
                "5797",
                &TenantConfigUpdate {
                    domains: Some(vec!["WWW.Nivasa.com".to_string()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(
            store.find_project_by_domain("nivasa.com").await.unwrap(),
            Some("5797".to_string())
        );
        assert_eq!(store.find_project_by_domain("other.com").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_concurrent_upserts_for_different_projects() {
        let store = Arc::new(MemoryTenantStore::new());
        let mut handles = Vec::new();
        for i in 0..20 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .upsert(
                        &format!("p{}", i),
                        &TenantConfigUpdate {
                            agent_name: Some(format!("agent{}", i)),
                            ..Default::default()
                        },
                    )
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(store.len(), 20);
        let p7 = store.get("p7").await.unwrap().unwrap();
        assert_eq!(p7.agent_name.as_deref(), Some("agent7"));
    }

    #[tokio::test]
    async fn test_event_summary() {
        let store = MemoryEventStore::new();
        for t in ["open", "open", "lead"] {
            store
                .record(NewEvent {
                    event_type: t.to_string(),
                    project_id: "p1".to_string(),
                    microsite: None,
                    payload: None,
                })
                .await
                .unwrap();
        }
        let summary = store.summary().await.unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.by_type.get("open"), Some(&2));
    }

    #[tokio::test]
    async fn test_lead_submit() {
        let store = MemoryLeadStore::new();
        let lead = store
            .submit(NewLead {
                microsite: "lodha.com".to_string(),
                project_id: None,
                document: json!({"bhkType": "2 BHK"}),
            })
            .await
            .unwrap();
        assert_eq!(lead.microsite, "lodha.com");
        assert_eq!(store.all().len(), 1);
    }
}
