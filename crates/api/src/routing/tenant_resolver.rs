//! Domain-to-Tenant Resolution
//!
//! Resolves a normalized domain to a project id through an ordered chain
//! of strategies. The first strategy that matches wins; when none do, the
//! domain itself becomes the project id. Supports:
//! - Static map: pinned domains from deployment configuration
//! - Store lookup: tenant records whose domain set contains the domain
//! - Auto-detection: the normalized domain as project id

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use widgetgate_shared::{
    normalize_domain, ResolutionResult, ResolutionSource, StoreError, TenantConfigUpdate,
    TenantRecord,
};

use crate::store::TenantStore;

/// One step of the resolution chain
#[async_trait]
pub trait ResolverStrategy: Send + Sync {
    /// Provenance reported when this strategy matches
    fn source(&self) -> ResolutionSource;

    /// Returns the project id for `domain`, or None to fall through.
    /// Strategies never fail: degradations are logged and reported as no match.
    async fn lookup(&self, domain: &str) -> Option<String>;
}

/// In-process exact-match table of normalized domain -> project id
pub struct StaticMapStrategy {
    map: HashMap<String, String>,
}

impl StaticMapStrategy {
    pub fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }
}

#[async_trait]
impl ResolverStrategy for StaticMapStrategy {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::StaticMap
    }

    async fn lookup(&self, domain: &str) -> Option<String> {
        self.map.get(domain).cloned()
    }
}

/// Persisted lookup with a bounded timeout
pub struct StoreLookupStrategy {
    store: Arc<dyn TenantStore>,
    timeout: Duration,
}

impl StoreLookupStrategy {
    pub fn new(store: Arc<dyn TenantStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }
}

#[async_trait]
impl ResolverStrategy for StoreLookupStrategy {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::Database
    }

    async fn lookup(&self, domain: &str) -> Option<String> {
        match with_timeout(self.timeout, self.store.find_project_by_domain(domain)).await {
            Ok(project_id) => project_id,
            Err(e) => {
                tracing::warn!(
                    domain = %domain,
                    error = %e,
                    "Tenant store lookup failed, falling back to auto-detection"
                );
                None
            }
        }
    }
}

async fn with_timeout<T>(
    timeout: Duration,
    fut: impl std::future::Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(
            u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        )),
    }
}

/// Tenant resolver: the read path (`resolve`, `get_tenant_config`) and the
/// companion write path (`upsert_tenant_config`)
#[derive(Clone)]
pub struct TenantResolver {
    strategies: Arc<Vec<Box<dyn ResolverStrategy>>>,
    store: Arc<dyn TenantStore>,
    timeout: Duration,
}

impl TenantResolver {
    /// Standard chain: static map, then the store, then auto-detection
    pub fn new(
        static_map: HashMap<String, String>,
        store: Arc<dyn TenantStore>,
        timeout: Duration,
    ) -> Self {
        let strategies: Vec<Box<dyn ResolverStrategy>> = vec![
            Box::new(StaticMapStrategy::new(static_map)),
            Box::new(StoreLookupStrategy::new(Arc::clone(&store), timeout)),
        ];
        Self::with_strategies(strategies, store, timeout)
    }

    /// Custom chain, evaluated in order
    pub fn with_strategies(
        strategies: Vec<Box<dyn ResolverStrategy>>,
        store: Arc<dyn TenantStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            strategies: Arc::new(strategies),
            store,
            timeout,
        }
    }

    /// Resolve an already-normalized domain. Never fails; a non-empty input
    /// always yields a non-empty project id.
    pub async fn resolve(&self, domain: &str) -> ResolutionResult {
        for strategy in self.strategies.iter() {
            if let Some(project_id) = strategy.lookup(domain).await {
                if project_id.is_empty() {
                    continue;
                }
                tracing::debug!(
                    domain = %domain,
                    project_id = %project_id,
                    source = %strategy.source(),
                    "Resolved tenant"
                );
                return ResolutionResult {
                    project_id,
                    domain: domain.to_string(),
                    source: strategy.source(),
                };
            }
        }

        ResolutionResult {
            project_id: domain.to_string(),
            domain: domain.to_string(),
            source: ResolutionSource::AutoDetected,
        }
    }

    /// Normalize then resolve. None when the raw input normalizes to nothing.
    pub async fn resolve_raw(&self, raw: &str) -> Option<ResolutionResult> {
        let domain = normalize_domain(raw)?;
        Some(self.resolve(&domain).await)
    }

    /// Stored config for `project_id`, or the default record on any failure
    pub async fn get_tenant_config(&self, project_id: &str) -> TenantRecord {
        match with_timeout(self.timeout, self.store.get(project_id)).await {
            Ok(Some(record)) => record,
            Ok(None) => TenantRecord::default_for(project_id),
            Err(e) => {
                tracing::warn!(
                    project_id = %project_id,
                    error = %e,
                    "Tenant config read failed, serving default record"
                );
                TenantRecord::default_for(project_id)
            }
        }
    }

    /// Merge a partial update into the stored record, creating it if absent
    pub async fn upsert_tenant_config(
        &self,
        project_id: &str,
        update: &TenantConfigUpdate,
    ) -> Result<TenantRecord, StoreError> {
        let record = self.store.upsert(project_id, update).await?;
        tracing::info!(project_id = %project_id, "Tenant config updated");
        Ok(record)
    }

    /// Store health for readiness probes
    pub async fn ping(&self) -> Result<(), StoreError> {
        with_timeout(self.timeout, self.store.ping()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTenantStore;
    use widgetgate_shared::{StoreResult, DEFAULT_PRIMARY_COLOR};

    /// Store that always fails or hangs
    struct BrokenStore {
        hang: bool,
    }

    #[async_trait]
    impl TenantStore for BrokenStore {
        async fn find_project_by_domain(&self, _domain: &str) -> StoreResult<Option<String>> {
            if self.hang {
                std::future::pending::<()>().await;
            }
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn get(&self, _project_id: &str) -> StoreResult<Option<TenantRecord>> {
            if self.hang {
                std::future::pending::<()>().await;
            }
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn upsert(
            &self,
            _project_id: &str,
            _update: &TenantConfigUpdate,
        ) -> StoreResult<TenantRecord> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    fn resolver(map: &[(&str, &str)], store: Arc<dyn TenantStore>) -> TenantResolver {
        let map = map
            .iter()
            .map(|(d, p)| (d.to_string(), p.to_string()))
            .collect();
        TenantResolver::new(map, store, Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_auto_detected_when_nothing_matches() {
        let resolver = resolver(&[], Arc::new(MemoryTenantStore::new()));
        let result = resolver.resolve("example.com").await;
        assert_eq!(result.project_id, "example.com");
        assert_eq!(result.domain, "example.com");
        assert_eq!(result.source, ResolutionSource::AutoDetected);
    }

    #[tokio::test]
    async fn test_static_map_wins_over_store() {
        let store = Arc::new(MemoryTenantStore::new());
        store
            .upsert(
                "from-store",
                &TenantConfigUpdate {
                    domains: Some(vec!["lodha.com".to_string()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let resolver = resolver(&[("lodha.com", "5796")], store);
        let result = resolver.resolve("lodha.com").await;
        assert_eq!(result.project_id, "5796");
        assert_eq!(result.source, ResolutionSource::StaticMap);
    }

    #[tokio::test]
    async fn test_store_match_regardless_of_input_form() {
        let store = Arc::new(MemoryTenantStore::new());
        store
            .upsert(
                "5797",
                &TenantConfigUpdate {
                    domains: Some(vec!["https://www.Nivasa.com/".to_string()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let resolver = resolver(&[], store);

        for raw in ["nivasa.com", "HTTP://NIVASA.COM", "www.nivasa.com/", "  Nivasa.com "] {
            let result = resolver.resolve_raw(raw).await.unwrap();
            assert_eq!(result.project_id, "5797", "input {:?}", raw);
            assert_eq!(result.source, ResolutionSource::Database);
        }
    }

    #[tokio::test]
    async fn test_store_failure_degrades_to_auto_detected() {
        let resolver = resolver(&[], Arc::new(BrokenStore { hang: false }));
        let result = resolver.resolve("example.com").await;
        assert_eq!(result.source, ResolutionSource::AutoDetected);
    }

    #[tokio::test]
    async fn test_store_timeout_degrades_to_auto_detected() {
        let resolver = resolver(&[], Arc::new(BrokenStore { hang: true }));
        let result = resolver.resolve("slow.example.com").await;
        assert_eq!(result.project_id, "slow.example.com");
        assert_eq!(result.source, ResolutionSource::AutoDetected);
    }

    #[tokio::test]
    async fn test_resolve_raw_rejects_empty() {
        let resolver = resolver(&[], Arc::new(MemoryTenantStore::new()));
        assert!(resolver.resolve_raw("https://www./").await.is_none());
        assert!(resolver.resolve_raw("   ").await.is_none());
    }

    #[tokio::test]
    async fn test_get_tenant_config_never_errors() {
        let resolver = resolver(&[], Arc::new(BrokenStore { hang: true }));
        let record = resolver.get_tenant_config("5796").await;
        assert_eq!(record.project_id, "5796");
        assert_eq!(record.primary_color, DEFAULT_PRIMARY_COLOR);
        assert!(record.property_info.is_empty());

        let resolver = self::resolver(&[], Arc::new(MemoryTenantStore::new()));
        let record = resolver.get_tenant_config("missing").await;
        assert_eq!(record.auto_open_delay_ms, 4000);
    }

    #[tokio::test]
    async fn test_upsert_surfaces_store_errors() {
        let resolver = resolver(&[], Arc::new(BrokenStore { hang: false }));
        let result = resolver
            .upsert_tenant_config("5796", &TenantConfigUpdate::default())
            .await;
        assert!(result.is_err());
    }
}
