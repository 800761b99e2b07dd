//! Tenant routing for widget embeds
//!
//! Turns the domain a widget is embedded on into a project id:
//! - Pinned domains: lodha.com -> 5796 from DOMAIN_PROJECT_MAP
//! - Registered domains: any domain listed on a stored widget config
//! - Everything else: the normalized domain itself

mod tenant_resolver;

pub use tenant_resolver::{
    ResolverStrategy, StaticMapStrategy, StoreLookupStrategy, TenantResolver,
};
