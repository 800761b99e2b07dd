//! Widget bootstrap
//!
//! `init` walks a widget from nothing to mounted:
//!
//! ```text
//! Unstarted -> ResolvingIdentity -> FetchingConfig -> DetectingPage -> Mounted -> Destroyed
//! ```
//!
//! Every network step degrades instead of failing: an unreachable API yields
//! the page host as project id and the built-in theme. The only errors are
//! cancellation, an unusable base URL and a surface that refuses to render.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::{
    client::{WidgetClient, DEFAULT_REQUEST_TIMEOUT},
    error::{BootstrapError, ClientError},
    events::EventDispatcher,
    options::{
        configured_project_id, resolve_api_base_url, resolve_microsite, BuildDefaults,
        EmbedAttributes, WidgetOptions, UNSET_PROJECT_ID,
    },
    page::{HostPage, RenderSurface, WidgetProps},
    registry::{Widget, WidgetIdentity, WidgetRegistry},
    theme::{PartialTheme, WidgetTheme},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Unstarted,
    ResolvingIdentity,
    FetchingConfig,
    DetectingPage,
    Mounted,
    Destroyed,
}

impl fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapState::Unstarted => write!(f, "unstarted"),
            BootstrapState::ResolvingIdentity => write!(f, "resolving_identity"),
            BootstrapState::FetchingConfig => write!(f, "fetching_config"),
            BootstrapState::DetectingPage => write!(f, "detecting_page"),
            BootstrapState::Mounted => write!(f, "mounted"),
            BootstrapState::Destroyed => write!(f, "destroyed"),
        }
    }
}

/// Liveness and progress of one bootstrap. Cancelling it stops the bootstrap
/// at its next step; results of in-flight requests are discarded.
#[derive(Clone)]
pub struct BootstrapHandle {
    alive: Arc<AtomicBool>,
    state: Arc<Mutex<BootstrapState>>,
}

impl Default for BootstrapHandle {
    fn default() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
            state: Arc::new(Mutex::new(BootstrapState::Unstarted)),
        }
    }
}

impl BootstrapHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> BootstrapState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        self.alive.store(false, Ordering::SeqCst);
        *state = BootstrapState::Destroyed;
    }

    fn ensure_alive(&self) -> Result<(), BootstrapError> {
        if self.is_alive() {
            Ok(())
        } else {
            Err(BootstrapError::Cancelled)
        }
    }

    fn advance(&self, next: BootstrapState) -> Result<(), BootstrapError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.is_alive() {
            return Err(BootstrapError::Cancelled);
        }
        tracing::trace!(from = %*state, to = %next, "Bootstrap state change");
        *state = next;
        Ok(())
    }
}

/// Entry point for mounting widgets into one page
pub struct Bootstrapper {
    page: Arc<dyn HostPage>,
    surface: Arc<dyn RenderSurface>,
    registry: WidgetRegistry,
    defaults: BuildDefaults,
    timeout: Duration,
}

impl Bootstrapper {
    pub fn new(
        page: Arc<dyn HostPage>,
        surface: Arc<dyn RenderSurface>,
        registry: WidgetRegistry,
    ) -> Self {
        Self {
            page,
            surface,
            registry,
            defaults: BuildDefaults::from_build_env(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_build_defaults(mut self, defaults: BuildDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Per-request timeout for API calls
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &WidgetRegistry {
        &self.registry
    }

    /// Script-tag boot: mounts unless the tag opted out with `data-auto-init="false"`
    pub async fn auto_init(
        &self,
        attributes: &EmbedAttributes,
    ) -> Option<Result<Widget, BootstrapError>> {
        if !attributes.should_auto_init() {
            return None;
        }
        Some(self.init(WidgetOptions::default(), attributes).await)
    }

    pub async fn init(
        &self,
        options: WidgetOptions,
        attributes: &EmbedAttributes,
    ) -> Result<Widget, BootstrapError> {
        self.init_with_handle(options, attributes, &BootstrapHandle::new())
            .await
    }

    /// Like [`init`](Self::init), observable and cancellable through `handle`
    pub async fn init_with_handle(
        &self,
        options: WidgetOptions,
        attributes: &EmbedAttributes,
        handle: &BootstrapHandle,
    ) -> Result<Widget, BootstrapError> {
        handle.advance(BootstrapState::ResolvingIdentity)?;

        let api_base_url = resolve_api_base_url(&options, attributes, &self.defaults);
        let client = WidgetClient::new(&api_base_url, self.timeout)?;
        let host = self.page.hostname();
        let microsite = resolve_microsite(&options, attributes, &host);

        let project_id = match configured_project_id(&options, attributes, &self.defaults) {
            Some(project_id) => project_id,
            None => {
                let project_id = resolve_remote_project_id(&client, &host).await;
                handle.ensure_alive()?;
                project_id
            }
        };
        tracing::info!(project_id = %project_id, microsite = %microsite, "Widget identity resolved");

        if let Some(existing) = self.registry.get(&project_id) {
            tracing::debug!(project_id = %project_id, "Widget already mounted, reusing it");
            handle.advance(BootstrapState::Mounted)?;
            return Ok(existing);
        }

        handle.advance(BootstrapState::FetchingConfig)?;
        let remote = match client.fetch_config(&project_id).await {
            Ok(remote) => remote,
            Err(e) => {
                tracing::warn!(project_id = %project_id, error = %e, "Using fallback theme");
                PartialTheme::default()
            }
        };

        handle.advance(BootstrapState::DetectingPage)?;
        let detected = self.page.detect_property().filter(|info| !info.is_empty());
        if let Some(info) = detected.clone() {
            let client = client.clone();
            let project_id = project_id.clone();
            tokio::spawn(async move {
                if let Err(e) = client.push_property_info(&project_id, &info).await {
                    tracing::debug!(project_id = %project_id, error = %e, "Could not save detected property");
                }
            });
        }

        let overrides = options.theme.clone().unwrap_or_default();
        let theme = WidgetTheme::merge(&overrides, detected.as_ref(), &remote);

        let identity = WidgetIdentity {
            api_base_url,
            project_id: project_id.clone(),
            microsite: microsite.clone(),
            theme,
        };
        let props = WidgetProps {
            api_base_url: identity.api_base_url.clone(),
            project_id: project_id.clone(),
            microsite: microsite.clone(),
            theme: identity.theme.clone(),
            events: EventDispatcher::new(client, project_id.clone(), microsite),
        };

        let widget = self.registry.get_or_mount(&project_id, || -> Result<Widget, BootstrapError> {
            handle.ensure_alive()?;
            let boundary = self.surface.attach_isolated(options.target.as_deref())?;
            let mounted = self
                .surface
                .render(&boundary, props)
                .map_err(BootstrapError::from)
                .and_then(|()| handle.advance(BootstrapState::Mounted));
            if let Err(e) = mounted {
                self.surface.release(&boundary);
                return Err(e);
            }
            Ok(Widget::new(
                identity,
                boundary,
                self.surface.clone(),
                handle.clone(),
                &self.registry,
            ))
        })?;

        // Lost a race with another bootstrap for the same project
        if handle.state() != BootstrapState::Mounted {
            handle.advance(BootstrapState::Mounted)?;
        }

        tracing::info!(project_id = %project_id, "Widget mounted");
        Ok(widget)
    }
}

/// Ask the API which project serves `host`. Never fails: without an answer
/// the host itself is the project id.
async fn resolve_remote_project_id(client: &WidgetClient, host: &str) -> String {
    let fallback = || {
        if host.is_empty() {
            UNSET_PROJECT_ID.to_string()
        } else {
            host.to_string()
        }
    };

    match client.resolve_domain(host).await {
        Ok(lookup) => {
            tracing::debug!(host = %host, source = ?lookup.source, "Project resolved from domain");
            lookup
                .project_id
                .filter(|project_id| !project_id.is_empty())
                .unwrap_or_else(fallback)
        }
        Err(ClientError::Status(status)) => {
            tracing::debug!(host = %host, status, "Domain lookup rejected, using host");
            fallback()
        }
        Err(e) => {
            tracing::warn!(host = %host, error = %e, "Domain lookup failed, using host");
            fallback()
        }
    }
}
