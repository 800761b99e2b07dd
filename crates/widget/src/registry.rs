//! Mounted widget instances, one per project

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::{
    bootstrap::BootstrapHandle,
    page::{Boundary, RenderSurface},
    theme::WidgetTheme,
};

type Slots = Mutex<HashMap<String, Widget>>;

fn lock(slots: &Slots) -> MutexGuard<'_, HashMap<String, Widget>> {
    // The map holds no invariant a panicking holder could break
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Resolved identity of a mounted widget
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetIdentity {
    pub api_base_url: String,
    pub project_id: String,
    pub microsite: String,
    pub theme: WidgetTheme,
}

struct WidgetInner {
    identity: WidgetIdentity,
    boundary: Boundary,
    surface: Arc<dyn RenderSurface>,
    handle: BootstrapHandle,
    registry: Weak<Slots>,
    destroyed: AtomicBool,
}

/// A mounted widget. Clones refer to the same instance.
#[derive(Clone)]
pub struct Widget {
    inner: Arc<WidgetInner>,
}

impl Widget {
    pub(crate) fn new(
        identity: WidgetIdentity,
        boundary: Boundary,
        surface: Arc<dyn RenderSurface>,
        handle: BootstrapHandle,
        registry: &WidgetRegistry,
    ) -> Self {
        Self {
            inner: Arc::new(WidgetInner {
                identity,
                boundary,
                surface,
                handle,
                registry: Arc::downgrade(&registry.slots),
                destroyed: AtomicBool::new(false),
            }),
        }
    }

    pub fn identity(&self) -> &WidgetIdentity {
        &self.inner.identity
    }

    pub fn project_id(&self) -> &str {
        &self.inner.identity.project_id
    }

    pub fn handle(&self) -> &BootstrapHandle {
        &self.inner.handle
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }

    /// Same underlying instance
    pub fn ptr_eq(&self, other: &Widget) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Unmount, release the boundary and drop the registry entry. Repeat
    /// calls are no-ops.
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.inner.handle.cancel();
        self.inner.surface.release(&self.inner.boundary);

        if let Some(slots) = self.inner.registry.upgrade() {
            let mut widgets = lock(&slots);
            if widgets
                .get(self.project_id())
                .is_some_and(|current| current.ptr_eq(self))
            {
                widgets.remove(self.project_id());
            }
        }

        tracing::debug!(project_id = %self.project_id(), "Widget destroyed");
    }
}

/// Owned registry of mounted widgets keyed by project id.
///
/// Cloning shares the registry; independent registries never see each
/// other's widgets.
#[derive(Clone, Default)]
pub struct WidgetRegistry {
    slots: Arc<Slots>,
}

impl WidgetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, project_id: &str) -> Option<Widget> {
        lock(&self.slots).get(project_id).cloned()
    }

    pub fn contains(&self, project_id: &str) -> bool {
        lock(&self.slots).contains_key(project_id)
    }

    pub fn len(&self) -> usize {
        lock(&self.slots).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.slots).is_empty()
    }

    /// Return the widget mounted for `project_id`, or run `mount` and track
    /// its result. `mount` runs under the registry lock so two bootstraps
    /// for one project cannot both mount.
    pub(crate) fn get_or_mount<E>(
        &self,
        project_id: &str,
        mount: impl FnOnce() -> Result<Widget, E>,
    ) -> Result<Widget, E> {
        let mut widgets = lock(&self.slots);
        if let Some(existing) = widgets.get(project_id) {
            return Ok(existing.clone());
        }
        let widget = mount()?;
        widgets.insert(project_id.to_string(), widget.clone());
        Ok(widget)
    }

    /// Destroy every tracked widget
    pub fn destroy_all(&self) {
        let widgets: Vec<Widget> = lock(&self.slots).values().cloned().collect();
        for widget in widgets {
            widget.destroy();
        }
    }
}
