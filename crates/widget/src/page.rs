//! Collaborators provided by the page hosting the widget

use widgetgate_shared::PropertyInfo;

use crate::{error::RenderError, events::EventDispatcher, theme::WidgetTheme};

/// The page the widget is embedded in
pub trait HostPage: Send + Sync {
    /// Hostname of the current page, possibly empty
    fn hostname(&self) -> String;

    /// Listing metadata found on the page, if any
    fn detect_property(&self) -> Option<PropertyInfo>;
}

/// Isolated mount point attached by a [`RenderSurface`]. Styles do not cross
/// it in either direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    pub id: u64,
    /// The surface created the host element and removes it on release
    pub owns_host: bool,
}

/// Everything the chat UI needs to render
#[derive(Clone)]
pub struct WidgetProps {
    pub api_base_url: String,
    pub project_id: String,
    pub microsite: String,
    pub theme: WidgetTheme,
    pub events: EventDispatcher,
}

/// Where the chat UI is drawn
pub trait RenderSurface: Send + Sync {
    /// Attach a boundary to `target`, or to a freshly created host element
    fn attach_isolated(&self, target: Option<&str>) -> Result<Boundary, RenderError>;

    fn render(&self, boundary: &Boundary, props: WidgetProps) -> Result<(), RenderError>;

    /// Unmount the UI and detach the boundary
    fn release(&self, boundary: &Boundary);
}
