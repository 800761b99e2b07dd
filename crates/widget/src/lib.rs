//! widgetgate widget client
//!
//! Bootstraps an embedded chat widget: works out which project the page
//! belongs to, loads the project's theme, reports page metadata back and
//! mounts the UI through a host-provided [`RenderSurface`].

pub mod bootstrap;
pub mod client;
pub mod error;
pub mod events;
pub mod options;
pub mod page;
pub mod registry;
pub mod theme;

pub use bootstrap::{BootstrapHandle, BootstrapState, Bootstrapper};
pub use client::{DomainLookup, WidgetClient, DEFAULT_REQUEST_TIMEOUT};
pub use error::{BootstrapError, ClientError, RenderError};
pub use events::EventDispatcher;
pub use options::{BuildDefaults, EmbedAttributes, WidgetOptions};
pub use page::{Boundary, HostPage, RenderSurface, WidgetProps};
pub use registry::{Widget, WidgetIdentity, WidgetRegistry};
pub use theme::{PartialTheme, WidgetTheme};
