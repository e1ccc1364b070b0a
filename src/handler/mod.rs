//! Request handler module
//!
//! A handler is the per-route unit of request logic. The dispatcher resolves
//! one per request through the [`HandlerRegistry`], gates it on its
//! activation flag, runs [`Handler::process`] and finally renders whatever
//! view the handler selected.
//!
//! Concrete handlers embed a [`HandlerCore`] and expose it through
//! [`Handler::core`]/[`Handler::core_mut`]; everything except `process`
//! has a default implementation on top of it.

pub mod builtin;
pub mod registry;

pub use builtin::{DefaultHandler, ErrorHandler};
pub use registry::{HandlerFactory, HandlerRegistry};

use crate::dispatcher::Flow;
use crate::request::QueryParams;
use crate::view::{Page, RenderError, Renderer, ViewContext, ViewLayout};

/// State shared by every handler
#[derive(Debug, Clone)]
pub struct HandlerCore {
    name: String,
    view: Option<String>,
    active: bool,
    status: u16,
    /// Data handed to the view at render time
    pub context: ViewContext,
}

impl HandlerCore {
    /// Core of a handler that serves requests
    pub fn new() -> Self {
        Self::with_active(true)
    }

    /// Core with an explicit activation flag
    pub fn with_active(active: bool) -> Self {
        Self {
            name: String::new(),
            view: None,
            active,
            status: 200,
            context: ViewContext::default(),
        }
    }

    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response status used when the view is rendered
    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }
}

impl Default for HandlerCore {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-route request logic
pub trait Handler {
    fn core(&self) -> &HandlerCore;

    fn core_mut(&mut self) -> &mut HandlerCore;

    /// Handle the request
    ///
    /// `params` are the path segments after the handler name, `query` the
    /// decoded query string. Returning [`ControlFlow::Break`] reroutes the
    /// client and skips rendering.
    ///
    /// [`ControlFlow::Break`]: std::ops::ControlFlow::Break
    fn process(&mut self, params: &[String], query: &QueryParams) -> Flow;

    fn is_active(&self) -> bool {
        self.core().active
    }

    /// Switch the handler off for this request
    fn deactivate(&mut self) {
        self.core_mut().active = false;
    }

    /// Resolved handler name, empty until the dispatcher records it
    fn name(&self) -> &str {
        &self.core().name
    }

    fn set_name(&mut self, name: &str) {
        name.clone_into(&mut self.core_mut().name);
    }

    fn set_view(&mut self, view: &str) {
        self.core_mut().view = Some(view.to_string());
    }

    fn view(&self) -> Option<&str> {
        self.core().view.as_deref()
    }

    /// Render the selected view
    ///
    /// Returns `Ok(None)` when no view was set. The template is looked up
    /// under the handler's resolved name and receives the merged
    /// [`ViewContext`].
    fn write_view(
        &self,
        layout: &ViewLayout,
        renderer: &dyn Renderer,
    ) -> Result<Option<Page>, RenderError> {
        let core = self.core();
        let Some(view) = core.view.as_deref() else {
            return Ok(None);
        };

        let path = layout.path_for(&core.name, view);
        let body = renderer.render(&path, &core.context.merged())?;
        Ok(Some(Page {
            status: core.status,
            body,
        }))
    }
}
