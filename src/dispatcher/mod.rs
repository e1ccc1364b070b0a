//! Request dispatch module
//!
//! Runs one request through the pipeline:
//!
//! 1. parse the request target
//! 2. connect to the database (`error/500` on failure, except inside the
//!    `error` namespace where the failure is only logged)
//! 3. resolve the handler from the first segment (`error/404` on a miss)
//! 4. gate on the activation flag (`default` when inactive)
//! 5. run the handler with the remaining segments and the query map
//! 6. render the view the handler selected
//!
//! Every stage returns a [`Flow`]; a reroute short-circuits the rest.
//! A dispatcher-issued reroute is only sent when its target can be served:
//! a target in the request's own namespace, or one whose handler is missing
//! or disabled, would bounce the client between failing pages, so it is
//! answered with a bare status instead.

mod reroute;

pub use reroute::{reroute, DispatchError, Flow, Reroute};

use crate::config::{Config, DatabaseConfig};
use crate::database::{connector_for, Connection, Connector};
use crate::handler::{Handler, HandlerRegistry};
use crate::logger;
use crate::naming::dash_to_identifier;
use crate::request::{ParsedRequest, DEFAULT_SEGMENT};
use crate::view::{Page, Renderer, TemplateRenderer, ViewLayout};
use std::collections::HashSet;
use std::ops::ControlFlow;
use std::sync::Arc;

/// Namespace whose handlers may run without a database
pub const ERROR_NAMESPACE: &str = "error";
/// Target for requests whose handler does not exist
pub const NOT_FOUND_TARGET: &str = "error/404";
/// Target for requests that could not reach the database
pub const SERVER_ERROR_TARGET: &str = "error/500";

/// Result of one dispatch
#[derive(Debug)]
pub enum Outcome {
    /// The handler rendered a view
    Page(Page),
    /// The handler ran without selecting a view
    Empty,
    /// Redirect the client
    Redirect(Reroute),
    /// Terminal failure answered with [`DispatchError::status`]
    Abort(DispatchError),
}

/// Front controller
///
/// Holds only shared, immutable services; per-request state lives inside
/// [`Dispatcher::dispatch`], so one instance can serve concurrent requests.
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    connector: Arc<dyn Connector>,
    renderer: Arc<dyn Renderer>,
    database: DatabaseConfig,
    layout: ViewLayout,
    disabled: HashSet<String>,
}

impl Dispatcher {
    /// Dispatcher with the connector and renderer chosen by configuration
    pub fn new(config: &Config, registry: HandlerRegistry) -> Self {
        Self::with_services(
            config,
            registry,
            connector_for(&config.database),
            Arc::new(TemplateRenderer),
        )
    }

    pub fn with_services(
        config: &Config,
        registry: HandlerRegistry,
        connector: Arc<dyn Connector>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            connector,
            renderer,
            database: config.database.clone(),
            layout: ViewLayout::from_config(&config.views),
            disabled: config.routing.disabled_handlers.iter().cloned().collect(),
        }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Dispatch a raw request target such as `/user-profile/42?tab=posts`
    pub fn dispatch(&self, target: &str) -> Outcome {
        let request = ParsedRequest::parse(target);
        match self.run(&request) {
            ControlFlow::Continue(outcome) => outcome,
            ControlFlow::Break(reroute) => self.settle(reroute, &request),
        }
    }

    fn run(&self, request: &ParsedRequest) -> Flow<Outcome> {
        // Held until the request is finished
        let _connection = self.connect(request)?;
        let (name, mut handler) = self.resolve(request)?;
        self.gate(&name, handler.as_mut())?;
        handler.process(request.params(), request.query())?;
        ControlFlow::Continue(self.render(handler.as_ref()))
    }

    fn connect(&self, request: &ParsedRequest) -> Flow<Option<Connection>> {
        match self.connector.connect(&self.database) {
            Ok(connection) => ControlFlow::Continue(Some(connection)),
            Err(e) if request.namespace() == ERROR_NAMESPACE => {
                logger::log_warning(&format!(
                    "Database unavailable while serving the error namespace: {e}"
                ));
                ControlFlow::Continue(None)
            }
            Err(e) => ControlFlow::Break(Reroute::because(SERVER_ERROR_TARGET, e.into())),
        }
    }

    fn resolve(&self, request: &ParsedRequest) -> Flow<(String, Box<dyn Handler>)> {
        let name = dash_to_identifier(request.namespace());
        match self.registry.resolve(&name) {
            Some(handler) => ControlFlow::Continue((name, handler)),
            None => ControlFlow::Break(Reroute::because(
                NOT_FOUND_TARGET,
                DispatchError::HandlerNotFound(name),
            )),
        }
    }

    fn gate(&self, name: &str, handler: &mut dyn Handler) -> Flow {
        handler.set_name(name);
        if self.disabled.contains(name) {
            handler.deactivate();
        }

        if handler.is_active() {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(Reroute::because(
                DEFAULT_SEGMENT,
                DispatchError::InactiveHandler(name.to_string()),
            ))
        }
    }

    /// Turn a reroute into the final outcome, applying the loop guard
    fn settle(&self, mut reroute: Reroute, request: &ParsedRequest) -> Outcome {
        // Handler-requested reroutes are sent as they are
        let loops = reroute.cause().is_some()
            && (reroute.namespace() == request.namespace()
                || !self.can_serve(reroute.namespace()));
        if loops {
            if let Some(cause) = reroute.cause.take() {
                logger::log_warning(&format!(
                    "Not rerouting '{}' to '{}', the target cannot be served: {cause}",
                    request.namespace(),
                    reroute.target()
                ));
                return Outcome::Abort(cause);
            }
        }

        logger::log_reroute(&reroute);
        Outcome::Redirect(reroute)
    }

    /// Whether a request into `namespace` would reach an active handler
    fn can_serve(&self, namespace: &str) -> bool {
        let name = dash_to_identifier(namespace);
        !self.disabled.contains(&name)
            && self
                .registry
                .resolve(&name)
                .is_some_and(|handler| handler.is_active())
    }

    fn render(&self, handler: &dyn Handler) -> Outcome {
        match handler.write_view(&self.layout, self.renderer.as_ref()) {
            Ok(Some(page)) => Outcome::Page(page),
            Ok(None) => Outcome::Empty,
            Err(e) => {
                let err = DispatchError::from(e);
                logger::log_error(&format!("[{}] {err}", handler.name()));
                Outcome::Abort(err)
            }
        }
    }
}
