//! Handler registry module
//!
//! Startup-time map from handler name (`UserProfile`) to a factory that
//! builds a fresh handler for every request. A missing entry is a routing
//! miss, not an error.

use super::builtin::{DefaultHandler, ErrorHandler};
use super::Handler;
use std::collections::HashMap;
use std::fmt;

/// Builds one handler instance per request
pub type HandlerFactory = Box<dyn Fn() -> Box<dyn Handler> + Send + Sync>;

/// Handler name to factory map
#[derive(Default)]
pub struct HandlerRegistry {
    factories: HashMap<String, HandlerFactory>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-filled with the `Default` and `Error` handlers
    pub fn with_builtin(site_title: &str) -> Self {
        let mut registry = Self::new();
        let title = site_title.to_string();
        registry.register("Default", move || DefaultHandler::new(&title));
        let title = site_title.to_string();
        registry.register("Error", move || ErrorHandler::new(&title));
        registry
    }

    /// Register a factory under an identifier-style name
    ///
    /// Registering the same name twice replaces the earlier factory.
    pub fn register<F, H>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: Handler + 'static,
    {
        self.factories.insert(
            name.into(),
            Box::new(move || Box::new(factory()) as Box<dyn Handler>),
        );
        self
    }

    /// Build a fresh handler for `name`, `None` when nothing is registered
    pub fn resolve(&self, name: &str) -> Option<Box<dyn Handler>> {
        self.factories.get(name).map(|factory| factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Flow;
    use crate::handler::HandlerCore;
    use crate::request::QueryParams;
    use std::ops::ControlFlow;

    struct Blog {
        core: HandlerCore,
    }

    impl Handler for Blog {
        fn core(&self) -> &HandlerCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut HandlerCore {
            &mut self.core
        }

        fn process(&mut self, _params: &[String], _query: &QueryParams) -> Flow {
            ControlFlow::Continue(())
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = HandlerRegistry::new();
        registry.register("Blog", || Blog {
            core: HandlerCore::with_active(false),
        });

        assert!(registry.contains("Blog"));
        let handler = registry.resolve("Blog").unwrap();
        assert!(!handler.is_active());
    }

    #[test]
    fn test_resolve_miss() {
        let registry = HandlerRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.resolve("Blog").is_none());
    }

    #[test]
    fn test_each_resolve_builds_fresh_instance() {
        let mut registry = HandlerRegistry::new();
        registry.register("Blog", || Blog {
            core: HandlerCore::new(),
        });

        let mut first = registry.resolve("Blog").unwrap();
        first.set_name("Blog");
        let second = registry.resolve("Blog").unwrap();
        assert_eq!(second.name(), "");
    }

    #[test]
    fn test_builtin_handlers() {
        let registry = HandlerRegistry::with_builtin("Site");
        assert_eq!(registry.names(), ["Default", "Error"]);
        assert_eq!(registry.len(), 2);
        assert!(format!("{registry:?}").contains("Default"));
    }
}
