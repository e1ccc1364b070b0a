//! Reroute signal and dispatch failure kinds
//!
//! A reroute ends the current request with a redirect. It travels as the
//! `Break` value of [`Flow`], so every pipeline stage hands it upwards with
//! `?` and nothing after the reroute point runs.

use crate::database::ConnectionError;
use crate::view::RenderError;
use std::ops::ControlFlow;
use thiserror::Error;

/// Pipeline step result: keep going with `T`, or stop and redirect
pub type Flow<T = ()> = ControlFlow<Reroute, T>;

/// Why a request could not be served by its handler
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no handler registered for '{0}'")]
    HandlerNotFound(String),
    #[error("database connection failed: {0}")]
    ConnectionFailure(#[from] ConnectionError),
    #[error("handler '{0}' is inactive")]
    InactiveHandler(String),
    #[error("view rendering failed: {0}")]
    RenderFailure(#[from] RenderError),
}

impl DispatchError {
    /// HTTP status used when the failure is answered directly
    pub const fn status(&self) -> u16 {
        match self {
            Self::HandlerNotFound(_) => 404,
            Self::ConnectionFailure(_) | Self::RenderFailure(_) => 500,
            Self::InactiveHandler(_) => 503,
        }
    }
}

/// Redirect-and-halt signal
#[derive(Debug)]
pub struct Reroute {
    target: String,
    pub(super) cause: Option<DispatchError>,
}

impl Reroute {
    /// Reroute requested by a handler
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            cause: None,
        }
    }

    /// Reroute issued by the dispatcher because of a failure
    pub fn because(target: impl Into<String>, cause: DispatchError) -> Self {
        Self {
            target: target.into(),
            cause: Some(cause),
        }
    }

    /// Target path without the leading slash (`error/404`)
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Value for the `Location` header
    pub fn location(&self) -> String {
        format!("/{}", self.target.trim_start_matches('/'))
    }

    /// First segment of the target
    pub fn namespace(&self) -> &str {
        self.target
            .trim_start_matches('/')
            .split(['/', '?'])
            .next()
            .unwrap_or_default()
    }

    pub const fn cause(&self) -> Option<&DispatchError> {
        self.cause.as_ref()
    }
}

/// Stop the current request and redirect the client to `target`
pub fn reroute<T>(target: impl Into<String>) -> Flow<T> {
    ControlFlow::Break(Reroute::to(target))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_and_namespace() {
        let reroute = Reroute::to("error/404");
        assert_eq!(reroute.target(), "error/404");
        assert_eq!(reroute.location(), "/error/404");
        assert_eq!(reroute.namespace(), "error");
        assert!(reroute.cause().is_none());

        assert_eq!(Reroute::to("default").namespace(), "default");
        assert_eq!(Reroute::to("/login?next=cart").namespace(), "login");
        assert_eq!(Reroute::to("/login").location(), "/login");
    }

    #[test]
    fn test_reroute_breaks() {
        fn step() -> Flow<u8> {
            reroute::<()>("default")?;
            ControlFlow::Continue(1)
        }

        match step() {
            ControlFlow::Break(r) => assert_eq!(r.target(), "default"),
            ControlFlow::Continue(_) => panic!("reroute must stop the step"),
        }
    }

    #[test]
    fn test_error_status() {
        assert_eq!(DispatchError::HandlerNotFound("Blog".into()).status(), 404);
        assert_eq!(DispatchError::InactiveHandler("Blog".into()).status(), 503);
        let render = RenderError::TemplateNotFound("views/Blog/index.html".into());
        let err = DispatchError::from(render);
        assert_eq!(err.status(), 500);
        assert!(err.to_string().contains("views/Blog/index.html"));
    }
}
