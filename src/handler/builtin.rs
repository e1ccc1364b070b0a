//! Built-in handlers
//!
//! `Default` serves the landing page (`/` and `/default`), `Error` serves the
//! targets the dispatcher reroutes to (`/error/404`, `/error/500`).

use super::{Handler, HandlerCore};
use crate::dispatcher::Flow;
use crate::request::QueryParams;
use hyper::StatusCode;
use std::ops::ControlFlow;

/// Landing page handler, renders `Default/index`
pub struct DefaultHandler {
    core: HandlerCore,
    site_title: String,
}

impl DefaultHandler {
    pub fn new(site_title: &str) -> Self {
        Self {
            core: HandlerCore::new(),
            site_title: site_title.to_string(),
        }
    }
}

impl Handler for DefaultHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut HandlerCore {
        &mut self.core
    }

    fn process(&mut self, params: &[String], query: &QueryParams) -> Flow {
        self.core.context.head.title.clone_from(&self.site_title);
        self.core.context.insert("params", params.to_vec());
        self.core.context.insert(
            "query",
            serde_json::to_value(query).unwrap_or_default(),
        );
        self.set_view("index");
        ControlFlow::Continue(())
    }
}

/// Error page handler, renders `Error/error`
///
/// The first parameter selects the status code; anything that is not a
/// client or server error status falls back to 404.
pub struct ErrorHandler {
    core: HandlerCore,
    site_title: String,
}

impl ErrorHandler {
    pub fn new(site_title: &str) -> Self {
        Self {
            core: HandlerCore::new(),
            site_title: site_title.to_string(),
        }
    }
}

fn error_status(params: &[String]) -> StatusCode {
    params
        .first()
        .and_then(|code| code.parse::<u16>().ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .filter(|status| status.is_client_error() || status.is_server_error())
        .unwrap_or(StatusCode::NOT_FOUND)
}

impl Handler for ErrorHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut HandlerCore {
        &mut self.core
    }

    fn process(&mut self, params: &[String], _query: &QueryParams) -> Flow {
        let status = error_status(params);
        let message = status.canonical_reason().unwrap_or("Error");

        self.core.set_status(status.as_u16());
        self.core.context.head.title = format!("{} | {}", message, self.site_title);
        self.core.context.insert("code", status.as_u16());
        self.core.context.insert("message", message);
        self.set_view("error");
        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_default_handler() {
        let mut handler = DefaultHandler::new("Acme");
        let mut query = QueryParams::new();
        query.insert("ref".to_string(), "mail".to_string());

        assert!(handler.process(&params(&[]), &query).is_continue());
        assert_eq!(handler.view(), Some("index"));
        assert_eq!(handler.core().context.head.title, "Acme");
        assert_eq!(handler.core().context.body["query"], json!({"ref": "mail"}));
        assert_eq!(handler.core().status(), 200);
    }

    #[test]
    fn test_error_handler_known_codes() {
        for (code, message) in [("404", "Not Found"), ("500", "Internal Server Error")] {
            let mut handler = ErrorHandler::new("Acme");
            assert!(handler.process(&params(&[code]), &QueryParams::new()).is_continue());
            assert_eq!(handler.view(), Some("error"));
            assert_eq!(handler.core().status().to_string(), code);
            assert_eq!(handler.core().context.body["message"], json!(message));
            assert_eq!(handler.core().context.head.title, format!("{message} | Acme"));
        }
    }

    #[test]
    fn test_error_handler_falls_back_to_404() {
        for input in [vec![], params(&["teapot"]), params(&["200"]), params(&["99999"])] {
            let mut handler = ErrorHandler::new("Acme");
            let _ = handler.process(&input, &QueryParams::new());
            assert_eq!(handler.core().status(), 404);
            assert_eq!(handler.core().context.body["code"], json!(404));
        }
    }
}
