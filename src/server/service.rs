//! Request service module
//!
//! Entry point for every HTTP request: method check, dispatch on the
//! blocking pool, outcome to response mapping and access logging.

use crate::config::AppState;
use crate::dispatcher::Outcome;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_LENGTH, LOCATION, SERVER, USER_AGENT};
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let method = req.method().clone();
    let is_head = method == Method::HEAD;
    let target = req
        .uri()
        .path_and_query()
        .map_or_else(|| "/".to_string(), |pq| pq.as_str().to_string());

    let mut response = match method {
        Method::GET | Method::HEAD => dispatch(&state, target.clone(), is_head).await,
        Method::OPTIONS => http::build_options_response(),
        _ => {
            logger::log_warning(&format!("Method not allowed: {method} {target}"));
            http::build_405_response()
        }
    };

    if let Ok(server) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, server);
    }

    if state.config.logging.access_log {
        let mut entry = AccessLogEntry::new(peer_addr.ip().to_string(), method.to_string(), target);
        entry.http_version = version_label(req.version()).to_string();
        entry.status = response.status().as_u16();
        entry.body_bytes = header_str(&response, CONTENT_LENGTH)
            .and_then(|len| len.parse().ok())
            .unwrap_or_default();
        entry.location = header_str(&response, LOCATION).map(ToString::to_string);
        entry.user_agent = req
            .headers()
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Run the dispatcher off the async workers; connector and renderer block
async fn dispatch(state: &Arc<AppState>, target: String, is_head: bool) -> Response<Full<Bytes>> {
    let worker_state = Arc::clone(state);
    match tokio::task::spawn_blocking(move || worker_state.dispatcher.dispatch(&target)).await {
        Ok(outcome) => outcome_response(outcome, is_head),
        Err(e) => {
            logger::log_error(&format!("Dispatch task failed: {e}"));
            http::build_status_response(500, is_head)
        }
    }
}

/// Map a dispatch outcome onto an HTTP response
pub fn outcome_response(outcome: Outcome, is_head: bool) -> Response<Full<Bytes>> {
    match outcome {
        Outcome::Page(page) => http::build_page_response(page, is_head),
        Outcome::Empty => http::build_empty_response(),
        Outcome::Redirect(reroute) => http::build_redirect_response(&reroute.location()),
        Outcome::Abort(err) => http::build_status_response(err.status(), is_head),
    }
}

fn header_str(response: &Response<Full<Bytes>>, name: hyper::header::HeaderName) -> Option<&str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

fn version_label(version: hyper::Version) -> &'static str {
    match version {
        hyper::Version::HTTP_09 => "0.9",
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        hyper::Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
