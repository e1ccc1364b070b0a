//! HTTP protocol layer module
//!
//! Response builders used by the request service, decoupled from dispatch.

pub mod response;

// Re-export commonly used builders
pub use response::{
    build_405_response, build_empty_response, build_options_response, build_page_response,
    build_redirect_response, build_status_response,
};
