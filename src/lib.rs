//! frontdesk: a front-controller web dispatcher
//!
//! Every request target is parsed into path segments and query parameters,
//! the first segment is normalized into a handler name (`user-profile` ->
//! `UserProfile`), the handler registered under that name runs with the
//! remaining segments, and the view it selects is rendered. Missing,
//! inactive or unreachable pieces turn into redirects instead of errors.
//!
//! ```no_run
//! use frontdesk::config::Config;
//! use frontdesk::dispatcher::{Dispatcher, Outcome};
//! use frontdesk::handler::HandlerRegistry;
//!
//! let config = Config::load()?;
//! let dispatcher = Dispatcher::new(&config, HandlerRegistry::with_builtin("My site"));
//! match dispatcher.dispatch("/user-profile/42?tab=posts") {
//!     Outcome::Redirect(reroute) => println!("redirect to {}", reroute.location()),
//!     other => println!("{other:?}"),
//! }
//! # Ok::<(), config::ConfigError>(())
//! ```

pub mod config;
pub mod database;
pub mod dispatcher;
pub mod handler;
pub mod http;
pub mod logger;
pub mod naming;
pub mod request;
pub mod server;
pub mod view;
