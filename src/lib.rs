// Library interface for rootserve
// This allows testing and embedding of the request handling

pub mod args;
pub mod config;
pub mod delete;
pub mod dispatch;
pub mod envelope;
pub mod errors;
pub mod guard;
pub mod listing;
pub mod params;
pub mod relocate;
pub mod renderer;
pub mod resolve;
pub mod transfer;

use actix_web::web;

// Re-export commonly used types
pub use config::ServeConfig;
pub use errors::{RuntimeError, StartupError};
pub use resolve::{RequestTarget, ServerRoot};

/// Routes every path and method to the single dispatching handler.
///
/// The caller registers the [`ServeConfig`] as `web::Data`.
pub fn configure_app(app: &mut web::ServiceConfig) {
    app.default_service(web::to(dispatch::serve));
}
