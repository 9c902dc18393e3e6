//! HTTP surface: server assembly, middleware, error mapping.

pub mod error;
pub mod middleware;
pub mod server;

pub use error::ApiError;
pub use server::{AppState, HttpServer};
