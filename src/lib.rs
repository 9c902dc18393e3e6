//! Ziply e-commerce backend.
//!
//! HTTP CRUD API for auth, products, orders, and users over MongoDB,
//! with a WebSocket channel broadcasting order-status changes.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌─────────────────────────────────────────────────┐
//!                  │                  ZIPLY SERVER                   │
//!                  │                                                 │
//!   HTTP request   │  ┌─────────┐    ┌───────────┐    ┌──────────┐   │
//!   ───────────────┼─▶│  http   │───▶│ db guard  │───▶│  routes  │   │
//!                  │  │ server  │    │middleware │    │auth/crud │   │
//!                  │  └─────────┘    └─────┬─────┘    └────┬─────┘   │
//!                  │                       │               │         │
//!                  │                  is_healthy?          ▼         │
//!                  │                       │          ┌──────────┐   │
//!                  │  ┌────────────┐       │          │  store   │   │
//!                  │  │ connection │◀──────┘          │ (mongo)  │   │
//!                  │  │  manager   │──supervises─────▶└──────────┘   │
//!                  │  └────────────┘                                 │
//!                  │                                                 │
//!   WS client ◀────┼── realtime broadcast ◀── order status updates   │
//!                  │                                                 │
//!                  │  cross-cutting: config · observability · auth   │
//!                  └─────────────────────────────────────────────────┘
//! ```
//!
//! The connection manager owns the only mutable connection state in the
//! process: it brings the store up before the listener binds, retries
//! failed attempts on a fixed schedule, and exposes the health check the
//! request middleware gates on.

// Core subsystems
pub mod config;
pub mod db;
pub mod http;
pub mod store;

// API surface
pub mod routes;

// Cross-cutting concerns
pub mod auth;
pub mod observability;
pub mod realtime;

pub use config::ServerConfig;
pub use db::{ConnectionManager, MongoStore};
pub use http::HttpServer;
