//! A resource-backed service: one mock database connection, established with a
//! bounded connect on start and closed on stop, plus the HTTP surface reading
//! and writing through it.

pub mod config;
pub mod connection;
pub mod error;
pub mod handlers;
pub mod service;

pub use config::DatabaseConfig;
pub use connection::{MockConnection, User, FAILURE_URL, UNRESPONSIVE_URL};
pub use error::{ConnectError, DatabaseError};
pub use service::DatabaseService;
