//! Process wiring: binds the database and worker services to one host and
//! serves them next to the probe, version and metrics routes.

pub mod config;
pub mod handlers;
pub mod server;
pub mod version;
