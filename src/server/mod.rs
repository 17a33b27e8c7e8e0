//! WebSocket front end
//!
//! Handles the TCP accept loop, the authenticated upgrade, and per-connection
//! task spawning.

pub mod config;
pub mod listener;

pub use config::ServerConfig;
pub use listener::HubServer;
