//! WebSocket push channel.
//!
//! Clients connect to `/api/v1/ws?token=<access token>`. The server pushes
//! notifications and new thread messages to every connection a user holds.

mod handler;
mod heartbeat;
pub mod manager;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
