//! WebSocket module for live viewers
//!
//! ## Events
//!
//! ### Outbound (server -> client)
//! - `full` - Every tracked image and container, answer to `init`
//! - `start` - A container started, carries its inspect record
//! - `remove` - A container died, carries its inspect record
//! - `destroy` - A container was deleted, carries only its ID
//!
//! ### Inbound (client -> server)
//! - `init` - Request the full snapshot
//! - `start` / `stop` / `kill` / `remove` - Lifecycle command for the container in `Data`

pub mod dispatcher;
pub mod handler;
pub mod messages;
pub mod registry;

pub use dispatcher::CommandDispatcher;
pub use handler::{ws_handler, WebSocketState};
pub use messages::DiffMessage;
pub use registry::{SessionId, ViewerRegistry};
