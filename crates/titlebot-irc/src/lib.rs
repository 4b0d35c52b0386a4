//! IRC session adapter.
//!
//! Implements the `titlebot-core` [`SessionPort`](titlebot_core::ports::SessionPort)
//! over a plain or TLS IRC connection and pushes connection events into a
//! [`SessionEvents`](titlebot_core::ports::SessionEvents) handler.

pub mod proto;
pub mod session;
mod transport;

pub use session::{IrcSession, IrcSettings};
