//! Message channel contract consumed by the correlation layer.
//!
//! A channel is one logical, duplex connection that can only emit one-way
//! messages. This crate defines:
//! - [`Channel`], the outbound half the correlation layer writes to
//! - [`IncomingHook`], the transform signature used to consume inbound messages
//!   before normal delivery
//! - [`memory`], an in-process duplex channel used by tests, demos and the CLI
//!
//! Real transports (sockets, websockets, pipes) live outside this workspace and
//! only need to implement [`Channel`] and call the hooks on every inbound message.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{ChannelError, Result};
pub use memory::{memory_pair, MemoryEndpoint, MemorySender};
pub use traits::{Channel, IncomingHook, MessageListener};
