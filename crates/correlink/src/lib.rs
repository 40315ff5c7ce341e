//! Request/response correlation for one-way message channels.
//!
//! correlink turns a connection that can only emit one-way messages into one
//! that carries correlated requests and responses in both directions, with any
//! number of requests in flight.
//!
//! # Crate Structure
//!
//! - [`channel`] — Channel contract and in-memory duplex channel
//! - [`envelope`] — Tagged request/response envelopes
//! - [`correlator`] — Correlator, pending registry and connection hub
//!
//! # Example
//!
//! ```
//! use correlink::channel::memory_pair;
//! use correlink::correlator::Correlator;
//! use serde_json::json;
//!
//! let (mut left, mut right) = memory_pair();
//! let client = Correlator::new(left.sender());
//! let server = Correlator::new(right.sender());
//! left.on_incoming(client.incoming_hook());
//! right.on_incoming(server.incoming_hook());
//!
//! server.on_request(|data, responder| {
//!     responder.respond(data).expect("channel open");
//! });
//!
//! let (tx, rx) = std::sync::mpsc::channel();
//! client
//!     .send_request(json!("ping"), move |answer| tx.send(answer).expect("receiver alive"))
//!     .expect("request sent");
//!
//! right.pump_pending().expect("peer alive");
//! left.pump_pending().expect("peer alive");
//! assert_eq!(rx.recv().expect("answered"), json!("ping"));
//! ```

/// Re-export channel types.
pub mod channel {
    pub use correlink_channel::*;
}

/// Re-export envelope types.
pub mod envelope {
    pub use correlink_envelope::*;
}

/// Re-export correlation engine types.
pub mod correlator {
    pub use correlink_core::*;
}
