//! Request/response correlation over one-way message channels.
//!
//! A [`Correlator`] sits on one logical connection. It tags outbound requests
//! with a fresh id, remembers a one-shot callback per id, and routes inbound
//! envelopes: requests go to the application's handler together with a
//! [`Responder`], responses resolve the matching callback exactly once.
//!
//! Resolved entries are tombstoned and the [`Registry`] is compacted after a
//! fixed number of deletions, so long-lived connections stay dense.
//!
//! [`ConnectionHub`] maps connection lifecycle events (init/close) to
//! correlators when one process serves many connections.

pub mod config;
pub mod correlator;
pub mod error;
#[cfg(feature = "async")]
pub mod future;
pub mod hub;
pub mod ids;
pub mod registry;
pub mod responder;

pub use config::{CorrelatorConfig, DEFAULT_COMPACTION_THRESHOLD};
pub use correlator::{Correlator, CorrelatorStats, RequestHandler};
pub use correlink_envelope::{Envelope, EnvelopeKind, RequestId, DEFAULT_PROTOCOL_TAG};
pub use error::{CorrelatorError, Result};
pub use hub::ConnectionHub;
pub use ids::IdGenerator;
pub use registry::{Registry, ResponseCallback};
pub use responder::Responder;
