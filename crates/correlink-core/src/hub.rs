use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use correlink_channel::Channel;
use correlink_envelope::RequestId;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::CorrelatorConfig;
use crate::correlator::{Correlator, RequestHandler};
use crate::error::{CorrelatorError, Result};
use crate::responder::Responder;

/// Correlators of every live connection in a process.
///
/// The transport calls [`ConnectionHub::on_init`] when a connection comes up
/// and [`ConnectionHub::on_close`] when it goes away; each connection gets its
/// own registry and nothing is shared between connections.
pub struct ConnectionHub {
    config: CorrelatorConfig,
    default_handler: Option<RequestHandler>,
    connections: RwLock<HashMap<String, Correlator>>,
}

impl ConnectionHub {
    /// Create a hub using default correlator settings.
    pub fn new() -> Self {
        Self {
            config: CorrelatorConfig::default(),
            default_handler: None,
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Create a hub whose connections use `config`.
    pub fn with_config(config: CorrelatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    /// Install `handler` on every connection initialised from now on.
    pub fn with_default_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(Value, Responder) + Send + Sync + 'static,
    {
        self.default_handler = Some(Arc::new(handler));
        self
    }

    /// Allocate a fresh correlator for a new connection.
    ///
    /// Re-initialising a known id closes the previous correlator first.
    pub fn on_init(
        &self,
        connection_id: impl Into<String>,
        channel: impl Channel + 'static,
    ) -> Correlator {
        let connection_id = connection_id.into();
        let correlator =
            Correlator::for_connection(&connection_id, Arc::new(channel), self.config.clone());
        if let Some(handler) = &self.default_handler {
            correlator.set_handler(Arc::clone(handler));
        }

        let previous = self
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(connection_id.clone(), correlator.clone());
        if let Some(previous) = previous {
            let abandoned = previous.close();
            warn!(
                connection = %connection_id,
                abandoned,
                "connection re-initialised; previous correlator closed"
            );
        }

        info!(connection = %connection_id, "connection initialised");
        correlator
    }

    /// Discard the connection's registry. Pending callbacks are never invoked.
    ///
    /// Returns `false` for unknown connections.
    pub fn on_close(&self, connection_id: &str) -> bool {
        let removed = self
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(connection_id);
        match removed {
            Some(correlator) => {
                let abandoned = correlator.close();
                info!(connection = %connection_id, abandoned, "connection closed");
                true
            }
            None => {
                debug!(connection = %connection_id, "close for unknown connection ignored");
                false
            }
        }
    }

    /// Correlator of a live connection.
    pub fn get(&self, connection_id: &str) -> Option<Correlator> {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(connection_id)
            .cloned()
    }

    /// Send a request on a connection.
    pub fn send_request<F>(
        &self,
        connection_id: &str,
        data: Value,
        on_response: F,
    ) -> Result<RequestId>
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.require(connection_id)?
            .send_request(data, on_response)
    }

    /// Register the request handler of one connection.
    pub fn on_request<F>(&self, connection_id: &str, handler: F) -> Result<()>
    where
        F: Fn(Value, Responder) + Send + Sync + 'static,
    {
        self.require(connection_id)?.on_request(handler);
        Ok(())
    }

    /// Route an inbound message of a connection.
    ///
    /// Messages of unknown connections are never consumed.
    pub fn dispatch_incoming(&self, connection_id: &str, message: &Value) -> bool {
        match self.get(connection_id) {
            Some(correlator) => correlator.dispatch_incoming(message),
            None => false,
        }
    }

    /// Ids of live connections, sorted.
    pub fn connection_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn require(&self, connection_id: &str) -> Result<Correlator> {
        self.get(connection_id)
            .ok_or_else(|| CorrelatorError::UnknownConnection(connection_id.to_string()))
    }
}

impl Default for ConnectionHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use correlink_channel::memory_pair;
    use correlink_envelope::Envelope;
    use serde_json::json;

    use super::*;

    #[test]
    fn init_and_close_manage_registries() {
        let hub = ConnectionHub::new();
        let (left, right) = memory_pair();
        hub.on_init("a", left.sender());
        hub.on_init("b", right.sender());
        assert_eq!(hub.connection_ids(), vec!["a".to_string(), "b".to_string()]);

        assert!(hub.on_close("a"));
        assert!(!hub.on_close("a"));
        assert_eq!(hub.len(), 1);
        assert!(hub.get("a").is_none());
    }

    #[test]
    fn close_discards_pending_callbacks() {
        let hub = ConnectionHub::new();
        let (left, _right) = memory_pair();
        let correlator = hub.on_init("conn", left.sender());
        let fired = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&fired);
        let id = hub
            .send_request("conn", json!(1), move |_| *flag.lock().unwrap() = true)
            .unwrap();

        hub.on_close("conn");

        let late = Envelope::response("correlink", id, json!(1)).into_message();
        assert!(correlator.dispatch_incoming(&late));
        assert!(!*fired.lock().unwrap());
        assert!(!hub.dispatch_incoming("conn", &late));
    }

    #[test]
    fn unknown_connection_is_an_error() {
        let hub = ConnectionHub::new();
        let err = hub.send_request("ghost", json!(1), |_| {}).unwrap_err();
        assert!(matches!(err, CorrelatorError::UnknownConnection(id) if id == "ghost"));
        assert!(hub.on_request("ghost", |_, _| {}).is_err());
    }

    #[test]
    fn default_handler_applies_to_new_connections() {
        let hub = ConnectionHub::new()
            .with_default_handler(|data, responder| responder.respond(data).unwrap());
        let (mut left, mut right) = memory_pair();
        let server = hub.on_init("server", right.sender());
        right.on_incoming(server.incoming_hook());
        let client = hub.on_init("client", left.sender());
        left.on_incoming(client.incoming_hook());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        hub.send_request("client", json!("hi"), move |v| sink.lock().unwrap().push(v))
            .unwrap();
        right.pump_pending().unwrap();
        left.pump_pending().unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![json!("hi")]);
    }

    #[test]
    fn per_connection_handler_overrides_default() {
        let hub = ConnectionHub::new().with_default_handler(|_, r| r.respond(json!("default")).unwrap());
        let (mut left, mut right) = memory_pair();
        let server = hub.on_init("server", right.sender());
        right.on_incoming(server.incoming_hook());
        let client = hub.on_init("client", left.sender());
        left.on_incoming(client.incoming_hook());
        hub.on_request("server", |_, r| r.respond(json!("custom")).unwrap())
            .unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        client
            .send_request(json!(null), move |v| sink.lock().unwrap().push(v))
            .unwrap();
        right.pump_pending().unwrap();
        left.pump_pending().unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![json!("custom")]);
    }

    #[test]
    fn reinit_closes_previous_correlator() {
        let hub = ConnectionHub::new();
        let (left, _right) = memory_pair();
        let first = hub.on_init("conn", left.sender());
        first.send_request(json!(1), |_| {}).unwrap();

        let second = hub.on_init("conn", left.sender());

        assert!(first.is_closed());
        assert!(!second.is_closed());
        assert_eq!(second.pending_count(), 0);
        assert_eq!(second.connection_id(), Some("conn"));
    }

    #[test]
    fn registries_are_independent_per_connection() {
        let hub = ConnectionHub::new();
        let (left, right) = memory_pair();
        let a = hub.on_init("a", left.sender());
        let b = hub.on_init("b", right.sender());
        let id_a = a.send_request(json!(1), |_| {}).unwrap();
        let id_b = b.send_request(json!(1), |_| {}).unwrap();

        // Both start at the same counter; they never interfere.
        assert_eq!(id_a, id_b);
        let answer = Envelope::response("correlink", id_a, json!(null)).into_message();
        assert!(hub.dispatch_incoming("a", &answer));
        assert_eq!(a.pending_count(), 0);
        assert_eq!(b.pending_count(), 1);
    }

    #[test]
    fn invalid_hub_config_rejected() {
        let config = CorrelatorConfig {
            protocol_tag: String::new(),
            ..CorrelatorConfig::default()
        };
        assert!(ConnectionHub::with_config(config).is_err());
    }
}
