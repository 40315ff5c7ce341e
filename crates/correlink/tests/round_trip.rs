use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use correlink::channel::{memory_pair, Channel, MemoryEndpoint};
use correlink::correlator::{ConnectionHub, Correlator, CorrelatorConfig};
use correlink::envelope::Envelope;
use serde_json::{json, Value};

fn connected_pair() -> (Correlator, MemoryEndpoint, Correlator, MemoryEndpoint) {
    let (mut left, mut right) = memory_pair();
    let client = Correlator::new(left.sender());
    let server = Correlator::new(right.sender());
    left.on_incoming(client.incoming_hook());
    right.on_incoming(server.incoming_hook());
    (client, left, server, right)
}

#[test]
fn both_sides_can_request_concurrently() {
    let (client, left, server, right) = connected_pair();
    client.on_request(|data, responder| {
        responder.respond(json!({ "client_saw": data })).unwrap();
    });
    server.on_request(|data, responder| {
        responder.respond(json!({ "server_saw": data })).unwrap();
    });

    let (tx, rx) = mpsc::channel();
    let to_server = tx.clone();
    client
        .send_request(json!("a"), move |v| to_server.send(v).unwrap())
        .unwrap();
    server
        .send_request(json!("b"), move |v| tx.send(v).unwrap())
        .unwrap();

    right.pump_pending().unwrap();
    left.pump_pending().unwrap();
    right.pump_pending().unwrap();

    let mut answers: Vec<Value> = rx.try_iter().collect();
    answers.sort_by_key(|v| v.to_string());
    assert_eq!(
        answers,
        vec![json!({ "client_saw": "b" }), json!({ "server_saw": "a" })]
    );
    assert_eq!(client.pending_count(), 0);
    assert_eq!(server.pending_count(), 0);
}

#[test]
fn out_of_order_responses_reach_their_own_callbacks() {
    let (client, _left, _server, _right) = connected_pair();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let ids: Vec<_> = (0..3)
        .map(|n| {
            let sink = Arc::clone(&seen);
            client
                .send_request(json!(n), move |v| sink.lock().unwrap().push((n, v)))
                .unwrap()
        })
        .collect();

    // Answer in reverse without involving the peer.
    for (n, id) in ids.iter().enumerate().rev() {
        let answer = Envelope::response("correlink", id.clone(), json!(n * 10)).into_message();
        assert!(client.dispatch_incoming(&answer));
    }

    assert_eq!(
        *seen.lock().unwrap(),
        vec![(2, json!(20)), (1, json!(10)), (0, json!(0))]
    );
}

#[test]
fn non_protocol_messages_reach_application_listeners() {
    let (client, mut left, _server, right) = connected_pair();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    left.on_message(move |message| sink.lock().unwrap().push(message));

    let app = right.sender();
    app.send(json!({ "plugin": "someone-else", "requestId": "1" }))
        .unwrap();
    app.send(json!({ "hello": "world" })).unwrap();
    left.pump_pending().unwrap();

    assert_eq!(seen.lock().unwrap().len(), 2);
    assert_eq!(client.stats().requests_received, 0);
}

#[test]
fn hub_tracks_connections_with_custom_tag() {
    let config = CorrelatorConfig {
        protocol_tag: "acme".to_string(),
        ..CorrelatorConfig::default()
    };
    let hub = ConnectionHub::with_config(config)
        .unwrap()
        .with_default_handler(|data, responder| responder.respond(data).unwrap());

    let (mut left, mut right) = memory_pair();
    let server = hub.on_init("server", right.sender());
    right.on_incoming(server.incoming_hook());
    let client = hub.on_init("client", left.sender());
    left.on_incoming(client.incoming_hook());

    let (tx, rx) = mpsc::channel();
    hub.send_request("client", json!([1, 2]), move |v| tx.send(v).unwrap())
        .unwrap();
    right.pump_pending().unwrap();
    left.pump_pending().unwrap();

    assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), json!([1, 2]));
    assert!(hub.on_close("client"));
    assert_eq!(hub.connection_ids(), vec!["server".to_string()]);
}
