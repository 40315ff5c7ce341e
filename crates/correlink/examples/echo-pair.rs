//! Two correlators over an in-memory pair, each answering the other.
//!
//! Run with:
//!   cargo run --example echo-pair

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use correlink::channel::memory_pair;
use correlink::correlator::Correlator;
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (mut left, mut right) = memory_pair();
    let client = Correlator::new(left.sender());
    let server = Correlator::new(right.sender());
    left.on_incoming(client.incoming_hook());
    right.on_incoming(server.incoming_hook());
    left.on_message(|message| eprintln!("client got a plain message: {message}"));

    server.on_request(|data, responder| {
        eprintln!("server handling request {}", responder.request_id());
        if let Err(e) = responder.respond(json!({ "echo": data })) {
            eprintln!("respond failed: {e}");
        }
    });

    // Pump threads run until the process exits.
    thread::spawn(move || while right.pump_one(Duration::from_millis(50)).is_ok() {});
    thread::spawn(move || while left.pump_one(Duration::from_millis(50)).is_ok() {});

    let (tx, rx) = mpsc::channel();
    for n in 0..5 {
        let tx = tx.clone();
        let id = client.send_request(json!({ "n": n }), move |answer| {
            let _ = tx.send(answer);
        })?;
        eprintln!("sent request {id}");
    }
    drop(tx);

    for answer in rx.iter().take(5) {
        println!("{answer}");
    }

    let stats = client.stats();
    eprintln!(
        "pending={} resolved={} tombstones={}",
        stats.pending, stats.responses_resolved, stats.tombstones
    );

    client.close();
    server.close();
    Ok(())
}
