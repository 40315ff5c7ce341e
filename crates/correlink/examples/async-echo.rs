//! Await correlated responses from async code.
//!
//! Run with:
//!   cargo run --example async-echo --features async

use std::thread;
use std::time::Duration;

use correlink::channel::memory_pair;
use correlink::correlator::{Correlator, CorrelatorError};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (mut left, mut right) = memory_pair();
    let client = Correlator::new(left.sender());
    let server = Correlator::new(right.sender());
    left.on_incoming(client.incoming_hook());
    right.on_incoming(server.incoming_hook());

    server.on_request(|data, responder| {
        // Requests for "slow" are never answered.
        if data == json!("slow") {
            return;
        }
        if let Err(e) = responder.respond(json!({ "echo": data })) {
            eprintln!("respond failed: {e}");
        }
    });

    thread::spawn(move || while right.pump_one(Duration::from_millis(20)).is_ok() {});
    thread::spawn(move || while left.pump_one(Duration::from_millis(20)).is_ok() {});

    let (a, b) = tokio::join!(client.request(json!("first")), client.request(json!("second")));
    println!("{}", a?);
    println!("{}", b?);

    match client
        .request_timeout(json!("slow"), Duration::from_millis(200))
        .await
    {
        Err(CorrelatorError::Timeout(after)) => println!("slow request timed out after {after:?}"),
        other => println!("unexpected: {other:?}"),
    }
    println!("pending after timeout: {}", client.pending_count());

    Ok(())
}
