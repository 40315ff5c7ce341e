use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use correlink_channel::{memory_pair, MemoryEndpoint};
use correlink_core::{ConnectionHub, CorrelatorConfig, CorrelatorStats, Responder};
use serde::Serialize;
use serde_json::{json, Value};

use crate::cmd::{parse_duration, BenchArgs};
use crate::exit::{correlator_error, CliError, CliResult, INTERNAL, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_report, OutputFormat};

const PUMP_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Serialize)]
struct BenchReport {
    requests: usize,
    workers: usize,
    protocol_tag: String,
    resolved: usize,
    mismatched: usize,
    elapsed_ms: f64,
    requests_per_sec: f64,
    client: CorrelatorStats,
    server: CorrelatorStats,
}

pub fn run(args: BenchArgs, format: OutputFormat) -> CliResult<i32> {
    if args.workers == 0 {
        return Err(CliError::new(USAGE, "--workers must be at least 1"));
    }
    let timeout = parse_duration(&args.timeout)?;
    let config = CorrelatorConfig {
        protocol_tag: args.protocol_tag.clone(),
        compaction_threshold: args.compaction_threshold,
        ..CorrelatorConfig::default()
    };
    let hub = ConnectionHub::with_config(config)
        .map_err(|err| correlator_error("invalid configuration", err))?
        .with_default_handler(echo);

    let (mut client_end, mut server_end) = memory_pair();
    let server = hub.on_init("server", server_end.sender());
    server_end.on_incoming(server.incoming_hook());
    server_end.on_message(|message| tracing::debug!(%message, "non-protocol message"));
    let client = hub.on_init("client", client_end.sender());
    client_end.on_incoming(client.incoming_hook());

    let running = Arc::new(AtomicBool::new(true));
    let pumps = [
        spawn_pump(server_end, Arc::clone(&running)),
        spawn_pump(client_end, Arc::clone(&running)),
    ];

    let (done_tx, done_rx) = mpsc::channel::<(usize, Value)>();
    let started = Instant::now();

    let workers: Vec<JoinHandle<CliResult<()>>> = (0..args.workers)
        .map(|worker| {
            let client = client.clone();
            let done_tx = done_tx.clone();
            let seqs: Vec<usize> = (worker..args.requests).step_by(args.workers).collect();
            thread::spawn(move || {
                for seq in seqs {
                    let done_tx = done_tx.clone();
                    client
                        .send_request(json!({ "seq": seq }), move |answer| {
                            let _ = done_tx.send((seq, answer));
                        })
                        .map_err(|err| correlator_error("send failed", err))?;
                }
                Ok(())
            })
        })
        .collect();
    drop(done_tx);

    let mut send_failure = None;
    for worker in workers {
        let outcome = worker
            .join()
            .map_err(|_| CliError::new(INTERNAL, "request worker panicked"))
            .and_then(|result| result);
        if let Err(err) = outcome {
            send_failure.get_or_insert(err);
        }
    }

    let deadline = started + timeout;
    let mut resolved = 0usize;
    let mut mismatched = 0usize;
    while send_failure.is_none() && resolved < args.requests {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match done_rx.recv_timeout(remaining) {
            Ok((seq, answer)) => {
                resolved += 1;
                if answer.get("seq").and_then(Value::as_u64) != Some(seq as u64) {
                    mismatched += 1;
                }
            }
            Err(_) => break,
        }
    }
    let elapsed = started.elapsed();

    running.store(false, Ordering::SeqCst);
    for pump in pumps {
        let _ = pump.join();
    }
    if let Some(err) = send_failure {
        hub.on_close("client");
        hub.on_close("server");
        return Err(err);
    }

    let report = BenchReport {
        requests: args.requests,
        workers: args.workers,
        protocol_tag: args.protocol_tag,
        resolved,
        mismatched,
        elapsed_ms: round2(elapsed.as_secs_f64() * 1000.0),
        requests_per_sec: round2(resolved as f64 / elapsed.as_secs_f64().max(f64::EPSILON)),
        client: client.stats(),
        server: server.stats(),
    };
    hub.on_close("client");
    hub.on_close("server");

    tracing::info!(
        resolved = report.resolved,
        compactions = report.client.compactions,
        elapsed_ms = report.elapsed_ms,
        "bench finished"
    );
    print_report(&report, &report_rows(&report), format);

    if resolved < args.requests {
        return Err(CliError::new(
            TIMEOUT,
            format!(
                "only {resolved} of {} responses arrived within {timeout:?}",
                args.requests
            ),
        ));
    }
    if mismatched > 0 {
        return Err(CliError::new(
            INTERNAL,
            format!("{mismatched} responses did not match their request"),
        ));
    }
    Ok(SUCCESS)
}

fn echo(data: Value, responder: Responder) {
    if let Err(err) = responder.respond(data) {
        tracing::warn!(request_id = %responder.request_id(), error = %err, "echo failed");
    }
}

fn spawn_pump(endpoint: MemoryEndpoint, running: Arc<AtomicBool>) -> JoinHandle<()> {
    thread::spawn(move || {
        while running.load(Ordering::SeqCst) {
            if endpoint.pump_one(PUMP_INTERVAL).is_err() {
                tracing::debug!(endpoint = endpoint.name(), "pump stopped: peer gone");
                break;
            }
        }
    })
}

fn report_rows(report: &BenchReport) -> Vec<(&'static str, String)> {
    vec![
        ("requests", report.requests.to_string()),
        ("workers", report.workers.to_string()),
        ("resolved", report.resolved.to_string()),
        ("mismatched", report.mismatched.to_string()),
        ("elapsed_ms", report.elapsed_ms.to_string()),
        ("requests_per_sec", report.requests_per_sec.to_string()),
        ("client_pending", report.client.pending.to_string()),
        ("client_tombstones", report.client.tombstones.to_string()),
        ("client_compactions", report.client.compactions.to_string()),
        (
            "server_requests_received",
            report.server.requests_received.to_string(),
        ),
    ]
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
