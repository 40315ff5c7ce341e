use std::fs;

use correlink_envelope::{Envelope, EnvelopeKind};
use serde::Serialize;
use serde_json::Value;

use crate::cmd::InspectArgs;
use crate::exit::{CliError, CliResult, DATA_INVALID, FAILURE, SUCCESS, USAGE};
use crate::output::{payload_preview, print_report, OutputFormat};

const PREVIEW_CHARS: usize = 80;

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
enum MessageKind {
    Request,
    Response,
    Passthrough,
}

#[derive(Debug, Serialize)]
struct InspectOutput {
    kind: MessageKind,
    protocol_tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let raw = read_message(&args)?;
    let message: Value = serde_json::from_str(&raw)
        .map_err(|err| CliError::new(DATA_INVALID, format!("invalid JSON message: {err}")))?;

    let output = classify(&message, &args.protocol_tag);
    tracing::debug!(kind = ?output.kind, "message classified");

    let mut rows = vec![
        ("kind", format!("{:?}", output.kind).to_lowercase()),
        ("protocol_tag", output.protocol_tag.clone()),
    ];
    if let Some(id) = &output.request_id {
        rows.push(("request_id", id.clone()));
    }
    if let Some(data) = &output.data {
        rows.push(("data", payload_preview(data, PREVIEW_CHARS)));
    }
    print_report(&output, &rows, format);

    Ok(SUCCESS)
}

fn read_message(args: &InspectArgs) -> CliResult<String> {
    if let Some(message) = &args.message {
        return Ok(message.clone());
    }
    if let Some(path) = &args.file {
        return fs::read_to_string(path).map_err(|err| {
            CliError::new(
                FAILURE,
                format!("failed reading {}: {err}", path.display()),
            )
        });
    }
    Err(CliError::new(USAGE, "provide a message or --file"))
}

fn classify(message: &Value, tag: &str) -> InspectOutput {
    match Envelope::from_message(message, tag) {
        Some(envelope) => {
            let (kind, id) = match envelope.kind {
                EnvelopeKind::Request(id) => (MessageKind::Request, id),
                EnvelopeKind::Response(id) => (MessageKind::Response, id),
            };
            InspectOutput {
                kind,
                protocol_tag: envelope.tag,
                request_id: Some(id.to_string()),
                data: Some(envelope.data),
            }
        }
        None => InspectOutput {
            kind: MessageKind::Passthrough,
            protocol_tag: tag.to_string(),
            request_id: None,
            data: None,
        },
    }
}
