use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use correlink_envelope::DEFAULT_PROTOCOL_TAG;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod bench;
pub mod inspect;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run correlated requests over an in-memory connection and report counters.
    Bench(BenchArgs),
    /// Classify a raw message as request, response or passthrough.
    Inspect(InspectArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Bench(args) => bench::run(args, format),
        Command::Inspect(args) => inspect::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct BenchArgs {
    /// Number of requests to send.
    #[arg(long, short = 'n', default_value = "1000")]
    pub requests: usize,
    /// Threads sending requests concurrently.
    #[arg(long, short = 'w', default_value = "4")]
    pub workers: usize,
    /// Maximum time to wait for all responses (e.g. 5s, 500ms).
    #[arg(long, default_value = "10s")]
    pub timeout: String,
    /// Protocol tag both endpoints use.
    #[arg(long, env = "CORRELINK_PROTOCOL_TAG", default_value = DEFAULT_PROTOCOL_TAG)]
    pub protocol_tag: String,
    /// Deletions between registry compactions.
    #[arg(long, default_value = "32")]
    pub compaction_threshold: usize,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Raw JSON message.
    #[arg(conflicts_with = "file")]
    pub message: Option<String>,
    /// Read the message from a file.
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Protocol tag to match.
    #[arg(long, env = "CORRELINK_PROTOCOL_TAG", default_value = DEFAULT_PROTOCOL_TAG)]
    pub protocol_tag: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `500ms`, `5s` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }
}
