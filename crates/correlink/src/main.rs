mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "correlink", version, about = "Request/response correlation CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(
        long,
        value_name = "FORMAT",
        default_value = "text",
        env = "CORRELINK_LOG_FORMAT",
        global = true
    )]
    log_format: LogFormat,

    /// Minimum log level (stderr). `RUST_LOG` directives take precedence.
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        env = "CORRELINK_LOG_LEVEL",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bench_subcommand() {
        let cli = Cli::try_parse_from([
            "correlink",
            "bench",
            "--requests",
            "64",
            "--workers",
            "2",
            "--timeout",
            "500ms",
        ])
        .expect("bench args should parse");

        assert!(matches!(cli.command, Command::Bench(_)));
    }

    #[test]
    fn rejects_conflicting_inspect_inputs() {
        let err = Cli::try_parse_from([
            "correlink",
            "inspect",
            "{\"x\":1}",
            "--file",
            "/tmp/message.json",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_global_format_after_subcommand() {
        let cli = Cli::try_parse_from(["correlink", "version", "--format", "json"])
            .expect("global flag should parse after subcommand");
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
    }
}
