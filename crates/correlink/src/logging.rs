use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Variable carrying per-crate filter directives, e.g. `correlink_core=trace`.
const FILTER_ENV: &str = "RUST_LOG";

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Filter from `RUST_LOG` directives, falling back to `level`.
///
/// Blank or unparsable directives fall back as well.
fn build_filter(level: LogLevel, directives: Option<&str>) -> EnvFilter {
    directives
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new(level.directive()))
}

/// Install the stderr subscriber. Later calls are no-ops.
///
/// `level` comes from `--log-level` / `CORRELINK_LOG_LEVEL`; `RUST_LOG`
/// overrides it when set.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let directives = std::env::var(FILTER_ENV).ok();
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(build_filter(level, directives.as_deref()))
        .with_ansi(false)
        .with_target(false);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_is_used_without_directives() {
        assert_eq!(build_filter(LogLevel::Warn, None).to_string(), "warn");
        assert_eq!(build_filter(LogLevel::Trace, Some("  ")).to_string(), "trace");
    }

    #[test]
    fn directives_override_level() {
        let filter = build_filter(LogLevel::Error, Some("correlink_core=debug"));
        assert_eq!(filter.to_string(), "correlink_core=debug");
    }
}
