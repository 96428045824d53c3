use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Controls the log format.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Auto detect the best format.
    ///
    /// This chooses [`LogFormat::Pretty`] for TTY, otherwise
    /// [`LogFormat::Simplified`].
    #[default]
    Auto,

    /// Pretty printing with colors.
    Pretty,

    /// Simplified plain text output.
    Simplified,

    /// Dump out JSON lines.
    Json,
}

/// The logging level.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Log errors only.
    Error,
    /// Log errors and warnings.
    Warn,
    /// The default level, logs operationally relevant messages.
    #[default]
    Info,
    /// Verbose logging for debugging.
    Debug,
    /// Log everything.
    Trace,
    /// Disable all logging.
    Off,
}

impl Level {
    fn level_filter(self) -> LevelFilter {
        match self {
            Level::Error => LevelFilter::ERROR,
            Level::Warn => LevelFilter::WARN,
            Level::Info => LevelFilter::INFO,
            Level::Debug => LevelFilter::DEBUG,
            Level::Trace => LevelFilter::TRACE,
            Level::Off => LevelFilter::OFF,
        }
    }
}

/// Controls the logging system.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// The log level for the relay.
    pub level: Level,

    /// Controls the log output format.
    ///
    /// Defaults to [`LogFormat::Auto`], which detects the best format based
    /// on the TTY.
    pub format: LogFormat,
}

/// Initializes the logging system with the given configuration.
///
/// The `RUST_LOG` environment variable takes precedence over the configured
/// level, matching the usual `tracing_subscriber` env-filter conventions. This
/// function must be called early in application bootstrap and only once.
pub fn init(config: &LogConfig) {
    let filter = EnvFilter::builder()
        .with_default_directive(config.level.level_filter().into())
        .from_env_lossy();

    let format = match config.format {
        LogFormat::Auto if console::user_attended() => LogFormat::Pretty,
        LogFormat::Auto => LogFormat::Simplified,
        other => other,
    };

    let fmt = tracing_subscriber::fmt::layer();
    let fmt = match format {
        LogFormat::Pretty | LogFormat::Auto => fmt.compact().with_ansi(true).boxed(),
        LogFormat::Simplified => fmt.with_ansi(false).boxed(),
        LogFormat::Json => fmt.json().boxed(),
    };

    tracing_subscriber::registry().with(fmt.with_filter(filter)).init();
}
