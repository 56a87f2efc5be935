//! Logging configuration and subscriber setup.
//!
//! All output goes to stderr, so command output on stdout stays pipeable.

use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, colored, for terminals.
    #[default]
    Pretty,
    /// One line per event.
    Compact,
    /// One JSON object per event, with the current request span.
    Json,
    /// Single line with thread ids and targets.
    Full,
}

impl std::str::FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> TelemetryResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            "full" => Ok(Self::Full),
            other => Err(TelemetryError::ConfigError(format!(
                "unknown log format '{other}'"
            ))),
        }
    }
}

/// What [`setup_logging`] installs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Base level filter, e.g. `info`.
    pub level: String,
    /// Line format.
    pub format: LogFormat,
    /// ANSI colors. Always off for JSON.
    pub ansi: bool,
    /// Extra directives such as `hyper=warn`.
    pub directives: Vec<String>,
}

impl LogConfig {
    /// Pretty, colored output at `level`.
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            format: LogFormat::default(),
            ansi: true,
            directives: Vec::new(),
        }
    }

    /// Build from the `[logging]` config section.
    ///
    /// `debug` is `server.debug`; it raises the default level to `debug`.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::ConfigError`] for an unknown format.
    #[cfg(feature = "config")]
    pub fn from_section(
        section: &magicproxy_config::LoggingSection,
        debug: bool,
    ) -> TelemetryResult<Self> {
        let mut config =
            Self::new(section.effective_level(debug)).with_format(section.format.parse()?);
        config.directives.clone_from(&section.directives);
        Ok(config)
    }

    /// Set the format. JSON turns colors off.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        if format == LogFormat::Json {
            self.ansi = false;
        }
        self
    }

    /// Add a directive override.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    fn build_filter(&self) -> TelemetryResult<EnvFilter> {
        self.directives.iter().try_fold(
            EnvFilter::try_new(&self.level).map_err(|e| TelemetryError::ConfigError(e.to_string()))?,
            |filter, directive| {
                directive
                    .parse()
                    .map(|d| filter.add_directive(d))
                    .map_err(|e: tracing_subscriber::filter::ParseError| {
                        TelemetryError::ConfigError(format!("directive '{directive}': {e}"))
                    })
            },
        )
    }

    fn build_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        match self.format {
            LogFormat::Json => fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(std::io::stderr)
                .boxed(),
            LogFormat::Pretty => fmt::layer()
                .pretty()
                .with_ansi(self.ansi)
                .with_writer(std::io::stderr)
                .boxed(),
            LogFormat::Compact => fmt::layer()
                .compact()
                .with_ansi(self.ansi)
                .with_writer(std::io::stderr)
                .boxed(),
            LogFormat::Full => fmt::layer()
                .with_ansi(self.ansi)
                .with_thread_ids(true)
                .with_target(true)
                .with_writer(std::io::stderr)
                .boxed(),
        }
    }
}

/// Install the global subscriber described by `config`.
///
/// # Errors
///
/// Returns [`TelemetryError::ConfigError`] for a bad level or directive and
/// [`TelemetryError::InitError`] if a global subscriber is already set.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = config.build_filter()?;
    tracing_subscriber::registry()
        .with(config.build_layer())
        .with(filter)
        .try_init()
        .map_err(|e| TelemetryError::InitError(e.to_string()))
}
