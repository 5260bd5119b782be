//! Log subscriber setup.
//!
//! Logs go to stderr so `--output json` on stdout stays machine-readable.

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Verbosity requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Use the configured level.
    #[default]
    Normal,
    /// `-v`: debug.
    Verbose,
    /// `-q`: warnings and errors only.
    Quiet,
}

impl Verbosity {
    /// Build from the `-v` / `-q` flags. `-q` wins when both are given.
    #[must_use]
    pub const fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }
}

/// Filter directive used when `RUST_LOG` is unset.
#[must_use]
pub fn default_directive(config: &LoggingConfig, verbosity: Verbosity) -> String {
    match verbosity {
        Verbosity::Verbose => "debug".to_string(),
        Verbosity::Quiet => "warn".to_string(),
        Verbosity::Normal => config.level.clone(),
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the flags and the config file. Calling
/// this twice is harmless; the second call is ignored.
pub fn init(config: &LoggingConfig, verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(default_directive(config, verbosity))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.compact().try_init(),
    };

    if result.is_ok() {
        tracing::debug!(format = ?config.format, "logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_flags() {
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(true, false), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
    }

    #[test]
    fn test_default_directive() {
        let config = LoggingConfig {
            level: "shopsync=trace".to_string(),
            ..LoggingConfig::default()
        };

        assert_eq!(default_directive(&config, Verbosity::Normal), "shopsync=trace");
        assert_eq!(default_directive(&config, Verbosity::Verbose), "debug");
        assert_eq!(default_directive(&config, Verbosity::Quiet), "warn");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let config = LoggingConfig::default();
        init(&config, Verbosity::Quiet);
        init(&config, Verbosity::Quiet);
    }
}
