#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `zsplit_logging` maps the CLI's repeated `-v` flags onto a [`tracing`]
//! level filter and installs a stderr subscriber. All of the splitter's
//! diagnostics — record dumps, checksum mismatches, split-handler state —
//! are tracing events; this crate decides which of them the operator sees.
//!
//! The `ZSPLIT_LOG` environment variable overrides the flag-derived filter
//! with a full `tracing_subscriber::EnvFilter` directive set.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Environment variable carrying an explicit filter directive set.
pub const LOG_ENV: &str = "ZSPLIT_LOG";

/// How chatty the process should be on stderr.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Warnings and errors only; the tool's normal operating mode.
    #[default]
    Normal,
    /// Progress messages (`-v`).
    Verbose,
    /// Full per-record diagnostics (`-vv` and beyond).
    Debug,
}

impl Verbosity {
    /// Maps a count of `-v` occurrences onto a verbosity tier.
    #[must_use]
    pub fn from_flag_count(count: u8) -> Self {
        match count {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// The tracing level filter this tier corresponds to.
    #[must_use]
    pub fn level_filter(self) -> LevelFilter {
        match self {
            Self::Normal => LevelFilter::WARN,
            Self::Verbose => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
        }
    }
}

/// Installs the global stderr subscriber for `verbosity`.
///
/// Honors [`LOG_ENV`] when set. Safe to call more than once; only the
/// first installation wins, which keeps tests that exercise the CLI entry
/// point from panicking.
pub fn init(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::default().add_directive(verbosity.level_filter().into()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_counts_map_to_tiers() {
        assert_eq!(Verbosity::from_flag_count(0), Verbosity::Normal);
        assert_eq!(Verbosity::from_flag_count(1), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flag_count(2), Verbosity::Debug);
        assert_eq!(Verbosity::from_flag_count(9), Verbosity::Debug);
    }

    #[test]
    fn tiers_map_to_level_filters() {
        assert_eq!(Verbosity::Normal.level_filter(), LevelFilter::WARN);
        assert_eq!(Verbosity::Verbose.level_filter(), LevelFilter::INFO);
        assert_eq!(Verbosity::Debug.level_filter(), LevelFilter::DEBUG);
    }

    #[test]
    fn tiers_order_by_chattiness() {
        assert!(Verbosity::Normal < Verbosity::Verbose);
        assert!(Verbosity::Verbose < Verbosity::Debug);
    }

    #[test]
    fn init_is_idempotent() {
        init(Verbosity::Normal);
        init(Verbosity::Debug);
    }
}
