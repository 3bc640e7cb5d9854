//! Tracing subscriber setup for the `keystash` binary.
//!
//! The library only emits `tracing` events; installing a subscriber is
//! left to the binary.  Logs go to stderr so they never mix with data
//! written to stdout.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "keystash=debug,warn"
    } else {
        "keystash=warn"
    }
}

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins over `verbose` when it is set and valid.  Calling this
/// twice is harmless; the second call is ignored.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_enables_debug() {
        assert!(default_filter(true).contains("debug"));
        assert!(!default_filter(false).contains("debug"));
    }

    #[test]
    fn init_twice_does_not_panic() {
        init(false);
        init(true);
    }
}
