//! Tracing initialization.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Initialize diagnostic logging on stderr.
///
/// Reads the `TREL_LOG` environment variable as an `EnvFilter` directive,
/// for example `TREL_LOG=transcript_relations=debug`. Without it the level
/// is `warn`, or `info` when `verbose` is set.
///
/// Calling this more than once has no further effect.
pub fn init_tracing(verbose: bool) {
    INIT.call_once(|| {
        let fallback = if verbose {
            "transcript_relations=info,trel=info"
        } else {
            "transcript_relations=warn,trel=warn"
        };
        let filter = EnvFilter::try_from_env("TREL_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));

        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(filter)
            .init();
    });
}
