//! Tracing setup for the `grctl` binary and library consumers.
//!
//! Logs always go to stderr so that command output on stdout stays clean.

use std::io::{self, IsTerminal};

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Filter directive for the given verbosity flags.
///
/// `quiet` wins over `verbose`. Both the library (`gr`) and the binary
/// (`grctl`) targets are covered.
pub fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "gr=error,grctl=error";
    }
    match verbose {
        0 => "gr=info,grctl=info",
        1 => "gr=debug,grctl=debug",
        _ => "gr=trace,grctl=trace",
    }
}

/// Install the global subscriber.
///
/// | Mode  | TTY | Output                 |
/// |-------|-----|------------------------|
/// | JSON  | any | JSON lines             |
/// | Human | yes | Colored, no targets    |
/// | Human | no  | Compact plain text     |
///
/// `RUST_LOG` overrides the verbosity flags (e.g. `gr=debug,reqwest=warn`).
/// Calling this twice is harmless; the second subscriber is discarded.
pub fn init_logging(json: bool, verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    let registry = tracing_subscriber::registry().with(filter);

    let result = if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false)
                    .with_span_events(FmtSpan::NONE)
                    .with_writer(io::stderr),
            )
            .try_init()
    } else if io::stderr().is_terminal() {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_span_events(FmtSpan::NONE)
                    .with_writer(io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .compact()
                    .with_ansi(false)
                    .with_target(false)
                    .with_span_events(FmtSpan::NONE)
                    .with_writer(io::stderr),
            )
            .try_init()
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "Subscriber already installed");
    }
}
