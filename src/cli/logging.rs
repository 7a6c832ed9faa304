//! Tracing subscriber setup for the binary. The library only emits events.
//!
//! | Flag(s)   | Level |
//! |-----------|-------|
//! | (none)    | WARN  |
//! | `-v`      | INFO  |
//! | `-vv`     | DEBUG |
//! | `-vvv`    | TRACE |
//! | `--quiet` | ERROR |
//!
//! `RUST_LOG` overrides all of the above.

use std::io::IsTerminal as _;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::GlobalArgs;

/// Install the global subscriber. Writes to stderr so template output on
/// stdout stays clean.
pub fn init_logging(args: &GlobalArgs) -> anyhow::Result<()> {
    let level = derive_level(args);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("stacksmith={level}")));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise tracing: {e}"))
}

fn derive_level(args: &GlobalArgs) -> &'static str {
    if args.quiet {
        return "error";
    }
    match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(verbose: u8, quiet: bool) -> GlobalArgs {
        GlobalArgs { verbose, quiet }
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(derive_level(&args(0, false)), "warn");
        assert_eq!(derive_level(&args(1, false)), "info");
        assert_eq!(derive_level(&args(2, false)), "debug");
        assert_eq!(derive_level(&args(3, false)), "trace");
        assert_eq!(derive_level(&args(9, false)), "trace");
    }

    #[test]
    fn test_quiet_wins() {
        assert_eq!(derive_level(&args(3, true)), "error");
    }
}
