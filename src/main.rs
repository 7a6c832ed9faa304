//! stacksmith CLI: synthesize infrastructure stacks into deployable templates.

use clap::Parser;
use stacksmith::cli::{logging, Commands, GlobalArgs};

#[derive(Parser, Debug)]
#[command(
    name = "stacksmith",
    version,
    about = "Synthesize declarative infrastructure stacks into deterministic templates"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init_logging(&cli.global) {
        eprintln!("warning: {:#}", e);
    }
    if let Err(e) = stacksmith::cli::dispatch(cli.command) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
