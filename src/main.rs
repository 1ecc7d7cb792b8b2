use clap::Parser;
use equitysim::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
