use clap::Parser;
use quantfolio::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
