use clap::Parser;
use sortback::cli::{Cli, run};
use sortback::output::OutputFormatter;
use std::process;

fn main() {
    let cli = Cli::parse();

    if let Err(message) = run(cli) {
        OutputFormatter::error(&message);
        process::exit(1);
    }
}
