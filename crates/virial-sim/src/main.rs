use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    reference::{self, ReferenceArgs},
    run::{self, RunArgs},
};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "virial-sim", about = "Overlap-sampling virial coefficient driver")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Calibrate and run an overlap-sampling calculation from a YAML file.
    Run(RunArgs),
    /// Print the tabulated hard-sphere virial coefficient.
    Reference(ReferenceArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run::run(&args),
        Command::Reference(args) => reference::run(&args),
    }
}
