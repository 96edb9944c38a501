//! A thin binary wiring `itstool-core` and `itstool-catalog` together: it
//! loads a rule set, parses the source document, runs extract or merge, and
//! writes the result. All translation logic lives in the library crates;
//! this binary only does argument parsing, I/O, and logging setup.

mod args;
mod commands;

use clap::Parser;

use args::{Arguments, Command};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let arguments = Arguments::parse();
    match arguments.command {
        Command::Extract(args) => commands::extract::run(args),
        Command::Merge(args) => commands::merge::run(args),
    }
}
