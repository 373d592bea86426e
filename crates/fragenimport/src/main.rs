#![allow(unused)]

use crate::prelude::*;
use clap::Parser;

mod error;
mod import;
mod prelude;
mod validate;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Import the Einb\u{FC}rgerungstest question catalog from PDF into a JSON dataset"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Whether to display additional information.
    #[clap(long, env = "FRAGENIMPORT_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Parse the catalog PDF and write the question dataset
    Import(import::ImportOptions),

    /// Check a question dataset for incomplete entries
    Validate(validate::ValidateOptions),
}

fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Import(options) => import::run(options, app.global),
        SubCommands::Validate(options) => validate::run(options, app.global),
    }
}
