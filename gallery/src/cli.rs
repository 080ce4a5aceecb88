// gallery/src/cli.rs
//! Defines the command-line argument structure using clap.
use clap::{ArgAction, Parser, Subcommand};
use gallery_common::error::Result;
use gallery_core::GalleryEndpoints;

pub mod backends;
pub mod delete;
pub mod install;
pub mod list;
pub mod search;
pub mod wait;

use crate::cli::backends::Backends;
use crate::cli::delete::Delete;
use crate::cli::install::InstallArgs;
use crate::cli::list::List;
use crate::cli::search::Search;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "gallery", bin_name = "gallery")]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// error, warn, info, debug or trace; takes precedence over -v
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List gallery models, or backends with --backends
    List(List),
    /// Search gallery elements by name, description or tag
    Search(Search),
    /// Install a model or backend and wait for it to finish
    Install(InstallArgs),
    /// Delete an installed model or backend
    Delete(Delete),
    /// Manage statically configured backends
    Backends(Backends),
}

impl Command {
    pub async fn run(&self, endpoints: &GalleryEndpoints) -> Result<()> {
        match self {
            Self::List(command) => command.run(endpoints).await,
            Self::Search(command) => command.run(endpoints).await,
            Self::Install(command) => command.run(endpoints).await,
            Self::Delete(command) => command.run(endpoints).await,
            Self::Backends(command) => command.run(endpoints),
        }
    }
}
