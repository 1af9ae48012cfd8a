//! CLI argument parsing for the lms-worker binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::auth::Role;
use crate::types::{Action, Entity};

#[derive(Parser)]
#[command(name = "lms-worker", about = "LMS portal bulk operation worker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the worker server (default if no subcommand given)
    Serve,
    /// Run database migrations and exit
    Migrate,
    /// Create or update the site administrator interactively
    CreateAdmin {
        /// Administrator login ID
        #[arg(long)]
        id: String,
    },
    /// Run one bulk operation on a local CSV file and exit
    Process {
        #[arg(long, value_enum)]
        action: Action,
        #[arg(long, value_enum)]
        entity: Entity,
        /// CSV file to process. It is deleted afterwards.
        #[arg(long)]
        file: PathBuf,
        /// Address that receives the report
        #[arg(long)]
        notify: String,
    },
    /// Print a signed access token, for wiring up NATS clients
    IssueToken {
        #[arg(long)]
        id: String,
        #[arg(long, value_enum, default_value = "admin")]
        role: Role,
        #[arg(long, default_value = "")]
        name: String,
    },
}
