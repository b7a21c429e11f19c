use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "exstore", version, about = "Static exercise gallery publisher")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to ./exstore.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Exercise store root (overrides the configured one)
    #[arg(short, long)]
    pub store: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a packaged exercise archive and publish it into the store
    Publish {
        /// Path to the archive (.zip, .tar.gz, .tgz or .tar)
        archive: PathBuf,
    },

    /// List published exercises from the manifest
    List,

    /// Remove a published exercise and its manifest record
    Remove {
        slug: String,
        #[arg(short = 'f', long = "force")]
        force: bool,
    },

    /// Mirror operations against the remote GitHub repository
    Remote {
        #[command(subcommand)]
        cmd: RemoteCmd,
    },

    /// Show or initialize configuration
    Config {
        #[command(subcommand)]
        cmd: Option<ConfigCmd>,
    },
}

#[derive(Subcommand, Debug)]
pub enum RemoteCmd {
    /// Upload a published exercise folder to the remote repository
    Push {
        slug: String,
        /// Commit message
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Delete a remote path recursively (best effort, not transactional)
    Rm {
        path: String,
        /// Commit message
        #[arg(short, long)]
        message: Option<String>,
    },

    /// List a remote directory
    Ls { path: Option<String> },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCmd {
    /// Show the effective configuration
    Show,
    /// Write a default exstore.toml to the working directory
    Init,
}
