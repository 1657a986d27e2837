//! CLI commands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// chatdoc - manage locally stored document conversations
#[derive(Parser, Debug)]
#[command(name = "chatdoc")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the stored records (overrides the config file)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(long = "config", global = true)]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List conversations, newest first
    List,

    /// Print one conversation
    Show {
        /// Upload id of the conversation
        id: String,
    },

    /// Rename a conversation
    Rename {
        id: String,
        label: String,
    },

    /// Delete a conversation from local history
    Remove {
        id: String,
    },

    /// Export the whole history as JSON
    Export {
        /// Output file or directory (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace the whole history with an exported file
    Import {
        file: PathBuf,
    },

    /// Delete every expired conversation now
    Sweep,

    /// Count conversations that will be deleted at the next sweep
    Expired,

    /// Preview the text that would be sent for a follow-up question
    Compose {
        id: String,
        question: String,
    },

    /// Bring-your-own-keys credentials
    Byok {
        #[command(subcommand)]
        command: ByokCommands,
    },

    /// Base URL of the document service
    ApiUrl {
        #[command(subcommand)]
        command: ApiUrlCommands,
    },

    /// Run the midnight expiry sweep in the foreground until interrupted
    Watch,

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ByokCommands {
    /// Store a credential bundle, replacing any existing one
    Set {
        #[arg(long)]
        api_key: String,

        #[arg(long)]
        vector_store_uri: String,

        #[arg(long)]
        vector_store_token: String,

        #[arg(long)]
        collection: String,
    },

    /// Remove the stored bundle
    Clear,

    /// Show whether a bundle is stored
    Status,
}

#[derive(Subcommand, Debug)]
pub enum ApiUrlCommands {
    Get,
    Set { url: String },
    /// Go back to the default URL
    Reset,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Print the config file location
    Path,
}
