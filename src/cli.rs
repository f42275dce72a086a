use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "odyssey")]
#[command(author, version, about = "Governed AI gateway and business tooling server")]
pub struct Cli {
    /// Path to config file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run the content guard over a piece of text
    Classify {
        /// Text to screen
        #[arg(required = true)]
        text: String,

        /// Declared usage context (e.g. "medical")
        #[arg(long)]
        context: Option<String>,
    },

    /// Price a janitorial service request
    Quote {
        /// Facility size in square feet
        #[arg(long)]
        size: u64,

        /// Service ids, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        services: Vec<String>,

        /// Cleaning frequency
        #[arg(long, default_value = "weekly")]
        frequency: String,
    },

    /// Print the gateway's governance manifest and constitutional hash
    ManifestHash,

    /// Print the SQL script that drops redundant row-level-security policies
    DropPolicies {
        /// Restrict the script to one table
        #[arg(long)]
        table: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses --config if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
