use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Fail on field kind mismatches instead of skipping the field
    #[arg(long, global = true)]
    pub strict: bool,

    /// Load references to unregistered types as null
    #[arg(long, global = true)]
    pub substitute_unknown: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List registered types with their base and fields
    Types {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the record structure of a stream without resolving types
    Inspect {
        /// Serialized stream or asset file
        file: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Convert a binary stream to its JSON rendering
    ToJson {
        /// Serialized stream or asset file
        file: PathBuf,
    },

    /// Convert a JSON rendering to a binary stream
    FromJson {
        /// JSON input file
        json: PathBuf,

        /// Output stream file
        out: PathBuf,
    },

    /// Check every asset in a directory against its manifest
    Verify {
        /// Asset directory
        dir: PathBuf,
    },
}
