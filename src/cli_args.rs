use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "doc-review", version, about = "Compliance review assistant for legal documents")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose logging for the review stack
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Review a document and print its findings
    Review {
        /// Plain-text or `.html` document
        file: PathBuf,
        /// Print findings as JSON
        #[arg(long)]
        json: bool,
        /// Document title shown in the report (default: file name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Summarize a document
    Summarize {
        /// Plain-text or `.html` document
        file: PathBuf,
        /// Document title used in the prompt (default: file name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Locate previously generated findings in an editor document
    Locate {
        /// Editor body HTML
        file: PathBuf,
        /// JSON array of findings (as printed by `review --json`)
        #[arg(long)]
        findings: PathBuf,
    },
}
