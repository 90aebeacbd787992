//! Command-line interface definitions for ruledoc

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI structure for the ruledoc application
#[derive(Parser)]
#[command(name = "ruledoc")]
#[command(version)]
#[command(about = "Section editor with undo/redo and change tracking", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for ruledoc
#[derive(Subcommand)]
pub enum Commands {
    /// Open a document in an interactive editing session
    Edit {
        /// Sectioned Markdown document
        file: PathBuf,

        /// Configuration file (defaults to ruledoc.toml next to the document)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Start with edit mode already on
        #[arg(short, long)]
        edit: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the navigation listing of a document
    Toc {
        /// Sectioned Markdown document
        file: PathBuf,
    },

    /// Create a new document with one section
    Init {
        /// Document to create
        file: PathBuf,

        /// Overwrite an existing document
        #[arg(short, long)]
        force: bool,

        /// Document title
        #[arg(short, long)]
        title: Option<String>,
    },

    /// List built-in section templates
    ListTemplates,
}
