use clap::{Parser, Subcommand, ValueEnum};
use reelhouse_common::LibraryKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reelhouse")]
#[command(author, version, about = "Self-hosted media library and playback server")]
pub struct Cli {
    /// Path to config file
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

    /// Reconcile the catalog against the media roots, ignoring the cooldown
    Reconcile {
        /// Which library to reconcile
        #[arg(value_enum)]
        target: ReconcileTarget,
    },

    /// Check that the external encoder and prober are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReconcileTarget {
    Movies,
    Tv,
    Music,
    All,
}

impl ReconcileTarget {
    /// Library kinds covered by this target, in reconciliation order.
    pub fn kinds(self) -> Vec<LibraryKind> {
        match self {
            Self::Movies => vec![LibraryKind::Movies],
            Self::Tv => vec![LibraryKind::Tv],
            Self::Music => vec![LibraryKind::Music],
            Self::All => LibraryKind::ALL.to_vec(),
        }
    }
}
