//! Command-line interface for library-pack
//!
//! Provides `pack`, `config` and `completions` subcommands.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod pack;
mod show;
mod utils;

/// Transform a source tree into a library output tree with declarations and source maps
#[derive(Parser)]
#[command(name = "library-pack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform every discovered source file into the output directory
    Pack(Box<pack::PackArgs>),

    /// Print the resolved configuration without packing
    Config(show::ConfigArgs),

    /// Generate a shell completion script
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG in the environment is honored; --verbose adds DEBUG, otherwise INFO so that
    // each packed file is reported.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    match cli.command {
        Commands::Pack(args) => pack::run(*args),
        Commands::Config(args) => show::run(args),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "library-pack", &mut std::io::stdout());
            Ok(())
        }
    }
}
