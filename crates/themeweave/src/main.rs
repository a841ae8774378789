//! themeweave CLI - Main entry point

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "themeweave")]
#[command(version)]
#[command(about = "Inspect, edit and compile LESS themes", long_about = None)]
struct Cli {
    #[command(flatten)]
    theme: ThemeArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command
#[derive(Args, Debug, Clone)]
pub struct ThemeArgs {
    /// Theme root directory
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Configuration file (defaults to <root>/themeweave.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override store file (defaults to the configured store path)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the theme's units
    Units,

    /// Show the variable catalog of a unit
    Vars {
        unit: String,

        /// Print the resolved catalog as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve one variable as seen from a unit
    Resolve { unit: String, name: String },

    /// Print the assembled LESS program of a unit
    Assemble {
        unit: String,

        /// Label each layer with a comment
        #[arg(long)]
        layers: bool,
    },

    /// Print the preprocessed LESS program of a unit
    Preprocess {
        unit: String,

        /// Print the source and the extracted at-rules as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compile a unit to CSS with lessc
    Compile {
        unit: String,

        /// Write output to FILE instead of stdout
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Unsaved edit applied for this compile only (NAME=VALUE)
        #[arg(short = 'D', long = "define")]
        defines: Vec<String>,

        /// Fail instead of emitting the fallback block when lessc is missing
        #[arg(long)]
        no_fallback: bool,
    },

    /// Print the static custom property block
    Fallback {
        /// Write output to FILE instead of stdout
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Save overrides for a unit
    Set {
        unit: String,

        /// Overrides as NAME=VALUE; an empty value removes the override
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Remove every override of a unit
    Reset { unit: String },

    /// Export a unit's resolved values as JSON
    Export {
        unit: String,

        /// Write output to FILE instead of stdout
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Apply a previous export to a unit
    Import { unit: String, file: PathBuf },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "themeweave=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let theme = commands::Theme::open(&cli.theme)?;

    match cli.command {
        Commands::Units => commands::units::execute(&theme),
        Commands::Vars { unit, json } => commands::vars::execute(&theme, &unit, json),
        Commands::Resolve { unit, name } => commands::resolve::execute(&theme, &unit, &name),
        Commands::Assemble { unit, layers } => commands::assemble::execute(&theme, &unit, layers),
        Commands::Preprocess { unit, json } => commands::preprocess::execute(&theme, &unit, json),
        Commands::Compile {
            unit,
            output,
            defines,
            no_fallback,
        } => commands::compile::execute(
            &theme,
            commands::compile::CompileArgs {
                unit,
                output,
                defines,
                no_fallback,
            },
        ),
        Commands::Fallback { output } => commands::fallback::execute(&theme, output.as_deref()),
        Commands::Set { unit, values } => commands::set::execute(&theme, &unit, &values),
        Commands::Reset { unit } => commands::reset::execute(&theme, &unit),
        Commands::Export { unit, output } => {
            commands::export::execute(&theme, &unit, output.as_deref())
        }
        Commands::Import { unit, file } => commands::import::execute(&theme, &unit, &file),
    }
}
