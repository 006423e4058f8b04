// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `unitdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "unitdag",
    version,
    about = "Build and watch a tree of dependent library/application units.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Unitdag.toml", global = true)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `UNITDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Build a unit and its dependencies, skipping unchanged units.
    Build {
        /// Unit to build. Defaults to every unit nothing else depends on.
        unit: Option<String>,
    },
    /// Build a unit and its dependencies, ignoring the incremental cache.
    Rebuild {
        unit: Option<String>,
    },
    /// Build, then re-run the minimal steps for every file change.
    Watch {
        unit: Option<String>,
    },
    /// Print units, dependencies and composed pipelines without running them.
    List,
}

impl Command {
    pub fn unit(&self) -> Option<&str> {
        match self {
            Command::Build { unit } | Command::Rebuild { unit } | Command::Watch { unit } => {
                unit.as_deref()
            }
            Command::List => None,
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
