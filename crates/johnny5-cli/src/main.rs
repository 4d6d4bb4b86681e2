//! # johnny5 CLI
//!
//! Runs commands with the uname interposer preloaded, and reports what
//! uname(2) looks like from inside such a process.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use johnny5_config::{log_cli_warn, Config};

mod identity;
mod preload;

/// johnny5 - preload a uname(2) interposer into any command
#[derive(Parser)]
#[command(name = "johnny5")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the shim library (overrides config and search)
    #[arg(long, global = true)]
    library: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a command with the shim preloaded
    Run {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        command: Vec<String>,
    },

    /// Print shell exports that preload the shim, for eval
    Env,

    /// Print the system identity as seen by this process
    Uname {
        /// Print all fields
        #[arg(short, long)]
        all: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show effective configuration as TOML
    Show,
    /// Show config file locations
    Path,
}

fn main() -> Result<()> {
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }

    let cli = Cli::parse();
    let (config, load_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    johnny5_config::logging::init_logging(config.logging.level);
    if let Some(e) = load_error {
        log_cli_warn!("Falling back to default config", error = e.to_string().as_str());
    }

    match cli.command {
        Commands::Run { command } => {
            let library = preload::find_shim_library(
                cli.library.as_deref(),
                config.preload.library.as_deref(),
            )?;
            let code = preload::cmd_run(&library, config.preload.flat_namespace, &command)?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Commands::Env => {
            let library = preload::find_shim_library(
                cli.library.as_deref(),
                config.preload.library.as_deref(),
            )?;
            preload::cmd_env(&library, config.preload.flat_namespace)?;
        }
        Commands::Uname { all } => identity::cmd_uname(all)?,
        Commands::Config { command } => match command {
            ConfigCommands::Show => print!("{}", config.to_toml()),
            ConfigCommands::Path => {
                let global = Config::global_config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(no home directory)".to_string());
                println!("{} {}", style("Global:").bold(), global);
                println!(
                    "{} {}",
                    style("Project:").bold(),
                    Config::project_config_path().display()
                );
            }
        },
    }

    Ok(())
}
