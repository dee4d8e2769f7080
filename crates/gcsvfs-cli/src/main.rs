//! gcsvfs-cli - Command-line interface for the gcsvfs adapter
//!
//! Reads `gs://` objects through the same handles a host file system would
//! use, so buffer settings and credentials can be tried from a shell:
//! - `cat` streams an object, or a byte range of it
//! - `stat` shows size and modification time
//! - `exists` reports what `file_exists` would answer
//! - `config` shows or creates the configuration file

use anyhow::Result;
use clap::{Parser, Subcommand};
use gcsvfs::VfsError;
use std::path::PathBuf;
use std::process;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;

/// gcsvfs - Read Google Cloud Storage objects as files
#[derive(Parser)]
#[command(name = "gcsvfs")]
#[command(author, version, about = "Read Google Cloud Storage objects as files", long_about = None)]
struct Cli {
    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Configuration file to use instead of the default location
    #[arg(long, global = true, env = "GCSVFS_CONFIG")]
    config: Option<PathBuf>,

    /// Read buffer size for this invocation (e.g. 256KiB, 4MiB)
    #[arg(long, global = true)]
    buffer_size: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write an object, or a byte range of it, to stdout or a file
    Cat {
        /// Object URL (gs://bucket/key)
        url: String,

        /// First byte to read
        #[arg(long, default_value_t = 0)]
        offset: u64,

        /// Number of bytes to read (default: to the end of the object)
        #[arg(long)]
        length: Option<u64>,

        /// Fetch every read directly, bypassing the read buffer
        #[arg(long)]
        direct_io: bool,

        /// Output file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Size of each read issued against the handle
        #[arg(long, default_value = "64KiB")]
        chunk: String,
    },

    /// Show object metadata
    Stat {
        /// Object URL (gs://bucket/key)
        url: String,

        /// Output format as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print whether an object exists and is non-empty
    Exists {
        /// Object URL (gs://bucket/key)
        url: String,
    },

    /// Show or create configuration
    Config {
        /// Show the effective configuration
        #[arg(long, conflicts_with_all = ["path", "init"])]
        show: bool,

        /// Show configuration file path
        #[arg(long, conflicts_with_all = ["show", "init"])]
        path: bool,

        /// Write the example configuration file if none exists
        #[arg(long, conflicts_with_all = ["show", "path"])]
        init: bool,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let result = run();

    match result {
        Ok(_) => process::exit(0),
        Err(e) => {
            error!("Error: {:#}", e);

            let exit_code = map_error_to_exit_code(&e);
            process::exit(exit_code);
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config_path = cli.config.as_deref();
    let buffer_size = cli.buffer_size.as_deref();

    match cli.command {
        Commands::Cat {
            url,
            offset,
            length,
            direct_io,
            output,
            chunk,
        } => {
            let config = commands::load_config(config_path, buffer_size)?;
            let options = commands::CatOptions {
                offset,
                length,
                direct_io,
                output,
                chunk: gcsvfs::parse_size(&chunk)? as usize,
            };
            commands::cat(&config, &url, options)
        }

        Commands::Stat { url, json } => {
            let config = commands::load_config(config_path, buffer_size)?;
            commands::stat(&config, &url, json)
        }

        Commands::Exists { url } => {
            let config = commands::load_config(config_path, buffer_size)?;
            commands::exists(&config, &url)
        }

        Commands::Config { show, path, init } => {
            commands::config(config_path, buffer_size, show, path, init)
        }
    }
}

/// 0 success, 1 configuration or other failure, 2 remote I/O failure,
/// 3 invalid URL, unsupported operation or precondition violation
fn map_error_to_exit_code(err: &anyhow::Error) -> i32 {
    if let Some(vfs_err) = err.downcast_ref::<VfsError>() {
        match vfs_err {
            VfsError::RemoteIo { .. } => 2,
            VfsError::InvalidUrl(_) => 3,
            VfsError::Unsupported(_) => 3,
            VfsError::PreconditionViolation(_) => 3,
            VfsError::Config(_) => 1,
            VfsError::Io(_) => 1,
            VfsError::Runtime(_) => 1,
        }
    } else {
        1
    }
}
