//! Stack Buckets CLI
//!
//! Renders saved stack dumps as deduplicated reports, and demonstrates
//! in-process reporting from `main` and from a panic hook.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::io;
use std::panic;
use std::path::PathBuf;

use stack_buckets::capture::FrameMarker;
use stack_buckets::commands::{execute_render, parse_boundary, OutputFormat, RenderArgs};
use stack_buckets::utils::config::{DEFAULT_LIBRARY_PATH, SCHEMA_VERSION};
use stack_buckets::{hook, Reporter};

/// Stack Buckets - grouped, aligned stack reports
#[derive(Parser, Debug)]
#[command(name = "buckets")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a saved stack dump
    Render {
        /// Dump file to read ("-" for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Import path whose production frames are hidden
        #[arg(short, long, default_value = DEFAULT_LIBRARY_PATH)]
        library: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Function whose call chain is marked with '>'
        #[arg(long)]
        caller: Option<String>,

        /// Capture boundary as <module>/<file>; frames up to it are dropped
        #[arg(long, value_parser = parse_boundary)]
        boundary: Option<FrameMarker>,
    },

    /// Report from main, then from a panic hook
    Demo,

    /// Display the dump format and JSON schema version
    Schema,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Render {
            input,
            library,
            format,
            caller,
            boundary,
        } => {
            let args = RenderArgs {
                input: (input.as_os_str() != "-").then_some(input),
                library_path: library,
                format,
                caller,
                boundary,
            };
            let stdout = io::stdout();
            execute_render(&args, &mut stdout.lock())?;
        }

        Commands::Demo => {
            report_from_main()?;
            report_from_panic();
        }

        Commands::Schema => {
            display_schema();
        }
    }

    Ok(())
}

/// Plain report: the bucket lists main and this function
fn report_from_main() -> Result<()> {
    stack_buckets::print()?;
    Ok(())
}

/// Report written by the panic hook while the panicking frames are live
fn report_from_panic() {
    hook::install_with(Reporter::new(), io::stdout);
    let result = panic::catch_unwind(divide_by_zero);
    drop(panic::take_hook());

    if let Err(payload) = result {
        let message = payload
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| payload.downcast_ref::<&str>().copied())
            .unwrap_or("<non-string panic>");
        println!("recovered: {}", message);
    }
}

#[inline(never)]
fn divide_by_zero() -> i32 {
    let x = 1;
    let y = std::hint::black_box(0);
    x / y
}

/// Display the dump format
///
/// **Private** - internal command implementation
fn display_schema() {
    println!("Stack Buckets dump format");
    println!("JSON report schema: v{}", SCHEMA_VERSION);
    println!();
    println!("  thread <id> [<state>[, <N> minutes][, locked]]:");
    println!("  <symbol>(<args>)");
    println!("  \t<path>:<line>          - or '?' when unresolved");
    println!("  ...additional frames elided...");
    println!("  created by <symbol>");
    println!("  \t<path>:<line>");
    println!("  <blank line>            - ends the thread record");
}
