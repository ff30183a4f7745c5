//! wellsync command-line entry point

// CLI binary needs to output to stdout/stderr - this is intentional
#![allow(clippy::print_stdout, clippy::print_stderr)]

use clap::Parser;
use wellsync_cli::Cli;
use wellsync_cli::errors::{EXIT_CLI, EXIT_OK, exit_code_for};

fn main() {
    // NOTE: Using eprintln! in panic hook is intentional - tracing infrastructure
    // may be corrupted during a panic, so we use the most reliable output method.
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = Cli::parse();

    // Single-threaded: the tracing subscriber is installed per thread
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start async runtime: {e}");
            std::process::exit(EXIT_CLI);
        }
    };

    let exit_code = runtime.block_on(async {
        match wellsync_cli::run(&cli).await {
            Ok(value) => {
                let rendered =
                    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
                println!("{rendered}");
                EXIT_OK
            }
            Err(err) => {
                let code = exit_code_for(&err);
                eprintln!("{:?}", miette::Report::new(err));
                code
            }
        }
    });

    drop(runtime);
    std::process::exit(exit_code);
}
