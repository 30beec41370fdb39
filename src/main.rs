#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{Level as TraceLevel, info};
use tracing_subscriber::FmtSubscriber;

use spacepin::persistence::AssignmentStore;

#[derive(Parser)]
#[command(name = "spacepin", version, about = "Inspect and manage saved window layouts")]
struct Cli {
    /// Assignment database file (defaults to the user config directory)
    #[arg(long, value_name = "PATH", global = true)]
    data_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List saved app assignments
    List,
    /// Show one app's saved windows
    Show { bundle_id: String },
    /// Remove one app's saved assignment
    Forget { bundle_id: String },
    /// Remove every saved assignment
    Clear,
    /// Print the assignment database path
    Path,
}

fn main() -> Result<()> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let path = cli.data_file.unwrap_or_else(AssignmentStore::default_path);
    let mut store = AssignmentStore::load(path);

    match cli.command {
        Command::List => {
            let apps = store.database().sorted_by_app_name();
            if apps.is_empty() {
                println!("no saved assignments");
                return Ok(());
            }
            for app in apps {
                println!(
                    "{:<24} {:<36} monitor {:>2}  {} window(s)",
                    app.app_name,
                    app.bundle_identifier,
                    app.primary_monitor_index + 1,
                    app.windows.len()
                );
            }
        }
        Command::Show { bundle_id } => match store.database().get(&bundle_id) {
            Some(app) => {
                println!("{} ({})", app.app_name, app.bundle_identifier);
                println!("primary monitor: {}", app.primary_monitor_index + 1);
                for window in &app.windows {
                    let title = if window.window_title.is_empty() {
                        "(untitled)"
                    } else {
                        window.window_title.as_str()
                    };
                    println!(
                        "  [{}] {:<40} monitor {} space {}",
                        window.window_index,
                        title,
                        window.monitor_index + 1,
                        window.space_index + 1
                    );
                }
            }
            None => println!("no assignment saved for {bundle_id}"),
        },
        Command::Forget { bundle_id } => {
            if store.remove(&bundle_id)? {
                info!(bundle = %bundle_id, "assignment removed");
            } else {
                println!("no assignment saved for {bundle_id}");
            }
        }
        Command::Clear => {
            let count = store.database().len();
            store.clear()?;
            info!(removed = count, "all assignments cleared");
        }
        Command::Path => println!("{}", store.path().display()),
    }

    Ok(())
}
