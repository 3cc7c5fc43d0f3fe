use clap::{Parser, Subcommand};
use std::io::Write;

use cellmap::app_state::AppState;
use cellmap::commands;
use cellmap::logging;
use cellmap::repl::readline;
use std::sync::Arc;
use tokio::sync::RwLock;

#[tokio::main]
async fn main() -> Result<(), String> {
    logging::init();
    let state = Arc::new(RwLock::new(AppState::new()));

    loop {
        let line = readline()?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match respond(line, Arc::clone(&state)).await {
            Ok(quit) => {
                if quit {
                    break;
                }
            }
            Err(err) => {
                writeln!(std::io::stdout(), "{err}").map_err(|e| e.to_string())?;
                std::io::stdout().flush().map_err(|e| e.to_string())?;
            }
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(version, about = "territory map snapshots")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load documents from a directory (defaults to the configured one)
    Load {
        #[arg(short, long)]
        dir: Option<String>,
    },
    /// Generate the map as it stood at an instant
    Snapshot {
        #[arg(short, long)]
        at: String,
        #[arg(long)]
        json: bool,
    },
    /// Show one cell's status and documents
    Cell {
        #[arg(short, long, allow_hyphen_values = true)]
        x: i32,
        #[arg(short, long, allow_hyphen_values = true)]
        y: i32,
        #[arg(short, long)]
        at: Option<String>,
    },
    /// List the instants at which the map changes
    Timeline,
    Config,
    SetDirectory {
        #[arg(short, long)]
        path: String,
    },
    Exit,
}

async fn respond(line: &str, state: Arc<RwLock<AppState>>) -> Result<bool, String> {
    let mut args = shlex::split(line).ok_or("error: Invalid quoting")?;
    args.insert(0, "cellmap".to_string());
    let cli = Cli::try_parse_from(args).map_err(|e| e.to_string())?;

    match &cli.command {
        Some(Commands::Load { dir }) => commands::load(dir.as_deref(), state).await,
        Some(Commands::Snapshot { at, json }) => commands::snapshot(at, *json, state).await,
        Some(Commands::Cell { x, y, at }) => commands::cell(*x, *y, at.as_deref(), state).await,
        Some(Commands::Timeline) => commands::timeline(state).await,
        Some(Commands::Config) => commands::show_config(state).await,
        Some(Commands::SetDirectory { path }) => commands::set_directory(path, state).await,
        Some(Commands::Exit) => {
            write!(std::io::stdout(), "quitting...").map_err(|e| e.to_string())?;
            std::io::stdout().flush().map_err(|e| e.to_string())?;
            return Ok(true);
        }
        None => {}
    }
    Ok(false)
}
