//! Tasknest CLI - Command Line Interface

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tasknest_core::AppConfig;
use tasknest_state::{AppStore, SledKeyValueStore, TaskFilter, TracingErrorSink};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tasknest")]
#[command(about = "Tasknest - tasks, theme and session from the terminal")]
#[command(version)]
struct Cli {
    /// Configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory, overrides the configuration
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Task list operations
    Tasks {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Color theme
    Theme {
        #[command(subcommand)]
        action: ThemeAction,
    },

    /// Local session marker
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// User profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Store status
    Status,

    /// Print the default configuration
    Config {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum TaskAction {
    /// Add a task
    Add {
        /// Task title
        title: String,
    },

    /// Flip a task between open and done
    Toggle {
        /// Task id or unique id prefix
        id: String,
    },

    /// Remove a task
    Remove {
        /// Task id or unique id prefix
        id: String,
    },

    /// List tasks
    List {
        /// all, active or completed
        #[arg(short, long, default_value = "all")]
        filter: TaskFilter,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ThemeAction {
    /// Show the current theme
    Show,

    /// Switch between light and dark
    Toggle,

    /// Set the theme explicitly
    Set {
        /// light or dark
        theme: String,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Mark the session as logged in
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        name: Option<String>,
    },

    /// Clear the session
    Logout,

    /// Show the session
    Show,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Update the profile
    Set {
        #[arg(short, long)]
        name: String,

        #[arg(short, long, default_value = "")]
        bio: String,
    },

    /// Show the profile
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => {
            let mut config = AppConfig::default();
            if let Some(dir) = dirs::data_dir() {
                config.data_dir = dir.join("tasknest");
            }
            config
        }
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    // Initialize logging; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Config { output } = &cli.command {
        let json = AppConfig::default().to_json()?;
        match output {
            Some(path) => {
                std::fs::write(path, &json)?;
                println!("Configuration saved to: {}", path.display());
            }
            None => println!("{}", json),
        }
        return Ok(());
    }

    let store = open_store(&config).await?;
    let result = run(&store, cli.command);
    store.shutdown().await;
    result
}

async fn open_store(config: &AppConfig) -> anyhow::Result<AppStore> {
    std::fs::create_dir_all(&config.data_dir).with_context(|| {
        format!("cannot create data directory {}", config.data_dir.display())
    })?;
    let path = config.data_dir.join("store");
    debug!(path = %path.display(), "opening backing store");

    let backend = Arc::new(SledKeyValueStore::open(&path)?);
    let store = AppStore::open(&config.persistence, backend, Arc::new(TracingErrorSink)).await?;
    Ok(store)
}

fn run(store: &AppStore, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Tasks { action } => handle_task_command(action, store),
        Commands::Theme { action } => handle_theme_command(action, store),
        Commands::Session { action } => handle_session_command(action, store),
        Commands::Profile { action } => handle_profile_command(action, store),
        Commands::Status => {
            println!("{}", commands::render_status(store));
            Ok(())
        }
        Commands::Config { .. } => Ok(()),
    }
}

fn handle_task_command(action: TaskAction, store: &AppStore) -> anyhow::Result<()> {
    match action {
        TaskAction::Add { title } => commands::add_task(store, &title),
        TaskAction::Toggle { id } => commands::toggle_task(store, &id),
        TaskAction::Remove { id } => commands::remove_task(store, &id),
        TaskAction::List { filter, json } => commands::list_tasks(store, filter, json),
    }
}

fn handle_theme_command(action: ThemeAction, store: &AppStore) -> anyhow::Result<()> {
    match action {
        ThemeAction::Show => {
            println!("Theme: {}", store.state().theme);
            Ok(())
        }
        ThemeAction::Toggle => commands::set_theme(store, None),
        ThemeAction::Set { theme } => commands::set_theme(store, Some(&theme)),
    }
}

fn handle_session_command(action: SessionAction, store: &AppStore) -> anyhow::Result<()> {
    match action {
        SessionAction::Login { email, name } => {
            store.log_in(&email, name.as_deref())?;
            println!("✅ Logged in as {}", email.trim());
        }

        SessionAction::Logout => {
            store.log_out();
            println!("Logged out.");
        }

        SessionAction::Show => {
            let state = store.state();
            println!("{}", serde_json::to_string_pretty(&*state.session)?);
        }
    }

    Ok(())
}

fn handle_profile_command(action: ProfileAction, store: &AppStore) -> anyhow::Result<()> {
    match action {
        ProfileAction::Set { name, bio } => {
            store.update_profile(&name, &bio)?;
            println!("✅ Profile updated");
        }

        ProfileAction::Show => {
            let state = store.state();
            if state.profile.name.is_empty() {
                println!("No profile set.");
            } else {
                println!("Name: {}", state.profile.name);
                println!("Bio:  {}", state.profile.bio);
            }
        }
    }

    Ok(())
}
