mod branding;
mod schedule;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "warden", about = "Recurring security task scheduler")]
struct Cli {
    /// Config file path (defaults to ~/.warden/config.json5)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler loop until interrupted
    Run,
    /// Show registered tasks and their schedules
    Status {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Enable a task, creating its schedule entry on first use
    Enable {
        /// Task identifier (e.g. "backup")
        task: String,
    },
    /// Disable a task without deleting its entry
    Disable {
        /// Task identifier
        task: String,
    },
    /// Change a task's recurrence interval
    SetInterval {
        /// Task identifier
        task: String,
        /// New interval in seconds
        seconds: u64,
    },
    /// Delete a task's schedule entry
    Remove {
        /// Task identifier
        task: String,
    },
    /// Execute a task immediately, outside its schedule
    RunTask {
        /// Task identifier
        task: String,
    },
    /// Show or update white-label branding
    Branding {
        /// Set a branding field, e.g. --set display_name="Acme Shield"
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the settings schema consumed by the rendering layer
    Schema {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => warden_config::load_config_from(path)?,
        None => warden_config::load_config()?,
    };

    let rt = tokio::runtime::Runtime::new()?;
    match cli.command {
        Commands::Run => rt.block_on(serve::run(config))?,
        Commands::Status { json } => rt.block_on(schedule::status(config, json))?,
        Commands::Enable { task } => rt.block_on(schedule::enable(config, task))?,
        Commands::Disable { task } => rt.block_on(schedule::disable(config, task))?,
        Commands::SetInterval { task, seconds } => {
            rt.block_on(schedule::set_interval(config, task, seconds))?
        }
        Commands::Remove { task } => rt.block_on(schedule::remove(config, task))?,
        Commands::RunTask { task } => rt.block_on(schedule::run_task(config, task))?,
        Commands::Branding { set, json } => rt.block_on(branding::branding(config, set, json))?,
        Commands::Schema { json } => branding::schema(json)?,
    }
    Ok(())
}
