use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{
    try_auto_sync, App, BackupCommand, ConfigCommand, DayCommand, DaySubcommand, SyncCommand,
    UserCommand, UserSubcommand, VehicleCommand, VehicleSubcommand,
};
use dayledger::config::Config;

#[derive(Parser)]
#[command(name = "dayledger")]
#[command(version)]
#[command(about = "Track usage days of historic vehicles", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register, sign in and list users
    User(UserCommand),

    /// Manage and share vehicles
    Vehicle(VehicleCommand),

    /// Log and list usage days
    Day(DayCommand),

    /// Sync with the configured remote
    Sync(SyncCommand),

    /// Export or import a JSON backup
    Backup(BackupCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dayledger=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = Config::load(cli.config)?;

    let Some(command) = cli.command else {
        println!("Use --help to see available commands");
        return Ok(());
    };

    // Pull before reads so they see other devices' changes.
    if is_read_command(&command) {
        try_auto_sync(&config).await;
    }

    let result = execute_command(&command, &config).await;

    if result.is_ok() && is_write_command(&command) {
        try_auto_sync(&config).await;
    }

    result
}

async fn execute_command(command: &Commands, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::User(cmd) => cmd.run(&App::open(config.clone()).await?).await,
        Commands::Vehicle(cmd) => cmd.run(&App::open(config.clone()).await?).await,
        Commands::Day(cmd) => cmd.run(&App::open(config.clone()).await?).await,
        Commands::Sync(cmd) => cmd.run(&App::open(config.clone()).await?).await,
        Commands::Backup(cmd) => cmd.run(&App::open(config.clone()).await?).await,
        Commands::Config(cmd) => cmd.run(config),
    }
}

fn is_read_command(cmd: &Commands) -> bool {
    matches!(
        cmd,
        Commands::Vehicle(v) if matches!(v.command,
            VehicleSubcommand::List { .. } | VehicleSubcommand::Shared { .. })
    ) || matches!(
        cmd,
        Commands::Day(d) if matches!(d.command,
            DaySubcommand::List { .. } | DaySubcommand::Count { .. })
    ) || matches!(
        cmd,
        Commands::User(u) if matches!(u.command,
            UserSubcommand::Login { .. } | UserSubcommand::List { .. })
    )
}

/// Returns true if the command changes shared data and should sync after execution.
fn is_write_command(cmd: &Commands) -> bool {
    matches!(
        cmd,
        Commands::Vehicle(v) if matches!(v.command,
            VehicleSubcommand::Add { .. }
            | VehicleSubcommand::Delete { .. }
            | VehicleSubcommand::Share { .. }
            | VehicleSubcommand::Redeem { .. })
    ) || matches!(
        cmd,
        Commands::Day(d) if matches!(d.command,
            DaySubcommand::Add { .. } | DaySubcommand::Remove { .. })
    ) || matches!(
        cmd,
        Commands::User(u) if matches!(u.command, UserSubcommand::Register { .. })
    )
}
