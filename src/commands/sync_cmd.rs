//! Sync CLI commands for reconciling with the remote snapshot.

use clap::{Args, Subcommand};

use super::{App, OutputFormat};
use dayledger::models::CollectionCounts;
use dayledger::SyncMode;

/// Sync with the remote
#[derive(Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    command: Option<SyncSubcommand>,
}

#[derive(Subcommand)]
enum SyncSubcommand {
    /// Show sync mode, backend and last successful sync
    Status {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl SyncCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            None => self.sync(app).await,
            Some(SyncSubcommand::Status { format }) => self.status(app, format).await,
        }
    }

    async fn sync(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        if !app.config.remote.is_configured() {
            println!("No remote configured; data stays on this device.");
            println!("Run 'dayledger sync status' for setup help.");
            return Ok(());
        }

        let mut synchronizer = app.synchronizer();
        println!("Syncing with {}...", app.config.remote.backend.as_deref().unwrap_or("remote"));

        let report = synchronizer.sync().await?;

        print_counts("Pulled", &report.pulled);
        print_counts("Pushed", &report.pushed);

        if !report.conflicts.is_empty() {
            println!();
            println!("Dropped usage days (date already taken on another device):");
            for day in &report.conflicts {
                println!("  {}  {}", day, day.vehicle_id);
            }
        }

        println!();
        if report.is_synchronized() {
            println!("Sync complete.");
        } else {
            println!(
                "Sync incomplete: {}",
                report.reason.as_deref().unwrap_or("remote unavailable")
            );
        }
        Ok(())
    }

    async fn status(&self, app: &App, format: &OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
        let status = app.synchronizer().status().await?;

        if let OutputFormat::Json = format {
            println!("{}", serde_json::to_string_pretty(&status)?);
            return Ok(());
        }

        println!("Sync Status");
        println!("===========");
        println!();
        println!("Mode:      {}", status.mode);
        println!("Backend:   {}", status.backend.as_deref().unwrap_or("none"));
        println!(
            "Auto-sync: {}",
            if app.config.remote.auto_sync { "enabled" } else { "disabled" }
        );
        match status.last_sync {
            Some(at) => println!("Last sync: {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
            None => println!("Last sync: never"),
        }

        if status.mode == SyncMode::LocalOnly {
            println!();
            if app.config.remote.is_configured() && !app.config.remote.has_credential() {
                println!("The remote is read-only: add remote.token to push changes.");
            } else if !app.config.remote.is_configured() {
                println!("To enable sync, add to your config file:");
                println!();
                println!("  remote:");
                println!("    backend: http");
                println!("    url: \"http://localhost:8080\"");
                println!("    token: \"your-api-key\"");
                println!("    auto_sync: true");
                println!();
                println!("Or set environment variables:");
                println!("  DAYLEDGER_REMOTE_BACKEND");
                println!("  DAYLEDGER_REMOTE_URL");
                println!("  DAYLEDGER_REMOTE_TOKEN");
            }
        }
        Ok(())
    }
}

fn print_counts(label: &str, counts: &CollectionCounts) {
    println!(
        "  {}: {} user(s), {} vehicle(s), {} usage day(s), {} share grant(s)",
        label, counts.users, counts.vehicles, counts.usage_days, counts.share_grants
    );
}
