use clap::Args;
use std::path::PathBuf;

use super::{confirm, App};
use dayledger::backup::{export_snapshot, import_snapshot};

/// Export or import the whole local store
#[derive(Args)]
pub struct BackupCommand {
    #[command(subcommand)]
    pub command: BackupSubcommand,
}

#[derive(clap::Subcommand)]
pub enum BackupSubcommand {
    /// Write all local data to a JSON file
    Export {
        /// Destination file
        path: PathBuf,
    },

    /// Replace all local data with a JSON file
    Import {
        /// Source file
        path: PathBuf,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl BackupCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            BackupSubcommand::Export { path } => {
                let counts = export_snapshot(&app.db, path).await?;
                println!(
                    "Exported {} user(s), {} vehicle(s), {} usage day(s) to {}",
                    counts.users,
                    counts.vehicles,
                    counts.usage_days,
                    path.display()
                );
                Ok(())
            }
            BackupSubcommand::Import { path, force } => {
                if !force && !confirm("Replace all local data with this backup?")? {
                    println!("Cancelled");
                    return Ok(());
                }
                let counts = import_snapshot(&app.db, path).await?;
                println!(
                    "Imported {} user(s), {} vehicle(s), {} usage day(s)",
                    counts.users, counts.vehicles, counts.usage_days
                );
                Ok(())
            }
        }
    }
}
