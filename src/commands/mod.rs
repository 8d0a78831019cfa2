mod backup_cmd;
mod config_cmd;
mod day;
mod sync_cmd;
mod user;
mod vehicle;

pub use backup_cmd::BackupCommand;
pub use config_cmd::ConfigCommand;
pub use day::{DayCommand, DaySubcommand};
pub use sync_cmd::SyncCommand;
pub use user::{UserCommand, UserSubcommand};
pub use vehicle::{VehicleCommand, VehicleSubcommand};

use clap::ValueEnum;
use std::io::{self, Write};
use uuid::Uuid;

use dayledger::config::Config;
use dayledger::db::{init_db, Database, MetaRepository};
use dayledger::sync::{SyncOutcome, Synchronizer};
use dayledger::{IdentityStore, ShareRegistry, UsageLedger, UserProfile, Vehicle};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Everything a command needs: config, the local store and the services on
/// top of it.
pub struct App {
    pub config: Config,
    pub db: Database,
    pub identity: IdentityStore,
    pub ledger: UsageLedger,
    pub sharing: ShareRegistry,
}

impl App {
    pub async fn open(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        let db = init_db(&config.database_path.value).await?;
        let identity = IdentityStore::new(db.clone());
        let ledger = UsageLedger::new(db.clone(), identity.clone());
        let sharing = ShareRegistry::new(db.clone());

        Ok(Self {
            config,
            db,
            identity,
            ledger,
            sharing,
        })
    }

    pub fn meta(&self) -> MetaRepository {
        MetaRepository::new(self.db.clone())
    }

    pub fn synchronizer(&self) -> Synchronizer {
        Synchronizer::from_config(self.db.clone(), &self.config.remote)
    }

    /// The signed-in user on this device.
    pub async fn current_user(&self) -> Result<UserProfile, CommandError> {
        let id = self
            .meta()
            .current_user()
            .await
            .map_err(|e| CommandError::Storage(e.to_string()))?
            .ok_or(CommandError::NotLoggedIn)?;

        // The user may have vanished after importing a backup.
        self.identity
            .get(id)
            .await
            .map_err(|e| CommandError::Storage(e.to_string()))?
            .ok_or(CommandError::NotLoggedIn)
    }

    /// Finds a vehicle the user can see by id, id prefix or name.
    pub async fn resolve_vehicle(
        &self,
        user_id: Uuid,
        identifier: &str,
    ) -> Result<Vehicle, Box<dyn std::error::Error>> {
        let identifier = identifier.trim();
        let visible = self.ledger.vehicles_for_user(user_id).await?;

        if let Ok(id) = Uuid::parse_str(identifier) {
            if let Some(found) = visible.iter().find(|a| a.vehicle.id == id) {
                return Ok(found.vehicle.clone());
            }
        }

        let matches: Vec<&Vehicle> = visible
            .iter()
            .map(|a| &a.vehicle)
            .filter(|v| {
                v.name.eq_ignore_ascii_case(identifier) || v.id.to_string().starts_with(identifier)
            })
            .collect();

        match matches.as_slice() {
            [only] => Ok((*only).clone()),
            [] => Err(CommandError::UnknownVehicle(identifier.to_string()).into()),
            _ => Err(CommandError::AmbiguousVehicle(identifier.to_string()).into()),
        }
    }
}

#[derive(Debug)]
pub enum CommandError {
    NotLoggedIn,
    UnknownVehicle(String),
    AmbiguousVehicle(String),
    InvalidDate(String),
    Storage(String),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::NotLoggedIn => {
                write!(f, "Not logged in. Run 'dayledger user login' first.")
            }
            CommandError::UnknownVehicle(v) => write!(f, "No vehicle matches '{}'", v),
            CommandError::AmbiguousVehicle(v) => {
                write!(f, "'{}' matches more than one vehicle; use its id", v)
            }
            CommandError::InvalidDate(d) => {
                write!(f, "Invalid date '{}': expected YYYY-MM-DD", d)
            }
            CommandError::Storage(e) => write!(f, "Storage error: {}", e),
        }
    }
}

impl std::error::Error for CommandError {}

/// Reads a password from the flag or, failing that, from stdin.
pub fn read_password(provided: Option<String>) -> io::Result<String> {
    if let Some(password) = provided {
        return Ok(password);
    }
    print!("Password: ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

/// Asks a yes/no question on stdin.
pub fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// Syncs if `remote.auto_sync` is on. Never fails: offline is normal.
pub async fn try_auto_sync(config: &Config) {
    let remote = &config.remote;
    if !remote.auto_sync || !remote.is_configured() {
        return;
    }

    let db = match init_db(&config.database_path.value).await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Auto-sync: {}", e);
            return;
        }
    };

    match Synchronizer::from_config(db, remote).sync().await {
        Ok(report) if report.outcome == SyncOutcome::PartialLocal => {
            tracing::debug!(reason = ?report.reason, "auto-sync incomplete");
        }
        Ok(report) => {
            if !report.conflicts.is_empty() {
                eprintln!(
                    "Auto-sync: {} usage day(s) were already taken on another device",
                    report.conflicts.len()
                );
            }
        }
        Err(e) => eprintln!("Auto-sync: {}", e),
    }
}
