use chrono::{Local, NaiveDate};
use clap::{Args, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use super::{App, CommandError, OutputFormat};
use dayledger::{UsageDay, UsageStatus};

#[derive(Args)]
pub struct DayCommand {
    #[command(subcommand)]
    pub command: DaySubcommand,
}

#[derive(Subcommand)]
pub enum DaySubcommand {
    /// Log a usage day for a vehicle
    Add {
        /// Vehicle ID (UUID or prefix) or name
        vehicle: String,

        /// Date (YYYY-MM-DD, defaults to today)
        #[arg(long, short)]
        date: Option<String>,
    },

    /// Remove a logged usage day
    Remove {
        /// Usage day ID
        id: Uuid,
    },

    /// List the usage days of a vehicle, newest first
    List {
        /// Vehicle ID (UUID or prefix) or name
        vehicle: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show how many days a vehicle has been used
    Count {
        /// Vehicle ID (UUID or prefix) or name
        vehicle: String,
    },
}

#[derive(Serialize)]
struct DayList<'a> {
    count: usize,
    status: UsageStatus,
    days: &'a [UsageDay],
}

impl DayCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        let user = app.current_user().await?;

        match &self.command {
            DaySubcommand::Add { vehicle, date } => {
                let date = parse_date(date.as_deref())?;
                let vehicle = app.resolve_vehicle(user.id, vehicle).await?;
                let day = app.ledger.add_usage_day(vehicle.id, user.id, date).await?;
                let count = app.ledger.count_usage_days(vehicle.id).await?;

                println!("Logged {} for {}", day.date, vehicle.name);
                println!("  id: {}", day.id);
                print_count(count);
                Ok(())
            }
            DaySubcommand::Remove { id } => {
                app.ledger.remove_usage_day(*id).await?;
                println!("Removed usage day {}", id);
                Ok(())
            }
            DaySubcommand::List { vehicle, format } => {
                let vehicle = app.resolve_vehicle(user.id, vehicle).await?;
                let days = app.ledger.list_usage_days(vehicle.id).await?;
                let status = UsageStatus::from_count(days.len() as u32);

                match format {
                    OutputFormat::Json => {
                        let list = DayList {
                            count: days.len(),
                            status,
                            days: &days,
                        };
                        println!("{}", serde_json::to_string_pretty(&list)?);
                    }
                    OutputFormat::Text => {
                        println!("{}", vehicle);
                        if days.is_empty() {
                            println!("  No usage days logged");
                        }
                        for day in &days {
                            println!("  {}  {}", day, day.id);
                        }
                        print_count(days.len() as u32);
                    }
                }
                Ok(())
            }
            DaySubcommand::Count { vehicle } => {
                let vehicle = app.resolve_vehicle(user.id, vehicle).await?;
                let count = app.ledger.count_usage_days(vehicle.id).await?;
                println!("{}", vehicle);
                print_count(count);
                Ok(())
            }
        }
    }
}

fn print_count(count: u32) {
    let status = UsageStatus::from_count(count);
    println!("Usage days: {} ({})", count, status);
    if let Some(notice) = status.notice() {
        println!("{}", notice);
    }
}

fn parse_date(input: Option<&str>) -> Result<NaiveDate, CommandError> {
    match input {
        None => Ok(Local::now().date_naive()),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map_err(|_| CommandError::InvalidDate(s.to_string())),
    }
}
