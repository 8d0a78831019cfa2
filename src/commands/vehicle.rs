use clap::{Args, Subcommand};
use serde::Serialize;

use super::{confirm, App, OutputFormat};
use dayledger::{share_message, ShareGrant, UsageStatus};

#[derive(Args)]
pub struct VehicleCommand {
    #[command(subcommand)]
    pub command: VehicleSubcommand,
}

#[derive(Subcommand)]
pub enum VehicleSubcommand {
    /// Add a vehicle you own
    Add {
        /// Name of the vehicle
        name: String,

        #[arg(long)]
        make: String,

        #[arg(long)]
        model: String,
    },

    /// List your vehicles and vehicles shared with you
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Delete a vehicle with all its usage days
    Delete {
        /// Vehicle ID (UUID or prefix) or name
        vehicle: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Get the share code of a vehicle
    Share {
        /// Vehicle ID (UUID or prefix) or name
        vehicle: String,
    },

    /// Gain access to a vehicle with a share code
    Redeem {
        /// Share code (case-insensitive)
        code: String,
    },

    /// List share codes you have redeemed
    Shared {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Serialize)]
struct VehicleSummary {
    #[serde(flatten)]
    vehicle: dayledger::AccessibleVehicle,
    usage_days: u32,
    status: UsageStatus,
}

impl VehicleCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        let user = app.current_user().await?;

        match &self.command {
            VehicleSubcommand::Add { name, make, model } => {
                let vehicle = app.ledger.create_vehicle(name, make, model, user.id).await?;
                println!("Added {}", vehicle);
                println!("  id: {}", vehicle.id);
                Ok(())
            }
            VehicleSubcommand::List { format } => {
                let mut summaries = Vec::new();
                for accessible in app.ledger.vehicles_for_user(user.id).await? {
                    let usage_days = app.ledger.count_usage_days(accessible.vehicle.id).await?;
                    summaries.push(VehicleSummary {
                        usage_days,
                        status: UsageStatus::from_count(usage_days),
                        vehicle: accessible,
                    });
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&summaries)?);
                    }
                    OutputFormat::Text => {
                        if summaries.is_empty() {
                            println!("No vehicles yet. Add one with 'dayledger vehicle add'.");
                        }
                        for s in &summaries {
                            let marker = if s.vehicle.shared_with_me { " [shared with you]" } else { "" };
                            println!("{}{}", s.vehicle.vehicle, marker);
                            println!("  id: {}", s.vehicle.vehicle.id);
                            print!("  usage days: {}", s.usage_days);
                            match s.status.notice() {
                                Some(notice) => println!(" ({})", notice),
                                None => println!(),
                            }
                        }
                    }
                }
                Ok(())
            }
            VehicleSubcommand::Delete { vehicle, force } => {
                let vehicle = app.resolve_vehicle(user.id, vehicle).await?;
                if !force && !confirm(&format!("Delete {} and all its usage days?", vehicle))? {
                    println!("Cancelled");
                    return Ok(());
                }
                app.ledger.delete_vehicle(vehicle.id).await?;
                println!("Deleted {}", vehicle);
                Ok(())
            }
            VehicleSubcommand::Share { vehicle } => {
                let vehicle = app.resolve_vehicle(user.id, vehicle).await?;
                let code = app.sharing.share_vehicle(vehicle.id, user.id).await?;
                println!("Share code: {}", code);
                println!();
                println!("{}", share_message(&vehicle, &code));
                Ok(())
            }
            VehicleSubcommand::Redeem { code } => {
                if app.sharing.redeem_code(code, user.id).await? {
                    println!("Vehicle added to your list");
                } else {
                    println!("You already have access to this vehicle");
                }
                Ok(())
            }
            VehicleSubcommand::Shared { format } => {
                let grants: Vec<ShareGrant> = app.sharing.list_shared_vehicles_for(user.id).await?;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&grants)?);
                    }
                    OutputFormat::Text => {
                        if grants.is_empty() {
                            println!("No share codes redeemed");
                        }
                        for grant in &grants {
                            let name = match app.ledger.get_vehicle(grant.vehicle_id).await {
                                Ok(vehicle) => vehicle.to_string(),
                                Err(_) => "(deleted vehicle)".to_string(),
                            };
                            println!("{}  {}", grant.share_code, name);
                        }
                    }
                }
                Ok(())
            }
        }
    }
}
