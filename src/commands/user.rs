use clap::{Args, Subcommand};

use super::{read_password, App, OutputFormat};

#[derive(Args)]
pub struct UserCommand {
    #[command(subcommand)]
    pub command: UserSubcommand,
}

#[derive(Subcommand)]
pub enum UserSubcommand {
    /// Create an account and sign in on this device
    Register {
        /// Display name shown next to logged days
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        /// Password (prompted if omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Sign in on this device
    Login {
        #[arg(long)]
        email: String,

        /// Password (prompted if omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Sign out on this device
    Logout,

    /// Show the signed-in user
    Whoami,

    /// List all known users
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl UserCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            UserSubcommand::Register {
                name,
                email,
                password,
            } => {
                let password = read_password(password.clone())?;
                let user = app.identity.register(name, email, &password).await?;
                app.meta().set_current_user(Some(user.id)).await?;
                println!("Registered and signed in as {}", user);
                Ok(())
            }
            UserSubcommand::Login { email, password } => {
                let password = read_password(password.clone())?;
                let user = app.identity.login(email, &password).await?;
                app.meta().set_current_user(Some(user.id)).await?;
                println!("Signed in as {}", user);
                Ok(())
            }
            UserSubcommand::Logout => {
                app.meta().set_current_user(None).await?;
                println!("Signed out");
                Ok(())
            }
            UserSubcommand::Whoami => {
                let user = app.current_user().await?;
                println!("{}", user);
                println!("  id: {}", user.id);
                Ok(())
            }
            UserSubcommand::List { format } => {
                let users = app.identity.list().await?;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&users)?);
                    }
                    OutputFormat::Text => {
                        if users.is_empty() {
                            println!("No users yet");
                        }
                        for user in &users {
                            println!("{}  {}", user.id, user);
                        }
                    }
                }
                Ok(())
            }
        }
    }
}
