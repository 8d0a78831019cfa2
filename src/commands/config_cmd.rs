use clap::{Args, Subcommand};

use super::OutputFormat;
use dayledger::config::Config;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                let mut shown = config.clone();
                shown.remote.token = shown.remote.token.as_deref().map(mask_token);

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&shown)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &shown.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("database_path: {}", shown.database_path.value.display());
                        println!("  source: {}", shown.database_path.source);
                        println!();

                        let remote = &shown.remote;
                        println!("remote.backend: {}", remote.backend.as_deref().unwrap_or("(none)"));
                        for (key, value) in [
                            ("url", &remote.url),
                            ("repository", &remote.repository),
                            ("path", &remote.path),
                            ("branch", &remote.branch),
                            ("bin_id", &remote.bin_id),
                            ("token", &remote.token),
                        ] {
                            if let Some(value) = value {
                                println!("remote.{}: {}", key, value);
                            }
                        }
                        println!("remote.timeout_secs: {}", remote.timeout_secs);
                        println!("remote.auto_sync: {}", remote.auto_sync);
                    }
                }
                Ok(())
            }
        }
    }
}

fn mask_token(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    format!("{}...", visible)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_token_hides_most_of_it() {
        assert_eq!(mask_token("ghp_abcdef123456"), "ghp_...");
        assert_eq!(mask_token("ab"), "ab...");
    }
}
