use clap::{Args, Subcommand};

use super::OutputFormat;
use crate::config::{Config, ConfigValue};

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

fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

fn print_value<T: std::fmt::Display>(key: &str, value: &ConfigValue<T>) {
    println!("{}: {}", key, value.value);
    println!("  source: {}", value.source);
    println!();
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        let mut shown = config.clone();
                        shown.remote.api_key = shown.remote.api_key.as_deref().map(mask);
                        println!("{}", serde_json::to_string_pretty(&shown)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("database_path: {}", config.database_path.value.display());
                        println!("  source: {}", config.database_path.source);
                        println!();
                        println!("backup_dir: {}", config.backup_dir.value.display());
                        println!("  source: {}", config.backup_dir.source);
                        println!();
                        println!("image_dir: {}", config.image_dir.value.display());
                        println!("  source: {}", config.image_dir.source);
                        println!();
                        print_value("offline_mode", &config.offline_mode);
                        print_value("minimum_stock", &config.minimum_stock);
                        print_value("cashier", &config.cashier);

                        println!("remote:");
                        match &config.remote.server_url {
                            Some(url) => println!("  server_url: {}", url),
                            None => println!("  server_url: (not set)"),
                        }
                        match &config.remote.api_key {
                            Some(key) => println!("  api_key: {}", mask(key)),
                            None => println!("  api_key: (not set)"),
                        }
                        println!("  timeout_secs: {}", config.remote.timeout_secs);
                        println!(
                            "  backend: {}",
                            if config.use_remote() { "remote" } else { "local" }
                        );
                    }
                }
                Ok(())
            }
        }
    }
}
