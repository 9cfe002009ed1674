use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

mod commands;
mod config;

use commands::{
    CashflowCommand, CategoryCommand, ConfigCommand, CreditCommand, FetchCommand, ItemCommand,
    OrderCommand, StockCommand, UnitCommand,
};
use config::Config;
use shopdesk_core::{
    init_db, Backend, DirectoryBridge, HttpProbe, ImageCache, RemoteClient, Services, ShopContext,
    ShopSettings,
};

#[derive(Parser)]
#[command(name = "shopdesk")]
#[command(version)]
#[command(about = "Point-of-sale data from the command line", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage catalog items
    Item(ItemCommand),

    /// Manage item categories
    Category(CategoryCommand),

    /// Manage units and conversions
    Unit(UnitCommand),

    /// Adjust item stock
    Stock(StockCommand),

    /// Sell and manage orders
    Order(OrderCommand),

    /// Record and review cash movements
    Cashflow(CashflowCommand),

    /// Manage customer credit
    Credit(CreditCommand),

    /// Reload the catalog, check stock and back up
    Fetch(FetchCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shopdesk=info,shopdesk_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Composes the services once; the offline flag is not consulted again.
async fn open_shop(config: &Config) -> Result<ShopContext, Box<dyn std::error::Error>> {
    let pool = init_db(&config.database_path.value).await?;
    let images = ImageCache::new(&config.image_dir.value);

    let backend = match (&config.remote.server_url, &config.remote.api_key) {
        (Some(url), Some(key)) if config.use_remote() => {
            let client = RemoteClient::new(url, key, config.remote.timeout())?;
            tracing::debug!("Using remote backend at {}", client.server_url());
            Backend::Remote {
                connectivity: Arc::new(HttpProbe::new(client.clone())),
                client,
            }
        }
        _ => Backend::Local,
    };

    let services = Services::open(pool, backend, images);
    let bridge = Arc::new(DirectoryBridge::new(&config.backup_dir.value));
    let settings = ShopSettings {
        minimum_stock: config.minimum_stock.value,
        cashier: config.cashier.value.clone(),
    };
    Ok(ShopContext::new(services, bridge, settings))
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Item(cmd)) => cmd.run(&open_shop(&config).await?).await?,
        Some(Commands::Category(cmd)) => cmd.run(&open_shop(&config).await?).await?,
        Some(Commands::Unit(cmd)) => cmd.run(&open_shop(&config).await?).await?,
        Some(Commands::Stock(cmd)) => cmd.run(&open_shop(&config).await?).await?,
        Some(Commands::Order(cmd)) => cmd.run(&open_shop(&config).await?).await?,
        Some(Commands::Cashflow(cmd)) => cmd.run(&open_shop(&config).await?).await?,
        Some(Commands::Credit(cmd)) => cmd.run(&open_shop(&config).await?).await?,
        Some(Commands::Fetch(cmd)) => cmd.run(&open_shop(&config).await?).await?,
        Some(Commands::Config(cmd)) => cmd.run(&config)?,
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
