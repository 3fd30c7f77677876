use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use cloudmenu::{Config, RestaurantListController, SqliteRecordStore};
use commands::{ConfigCommand, MenuCommand, RestaurantCommand};

#[derive(Parser)]
#[command(name = "cloudmenu")]
#[command(version)]
#[command(about = "Keep track of restaurants and their menus", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage restaurants
    Restaurant(RestaurantCommand),

    /// Manage a restaurant's menu items
    Menu(MenuCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = Config::load(cli.config)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Some(Commands::Restaurant(cmd)) => {
            let restaurants = open_restaurants(&config).await?;
            cmd.run(&restaurants).await?;
        }
        Some(Commands::Menu(cmd)) => {
            let restaurants = open_restaurants(&config).await?;
            cmd.run(&restaurants).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}

async fn open_restaurants(
    config: &Config,
) -> Result<RestaurantListController, Box<dyn std::error::Error>> {
    let store = SqliteRecordStore::open(&config.database_path.value).await?;
    Ok(RestaurantListController::new(Arc::new(store)))
}
