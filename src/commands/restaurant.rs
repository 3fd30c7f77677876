use clap::{Args, Subcommand};

use super::{confirm, delete_failure, find_entry, truncate, OutputFormat};
use cloudmenu::RestaurantListController;

#[derive(Args)]
pub struct RestaurantCommand {
    #[command(subcommand)]
    pub command: RestaurantSubcommand,
}

#[derive(Subcommand)]
pub enum RestaurantSubcommand {
    /// List all restaurants, sorted by name
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Add a restaurant
    Add {
        /// Name of the restaurant
        name: String,

        /// First menu item, saved after the restaurant
        #[arg(long, value_name = "NAME")]
        menu_item: Option<String>,
    },

    /// Delete a restaurant (its menu items are kept)
    Delete {
        /// Restaurant ID or name
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl RestaurantCommand {
    pub async fn run(
        &self,
        restaurants: &RestaurantListController,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            RestaurantSubcommand::List { format } => {
                let restaurants = restaurants.load().await?;

                if restaurants.is_empty() {
                    println!("No restaurants found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&restaurants)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<36}  NAME", "ID");
                        println!("{}", "-".repeat(70));
                        for restaurant in &restaurants {
                            println!("{:<36}  {}", restaurant.id, truncate(&restaurant.name, 30));
                        }
                        println!("\nTotal: {} restaurant(s)", restaurants.len());
                    }
                }
                Ok(())
            }

            RestaurantSubcommand::Add { name, menu_item } => {
                let created = restaurants
                    .create_with_menu_item(name, menu_item.as_deref())
                    .await?;
                println!("Created restaurant:");
                println!("{}", created.restaurant);

                if let Some(pending) = created.menu_item {
                    match pending.outcome().await {
                        Ok(item) => {
                            println!("Created menu item:");
                            println!("{}", item);
                        }
                        Err(e) => {
                            return Err(format!(
                                "Restaurant '{}' was saved but its menu item was not: {}",
                                created.restaurant.name, e
                            )
                            .into());
                        }
                    }
                }
                Ok(())
            }

            RestaurantSubcommand::Delete { identifier, force } => {
                let loaded = restaurants.load().await?;
                let restaurant = find_entry(&loaded, identifier)?.clone();

                if !force && !confirm(&format!("Delete restaurant '{}'?", restaurant.name))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                let mut events = restaurants.subscribe();
                restaurants.delete(&restaurant.id).await?;
                restaurants.settle().await?;

                if let Some(error) = delete_failure(&mut events) {
                    return Err(format!(
                        "Failed to delete restaurant '{}': {}",
                        restaurant.name, error
                    )
                    .into());
                }
                println!("Deleted restaurant: {}", restaurant.name);
                Ok(())
            }
        }
    }
}
