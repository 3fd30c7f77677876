use clap::{Args, Subcommand};

use super::{confirm, delete_failure, find_entry, truncate, OutputFormat};
use cloudmenu::{MenuItemListController, RestaurantListController};

#[derive(Args)]
pub struct MenuCommand {
    /// Restaurant ID or name
    #[arg(long, short, global = true)]
    pub restaurant: Option<String>,

    #[command(subcommand)]
    pub command: MenuSubcommand,
}

#[derive(Subcommand)]
pub enum MenuSubcommand {
    /// List a restaurant's menu items, sorted by name
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Add a menu item to a restaurant
    Add {
        /// Name of the menu item
        name: String,
    },

    /// Delete a menu item
    Delete {
        /// Menu item ID or name
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl MenuCommand {
    pub async fn run(
        &self,
        restaurants: &RestaurantListController,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let menu = self.open_menu(restaurants).await?;

        match &self.command {
            MenuSubcommand::List { format } => {
                let items = menu.load().await?;

                if items.is_empty() {
                    println!("No menu items found for {}", menu.title());
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&items)?);
                    }
                    OutputFormat::Text => {
                        println!("{}", menu.title());
                        println!("{}", "=".repeat(menu.title().len()));
                        println!("{:<36}  NAME", "ID");
                        println!("{}", "-".repeat(70));
                        for item in &items {
                            println!("{:<36}  {}", item.id, truncate(&item.name, 30));
                        }
                        println!("\nTotal: {} menu item(s)", items.len());
                    }
                }
                Ok(())
            }

            MenuSubcommand::Add { name } => {
                let created = menu.create(name).await?;
                println!("Created menu item for {}:", menu.title());
                println!("{}", created);
                Ok(())
            }

            MenuSubcommand::Delete { identifier, force } => {
                let loaded = menu.load().await?;
                let item = find_entry(&loaded, identifier)?.clone();

                if !force
                    && !confirm(&format!(
                        "Delete menu item '{}' from {}?",
                        item.name,
                        menu.title()
                    ))?
                {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                let mut events = menu.subscribe();
                menu.delete(&item.id).await?;
                menu.settle().await?;

                if let Some(error) = delete_failure(&mut events) {
                    return Err(
                        format!("Failed to delete menu item '{}': {}", item.name, error).into(),
                    );
                }
                println!("Deleted menu item: {}", item.name);
                Ok(())
            }
        }
    }

    async fn open_menu(
        &self,
        restaurants: &RestaurantListController,
    ) -> Result<MenuItemListController, Box<dyn std::error::Error>> {
        let identifier = self
            .restaurant
            .as_deref()
            .ok_or("A restaurant is required (--restaurant <ID|NAME>)")?;

        let loaded = restaurants.load().await?;
        let restaurant = find_entry(&loaded, identifier)?.clone();
        tracing::debug!("Opening menu of '{}'", restaurant.name);
        Ok(restaurants.menu_items(restaurant))
    }
}
