use std::sync::Arc;
use tokio::sync::broadcast;

use super::error::ListError;
use super::list::{ListController, ListEntity, ListEvent, ListKind, LoadState};
use crate::models::{MenuItem, Record, RecordError, RecordId, Restaurant};
use crate::schema::MenuItemSchema;
use crate::store::{Predicate, Query, RecordStore};

impl ListEntity for MenuItem {
    fn id(&self) -> &RecordId {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn from_record(record: &Record) -> Result<Self, RecordError> {
        MenuItem::try_from(record)
    }
}

/// Menu items referencing one restaurant.
pub struct MenuItemList {
    restaurant: Restaurant,
}

impl ListKind for MenuItemList {
    type Item = MenuItem;

    const LABEL: &'static str = "Menu item";

    fn query(&self) -> Query {
        Query::all(MenuItemSchema::RECORD_TYPE)
            .with_predicate(Predicate::field_equals(
                MenuItemSchema::RESTAURANT,
                self.restaurant.reference(),
            ))
            .sorted_by(MenuItemSchema::NAME, true)
    }

    fn new_record(&self, name: &str) -> Record {
        MenuItem::new_record(name, self.restaurant.reference())
    }
}

/// Menu-item list of a single restaurant: load, create, delete.
#[derive(Clone)]
pub struct MenuItemListController {
    list: ListController<MenuItemList>,
}

impl MenuItemListController {
    pub fn new(store: Arc<dyn RecordStore>, restaurant: Restaurant) -> Self {
        Self {
            list: ListController::spawn(MenuItemList { restaurant }, store),
        }
    }

    pub fn restaurant(&self) -> &Restaurant {
        &self.list.kind().restaurant
    }

    /// Heading for the list: the restaurant's name, exactly as stored.
    pub fn title(&self) -> &str {
        &self.restaurant().name
    }

    /// Prompt asking for a new menu item's name.
    pub fn prompt(&self) -> String {
        format!("Please enter new menu item for {}", self.restaurant().name)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ListEvent<MenuItem>> {
        self.list.subscribe()
    }

    pub async fn load(&self) -> Result<Vec<MenuItem>, ListError> {
        self.list.load().await
    }

    pub async fn create(&self, name: &str) -> Result<MenuItem, ListError> {
        self.list.create(name).await
    }

    pub async fn delete(&self, id: &RecordId) -> Result<MenuItem, ListError> {
        self.list.delete(id).await
    }

    pub async fn delete_at(&self, index: usize) -> Result<MenuItem, ListError> {
        self.list.delete_at(index).await
    }

    pub async fn snapshot(&self) -> Result<Vec<MenuItem>, ListError> {
        self.list.snapshot().await
    }

    pub async fn state(&self) -> Result<LoadState, ListError> {
        self.list.state().await
    }

    pub async fn settle(&self) -> Result<(), ListError> {
        self.list.settle().await
    }
}
