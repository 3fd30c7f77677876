use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::error::ListError;
use super::list::{ListController, ListEntity, ListEvent, ListKind, LoadState, Operation};
use super::menu_item::MenuItemListController;
use crate::models::{MenuItem, Record, RecordError, RecordId, Restaurant};
use crate::schema::RestaurantSchema;
use crate::store::{Query, RecordStore};

impl ListEntity for Restaurant {
    fn id(&self) -> &RecordId {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn from_record(record: &Record) -> Result<Self, RecordError> {
        Restaurant::try_from(record)
    }
}

/// Every restaurant in the store.
pub struct RestaurantList;

impl ListKind for RestaurantList {
    type Item = Restaurant;

    const LABEL: &'static str = "Restaurant";

    fn query(&self) -> Query {
        Query::all(RestaurantSchema::RECORD_TYPE).sorted_by(RestaurantSchema::NAME, true)
    }

    fn new_record(&self, name: &str) -> Record {
        Restaurant::new_record(name)
    }
}

/// Outcome of a background menu-item save started by a restaurant create.
///
/// Dropping it leaves the save running.
pub struct PendingMenuItem {
    handle: JoinHandle<Result<MenuItem, ListError>>,
}

impl PendingMenuItem {
    pub async fn outcome(self) -> Result<MenuItem, ListError> {
        self.handle
            .await
            .map_err(|e| ListError::Interrupted(e.to_string()))?
    }
}

/// Result of [`RestaurantListController::create_with_menu_item`].
pub struct CreatedRestaurant {
    pub restaurant: Restaurant,
    /// Present when a menu-item name was co-submitted.
    pub menu_item: Option<PendingMenuItem>,
}

/// Restaurant list: load, create, delete.
#[derive(Clone)]
pub struct RestaurantListController {
    list: ListController<RestaurantList>,
}

impl RestaurantListController {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            list: ListController::spawn(RestaurantList, store),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ListEvent<Restaurant>> {
        self.list.subscribe()
    }

    pub async fn load(&self) -> Result<Vec<Restaurant>, ListError> {
        self.list.load().await
    }

    pub async fn create(&self, name: &str) -> Result<Restaurant, ListError> {
        self.list.create(name).await
    }

    /// Creates a restaurant and, if `menu_item` is non-empty, a first menu
    /// item for it.
    ///
    /// The menu-item save starts only after the restaurant save succeeded and
    /// is independent of it: no transaction spans the two, and a failed
    /// menu-item save leaves the restaurant in place.
    pub async fn create_with_menu_item(
        &self,
        name: &str,
        menu_item: Option<&str>,
    ) -> Result<CreatedRestaurant, ListError> {
        let restaurant = self.list.create(name).await?;

        let menu_item = menu_item
            .filter(|n| !n.is_empty())
            .map(|menu_item_name| self.spawn_menu_item_save(&restaurant, menu_item_name));

        Ok(CreatedRestaurant {
            restaurant,
            menu_item,
        })
    }

    fn spawn_menu_item_save(&self, restaurant: &Restaurant, name: &str) -> PendingMenuItem {
        let record = MenuItem::new_record(name, restaurant.reference());
        let store = Arc::clone(self.list.store());
        let list = self.list.clone();
        let restaurant_name = restaurant.name.clone();

        let handle = tokio::spawn(async move {
            let outcome = store
                .save(record)
                .await
                .map_err(ListError::from)
                .and_then(|saved| MenuItem::try_from(&saved).map_err(ListError::from));

            match &outcome {
                Ok(item) => {
                    tracing::info!("Saved menu item '{}' for '{}'", item.name, restaurant_name)
                }
                Err(error) => {
                    tracing::warn!(
                        "Failed to save menu item for '{}': {}",
                        restaurant_name,
                        error
                    );
                    list.publish(ListEvent::OperationFailed {
                        operation: Operation::CreateMenuItem,
                        error: error.clone(),
                    });
                }
            }
            outcome
        });

        PendingMenuItem { handle }
    }

    pub async fn delete(&self, id: &RecordId) -> Result<Restaurant, ListError> {
        self.list.delete(id).await
    }

    pub async fn delete_at(&self, index: usize) -> Result<Restaurant, ListError> {
        self.list.delete_at(index).await
    }

    pub async fn snapshot(&self) -> Result<Vec<Restaurant>, ListError> {
        self.list.snapshot().await
    }

    pub async fn state(&self) -> Result<LoadState, ListError> {
        self.list.state().await
    }

    pub async fn settle(&self) -> Result<(), ListError> {
        self.list.settle().await
    }

    /// Opens the menu-item list of `restaurant` on the same store.
    pub fn menu_items(&self, restaurant: Restaurant) -> MenuItemListController {
        MenuItemListController::new(Arc::clone(self.list.store()), restaurant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldValue;
    use crate::store::{MemoryRecordStore, StoreError};

    fn setup() -> (MemoryRecordStore, RestaurantListController) {
        let store = MemoryRecordStore::new();
        let controller = RestaurantListController::new(Arc::new(store.clone()));
        (store, controller)
    }

    fn names(items: &[Restaurant]) -> Vec<&str> {
        items.iter().map(|r| r.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_load_sorts_by_name() {
        let (store, controller) = setup();
        store.seed(Restaurant::new_record("B"));
        store.seed(Restaurant::new_record("A"));

        let loaded = controller.load().await.unwrap();
        assert_eq!(names(&loaded), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_list() {
        let (store, controller) = setup();
        store.seed(Restaurant::new_record("A"));
        controller.load().await.unwrap();
        let mut events = controller.subscribe();

        store.seed(Restaurant::new_record("B"));
        store.fail_queries(1);
        let result = controller.load().await;

        assert!(matches!(result, Err(ListError::Remote(_))));
        assert_eq!(names(&controller.snapshot().await.unwrap()), vec!["A"]);
        assert_eq!(controller.state().await.unwrap(), LoadState::Idle);

        assert_eq!(events.recv().await.unwrap(), ListEvent::RefreshStarted);
        assert!(matches!(
            events.recv().await.unwrap(),
            ListEvent::OperationFailed {
                operation: Operation::Load,
                ..
            }
        ));
        assert_eq!(events.recv().await.unwrap(), ListEvent::RefreshEnded);
    }

    #[tokio::test]
    async fn test_create_prepends_regardless_of_sort_order() {
        let (store, controller) = setup();
        store.seed(Restaurant::new_record("A"));
        store.seed(Restaurant::new_record("M"));
        controller.load().await.unwrap();
        let mut events = controller.subscribe();

        let created = controller.create("Z").await.unwrap();

        assert_eq!(created.name, "Z");
        assert_eq!(
            names(&controller.snapshot().await.unwrap()),
            vec!["Z", "A", "M"]
        );
        assert_eq!(
            events.recv().await.unwrap(),
            ListEvent::Inserted {
                index: 0,
                item: created
            }
        );
    }

    #[tokio::test]
    async fn test_create_keeps_name_as_typed() {
        let (store, controller) = setup();

        let created = controller.create(" Luigi's ").await.unwrap();

        assert_eq!(created.name, " Luigi's ");
        assert_eq!(store.save_calls()[0].string("name"), Some(" Luigi's "));
    }

    #[tokio::test]
    async fn test_whitespace_name_is_saved() {
        let (store, controller) = setup();

        let created = controller.create("   ").await.unwrap();

        assert_eq!(created.name, "   ");
        assert_eq!(store.save_calls().len(), 1);
        assert_eq!(controller.snapshot().await.unwrap(), vec![created]);
    }

    #[tokio::test]
    async fn test_empty_name_issues_no_save() {
        let (store, controller) = setup();

        let err = controller.create("").await.unwrap_err();

        assert_eq!(err, ListError::Validation("Restaurant name cannot be empty".into()));
        assert_eq!(err.to_string(), "Restaurant name cannot be empty");
        assert!(store.save_calls().is_empty());
        assert!(controller.snapshot().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_create_leaves_list_unchanged() {
        let (store, controller) = setup();
        store.seed(Restaurant::new_record("A"));
        store.seed(Restaurant::new_record("M"));
        controller.load().await.unwrap();
        let before = controller.snapshot().await.unwrap();

        store.fail_saves(1);
        let result = controller.create("Z").await;

        assert_eq!(
            result.unwrap_err(),
            ListError::Remote(StoreError::Backend("injected save failure".into()))
        );
        assert_eq!(controller.snapshot().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_delete_removes_locally_and_remotely() {
        let (store, controller) = setup();
        store.seed(Restaurant::new_record("A"));
        store.seed(Restaurant::new_record("B"));
        store.seed(Restaurant::new_record("C"));
        let loaded = controller.load().await.unwrap();
        let target = loaded[1].clone();
        let mut events = controller.subscribe();

        let removed = controller.delete(&target.id).await.unwrap();
        controller.settle().await.unwrap();

        let after = controller.snapshot().await.unwrap();
        assert_eq!(removed, target);
        assert_eq!(after.len(), loaded.len() - 1);
        assert!(after.iter().all(|r| r.id != target.id));
        assert!(!store.contains(&target.id));
        assert_eq!(
            events.recv().await.unwrap(),
            ListEvent::Removed {
                index: 1,
                item: target
            }
        );
    }

    #[tokio::test]
    async fn test_delete_at_index() {
        let (store, controller) = setup();
        store.seed(Restaurant::new_record("A"));
        store.seed(Restaurant::new_record("B"));
        controller.load().await.unwrap();

        let removed = controller.delete_at(0).await.unwrap();
        controller.settle().await.unwrap();

        assert_eq!(removed.name, "A");
        assert_eq!(names(&controller.snapshot().await.unwrap()), vec!["B"]);
        assert_eq!(store.delete_calls(), vec![removed.id]);
    }

    #[tokio::test]
    async fn test_failed_remote_delete_still_removes_locally() {
        let (store, controller) = setup();
        store.seed(Restaurant::new_record("A"));
        let loaded = controller.load().await.unwrap();
        let target = loaded[0].clone();
        let mut events = controller.subscribe();

        store.fail_deletes(1);
        controller.delete(&target.id).await.unwrap();
        controller.settle().await.unwrap();

        assert!(controller.snapshot().await.unwrap().is_empty());
        assert!(store.contains(&target.id));

        assert!(matches!(events.recv().await.unwrap(), ListEvent::Removed { .. }));
        assert!(matches!(
            events.recv().await.unwrap(),
            ListEvent::OperationFailed {
                operation: Operation::Delete,
                ..
            }
        ));

        // Next load converges on the store.
        assert_eq!(names(&controller.load().await.unwrap()), vec!["A"]);
    }

    #[tokio::test]
    async fn test_create_with_menu_item_issues_two_saves() {
        let (store, controller) = setup();

        let created = controller
            .create_with_menu_item("R", Some("Soup"))
            .await
            .unwrap();
        let menu_item = created.menu_item.unwrap().outcome().await.unwrap();

        let saves = store.save_calls();
        assert_eq!(saves.len(), 2);

        assert_eq!(saves[0].record_type, "Restaurants");
        assert_eq!(saves[0].string("name"), Some("R"));
        assert_eq!(saves[0].fields.len(), 1);

        assert_eq!(saves[1].record_type, "MenuItems");
        assert_eq!(saves[1].string("name"), Some("Soup"));
        assert_eq!(
            saves[1].get("restaurant"),
            Some(&FieldValue::Reference(created.restaurant.reference()))
        );
        assert_eq!(menu_item.restaurant, created.restaurant.reference());

        // The menu item is not part of the restaurant list.
        assert_eq!(
            controller.snapshot().await.unwrap(),
            vec![created.restaurant]
        );
    }

    #[tokio::test]
    async fn test_create_without_menu_item_name() {
        let (store, controller) = setup();

        let created = controller.create_with_menu_item("R", Some("")).await.unwrap();
        assert!(created.menu_item.is_none());

        let created = controller.create_with_menu_item("S", None).await.unwrap();
        assert!(created.menu_item.is_none());
        assert_eq!(store.save_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_whitespace_menu_item_name_is_saved() {
        let (store, controller) = setup();

        let created = controller
            .create_with_menu_item("R", Some(" "))
            .await
            .unwrap();
        let item = created.menu_item.unwrap().outcome().await.unwrap();

        assert_eq!(item.name, " ");
        assert_eq!(item.restaurant, created.restaurant.reference());
        assert_eq!(store.save_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_restaurant_save_skips_menu_item() {
        let (store, controller) = setup();
        store.fail_saves(1);

        let result = controller.create_with_menu_item("R", Some("Soup")).await;

        assert!(result.is_err());
        assert_eq!(store.save_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_menu_item_save_keeps_restaurant() {
        let (store, controller) = setup();
        store.reject_saves_of("MenuItems");
        let mut events = controller.subscribe();

        let created = controller
            .create_with_menu_item("R", Some("Soup"))
            .await
            .unwrap();
        let outcome = created.menu_item.unwrap().outcome().await;

        assert!(matches!(outcome, Err(ListError::Remote(_))));
        assert!(store.contains(&created.restaurant.id));
        assert_eq!(controller.snapshot().await.unwrap().len(), 1);

        assert!(matches!(events.recv().await.unwrap(), ListEvent::Inserted { .. }));
        assert!(matches!(
            events.recv().await.unwrap(),
            ListEvent::OperationFailed {
                operation: Operation::CreateMenuItem,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_menu_items_opens_scoped_list() {
        let (_store, controller) = setup();
        let restaurant = controller.create("Luigi's").await.unwrap();

        let menu = controller.menu_items(restaurant.clone());
        assert_eq!(menu.restaurant(), &restaurant);
        assert_eq!(menu.title(), "Luigi's");
    }
}
