use tracing::debug;

use crate::{
    models::{Item, Menu, NewItem, NewMenu, NewRestaurant, Restaurant},
    store::{ItemStore, MenuStore, RestaurantStore},
    DbConnection, StoreError,
};

pub const SEED_RESTAURANTS: [NewRestaurant<'static>; 3] = [
    NewRestaurant { name: "AppleBees" },
    NewRestaurant { name: "LittleSheep" },
    NewRestaurant {
        name: "Spice Grill",
    },
];

pub const SEED_MENUS: [NewMenu<'static>; 3] = [
    NewMenu {
        title: "Breakfast",
        restaurant_id: None,
    },
    NewMenu {
        title: "Lunch",
        restaurant_id: None,
    },
    NewMenu {
        title: "Dinner",
        restaurant_id: None,
    },
];

pub const SEED_ITEMS: [NewItem<'static>; 4] = [
    NewItem {
        name: "bhindi masala",
        image: "someimage.jpg",
        price: 9,
        vegetarian: true,
    },
    NewItem {
        name: "egusi soup",
        image: "someimage.jpg",
        price: 10,
        vegetarian: false,
    },
    NewItem {
        name: "hamburger",
        image: "hamburger.png",
        price: 7,
        vegetarian: false,
    },
    NewItem {
        name: "garden salad",
        image: "salad.webp",
        price: 6,
        vegetarian: true,
    },
];

/// Rows created by [`seed`], in fixture order.
#[derive(Debug, Clone, PartialEq)]
pub struct Seeded {
    pub restaurants: Vec<Restaurant>,
    pub menus: Vec<Menu>,
    pub items: Vec<Item>,
}

/// Bulk-inserts the fixtures. No associations are created.
pub async fn seed(conn: &mut DbConnection) -> Result<Seeded, StoreError> {
    let restaurants = RestaurantStore::new(conn)
        .bulk_create(&SEED_RESTAURANTS)
        .await?;
    let menus = MenuStore::new(conn).bulk_create(&SEED_MENUS).await?;
    let items = ItemStore::new(conn).bulk_create(&SEED_ITEMS).await?;
    debug!(
        restaurants = restaurants.len(),
        menus = menus.len(),
        items = items.len(),
        "seeded fixtures"
    );
    Ok(Seeded {
        restaurants,
        menus,
        items,
    })
}
