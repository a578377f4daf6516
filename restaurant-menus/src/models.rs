use diesel::prelude::*;

use crate::schema::{items, menu_items, menus, restaurants};

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = restaurants)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Restaurant {
    pub id: i32,
    pub name: Option<String>,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = restaurants)]
pub struct NewRestaurant<'a> {
    pub name: &'a str,
}

#[derive(AsChangeset, Default, Debug, Clone, PartialEq)]
#[diesel(table_name = restaurants)]
pub struct RestaurantChanges<'a> {
    pub name: Option<&'a str>,
}

impl RestaurantChanges<'_> {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
    }
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(belongs_to(Restaurant))]
#[diesel(table_name = menus)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Menu {
    pub id: i32,
    pub title: Option<String>,
    pub restaurant_id: Option<i32>,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = menus)]
pub struct NewMenu<'a> {
    pub title: &'a str,
    pub restaurant_id: Option<i32>,
}

/// Partial update of a menu. Ownership moves through
/// [`MenuStore::set_restaurant`](crate::store::MenuStore::set_restaurant).
#[derive(AsChangeset, Default, Debug, Clone, PartialEq)]
#[diesel(table_name = menus)]
pub struct MenuChanges<'a> {
    pub title: Option<&'a str>,
}

impl MenuChanges<'_> {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = items)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Item {
    pub id: i32,
    pub name: Option<String>,
    pub image: Option<String>,
    pub price: Option<i32>,
    pub vegetarian: bool,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = items)]
pub struct NewItem<'a> {
    pub name: &'a str,
    pub image: &'a str,
    pub price: i32,
    pub vegetarian: bool,
}

#[derive(AsChangeset, Default, Debug, Clone, PartialEq)]
#[diesel(table_name = items)]
pub struct ItemChanges<'a> {
    pub name: Option<&'a str>,
    pub image: Option<&'a str>,
    pub price: Option<i32>,
    pub vegetarian: Option<bool>,
}

impl ItemChanges<'_> {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.image.is_none()
            && self.price.is_none()
            && self.vegetarian.is_none()
    }
}

/// A row of the `menu_items` join table.
#[derive(
    Queryable, Selectable, Identifiable, Associations, Insertable, Debug, Clone, Copy, PartialEq,
)]
#[diesel(belongs_to(Menu))]
#[diesel(belongs_to(Item))]
#[diesel(table_name = menu_items, primary_key(menu_id, item_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MenuItem {
    pub menu_id: i32,
    pub item_id: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuWithItems {
    pub menu: Menu,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RestaurantWithMenus {
    pub restaurant: Restaurant,
    pub menus: Vec<Menu>,
}
