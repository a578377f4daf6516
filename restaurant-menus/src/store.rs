//! Repository-style access to restaurants, menus and items.
//!
//! Each store borrows the connection for as long as it lives, so calls on one
//! connection are strictly sequential. Association setters replace the whole
//! link set inside a transaction.

use std::collections::HashSet;

use diesel::{delete, insert_or_ignore_into, prelude::*};
use diesel_async::RunQueryDsl;

use crate::{
    models::MenuItem,
    schema::{items, menu_items, menus, restaurants},
    DbConnection, StoreError,
};

mod item;
mod menu;
mod restaurant;

pub use item::ItemStore;
pub use menu::MenuStore;
pub use restaurant::RestaurantStore;

/// Drops repeated ids while keeping the first occurrence's position.
fn unique_ids(ids: &[i32]) -> Vec<i32> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

async fn require_restaurant(conn: &mut DbConnection, id: i32) -> Result<(), StoreError> {
    let found = restaurants::table
        .find(id)
        .select(restaurants::id)
        .first::<i32>(conn)
        .await
        .optional()?;
    found.map(|_| ()).ok_or(StoreError::NotFound {
        entity: "restaurant",
        id,
    })
}

async fn require_menus(conn: &mut DbConnection, ids: &[i32]) -> Result<(), StoreError> {
    let found = menus::table
        .filter(menus::id.eq_any(ids))
        .select(menus::id)
        .load::<i32>(conn)
        .await?;
    match ids.iter().find(|id| !found.contains(id)) {
        Some(&id) => Err(StoreError::NotFound { entity: "menu", id }),
        None => Ok(()),
    }
}

async fn require_items(conn: &mut DbConnection, ids: &[i32]) -> Result<(), StoreError> {
    let found = items::table
        .filter(items::id.eq_any(ids))
        .select(items::id)
        .load::<i32>(conn)
        .await?;
    match ids.iter().find(|id| !found.contains(id)) {
        Some(&id) => Err(StoreError::NotFound { entity: "item", id }),
        None => Ok(()),
    }
}

/// Inserts join rows, skipping pairs that already exist.
async fn link(conn: &mut DbConnection, links: &[MenuItem]) -> Result<usize, StoreError> {
    let mut inserted = 0;
    for row in links {
        inserted += insert_or_ignore_into(menu_items::table)
            .values(row)
            .execute(conn)
            .await?;
    }
    Ok(inserted)
}

async fn unlink_items(
    conn: &mut DbConnection,
    menu_id: i32,
    item_ids: &[i32],
) -> Result<usize, StoreError> {
    Ok(delete(
        menu_items::table
            .filter(menu_items::menu_id.eq(menu_id))
            .filter(menu_items::item_id.eq_any(item_ids)),
    )
    .execute(conn)
    .await?)
}

async fn unlink_menus(
    conn: &mut DbConnection,
    item_id: i32,
    menu_ids: &[i32],
) -> Result<usize, StoreError> {
    Ok(delete(
        menu_items::table
            .filter(menu_items::item_id.eq(item_id))
            .filter(menu_items::menu_id.eq_any(menu_ids)),
    )
    .execute(conn)
    .await?)
}
