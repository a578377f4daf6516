use diesel::{delete, insert_into, prelude::*, update};
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection, RunQueryDsl};
use tracing::{debug, instrument};

use super::{link, require_items, require_restaurant, unique_ids, unlink_items};
use crate::{
    models::{Item, Menu, MenuChanges, MenuItem, MenuWithItems, NewMenu, Restaurant},
    schema::{items, menu_items, menus, restaurants},
    DbConnection, StoreError,
};

pub struct MenuStore<'a> {
    conn: &'a mut DbConnection,
}

impl<'a> MenuStore<'a> {
    pub fn new(conn: &'a mut DbConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&mut self, menu: &NewMenu<'_>) -> Result<Menu, StoreError> {
        let created = insert_into(menus::table)
            .values(menu)
            .returning(Menu::as_returning())
            .get_result(self.conn)
            .await?;
        debug!(menu_id = created.id, "created menu");
        Ok(created)
    }

    pub async fn bulk_create(&mut self, rows: &[NewMenu<'_>]) -> Result<Vec<Menu>, StoreError> {
        self.conn
            .transaction::<_, StoreError, _>(|conn| {
                async move {
                    let mut created = Vec::with_capacity(rows.len());
                    for row in rows {
                        created.push(
                            insert_into(menus::table)
                                .values(row)
                                .returning(Menu::as_returning())
                                .get_result(conn)
                                .await?,
                        );
                    }
                    Ok(created)
                }
                .scope_boxed()
            })
            .await
    }

    pub async fn find(&mut self, id: i32) -> Result<Option<Menu>, StoreError> {
        Ok(menus::table
            .find(id)
            .select(Menu::as_select())
            .first(self.conn)
            .await
            .optional()?)
    }

    pub async fn find_by_title(&mut self, title: &str) -> Result<Option<Menu>, StoreError> {
        Ok(menus::table
            .filter(menus::title.eq(title))
            .order(menus::id.asc())
            .select(Menu::as_select())
            .first(self.conn)
            .await
            .optional()?)
    }

    /// Loads the menu together with its items; the list is empty, not absent,
    /// when nothing is linked.
    pub async fn find_with_items(&mut self, id: i32) -> Result<Option<MenuWithItems>, StoreError> {
        let Some(menu) = self.find(id).await? else {
            return Ok(None);
        };
        let items = MenuItem::belonging_to(&menu)
            .inner_join(items::table)
            .order(items::id.asc())
            .select(Item::as_select())
            .load(self.conn)
            .await?;
        Ok(Some(MenuWithItems { menu, items }))
    }

    pub async fn list(&mut self) -> Result<Vec<Menu>, StoreError> {
        Ok(menus::table
            .order(menus::id.asc())
            .select(Menu::as_select())
            .load(self.conn)
            .await?)
    }

    pub async fn count(&mut self) -> Result<i64, StoreError> {
        Ok(menus::table.count().get_result::<i64>(self.conn).await?)
    }

    #[instrument(skip(self))]
    pub async fn update(&mut self, id: i32, changes: &MenuChanges<'_>) -> Result<Menu, StoreError> {
        let not_found = StoreError::NotFound { entity: "menu", id };
        if changes.is_empty() {
            return self.find(id).await?.ok_or(not_found);
        }
        update(menus::table.find(id))
            .set(changes)
            .returning(Menu::as_returning())
            .get_result(self.conn)
            .await
            .optional()?
            .ok_or(not_found)
    }

    /// Join rows for the menu go with it.
    pub async fn delete(&mut self, id: i32) -> Result<bool, StoreError> {
        let deleted = delete(menus::table.find(id)).execute(self.conn).await?;
        Ok(deleted > 0)
    }

    pub async fn destroy_by_title(&mut self, title: &str) -> Result<usize, StoreError> {
        let deleted = delete(menus::table.filter(menus::title.eq(title)))
            .execute(self.conn)
            .await?;
        debug!(menu_title = title, deleted, "destroyed menus");
        Ok(deleted)
    }

    pub async fn restaurant(&mut self, id: i32) -> Result<Option<Restaurant>, StoreError> {
        Ok(menus::table
            .inner_join(restaurants::table)
            .filter(menus::id.eq(id))
            .select(Restaurant::as_select())
            .first(self.conn)
            .await
            .optional()?)
    }

    /// Points the menu at `restaurant_id`, or detaches it with `None`.
    pub async fn set_restaurant(
        &mut self,
        id: i32,
        restaurant_id: Option<i32>,
    ) -> Result<Menu, StoreError> {
        self.conn
            .transaction::<_, StoreError, _>(|conn| {
                async move {
                    if let Some(restaurant_id) = restaurant_id {
                        require_restaurant(conn, restaurant_id).await?;
                    }
                    update(menus::table.find(id))
                        .set(menus::restaurant_id.eq(restaurant_id))
                        .returning(Menu::as_returning())
                        .get_result(conn)
                        .await
                        .optional()?
                        .ok_or(StoreError::NotFound { entity: "menu", id })
                }
                .scope_boxed()
            })
            .await
    }

    pub async fn items(&mut self, id: i32) -> Result<Vec<Item>, StoreError> {
        Ok(menu_items::table
            .inner_join(items::table)
            .filter(menu_items::menu_id.eq(id))
            .order(items::id.asc())
            .select(Item::as_select())
            .load(self.conn)
            .await?)
    }

    /// Makes `item_ids` the complete set of items on the menu.
    #[instrument(skip(self))]
    pub async fn set_items(&mut self, id: i32, item_ids: &[i32]) -> Result<Vec<Item>, StoreError> {
        let item_ids = unique_ids(item_ids);
        self.conn
            .transaction::<_, StoreError, _>(|conn| {
                async move {
                    require_menu(conn, id).await?;
                    require_items(conn, &item_ids).await?;

                    delete(
                        menu_items::table
                            .filter(menu_items::menu_id.eq(id))
                            .filter(menu_items::item_id.ne_all(&item_ids)),
                    )
                    .execute(conn)
                    .await?;
                    link(conn, &links_for_menu(id, &item_ids)).await?;
                    Ok(())
                }
                .scope_boxed()
            })
            .await?;
        self.items(id).await
    }

    /// Links items to the menu; already linked items are left alone.
    pub async fn add_items(&mut self, id: i32, item_ids: &[i32]) -> Result<usize, StoreError> {
        let item_ids = unique_ids(item_ids);
        self.conn
            .transaction::<_, StoreError, _>(|conn| {
                async move {
                    require_menu(conn, id).await?;
                    require_items(conn, &item_ids).await?;
                    link(conn, &links_for_menu(id, &item_ids)).await
                }
                .scope_boxed()
            })
            .await
    }

    /// Unlinks items from the menu and returns how many links were removed.
    pub async fn remove_items(&mut self, id: i32, item_ids: &[i32]) -> Result<usize, StoreError> {
        unlink_items(self.conn, id, item_ids).await
    }
}

async fn require_menu(conn: &mut DbConnection, id: i32) -> Result<(), StoreError> {
    super::require_menus(conn, &[id]).await
}

fn links_for_menu(menu_id: i32, item_ids: &[i32]) -> Vec<MenuItem> {
    item_ids
        .iter()
        .map(|&item_id| MenuItem { menu_id, item_id })
        .collect()
}
