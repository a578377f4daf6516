use diesel::{delete, insert_into, prelude::*, update};
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection, RunQueryDsl};
use tracing::{debug, instrument};

use super::{link, require_items, require_menus, unique_ids, unlink_menus};
use crate::{
    models::{Item, ItemChanges, Menu, MenuItem, NewItem},
    schema::{items, menu_items, menus},
    DbConnection, StoreError,
};

pub struct ItemStore<'a> {
    conn: &'a mut DbConnection,
}

impl<'a> ItemStore<'a> {
    pub fn new(conn: &'a mut DbConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&mut self, item: &NewItem<'_>) -> Result<Item, StoreError> {
        let created = insert_into(items::table)
            .values(item)
            .returning(Item::as_returning())
            .get_result(self.conn)
            .await?;
        debug!(item_id = created.id, "created item");
        Ok(created)
    }

    pub async fn bulk_create(&mut self, rows: &[NewItem<'_>]) -> Result<Vec<Item>, StoreError> {
        self.conn
            .transaction::<_, StoreError, _>(|conn| {
                async move {
                    let mut created = Vec::with_capacity(rows.len());
                    for row in rows {
                        created.push(
                            insert_into(items::table)
                                .values(row)
                                .returning(Item::as_returning())
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

    pub async fn find(&mut self, id: i32) -> Result<Option<Item>, StoreError> {
        Ok(items::table
            .find(id)
            .select(Item::as_select())
            .first(self.conn)
            .await
            .optional()?)
    }

    pub async fn find_by_name(&mut self, name: &str) -> Result<Option<Item>, StoreError> {
        Ok(items::table
            .filter(items::name.eq(name))
            .order(items::id.asc())
            .select(Item::as_select())
            .first(self.conn)
            .await
            .optional()?)
    }

    pub async fn list(&mut self) -> Result<Vec<Item>, StoreError> {
        Ok(items::table
            .order(items::id.asc())
            .select(Item::as_select())
            .load(self.conn)
            .await?)
    }

    pub async fn count(&mut self) -> Result<i64, StoreError> {
        Ok(items::table.count().get_result::<i64>(self.conn).await?)
    }

    #[instrument(skip(self))]
    pub async fn update(&mut self, id: i32, changes: &ItemChanges<'_>) -> Result<Item, StoreError> {
        let not_found = StoreError::NotFound { entity: "item", id };
        if changes.is_empty() {
            return self.find(id).await?.ok_or(not_found);
        }
        update(items::table.find(id))
            .set(changes)
            .returning(Item::as_returning())
            .get_result(self.conn)
            .await
            .optional()?
            .ok_or(not_found)
    }

    pub async fn delete(&mut self, id: i32) -> Result<bool, StoreError> {
        let deleted = delete(items::table.find(id)).execute(self.conn).await?;
        Ok(deleted > 0)
    }

    pub async fn destroy_by_name(&mut self, name: &str) -> Result<usize, StoreError> {
        let deleted = delete(items::table.filter(items::name.eq(name)))
            .execute(self.conn)
            .await?;
        debug!(item_name = name, deleted, "destroyed items");
        Ok(deleted)
    }

    pub async fn menus(&mut self, id: i32) -> Result<Vec<Menu>, StoreError> {
        Ok(menu_items::table
            .inner_join(menus::table)
            .filter(menu_items::item_id.eq(id))
            .order(menus::id.asc())
            .select(Menu::as_select())
            .load(self.conn)
            .await?)
    }

    /// Makes `menu_ids` the complete set of menus listing this item.
    #[instrument(skip(self))]
    pub async fn set_menus(&mut self, id: i32, menu_ids: &[i32]) -> Result<Vec<Menu>, StoreError> {
        let menu_ids = unique_ids(menu_ids);
        self.conn
            .transaction::<_, StoreError, _>(|conn| {
                async move {
                    require_items(conn, &[id]).await?;
                    require_menus(conn, &menu_ids).await?;

                    delete(
                        menu_items::table
                            .filter(menu_items::item_id.eq(id))
                            .filter(menu_items::menu_id.ne_all(&menu_ids)),
                    )
                    .execute(conn)
                    .await?;
                    link(conn, &links_for_item(id, &menu_ids)).await?;
                    Ok(())
                }
                .scope_boxed()
            })
            .await?;
        self.menus(id).await
    }

    pub async fn add_menus(&mut self, id: i32, menu_ids: &[i32]) -> Result<usize, StoreError> {
        let menu_ids = unique_ids(menu_ids);
        self.conn
            .transaction::<_, StoreError, _>(|conn| {
                async move {
                    require_items(conn, &[id]).await?;
                    require_menus(conn, &menu_ids).await?;
                    link(conn, &links_for_item(id, &menu_ids)).await
                }
                .scope_boxed()
            })
            .await
    }

    pub async fn remove_menus(&mut self, id: i32, menu_ids: &[i32]) -> Result<usize, StoreError> {
        unlink_menus(self.conn, id, menu_ids).await
    }
}

fn links_for_item(item_id: i32, menu_ids: &[i32]) -> Vec<MenuItem> {
    menu_ids
        .iter()
        .map(|&menu_id| MenuItem { menu_id, item_id })
        .collect()
}
