use diesel::{delete, insert_into, prelude::*, update};
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection, RunQueryDsl};
use tracing::{debug, instrument};

use super::{require_menus, require_restaurant, unique_ids};
use crate::{
    models::{Menu, NewRestaurant, Restaurant, RestaurantChanges, RestaurantWithMenus},
    schema::{menus, restaurants},
    DbConnection, StoreError,
};

pub struct RestaurantStore<'a> {
    conn: &'a mut DbConnection,
}

impl<'a> RestaurantStore<'a> {
    pub fn new(conn: &'a mut DbConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &mut self,
        restaurant: &NewRestaurant<'_>,
    ) -> Result<Restaurant, StoreError> {
        let created = insert_into(restaurants::table)
            .values(restaurant)
            .returning(Restaurant::as_returning())
            .get_result(self.conn)
            .await?;
        debug!(restaurant_id = created.id, "created restaurant");
        Ok(created)
    }

    /// Inserts all rows in one transaction; either every row lands or none do.
    pub async fn bulk_create(
        &mut self,
        rows: &[NewRestaurant<'_>],
    ) -> Result<Vec<Restaurant>, StoreError> {
        self.conn
            .transaction::<_, StoreError, _>(|conn| {
                async move {
                    let mut created = Vec::with_capacity(rows.len());
                    for row in rows {
                        created.push(
                            insert_into(restaurants::table)
                                .values(row)
                                .returning(Restaurant::as_returning())
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

    pub async fn find(&mut self, id: i32) -> Result<Option<Restaurant>, StoreError> {
        Ok(restaurants::table
            .find(id)
            .select(Restaurant::as_select())
            .first(self.conn)
            .await
            .optional()?)
    }

    pub async fn find_by_name(&mut self, name: &str) -> Result<Option<Restaurant>, StoreError> {
        Ok(restaurants::table
            .filter(restaurants::name.eq(name))
            .order(restaurants::id.asc())
            .select(Restaurant::as_select())
            .first(self.conn)
            .await
            .optional()?)
    }

    pub async fn list(&mut self) -> Result<Vec<Restaurant>, StoreError> {
        Ok(restaurants::table
            .order(restaurants::id.asc())
            .select(Restaurant::as_select())
            .load(self.conn)
            .await?)
    }

    pub async fn count(&mut self) -> Result<i64, StoreError> {
        Ok(restaurants::table
            .count()
            .get_result::<i64>(self.conn)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn update(
        &mut self,
        id: i32,
        changes: &RestaurantChanges<'_>,
    ) -> Result<Restaurant, StoreError> {
        let not_found = StoreError::NotFound {
            entity: "restaurant",
            id,
        };
        if changes.is_empty() {
            return self.find(id).await?.ok_or(not_found);
        }
        update(restaurants::table.find(id))
            .set(changes)
            .returning(Restaurant::as_returning())
            .get_result(self.conn)
            .await
            .optional()?
            .ok_or(not_found)
    }

    /// Menus owned by the restaurant are kept and lose their owner.
    pub async fn delete(&mut self, id: i32) -> Result<bool, StoreError> {
        let deleted = delete(restaurants::table.find(id))
            .execute(self.conn)
            .await?;
        Ok(deleted > 0)
    }

    pub async fn destroy_by_name(&mut self, name: &str) -> Result<usize, StoreError> {
        let deleted = delete(restaurants::table.filter(restaurants::name.eq(name)))
            .execute(self.conn)
            .await?;
        debug!(restaurant_name = name, deleted, "destroyed restaurants");
        Ok(deleted)
    }

    pub async fn menus(&mut self, id: i32) -> Result<Vec<Menu>, StoreError> {
        Ok(menus::table
            .filter(menus::restaurant_id.eq(id))
            .order(menus::id.asc())
            .select(Menu::as_select())
            .load(self.conn)
            .await?)
    }

    /// Makes `menu_ids` the complete set of menus owned by the restaurant.
    /// Menus it owned before that are not listed are detached.
    #[instrument(skip(self))]
    pub async fn set_menus(&mut self, id: i32, menu_ids: &[i32]) -> Result<Vec<Menu>, StoreError> {
        let menu_ids = unique_ids(menu_ids);
        self.conn
            .transaction::<_, StoreError, _>(|conn| {
                async move {
                    require_restaurant(conn, id).await?;
                    require_menus(conn, &menu_ids).await?;

                    update(
                        menus::table
                            .filter(menus::restaurant_id.eq(id))
                            .filter(menus::id.ne_all(&menu_ids)),
                    )
                    .set(menus::restaurant_id.eq(None::<i32>))
                    .execute(conn)
                    .await?;
                    update(menus::table.filter(menus::id.eq_any(&menu_ids)))
                        .set(menus::restaurant_id.eq(id))
                        .execute(conn)
                        .await?;
                    Ok(())
                }
                .scope_boxed()
            })
            .await?;
        self.menus(id).await
    }

    /// Attaches menus without detaching the ones already owned.
    pub async fn add_menus(&mut self, id: i32, menu_ids: &[i32]) -> Result<(), StoreError> {
        let menu_ids = unique_ids(menu_ids);
        self.conn
            .transaction::<_, StoreError, _>(|conn| {
                async move {
                    require_restaurant(conn, id).await?;
                    require_menus(conn, &menu_ids).await?;
                    update(menus::table.filter(menus::id.eq_any(&menu_ids)))
                        .set(menus::restaurant_id.eq(id))
                        .execute(conn)
                        .await?;
                    Ok(())
                }
                .scope_boxed()
            })
            .await
    }

    /// Every restaurant with its menus, fetched in two queries.
    pub async fn list_with_menus(&mut self) -> Result<Vec<RestaurantWithMenus>, StoreError> {
        let restaurants = self.list().await?;
        let menus = Menu::belonging_to(&restaurants)
            .order(menus::id.asc())
            .select(Menu::as_select())
            .load(self.conn)
            .await?
            .grouped_by(&restaurants);

        Ok(restaurants
            .into_iter()
            .zip(menus)
            .map(|(restaurant, menus)| RestaurantWithMenus { restaurant, menus })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MenuStore;
    use crate::test_support::setup;

    #[tokio::test]
    async fn test_create_restaurant() {
        let (mut conn, seeded) = setup().await;

        assert_eq!(seeded.restaurants.len(), 3);
        let mut store = RestaurantStore::new(&mut conn);
        let created = store
            .create(&NewRestaurant { name: "Noodle Bar" })
            .await
            .unwrap();

        assert_eq!(created.name.as_deref(), Some("Noodle Bar"));
        assert!(seeded.restaurants.iter().all(|r| r.id != created.id));
        assert_eq!(store.find(created.id).await.unwrap(), Some(created));
        assert_eq!(store.count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_find_restaurant_by_name() {
        let (mut conn, _) = setup().await;

        let mut store = RestaurantStore::new(&mut conn);
        let found = store.find_by_name("AppleBees").await.unwrap().unwrap();
        assert_eq!(found.name.as_deref(), Some("AppleBees"));

        let all = store.list().await.unwrap();
        assert_eq!(
            all.iter()
                .filter(|r| r.name.as_deref() == Some("AppleBees"))
                .count(),
            1
        );
        assert!(store.find_by_name("Taco Bell").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_restaurant() {
        let (mut conn, _) = setup().await;

        let mut store = RestaurantStore::new(&mut conn);
        let found = store.find_by_name("AppleBees").await.unwrap().unwrap();
        let updated = store
            .update(
                found.id,
                &RestaurantChanges {
                    name: Some("Taco Bell"),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.id, found.id);
        assert_eq!(updated.name.as_deref(), Some("Taco Bell"));
        assert!(store.find_by_name("AppleBees").await.unwrap().is_none());
        assert_eq!(
            store.find_by_name("Taco Bell").await.unwrap(),
            Some(updated)
        );
    }

    #[tokio::test]
    async fn test_update_restaurant_without_changes() {
        let (mut conn, seeded) = setup().await;

        let original = &seeded.restaurants[0];
        let unchanged = RestaurantStore::new(&mut conn)
            .update(original.id, &RestaurantChanges::default())
            .await
            .unwrap();
        assert_eq!(&unchanged, original);
    }

    #[tokio::test]
    async fn test_update_missing_restaurant() {
        let (mut conn, _) = setup().await;

        let result = RestaurantStore::new(&mut conn)
            .update(
                9999,
                &RestaurantChanges {
                    name: Some("Taco Bell"),
                },
            )
            .await;
        assert!(matches!(
            result,
            Err(StoreError::NotFound {
                entity: "restaurant",
                id: 9999
            })
        ));
    }

    #[tokio::test]
    async fn test_delete_restaurant() {
        let (mut conn, _) = setup().await;

        let mut store = RestaurantStore::new(&mut conn);
        assert_eq!(store.destroy_by_name("AppleBees").await.unwrap(), 1);
        assert_eq!(store.list().await.unwrap().len(), 2);
        assert_eq!(store.destroy_by_name("AppleBees").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_restaurant_detaches_menus() {
        let (mut conn, seeded) = setup().await;

        let restaurant = &seeded.restaurants[0];
        let menu = &seeded.menus[0];
        let mut store = RestaurantStore::new(&mut conn);
        store.set_menus(restaurant.id, &[menu.id]).await.unwrap();

        assert!(store.delete(restaurant.id).await.unwrap());
        assert!(!store.delete(restaurant.id).await.unwrap());

        let menu = MenuStore::new(&mut conn).find(menu.id).await.unwrap().unwrap();
        assert_eq!(menu.restaurant_id, None);
    }

    #[tokio::test]
    async fn test_set_menus() {
        let (mut conn, seeded) = setup().await;

        let restaurant = &seeded.restaurants[0];
        let mut store = RestaurantStore::new(&mut conn);
        assert!(store.menus(restaurant.id).await.unwrap().is_empty());

        let menu_ids = [seeded.menus[0].id, seeded.menus[1].id];
        let menus = store.set_menus(restaurant.id, &menu_ids).await.unwrap();
        assert_eq!(menus.len(), 2);

        let menus = store.menus(restaurant.id).await.unwrap();
        assert_eq!(menus.len(), 2);
        assert!(menus
            .iter()
            .all(|m| m.restaurant_id == Some(restaurant.id)));
    }

    #[tokio::test]
    async fn test_set_menus_replaces_previous_set() {
        let (mut conn, seeded) = setup().await;

        let restaurant = &seeded.restaurants[0];
        let [breakfast, lunch, dinner] = [&seeded.menus[0], &seeded.menus[1], &seeded.menus[2]];
        let mut store = RestaurantStore::new(&mut conn);
        store
            .set_menus(restaurant.id, &[breakfast.id, lunch.id])
            .await
            .unwrap();
        let menus = store
            .set_menus(restaurant.id, &[lunch.id, dinner.id, dinner.id])
            .await
            .unwrap();

        assert_eq!(
            menus.iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![lunch.id, dinner.id]
        );
        let breakfast = MenuStore::new(&mut conn)
            .find(breakfast.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(breakfast.restaurant_id, None);
    }

    #[tokio::test]
    async fn test_set_menus_moves_menu_between_restaurants() {
        let (mut conn, seeded) = setup().await;

        let (first, second) = (&seeded.restaurants[0], &seeded.restaurants[1]);
        let menu = &seeded.menus[0];
        let mut store = RestaurantStore::new(&mut conn);
        store.set_menus(first.id, &[menu.id]).await.unwrap();
        store.set_menus(second.id, &[menu.id]).await.unwrap();

        assert!(store.menus(first.id).await.unwrap().is_empty());
        assert_eq!(store.menus(second.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_set_menus_rejects_unknown_menu() {
        let (mut conn, seeded) = setup().await;

        let restaurant = &seeded.restaurants[0];
        let mut store = RestaurantStore::new(&mut conn);
        store
            .set_menus(restaurant.id, &[seeded.menus[0].id])
            .await
            .unwrap();

        let result = store
            .set_menus(restaurant.id, &[seeded.menus[1].id, 4242])
            .await;
        assert!(matches!(
            result,
            Err(StoreError::NotFound {
                entity: "menu",
                id: 4242
            })
        ));
        // rolled back
        let menus = store.menus(restaurant.id).await.unwrap();
        assert_eq!(menus.len(), 1);
        assert_eq!(menus[0].id, seeded.menus[0].id);
    }

    #[tokio::test]
    async fn test_set_menus_on_missing_restaurant() {
        let (mut conn, seeded) = setup().await;

        let result = RestaurantStore::new(&mut conn)
            .set_menus(777, &[seeded.menus[0].id])
            .await;
        assert!(matches!(
            result,
            Err(StoreError::NotFound {
                entity: "restaurant",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_add_menus_keeps_existing() {
        let (mut conn, seeded) = setup().await;

        let restaurant = &seeded.restaurants[2];
        let mut store = RestaurantStore::new(&mut conn);
        store
            .set_menus(restaurant.id, &[seeded.menus[0].id])
            .await
            .unwrap();
        store
            .add_menus(restaurant.id, &[seeded.menus[2].id])
            .await
            .unwrap();

        let ids = store
            .menus(restaurant.id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![seeded.menus[0].id, seeded.menus[2].id]);
    }

    #[tokio::test]
    async fn test_list_with_menus() {
        let (mut conn, seeded) = setup().await;

        let mut store = RestaurantStore::new(&mut conn);
        store
            .set_menus(
                seeded.restaurants[1].id,
                &[seeded.menus[0].id, seeded.menus[2].id],
            )
            .await
            .unwrap();

        let listed = store.list_with_menus().await.unwrap();
        assert_eq!(listed.len(), 3);
        assert!(listed[0].menus.is_empty());
        assert_eq!(listed[1].restaurant, seeded.restaurants[1]);
        assert_eq!(listed[1].menus.len(), 2);
        assert!(listed[2].menus.is_empty());
    }
}
