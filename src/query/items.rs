use std::collections::HashMap;

use tessera_api_types::{
    AccessibleParams, ChildrenParams, DescendantsParams, GeoBounds, Item, ItemGeolocation, Page,
    Pagination, ThumbnailSize,
};
use uuid::Uuid;

use super::{DebouncedQuery, Query, require};
use crate::api::items;
use crate::cache::{ItemKeys, QueryCache};
use crate::client::QueryClient;

/// Seed each item's own content key from a list or map it arrived in.
fn seed_items<'a>(cache: &QueryCache, items: impl IntoIterator<Item = &'a Item>) {
    for item in items {
        cache.set(ItemKeys::single(item.id).content(), item.clone());
    }
}

impl QueryClient {
    pub fn item(&self, id: impl Into<Option<Uuid>>) -> Query<'_, Item> {
        let id = id.into();
        self.query(ItemKeys::single(id).content(), id.is_some(), move |api| async move {
            items::get_item(&api, require(id, "item id")?).await
        })
    }

    /// Any number of items, fetched in chunks. Each returned item also
    /// fills its single-item key.
    pub fn items_many(&self, ids: &[Uuid]) -> Query<'_, HashMap<Uuid, Item>> {
        let owned = ids.to_vec();
        self.query(ItemKeys::many(ids), true, move |api| {
            let ids = owned.clone();
            async move { items::get_many_items(&api, &ids).await }
        })
        .fan_out(|cache, items: &HashMap<Uuid, Item>| seed_items(cache, items.values()))
    }

    pub fn children(
        &self,
        id: impl Into<Option<Uuid>>,
        params: ChildrenParams,
    ) -> Query<'_, Vec<Item>> {
        let id = id.into();
        let key = ItemKeys::single(id).children(&params);
        self.query(key, id.is_some(), move |api| {
            let params = params.clone();
            async move { items::get_children(&api, require(id, "parent id")?, &params).await }
        })
        .fan_out(|cache, items: &Vec<Item>| seed_items(cache, items))
    }

    pub fn descendants(
        &self,
        id: impl Into<Option<Uuid>>,
        params: DescendantsParams,
    ) -> Query<'_, Vec<Item>> {
        let id = id.into();
        let key = ItemKeys::single(id).descendants(&params);
        self.query(key, id.is_some(), move |api| {
            let params = params.clone();
            async move { items::get_descendants(&api, require(id, "item id")?, &params).await }
        })
        .fan_out(|cache, items: &Vec<Item>| seed_items(cache, items))
    }

    pub fn parents(&self, id: impl Into<Option<Uuid>>) -> Query<'_, Vec<Item>> {
        let id = id.into();
        self.query(ItemKeys::single(id).parents(), id.is_some(), move |api| async move {
            items::get_parents(&api, require(id, "item id")?).await
        })
    }

    /// One page of the items the signed-in member can reach.
    pub fn accessible_items(
        &self,
        params: AccessibleParams,
        pagination: Pagination,
    ) -> Query<'_, Page<Item>> {
        let key = ItemKeys::accessible(&params, &pagination);
        self.query(key, true, move |api| {
            let params = params.clone();
            async move { items::get_accessible_items(&api, &params, &pagination).await }
        })
    }

    /// Accessible items filtered by debounced keyword input. Blank input
    /// leaves the query disabled.
    pub fn accessible_search(
        &self,
        params: AccessibleParams,
        pagination: Pagination,
    ) -> DebouncedQuery<'_, String, Page<Item>> {
        let delay = self.options().debounce;
        DebouncedQuery::new(self, String::new(), delay, move |client, keywords: &String| {
            let params = AccessibleParams {
                keywords: Some(keywords.clone()),
                ..params.clone()
            };
            let enabled = params.normalized_keywords().is_some();
            client.accessible_items(params, pagination).enabled(enabled)
        })
    }

    pub fn recycled_items(&self) -> Query<'_, Vec<Item>> {
        self.query(ItemKeys::recycled(), true, |api| async move {
            items::get_recycled_items(&api).await
        })
    }

    pub fn items_in_bounds(&self, bounds: GeoBounds) -> Query<'_, Vec<ItemGeolocation>> {
        self.query(ItemKeys::in_bounds(&bounds), true, move |api| async move {
            items::get_items_in_bounds(&api, &bounds).await
        })
    }

    pub fn item_geolocation(
        &self,
        id: impl Into<Option<Uuid>>,
    ) -> Query<'_, Option<ItemGeolocation>> {
        let id = id.into();
        let key = ItemKeys::single(id).geolocation();
        self.query(key, id.is_some(), move |api| async move {
            items::get_item_geolocation(&api, require(id, "item id")?).await
        })
    }

    pub fn item_thumbnail_url(
        &self,
        id: impl Into<Option<Uuid>>,
        size: ThumbnailSize,
    ) -> Query<'_, Option<String>> {
        let id = id.into();
        let key = ItemKeys::single(id).thumbnail(size);
        self.query(key, id.is_some(), move |api| async move {
            items::get_item_thumbnail_url(&api, require(id, "item id")?, size).await
        })
    }
}
