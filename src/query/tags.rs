use tessera_api_types::{Tag, TagCount, TagSearch};
use uuid::Uuid;

use super::{DebouncedQuery, Query, require};
use crate::api::tags;
use crate::cache::{ItemKeys, TagKeys};
use crate::client::QueryClient;

impl QueryClient {
    pub fn item_tags(&self, item_id: impl Into<Option<Uuid>>) -> Query<'_, Vec<Tag>> {
        let item_id = item_id.into();
        self.query(ItemKeys::single(item_id).tags(), item_id.is_some(), move |api| async move {
            tags::get_item_tags(&api, require(item_id, "item id")?).await
        })
    }

    /// Tag counts for one search. Blank search text disables the query.
    pub fn search_tags(&self, search: TagSearch) -> Query<'_, Vec<TagCount>> {
        let enabled = search.normalized_search().is_some();
        self.query(TagKeys::search(&search), enabled, move |api| {
            let search = search.clone();
            async move { tags::search_tags(&api, &search).await }
        })
    }

    /// [`search_tags`](Self::search_tags) behind debounced input.
    pub fn tag_search(&self) -> DebouncedQuery<'_, TagSearch, Vec<TagCount>> {
        let delay = self.options().debounce;
        DebouncedQuery::new(self, TagSearch::default(), delay, |client, search: &TagSearch| {
            client.search_tags(search.clone())
        })
    }
}
