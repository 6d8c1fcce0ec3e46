use async_trait::async_trait;
use tessera_api_types::{NewTag, Tag, TagCategory};
use uuid::Uuid;

use super::Mutation;
use crate::api::{ApiContext, tags};
use crate::cache::{ItemKeys, QueryCache, QueryKey, Snapshot, TagKeys};
use crate::error::ApiResult;
use crate::notify::Action;

fn tag_keys(item_id: Uuid) -> Vec<QueryKey> {
    vec![ItemKeys::single(item_id).tags(), TagKeys::all()]
}

pub struct PostItemTag {
    pub item_id: Uuid,
    pub category: TagCategory,
    pub name: String,
}

#[async_trait]
impl Mutation for PostItemTag {
    type Output = Tag;
    type Snapshot = ();

    fn action(&self) -> Action {
        Action::PostItemTag
    }

    async fn mutate(&self, api: &ApiContext) -> ApiResult<Tag> {
        let tag = NewTag {
            name: self.name.clone(),
        };
        tags::post_item_tag(api, self.item_id, self.category, &tag).await
    }

    fn settled_keys(&self, _cache: &QueryCache, _output: Option<&Tag>) -> Vec<QueryKey> {
        tag_keys(self.item_id)
    }
}

pub struct DeleteItemTag {
    pub item_id: Uuid,
    pub tag_id: Uuid,
}

#[async_trait]
impl Mutation for DeleteItemTag {
    type Output = ();
    type Snapshot = Snapshot<Vec<Tag>>;

    fn action(&self) -> Action {
        Action::DeleteItemTag
    }

    fn optimistic_keys(&self) -> Vec<QueryKey> {
        vec![ItemKeys::single(self.item_id).tags()]
    }

    fn apply_optimistic(&self, cache: &QueryCache) -> Option<Self::Snapshot> {
        let key = ItemKeys::single(self.item_id).tags();
        let snapshot = cache.snapshot::<Vec<Tag>>(&key)?;
        cache.update::<Vec<Tag>, _>(&key, |list| list.retain(|tag| tag.id != self.tag_id));
        Some(snapshot)
    }

    async fn mutate(&self, api: &ApiContext) -> ApiResult<()> {
        tags::delete_item_tag(api, self.item_id, self.tag_id).await
    }

    fn settled_keys(&self, _cache: &QueryCache, _output: Option<&()>) -> Vec<QueryKey> {
        tag_keys(self.item_id)
    }
}
