use reqwest::Method;
use tessera_api_types::{NewTag, Tag, TagCategory, TagCount, TagSearch};
use uuid::Uuid;

use super::{ApiContext, routes};
use crate::error::ApiResult;

pub async fn get_item_tags(ctx: &ApiContext, item_id: Uuid) -> ApiResult<Vec<Tag>> {
    ctx.get(&routes::item_tags(item_id)).await
}

pub async fn post_item_tag(
    ctx: &ApiContext,
    item_id: Uuid,
    category: TagCategory,
    tag: &NewTag,
) -> ApiResult<Tag> {
    ctx.send(
        Method::POST,
        &routes::post_item_tag(item_id, category),
        Some(tag),
    )
    .await
}

pub async fn delete_item_tag(ctx: &ApiContext, item_id: Uuid, tag_id: Uuid) -> ApiResult<()> {
    ctx.send_unit::<()>(Method::DELETE, &routes::item_tag(item_id, tag_id), None)
        .await
}

/// Tag names matching the search text, with usage counts.
pub async fn search_tags(ctx: &ApiContext, search: &TagSearch) -> ApiResult<Vec<TagCount>> {
    ctx.get(&routes::tag_search(search)).await
}
