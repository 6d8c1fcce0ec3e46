use std::collections::HashMap;

use reqwest::Method;
use tessera_api_types::{ItemMembership, MembershipPatch, NewMembership, ResultOf};
use uuid::Uuid;

use super::{ApiContext, chunked_request, routes};
use crate::error::ApiResult;

/// Memberships of one chunk of items, keyed by item id.
pub async fn get_item_memberships(
    ctx: &ApiContext,
    item_ids: &[Uuid],
) -> ApiResult<ResultOf<Vec<ItemMembership>>> {
    ctx.get(&routes::item_memberships(item_ids)).await
}

pub async fn get_memberships_for_items(
    ctx: &ApiContext,
    item_ids: &[Uuid],
) -> ApiResult<HashMap<Uuid, Vec<ItemMembership>>> {
    chunked_request(item_ids, ctx.limits().max_read_targets, |chunk| async move {
        get_item_memberships(ctx, &chunk).await
    })
    .await
}

pub async fn post_item_membership(
    ctx: &ApiContext,
    item_id: Uuid,
    membership: &NewMembership,
) -> ApiResult<ItemMembership> {
    ctx.send(
        Method::POST,
        &routes::post_item_membership(item_id),
        Some(membership),
    )
    .await
}

pub async fn edit_item_membership(
    ctx: &ApiContext,
    membership_id: Uuid,
    patch: &MembershipPatch,
) -> ApiResult<ItemMembership> {
    ctx.send(
        Method::PATCH,
        &routes::item_membership(membership_id),
        Some(patch),
    )
    .await
}

pub async fn delete_item_membership(
    ctx: &ApiContext,
    membership_id: Uuid,
) -> ApiResult<ItemMembership> {
    ctx.send::<(), _>(Method::DELETE, &routes::item_membership(membership_id), None)
        .await
}
